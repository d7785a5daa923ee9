//! Run directories and the rolling retention policy.
//!
//! Each run writes into `results/<yyyyMMdd_HHmmss>/`. Before a new run
//! directory is created, the oldest existing ones are removed so that the
//! total, including the new directory, stays within the configured limit.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info};

use geo_golden_core::{Error, Result};

/// `chrono` format of run directory names.
pub const RUN_DIR_FORMAT: &str = "%Y%m%d_%H%M%S";

lazy_static! {
    static ref RUN_DIR_NAME: Regex = Regex::new(r"^\d{8}_\d{6}$").unwrap();
}

/// Parse a run directory name into its timestamp.
pub fn parse_run_dir_name(name: &str) -> Option<NaiveDateTime> {
    if !RUN_DIR_NAME.is_match(name) {
        return None;
    }
    NaiveDateTime::parse_from_str(name, RUN_DIR_FORMAT).ok()
}

/// Existing run directories, oldest first.
///
/// Entries whose names do not follow the timestamp pattern are ignored.
pub fn run_directories(results_dir: &Path) -> Result<Vec<(NaiveDateTime, PathBuf)>> {
    let mut runs = Vec::new();
    if !results_dir.is_dir() {
        return Ok(runs);
    }
    for entry in std::fs::read_dir(results_dir)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let stamp = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(parse_run_dir_name);
        if let Some(stamp) = stamp {
            runs.push((stamp, path));
        }
    }
    runs.sort();
    Ok(runs)
}

/// Keeps at most `limit` run directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    limit: usize,
}

impl RetentionPolicy {
    /// Create a policy. A limit of zero is treated as one (the new run).
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
        }
    }

    /// Configured limit.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Delete the oldest run directories to make room for one more.
    ///
    /// With `count >= limit` existing directories, the oldest
    /// `count - limit + 1` are removed. Returns the deleted paths.
    pub fn apply(&self, results_dir: &Path) -> Result<Vec<PathBuf>> {
        let runs = run_directories(results_dir)?;
        if runs.len() < self.limit {
            debug!(
                "{} run directories, limit {}: nothing to delete",
                runs.len(),
                self.limit
            );
            return Ok(Vec::new());
        }

        let excess = runs.len() - self.limit + 1;
        let mut deleted = Vec::with_capacity(excess);
        for (_, path) in runs.into_iter().take(excess) {
            info!("Deleting old run directory {}", path.display());
            std::fs::remove_dir_all(&path)?;
            deleted.push(path);
        }
        Ok(deleted)
    }

    /// Apply the policy, then create the run directory for `started`.
    pub fn start_run(&self, results_dir: &Path, started: NaiveDateTime) -> Result<PathBuf> {
        self.apply(results_dir)?;
        create_run_dir(results_dir, started)
    }
}

/// Create `results_dir/<timestamp>`.
///
/// The new directory always sorts after every existing run directory: if
/// `started` is not later than the newest one, the next second after it is
/// used instead.
pub fn create_run_dir(results_dir: &Path, started: NaiveDateTime) -> Result<PathBuf> {
    std::fs::create_dir_all(results_dir)?;
    let mut stamp = match run_directories(results_dir)?.last() {
        Some((latest, _)) if *latest >= started => *latest + chrono::Duration::seconds(1),
        _ => started,
    };
    for _ in 0..60 {
        let path = results_dir.join(stamp.format(RUN_DIR_FORMAT).to_string());
        match std::fs::create_dir(&path) {
            Ok(()) => {
                info!("Created run directory {}", path.display());
                return Ok(path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                stamp += chrono::Duration::seconds(1);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(Error::Config(format!(
        "no free run directory name in {}",
        results_dir.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_parse_run_dir_name() {
        assert_eq!(parse_run_dir_name("20240301_120000"), Some(at(1, 12)));
        assert!(parse_run_dir_name("20240301-120000").is_none());
        assert!(parse_run_dir_name("20241301_120000").is_none());
        assert!(parse_run_dir_name("latest").is_none());
    }

    #[test]
    fn test_five_runs_limit_two() {
        let dir = tempfile::tempdir().unwrap();
        for day in [5, 1, 4, 2, 3] {
            let name = at(day, 10).format(RUN_DIR_FORMAT).to_string();
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }
        std::fs::create_dir(dir.path().join("keep-me")).unwrap();

        let policy = RetentionPolicy::new(2);
        let deleted = policy.apply(dir.path()).unwrap();
        assert_eq!(deleted.len(), 4);

        let new_run = create_run_dir(dir.path(), at(6, 10)).unwrap();
        assert!(new_run.ends_with("20240306_100000"));
        assert_eq!(
            names(dir.path()),
            vec!["20240305_100000", "20240306_100000", "keep-me"]
        );
    }

    #[test]
    fn test_below_limit_deletes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        create_run_dir(dir.path(), at(1, 10)).unwrap();
        assert!(RetentionPolicy::new(3).apply(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_start_run_keeps_total_at_limit() {
        let dir = tempfile::tempdir().unwrap();
        let policy = RetentionPolicy::new(3);
        for day in 1..=6 {
            policy.start_run(dir.path(), at(day, 8)).unwrap();
            assert!(run_directories(dir.path()).unwrap().len() <= 3);
        }
        let remaining: Vec<NaiveDateTime> = run_directories(dir.path())
            .unwrap()
            .into_iter()
            .map(|(stamp, _)| stamp)
            .collect();
        assert_eq!(remaining, vec![at(4, 8), at(5, 8), at(6, 8)]);
    }

    #[test]
    fn test_clock_behind_newest_run() {
        let dir = tempfile::tempdir().unwrap();
        create_run_dir(dir.path(), at(5, 10)).unwrap();
        let next = create_run_dir(dir.path(), at(1, 10)).unwrap();
        assert!(next.ends_with("20240305_100001"));
    }

    #[test]
    fn test_same_second_gets_next_name() {
        let dir = tempfile::tempdir().unwrap();
        let first = create_run_dir(dir.path(), at(1, 10)).unwrap();
        let second = create_run_dir(dir.path(), at(1, 10)).unwrap();
        assert_ne!(first, second);
        assert!(second.ends_with("20240301_100001"));
    }

    #[test]
    fn test_missing_results_dir_has_no_runs() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run_directories(&dir.path().join("absent")).unwrap().is_empty());
    }
}
