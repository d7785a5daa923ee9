//! Subprocess-backed processing tool.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use tracing::{debug, warn};

use geo_golden_core::{Error, Result};
use geo_golden_engine::{Cancellation, ProcessingTool};

/// Lines of standard error kept in failure messages.
const STDERR_TAIL_LINES: usize = 20;

/// How often a running child is checked for exit and cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Runs every request as a child process and waits for it.
///
/// A cancelled invocation kills its child and reaps it before returning.
///
/// The first argument names the executable. When an explicit executable is
/// configured it replaces that first argument, so templates written for
/// `gpt` can be pointed at another installation.
#[derive(Debug, Clone)]
pub struct ProcessTool {
    executable: Option<PathBuf>,
    name: String,
}

impl ProcessTool {
    /// Create a tool, optionally overriding the executable.
    pub fn new(executable: Option<PathBuf>) -> Self {
        let name = executable
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "processing tool".to_string());
        Self { executable, name }
    }

    /// Executable override, if any.
    pub fn executable(&self) -> Option<&Path> {
        self.executable.as_deref()
    }
}

impl Default for ProcessTool {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ProcessingTool for ProcessTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, args: &[String], cancel: &Cancellation) -> Result<()> {
        let (first, rest) = args
            .split_first()
            .ok_or_else(|| Error::Execution("empty command line".to_string()))?;
        let program = self
            .executable
            .clone()
            .unwrap_or_else(|| PathBuf::from(first));

        debug!("Spawning {} with {} arguments", program.display(), rest.len());
        let mut child = Command::new(&program)
            .args(rest)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Execution(format!("cannot start {}: {e}", program.display())))?;

        // drained on its own thread so a chatty child cannot block on a full pipe
        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf);
                String::from_utf8_lossy(&buf).into_owned()
            })
        });

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if cancel.is_cancelled() {
                warn!("Killing {} (pid {})", program.display(), child.id());
                if let Err(e) = child.kill() {
                    debug!("Kill failed, child already exited: {}", e);
                }
                child.wait()?;
                return Err(Error::Execution(format!(
                    "{} was cancelled",
                    program.display()
                )));
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        if status.success() {
            return Ok(());
        }

        let stderr = stderr
            .and_then(|reader| reader.join().ok())
            .unwrap_or_default();
        let tail = stderr_tail(&stderr, STDERR_TAIL_LINES);
        let mut message = format!("{} exited with {}", program.display(), status);
        if !tail.is_empty() {
            message.push_str(":\n");
            message.push_str(&tail);
        }
        Err(Error::Execution(message))
    }
}

/// Last `lines` non-blank lines of `stderr`.
fn stderr_tail(stderr: &str, lines: usize) -> String {
    let all: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::time::Instant;

    use geo_golden_engine::ToolRunner;

    fn args(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn run(tool: &ProcessTool, words: &[&str]) -> Result<()> {
        tool.process(&args(words), &Cancellation::new())
    }

    #[test]
    fn test_stderr_tail() {
        let stderr = "one\n\ntwo\nthree\n  \nfour\n";
        assert_eq!(stderr_tail(stderr, 2), "three\nfour");
        assert_eq!(stderr_tail(stderr, 10), "one\ntwo\nthree\nfour");
        assert_eq!(stderr_tail("", 3), "");
    }

    #[test]
    fn test_name() {
        assert_eq!(ProcessTool::new(Some(PathBuf::from("/opt/snap/bin/gpt"))).name(), "gpt");
        assert_eq!(ProcessTool::default().name(), "processing tool");
    }

    #[test]
    fn test_empty_command_line() {
        let err = ProcessTool::default()
            .process(&[], &Cancellation::new())
            .unwrap_err();
        assert!(matches!(err, Error::Execution(_)));
    }

    #[test]
    fn test_missing_executable() {
        let err = run(&ProcessTool::default(), &["geo-golden-no-such-tool", "-h"]).unwrap_err();
        assert!(err.to_string().contains("cannot start geo-golden-no-such-tool"));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_status() {
        let tool = ProcessTool::default();
        run(&tool, &["sh", "-c", "exit 0"]).unwrap();

        let err = run(&tool, &["sh", "-c", "echo boom >&2; exit 3"]).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("exit status: 3"));
        assert!(message.ends_with("boom"));
    }

    #[cfg(unix)]
    #[test]
    fn test_executable_replaces_first_word() {
        let tool = ProcessTool::new(Some(PathBuf::from("sh")));
        run(&tool, &["gpt", "-c", "exit 0"]).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_cancel_kills_child() {
        let cancel = Cancellation::new();
        let trigger = cancel.clone();
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            trigger.cancel();
        });

        let start = Instant::now();
        let err = ProcessTool::default()
            .process(&args(&["sh", "-c", "sleep 30"]), &cancel)
            .unwrap_err();
        canceller.join().unwrap();

        assert!(err.to_string().contains("was cancelled"));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runner_deadline_stops_child() {
        let runner = ToolRunner::new(Arc::new(ProcessTool::default()))
            .with_timeout(Some(Duration::from_millis(100)));

        let execution = runner.run(args(&["sh", "-c", "sleep 30"])).await;

        assert!(matches!(execution.error, Some(Error::Timeout(100))));
        assert!(execution.duration < Duration::from_secs(10));
    }
}
