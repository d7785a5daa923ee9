//! Sequencing of a validation run.
//!
//! A run moves through `Filter -> Construct -> Execute -> Compare & Collect`
//! over an already loaded [`Environment`]; reporting is a separate step so a
//! reporting failure cannot lose the computed results.
//!
//! Tests run strictly one after another, in name order. The processing tool
//! keeps process-wide caches and global configuration that are not safe to
//! share between concurrent invocations.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tempfile::TempDir;
use tracing::{debug, error, info, instrument, warn};

use geo_golden_core::{DatasetReader, Error, ErrorPhase, Result, TestDefinition, TestResult};
use geo_golden_engine::{BuiltCommand, CommandBuilder, Comparator, ProcessingTool, ToolRunner};

use crate::environment::Environment;
use crate::filter::TestFilter;
use crate::report::{ReportFiles, RunReport};
use crate::retention::{RetentionPolicy, RUN_DIR_FORMAT};

/// Products of the run that are kept on disk.
pub const PRODUCTS_DIR: &str = "products";

/// Outcome of a run before reporting.
#[derive(Debug)]
pub struct RunOutcome {
    /// Aggregated results
    pub report: RunReport,
    /// Run directory; `None` when no test was selected
    pub run_dir: Option<PathBuf>,
}

impl RunOutcome {
    /// Whether any test was executed.
    pub fn is_empty(&self) -> bool {
        self.report.results.is_empty()
    }

    /// Write the report into the run directory.
    pub fn write_report(&self) -> Result<Option<ReportFiles>> {
        match &self.run_dir {
            Some(dir) => self.report.write(dir).map(Some),
            None => Ok(None),
        }
    }
}

/// A test after construction.
struct PreparedTest<'a> {
    definition: &'a TestDefinition,
    scratch: Option<TempDir>,
    command: Result<BuiltCommand>,
}

/// Runs the selected tests of an environment.
pub struct Orchestrator {
    environment: Environment,
    runner: ToolRunner,
    reader: Arc<dyn DatasetReader>,
    comparator: Comparator,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("environment", &self.environment.root())
            .field("runner", &self.runner)
            .field("comparator", &self.comparator)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Create an orchestrator. The tool deadline comes from the environment configuration.
    pub fn new(
        environment: Environment,
        tool: Arc<dyn ProcessingTool>,
        reader: Arc<dyn DatasetReader>,
    ) -> Self {
        let runner = ToolRunner::new(tool).with_timeout(environment.config().tool_timeout());
        Self {
            environment,
            runner,
            reader,
            comparator: Comparator::new(),
        }
    }

    /// Replace the comparator.
    pub fn with_comparator(mut self, comparator: Comparator) -> Self {
        self.comparator = comparator;
        self
    }

    /// Override the configured tool deadline.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.runner = self.runner.with_timeout(timeout);
        self
    }

    /// The loaded environment.
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Run every test selected by `filter`.
    ///
    /// Construction and execution problems end up in the results of their
    /// test. Failures to prepare the run directory, and any initialization or
    /// reporting error raised while a test runs, abort the run.
    #[instrument(skip_all, fields(filter = %filter))]
    pub async fn run(&self, filter: &TestFilter) -> Result<RunOutcome> {
        let started = Local::now();
        let definitions = self.environment.definitions();

        // Filter
        let selected = filter.select(definitions);
        info!(
            "Selected {} of {} tests ({})",
            selected.len(),
            definitions.len(),
            filter
        );

        let report = |results| {
            RunReport::new(
                started.to_rfc3339(),
                self.environment.root().to_path_buf(),
                filter,
                definitions.len(),
                results,
            )
        };

        if selected.is_empty() {
            warn!("No tests executed ({})", filter);
            return Ok(RunOutcome {
                report: report(Vec::new()),
                run_dir: None,
            });
        }

        let policy = RetentionPolicy::new(self.environment.config().rolling_results);
        let run_dir = policy.start_run(&self.environment.results_dir(), started.naive_local())?;
        let products_dir = run_dir.join(PRODUCTS_DIR);
        std::fs::create_dir_all(&products_dir)?;
        debug!(
            "Run directory {} ({})",
            run_dir.display(),
            started.format(RUN_DIR_FORMAT)
        );

        // Construct
        let prepared: Vec<PreparedTest<'_>> =
            selected.into_iter().map(|d| self.construct(d)).collect();

        // Execute, then Compare & Collect
        let mut results = Vec::with_capacity(prepared.len());
        for test in prepared {
            results.push(self.execute(test, &products_dir).await?);
        }

        let report = report(results);
        info!("{}", report.summary());
        Ok(RunOutcome {
            report,
            run_dir: Some(run_dir),
        })
    }

    #[instrument(skip_all, fields(test = %definition.name))]
    fn construct<'a>(&self, definition: &'a TestDefinition) -> PreparedTest<'a> {
        let scratch = tempfile::Builder::new()
            .prefix(&format!("geo-golden-{}-", definition.name))
            .tempdir();

        let (scratch, command) = match scratch {
            Ok(dir) => {
                let command = CommandBuilder::new(self.environment.command_context()).build(
                    &definition.name,
                    &definition.command_template,
                    dir.path(),
                );
                (Some(dir), command)
            }
            Err(e) => (None, Err(Error::from(e))),
        };

        if let Err(e) = &command {
            error!("Cannot construct command for '{}': {}", definition.name, e);
        }

        PreparedTest {
            definition,
            scratch,
            command,
        }
    }

    #[instrument(skip_all, fields(test = %test.definition.name))]
    async fn execute(&self, test: PreparedTest<'_>, products_dir: &Path) -> Result<TestResult> {
        let PreparedTest {
            definition,
            scratch,
            command,
        } = test;
        let mut result = TestResult::new(&definition.name, definition.description.clone());

        let (command, scratch) = match (command, scratch) {
            (Ok(command), Some(scratch)) => (command, scratch),
            (Err(e), _) => {
                record(&mut result, e)?;
                return Ok(result);
            }
            (Ok(_), None) => {
                record(&mut result, Error::Execution("no scratch directory".to_string()))?;
                return Ok(result);
            }
        };

        info!("Running test '{}'", definition.name);
        let execution = self.runner.run(command.args.clone()).await;
        result.duration = execution.duration;

        match execution.error {
            Some(e) => record(&mut result, e)?,
            None => match self.reader.open(&command.target_path) {
                Ok(dataset) => {
                    let violations = self
                        .comparator
                        .compare(dataset.as_ref(), &definition.expectation);
                    result.record_violations(violations);
                }
                Err(e) => record(&mut result, e)?,
            },
        }

        self.collect(&mut result, scratch, &command, products_dir)?;
        info!("Test '{}': {}", definition.name, result.status());
        Ok(result)
    }

    /// Delete or retain the scratch output of one test.
    fn collect(
        &self,
        result: &mut TestResult,
        scratch: TempDir,
        command: &BuiltCommand,
        products_dir: &Path,
    ) -> Result<()> {
        if result.is_success() && self.environment.config().delete_result_after_success {
            debug!("Discarding output of '{}'", result.test_name);
            if let Err(e) = scratch.close() {
                warn!("Cannot remove scratch directory: {}", e);
            }
            result.target_path = None;
            return Ok(());
        }

        match copy_tree(scratch.path(), products_dir) {
            Ok(replaced) => {
                for path in replaced {
                    warn!(
                        "Output of '{}' overwrote {} from an earlier test",
                        result.test_name,
                        path.display()
                    );
                }
            }
            Err(e) => {
                error!("Cannot retain output of '{}': {}", result.test_name, e);
                return record(result, e);
            }
        }

        let retained = command
            .target_path
            .file_name()
            .map(|name| products_dir.join(name))
            .filter(|path| path.exists());
        result.target_path = retained;
        Ok(())
    }
}

/// Attach a per-test error to `result`.
///
/// Construction and execution errors stay with the test; initialization and
/// reporting errors are returned to abort the run.
fn record(result: &mut TestResult, error: Error) -> Result<()> {
    match error.phase() {
        ErrorPhase::Construction | ErrorPhase::Execution => {
            result.record_exception(&error);
            Ok(())
        }
        ErrorPhase::Initialization | ErrorPhase::Reporting => {
            error!("Aborting run at test '{}': {}", result.test_name, error);
            Err(error)
        }
    }
}

/// Copy the contents of `from` into `to`, recursively.
///
/// Returns the files that already existed in `to` and were replaced.
fn copy_tree(from: &Path, to: &Path) -> Result<Vec<PathBuf>> {
    let mut replaced = Vec::new();
    copy_tree_into(from, to, &mut replaced)?;
    Ok(replaced)
}

fn copy_tree_into(from: &Path, to: &Path, replaced: &mut Vec<PathBuf>) -> Result<()> {
    std::fs::create_dir_all(to)?;
    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree_into(&entry.path(), &target, replaced)?;
        } else {
            if target.exists() {
                replaced.push(target.clone());
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
