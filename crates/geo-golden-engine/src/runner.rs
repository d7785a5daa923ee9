//! Invocation of the external processing tool.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use geo_golden_core::{Error, Result};

/// The external processing tool.
///
/// Implementations run one processing request per call. They may keep large
/// process-wide caches between calls; `reclaim_caches` releases them.
pub trait ProcessingTool: Send + Sync {
    /// Tool name for logging.
    fn name(&self) -> &str;

    /// Run the tool with a complete argument vector (first element is the executable).
    ///
    /// Long-running implementations should poll `cancel` and return once it
    /// is set. The runner waits for this call to return before it reclaims
    /// caches or starts another invocation.
    fn process(&self, args: &[String], cancel: &Cancellation) -> Result<()>;

    /// Release heavyweight native caches retained across invocations.
    fn reclaim_caches(&self) {}
}

/// Cancellation flag shared between the runner and one invocation.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    cancelled: Arc<AtomicBool>,
}

impl Cancellation {
    /// Create an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the invocation to stop.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Outcome of one tool invocation.
#[derive(Debug)]
pub struct Execution {
    /// Wall-clock time of the invocation
    pub duration: Duration,
    /// Failure, if the invocation did not complete successfully
    pub error: Option<Error>,
}

impl Execution {
    /// Whether the invocation completed without error.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs the processing tool once per test.
///
/// Failures (including panics and deadline expiry) are captured in the
/// returned [`Execution`] and never propagated, so one misbehaving test cannot
/// abort a batch. An invocation has always ended when `run` returns, so
/// invocations never overlap.
#[derive(Clone)]
pub struct ToolRunner {
    tool: Arc<dyn ProcessingTool>,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for ToolRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRunner")
            .field("tool", &self.tool.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ToolRunner {
    /// Create a runner without a deadline.
    pub fn new(tool: Arc<dyn ProcessingTool>) -> Self {
        Self {
            tool,
            timeout: None,
        }
    }

    /// Set the per-invocation deadline.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configured deadline.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Invoke the tool with the given arguments.
    ///
    /// On deadline expiry the invocation is cancelled and awaited; the result
    /// is a timeout whatever the tool returns afterwards. Cache reclamation
    /// runs after every invocation, whatever its outcome.
    pub async fn run(&self, args: Vec<String>) -> Execution {
        info!("Invoking {}: {}", self.tool.name(), args.join(" "));
        let start = Instant::now();

        let tool = Arc::clone(&self.tool);
        let cancel = Cancellation::new();
        let token = cancel.clone();
        let mut task = tokio::task::spawn_blocking(move || tool.process(&args, &token));

        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut task).await {
                Ok(joined) => joined,
                Err(_) => {
                    error!(
                        "{} timed out after {:?}, cancelling",
                        self.tool.name(),
                        limit
                    );
                    cancel.cancel();
                    match task.await {
                        Ok(Ok(())) => debug!("{} completed after its deadline", self.tool.name()),
                        Ok(Err(e)) => debug!("{} stopped: {}", self.tool.name(), e),
                        Err(e) => warn!("{} task failed after cancellation: {}", self.tool.name(), e),
                    }
                    Ok(Err(Error::Timeout(limit.as_millis() as u64)))
                }
            },
            None => task.await,
        };

        let error = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => {
                error!("{} failed: {}", self.tool.name(), e);
                Some(e)
            }
            Err(e) => {
                error!("{} task panicked: {}", self.tool.name(), e);
                Some(Error::Execution(format!("tool task failed: {e}")))
            }
        };

        let duration = start.elapsed();
        debug!("Reclaiming {} caches", self.tool.name());
        self.tool.reclaim_caches();

        if error.is_none() {
            info!("{} finished in {:?}", self.tool.name(), duration);
        } else {
            warn!("{} finished with failure in {:?}", self.tool.name(), duration);
        }

        Execution { duration, error }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTool {
        calls: Mutex<Vec<Vec<String>>>,
        reclaimed: AtomicUsize,
        fail: bool,
        panic: bool,
        /// Sleeps this long, stopping early when cancelled
        sleep: Option<Duration>,
        /// Sleeps this long and ignores cancellation
        stubborn: Option<Duration>,
        active: AtomicUsize,
        max_active: AtomicUsize,
        reclaimed_while_active: AtomicUsize,
    }

    impl ProcessingTool for RecordingTool {
        fn name(&self) -> &str {
            "recording"
        }

        fn process(&self, args: &[String], cancel: &Cancellation) -> Result<()> {
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(active, Ordering::SeqCst);
            self.calls.lock().unwrap().push(args.to_vec());

            if let Some(sleep) = self.sleep {
                let until = Instant::now() + sleep;
                while Instant::now() < until && !cancel.is_cancelled() {
                    std::thread::sleep(Duration::from_millis(5));
                }
            }
            if let Some(sleep) = self.stubborn {
                std::thread::sleep(sleep);
            }

            self.active.fetch_sub(1, Ordering::SeqCst);
            if self.panic {
                panic!("native crash");
            }
            if self.fail || cancel.is_cancelled() {
                return Err(Error::Execution("exit status 1".to_string()));
            }
            Ok(())
        }

        fn reclaim_caches(&self) {
            if self.active.load(Ordering::SeqCst) > 0 {
                self.reclaimed_while_active.fetch_add(1, Ordering::SeqCst);
            }
            self.reclaimed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_successful_run() {
        let tool = Arc::new(RecordingTool::default());
        let runner = ToolRunner::new(tool.clone());

        let execution = runner.run(vec!["gpt".to_string(), "-h".to_string()]).await;

        assert!(execution.is_success());
        assert_eq!(tool.calls.lock().unwrap()[0], vec!["gpt", "-h"]);
        assert_eq!(tool.reclaimed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_captured_and_caches_reclaimed() {
        let tool = Arc::new(RecordingTool {
            fail: true,
            ..Default::default()
        });
        let runner = ToolRunner::new(tool.clone());

        let execution = runner.run(vec!["gpt".to_string()]).await;

        assert!(matches!(execution.error, Some(Error::Execution(_))));
        assert_eq!(tool.reclaimed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panic_is_captured() {
        let tool = Arc::new(RecordingTool {
            panic: true,
            ..Default::default()
        });
        let runner = ToolRunner::new(tool.clone());

        let execution = runner.run(vec!["gpt".to_string()]).await;

        assert!(matches!(execution.error, Some(Error::Execution(_))));
        assert_eq!(tool.reclaimed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_cancels_invocation() {
        let tool = Arc::new(RecordingTool {
            sleep: Some(Duration::from_secs(5)),
            ..Default::default()
        });
        let runner = ToolRunner::new(tool.clone()).with_timeout(Some(Duration::from_millis(20)));

        let execution = runner.run(vec!["gpt".to_string()]).await;

        assert!(matches!(execution.error, Some(Error::Timeout(20))));
        assert!(execution.duration < Duration::from_secs(2));
        assert_eq!(tool.active.load(Ordering::SeqCst), 0);
        assert_eq!(tool.reclaimed.load(Ordering::SeqCst), 1);
        assert_eq!(tool.reclaimed_while_active.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_timed_out_invocations_never_overlap() {
        let tool = Arc::new(RecordingTool {
            stubborn: Some(Duration::from_millis(150)),
            ..Default::default()
        });
        let runner = ToolRunner::new(tool.clone()).with_timeout(Some(Duration::from_millis(30)));

        for _ in 0..3 {
            let execution = runner.run(vec!["gpt".to_string()]).await;
            assert!(matches!(execution.error, Some(Error::Timeout(30))));
            assert_eq!(tool.active.load(Ordering::SeqCst), 0);
        }

        assert_eq!(tool.calls.lock().unwrap().len(), 3);
        assert_eq!(tool.max_active.load(Ordering::SeqCst), 1);
        assert_eq!(tool.reclaimed_while_active.load(Ordering::SeqCst), 0);
        assert_eq!(tool.reclaimed.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_cancellation_is_shared_between_clones() {
        let cancel = Cancellation::new();
        let token = cancel.clone();
        assert!(!token.is_cancelled());
        cancel.cancel();
        assert!(token.is_cancelled());
    }
}
