//! Command executor
//!
//! Runs one external command to completion under a timeout, captures both
//! output streams, and turns the exit code plus output into an
//! [`ExecutionResult`]. The executor never retries; wrap [`Executor::execute`]
//! in a `RecoveryManager` or `CircuitBreaker` for that.
//!
//! # Examples
//!
//! ```rust,no_run
//! use recur_core::executor::Executor;
//! use recur_domain::{ExecutorConfig, PatternConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let executor = Executor::new(ExecutorConfig {
//!     patterns: Some(PatternConfig::failure("FATAL")),
//!     ..Default::default()
//! })?;
//!
//! let argv = vec!["make".to_string(), "test".to_string()];
//! let result = executor.execute(&CancellationToken::new(), &argv).await?;
//! println!("{} ({})", result.success, result.reason);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod sink;

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use recur_domain::{EvaluationResult, ExecutionResult, ExecutorConfig};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub use error::ExecutorError;
pub use sink::{OutputSink, OutputStream, StdioSink};

use crate::pattern::PatternMatcher;

const STDERR_TAG: &str = "[stderr] ";

/// Runs commands according to an [`ExecutorConfig`]
#[derive(Clone)]
pub struct Executor {
    config: ExecutorConfig,
    timeout: Duration,
    matcher: Option<PatternMatcher>,
    sink: Arc<dyn OutputSink>,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("config", &self.config)
            .field("has_matcher", &self.matcher.is_some())
            .finish_non_exhaustive()
    }
}

impl Executor {
    /// Validate the configuration and compile its patterns.
    ///
    /// # Errors
    /// [`ExecutorError::InvalidConfig`] for a zero timeout and
    /// [`ExecutorError::Pattern`] for a pattern that does not compile.
    pub fn new(config: ExecutorConfig) -> Result<Self, ExecutorError> {
        if config.timeout_ms == 0 {
            return Err(ExecutorError::InvalidConfig("timeout must be greater than 0".into()));
        }

        let matcher = match &config.patterns {
            Some(patterns) => {
                Some(PatternMatcher::new(patterns)?).filter(PatternMatcher::has_patterns)
            }
            None => None,
        };

        Ok(Self {
            timeout: Duration::from_millis(config.timeout_ms),
            config,
            matcher,
            sink: Arc::new(StdioSink),
        })
    }

    /// Forward streamed lines to `sink` instead of the process's own stdio
    pub fn with_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `argv` once and evaluate the outcome.
    ///
    /// A command that exits non-zero is still `Ok`; inspect
    /// [`ExecutionResult::success`].
    ///
    /// # Errors
    /// - [`ExecutorError::InvalidArgument`] if `argv` is empty
    /// - [`ExecutorError::Spawn`] if the program cannot be started
    /// - [`ExecutorError::Timeout`] if the configured timeout elapses
    /// - [`ExecutorError::Cancelled`] if `ctx` is cancelled first
    /// - [`ExecutorError::Io`] if reading the output fails
    #[instrument(
        skip(self, ctx, argv),
        fields(program = argv.first().map(String::as_str).unwrap_or_default())
    )]
    pub async fn execute(
        &self,
        ctx: &CancellationToken,
        argv: &[String],
    ) -> Result<ExecutionResult, ExecutorError> {
        let Some((program, args)) = argv.split_first() else {
            return Err(ExecutorError::InvalidArgument("command must not be empty".into()));
        };
        if ctx.is_cancelled() {
            return Err(ExecutorError::Cancelled);
        }

        if self.config.verbose {
            info!(argv = ?argv, timeout_ms = self.config.timeout_ms, "executing command");
        } else {
            debug!(argv = ?argv, "executing command");
        }

        let started = Instant::now();
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExecutorError::Spawn { command: program.clone(), source })?;

        let forwarder = self.forwarder();
        let mut stdout_reader = match child.stdout.take() {
            Some(pipe) => tokio::spawn(capture(pipe, OutputStream::Stdout, forwarder.clone())),
            None => return Err(missing_pipe(OutputStream::Stdout)),
        };
        let mut stderr_reader = match child.stderr.take() {
            Some(pipe) => tokio::spawn(capture(pipe, OutputStream::Stderr, forwarder)),
            None => {
                stdout_reader.abort();
                return Err(missing_pipe(OutputStream::Stderr));
            }
        };

        let run = async {
            let status = child.wait().await?;
            let (stdout, stderr) = tokio::join!(&mut stdout_reader, &mut stderr_reader);
            Ok::<_, ExecutorError>((status, joined(stdout)?, joined(stderr)?))
        };

        let outcome = tokio::select! {
            () = ctx.cancelled() => Err(ExecutorError::Cancelled),
            finished = tokio::time::timeout(self.timeout, run) => match finished {
                Ok(result) => result,
                Err(_) => Err(ExecutorError::Timeout { timeout: self.timeout }),
            },
        };

        let (status, stdout, stderr) = match outcome {
            Ok(captured) => captured,
            Err(err) => {
                stdout_reader.abort();
                stderr_reader.abort();
                if let Err(kill_err) = child.kill().await {
                    warn!(error = %kill_err, "failed to kill interrupted command");
                }
                warn!(
                    error = %err,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "command interrupted"
                );
                return Err(err);
            }
        };

        let duration = started.elapsed();
        let raw_exit = exit_code(status);
        let evaluation = match &self.matcher {
            Some(matcher) => matcher.evaluate_result(&format!("{stdout}{stderr}"), raw_exit),
            None => EvaluationResult::from_exit_code(raw_exit),
        };

        if self.config.verbose {
            info!(
                exit_code = raw_exit,
                evaluated_exit_code = evaluation.exit_code,
                success = evaluation.success,
                reason = %evaluation.reason,
                duration_ms = duration.as_millis() as u64,
                "command finished"
            );
        } else {
            debug!(exit_code = raw_exit, success = evaluation.success, "command finished");
        }

        Ok(ExecutionResult::new(stdout, stderr, duration, evaluation))
    }

    fn forwarder(&self) -> Option<Forwarder> {
        if !self.config.streaming || self.config.quiet {
            return None;
        }
        Some(Forwarder {
            sink: Arc::clone(&self.sink),
            prefix: self.config.output_prefix.clone().map(Arc::from),
            tag_stderr: self.config.verbose,
        })
    }
}

/// Sink plus the decorations applied to each forwarded line
#[derive(Clone)]
struct Forwarder {
    sink: Arc<dyn OutputSink>,
    prefix: Option<Arc<str>>,
    tag_stderr: bool,
}

impl Forwarder {
    fn emit(&self, stream: OutputStream, raw: &[u8]) {
        let text = String::from_utf8_lossy(raw);
        let text = text.trim_end_matches(['\n', '\r']);
        let prefix = self.prefix.as_deref().unwrap_or_default();
        let tag = if self.tag_stderr && stream == OutputStream::Stderr { STDERR_TAG } else { "" };
        self.sink.write_line(stream, &format!("{prefix}{tag}{text}"));
    }
}

/// Read a pipe to the end, forwarding each line as it arrives
async fn capture<R>(
    pipe: R,
    stream: OutputStream,
    forward: Option<Forwarder>,
) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(pipe);
    let mut captured = Vec::new();
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }
        captured.extend_from_slice(&line);
        if let Some(forward) = &forward {
            forward.emit(stream, &line);
        }
    }

    Ok(String::from_utf8_lossy(&captured).into_owned())
}

fn joined(
    result: Result<std::io::Result<String>, tokio::task::JoinError>,
) -> Result<String, ExecutorError> {
    match result {
        Ok(captured) => Ok(captured?),
        Err(join_err) => Err(ExecutorError::Io(std::io::Error::other(join_err))),
    }
}

fn missing_pipe(stream: OutputStream) -> ExecutorError {
    ExecutorError::Io(std::io::Error::other(format!("{stream} was not captured")))
}

/// Exit code of a finished process; `-1` when it was ended by a signal
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
