//! Retry options and executor

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use spotter_config::{RetryConfig, RetryMode};
use spotter_core::NormalizedError;
use spotter_logging::CallLogger;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::backoff::BackoffCalculator;
use crate::classify::{classify, should_retry_error, ClassifyContext};
use crate::liveness::Liveness;
use crate::state::{CallAttemptState, CallEvent, CallObserver};
use crate::timeout::{sleep, with_timeout};

/// Context used when a call doesn't name one
pub const DEFAULT_CONTEXT: &str = "api-call";

/// Retry options for one executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryOptions {
    /// Total attempts including the first; 0 is treated as 1
    pub max_attempts: u32,

    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,

    pub backoff_multiplier: f64,

    /// Per-attempt timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub max_delay: Option<Duration>,

    pub mode: RetryMode,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
            timeout: Duration::from_secs(30),
            max_delay: None,
            mode: RetryMode::Always,
        }
    }
}

impl From<&RetryConfig> for RetryOptions {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: config.base_delay,
            backoff_multiplier: config.backoff_multiplier,
            timeout: config.timeout,
            max_delay: config.max_delay,
            mode: config.mode,
        }
    }
}

impl From<RetryConfig> for RetryOptions {
    fn from(config: RetryConfig) -> Self {
        Self::from(&config)
    }
}

/// Per-call overrides; unset fields keep the executor's value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetryOverrides {
    pub max_attempts: Option<u32>,
    pub base_delay: Option<Duration>,
    pub backoff_multiplier: Option<f64>,
    pub timeout: Option<Duration>,
    pub max_delay: Option<Duration>,
    pub mode: Option<RetryMode>,
}

impl RetryOverrides {
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = Some(base_delay);
        self
    }

    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = Some(multiplier);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    pub fn mode(mut self, mode: RetryMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Merge onto `base`
    pub fn apply(&self, base: &RetryOptions) -> RetryOptions {
        RetryOptions {
            max_attempts: self.max_attempts.unwrap_or(base.max_attempts),
            base_delay: self.base_delay.unwrap_or(base.base_delay),
            backoff_multiplier: self.backoff_multiplier.unwrap_or(base.backoff_multiplier),
            timeout: self.timeout.unwrap_or(base.timeout),
            max_delay: self.max_delay.or(base.max_delay),
            mode: self.mode.unwrap_or(base.mode),
        }
    }
}

/// Options for a single `execute` on a [`CallHandle`](crate::CallHandle)
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub retry: RetryOverrides,
    pub context: Option<String>,
}

impl CallOptions {
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryOverrides) -> Self {
        self.retry = retry;
        self
    }

    pub fn context_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.context.as_deref().unwrap_or(default)
    }
}

/// Runs an operation with per-attempt timeout and exponential backoff,
/// reporting each step to a [`CallLogger`]
#[derive(Clone)]
pub struct RetryExecutor {
    options: RetryOptions,
    logger: Arc<dyn CallLogger>,
}

impl std::fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryOptions::default())
    }
}

impl RetryExecutor {
    /// Executor reporting to the process-wide call logger
    pub fn new(options: RetryOptions) -> Self {
        Self::with_logger(options, spotter_logging::call_logger_or_tracing())
    }

    pub fn with_logger(options: RetryOptions, logger: Arc<dyn CallLogger>) -> Self {
        Self { options, logger }
    }

    pub fn from_config(config: &RetryConfig, logger: Arc<dyn CallLogger>) -> Self {
        Self::with_logger(RetryOptions::from(config), logger)
    }

    pub fn options(&self) -> &RetryOptions {
        &self.options
    }

    pub fn logger(&self) -> &Arc<dyn CallLogger> {
        &self.logger
    }

    /// Copy of this executor with `overrides` merged onto its options
    pub fn with_overrides(&self, overrides: &RetryOverrides) -> Self {
        Self {
            options: overrides.apply(&self.options),
            logger: self.logger.clone(),
        }
    }

    /// Execute `operation` without an observer
    pub async fn execute<T, F, Fut, E>(
        &self,
        context: &str,
        operation: F,
    ) -> Result<T, NormalizedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<anyhow::Error>,
    {
        self.execute_observed(context, operation, &(), &Liveness::new())
            .await
    }

    /// Execute `operation`, reporting progress to `observer` while
    /// `liveness` is alive.
    ///
    /// Attempts run strictly one after another. The returned error is the
    /// classified failure of the last attempt made.
    pub async fn execute_observed<T, F, Fut, E, O>(
        &self,
        context: &str,
        mut operation: F,
        observer: &O,
        liveness: &Liveness,
    ) -> Result<T, NormalizedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<anyhow::Error>,
        O: CallObserver<T> + ?Sized,
    {
        let options = &self.options;
        let max_attempts = options.max_attempts.max(1);
        let backoff = BackoffCalculator::new(
            options.base_delay,
            options.backoff_multiplier,
            options.max_delay,
        );
        let classify_ctx = ClassifyContext::new(context);

        let call_id = self.logger.log_call_start(context);
        let mut attempt_state = CallAttemptState::new(max_attempts);
        notify(observer, liveness, CallEvent::Started);

        loop {
            attempt_state.attempt_number += 1;
            let attempt = attempt_state.attempt_number;

            notify(observer, liveness, CallEvent::Attempting(&attempt_state));
            if attempt > 1 {
                self.logger.log_retry(
                    call_id,
                    attempt,
                    max_attempts,
                    attempt_state.last_error.as_ref(),
                );
            }
            debug!("{}: attempt {}/{}", context, attempt, max_attempts);

            let error = match with_timeout(operation(), options.timeout).await {
                Ok(Ok(value)) => {
                    if attempt > 1 {
                        info!(
                            "{}: succeeded on attempt {}/{}",
                            context, attempt, max_attempts
                        );
                    }
                    self.logger
                        .log_success(call_id, Some(json!({ "attempts": attempt })));
                    notify(observer, liveness, CallEvent::Succeeded(&value));
                    return Ok(value);
                }
                Ok(Err(error)) => error.into(),
                Err(timeout) => anyhow::Error::new(timeout),
            };

            let normalized = classify(error, &classify_ctx);
            let retryable = match options.mode {
                RetryMode::Always => true,
                RetryMode::TransientOnly => should_retry_error(&normalized),
            };

            if attempt_state.is_final() || !retryable {
                warn!(
                    "{}: failed after {} attempt(s): {}",
                    context, attempt, normalized
                );
                self.logger.log_failure(call_id, &normalized);
                notify(observer, liveness, CallEvent::Failed(&normalized));
                return Err(normalized);
            }

            let delay = backoff.delay_for_attempt(attempt);
            let message = format!(
                "Attempt {}/{} failed. Retrying in {}ms...",
                attempt,
                max_attempts,
                delay.as_millis()
            );
            debug!("{}: {} ({})", context, message, normalized);

            attempt_state.last_error = Some(normalized);
            notify(
                observer,
                liveness,
                CallEvent::RetryWait {
                    attempt: &attempt_state,
                    delay,
                    message,
                },
            );

            sleep(delay).await;
            attempt_state.elapsed_delay += delay;
        }
    }
}

fn notify<T, O>(observer: &O, liveness: &Liveness, event: CallEvent<'_, T>)
where
    O: CallObserver<T> + ?Sized,
{
    if liveness.is_alive() {
        observer.observe(event);
    }
}
