//! Bounded retry with capped exponential backoff.
//!
//! A failed call is retried only when the classifier says so. Business,
//! validation, authorisation and state rejections are final on the first
//! occurrence; everything else (transport failures, 5xx, rate limiting) is
//! treated as transient.
//!
//! ```text
//! delay(attempt) = min(base_delay * 2^attempt, cap_delay)     attempt = 0, 1, ...
//! ```

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::service::{ErrorCode, ServiceError};

/// Codes that are never retried unless configured otherwise.
pub const DEFAULT_FATAL_CODES: [ErrorCode; 5] = [
    ErrorCode::WalletLimitExceeded,
    ErrorCode::InvalidInput,
    ErrorCode::StateError,
    ErrorCode::NotFound,
    ErrorCode::Unauthorized,
];

/// Retry budget and backoff curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt; the call runs at most `max_retries + 1` times.
    pub max_retries: u32,
    /// Delay before the first retry.
    #[serde(with = "millis")]
    pub base_delay: Duration,
    /// Upper bound for any single backoff delay.
    #[serde(with = "millis")]
    pub cap_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
            cap_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt + 1`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(self.cap_delay)
            .min(self.cap_delay)
    }
}

/// Decides whether a failure is worth another attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorClassifier {
    fatal: HashSet<ErrorCode>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_FATAL_CODES)
    }
}

impl ErrorClassifier {
    pub fn new(fatal: impl IntoIterator<Item = ErrorCode>) -> Self {
        Self {
            fatal: fatal.into_iter().collect(),
        }
    }

    /// Failures without a code are infrastructure failures and always retryable.
    pub fn is_retryable(&self, err: &ServiceError) -> bool {
        match err.code() {
            Some(code) => !self.fatal.contains(&code),
            None => true,
        }
    }

    pub fn is_fatal(&self, err: &ServiceError) -> bool {
        !self.is_retryable(err)
    }
}

/// Run `op` until it succeeds, fails fatally, or the retry budget is spent.
///
/// `operation` is only used to label log lines.
pub async fn with_retry<T, F, Fut, P>(
    policy: &RetryPolicy,
    is_retryable: P,
    operation: &str,
    mut op: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
    P: Fn(&ServiceError) -> bool,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(operation, retries = attempt, "call recovered after retry");
                }
                return Ok(value);
            }
            Err(err) if !is_retryable(&err) => {
                warn!(operation, error = %err, "non-retryable failure");
                return Err(err);
            }
            Err(err) if attempt >= policy.max_retries => {
                warn!(operation, attempts = attempt + 1, error = %err, "retry budget exhausted");
                return Err(err);
            }
            Err(err) => {
                let delay = policy.backoff(attempt);
                warn!(
                    operation,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, backing off"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// A [`RetryPolicy`] bundled with the [`ErrorClassifier`] it consults.
#[derive(Debug, Clone, Default)]
pub struct Retrier {
    pub policy: RetryPolicy,
    pub classifier: ErrorClassifier,
}

impl Retrier {
    pub fn new(policy: RetryPolicy, classifier: ErrorClassifier) -> Self {
        Self { policy, classifier }
    }

    pub async fn run<T, F, Fut>(&self, operation: &str, op: F) -> Result<T, ServiceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        with_retry(
            &self.policy,
            |err| self.classifier.is_retryable(err),
            operation,
            op,
        )
        .await
    }
}

/// Serialise a `Duration` as whole milliseconds in config files.
pub(crate) mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
