//! Bounded retry with exponential backoff and jitter.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::data_source::{SourceError, TransportFailure};
use crate::http_client::{HttpClient, HttpErrorKind, HttpRequest, HttpResponse};
use crate::ProviderId;

/// Backoff strategy for retrying failed requests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "strategy")]
pub enum Backoff {
    /// Uses a fixed delay between retries.
    Fixed {
        #[serde(with = "duration_ms", rename = "delay_ms")]
        delay: Duration,
    },
    /// `base * factor^attempt`, capped at `max`, optionally with +/- 50% jitter.
    Exponential {
        #[serde(with = "duration_ms", rename = "base_ms")]
        base: Duration,
        factor: f64,
        #[serde(with = "duration_ms", rename = "max_ms")]
        max: Duration,
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base: Duration::from_millis(200),
            factor: 2.0,
            max: Duration::from_secs(3),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (0-based).
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay } => delay,
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let scale = factor.powi(attempt as i32);
                let seconds = (base.as_secs_f64() * scale).min(max.as_secs_f64());
                let delay = Duration::from_secs_f64(seconds);
                if !jitter {
                    return delay;
                }

                let millis = delay.as_millis() as u64;
                let spread = millis / 2;
                let offset = fastrand::u64(0..=(spread * 2));
                Duration::from_millis((millis + offset).saturating_sub(spread))
            }
        }
    }
}

/// Retry policy applied to every provider call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub enabled: bool,
    /// Total attempts = `max_retries + 1`.
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 2,
            backoff: Backoff::default(),
        }
    }
}

impl RetryConfig {
    pub fn exponential(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn fixed(delay: Duration, max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Fixed { delay },
            ..Self::default()
        }
    }

    pub fn no_retry() -> Self {
        Self {
            enabled: false,
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn max_attempts(&self) -> u32 {
        if self.enabled {
            self.max_retries.saturating_add(1)
        } else {
            1
        }
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }
}

/// Execute `request`, retrying timeouts, connection failures and 5xx responses.
///
/// Any other non-2xx status, and any request the client could not build,
/// fails immediately as a non-retryable transport error.
pub async fn send_with_retry(
    client: &dyn HttpClient,
    request: &HttpRequest,
    retry: &RetryConfig,
    provider: ProviderId,
) -> Result<HttpResponse, SourceError> {
    let max_attempts = retry.max_attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;
        let error = match client.execute(request.clone()).await {
            Ok(response) if response.is_success() => return Ok(response),
            Ok(response) => SourceError::transport(
                provider,
                TransportFailure::HttpStatus(response.status),
                format!("{} returned HTTP {}", request.url, response.status),
            ),
            Err(error) => {
                let failure = match error.kind() {
                    HttpErrorKind::Timeout => TransportFailure::Timeout,
                    HttpErrorKind::Connection => TransportFailure::Connection,
                    HttpErrorKind::Other => TransportFailure::Request,
                };
                SourceError::transport(provider, failure, error.message())
            }
        };

        if !error.retryable() || attempt >= max_attempts {
            tracing::warn!(
                provider = %provider,
                url = %request.url,
                attempt,
                retryable = error.retryable(),
                "request failed: {error}"
            );
            return Err(error);
        }

        let delay = retry.delay_for_attempt(attempt - 1);
        tracing::debug!(
            provider = %provider,
            url = %request.url,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "retrying after transient failure: {error}"
        );
        tokio::time::sleep(delay).await;
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
