//! Generic driver for Azure long-running operations.
//!
//! Several Azure AI services answer a submission request with `202 Accepted`
//! and an `Operation-Location` header instead of a result. The caller is then
//! expected to poll that location until the job reaches a terminal state.
//! [`poll_operation`] implements that loop once, with a bounded attempt
//! budget, a fixed pacing interval, and transparent retries for transient
//! transport errors, so the individual service clients only have to supply a
//! status-check closure.

use crate::ClientError;
use serde::Deserialize;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Status of a server-side asynchronous job.
///
/// The wire spellings cover the dialects used across the Azure AI surface:
/// the Read API and Document Intelligence report `notStarted`/`canceled`,
/// the dated Azure OpenAI image API reports `notRunning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationStatus {
    #[serde(alias = "notRunning")]
    NotStarted,
    Running,
    Succeeded,
    Failed,
    #[serde(rename = "canceled", alias = "cancelled")]
    Cancelled,
}

impl OperationStatus {
    /// Whether no further transition can occur from this status
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OperationStatus::NotStarted | OperationStatus::Running)
    }
}

/// Opaque reference to a submitted asynchronous job.
///
/// For the services in this crate it wraps the `Operation-Location` URL
/// returned by the submission request. Immutable once issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle(String);

impl OperationHandle {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extract a handle from the `Operation-Location` header of a submission
    /// response, failing if the header is absent or not valid text.
    pub fn from_response(response: &reqwest::Response) -> Result<Self, ClientError> {
        let value = response
            .headers()
            .get("Operation-Location")
            .ok_or_else(|| {
                ClientError::missing_field("submission response carried no Operation-Location header")
            })?;
        let location = value.to_str().map_err(|_| {
            ClientError::invalid_format("Operation-Location header is not valid UTF-8")
        })?;
        Ok(Self::new(location))
    }
}

impl fmt::Display for OperationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a single status check.
///
/// Mirrors [`OperationStatus`], carrying the typed result payload on
/// `Succeeded` and the service-reported reason on `Failed`/`Cancelled`.
#[derive(Debug)]
pub enum OperationState<T> {
    NotStarted,
    Running,
    Succeeded(T),
    Failed(Option<String>),
    Cancelled(Option<String>),
}

impl<T> OperationState<T> {
    pub fn status(&self) -> OperationStatus {
        match self {
            OperationState::NotStarted => OperationStatus::NotStarted,
            OperationState::Running => OperationStatus::Running,
            OperationState::Succeeded(_) => OperationStatus::Succeeded,
            OperationState::Failed(_) => OperationStatus::Failed,
            OperationState::Cancelled(_) => OperationStatus::Cancelled,
        }
    }
}

/// Pacing and budget for one polled operation.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Time to wait before the first status check
    pub initial_delay: Duration,
    /// Minimum time between consecutive status checks
    pub interval: Duration,
    /// Maximum number of observed statuses before giving up with a timeout
    pub max_attempts: u32,
    /// How many transient transport failures to absorb per status check
    pub transient_retries: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(2),
            interval: Duration::from_secs(1),
            max_attempts: 60,
            transient_retries: 2,
        }
    }
}

/// Drive an asynchronous job to completion.
///
/// Waits `initial_delay`, then repeatedly invokes `check` at `interval`
/// pacing until the job reports a terminal state or the attempt budget runs
/// out. Transient transport errors from a single check are retried up to
/// `transient_retries` times (still paced by `interval`) before being
/// surfaced; such retries do not count against `max_attempts`, which only
/// counts observed statuses.
///
/// Exactly one terminal outcome is ever returned:
/// - `Ok(result)` when the job succeeds,
/// - `ClientError::Operation` with kind `Failed`/`Cancelled` carrying the
///   service-reported reason,
/// - kind `TimedOut` when `max_attempts` statuses were all non-terminal,
/// - kind `Polling` when transient transport errors exhausted their budget.
///
/// Dropping the returned future abandons the poll; the remote job is not
/// affected.
pub async fn poll_operation<F, Fut, T>(config: &PollConfig, mut check: F) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<OperationState<T>, ClientError>>,
{
    if config.max_attempts == 0 {
        return Err(ClientError::operation_timed_out(0));
    }
    if !config.initial_delay.is_zero() {
        sleep(config.initial_delay).await;
    }

    let mut observed = 0u32;
    let mut transient_failures = 0u32;

    loop {
        match check().await {
            Ok(state) => {
                observed += 1;
                transient_failures = 0;
                debug!(attempt = observed, status = ?state.status(), "status check");

                match state {
                    OperationState::Succeeded(result) => return Ok(result),
                    OperationState::Failed(reason) => {
                        return Err(ClientError::operation_failed(
                            reason.unwrap_or_else(|| "service reported failure without detail".to_string()),
                        ));
                    }
                    OperationState::Cancelled(reason) => {
                        return Err(ClientError::operation_cancelled(
                            reason.unwrap_or_else(|| "operation was cancelled".to_string()),
                        ));
                    }
                    OperationState::NotStarted | OperationState::Running => {
                        if observed >= config.max_attempts {
                            warn!(attempts = observed, "polling budget exhausted");
                            return Err(ClientError::operation_timed_out(observed));
                        }
                    }
                }
            }
            Err(err) if err.is_transient() && transient_failures < config.transient_retries => {
                transient_failures += 1;
                warn!(
                    retry = transient_failures,
                    "transient error during status check, retrying: {}", err
                );
            }
            Err(err) if err.is_transient() => {
                return Err(ClientError::polling(format!(
                    "status check still failing after {} retries: {}",
                    transient_failures, err
                )));
            }
            Err(err) => return Err(err),
        }

        if !config.interval.is_zero() {
            sleep(config.interval).await;
        }
    }
}

/// An operation handle bound to its status probe and pacing configuration.
///
/// Thin wrapper around [`poll_operation`] for callers that want to carry a
/// pending operation around as a value, in the spirit of the SDK pollers the
/// Azure client libraries hand out.
pub struct Poller<F> {
    handle: OperationHandle,
    config: PollConfig,
    check: F,
}

impl<F> Poller<F> {
    pub fn new(handle: OperationHandle, config: PollConfig, check: F) -> Self {
        Self {
            handle,
            config,
            check,
        }
    }

    /// The handle of the operation being polled
    pub fn handle(&self) -> &OperationHandle {
        &self.handle
    }

    /// Block (suspend) until the operation reaches a terminal outcome
    pub async fn wait<T, Fut>(self) -> Result<T, ClientError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<OperationState<T>, ClientError>>,
    {
        let Self {
            handle,
            config,
            check,
        } = self;
        debug!(operation = %handle, "waiting for operation");
        poll_operation(&config, check).await
    }
}

/// Wait for several independent operations concurrently.
///
/// Each poller runs with its own configuration and probe; nothing is shared
/// between them, and one operation failing or timing out does not affect the
/// others. Results are paired with the operation handle and returned in the
/// order the pollers were given.
pub async fn wait_all<T, F, Fut>(
    pollers: Vec<Poller<F>>,
) -> Vec<(OperationHandle, Result<T, ClientError>)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<OperationState<T>, ClientError>>,
{
    use futures::future;

    let futures: Vec<_> = pollers
        .into_iter()
        .map(|poller| {
            let handle = poller.handle().clone();
            async move {
                let result = poller.wait().await;
                (handle, result)
            }
        })
        .collect();

    future::join_all(futures).await
}
