//! Poll-until-condition primitive
//!
//! Every convergence wait in this crate (droplet active, power state,
//! deletion confirmed, volume detached) goes through [`wait_for`]. Each wait
//! carries an explicit bound; there is no unbounded poll.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{ProviderError, Result};

/// Spacing and upper bound for one wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollPolicy {
    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

/// How a `NotFound` from the fetch is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnAbsent {
    /// Propagate it like any other error
    Fail,
    /// Absence is the condition being waited for
    Succeed,
}

/// Repeatedly call `fetch` until `is_terminal` holds or the policy times out.
///
/// Returns `Some(state)` for the terminal state, or `None` when `on_absent`
/// is [`OnAbsent::Succeed`] and the resource disappeared. Fetch errors other
/// than a tolerated `NotFound` abort the wait immediately. A fetch that is
/// still in flight when the bound expires is dropped and the wait times out.
/// No fetch happens after the function returns.
pub async fn wait_for<T, F, Fut, P>(
    operation: &'static str,
    resource: &str,
    policy: PollPolicy,
    on_absent: OnAbsent,
    mut fetch: F,
    is_terminal: P,
) -> Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&T) -> bool,
{
    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        // A stalled fetch counts against the same bound as the sleeps
        let remaining = policy.timeout.saturating_sub(started.elapsed());
        let outcome = match tokio::time::timeout(remaining, fetch()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::debug!(operation, resource, attempt, "Fetch did not complete before the deadline");
                return Err(ProviderError::Timeout {
                    operation,
                    resource: resource.to_string(),
                    elapsed: started.elapsed(),
                });
            }
        };

        match outcome {
            Ok(state) if is_terminal(&state) => {
                tracing::debug!(operation, resource, attempt, "Poll reached terminal state");
                return Ok(Some(state));
            }
            Ok(_) => {}
            Err(e) if e.is_not_found() && on_absent == OnAbsent::Succeed => {
                tracing::debug!(operation, resource, attempt, "Resource gone, poll complete");
                return Ok(None);
            }
            Err(e) => return Err(e),
        }

        let elapsed = started.elapsed();
        if elapsed >= policy.timeout {
            return Err(ProviderError::Timeout {
                operation,
                resource: resource.to_string(),
                elapsed,
            });
        }

        tracing::trace!(operation, resource, attempt, "Not converged yet, sleeping {:?}", policy.interval);
        tokio::time::sleep(policy.interval.min(policy.timeout - elapsed)).await;
    }
}
