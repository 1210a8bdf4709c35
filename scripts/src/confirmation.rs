//! Bounded polling of a proxy's implementation slot

use std::time::Duration;

use alloy::primitives::Address;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    chain::ProxyInspector,
    constants::{
        DEFAULT_CONFIRMATION_ATTEMPTS, DEFAULT_CONFIRMATION_BACKOFF_FACTOR,
        DEFAULT_CONFIRMATION_INITIAL_DELAY_MS, DEFAULT_CONFIRMATION_MAX_DELAY_MS,
        DEFAULT_CONFIRMATION_POLL_TIMEOUT_MS,
    },
    errors::ScriptError,
};

/// How long and how often to poll for a repoint to land
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ConfirmationPolicy {
    /// The maximum number of polls, including the first
    pub max_attempts: u32,
    /// The delay between the first and second polls, in milliseconds
    pub initial_delay_ms: u64,
    /// The cap on the delay between polls, in milliseconds
    pub max_delay_ms: u64,
    /// The factor by which the delay grows after each unconfirmed poll
    pub backoff_factor: u32,
    /// How long a single read of the implementation slot may take, in milliseconds
    pub poll_timeout_ms: u64,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_CONFIRMATION_ATTEMPTS,
            initial_delay_ms: DEFAULT_CONFIRMATION_INITIAL_DELAY_MS,
            max_delay_ms: DEFAULT_CONFIRMATION_MAX_DELAY_MS,
            backoff_factor: DEFAULT_CONFIRMATION_BACKOFF_FACTOR,
            poll_timeout_ms: DEFAULT_CONFIRMATION_POLL_TIMEOUT_MS,
        }
    }
}

impl ConfirmationPolicy {
    /// The delay to wait after the `n`th unconfirmed poll (zero-indexed)
    pub fn delay_after(&self, n: u32) -> Duration {
        let factor = u64::from(self.backoff_factor.max(1)).saturating_pow(n);
        let delay_ms = self
            .initial_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);

        Duration::from_millis(delay_ms)
    }

    /// The time limit on a single poll
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    /// Check that the policy can confirm anything at all
    pub fn validate(&self) -> Result<(), ScriptError> {
        if self.max_attempts == 0 {
            return Err(ScriptError::Config(
                "confirmation policy must allow at least one poll".to_string(),
            ));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(ScriptError::Config(format!(
                "initial poll delay ({}ms) exceeds max poll delay ({}ms)",
                self.initial_delay_ms, self.max_delay_ms
            )));
        }
        if self.poll_timeout_ms == 0 {
            return Err(ScriptError::Config(
                "confirmation poll timeout must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// The clock used between polls
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend for the given duration
    async fn sleep(&self, duration: Duration);
}

/// A [`Sleeper`] backed by the Tokio timer
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A confirmed implementation slot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Confirmation {
    /// The implementation address read from the proxy
    pub implementation: Address,
    /// The number of polls it took to observe it
    pub polls: u32,
}

/// Poll the proxy's implementation slot until it reads `expected`.
///
/// Transport failures and reads that outlive the policy's poll timeout count
/// as unconfirmed polls; any other error aborts the wait. Returns
/// [`ScriptError::ConfirmationTimeout`] once the policy's attempts are
/// exhausted.
pub async fn wait_for_implementation<I: ProxyInspector + ?Sized>(
    inspector: &I,
    sleeper: &dyn Sleeper,
    policy: &ConfirmationPolicy,
    proxy: Address,
    expected: Address,
) -> Result<Confirmation, ScriptError> {
    let mut last_seen = None;

    for attempt in 1..=policy.max_attempts {
        let read = tokio::time::timeout(
            policy.poll_timeout(),
            inspector.implementation_address(proxy),
        )
        .await;

        match read {
            Err(_elapsed) => {
                warn!(
                    "poll {attempt}/{} of proxy {proxy:#x} timed out after {}ms",
                    policy.max_attempts, policy.poll_timeout_ms
                );
            }
            Ok(Ok(implementation)) if implementation == expected => {
                debug!("proxy {proxy:#x} confirmed at {implementation:#x} after {attempt} polls");
                return Ok(Confirmation { implementation, polls: attempt });
            }
            Ok(Ok(implementation)) => {
                debug!(
                    "poll {attempt}/{}: proxy {proxy:#x} still at {implementation:#x}",
                    policy.max_attempts
                );
                last_seen = Some(implementation);
            }
            Ok(Err(e)) if e.is_transient() => {
                warn!("poll {attempt}/{} of proxy {proxy:#x} failed: {e}", policy.max_attempts);
            }
            Ok(Err(e)) => return Err(e),
        }

        if attempt < policy.max_attempts {
            sleeper.sleep(policy.delay_after(attempt - 1)).await;
        }
    }

    Err(ScriptError::ConfirmationTimeout {
        proxy,
        expected,
        attempts: policy.max_attempts,
        last_seen,
    })
}
