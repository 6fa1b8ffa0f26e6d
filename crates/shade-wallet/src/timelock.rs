//! Transaction timelocks backed by the sloth VDF.
//!
//! The delay is evaluated from the transaction's message hash, so the
//! witness binds to the transaction it locks. If the evaluation beats
//! the wall-clock floor (a faster machine than the calibration
//! assumed), the iteration count doubles and the evaluation reruns,
//! bounded by the policy's attempt cap.

use std::time::{Duration, Instant};
use tracing::debug;

use shade_core::constants::{
    DEFAULT_LOCK_SECONDS, MAX_TIMELOCK_ATTEMPTS, VDF_ITERATIONS_PER_SECOND,
};
use shade_core::error::VdfError;
use shade_core::types::{Hash256, Vtime};
use shade_core::vdf;

use crate::error::WalletError;

/// Tunable timelock parameters. Production uses [`Default`]; tests
/// shrink the iteration count and floor so they finish quickly.
#[derive(Clone, Debug)]
pub struct TimelockPolicy {
    /// Seconds of sequential delay the lock should represent.
    pub delay_seconds: u64,
    /// Calibrated evaluator speed.
    pub iterations_per_second: u64,
    /// Wall-clock floor the evaluation must meet.
    pub min_elapsed: Duration,
    /// Evaluation retries before giving up.
    pub max_attempts: u32,
}

impl Default for TimelockPolicy {
    fn default() -> Self {
        Self {
            delay_seconds: DEFAULT_LOCK_SECONDS,
            iterations_per_second: VDF_ITERATIONS_PER_SECOND,
            min_elapsed: Duration::from_secs(DEFAULT_LOCK_SECONDS),
            max_attempts: MAX_TIMELOCK_ATTEMPTS,
        }
    }
}

/// Evaluate the timelock for a transaction.
///
/// Returns the [`Vtime`] and the number of times the iteration count
/// had to grow to meet the floor.
pub fn compute_timelock(
    message: &Hash256,
    policy: &TimelockPolicy,
    now: u64,
) -> Result<(Vtime, u32), WalletError> {
    let mut iterations = policy
        .delay_seconds
        .saturating_mul(policy.iterations_per_second)
        .max(1);

    for attempt in 0..policy.max_attempts {
        let started = Instant::now();
        let witness = vdf::eval(message.as_bytes(), iterations)?;
        let elapsed = started.elapsed();

        vdf::verify(message.as_bytes(), &witness, iterations).map_err(|e| match e {
            VdfError::Verify => WalletError::VdfVerifyFailed,
            other => WalletError::Vdf(other),
        })?;

        if elapsed >= policy.min_elapsed {
            let lock_time = now + policy.delay_seconds;
            return Ok((
                Vtime {
                    iterations,
                    hash_input: *message.as_bytes(),
                    nonce_output: witness,
                    ticks: elapsed.as_millis() as u64,
                    lock_time,
                    script: format!("{lock_time} OP_CHECKLOCKTIMEVERIFY OP_DROP"),
                },
                attempt,
            ));
        }

        debug!(
            attempt,
            iterations,
            elapsed_ms = elapsed.as_millis() as u64,
            "timelock finished under the floor, growing iteration count"
        );
        iterations = iterations.saturating_mul(2);
    }

    Err(WalletError::TimelockExhausted {
        attempts: policy.max_attempts,
    })
}

/// Check a transaction's timelock witness.
pub fn verify_timelock(vtime: &Vtime) -> Result<(), WalletError> {
    vdf::verify(&vtime.hash_input, &vtime.nonce_output, vtime.iterations).map_err(|e| match e {
        VdfError::Verify => WalletError::VdfVerifyFailed,
        other => WalletError::Vdf(other),
    })
}
