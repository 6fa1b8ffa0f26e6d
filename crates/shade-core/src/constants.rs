//! Protocol constants. All monetary values in attos (1 SHADE = 10^9 attos).

pub const COIN: u64 = 1_000_000_000;

/// Transaction wire-format version emitted by this wallet.
pub const TX_VERSION: u16 = 2;

/// Ring width (real spend plus decoys) used for every MLSAG signature.
pub const RING_SIZE: usize = 22;

/// Smallest ring width accepted when verifying foreign transactions.
pub const MIN_RING_SIZE: usize = 11;

/// Largest ring width accepted when verifying foreign transactions.
pub const MAX_RING_SIZE: usize = 64;

/// Reshuffle attempts before decoy selection gives up.
///
/// Each attempt rebuilds the entire ring from a fresh shuffle of the
/// candidate pool, so a single stale decoy cannot wedge the loop.
pub const MAX_RING_ATTEMPTS: usize = 64;

/// Bit width of every range proof. Committed amounts fit in a `u64`.
pub const RANGE_PROOF_BITS: usize = 64;

/// Blocks a coinstake reward output stays unspendable.
pub const REWARD_MATURITY: u64 = 107;

/// Coinstake reward amount credited per staked transaction.
pub const STAKE_REWARD: u64 = 2 * COIN;

/// Default seconds of sequential delay bound into a transaction timelock.
pub const DEFAULT_LOCK_SECONDS: u64 = 5;

/// Calibrated sloth square-root iterations per second of delay.
///
/// Conservative for commodity hardware. A faster evaluator finishes
/// early and the timelock loop grows the iteration count until the
/// wall-clock floor is met, so under-estimating only costs retries.
pub const VDF_ITERATIONS_PER_SECOND: u64 = 100_000;

/// Retries allowed while growing the iteration count to meet the floor.
pub const MAX_TIMELOCK_ATTEMPTS: u32 = 8;
