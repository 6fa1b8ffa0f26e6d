//! Chain access boundary.
//!
//! The wallet never talks to a node directly; everything it needs from
//! the chain goes through [`ChainClient`]. Reconciliation depends on
//! the three-state [`TxLookup`]: a transaction is only rolled back when
//! both the chain and the mempool report it certainly absent, never on
//! an inconclusive answer.

use shade_core::types::{Block, Hash256, Transaction};

use crate::error::WalletError;
use crate::ring::RingCandidate;

/// Outcome of looking a transaction up on chain or in the mempool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxLookup {
    /// The transaction exists.
    Found,
    /// The source answered authoritatively that it does not exist.
    CertainlyAbsent,
    /// The source could not say either way. Treat as unknown.
    Inconclusive,
}

/// Everything the wallet needs from a node.
pub trait ChainClient: Send + Sync {
    /// Look a transaction up in confirmed blocks.
    fn get_transaction(&self, txid: &Hash256) -> Result<TxLookup, WalletError>;

    /// Look a transaction up in the mempool.
    fn get_mempool_transaction(&self, txid: &Hash256) -> Result<TxLookup, WalletError>;

    /// Submit a transaction for relay.
    fn post_transaction(&self, transaction: &Transaction) -> Result<(), WalletError>;

    /// Fetch `count` blocks starting at `start` (inclusive).
    fn get_blocks(&self, start: u64, count: u64) -> Result<Vec<Block>, WalletError>;

    /// Current chain tip height.
    fn get_block_height(&self) -> Result<u64, WalletError>;

    /// Spendable outputs usable as ring decoys.
    fn ring_candidates(&self) -> Result<Vec<RingCandidate>, WalletError>;
}
