//! Wallet-side records kept alongside raw transactions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shade_core::types::{Hash256, Transaction};

/// How a transaction entered this wallet.
///
/// Records found by a post-restore scan are ordinary receives.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxDirection {
    /// Built and sent by this wallet.
    Send,
    /// Discovered by scanning the chain.
    Receive,
}

/// A transaction plus the wallet's private view of it.
///
/// The raw [`Transaction`] reveals nothing about amounts; the cleartext
/// fields here exist only inside the encrypted store.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct WalletTransaction {
    pub transaction: Transaction,
    /// Amount paid to the recipient, in attos.
    pub payment: u64,
    /// Amount returned as change, in attos.
    pub change: u64,
    /// Minted reward, nonzero only for coinstake records.
    pub reward: u64,
    /// Commitment of the balance that funded this transaction.
    pub source_commitment: [u8; 32],
    /// Times the timelock grew its iteration count to meet the floor.
    pub delay_counter: u32,
    /// Set once the transaction is confirmed on chain.
    pub is_verified: bool,
    /// Set once every output of this record has been spent.
    pub is_spent: bool,
    pub direction: TxDirection,
    /// Sender stealth address string, when known.
    pub sender: String,
    /// Recipient stealth address string, when known.
    pub recipient: String,
    pub memo: String,
    pub timestamp: DateTime<Utc>,
    /// Correlation id of the session that produced the record.
    pub correlation_id: Hash256,
}

impl WalletTransaction {
    pub fn txid(&self) -> Hash256 {
        self.transaction.id
    }
}
