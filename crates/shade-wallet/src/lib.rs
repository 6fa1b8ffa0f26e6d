//! # shade-wallet — confidential-transaction wallet.
//!
//! Provides hierarchical key derivation with stealth addresses,
//! encrypted single-file persistence, balance scanning over hidden
//! amounts, and a transaction pipeline that rings the spend among
//! decoys, proves output ranges, and binds a VDF timelock before
//! anything is relayed.
//!
//! # Modules
//!
//! - [`error`] — `WalletError` enum
//! - [`keys`] — Seed with BIP-39 recovery phrases, KeySet, stealth
//!   addresses, BLAKE3-based derivation
//! - [`encryption`] — Argon2id + AES-256-GCM store encryption
//! - [`store`] — Encrypted single-file wallet store
//! - [`notes`] — Per-output encrypted amount/blind/memo payloads
//! - [`records`] — Wallet-side transaction records
//! - [`balance`] — Balance scanning and spend selection
//! - [`ring`] — Decoy selection and ring signing
//! - [`timelock`] — Sloth-VDF transaction timelocks
//! - [`session`] — Transfer sessions and in-process coordination
//! - [`builder`] — Transaction construction pipeline
//! - [`chain`] — Chain access boundary
//! - [`wallet`] — High-level wallet composition

pub mod balance;
pub mod builder;
pub mod chain;
pub mod encryption;
pub mod error;
pub mod keys;
pub mod notes;
pub mod records;
pub mod ring;
pub mod session;
pub mod store;
pub mod timelock;
pub mod wallet;

// Re-exports for convenient access
pub use balance::{Balance, calculate_change, compute_balances};
pub use builder::{BuiltTransfer, build_transfer};
pub use chain::{ChainClient, TxLookup};
pub use error::WalletError;
pub use keys::{DerivationPath, KeySet, KeySetData, Seed, StealthAddress};
pub use records::{TxDirection, WalletTransaction};
pub use ring::RingCandidate;
pub use session::{OperationGuard, Session, SyncFlags, TransferKind};
pub use store::WalletStore;
pub use timelock::TimelockPolicy;
pub use wallet::{ReconcileSummary, Wallet};
