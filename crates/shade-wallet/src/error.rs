//! Wallet error types.

use shade_core::error::{CommitError, ProofError, RingError, StealthError, VdfError};
use thiserror::Error;

/// Errors that can occur in wallet operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// Payment amount of zero.
    #[error("payment amount must be greater than zero")]
    ZeroPayment,

    /// No single balance is large enough to fund the payment.
    #[error("no spendable balance covers the payment")]
    NoSpendableBalance,

    /// Payment exceeds the total spendable balance.
    #[error("payment exceeds balance: have {have}, need {need}")]
    PaymentExceedsBalance {
        /// Largest spendable balance in attos.
        have: u64,
        /// Requested payment in attos.
        need: u64,
    },

    /// Decoy pool could not produce a valid ring within the attempt cap.
    #[error("decoy selection exhausted after {attempts} attempts")]
    DecoySelectionExhausted { attempts: usize },

    /// Ring signing context could not be assembled.
    #[error("ring prepare failed: {0}")]
    RingPrepareFailed(String),

    /// Ring signature generation failed.
    #[error("ring generate failed: {0}")]
    RingGenerateFailed(String),

    /// Freshly generated ring signature failed self-verification.
    #[error("ring verify failed: {0}")]
    RingVerifyFailed(String),

    /// A range proof failed to generate or verify.
    #[error("range proof invalid: {0}")]
    RangeProofInvalid(String),

    /// Input and output commitments do not cancel.
    #[error("commitment sum mismatch")]
    CommitSumMismatch,

    /// VDF witness failed self-verification.
    #[error("timelock verification failed")]
    VdfVerifyFailed,

    /// Timelock never met the wall-clock floor within the retry cap.
    #[error("timelock exhausted after {attempts} attempts")]
    TimelockExhausted { attempts: u32 },

    /// Secret key material with an unexpected shape.
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// Invalid stealth address string.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid BIP-39 mnemonic phrase.
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    /// Wrong passphrase for the wallet store.
    #[error("invalid passphrase")]
    InvalidPassphrase,

    /// Wallet store file is corrupted or has an invalid format.
    #[error("corrupted store: {0}")]
    CorruptedStore(String),

    /// Store read or write failure.
    #[error("persistence failed: {0}")]
    PersistenceFailed(String),

    /// No stored transaction with the given id.
    #[error("transaction not found: {0}")]
    TransactionNotFound(String),

    /// Chain submission failed; the local record was rolled back.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Encryption failure.
    #[error("encryption: {0}")]
    Encryption(String),

    /// Serialization error.
    #[error("serialization: {0}")]
    Serialization(String),

    /// Commitment arithmetic error.
    #[error(transparent)]
    Commit(#[from] CommitError),

    /// Range proof error.
    #[error(transparent)]
    Proof(#[from] ProofError),

    /// Ring signature error.
    #[error(transparent)]
    Ring(#[from] RingError),

    /// Stealth address error.
    #[error(transparent)]
    Stealth(#[from] StealthError),

    /// VDF error.
    #[error(transparent)]
    Vdf(#[from] VdfError),
}
