//! Transfer sessions and in-process coordination.
//!
//! A [`Session`] carries everything one transfer needs: the account's
//! key set, the store passphrase, the transfer kind, and a correlation
//! id for tracing. Sessions are ephemeral and never persisted.
//!
//! [`OperationGuard`] and [`SyncFlags`] coordinate with a host process:
//! the guard counts in-flight wallet operations, and the safeguard flag
//! lets a chain-sync component hold new transfers back until it clears.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use zeroize::Zeroizing;

use shade_core::types::Hash256;

use crate::error::WalletError;
use crate::keys::KeySet;

/// What kind of transaction a session is building.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferKind {
    /// A regular confidential payment.
    Payment,
    /// A staking transaction that mints a reward output.
    Coinstake,
}

/// Ephemeral context for one wallet operation.
pub struct Session {
    session_id: Hash256,
    passphrase: Zeroizing<Vec<u8>>,
    key_set: KeySet,
    transfer_kind: TransferKind,
    correlation_id: Hash256,
}

impl Session {
    pub fn new(passphrase: &[u8], key_set: KeySet, transfer_kind: TransferKind) -> Self {
        Self {
            session_id: random_id(),
            passphrase: Zeroizing::new(passphrase.to_vec()),
            key_set,
            transfer_kind,
            correlation_id: random_id(),
        }
    }

    pub fn session_id(&self) -> Hash256 {
        self.session_id
    }

    pub fn passphrase(&self) -> &[u8] {
        &self.passphrase
    }

    pub fn key_set(&self) -> &KeySet {
        &self.key_set
    }

    pub fn transfer_kind(&self) -> TransferKind {
        self.transfer_kind
    }

    /// Correlation id stamped onto records and log events this session
    /// produces.
    pub fn correlation_id(&self) -> Hash256 {
        self.correlation_id
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .field("passphrase", &"[REDACTED]")
            .field("transfer_kind", &self.transfer_kind)
            .field("correlation_id", &self.correlation_id)
            .finish()
    }
}

fn random_id() -> Hash256 {
    use rand::RngCore;
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    Hash256(bytes)
}

/// Process-wide count of in-flight wallet operations.
static ACTIVE_OPERATIONS: AtomicUsize = AtomicUsize::new(0);

/// Scoped in-flight marker. Observability only; it does not serialize
/// anything.
pub struct OperationGuard(());

impl OperationGuard {
    pub fn enter() -> Self {
        ACTIVE_OPERATIONS.fetch_add(1, Ordering::SeqCst);
        Self(())
    }

    /// Operations currently in flight across the process.
    pub fn active() -> usize {
        ACTIVE_OPERATIONS.load(Ordering::SeqCst)
    }
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        ACTIVE_OPERATIONS.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Flags shared with a host's chain-sync component.
#[derive(Debug, Default)]
pub struct SyncFlags {
    safeguard: AtomicBool,
}

impl SyncFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the safeguard: new transfers wait until it clears.
    pub fn raise_safeguard(&self) {
        self.safeguard.store(true, Ordering::SeqCst);
    }

    pub fn clear_safeguard(&self) {
        self.safeguard.store(false, Ordering::SeqCst);
    }

    pub fn safeguard_raised(&self) -> bool {
        self.safeguard.load(Ordering::SeqCst)
    }

    /// Block until the safeguard clears, polling at `poll` intervals.
    ///
    /// Gives up after `timeout` rather than stalling a transfer
    /// forever behind a wedged sync.
    pub fn wait_until_clear(&self, poll: Duration, timeout: Duration) -> Result<(), WalletError> {
        let start = Instant::now();
        while self.safeguard_raised() {
            if start.elapsed() >= timeout {
                return Err(WalletError::SendFailed(
                    "safeguard still raised after timeout".into(),
                ));
            }
            std::thread::sleep(poll);
        }
        Ok(())
    }
}
