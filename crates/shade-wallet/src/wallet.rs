//! High-level wallet facade.
//!
//! Ties the store, key set, builder and chain client together into the
//! operations a host application calls: create or restore a wallet,
//! scan for received outputs, send a transfer, and reconcile pending
//! records against the chain.
//!
//! Sending is persist-then-post: the record hits the store before the
//! transaction is relayed, and a failed relay deletes it again. A
//! record that survives in an unverified state is resolved later by
//! [`Wallet::reconcile`], which only rolls a record back when the chain
//! and the mempool both report it certainly absent.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use rand::rngs::OsRng;
use tracing::{info, warn};

use shade_core::types::Hash256;
use shade_core::stealth;

use crate::balance::{self, Balance};
use crate::builder;
use crate::chain::{ChainClient, TxLookup};
use crate::error::WalletError;
use crate::keys::{DerivationPath, KeySet, KeySetData, Seed, StealthAddress};
use crate::notes;
use crate::records::{TxDirection, WalletTransaction};
use crate::session::{Session, SyncFlags, TransferKind};
use crate::store::WalletStore;
use crate::timelock::TimelockPolicy;

/// How long a send waits for a raised sync safeguard before giving up.
const SAFEGUARD_TIMEOUT: Duration = Duration::from_secs(30);
const SAFEGUARD_POLL: Duration = Duration::from_millis(50);

/// Outcome of one reconcile pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Records confirmed on chain this pass.
    pub verified: usize,
    /// Records rolled back because chain and mempool both lack them.
    pub rolled_back: usize,
    /// Records still pending or unresolvable this pass.
    pub unresolved: usize,
}

/// A wallet bound to one store file.
pub struct Wallet {
    store: WalletStore,
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet").finish_non_exhaustive()
    }
}

impl Wallet {
    /// Create a fresh wallet at `path` and return it with the recovery
    /// mnemonic. Fails if a store already exists there.
    pub fn create(
        path: impl Into<PathBuf>,
        passphrase: &[u8],
    ) -> Result<(Self, String), WalletError> {
        let seed = Seed::generate();
        let phrase = seed.to_phrase();
        let key_set = KeySet::from_seed(seed, DerivationPath::account(0));
        let store = WalletStore::create(path, passphrase, KeySetData::from_key_set(&key_set))?;
        Ok((Self { store }, phrase))
    }

    /// Recreate a wallet at `path` from its recovery mnemonic.
    pub fn restore(
        path: impl Into<PathBuf>,
        passphrase: &[u8],
        phrase: &str,
    ) -> Result<Self, WalletError> {
        let seed = Seed::from_phrase(phrase)?;
        let key_set = KeySet::from_seed(seed, DerivationPath::account(0));
        let store = WalletStore::create(path, passphrase, KeySetData::from_key_set(&key_set))?;
        Ok(Self { store })
    }

    /// Open an existing wallet, checking the passphrase against the
    /// store.
    pub fn open(path: impl Into<PathBuf>, passphrase: &[u8]) -> Result<Self, WalletError> {
        let store = WalletStore::open(path);
        store.key_set(passphrase)?;
        Ok(Self { store })
    }

    pub fn store(&self) -> &WalletStore {
        &self.store
    }

    fn key_set(&self, passphrase: &[u8]) -> Result<KeySet, WalletError> {
        Ok(self.store.key_set(passphrase)?.to_key_set())
    }

    /// The wallet's published stealth address.
    pub fn address(&self, passphrase: &[u8]) -> Result<StealthAddress, WalletError> {
        Ok(*self.key_set(passphrase)?.address())
    }

    /// Spendable balances, recomputed from the store.
    pub fn balances(&self, passphrase: &[u8]) -> Result<Vec<Balance>, WalletError> {
        let session = Session::new(passphrase, self.key_set(passphrase)?, TransferKind::Payment);
        balance::compute_balances(&session, &self.store)
    }

    /// Build, persist and relay a transfer. Returns the transaction id.
    ///
    /// The record is written before relay; if relay fails it is deleted
    /// again so the source balance stays spendable.
    #[allow(clippy::too_many_arguments)]
    pub fn send(
        &self,
        passphrase: &[u8],
        chain: &dyn ChainClient,
        recipient: &StealthAddress,
        payment: u64,
        memo: &str,
        kind: TransferKind,
        policy: &TimelockPolicy,
        sync: Option<&SyncFlags>,
    ) -> Result<Hash256, WalletError> {
        if let Some(flags) = sync {
            flags.wait_until_clear(SAFEGUARD_POLL, SAFEGUARD_TIMEOUT)?;
        }

        let session = Session::new(passphrase, self.key_set(passphrase)?, kind);
        let now = Utc::now().timestamp() as u64;
        let pool = chain.ring_candidates()?;

        let built = builder::build_transfer(
            &session,
            &self.store,
            &pool,
            recipient,
            payment,
            memo,
            policy,
            now,
            &mut OsRng,
        )?;
        let txid = built.transaction.id;

        let exact_spend = built.record.change == 0;
        let source_commitment = built.record.source_commitment;

        self.store.put_transaction(passphrase, built.record)?;
        if let Err(e) = chain.post_transaction(&built.transaction) {
            warn!(%txid, error = %e, "relay failed, rolling the record back");
            self.store.delete_transaction(passphrase, &txid)?;
            return Err(WalletError::SendFailed(e.to_string()));
        }

        // An exact spend returns nothing to this wallet, so the funding
        // record is finished with.
        if exact_spend {
            let source = self
                .store
                .transactions(passphrase)?
                .into_iter()
                .find(|r| {
                    r.transaction
                        .vouts
                        .iter()
                        .any(|v| v.commitment == source_commitment)
                });
            if let Some(mut source) = source {
                source.is_spent = true;
                self.store.put_transaction(passphrase, source)?;
            }
        }

        info!(%txid, "transfer relayed");
        Ok(txid)
    }

    /// Scan chain blocks for outputs paid to this wallet. Returns how
    /// many new transactions were recorded.
    pub fn scan(
        &self,
        passphrase: &[u8],
        chain: &dyn ChainClient,
        start_height: u64,
    ) -> Result<usize, WalletError> {
        let key_set = self.key_set(passphrase)?;
        let unlocked = key_set.unlock();
        let spend_public = key_set.address().spend_public;
        let own_address = key_set.address().to_string();

        let tip = chain.get_block_height()?;
        if tip < start_height {
            return Ok(0);
        }
        let blocks = chain.get_blocks(start_height, tip - start_height + 1)?;
        let known: Vec<Hash256> = self
            .store
            .transactions(passphrase)?
            .iter()
            .map(|r| r.txid())
            .collect();

        let mut recorded = 0;
        for block in &blocks {
            for tx in &block.transactions {
                if known.contains(&tx.id) {
                    continue;
                }
                let mut received = 0u64;
                let mut overflowed = false;
                let mut memo = String::new();
                for vout in &tx.vouts {
                    let Some(note_key) = stealth::uncover(
                        &unlocked.scan_secret,
                        &spend_public,
                        &vout.ephemeral_key,
                        &vout.one_time_key,
                    )?
                    else {
                        continue;
                    };
                    match notes::open(&note_key, &vout.note) {
                        Ok((value, _blind, note_memo)) => {
                            // Note values are sender-supplied; a sum past
                            // u64::MAX marks the transaction malformed.
                            let Some(sum) = received.checked_add(value) else {
                                warn!(txid = %tx.id, "note values overflow, skipping transaction");
                                overflowed = true;
                                break;
                            };
                            received = sum;
                            if memo.is_empty() {
                                memo = note_memo;
                            }
                        }
                        Err(e) => {
                            warn!(txid = %tx.id, error = %e, "undecryptable note on owned output");
                        }
                    }
                }
                if overflowed || received == 0 {
                    continue;
                }
                self.store.put_transaction(
                    passphrase,
                    WalletTransaction {
                        transaction: tx.clone(),
                        payment: received,
                        change: 0,
                        reward: 0,
                        source_commitment: [0u8; 32],
                        delay_counter: 0,
                        is_verified: true,
                        is_spent: false,
                        direction: TxDirection::Receive,
                        sender: String::new(),
                        recipient: own_address.clone(),
                        memo,
                        timestamp: Utc::now(),
                        correlation_id: Hash256::ZERO,
                    },
                )?;
                recorded += 1;
            }
        }

        info!(start_height, tip, recorded, "scan pass finished");
        Ok(recorded)
    }

    /// Resolve unverified sent records against the chain.
    ///
    /// A record is verified when the chain has its transaction, rolled
    /// back only when chain and mempool both answer certainly absent,
    /// and left alone on any inconclusive or failed lookup.
    pub fn reconcile(
        &self,
        passphrase: &[u8],
        chain: &dyn ChainClient,
    ) -> Result<ReconcileSummary, WalletError> {
        let mut summary = ReconcileSummary::default();

        for record in self.store.transactions(passphrase)? {
            if record.is_verified || record.direction != TxDirection::Send {
                continue;
            }
            let txid = record.txid();

            let on_chain = match chain.get_transaction(&txid) {
                Ok(lookup) => lookup,
                Err(e) => {
                    warn!(%txid, error = %e, "chain lookup failed, leaving record pending");
                    summary.unresolved += 1;
                    continue;
                }
            };
            match on_chain {
                TxLookup::Found => {
                    let mut verified = record;
                    verified.is_verified = true;
                    self.store.put_transaction(passphrase, verified)?;
                    summary.verified += 1;
                    continue;
                }
                TxLookup::Inconclusive => {
                    summary.unresolved += 1;
                    continue;
                }
                TxLookup::CertainlyAbsent => {}
            }

            match chain.get_mempool_transaction(&txid) {
                Ok(TxLookup::CertainlyAbsent) => {
                    info!(%txid, "transaction vanished from chain and mempool, rolling back");
                    self.store.delete_transaction(passphrase, &txid)?;
                    summary.rolled_back += 1;
                }
                Ok(_) => {
                    summary.unresolved += 1;
                }
                Err(e) => {
                    warn!(%txid, error = %e, "mempool lookup failed, leaving record pending");
                    summary.unresolved += 1;
                }
            }
        }

        Ok(summary)
    }
}
