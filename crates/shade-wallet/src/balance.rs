//! Balance computation and spend selection.
//!
//! Balances are recomputed from the store on every call rather than
//! cached: outputs are uncovered with the scan key, their notes
//! decrypted, and anything whose key image already appears in a stored
//! input is dropped as spent. Outputs are deduplicated by (transaction
//! id, output index), so equal amounts arriving in different outputs
//! are all spendable.

use std::collections::HashSet;
use tracing::warn;

use curve25519_dalek::scalar::Scalar;
use shade_core::types::{CoinType, Hash256};
use shade_core::{mlsag, stealth};

use crate::error::WalletError;
use crate::notes;
use crate::session::Session;
use crate::store::WalletStore;

/// One spendable output, with everything needed to spend it.
#[derive(Clone)]
pub struct Balance {
    /// Pedersen commitment of the output.
    pub commitment: [u8; 32],
    /// Committed value in attos.
    pub total: u64,
    /// Blinding factor the commitment opens under.
    pub blind: Scalar,
    /// Transaction the output came from.
    pub txid: Hash256,
    /// Index of the output within its transaction.
    pub vout_index: usize,
    /// Earliest unix time this output may be spent.
    pub lock_time: u64,
    pub one_time_key: [u8; 32],
    pub ephemeral_key: [u8; 32],
    pub coin_type: CoinType,
}

impl std::fmt::Debug for Balance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Balance")
            .field("txid", &self.txid)
            .field("vout_index", &self.vout_index)
            .field("total", &self.total)
            .field("lock_time", &self.lock_time)
            .finish()
    }
}

/// Walk the store and produce the wallet's spendable balances.
pub fn compute_balances(
    session: &Session,
    store: &WalletStore,
) -> Result<Vec<Balance>, WalletError> {
    let unlocked = session.key_set().unlock();
    let spend_public = session.key_set().address().spend_public;
    let records = store.transactions(session.passphrase())?;

    // Key images our own transactions have already consumed.
    let spent_images: HashSet<[u8; 32]> = records
        .iter()
        .flat_map(|r| r.transaction.vins.iter().map(|vin| vin.key_image))
        .collect();

    let mut seen: HashSet<(Hash256, usize)> = HashSet::new();
    let mut balances = Vec::new();

    for record in &records {
        let txid = record.txid();
        for (vout_index, vout) in record.transaction.vouts.iter().enumerate() {
            let Some(note_key) = stealth::uncover(
                &unlocked.scan_secret,
                &spend_public,
                &vout.ephemeral_key,
                &vout.one_time_key,
            )?
            else {
                continue;
            };
            if !seen.insert((txid, vout_index)) {
                continue;
            }
            let (value, blind, _memo) = match notes::open(&note_key, &vout.note) {
                Ok(opened) => opened,
                Err(e) => {
                    warn!(%txid, vout_index, error = %e, "undecryptable note on owned output, skipping");
                    continue;
                }
            };
            if value == 0 {
                continue;
            }
            let spend_secret = stealth::uncover_secret(
                &unlocked.scan_secret,
                &unlocked.spend_secret,
                &vout.ephemeral_key,
            )?;
            let image = mlsag::key_image(&spend_secret, &vout.one_time_key);
            if spent_images.contains(&image) {
                continue;
            }
            balances.push(Balance {
                commitment: vout.commitment,
                total: value,
                blind,
                txid,
                vout_index,
                lock_time: vout.lock_time,
                one_time_key: vout.one_time_key,
                ephemeral_key: vout.ephemeral_key,
                coin_type: vout.coin_type,
            });
        }
    }

    Ok(balances)
}

/// Select the balance funding a payment and compute its change.
///
/// Only balances whose lock time has passed are considered, largest
/// first; the payment is funded from a single balance.
pub fn calculate_change(
    balances: &[Balance],
    payment: u64,
    now: u64,
) -> Result<(Balance, u64), WalletError> {
    if payment == 0 {
        return Err(WalletError::ZeroPayment);
    }

    let mut spendable: Vec<&Balance> = balances.iter().filter(|b| b.lock_time <= now).collect();
    if spendable.is_empty() {
        return Err(WalletError::NoSpendableBalance);
    }
    spendable.sort_by(|a, b| b.total.cmp(&a.total));

    let source = spendable[0];
    if source.total < payment {
        return Err(WalletError::PaymentExceedsBalance {
            have: source.total,
            need: payment,
        });
    }
    Ok((source.clone(), source.total - payment))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balance(total: u64, lock_time: u64, tag: u8) -> Balance {
        Balance {
            commitment: [tag; 32],
            total,
            blind: Scalar::from(tag as u64),
            txid: Hash256([tag; 32]),
            vout_index: 0,
            lock_time,
            one_time_key: [tag; 32],
            ephemeral_key: [tag; 32],
            coin_type: CoinType::Payment,
        }
    }

    #[test]
    fn zero_payment_rejected() {
        let balances = vec![balance(100, 0, 1)];
        assert_eq!(
            calculate_change(&balances, 0, 50).unwrap_err(),
            WalletError::ZeroPayment
        );
    }

    #[test]
    fn empty_wallet_has_no_spendable_balance() {
        assert_eq!(
            calculate_change(&[], 10, 50).unwrap_err(),
            WalletError::NoSpendableBalance
        );
    }

    #[test]
    fn locked_balances_are_not_spendable() {
        let balances = vec![balance(100, 1_000, 1)];
        assert_eq!(
            calculate_change(&balances, 10, 500).unwrap_err(),
            WalletError::NoSpendableBalance
        );
    }

    #[test]
    fn payment_larger_than_best_balance_rejected() {
        let balances = vec![balance(30, 0, 1), balance(50, 0, 2)];
        assert_eq!(
            calculate_change(&balances, 60, 10).unwrap_err(),
            WalletError::PaymentExceedsBalance { have: 50, need: 60 }
        );
    }

    #[test]
    fn largest_balance_funds_the_payment() {
        let balances = vec![balance(30, 0, 1), balance(100, 0, 2), balance(50, 0, 3)];
        let (source, change) = calculate_change(&balances, 40, 10).unwrap();
        assert_eq!(source.total, 100);
        assert_eq!(change, 60);
    }

    #[test]
    fn exact_payment_leaves_zero_change() {
        let balances = vec![balance(40, 0, 1)];
        let (source, change) = calculate_change(&balances, 40, 10).unwrap();
        assert_eq!(source.total, 40);
        assert_eq!(change, 0);
    }

    #[test]
    fn matured_lock_is_spendable() {
        let balances = vec![balance(40, 100, 1)];
        let (source, _) = calculate_change(&balances, 40, 100).unwrap();
        assert_eq!(source.total, 40);
    }

    mod scanning {
        use super::super::*;
        use crate::keys::{DerivationPath, KeySet, KeySetData, Seed};
        use crate::records::{TxDirection, WalletTransaction};
        use crate::session::TransferKind;
        use chrono::Utc;
        use rand::rngs::OsRng;
        use shade_core::commitment::{commit_bytes, random_blind};
        use shade_core::mlsag::MlsagSignature;
        use shade_core::types::{RingPayload, Transaction, Vin, Vout, Vtime};

        fn session() -> Session {
            let ks = KeySet::from_seed(Seed::from_bytes([9u8; 32]), DerivationPath::account(0));
            Session::new(b"pass", ks, TransferKind::Payment)
        }

        fn store_for(session: &Session, dir: &std::path::Path) -> WalletStore {
            let data = KeySetData::from_key_set(session.key_set());
            WalletStore::create(dir.join("wallet.shade"), session.passphrase(), data).unwrap()
        }

        /// Output paid to `session`, with a decryptable note.
        fn owned_vout(session: &Session, value: u64) -> Vout {
            let addr = session.key_set().address();
            let payment =
                stealth::create_payment(&addr.spend_public, &addr.scan_public, &mut OsRng)
                    .unwrap();
            let blind = random_blind(&mut OsRng);
            Vout {
                amount: 0,
                commitment: commit_bytes(value, &blind),
                ephemeral_key: payment.ephemeral_public,
                lock_time: 0,
                note: notes::seal(&payment.note_key, value, &blind, "").unwrap(),
                one_time_key: payment.one_time_key,
                script: None,
                coin_type: CoinType::Payment,
            }
        }

        fn foreign_vout(value: u64) -> Vout {
            let stranger =
                KeySet::from_seed(Seed::from_bytes([77u8; 32]), DerivationPath::account(5));
            let addr = stranger.address();
            let payment =
                stealth::create_payment(&addr.spend_public, &addr.scan_public, &mut OsRng)
                    .unwrap();
            let blind = random_blind(&mut OsRng);
            Vout {
                amount: 0,
                commitment: commit_bytes(value, &blind),
                ephemeral_key: payment.ephemeral_public,
                lock_time: 0,
                note: notes::seal(&payment.note_key, value, &blind, "").unwrap(),
                one_time_key: payment.one_time_key,
                script: None,
                coin_type: CoinType::Payment,
            }
        }

        fn record(id: u8, vouts: Vec<Vout>, vins: Vec<Vin>) -> WalletTransaction {
            WalletTransaction {
                transaction: Transaction {
                    version: 2,
                    mix: 22,
                    vins,
                    vouts,
                    range_proofs: vec![],
                    ring_sig: RingPayload {
                        ring_keys: vec![],
                        ring_commitments: vec![],
                        pseudo_commitment: [0u8; 32],
                        signature: MlsagSignature {
                            challenge: [0u8; 32],
                            responses: vec![],
                            key_image: [0u8; 32],
                        },
                    },
                    vtime: Vtime::default(),
                    id: Hash256([id; 32]),
                },
                payment: 0,
                change: 0,
                reward: 0,
                source_commitment: [0u8; 32],
                delay_counter: 0,
                is_verified: true,
                is_spent: false,
                direction: TxDirection::Receive,
                sender: String::new(),
                recipient: String::new(),
                memo: String::new(),
                timestamp: Utc::now(),
                correlation_id: Hash256::ZERO,
            }
        }

        #[test]
        fn finds_owned_outputs_only() {
            let dir = tempfile::tempdir().unwrap();
            let s = session();
            let store = store_for(&s, dir.path());
            store
                .put_transaction(
                    s.passphrase(),
                    record(1, vec![owned_vout(&s, 100), foreign_vout(500)], vec![]),
                )
                .unwrap();

            let balances = compute_balances(&s, &store).unwrap();
            assert_eq!(balances.len(), 1);
            assert_eq!(balances[0].total, 100);
        }

        #[test]
        fn spent_outputs_are_excluded() {
            let dir = tempfile::tempdir().unwrap();
            let s = session();
            let store = store_for(&s, dir.path());
            let vout = owned_vout(&s, 100);

            // Recover the one-time secret and burn its key image in a
            // later record's input.
            let unlocked = s.key_set().unlock();
            let secret = stealth::uncover_secret(
                &unlocked.scan_secret,
                &unlocked.spend_secret,
                &vout.ephemeral_key,
            )
            .unwrap();
            let image = mlsag::key_image(&secret, &vout.one_time_key);

            store
                .put_transaction(s.passphrase(), record(1, vec![vout], vec![]))
                .unwrap();
            store
                .put_transaction(
                    s.passphrase(),
                    record(
                        2,
                        vec![],
                        vec![Vin {
                            key_image: image,
                            key_offsets: vec![0],
                        }],
                    ),
                )
                .unwrap();

            let balances = compute_balances(&s, &store).unwrap();
            assert!(balances.is_empty());
        }

        #[test]
        fn zero_value_outputs_are_dropped() {
            let dir = tempfile::tempdir().unwrap();
            let s = session();
            let store = store_for(&s, dir.path());
            store
                .put_transaction(s.passphrase(), record(1, vec![owned_vout(&s, 0)], vec![]))
                .unwrap();
            assert!(compute_balances(&s, &store).unwrap().is_empty());
        }

        #[test]
        fn equal_amounts_in_distinct_outputs_both_count() {
            let dir = tempfile::tempdir().unwrap();
            let s = session();
            let store = store_for(&s, dir.path());
            store
                .put_transaction(
                    s.passphrase(),
                    record(1, vec![owned_vout(&s, 100), owned_vout(&s, 100)], vec![]),
                )
                .unwrap();

            let balances = compute_balances(&s, &store).unwrap();
            assert_eq!(balances.len(), 2);
            assert_eq!(balances.iter().map(|b| b.total).sum::<u64>(), 200);
        }
    }
}
