//! Shared helpers for the integration tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use rand::rngs::OsRng;

use shade_core::commitment;
use shade_core::constants::{COIN, RING_SIZE, TX_VERSION};
use shade_core::mlsag::MlsagSignature;
use shade_core::stealth;
use shade_core::types::{
    Block, CoinType, Hash256, RingPayload, Transaction, Vout, Vtime,
};
use shade_wallet::chain::{ChainClient, TxLookup};
use shade_wallet::error::WalletError;
use shade_wallet::keys::StealthAddress;
use shade_wallet::records::{TxDirection, WalletTransaction};
use shade_wallet::ring::RingCandidate;
use shade_wallet::timelock::TimelockPolicy;
use shade_wallet::{notes, Wallet};

/// Install a tracing subscriber once, honoring `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Timelock policy small enough for tests to finish quickly.
pub fn fast_policy() -> TimelockPolicy {
    TimelockPolicy {
        delay_seconds: 1,
        iterations_per_second: 16,
        min_elapsed: Duration::ZERO,
        max_attempts: 4,
    }
}

/// A confidential transaction paying `value` attos to `address`, with
/// no inputs. Stands in for an already-confirmed receive.
pub fn funding_transaction(address: &StealthAddress, value: u64) -> Transaction {
    let payment =
        stealth::create_payment(&address.spend_public, &address.scan_public, &mut OsRng)
            .expect("valid address keys");
    let blind = commitment::random_blind(&mut OsRng);
    let note = notes::seal(&payment.note_key, value, &blind, "funding").expect("seal note");

    let mut tx = Transaction {
        version: TX_VERSION,
        mix: RING_SIZE as u16,
        vins: vec![],
        vouts: vec![Vout {
            amount: 0,
            commitment: commitment::commit_bytes(value, &blind),
            ephemeral_key: payment.ephemeral_public,
            lock_time: 0,
            note,
            one_time_key: payment.one_time_key,
            script: None,
            coin_type: CoinType::Payment,
        }],
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
        id: Hash256::ZERO,
    };
    tx.id = tx.compute_id().expect("encodable transaction");
    tx
}

/// Wrap a funding transaction in the record the wallet would keep for
/// a confirmed receive.
pub fn receive_record(tx: Transaction, value: u64, recipient: &StealthAddress) -> WalletTransaction {
    WalletTransaction {
        transaction: tx,
        payment: value,
        change: 0,
        reward: 0,
        source_commitment: [0u8; 32],
        delay_counter: 0,
        is_verified: true,
        is_spent: false,
        direction: TxDirection::Receive,
        sender: String::new(),
        recipient: recipient.to_string(),
        memo: String::new(),
        timestamp: Utc::now(),
        correlation_id: Hash256::ZERO,
    }
}

/// Fund a wallet with one confirmed receive of `value` attos and
/// return the candidate pool holding that output plus random decoys.
pub fn fund_wallet(
    wallet: &Wallet,
    passphrase: &[u8],
    value: u64,
) -> Vec<RingCandidate> {
    let address = wallet.address(passphrase).expect("open wallet");
    let funding = funding_transaction(&address, value);
    let real = RingCandidate {
        global_index: 0,
        one_time_key: funding.vouts[0].one_time_key,
        commitment: funding.vouts[0].commitment,
        lock_time: 0,
    };
    wallet
        .store()
        .put_transaction(passphrase, receive_record(funding, value, &address))
        .expect("persist funding record");

    let mut pool = vec![real];
    for i in 1..RING_SIZE as u64 * 3 {
        let secret = commitment::random_blind(&mut OsRng);
        let blind = commitment::random_blind(&mut OsRng);
        pool.push(RingCandidate {
            global_index: i,
            one_time_key: (secret * RISTRETTO_BASEPOINT_POINT).compress().to_bytes(),
            commitment: commitment::commit_bytes(i * COIN, &blind),
            lock_time: 0,
        });
    }
    pool
}

/// In-memory chain client with scriptable lookups.
#[derive(Default)]
pub struct MockChain {
    pub chain: Mutex<HashMap<Hash256, TxLookup>>,
    pub mempool: Mutex<HashMap<Hash256, TxLookup>>,
    pub blocks: Mutex<Vec<Block>>,
    pub posted: Mutex<Vec<Transaction>>,
    pub candidates: Mutex<Vec<RingCandidate>>,
    pub fail_post: bool,
}

impl MockChain {
    pub fn with_candidates(candidates: Vec<RingCandidate>) -> Self {
        Self {
            candidates: Mutex::new(candidates),
            ..Self::default()
        }
    }

    pub fn set_chain(&self, txid: Hash256, lookup: TxLookup) {
        self.chain.lock().unwrap().insert(txid, lookup);
    }

    pub fn set_mempool(&self, txid: Hash256, lookup: TxLookup) {
        self.mempool.lock().unwrap().insert(txid, lookup);
    }

    pub fn posted_ids(&self) -> Vec<Hash256> {
        self.posted.lock().unwrap().iter().map(|tx| tx.id).collect()
    }
}

impl ChainClient for MockChain {
    fn get_transaction(&self, txid: &Hash256) -> Result<TxLookup, WalletError> {
        Ok(self
            .chain
            .lock()
            .unwrap()
            .get(txid)
            .cloned()
            .unwrap_or(TxLookup::CertainlyAbsent))
    }

    fn get_mempool_transaction(&self, txid: &Hash256) -> Result<TxLookup, WalletError> {
        Ok(self
            .mempool
            .lock()
            .unwrap()
            .get(txid)
            .cloned()
            .unwrap_or(TxLookup::CertainlyAbsent))
    }

    fn post_transaction(&self, transaction: &Transaction) -> Result<(), WalletError> {
        if self.fail_post {
            return Err(WalletError::SendFailed("relay refused".into()));
        }
        self.posted.lock().unwrap().push(transaction.clone());
        Ok(())
    }

    fn get_blocks(&self, start: u64, count: u64) -> Result<Vec<Block>, WalletError> {
        Ok(self
            .blocks
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.height >= start && b.height < start + count)
            .cloned()
            .collect())
    }

    fn get_block_height(&self) -> Result<u64, WalletError> {
        Ok(self
            .blocks
            .lock()
            .unwrap()
            .iter()
            .map(|b| b.height)
            .max()
            .unwrap_or(0))
    }

    fn ring_candidates(&self) -> Result<Vec<RingCandidate>, WalletError> {
        Ok(self.candidates.lock().unwrap().clone())
    }
}
