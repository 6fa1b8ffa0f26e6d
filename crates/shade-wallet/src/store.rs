//! Encrypted single-file wallet store.
//!
//! # File format
//! ```text
//! header_len (4 bytes LE) || header_json || encrypted_payload
//! ```
//! The header is unencrypted JSON containing magic bytes and version.
//! The payload is the AES-256-GCM encrypted JSON of [`StoreData`]:
//! the account key set plus every wallet transaction record. Each
//! operation is one logical load-mutate-save; callers serialize
//! concurrent access per wallet.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use shade_core::types::Hash256;

use crate::encryption;
use crate::error::WalletError;
use crate::keys::KeySetData;
use crate::records::WalletTransaction;

/// Magic bytes identifying a Shade store file.
pub const STORE_MAGIC: &[u8; 4] = b"SHST";

/// Current store file format version.
pub const STORE_VERSION: u32 = 1;

/// Store file header serialized as JSON.
#[derive(Serialize, Deserialize)]
struct StoreFileHeader {
    magic: String,
    version: u32,
}

/// Everything the store persists.
#[derive(Serialize, Deserialize)]
struct StoreData {
    key_set: KeySetData,
    transactions: Vec<WalletTransaction>,
}

/// Handle to an encrypted wallet store on disk.
#[derive(Debug)]
pub struct WalletStore {
    path: PathBuf,
}

impl WalletStore {
    /// Open a handle to an existing (or soon to be created) store file.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Initialize a new store holding the key set and no transactions.
    pub fn create(
        path: impl Into<PathBuf>,
        passphrase: &[u8],
        key_set: KeySetData,
    ) -> Result<Self, WalletError> {
        let store = Self::open(path);
        if store.path.exists() {
            return Err(WalletError::PersistenceFailed(format!(
                "store already exists: {}",
                store.path.display()
            )));
        }
        store.save(
            passphrase,
            &StoreData {
                key_set,
                transactions: Vec::new(),
            },
        )?;
        Ok(store)
    }

    /// Load the persisted key set.
    pub fn key_set(&self, passphrase: &[u8]) -> Result<KeySetData, WalletError> {
        Ok(self.load(passphrase)?.key_set)
    }

    /// All stored wallet transactions, in insertion order.
    pub fn transactions(&self, passphrase: &[u8]) -> Result<Vec<WalletTransaction>, WalletError> {
        Ok(self.load(passphrase)?.transactions)
    }

    /// Look up a record by transaction id.
    pub fn get_transaction(
        &self,
        passphrase: &[u8],
        txid: &Hash256,
    ) -> Result<WalletTransaction, WalletError> {
        self.load(passphrase)?
            .transactions
            .into_iter()
            .find(|record| record.txid() == *txid)
            .ok_or_else(|| WalletError::TransactionNotFound(txid.to_string()))
    }

    /// Insert or replace a record, keyed by transaction id.
    pub fn put_transaction(
        &self,
        passphrase: &[u8],
        record: WalletTransaction,
    ) -> Result<(), WalletError> {
        let mut data = self.load(passphrase)?;
        match data
            .transactions
            .iter_mut()
            .find(|existing| existing.txid() == record.txid())
        {
            Some(existing) => *existing = record,
            None => data.transactions.push(record),
        }
        self.save(passphrase, &data)
    }

    /// Delete a record by transaction id.
    pub fn delete_transaction(
        &self,
        passphrase: &[u8],
        txid: &Hash256,
    ) -> Result<(), WalletError> {
        let mut data = self.load(passphrase)?;
        let before = data.transactions.len();
        data.transactions.retain(|record| record.txid() != *txid);
        if data.transactions.len() == before {
            return Err(WalletError::TransactionNotFound(txid.to_string()));
        }
        self.save(passphrase, &data)
    }

    fn load(&self, passphrase: &[u8]) -> Result<StoreData, WalletError> {
        let file_data = std::fs::read(&self.path)
            .map_err(|e| WalletError::PersistenceFailed(e.to_string()))?;

        if file_data.len() < 4 {
            return Err(WalletError::CorruptedStore("file too short".into()));
        }

        let header_len = u32::from_le_bytes(
            file_data[..4]
                .try_into()
                .map_err(|_| WalletError::CorruptedStore("header length".into()))?,
        ) as usize;
        if file_data.len() < 4 + header_len {
            return Err(WalletError::CorruptedStore("header truncated".into()));
        }

        let header: StoreFileHeader = serde_json::from_slice(&file_data[4..4 + header_len])
            .map_err(|e| WalletError::CorruptedStore(format!("invalid header: {e}")))?;
        if header.magic != String::from_utf8_lossy(STORE_MAGIC).as_ref() {
            return Err(WalletError::CorruptedStore("invalid magic bytes".into()));
        }
        if header.version != STORE_VERSION {
            return Err(WalletError::CorruptedStore(format!(
                "unsupported version: {}",
                header.version
            )));
        }

        let payload = encryption::decrypt(&file_data[4 + header_len..], passphrase)?;
        serde_json::from_slice(&payload)
            .map_err(|e| WalletError::CorruptedStore(format!("invalid payload: {e}")))
    }

    fn save(&self, passphrase: &[u8], data: &StoreData) -> Result<(), WalletError> {
        let header = StoreFileHeader {
            magic: String::from_utf8_lossy(STORE_MAGIC).to_string(),
            version: STORE_VERSION,
        };
        let header_json =
            serde_json::to_vec(&header).map_err(|e| WalletError::Serialization(e.to_string()))?;
        let payload =
            serde_json::to_vec(data).map_err(|e| WalletError::Serialization(e.to_string()))?;
        let encrypted = encryption::encrypt(&payload, passphrase)?;

        let mut file_data = Vec::with_capacity(4 + header_json.len() + encrypted.len());
        file_data.extend_from_slice(&(header_json.len() as u32).to_le_bytes());
        file_data.extend_from_slice(&header_json);
        file_data.extend_from_slice(&encrypted);

        std::fs::write(&self.path, &file_data)
            .map_err(|e| WalletError::PersistenceFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{DerivationPath, KeySet, Seed};
    use crate::records::TxDirection;
    use chrono::Utc;
    use shade_core::mlsag::MlsagSignature;
    use shade_core::types::{RingPayload, Transaction, Vtime};

    fn key_set_data() -> KeySetData {
        let ks = KeySet::from_seed(Seed::from_bytes([1u8; 32]), DerivationPath::account(0));
        KeySetData::from_key_set(&ks)
    }

    fn record(id: u8) -> WalletTransaction {
        WalletTransaction {
            transaction: Transaction {
                version: 2,
                mix: 22,
                vins: vec![],
                vouts: vec![],
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
            payment: 40,
            change: 60,
            reward: 0,
            source_commitment: [0u8; 32],
            delay_counter: 0,
            is_verified: false,
            is_spent: false,
            direction: TxDirection::Send,
            sender: String::new(),
            recipient: String::new(),
            memo: String::new(),
            timestamp: Utc::now(),
            correlation_id: Hash256::ZERO,
        }
    }

    #[test]
    fn create_and_reload_key_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.shade");
        let store = WalletStore::create(&path, b"pass", key_set_data()).unwrap();
        let loaded = store.key_set(b"pass").unwrap();
        assert_eq!(loaded.seed, key_set_data().seed);
        assert_eq!(loaded.account, 0);
    }

    #[test]
    fn create_refuses_to_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.shade");
        WalletStore::create(&path, b"pass", key_set_data()).unwrap();
        let err = WalletStore::create(&path, b"pass", key_set_data()).unwrap_err();
        assert!(matches!(err, WalletError::PersistenceFailed(_)));
    }

    #[test]
    fn put_get_delete_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.shade");
        let store = WalletStore::create(&path, b"pass", key_set_data()).unwrap();

        store.put_transaction(b"pass", record(1)).unwrap();
        store.put_transaction(b"pass", record(2)).unwrap();
        assert_eq!(store.transactions(b"pass").unwrap().len(), 2);

        let got = store.get_transaction(b"pass", &Hash256([1; 32])).unwrap();
        assert_eq!(got.txid(), Hash256([1; 32]));

        store.delete_transaction(b"pass", &Hash256([1; 32])).unwrap();
        assert_eq!(store.transactions(b"pass").unwrap().len(), 1);

        let err = store
            .get_transaction(b"pass", &Hash256([1; 32]))
            .unwrap_err();
        assert!(matches!(err, WalletError::TransactionNotFound(_)));
    }

    #[test]
    fn put_replaces_existing_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.shade");
        let store = WalletStore::create(&path, b"pass", key_set_data()).unwrap();

        store.put_transaction(b"pass", record(1)).unwrap();
        let mut updated = record(1);
        updated.is_verified = true;
        store.put_transaction(b"pass", updated).unwrap();

        let all = store.transactions(b"pass").unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].is_verified);
    }

    #[test]
    fn delete_missing_record_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.shade");
        let store = WalletStore::create(&path, b"pass", key_set_data()).unwrap();
        let err = store
            .delete_transaction(b"pass", &Hash256([9; 32]))
            .unwrap_err();
        assert!(matches!(err, WalletError::TransactionNotFound(_)));
    }

    #[test]
    fn wrong_passphrase_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.shade");
        let store = WalletStore::create(&path, b"correct", key_set_data()).unwrap();
        let err = store.transactions(b"wrong").unwrap_err();
        assert_eq!(err, WalletError::InvalidPassphrase);
    }

    #[test]
    fn corrupted_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.shade");
        std::fs::write(&path, b"garbage").unwrap();
        let store = WalletStore::open(&path);
        let err = store.transactions(b"pass").unwrap_err();
        assert!(matches!(err, WalletError::CorruptedStore(_)));
    }

    #[test]
    fn missing_file_is_persistence_failure() {
        let store = WalletStore::open("/nonexistent/path/wallet.shade");
        let err = store.transactions(b"pass").unwrap_err();
        assert!(matches!(err, WalletError::PersistenceFailed(_)));
    }
}
