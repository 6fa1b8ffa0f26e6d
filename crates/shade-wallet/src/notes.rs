//! Encrypted amount notes attached to outputs.
//!
//! Every confidential output carries the (value, blind, memo) triple
//! the recipient needs to spend it, sealed with AES-256-GCM under the
//! note key both ends derive from the stealth shared secret.
//!
//! # Wire format
//! ```text
//! nonce (12 bytes) || ciphertext + auth_tag
//! ```

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use curve25519_dalek::scalar::Scalar;

use crate::error::WalletError;

const NONCE_LEN: usize = 12;

#[derive(bincode::Encode, bincode::Decode)]
struct NotePlain {
    value: u64,
    blind: [u8; 32],
    memo: String,
}

/// Seal a note under a one-time note key.
pub fn seal(
    note_key: &[u8; 32],
    value: u64,
    blind: &Scalar,
    memo: &str,
) -> Result<Vec<u8>, WalletError> {
    use rand::RngCore;
    let plain = NotePlain {
        value,
        blind: blind.to_bytes(),
        memo: memo.to_string(),
    };
    let encoded = bincode::encode_to_vec(&plain, bincode::config::standard())
        .map_err(|e| WalletError::Serialization(e.to_string()))?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let cipher = Aes256Gcm::new_from_slice(note_key)
        .map_err(|e| WalletError::Encryption(e.to_string()))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), encoded.as_slice())
        .map_err(|e| WalletError::Encryption(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Open a note. Fails if the key is wrong or the note was tampered with.
pub fn open(note_key: &[u8; 32], sealed: &[u8]) -> Result<(u64, Scalar, String), WalletError> {
    if sealed.len() < NONCE_LEN + 16 {
        return Err(WalletError::Encryption("note too short".into()));
    }
    let cipher = Aes256Gcm::new_from_slice(note_key)
        .map_err(|e| WalletError::Encryption(e.to_string()))?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&sealed[..NONCE_LEN]), &sealed[NONCE_LEN..])
        .map_err(|_| WalletError::Encryption("note authentication failed".into()))?;
    let (plain, _): (NotePlain, usize) =
        bincode::decode_from_slice(&plaintext, bincode::config::standard())
            .map_err(|e| WalletError::Serialization(e.to_string()))?;
    let blind = Option::<Scalar>::from(Scalar::from_canonical_bytes(plain.blind))
        .ok_or_else(|| WalletError::Serialization("non-canonical blind".into()))?;
    Ok((plain.value, blind, plain.memo))
}
