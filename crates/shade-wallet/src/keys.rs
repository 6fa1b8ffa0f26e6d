//! Seed management, deterministic key derivation, and stealth addresses.
//!
//! Uses BLAKE3 keyed derivation to walk a hardened path from a 32-byte
//! master seed down to the account's spend and scan scalar pairs. This
//! is simpler than BIP-32 (which does not map onto Ristretto scalars)
//! while keeping the same deterministic, recoverable properties. The
//! scan key lives one index above the spend key so a view-only scanner
//! can be handed the scan secret without the ability to spend.

use bip39::{Language, Mnemonic};
use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::scalar::Scalar;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::WalletError;

/// BLAKE3 KDF context for the master extended key.
const MASTER_CONTEXT: &str = "shade-wallet-master-key-v1";

/// BLAKE3 KDF context for child scalar derivation.
const CHILD_CONTEXT: &str = "shade-wallet-child-key-v1";

/// BLAKE3 KDF context for child chain codes.
const CHAIN_CODE_CONTEXT: &str = "shade-wallet-chain-code-v1";

/// Version byte prefixed to stealth address payloads.
const ADDRESS_VERSION: u8 = 0x73;

/// Checksum length appended to address payloads.
const ADDRESS_CHECKSUM_LEN: usize = 4;

/// Words in the recovery phrase of a 32-byte seed.
const PHRASE_WORDS: usize = 24;

/// Purpose level of every derivation path.
const PURPOSE: u32 = 44;

/// Registered coin type for Shade.
const COIN_TYPE: u32 = 703;

/// A 32-byte master seed for deterministic key derivation.
///
/// Secret material is zeroized on drop to prevent leaking key material
/// in freed memory.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Seed {
    bytes: [u8; 32],
}

impl Seed {
    /// Generate a random seed from the OS cryptographic RNG.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Create a seed from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Get the raw seed bytes. Handle with care.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Encode the seed as its 24-word English recovery phrase.
    pub fn to_phrase(&self) -> String {
        Mnemonic::from_entropy_in(Language::English, &self.bytes)
            .expect("32-byte entropy encodes to 24 words")
            .to_string()
    }

    /// Rebuild a seed from a recovery phrase.
    ///
    /// Case and ragged whitespace are forgiven; the word count and the
    /// phrase checksum are not.
    pub fn from_phrase(phrase: &str) -> Result<Self, WalletError> {
        let words: Vec<&str> = phrase.split_whitespace().collect();
        if words.len() != PHRASE_WORDS {
            return Err(WalletError::InvalidMnemonic(format!(
                "expected {PHRASE_WORDS} words, got {}",
                words.len()
            )));
        }
        let normalized = words.join(" ").to_lowercase();
        let mnemonic = Mnemonic::parse_in(Language::English, &normalized)
            .map_err(|e| WalletError::InvalidMnemonic(e.to_string()))?;
        // 24 words carry exactly 32 bytes of entropy.
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&mnemonic.to_entropy());
        Ok(Self { bytes })
    }
}

impl Clone for Seed {
    fn clone(&self) -> Self {
        Self { bytes: self.bytes }
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seed")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Hardened account path `m/44'/703'/n'`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DerivationPath {
    pub account: u32,
}

impl DerivationPath {
    pub fn account(account: u32) -> Self {
        Self { account }
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m/{PURPOSE}'/{COIN_TYPE}'/{}'", self.account)
    }
}

impl FromStr for DerivationPath {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 4 || parts[0] != "m" {
            return Err(WalletError::InvalidKeyMaterial(format!(
                "malformed derivation path: {s}"
            )));
        }
        let index = |part: &str, expected: Option<u32>| -> Result<u32, WalletError> {
            let digits = part.strip_suffix('\'').ok_or_else(|| {
                WalletError::InvalidKeyMaterial(format!("non-hardened path component: {part}"))
            })?;
            let value: u32 = digits.parse().map_err(|_| {
                WalletError::InvalidKeyMaterial(format!("invalid path component: {part}"))
            })?;
            if let Some(want) = expected {
                if value != want {
                    return Err(WalletError::InvalidKeyMaterial(format!(
                        "unexpected path component: {part}"
                    )));
                }
            }
            Ok(value)
        };
        index(parts[1], Some(PURPOSE))?;
        index(parts[2], Some(COIN_TYPE))?;
        let account = index(parts[3], None)?;
        Ok(Self { account })
    }
}

/// An extended key: a scalar secret with a chain code for child
/// derivation. Intermediate levels of the path live here.
#[derive(Zeroize, ZeroizeOnDrop)]
struct ExtendedKey {
    secret: [u8; 32],
    chain_code: [u8; 32],
}

impl ExtendedKey {
    fn master(seed: &Seed) -> Self {
        let mut wide = [0u8; 64];
        blake3::Hasher::new_derive_key(MASTER_CONTEXT)
            .update(seed.as_bytes())
            .finalize_xof()
            .fill(&mut wide);
        Self {
            secret: Scalar::from_bytes_mod_order_wide(&wide).to_bytes(),
            chain_code: blake3::derive_key(CHAIN_CODE_CONTEXT, &wide),
        }
    }

    fn child(&self, index: u32) -> Self {
        let mut ikm = Vec::with_capacity(32 + 32 + 4);
        ikm.extend_from_slice(&self.chain_code);
        ikm.extend_from_slice(&self.secret);
        ikm.extend_from_slice(&index.to_le_bytes());
        let mut wide = [0u8; 64];
        blake3::Hasher::new_derive_key(CHILD_CONTEXT)
            .update(&ikm)
            .finalize_xof()
            .fill(&mut wide);
        let child = Self {
            secret: Scalar::from_bytes_mod_order_wide(&wide).to_bytes(),
            chain_code: blake3::derive_key(CHAIN_CODE_CONTEXT, &wide),
        };
        ikm.zeroize();
        child
    }

    fn scalar(&self) -> Scalar {
        // The secret is always written from a reduced scalar.
        Scalar::from_bytes_mod_order(self.secret)
    }
}

/// Secret scalars re-derived for the duration of one operation.
///
/// Never cached: callers obtain a fresh pair from [`KeySet::unlock`]
/// and let it drop when the operation completes.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct UnlockedKeys {
    pub spend_secret: Scalar,
    pub scan_secret: Scalar,
}

impl fmt::Debug for UnlockedKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnlockedKeys")
            .field("spend_secret", &"[REDACTED]")
            .field("scan_secret", &"[REDACTED]")
            .finish()
    }
}

/// A published stealth address: the spend and scan public keys.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StealthAddress {
    pub spend_public: [u8; 32],
    pub scan_public: [u8; 32],
}

impl StealthAddress {
    fn checksum(payload: &[u8]) -> [u8; ADDRESS_CHECKSUM_LEN] {
        let digest = blake3::hash(payload);
        let mut out = [0u8; ADDRESS_CHECKSUM_LEN];
        out.copy_from_slice(&digest.as_bytes()[..ADDRESS_CHECKSUM_LEN]);
        out
    }
}

impl fmt::Display for StealthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut payload = Vec::with_capacity(1 + 64 + ADDRESS_CHECKSUM_LEN);
        payload.push(ADDRESS_VERSION);
        payload.extend_from_slice(&self.spend_public);
        payload.extend_from_slice(&self.scan_public);
        let check = Self::checksum(&payload);
        payload.extend_from_slice(&check);
        write!(f, "{}", bs58::encode(payload).into_string())
    }
}

impl fmt::Debug for StealthAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StealthAddress({self})")
    }
}

impl FromStr for StealthAddress {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let payload = bs58::decode(s)
            .into_vec()
            .map_err(|e| WalletError::InvalidAddress(e.to_string()))?;
        if payload.len() != 1 + 64 + ADDRESS_CHECKSUM_LEN {
            return Err(WalletError::InvalidAddress(format!(
                "wrong length: {}",
                payload.len()
            )));
        }
        if payload[0] != ADDRESS_VERSION {
            return Err(WalletError::InvalidAddress(format!(
                "unknown version byte: {:#04x}",
                payload[0]
            )));
        }
        let (body, check) = payload.split_at(payload.len() - ADDRESS_CHECKSUM_LEN);
        if Self::checksum(body) != check {
            return Err(WalletError::InvalidAddress("checksum mismatch".into()));
        }
        let mut spend_public = [0u8; 32];
        let mut scan_public = [0u8; 32];
        spend_public.copy_from_slice(&body[1..33]);
        scan_public.copy_from_slice(&body[33..65]);
        Ok(Self {
            spend_public,
            scan_public,
        })
    }
}

/// An account's key material: seed, path, and the derived address.
///
/// Secrets are never held at rest; [`KeySet::unlock`] re-derives the
/// spend and scan scalars from the seed on every call.
pub struct KeySet {
    seed: Seed,
    path: DerivationPath,
    address: StealthAddress,
}

impl KeySet {
    /// Derive the account key set from a seed.
    pub fn from_seed(seed: Seed, path: DerivationPath) -> Self {
        let unlocked = unlock_at(&seed, path);
        let address = StealthAddress {
            spend_public: (unlocked.spend_secret * RISTRETTO_BASEPOINT_POINT)
                .compress()
                .to_bytes(),
            scan_public: (unlocked.scan_secret * RISTRETTO_BASEPOINT_POINT)
                .compress()
                .to_bytes(),
        };
        Self { seed, path, address }
    }

    /// Rebuild a key set from externally supplied secret material.
    ///
    /// Rejects oversized secrets rather than silently truncating them.
    pub fn from_secret_bytes(secret: &[u8], path: DerivationPath) -> Result<Self, WalletError> {
        if secret.len() > 32 {
            return Err(WalletError::InvalidKeyMaterial(format!(
                "secret material too long: {} > 32 bytes",
                secret.len()
            )));
        }
        let mut bytes = [0u8; 32];
        bytes[..secret.len()].copy_from_slice(secret);
        Ok(Self::from_seed(Seed::from_bytes(bytes), path))
    }

    pub fn address(&self) -> &StealthAddress {
        &self.address
    }

    pub fn path(&self) -> DerivationPath {
        self.path
    }

    /// Re-derive the spend and scan secrets for one operation.
    pub fn unlock(&self) -> UnlockedKeys {
        unlock_at(&self.seed, self.path)
    }

    pub(crate) fn seed(&self) -> &Seed {
        &self.seed
    }
}

impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySet")
            .field("path", &self.path.to_string())
            .field("address", &self.address)
            .finish()
    }
}

/// Walk the hardened path and derive the account's scalar pair.
///
/// Spend key at the path's account index, scan key at the index above.
fn unlock_at(seed: &Seed, path: DerivationPath) -> UnlockedKeys {
    let coin_level = ExtendedKey::master(seed).child(PURPOSE).child(COIN_TYPE);
    let spend = coin_level.child(path.account);
    let scan = coin_level.child(path.account.wrapping_add(1));
    UnlockedKeys {
        spend_secret: spend.scalar(),
        scan_secret: scan.scalar(),
    }
}

/// Serializable form of a key set for store persistence.
#[derive(Serialize, Deserialize, Clone, bincode::Encode, bincode::Decode)]
pub struct KeySetData {
    pub seed: [u8; 32],
    /// Account index of the `m/44'/703'/n'` path.
    pub account: u32,
}

impl KeySetData {
    pub fn from_key_set(key_set: &KeySet) -> Self {
        Self {
            seed: *key_set.seed().as_bytes(),
            account: key_set.path().account,
        }
    }

    pub fn to_key_set(&self) -> KeySet {
        KeySet::from_seed(Seed::from_bytes(self.seed), DerivationPath::account(self.account))
    }
}

impl fmt::Debug for KeySetData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySetData")
            .field("seed", &"[REDACTED]")
            .field("account", &self.account)
            .finish()
    }
}
