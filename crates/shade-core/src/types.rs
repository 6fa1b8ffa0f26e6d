//! Wire types for confidential transactions.
//!
//! All monetary values are in attos (1 SHADE = 10^9 attos). Group
//! elements and scalars cross this boundary as 32-byte arrays; the
//! crypto modules own the typed views.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;
use crate::mlsag::MlsagSignature;

/// A 32-byte hash value.
///
/// Used for transaction IDs (BLAKE3), block hashes, and VDF challenges.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// The zero hash (32 zero bytes). Placeholder for unset ids.
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Hash256 {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| CoreError::Encoding(e.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CoreError::Encoding("hash must be 32 bytes".into()))?;
        Ok(Self(bytes))
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Role of an output within its transaction.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash,
    bincode::Encode, bincode::Decode,
)]
pub enum CoinType {
    /// Value paid to the recipient.
    Payment,
    /// Value returned to the sender.
    Change,
    /// Staking reward minted by a coinstake transaction.
    Coinstake,
    /// Block subsidy minted by a coinbase transaction.
    Coinbase,
}

/// A confidential transaction output.
///
/// The committed amount is hidden; `amount` is nonzero only for minted
/// reward outputs, whose value is public by protocol rule.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Vout {
    /// Visible amount. Zero for all confidential outputs.
    pub amount: u64,
    /// Pedersen commitment to the output value.
    pub commitment: [u8; 32],
    /// Ephemeral public key of the stealth payment (R = r*G).
    pub ephemeral_key: [u8; 32],
    /// Earliest time this output may be spent, 0 when unrestricted.
    pub lock_time: u64,
    /// Amount/blind/memo payload, AES-GCM encrypted to the scan key.
    pub note: Vec<u8>,
    /// One-time destination key (P = B + Hs(r*S)*G).
    pub one_time_key: [u8; 32],
    /// Spend-condition script, when the output carries one.
    pub script: Option<String>,
    /// Role of this output.
    pub coin_type: CoinType,
}

/// A transaction input: a key image plus the ring it hides in.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Vin {
    /// Key image of the spent output. One per output, ever.
    pub key_image: [u8; 32],
    /// Global indices of the ring members, including the real spend.
    pub key_offsets: Vec<u64>,
}

/// VDF timelock attached to a transaction.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct Vtime {
    /// Sequential square-root iterations evaluated.
    pub iterations: u64,
    /// Field element the delay was evaluated from.
    pub hash_input: [u8; 32],
    /// Witness: the evaluator's final field element.
    pub nonce_output: [u8; 32],
    /// Wall-clock milliseconds the evaluation took.
    pub ticks: u64,
    /// Unix seconds before which the transaction is not final.
    pub lock_time: u64,
    /// Conditional-unlock script bound to the delay.
    pub script: String,
}

/// A range proof paired with the commitment it attests to.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct RangeProofEntry {
    pub commitment: [u8; 32],
    pub proof: Vec<u8>,
}

/// Ring signature payload carried by a transaction.
///
/// The ring members travel with the signature so the proof is
/// self-contained: column `i` pairs `ring_keys[i]` with
/// `ring_commitments[i]`.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct RingPayload {
    pub ring_keys: Vec<[u8; 32]>,
    pub ring_commitments: Vec<[u8; 32]>,
    /// Pseudo-output commitment the ring balances against.
    pub pseudo_commitment: [u8; 32],
    pub signature: MlsagSignature,
}

/// A complete confidential transaction.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Transaction {
    /// Wire-format version.
    pub version: u16,
    /// Ring width used by every input.
    pub mix: u16,
    pub vins: Vec<Vin>,
    pub vouts: Vec<Vout>,
    pub range_proofs: Vec<RangeProofEntry>,
    pub ring_sig: RingPayload,
    pub vtime: Vtime,
    /// BLAKE3 over the canonical encoding with this field zeroed.
    /// Set last, after every other field is final.
    pub id: Hash256,
}

impl Transaction {
    /// Compute the transaction ID over the canonical encoding.
    ///
    /// The `id` field is zeroed for hashing so the digest covers every
    /// other populated field and nothing else.
    pub fn compute_id(&self) -> Result<Hash256, CoreError> {
        let mut unsealed = self.clone();
        unsealed.id = Hash256::ZERO;
        let encoded = bincode::encode_to_vec(&unsealed, bincode::config::standard())
            .map_err(|e| CoreError::Encoding(e.to_string()))?;
        Ok(Hash256(blake3::hash(&encoded).into()))
    }

    /// Check the stored id against a recomputation.
    pub fn verify_id(&self) -> Result<bool, CoreError> {
        Ok(self.compute_id()? == self.id)
    }

    pub fn is_coinstake(&self) -> bool {
        self.vouts
            .iter()
            .any(|v| v.coin_type == CoinType::Coinstake)
    }

    /// Sum of visible (minted) output amounts. None on overflow.
    pub fn total_minted(&self) -> Option<u64> {
        self.vouts
            .iter()
            .try_fold(0u64, |acc, out| acc.checked_add(out.amount))
    }
}

/// A block as seen by the wallet's receive scanner.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct Block {
    pub height: u64,
    pub hash: Hash256,
    pub transactions: Vec<Transaction>,
}
