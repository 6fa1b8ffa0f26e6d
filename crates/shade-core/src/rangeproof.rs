//! Bulletproof range proofs for committed amounts.
//!
//! Each confidential output carries a 64-bit single-value proof that
//! its commitment opens to a value in `[0, 2^64)`. The `bulletproofs`
//! crate works over `curve25519-dalek-ng` types; conversion happens at
//! this boundary via compressed encodings, and the proving generators
//! are pinned to the same G and H as [`crate::commitment`] so the
//! proven commitment is byte-identical to the wallet's.

use bulletproofs::{BulletproofGens, PedersenGens, RangeProof};
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek_ng::ristretto::CompressedRistretto as NgCompressed;
use curve25519_dalek_ng::scalar::Scalar as NgScalar;
use merlin::Transcript;
use std::sync::LazyLock;

use crate::commitment::PEDERSEN_H;
use crate::constants::RANGE_PROOF_BITS;
use crate::error::ProofError;

const TRANSCRIPT_LABEL: &[u8] = b"shade.range-proof.v1";

static PC_GENS: LazyLock<PedersenGens> = LazyLock::new(|| {
    // Ristretto encodings are shared between the two dalek forks, so a
    // canonical point always survives the round trip.
    let h_bytes = PEDERSEN_H.compress().to_bytes();
    let b_blinding = NgCompressed(h_bytes).decompress().expect("valid H");
    PedersenGens {
        B: curve25519_dalek_ng::constants::RISTRETTO_BASEPOINT_POINT,
        B_blinding: b_blinding,
    }
});

static BP_GENS: LazyLock<BulletproofGens> =
    LazyLock::new(|| BulletproofGens::new(RANGE_PROOF_BITS, 1));

// The transcript carries only the fixed domain label. Anything
// wallet-private folded in here would leave the broadcast proof
// unverifiable for nodes and recipients.
fn transcript() -> Transcript {
    Transcript::new(TRANSCRIPT_LABEL)
}

/// Prove that `commit(value, blind)` opens to a 64-bit value.
///
/// Returns the serialized proof and the compressed commitment the
/// prover produced; the caller checks the latter against the output's
/// own commitment bytes.
pub fn prove(value: u64, blind: &Scalar) -> Result<(Vec<u8>, [u8; 32]), ProofError> {
    let ng_blind = NgScalar::from_bytes_mod_order(blind.to_bytes());
    let mut t = transcript();
    let (proof, committed) = RangeProof::prove_single(
        &BP_GENS,
        &PC_GENS,
        &mut t,
        value,
        &ng_blind,
        RANGE_PROOF_BITS,
    )
    .map_err(|e| ProofError::Prove(e.to_string()))?;
    Ok((proof.to_bytes(), committed.to_bytes()))
}

/// Verify a serialized range proof against a commitment.
pub fn verify(commitment: &[u8; 32], proof_bytes: &[u8]) -> Result<(), ProofError> {
    let proof = RangeProof::from_bytes(proof_bytes).map_err(|_| ProofError::Malformed)?;
    let committed = NgCompressed(*commitment);
    // Reject non-canonical commitment encodings up front.
    if committed.decompress().is_none() {
        return Err(ProofError::InvalidCommitment);
    }
    let mut t = transcript();
    proof
        .verify_single(&BP_GENS, &PC_GENS, &mut t, &committed, RANGE_PROOF_BITS)
        .map_err(|_| ProofError::Rejected)
}
