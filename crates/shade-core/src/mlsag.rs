//! Two-row MLSAG ring signatures.
//!
//! Row 0 signs knowledge of the one-time spend secret x with P = x*G;
//! row 1 signs knowledge of the blind delta z with D = C - C_pseudo =
//! z*H, which ties the real input's commitment to the pseudo-output
//! commitment without revealing which column is real. The key image
//! I = x*Hp(P) is unique per spent output and makes double spends of
//! the same output linkable.

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::Identity;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha512;

use crate::commitment::{decode_point, random_blind, PEDERSEN_H};
use crate::error::RingError;

const CHALLENGE_DOMAIN: &str = "shade.mlsag.challenge.v1";
const HP_DOMAIN: &[u8] = b"shade.mlsag.hp.v1";

/// An MLSAG signature over one ring.
#[derive(
    Serialize, Deserialize, Clone, Debug, PartialEq, Eq,
    bincode::Encode, bincode::Decode,
)]
pub struct MlsagSignature {
    /// Initial challenge c_0.
    pub challenge: [u8; 32],
    /// Per-column response pair (row 0, row 1).
    pub responses: Vec<[[u8; 32]; 2]>,
    /// Key image of the spent output.
    pub key_image: [u8; 32],
}

/// Hash a public key to a second-basepoint for the key-image row.
fn hash_to_point(public: &[u8; 32]) -> RistrettoPoint {
    let mut input = Vec::with_capacity(HP_DOMAIN.len() + 32);
    input.extend_from_slice(HP_DOMAIN);
    input.extend_from_slice(public);
    RistrettoPoint::hash_from_bytes::<Sha512>(&input)
}

/// Compute the key image I = x*Hp(P) for a one-time key pair.
pub fn key_image(secret: &Scalar, public: &[u8; 32]) -> [u8; 32] {
    (secret * hash_to_point(public)).compress().to_bytes()
}

fn challenge(
    message: &[u8; 32],
    l0: &RistrettoPoint,
    r0: &RistrettoPoint,
    l1: &RistrettoPoint,
) -> Scalar {
    let mut hasher = blake3::Hasher::new_derive_key(CHALLENGE_DOMAIN);
    hasher.update(message);
    hasher.update(l0.compress().as_bytes());
    hasher.update(r0.compress().as_bytes());
    hasher.update(l1.compress().as_bytes());
    let mut wide = [0u8; 64];
    hasher.finalize_xof().fill(&mut wide);
    Scalar::from_bytes_mod_order_wide(&wide)
}

struct Ring {
    keys: Vec<RistrettoPoint>,
    /// D_i = C_i - C_pseudo per column.
    offsets: Vec<RistrettoPoint>,
    key_hashes: Vec<RistrettoPoint>,
}

fn decode_ring(
    ring_keys: &[[u8; 32]],
    ring_commitments: &[[u8; 32]],
    pseudo_commitment: &[u8; 32],
) -> Result<Ring, RingError> {
    if ring_keys.is_empty() {
        return Err(RingError::EmptyRing);
    }
    if ring_keys.len() != ring_commitments.len() {
        return Err(RingError::WidthMismatch {
            keys: ring_keys.len(),
            commitments: ring_commitments.len(),
        });
    }
    let pseudo = decode_point(pseudo_commitment).map_err(|_| RingError::InvalidMember(0))?;
    let mut keys = Vec::with_capacity(ring_keys.len());
    let mut offsets = Vec::with_capacity(ring_keys.len());
    let mut key_hashes = Vec::with_capacity(ring_keys.len());
    for (i, (key, commitment)) in ring_keys.iter().zip(ring_commitments).enumerate() {
        let p = decode_point(key).map_err(|_| RingError::InvalidMember(i))?;
        let c = decode_point(commitment).map_err(|_| RingError::InvalidMember(i))?;
        keys.push(p);
        offsets.push(c - pseudo);
        key_hashes.push(hash_to_point(key));
    }
    Ok(Ring { keys, offsets, key_hashes })
}

/// Sign `message` with the real spend at `secret_index`.
///
/// `one_time_secret` opens `ring_keys[secret_index]` over G and
/// `blind_delta` opens `ring_commitments[secret_index] - pseudo` over
/// H. The caller is responsible for having balanced the pseudo
/// commitment so that delta exists.
pub fn sign<R: RngCore + CryptoRng>(
    message: &[u8; 32],
    ring_keys: &[[u8; 32]],
    ring_commitments: &[[u8; 32]],
    pseudo_commitment: &[u8; 32],
    secret_index: usize,
    one_time_secret: &Scalar,
    blind_delta: &Scalar,
    rng: &mut R,
) -> Result<MlsagSignature, RingError> {
    let ring = decode_ring(ring_keys, ring_commitments, pseudo_commitment)?;
    let n = ring.keys.len();
    if secret_index >= n {
        return Err(RingError::SecretIndexOutOfBounds {
            index: secret_index,
            width: n,
        });
    }

    let image_point = one_time_secret * ring.key_hashes[secret_index];

    let alpha0 = random_blind(rng);
    let alpha1 = random_blind(rng);

    let mut c = vec![Scalar::ZERO; n];
    let mut s = vec![[Scalar::ZERO; 2]; n];

    // Real column commits with fresh nonces.
    c[(secret_index + 1) % n] = challenge(
        message,
        &(alpha0 * RISTRETTO_BASEPOINT_POINT),
        &(alpha0 * ring.key_hashes[secret_index]),
        &(alpha1 * *PEDERSEN_H),
    );

    // Decoy columns close the loop with random responses.
    for k in 1..n {
        let i = (secret_index + k) % n;
        let next = (i + 1) % n;
        s[i] = [random_blind(rng), random_blind(rng)];
        let l0 = s[i][0] * RISTRETTO_BASEPOINT_POINT + c[i] * ring.keys[i];
        let r0 = s[i][0] * ring.key_hashes[i] + c[i] * image_point;
        let l1 = s[i][1] * *PEDERSEN_H + c[i] * ring.offsets[i];
        c[next] = challenge(message, &l0, &r0, &l1);
    }

    s[secret_index] = [
        alpha0 - c[secret_index] * one_time_secret,
        alpha1 - c[secret_index] * blind_delta,
    ];

    Ok(MlsagSignature {
        challenge: c[0].to_bytes(),
        responses: s
            .into_iter()
            .map(|pair| [pair[0].to_bytes(), pair[1].to_bytes()])
            .collect(),
        key_image: image_point.compress().to_bytes(),
    })
}

/// Verify an MLSAG signature: the challenge loop must close on c_0.
pub fn verify(
    message: &[u8; 32],
    ring_keys: &[[u8; 32]],
    ring_commitments: &[[u8; 32]],
    pseudo_commitment: &[u8; 32],
    sig: &MlsagSignature,
) -> Result<(), RingError> {
    let ring = decode_ring(ring_keys, ring_commitments, pseudo_commitment)?;
    let n = ring.keys.len();
    if sig.responses.len() != n {
        return Err(RingError::ResponseCountMismatch {
            got: sig.responses.len(),
            want: n,
        });
    }

    let image_point =
        decode_point(&sig.key_image).map_err(|_| RingError::VerificationFailed)?;
    if image_point == RistrettoPoint::identity() {
        return Err(RingError::VerificationFailed);
    }
    let c0 = Option::<Scalar>::from(Scalar::from_canonical_bytes(sig.challenge))
        .ok_or(RingError::VerificationFailed)?;

    let mut ci = c0;
    for i in 0..n {
        let s0 = Option::<Scalar>::from(Scalar::from_canonical_bytes(sig.responses[i][0]))
            .ok_or(RingError::VerificationFailed)?;
        let s1 = Option::<Scalar>::from(Scalar::from_canonical_bytes(sig.responses[i][1]))
            .ok_or(RingError::VerificationFailed)?;
        let l0 = s0 * RISTRETTO_BASEPOINT_POINT + ci * ring.keys[i];
        let r0 = s0 * ring.key_hashes[i] + ci * image_point;
        let l1 = s1 * *PEDERSEN_H + ci * ring.offsets[i];
        ci = challenge(message, &l0, &r0, &l1);
    }

    if ci == c0 {
        Ok(())
    } else {
        Err(RingError::VerificationFailed)
    }
}
