//! Decoy selection and ring signing.
//!
//! Rings are drawn from the chain's output pool. A bad member (locked,
//! duplicated, or undecodable) aborts the whole draw and the ring is
//! rebuilt from a fresh shuffle, bounded by
//! [`MAX_RING_ATTEMPTS`](shade_core::constants::MAX_RING_ATTEMPTS) so
//! a thin or poisoned pool cannot wedge the wallet.

use rand::seq::SliceRandom;
use rand::{CryptoRng, Rng, RngCore};

use curve25519_dalek::scalar::Scalar;
use shade_core::commitment::decode_point;
use shade_core::constants::MAX_RING_ATTEMPTS;
use shade_core::error::RingError;
use shade_core::mlsag::{self, MlsagSignature};

use crate::error::WalletError;

/// An output the chain exposes for decoy selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RingCandidate {
    /// Global output index on chain.
    pub global_index: u64,
    pub one_time_key: [u8; 32],
    pub commitment: [u8; 32],
    /// Earliest unix time the output is spendable.
    pub lock_time: u64,
}

/// A fully assembled ring, ready to sign.
#[derive(Clone, Debug)]
pub struct Ring {
    pub keys: Vec<[u8; 32]>,
    pub commitments: Vec<[u8; 32]>,
    /// Global indices per column, parallel to `keys`.
    pub key_offsets: Vec<u64>,
    /// Column holding the real spend.
    pub secret_index: usize,
}

fn candidate_valid(candidate: &RingCandidate, now: u64) -> bool {
    candidate.lock_time <= now
        && decode_point(&candidate.one_time_key).is_ok()
        && decode_point(&candidate.commitment).is_ok()
}

/// Build a ring of `width` columns around the real spend.
///
/// The real output must itself be present in `pool` (it is on chain,
/// or it could not be spent); its pool entry supplies the global index.
pub fn build_ring<R: RngCore + CryptoRng>(
    pool: &[RingCandidate],
    real_key: &[u8; 32],
    width: usize,
    now: u64,
    rng: &mut R,
) -> Result<Ring, WalletError> {
    if width < 2 {
        return Err(WalletError::RingPrepareFailed(format!(
            "ring width {width} below minimum"
        )));
    }
    let real = pool
        .iter()
        .find(|c| c.one_time_key == *real_key)
        .ok_or_else(|| {
            WalletError::RingPrepareFailed("real output not present in decoy pool".into())
        })?;

    let mut decoy_pool: Vec<&RingCandidate> = pool
        .iter()
        .filter(|c| c.one_time_key != *real_key)
        .collect();
    if decoy_pool.len() < width - 1 {
        return Err(WalletError::RingPrepareFailed(format!(
            "decoy pool too small: {} < {}",
            decoy_pool.len(),
            width - 1
        )));
    }

    for _attempt in 0..MAX_RING_ATTEMPTS {
        decoy_pool.shuffle(rng);
        let draw = &decoy_pool[..width - 1];

        // One bad member invalidates the whole draw.
        let mut keys_seen = std::collections::HashSet::new();
        let valid = draw
            .iter()
            .all(|c| candidate_valid(c, now) && keys_seen.insert(c.one_time_key));
        if !valid {
            continue;
        }

        let secret_index = rng.gen_range(0..width);
        let mut keys = Vec::with_capacity(width);
        let mut commitments = Vec::with_capacity(width);
        let mut key_offsets = Vec::with_capacity(width);
        let mut decoys = draw.iter();
        for column in 0..width {
            let member = if column == secret_index {
                real
            } else {
                decoys.next().ok_or_else(|| {
                    WalletError::RingPrepareFailed("decoy draw exhausted".into())
                })?
            };
            keys.push(member.one_time_key);
            commitments.push(member.commitment);
            key_offsets.push(member.global_index);
        }

        return Ok(Ring {
            keys,
            commitments,
            key_offsets,
            secret_index,
        });
    }

    Err(WalletError::DecoySelectionExhausted {
        attempts: MAX_RING_ATTEMPTS,
    })
}

/// Sign a ring and immediately self-verify the result.
///
/// A signature that fails its own verification is fatal: nothing
/// downstream may persist or broadcast it.
pub fn sign_and_verify<R: RngCore + CryptoRng>(
    message: &[u8; 32],
    ring: &Ring,
    pseudo_commitment: &[u8; 32],
    one_time_secret: &Scalar,
    blind_delta: &Scalar,
    rng: &mut R,
) -> Result<MlsagSignature, WalletError> {
    let sig = mlsag::sign(
        message,
        &ring.keys,
        &ring.commitments,
        pseudo_commitment,
        ring.secret_index,
        one_time_secret,
        blind_delta,
        rng,
    )
    .map_err(|e| match e {
        RingError::EmptyRing
        | RingError::WidthMismatch { .. }
        | RingError::SecretIndexOutOfBounds { .. }
        | RingError::InvalidMember(_) => WalletError::RingPrepareFailed(e.to_string()),
        other => WalletError::RingGenerateFailed(other.to_string()),
    })?;

    mlsag::verify(
        message,
        &ring.keys,
        &ring.commitments,
        pseudo_commitment,
        &sig,
    )
    .map_err(|e| WalletError::RingVerifyFailed(e.to_string()))?;

    Ok(sig)
}

#[cfg(test)]
mod tests {
    use super::*;
    use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
    use rand::rngs::OsRng;
    use shade_core::commitment::{commit_bytes, random_blind};

    fn candidate(global_index: u64, lock_time: u64) -> RingCandidate {
        let mut rng = OsRng;
        RingCandidate {
            global_index,
            one_time_key: (random_blind(&mut rng) * RISTRETTO_BASEPOINT_POINT)
                .compress()
                .to_bytes(),
            commitment: commit_bytes(global_index, &random_blind(&mut rng)),
            lock_time,
        }
    }

    fn pool_with_real(size: usize, real: &RingCandidate) -> Vec<RingCandidate> {
        let mut pool: Vec<RingCandidate> = (0..size as u64).map(|i| candidate(i, 0)).collect();
        pool.push(real.clone());
        pool
    }

    #[test]
    fn ring_contains_real_spend_once() {
        let real = candidate(1000, 0);
        let pool = pool_with_real(30, &real);
        let ring = build_ring(&pool, &real.one_time_key, 11, 100, &mut OsRng).unwrap();

        assert_eq!(ring.keys.len(), 11);
        assert_eq!(ring.commitments.len(), 11);
        assert_eq!(ring.key_offsets.len(), 11);
        let hits = ring
            .keys
            .iter()
            .filter(|k| **k == real.one_time_key)
            .count();
        assert_eq!(hits, 1);
        assert_eq!(ring.keys[ring.secret_index], real.one_time_key);
        assert_eq!(ring.key_offsets[ring.secret_index], 1000);
    }

    #[test]
    fn ring_members_are_distinct() {
        let real = candidate(1000, 0);
        let pool = pool_with_real(30, &real);
        let ring = build_ring(&pool, &real.one_time_key, 11, 100, &mut OsRng).unwrap();
        let unique: std::collections::HashSet<_> = ring.keys.iter().collect();
        assert_eq!(unique.len(), ring.keys.len());
    }

    #[test]
    fn locked_decoys_are_avoided() {
        let real = candidate(1000, 0);
        // Plenty of valid members plus a couple of locked ones.
        let mut pool = pool_with_real(30, &real);
        pool.push(candidate(2000, u64::MAX));
        pool.push(candidate(2001, u64::MAX));

        let ring = build_ring(&pool, &real.one_time_key, 5, 100, &mut OsRng).unwrap();
        assert!(!ring.key_offsets.contains(&2000));
        assert!(!ring.key_offsets.contains(&2001));
    }

    #[test]
    fn all_locked_pool_exhausts() {
        let real = candidate(1000, 0);
        let mut pool: Vec<RingCandidate> = (0..20u64)
            .map(|i| candidate(i, u64::MAX))
            .collect();
        pool.push(real.clone());

        let err = build_ring(&pool, &real.one_time_key, 5, 100, &mut OsRng).unwrap_err();
        assert_eq!(
            err,
            WalletError::DecoySelectionExhausted {
                attempts: MAX_RING_ATTEMPTS
            }
        );
    }

    #[test]
    fn missing_real_output_is_prepare_failure() {
        let pool: Vec<RingCandidate> = (0..20u64).map(|i| candidate(i, 0)).collect();
        let err = build_ring(&pool, &[0xAB; 32], 5, 100, &mut OsRng).unwrap_err();
        assert!(matches!(err, WalletError::RingPrepareFailed(_)));
    }

    #[test]
    fn thin_pool_is_prepare_failure() {
        let real = candidate(1000, 0);
        let pool = pool_with_real(2, &real);
        let err = build_ring(&pool, &real.one_time_key, 11, 100, &mut OsRng).unwrap_err();
        assert!(matches!(err, WalletError::RingPrepareFailed(_)));
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let mut rng = OsRng;
        let secret = random_blind(&mut rng);
        let real_blind = random_blind(&mut rng);
        let pseudo_blind = random_blind(&mut rng);
        let value = 75u64;

        let real = RingCandidate {
            global_index: 500,
            one_time_key: (secret * RISTRETTO_BASEPOINT_POINT).compress().to_bytes(),
            commitment: commit_bytes(value, &real_blind),
            lock_time: 0,
        };
        let pool = pool_with_real(30, &real);
        let ring = build_ring(&pool, &real.one_time_key, 11, 100, &mut rng).unwrap();

        let pseudo = commit_bytes(value, &pseudo_blind);
        let message: [u8; 32] = blake3::hash(b"tx message").into();
        let sig = sign_and_verify(
            &message,
            &ring,
            &pseudo,
            &secret,
            &(real_blind - pseudo_blind),
            &mut rng,
        )
        .unwrap();
        assert_eq!(sig.responses.len(), 11);
    }
}
