//! Pedersen commitments over Ristretto.
//!
//! `commit(v, b) = v*G + b*H` with G the Ristretto basepoint and H a
//! hash-derived second generator with no known discrete log relative
//! to G. Values are u64 attos, blinds are full scalars.

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use curve25519_dalek::traits::Identity;
use rand::{CryptoRng, RngCore};
use sha2::Sha512;
use std::sync::LazyLock;

use crate::error::CommitError;

/// Domain separator for the blinding generator.
const PEDERSEN_H_DOMAIN: &[u8] = b"shade.pedersen.h.v1";

/// The blinding generator H. Derived by hash-to-point so nobody knows
/// log_G(H).
pub static PEDERSEN_H: LazyLock<RistrettoPoint> =
    LazyLock::new(|| RistrettoPoint::hash_from_bytes::<Sha512>(PEDERSEN_H_DOMAIN));

/// Commit to `value` under blinding factor `blind`.
pub fn commit(value: u64, blind: &Scalar) -> RistrettoPoint {
    Scalar::from(value) * RISTRETTO_BASEPOINT_POINT + blind * *PEDERSEN_H
}

/// Compressed form of [`commit`].
pub fn commit_bytes(value: u64, blind: &Scalar) -> [u8; 32] {
    commit(value, blind).compress().to_bytes()
}

/// Sample a uniform blinding factor by wide reduction.
pub fn random_blind<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
    let mut wide = [0u8; 64];
    rng.fill_bytes(&mut wide);
    Scalar::from_bytes_mod_order_wide(&wide)
}

/// Decode a compressed commitment.
pub fn decode_point(bytes: &[u8; 32]) -> Result<RistrettoPoint, CommitError> {
    CompressedRistretto(*bytes)
        .decompress()
        .ok_or(CommitError::InvalidPoint)
}

/// Decode a canonical scalar.
pub fn decode_scalar(bytes: &[u8; 32]) -> Result<Scalar, CommitError> {
    Option::<Scalar>::from(Scalar::from_canonical_bytes(*bytes)).ok_or(CommitError::InvalidScalar)
}

/// Sum the `plus` commitments and subtract the `minus` commitments.
pub fn commit_sum(plus: &[[u8; 32]], minus: &[[u8; 32]]) -> Result<[u8; 32], CommitError> {
    let mut acc = RistrettoPoint::identity();
    for bytes in plus {
        acc += decode_point(bytes)?;
    }
    for bytes in minus {
        acc -= decode_point(bytes)?;
    }
    Ok(acc.compress().to_bytes())
}

/// Check that the `plus` and `minus` commitments cancel exactly.
///
/// Holds iff the committed values balance and the blinds balance; the
/// builder arranges the pseudo-input blind as the sum of the output
/// blinds so an honest transaction passes with no extra term.
pub fn verify_commit_sum(plus: &[[u8; 32]], minus: &[[u8; 32]]) -> Result<(), CommitError> {
    let net = commit_sum(plus, minus)?;
    if decode_point(&net)? == RistrettoPoint::identity() {
        Ok(())
    } else {
        Err(CommitError::SumMismatch)
    }
}

/// Sum of blinds: `plus` minus `minus`. Used to derive the scalar the
/// ring's commitment row signs under.
pub fn blind_sum(plus: &[Scalar], minus: &[Scalar]) -> Scalar {
    let add: Scalar = plus.iter().sum();
    let sub: Scalar = minus.iter().sum();
    add - sub
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::OsRng;

    #[test]
    fn generators_are_independent() {
        assert_ne!(*PEDERSEN_H, RISTRETTO_BASEPOINT_POINT);
        assert_ne!(*PEDERSEN_H, RistrettoPoint::identity());
    }

    #[test]
    fn commitment_is_binding_to_value() {
        let blind = random_blind(&mut OsRng);
        assert_ne!(commit_bytes(5, &blind), commit_bytes(6, &blind));
    }

    #[test]
    fn commitment_is_hiding_under_blind() {
        let b1 = random_blind(&mut OsRng);
        let b2 = random_blind(&mut OsRng);
        assert_ne!(commit_bytes(5, &b1), commit_bytes(5, &b2));
    }

    #[test]
    fn balanced_sums_verify() {
        let mut rng = OsRng;
        let b1 = random_blind(&mut rng);
        let b2 = random_blind(&mut rng);
        // input commits to 100 under b1+b2, outputs to 60 and 40.
        let input = commit_bytes(100, &(b1 + b2));
        let out1 = commit_bytes(60, &b1);
        let out2 = commit_bytes(40, &b2);
        verify_commit_sum(&[input], &[out1, out2]).unwrap();
    }

    #[test]
    fn unbalanced_values_fail() {
        let mut rng = OsRng;
        let b1 = random_blind(&mut rng);
        let b2 = random_blind(&mut rng);
        let input = commit_bytes(100, &(b1 + b2));
        let out1 = commit_bytes(60, &b1);
        let out2 = commit_bytes(41, &b2);
        assert_eq!(
            verify_commit_sum(&[input], &[out1, out2]),
            Err(CommitError::SumMismatch)
        );
    }

    #[test]
    fn unbalanced_blinds_fail() {
        let mut rng = OsRng;
        let b1 = random_blind(&mut rng);
        let b2 = random_blind(&mut rng);
        let input = commit_bytes(100, &b1);
        let output = commit_bytes(100, &b2);
        assert_eq!(
            verify_commit_sum(&[input], &[output]),
            Err(CommitError::SumMismatch)
        );
    }

    #[test]
    fn invalid_point_bytes_rejected() {
        // Not every 32-byte string is a canonical Ristretto encoding.
        let junk = [0xFF; 32];
        assert_eq!(decode_point(&junk), Err(CommitError::InvalidPoint));
    }

    #[test]
    fn blind_sum_matches_manual() {
        let mut rng = OsRng;
        let a = random_blind(&mut rng);
        let b = random_blind(&mut rng);
        let c = random_blind(&mut rng);
        assert_eq!(blind_sum(&[a, b], &[c]), a + b - c);
    }

    proptest! {
        #[test]
        fn split_commitments_always_balance(total in 1u64..=u64::MAX / 2, cut in 0u64..=u64::MAX / 2) {
            let cut = cut % (total + 1);
            let mut rng = OsRng;
            let b_out1 = random_blind(&mut rng);
            let b_out2 = random_blind(&mut rng);
            let input = commit_bytes(total, &(b_out1 + b_out2));
            let out1 = commit_bytes(cut, &b_out1);
            let out2 = commit_bytes(total - cut, &b_out2);
            prop_assert!(verify_commit_sum(&[input], &[out1, out2]).is_ok());
        }
    }
}
