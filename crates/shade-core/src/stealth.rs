//! Dual-key stealth addresses (DKSAP) over Ristretto.
//!
//! A recipient publishes a scan pair (s, S) and a spend pair (b, B).
//! For every payment the sender draws an ephemeral pair (r, R = r*G)
//! and derives the one-time destination key
//!
//!   P = B + Hs(r*S) * G
//!
//! Only the holder of s can detect the output (s*R == r*S) and only
//! the holder of both s and b can compute the one-time spend secret
//! p = b + Hs(s*R). R travels in the output; P never repeats across
//! payments, so outputs are unlinkable on chain.

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::scalar::Scalar;
use rand::{CryptoRng, RngCore};

use crate::commitment::{decode_point, random_blind};
use crate::error::StealthError;

const HS_DOMAIN: &str = "shade.stealth.hs.v1";
const NOTE_KEY_DOMAIN: &str = "shade.stealth.note-key.v1";

/// Hash a shared-secret point to a scalar by wide reduction.
fn hash_to_scalar(point: &RistrettoPoint) -> Scalar {
    let mut hasher = blake3::Hasher::new_derive_key(HS_DOMAIN);
    hasher.update(point.compress().as_bytes());
    let mut wide = [0u8; 64];
    hasher.finalize_xof().fill(&mut wide);
    Scalar::from_bytes_mod_order_wide(&wide)
}

/// Keys the sender derives for a single payment.
pub struct OneTimePayment {
    /// R = r*G, published in the output.
    pub ephemeral_public: [u8; 32],
    /// P = B + Hs(r*S)*G, the output's destination key.
    pub one_time_key: [u8; 32],
    /// Symmetric key for the output's encrypted note, derived from the
    /// shared secret. The receiver re-derives it from s*R.
    pub note_key: [u8; 32],
}

fn note_key_from_shared(shared: &RistrettoPoint) -> [u8; 32] {
    blake3::derive_key(NOTE_KEY_DOMAIN, shared.compress().as_bytes())
}

/// Sender side: derive a fresh one-time destination for (B, S).
pub fn create_payment<R: RngCore + CryptoRng>(
    spend_public: &[u8; 32],
    scan_public: &[u8; 32],
    rng: &mut R,
) -> Result<OneTimePayment, StealthError> {
    let b_pub = decode_point(spend_public).map_err(|_| StealthError::InvalidPublicKey)?;
    let s_pub = decode_point(scan_public).map_err(|_| StealthError::InvalidPublicKey)?;

    let r = random_blind(rng);
    let shared = r * s_pub;
    let p = b_pub + hash_to_scalar(&shared) * RISTRETTO_BASEPOINT_POINT;

    Ok(OneTimePayment {
        ephemeral_public: (r * RISTRETTO_BASEPOINT_POINT).compress().to_bytes(),
        one_time_key: p.compress().to_bytes(),
        note_key: note_key_from_shared(&shared),
    })
}

/// Receiver side: does `one_time_key` pay our (s, B)?
///
/// Returns the note key on a match so the caller can decrypt the
/// amount without recomputing the shared secret.
pub fn uncover(
    scan_secret: &Scalar,
    spend_public: &[u8; 32],
    ephemeral_public: &[u8; 32],
    one_time_key: &[u8; 32],
) -> Result<Option<[u8; 32]>, StealthError> {
    let b_pub = decode_point(spend_public).map_err(|_| StealthError::InvalidPublicKey)?;
    let r_pub = decode_point(ephemeral_public).map_err(|_| StealthError::InvalidPublicKey)?;

    let shared = scan_secret * r_pub;
    let expected = b_pub + hash_to_scalar(&shared) * RISTRETTO_BASEPOINT_POINT;
    if expected.compress().to_bytes() == *one_time_key {
        Ok(Some(note_key_from_shared(&shared)))
    } else {
        Ok(None)
    }
}

/// Receiver side: recover the one-time spend secret p = b + Hs(s*R).
pub fn uncover_secret(
    scan_secret: &Scalar,
    spend_secret: &Scalar,
    ephemeral_public: &[u8; 32],
) -> Result<Scalar, StealthError> {
    let r_pub = decode_point(ephemeral_public).map_err(|_| StealthError::InvalidPublicKey)?;
    let shared = scan_secret * r_pub;
    Ok(spend_secret + hash_to_scalar(&shared))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    struct Recipient {
        scan_secret: Scalar,
        spend_secret: Scalar,
        scan_public: [u8; 32],
        spend_public: [u8; 32],
    }

    fn recipient() -> Recipient {
        let mut rng = OsRng;
        let s = random_blind(&mut rng);
        let b = random_blind(&mut rng);
        Recipient {
            scan_secret: s,
            spend_secret: b,
            scan_public: (s * RISTRETTO_BASEPOINT_POINT).compress().to_bytes(),
            spend_public: (b * RISTRETTO_BASEPOINT_POINT).compress().to_bytes(),
        }
    }

    #[test]
    fn recipient_uncovers_own_payment() {
        let rcpt = recipient();
        let pay = create_payment(&rcpt.spend_public, &rcpt.scan_public, &mut OsRng).unwrap();
        let note_key = uncover(
            &rcpt.scan_secret,
            &rcpt.spend_public,
            &pay.ephemeral_public,
            &pay.one_time_key,
        )
        .unwrap();
        assert_eq!(note_key, Some(pay.note_key));
    }

    #[test]
    fn stranger_sees_nothing() {
        let rcpt = recipient();
        let stranger = recipient();
        let pay = create_payment(&rcpt.spend_public, &rcpt.scan_public, &mut OsRng).unwrap();
        let hit = uncover(
            &stranger.scan_secret,
            &stranger.spend_public,
            &pay.ephemeral_public,
            &pay.one_time_key,
        )
        .unwrap();
        assert_eq!(hit, None);
    }

    #[test]
    fn uncovered_secret_opens_one_time_key() {
        let rcpt = recipient();
        let pay = create_payment(&rcpt.spend_public, &rcpt.scan_public, &mut OsRng).unwrap();
        let p = uncover_secret(&rcpt.scan_secret, &rcpt.spend_secret, &pay.ephemeral_public)
            .unwrap();
        let derived = (p * RISTRETTO_BASEPOINT_POINT).compress().to_bytes();
        assert_eq!(derived, pay.one_time_key);
    }

    #[test]
    fn one_time_keys_never_repeat() {
        let rcpt = recipient();
        let a = create_payment(&rcpt.spend_public, &rcpt.scan_public, &mut OsRng).unwrap();
        let b = create_payment(&rcpt.spend_public, &rcpt.scan_public, &mut OsRng).unwrap();
        assert_ne!(a.one_time_key, b.one_time_key);
        assert_ne!(a.ephemeral_public, b.ephemeral_public);
    }

    #[test]
    fn invalid_address_bytes_rejected() {
        let rcpt = recipient();
        let junk = [0xFF; 32];
        assert_eq!(
            create_payment(&junk, &rcpt.scan_public, &mut OsRng).err(),
            Some(StealthError::InvalidPublicKey)
        );
    }
}
