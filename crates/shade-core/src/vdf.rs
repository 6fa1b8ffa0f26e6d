//! Sloth verifiable delay function.
//!
//! Works over the prime field p = 2^256 - 189 (p ≡ 3 mod 4). The
//! forward direction iterates modular square roots, each of which
//! costs a full modular exponentiation and cannot be parallelized
//! across iterations. The inverse direction is one modular squaring
//! per iteration, so checking a witness is cheap relative to
//! producing it.
//!
//! The square-root step is made a permutation by parity: a quadratic
//! residue maps to its even root, a non-residue maps to the odd root
//! of its negation. The inverse step recovers the branch from the
//! witness parity.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use std::sync::LazyLock;

use crate::error::VdfError;

/// Field modulus: 2^256 - 189, the largest 256-bit prime ≡ 3 mod 4.
static PRIME: LazyLock<BigUint> = LazyLock::new(|| (BigUint::one() << 256u32) - 189u32);

/// Exponent (p + 1) / 4 for square roots.
static SQRT_EXP: LazyLock<BigUint> = LazyLock::new(|| (&*PRIME + 1u32) >> 2);

/// Exponent (p - 1) / 2 for the Euler criterion.
static QR_EXP: LazyLock<BigUint> = LazyLock::new(|| (&*PRIME - 1u32) >> 1);

fn is_residue(x: &BigUint) -> bool {
    x.modpow(&QR_EXP, &PRIME).is_one()
}

/// One forward step: the parity-normalized square root.
fn sqrt_permutation(x: &BigUint) -> BigUint {
    if x.is_zero() {
        return BigUint::zero();
    }
    if is_residue(x) {
        let y = x.modpow(&SQRT_EXP, &PRIME);
        // Even root marks the residue branch.
        if y.bit(0) { &*PRIME - y } else { y }
    } else {
        // -1 is a non-residue, so p - x is a residue here.
        let y = (&*PRIME - x).modpow(&SQRT_EXP, &PRIME);
        if y.bit(0) { y } else { &*PRIME - y }
    }
}

/// One inverse step: squaring, with the branch read off the parity.
fn square_inverse(y: &BigUint) -> BigUint {
    let sq = (y * y) % &*PRIME;
    if y.bit(0) { &*PRIME - sq } else { sq }
}

fn decode_element(bytes: &[u8; 32]) -> BigUint {
    BigUint::from_bytes_le(bytes) % &*PRIME
}

fn encode_element(x: &BigUint) -> [u8; 32] {
    let mut out = [0u8; 32];
    let bytes = x.to_bytes_le();
    out[..bytes.len()].copy_from_slice(&bytes);
    out
}

/// Evaluate the delay: `iterations` sequential square roots of the
/// field element `input` reduces to. Slow by construction.
pub fn eval(input: &[u8; 32], iterations: u64) -> Result<[u8; 32], VdfError> {
    if iterations == 0 {
        return Err(VdfError::ZeroIterations);
    }
    let mut x = decode_element(input);
    for _ in 0..iterations {
        x = sqrt_permutation(&x);
    }
    Ok(encode_element(&x))
}

/// Check a witness by squaring it back to the input.
pub fn verify(input: &[u8; 32], witness: &[u8; 32], iterations: u64) -> Result<(), VdfError> {
    if iterations == 0 {
        return Err(VdfError::ZeroIterations);
    }
    let w = BigUint::from_bytes_le(witness);
    if w >= *PRIME {
        return Err(VdfError::InvalidInput);
    }
    let mut y = w;
    for _ in 0..iterations {
        y = square_inverse(&y);
    }
    if y == decode_element(input) {
        Ok(())
    } else {
        Err(VdfError::Verify)
    }
}
