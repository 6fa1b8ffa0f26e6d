//! # shade-core
//! Protocol types and cryptographic primitives for Shade: Pedersen
//! commitments, Bulletproof range proofs, MLSAG ring signatures,
//! dual-key stealth addresses, and the sloth timelock VDF.

pub mod commitment;
pub mod constants;
pub mod error;
pub mod mlsag;
pub mod rangeproof;
pub mod stealth;
pub mod types;
pub mod vdf;
