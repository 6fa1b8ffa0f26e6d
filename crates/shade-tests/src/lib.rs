//! Integration test suite for the Shade wallet.
//!
//! Exercises the full transfer lifecycle against an in-memory chain
//! client: funding, building and relaying confidential transactions,
//! scanning, and reconciling pending records.

pub mod helpers;
