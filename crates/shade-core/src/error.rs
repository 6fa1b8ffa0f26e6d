//! Error types for the Shade primitives.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommitError {
    #[error("invalid point bytes")] InvalidPoint,
    #[error("invalid scalar bytes")] InvalidScalar,
    #[error("commitment sum does not balance")] SumMismatch,
    #[error("value overflow")] ValueOverflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    #[error("range proof generation failed: {0}")] Prove(String),
    #[error("range proof rejected")] Rejected,
    #[error("malformed proof bytes")] Malformed,
    #[error("invalid commitment bytes")] InvalidCommitment,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RingError {
    #[error("ring is empty")] EmptyRing,
    #[error("ring width mismatch: keys {keys}, commitments {commitments}")]
    WidthMismatch { keys: usize, commitments: usize },
    #[error("secret index {index} out of bounds for width {width}")]
    SecretIndexOutOfBounds { index: usize, width: usize },
    #[error("invalid ring member at column {0}")] InvalidMember(usize),
    #[error("response count {got} does not match ring width {want}")]
    ResponseCountMismatch { got: usize, want: usize },
    #[error("signature verification failed")] VerificationFailed,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StealthError {
    #[error("invalid public key bytes")] InvalidPublicKey,
    #[error("invalid secret key bytes")] InvalidSecretKey,
    #[error("output does not belong to this key set")] NotOurs,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VdfError {
    #[error("iteration count must be nonzero")] ZeroIterations,
    #[error("witness does not reproduce the challenge")] Verify,
    #[error("input does not reduce to a field element")] InvalidInput,
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)] Commit(#[from] CommitError),
    #[error(transparent)] Proof(#[from] ProofError),
    #[error(transparent)] Ring(#[from] RingError),
    #[error(transparent)] Stealth(#[from] StealthError),
    #[error(transparent)] Vdf(#[from] VdfError),
    #[error("encoding: {0}")] Encoding(String),
}
