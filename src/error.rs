//! Error types for the tally cryptography core

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TallyError>;

#[derive(Error, Debug)]
pub enum TallyError {
    #[error("Value out of range for {domain}: {value}")]
    OutOfRange { domain: &'static str, value: String },

    #[error("ElGamal secret key must be in [2, Q)")]
    SecretKeyOutOfRange,

    #[error("ElGamal encryption requires a non-zero nonce")]
    ZeroNonce,

    #[error("Zero has no multiplicative inverse")]
    ZeroInverse,

    #[error("Homomorphic accumulation requires at least one ciphertext")]
    EmptyAccumulation,

    #[error("Discrete log exceeds the configured bound of {bound}")]
    DiscreteLogExceeded { bound: u64 },

    #[error("Ballot {0} has already been tallied")]
    DuplicateBallot(String),

    #[error("Ballot {0} is in an unknown state and cannot be tallied")]
    UnknownBallotState(String),

    #[error("Ballot contest {0} is not part of the election manifest")]
    UnknownContest(String),

    #[error("Ballot selections do not match the manifest for contest {0}")]
    MismatchedSelections(String),

    #[error("Guardian {0} has already announced")]
    AlreadyAnnounced(String),

    #[error("Quorum not reached: {announced} of {required} guardians announced")]
    QuorumNotReached { required: u32, announced: u32 },

    #[error("Guardian {guardian_id} could not compensate for missing guardian {missing_guardian_id}")]
    CompensationFailed {
        guardian_id: String,
        missing_guardian_id: String,
    },

    #[error("No public key recorded for missing guardian {0}")]
    MissingGuardianKey(String),

    #[error("Guardian holds no partial key backup for {0}")]
    MissingBackup(String),

    #[error("Expected {expected} decryption shares, found {found}")]
    ShareCountMismatch { expected: u32, found: u32 },

    #[error("Decryption share for {0} must carry exactly one of a proof or recovered parts")]
    AmbiguousShare(String),
}
