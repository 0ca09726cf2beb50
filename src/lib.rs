//! # Verifiable Election Tallying — Cryptographic Core
//!
//! This library is the cryptographic heart of a verifiable election
//! tallying protocol:
//!
//! - **Homomorphic encryption**: individual votes are encrypted with
//!   exponential ElGamal and never decrypted; ciphertexts multiply, counts
//!   add.
//! - **Threshold keys**: guardians combine their keys under a Shamir-style
//!   secret sharing scheme, so any quorum can decrypt and up to
//!   `n - quorum` absent guardians are tolerated via compensation.
//! - **Public auditability**: every key, backup and partial decryption
//!   carries a Schnorr or Chaum-Pedersen zero-knowledge proof.
//!
//! Transport, serialization formats, persistence and process lifecycle are
//! external collaborators; remote guardians participate through the
//! [`Trustee`] capability.
//!
//! ## Example
//!
//! ```no_run
//! use veritally::{GroupParams, Guardian, CeremonyDetails, ElementModQ};
//! use veritally::key_ceremony::combine_election_public_keys;
//!
//! let params = GroupParams::standard();
//! let details = CeremonyDetails { number_of_guardians: 5, quorum: 3 };
//! let guardians: Vec<Guardian> = (1..=5)
//!     .map(|i| Guardian::new(&params, &format!("guardian-{i}"), i, details, None))
//!     .collect();
//!
//! let public_keys: Vec<_> = guardians.iter().map(|g| g.share_public_key()).collect();
//! let joint_key = combine_election_public_keys(&params, &public_keys);
//! ```

pub mod ballot;
pub mod decrypt;
pub mod election;
pub mod elgamal;
pub mod error;
pub mod group;
pub mod guardian;
pub mod hash;
pub mod key_ceremony;
pub mod mediator;
pub mod polynomial;
pub mod proofs;
pub mod shares;
pub mod tally;
pub mod verifier;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export the main types for convenience
pub use ballot::{BallotState, CiphertextBallot};
pub use decrypt::{AvailableGuardian, PlaintextTally};
pub use election::{ElectionContext, Manifest};
pub use elgamal::{Ciphertext, DiscreteLog, KeyPair};
pub use error::{Result, TallyError};
pub use group::{ElementModP, ElementModQ, GroupParams};
pub use guardian::{Guardian, Trustee};
pub use key_ceremony::{CeremonyDetails, ElectionJointKey, GuardianRecord};
pub use mediator::DecryptionMediator;
pub use proofs::{ChaumPedersenProof, SchnorrProof};
pub use shares::{DecryptionShare, HasObjectId};
pub use tally::{CiphertextTally, CiphertextTallyBuilder};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
