//! Accepted-ballot data model consumed by the tally engine
//!
//! Ballots arrive already encrypted and adjudicated; the tally engine only
//! needs their state, their contest/selection structure, and the per
//! selection ciphertexts.

use serde::{Deserialize, Serialize};

use crate::elgamal::Ciphertext;

/// The ballot-box disposition of an accepted ballot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BallotState {
    /// Counted in the tally.
    Cast,
    /// Excluded from the tally and decrypted individually for audit.
    Spoiled,
    /// Not yet adjudicated; never tallied.
    Unknown,
}

/// One encrypted selection on a ballot. Placeholder selections pad a
/// contest to a fixed number of votes and are skipped when validating
/// against the manifest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextBallotSelection {
    pub object_id: String,
    pub ciphertext: Ciphertext,
    pub is_placeholder: bool,
}

/// One contest on an encrypted ballot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextBallotContest {
    pub object_id: String,
    pub selections: Vec<CiphertextBallotSelection>,
}

/// An encrypted ballot accepted into the ballot box.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextBallot {
    pub object_id: String,
    pub state: BallotState,
    pub contests: Vec<CiphertextBallotContest>,
}

impl CiphertextBallot {
    pub fn is_cast(&self) -> bool {
        self.state == BallotState::Cast
    }

    pub fn is_spoiled(&self) -> bool {
        self.state == BallotState::Spoiled
    }
}
