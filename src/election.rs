//! Election metadata and the per-election cryptographic context

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::group::{ElementModP, ElementModQ, GroupParams};
use crate::hash::ChallengeHasher;
use crate::key_ceremony::ElectionJointKey;

/// One selectable option within a contest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionDescription {
    pub object_id: String,
    pub sequence_order: u32,
}

/// One contest and its universe of valid selections.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestDescription {
    pub object_id: String,
    pub sequence_order: u32,
    pub selections: Vec<SelectionDescription>,
}

impl ContestDescription {
    /// The set of valid selection ids for this contest.
    pub fn selection_ids(&self) -> BTreeSet<String> {
        self.selections
            .iter()
            .map(|s| s.object_id.clone())
            .collect()
    }
}

/// The contest/selection universe for one election. Everything else the
/// full manifest would carry (titles, candidates, geopolitical units) is
/// irrelevant to the cryptographic core.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub election_scope_id: String,
    pub contests: Vec<ContestDescription>,
}

impl Manifest {
    pub fn contest(&self, contest_id: &str) -> Option<&ContestDescription> {
        self.contests.iter().find(|c| c.object_id == contest_id)
    }

    pub fn crypto_hash(&self, params: &GroupParams) -> ElementModQ {
        let mut hasher = ChallengeHasher::new("manifest").chain_str(&self.election_scope_id);
        for contest in &self.contests {
            hasher = hasher
                .chain_str(&contest.object_id)
                .chain_u64(u64::from(contest.sequence_order));
            for selection in &contest.selections {
                hasher = hasher
                    .chain_str(&selection.object_id)
                    .chain_u64(u64::from(selection.sequence_order));
            }
        }
        hasher.finalize_q(params)
    }
}

/// The cryptographic context shared by every operation of one election:
/// the guardian counts, the joint public key, and the hashes that
/// domain-separate all zero-knowledge proofs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionContext {
    pub number_of_guardians: u32,
    pub quorum: u32,
    pub joint_public_key: ElementModP,
    pub commitment_hash: ElementModQ,
    pub manifest_hash: ElementModQ,
    pub crypto_base_hash: ElementModQ,
    pub crypto_extended_base_hash: ElementModQ,
}

impl ElectionContext {
    pub fn new(
        params: &GroupParams,
        number_of_guardians: u32,
        quorum: u32,
        joint_key: &ElectionJointKey,
        manifest: &Manifest,
    ) -> Self {
        let manifest_hash = manifest.crypto_hash(params);
        let crypto_base_hash = ChallengeHasher::new("base-hash")
            .chain_u64(u64::from(number_of_guardians))
            .chain_u64(u64::from(quorum))
            .chain_q(&manifest_hash)
            .finalize_q(params);
        let crypto_extended_base_hash = ChallengeHasher::new("extended-base-hash")
            .chain_q(&crypto_base_hash)
            .chain_q(&joint_key.commitment_hash)
            .finalize_q(params);

        ElectionContext {
            number_of_guardians,
            quorum,
            joint_public_key: joint_key.joint_public_key.clone(),
            commitment_hash: joint_key.commitment_hash.clone(),
            manifest_hash,
            crypto_base_hash,
            crypto_extended_base_hash,
        }
    }
}
