//! Shared fixtures for module tests: a complete key ceremony, a small
//! manifest, and ballot encryption.

use std::collections::BTreeMap;

use crate::ballot::{
    BallotState, CiphertextBallot, CiphertextBallotContest, CiphertextBallotSelection,
};
use crate::elgamal;
use crate::election::{ContestDescription, ElectionContext, Manifest, SelectionDescription};
use crate::group::{ElementModP, ElementModQ, GroupParams};
use crate::guardian::Guardian;
use crate::key_ceremony::{self, CeremonyDetails, ElectionJointKey, ElectionPublicKey};
use crate::polynomial;

/// Two contests with two selections each.
pub fn two_contest_manifest() -> Manifest {
    Manifest {
        election_scope_id: "test-election".to_string(),
        contests: (1..=2)
            .map(|c| ContestDescription {
                object_id: format!("contest-{c}"),
                sequence_order: c - 1,
                selections: (1..=2)
                    .map(|s| SelectionDescription {
                        object_id: format!("contest-{c}-selection-{s}"),
                        sequence_order: s - 1,
                    })
                    .collect(),
            })
            .collect(),
    }
}

/// Encrypt a ballot that casts one vote for the selection at `vote_for`
/// (by index) in every contest, and zero for the others.
pub fn encrypt_ballot(
    params: &GroupParams,
    manifest: &Manifest,
    public_key: &ElementModP,
    ballot_id: &str,
    state: BallotState,
    vote_for: usize,
) -> CiphertextBallot {
    let contests = manifest
        .contests
        .iter()
        .map(|contest| CiphertextBallotContest {
            object_id: contest.object_id.clone(),
            selections: contest
                .selections
                .iter()
                .enumerate()
                .map(|(index, selection)| {
                    let message = u64::from(index == vote_for);
                    let nonce = params.rand_range_q(&ElementModQ::one());
                    CiphertextBallotSelection {
                        object_id: selection.object_id.clone(),
                        ciphertext: elgamal::encrypt(params, message, &nonce, public_key)
                            .expect("test encryption succeeds"),
                        is_placeholder: false,
                    }
                })
                .collect(),
        })
        .collect();

    CiphertextBallot {
        object_id: ballot_id.to_string(),
        state,
        contests,
    }
}

/// A completed key ceremony over the large test group: every guardian
/// holds every other guardian's public key and backup, and the election
/// context is derived from the combined joint key.
pub struct CeremonyFixture {
    pub params: GroupParams,
    pub manifest: Manifest,
    pub guardians: Vec<Guardian>,
    pub joint_key: ElectionJointKey,
    pub context: ElectionContext,
}

impl CeremonyFixture {
    pub fn new(number_of_guardians: u32, quorum: u32) -> Self {
        let params = GroupParams::large_test();
        let manifest = two_contest_manifest();
        let details = CeremonyDetails {
            number_of_guardians,
            quorum,
        };

        let mut guardians: Vec<Guardian> = (1..=number_of_guardians)
            .map(|i| Guardian::new(&params, &format!("guardian-{i}"), i, details, None))
            .collect();

        // Round one: broadcast public keys.
        let public_keys: Vec<ElectionPublicKey> =
            guardians.iter().map(|g| g.share_public_key()).collect();
        for guardian in &mut guardians {
            for key in &public_keys {
                if key.owner_id != guardian.object_id() {
                    guardian.save_guardian_key(key.clone());
                }
            }
        }

        // Round two: deposit backups pairwise.
        let mut backups = Vec::new();
        for guardian in &guardians {
            for key in &public_keys {
                if key.owner_id != guardian.object_id() {
                    backups.push(
                        guardian
                            .generate_backup(&key.owner_id)
                            .expect("public key was saved"),
                    );
                }
            }
        }
        for backup in backups {
            let designated = guardians
                .iter_mut()
                .find(|g| g.object_id() == backup.designated_id)
                .expect("designated guardian exists");
            designated.save_backup(backup);
        }

        let joint_key = key_ceremony::combine_election_public_keys(&params, &public_keys);
        let context = ElectionContext::new(
            &params,
            number_of_guardians,
            quorum,
            &joint_key,
            &manifest,
        );

        CeremonyFixture {
            params,
            manifest,
            guardians,
            joint_key,
            context,
        }
    }

    /// Lagrange coefficients for the given available guardian ids.
    pub fn lagrange_for(&self, available_ids: &[&str]) -> BTreeMap<String, ElementModQ> {
        let coordinates: BTreeMap<&str, u32> = self
            .guardians
            .iter()
            .map(|g| (g.object_id(), g.sequence_order()))
            .filter(|(id, _)| available_ids.contains(id))
            .collect();

        coordinates
            .iter()
            .map(|(id, &x)| {
                let others: Vec<u32> = coordinates
                    .values()
                    .copied()
                    .filter(|&other| other != x)
                    .collect();
                (
                    id.to_string(),
                    polynomial::compute_lagrange_coefficient(&self.params, x, &others),
                )
            })
            .collect()
    }
}
