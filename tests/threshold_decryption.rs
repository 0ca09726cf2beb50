//! End-to-end threshold decryption scenarios: key ceremony, ballot
//! encryption, tally accumulation, and quorum decryption with compensation
//! for missing guardians.

use std::collections::BTreeMap;

use veritally::ballot::{
    BallotState, CiphertextBallot, CiphertextBallotContest, CiphertextBallotSelection,
};
use veritally::election::{ContestDescription, ElectionContext, Manifest, SelectionDescription};
use veritally::guardian::Trustee;
use veritally::key_ceremony::combine_election_public_keys;
use veritally::mediator::DecryptionMediator;
use veritally::verifier;
use veritally::{
    elgamal, CeremonyDetails, CiphertextTallyBuilder, ElementModP, ElementModQ, GroupParams,
    Guardian,
};

fn manifest(contests: u32, selections_per_contest: u32) -> Manifest {
    Manifest {
        election_scope_id: "integration-election".to_string(),
        contests: (1..=contests)
            .map(|c| ContestDescription {
                object_id: format!("contest-{c}"),
                sequence_order: c - 1,
                selections: (1..=selections_per_contest)
                    .map(|s| SelectionDescription {
                        object_id: format!("contest-{c}-selection-{s}"),
                        sequence_order: s - 1,
                    })
                    .collect(),
            })
            .collect(),
    }
}

/// Run the full key ceremony: generate guardians, exchange public keys and
/// backups, and derive the election context.
fn run_key_ceremony(
    params: &GroupParams,
    manifest: &Manifest,
    number_of_guardians: u32,
    quorum: u32,
) -> (Vec<Guardian>, ElectionContext) {
    let details = CeremonyDetails {
        number_of_guardians,
        quorum,
    };
    let mut guardians: Vec<Guardian> = (1..=number_of_guardians)
        .map(|i| Guardian::new(params, &format!("guardian-{i}"), i, details, None))
        .collect();

    let public_keys: Vec<_> = guardians.iter().map(|g| g.share_public_key()).collect();
    for guardian in &mut guardians {
        for key in &public_keys {
            if key.owner_id != guardian.object_id() {
                guardian.save_guardian_key(key.clone());
            }
        }
    }

    let mut backups = Vec::new();
    for guardian in &guardians {
        for key in &public_keys {
            if key.owner_id != guardian.object_id() {
                backups.push(guardian.generate_backup(&key.owner_id).unwrap());
            }
        }
    }
    for backup in backups {
        let designated = guardians
            .iter_mut()
            .find(|g| g.object_id() == backup.designated_id)
            .unwrap();
        designated.save_backup(backup);
    }

    // Every guardian checks every backup it received.
    for guardian in &guardians {
        for other in 1..=number_of_guardians {
            let owner_id = format!("guardian-{other}");
            if owner_id != guardian.object_id() {
                assert!(
                    guardian.verify_backup(&owner_id).unwrap().verified,
                    "backup from {owner_id} failed verification"
                );
            }
        }
    }

    let joint_key = combine_election_public_keys(params, &public_keys);
    let context = ElectionContext::new(params, number_of_guardians, quorum, &joint_key, manifest);
    (guardians, context)
}

/// Encrypt a ballot voting for the first selection of every contest.
fn encrypt_ballot_for_first_selection(
    params: &GroupParams,
    manifest: &Manifest,
    public_key: &ElementModP,
    ballot_id: &str,
    state: BallotState,
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
                    let nonce = params.rand_range_q(&ElementModQ::one());
                    CiphertextBallotSelection {
                        object_id: selection.object_id.clone(),
                        ciphertext: elgamal::encrypt(
                            params,
                            u64::from(index == 0),
                            &nonce,
                            public_key,
                        )
                        .unwrap(),
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

fn guardian_public_keys(guardians: &[Guardian]) -> BTreeMap<String, ElementModP> {
    guardians
        .iter()
        .map(|g| (g.object_id().to_string(), g.election_public_key()))
        .collect()
}

/// The headline scenario: 3 contests, 5 guardians, quorum 3. Ten ballots
/// each cast one vote for the same selection; guardians 4 and 5 never
/// announce and are compensated for. The tally must show 10 for that
/// selection, 0 everywhere else, and every share must verify.
#[test]
fn quorum_decryption_with_two_missing_guardians() {
    let params = GroupParams::large_test();
    let manifest = manifest(3, 2);
    let (guardians, context) = run_key_ceremony(&params, &manifest, 5, 3);

    let mut builder = CiphertextTallyBuilder::new("tally-1", &manifest, &params);
    let ballots: Vec<CiphertextBallot> = (0..10)
        .map(|i| {
            encrypt_ballot_for_first_selection(
                &params,
                &manifest,
                &context.joint_public_key,
                &format!("ballot-{i}"),
                BallotState::Cast,
            )
        })
        .collect();
    assert_eq!(builder.batch_append(ballots).unwrap(), 10);
    let tally = builder.build();

    let keys = guardian_public_keys(&guardians);
    let mut mediator =
        DecryptionMediator::new(&params, &context, &tally, &[], keys.clone());

    // Guardians 1-3 announce; 4 and 5 stay missing.
    for guardian in &guardians[..3] {
        mediator.announce(guardian).unwrap();
    }
    let plaintext = mediator.get_plaintext_tally().unwrap();

    for contest in plaintext.contests.values() {
        for selection in contest.selections.values() {
            let expected = if selection.object_id.ends_with("selection-1") {
                10
            } else {
                0
            };
            assert_eq!(selection.tally, expected, "for {}", selection.object_id);

            // Every guardian contributed a share: 3 direct, 2 recovered.
            assert_eq!(selection.shares.len(), 5);
            let recovered = selection
                .shares
                .iter()
                .filter(|s| s.recovered_parts().is_some())
                .count();
            assert_eq!(recovered, 2);

            assert!(verifier::verify_a_selection(
                &params, selection, &context, &keys
            ));
        }
    }

    // The session roster carries a Lagrange coefficient per announced
    // guardian.
    assert_eq!(mediator.available_guardians().len(), 3);
    assert_eq!(plaintext.lagrange_coefficients.len(), 3);
}

/// Decrypting with all guardians present must agree with any valid quorum
/// subset plus compensation.
#[test]
fn threshold_decryption_equivalence() {
    let params = GroupParams::large_test();
    let manifest = manifest(2, 3);
    let (guardians, context) = run_key_ceremony(&params, &manifest, 4, 2);

    let mut builder = CiphertextTallyBuilder::new("tally-1", &manifest, &params);
    for i in 0..7 {
        let ballot = encrypt_ballot_for_first_selection(
            &params,
            &manifest,
            &context.joint_public_key,
            &format!("ballot-{i}"),
            BallotState::Cast,
        );
        builder.append(&ballot).unwrap();
    }
    let tally = builder.build();
    let keys = guardian_public_keys(&guardians);

    let mut full = DecryptionMediator::new(&params, &context, &tally, &[], keys.clone());
    for guardian in &guardians {
        full.announce(guardian).unwrap();
    }
    let full_tally = full.get_plaintext_tally().unwrap();

    for present in [&guardians[..2], &guardians[1..3]] {
        let mut partial =
            DecryptionMediator::new(&params, &context, &tally, &[], keys.clone());
        for guardian in present {
            partial.announce(guardian).unwrap();
        }
        let partial_tally = partial.get_plaintext_tally().unwrap();

        for (contest_id, contest) in &full_tally.contests {
            for (selection_id, selection) in &contest.selections {
                assert_eq!(
                    selection.tally,
                    partial_tally.contests[contest_id].selections[selection_id].tally
                );
            }
        }
    }
}

/// Spoiled ballots decrypt through the same announce/compensate flow and
/// verify share-by-share.
#[test]
fn spoiled_ballots_decrypt_and_verify() {
    let params = GroupParams::large_test();
    let manifest = manifest(2, 2);
    let (guardians, context) = run_key_ceremony(&params, &manifest, 3, 2);

    let mut builder = CiphertextTallyBuilder::new("tally-1", &manifest, &params);
    let cast = encrypt_ballot_for_first_selection(
        &params,
        &manifest,
        &context.joint_public_key,
        "ballot-cast",
        BallotState::Cast,
    );
    builder.append(&cast).unwrap();
    let spoiled: Vec<CiphertextBallot> = (0..2)
        .map(|i| {
            let ballot = encrypt_ballot_for_first_selection(
                &params,
                &manifest,
                &context.joint_public_key,
                &format!("spoiled-{i}"),
                BallotState::Spoiled,
            );
            builder.append(&ballot).unwrap();
            ballot
        })
        .collect();
    let tally = builder.build();
    let keys = guardian_public_keys(&guardians);

    let mut mediator =
        DecryptionMediator::new(&params, &context, &tally, &spoiled, keys.clone());
    for guardian in &guardians[..2] {
        mediator.announce(guardian).unwrap();
    }
    mediator.get_plaintext_tally().unwrap();

    let decrypted = mediator.decrypt_spoiled_ballots().unwrap();
    assert_eq!(decrypted.len(), 2);
    for ballot_tally in decrypted.values() {
        for contest in ballot_tally.contests.values() {
            for selection in contest.selections.values() {
                let expected = u64::from(selection.object_id.ends_with("selection-1"));
                assert_eq!(selection.tally, expected);
                assert_eq!(selection.shares.len(), 3);
                assert!(verifier::verify_a_selection(
                    &params, selection, &context, &keys
                ));
            }
        }
    }
}
