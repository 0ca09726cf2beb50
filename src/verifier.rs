//! Post-decryption verification
//!
//! Re-checks every decryption share recorded in a [`PlaintextTally`]:
//! direct shares against the producing guardian's election public key,
//! recovered shares part-by-part against the contributors' recovery keys.
//! Failures are aggregated per (guardian, selection) into a single verdict
//! so one bad actor cannot halt verification of the rest of the record.

use std::collections::BTreeMap;
use tracing::warn;

use crate::decrypt::{PlaintextTally, PlaintextTallyContest, PlaintextTallySelection};
use crate::election::ElectionContext;
use crate::group::{ElementModP, GroupParams};

/// Verify every share of one selection.
pub fn verify_a_selection(
    params: &GroupParams,
    selection: &PlaintextTallySelection,
    context: &ElectionContext,
    guardian_public_keys: &BTreeMap<String, ElementModP>,
) -> bool {
    let mut valid = true;
    for share in &selection.shares {
        let Some(public_key) = guardian_public_keys.get(&share.guardian_id) else {
            warn!(
                guardian = %share.guardian_id,
                selection = %selection.object_id,
                "no public key on record for guardian"
            );
            valid = false;
            continue;
        };
        if !share.is_valid(
            params,
            &selection.message,
            public_key,
            &context.crypto_extended_base_hash,
        ) {
            warn!(
                guardian = %share.guardian_id,
                selection = %selection.object_id,
                "decryption share failed verification"
            );
            valid = false;
        }
    }
    valid
}

/// Verify every selection of one contest.
pub fn verify_a_contest(
    params: &GroupParams,
    contest: &PlaintextTallyContest,
    context: &ElectionContext,
    guardian_public_keys: &BTreeMap<String, ElementModP>,
) -> bool {
    let mut valid = true;
    for selection in contest.selections.values() {
        if !verify_a_selection(params, selection, context, guardian_public_keys) {
            warn!(
                contest = %contest.object_id,
                selection = %selection.object_id,
                "selection decryption failed verification"
            );
            valid = false;
        }
    }
    valid
}

/// Verify the decryption of an entire tally (or decrypted spoiled ballot).
pub fn verify_tally_decryption(
    params: &GroupParams,
    tally: &PlaintextTally,
    context: &ElectionContext,
    guardian_public_keys: &BTreeMap<String, ElementModP>,
) -> bool {
    let mut valid = true;
    for contest in tally.contests.values() {
        if !verify_a_contest(params, contest, context, guardian_public_keys) {
            valid = false;
        }
    }
    valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ballot::BallotState;
    use crate::guardian::Trustee;
    use crate::mediator::DecryptionMediator;
    use crate::tally::CiphertextTallyBuilder;
    use crate::test_support::{encrypt_ballot, CeremonyFixture};

    fn decrypted_tally(
        fixture: &CeremonyFixture,
        present: usize,
    ) -> (PlaintextTally, BTreeMap<String, ElementModP>) {
        let mut builder =
            CiphertextTallyBuilder::new("tally", &fixture.manifest, &fixture.params);
        for i in 0..3 {
            let ballot = encrypt_ballot(
                &fixture.params,
                &fixture.manifest,
                &fixture.context.joint_public_key,
                &format!("ballot-{i}"),
                BallotState::Cast,
                0,
            );
            builder.append(&ballot).unwrap();
        }
        let tally = builder.build();

        let keys: BTreeMap<String, ElementModP> = fixture
            .guardians
            .iter()
            .map(|g| (g.object_id().to_string(), g.election_public_key()))
            .collect();

        let mut mediator = DecryptionMediator::new(
            &fixture.params,
            &fixture.context,
            &tally,
            &[],
            keys.clone(),
        );
        for guardian in &fixture.guardians[..present] {
            mediator.announce(guardian).unwrap();
        }
        (mediator.get_plaintext_tally().unwrap(), keys)
    }

    #[test]
    fn test_all_present_tally_verifies() {
        let fixture = CeremonyFixture::new(3, 2);
        let (tally, keys) = decrypted_tally(&fixture, 3);
        assert!(verify_tally_decryption(
            &fixture.params,
            &tally,
            &fixture.context,
            &keys
        ));
    }

    #[test]
    fn test_compensated_tally_verifies() {
        let fixture = CeremonyFixture::new(3, 2);
        let (tally, keys) = decrypted_tally(&fixture, 2);
        assert!(verify_tally_decryption(
            &fixture.params,
            &tally,
            &fixture.context,
            &keys
        ));
    }

    #[test]
    fn test_tampered_share_fails_verification() {
        let fixture = CeremonyFixture::new(3, 2);
        let (mut tally, keys) = decrypted_tally(&fixture, 3);

        // Swap one share's value for a random element.
        let contest = tally.contests.values_mut().next().unwrap();
        let selection = contest.selections.values_mut().next().unwrap();
        selection.shares[0].share = fixture.params.g_pow_p(&fixture.params.rand_q());

        assert!(!verify_tally_decryption(
            &fixture.params,
            &tally,
            &fixture.context,
            &keys
        ));
    }

    #[test]
    fn test_unknown_guardian_fails_verification() {
        let fixture = CeremonyFixture::new(3, 2);
        let (tally, mut keys) = decrypted_tally(&fixture, 3);
        keys.remove("guardian-1");
        assert!(!verify_tally_decryption(
            &fixture.params,
            &tally,
            &fixture.context,
            &keys
        ));
    }
}
