//! Trustee decryption arithmetic
//!
//! Present trustees contribute direct decryption shares; for a missing
//! trustee, every present trustee contributes a compensated share derived
//! from the missing trustee's backup, and the fragments are combined with
//! Lagrange coefficients into a share that is arithmetically
//! indistinguishable from a direct one. Once a full set of shares exists,
//! each selection's plaintext count falls out of a bounded discrete log.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::ballot::CiphertextBallot;
use crate::elgamal::{Ciphertext, DiscreteLog};
use crate::election::ElectionContext;
use crate::error::{Result, TallyError};
use crate::group::{ElementModP, ElementModQ, GroupParams};
use crate::guardian::Trustee;
use crate::shares::{
    CiphertextCompensatedDecryptionContest, CiphertextCompensatedDecryptionSelection,
    CiphertextDecryptionContest, CiphertextDecryptionSelection, CompensatedDecryptionShare,
    DecryptionShare,
};
use crate::tally::CiphertextTally;

/// A guardian that announced for a decryption session, with the Lagrange
/// coefficient assigned to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableGuardian {
    pub guardian_id: String,
    pub sequence_order: u32,
    pub lagrange_coefficient: ElementModQ,
}

/// The decrypted counts for one selection, with the supporting shares kept
/// for audit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaintextTallySelection {
    pub object_id: String,
    /// The decrypted count.
    pub tally: u64,
    /// `G^tally`, the decrypted value before the discrete log.
    pub value: ElementModP,
    /// The encrypted message this selection was decrypted from.
    pub message: Ciphertext,
    pub shares: Vec<CiphertextDecryptionSelection>,
}

/// The decrypted counts for one contest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaintextTallyContest {
    pub object_id: String,
    pub selections: BTreeMap<String, PlaintextTallySelection>,
}

/// The decrypted tally (or decrypted spoiled ballot), with the Lagrange
/// coefficients and guardian roster preserved for verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaintextTally {
    pub object_id: String,
    pub contests: BTreeMap<String, PlaintextTallyContest>,
    pub lagrange_coefficients: BTreeMap<String, ElementModQ>,
    pub guardian_states: Vec<AvailableGuardian>,
}

/// The (contest id, selection id, ciphertext) triples of a tally.
fn tally_messages(
    tally: &CiphertextTally,
) -> impl Iterator<Item = (&str, &str, &Ciphertext)> + '_ {
    tally.contests.values().flat_map(|contest| {
        contest.selections.values().map(move |selection| {
            (
                contest.object_id.as_str(),
                selection.object_id.as_str(),
                &selection.ciphertext,
            )
        })
    })
}

/// The (contest id, selection id, ciphertext) triples of a single ballot,
/// placeholders excluded.
fn ballot_messages(
    ballot: &CiphertextBallot,
) -> impl Iterator<Item = (&str, &str, &Ciphertext)> + '_ {
    ballot.contests.iter().flat_map(|contest| {
        contest
            .selections
            .iter()
            .filter(|s| !s.is_placeholder)
            .map(move |selection| {
                (
                    contest.object_id.as_str(),
                    selection.object_id.as_str(),
                    &selection.ciphertext,
                )
            })
    })
}

fn compute_share_for_messages<'a>(
    trustee: &dyn Trustee,
    context: &ElectionContext,
    messages: impl Iterator<Item = (&'a str, &'a str, &'a Ciphertext)>,
) -> Result<DecryptionShare> {
    let mut contests: BTreeMap<String, CiphertextDecryptionContest> = BTreeMap::new();
    for (contest_id, selection_id, ciphertext) in messages {
        let (share, proof) =
            trustee.partial_decrypt(ciphertext, &context.crypto_extended_base_hash, None)?;
        let selection =
            CiphertextDecryptionSelection::direct(selection_id, trustee.id(), share, proof);
        contests
            .entry(contest_id.to_string())
            .or_insert_with(|| CiphertextDecryptionContest {
                object_id: contest_id.to_string(),
                guardian_id: trustee.id().to_string(),
                selections: BTreeMap::new(),
            })
            .selections
            .insert(selection_id.to_string(), selection);
    }

    Ok(DecryptionShare {
        guardian_id: trustee.id().to_string(),
        public_key: trustee.election_public_key(),
        contests,
    })
}

/// Compute a present trustee's decryption share of the whole tally.
pub fn compute_decryption_share(
    trustee: &dyn Trustee,
    tally: &CiphertextTally,
    context: &ElectionContext,
) -> Result<DecryptionShare> {
    compute_share_for_messages(trustee, context, tally_messages(tally))
}

/// Compute a present trustee's decryption share of one spoiled ballot.
pub fn compute_decryption_share_for_ballot(
    trustee: &dyn Trustee,
    ballot: &CiphertextBallot,
    context: &ElectionContext,
) -> Result<DecryptionShare> {
    compute_share_for_messages(trustee, context, ballot_messages(ballot))
}

fn compute_compensated_share_for_messages<'a>(
    trustee: &dyn Trustee,
    missing_guardian_id: &str,
    context: &ElectionContext,
    messages: impl Iterator<Item = (&'a str, &'a str, &'a Ciphertext)>,
) -> Result<CompensatedDecryptionShare> {
    // One recovery key covers every selection for this missing guardian.
    let recovery_key = trustee.recover_public_key(missing_guardian_id)?;

    let mut contests: BTreeMap<String, CiphertextCompensatedDecryptionContest> = BTreeMap::new();
    for (contest_id, selection_id, ciphertext) in messages {
        let (share, proof) = trustee.compensated_decrypt(
            missing_guardian_id,
            ciphertext,
            &context.crypto_extended_base_hash,
            None,
        )?;
        let selection = CiphertextCompensatedDecryptionSelection {
            object_id: selection_id.to_string(),
            guardian_id: trustee.id().to_string(),
            missing_guardian_id: missing_guardian_id.to_string(),
            share,
            recovery_key: recovery_key.clone(),
            proof,
        };
        contests
            .entry(contest_id.to_string())
            .or_insert_with(|| CiphertextCompensatedDecryptionContest {
                object_id: contest_id.to_string(),
                guardian_id: trustee.id().to_string(),
                missing_guardian_id: missing_guardian_id.to_string(),
                selections: BTreeMap::new(),
            })
            .selections
            .insert(selection_id.to_string(), selection);
    }

    Ok(CompensatedDecryptionShare {
        guardian_id: trustee.id().to_string(),
        missing_guardian_id: missing_guardian_id.to_string(),
        public_key: trustee.election_public_key(),
        contests,
    })
}

/// Compute one available trustee's compensated share of the tally on
/// behalf of a missing guardian.
pub fn compute_compensated_decryption_share(
    trustee: &dyn Trustee,
    missing_guardian_id: &str,
    tally: &CiphertextTally,
    context: &ElectionContext,
) -> Result<CompensatedDecryptionShare> {
    compute_compensated_share_for_messages(
        trustee,
        missing_guardian_id,
        context,
        tally_messages(tally),
    )
}

/// Compute one available trustee's compensated share of one spoiled ballot
/// on behalf of a missing guardian.
pub fn compute_compensated_decryption_share_for_ballot(
    trustee: &dyn Trustee,
    missing_guardian_id: &str,
    ballot: &CiphertextBallot,
    context: &ElectionContext,
) -> Result<CompensatedDecryptionShare> {
    compute_compensated_share_for_messages(
        trustee,
        missing_guardian_id,
        context,
        ballot_messages(ballot),
    )
}

fn reconstruct_share_for_messages<'a>(
    params: &GroupParams,
    missing_guardian_id: &str,
    missing_public_key: &ElementModP,
    compensated_shares: &BTreeMap<String, CompensatedDecryptionShare>,
    lagrange_coefficients: &BTreeMap<String, ElementModQ>,
    messages: impl Iterator<Item = (&'a str, &'a str, &'a Ciphertext)>,
) -> Result<DecryptionShare> {
    let mut contests: BTreeMap<String, CiphertextDecryptionContest> = BTreeMap::new();

    for (contest_id, selection_id, _) in messages {
        let mut parts: BTreeMap<String, CiphertextCompensatedDecryptionSelection> =
            BTreeMap::new();
        let mut share = ElementModP::one();

        for (available_id, compensated) in compensated_shares {
            let coefficient = lagrange_coefficients.get(available_id).ok_or_else(|| {
                warn!(guardian = %available_id, "no lagrange coefficient for contributor");
                TallyError::MissingGuardianKey(available_id.clone())
            })?;
            let part = compensated
                .contests
                .get(contest_id)
                .and_then(|c| c.selections.get(selection_id))
                .ok_or_else(|| {
                    warn!(
                        guardian = %available_id,
                        selection = %selection_id,
                        "compensated share is missing a selection"
                    );
                    TallyError::CompensationFailed {
                        guardian_id: available_id.clone(),
                        missing_guardian_id: missing_guardian_id.to_string(),
                    }
                })?;

            // share = prod_i M_il ^ w_i mod p
            let weighted = params.pow_p(&part.share, coefficient);
            share = params.mult_p(&[&share, &weighted]);
            parts.insert(available_id.clone(), part.clone());
        }

        let selection = CiphertextDecryptionSelection::recovered(
            selection_id,
            missing_guardian_id,
            share,
            parts,
        );
        contests
            .entry(contest_id.to_string())
            .or_insert_with(|| CiphertextDecryptionContest {
                object_id: contest_id.to_string(),
                guardian_id: missing_guardian_id.to_string(),
                selections: BTreeMap::new(),
            })
            .selections
            .insert(selection_id.to_string(), selection);
    }

    Ok(DecryptionShare {
        guardian_id: missing_guardian_id.to_string(),
        public_key: missing_public_key.clone(),
        contests,
    })
}

/// Combine the compensated shares contributed for one missing guardian
/// into a single decryption share equivalent to a direct one.
pub fn reconstruct_decryption_share(
    params: &GroupParams,
    missing_guardian_id: &str,
    missing_public_key: &ElementModP,
    tally: &CiphertextTally,
    compensated_shares: &BTreeMap<String, CompensatedDecryptionShare>,
    lagrange_coefficients: &BTreeMap<String, ElementModQ>,
) -> Result<DecryptionShare> {
    reconstruct_share_for_messages(
        params,
        missing_guardian_id,
        missing_public_key,
        compensated_shares,
        lagrange_coefficients,
        tally_messages(tally),
    )
}

/// As [`reconstruct_decryption_share`], for one spoiled ballot.
pub fn reconstruct_decryption_share_for_ballot(
    params: &GroupParams,
    missing_guardian_id: &str,
    missing_public_key: &ElementModP,
    ballot: &CiphertextBallot,
    compensated_shares: &BTreeMap<String, CompensatedDecryptionShare>,
    lagrange_coefficients: &BTreeMap<String, ElementModQ>,
) -> Result<DecryptionShare> {
    reconstruct_share_for_messages(
        params,
        missing_guardian_id,
        missing_public_key,
        compensated_shares,
        lagrange_coefficients,
        ballot_messages(ballot),
    )
}

fn decrypt_messages<'a>(
    params: &GroupParams,
    object_id: &str,
    shares: &BTreeMap<String, DecryptionShare>,
    dlog: &DiscreteLog,
    lagrange_coefficients: &BTreeMap<String, ElementModQ>,
    guardian_states: &[AvailableGuardian],
    messages: impl Iterator<Item = (&'a str, &'a str, &'a Ciphertext)>,
) -> Result<PlaintextTally> {
    let mut contests: BTreeMap<String, PlaintextTallyContest> = BTreeMap::new();

    for (contest_id, selection_id, message) in messages {
        let mut selection_shares = Vec::with_capacity(shares.len());
        for share in shares.values() {
            let selection = share
                .contests
                .get(contest_id)
                .and_then(|c| c.selections.get(selection_id))
                .ok_or_else(|| {
                    warn!(
                        guardian = %share.guardian_id,
                        selection = %selection_id,
                        "decryption share is missing a selection"
                    );
                    TallyError::ShareCountMismatch {
                        expected: shares.len() as u32,
                        found: 0,
                    }
                })?;
            selection_shares.push(selection.clone());
        }

        // M = prod_i M_i mod p, then message.data / M = G^tally.
        let share_values: Vec<&ElementModP> =
            selection_shares.iter().map(|s| &s.share).collect();
        let combined = params.mult_p(&share_values);
        let value = params.div_p(&message.data, &combined)?;
        let tally = dlog.discrete_log(&value)?;

        let selection = PlaintextTallySelection {
            object_id: selection_id.to_string(),
            tally,
            value,
            message: message.clone(),
            shares: selection_shares,
        };
        contests
            .entry(contest_id.to_string())
            .or_insert_with(|| PlaintextTallyContest {
                object_id: contest_id.to_string(),
                selections: BTreeMap::new(),
            })
            .selections
            .insert(selection_id.to_string(), selection);
    }

    Ok(PlaintextTally {
        object_id: object_id.to_string(),
        contests,
        lagrange_coefficients: lagrange_coefficients.clone(),
        guardian_states: guardian_states.to_vec(),
    })
}

/// Decrypt the tally from a full set of decryption shares (one per
/// guardian, direct or reconstructed).
pub fn decrypt_tally(
    params: &GroupParams,
    tally: &CiphertextTally,
    shares: &BTreeMap<String, DecryptionShare>,
    dlog: &DiscreteLog,
    lagrange_coefficients: &BTreeMap<String, ElementModQ>,
    guardian_states: &[AvailableGuardian],
) -> Result<PlaintextTally> {
    decrypt_messages(
        params,
        &tally.object_id,
        shares,
        dlog,
        lagrange_coefficients,
        guardian_states,
        tally_messages(tally),
    )
}

/// Decrypt one spoiled ballot from a full set of ballot decryption shares.
pub fn decrypt_ballot(
    params: &GroupParams,
    ballot: &CiphertextBallot,
    shares: &BTreeMap<String, DecryptionShare>,
    dlog: &DiscreteLog,
    lagrange_coefficients: &BTreeMap<String, ElementModQ>,
    guardian_states: &[AvailableGuardian],
) -> Result<PlaintextTally> {
    decrypt_messages(
        params,
        &ballot.object_id,
        shares,
        dlog,
        lagrange_coefficients,
        guardian_states,
        ballot_messages(ballot),
    )
}
