//! Homomorphic accumulation of cast ballots into an encrypted tally
//!
//! The builder keeps one running ciphertext per (contest, selection),
//! seeded with the ElGamal identity `(1, 1)`. Folding is commutative and
//! associative, so ballots may arrive in any order and batches may be
//! partitioned by selection id for parallel execution without changing the
//! result. Batch accumulation is a fork/join map-reduce: each selection's
//! ciphertext group is folded by an independent rayon task with no shared
//! mutation, and the per-selection results are merged at the join barrier.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

use crate::ballot::{BallotState, CiphertextBallot};
use crate::elgamal::{self, Ciphertext};
use crate::election::Manifest;
use crate::error::{Result, TallyError};
use crate::group::GroupParams;

/// The accumulated ciphertext for one selection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextTallySelection {
    pub object_id: String,
    pub ciphertext: Ciphertext,
}

/// The accumulated selections of one contest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextTallyContest {
    pub object_id: String,
    pub selections: BTreeMap<String, CiphertextTallySelection>,
}

/// An immutable snapshot of the encrypted tally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextTally {
    pub object_id: String,
    pub contests: BTreeMap<String, CiphertextTallyContest>,
}

/// A mutable, resumable accumulator of cast ballots.
pub struct CiphertextTallyBuilder {
    pub object_id: String,
    params: GroupParams,
    manifest: Manifest,
    cast_ballot_ids: HashSet<String>,
    spoiled_ballot_ids: HashSet<String>,
    /// contest id -> selection id -> running accumulator
    contests: BTreeMap<String, BTreeMap<String, Ciphertext>>,
}

impl CiphertextTallyBuilder {
    /// Build one `(1, 1)` accumulator per selection the manifest defines.
    pub fn new(object_id: &str, manifest: &Manifest, params: &GroupParams) -> Self {
        let contests = manifest
            .contests
            .iter()
            .map(|contest| {
                let selections = contest
                    .selections
                    .iter()
                    .map(|s| (s.object_id.clone(), Ciphertext::identity()))
                    .collect();
                (contest.object_id.clone(), selections)
            })
            .collect();

        CiphertextTallyBuilder {
            object_id: object_id.to_string(),
            params: params.clone(),
            manifest: manifest.clone(),
            cast_ballot_ids: HashSet::new(),
            spoiled_ballot_ids: HashSet::new(),
            contests,
        }
    }

    /// Number of cast ballots tallied so far.
    pub fn count(&self) -> usize {
        self.cast_ballot_ids.len()
    }

    pub fn spoiled_ballot_ids(&self) -> &HashSet<String> {
        &self.spoiled_ballot_ids
    }

    /// Check a ballot's contests and selection sets against the manifest.
    /// Performed in full before any accumulator is touched, so a rejected
    /// ballot never leaves the tally partially updated.
    fn validate(&self, ballot: &CiphertextBallot) -> Result<()> {
        for contest in &ballot.contests {
            let description = self
                .manifest
                .contest(&contest.object_id)
                .ok_or_else(|| TallyError::UnknownContest(contest.object_id.clone()))?;

            let ballot_selection_ids: std::collections::BTreeSet<String> = contest
                .selections
                .iter()
                .filter(|s| !s.is_placeholder)
                .map(|s| s.object_id.clone())
                .collect();
            if ballot_selection_ids != description.selection_ids() {
                return Err(TallyError::MismatchedSelections(contest.object_id.clone()));
            }
        }
        Ok(())
    }

    /// Append one ballot. Cast ballots are folded into the tally; spoiled
    /// ballots are only recorded so they cannot be appended again.
    pub fn append(&mut self, ballot: &CiphertextBallot) -> Result<()> {
        if ballot.state == BallotState::Unknown {
            warn!(ballot = %ballot.object_id, "cannot tally a ballot in an unknown state");
            return Err(TallyError::UnknownBallotState(ballot.object_id.clone()));
        }
        if self.cast_ballot_ids.contains(&ballot.object_id)
            || self.spoiled_ballot_ids.contains(&ballot.object_id)
        {
            warn!(ballot = %ballot.object_id, "ballot is already tallied");
            return Err(TallyError::DuplicateBallot(ballot.object_id.clone()));
        }
        self.validate(ballot)?;

        match ballot.state {
            BallotState::Cast => {
                for contest in &ballot.contests {
                    let accumulators = self
                        .contests
                        .get_mut(&contest.object_id)
                        .expect("validated contest exists");
                    for selection in &contest.selections {
                        if selection.is_placeholder {
                            continue;
                        }
                        let accumulator = accumulators
                            .get_mut(&selection.object_id)
                            .expect("validated selection exists");
                        *accumulator = elgamal::add(
                            &self.params,
                            &[&*accumulator, &selection.ciphertext],
                        )?;
                    }
                }
                self.cast_ballot_ids.insert(ballot.object_id.clone());
            }
            BallotState::Spoiled => {
                self.spoiled_ballot_ids.insert(ballot.object_id.clone());
            }
            BallotState::Unknown => unreachable!("rejected above"),
        }
        Ok(())
    }

    /// Stream a ballot source, filter it to valid not-yet-seen cast
    /// ballots, and fold each selection's ciphertext group in one parallel
    /// pass. Returns the number of ballots accumulated; invalid ballots are
    /// skipped and logged, matching the streaming contract.
    pub fn batch_append(
        &mut self,
        ballots: impl IntoIterator<Item = CiphertextBallot>,
    ) -> Result<usize> {
        // selection id -> the ciphertexts cast for it across the batch
        let mut groups: BTreeMap<String, Vec<Ciphertext>> = BTreeMap::new();
        let mut count = 0usize;

        for ballot in ballots {
            if !ballot.is_cast() {
                continue;
            }
            if self.cast_ballot_ids.contains(&ballot.object_id)
                || self.spoiled_ballot_ids.contains(&ballot.object_id)
            {
                debug!(ballot = %ballot.object_id, "skipping already tallied ballot");
                continue;
            }
            if let Err(err) = self.validate(&ballot) {
                warn!(ballot = %ballot.object_id, %err, "skipping invalid ballot");
                continue;
            }

            for contest in &ballot.contests {
                for selection in &contest.selections {
                    if selection.is_placeholder {
                        continue;
                    }
                    groups
                        .entry(selection.object_id.clone())
                        .or_default()
                        .push(selection.ciphertext.clone());
                }
            }
            self.cast_ballot_ids.insert(ballot.object_id.clone());
            count += 1;
        }

        // Fork/join: one independent fold per selection id, merged below.
        let folded: Vec<(String, Result<Ciphertext>)> = groups
            .into_par_iter()
            .map(|(selection_id, ciphertexts)| {
                let refs: Vec<&Ciphertext> = ciphertexts.iter().collect();
                (selection_id, elgamal::add(&self.params, &refs))
            })
            .collect();

        for (selection_id, sum) in folded {
            let sum = sum?;
            for accumulators in self.contests.values_mut() {
                if let Some(accumulator) = accumulators.get_mut(&selection_id) {
                    *accumulator = elgamal::add(&self.params, &[&*accumulator, &sum])?;
                }
            }
        }

        Ok(count)
    }

    /// Emit an immutable snapshot. The builder remains usable; more
    /// ballots may be appended and a later snapshot taken.
    pub fn build(&self) -> CiphertextTally {
        let contests = self
            .contests
            .iter()
            .map(|(contest_id, selections)| {
                let selections = selections
                    .iter()
                    .map(|(selection_id, ciphertext)| {
                        (
                            selection_id.clone(),
                            CiphertextTallySelection {
                                object_id: selection_id.clone(),
                                ciphertext: ciphertext.clone(),
                            },
                        )
                    })
                    .collect();
                (
                    contest_id.clone(),
                    CiphertextTallyContest {
                        object_id: contest_id.clone(),
                        selections,
                    },
                )
            })
            .collect();

        CiphertextTally {
            object_id: self.object_id.clone(),
            contests,
        }
    }
}
