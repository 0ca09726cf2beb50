//! Orchestration of a decryption session
//!
//! The mediator collects guardian announcements, computes each announcing
//! guardian's shares eagerly, and once a quorum is reached either decrypts
//! directly (all guardians present) or compensates for the missing ones:
//! every available guardian must contribute a compensated share for every
//! missing guardian — a single failure aborts that reconstruction and is
//! reported, never silently skipped. Nothing is retried here; re-contacting
//! a slow remote trustee is the transport layer's concern.

use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

use crate::ballot::CiphertextBallot;
use crate::decrypt::{
    self, AvailableGuardian, PlaintextTally,
};
use crate::elgamal::DiscreteLog;
use crate::election::ElectionContext;
use crate::error::{Result, TallyError};
use crate::group::{ElementModP, ElementModQ, GroupParams};
use crate::guardian::Trustee;
use crate::polynomial;
use crate::shares::{CompensatedDecryptionShare, DecryptionShare};
use crate::tally::CiphertextTally;

/// Orchestrates the decryption of an encrypted tally and its spoiled
/// ballots across announced guardians.
pub struct DecryptionMediator<'a> {
    params: GroupParams,
    context: &'a ElectionContext,
    tally: &'a CiphertextTally,
    spoiled_ballots: &'a [CiphertextBallot],
    /// Every guardian's election public key, available or not.
    guardian_public_keys: BTreeMap<String, ElementModP>,
    available_guardians: BTreeMap<String, &'a dyn Trustee>,
    missing_guardians: BTreeSet<String>,
    /// guardian id -> tally decryption share (direct or reconstructed)
    tally_shares: BTreeMap<String, DecryptionShare>,
    /// guardian id -> ballot id -> ballot decryption share
    ballot_shares: BTreeMap<String, BTreeMap<String, DecryptionShare>>,
    lagrange_coefficients: Option<BTreeMap<String, ElementModQ>>,
    guardian_states: Vec<AvailableGuardian>,
    dlog: DiscreteLog,
}

impl<'a> DecryptionMediator<'a> {
    pub fn new(
        params: &GroupParams,
        context: &'a ElectionContext,
        tally: &'a CiphertextTally,
        spoiled_ballots: &'a [CiphertextBallot],
        guardian_public_keys: BTreeMap<String, ElementModP>,
    ) -> Self {
        let missing_guardians = guardian_public_keys.keys().cloned().collect();
        DecryptionMediator {
            params: params.clone(),
            context,
            tally,
            spoiled_ballots,
            guardian_public_keys,
            available_guardians: BTreeMap::new(),
            missing_guardians,
            tally_shares: BTreeMap::new(),
            ballot_shares: BTreeMap::new(),
            lagrange_coefficients: None,
            guardian_states: Vec::new(),
            dlog: DiscreteLog::new(params),
        }
    }

    /// Announce that a guardian is present for the decryption. The
    /// guardian's tally and spoiled-ballot shares are computed immediately.
    pub fn announce(&mut self, guardian: &'a dyn Trustee) -> Result<()> {
        if self.available_guardians.contains_key(guardian.id()) {
            warn!(guardian = %guardian.id(), "guardian already announced");
            return Err(TallyError::AlreadyAnnounced(guardian.id().to_string()));
        }

        let tally_share =
            decrypt::compute_decryption_share(guardian, self.tally, self.context)?;

        let mut shares_by_ballot = BTreeMap::new();
        for ballot in self.spoiled_ballots {
            let share =
                decrypt::compute_decryption_share_for_ballot(guardian, ballot, self.context)?;
            shares_by_ballot.insert(ballot.object_id.clone(), share);
        }

        info!(guardian = %guardian.id(), "guardian announced for decryption");
        self.tally_shares
            .insert(guardian.id().to_string(), tally_share);
        self.ballot_shares
            .insert(guardian.id().to_string(), shares_by_ballot);
        self.missing_guardians.remove(guardian.id());
        self.available_guardians
            .insert(guardian.id().to_string(), guardian);
        // The coefficients depend on who is present, so a late
        // announcement invalidates them.
        self.lagrange_coefficients = None;
        self.guardian_states.clear();
        Ok(())
    }

    pub fn announced_count(&self) -> usize {
        self.available_guardians.len()
    }

    /// The announced guardians with their Lagrange coefficients. Populated
    /// once a decryption has been requested.
    pub fn available_guardians(&self) -> &[AvailableGuardian] {
        &self.guardian_states
    }

    fn check_quorum(&self) -> Result<()> {
        let announced = self.available_guardians.len() as u32;
        if announced < self.context.quorum {
            warn!(
                announced,
                quorum = self.context.quorum,
                "cannot decrypt below quorum"
            );
            return Err(TallyError::QuorumNotReached {
                required: self.context.quorum,
                announced,
            });
        }
        Ok(())
    }

    /// Compute the Lagrange coefficients for the announced guardians, once
    /// per session.
    fn compute_lagrange_coefficients(&mut self) {
        if self.lagrange_coefficients.is_some() {
            return;
        }
        let mut coefficients = BTreeMap::new();
        let mut states = Vec::new();
        for guardian in self.available_guardians.values() {
            let others: Vec<u32> = self
                .available_guardians
                .values()
                .filter(|g| g.id() != guardian.id())
                .map(|g| g.x_coordinate())
                .collect();
            let coefficient = polynomial::compute_lagrange_coefficient(
                &self.params,
                guardian.x_coordinate(),
                &others,
            );
            coefficients.insert(guardian.id().to_string(), coefficient.clone());
            states.push(AvailableGuardian {
                guardian_id: guardian.id().to_string(),
                sequence_order: guardian.x_coordinate(),
                lagrange_coefficient: coefficient,
            });
        }
        self.lagrange_coefficients = Some(coefficients);
        self.guardian_states = states;
    }

    /// Collect a compensated tally share for `missing_guardian_id` from
    /// every available guardian. All of them must succeed.
    fn compensated_tally_shares(
        &self,
        missing_guardian_id: &str,
    ) -> Result<BTreeMap<String, CompensatedDecryptionShare>> {
        let mut compensated = BTreeMap::new();
        for guardian in self.available_guardians.values() {
            let share = decrypt::compute_compensated_decryption_share(
                *guardian,
                missing_guardian_id,
                self.tally,
                self.context,
            )
            .map_err(|err| {
                warn!(
                    guardian = %guardian.id(),
                    missing = %missing_guardian_id,
                    %err,
                    "compensation failed"
                );
                TallyError::CompensationFailed {
                    guardian_id: guardian.id().to_string(),
                    missing_guardian_id: missing_guardian_id.to_string(),
                }
            })?;
            compensated.insert(guardian.id().to_string(), share);
        }
        Ok(compensated)
    }

    /// Reconstruct tally shares for every missing guardian.
    fn compute_missing_shares_for_tally(&mut self) -> Result<()> {
        let lagrange = self
            .lagrange_coefficients
            .clone()
            .unwrap_or_default();
        let missing: Vec<String> = self.missing_guardians.iter().cloned().collect();

        for missing_guardian_id in missing {
            if self.tally_shares.contains_key(&missing_guardian_id) {
                continue;
            }
            let missing_public_key = self
                .guardian_public_keys
                .get(&missing_guardian_id)
                .ok_or_else(|| TallyError::MissingGuardianKey(missing_guardian_id.clone()))?
                .clone();

            let compensated = self.compensated_tally_shares(&missing_guardian_id)?;
            let reconstructed = decrypt::reconstruct_decryption_share(
                &self.params,
                &missing_guardian_id,
                &missing_public_key,
                self.tally,
                &compensated,
                &lagrange,
            )?;
            self.tally_shares
                .insert(missing_guardian_id, reconstructed);
        }
        Ok(())
    }

    /// Decrypt the tally. Requires a quorum; missing guardians are
    /// compensated for before the final decryption.
    pub fn get_plaintext_tally(&mut self) -> Result<PlaintextTally> {
        self.check_quorum()?;
        self.compute_lagrange_coefficients();

        if self.available_guardians.len() < self.context.number_of_guardians as usize {
            self.compute_missing_shares_for_tally()?;
        }

        let expected = self.context.number_of_guardians;
        let found = self.tally_shares.len() as u32;
        if found != expected {
            warn!(expected, found, "tally share count mismatch");
            return Err(TallyError::ShareCountMismatch { expected, found });
        }

        decrypt::decrypt_tally(
            &self.params,
            self.tally,
            &self.tally_shares,
            &self.dlog,
            self.lagrange_coefficients.as_ref().expect("computed above"),
            &self.guardian_states,
        )
    }

    /// Collect compensated ballot shares for one missing guardian across
    /// one ballot, from every available guardian.
    fn compensated_ballot_shares(
        &self,
        missing_guardian_id: &str,
        ballot: &CiphertextBallot,
    ) -> Result<BTreeMap<String, CompensatedDecryptionShare>> {
        let mut compensated = BTreeMap::new();
        for guardian in self.available_guardians.values() {
            let share = decrypt::compute_compensated_decryption_share_for_ballot(
                *guardian,
                missing_guardian_id,
                ballot,
                self.context,
            )
            .map_err(|err| {
                warn!(
                    guardian = %guardian.id(),
                    missing = %missing_guardian_id,
                    ballot = %ballot.object_id,
                    %err,
                    "ballot compensation failed"
                );
                TallyError::CompensationFailed {
                    guardian_id: guardian.id().to_string(),
                    missing_guardian_id: missing_guardian_id.to_string(),
                }
            })?;
            compensated.insert(guardian.id().to_string(), share);
        }
        Ok(compensated)
    }

    fn count_ballot_shares(&self, ballot_id: &str) -> u32 {
        self.ballot_shares
            .values()
            .filter(|shares| shares.contains_key(ballot_id))
            .count() as u32
    }

    /// Reconstruct ballot shares for every missing guardian on one ballot.
    fn compute_missing_shares_for_ballot(&mut self, ballot: &CiphertextBallot) -> Result<()> {
        let lagrange = self
            .lagrange_coefficients
            .clone()
            .unwrap_or_default();
        let missing: Vec<String> = self.missing_guardians.iter().cloned().collect();

        for missing_guardian_id in missing {
            let missing_public_key = self
                .guardian_public_keys
                .get(&missing_guardian_id)
                .ok_or_else(|| TallyError::MissingGuardianKey(missing_guardian_id.clone()))?
                .clone();

            let compensated = self.compensated_ballot_shares(&missing_guardian_id, ballot)?;
            let reconstructed = decrypt::reconstruct_decryption_share_for_ballot(
                &self.params,
                &missing_guardian_id,
                &missing_public_key,
                ballot,
                &compensated,
                &lagrange,
            )?;
            self.ballot_shares
                .entry(missing_guardian_id)
                .or_default()
                .insert(ballot.object_id.clone(), reconstructed);
        }
        Ok(())
    }

    /// Decrypt every spoiled ballot. Each ballot needs a full complement
    /// of `n` shares before it is considered decryptable.
    pub fn decrypt_spoiled_ballots(&mut self) -> Result<BTreeMap<String, PlaintextTally>> {
        self.check_quorum()?;
        self.compute_lagrange_coefficients();

        let expected = self.context.number_of_guardians;
        let ballots = self.spoiled_ballots;
        for ballot in ballots {
            if self.count_ballot_shares(&ballot.object_id) < expected {
                self.compute_missing_shares_for_ballot(ballot)?;
            }
            let found = self.count_ballot_shares(&ballot.object_id);
            if found != expected {
                warn!(
                    ballot = %ballot.object_id,
                    expected,
                    found,
                    "ballot share count mismatch"
                );
                return Err(TallyError::ShareCountMismatch { expected, found });
            }
        }

        let lagrange = self.lagrange_coefficients.as_ref().expect("computed above");
        let mut decrypted = BTreeMap::new();
        for ballot in ballots {
            let shares: BTreeMap<String, DecryptionShare> = self
                .ballot_shares
                .iter()
                .filter_map(|(guardian_id, by_ballot)| {
                    by_ballot
                        .get(&ballot.object_id)
                        .map(|share| (guardian_id.clone(), share.clone()))
                })
                .collect();
            let plaintext = decrypt::decrypt_ballot(
                &self.params,
                ballot,
                &shares,
                &self.dlog,
                lagrange,
                &self.guardian_states,
            )?;
            decrypted.insert(ballot.object_id.clone(), plaintext);
        }
        Ok(decrypted)
    }
}
