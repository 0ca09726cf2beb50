//! Decryption share data model
//!
//! A share of one selection's decryption is either produced *directly* by
//! a present guardian (carrying a Chaum-Pedersen proof) or *recovered* on a
//! missing guardian's behalf from the compensated parts contributed by the
//! other guardians. The two cases are a tagged sum, so a share carrying
//! both — or neither — cannot be represented; the permissive
//! [`CiphertextDecryptionSelection::from_parts`] constructor guards the
//! (de)serialization boundary where that invariant arrives unchecked.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::elgamal::Ciphertext;
use crate::error::{Result, TallyError};
use crate::group::{ElementModP, ElementModQ, GroupParams};
use crate::proofs::ChaumPedersenProof;

/// Anything addressable by an election object id.
pub trait HasObjectId {
    fn object_id(&self) -> &str;
}

/// One available guardian's fragment of a missing guardian's partial
/// decryption of one selection: `M_il` in the protocol.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextCompensatedDecryptionSelection {
    /// The selection this share decrypts.
    pub object_id: String,
    /// The available guardian that produced this fragment.
    pub guardian_id: String,
    /// The missing guardian it compensates for.
    pub missing_guardian_id: String,
    /// `M_il = A^P_l(i) mod p`.
    pub share: ElementModP,
    /// The public image of the available guardian's share of the missing
    /// guardian's secret.
    pub recovery_key: ElementModP,
    pub proof: ChaumPedersenProof,
}

impl HasObjectId for CiphertextCompensatedDecryptionSelection {
    fn object_id(&self) -> &str {
        &self.object_id
    }
}

/// How a selection share is evidenced: a direct proof from the guardian
/// itself, or the recovered parts contributed by the other guardians.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecryptionEvidence {
    Direct(ChaumPedersenProof),
    /// Keyed by the contributing (available) guardian id.
    Recovered(BTreeMap<String, CiphertextCompensatedDecryptionSelection>),
}

/// One guardian's partial decryption of one selection: `M_i`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextDecryptionSelection {
    pub object_id: String,
    /// The guardian this share belongs to (possibly a missing guardian
    /// whose share was reconstructed).
    pub guardian_id: String,
    pub share: ElementModP,
    pub evidence: DecryptionEvidence,
}

impl HasObjectId for CiphertextDecryptionSelection {
    fn object_id(&self) -> &str {
        &self.object_id
    }
}

impl CiphertextDecryptionSelection {
    pub fn direct(
        object_id: &str,
        guardian_id: &str,
        share: ElementModP,
        proof: ChaumPedersenProof,
    ) -> Self {
        CiphertextDecryptionSelection {
            object_id: object_id.to_string(),
            guardian_id: guardian_id.to_string(),
            share,
            evidence: DecryptionEvidence::Direct(proof),
        }
    }

    pub fn recovered(
        object_id: &str,
        guardian_id: &str,
        share: ElementModP,
        parts: BTreeMap<String, CiphertextCompensatedDecryptionSelection>,
    ) -> Self {
        CiphertextDecryptionSelection {
            object_id: object_id.to_string(),
            guardian_id: guardian_id.to_string(),
            share,
            evidence: DecryptionEvidence::Recovered(parts),
        }
    }

    /// Build a share from independently transported pieces. Exactly one of
    /// `proof` and `recovered_parts` must be present.
    pub fn from_parts(
        object_id: &str,
        guardian_id: &str,
        share: ElementModP,
        proof: Option<ChaumPedersenProof>,
        recovered_parts: Option<BTreeMap<String, CiphertextCompensatedDecryptionSelection>>,
    ) -> Result<Self> {
        match (proof, recovered_parts) {
            (Some(proof), None) => Ok(Self::direct(object_id, guardian_id, share, proof)),
            (None, Some(parts)) => Ok(Self::recovered(object_id, guardian_id, share, parts)),
            _ => {
                warn!(
                    guardian = %guardian_id,
                    selection = %object_id,
                    "share must carry exactly one of proof or recovered parts"
                );
                Err(TallyError::AmbiguousShare(object_id.to_string()))
            }
        }
    }

    pub fn proof(&self) -> Option<&ChaumPedersenProof> {
        match &self.evidence {
            DecryptionEvidence::Direct(proof) => Some(proof),
            DecryptionEvidence::Recovered(_) => None,
        }
    }

    pub fn recovered_parts(
        &self,
    ) -> Option<&BTreeMap<String, CiphertextCompensatedDecryptionSelection>> {
        match &self.evidence {
            DecryptionEvidence::Direct(_) => None,
            DecryptionEvidence::Recovered(parts) => Some(parts),
        }
    }

    /// Verify this share against the encrypted `message` it claims to
    /// decrypt. A direct share is checked against the guardian's election
    /// public key; a recovered share checks every contributed part against
    /// its recovery key.
    pub fn is_valid(
        &self,
        params: &GroupParams,
        message: &Ciphertext,
        election_public_key: &ElementModP,
        extended_base_hash: &ElementModQ,
    ) -> bool {
        match &self.evidence {
            DecryptionEvidence::Direct(proof) => {
                let valid = proof.is_valid(
                    params,
                    message,
                    election_public_key,
                    &self.share,
                    extended_base_hash,
                );
                if !valid {
                    warn!(
                        guardian = %self.guardian_id,
                        selection = %self.object_id,
                        "direct decryption share has an invalid proof"
                    );
                }
                valid
            }
            DecryptionEvidence::Recovered(parts) => {
                let mut valid = true;
                for part in parts.values() {
                    if !part.proof.is_valid(
                        params,
                        message,
                        &part.recovery_key,
                        &part.share,
                        extended_base_hash,
                    ) {
                        warn!(
                            guardian = %self.guardian_id,
                            contributor = %part.guardian_id,
                            selection = %self.object_id,
                            "recovered decryption share has an invalid part"
                        );
                        valid = false;
                    }
                }
                valid
            }
        }
    }
}

/// One guardian's partial decryption of a contest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextDecryptionContest {
    pub object_id: String,
    pub guardian_id: String,
    pub selections: BTreeMap<String, CiphertextDecryptionSelection>,
}

impl HasObjectId for CiphertextDecryptionContest {
    fn object_id(&self) -> &str {
        &self.object_id
    }
}

/// One guardian's compensated partial decryption of a contest, on behalf
/// of a missing guardian.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextCompensatedDecryptionContest {
    pub object_id: String,
    pub guardian_id: String,
    pub missing_guardian_id: String,
    pub selections: BTreeMap<String, CiphertextCompensatedDecryptionSelection>,
}

impl HasObjectId for CiphertextCompensatedDecryptionContest {
    fn object_id(&self) -> &str {
        &self.object_id
    }
}

/// One guardian's decryption share of an entire tally, or of a single
/// spoiled ballot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionShare {
    pub guardian_id: String,
    pub public_key: ElementModP,
    pub contests: BTreeMap<String, CiphertextDecryptionContest>,
}

/// A compensated decryption share produced by one available guardian on
/// behalf of one missing guardian.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompensatedDecryptionShare {
    pub guardian_id: String,
    pub missing_guardian_id: String,
    pub public_key: ElementModP,
    pub contests: BTreeMap<String, CiphertextCompensatedDecryptionContest>,
}

/// Gather, per guardian, the public key and selection share recorded for
/// one selection id across a set of decryption shares.
pub fn get_shares_for_selection<'a>(
    selection_id: &str,
    shares: &'a BTreeMap<String, DecryptionShare>,
) -> BTreeMap<String, (ElementModP, &'a CiphertextDecryptionSelection)> {
    let mut found = BTreeMap::new();
    for share in shares.values() {
        for contest in share.contests.values() {
            for selection in contest.selections.values() {
                if selection.object_id == selection_id {
                    found.insert(
                        share.guardian_id.clone(),
                        (share.public_key.clone(), selection),
                    );
                }
            }
        }
    }
    found
}
