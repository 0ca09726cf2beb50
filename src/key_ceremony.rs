//! Key ceremony records and operations
//!
//! Guardians exchange public keys and polynomial backups, adjudicate
//! disputed backups through a three-message challenge protocol, and combine
//! their public keys into the election's joint key. Every participant must
//! derive the joint key and the commitment hash identically, so both are
//! computed over the guardian set sorted by x-coordinate.

use serde::{Deserialize, Serialize};

use crate::elgamal::{self, KeyPair};
use crate::group::{ElementModP, ElementModQ, GroupParams};
use crate::hash;
use crate::polynomial::{self, ElectionPolynomial};
use crate::proofs::SchnorrProof;

/// Number of guardians and the quorum needed to decrypt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CeremonyDetails {
    pub number_of_guardians: u32,
    pub quorum: u32,
}

/// A guardian's key material: the ElGamal key pair is the polynomial's 0th
/// coefficient and commitment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionKeyPair {
    pub owner_id: String,
    /// The guardian's x-coordinate, a unique number in [1, 256).
    pub sequence_order: u32,
    pub key_pair: KeyPair,
    pub polynomial: ElectionPolynomial,
}

impl ElectionKeyPair {
    /// The public part, safe to share with every other guardian.
    pub fn share(&self) -> ElectionPublicKey {
        ElectionPublicKey {
            owner_id: self.owner_id.clone(),
            sequence_order: self.sequence_order,
            key: self.key_pair.public_key.clone(),
            coefficient_commitments: self.polynomial.coefficient_commitments.clone(),
            coefficient_proofs: self.polynomial.coefficient_proofs.clone(),
        }
    }
}

/// A guardian's public key, coefficient commitments and proofs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionPublicKey {
    pub owner_id: String,
    pub sequence_order: u32,
    pub key: ElementModP,
    pub coefficient_commitments: Vec<ElementModP>,
    pub coefficient_proofs: Vec<SchnorrProof>,
}

impl ElectionPublicKey {
    /// The published record for the election's audit trail.
    pub fn publish_guardian_record(&self) -> GuardianRecord {
        GuardianRecord {
            guardian_id: self.owner_id.clone(),
            sequence_order: self.sequence_order,
            election_public_key: self.key.clone(),
            coefficient_commitments: self.coefficient_commitments.clone(),
            coefficient_proofs: self.coefficient_proofs.clone(),
        }
    }

    /// Verify every coefficient proof.
    pub fn is_valid(&self, params: &GroupParams) -> bool {
        self.coefficient_proofs
            .iter()
            .all(|proof| proof.is_valid(params))
    }
}

/// The public record published for one guardian.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardianRecord {
    pub guardian_id: String,
    pub sequence_order: u32,
    pub election_public_key: ElementModP,
    pub coefficient_commitments: Vec<ElementModP>,
    pub coefficient_proofs: Vec<SchnorrProof>,
}

/// The consensus outputs of the ceremony.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionJointKey {
    /// `K = prod K_i mod p` over all guardian public keys.
    pub joint_public_key: ElementModP,
    /// `H(K_1,0, K_1,1, ..., K_n,k-1)` over all coefficient commitments.
    pub commitment_hash: ElementModQ,
}

/// A point on the owner's secret polynomial, destined for one designated
/// guardian. Transport encryption of the value is external to this core.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionPartialKeyBackup {
    pub owner_id: String,
    pub designated_id: String,
    pub designated_sequence_order: u32,
    pub value: ElementModQ,
}

/// Outcome of verifying a backup or a challenge.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionPartialKeyVerification {
    pub owner_id: String,
    pub designated_id: String,
    pub verifier_id: String,
    pub verified: bool,
}

/// The owner's answer to a disputed backup: the coordinate value plus the
/// commitments and proofs, so a third party can adjudicate publicly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionPartialKeyChallenge {
    pub owner_id: String,
    pub designated_id: String,
    pub designated_sequence_order: u32,
    pub value: ElementModQ,
    pub coefficient_commitments: Vec<ElementModP>,
    pub coefficient_proofs: Vec<SchnorrProof>,
}

/// Generate a guardian's election key pair, polynomial and proofs. The 0th
/// coefficient is the secret key, the 0th commitment the public key.
pub fn generate_election_key_pair(
    params: &GroupParams,
    owner_id: &str,
    sequence_order: u32,
    quorum: u32,
    nonce: Option<&ElementModQ>,
) -> ElectionKeyPair {
    let polynomial = polynomial::generate_polynomial(params, quorum, nonce);
    let key_pair = KeyPair {
        secret_key: polynomial.coefficients[0].clone(),
        public_key: polynomial.coefficient_commitments[0].clone(),
    };
    ElectionKeyPair {
        owner_id: owner_id.to_string(),
        sequence_order,
        key_pair,
        polynomial,
    }
}

/// Evaluate the owner's polynomial at the designated guardian's
/// x-coordinate, producing that guardian's backup.
pub fn generate_election_partial_key_backup(
    params: &GroupParams,
    owner_id: &str,
    polynomial: &ElectionPolynomial,
    designated_guardian_key: &ElectionPublicKey,
) -> ElectionPartialKeyBackup {
    let value = polynomial::compute_polynomial_coordinate(
        params,
        designated_guardian_key.sequence_order,
        polynomial,
    );
    ElectionPartialKeyBackup {
        owner_id: owner_id.to_string(),
        designated_id: designated_guardian_key.owner_id.clone(),
        designated_sequence_order: designated_guardian_key.sequence_order,
        value,
    }
}

/// Verify that a received backup is a point on the owner's committed
/// polynomial, without learning the polynomial.
pub fn verify_election_partial_key_backup(
    params: &GroupParams,
    verifier_id: &str,
    backup: &ElectionPartialKeyBackup,
    owner_public_key: &ElectionPublicKey,
) -> ElectionPartialKeyVerification {
    ElectionPartialKeyVerification {
        owner_id: backup.owner_id.clone(),
        designated_id: backup.designated_id.clone(),
        verifier_id: verifier_id.to_string(),
        verified: polynomial::verify_polynomial_coordinate(
            params,
            &backup.value,
            backup.designated_sequence_order,
            &owner_public_key.coefficient_commitments,
        ),
    }
}

/// The owner's response to a failed backup verification: reveal the
/// coordinate so any third party can adjudicate.
pub fn generate_election_partial_key_challenge(
    params: &GroupParams,
    backup: &ElectionPartialKeyBackup,
    polynomial: &ElectionPolynomial,
) -> ElectionPartialKeyChallenge {
    ElectionPartialKeyChallenge {
        owner_id: backup.owner_id.clone(),
        designated_id: backup.designated_id.clone(),
        designated_sequence_order: backup.designated_sequence_order,
        value: polynomial::compute_polynomial_coordinate(
            params,
            backup.designated_sequence_order,
            polynomial,
        ),
        coefficient_commitments: polynomial.coefficient_commitments.clone(),
        coefficient_proofs: polynomial.coefficient_proofs.clone(),
    }
}

/// Adjudicate a challenge as a neutral verifier.
pub fn verify_election_partial_key_challenge(
    params: &GroupParams,
    verifier_id: &str,
    challenge: &ElectionPartialKeyChallenge,
) -> ElectionPartialKeyVerification {
    ElectionPartialKeyVerification {
        owner_id: challenge.owner_id.clone(),
        designated_id: challenge.designated_id.clone(),
        verifier_id: verifier_id.to_string(),
        verified: polynomial::verify_polynomial_coordinate(
            params,
            &challenge.value,
            challenge.designated_sequence_order,
            &challenge.coefficient_commitments,
        ),
    }
}

/// Combine the guardians' public keys into the joint election key and
/// commitment hash. Both are consensus values: the keys are sorted by
/// x-coordinate before combining so every participant derives the same
/// result.
pub fn combine_election_public_keys(
    params: &GroupParams,
    election_public_keys: &[ElectionPublicKey],
) -> ElectionJointKey {
    let mut sorted: Vec<&ElectionPublicKey> = election_public_keys.iter().collect();
    sorted.sort_by_key(|k| k.sequence_order);

    let joint_public_key =
        elgamal::combine_public_keys(params, sorted.iter().map(|k| &k.key));

    let commitments: Vec<&ElementModP> = sorted
        .iter()
        .flat_map(|key| key.coefficient_commitments.iter())
        .collect();
    let commitment_hash = hash::hash_commitments(params, "commitment-hash", &commitments);

    ElectionJointKey {
        joint_public_key,
        commitment_hash,
    }
}
