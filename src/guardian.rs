//! Guardians and the trustee decryption capability
//!
//! A [`Guardian`] holds one share of the election's decryption power: its
//! own polynomial and key pair, the other guardians' public keys, and the
//! backups those guardians deposited with it. The decryption orchestrator
//! never touches a guardian directly — it consumes the [`Trustee`]
//! capability, so a local guardian and a remote proxy are interchangeable.

use std::collections::BTreeMap;

use num_bigint::BigUint;
use tracing::warn;

use crate::elgamal::Ciphertext;
use crate::error::{Result, TallyError};
use crate::group::{ElementModP, ElementModQ, GroupParams};
use crate::key_ceremony::{
    self, CeremonyDetails, ElectionKeyPair, ElectionPartialKeyBackup,
    ElectionPartialKeyChallenge, ElectionPartialKeyVerification, ElectionPublicKey,
};
use crate::proofs::ChaumPedersenProof;

/// The capability a decryption session needs from each participating
/// guardian, local or remote. Decryption calls are fallible: a remote
/// trustee that produces no share is a normal failure, never a hang.
pub trait Trustee {
    fn id(&self) -> &str;

    /// The guardian's polynomial x-coordinate.
    fn x_coordinate(&self) -> u32;

    fn election_public_key(&self) -> ElementModP;

    /// Compute `M_i = A^s_i mod p` for the ciphertext plus a Chaum-Pedersen
    /// proof of correctness.
    fn partial_decrypt(
        &self,
        ciphertext: &Ciphertext,
        extended_base_hash: &ElementModQ,
        nonce_seed: Option<&ElementModQ>,
    ) -> Result<(ElementModP, ChaumPedersenProof)>;

    /// Compute `M_il = A^P_l(i) mod p` on behalf of the missing guardian
    /// `l`, using the backup it deposited with this guardian.
    fn compensated_decrypt(
        &self,
        missing_guardian_id: &str,
        ciphertext: &Ciphertext,
        extended_base_hash: &ElementModQ,
        nonce_seed: Option<&ElementModQ>,
    ) -> Result<(ElementModP, ChaumPedersenProof)>;

    /// The public key matching this guardian's share of the missing
    /// guardian's secret: `prod_j K_l,j ^ (i^j) mod p`.
    fn recover_public_key(&self, missing_guardian_id: &str) -> Result<ElementModP>;
}

/// A guardian participating in the key ceremony and in decryption.
pub struct Guardian {
    object_id: String,
    sequence_order: u32,
    ceremony_details: CeremonyDetails,
    params: GroupParams,
    election_keys: ElectionKeyPair,
    /// Other guardians' public keys, by guardian id.
    other_guardian_keys: BTreeMap<String, ElectionPublicKey>,
    /// Backups deposited with this guardian by other guardians.
    other_guardian_backups: BTreeMap<String, ElectionPartialKeyBackup>,
}

impl Guardian {
    /// Create a guardian with a fresh polynomial. The `nonce` makes key
    /// generation deterministic for tests.
    pub fn new(
        params: &GroupParams,
        object_id: &str,
        sequence_order: u32,
        ceremony_details: CeremonyDetails,
        nonce: Option<&ElementModQ>,
    ) -> Self {
        let election_keys = key_ceremony::generate_election_key_pair(
            params,
            object_id,
            sequence_order,
            ceremony_details.quorum,
            nonce,
        );
        Guardian {
            object_id: object_id.to_string(),
            sequence_order,
            ceremony_details,
            params: params.clone(),
            election_keys,
            other_guardian_keys: BTreeMap::new(),
            other_guardian_backups: BTreeMap::new(),
        }
    }

    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    pub fn sequence_order(&self) -> u32 {
        self.sequence_order
    }

    pub fn ceremony_details(&self) -> CeremonyDetails {
        self.ceremony_details
    }

    pub fn election_keys(&self) -> &ElectionKeyPair {
        &self.election_keys
    }

    /// The public key set to broadcast to the other guardians.
    pub fn share_public_key(&self) -> ElectionPublicKey {
        self.election_keys.share()
    }

    /// Record another guardian's public key.
    pub fn save_guardian_key(&mut self, key: ElectionPublicKey) {
        self.other_guardian_keys.insert(key.owner_id.clone(), key);
    }

    /// Produce the partial key backup destined for a guardian whose public
    /// key has been saved.
    pub fn generate_backup(&self, designated_id: &str) -> Result<ElectionPartialKeyBackup> {
        let designated = self
            .other_guardian_keys
            .get(designated_id)
            .ok_or_else(|| TallyError::MissingGuardianKey(designated_id.to_string()))?;
        Ok(key_ceremony::generate_election_partial_key_backup(
            &self.params,
            &self.object_id,
            &self.election_keys.polynomial,
            designated,
        ))
    }

    /// Record a backup deposited by another guardian for this one.
    pub fn save_backup(&mut self, backup: ElectionPartialKeyBackup) {
        self.other_guardian_backups
            .insert(backup.owner_id.clone(), backup);
    }

    /// Verify the backup deposited by `owner_id` against that guardian's
    /// committed polynomial.
    pub fn verify_backup(&self, owner_id: &str) -> Result<ElectionPartialKeyVerification> {
        let backup = self
            .other_guardian_backups
            .get(owner_id)
            .ok_or_else(|| TallyError::MissingBackup(owner_id.to_string()))?;
        let owner_key = self
            .other_guardian_keys
            .get(owner_id)
            .ok_or_else(|| TallyError::MissingGuardianKey(owner_id.to_string()))?;
        Ok(key_ceremony::verify_election_partial_key_backup(
            &self.params,
            &self.object_id,
            backup,
            owner_key,
        ))
    }

    /// Answer a dispute over the backup this guardian generated for
    /// `designated_id`, revealing the coordinate for public adjudication.
    pub fn publish_backup_challenge(
        &self,
        designated_id: &str,
    ) -> Result<ElectionPartialKeyChallenge> {
        let backup = self.generate_backup(designated_id)?;
        Ok(key_ceremony::generate_election_partial_key_challenge(
            &self.params,
            &backup,
            &self.election_keys.polynomial,
        ))
    }
}

impl Trustee for Guardian {
    fn id(&self) -> &str {
        &self.object_id
    }

    fn x_coordinate(&self) -> u32 {
        self.sequence_order
    }

    fn election_public_key(&self) -> ElementModP {
        self.election_keys.key_pair.public_key.clone()
    }

    fn partial_decrypt(
        &self,
        ciphertext: &Ciphertext,
        extended_base_hash: &ElementModQ,
        nonce_seed: Option<&ElementModQ>,
    ) -> Result<(ElementModP, ChaumPedersenProof)> {
        let nonce_seed = match nonce_seed {
            Some(seed) => seed.clone(),
            None => self.params.rand_q(),
        };

        // M_i = A^s_i mod p
        let partial_decryption =
            ciphertext.partial_decrypt(&self.params, &self.election_keys.key_pair.secret_key);
        let proof = ChaumPedersenProof::make(
            &self.params,
            ciphertext,
            &self.election_keys.key_pair.secret_key,
            &partial_decryption,
            &nonce_seed,
            extended_base_hash,
        );
        Ok((partial_decryption, proof))
    }

    fn compensated_decrypt(
        &self,
        missing_guardian_id: &str,
        ciphertext: &Ciphertext,
        extended_base_hash: &ElementModQ,
        nonce_seed: Option<&ElementModQ>,
    ) -> Result<(ElementModP, ChaumPedersenProof)> {
        let nonce_seed = match nonce_seed {
            Some(seed) => seed.clone(),
            None => self.params.rand_q(),
        };

        let backup = self.other_guardian_backups.get(missing_guardian_id).ok_or_else(|| {
            warn!(
                guardian = %self.object_id,
                missing = %missing_guardian_id,
                "no backup held for missing guardian"
            );
            TallyError::MissingBackup(missing_guardian_id.to_string())
        })?;

        // M_il = A^P_l(i) mod p, with P_l(i) the missing guardian's
        // polynomial evaluated at this guardian's x-coordinate.
        let partial_secret = &backup.value;
        let partial_decryption = ciphertext.partial_decrypt(&self.params, partial_secret);
        let proof = ChaumPedersenProof::make(
            &self.params,
            ciphertext,
            partial_secret,
            &partial_decryption,
            &nonce_seed,
            extended_base_hash,
        );
        Ok((partial_decryption, proof))
    }

    fn recover_public_key(&self, missing_guardian_id: &str) -> Result<ElementModP> {
        let missing_key = self
            .other_guardian_keys
            .get(missing_guardian_id)
            .ok_or_else(|| TallyError::MissingGuardianKey(missing_guardian_id.to_string()))?;

        // prod_j K_l,j ^ (i^j) mod p: the public image of P_l(i).
        let x = BigUint::from(self.sequence_order);
        let mut public_key = ElementModP::one();
        for (j, commitment) in missing_key.coefficient_commitments.iter().enumerate() {
            let exponent = self.params.pow_q(&x, &BigUint::from(j));
            let factor = self.params.pow_p(commitment, &exponent);
            public_key = self.params.mult_p(&[&public_key, &factor]);
        }
        Ok(public_key)
    }
}
