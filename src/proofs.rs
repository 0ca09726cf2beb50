//! Non-interactive zero-knowledge proofs
//!
//! Two proof forms make every step of the protocol publicly auditable: a
//! Schnorr proof of knowledge of a discrete log, attached to each
//! key-ceremony coefficient commitment, and a Chaum-Pedersen proof that a
//! claimed partial decryption was produced with the secret behind a known
//! public key. Both are made non-interactive with a Fiat-Shamir challenge
//! hash over the canonical element encodings.
//!
//! Verification is pure: it returns a verdict, logs the failing check, and
//! never aborts the caller — a single bad proof must not halt verification
//! of the rest of the record.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::elgamal::{Ciphertext, KeyPair};
use crate::group::{ElementModP, ElementModQ, GroupParams};
use crate::hash::ChallengeHasher;

/// Proof of knowledge of the discrete log of `public_key`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchnorrProof {
    /// `K = G^s`, the commitment being proven.
    pub public_key: ElementModP,
    /// `h = G^r` for the one-time nonce `r`.
    pub commitment: ElementModP,
    /// `c = H(K, h)`.
    pub challenge: ElementModQ,
    /// `u = r + c * s mod q`.
    pub response: ElementModQ,
}

impl SchnorrProof {
    /// Prove knowledge of `keypair.secret_key` using the one-time `nonce`.
    pub fn make(params: &GroupParams, keypair: &KeyPair, nonce: &ElementModQ) -> Self {
        let commitment = params.g_pow_p(nonce);
        let challenge = ChallengeHasher::new("schnorr-proof")
            .chain_p(&keypair.public_key)
            .chain_p(&commitment)
            .finalize_q(params);
        let response = params.a_plus_bc_q(nonce, &challenge, &keypair.secret_key);

        SchnorrProof {
            public_key: keypair.public_key.clone(),
            commitment,
            challenge,
            response,
        }
    }

    /// Check the proof: range membership, challenge recomputation, and
    /// `G^u == h * K^c mod p`.
    pub fn is_valid(&self, params: &GroupParams) -> bool {
        let mut valid = true;

        if !self.public_key.is_valid_residue(params) {
            warn!("schnorr proof public key is not a valid residue");
            valid = false;
        }
        if !self.commitment.is_in_bounds(params) {
            warn!("schnorr proof commitment out of bounds");
            valid = false;
        }
        if !self.challenge.is_in_bounds(params) || !self.response.is_in_bounds(params) {
            warn!("schnorr proof challenge or response out of bounds");
            valid = false;
        }

        let expected = ChallengeHasher::new("schnorr-proof")
            .chain_p(&self.public_key)
            .chain_p(&self.commitment)
            .finalize_q(params);
        if expected != self.challenge {
            warn!("schnorr proof challenge mismatch");
            valid = false;
        }

        let left = params.g_pow_p(&self.response);
        let key_pow_c = params.pow_p(&self.public_key, &self.challenge);
        let right = params.mult_p(&[&self.commitment, &key_pow_c]);
        if left != right {
            warn!("schnorr proof equation failed");
            valid = false;
        }

        valid
    }
}

/// Proof that a partial decryption `M` of the ciphertext `(A, B)` was
/// computed with the secret behind a known public (or recovery) key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaumPedersenProof {
    /// `a = G^u`.
    pub pad: ElementModP,
    /// `b = A^u`.
    pub data: ElementModP,
    /// `c = H(extended_base_hash, A, B, a, b, M)`.
    pub challenge: ElementModQ,
    /// `v = u + c * s mod q`.
    pub response: ElementModQ,
}

impl ChaumPedersenProof {
    /// Prove that `partial_decryption = A^secret`. The commitment nonce is
    /// derived deterministically from `nonce_seed` and the ciphertext, so a
    /// trustee given the same seed reproduces the same proof.
    pub fn make(
        params: &GroupParams,
        message: &Ciphertext,
        secret: &ElementModQ,
        partial_decryption: &ElementModP,
        nonce_seed: &ElementModQ,
        extended_base_hash: &ElementModQ,
    ) -> Self {
        let u = ChallengeHasher::new("chaum-pedersen-nonce")
            .chain_q(nonce_seed)
            .chain_p(&message.pad)
            .chain_p(&message.data)
            .finalize_q(params);

        let pad = params.g_pow_p(&u);
        let data = params.pow_p(&message.pad, &u);
        let challenge = Self::challenge_hash(
            params,
            extended_base_hash,
            message,
            &pad,
            &data,
            partial_decryption,
        );
        let response = params.a_plus_bc_q(&u, &challenge, secret);

        ChaumPedersenProof {
            pad,
            data,
            challenge,
            response,
        }
    }

    fn challenge_hash(
        params: &GroupParams,
        extended_base_hash: &ElementModQ,
        message: &Ciphertext,
        pad: &ElementModP,
        data: &ElementModP,
        partial_decryption: &ElementModP,
    ) -> ElementModQ {
        ChallengeHasher::new("chaum-pedersen-proof")
            .chain_q(extended_base_hash)
            .chain_p(&message.pad)
            .chain_p(&message.data)
            .chain_p(pad)
            .chain_p(data)
            .chain_p(partial_decryption)
            .finalize_q(params)
    }

    /// Check the proof against the ciphertext `(A, B)`, the prover's public
    /// key `k` (a guardian key, or a recovery key in the compensated case)
    /// and the claimed partial decryption `m`:
    ///
    /// - `response` is in Z_q and `pad`, `data` are in the order-Q subgroup
    /// - the challenge matches `H(extended_base_hash, A, B, a, b, M)`
    /// - `G^v == a * k^c mod p`
    /// - `A^v == b * m^c mod p`
    pub fn is_valid(
        &self,
        params: &GroupParams,
        message: &Ciphertext,
        k: &ElementModP,
        m: &ElementModP,
        extended_base_hash: &ElementModQ,
    ) -> bool {
        let mut valid = true;

        if !self.response.is_in_bounds(params) {
            warn!("chaum-pedersen response not in Z_q");
            valid = false;
        }
        if !self.pad.is_valid_residue(params) {
            warn!("chaum-pedersen pad is not a valid residue");
            valid = false;
        }
        if !self.data.is_valid_residue(params) {
            warn!("chaum-pedersen data is not a valid residue");
            valid = false;
        }

        let expected =
            Self::challenge_hash(params, extended_base_hash, message, &self.pad, &self.data, m);
        if expected != self.challenge {
            warn!("chaum-pedersen challenge mismatch");
            valid = false;
        }

        // G^v == a * k^c mod p
        let left = params.g_pow_p(&self.response);
        let key_pow_c = params.pow_p(k, &self.challenge);
        let right = params.mult_p(&[&self.pad, &key_pow_c]);
        if left != right {
            warn!("chaum-pedersen key equation failed");
            valid = false;
        }

        // A^v == b * m^c mod p
        let left = params.pow_p(&message.pad, &self.response);
        let share_pow_c = params.pow_p(m, &self.challenge);
        let right = params.mult_p(&[&self.data, &share_pow_c]);
        if left != right {
            warn!("chaum-pedersen share equation failed");
            valid = false;
        }

        valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elgamal;
    use crate::group::GroupParams;

    #[test]
    fn test_schnorr_roundtrip() {
        let params = GroupParams::large_test();
        let keypair = KeyPair::random(&params);
        let proof = SchnorrProof::make(&params, &keypair, &params.rand_q());
        assert!(proof.is_valid(&params));
    }

    #[test]
    fn test_schnorr_detects_tampering() {
        let params = GroupParams::large_test();
        let keypair = KeyPair::random(&params);
        let proof = SchnorrProof::make(&params, &keypair, &params.rand_q());

        let mut bad = proof.clone();
        bad.response = params.add_q(&[&bad.response, &ElementModQ::one()]);
        assert!(!bad.is_valid(&params));

        let mut bad = proof;
        bad.public_key = KeyPair::random(&params).public_key;
        assert!(!bad.is_valid(&params));
    }

    fn make_decryption_proof(
        params: &GroupParams,
    ) -> (
        KeyPair,
        Ciphertext,
        ElementModP,
        ChaumPedersenProof,
        ElementModQ,
    ) {
        let keypair = KeyPair::random(params);
        let nonce = params.rand_range_q(&ElementModQ::one());
        let message = elgamal::encrypt(params, 3, &nonce, &keypair.public_key).unwrap();
        let partial = message.partial_decrypt(params, &keypair.secret_key);
        let base_hash = params.rand_q();
        let proof = ChaumPedersenProof::make(
            params,
            &message,
            &keypair.secret_key,
            &partial,
            &params.rand_q(),
            &base_hash,
        );
        (keypair, message, partial, proof, base_hash)
    }

    #[test]
    fn test_chaum_pedersen_roundtrip() {
        let params = GroupParams::large_test();
        let (keypair, message, partial, proof, base_hash) = make_decryption_proof(&params);
        assert!(proof.is_valid(&params, &message, &keypair.public_key, &partial, &base_hash));
    }

    #[test]
    fn test_chaum_pedersen_wrong_key_or_share() {
        let params = GroupParams::large_test();
        let (keypair, message, partial, proof, base_hash) = make_decryption_proof(&params);

        let other = KeyPair::random(&params);
        assert!(!proof.is_valid(&params, &message, &other.public_key, &partial, &base_hash));

        let fake_share = params.g_pow_p(&params.rand_q());
        assert!(!proof.is_valid(
            &params,
            &message,
            &keypair.public_key,
            &fake_share,
            &base_hash
        ));
    }

    #[test]
    fn test_chaum_pedersen_range_checks() {
        let params = GroupParams::large_test();
        let (keypair, message, partial, mut proof, base_hash) = make_decryption_proof(&params);

        // Shift the response by exactly Q: same residue, but out of bounds,
        // so the range check alone must reject it.
        proof.response = ElementModQ::unchecked(proof.response.as_uint() + params.small_prime());
        assert!(!proof.is_valid(&params, &message, &keypair.public_key, &partial, &base_hash));
    }

    #[test]
    fn test_chaum_pedersen_is_deterministic_for_seed() {
        let params = GroupParams::large_test();
        let keypair = KeyPair::random(&params);
        let nonce = params.rand_range_q(&ElementModQ::one());
        let message = elgamal::encrypt(&params, 1, &nonce, &keypair.public_key).unwrap();
        let partial = message.partial_decrypt(&params, &keypair.secret_key);
        let seed = params.rand_q();
        let base_hash = params.rand_q();

        let p1 = ChaumPedersenProof::make(
            &params,
            &message,
            &keypair.secret_key,
            &partial,
            &seed,
            &base_hash,
        );
        let p2 = ChaumPedersenProof::make(
            &params,
            &message,
            &keypair.secret_key,
            &partial,
            &seed,
            &base_hash,
        );
        assert_eq!(p1, p2);
    }
}
