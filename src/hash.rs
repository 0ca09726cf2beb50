//! Fiat-Shamir challenge hashing
//!
//! All zero-knowledge proof challenges, the ceremony commitment hash and the
//! election base hashes are SHA-256 digests over the canonical byte
//! encodings of group elements, reduced into Z_q. Each input is
//! length-prefixed so that distinct input sequences can never collide by
//! concatenation, and every hash carries a domain-separation tag.

use num_bigint::BigUint;
use sha2::{Digest, Sha256};

use crate::group::{ElementModP, ElementModQ, GroupParams};

/// Incremental hash over a sequence of typed inputs, producing an element
/// of Z_q.
pub struct ChallengeHasher {
    inner: Sha256,
}

impl ChallengeHasher {
    /// Start a hash under the given domain-separation tag.
    pub fn new(tag: &str) -> Self {
        let mut inner = Sha256::new();
        inner.update(tag.as_bytes());
        ChallengeHasher { inner }
    }

    fn update_bytes(&mut self, bytes: &[u8]) {
        self.inner.update((bytes.len() as u64).to_be_bytes());
        self.inner.update(bytes);
    }

    pub fn chain_q(mut self, e: &ElementModQ) -> Self {
        self.update_bytes(&e.bytes());
        self
    }

    pub fn chain_p(mut self, e: &ElementModP) -> Self {
        self.update_bytes(&e.bytes());
        self
    }

    pub fn chain_str(mut self, s: &str) -> Self {
        self.update_bytes(s.as_bytes());
        self
    }

    pub fn chain_u64(mut self, v: u64) -> Self {
        self.update_bytes(&v.to_be_bytes());
        self
    }

    /// Finish the hash and reduce the digest into [0, Q).
    pub fn finalize_q(self, params: &GroupParams) -> ElementModQ {
        let digest = self.inner.finalize();
        let reduced = BigUint::from_bytes_be(&digest) % params.small_prime();
        ElementModQ::unchecked(reduced)
    }
}

/// Hash a slice of Z_p elements, as used for the ceremony commitment hash.
pub fn hash_commitments(params: &GroupParams, tag: &str, elems: &[&ElementModP]) -> ElementModQ {
    let mut hasher = ChallengeHasher::new(tag);
    for e in elems {
        hasher = hasher.chain_p(e);
    }
    hasher.finalize_q(params)
}
