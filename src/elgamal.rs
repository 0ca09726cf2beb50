//! Exponential ElGamal encryption and homomorphic accumulation
//!
//! Messages are vote counts carried in the exponent: a ciphertext is
//! `(pad, data) = (G^nonce, G^message * K^nonce)`, so multiplying two
//! ciphertexts component-wise adds their messages. Decryption recovers
//! `G^message` and solves a bounded discrete log over the small message
//! space.

use num_bigint::BigUint;
use num_traits::One;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Result, TallyError};
use crate::group::{ElementModP, ElementModQ, GroupParams};
use crate::hash::ChallengeHasher;

/// Default ceiling for discrete-log searches. Tally counts beyond this are
/// a protocol violation, not an expected input.
pub const DEFAULT_DISCRETE_LOG_BOUND: u64 = 100_000;

/// An ElGamal secret/public key pair: `public_key = G^secret_key mod P`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    pub secret_key: ElementModQ,
    pub public_key: ElementModP,
}

impl KeyPair {
    /// Build a key pair from a secret in [2, Q).
    pub fn from_secret(params: &GroupParams, secret_key: ElementModQ) -> Result<Self> {
        if secret_key.as_uint() < &BigUint::from(2u8) {
            return Err(TallyError::SecretKeyOutOfRange);
        }
        let public_key = params.g_pow_p(&secret_key);
        Ok(KeyPair {
            secret_key,
            public_key,
        })
    }

    /// Generate a random key pair.
    pub fn random(params: &GroupParams) -> Self {
        let secret_key = params.rand_range_q(&ElementModQ::unchecked(2u8));
        let public_key = params.g_pow_p(&secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }
}

/// An exponential ElGamal ciphertext. `pad` is alpha, `data` is beta.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ciphertext {
    pub pad: ElementModP,
    pub data: ElementModP,
}

impl Ciphertext {
    pub fn new(pad: ElementModP, data: ElementModP) -> Self {
        Ciphertext { pad, data }
    }

    /// The additive identity `(1, 1)`: accumulating onto it leaves the
    /// other operand unchanged.
    pub fn identity() -> Self {
        Ciphertext {
            pad: ElementModP::one(),
            data: ElementModP::one(),
        }
    }

    /// Partial decryption `pad^secret_key mod p`, the building block of
    /// threshold decryption. Does not solve a discrete log.
    pub fn partial_decrypt(&self, params: &GroupParams, secret_key: &ElementModQ) -> ElementModP {
        params.pow_p(&self.pad, secret_key)
    }

    /// Decrypt given the known blinding product `K^nonce` (or the combined
    /// partial decryptions), recovering the exponent of `data / product`.
    pub fn decrypt_known_product(
        &self,
        params: &GroupParams,
        product: &ElementModP,
        dlog: &DiscreteLog,
    ) -> Result<u64> {
        let unblinded = params.div_p(&self.data, product)?;
        dlog.discrete_log(&unblinded)
    }

    /// Decrypt with the ElGamal secret key.
    pub fn decrypt(
        &self,
        params: &GroupParams,
        secret_key: &ElementModQ,
        dlog: &DiscreteLog,
    ) -> Result<u64> {
        let product = self.partial_decrypt(params, secret_key);
        self.decrypt_known_product(params, &product, dlog)
    }

    /// Decrypt with the public key and the nonce used at encryption time.
    pub fn decrypt_known_nonce(
        &self,
        params: &GroupParams,
        public_key: &ElementModP,
        nonce: &ElementModQ,
        dlog: &DiscreteLog,
    ) -> Result<u64> {
        let product = params.pow_p(public_key, nonce);
        self.decrypt_known_product(params, &product, dlog)
    }

    /// A hash of this ciphertext, usable as a description hash.
    pub fn crypto_hash(&self, params: &GroupParams) -> ElementModQ {
        ChallengeHasher::new("elgamal-ciphertext")
            .chain_p(&self.pad)
            .chain_p(&self.data)
            .finalize_q(params)
    }
}

/// Encrypt a message (a small non-negative count) with the given nonce and
/// public key. The nonce must be non-zero or the pad would leak `G^0`.
pub fn encrypt(
    params: &GroupParams,
    message: u64,
    nonce: &ElementModQ,
    public_key: &ElementModP,
) -> Result<Ciphertext> {
    if nonce.is_zero() {
        return Err(TallyError::ZeroNonce);
    }
    let pad = params.g_pow_p(nonce);
    let g_pow_m = params.g_pow_p(&ElementModQ::unchecked(message));
    let pubkey_pow_n = params.pow_p(public_key, nonce);
    let data = params.mult_p(&[&g_pow_m, &pubkey_pow_n]);
    Ok(Ciphertext::new(pad, data))
}

/// Homomorphically accumulate one or more ciphertexts by pairwise
/// multiplication; the exponents (vote counts) add.
pub fn add(params: &GroupParams, ciphertexts: &[&Ciphertext]) -> Result<Ciphertext> {
    let first = ciphertexts.first().ok_or(TallyError::EmptyAccumulation)?;
    let mut result = (*first).clone();
    for next in &ciphertexts[1..] {
        result = Ciphertext::new(
            params.mult_p(&[&result.pad, &next.pad]),
            params.mult_p(&[&result.data, &next.data]),
        );
    }
    Ok(result)
}

/// Combine guardian public keys into a joint public key.
pub fn combine_public_keys<'a>(
    params: &GroupParams,
    keys: impl IntoIterator<Item = &'a ElementModP>,
) -> ElementModP {
    let keys: Vec<&ElementModP> = keys.into_iter().collect();
    params.mult_p(&keys)
}

/// Memoizing discrete-log search over the small message space.
///
/// Powers of the generator are computed once and cached; the cache is
/// shared across threads behind a lock so one instance can serve a whole
/// decryption session. Searches never exceed the configured bound.
pub struct DiscreteLog {
    params: GroupParams,
    bound: u64,
    state: RwLock<DlogState>,
}

struct DlogState {
    table: HashMap<BigUint, u64>,
    // g^exponent, the highest power computed so far
    current: BigUint,
    exponent: u64,
}

impl DiscreteLog {
    pub fn new(params: &GroupParams) -> Self {
        Self::with_bound(params, DEFAULT_DISCRETE_LOG_BOUND)
    }

    pub fn with_bound(params: &GroupParams, bound: u64) -> Self {
        let mut table = HashMap::new();
        table.insert(BigUint::one(), 0);
        DiscreteLog {
            params: params.clone(),
            bound,
            state: RwLock::new(DlogState {
                table,
                current: BigUint::one(),
                exponent: 0,
            }),
        }
    }

    pub fn bound(&self) -> u64 {
        self.bound
    }

    /// Find `e` such that `G^e == element`, extending the cached power
    /// table as needed. Fails once the bound is exhausted.
    pub fn discrete_log(&self, element: &ElementModP) -> Result<u64> {
        {
            let state = self.state.read().expect("discrete log cache poisoned");
            if let Some(&exponent) = state.table.get(element.as_uint()) {
                return Ok(exponent);
            }
        }

        let mut state = self.state.write().expect("discrete log cache poisoned");
        // Another thread may have filled the table while we waited.
        if let Some(&exponent) = state.table.get(element.as_uint()) {
            return Ok(exponent);
        }
        while state.exponent < self.bound {
            state.current =
                (&state.current * self.params.generator()) % self.params.large_prime();
            state.exponent += 1;
            let exponent = state.exponent;
            let current = state.current.clone();
            state.table.insert(current, exponent);
            if &state.current == element.as_uint() {
                return Ok(exponent);
            }
        }
        Err(TallyError::DiscreteLogExceeded { bound: self.bound })
    }
}
