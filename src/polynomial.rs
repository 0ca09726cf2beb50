//! Shamir-style secret polynomials and Lagrange reconstruction
//!
//! Each guardian draws a random polynomial of degree `quorum - 1` over Z_q.
//! The 0th coefficient is the guardian's ElGamal secret key; evaluations at
//! the other guardians' x-coordinates become the key-ceremony backups, and
//! any `quorum` of those evaluations reconstruct the value at zero.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::elgamal::KeyPair;
use crate::group::{ElementModP, ElementModQ, GroupParams};
use crate::proofs::SchnorrProof;

/// A guardian's secret polynomial: `quorum` coefficients in Z_q, a public
/// commitment `G^a_j` for each, and a Schnorr proof of knowledge per
/// coefficient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionPolynomial {
    pub coefficients: Vec<ElementModQ>,
    pub coefficient_commitments: Vec<ElementModP>,
    pub coefficient_proofs: Vec<SchnorrProof>,
}

impl ElectionPolynomial {
    /// Number of coefficients, which equals the quorum.
    pub fn quorum(&self) -> usize {
        self.coefficients.len()
    }
}

/// Generate a polynomial with `quorum` coefficients. With a `nonce`, the
/// coefficients are `nonce + j mod q` — deterministic, for tests and
/// reproducible ceremonies; without one they are drawn from the CSPRNG.
pub fn generate_polynomial(
    params: &GroupParams,
    quorum: u32,
    nonce: Option<&ElementModQ>,
) -> ElectionPolynomial {
    let mut coefficients = Vec::with_capacity(quorum as usize);
    let mut commitments = Vec::with_capacity(quorum as usize);
    let mut proofs = Vec::with_capacity(quorum as usize);

    for j in 0..quorum {
        let coefficient = match nonce {
            Some(seed) => params.add_q(&[seed, &ElementModQ::unchecked(u64::from(j))]),
            None => params.rand_q(),
        };
        let commitment = params.g_pow_p(&coefficient);
        let keypair = KeyPair {
            secret_key: coefficient.clone(),
            public_key: commitment.clone(),
        };
        let proof = SchnorrProof::make(params, &keypair, &params.rand_q());

        coefficients.push(coefficient);
        commitments.push(commitment);
        proofs.push(proof);
    }

    ElectionPolynomial {
        coefficients,
        coefficient_commitments: commitments,
        coefficient_proofs: proofs,
    }
}

/// Evaluate the polynomial at an x-coordinate:
/// `value = sum_j coefficient_j * x^j mod q`.
pub fn compute_polynomial_coordinate(
    params: &GroupParams,
    x_coordinate: u32,
    polynomial: &ElectionPolynomial,
) -> ElementModQ {
    let x = BigUint::from(x_coordinate);
    let mut value = ElementModQ::zero();
    for (j, coefficient) in polynomial.coefficients.iter().enumerate() {
        let exponent = params.pow_q(&x, &BigUint::from(j));
        let factor = params.mult_q(&[coefficient, &exponent]);
        value = params.add_q(&[&value, &factor]);
    }
    value
}

/// Publicly verify a claimed polynomial evaluation against the coefficient
/// commitments without learning the coefficients:
/// `G^value == prod_j commitment_j^(x^j) mod p`.
pub fn verify_polynomial_coordinate(
    params: &GroupParams,
    value: &ElementModQ,
    x_coordinate: u32,
    commitments: &[ElementModP],
) -> bool {
    let x = BigUint::from(x_coordinate);
    let mut commitment_output = ElementModP::one();
    for (j, commitment) in commitments.iter().enumerate() {
        let exponent = params.pow_q(&x, &BigUint::from(j));
        let factor = params.pow_p(commitment, &exponent);
        commitment_output = params.mult_p(&[&commitment_output, &factor]);
    }

    params.g_pow_p(value) == commitment_output
}

/// Lagrange basis coefficient at zero for the guardian at `coordinate`,
/// interpolating over the `other_coordinates`:
/// `w_i = prod_l l / prod_l (l - i) mod q`.
pub fn compute_lagrange_coefficient(
    params: &GroupParams,
    coordinate: u32,
    other_coordinates: &[u32],
) -> ElementModQ {
    let others: Vec<ElementModQ> = other_coordinates
        .iter()
        .map(|&l| ElementModQ::unchecked(u64::from(l)))
        .collect();
    let numerator = params.mult_q(&others.iter().collect::<Vec<_>>());

    let me = ElementModQ::unchecked(u64::from(coordinate));
    let differences: Vec<ElementModQ> = others
        .iter()
        .map(|l| params.a_minus_b_q(l, &me))
        .collect();
    let denominator = params.mult_q(&differences.iter().collect::<Vec<_>>());

    params
        .div_q(&numerator, &denominator)
        .expect("distinct x-coordinates have a nonzero denominator")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reconstruct the polynomial's value at zero from evaluations at the
    /// given coordinates.
    fn interpolate_at_zero(
        params: &GroupParams,
        points: &[(u32, ElementModQ)],
    ) -> ElementModQ {
        let mut sum = ElementModQ::zero();
        for (x, y) in points {
            let others: Vec<u32> = points
                .iter()
                .map(|(other, _)| *other)
                .filter(|other| other != x)
                .collect();
            let w = compute_lagrange_coefficient(params, *x, &others);
            let term = params.mult_q(&[y, &w]);
            sum = params.add_q(&[&sum, &term]);
        }
        sum
    }

    #[test]
    fn test_secret_sharing_roundtrip() {
        let params = GroupParams::large_test();
        let polynomial = generate_polynomial(&params, 3, None);
        let secret = polynomial.coefficients[0].clone();

        // Any 3 distinct coordinates out of a larger guardian set must
        // reconstruct the 0th coefficient exactly.
        for coords in [[1u32, 2, 3], [2, 4, 5], [1, 3, 5]] {
            let points: Vec<(u32, ElementModQ)> = coords
                .iter()
                .map(|&x| (x, compute_polynomial_coordinate(&params, x, &polynomial)))
                .collect();
            assert_eq!(interpolate_at_zero(&params, &points), secret);
        }
    }

    #[test]
    fn test_backup_verification() {
        let params = GroupParams::large_test();
        let polynomial = generate_polynomial(&params, 3, None);

        for x in 1..=6u32 {
            let value = compute_polynomial_coordinate(&params, x, &polynomial);
            assert!(verify_polynomial_coordinate(
                &params,
                &value,
                x,
                &polynomial.coefficient_commitments
            ));

            // A mutated value must fail.
            let bad_value = params.add_q(&[&value, &ElementModQ::one()]);
            assert!(!verify_polynomial_coordinate(
                &params,
                &bad_value,
                x,
                &polynomial.coefficient_commitments
            ));

            // As must a mutated commitment.
            let mut bad_commitments = polynomial.coefficient_commitments.clone();
            bad_commitments[1] = params.g_pow_p(&params.rand_q());
            assert!(!verify_polynomial_coordinate(
                &params,
                &value,
                x,
                &bad_commitments
            ));
        }
    }

    #[test]
    fn test_coefficient_proofs_are_valid() {
        let params = GroupParams::large_test();
        let polynomial = generate_polynomial(&params, 3, None);
        assert_eq!(polynomial.quorum(), 3);
        for proof in &polynomial.coefficient_proofs {
            assert!(proof.is_valid(&params));
        }
    }

    #[test]
    fn test_deterministic_generation() {
        let params = GroupParams::large_test();
        let seed = params.rand_q();
        let p1 = generate_polynomial(&params, 3, Some(&seed));
        let p2 = generate_polynomial(&params, 3, Some(&seed));
        assert_eq!(p1.coefficients, p2.coefficients);
        assert_eq!(p1.coefficient_commitments, p2.coefficient_commitments);
    }

    #[test]
    fn test_lagrange_coefficients_sum_on_constant() {
        let params = GroupParams::large_test();
        // For a degree-0 "polynomial" every evaluation is the secret, so
        // the coefficients must sum to 1.
        let coords = [1u32, 3, 7];
        let mut sum = ElementModQ::zero();
        for &x in &coords {
            let others: Vec<u32> = coords.iter().copied().filter(|&o| o != x).collect();
            let w = compute_lagrange_coefficient(&params, x, &others);
            sum = params.add_q(&[&sum, &w]);
        }
        assert_eq!(sum, ElementModQ::one());
    }
}
