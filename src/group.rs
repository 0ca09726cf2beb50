//! Bounded-integer types and modular arithmetic for the election group
//!
//! Every cryptographic value in this crate lives in one of two sets: Z_q,
//! the integers mod a ~256-bit prime `Q`, and Z_p, the integers mod a large
//! prime `P` with `P = Q * R + 1`. The active parameter set is an explicit
//! [`GroupParams`] value threaded through every operation, never process
//! state, so test-sized and production groups can coexist across threads.

use num_bigint::{BigInt, BigUint, RandBigInt, ToBigInt};
use num_traits::{One, Zero};
use rand::thread_rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TallyError};

/// Production parameters: 4096-bit `P`, 256-bit `Q` (2^256 - 189).
const STANDARD_LARGE_PRIME: &str = "1044388881413152506691752710716624382579964249047383780384233483283953907971553643537729993126875883902173634017777416360502926082946377942955704498542097614841825246773580689398386320439747911160897731551074903967243883427132918813748016269754522343505285898816777211761912392772914485521155521641049273446207578961939840619466145806859275053476560973295158703823395710210329314709715239251736552384080845836048778667318931418338422443891025911884723433084701207771901944593286624979917391350564662632723703007964229849154756196890615252286533089643184902706926081744149289517418249153634178342075381874131646013444796894582106870531535803666254579602632453103741452569793905551901541856173251385047414840392753585581909950158046256810542678368121278509960520957624737942914600310646609792665012858397381435755902851312071248102599442308951327039250818892493767423329663783709190716162023529669217300939783171415808233146823000766917789286154006042281423733706462905243774854543127239500245873582012663666430583862778167369547603016344242729592244544608279405999759391099769165589722584216017468464576217318557948461765770700913220460557598574717173408252913596242281190298966500668625620138188265530628036538314433100326660047110143";
const STANDARD_SMALL_PRIME: &str = "115792089237316195423570985008687907853269984665640564039457584007913129639747";
const STANDARD_COFACTOR: &str = "9019518416950528558373478086511232658951474842525520401496114928154304263969655687927867442562559311457926593510757267649063628681241064260953609180947464800958467390949485096429653122916928704841547265126247408167856620024815508684472819746384115369148322548696439327979752948311712506113890045287907335656308945630141969472484100558565879585476547782717283106837945923693806973017510492730838409381014701258202694245760602718602550739205297257940969992371799325870179746191672464736721424617639973324090288952006260483222894269928179970153634220390287255837625331668555933039199194619824375869291271098935000699785346405055160394688637074599519052655517388596327473273906029869030988064607361165803129718773877185415445291671089029845994683414682274353665003204293107284473196033588697845087556526514092678744031772226855409523354476737660407619436531080189837076164818131039104397776628128325247709678431023369197272126578394856752060591013812807437681624251867074769638052097737959472027002770963255207757153746376691827309573603635608169799503216990026029763868313819255248026666854405409059422844776556067163611304891154793770115766608153679099327786";
const STANDARD_GENERATOR: &str = "119359756198641231858139651428439585561105914902686985078252796680474637856752833978884422594516170665312423393830118608408063594508087813277769835084746883589963798527237870817233369094387978405585759195339509768803496494994109693743279157584139079471178850751266233150727771094796709619646350222242437970473900636242584673413224137139139346254912172628651028694427789523683070264102332413084663100402635889283790741342401259356660761075766365672754329863241692760862540151023800163269173550320623249398630247531924855997863109776955214403044727497968354022277828136634059011708099779241302941071701051050378539485717425482151777277387633806111112178267035315726401285294598397677116389893642725498831127977915200359151833767358091365292230363248410124916825814514852703770457024102738694375502049388804979035628232209959549199366986471874840784466132903083308458356458177839111623113116525230200791649979270165318729763550486200224695556789081331596212761936863634467236301450039399776963661755684863012396788149479256016157814129329192490798309248914535389650594573156725696657302152874510063002532052622638033113978672254680147128450265983503193865576932419282003012093526302631221491418211528781074474515924597472841036553107847";

/// The modular arithmetic parameters for one election group.
///
/// `large_prime` is P, `small_prime` is Q, `cofactor` is R with
/// `P = Q * R + 1`, and `generator` is G, a generator of the order-Q
/// subgroup of Z*_p.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupParams {
    large_prime: BigUint,
    small_prime: BigUint,
    cofactor: BigUint,
    generator: BigUint,
}

impl GroupParams {
    pub fn new(
        large_prime: BigUint,
        small_prime: BigUint,
        cofactor: BigUint,
        generator: BigUint,
    ) -> Self {
        GroupParams {
            large_prime,
            small_prime,
            cofactor,
            generator,
        }
    }

    /// The standard production parameter set.
    pub fn standard() -> Self {
        Self::new(
            parse_decimal(STANDARD_LARGE_PRIME),
            parse_decimal(STANDARD_SMALL_PRIME),
            parse_decimal(STANDARD_COFACTOR),
            parse_decimal(STANDARD_GENERATOR),
        )
    }

    /// Test-sized parameters with a 64-bit P. Large enough that random
    /// collisions don't produce false test passes, small enough that
    /// exponentiation is instant.
    pub fn large_test() -> Self {
        Self::new(
            parse_decimal("18446744073704586917"),
            parse_decimal("65521"),
            parse_decimal("281539415968996"),
            parse_decimal("15463152587872997502"),
        )
    }

    pub fn medium_test() -> Self {
        Self::new(
            BigUint::from(65267u32),
            BigUint::from(32633u32),
            BigUint::from(2u32),
            BigUint::from(3u32),
        )
    }

    pub fn small_test() -> Self {
        Self::new(
            BigUint::from(503u32),
            BigUint::from(251u32),
            BigUint::from(2u32),
            BigUint::from(5u32),
        )
    }

    pub fn extra_small_test() -> Self {
        Self::new(
            BigUint::from(157u32),
            BigUint::from(13u32),
            BigUint::from(12u32),
            BigUint::from(16u32),
        )
    }

    pub fn large_prime(&self) -> &BigUint {
        &self.large_prime
    }

    pub fn small_prime(&self) -> &BigUint {
        &self.small_prime
    }

    pub fn cofactor(&self) -> &BigUint {
        &self.cofactor
    }

    pub fn generator(&self) -> &BigUint {
        &self.generator
    }

    /// Given an integer, returns an `ElementModQ` if it is within [0, Q).
    pub fn int_to_q(&self, value: impl Into<BigUint>) -> Result<ElementModQ> {
        let value = value.into();
        if value < self.small_prime {
            Ok(ElementModQ(value))
        } else {
            Err(TallyError::OutOfRange {
                domain: "Z_q",
                value: value.to_string(),
            })
        }
    }

    /// Given an integer, returns an `ElementModP` if it is within [0, P).
    pub fn int_to_p(&self, value: impl Into<BigUint>) -> Result<ElementModP> {
        let value = value.into();
        if value < self.large_prime {
            Ok(ElementModP(value))
        } else {
            Err(TallyError::OutOfRange {
                domain: "Z_p",
                value: value.to_string(),
            })
        }
    }

    /// Sum of zero or more elements, mod Q.
    pub fn add_q(&self, elems: &[&ElementModQ]) -> ElementModQ {
        let mut sum = BigUint::zero();
        for e in elems {
            sum = (sum + &e.0) % &self.small_prime;
        }
        ElementModQ(sum)
    }

    /// Compute `(a - b) mod q`.
    pub fn a_minus_b_q(&self, a: &ElementModQ, b: &ElementModQ) -> ElementModQ {
        let a = &a.0 % &self.small_prime;
        let b = &b.0 % &self.small_prime;
        ElementModQ((a + &self.small_prime - b) % &self.small_prime)
    }

    /// Compute `(Q - a) mod q`.
    pub fn negate_q(&self, a: &ElementModQ) -> ElementModQ {
        let a = &a.0 % &self.small_prime;
        ElementModQ((&self.small_prime - a) % &self.small_prime)
    }

    /// Compute `(a + b * c) mod q`.
    pub fn a_plus_bc_q(&self, a: &ElementModQ, b: &ElementModQ, c: &ElementModQ) -> ElementModQ {
        ElementModQ((&a.0 + &b.0 * &c.0) % &self.small_prime)
    }

    /// Product of zero or more elements, mod P. The empty product is 1.
    pub fn mult_p(&self, elems: &[&ElementModP]) -> ElementModP {
        let mut product = BigUint::one();
        for e in elems {
            product = (product * &e.0) % &self.large_prime;
        }
        ElementModP(product)
    }

    /// Product of zero or more elements, mod Q. The empty product is 1.
    pub fn mult_q(&self, elems: &[&ElementModQ]) -> ElementModQ {
        let mut product = BigUint::one();
        for e in elems {
            product = (product * &e.0) % &self.small_prime;
        }
        ElementModQ(product)
    }

    /// Compute `a / b mod p` by multiplying with the modular inverse of `b`.
    pub fn div_p(&self, a: &ElementModP, b: &ElementModP) -> Result<ElementModP> {
        let inverse = mod_inverse(&b.0, &self.large_prime).ok_or(TallyError::ZeroInverse)?;
        Ok(ElementModP((&a.0 * inverse) % &self.large_prime))
    }

    /// Compute `a / b mod q`.
    pub fn div_q(&self, a: &ElementModQ, b: &ElementModQ) -> Result<ElementModQ> {
        let inverse = mod_inverse(&b.0, &self.small_prime).ok_or(TallyError::ZeroInverse)?;
        Ok(ElementModQ((&a.0 * inverse) % &self.small_prime))
    }

    /// Compute the multiplicative inverse mod p. Zero has no inverse.
    pub fn mult_inv_p(&self, e: &ElementModP) -> Result<ElementModP> {
        mod_inverse(&e.0, &self.large_prime)
            .map(ElementModP)
            .ok_or(TallyError::ZeroInverse)
    }

    /// Compute `base^exp mod p`.
    pub fn pow_p(&self, base: &ElementModP, exp: &ElementModQ) -> ElementModP {
        ElementModP(base.0.modpow(&exp.0, &self.large_prime))
    }

    /// Compute `base^exp mod q`.
    pub fn pow_q(&self, base: &BigUint, exp: &BigUint) -> ElementModQ {
        ElementModQ(base.modpow(exp, &self.small_prime))
    }

    /// Compute `G^exp mod p` for the fixed generator.
    pub fn g_pow_p(&self, exp: &ElementModQ) -> ElementModP {
        ElementModP(self.generator.modpow(&exp.0, &self.large_prime))
    }

    /// Uniform random element of [0, Q) from a cryptographically secure source.
    pub fn rand_q(&self) -> ElementModQ {
        let mut rng = thread_rng();
        ElementModQ(rng.gen_biguint_below(&self.small_prime))
    }

    /// Uniform random element of [start, Q).
    pub fn rand_range_q(&self, start: &ElementModQ) -> ElementModQ {
        let mut rng = thread_rng();
        ElementModQ(rng.gen_biguint_range(&start.0, &self.small_prime))
    }
}

/// An element of Z_q. Immutable; equality and hashing follow the canonical
/// minimal big-endian byte encoding, which is also the proof-hash input.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementModQ(BigUint);

impl ElementModQ {
    /// Wrap a value without a bounds check. Out-of-range elements are only
    /// meaningful as proof intermediates and in tests.
    pub fn unchecked(value: impl Into<BigUint>) -> Self {
        ElementModQ(value.into())
    }

    pub fn zero() -> Self {
        ElementModQ(BigUint::zero())
    }

    pub fn one() -> Self {
        ElementModQ(BigUint::one())
    }

    pub fn as_uint(&self) -> &BigUint {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// The canonical big-endian byte encoding, leading zeros stripped.
    pub fn bytes(&self) -> Vec<u8> {
        self.0.to_bytes_be()
    }

    pub fn base16(&self) -> String {
        format!("{:X}", self.0)
    }

    /// Is the element within [0, Q)?
    pub fn is_in_bounds(&self, params: &GroupParams) -> bool {
        self.0 < *params.small_prime()
    }
}

impl fmt::Debug for ElementModQ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementModQ({})", self.base16())
    }
}

impl fmt::Display for ElementModQ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base16())
    }
}

/// An element of Z_p, with the same canonical-encoding equality contract as
/// [`ElementModQ`].
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementModP(BigUint);

impl ElementModP {
    /// Wrap a value without a bounds check.
    pub fn unchecked(value: impl Into<BigUint>) -> Self {
        ElementModP(value.into())
    }

    pub fn one() -> Self {
        ElementModP(BigUint::one())
    }

    pub fn as_uint(&self) -> &BigUint {
        &self.0
    }

    /// The canonical big-endian byte encoding, leading zeros stripped.
    pub fn bytes(&self) -> Vec<u8> {
        self.0.to_bytes_be()
    }

    pub fn base16(&self) -> String {
        format!("{:X}", self.0)
    }

    /// Is the element within [0, P)?
    pub fn is_in_bounds(&self, params: &GroupParams) -> bool {
        self.0 < *params.large_prime()
    }

    /// Is the element a member of the order-Q subgroup of Z*_p?
    /// `y` qualifies if and only if `1 <= y < P` and `y^Q mod P == 1`.
    pub fn is_valid_residue(&self, params: &GroupParams) -> bool {
        let in_bounds = self.0 >= BigUint::one() && self.0 < *params.large_prime();
        in_bounds
            && self
                .0
                .modpow(params.small_prime(), params.large_prime())
                .is_one()
    }
}

impl fmt::Debug for ElementModP {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.base16();
        if hex.len() > 16 {
            write!(f, "ElementModP({}...{})", &hex[..8], &hex[hex.len() - 8..])
        } else {
            write!(f, "ElementModP({hex})")
        }
    }
}

impl fmt::Display for ElementModP {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base16())
    }
}

fn parse_decimal(digits: &str) -> BigUint {
    BigUint::parse_bytes(digits.as_bytes(), 10).expect("parameter constant is valid decimal")
}

/// Compute the modular inverse using the extended Euclidean algorithm.
/// Returns `None` when `a` and `m` are not coprime (in particular for zero).
pub(crate) fn mod_inverse(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    let a = a.to_bigint().expect("BigUint converts to BigInt");
    let m_int = m.to_bigint().expect("BigUint converts to BigInt");
    let (gcd, x, _) = extended_gcd(&(&a % &m_int), &m_int);

    if !gcd.is_one() {
        return None;
    }

    // Normalize to [0, m) to absorb negative intermediate values.
    let positive = ((x % &m_int) + &m_int) % &m_int;
    positive.to_biguint()
}

fn extended_gcd(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
    if a.is_zero() {
        return (b.clone(), BigInt::zero(), BigInt::one());
    }

    let (gcd, x1, y1) = extended_gcd(&(b % a), a);
    let x = y1 - (b / a) * &x1;
    let y = x1;

    (gcd, x, y)
}
