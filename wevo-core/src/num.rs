//! Exact number kernel.
//!
//! Every quantity that participates in event ordering is either a
//! [`Rational`] or a [`RootOf2`] — a real value `a + b·√c` with
//! rational `a`, `b` and a non-negative rational radicand `c`. All
//! bisector supporting curves are rational circles and lines, so the
//! points the engine constructs stay one radical level deep; that
//! closure property is what makes a single quadratic extension
//! sufficient.
//!
//! Comparisons are exact sign determinations by repeated squaring,
//! including across different radicands. Floating point appears only
//! in [`RootOf2::to_f64`], which feeds rendering and the approximate
//! angular fallback, never ordering.

use num_bigint::BigInt;
use num_integer::Roots;
use num_rational::BigRational;
use num_traits::{Signed, ToPrimitive, Zero};
use std::cmp::Ordering;
use std::fmt;

/// Exact rational scalar used for all input-derived coordinates.
pub type Rational = BigRational;

/// Shorthand for an integer-valued [`Rational`].
pub fn rat(n: i64) -> Rational {
    Rational::from_integer(BigInt::from(n))
}

fn sign_rat(r: &Rational) -> i32 {
    if r.is_zero() {
        0
    } else if r.is_positive() {
        1
    } else {
        -1
    }
}

/// Exact square root of a rational, if it is a perfect square.
fn sqrt_exact(r: &Rational) -> Option<Rational> {
    if r.is_negative() {
        return None;
    }
    let sn = r.numer().sqrt();
    let sd = r.denom().sqrt();
    if &(&sn * &sn) == r.numer() && &(&sd * &sd) == r.denom() {
        Some(Rational::new(sn, sd))
    } else {
        None
    }
}

/// Sign of `a + b·√c` with `c >= 0`.
pub fn sign_abc(a: &Rational, b: &Rational, c: &Rational) -> i32 {
    if b.is_zero() || c.is_zero() {
        return sign_rat(a);
    }
    if a.is_zero() {
        return sign_rat(b);
    }
    let sa = sign_rat(a);
    let sb = sign_rat(b);
    if sa == sb {
        return sa;
    }
    // Differing signs: |a| vs |b·√c| decides, compare a² with b²·c.
    let a2 = a * a;
    let b2c = b * b * c;
    match a2.cmp(&b2c) {
        Ordering::Greater => sa,
        Ordering::Less => sb,
        Ordering::Equal => 0,
    }
}

/// Sign of `a + b1·√c1 + b2·√c2` with `c1, c2 >= 0`.
///
/// This is the workhorse behind cross-radicand comparison and the
/// exact side-of-line predicate for constructed points.
pub fn sign_sum(a: &Rational, b1: &Rational, c1: &Rational, b2: &Rational, c2: &Rational) -> i32 {
    let t1_zero = b1.is_zero() || c1.is_zero();
    let t2_zero = b2.is_zero() || c2.is_zero();

    if t1_zero && t2_zero {
        return sign_rat(a);
    }
    if t2_zero {
        return sign_abc(a, b1, c1);
    }
    if t1_zero {
        return sign_abc(a, b2, c2);
    }
    if c1 == c2 {
        return sign_abc(a, &(b1 + b2), c1);
    }

    // Sign of T = b1√c1 + b2√c2.
    let s1 = sign_rat(b1);
    let s2 = sign_rat(b2);
    let st = if s1 == s2 {
        s1
    } else {
        match (b1 * b1 * c1).cmp(&(b2 * b2 * c2)) {
            Ordering::Greater => s1,
            Ordering::Less => s2,
            Ordering::Equal => 0,
        }
    };

    if a.is_zero() {
        return st;
    }
    let sa = sign_rat(a);
    if st == 0 || sa == st {
        return sa;
    }

    // a and T have opposite signs: compare a² with T², where
    // T² = b1²c1 + b2²c2 + 2·b1·b2·√(c1·c2).
    let lhs = a * a - b1 * b1 * c1 - b2 * b2 * c2;
    let cross = rat(-2) * b1 * b2;
    match sign_abc(&lhs, &cross, &(c1 * c2)) {
        1 => sa,
        -1 => st,
        _ => 0,
    }
}

/// A real algebraic value `a + b·√c` over the rationals.
///
/// The radicand is non-negative; perfect-square radicands collapse to
/// plain rationals on construction, so two values built from the same
/// geometry compare structurally cheaply. Ring operations require
/// compatible radicands (one side rational, or both sides sharing the
/// same `c`) — the kernel never produces anything else, and a mismatch
/// is a fatal invariant violation.
#[derive(Clone, Debug)]
pub struct RootOf2 {
    a: Rational,
    b: Rational,
    c: Rational,
}

impl RootOf2 {
    pub fn new(a: Rational, b: Rational, c: Rational) -> Self {
        assert!(!c.is_negative(), "negative radicand {c}");
        if b.is_zero() || c.is_zero() {
            return Self::from_rational(a);
        }
        if let Some(s) = sqrt_exact(&c) {
            return Self::from_rational(a + b * s);
        }
        Self { a, b, c }
    }

    pub fn from_rational(a: Rational) -> Self {
        Self {
            a,
            b: Rational::zero(),
            c: Rational::zero(),
        }
    }

    pub fn from_int(n: i64) -> Self {
        Self::from_rational(rat(n))
    }

    pub fn zero() -> Self {
        Self::from_int(0)
    }

    pub fn is_rational(&self) -> bool {
        self.b.is_zero()
    }

    /// The `(a, b, c)` decomposition, for predicate routines.
    pub fn parts(&self) -> (&Rational, &Rational, &Rational) {
        (&self.a, &self.b, &self.c)
    }

    pub fn sign(&self) -> i32 {
        sign_abc(&self.a, &self.b, &self.c)
    }

    fn merged_radicand(&self, other: &Self) -> Rational {
        if self.b.is_zero() {
            other.c.clone()
        } else if other.b.is_zero() {
            self.c.clone()
        } else {
            assert!(
                self.c == other.c,
                "mixed radicands {} and {}",
                self.c,
                other.c
            );
            self.c.clone()
        }
    }

    pub fn add(&self, other: &Self) -> Self {
        let c = self.merged_radicand(other);
        Self::new(&self.a + &other.a, &self.b + &other.b, c)
    }

    pub fn sub(&self, other: &Self) -> Self {
        let c = self.merged_radicand(other);
        Self::new(&self.a - &other.a, &self.b - &other.b, c)
    }

    pub fn mul(&self, other: &Self) -> Self {
        let c = self.merged_radicand(other);
        let a = &self.a * &other.a + &self.b * &other.b * &c;
        let b = &self.a * &other.b + &self.b * &other.a;
        Self::new(a, b, c)
    }

    pub fn square(&self) -> Self {
        self.mul(self)
    }

    pub fn scale(&self, r: &Rational) -> Self {
        Self::new(&self.a * r, &self.b * r, self.c.clone())
    }

    pub fn div_rat(&self, r: &Rational) -> Self {
        assert!(!r.is_zero(), "division by zero");
        Self::new(&self.a / r, &self.b / r, self.c.clone())
    }

    pub fn add_rat(&self, r: &Rational) -> Self {
        Self::new(&self.a + r, self.b.clone(), self.c.clone())
    }

    pub fn sub_rat(&self, r: &Rational) -> Self {
        Self::new(&self.a - r, self.b.clone(), self.c.clone())
    }

    pub fn to_f64(&self) -> f64 {
        let a = self.a.to_f64().unwrap_or(f64::NAN);
        if self.b.is_zero() {
            return a;
        }
        let b = self.b.to_f64().unwrap_or(f64::NAN);
        let c = self.c.to_f64().unwrap_or(f64::NAN);
        a + b * c.sqrt()
    }
}

impl PartialEq for RootOf2 {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RootOf2 {}

impl PartialOrd for RootOf2 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RootOf2 {
    fn cmp(&self, other: &Self) -> Ordering {
        let diff = &self.a - &other.a;
        let neg_b2 = -&other.b;
        match sign_sum(&diff, &self.b, &self.c, &neg_b2, &other.c) {
            1 => Ordering::Greater,
            -1 => Ordering::Less,
            _ => Ordering::Equal,
        }
    }
}

impl fmt::Display for RootOf2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(a: i64, b: i64, c: i64) -> RootOf2 {
        RootOf2::new(rat(a), rat(b), rat(c))
    }

    #[test]
    fn perfect_square_radicands_collapse() {
        // 1 + 3·√4 = 7.
        let v = root(1, 3, 4);
        assert!(v.is_rational());
        assert_eq!(v, RootOf2::from_int(7));
    }

    #[test]
    fn same_radicand_comparison() {
        // 1 + √2 < 1 + 2·√2.
        assert!(root(1, 1, 2) < root(1, 2, 2));
        assert_eq!(root(3, -1, 2), root(3, -1, 2));
    }

    #[test]
    fn cross_radicand_comparison() {
        // 1 + √2 ≈ 2.414 < √8 ≈ 2.828.
        assert!(root(1, 1, 2) < root(0, 1, 8));
        // √12 = 2·√3 exactly.
        assert_eq!(root(0, 1, 12), root(0, 2, 3));
        // 5 - √2 ≈ 3.586 > √3 + 1 ≈ 2.732.
        assert!(root(5, -1, 2) > root(1, 1, 3));
    }

    #[test]
    fn sign_of_mixed_terms() {
        // √2 + √3 > 0, -√2 - √3 < 0.
        assert_eq!(sign_sum(&rat(0), &rat(1), &rat(2), &rat(1), &rat(3)), 1);
        assert_eq!(sign_sum(&rat(0), &rat(-1), &rat(2), &rat(-1), &rat(3)), -1);
        // 4 - √2 - √3 > 0 (≈ 0.854), 3 - √2 - √3 < 0 (≈ -0.146).
        assert_eq!(sign_sum(&rat(4), &rat(-1), &rat(2), &rat(-1), &rat(3)), 1);
        assert_eq!(sign_sum(&rat(3), &rat(-1), &rat(2), &rat(-1), &rat(3)), -1);
        // √2 - √2 = 0 via equal radicands.
        assert_eq!(sign_sum(&rat(0), &rat(1), &rat(2), &rat(-1), &rat(2)), 0);
    }

    #[test]
    fn ring_operations_stay_in_field() {
        // (1 + √2)² = 3 + 2√2.
        assert_eq!(root(1, 1, 2).square(), root(3, 2, 2));
        // (1 + √2)(1 - √2) = -1.
        assert_eq!(root(1, 1, 2).mul(&root(1, -1, 2)), RootOf2::from_int(-1));
        // Rational operands merge with any radicand.
        assert_eq!(RootOf2::from_int(2).add(&root(1, 1, 5)), root(3, 1, 5));
    }

    #[test]
    #[should_panic(expected = "mixed radicands")]
    fn mixing_radicands_is_fatal() {
        let _ = root(0, 1, 2).add(&root(0, 1, 3));
    }

    #[test]
    fn approximation_matches() {
        let v = root(1, 2, 2);
        assert!((v.to_f64() - (1.0 + 2.0 * 2.0_f64.sqrt())).abs() < 1e-12);
    }
}
