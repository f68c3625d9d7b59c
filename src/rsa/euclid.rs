use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};
use num::Integer;

/// `a * x + b * y == gcd`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bezout {
    pub x: BigInt,
    pub y: BigInt,
    pub gcd: BigInt,
}

pub fn solve(a: &BigInt, b: &BigInt) -> Bezout {
    if b.is_zero() {
        return Bezout { x: One::one(), y: Zero::zero(), gcd: a.clone() };
    }
    let (mut a, mut b) = (a.clone(), b.clone());
    let (mut x2, mut x1): (BigInt, BigInt) = (One::one(), Zero::zero());
    let (mut y2, mut y1): (BigInt, BigInt) = (Zero::zero(), One::one());
    while b.is_positive() {
        let (q, r) = a.div_rem(&b);
        let x = &x2 - &q * &x1;
        let y = &y2 - &q * &y1;
        a = b;
        b = r;
        x2 = x1;
        x1 = x;
        y2 = y1;
        y1 = y;
    }
    Bezout { x: x2, y: y2, gcd: a }
}

/// First Bézout coefficient of `(a, n)`, not reduced mod `n`.
pub fn modular_inverse(a: &BigInt, n: &BigInt) -> BigInt {
    solve(a, n).x
}

#[cfg(test)]
mod tests {
    use num::Integer;
    use num_bigint::BigInt;
    use num_traits::One;
    use crate::rsa::euclid::{modular_inverse, solve};

    #[test]
    fn test_bezout_identity() {
        for (a, b) in [(240, 46), (46, 240), (17, 0), (7, 160), (1_000_003, 65_537)] {
            let (a, b) = (BigInt::from(a), BigInt::from(b));
            let r = solve(&a, &b);
            assert_eq!(&a * &r.x + &b * &r.y, r.gcd);
            assert_eq!(r.gcd, a.gcd(&b));
        }
    }

    #[test]
    fn test_mod_inverse() {
        // (17 - 1) * (11 - 1), e = 7
        let (e, f) = (BigInt::from(7), BigInt::from(160));
        let d = modular_inverse(&e, &f);
        assert!((&e * &d).mod_floor(&f).is_one());
        let (a, n) = (BigInt::from(65_537), BigInt::from(3_120_000_017u64));
        let x = modular_inverse(&a, &n);
        assert!((&a * &x).mod_floor(&n).is_one());
    }

    #[test]
    fn test_raw_coefficient_may_be_negative() {
        // 3 * (-1) + 4 * 1 == 1
        let x = modular_inverse(&BigInt::from(3), &BigInt::from(4));
        assert_eq!(x, BigInt::from(-1));
        assert!((BigInt::from(3) * &x).mod_floor(&BigInt::from(4)).is_one());
    }
}
