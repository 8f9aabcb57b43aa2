//! Tests for the int / long / float numeric tower.
//!
//! These exercise promotion on overflow, floor division semantics, shift and
//! power edge cases, and cross-type hashing and comparison.

use num_bigint::BigInt;
use pyrt::{ExcType, Value};

fn repr(v: &Value) -> String {
    pyrt::repr(v).unwrap()
}

/// Overflowing `+`, `-` and `*` are recomputed exactly and produce a `long`.
#[test]
fn overflow_promotes_to_long() {
    let sum = pyrt::add(&Value::int(i64::MAX), &Value::int(1)).unwrap();
    assert_eq!(sum.type_name(), "long");
    assert_eq!(sum.as_long(), Some(&(BigInt::from(i64::MAX) + 1)));

    let difference = pyrt::sub(&Value::int(i64::MIN), &Value::int(1)).unwrap();
    assert_eq!(difference.type_name(), "long");
    assert_eq!(difference.as_long(), Some(&(BigInt::from(i64::MIN) - 1)));

    let product = pyrt::mul(&Value::int(i64::MAX), &Value::int(2)).unwrap();
    assert_eq!(product.as_long(), Some(&(BigInt::from(i64::MAX) * 2)));

    let fits = pyrt::add(&Value::int(40), &Value::int(2)).unwrap();
    assert_eq!(fits.type_name(), "int");
    assert_eq!(fits.as_int(), Some(42));
}

/// Negating or taking the absolute value of `i64::MIN` promotes as well.
#[test]
fn unary_overflow_promotes() {
    let negated = pyrt::neg(&Value::int(i64::MIN)).unwrap();
    assert_eq!(negated.as_long(), Some(&-BigInt::from(i64::MIN)));
    let absolute = pyrt::abs(&Value::int(i64::MIN)).unwrap();
    assert_eq!(absolute.as_long(), Some(&-BigInt::from(i64::MIN)));
    assert_eq!(pyrt::invert(&Value::int(5)).unwrap().as_int(), Some(-6));
}

/// A `long` result stays a `long` even when it would fit in a machine integer.
#[test]
fn longs_do_not_demote() {
    let diff = pyrt::sub(&Value::long(5), &Value::long(3)).unwrap();
    assert_eq!(diff.type_name(), "long");
    assert_eq!(repr(&diff), "2L");
    let mixed = pyrt::add(&Value::int(1), &Value::long(1)).unwrap();
    assert_eq!(repr(&mixed), "2L");
}

/// Division and modulo round toward negative infinity, and `divmod` agrees
/// with the separate operators.
#[test]
fn floor_division_invariant() {
    assert_eq!(pyrt::modulo(&Value::int(-7), &Value::int(3)).unwrap().as_int(), Some(2));
    assert_eq!(pyrt::floor_div(&Value::int(-7), &Value::int(3)).unwrap().as_int(), Some(-3));
    assert_eq!(pyrt::div(&Value::int(-7), &Value::int(3)).unwrap().as_int(), Some(-3));

    for a in -12..=12 {
        for b in [-5, -3, -1, 1, 2, 7] {
            let (va, vb) = (Value::int(a), Value::int(b));
            let q = pyrt::floor_div(&va, &vb).unwrap().as_int().unwrap();
            let r = pyrt::modulo(&va, &vb).unwrap().as_int().unwrap();
            assert_eq!(a, q * b + r, "{a} // {b}");
            if r != 0 {
                assert_eq!(r.signum(), b.signum(), "{a} % {b}");
            }
            let pair = pyrt::div_mod(&va, &vb).unwrap();
            let pair = pair.as_tuple().unwrap();
            assert_eq!(pair[0].as_int(), Some(q));
            assert_eq!(pair[1].as_int(), Some(r));
        }
    }
}

fn exact(v: &Value) -> BigInt {
    match (v.as_int(), v.as_long()) {
        (Some(i), _) => BigInt::from(i),
        (None, Some(l)) => l.clone(),
        _ => panic!("not an integer: {v:?}"),
    }
}

/// The floor identity holds across the integer tower: operands at the
/// machine limits, longs, and ints mixed with longs.
#[test]
fn floor_division_invariant_wide_integers() {
    let big: BigInt = BigInt::from(i64::MAX) * 3 + 1;
    let operands = [
        Value::int(i64::MAX),
        Value::int(i64::MIN),
        Value::int(i64::MIN + 1),
        Value::int(-7),
        Value::int(1),
        Value::long(big.clone()),
        Value::long(-big),
        Value::long(-3),
    ];
    for a in &operands {
        for b in &operands {
            let (x, y) = (exact(a), exact(b));
            let q = exact(&pyrt::floor_div(a, b).unwrap());
            let r = exact(&pyrt::modulo(a, b).unwrap());
            assert_eq!(x, &q * &y + &r, "{a:?} // {b:?}");
            if r != BigInt::from(0) {
                assert_eq!(r.sign(), y.sign(), "{a:?} % {b:?}");
            }
            let pair = pyrt::div_mod(a, b).unwrap();
            let pair = pair.as_tuple().unwrap();
            assert_eq!(exact(&pair[0]), q);
            assert_eq!(exact(&pair[1]), r);
        }
    }
}

/// Float floor division and modulo: the remainder takes the divisor's sign
/// and the quotient is integral, with float or int on either side.
#[test]
fn floor_division_invariant_floats() {
    let operands = [
        Value::float(7.5),
        Value::float(-7.5),
        Value::float(0.25),
        Value::float(-2.0),
        Value::float(1e10),
        Value::int(-3),
        Value::int(4),
    ];
    let as_f64 = |v: &Value| v.as_float().or_else(|| v.as_int().map(|i| i as f64)).unwrap();
    for a in &operands {
        for b in &operands {
            if a.as_float().is_none() && b.as_float().is_none() {
                continue;
            }
            let (x, y) = (as_f64(a), as_f64(b));
            let q = pyrt::floor_div(a, b).unwrap().as_float().unwrap();
            let r = pyrt::modulo(a, b).unwrap().as_float().unwrap();
            assert_eq!(q, q.floor(), "{a:?} // {b:?}");
            assert!((q * y + r - x).abs() <= 1e-9 * x.abs().max(1.0), "{a:?} // {b:?}");
            if r != 0.0 {
                assert_eq!(r.is_sign_negative(), y.is_sign_negative(), "{a:?} % {b:?}");
                assert!(r.abs() < y.abs());
            }
            let pair = pyrt::div_mod(a, b).unwrap();
            let pair = pair.as_tuple().unwrap();
            assert_eq!(pair[0].as_float(), Some(q));
            assert_eq!(pair[1].as_float(), Some(r));
        }
    }
}

/// `i64::MIN // -1` is the one overflowing quotient.
#[test]
fn min_floor_div_minus_one() {
    let q = pyrt::floor_div(&Value::int(i64::MIN), &Value::int(-1)).unwrap();
    assert_eq!(q.as_long(), Some(&-BigInt::from(i64::MIN)));
    let r = pyrt::modulo(&Value::int(i64::MIN), &Value::int(-1)).unwrap();
    assert_eq!(r.as_int(), Some(0));
}

/// Every division flavor reports division by zero with its own message.
#[test]
fn division_by_zero_messages() {
    let cases = [
        (Value::int(1), Value::int(0), "integer division or modulo by zero"),
        (Value::long(1), Value::long(0), "long division or modulo by zero"),
        (Value::float(1.0), Value::int(0), "float division by zero"),
        (Value::int(1), Value::float(0.0), "float division by zero"),
        (Value::complex(1.0, 1.0), Value::complex(0.0, 0.0), "complex division by zero"),
    ];
    for (a, b, message) in cases {
        let err = pyrt::div(&a, &b).unwrap_err();
        assert!(err.is_exception_type(ExcType::ZeroDivisionError));
        assert!(err.is_exception_type(ExcType::ArithmeticError));
        assert_eq!(err.message(), message);
    }
    let err = pyrt::modulo(&Value::float(1.0), &Value::float(0.0)).unwrap_err();
    assert_eq!(err.message(), "float modulo");
}

/// Shifts reject negative counts and promote when bits would be lost.
#[test]
fn shifts() {
    let err = pyrt::lshift(&Value::int(1), &Value::int(-1)).unwrap_err();
    assert_eq!(err.to_string(), "ValueError: negative shift count");
    let err = pyrt::rshift(&Value::int(1), &Value::int(-1)).unwrap_err();
    assert_eq!(err.exc_type(), Some(ExcType::ValueError));

    assert_eq!(pyrt::lshift(&Value::int(1), &Value::int(62)).unwrap().as_int(), Some(1 << 62));
    let wide = pyrt::lshift(&Value::int(1), &Value::int(64)).unwrap();
    assert_eq!(wide.as_long(), Some(&(BigInt::from(1) << 64)));

    assert_eq!(pyrt::rshift(&Value::int(-1), &Value::int(100)).unwrap().as_int(), Some(-1));
    assert_eq!(pyrt::rshift(&Value::int(1024), &Value::int(100)).unwrap().as_int(), Some(0));
}

/// Negative integer exponents give floats; large ones promote.
#[test]
fn integer_powers() {
    let half = pyrt::pow(&Value::int(2), &Value::int(-1)).unwrap();
    assert_eq!(half.as_float(), Some(0.5));
    let big = pyrt::pow(&Value::int(2), &Value::int(64)).unwrap();
    assert_eq!(big.as_long(), Some(&BigInt::from(2).pow(64)));
    assert_eq!(pyrt::pow(&Value::int(3), &Value::int(4)).unwrap().as_int(), Some(81));

    let err = pyrt::pow(&Value::int(0), &Value::int(-1)).unwrap_err();
    assert_eq!(err.exc_type(), Some(ExcType::ZeroDivisionError));
}

/// Mixed int/float arithmetic is true float arithmetic.
#[test]
fn float_arithmetic() {
    let v = pyrt::div(&Value::float(7.0), &Value::int(2)).unwrap();
    assert_eq!(v.as_float(), Some(3.5));
    let v = pyrt::modulo(&Value::float(-7.5), &Value::int(2)).unwrap();
    assert_eq!(v.as_float(), Some(0.5));
    let v = pyrt::add(&Value::int(1), &Value::float(0.5)).unwrap();
    assert_eq!(v.type_name(), "float");
    assert_eq!(repr(&v), "1.5");
}

/// Equal numbers hash equally across the whole tower.
#[test]
fn cross_type_hash_consistency() {
    let one = [Value::int(1), Value::bool(true), Value::long(1), Value::float(1.0), Value::complex(1.0, 0.0)];
    let hashes: Vec<i64> = one.iter().map(|v| pyrt::hash(v).unwrap()).collect();
    assert!(hashes.iter().all(|&h| h == hashes[0]), "{hashes:?}");
    assert_eq!(pyrt::hash(&Value::int(-1)).unwrap(), -2);
}

/// Integer/float comparison is exact, even beyond 2**53.
#[test]
fn exact_int_float_comparison() {
    let above = Value::int((1 << 53) + 1);
    let float = Value::float(9_007_199_254_740_992.0);
    assert!(pyrt::compare_bool(pyrt::CompareOp::Gt, &above, &float).unwrap());
    assert!(!pyrt::is_equal(&above, &float).unwrap());
    assert!(pyrt::is_equal(&Value::int(3), &Value::float(3.0)).unwrap());
    assert!(pyrt::is_equal(&Value::long(3), &Value::int(3)).unwrap());
    let nan = Value::float(f64::NAN);
    assert!(!pyrt::is_equal(&nan, &Value::int(0)).unwrap());
    assert!(pyrt::compare_bool(pyrt::CompareOp::Ne, &nan, &nan).unwrap());
}

/// `True & True` stays a bool; `True + True` is an int.
#[test]
fn bool_is_an_int() {
    let t = Value::bool(true);
    assert_eq!(repr(&pyrt::and(&t, &t).unwrap()), "True");
    let sum = pyrt::add(&t, &t).unwrap();
    assert_eq!(sum.type_name(), "int");
    assert_eq!(sum.as_int(), Some(2));
}
