//! The IEEE-754 `float` type.
//!
//! Float slots accept `int`, `long` and `float` operands on either side. A
//! `long` too large for a double fails with OverflowError rather than becoming
//! infinity. Comparisons against integers are exact: no conversion of the
//! integer to `f64` takes place.

use std::{
    cmp::Ordering,
    sync::{Arc, LazyLock},
};

use num_bigint::BigInt;
use num_traits::FromPrimitive;

use super::{
    Slots, Type, TypeRef,
    base::object_type,
    long_int::bigint_to_f64,
    r#type::{binary, reflected, unary},
};
use crate::{
    dispatch::compare::{Comparison, install_ordering},
    exception_private::{ExcType, RunResult},
    object::Object,
    py_hash::hash_float,
    value::{Payload, Value},
};

/// Returns a string representation of a float matching CPython's `repr()` behavior.
///
/// Uses the `ryu` crate for the shortest round-tripping digits, then lays them
/// out the way CPython does:
/// - Special values: `inf`, `-inf`, `nan` (lowercase)
/// - Always includes a decimal point or an exponent
/// - Scientific notation when the decimal exponent is below -4 or above 16,
///   with a signed exponent of at least two digits (`1e+16`, `1e-05`)
pub(crate) fn float_repr(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_owned();
    }
    if f.is_infinite() {
        return if f.is_sign_negative() { "-inf" } else { "inf" }.to_owned();
    }
    let mut buffer = ryu::Buffer::new();
    let (digits, decpt) = decimal_digits(buffer.format_finite(f));
    let sign = if f.is_sign_negative() { "-" } else { "" };
    format!("{sign}{}", layout_digits(&digits, decpt))
}

/// Splits ryu output into significant digits and the decimal point position,
/// so that the value is `0.DIGITS * 10**decpt`.
fn decimal_digits(s: &str) -> (String, i32) {
    let s = s.trim_start_matches('-');
    let (mantissa, exp) = match s.split_once('e') {
        Some((mantissa, exp)) => (mantissa, exp.parse::<i32>().unwrap_or(0)),
        None => (s, 0),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let all: String = int_part.chars().chain(frac_part.chars()).collect();
    let trimmed = all.trim_start_matches('0');
    let leading_zeros = all.len() - trimmed.len();
    let digits = trimmed.trim_end_matches('0');
    if digits.is_empty() {
        return ("0".to_owned(), 1);
    }
    let int_len = i32::try_from(int_part.len()).unwrap_or(i32::MAX);
    let leading = i32::try_from(leading_zeros).unwrap_or(i32::MAX);
    (digits.to_owned(), int_len + exp - leading)
}

fn layout_digits(digits: &str, decpt: i32) -> String {
    let n = i32::try_from(digits.len()).unwrap_or(i32::MAX);
    if decpt <= -4 || decpt > 16 {
        let (first, rest) = digits.split_at(1);
        let exp = decpt - 1;
        let exp_sign = if exp < 0 { '-' } else { '+' };
        let dot = if rest.is_empty() { "" } else { "." };
        return format!("{first}{dot}{rest}e{exp_sign}{:02}", exp.unsigned_abs());
    }
    if decpt <= 0 {
        let zeros = "0".repeat(decpt.unsigned_abs() as usize);
        return format!("0.{zeros}{digits}");
    }
    if decpt >= n {
        let zeros = "0".repeat((decpt - n).unsigned_abs() as usize);
        return format!("{digits}{zeros}.0");
    }
    let (int_part, frac_part) = digits.split_at(decpt.unsigned_abs() as usize);
    format!("{int_part}.{frac_part}")
}

/// Converts a numeric operand to f64: `Ok(None)` for non-numeric or complex values.
pub(crate) fn coerce_f64(v: &Value) -> RunResult<Option<f64>> {
    match v.payload() {
        Payload::Float(f) => Ok(Some(*f)),
        Payload::Int(i) => Ok(Some(*i as f64)),
        Payload::Long(l) => bigint_to_f64(l.inner()).map(Some),
        _ => Ok(None),
    }
}

fn floats(a: &Value, b: &Value) -> RunResult<Option<(f64, f64)>> {
    match (coerce_f64(a)?, coerce_f64(b)?) {
        (Some(x), Some(y)) => Ok(Some((x, y))),
        _ => Ok(None),
    }
}

/// Applies an infallible float operation, declining non-numeric operands.
macro_rules! float_binary {
    ($name:ident, |$x:ident, $y:ident| $body:expr) => {
        fn $name(a: &Value, b: &Value) -> RunResult<Value> {
            match floats(a, b)? {
                Some(($x, $y)) => $body,
                None => Ok(Value::not_implemented()),
            }
        }
    };
}

float_binary!(float_add, |x, y| Ok(Value::float(x + y)));
float_binary!(float_sub, |x, y| Ok(Value::float(x - y)));
float_binary!(float_mul, |x, y| Ok(Value::float(x * y)));
float_binary!(float_div, |x, y| {
    if y == 0.0 {
        return Err(ExcType::zero_division("float division by zero"));
    }
    Ok(Value::float(x / y))
});
float_binary!(float_mod, |x, y| {
    if y == 0.0 {
        return Err(ExcType::zero_division("float modulo"));
    }
    Ok(Value::float(py_float_mod(x, y)))
});
float_binary!(float_floor_div, |x, y| {
    if y == 0.0 {
        return Err(ExcType::zero_division("float divmod()"));
    }
    Ok(Value::float(float_divmod(x, y).0))
});
float_binary!(float_div_mod, |x, y| {
    if y == 0.0 {
        return Err(ExcType::zero_division("float divmod()"));
    }
    let (q, r) = float_divmod(x, y);
    Ok(Value::tuple(vec![Value::float(q), Value::float(r)]))
});
float_binary!(float_pow_slot, |x, y| Ok(Value::float(float_pow(x, y)?)));

/// Remainder with the sign of the divisor. `y` must be non-zero.
pub(crate) fn py_float_mod(x: f64, y: f64) -> f64 {
    let m = x % y;
    if m == 0.0 {
        0.0_f64.copysign(y)
    } else if (y < 0.0) != (m < 0.0) {
        m + y
    } else {
        m
    }
}

/// Floor quotient and remainder, rounding the quotient to the nearest integer
/// to absorb error in `x - m`. `y` must be non-zero.
pub(crate) fn float_divmod(x: f64, y: f64) -> (f64, f64) {
    let mut m = x % y;
    let mut div = (x - m) / y;
    if m == 0.0 {
        m = 0.0_f64.copysign(y);
    } else if (y < 0.0) != (m < 0.0) {
        m += y;
        div -= 1.0;
    }
    let floor_div = if div == 0.0 {
        0.0_f64.copysign(x / y)
    } else {
        let floored = div.floor();
        if div - floored > 0.5 { floored + 1.0 } else { floored }
    };
    (floor_div, m)
}

/// `x ** y` with Python's error reporting.
///
/// Zero to a negative power is a ZeroDivisionError, a negative base with a
/// fractional exponent a ValueError, and a finite pair whose result overflows
/// an OverflowError.
pub(crate) fn float_pow(x: f64, y: f64) -> RunResult<f64> {
    if y == 0.0 {
        return Ok(1.0);
    }
    if x == 0.0 && y < 0.0 {
        return Err(ExcType::zero_negative_power());
    }
    if x.is_finite() && x < 0.0 && y.is_finite() && y.fract() != 0.0 {
        return Err(ExcType::value_error_negative_fractional_power());
    }
    let result = x.powf(y);
    if result.is_infinite() && x.is_finite() && y.is_finite() {
        return Err(ExcType::overflow_error("(34, 'Numerical result out of range')"));
    }
    Ok(result)
}

/// Exact ordering of a float against an arbitrary-precision integer.
///
/// Returns `None` for NaN.
pub(crate) fn compare_float_to_int(f: f64, n: &BigInt) -> Option<Ordering> {
    if f.is_nan() {
        return None;
    }
    if f.is_infinite() {
        return Some(if f > 0.0 { Ordering::Greater } else { Ordering::Less });
    }
    let truncated = f.trunc();
    let whole = BigInt::from_f64(truncated)?;
    match whole.cmp(n) {
        Ordering::Equal => (f - truncated).partial_cmp(&0.0),
        unequal => Some(unequal),
    }
}

fn float_compare(a: &Value, b: &Value) -> RunResult<Comparison> {
    let Some(x) = a.as_float() else {
        return Ok(Comparison::NotImplemented);
    };
    let ordering = match b.payload() {
        Payload::Float(y) => x.partial_cmp(y),
        Payload::Int(i) => compare_float_to_int(x, &BigInt::from(*i)),
        Payload::Long(l) => compare_float_to_int(x, l.inner()),
        _ => return Ok(Comparison::NotImplemented),
    };
    Ok(ordering.map_or(Comparison::Unordered, Comparison::Ordered))
}

fn float_unary(v: &Value, f: fn(f64) -> f64) -> RunResult<Value> {
    Ok(v.as_float().map_or_else(Value::not_implemented, |x| Value::float(f(x))))
}

/// The builtin `float` type.
pub fn float_type() -> &'static TypeRef {
    static TYPE: LazyLock<TypeRef> = LazyLock::new(|| {
        let mut slots = Slots {
            add: binary(float_add),
            radd: reflected(float_add),
            sub: binary(float_sub),
            rsub: reflected(float_sub),
            mul: binary(float_mul),
            rmul: reflected(float_mul),
            div: binary(float_div),
            rdiv: reflected(float_div),
            floor_div: binary(float_floor_div),
            rfloor_div: reflected(float_floor_div),
            modulo: binary(float_mod),
            rmodulo: reflected(float_mod),
            div_mod: binary(float_div_mod),
            rdiv_mod: reflected(float_div_mod),
            pow: binary(float_pow_slot),
            rpow: reflected(float_pow_slot),
            neg: unary(|v| float_unary(v, |x| -x)),
            pos: unary(|v| float_unary(v, |x| x)),
            abs: unary(|v| float_unary(v, f64::abs)),
            hash: Some(Arc::new(|v: &Value| Ok(v.as_float().map_or(0, hash_float)))),
            repr: Some(Arc::new(|v: &Value| Ok(float_repr(v.as_float().unwrap_or_default())))),
            nonzero: Some(Arc::new(|v: &Value| Ok(v.as_float().is_some_and(|x| x != 0.0)))),
            native: Some(Arc::new(|v: &Value| Ok(Object::Float(v.as_float().unwrap_or_default())))),
            ..Slots::default()
        };
        install_ordering(&mut slots, float_compare);
        Type::builtin("float", vec![object_type().clone()], slots)
    });
    &TYPE
}
