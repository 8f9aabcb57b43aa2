//! LongInt wrapper for arbitrary precision integer support.
//!
//! This module provides the `LongInt` wrapper type around `num_bigint::BigInt`
//! and the `long` type built on it. Named `LongInt` to avoid confusion with the
//! external `BigInt` type. Machine-width `int` arithmetic that overflows is
//! recomputed here and produces a `long`; a `long` never demotes back to `int`,
//! even when its value would fit.

use std::{
    borrow::Cow,
    fmt::{self, Display},
    sync::{Arc, LazyLock},
};

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};

use super::{
    Slots, Type, TypeRef,
    base::object_type,
    float::float_pow,
    r#type::{binary, reflected, unary},
};
use crate::{
    dispatch::compare::{Comparison, install_ordering},
    exception_private::{ExcType, RunResult},
    object::Object,
    py_hash::hash_bigint,
    resource::ResourceLimits,
    value::{Payload, Value},
};

/// Wrapper around `num_bigint::BigInt` for arbitrary precision integers.
///
/// The inner `BigInt` is accessible via `.0` for arithmetic operations that
/// need direct access to the underlying type.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct LongInt(pub BigInt);

impl LongInt {
    #[must_use]
    pub fn new(bi: BigInt) -> Self {
        Self(bi)
    }

    /// Converts to a `long` value. Never demotes to `int`.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::long(self.0)
    }

    /// CPython-compatible hash, consistent with `int` and `float` hashing.
    #[must_use]
    pub fn hash(&self) -> i64 {
        hash_bigint(&self.0)
    }

    /// Returns a reference to the inner `BigInt`.
    #[must_use]
    pub fn inner(&self) -> &BigInt {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    #[must_use]
    pub fn to_i64(&self) -> Option<i64> {
        self.0.to_i64()
    }

    /// Converts to f64, failing with OverflowError when out of range.
    pub fn to_f64(&self) -> RunResult<f64> {
        bigint_to_f64(&self.0)
    }

    /// Number of significant bits; zero has 0 bits.
    #[must_use]
    pub fn bits(&self) -> u64 {
        self.0.bits()
    }
}

impl From<BigInt> for LongInt {
    fn from(bi: BigInt) -> Self {
        Self(bi)
    }
}

impl From<i64> for LongInt {
    fn from(i: i64) -> Self {
        Self(BigInt::from(i))
    }
}

impl Display for LongInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Converts a `BigInt` to f64, failing with OverflowError when out of range.
pub(crate) fn bigint_to_f64(bi: &BigInt) -> RunResult<f64> {
    match bi.to_f64() {
        Some(f) if f.is_finite() => Ok(f),
        _ => Err(ExcType::overflow_long_to_float()),
    }
}

/// Computes `base ** exp`, refusing results over the installed bit limit.
pub(crate) fn pow_bigint(base: &BigInt, exp: u64) -> RunResult<BigInt> {
    // trivial bases stay small for any exponent
    if base.is_zero() {
        return Ok(if exp == 0 { BigInt::one() } else { BigInt::zero() });
    }
    if base.is_one() {
        return Ok(BigInt::one());
    }
    if *base == BigInt::from(-1) {
        return Ok(if exp.is_even() { BigInt::one() } else { base.clone() });
    }
    let estimated_bits = base.bits().saturating_mul(exp);
    ResourceLimits::current().check_long_bits(estimated_bits)?;
    let exp = u32::try_from(exp).map_err(|_| ExcType::memory_error("exponent too large"))?;
    Ok(base.pow(exp))
}

/// Computes `value << shift`, refusing results over the installed bit limit.
pub(crate) fn shl_bigint(value: &BigInt, shift: u64) -> RunResult<BigInt> {
    if value.is_zero() {
        return Ok(BigInt::zero());
    }
    ResourceLimits::current().check_long_bits(value.bits().saturating_add(shift))?;
    let shift = usize::try_from(shift).map_err(|_| ExcType::memory_error("shift count too large"))?;
    Ok(value << shift)
}

/// Computes `value >> shift` with floor semantics.
pub(crate) fn shr_bigint(value: &BigInt, shift: &BigInt) -> BigInt {
    match shift.to_usize() {
        Some(shift) => value >> shift,
        None if value.is_negative() => BigInt::from(-1),
        None => BigInt::zero(),
    }
}

/// Both operands as big integers, if both are `int` or `long`.
fn bigints<'a>(a: &'a Value, b: &'a Value) -> Option<(Cow<'a, BigInt>, Cow<'a, BigInt>)> {
    Some((as_bigint(a)?, as_bigint(b)?))
}

pub(crate) fn as_bigint(v: &Value) -> Option<Cow<'_, BigInt>> {
    match v.payload() {
        Payload::Int(i) => Some(Cow::Owned(BigInt::from(*i))),
        Payload::Long(l) => Some(Cow::Borrowed(l.inner())),
        _ => None,
    }
}

fn zero_division() -> crate::exception_private::RunError {
    ExcType::zero_division("long division or modulo by zero")
}

fn long_add(a: &Value, b: &Value) -> RunResult<Value> {
    let Some((x, y)) = bigints(a, b) else {
        return Ok(Value::not_implemented());
    };
    Ok(Value::long(&*x + &*y))
}

fn long_sub(a: &Value, b: &Value) -> RunResult<Value> {
    let Some((x, y)) = bigints(a, b) else {
        return Ok(Value::not_implemented());
    };
    Ok(Value::long(&*x - &*y))
}

fn long_mul(a: &Value, b: &Value) -> RunResult<Value> {
    let Some((x, y)) = bigints(a, b) else {
        return Ok(Value::not_implemented());
    };
    ResourceLimits::current().check_long_bits(x.bits().saturating_add(y.bits()))?;
    Ok(Value::long(&*x * &*y))
}

fn long_floor_div(a: &Value, b: &Value) -> RunResult<Value> {
    let Some((x, y)) = bigints(a, b) else {
        return Ok(Value::not_implemented());
    };
    if y.is_zero() {
        return Err(zero_division());
    }
    Ok(Value::long(x.div_floor(&y)))
}

fn long_mod(a: &Value, b: &Value) -> RunResult<Value> {
    let Some((x, y)) = bigints(a, b) else {
        return Ok(Value::not_implemented());
    };
    if y.is_zero() {
        return Err(zero_division());
    }
    Ok(Value::long(x.mod_floor(&y)))
}

fn long_div_mod(a: &Value, b: &Value) -> RunResult<Value> {
    let Some((x, y)) = bigints(a, b) else {
        return Ok(Value::not_implemented());
    };
    if y.is_zero() {
        return Err(zero_division());
    }
    let (q, r) = x.div_mod_floor(&y);
    Ok(Value::tuple(vec![Value::long(q), Value::long(r)]))
}

fn long_pow(a: &Value, b: &Value) -> RunResult<Value> {
    let Some((x, y)) = bigints(a, b) else {
        return Ok(Value::not_implemented());
    };
    if y.is_negative() {
        if x.is_zero() {
            return Err(ExcType::zero_negative_power());
        }
        return Ok(Value::float(float_pow(bigint_to_f64(&x)?, bigint_to_f64(&y)?)?));
    }
    let result = match y.to_u64() {
        Some(exp) => pow_bigint(&x, exp)?,
        // only trivial bases survive an exponent this large
        None => pow_bigint(&x, u64::MAX)?,
    };
    Ok(Value::long(result))
}

fn long_lshift(a: &Value, b: &Value) -> RunResult<Value> {
    let Some((x, y)) = bigints(a, b) else {
        return Ok(Value::not_implemented());
    };
    if y.is_negative() {
        return Err(ExcType::value_error_negative_shift_count());
    }
    let shift = y.to_u64().unwrap_or(u64::MAX);
    Ok(Value::long(shl_bigint(&x, shift)?))
}

fn long_rshift(a: &Value, b: &Value) -> RunResult<Value> {
    let Some((x, y)) = bigints(a, b) else {
        return Ok(Value::not_implemented());
    };
    if y.is_negative() {
        return Err(ExcType::value_error_negative_shift_count());
    }
    Ok(Value::long(shr_bigint(&x, &y)))
}

fn long_and(a: &Value, b: &Value) -> RunResult<Value> {
    let Some((x, y)) = bigints(a, b) else {
        return Ok(Value::not_implemented());
    };
    Ok(Value::long(&*x & &*y))
}

fn long_or(a: &Value, b: &Value) -> RunResult<Value> {
    let Some((x, y)) = bigints(a, b) else {
        return Ok(Value::not_implemented());
    };
    Ok(Value::long(&*x | &*y))
}

fn long_xor(a: &Value, b: &Value) -> RunResult<Value> {
    let Some((x, y)) = bigints(a, b) else {
        return Ok(Value::not_implemented());
    };
    Ok(Value::long(&*x ^ &*y))
}

fn long_unary(v: &Value, f: impl FnOnce(&BigInt) -> BigInt) -> RunResult<Value> {
    match v.as_long() {
        Some(x) => Ok(Value::long(f(x))),
        None => Ok(Value::not_implemented()),
    }
}

fn long_compare(a: &Value, b: &Value) -> RunResult<Comparison> {
    Ok(match bigints(a, b) {
        Some((x, y)) => Comparison::Ordered(x.cmp(&y)),
        None => Comparison::NotImplemented,
    })
}

/// The arbitrary-precision `long` type.
pub fn long_type() -> &'static TypeRef {
    static TYPE: LazyLock<TypeRef> = LazyLock::new(|| {
        let mut slots = Slots {
            add: binary(long_add),
            radd: reflected(long_add),
            sub: binary(long_sub),
            rsub: reflected(long_sub),
            mul: binary(long_mul),
            rmul: reflected(long_mul),
            div: binary(long_floor_div),
            rdiv: reflected(long_floor_div),
            floor_div: binary(long_floor_div),
            rfloor_div: reflected(long_floor_div),
            modulo: binary(long_mod),
            rmodulo: reflected(long_mod),
            div_mod: binary(long_div_mod),
            rdiv_mod: reflected(long_div_mod),
            pow: binary(long_pow),
            rpow: reflected(long_pow),
            lshift: binary(long_lshift),
            rlshift: reflected(long_lshift),
            rshift: binary(long_rshift),
            rrshift: reflected(long_rshift),
            and: binary(long_and),
            rand: reflected(long_and),
            or: binary(long_or),
            ror: reflected(long_or),
            xor: binary(long_xor),
            rxor: reflected(long_xor),
            neg: unary(|v| long_unary(v, |x| -x)),
            pos: unary(|v| long_unary(v, Clone::clone)),
            abs: unary(|v| long_unary(v, Signed::abs)),
            invert: unary(|v| long_unary(v, |x| -x - 1)),
            hash: Some(Arc::new(|v: &Value| Ok(v.as_long().map_or(0, hash_bigint)))),
            repr: Some(Arc::new(|v: &Value| {
                Ok(v.as_long().map_or_else(String::new, |x| format!("{x}L")))
            })),
            nonzero: Some(Arc::new(|v: &Value| Ok(v.as_long().is_some_and(|x| !x.is_zero())))),
            native: Some(Arc::new(|v: &Value| {
                Ok(Object::BigInt(v.as_long().cloned().unwrap_or_default()))
            })),
            ..Slots::default()
        };
        install_ordering(&mut slots, long_compare);
        Type::builtin("long", vec![object_type().clone()], slots)
    });
    &TYPE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pow_of_trivial_bases_ignores_limits() {
        assert_eq!(pow_bigint(&BigInt::from(-1), u64::MAX).unwrap(), BigInt::from(-1));
        assert_eq!(pow_bigint(&BigInt::from(1), u64::MAX).unwrap(), BigInt::one());
        assert_eq!(pow_bigint(&BigInt::zero(), 0).unwrap(), BigInt::one());
    }

    #[test]
    fn huge_pow_is_a_memory_error() {
        let err = pow_bigint(&BigInt::from(3), u64::MAX).unwrap_err();
        assert_eq!(err.exc_type(), Some(ExcType::MemoryError));
    }

    #[test]
    fn rshift_by_huge_count_saturates() {
        let huge = BigInt::from(u64::MAX) * 4;
        assert_eq!(shr_bigint(&BigInt::from(-5), &huge), BigInt::from(-1));
        assert_eq!(shr_bigint(&BigInt::from(5), &huge), BigInt::zero());
        assert_eq!(shr_bigint(&BigInt::from(-5), &BigInt::from(1)), BigInt::from(-3));
    }

    #[test]
    fn too_large_for_float() {
        let big = BigInt::from(1) << 2000usize;
        assert_eq!(bigint_to_f64(&big).unwrap_err().exc_type(), Some(ExcType::OverflowError));
    }
}
