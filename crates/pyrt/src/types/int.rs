//! Machine-width `int` and its `bool` subtype.
//!
//! Every `int` operation is computed with checked arithmetic. When the exact
//! result does not fit in an `i64` it is recomputed with arbitrary precision and
//! returned as a `long`; the tracer sees a promotion event. Slots only accept
//! `Int` payloads on both sides; any other right operand gets `NotImplemented`
//! so `long`, `float` and `complex` can take over through their reflected slots.

use std::sync::{Arc, LazyLock};

use num_bigint::BigInt;
use num_integer::Integer;

use super::{
    Slots, Type, TypeRef,
    base::object_type,
    float::float_pow,
    long_int::{pow_bigint, shl_bigint},
    r#type::{binary, reflected, unary},
};
use crate::{
    dispatch::compare::{Comparison, install_ordering},
    exception_private::{ExcType, RunResult},
    object::Object,
    py_hash::hash_int,
    tracer,
    value::{Payload, Value},
};

/// Returns a `long` holding `result` and records the promotion.
fn promote(op: &'static str, result: BigInt) -> Value {
    tracer::emit(|t| t.on_promotion(op));
    Value::long(result)
}

fn ints(a: &Value, b: &Value) -> Option<(i64, i64)> {
    Some((a.as_int()?, b.as_int()?))
}

fn int_add(a: &Value, b: &Value) -> RunResult<Value> {
    let Some((x, y)) = ints(a, b) else {
        return Ok(Value::not_implemented());
    };
    Ok(match x.checked_add(y) {
        Some(r) => Value::int(r),
        None => promote("+", BigInt::from(x) + y),
    })
}

fn int_sub(a: &Value, b: &Value) -> RunResult<Value> {
    let Some((x, y)) = ints(a, b) else {
        return Ok(Value::not_implemented());
    };
    Ok(match x.checked_sub(y) {
        Some(r) => Value::int(r),
        None => promote("-", BigInt::from(x) - y),
    })
}

fn int_mul(a: &Value, b: &Value) -> RunResult<Value> {
    let Some((x, y)) = ints(a, b) else {
        return Ok(Value::not_implemented());
    };
    Ok(match x.checked_mul(y) {
        Some(r) => Value::int(r),
        None => promote("*", BigInt::from(x) * y),
    })
}

fn zero_division() -> crate::exception_private::RunError {
    ExcType::zero_division("integer division or modulo by zero")
}

/// Floor division; also the classic `/` for integers.
fn int_floor_div(a: &Value, b: &Value) -> RunResult<Value> {
    let Some((x, y)) = ints(a, b) else {
        return Ok(Value::not_implemented());
    };
    if y == 0 {
        return Err(zero_division());
    }
    // i64::MIN // -1 is the only overflowing quotient
    if x == i64::MIN && y == -1 {
        return Ok(promote("//", -BigInt::from(x)));
    }
    Ok(Value::int(x.div_floor(&y)))
}

fn int_mod(a: &Value, b: &Value) -> RunResult<Value> {
    let Some((x, y)) = ints(a, b) else {
        return Ok(Value::not_implemented());
    };
    match y {
        0 => Err(zero_division()),
        -1 => Ok(Value::int(0)),
        _ => Ok(Value::int(x.mod_floor(&y))),
    }
}

fn int_div_mod(a: &Value, b: &Value) -> RunResult<Value> {
    let Some((x, y)) = ints(a, b) else {
        return Ok(Value::not_implemented());
    };
    if y == 0 {
        return Err(zero_division());
    }
    if x == i64::MIN && y == -1 {
        let quotient = promote("divmod", -BigInt::from(x));
        return Ok(Value::tuple(vec![quotient, Value::int(0)]));
    }
    let (q, r) = x.div_mod_floor(&y);
    Ok(Value::tuple(vec![Value::int(q), Value::int(r)]))
}

fn int_pow(a: &Value, b: &Value) -> RunResult<Value> {
    let Some((x, y)) = ints(a, b) else {
        return Ok(Value::not_implemented());
    };
    if y < 0 {
        if x == 0 {
            return Err(ExcType::zero_negative_power());
        }
        return Ok(Value::float(float_pow(x as f64, y as f64)?));
    }
    if let Ok(exp) = u32::try_from(y)
        && let Some(r) = x.checked_pow(exp)
    {
        return Ok(Value::int(r));
    }
    let exp = y.unsigned_abs();
    let result = pow_bigint(&BigInt::from(x), exp)?;
    Ok(promote("**", result))
}

fn int_lshift(a: &Value, b: &Value) -> RunResult<Value> {
    let Some((x, y)) = ints(a, b) else {
        return Ok(Value::not_implemented());
    };
    if y < 0 {
        return Err(ExcType::value_error_negative_shift_count());
    }
    if x == 0 || y == 0 {
        return Ok(Value::int(x));
    }
    if y < 64 {
        let shifted = x << y;
        if shifted >> y == x {
            return Ok(Value::int(shifted));
        }
    }
    Ok(promote("<<", shl_bigint(&BigInt::from(x), y.unsigned_abs())?))
}

fn int_rshift(a: &Value, b: &Value) -> RunResult<Value> {
    let Some((x, y)) = ints(a, b) else {
        return Ok(Value::not_implemented());
    };
    if y < 0 {
        return Err(ExcType::value_error_negative_shift_count());
    }
    if y >= 64 {
        return Ok(Value::int(if x < 0 { -1 } else { 0 }));
    }
    Ok(Value::int(x >> y))
}

fn int_and(a: &Value, b: &Value) -> RunResult<Value> {
    match ints(a, b) {
        Some((x, y)) => Ok(Value::int(x & y)),
        None => Ok(Value::not_implemented()),
    }
}

fn int_or(a: &Value, b: &Value) -> RunResult<Value> {
    match ints(a, b) {
        Some((x, y)) => Ok(Value::int(x | y)),
        None => Ok(Value::not_implemented()),
    }
}

fn int_xor(a: &Value, b: &Value) -> RunResult<Value> {
    match ints(a, b) {
        Some((x, y)) => Ok(Value::int(x ^ y)),
        None => Ok(Value::not_implemented()),
    }
}

fn int_neg(v: &Value) -> RunResult<Value> {
    let Some(x) = v.as_int() else {
        return Ok(Value::not_implemented());
    };
    Ok(match x.checked_neg() {
        Some(r) => Value::int(r),
        None => promote("-", -BigInt::from(x)),
    })
}

fn int_abs(v: &Value) -> RunResult<Value> {
    let Some(x) = v.as_int() else {
        return Ok(Value::not_implemented());
    };
    Ok(match x.checked_abs() {
        Some(r) => Value::int(r),
        None => promote("abs", -BigInt::from(x)),
    })
}

fn int_compare(a: &Value, b: &Value) -> RunResult<Comparison> {
    Ok(match ints(a, b) {
        Some((x, y)) => Comparison::Ordered(x.cmp(&y)),
        None => Comparison::NotImplemented,
    })
}

fn int_slots() -> Slots {
    let mut slots = Slots {
        add: binary(int_add),
        radd: reflected(int_add),
        sub: binary(int_sub),
        rsub: reflected(int_sub),
        mul: binary(int_mul),
        rmul: reflected(int_mul),
        div: binary(int_floor_div),
        rdiv: reflected(int_floor_div),
        floor_div: binary(int_floor_div),
        rfloor_div: reflected(int_floor_div),
        modulo: binary(int_mod),
        rmodulo: reflected(int_mod),
        div_mod: binary(int_div_mod),
        rdiv_mod: reflected(int_div_mod),
        pow: binary(int_pow),
        rpow: reflected(int_pow),
        lshift: binary(int_lshift),
        rlshift: reflected(int_lshift),
        rshift: binary(int_rshift),
        rrshift: reflected(int_rshift),
        and: binary(int_and),
        rand: reflected(int_and),
        or: binary(int_or),
        ror: reflected(int_or),
        xor: binary(int_xor),
        rxor: reflected(int_xor),
        neg: unary(int_neg),
        pos: unary(|v| Ok(v.as_int().map_or_else(Value::not_implemented, Value::int))),
        abs: unary(int_abs),
        invert: unary(|v| Ok(v.as_int().map_or_else(Value::not_implemented, |x| Value::int(!x)))),
        hash: Some(Arc::new(|v: &Value| Ok(v.as_int().map_or(0, hash_int)))),
        repr: Some(Arc::new(|v: &Value| Ok(v.as_int().unwrap_or_default().to_string()))),
        nonzero: Some(Arc::new(|v: &Value| Ok(v.as_int().is_some_and(|x| x != 0)))),
        native: Some(Arc::new(|v: &Value| Ok(Object::Int(v.as_int().unwrap_or_default())))),
        ..Slots::default()
    };
    install_ordering(&mut slots, int_compare);
    slots
}

/// The machine-width `int` type.
pub fn int_type() -> &'static TypeRef {
    static TYPE: LazyLock<TypeRef> =
        LazyLock::new(|| Type::builtin("int", vec![object_type().clone()], int_slots()));
    &TYPE
}

fn is_bool(v: &Value) -> bool {
    v.is_instance(bool_type())
}

/// `bool & bool` stays a bool; any other pairing is integer arithmetic.
fn bool_bitwise(a: &Value, b: &Value, int_op: fn(&Value, &Value) -> RunResult<Value>) -> RunResult<Value> {
    if is_bool(a) && is_bool(b) {
        let result = int_op(a, b)?;
        return Ok(Value::bool(result.as_int().is_some_and(|x| x != 0)));
    }
    int_op(a, b)
}

fn bool_and(a: &Value, b: &Value) -> RunResult<Value> {
    bool_bitwise(a, b, int_and)
}

fn bool_or(a: &Value, b: &Value) -> RunResult<Value> {
    bool_bitwise(a, b, int_or)
}

fn bool_xor(a: &Value, b: &Value) -> RunResult<Value> {
    bool_bitwise(a, b, int_xor)
}

/// `bool`, a subtype of `int` whose only instances are `True` and `False`.
pub fn bool_type() -> &'static TypeRef {
    static TYPE: LazyLock<TypeRef> = LazyLock::new(|| {
        let slots = Slots {
            and: binary(bool_and),
            rand: reflected(bool_and),
            or: binary(bool_or),
            ror: reflected(bool_or),
            xor: binary(bool_xor),
            rxor: reflected(bool_xor),
            repr: Some(Arc::new(|v: &Value| {
                Ok(if v.as_int().is_some_and(|x| x != 0) { "True" } else { "False" }.to_owned())
            })),
            native: Some(Arc::new(|v: &Value| Ok(Object::Bool(v.as_int().is_some_and(|x| x != 0))))),
            ..int_type().slots().clone()
        };
        Type::builtin("bool", vec![int_type().clone()], slots)
    });
    &TYPE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_detects_lost_bits() {
        let v = int_lshift(&Value::int(3), &Value::int(62)).unwrap();
        assert_eq!(v.type_name(), "long");
        let v = int_lshift(&Value::int(1), &Value::int(62)).unwrap();
        assert_eq!(v.as_int(), Some(1 << 62));
        let v = int_lshift(&Value::int(-1), &Value::int(63)).unwrap();
        assert_eq!(v.as_int(), Some(i64::MIN));
    }

    #[test]
    fn min_floor_div_minus_one_promotes() {
        let v = int_floor_div(&Value::int(i64::MIN), &Value::int(-1)).unwrap();
        assert_eq!(v.as_long(), Some(&(-BigInt::from(i64::MIN))));
    }

    #[test]
    fn modulo_follows_divisor_sign() {
        assert_eq!(int_mod(&Value::int(-7), &Value::int(3)).unwrap().as_int(), Some(2));
        assert_eq!(int_mod(&Value::int(7), &Value::int(-3)).unwrap().as_int(), Some(-2));
        assert_eq!(int_mod(&Value::int(i64::MIN), &Value::int(-1)).unwrap().as_int(), Some(0));
    }

    #[test]
    fn bool_bitwise_stays_bool() {
        let v = bool_and(&Value::bool(true), &Value::bool(true)).unwrap();
        assert!(v.is(&Value::bool(true)));
        let v = bool_or(&Value::bool(true), &Value::int(2)).unwrap();
        assert_eq!(v.type_name(), "int");
        assert_eq!(v.as_int(), Some(3));
    }
}
