//! Tests for binary, reflected, in-place and unary operator dispatch.
//!
//! User-defined types are built with `Type::new_subclass` and slot closures
//! that tag their results, so each test can see which slot answered.

use std::sync::Arc;

use pyrt::{ExcType, Payload, Slots, Type, TypeRef, Value};

fn instance(ty: &TypeRef) -> Value {
    Value::new_instance(ty, Payload::Object).unwrap()
}

fn tagged(tag: &'static str) -> Option<pyrt::types::BinarySlot> {
    Some(Arc::new(move |_: &Value, _: &Value| Ok(Value::str(tag))))
}

fn declines() -> Option<pyrt::types::BinarySlot> {
    Some(Arc::new(|_: &Value, _: &Value| Ok(Value::not_implemented())))
}

fn tag_of(v: &Value) -> &str {
    v.as_str().unwrap()
}

/// With no slots on either side the error names the operator and both types.
#[test]
fn unsupported_operands_name_both_types() {
    let a = instance(&Type::new_subclass("A", &[], Slots::default()));
    let b = instance(&Type::new_subclass("B", &[], Slots::default()));
    let err = pyrt::add(&a, &b).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: unsupported operand type(s) for +: 'A' and 'B'");
    let err = pyrt::pow(&a, &b).unwrap_err();
    assert_eq!(err.message(), "unsupported operand type(s) for ** or pow(): 'A' and 'B'");
    let err = pyrt::div_mod(&a, &b).unwrap_err();
    assert_eq!(err.message(), "unsupported operand type(s) for divmod(): 'A' and 'B'");
    let err = pyrt::sub(&Value::int(1), &Value::str("x")).unwrap_err();
    assert_eq!(err.message(), "unsupported operand type(s) for -: 'int' and 'str'");
}

/// The right operand's reflected slot answers when the left has none.
#[test]
fn reflected_slot_used_when_forward_missing() {
    let a = instance(&Type::new_subclass("A", &[], Slots::default()));
    let b_type = Type::new_subclass(
        "B",
        &[],
        Slots {
            radd: tagged("B.radd"),
            ..Slots::default()
        },
    );
    let b = instance(&b_type);
    assert_eq!(tag_of(&pyrt::add(&a, &b).unwrap()), "B.radd");
    // reflected slots only serve the right-hand position
    assert!(pyrt::add(&b, &a).is_err());
}

/// A forward slot declining with NotImplemented hands over to the reflected slot,
/// and the sentinel never escapes.
#[test]
fn not_implemented_falls_through() {
    let a = instance(&Type::new_subclass(
        "A",
        &[],
        Slots {
            mul: declines(),
            ..Slots::default()
        },
    ));
    let b = instance(&Type::new_subclass(
        "B",
        &[],
        Slots {
            rmul: tagged("B.rmul"),
            ..Slots::default()
        },
    ));
    assert_eq!(tag_of(&pyrt::mul(&a, &b).unwrap()), "B.rmul");

    let c = instance(&Type::new_subclass(
        "C",
        &[],
        Slots {
            rmul: declines(),
            ..Slots::default()
        },
    ));
    let err = pyrt::mul(&a, &c).unwrap_err();
    assert_eq!(err.exc_type(), Some(ExcType::TypeError));
}

/// A subclass on the right that overrides the reflected slot is asked first.
#[test]
fn subclass_reflected_slot_has_priority() {
    let base = Type::new_subclass(
        "Base",
        &[],
        Slots {
            sub: tagged("Base.sub"),
            rsub: tagged("Base.rsub"),
            ..Slots::default()
        },
    );
    let overriding = Type::new_subclass(
        "Overriding",
        &[base.clone()],
        Slots {
            rsub: tagged("Overriding.rsub"),
            ..Slots::default()
        },
    );
    let inheriting = Type::new_subclass("Inheriting", &[base.clone()], Slots::default());

    let left = instance(&base);
    assert_eq!(tag_of(&pyrt::sub(&left, &instance(&overriding)).unwrap()), "Overriding.rsub");
    // an inherited reflected slot gives no priority
    assert_eq!(tag_of(&pyrt::sub(&left, &instance(&inheriting)).unwrap()), "Base.sub");
    // the subclass on the left is just the forward case
    assert_eq!(tag_of(&pyrt::sub(&instance(&overriding), &left).unwrap()), "Base.sub");
}

/// Builtin subclasses keep the builtin's arithmetic.
#[test]
fn builtin_subclass_inherits_slots() {
    let my_int = Type::new_subclass("MyInt", &[pyrt::types::int::int_type().clone()], Slots::default());
    let seven = Value::new_instance(&my_int, Payload::Int(7)).unwrap();
    let sum = pyrt::add(&seven, &Value::int(1)).unwrap();
    assert_eq!(sum.as_int(), Some(8));
    assert!(seven.is_instance(pyrt::types::int::int_type()));

    let err = Value::new_instance(&my_int, Payload::Float(1.0)).unwrap_err();
    assert_eq!(err.exc_type(), Some(ExcType::TypeError));
}

/// In-place operators use the in-place slot when present, else the binary form.
#[test]
fn inplace_falls_back_to_binary() {
    let only_add = instance(&Type::new_subclass(
        "OnlyAdd",
        &[],
        Slots {
            add: tagged("add"),
            ..Slots::default()
        },
    ));
    assert_eq!(tag_of(&pyrt::iadd(&only_add, &Value::int(1)).unwrap()), "add");

    let declining_iadd = instance(&Type::new_subclass(
        "DecliningIAdd",
        &[],
        Slots {
            add: tagged("add"),
            iadd: declines(),
            ..Slots::default()
        },
    ));
    assert_eq!(tag_of(&pyrt::iadd(&declining_iadd, &Value::int(1)).unwrap()), "add");

    let with_iadd = instance(&Type::new_subclass(
        "WithIAdd",
        &[],
        Slots {
            add: tagged("add"),
            iadd: tagged("iadd"),
            ..Slots::default()
        },
    ));
    assert_eq!(tag_of(&pyrt::iadd(&with_iadd, &Value::int(1)).unwrap()), "iadd");

    // immutable builtins produce a new value
    let total = pyrt::iadd(&Value::int(500), &Value::int(1)).unwrap();
    assert_eq!(total.as_int(), Some(501));
}

/// Unary operators without a slot fail with the operator's own message.
#[test]
fn unary_without_slot() {
    let a = instance(&Type::new_subclass("A", &[], Slots::default()));
    assert_eq!(pyrt::neg(&a).unwrap_err().message(), "bad operand type for unary -: 'A'");
    assert_eq!(pyrt::invert(&a).unwrap_err().message(), "bad operand type for unary ~: 'A'");
    assert_eq!(pyrt::abs(&a).unwrap_err().message(), "bad operand type for abs(): 'A'");
    assert_eq!(
        pyrt::invert(&Value::float(1.0)).unwrap_err().message(),
        "bad operand type for unary ~: 'float'"
    );
}

/// Sequences repeat from either side and concatenate with their own kind.
#[test]
fn sequence_operators() {
    let t = Value::tuple(vec![Value::int(1), Value::int(2)]);
    let repeated = pyrt::mul(&Value::int(2), &t).unwrap();
    assert_eq!(pyrt::repr(&repeated).unwrap(), "(1, 2, 1, 2)");
    let text = pyrt::mul(&Value::str("ab"), &Value::int(2)).unwrap();
    assert_eq!(text.as_str(), Some("abab"));
    let err = pyrt::add(&t, &Value::str("x")).unwrap_err();
    assert_eq!(err.message(), "unsupported operand type(s) for +: 'tuple' and 'str'");
}
