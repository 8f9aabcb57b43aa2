//! Generic operations on values.
//!
//! Every operation looks up the relevant slot on the operand's type and
//! calls it. An absent slot is reported as the matching TypeError (or, for
//! the few protocols that have one, replaced by a default behavior); it is
//! never called through.

pub mod binary;
pub mod compare;

pub use binary::{
    BinaryOp, SlotRole, UnaryOp, abs, add, and, binary_op, div, div_mod, floor_div, iadd, iand, idiv, ifloor_div,
    ilshift, imodulo, imul, inplace_op, invert, ior, ipow, irshift, isub, ixor, lshift, modulo, mul, neg, or, pos,
    pow, rshift, sub, unary_op, xor,
};
pub use compare::{
    CompareOp, compare, compare_bool, default_order, eq, ge, gt, is_equal, le, lt, ne, sorted,
};

use crate::{
    exception_private::{ExcType, RunResult},
    object::Object,
    value::Value,
};

/// `hash(value)`
pub fn hash(value: &Value) -> RunResult<i64> {
    match &value.py_type().slots().hash {
        Some(slot) => slot(value),
        None => Err(ExcType::type_error_unhashable(value.type_name())),
    }
}

/// `repr(value)`; types without a repr slot print as `<T object at 0x...>`.
pub fn repr(value: &Value) -> RunResult<String> {
    match &value.py_type().slots().repr {
        Some(slot) => slot(value),
        None => Ok(format!("<{} object at {:#x}>", value.type_name(), value.id())),
    }
}

/// `len(value)`
pub fn len(value: &Value) -> RunResult<usize> {
    match &value.py_type().slots().len {
        Some(slot) => slot(value),
        None => Err(ExcType::type_error_no_len(value.type_name())),
    }
}

/// Truth value: the `nonzero` slot, else `len(value) != 0`, else true.
pub fn is_true(value: &Value) -> RunResult<bool> {
    let slots = value.py_type().slots();
    if let Some(slot) = &slots.nonzero {
        return slot(value);
    }
    if let Some(slot) = &slots.len {
        return Ok(slot(value)? != 0);
    }
    Ok(true)
}

/// `item in container`
///
/// Uses the container's `contains` slot; containers without one are
/// iterated, comparing each element by identity and then `==`.
pub fn contains(container: &Value, item: &Value) -> RunResult<bool> {
    let slots = container.py_type().slots();
    if let Some(slot) = &slots.contains {
        return slot(container, item);
    }
    if slots.iter.is_none() {
        return Err(ExcType::type_error_not_container(container.type_name()));
    }
    let iterator = iter(container)?;
    loop {
        match next(&iterator) {
            Ok(element) => {
                if compare::same_or_equal(&element, item)? {
                    return Ok(true);
                }
            }
            Err(err) if err.is_stop_iteration() => return Ok(false),
            Err(err) => return Err(err),
        }
    }
}

/// `iter(value)`
pub fn iter(value: &Value) -> RunResult<Value> {
    match &value.py_type().slots().iter {
        Some(slot) => slot(value),
        None => Err(ExcType::type_error_not_iterable(value.type_name())),
    }
}

/// `next(iterator)`; exhaustion is a StopIteration error.
pub fn next(iterator: &Value) -> RunResult<Value> {
    match &iterator.py_type().slots().next {
        Some(slot) => slot(iterator),
        None => Err(ExcType::type_error_not_iterator(iterator.type_name())),
    }
}

/// Drains an iterable into a vector, ending quietly at StopIteration.
pub fn collect(iterable: &Value) -> RunResult<Vec<Value>> {
    let iterator = iter(iterable)?;
    let mut items = Vec::new();
    loop {
        match next(&iterator) {
            Ok(item) => items.push(item),
            Err(err) if err.is_stop_iteration() => return Ok(items),
            Err(err) => return Err(err),
        }
    }
}

/// `container[key]`
pub fn get_item(container: &Value, key: &Value) -> RunResult<Value> {
    match &container.py_type().slots().get_item {
        Some(slot) => slot(container, key),
        None => Err(ExcType::type_error_not_subscriptable(container.type_name())),
    }
}

/// `container[key] = value`
pub fn set_item(container: &Value, key: &Value, value: &Value) -> RunResult<()> {
    match &container.py_type().slots().set_item {
        Some(slot) => slot(container, key, value),
        None => Err(ExcType::type_error_no_item_assignment(container.type_name())),
    }
}

/// `del container[key]`
pub fn del_item(container: &Value, key: &Value) -> RunResult<()> {
    match &container.py_type().slots().del_item {
        Some(slot) => slot(container, key),
        None => Err(ExcType::type_error_no_item_deletion(container.type_name())),
    }
}

/// Snapshots a value as an owned [`Object`].
///
/// Types without a `native` slot become [`Object::Repr`].
pub fn to_object(value: &Value) -> RunResult<Object> {
    match &value.py_type().slots().native {
        Some(slot) => slot(value),
        None => Ok(Object::Repr(repr(value)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_slots_raise_type_errors() {
        let none = Value::none();
        let err = len(&none).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: object of type 'NoneType' has no len()");
        let err = iter(&none).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: 'NoneType' object is not iterable");
        let err = contains(&none, &Value::int(1)).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: argument of type 'NoneType' is not iterable");
    }

    #[test]
    fn truth_falls_back_to_true() {
        let obj = Value::new_instance(crate::types::base::object_type(), crate::value::Payload::Object).unwrap();
        assert!(is_true(&obj).unwrap());
        assert!(!is_true(&Value::none()).unwrap());
        assert!(repr(&obj).unwrap().starts_with("<object object at 0x"));
    }
}
