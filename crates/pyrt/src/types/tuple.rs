//! The immutable `tuple` type.
//!
//! Tuples never change after construction, so they need no locking. Equality
//! and ordering walk both tuples in step and delegate to the dispatch engine,
//! stopping at the first pair that is not identical-or-equal.

use std::sync::{Arc, LazyLock};

use smallvec::SmallVec;

use super::{
    Slots, Type, TypeRef,
    base::object_type,
    iter::SeqIter,
    r#type::binary,
    repeat_target_len, sequence_index,
};
use crate::{
    dispatch::{
        self,
        compare::{CompareOp, compare_bool, install_rich, same_or_equal},
    },
    exception_private::RunResult,
    object::Object,
    py_hash::hash_tuple,
    resource::concat_len,
    value::{Payload, Value},
};

/// Payload of a `tuple` value. Small tuples are stored inline.
#[derive(Debug, Clone, Default)]
pub struct Tuple(SmallVec<[Value; 3]>);

impl Tuple {
    #[must_use]
    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Value> for Tuple {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

static EMPTY: LazyLock<Value> = LazyLock::new(|| Value::from_parts(tuple_type().clone(), Payload::Tuple(Tuple::default())));

impl Value {
    /// Creates a tuple. Every empty tuple is the same shared instance.
    #[must_use]
    pub fn tuple(items: Vec<Self>) -> Self {
        if items.is_empty() {
            return EMPTY.clone();
        }
        Self::from_parts(tuple_type().clone(), Payload::Tuple(Tuple(SmallVec::from_vec(items))))
    }
}

fn tuple_add(a: &Value, b: &Value) -> RunResult<Value> {
    match (a.as_tuple(), b.as_tuple()) {
        (Some(x), Some(y)) => {
            concat_len(x.len(), y.len())?;
            Ok(Value::tuple(x.iter().chain(y).cloned().collect()))
        }
        _ => Ok(Value::not_implemented()),
    }
}

/// `t * n`, also serving `n * t` through the reflected slot.
fn tuple_repeat(seq: &Value, count: &Value) -> RunResult<Value> {
    let Some(items) = seq.as_tuple() else {
        return Ok(Value::not_implemented());
    };
    let Some(total) = repeat_target_len(items.len(), count)? else {
        return Ok(Value::not_implemented());
    };
    Ok(Value::tuple(items.iter().cycle().take(total).cloned().collect()))
}

fn tuple_richcompare(op: CompareOp, a: &Value, b: &Value) -> RunResult<Value> {
    let (Some(x), Some(y)) = (a.as_tuple(), b.as_tuple()) else {
        return Ok(Value::not_implemented());
    };
    for (left, right) in x.iter().zip(y) {
        if !same_or_equal(left, right)? {
            return match op {
                CompareOp::Eq => Ok(Value::bool(false)),
                CompareOp::Ne => Ok(Value::bool(true)),
                _ => Ok(Value::bool(compare_bool(op, left, right)?)),
            };
        }
    }
    Ok(Value::bool(op.matches(x.len().cmp(&y.len()))))
}

fn tuple_hash(v: &Value) -> RunResult<i64> {
    let items = v.as_tuple().unwrap_or_default();
    let hashes = items.iter().map(dispatch::hash).collect::<RunResult<SmallVec<[i64; 8]>>>()?;
    Ok(hash_tuple(&hashes))
}

fn tuple_repr(v: &Value) -> RunResult<String> {
    let items = v.as_tuple().unwrap_or_default();
    let mut out = String::from("(");
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&dispatch::repr(item)?);
    }
    if items.len() == 1 {
        out.push(',');
    }
    out.push(')');
    Ok(out)
}

fn tuple_contains(container: &Value, item: &Value) -> RunResult<bool> {
    for element in container.as_tuple().unwrap_or_default() {
        if same_or_equal(element, item)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn tuple_get_item(container: &Value, key: &Value) -> RunResult<Value> {
    let items = container.as_tuple().unwrap_or_default();
    let index = sequence_index(key, items.len(), "tuple")?;
    Ok(items[index].clone())
}

/// The builtin `tuple` type.
pub fn tuple_type() -> &'static TypeRef {
    static TYPE: LazyLock<TypeRef> = LazyLock::new(|| {
        let mut slots = Slots {
            add: binary(tuple_add),
            mul: binary(tuple_repeat),
            rmul: binary(tuple_repeat),
            hash: Some(Arc::new(tuple_hash)),
            repr: Some(Arc::new(tuple_repr)),
            len: Some(Arc::new(|v: &Value| Ok(v.as_tuple().map_or(0, <[Value]>::len)))),
            contains: Some(Arc::new(tuple_contains)),
            get_item: binary(tuple_get_item),
            iter: Some(Arc::new(|v: &Value| Ok(SeqIter::start(v)))),
            native: Some(Arc::new(|v: &Value| {
                let items = v.as_tuple().unwrap_or_default();
                Ok(Object::Tuple(items.iter().map(dispatch::to_object).collect::<RunResult<_>>()?))
            })),
            ..Slots::default()
        };
        install_rich(&mut slots, tuple_richcompare);
        Type::builtin("tuple", vec![object_type().clone()], slots)
    });
    &TYPE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tuple_is_shared() {
        assert!(Value::tuple(Vec::new()).is(&Value::tuple(Vec::new())));
        let t = Value::tuple(vec![Value::int(1)]);
        let repeated = tuple_repeat(&t, &Value::int(0)).unwrap();
        assert!(repeated.is(&Value::tuple(Vec::new())));
    }

    #[test]
    fn repr_of_singleton_has_trailing_comma() {
        assert_eq!(tuple_repr(&Value::tuple(vec![Value::int(1)])).unwrap(), "(1,)");
        assert_eq!(tuple_repr(&Value::tuple(Vec::new())).unwrap(), "()");
        let pair = Value::tuple(vec![Value::int(1), Value::str("a")]);
        assert_eq!(tuple_repr(&pair).unwrap(), "(1, 'a')");
    }
}
