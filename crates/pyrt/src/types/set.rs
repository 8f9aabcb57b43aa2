//! `set` and `frozenset`.
//!
//! Both are presence sets over a [`Dict`] whose values are a shared sentinel.
//! Subset, superset and equality checks snapshot both operands' guards, walk
//! the live storage with no lock held, and then re-check the guards: a
//! comparison that raced with a mutation fails instead of answering.

use std::sync::{Arc, LazyLock};

use smallvec::SmallVec;

use super::{
    Dict, DictGuard, Slots, Type, TypeRef,
    base::object_type,
    iter::SeqIter,
    r#type::binary,
};
use crate::{
    dispatch::{
        self,
        compare::{CompareOp, install_rich},
    },
    exception_private::{ExcType, RunResult},
    object::Object,
    py_hash::hash_frozenset,
    value::{Payload, Value},
};

/// Storage shared by `set` and `frozenset`.
#[derive(Debug, Default)]
pub struct SetStorage {
    dict: Dict,
}

fn sentinel() -> Value {
    Value::bool(true)
}

impl SetStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds storage from `items`, dropping duplicates.
    pub fn from_items(items: impl IntoIterator<Item = Value>) -> RunResult<Self> {
        let storage = Self::new();
        for item in items {
            storage.add(item)?;
        }
        Ok(storage)
    }

    pub(crate) fn dict(&self) -> &Dict {
        &self.dict
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.dict.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dict.is_empty()
    }

    #[must_use]
    pub fn guard(&self) -> DictGuard<'_> {
        self.dict.guard()
    }

    /// Adds `item`, returning false if an equal element was already present.
    pub fn add(&self, item: Value) -> RunResult<bool> {
        Ok(self.dict.insert(item, sentinel())?.is_none())
    }

    pub fn contains(&self, item: &Value) -> RunResult<bool> {
        self.dict.contains_key(item)
    }

    /// Removes `item`, failing with KeyError if it is absent.
    pub fn remove(&self, item: &Value) -> RunResult<()> {
        match self.dict.remove(item)? {
            Some(_) => Ok(()),
            None => Err(ExcType::key_error(dispatch::repr(item)?)),
        }
    }

    /// Removes `item` if present.
    pub fn discard(&self, item: &Value) -> RunResult<bool> {
        Ok(self.dict.remove(item)?.is_some())
    }

    /// Removes and returns an arbitrary element.
    pub fn pop(&self) -> RunResult<Value> {
        self.dict
            .pop_last()
            .map(|(item, _)| item)
            .ok_or_else(ExcType::key_error_pop_empty_set)
    }

    pub fn clear(&self) {
        self.dict.clear();
    }

    /// Snapshot of the elements in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<Value> {
        self.dict.keys()
    }

    /// Returns true if every element of `self` is in `other`.
    pub fn is_subset(&self, other: &Self) -> RunResult<bool> {
        guarded(self, other, |a, b| {
            if a.len() > b.len() {
                return Ok(false);
            }
            all_contained(a, b)
        })
    }

    pub fn is_superset(&self, other: &Self) -> RunResult<bool> {
        other.is_subset(self)
    }

    /// Returns true if the two sets share no element.
    pub fn is_disjoint(&self, other: &Self) -> RunResult<bool> {
        guarded(self, other, |a, b| {
            let (smaller, larger) = if a.len() <= b.len() { (a, b) } else { (b, a) };
            let mut position = 0;
            while let Some((next, item, _)) = smaller.dict.entry_at(position) {
                position = next;
                if larger.contains(&item)? {
                    return Ok(false);
                }
            }
            Ok(true)
        })
    }

    /// Set equality: same length and every element of `self` in `other`.
    pub fn set_eq(&self, other: &Self) -> RunResult<bool> {
        guarded(self, other, |a, b| {
            if a.len() != b.len() {
                return Ok(false);
            }
            all_contained(a, b)
        })
    }

    fn union(&self, other: &Self) -> RunResult<Self> {
        Self::from_items(self.items().into_iter().chain(other.items()))
    }

    fn intersection(&self, other: &Self) -> RunResult<Self> {
        let result = Self::new();
        for item in self.items() {
            if other.contains(&item)? {
                result.add(item)?;
            }
        }
        Ok(result)
    }

    fn difference(&self, other: &Self) -> RunResult<Self> {
        let result = Self::new();
        for item in self.items() {
            if !other.contains(&item)? {
                result.add(item)?;
            }
        }
        Ok(result)
    }

    fn symmetric_difference(&self, other: &Self) -> RunResult<Self> {
        let result = self.difference(other)?;
        for item in other.items() {
            if !self.contains(&item)? {
                result.add(item)?;
            }
        }
        Ok(result)
    }

    /// Replaces the contents with the elements of `other`.
    fn replace_with(&self, other: &Self) -> RunResult<()> {
        let items = other.items();
        self.clear();
        for item in items {
            self.add(item)?;
        }
        Ok(())
    }
}

/// Runs `check` against the live storages and rejects the answer if either
/// one was structurally modified meanwhile.
fn guarded(
    a: &SetStorage,
    b: &SetStorage,
    check: impl FnOnce(&SetStorage, &SetStorage) -> RunResult<bool>,
) -> RunResult<bool> {
    let (guard_a, guard_b) = (a.guard(), b.guard());
    let result = check(a, b)?;
    if !guard_a.check() || !guard_b.check() {
        return Err(ExcType::runtime_error_set_changed_during_comparison());
    }
    Ok(result)
}

fn all_contained(a: &SetStorage, b: &SetStorage) -> RunResult<bool> {
    let mut position = 0;
    while let Some((next, item, _)) = a.dict.entry_at(position) {
        position = next;
        if !b.contains(&item)? {
            return Ok(false);
        }
    }
    Ok(true)
}

impl Value {
    /// Creates a `set` holding `items`.
    pub fn set(items: Vec<Self>) -> RunResult<Self> {
        Ok(Self::from_parts(set_type().clone(), Payload::Set(SetStorage::from_items(items)?)))
    }

    /// Creates a `frozenset` holding `items`.
    pub fn frozenset(items: Vec<Self>) -> RunResult<Self> {
        Ok(Self::from_parts(
            frozenset_type().clone(),
            Payload::FrozenSet(SetStorage::from_items(items)?),
        ))
    }

    /// Returns the storage of a mutable `set`; `None` for a `frozenset`.
    #[must_use]
    pub fn as_mutable_set(&self) -> Option<&SetStorage> {
        match self.payload() {
            Payload::Set(s) => Some(s),
            _ => None,
        }
    }
}

/// Wraps storage in a value of the same kind (`set` or `frozenset`) as `like`.
fn same_kind(like: &Value, storage: SetStorage) -> Value {
    match like.payload() {
        Payload::FrozenSet(_) => Value::from_parts(frozenset_type().clone(), Payload::FrozenSet(storage)),
        _ => Value::from_parts(set_type().clone(), Payload::Set(storage)),
    }
}

/// Applies a set algebra operator; the result's kind follows the left operand.
fn set_operator(
    a: &Value,
    b: &Value,
    op: fn(&SetStorage, &SetStorage) -> RunResult<SetStorage>,
) -> RunResult<Value> {
    match (a.as_set_storage(), b.as_set_storage()) {
        (Some(x), Some(y)) => Ok(same_kind(a, op(x, y)?)),
        _ => Ok(Value::not_implemented()),
    }
}

fn set_or(a: &Value, b: &Value) -> RunResult<Value> {
    set_operator(a, b, SetStorage::union)
}

fn set_and(a: &Value, b: &Value) -> RunResult<Value> {
    set_operator(a, b, SetStorage::intersection)
}

fn set_sub(a: &Value, b: &Value) -> RunResult<Value> {
    set_operator(a, b, SetStorage::difference)
}

fn set_xor(a: &Value, b: &Value) -> RunResult<Value> {
    set_operator(a, b, SetStorage::symmetric_difference)
}

/// `a op= b` on a mutable set: computes the result, then stores it into `a`.
fn set_inplace(
    a: &Value,
    b: &Value,
    op: fn(&SetStorage, &SetStorage) -> RunResult<SetStorage>,
) -> RunResult<Value> {
    match (a.as_mutable_set(), b.as_set_storage()) {
        (Some(x), Some(y)) => {
            let result = op(x, y)?;
            x.replace_with(&result)?;
            Ok(a.clone())
        }
        _ => Ok(Value::not_implemented()),
    }
}

fn set_ior(a: &Value, b: &Value) -> RunResult<Value> {
    match (a.as_mutable_set(), b.as_set_storage()) {
        (Some(x), Some(y)) => {
            for item in y.items() {
                x.add(item)?;
            }
            Ok(a.clone())
        }
        _ => Ok(Value::not_implemented()),
    }
}

fn set_iand(a: &Value, b: &Value) -> RunResult<Value> {
    set_inplace(a, b, SetStorage::intersection)
}

fn set_isub(a: &Value, b: &Value) -> RunResult<Value> {
    set_inplace(a, b, SetStorage::difference)
}

fn set_ixor(a: &Value, b: &Value) -> RunResult<Value> {
    set_inplace(a, b, SetStorage::symmetric_difference)
}

fn set_richcompare(op: CompareOp, a: &Value, b: &Value) -> RunResult<Value> {
    let Some(x) = a.as_set_storage() else {
        return Ok(Value::not_implemented());
    };
    let Some(y) = b.as_set_storage() else {
        return match op {
            CompareOp::Eq | CompareOp::Ne => Ok(Value::not_implemented()),
            _ => Err(ExcType::type_error("can only compare to a set")),
        };
    };
    let result = match op {
        CompareOp::Eq => x.set_eq(y)?,
        CompareOp::Ne => !x.set_eq(y)?,
        CompareOp::Le => x.is_subset(y)?,
        CompareOp::Ge => x.is_superset(y)?,
        CompareOp::Lt => x.len() < y.len() && x.is_subset(y)?,
        CompareOp::Gt => x.len() > y.len() && x.is_superset(y)?,
    };
    Ok(Value::bool(result))
}

fn set_repr(v: &Value) -> RunResult<String> {
    let Some(storage) = v.as_set_storage() else {
        return Ok(String::new());
    };
    let name = v.type_name();
    if storage.is_empty() {
        return Ok(format!("{name}()"));
    }
    let items = storage.items().iter().map(dispatch::repr).collect::<RunResult<Vec<_>>>()?;
    Ok(format!("{name}([{}])", items.join(", ")))
}

fn frozenset_hash(v: &Value) -> RunResult<i64> {
    let items = v.as_set_storage().map(SetStorage::items).unwrap_or_default();
    let hashes = items.iter().map(dispatch::hash).collect::<RunResult<SmallVec<[i64; 8]>>>()?;
    Ok(hash_frozenset(hashes))
}

fn set_contains(container: &Value, item: &Value) -> RunResult<bool> {
    match container.as_set_storage() {
        Some(storage) => storage.contains(item),
        None => Ok(false),
    }
}

fn set_native(v: &Value) -> RunResult<Object> {
    let items = v.as_set_storage().map(SetStorage::items).unwrap_or_default();
    let objects = items.iter().map(dispatch::to_object).collect::<RunResult<Vec<_>>>()?;
    Ok(match v.payload() {
        Payload::FrozenSet(_) => Object::FrozenSet(objects),
        _ => Object::Set(objects),
    })
}

fn common_slots() -> Slots {
    let mut slots = Slots {
        or: binary(set_or),
        and: binary(set_and),
        sub: binary(set_sub),
        xor: binary(set_xor),
        repr: Some(Arc::new(set_repr)),
        len: Some(Arc::new(|v: &Value| Ok(v.as_set_storage().map_or(0, SetStorage::len)))),
        contains: Some(Arc::new(set_contains)),
        iter: Some(Arc::new(|v: &Value| Ok(SeqIter::start(v)))),
        native: Some(Arc::new(set_native)),
        ..Slots::default()
    };
    install_rich(&mut slots, set_richcompare);
    slots
}

/// The mutable, unhashable `set` type.
pub fn set_type() -> &'static TypeRef {
    static TYPE: LazyLock<TypeRef> = LazyLock::new(|| {
        let slots = Slots {
            ior: binary(set_ior),
            iand: binary(set_iand),
            isub: binary(set_isub),
            ixor: binary(set_ixor),
            ..common_slots()
        };
        Type::builtin("set", vec![object_type().clone()], slots)
    });
    &TYPE
}

/// The immutable, hashable `frozenset` type.
pub fn frozenset_type() -> &'static TypeRef {
    static TYPE: LazyLock<TypeRef> = LazyLock::new(|| {
        let slots = Slots {
            hash: Some(Arc::new(frozenset_hash)),
            ..common_slots()
        };
        Type::builtin("frozenset", vec![object_type().clone()], slots)
    });
    &TYPE
}
