//! The keyed mapping behind `dict`, `set` and `frozenset`.
//!
//! # Storage Strategy
//! Uses a `HashTable<usize>` for hash lookups combined with a `Vec` of entry
//! slots that preserves insertion order. Removal leaves a hole in the entry
//! vector so that positions held by live iterators stay meaningful; holes are
//! compacted away once they outnumber the live entries.
//!
//! # Concurrency
//! Key hashing and key equality may run user-defined slots, and those slots
//! may touch this very mapping. No lock is ever held while they run. A lookup
//! gathers hash-matching candidates under the read lock, compares them with the
//! lock released, and retries if the mapping's version moved in the meantime.
//! Writes re-validate the version under the write lock before applying.
//!
//! # Versioning
//! Every structural change (a key added or removed, `clear`, compaction) bumps
//! the version. Replacing the value of an existing key does not.

use std::{
    fmt::Write,
    sync::{Arc, LazyLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use hashbrown::HashTable;
use smallvec::SmallVec;

use super::{Slots, Type, TypeRef, base::object_type, iter::SeqIter, r#type::binary};
use crate::{
    dispatch::{
        self,
        compare::{CompareOp, install_rich, same_or_equal},
    },
    exception_private::{ExcType, RunError, RunResult},
    object::Object,
    value::{Payload, Value},
};

/// Lookups that keep racing with writers give up after this many attempts.
const MAX_LOOKUP_ATTEMPTS: usize = 64;

#[derive(Debug, Clone)]
struct DictEntry {
    key: Value,
    value: Value,
    /// the hash is needed here for correct use of insert_unique
    hash: u64,
}

#[derive(Debug, Default)]
struct DictTable {
    /// indices mapping from the entry hash to its slot in `entries`.
    indices: HashTable<usize>,
    /// entry slots in insertion order; `None` marks a removed entry.
    entries: Vec<Option<DictEntry>>,
    /// number of live entries.
    used: usize,
    version: u64,
}

impl DictTable {
    fn push(&mut self, entry: DictEntry) {
        let index = self.entries.len();
        let hash = entry.hash;
        self.entries.push(Some(entry));
        let entries = &self.entries;
        self.indices
            .insert_unique(hash, index, |&i| entries[i].as_ref().map_or(0, |e| e.hash));
        self.used += 1;
        self.version += 1;
    }

    fn take(&mut self, index: usize) -> Option<DictEntry> {
        let entry = self.entries.get_mut(index)?.take()?;
        if let Ok(slot) = self.indices.find_entry(entry.hash, |&i| i == index) {
            slot.remove();
        }
        self.used -= 1;
        self.version += 1;
        if self.entries.len() > 8 && self.used * 2 < self.entries.len() {
            self.compact();
        }
        Some(entry)
    }

    /// Drops the holes left by removals and rebuilds the index.
    fn compact(&mut self) {
        let live: Vec<DictEntry> = self.entries.drain(..).flatten().collect();
        self.indices.clear();
        for (index, entry) in live.iter().enumerate() {
            self.indices.insert_unique(entry.hash, index, |&i| live[i].hash);
        }
        self.entries = live.into_iter().map(Some).collect();
        self.version += 1;
    }

    fn candidates(&self, hash: u64) -> SmallVec<[(usize, Value); 2]> {
        self.indices
            .iter_hash(hash)
            .filter_map(|&index| {
                let entry = self.entries[index].as_ref()?;
                (entry.hash == hash).then(|| (index, entry.key.clone()))
            })
            .collect()
    }
}

/// Insertion-ordered hash map keyed by runtime values.
#[derive(Debug, Default)]
pub struct Dict {
    table: RwLock<DictTable>,
}

/// Snapshot of a mapping's version and length.
///
/// [`DictGuard::check`] reports whether the mapping is still structurally
/// unchanged since the snapshot was taken.
#[derive(Debug, Clone, Copy)]
pub struct DictGuard<'a> {
    dict: &'a Dict,
    version: u64,
    len: usize,
}

impl DictGuard<'_> {
    /// Returns true if no structural mutation happened since the snapshot.
    #[must_use]
    pub fn check(&self) -> bool {
        let table = self.dict.read();
        table.version == self.version && table.used == self.len
    }

    /// Length at snapshot time.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }
}

fn table_hash(key: &Value) -> RunResult<u64> {
    let hash = dispatch::hash(key)?;
    Ok(u64::from_ne_bytes(hash.to_ne_bytes()))
}

impl Dict {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, DictTable> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, DictTable> {
        self.table.write().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().used
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mutation counter, bumped by every structural change.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.read().version
    }

    /// Snapshots the current version and length.
    #[must_use]
    pub fn guard(&self) -> DictGuard<'_> {
        let table = self.read();
        DictGuard {
            dict: self,
            version: table.version,
            len: table.used,
        }
    }

    /// Finds the slot holding `key`, together with the version it was found at.
    ///
    /// Candidate keys are compared with no lock held. If the version moves
    /// during the comparison the lookup starts over.
    fn find(&self, key: &Value, hash: u64) -> RunResult<(u64, Option<usize>)> {
        for _ in 0..MAX_LOOKUP_ATTEMPTS {
            let (version, candidates) = {
                let table = self.read();
                (table.version, table.candidates(hash))
            };
            let mut found = None;
            for (index, candidate) in candidates {
                if same_or_equal(&candidate, key)? {
                    found = Some(index);
                    break;
                }
            }
            if self.version() == version {
                return Ok((version, found));
            }
        }
        Err(ExcType::runtime_error_dict_mutated_during_lookup())
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &Value) -> RunResult<Option<Value>> {
        let hash = table_hash(key)?;
        for _ in 0..MAX_LOOKUP_ATTEMPTS {
            let (version, found) = self.find(key, hash)?;
            let table = self.read();
            if table.version != version {
                continue;
            }
            return Ok(found.and_then(|index| table.entries[index].as_ref().map(|e| e.value.clone())));
        }
        Err(ExcType::runtime_error_dict_mutated_during_lookup())
    }

    pub fn contains_key(&self, key: &Value) -> RunResult<bool> {
        let hash = table_hash(key)?;
        Ok(self.find(key, hash)?.1.is_some())
    }

    /// Stores `value` under `key`, returning the value it replaced.
    ///
    /// An existing equal key is kept; only its value is replaced.
    pub fn insert(&self, key: Value, value: Value) -> RunResult<Option<Value>> {
        let hash = table_hash(&key)?;
        for _ in 0..MAX_LOOKUP_ATTEMPTS {
            let (version, found) = self.find(&key, hash)?;
            let mut table = self.write();
            if table.version != version {
                continue;
            }
            if let Some(entry) = found.and_then(|index| table.entries[index].as_mut()) {
                return Ok(Some(std::mem::replace(&mut entry.value, value)));
            }
            table.push(DictEntry { key, value, hash });
            return Ok(None);
        }
        Err(ExcType::runtime_error_dict_mutated_during_lookup())
    }

    /// Removes `key`, returning its value.
    pub fn remove(&self, key: &Value) -> RunResult<Option<Value>> {
        let hash = table_hash(key)?;
        for _ in 0..MAX_LOOKUP_ATTEMPTS {
            let (version, found) = self.find(key, hash)?;
            let Some(index) = found else {
                return Ok(None);
            };
            let mut table = self.write();
            if table.version != version {
                continue;
            }
            return Ok(table.take(index).map(|entry| entry.value));
        }
        Err(ExcType::runtime_error_dict_mutated_during_lookup())
    }

    /// Removes and returns the most recently inserted entry.
    pub fn pop_last(&self) -> Option<(Value, Value)> {
        let mut table = self.write();
        let index = table.entries.iter().rposition(Option::is_some)?;
        table.take(index).map(|entry| (entry.key, entry.value))
    }

    pub fn clear(&self) {
        let mut table = self.write();
        if table.entries.is_empty() {
            return;
        }
        table.entries.clear();
        table.indices.clear();
        table.used = 0;
        table.version += 1;
    }

    /// The first live entry at or after slot `position`, with the slot to continue from.
    #[must_use]
    pub fn entry_at(&self, position: usize) -> Option<(usize, Value, Value)> {
        let table = self.read();
        let offset = table.entries.get(position..)?.iter().position(Option::is_some)?;
        let index = position + offset;
        let entry = table.entries[index].as_ref()?;
        Some((index + 1, entry.key.clone(), entry.value.clone()))
    }

    /// Snapshot of the keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<Value> {
        self.read().entries.iter().flatten().map(|e| e.key.clone()).collect()
    }

    /// Snapshot of the entries in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<(Value, Value)> {
        self.read()
            .entries
            .iter()
            .flatten()
            .map(|e| (e.key.clone(), e.value.clone()))
            .collect()
    }

    /// Shallow copy; keys keep their cached hashes, so no slot runs.
    #[must_use]
    pub fn copy(&self) -> Self {
        let mut copy = DictTable::default();
        for entry in self.read().entries.iter().flatten() {
            copy.push(entry.clone());
        }
        copy.version = 0;
        Self {
            table: RwLock::new(copy),
        }
    }
}

impl Value {
    /// Creates an empty `dict`.
    #[must_use]
    pub fn dict() -> Self {
        Self::from_parts(dict_type().clone(), Payload::Dict(Dict::new()))
    }
}

fn dict_of(v: &Value) -> RunResult<&Dict> {
    v.as_dict()
        .ok_or_else(|| RunError::internal("dict slot called on a non-dict payload"))
}

fn dict_get_item(container: &Value, key: &Value) -> RunResult<Value> {
    match dict_of(container)?.get(key)? {
        Some(value) => Ok(value),
        None => Err(ExcType::key_error(dispatch::repr(key)?)),
    }
}

fn dict_set_item(container: &Value, key: &Value, value: &Value) -> RunResult<()> {
    dict_of(container)?.insert(key.clone(), value.clone())?;
    Ok(())
}

fn dict_del_item(container: &Value, key: &Value) -> RunResult<()> {
    match dict_of(container)?.remove(key)? {
        Some(_) => Ok(()),
        None => Err(ExcType::key_error(dispatch::repr(key)?)),
    }
}

/// Two dicts are equal when they hold equal values under equal keys.
///
/// Runs against the live mappings; a structural change to either one while
/// values are compared is a RuntimeError.
fn dict_equal(a: &Dict, b: &Dict) -> RunResult<bool> {
    let (guard_a, guard_b) = (a.guard(), b.guard());
    if guard_a.len() != guard_b.len() {
        return Ok(false);
    }
    let mut equal = true;
    let mut position = 0;
    while let Some((next, key, value)) = a.entry_at(position) {
        position = next;
        match b.get(&key)? {
            Some(other) if same_or_equal(&value, &other)? => {}
            _ => {
                equal = false;
                break;
            }
        }
    }
    if !guard_a.check() || !guard_b.check() {
        return Err(ExcType::runtime_error_dict_changed_size());
    }
    Ok(equal)
}

fn dict_richcompare(op: CompareOp, a: &Value, b: &Value) -> RunResult<Value> {
    let (Some(x), Some(y)) = (a.as_dict(), b.as_dict()) else {
        return Ok(Value::not_implemented());
    };
    match op {
        CompareOp::Eq => Ok(Value::bool(a.is(b) || dict_equal(x, y)?)),
        CompareOp::Ne => Ok(Value::bool(!(a.is(b) || dict_equal(x, y)?))),
        _ => Ok(Value::not_implemented()),
    }
}

fn dict_repr(v: &Value) -> RunResult<String> {
    let mut out = String::from("{");
    for (i, (key, value)) in dict_of(v)?.items().iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{}: {}", dispatch::repr(key)?, dispatch::repr(value)?);
    }
    out.push('}');
    Ok(out)
}

/// The builtin `dict` type.
pub fn dict_type() -> &'static TypeRef {
    static TYPE: LazyLock<TypeRef> = LazyLock::new(|| {
        let mut slots = Slots {
            repr: Some(Arc::new(dict_repr)),
            len: Some(Arc::new(|v: &Value| Ok(dict_of(v)?.len()))),
            contains: Some(Arc::new(|v: &Value, key: &Value| dict_of(v)?.contains_key(key))),
            get_item: binary(dict_get_item),
            set_item: Some(Arc::new(dict_set_item)),
            del_item: Some(Arc::new(dict_del_item)),
            iter: Some(Arc::new(|v: &Value| Ok(SeqIter::start(v)))),
            native: Some(Arc::new(|v: &Value| {
                let items = dict_of(v)?.items();
                let pairs = items
                    .iter()
                    .map(|(k, v)| Ok((dispatch::to_object(k)?, dispatch::to_object(v)?)))
                    .collect::<RunResult<_>>()?;
                Ok(Object::Dict(pairs))
            })),
            ..Slots::default()
        };
        install_rich(&mut slots, dict_richcompare);
        Type::builtin("dict", vec![object_type().clone()], slots)
    });
    &TYPE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removal_keeps_positions_until_compaction() {
        let dict = Dict::new();
        for i in 0..4 {
            dict.insert(Value::int(i), Value::int(i * 10)).unwrap();
        }
        dict.remove(&Value::int(1)).unwrap();
        let (next, key, value) = dict.entry_at(1).unwrap();
        assert_eq!((next, key.as_int(), value.as_int()), (3, Some(2), Some(20)));
        assert_eq!(dict.len(), 3);
    }

    #[test]
    fn compaction_preserves_order() {
        let dict = Dict::new();
        for i in 0..20 {
            dict.insert(Value::int(i), Value::none()).unwrap();
        }
        for i in 0..15 {
            dict.remove(&Value::int(i)).unwrap();
        }
        let keys: Vec<i64> = dict.keys().iter().filter_map(Value::as_int).collect();
        assert_eq!(keys, [15, 16, 17, 18, 19]);
        assert!(dict.contains_key(&Value::int(17)).unwrap());
        assert!(!dict.contains_key(&Value::int(3)).unwrap());
    }

    #[test]
    fn replacing_a_value_keeps_the_version() {
        let dict = Dict::new();
        dict.insert(Value::str("k"), Value::int(1)).unwrap();
        let guard = dict.guard();
        let old = dict.insert(Value::str("k"), Value::int(2)).unwrap();
        assert_eq!(old.and_then(|v| v.as_int()), Some(1));
        assert!(guard.check());
        dict.insert(Value::str("j"), Value::int(3)).unwrap();
        assert!(!guard.check());
    }

    #[test]
    fn equal_numbers_are_one_key() {
        let dict = Dict::new();
        dict.insert(Value::int(1), Value::str("int")).unwrap();
        dict.insert(Value::float(1.0), Value::str("float")).unwrap();
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.get(&Value::long(1)).unwrap().unwrap().as_str(), Some("float"));
    }
}
