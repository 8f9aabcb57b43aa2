//! Iterators over the builtin collections.
//!
//! A [`SeqIter`] walks its source by position. Tuples and strings cannot
//! change underneath it; a bytearray is read live, so appends during
//! iteration are seen. Dict and set iteration snapshots the mapping's version
//! and length when it starts and fails with RuntimeError once either moves.

use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use super::{Slots, Type, TypeRef, base::object_type};
use crate::{
    exception_private::{ExcType, RunError, RunResult},
    value::{Payload, Value},
};

#[derive(Debug)]
struct Cursor {
    position: usize,
    exhausted: bool,
}

/// Payload of an `iterator` value.
#[derive(Debug)]
pub struct SeqIter {
    source: Value,
    /// Version and length of a dict or set source when iteration began.
    snapshot: Option<(u64, usize)>,
    cursor: Mutex<Cursor>,
}

impl SeqIter {
    /// Creates an iterator value positioned at the start of `source`.
    pub(crate) fn start(source: &Value) -> Value {
        let snapshot = match source.payload() {
            Payload::Dict(d) => Some((d.version(), d.len())),
            Payload::Set(s) | Payload::FrozenSet(s) => Some((s.dict().version(), s.len())),
            _ => None,
        };
        let iter = Self {
            source: source.clone(),
            snapshot,
            cursor: Mutex::new(Cursor {
                position: 0,
                exhausted: false,
            }),
        };
        Value::from_parts(iterator_type().clone(), Payload::Iterator(iter))
    }

    /// The collection being iterated.
    #[must_use]
    pub fn source(&self) -> &Value {
        &self.source
    }

    /// Produces the next element, or StopIteration once the source is exhausted.
    pub fn next(&self) -> RunResult<Value> {
        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        if cursor.exhausted {
            return Err(ExcType::stop_iteration());
        }
        match self.advance(&mut cursor) {
            Ok(Some(item)) => Ok(item),
            Ok(None) => {
                cursor.exhausted = true;
                Err(ExcType::stop_iteration())
            }
            Err(err) => {
                cursor.exhausted = true;
                Err(err)
            }
        }
    }

    fn advance(&self, cursor: &mut Cursor) -> RunResult<Option<Value>> {
        let position = cursor.position;
        match self.source.payload() {
            Payload::Tuple(t) => {
                let item = t.as_slice().get(position).cloned();
                cursor.position += 1;
                Ok(item)
            }
            Payload::Str(s) => {
                let Some(c) = s.as_str().get(position..).and_then(|rest| rest.chars().next()) else {
                    return Ok(None);
                };
                cursor.position += c.len_utf8();
                Ok(Some(Value::str(c.to_string())))
            }
            Payload::ByteArray(b) => {
                let byte = b.get(position);
                cursor.position += 1;
                Ok(byte.map(|byte| Value::int(i64::from(byte))))
            }
            Payload::Dict(d) => {
                self.check_snapshot(d.version(), d.len(), ExcType::runtime_error_dict_changed_size)?;
                Ok(d.entry_at(position).map(|(next, key, _)| {
                    cursor.position = next;
                    key
                }))
            }
            Payload::Set(s) | Payload::FrozenSet(s) => {
                self.check_snapshot(s.dict().version(), s.len(), ExcType::runtime_error_set_changed_size)?;
                Ok(s.dict().entry_at(position).map(|(next, key, _)| {
                    cursor.position = next;
                    key
                }))
            }
            _ => Err(RunError::internal("iterator over a non-iterable payload")),
        }
    }

    fn check_snapshot(&self, version: u64, len: usize, error: fn() -> RunError) -> RunResult<()> {
        match self.snapshot {
            Some(snapshot) if snapshot != (version, len) => Err(error()),
            _ => Ok(()),
        }
    }
}

/// Type of every builtin collection iterator.
pub fn iterator_type() -> &'static TypeRef {
    static TYPE: LazyLock<TypeRef> = LazyLock::new(|| {
        Type::builtin(
            "iterator",
            vec![object_type().clone()],
            Slots {
                iter: Some(Arc::new(|v: &Value| Ok(v.clone()))),
                next: Some(Arc::new(|v: &Value| match v.payload() {
                    Payload::Iterator(iter) => iter.next(),
                    _ => Err(ExcType::type_error_not_iterator(v.type_name())),
                })),
                ..object_type().slots().clone()
            },
        )
    });
    &TYPE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(iterator: &Value) -> Vec<Value> {
        let mut items = Vec::new();
        loop {
            match crate::dispatch::next(iterator) {
                Ok(item) => items.push(item),
                Err(err) => {
                    assert!(err.is_stop_iteration(), "unexpected error {err}");
                    return items;
                }
            }
        }
    }

    #[test]
    fn string_iteration_yields_characters() {
        let it = SeqIter::start(&Value::str("h\u{e9}!"));
        let chars: Vec<String> = drain(&it).iter().map(|c| c.as_str().unwrap().to_owned()).collect();
        assert_eq!(chars, ["h", "\u{e9}", "!"]);
        // exhausted iterators stay exhausted
        assert!(crate::dispatch::next(&it).unwrap_err().is_stop_iteration());
    }

    #[test]
    fn iterator_is_its_own_iterator() {
        let it = SeqIter::start(&Value::tuple(vec![Value::int(1)]));
        assert!(crate::dispatch::iter(&it).unwrap().is(&it));
    }
}
