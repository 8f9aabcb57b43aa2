//! Builtin types of the runtime object model.
//!
//! Each submodule owns one builtin type: its payload struct (if any), the
//! `*_type()` accessor returning the process-wide type descriptor, and the
//! slot functions wired into that descriptor. `type` holds the descriptor and
//! slot table shared by all of them.

pub mod base;
pub mod bytes;
pub mod complex;
pub mod dict;
pub mod float;
pub mod generator;
pub mod int;
pub mod iter;
pub mod long_int;
pub mod set;
pub mod str;
pub mod tuple;
pub mod r#type;

pub use bytes::ByteArray;
pub use complex::{Complex, parse_complex};
pub use dict::{Dict, DictGuard};
pub use generator::{Generator, GeneratorBody, GeneratorState};
pub use iter::SeqIter;
pub use long_int::LongInt;
pub use set::SetStorage;
pub use str::Str;
pub use tuple::Tuple;
pub use r#type::{
    BinarySlot, BoolSlot, ContainsSlot, DelItemSlot, HashSlot, LenSlot, NativeSlot, ReprSlot, SetItemSlot, Slots,
    Type, TypeRef, UnarySlot,
};

use crate::{
    exception_private::{ExcType, RunResult},
    resource::repeat_len,
    value::{Payload, Value},
};

/// Resolves a possibly negative sequence index against `len`.
///
/// `container` names the sequence in error messages (`tuple`, `string`, ...).
pub(crate) fn sequence_index(index: &Value, len: usize, container: &str) -> RunResult<usize> {
    let position = match index.payload() {
        Payload::Int(i) => *i,
        // no sequence is long enough for a long index
        Payload::Long(_) => return Err(ExcType::index_error(container)),
        _ => return Err(ExcType::type_error_indices(container, index.type_name())),
    };
    let len_i64 = i64::try_from(len).unwrap_or(i64::MAX);
    let resolved = if position < 0 { position + len_i64 } else { position };
    if (0..len_i64).contains(&resolved) {
        Ok(usize::try_from(resolved).unwrap_or(usize::MAX))
    } else {
        Err(ExcType::index_error(container))
    }
}

/// Output length of `seq * count`, or `None` when `count` is not an integer.
pub(crate) fn repeat_target_len(len: usize, count: &Value) -> RunResult<Option<usize>> {
    let count = match count.payload() {
        Payload::Int(i) => *i,
        Payload::Long(l) if l.is_negative() => 0,
        Payload::Long(_) => return Err(ExcType::overflow_repeat_count()),
        _ => return Ok(None),
    };
    Ok(Some(repeat_len(len, count)?))
}
