//! The mutable `bytearray` type.
//!
//! Contents sit behind a reader/writer lock. An operation never holds two
//! bytearray locks at once: whenever a second buffer is involved (comparison,
//! concatenation, `+=`) its bytes are copied out under its own lock first.
//! That also makes `b += b` safe.

use std::{
    fmt::Write,
    sync::{Arc, LazyLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use super::{
    Slots, Type, TypeRef,
    base::object_type,
    iter::SeqIter,
    r#type::{binary, reflected},
    repeat_target_len, sequence_index,
};
use crate::{
    dispatch::compare::{Comparison, install_ordering},
    exception_private::{ExcType, RunError, RunResult},
    object::Object,
    resource::concat_len,
    value::{Payload, Value},
};

/// Payload of a `bytearray` value.
#[derive(Debug, Default)]
pub struct ByteArray {
    bytes: RwLock<Vec<u8>>,
}

impl ByteArray {
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: RwLock::new(bytes),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<u8>> {
        self.bytes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<u8>> {
        self.bytes.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current contents.
    #[must_use]
    pub fn to_vec(&self) -> Vec<u8> {
        self.read().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    #[must_use]
    pub fn get(&self, position: usize) -> Option<u8> {
        self.read().get(position).copied()
    }

    /// Stores `byte` at a possibly negative `index`.
    pub fn set(&self, index: &Value, byte: u8) -> RunResult<()> {
        let mut bytes = self.write();
        let position = sequence_index(index, bytes.len(), "bytearray")?;
        bytes[position] = byte;
        Ok(())
    }

    /// Removes the byte at a possibly negative `index`.
    pub fn delete(&self, index: &Value) -> RunResult<u8> {
        let mut bytes = self.write();
        let position = sequence_index(index, bytes.len(), "bytearray")?;
        Ok(bytes.remove(position))
    }

    pub fn append(&self, byte: u8) {
        self.write().push(byte);
    }

    pub fn extend(&self, more: &[u8]) {
        self.write().extend_from_slice(more);
    }

    /// Decodes the contents as UTF-8.
    pub fn decode(&self) -> RunResult<String> {
        let bytes = self.to_vec();
        String::from_utf8(bytes).map_err(|err| {
            let position = err.utf8_error().valid_up_to();
            let byte = err.as_bytes()[position];
            ExcType::value_error(format_args!(
                "'utf8' codec can't decode byte {byte:#04x} in position {position}"
            ))
        })
    }
}

impl Value {
    /// Creates a `bytearray` holding `bytes`.
    #[must_use]
    pub fn bytearray(bytes: Vec<u8>) -> Self {
        Self::from_parts(bytearray_type().clone(), Payload::ByteArray(ByteArray::new(bytes)))
    }
}

/// Writes a CPython-compatible bytes literal such as `b'a\x00'`.
///
/// Double quotes are used when the bytes contain `'` but not `"`.
pub fn bytes_repr_fmt(bytes: &[u8], f: &mut impl Write) -> std::fmt::Result {
    let quote = if bytes.contains(&b'\'') && !bytes.contains(&b'"') { '"' } else { '\'' };
    f.write_char('b')?;
    f.write_char(quote)?;
    for &byte in bytes {
        match byte {
            b'\\' => f.write_str("\\\\")?,
            b'\t' => f.write_str("\\t")?,
            b'\n' => f.write_str("\\n")?,
            b'\r' => f.write_str("\\r")?,
            b'\'' if quote == '\'' => f.write_str("\\'")?,
            b'"' if quote == '"' => f.write_str("\\\"")?,
            0x20..=0x7e => f.write_char(char::from(byte))?,
            _ => write!(f, "\\x{byte:02x}")?,
        }
    }
    f.write_char(quote)
}

/// Bytes of a bytearray or text operand, copied out of any lock.
fn bytes_of(v: &Value) -> Option<Vec<u8>> {
    match v.payload() {
        Payload::ByteArray(b) => Some(b.to_vec()),
        Payload::Str(s) => Some(s.as_str().as_bytes().to_vec()),
        _ => None,
    }
}

fn array_of(v: &Value) -> RunResult<&ByteArray> {
    v.as_bytearray()
        .ok_or_else(|| RunError::internal("bytearray slot called on a non-bytearray payload"))
}

/// Converts an integer operand into a byte value.
fn byte_value(v: &Value) -> RunResult<u8> {
    match v.payload() {
        Payload::Int(i) => u8::try_from(*i).map_err(|_| ExcType::value_error_byte_range()),
        Payload::Long(_) => Err(ExcType::value_error_byte_range()),
        _ => Err(ExcType::type_error("an integer or string of size 1 is required")),
    }
}

/// `a + b` where either side is a bytearray and the other a bytearray or str.
fn bytearray_add(a: &Value, b: &Value) -> RunResult<Value> {
    if a.as_bytearray().is_none() && b.as_bytearray().is_none() {
        return Ok(Value::not_implemented());
    }
    match (bytes_of(a), bytes_of(b)) {
        (Some(mut x), Some(y)) => {
            concat_len(x.len(), y.len())?;
            x.extend_from_slice(&y);
            Ok(Value::bytearray(x))
        }
        _ => Ok(Value::not_implemented()),
    }
}

fn bytearray_iadd(a: &Value, b: &Value) -> RunResult<Value> {
    let Some(more) = bytes_of(b) else {
        return Ok(Value::not_implemented());
    };
    let array = array_of(a)?;
    concat_len(array.len(), more.len())?;
    array.extend(&more);
    Ok(a.clone())
}

/// `b * n`, also serving `n * b` through the reflected slot.
fn bytearray_repeat(seq: &Value, count: &Value) -> RunResult<Value> {
    let bytes = array_of(seq)?.to_vec();
    let Some(total) = repeat_target_len(bytes.len(), count)? else {
        return Ok(Value::not_implemented());
    };
    Ok(Value::bytearray(bytes.iter().copied().cycle().take(total).collect()))
}

fn bytearray_irepeat(seq: &Value, count: &Value) -> RunResult<Value> {
    let array = array_of(seq)?;
    let mut bytes = array.write();
    let Some(total) = repeat_target_len(bytes.len(), count)? else {
        return Ok(Value::not_implemented());
    };
    let repeated: Vec<u8> = bytes.iter().copied().cycle().take(total).collect();
    *bytes = repeated;
    drop(bytes);
    Ok(seq.clone())
}

fn bytearray_compare(a: &Value, b: &Value) -> RunResult<Comparison> {
    let Some(x) = a.as_bytearray() else {
        return Ok(Comparison::NotImplemented);
    };
    let Some(other) = bytes_of(b) else {
        return Ok(Comparison::NotImplemented);
    };
    Ok(Comparison::Ordered(x.read().as_slice().cmp(other.as_slice())))
}

fn bytearray_contains(container: &Value, item: &Value) -> RunResult<bool> {
    let haystack = array_of(container)?;
    if let Some(needle) = bytes_of(item) {
        if needle.is_empty() {
            return Ok(true);
        }
        return Ok(haystack.read().windows(needle.len()).any(|w| w == needle.as_slice()));
    }
    let byte = byte_value(item)?;
    Ok(haystack.read().contains(&byte))
}

fn bytearray_get_item(container: &Value, key: &Value) -> RunResult<Value> {
    let bytes = array_of(container)?.read();
    let position = sequence_index(key, bytes.len(), "bytearray")?;
    Ok(Value::int(i64::from(bytes[position])))
}

fn bytearray_set_item(container: &Value, key: &Value, value: &Value) -> RunResult<()> {
    let byte = match value.payload() {
        Payload::Int(_) | Payload::Long(_) => byte_value(value)?,
        _ => return Err(ExcType::type_error("an integer is required")),
    };
    array_of(container)?.set(key, byte)
}

fn bytearray_repr(v: &Value) -> RunResult<String> {
    let mut out = String::from("bytearray(");
    // writing to a String cannot fail
    let _ = bytes_repr_fmt(&array_of(v)?.read(), &mut out);
    out.push(')');
    Ok(out)
}

/// The builtin `bytearray` type. Mutable, so it has no hash slot.
pub fn bytearray_type() -> &'static TypeRef {
    static TYPE: LazyLock<TypeRef> = LazyLock::new(|| {
        let mut slots = Slots {
            add: binary(bytearray_add),
            radd: reflected(bytearray_add),
            iadd: binary(bytearray_iadd),
            mul: binary(bytearray_repeat),
            rmul: binary(bytearray_repeat),
            imul: binary(bytearray_irepeat),
            repr: Some(Arc::new(bytearray_repr)),
            len: Some(Arc::new(|v: &Value| Ok(array_of(v)?.len()))),
            contains: Some(Arc::new(bytearray_contains)),
            get_item: binary(bytearray_get_item),
            set_item: Some(Arc::new(bytearray_set_item)),
            del_item: Some(Arc::new(|v: &Value, key: &Value| array_of(v)?.delete(key).map(drop))),
            iter: Some(Arc::new(|v: &Value| Ok(SeqIter::start(v)))),
            native: Some(Arc::new(|v: &Value| Ok(Object::Bytes(array_of(v)?.to_vec())))),
            ..Slots::default()
        };
        install_ordering(&mut slots, bytearray_compare);
        Type::builtin("bytearray", vec![object_type().clone()], slots)
    });
    &TYPE
}
