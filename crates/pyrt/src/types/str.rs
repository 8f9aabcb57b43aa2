//! Immutable text: the `str` type.

use std::{
    fmt::Write,
    sync::{Arc, LazyLock},
};

use super::{
    Slots, Type, TypeRef,
    base::object_type,
    iter::SeqIter,
    r#type::binary,
    repeat_target_len, sequence_index,
};
use crate::{
    dispatch::compare::{Comparison, install_ordering},
    exception_private::{ExcType, RunResult},
    object::Object,
    py_hash::hash_bytes,
    resource::concat_len,
    value::Value,
};

/// Payload of a `str` value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Str(Box<str>);

impl Str {
    #[must_use]
    pub fn new(s: String) -> Self {
        Self(s.into_boxed_str())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in characters.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }
}

impl From<&str> for Str {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

/// Writes a CPython-compatible repr string for text to a formatter.
///
/// Format: `'...'` or `"..."` depending on content.
/// - Uses single quotes by default
/// - Switches to double quotes if the text contains `'` but not `"`
/// - Escapes: `\\`, `\t`, `\n`, `\r`, `\xNN` for other control characters
pub fn string_repr_fmt(s: &str, f: &mut impl Write) -> std::fmt::Result {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    f.write_char(quote)?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\t' => f.write_str("\\t")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            c if c == quote => {
                f.write_char('\\')?;
                f.write_char(c)?;
            }
            c if c.is_control() => {
                let code = u32::from(c);
                if code < 0x100 {
                    write!(f, "\\x{code:02x}")?;
                } else {
                    write!(f, "\\u{code:04x}")?;
                }
            }
            c => f.write_char(c)?,
        }
    }
    f.write_char(quote)
}

#[must_use]
pub fn string_repr(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 2);
    // writing to a String cannot fail
    let _ = string_repr_fmt(s, &mut result);
    result
}

fn str_add(a: &Value, b: &Value) -> RunResult<Value> {
    match (a.as_str(), b.as_str()) {
        (Some(x), Some(y)) => {
            let mut joined = String::with_capacity(concat_len(x.len(), y.len())?);
            joined.push_str(x);
            joined.push_str(y);
            Ok(Value::str(joined))
        }
        _ => Ok(Value::not_implemented()),
    }
}

/// `s * n`, also serving `n * s` through the reflected slot.
fn str_repeat(seq: &Value, count: &Value) -> RunResult<Value> {
    let Some(s) = seq.as_str() else {
        return Ok(Value::not_implemented());
    };
    let Some(total) = repeat_target_len(s.len(), count)? else {
        return Ok(Value::not_implemented());
    };
    if s.is_empty() || total == 0 {
        return Ok(Value::str(String::new()));
    }
    Ok(Value::str(s.repeat(total / s.len())))
}

fn str_compare(a: &Value, b: &Value) -> RunResult<Comparison> {
    Ok(match (a.as_str(), b.as_str()) {
        // UTF-8 byte order is code point order
        (Some(x), Some(y)) => Comparison::Ordered(x.cmp(y)),
        _ => Comparison::NotImplemented,
    })
}

fn str_contains(container: &Value, item: &Value) -> RunResult<bool> {
    let haystack = container.as_str().unwrap_or_default();
    match item.as_str() {
        Some(needle) => Ok(haystack.contains(needle)),
        None => Err(ExcType::type_error(format_args!(
            "'in <string>' requires string as left operand, not {}",
            item.type_name()
        ))),
    }
}

fn str_get_item(container: &Value, key: &Value) -> RunResult<Value> {
    let s = container.as_str().unwrap_or_default();
    let index = sequence_index(key, s.chars().count(), "string")?;
    let c = s.chars().nth(index).ok_or_else(|| ExcType::index_error("string"))?;
    Ok(Value::str(c.to_string()))
}

/// The builtin `str` type.
pub fn str_type() -> &'static TypeRef {
    static TYPE: LazyLock<TypeRef> = LazyLock::new(|| {
        let mut slots = Slots {
            add: binary(str_add),
            mul: binary(str_repeat),
            rmul: binary(str_repeat),
            hash: Some(Arc::new(|v: &Value| Ok(hash_bytes(v.as_str().unwrap_or_default().as_bytes())))),
            repr: Some(Arc::new(|v: &Value| Ok(string_repr(v.as_str().unwrap_or_default())))),
            len: Some(Arc::new(|v: &Value| Ok(v.as_str().map_or(0, |s| s.chars().count())))),
            contains: Some(Arc::new(str_contains)),
            get_item: binary(str_get_item),
            iter: Some(Arc::new(|v: &Value| Ok(SeqIter::start(v)))),
            native: Some(Arc::new(|v: &Value| Ok(Object::String(v.as_str().unwrap_or_default().to_owned())))),
            ..Slots::default()
        };
        install_ordering(&mut slots, str_compare);
        Type::builtin("str", vec![object_type().clone()], slots)
    });
    &TYPE
}
