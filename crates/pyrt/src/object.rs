use std::{
    fmt::{self, Write},
    hash::{Hash, Hasher},
};

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

use crate::{
    exception_private::RunResult,
    types::{bytes::bytes_repr_fmt, float::float_repr, str::string_repr_fmt},
    value::Value,
};

/// An owned snapshot of a runtime value.
///
/// This is the public-facing type for moving data in and out of the runtime.
/// It owns all its data and can be freely cloned, serialized, or stored.
/// Conversion from a [`Value`] goes through the value type's `native` slot;
/// values whose type defines no such slot become [`Object::Repr`].
///
/// # Input vs Output Variants
///
/// Every variant except `Repr` can be turned back into a [`Value`] with
/// [`Object::into_value`]. `Repr` is output-only.
///
/// # Hashability
///
/// The Rust `Hash` impl is total so objects can key Rust maps. Python-level
/// hashability is enforced by the runtime's `hash` protocol instead.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Object {
    #[serde(alias = "none", alias = "NoneType")]
    None,
    #[serde(alias = "bool")]
    Bool(bool),
    /// Machine-width `int`.
    #[serde(alias = "int")]
    Int(i64),
    /// Arbitrary-precision `long`.
    #[serde(alias = "long")]
    BigInt(BigInt),
    #[serde(alias = "float")]
    Float(f64),
    #[serde(alias = "complex")]
    Complex { real: f64, imag: f64 },
    #[serde(alias = "str")]
    String(String),
    /// Contents of a `bytearray`.
    #[serde(alias = "bytearray")]
    Bytes(Vec<u8>),
    #[serde(alias = "tuple")]
    Tuple(Vec<Self>),
    /// Dictionary entries in insertion order.
    #[serde(alias = "dict")]
    Dict(Vec<(Self, Self)>),
    #[serde(alias = "set")]
    Set(Vec<Self>),
    #[serde(alias = "frozenset")]
    FrozenSet(Vec<Self>),
    /// Fallback for values that cannot be represented as other variants.
    ///
    /// Contains the `repr()` string of the original value.
    Repr(String),
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            _ => self.repr_fmt(f),
        }
    }
}

impl Object {
    /// Snapshots a value through the dispatch engine's `to_object` protocol.
    pub fn from_value(value: &Value) -> RunResult<Self> {
        crate::dispatch::to_object(value)
    }

    /// Builds a runtime value from this object.
    ///
    /// # Errors
    /// Returns TypeError for [`Object::Repr`], and any error raised while
    /// hashing set members or dict keys.
    pub fn into_value(self) -> RunResult<Value> {
        Ok(match self {
            Self::None => Value::none(),
            Self::Bool(b) => Value::bool(b),
            Self::Int(i) => Value::int(i),
            Self::BigInt(bi) => Value::long(bi),
            Self::Float(f) => Value::float(f),
            Self::Complex { real, imag } => Value::complex(real, imag),
            Self::String(s) => Value::str(s),
            Self::Bytes(b) => Value::bytearray(b),
            Self::Tuple(items) => Value::tuple(items.into_iter().map(Self::into_value).collect::<RunResult<Vec<_>>>()?),
            Self::Dict(pairs) => {
                let dict = Value::dict();
                for (k, v) in pairs {
                    crate::dispatch::set_item(&dict, &k.into_value()?, &v.into_value()?)?;
                }
                dict
            }
            Self::Set(items) => Value::set(items.into_iter().map(Self::into_value).collect::<RunResult<Vec<_>>>()?)?,
            Self::FrozenSet(items) => {
                Value::frozenset(items.into_iter().map(Self::into_value).collect::<RunResult<Vec<_>>>()?)?
            }
            Self::Repr(_) => return Err(crate::exception_private::ExcType::type_error("'repr' is not a valid input value")),
        })
    }

    /// Returns a repr string matching what the runtime would print.
    #[must_use]
    pub fn py_repr(&self) -> String {
        let mut s = String::new();
        // writing to a String cannot fail
        let _ = self.repr_fmt(&mut s);
        s
    }

    fn repr_fmt(&self, f: &mut impl Write) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(v) => write!(f, "{v}"),
            Self::BigInt(v) => write!(f, "{v}L"),
            Self::Float(v) => f.write_str(&float_repr(*v)),
            Self::Complex { real, imag } => f.write_str(&crate::types::Complex::new(*real, *imag).repr()),
            Self::String(s) => string_repr_fmt(s, f),
            Self::Bytes(b) => {
                f.write_str("bytearray(")?;
                bytes_repr_fmt(b, f)?;
                f.write_char(')')
            }
            Self::Tuple(items) => {
                f.write_char('(')?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.repr_fmt(f)?;
                }
                if items.len() == 1 {
                    f.write_char(',')?;
                }
                f.write_char(')')
            }
            Self::Dict(pairs) => {
                f.write_char('{')?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    k.repr_fmt(f)?;
                    f.write_str(": ")?;
                    v.repr_fmt(f)?;
                }
                f.write_char('}')
            }
            Self::Set(items) => Self::set_repr_fmt("set", items, f),
            Self::FrozenSet(items) => Self::set_repr_fmt("frozenset", items, f),
            Self::Repr(s) => f.write_str(s),
        }
    }

    fn set_repr_fmt(name: &str, items: &[Self], f: &mut impl Write) -> fmt::Result {
        f.write_str(name)?;
        f.write_char('(')?;
        if !items.is_empty() {
            f.write_char('[')?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                item.repr_fmt(f)?;
            }
            f.write_char(']')?;
        }
        f.write_char(')')
    }

    /// Returns `true` if this object would be truthy in the runtime.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::BigInt(bi) => !bi.is_zero(),
            Self::Float(f) => *f != 0.0,
            Self::Complex { real, imag } => *real != 0.0 || *imag != 0.0,
            Self::String(s) => !s.is_empty(),
            Self::Bytes(b) => !b.is_empty(),
            Self::Tuple(t) => !t.is_empty(),
            Self::Dict(d) => !d.is_empty(),
            Self::Set(s) | Self::FrozenSet(s) => !s.is_empty(),
            Self::Repr(_) => true,
        }
    }

    /// Returns the runtime type name for this object.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::BigInt(_) => "long",
            Self::Float(_) => "float",
            Self::Complex { .. } => "complex",
            Self::String(_) => "str",
            Self::Bytes(_) => "bytearray",
            Self::Tuple(_) => "tuple",
            Self::Dict(_) => "dict",
            Self::Set(_) => "set",
            Self::FrozenSet(_) => "frozenset",
            Self::Repr(_) => "repr",
        }
    }
}

impl Hash for Object {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Int and BigInt share a discriminant so equal numbers hash alike
        match self {
            Self::Int(_) | Self::BigInt(_) => std::mem::discriminant(&Self::Int(0)).hash(state),
            _ => std::mem::discriminant(self).hash(state),
        }

        match self {
            Self::None => {}
            Self::Bool(b) => b.hash(state),
            Self::Int(i) => i.hash(state),
            Self::BigInt(bi) => match bi.to_i64() {
                Some(i) => i.hash(state),
                None => bi.to_signed_bytes_le().hash(state),
            },
            Self::Float(f) => f.to_bits().hash(state),
            Self::Complex { real, imag } => {
                real.to_bits().hash(state);
                imag.to_bits().hash(state);
            }
            Self::String(s) | Self::Repr(s) => s.hash(state),
            Self::Bytes(b) => b.hash(state),
            Self::Tuple(items) | Self::Set(items) | Self::FrozenSet(items) => items.hash(state),
            Self::Dict(pairs) => pairs.hash(state),
        }
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::BigInt(a), Self::BigInt(b)) => a == b,
            (Self::Int(a), Self::BigInt(b)) | (Self::BigInt(b), Self::Int(a)) => BigInt::from(*a) == *b,
            // bitwise so that Eq agrees with Hash
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (
                Self::Complex { real: ar, imag: ai },
                Self::Complex { real: br, imag: bi },
            ) => ar.to_bits() == br.to_bits() && ai.to_bits() == bi.to_bits(),
            (Self::String(a), Self::String(b)) | (Self::Repr(a), Self::Repr(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Tuple(a), Self::Tuple(b)) | (Self::Set(a), Self::Set(b)) | (Self::FrozenSet(a), Self::FrozenSet(b)) => {
                a == b
            }
            (Self::Dict(a), Self::Dict(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Object {}

/// Error returned when an `Object` cannot be converted to the requested Rust type.
#[derive(Debug)]
pub struct ConversionError {
    pub expected: &'static str,
    pub actual: &'static str,
}

impl ConversionError {
    #[must_use]
    pub fn new(expected: &'static str, actual: &'static str) -> Self {
        Self { expected, actual }
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {}, got {}", self.expected, self.actual)
    }
}

impl std::error::Error for ConversionError {}

impl TryFrom<&Object> for i64 {
    type Error = ConversionError;

    fn try_from(value: &Object) -> Result<Self, Self::Error> {
        match value {
            Object::Int(i) => Ok(*i),
            Object::BigInt(bi) => bi.to_i64().ok_or_else(|| ConversionError::new("int", "long")),
            _ => Err(ConversionError::new("int", value.type_name())),
        }
    }
}

/// Int values convert to f64 to match the runtime's coercion.
impl TryFrom<&Object> for f64 {
    type Error = ConversionError;

    fn try_from(value: &Object) -> Result<Self, Self::Error> {
        match value {
            Object::Float(f) => Ok(*f),
            Object::Int(i) => Ok(*i as Self),
            _ => Err(ConversionError::new("float", value.type_name())),
        }
    }
}

impl TryFrom<&Object> for String {
    type Error = ConversionError;

    fn try_from(value: &Object) -> Result<Self, Self::Error> {
        if let Object::String(s) = value {
            Ok(s.clone())
        } else {
            Err(ConversionError::new("str", value.type_name()))
        }
    }
}

/// Does not apply truthiness; only `Bool` converts.
impl TryFrom<&Object> for bool {
    type Error = ConversionError;

    fn try_from(value: &Object) -> Result<Self, Self::Error> {
        match value {
            Object::Bool(b) => Ok(*b),
            _ => Err(ConversionError::new("bool", value.type_name())),
        }
    }
}
