//! The runtime value handle.
//!
//! A [`Value`] is a cheap, cloneable, thread-safe handle to an immutable pair
//! of (type descriptor, payload). Identity is the address of that pair; equality
//! always goes through the dispatch engine. Payloads that need mutation
//! (`bytearray`, `set`, `dict`, generators, iterators) carry their own locks.

use std::{
    any::Any,
    fmt,
    sync::{Arc, LazyLock},
};

use num_bigint::BigInt;

use crate::{
    exception_private::{ExcType, RunResult},
    types::{
        ByteArray, Complex, Dict, Generator, LongInt, SeqIter, SetStorage, Str, Tuple, TypeRef,
        base::{none_type, not_implemented_type, object_type},
        bytes::bytearray_type,
        complex::complex_type,
        dict::dict_type,
        float::float_type,
        generator::generator_type,
        int::{bool_type, int_type},
        iter::iterator_type,
        long_int::long_type,
        set::{frozenset_type, set_type},
        str::str_type,
        tuple::tuple_type,
    },
};

/// Smallest integer kept in the interned table.
pub const SMALL_INT_MIN: i64 = -5;
/// Largest integer kept in the interned table.
pub const SMALL_INT_MAX: i64 = 256;

/// Type-specific data carried by a value.
pub enum Payload {
    /// The `None` singleton.
    None,
    /// The not-implemented sentinel returned by slots to decline an operand pair.
    NotImplemented,
    /// A plain instance with no builtin data.
    Object,
    /// A plain instance carrying host data for user-defined slots.
    Opaque(Box<dyn Any + Send + Sync>),
    /// Machine-width integer; also the payload of `bool`.
    Int(i64),
    Long(LongInt),
    Float(f64),
    Complex(Complex),
    Str(Str),
    Tuple(Tuple),
    Dict(Dict),
    Set(SetStorage),
    FrozenSet(SetStorage),
    ByteArray(ByteArray),
    Generator(Generator),
    Iterator(SeqIter),
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::NotImplemented => f.write_str("NotImplemented"),
            Self::Object => f.write_str("Object"),
            Self::Opaque(_) => f.write_str("Opaque(..)"),
            Self::Int(i) => write!(f, "Int({i})"),
            Self::Long(l) => write!(f, "Long({l})"),
            Self::Float(x) => write!(f, "Float({x:?})"),
            Self::Complex(c) => write!(f, "Complex({:?}, {:?})", c.re, c.im),
            Self::Str(s) => write!(f, "Str({:?})", s.as_str()),
            Self::Tuple(t) => f.debug_tuple("Tuple").field(&t.as_slice()).finish(),
            Self::Dict(d) => write!(f, "Dict(len={})", d.len()),
            Self::Set(s) => write!(f, "Set(len={})", s.len()),
            Self::FrozenSet(s) => write!(f, "FrozenSet(len={})", s.len()),
            Self::ByteArray(b) => write!(f, "ByteArray({:?})", b.to_vec()),
            Self::Generator(g) => write!(f, "Generator({})", g.state()),
            Self::Iterator(_) => f.write_str("Iterator(..)"),
        }
    }
}

impl Payload {
    /// The builtin type whose memory layout this payload implements.
    ///
    /// A value's type must be this type or one of its subtypes.
    #[must_use]
    pub fn builtin_type(&self) -> &'static TypeRef {
        match self {
            Self::None => none_type(),
            Self::NotImplemented => not_implemented_type(),
            Self::Object | Self::Opaque(_) => object_type(),
            Self::Int(_) => int_type(),
            Self::Long(_) => long_type(),
            Self::Float(_) => float_type(),
            Self::Complex(_) => complex_type(),
            Self::Str(_) => str_type(),
            Self::Tuple(_) => tuple_type(),
            Self::Dict(_) => dict_type(),
            Self::Set(_) => set_type(),
            Self::FrozenSet(_) => frozenset_type(),
            Self::ByteArray(_) => bytearray_type(),
            Self::Generator(_) => generator_type(),
            Self::Iterator(_) => iterator_type(),
        }
    }
}

struct ValueInner {
    ty: TypeRef,
    payload: Payload,
}

/// Opaque handle to a runtime value.
#[derive(Clone)]
pub struct Value(Arc<ValueInner>);

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:?}", self.type_name(), self.payload())
    }
}

static NONE: LazyLock<Value> = LazyLock::new(|| Value::from_parts(none_type().clone(), Payload::None));
static NOT_IMPLEMENTED: LazyLock<Value> =
    LazyLock::new(|| Value::from_parts(not_implemented_type().clone(), Payload::NotImplemented));
static TRUE: LazyLock<Value> = LazyLock::new(|| Value::from_parts(bool_type().clone(), Payload::Int(1)));
static FALSE: LazyLock<Value> = LazyLock::new(|| Value::from_parts(bool_type().clone(), Payload::Int(0)));
static SMALL_INTS: LazyLock<Vec<Value>> = LazyLock::new(|| {
    (SMALL_INT_MIN..=SMALL_INT_MAX)
        .map(|i| Value::from_parts(int_type().clone(), Payload::Int(i)))
        .collect()
});

impl Value {
    /// Wraps a payload without checking that it matches the type's layout.
    pub(crate) fn from_parts(ty: TypeRef, payload: Payload) -> Self {
        Self(Arc::new(ValueInner { ty, payload }))
    }

    /// Creates an instance of `ty` carrying `payload`.
    ///
    /// Fails with TypeError unless `ty` is the payload's builtin type or a subtype of it,
    /// e.g. an `Int` payload may back an `int` subclass but not a `tuple` subclass.
    pub fn new_instance(ty: &TypeRef, payload: Payload) -> RunResult<Self> {
        let base = payload.builtin_type();
        if !ty.is_subtype(base) {
            return Err(ExcType::type_error_bad_instance(ty.name(), base.name()));
        }
        Ok(Self::from_parts(ty.clone(), payload))
    }

    /// Creates a plain instance of a user-defined type holding `data`.
    pub fn new_opaque<T: Any + Send + Sync>(ty: &TypeRef, data: T) -> RunResult<Self> {
        Self::new_instance(ty, Payload::Opaque(Box::new(data)))
    }

    #[must_use]
    pub fn none() -> Self {
        NONE.clone()
    }

    #[must_use]
    pub fn not_implemented() -> Self {
        NOT_IMPLEMENTED.clone()
    }

    #[must_use]
    pub fn bool(b: bool) -> Self {
        if b { TRUE.clone() } else { FALSE.clone() }
    }

    /// Creates an `int`, sharing the interned instance for small values.
    #[must_use]
    pub fn int(i: i64) -> Self {
        if (SMALL_INT_MIN..=SMALL_INT_MAX).contains(&i) {
            let index = usize::try_from(i - SMALL_INT_MIN).expect("small int index is non-negative");
            return SMALL_INTS[index].clone();
        }
        Self::from_parts(int_type().clone(), Payload::Int(i))
    }

    /// Creates a `long`. Longs never demote back to `int`.
    #[must_use]
    pub fn long(bi: impl Into<BigInt>) -> Self {
        Self::from_parts(long_type().clone(), Payload::Long(LongInt::new(bi.into())))
    }

    #[must_use]
    pub fn float(f: f64) -> Self {
        Self::from_parts(float_type().clone(), Payload::Float(f))
    }

    #[must_use]
    pub fn complex(re: f64, im: f64) -> Self {
        Self::from_parts(complex_type().clone(), Payload::Complex(Complex::new(re, im)))
    }

    #[must_use]
    pub fn str(s: impl Into<String>) -> Self {
        Self::from_parts(str_type().clone(), Payload::Str(Str::new(s.into())))
    }

    #[must_use]
    pub fn py_type(&self) -> &TypeRef {
        &self.0.ty
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        self.0.ty.name()
    }

    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.0.payload
    }

    /// Identity comparison (`is`).
    #[must_use]
    pub fn is(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the value, stable for its lifetime (`id()`).
    #[must_use]
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Returns true if the value's type is `ty` or a subtype of it.
    #[must_use]
    pub fn is_instance(&self, ty: &TypeRef) -> bool {
        self.0.ty.is_subtype(ty)
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self.payload(), Payload::None)
    }

    #[must_use]
    pub fn is_not_implemented(&self) -> bool {
        matches!(self.payload(), Payload::NotImplemented)
    }

    /// Returns the machine integer of an `int` (or `bool`, or subclass) value.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self.payload() {
            Payload::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_long(&self) -> Option<&BigInt> {
        match self.payload() {
            Payload::Long(l) => Some(l.inner()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self.payload() {
            Payload::Float(f) => Some(*f),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_complex(&self) -> Option<Complex> {
        match self.payload() {
            Payload::Complex(c) => Some(*c),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self.payload() {
            Payload::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self.payload() {
            Payload::Tuple(t) => Some(t.as_slice()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytearray(&self) -> Option<&ByteArray> {
        match self.payload() {
            Payload::ByteArray(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_dict(&self) -> Option<&Dict> {
        match self.payload() {
            Payload::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Returns the storage of a `set` or `frozenset` value.
    #[must_use]
    pub fn as_set_storage(&self) -> Option<&SetStorage> {
        match self.payload() {
            Payload::Set(s) | Payload::FrozenSet(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_generator(&self) -> Option<&Generator> {
        match self.payload() {
            Payload::Generator(g) => Some(g),
            _ => None,
        }
    }

    /// Borrows the host data of an opaque instance.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self.payload() {
            Payload::Opaque(data) => data.downcast_ref::<T>(),
            _ => None,
        }
    }
}
