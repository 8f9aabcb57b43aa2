use std::{borrow::Cow, fmt};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Result type alias for operations that can produce a runtime error.
pub type RunResult<T> = Result<T, RunError>;

/// Exception kinds produced by the object model.
///
/// Uses strum derives for automatic `Display`, `FromStr`, and `Into<&'static str>` implementations.
/// The string representation matches the variant name exactly (e.g., `ValueError` -> "ValueError").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
pub enum ExcType {
    /// Base class of every kind below.
    Exception,

    // --- ArithmeticError hierarchy ---
    /// Intermediate class for arithmetic errors.
    ArithmeticError,
    /// Subclass of ArithmeticError.
    OverflowError,
    /// Subclass of ArithmeticError.
    ZeroDivisionError,

    // --- LookupError hierarchy ---
    /// Intermediate class for lookup errors.
    LookupError,
    /// Subclass of LookupError.
    IndexError,
    /// Subclass of LookupError.
    KeyError,

    // --- Standalone exception types ---
    MemoryError,
    RuntimeError,
    StopIteration,
    TypeError,
    ValueError,
}

impl ExcType {
    /// Checks if this exception type is a subclass of another exception type.
    ///
    /// - `Exception` is the base class for all kinds
    /// - `LookupError` is the base for `KeyError` and `IndexError`
    /// - `ArithmeticError` is the base for `ZeroDivisionError` and `OverflowError`
    ///
    /// Returns true if `self` would be caught by `except handler_type:`.
    #[must_use]
    pub fn is_subclass_of(self, handler_type: Self) -> bool {
        if self == handler_type {
            return true;
        }
        match handler_type {
            Self::Exception => true,
            Self::LookupError => matches!(self, Self::KeyError | Self::IndexError),
            Self::ArithmeticError => matches!(self, Self::ZeroDivisionError | Self::OverflowError),
            _ => false,
        }
    }

    /// Creates a TypeError with a custom message.
    #[must_use]
    pub(crate) fn type_error(msg: impl fmt::Display) -> RunError {
        SimpleException::new_msg(Self::TypeError, msg).into()
    }

    /// Creates a ValueError with a custom message.
    #[must_use]
    pub(crate) fn value_error(msg: impl fmt::Display) -> RunError {
        SimpleException::new_msg(Self::ValueError, msg).into()
    }

    /// `unsupported operand type(s) for {op}: '{left}' and '{right}'`
    #[must_use]
    pub(crate) fn binary_type_error(op: &str, lhs_type: &str, rhs_type: &str) -> RunError {
        Self::type_error(format_args!(
            "unsupported operand type(s) for {op}: '{lhs_type}' and '{rhs_type}'"
        ))
    }

    /// Creates a TypeError for unsupported unary operations.
    ///
    /// Uses CPython's format: `bad operand type for unary {op}: '{type}'`
    #[must_use]
    pub(crate) fn unary_type_error(op: &str, value_type: &str) -> RunError {
        Self::type_error(format_args!("bad operand type for unary {op}: '{value_type}'"))
    }

    #[must_use]
    pub(crate) fn type_error_unhashable(type_name: &str) -> RunError {
        Self::type_error(format_args!("unhashable type: '{type_name}'"))
    }

    #[must_use]
    pub(crate) fn type_error_not_iterable(type_name: &str) -> RunError {
        Self::type_error(format_args!("'{type_name}' object is not iterable"))
    }

    /// Membership test on a value that has neither `contains` nor `iter`.
    #[must_use]
    pub(crate) fn type_error_not_container(type_name: &str) -> RunError {
        Self::type_error(format_args!("argument of type '{type_name}' is not iterable"))
    }

    #[must_use]
    pub(crate) fn type_error_not_iterator(type_name: &str) -> RunError {
        Self::type_error(format_args!("'{type_name}' object is not an iterator"))
    }

    #[must_use]
    pub(crate) fn type_error_no_len(type_name: &str) -> RunError {
        Self::type_error(format_args!("object of type '{type_name}' has no len()"))
    }

    #[must_use]
    pub(crate) fn type_error_not_subscriptable(type_name: &str) -> RunError {
        Self::type_error(format_args!("'{type_name}' object is not subscriptable"))
    }

    #[must_use]
    pub(crate) fn type_error_no_item_assignment(type_name: &str) -> RunError {
        Self::type_error(format_args!("'{type_name}' object does not support item assignment"))
    }

    #[must_use]
    pub(crate) fn type_error_no_item_deletion(type_name: &str) -> RunError {
        Self::type_error(format_args!("'{type_name}' object does not support item deletion"))
    }

    #[must_use]
    pub(crate) fn type_error_indices(container: &str, index_type: &str) -> RunError {
        Self::type_error(format_args!(
            "{container} indices must be integers, not {index_type}"
        ))
    }

    /// Raised when a value's payload does not match the layout its type requires.
    #[must_use]
    pub(crate) fn type_error_bad_instance(type_name: &str, base_name: &str) -> RunError {
        Self::type_error(format_args!(
            "cannot create '{type_name}' instance from a '{base_name}' payload"
        ))
    }

    /// Complex numbers support equality but reject every ordering operator.
    #[must_use]
    pub(crate) fn type_error_complex_ordering() -> RunError {
        Self::type_error("no ordering relation is defined for complex numbers")
    }

    #[must_use]
    pub(crate) fn zero_division(msg: &'static str) -> RunError {
        SimpleException::new_msg(Self::ZeroDivisionError, msg).into()
    }

    /// Matches CPython's format: `ZeroDivisionError: 0.0 cannot be raised to a negative power`
    #[must_use]
    pub(crate) fn zero_negative_power() -> RunError {
        Self::zero_division("0.0 cannot be raised to a negative power")
    }

    #[must_use]
    pub(crate) fn value_error_negative_shift_count() -> RunError {
        Self::value_error("negative shift count")
    }

    #[must_use]
    pub(crate) fn value_error_negative_fractional_power() -> RunError {
        Self::value_error("negative number cannot be raised to a fractional power")
    }

    #[must_use]
    pub(crate) fn value_error_complex_malformed_string() -> RunError {
        Self::value_error("complex() arg is a malformed string")
    }

    #[must_use]
    pub(crate) fn value_error_byte_range() -> RunError {
        Self::value_error("byte must be in range(0, 256)")
    }

    #[must_use]
    pub(crate) fn overflow_error(msg: impl fmt::Display) -> RunError {
        SimpleException::new_msg(Self::OverflowError, msg).into()
    }

    /// Raised when a long cannot be represented as a float.
    #[must_use]
    pub(crate) fn overflow_long_to_float() -> RunError {
        Self::overflow_error("long int too large to convert to float")
    }

    #[must_use]
    pub(crate) fn overflow_repeat_count() -> RunError {
        Self::overflow_error("cannot fit 'long' into an index-sized integer")
    }

    /// Raised when a result would exceed the configured resource limits.
    #[must_use]
    pub(crate) fn memory_error(msg: impl fmt::Display) -> RunError {
        SimpleException::new_msg(Self::MemoryError, msg).into()
    }

    /// KeyError carries the repr of the missing key as its argument.
    #[must_use]
    pub(crate) fn key_error(key_repr: String) -> RunError {
        SimpleException::new(Self::KeyError, Some(key_repr)).into()
    }

    #[must_use]
    pub(crate) fn key_error_pop_empty_set() -> RunError {
        SimpleException::new_msg(Self::KeyError, "pop from an empty set").into()
    }

    #[must_use]
    pub(crate) fn index_error(container: &str) -> RunError {
        SimpleException::new_msg(Self::IndexError, format_args!("{container} index out of range")).into()
    }

    #[must_use]
    pub(crate) fn runtime_error_set_changed_size() -> RunError {
        SimpleException::new_msg(Self::RuntimeError, "Set changed size during iteration").into()
    }

    #[must_use]
    pub(crate) fn runtime_error_dict_changed_size() -> RunError {
        SimpleException::new_msg(Self::RuntimeError, "dictionary changed size during iteration").into()
    }

    /// Raised when a set comparison observes a mutation of either operand.
    #[must_use]
    pub(crate) fn runtime_error_set_changed_during_comparison() -> RunError {
        SimpleException::new_msg(Self::RuntimeError, "set changed during comparison").into()
    }

    /// Raised when a keyed lookup keeps observing concurrent mutations.
    #[must_use]
    pub(crate) fn runtime_error_dict_mutated_during_lookup() -> RunError {
        SimpleException::new_msg(Self::RuntimeError, "dictionary mutated during lookup").into()
    }

    #[must_use]
    pub(crate) fn stop_iteration() -> RunError {
        SimpleException::new(Self::StopIteration, None).into()
    }

    /// Creates a ValueError for attempting to re-enter a running generator.
    ///
    /// Matches CPython's format: `ValueError: generator already executing`
    #[must_use]
    pub(crate) fn generator_already_executing() -> RunError {
        Self::value_error("generator already executing")
    }

    /// Creates a TypeError for sending a non-None value to a just-started generator.
    ///
    /// Matches CPython's format: `TypeError: can't send non-None value to a just-started generator`
    #[must_use]
    pub(crate) fn generator_send_not_started() -> RunError {
        Self::type_error("can't send non-None value to a just-started generator")
    }
}

/// Simple lightweight representation of an exception: a kind and an optional argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimpleException {
    exc_type: ExcType,
    arg: Option<String>,
}

impl fmt::Display for SimpleException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.arg {
            Some(arg) => write!(f, "{}: {arg}", self.exc_type),
            None => write!(f, "{}", self.exc_type),
        }
    }
}

impl SimpleException {
    /// Creates a new exception with the given type and optional argument message.
    #[must_use]
    pub fn new(exc_type: ExcType, arg: Option<String>) -> Self {
        Self { exc_type, arg }
    }

    /// Creates a new exception with the given type and argument message.
    #[must_use]
    pub fn new_msg(exc_type: ExcType, arg: impl fmt::Display) -> Self {
        Self {
            exc_type,
            arg: Some(arg.to_string()),
        }
    }

    #[must_use]
    pub fn exc_type(&self) -> ExcType {
        self.exc_type
    }

    #[must_use]
    pub fn arg(&self) -> Option<&str> {
        self.arg.as_deref()
    }
}

/// Error produced by any dispatch, numeric or collection operation.
#[derive(Debug, Clone, PartialEq)]
pub enum RunError {
    /// A Python-level exception that callers may catch by kind.
    Exc(SimpleException),
    /// A broken internal invariant; never produced by well-formed values.
    Internal(Cow<'static, str>),
}

impl From<SimpleException> for RunError {
    fn from(exc: SimpleException) -> Self {
        Self::Exc(exc)
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exc(exc) => write!(f, "{exc}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for RunError {}

impl RunError {
    pub(crate) fn internal(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the exception kind, or `None` for internal errors.
    #[must_use]
    pub fn exc_type(&self) -> Option<ExcType> {
        match self {
            Self::Exc(exc) => Some(exc.exc_type()),
            Self::Internal(_) => None,
        }
    }

    /// Returns the human-readable message carried by the error.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Exc(exc) => exc.arg().unwrap_or(""),
            Self::Internal(msg) => msg,
        }
    }

    /// Exhaustion signal used by iterators and generators.
    #[must_use]
    pub fn is_stop_iteration(&self) -> bool {
        self.exc_type() == Some(ExcType::StopIteration)
    }

    /// Returns true if this error would be caught by `except exc_type:`.
    #[must_use]
    pub fn is_exception_type(&self, exc_type: ExcType) -> bool {
        self.exc_type().is_some_and(|t| t.is_subclass_of(exc_type))
    }
}
