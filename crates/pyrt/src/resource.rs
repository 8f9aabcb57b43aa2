use std::{fmt, sync::OnceLock};

use crate::exception_private::{ExcType, RunError};

/// Default cap on the size of a `long` produced by `**` or `<<`: 2^26 bits (8 MiB).
pub const DEFAULT_MAX_LONG_BITS: u64 = 1 << 26;

/// Default cap on the length of a sequence produced by repetition or concatenation.
pub const DEFAULT_MAX_SEQUENCE_LEN: usize = 1 << 28;

/// Error returned when an operation would produce a result over a configured limit.
///
/// The check runs before the result is computed, so `2L ** 10**12` fails fast
/// instead of exhausting memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// A `long` result would need more bits than allowed.
    LongBits { limit: u64, bits: u64 },
    /// A sequence result would hold more elements than allowed.
    SequenceLen { limit: usize, len: usize },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LongBits { limit, bits } => write!(f, "long result too large: {bits} bits > {limit} bits"),
            Self::SequenceLen { limit, len } => write!(f, "sequence too long: {len} > {limit} elements"),
        }
    }
}

impl std::error::Error for ResourceError {}

/// Resource limits surface as `MemoryError`.
impl From<ResourceError> for RunError {
    fn from(err: ResourceError) -> Self {
        ExcType::memory_error(err)
    }
}

/// Configuration for resource limits.
///
/// All limits are optional: `ResourceLimits::default()` disables every limit,
/// while [`ResourceLimits::new`] starts from the documented defaults. Limits
/// are installed once per process with [`ResourceLimits::install`]; until then
/// [`ResourceLimits::current`] reports `ResourceLimits::new()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ResourceLimits {
    /// Maximum number of bits in a `long` produced by `**` or `<<`.
    pub max_long_bits: Option<u64>,
    /// Maximum number of elements in a tuple, str or bytearray built by `+` or `*`.
    pub max_sequence_len: Option<usize>,
}

static INSTALLED: OnceLock<ResourceLimits> = OnceLock::new();

impl ResourceLimits {
    /// Creates limits set to [`DEFAULT_MAX_LONG_BITS`] and [`DEFAULT_MAX_SEQUENCE_LEN`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_long_bits: Some(DEFAULT_MAX_LONG_BITS),
            max_sequence_len: Some(DEFAULT_MAX_SEQUENCE_LEN),
        }
    }

    /// Sets the maximum size in bits of a computed `long`.
    #[must_use]
    pub fn max_long_bits(mut self, limit: u64) -> Self {
        self.max_long_bits = Some(limit);
        self
    }

    /// Sets the maximum length of a computed sequence.
    #[must_use]
    pub fn max_sequence_len(mut self, limit: usize) -> Self {
        self.max_sequence_len = Some(limit);
        self
    }

    /// Installs these limits for the rest of the process.
    ///
    /// Fails, handing the limits back, if limits were already installed or
    /// already read through [`ResourceLimits::current`].
    pub fn install(self) -> Result<(), Self> {
        INSTALLED.set(self)
    }

    /// The limits in effect for this process.
    pub fn current() -> &'static Self {
        INSTALLED.get_or_init(Self::new)
    }

    /// Checks that a `long` of `bits` bits may be materialized.
    pub fn check_long_bits(&self, bits: u64) -> Result<(), ResourceError> {
        match self.max_long_bits {
            Some(limit) if bits > limit => Err(ResourceError::LongBits { limit, bits }),
            _ => Ok(()),
        }
    }

    /// Checks that a sequence of `len` elements may be materialized.
    pub fn check_sequence_len(&self, len: usize) -> Result<(), ResourceError> {
        match self.max_sequence_len {
            Some(limit) if len > limit => Err(ResourceError::SequenceLen { limit, len }),
            _ => Ok(()),
        }
    }
}

/// Computes the length of `count` repetitions of a `len`-element sequence,
/// checked against the installed limits.
///
/// Negative counts produce an empty sequence.
pub(crate) fn repeat_len(len: usize, count: i64) -> Result<usize, ResourceError> {
    let Ok(count) = usize::try_from(count) else {
        return Ok(0);
    };
    let limits = ResourceLimits::current();
    let total = len.checked_mul(count).unwrap_or(usize::MAX);
    limits.check_sequence_len(total)?;
    Ok(total)
}

/// Computes the length of `a + b` for sequences of `left` and `right`
/// elements, checked against the installed limits.
pub(crate) fn concat_len(left: usize, right: usize) -> Result<usize, ResourceError> {
    let total = left.saturating_add(right);
    ResourceLimits::current().check_sequence_len(total)?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_disables_every_limit() {
        let limits = ResourceLimits::default();
        assert!(limits.check_long_bits(u64::MAX).is_ok());
        assert!(limits.check_sequence_len(usize::MAX).is_ok());
    }

    #[test]
    fn builder_sets_limits() {
        let limits = ResourceLimits::new().max_long_bits(64).max_sequence_len(10);
        assert_eq!(limits.check_long_bits(65), Err(ResourceError::LongBits { limit: 64, bits: 65 }));
        assert!(limits.check_long_bits(64).is_ok());
        assert_eq!(
            limits.check_sequence_len(11),
            Err(ResourceError::SequenceLen { limit: 10, len: 11 })
        );
    }

    #[test]
    fn resource_error_becomes_memory_error() {
        let err: RunError = ResourceError::SequenceLen { limit: 1, len: 2 }.into();
        assert_eq!(err.exc_type(), Some(ExcType::MemoryError));
        assert_eq!(err.message(), "sequence too long: 2 > 1 elements");
    }

    #[test]
    fn negative_repeat_is_empty() {
        assert_eq!(repeat_len(3, -4), Ok(0));
        assert_eq!(repeat_len(3, 4), Ok(12));
    }
}
