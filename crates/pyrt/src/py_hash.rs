//! CPython-compatible hash helpers.
//!
//! Hashing is deterministic, equivalent to `PYTHONHASHSEED=0`: text and bytes
//! hash with SipHash-1-3 under a zeroed key.
//!
//! ## Cross-type hash invariant
//!
//! If `a == b` then `hash(a) == hash(b)`. Since `1 == 1.0 == 1L == 1+0j`, the
//! helpers for int, long, float and complex all reduce modulo the Mersenne prime
//! `2^61 - 1` exactly as `Objects/longobject.c` and `Objects/floatobject.c` do.
//!
//! All helpers return the signed Python hash and never return `-1`.

use num_bigint::BigInt;
use num_traits::ToPrimitive;

/// Mersenne prime used by CPython for numeric hashing: `2^61 - 1`.
const MODULUS: i64 = (1 << 61) - 1;

/// Hash of positive infinity; negative infinity hashes to its negation.
const HASH_INF: i64 = 314_159;

/// Multiplier applied to the imaginary component of a complex hash.
const HASH_IMAG: i64 = 1_000_003;

/// CPython reserves `-1` as an error marker in C.
#[inline]
fn fix_minus_one(h: i64) -> i64 {
    if h == -1 { -2 } else { h }
}

/// Hashes a signed 64-bit integer using CPython's modular algorithm.
#[must_use]
pub(crate) fn hash_int(value: i64) -> i64 {
    if value == 0 {
        return 0;
    }
    let sign: i64 = if value < 0 { -1 } else { 1 };
    // i64::MIN has no positive counterpart, go through i128
    let abs_val = i128::from(value).unsigned_abs();
    let remainder = (abs_val % MODULUS.unsigned_abs() as u128) as i64;
    fix_minus_one(sign * remainder)
}

/// Hashes an arbitrary-precision integer, consistent with [`hash_int`].
#[must_use]
pub(crate) fn hash_bigint(value: &BigInt) -> i64 {
    if let Some(i) = value.to_i64() {
        return hash_int(i);
    }
    // BigInt `%` keeps the sign of the dividend, matching CPython's long_hash
    let remainder = value % BigInt::from(MODULUS);
    fix_minus_one(remainder.to_i64().unwrap_or(0))
}

/// Hashes an `f64` using CPython's float hashing algorithm.
///
/// Integral floats hash like the equal integer. NaN hashes to `0`.
#[must_use]
pub(crate) fn hash_float(value: f64) -> i64 {
    if value.is_infinite() {
        return if value > 0.0 { HASH_INF } else { -HASH_INF };
    }
    if value.is_nan() {
        return 0;
    }

    let truncated = value.trunc();
    if value == truncated && truncated >= i64::MIN as f64 && truncated < i64::MAX as f64 {
        return hash_int(truncated as i64);
    }

    let (frac, exp) = frexp(value);
    let mut m = frac;
    let mut e = exp;

    let sign: i64 = if m < 0.0 {
        m = -m;
        -1
    } else {
        1
    };

    // process the mantissa in 28-bit chunks
    let modulus = MODULUS as u64;
    let mut x: u64 = 0;
    while m > 0.0 {
        x = ((x << 28) & modulus) | (x >> 33);
        m *= 268_435_456.0; // 2^28
        e -= 28;
        let w = m as u64;
        m -= w as f64;
        x = x.wrapping_add(w);
        if x >= modulus {
            x -= modulus;
        }
    }

    e %= 61;
    if e < 0 {
        e += 61;
    }
    x = ((x << e as u32) & modulus) | (x >> (61 - e) as u32);

    fix_minus_one((sign * x as i64) % MODULUS)
}

/// Hashes a complex number: `hash(re) + 1000003 * hash(im)`.
#[must_use]
pub(crate) fn hash_complex(re: f64, im: f64) -> i64 {
    let combined = hash_float(re).wrapping_add(HASH_IMAG.wrapping_mul(hash_float(im)));
    fix_minus_one(combined)
}

/// Mixes element hashes with CPython's xxHash-based tuple algorithm.
#[must_use]
pub(crate) fn hash_tuple(element_hashes: &[i64]) -> i64 {
    const XXPRIME_1: u64 = 11_400_714_785_074_694_791;
    const XXPRIME_2: u64 = 14_029_467_366_897_019_727;
    const XXPRIME_5: u64 = 2_870_177_450_012_600_261;
    const TUPLE_HASH_SUFFIX: u64 = 3_527_539;

    let mut acc = XXPRIME_5;
    for &lane in element_hashes {
        acc = acc.wrapping_add((lane as u64).wrapping_mul(XXPRIME_2));
        acc = acc.rotate_left(31);
        acc = acc.wrapping_mul(XXPRIME_1);
    }
    acc = acc.wrapping_add((element_hashes.len() as u64) ^ (XXPRIME_5 ^ TUPLE_HASH_SUFFIX));
    if acc == u64::MAX {
        return 1_546_275_796;
    }
    acc as i64
}

/// Order-independent combination of element hashes, as in CPython's `frozenset_hash`.
#[must_use]
pub(crate) fn hash_frozenset(element_hashes: impl IntoIterator<Item = i64>) -> i64 {
    fn shuffle_bits(h: u64) -> u64 {
        ((h ^ 89_869_747) ^ (h << 16)).wrapping_mul(3_644_798_167)
    }

    let mut count: u64 = 0;
    let mut hash: u64 = 0;
    for h in element_hashes {
        hash ^= shuffle_bits(h as u64);
        count += 1;
    }
    hash ^= (count.wrapping_add(1)).wrapping_mul(1_927_868_237);
    hash ^= (hash >> 11) ^ (hash >> 25);
    hash = hash.wrapping_mul(69069).wrapping_add(907_133_923);
    fix_minus_one(hash as i64)
}

/// Hashes raw bytes using CPython's `PYTHONHASHSEED=0` SipHash-1-3 behavior.
///
/// Empty input hashes to `0`.
#[must_use]
pub(crate) fn hash_bytes(bytes: &[u8]) -> i64 {
    if bytes.is_empty() {
        return 0;
    }
    fix_minus_one(siphash13_with_seed0(bytes) as i64)
}

/// Returns `(frac, exp)` such that `value == frac * 2^exp` with `0.5 <= |frac| < 1.0`.
fn frexp(value: f64) -> (f64, i32) {
    if value == 0.0 || value.is_nan() || value.is_infinite() {
        return (value, 0);
    }
    let bits = value.to_bits();
    let exponent = ((bits >> 52) & 0x7ff) as i32;
    if exponent == 0 {
        // subnormal: normalize first
        let normalized = value * (1u64 << 63) as f64 * 2.0;
        let (frac, exp) = frexp(normalized);
        return (frac, exp - 64);
    }
    let frac_bits = (bits & 0x800F_FFFF_FFFF_FFFF) | 0x3FE0_0000_0000_0000;
    (f64::from_bits(frac_bits), exponent - 1022)
}

/// Computes SipHash-1-3 with a zero key.
fn siphash13_with_seed0(bytes: &[u8]) -> u64 {
    let mut v0: u64 = 0x736f_6d65_7073_6575;
    let mut v1: u64 = 0x646f_7261_6e64_6f6d;
    let mut v2: u64 = 0x6c79_6765_6e65_7261;
    let mut v3: u64 = 0x7465_6462_7974_6573;

    let mut chunks = bytes.chunks_exact(8);
    for chunk in &mut chunks {
        let mut block = [0_u8; 8];
        block.copy_from_slice(chunk);
        let message = u64::from_le_bytes(block);
        v3 ^= message;
        sip_round(&mut v0, &mut v1, &mut v2, &mut v3);
        v0 ^= message;
    }

    let mut tail = (bytes.len() as u64) << 56;
    for (index, byte) in chunks.remainder().iter().copied().enumerate() {
        tail |= u64::from(byte) << (index * 8);
    }

    v3 ^= tail;
    sip_round(&mut v0, &mut v1, &mut v2, &mut v3);
    v0 ^= tail;
    v2 ^= 0xff;
    sip_round(&mut v0, &mut v1, &mut v2, &mut v3);
    sip_round(&mut v0, &mut v1, &mut v2, &mut v3);
    sip_round(&mut v0, &mut v1, &mut v2, &mut v3);

    v0 ^ v1 ^ v2 ^ v3
}

fn sip_round(v0: &mut u64, v1: &mut u64, v2: &mut u64, v3: &mut u64) {
    *v0 = v0.wrapping_add(*v1);
    *v1 = v1.rotate_left(13);
    *v1 ^= *v0;
    *v0 = v0.rotate_left(32);

    *v2 = v2.wrapping_add(*v3);
    *v3 = v3.rotate_left(16);
    *v3 ^= *v2;

    *v0 = v0.wrapping_add(*v3);
    *v3 = v3.rotate_left(21);
    *v3 ^= *v0;

    *v2 = v2.wrapping_add(*v1);
    *v1 = v1.rotate_left(17);
    *v1 ^= *v2;
    *v2 = v2.rotate_left(32);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_ints_hash_to_themselves() {
        assert_eq!(hash_int(0), 0);
        assert_eq!(hash_int(42), 42);
        assert_eq!(hash_int(-7), -7);
        assert_eq!(hash_int(-1), -2);
    }

    #[test]
    fn int_hash_wraps_at_modulus() {
        assert_eq!(hash_int(MODULUS), 0);
        assert_eq!(hash_int(MODULUS + 5), 5);
        assert_eq!(hash_int(i64::MIN), hash_bigint(&BigInt::from(i64::MIN)));
    }

    #[test]
    fn bigint_hash_matches_int_hash_in_range() {
        let big = BigInt::from(i64::MAX) * 4;
        let reduced = &big % BigInt::from(MODULUS);
        assert_eq!(hash_bigint(&big), hash_bigint(&reduced));
        assert_eq!(hash_bigint(&BigInt::from(12345)), 12345);
    }

    #[test]
    fn integral_floats_hash_like_ints() {
        assert_eq!(hash_float(1.0), hash_int(1));
        assert_eq!(hash_float(-3.0), hash_int(-3));
        assert_eq!(hash_float(f64::INFINITY), 314_159);
        assert_eq!(hash_float(f64::NAN), 0);
    }

    #[test]
    fn fractional_float_hash_matches_cpython() {
        // hash(0.5) == 1152921504606846976 in CPython
        assert_eq!(hash_float(0.5), 1_152_921_504_606_846_976);
    }

    #[test]
    fn complex_with_zero_imag_hashes_like_real() {
        assert_eq!(hash_complex(2.0, 0.0), hash_int(2));
    }

    #[test]
    fn empty_tuple_hash_matches_cpython() {
        // hash(()) == 5740354900026072187 in CPython
        assert_eq!(hash_tuple(&[]), 5_740_354_900_026_072_187);
    }

    #[test]
    fn frozenset_hash_ignores_order() {
        assert_eq!(hash_frozenset([1, 2, 3]), hash_frozenset([3, 1, 2]));
    }
}
