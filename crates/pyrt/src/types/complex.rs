//! The `complex` type: a pair of IEEE-754 doubles.
//!
//! Arithmetic keeps IEEE semantics for each component, so signed zeros,
//! infinities and NaN flow through unchanged. A zero divisor is rejected before
//! any component arithmetic happens. Complex values support `==` and `!=`
//! against every numeric type but refuse ordering.

use std::{
    fmt,
    ops::{Add, Mul, Neg, Sub},
    sync::{Arc, LazyLock},
};

use num_bigint::BigInt;

use super::{
    Slots, Type, TypeRef,
    base::object_type,
    float::{compare_float_to_int, float_repr},
    long_int::bigint_to_f64,
    r#type::{binary, reflected, unary},
};
use crate::{
    dispatch::compare::{CompareOp, install_rich},
    exception_private::{ExcType, RunResult},
    object::Object,
    py_hash::hash_complex,
    value::{Payload, Value},
};

#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

impl Complex {
    #[must_use]
    pub const fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    #[must_use]
    pub fn is_zero(self) -> bool {
        self.re == 0.0 && self.im == 0.0
    }

    /// Smith's algorithm; `None` when the divisor is zero.
    #[must_use]
    pub fn checked_div(self, other: Self) -> Option<Self> {
        if other.is_zero() {
            return None;
        }
        let (a, b) = (self, other);
        let abs_re = b.re.abs();
        let abs_im = b.im.abs();
        Some(if abs_re >= abs_im {
            let ratio = b.im / b.re;
            let denom = b.re + b.im * ratio;
            Self::new((a.re + a.im * ratio) / denom, (a.im - a.re * ratio) / denom)
        } else if abs_im >= abs_re {
            let ratio = b.re / b.im;
            let denom = b.re * ratio + b.im;
            Self::new((a.re * ratio + a.im) / denom, (a.im * ratio - a.re) / denom)
        } else {
            // at least one component of the divisor is NaN
            Self::new(f64::NAN, f64::NAN)
        })
    }

    /// Floor quotient (real part floored, imaginary part zero) and remainder.
    ///
    /// `None` when the divisor is zero.
    #[must_use]
    pub fn checked_div_mod(self, other: Self) -> Option<(Self, Self)> {
        let quotient = self.checked_div(other)?;
        let floored = Self::new(quotient.re.floor(), 0.0);
        Some((floored, self - other * floored))
    }

    /// `self ** exp`.
    ///
    /// A zero base gives `1` for a zero exponent, `0` for a positive real
    /// part, `inf` for a negative real exponent and `inf+infj` for any other
    /// negative exponent.
    #[must_use]
    pub fn pow(self, exp: Self) -> Self {
        if exp.is_zero() {
            return Self::new(1.0, 0.0);
        }
        if self.is_zero() {
            if exp.re.is_nan() || exp.im.is_nan() {
                return Self::new(f64::NAN, f64::NAN);
            }
            return if exp.re < 0.0 {
                if exp.im == 0.0 {
                    Self::new(f64::INFINITY, 0.0)
                } else {
                    Self::new(f64::INFINITY, f64::INFINITY)
                }
            } else if exp.re > 0.0 {
                Self::new(0.0, 0.0)
            } else {
                Self::new(1.0, 0.0)
            };
        }
        let modulus = self.abs();
        let arg = self.im.atan2(self.re);
        let mut len = modulus.powf(exp.re);
        let mut theta = exp.re * arg;
        if exp.im != 0.0 {
            len *= (-exp.im * arg).exp();
            theta += exp.im * modulus.ln();
        }
        let (sin, cos) = theta.sin_cos();
        Self::new(len * cos, len * sin)
    }

    /// Magnitude, computed without intermediate overflow.
    #[must_use]
    pub fn abs(self) -> f64 {
        self.re.hypot(self.im)
    }

    /// Python's repr: `2j` for a pure imaginary with `+0.0` real part, else `(1+2j)`.
    #[must_use]
    pub fn repr(self) -> String {
        let im = component_repr(self.im);
        if self.re == 0.0 && self.re.is_sign_positive() {
            return format!("{im}j");
        }
        let sign = if im.starts_with('-') { "" } else { "+" };
        format!("({}{sign}{im}j)", component_repr(self.re))
    }
}

/// Float repr without the trailing `.0` of integral values.
fn component_repr(x: f64) -> String {
    let s = float_repr(x);
    match s.strip_suffix(".0") {
        Some(stripped) => stripped.to_owned(),
        None => s,
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

impl Add for Complex {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.re + rhs.re, self.im + rhs.im)
    }
}

impl Sub for Complex {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.re - rhs.re, self.im - rhs.im)
    }
}

impl Mul for Complex {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.re * rhs.re - self.im * rhs.im,
            self.re * rhs.im + self.im * rhs.re,
        )
    }
}

impl Neg for Complex {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.re, -self.im)
    }
}

/// Parses a complex literal the way `complex(str)` does.
///
/// Accepted forms, optionally wrapped in parentheses and surrounded by
/// whitespace: `re`, `imj`, `re+imj`, `re-imj`, with an implicit `1` for a
/// bare `j`. Components may be `inf`, `infinity` or `nan` in any case.
/// Whitespace inside the literal is rejected.
///
/// # Errors
/// ValueError `complex() arg is a malformed string` for anything else.
pub fn parse_complex(input: &str) -> RunResult<Complex> {
    let malformed = ExcType::value_error_complex_malformed_string;
    let mut s = input.trim();
    if let Some(inner) = s.strip_prefix('(') {
        s = inner.strip_suffix(')').ok_or_else(malformed)?.trim();
    }
    let b = s.as_bytes();
    let is_j = |pos: usize| matches!(b.get(pos), Some(b'j' | b'J'));
    let ends_at = |pos: usize| pos == b.len();

    if let Some((x, pos)) = scan_number(b, 0) {
        if ends_at(pos) {
            return Ok(Complex::new(x, 0.0));
        }
        if is_j(pos) && ends_at(pos + 1) {
            return Ok(Complex::new(0.0, x));
        }
        if matches!(b[pos], b'+' | b'-') {
            let (y, end) = scan_number(b, pos).unwrap_or_else(|| (implicit_one(b[pos]), pos + 1));
            if is_j(end) && ends_at(end + 1) {
                return Ok(Complex::new(x, y));
            }
        }
        return Err(malformed());
    }

    // bare `j`, `+j`, `-j`
    let (y, pos) = match b.first() {
        Some(sign @ (b'+' | b'-')) => (implicit_one(*sign), 1),
        _ => (1.0, 0),
    };
    if is_j(pos) && ends_at(pos + 1) {
        return Ok(Complex::new(0.0, y));
    }
    Err(malformed())
}

fn implicit_one(sign: u8) -> f64 {
    if sign == b'-' { -1.0 } else { 1.0 }
}

/// Scans an optionally signed float starting at `start`.
///
/// Returns the value and the index just past it, or `None` when no digits
/// (or special word) follow the sign.
fn scan_number(b: &[u8], start: usize) -> Option<(f64, usize)> {
    let mut pos = start;
    let negative = match b.get(pos) {
        Some(b'-') => {
            pos += 1;
            true
        }
        Some(b'+') => {
            pos += 1;
            false
        }
        _ => false,
    };
    let apply_sign = |v: f64| if negative { -v } else { v };

    for (word, value) in [("infinity", f64::INFINITY), ("inf", f64::INFINITY), ("nan", f64::NAN)] {
        let end = pos + word.len();
        if b.get(pos..end).is_some_and(|w| w.eq_ignore_ascii_case(word.as_bytes())) {
            return Some((apply_sign(value), end));
        }
    }

    let count_digits = |from: usize| b[from..].iter().take_while(|c| c.is_ascii_digit()).count();
    let int_digits = count_digits(pos);
    pos += int_digits;
    let mut frac_digits = 0;
    if b.get(pos) == Some(&b'.') {
        frac_digits = count_digits(pos + 1);
        pos += 1 + frac_digits;
    }
    if int_digits + frac_digits == 0 {
        return None;
    }
    if matches!(b.get(pos), Some(b'e' | b'E')) {
        let mut exp_pos = pos + 1;
        if matches!(b.get(exp_pos), Some(b'+' | b'-')) {
            exp_pos += 1;
        }
        let exp_digits = count_digits(exp_pos);
        if exp_digits > 0 {
            pos = exp_pos + exp_digits;
        }
    }
    let text = std::str::from_utf8(&b[start..pos]).ok()?;
    text.parse::<f64>().ok().map(|v| (v, pos))
}

/// Converts any numeric operand to a complex value.
fn coerce_complex(v: &Value) -> RunResult<Option<Complex>> {
    Ok(match v.payload() {
        Payload::Complex(c) => Some(*c),
        Payload::Float(f) => Some(Complex::new(*f, 0.0)),
        Payload::Int(i) => Some(Complex::new(*i as f64, 0.0)),
        Payload::Long(l) => Some(Complex::new(bigint_to_f64(l.inner())?, 0.0)),
        _ => None,
    })
}

fn complexes(a: &Value, b: &Value) -> RunResult<Option<(Complex, Complex)>> {
    match (coerce_complex(a)?, coerce_complex(b)?) {
        (Some(x), Some(y)) => Ok(Some((x, y))),
        _ => Ok(None),
    }
}

macro_rules! complex_binary {
    ($name:ident, |$x:ident, $y:ident| $body:expr) => {
        fn $name(a: &Value, b: &Value) -> RunResult<Value> {
            match complexes(a, b)? {
                Some(($x, $y)) => $body,
                None => Ok(Value::not_implemented()),
            }
        }
    };
}

fn complex_value(c: Complex) -> Value {
    Value::complex(c.re, c.im)
}

complex_binary!(complex_add, |x, y| Ok(complex_value(x + y)));
complex_binary!(complex_sub, |x, y| Ok(complex_value(x - y)));
complex_binary!(complex_mul, |x, y| Ok(complex_value(x * y)));
complex_binary!(complex_div, |x, y| {
    x.checked_div(y)
        .map(complex_value)
        .ok_or_else(|| ExcType::zero_division("complex division by zero"))
});
complex_binary!(complex_floor_div, |x, y| {
    x.checked_div_mod(y)
        .map(|(q, _)| complex_value(q))
        .ok_or_else(|| ExcType::zero_division("complex divmod()"))
});
complex_binary!(complex_mod, |x, y| {
    x.checked_div_mod(y)
        .map(|(_, r)| complex_value(r))
        .ok_or_else(|| ExcType::zero_division("complex remainder"))
});
complex_binary!(complex_div_mod, |x, y| {
    let (q, r) = x
        .checked_div_mod(y)
        .ok_or_else(|| ExcType::zero_division("complex divmod()"))?;
    Ok(Value::tuple(vec![complex_value(q), complex_value(r)]))
});
complex_binary!(complex_pow, |x, y| Ok(complex_value(x.pow(y))));

/// Equality against every numeric type; ordering is a TypeError for numbers.
fn complex_richcompare(op: CompareOp, a: &Value, b: &Value) -> RunResult<Value> {
    let Some(x) = a.as_complex() else {
        return Ok(Value::not_implemented());
    };
    let equal = match b.payload() {
        Payload::Complex(y) => x == *y,
        Payload::Float(y) => x.im == 0.0 && x.re == *y,
        Payload::Int(i) => x.im == 0.0 && compare_float_to_int(x.re, &BigInt::from(*i)).is_some_and(|o| o.is_eq()),
        Payload::Long(l) => x.im == 0.0 && compare_float_to_int(x.re, l.inner()).is_some_and(|o| o.is_eq()),
        _ => return Ok(Value::not_implemented()),
    };
    match op {
        CompareOp::Eq => Ok(Value::bool(equal)),
        CompareOp::Ne => Ok(Value::bool(!equal)),
        _ => Err(ExcType::type_error_complex_ordering()),
    }
}

fn complex_abs(v: &Value) -> RunResult<Value> {
    let Some(c) = v.as_complex() else {
        return Ok(Value::not_implemented());
    };
    let magnitude = c.abs();
    if magnitude.is_infinite() && c.re.is_finite() && c.im.is_finite() {
        return Err(ExcType::overflow_error("absolute value too large"));
    }
    Ok(Value::float(magnitude))
}

fn complex_unary(v: &Value, f: fn(Complex) -> Complex) -> RunResult<Value> {
    Ok(v.as_complex().map_or_else(Value::not_implemented, |c| complex_value(f(c))))
}

/// The builtin `complex` type.
pub fn complex_type() -> &'static TypeRef {
    static TYPE: LazyLock<TypeRef> = LazyLock::new(|| {
        let mut slots = Slots {
            add: binary(complex_add),
            radd: reflected(complex_add),
            sub: binary(complex_sub),
            rsub: reflected(complex_sub),
            mul: binary(complex_mul),
            rmul: reflected(complex_mul),
            div: binary(complex_div),
            rdiv: reflected(complex_div),
            floor_div: binary(complex_floor_div),
            rfloor_div: reflected(complex_floor_div),
            modulo: binary(complex_mod),
            rmodulo: reflected(complex_mod),
            div_mod: binary(complex_div_mod),
            rdiv_mod: reflected(complex_div_mod),
            pow: binary(complex_pow),
            rpow: reflected(complex_pow),
            neg: unary(|v| complex_unary(v, |c| -c)),
            pos: unary(|v| complex_unary(v, |c| c)),
            abs: unary(complex_abs),
            hash: Some(Arc::new(|v: &Value| {
                Ok(v.as_complex().map_or(0, |c| hash_complex(c.re, c.im)))
            })),
            repr: Some(Arc::new(|v: &Value| Ok(v.as_complex().unwrap_or_default().repr()))),
            nonzero: Some(Arc::new(|v: &Value| Ok(v.as_complex().is_some_and(|c| !c.is_zero())))),
            native: Some(Arc::new(|v: &Value| {
                let c = v.as_complex().unwrap_or_default();
                Ok(Object::Complex { real: c.re, imag: c.im })
            })),
            ..Slots::default()
        };
        install_rich(&mut slots, complex_richcompare);
        Type::builtin("complex", vec![object_type().clone()], slots)
    });
    &TYPE
}
