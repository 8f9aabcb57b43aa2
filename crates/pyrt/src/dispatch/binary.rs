//! Binary, in-place and unary operator resolution.
//!
//! A binary operator asks up to two slots: the left operand's forward slot
//! and the right operand's reflected slot. A right operand whose type derives
//! from the left operand's type and overrides the reflected slot is asked
//! first. A slot declines an operand pair by returning the not-implemented
//! sentinel; when every candidate declines, the operator fails with
//! `unsupported operand type(s)`.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use strum::{Display, EnumString, IntoStaticStr};

use crate::{
    exception_private::{ExcType, RunError, RunResult},
    tracer,
    types::{BinarySlot, Slots, Type, UnarySlot, r#type::same_slot},
    value::Value,
};

/// Binary arithmetic and bitwise operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    /// Classic division.
    Div,
    FloorDiv,
    Mod,
    DivMod,
    Pow,
    LShift,
    RShift,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    /// Operator spelling used in error messages.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::DivMod => "divmod()",
            Self::Pow => "** or pow()",
            Self::LShift => "<<",
            Self::RShift => ">>",
            Self::And => "&",
            Self::Or => "|",
            Self::Xor => "^",
        }
    }

    /// Spelling of the augmented assignment, e.g. `+=`.
    #[must_use]
    pub fn inplace_symbol(self) -> &'static str {
        match self {
            Self::Add => "+=",
            Self::Sub => "-=",
            Self::Mul => "*=",
            Self::Div => "/=",
            Self::FloorDiv => "//=",
            Self::Mod => "%=",
            Self::DivMod => "divmod()",
            Self::Pow => "**=",
            Self::LShift => "<<=",
            Self::RShift => ">>=",
            Self::And => "&=",
            Self::Or => "|=",
            Self::Xor => "^=",
        }
    }

    pub(crate) fn forward(self, slots: &Slots) -> Option<&BinarySlot> {
        match self {
            Self::Add => slots.add.as_ref(),
            Self::Sub => slots.sub.as_ref(),
            Self::Mul => slots.mul.as_ref(),
            Self::Div => slots.div.as_ref(),
            Self::FloorDiv => slots.floor_div.as_ref(),
            Self::Mod => slots.modulo.as_ref(),
            Self::DivMod => slots.div_mod.as_ref(),
            Self::Pow => slots.pow.as_ref(),
            Self::LShift => slots.lshift.as_ref(),
            Self::RShift => slots.rshift.as_ref(),
            Self::And => slots.and.as_ref(),
            Self::Or => slots.or.as_ref(),
            Self::Xor => slots.xor.as_ref(),
        }
    }

    pub(crate) fn reflected(self, slots: &Slots) -> Option<&BinarySlot> {
        match self {
            Self::Add => slots.radd.as_ref(),
            Self::Sub => slots.rsub.as_ref(),
            Self::Mul => slots.rmul.as_ref(),
            Self::Div => slots.rdiv.as_ref(),
            Self::FloorDiv => slots.rfloor_div.as_ref(),
            Self::Mod => slots.rmodulo.as_ref(),
            Self::DivMod => slots.rdiv_mod.as_ref(),
            Self::Pow => slots.rpow.as_ref(),
            Self::LShift => slots.rlshift.as_ref(),
            Self::RShift => slots.rrshift.as_ref(),
            Self::And => slots.rand.as_ref(),
            Self::Or => slots.ror.as_ref(),
            Self::Xor => slots.rxor.as_ref(),
        }
    }

    /// `divmod` has no augmented form.
    pub(crate) fn inplace(self, slots: &Slots) -> Option<&BinarySlot> {
        match self {
            Self::Add => slots.iadd.as_ref(),
            Self::Sub => slots.isub.as_ref(),
            Self::Mul => slots.imul.as_ref(),
            Self::Div => slots.idiv.as_ref(),
            Self::FloorDiv => slots.ifloor_div.as_ref(),
            Self::Mod => slots.imodulo.as_ref(),
            Self::DivMod => None,
            Self::Pow => slots.ipow.as_ref(),
            Self::LShift => slots.ilshift.as_ref(),
            Self::RShift => slots.irshift.as_ref(),
            Self::And => slots.iand.as_ref(),
            Self::Or => slots.ior.as_ref(),
            Self::Xor => slots.ixor.as_ref(),
        }
    }
}

/// Which slot answered a binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum SlotRole {
    /// `left.op(left, right)`
    Forward,
    /// `right.rop(right, left)`
    Reflected,
    /// `left.iop(left, right)`
    InPlace,
}

/// Orders the candidate slots for a binary operator.
///
/// Only depends on the operand types, so the ordering can be checked without
/// any concrete values. A right type that properly derives from the left type
/// and overrides the reflected slot goes first; then the left forward slot;
/// then the right reflected slot, unless it already went first. Candidates
/// whose slot is absent are skipped by the caller.
pub(crate) fn binary_candidates(left: &Type, right: &Type, op: BinaryOp) -> SmallVec<[SlotRole; 2]> {
    let right_first = right.is_proper_subtype(left)
        && !same_slot(op.reflected(right.slots()), op.reflected(left.slots()));
    let mut candidates = SmallVec::new();
    if right_first {
        candidates.push(SlotRole::Reflected);
        candidates.push(SlotRole::Forward);
    } else {
        candidates.push(SlotRole::Forward);
        candidates.push(SlotRole::Reflected);
    }
    candidates
}

/// Resolves `left op right`.
pub fn binary_op(left: &Value, right: &Value, op: BinaryOp) -> RunResult<Value> {
    for role in binary_candidates(left.py_type(), right.py_type(), op) {
        let (slot, this, other) = match role {
            SlotRole::Reflected => (op.reflected(right.py_type().slots()), right, left),
            _ => (op.forward(left.py_type().slots()), left, right),
        };
        let Some(slot) = slot else {
            continue;
        };
        let result = slot(this, other)?;
        if !result.is_not_implemented() {
            tracer::emit(|t| t.on_binary_op(op.symbol(), role, left.type_name(), right.type_name()));
            return Ok(result);
        }
    }
    tracer::emit(|t| t.on_binary_unsupported(op.symbol(), left.type_name(), right.type_name()));
    Err(ExcType::binary_type_error(op.symbol(), left.type_name(), right.type_name()))
}

/// Resolves `left op= right`.
///
/// The left operand's in-place slot answers if it exists and accepts the
/// pair. Otherwise the whole operation is the plain binary operator, so the
/// result is a new value.
pub fn inplace_op(left: &Value, right: &Value, op: BinaryOp) -> RunResult<Value> {
    if let Some(slot) = op.inplace(left.py_type().slots()) {
        let result = slot(left, right)?;
        if !result.is_not_implemented() {
            tracer::emit(|t| t.on_binary_op(op.inplace_symbol(), SlotRole::InPlace, left.type_name(), right.type_name()));
            return Ok(result);
        }
    }
    binary_op(left, right, op)
}

/// Generates the public entry point for each binary operator and its in-place form.
macro_rules! binary_entry_points {
    ($($(#[$doc:meta])* $name:ident, $iname:ident => $op:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $name(left: &Value, right: &Value) -> RunResult<Value> {
                binary_op(left, right, BinaryOp::$op)
            }

            #[doc = concat!("In-place form of [`", stringify!($name), "`].")]
            pub fn $iname(left: &Value, right: &Value) -> RunResult<Value> {
                inplace_op(left, right, BinaryOp::$op)
            }
        )*
    };
}

binary_entry_points! {
    /// `left + right`
    add, iadd => Add;
    /// `left - right`
    sub, isub => Sub;
    /// `left * right`
    mul, imul => Mul;
    /// `left / right`: floor division for integers, true division otherwise.
    div, idiv => Div;
    /// `left // right`
    floor_div, ifloor_div => FloorDiv;
    /// `left % right`
    modulo, imodulo => Mod;
    /// `left ** right`
    pow, ipow => Pow;
    /// `left << right`
    lshift, ilshift => LShift;
    /// `left >> right`
    rshift, irshift => RShift;
    /// `left & right`
    and, iand => And;
    /// `left | right`
    or, ior => Or;
    /// `left ^ right`
    xor, ixor => Xor;
}

/// `divmod(left, right)`: a `(quotient, remainder)` tuple.
pub fn div_mod(left: &Value, right: &Value) -> RunResult<Value> {
    binary_op(left, right, BinaryOp::DivMod)
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Pos,
    Invert,
    Abs,
}

impl UnaryOp {
    fn slot(self, slots: &Slots) -> Option<&UnarySlot> {
        match self {
            Self::Neg => slots.neg.as_ref(),
            Self::Pos => slots.pos.as_ref(),
            Self::Invert => slots.invert.as_ref(),
            Self::Abs => slots.abs.as_ref(),
        }
    }

    fn unsupported(self, type_name: &str) -> RunError {
        match self {
            Self::Neg => ExcType::unary_type_error("-", type_name),
            Self::Pos => ExcType::unary_type_error("+", type_name),
            Self::Invert => ExcType::unary_type_error("~", type_name),
            Self::Abs => ExcType::type_error(format_args!("bad operand type for abs(): '{type_name}'")),
        }
    }
}

/// Applies a unary operator through the operand's slot.
pub fn unary_op(value: &Value, op: UnaryOp) -> RunResult<Value> {
    if let Some(slot) = op.slot(value.py_type().slots()) {
        let result = slot(value)?;
        if !result.is_not_implemented() {
            return Ok(result);
        }
    }
    Err(op.unsupported(value.type_name()))
}

/// `-value`
pub fn neg(value: &Value) -> RunResult<Value> {
    unary_op(value, UnaryOp::Neg)
}

/// `+value`
pub fn pos(value: &Value) -> RunResult<Value> {
    unary_op(value, UnaryOp::Pos)
}

/// `~value`
pub fn invert(value: &Value) -> RunResult<Value> {
    unary_op(value, UnaryOp::Invert)
}

/// `abs(value)`
pub fn abs(value: &Value) -> RunResult<Value> {
    unary_op(value, UnaryOp::Abs)
}
