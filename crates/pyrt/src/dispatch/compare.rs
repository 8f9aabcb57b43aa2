//! Rich comparison resolution and the default total order.
//!
//! `compare_rich` lets either operand's type answer a comparison, giving a
//! right operand whose type derives from the left operand's type the first
//! say. When no slot answers, the public entry points fall back to
//! [`default_order`], so every pair of values is ordered even when neither
//! type defines a comparison.

use std::{cmp::Ordering, sync::Arc};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use strum::{Display, EnumString, IntoStaticStr};

use crate::{
    exception_private::RunResult,
    tracer,
    types::{BinarySlot, Slots, Type, base::none_type},
    value::Value,
};

/// The six rich comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
pub enum CompareOp {
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
}

impl CompareOp {
    /// The operator to ask of the right operand when arguments are swapped.
    #[must_use]
    pub fn swapped(self) -> Self {
        match self {
            Self::Lt => Self::Gt,
            Self::Le => Self::Ge,
            Self::Eq => Self::Eq,
            Self::Ne => Self::Ne,
            Self::Ge => Self::Le,
            Self::Gt => Self::Lt,
        }
    }

    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Ge => ">=",
            Self::Gt => ">",
        }
    }

    /// Whether the operator holds for operands ordered as `ordering`.
    #[must_use]
    pub fn matches(self, ordering: Ordering) -> bool {
        match self {
            Self::Lt => ordering.is_lt(),
            Self::Le => ordering.is_le(),
            Self::Eq => ordering.is_eq(),
            Self::Ne => ordering.is_ne(),
            Self::Ge => ordering.is_ge(),
            Self::Gt => ordering.is_gt(),
        }
    }

    pub(crate) fn slot(self, slots: &Slots) -> Option<&BinarySlot> {
        match self {
            Self::Lt => slots.lt.as_ref(),
            Self::Le => slots.le.as_ref(),
            Self::Eq => slots.eq.as_ref(),
            Self::Ne => slots.ne.as_ref(),
            Self::Ge => slots.ge.as_ref(),
            Self::Gt => slots.gt.as_ref(),
        }
    }

    const ALL: [Self; 6] = [Self::Lt, Self::Le, Self::Eq, Self::Ne, Self::Ge, Self::Gt];
}

/// Outcome of a type's three-way comparison function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Comparison {
    /// The other operand is not a type this comparison understands.
    NotImplemented,
    /// Comparable types, but no order holds (NaN): only `!=` is true.
    Unordered,
    Ordered(Ordering),
}

fn slot_mut(slots: &mut Slots, op: CompareOp) -> &mut Option<BinarySlot> {
    match op {
        CompareOp::Lt => &mut slots.lt,
        CompareOp::Le => &mut slots.le,
        CompareOp::Eq => &mut slots.eq,
        CompareOp::Ne => &mut slots.ne,
        CompareOp::Ge => &mut slots.ge,
        CompareOp::Gt => &mut slots.gt,
    }
}

/// Fills the six comparison slots with `f(op, self, other)`.
pub(crate) fn install_rich(slots: &mut Slots, f: fn(CompareOp, &Value, &Value) -> RunResult<Value>) {
    for op in CompareOp::ALL {
        let slot: BinarySlot = Arc::new(move |a: &Value, b: &Value| f(op, a, b));
        *slot_mut(slots, op) = Some(slot);
    }
}

/// Fills the six comparison slots from a three-way comparison function.
pub(crate) fn install_ordering(slots: &mut Slots, cmp: fn(&Value, &Value) -> RunResult<Comparison>) {
    for op in CompareOp::ALL {
        let slot: BinarySlot = Arc::new(move |a: &Value, b: &Value| {
            Ok(match cmp(a, b)? {
                Comparison::NotImplemented => Value::not_implemented(),
                Comparison::Unordered => Value::bool(op == CompareOp::Ne),
                Comparison::Ordered(ordering) => Value::bool(op.matches(ordering)),
            })
        });
        *slot_mut(slots, op) = Some(slot);
    }
}

/// Which operand's slot a comparison candidate calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    /// `left.op(left, right)`
    Left,
    /// `right.swapped_op(right, left)`
    Right,
}

/// Orders the comparison candidates for a pair of operand types.
///
/// A right operand whose type properly derives from the left operand's type
/// is asked first; otherwise the left operand is asked first. The swapped
/// slot of the right operand is never asked twice.
pub(crate) fn compare_candidates(left: &Type, right: &Type, op: CompareOp) -> SmallVec<[(Side, CompareOp); 2]> {
    let mut candidates = SmallVec::new();
    if right.is_proper_subtype(left) {
        candidates.push((Side::Right, op.swapped()));
        candidates.push((Side::Left, op));
    } else {
        candidates.push((Side::Left, op));
        candidates.push((Side::Right, op.swapped()));
    }
    candidates
}

/// Asks the operands' comparison slots in priority order.
///
/// Returns the not-implemented sentinel when no slot answers; callers decide
/// the fallback.
pub(crate) fn compare_rich(op: CompareOp, left: &Value, right: &Value) -> RunResult<Value> {
    for (side, slot_op) in compare_candidates(left.py_type(), right.py_type(), op) {
        let (this, other) = match side {
            Side::Left => (left, right),
            Side::Right => (right, left),
        };
        let Some(slot) = slot_op.slot(this.py_type().slots()) else {
            continue;
        };
        let result = slot(this, other)?;
        if !result.is_not_implemented() {
            return Ok(result);
        }
    }
    Ok(Value::not_implemented())
}

/// Total order used when no comparison slot answers.
///
/// Values of one type order by identity. `None` sorts before everything
/// else; instances of a `NoneType` subclass do not. Values of different
/// types order by type name, then by the address of the type descriptor.
#[must_use]
pub fn default_order(left: &Value, right: &Value) -> Ordering {
    let (lt, rt) = (left.py_type(), right.py_type());
    if Arc::ptr_eq(lt, rt) {
        return left.id().cmp(&right.id());
    }
    let none = none_type();
    if Arc::ptr_eq(lt, none) {
        return Ordering::Less;
    }
    if Arc::ptr_eq(rt, none) {
        return Ordering::Greater;
    }
    lt.name().cmp(rt.name()).then_with(|| lt.addr().cmp(&rt.addr()))
}

fn compare_with_fallback(op: CompareOp, left: &Value, right: &Value) -> RunResult<Value> {
    let result = compare_rich(op, left, right)?;
    if !result.is_not_implemented() {
        return Ok(result);
    }
    tracer::emit(|t| t.on_compare_fallback(op, left.type_name(), right.type_name()));
    Ok(Value::bool(op.matches(default_order(left, right))))
}

/// `left == right`
pub fn eq(left: &Value, right: &Value) -> RunResult<Value> {
    compare_with_fallback(CompareOp::Eq, left, right)
}

/// `left != right`
pub fn ne(left: &Value, right: &Value) -> RunResult<Value> {
    compare_with_fallback(CompareOp::Ne, left, right)
}

/// `left < right`
pub fn lt(left: &Value, right: &Value) -> RunResult<Value> {
    compare_with_fallback(CompareOp::Lt, left, right)
}

/// `left <= right`
pub fn le(left: &Value, right: &Value) -> RunResult<Value> {
    compare_with_fallback(CompareOp::Le, left, right)
}

/// `left > right`
pub fn gt(left: &Value, right: &Value) -> RunResult<Value> {
    compare_with_fallback(CompareOp::Gt, left, right)
}

/// `left >= right`
pub fn ge(left: &Value, right: &Value) -> RunResult<Value> {
    compare_with_fallback(CompareOp::Ge, left, right)
}

/// Applies `op` and reduces the result to its truth value.
pub fn compare_bool(op: CompareOp, left: &Value, right: &Value) -> RunResult<bool> {
    let result = compare_with_fallback(op, left, right)?;
    super::is_true(&result)
}

/// `bool(left == right)`
pub fn is_equal(left: &Value, right: &Value) -> RunResult<bool> {
    compare_bool(CompareOp::Eq, left, right)
}

/// Membership equality used by containers: identity first, then `==`.
pub(crate) fn same_or_equal(left: &Value, right: &Value) -> RunResult<bool> {
    if left.is(right) {
        return Ok(true);
    }
    is_equal(left, right)
}

/// Three-way comparison built from `==` and `<`.
///
/// Pairs where neither holds (such as NaN operands) order as `Greater`.
pub fn compare(left: &Value, right: &Value) -> RunResult<Ordering> {
    if same_or_equal(left, right)? {
        Ok(Ordering::Equal)
    } else if compare_bool(CompareOp::Lt, left, right)? {
        Ok(Ordering::Less)
    } else {
        Ok(Ordering::Greater)
    }
}

/// Returns the values sorted ascending by `<`, keeping equal values in input order.
///
/// Comparison errors propagate; mixed types without comparison slots sort
/// by the default order.
pub fn sorted(values: &[Value]) -> RunResult<Vec<Value>> {
    let mut items = values.to_vec();
    let mut scratch = Vec::with_capacity(items.len());
    merge_sort(&mut items, &mut scratch)?;
    Ok(items)
}

/// Stable top-down merge sort with a fallible `<`.
///
/// A hand-written sort keeps inconsistent user comparisons from panicking.
fn merge_sort(items: &mut [Value], scratch: &mut Vec<Value>) -> RunResult<()> {
    if items.len() <= 1 {
        return Ok(());
    }
    let mid = items.len() / 2;
    merge_sort(&mut items[..mid], scratch)?;
    merge_sort(&mut items[mid..], scratch)?;

    scratch.clear();
    let (mut i, mut j) = (0, mid);
    while i < mid && j < items.len() {
        // take from the right run only when strictly smaller, for stability
        if compare_bool(CompareOp::Lt, &items[j], &items[i])? {
            scratch.push(items[j].clone());
            j += 1;
        } else {
            scratch.push(items[i].clone());
            i += 1;
        }
    }
    scratch.extend_from_slice(&items[i..mid]);
    scratch.extend_from_slice(&items[j..]);
    items.clone_from_slice(scratch);
    Ok(())
}
