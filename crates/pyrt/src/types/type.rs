//! Type descriptors and their slot tables.
//!
//! Every value points at a [`Type`]. A type carries a display name, its direct
//! bases and a sparse [`Slots`] table: one optional function per operator or
//! protocol. An absent slot means "this type does not support the operation";
//! the dispatch layer checks for `None` explicitly and never calls through a
//! missing slot.

use std::{borrow::Cow, fmt, ptr, sync::Arc};

use crate::{exception_private::RunResult, object::Object, value::Value};

/// Shared handle to a type descriptor. Type identity is pointer identity.
pub type TypeRef = Arc<Type>;

/// `slot(self, other)` for binary operators and rich comparisons.
///
/// Returning [`Value::not_implemented`] asks the dispatcher to try the next candidate.
pub type BinarySlot = Arc<dyn Fn(&Value, &Value) -> RunResult<Value> + Send + Sync>;
/// `slot(self)` for unary operators, `iter` and `next`.
pub type UnarySlot = Arc<dyn Fn(&Value) -> RunResult<Value> + Send + Sync>;
pub type HashSlot = Arc<dyn Fn(&Value) -> RunResult<i64> + Send + Sync>;
pub type ReprSlot = Arc<dyn Fn(&Value) -> RunResult<String> + Send + Sync>;
pub type LenSlot = Arc<dyn Fn(&Value) -> RunResult<usize> + Send + Sync>;
pub type BoolSlot = Arc<dyn Fn(&Value) -> RunResult<bool> + Send + Sync>;
/// `slot(container, item)` for membership tests.
pub type ContainsSlot = Arc<dyn Fn(&Value, &Value) -> RunResult<bool> + Send + Sync>;
/// `slot(container, key, value)` for item assignment.
pub type SetItemSlot = Arc<dyn Fn(&Value, &Value, &Value) -> RunResult<()> + Send + Sync>;
/// `slot(container, key)` for item deletion.
pub type DelItemSlot = Arc<dyn Fn(&Value, &Value) -> RunResult<()> + Send + Sync>;
/// Converts a value into its owned public representation.
pub type NativeSlot = Arc<dyn Fn(&Value) -> RunResult<Object> + Send + Sync>;

/// Defines the `Slots` struct along with slot inheritance and introspection.
macro_rules! define_slots {
    ($( $(#[$doc:meta])* $name:ident: $ty:ty ),* $(,)?) => {
        /// Sparse table of optional operation implementations.
        ///
        /// Build one with struct-update syntax over `Slots::default()`.
        #[derive(Clone, Default)]
        pub struct Slots {
            $( $(#[$doc])* pub $name: Option<$ty>, )*
        }

        impl Slots {
            /// Fills every slot that is still empty with the base's slot.
            fn inherit_from(&mut self, base: &Self) {
                $(
                    if self.$name.is_none() {
                        self.$name = base.$name.clone();
                    }
                )*
            }

            /// Names of the slots this table defines, in declaration order.
            #[must_use]
            pub fn defined(&self) -> Vec<&'static str> {
                let mut names = Vec::new();
                $(
                    if self.$name.is_some() {
                        names.push(stringify!($name));
                    }
                )*
                names
            }
        }
    };
}

define_slots! {
    add: BinarySlot,
    radd: BinarySlot,
    iadd: BinarySlot,
    sub: BinarySlot,
    rsub: BinarySlot,
    isub: BinarySlot,
    mul: BinarySlot,
    rmul: BinarySlot,
    imul: BinarySlot,
    /// Classic `/`: floor division for integers, true division otherwise.
    div: BinarySlot,
    rdiv: BinarySlot,
    idiv: BinarySlot,
    floor_div: BinarySlot,
    rfloor_div: BinarySlot,
    ifloor_div: BinarySlot,
    modulo: BinarySlot,
    rmodulo: BinarySlot,
    imodulo: BinarySlot,
    /// Returns a `(quotient, remainder)` tuple.
    div_mod: BinarySlot,
    rdiv_mod: BinarySlot,
    pow: BinarySlot,
    rpow: BinarySlot,
    ipow: BinarySlot,
    lshift: BinarySlot,
    rlshift: BinarySlot,
    ilshift: BinarySlot,
    rshift: BinarySlot,
    rrshift: BinarySlot,
    irshift: BinarySlot,
    and: BinarySlot,
    rand: BinarySlot,
    iand: BinarySlot,
    or: BinarySlot,
    ror: BinarySlot,
    ior: BinarySlot,
    xor: BinarySlot,
    rxor: BinarySlot,
    ixor: BinarySlot,
    eq: BinarySlot,
    ne: BinarySlot,
    lt: BinarySlot,
    le: BinarySlot,
    gt: BinarySlot,
    ge: BinarySlot,
    neg: UnarySlot,
    pos: UnarySlot,
    invert: UnarySlot,
    abs: UnarySlot,
    hash: HashSlot,
    repr: ReprSlot,
    len: LenSlot,
    /// Truth value; falls back to `len` and then to `true` when absent.
    nonzero: BoolSlot,
    contains: ContainsSlot,
    get_item: BinarySlot,
    set_item: SetItemSlot,
    del_item: DelItemSlot,
    iter: UnarySlot,
    next: UnarySlot,
    native: NativeSlot,
}

impl fmt::Debug for Slots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.defined()).finish()
    }
}

/// Returns true when both slots are absent or both point at the same function.
///
/// Used to detect whether a subclass actually overrides an inherited slot.
pub(crate) fn same_slot<F: ?Sized>(a: Option<&Arc<F>>, b: Option<&Arc<F>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

/// Wraps a binary function as a slot.
pub(crate) fn binary(f: fn(&Value, &Value) -> RunResult<Value>) -> Option<BinarySlot> {
    Some(Arc::new(f))
}

/// Wraps `f` as a reflected slot: `slot(self, other)` computes `f(other, self)`.
pub(crate) fn reflected(f: fn(&Value, &Value) -> RunResult<Value>) -> Option<BinarySlot> {
    Some(Arc::new(move |this: &Value, other: &Value| f(other, this)))
}

pub(crate) fn unary(f: fn(&Value) -> RunResult<Value>) -> Option<UnarySlot> {
    Some(Arc::new(f))
}

/// Descriptor for one concrete kind of value.
pub struct Type {
    name: Cow<'static, str>,
    bases: Vec<TypeRef>,
    slots: Slots,
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Type")
            .field("name", &self.name)
            .field("bases", &self.bases.iter().map(|b| b.name()).collect::<Vec<_>>())
            .field("slots", &self.slots)
            .finish()
    }
}

impl Type {
    /// Creates a builtin type whose slot table is spelled out completely.
    pub(crate) fn builtin(name: &'static str, bases: Vec<TypeRef>, slots: Slots) -> TypeRef {
        Arc::new(Self {
            name: Cow::Borrowed(name),
            bases,
            slots,
        })
    }

    /// Creates a user-defined type.
    ///
    /// Slots present in `overrides` are used as-is; every other slot is
    /// inherited from `bases`, earlier bases taking precedence. With no bases
    /// the type derives from `object`.
    pub fn new_subclass(name: impl Into<String>, bases: &[TypeRef], overrides: Slots) -> TypeRef {
        let bases = if bases.is_empty() {
            vec![super::base::object_type().clone()]
        } else {
            bases.to_vec()
        };
        let mut slots = overrides;
        for base in &bases {
            slots.inherit_from(&base.slots);
        }
        Arc::new(Self {
            name: Cow::Owned(name.into()),
            bases,
            slots,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn bases(&self) -> &[TypeRef] {
        &self.bases
    }

    #[must_use]
    pub fn slots(&self) -> &Slots {
        &self.slots
    }

    /// Address of the descriptor, used as the final ordering tiebreak.
    #[must_use]
    pub fn addr(&self) -> usize {
        ptr::from_ref(self) as usize
    }

    /// Returns true if `self` is `other` or derives from it through any base.
    #[must_use]
    pub fn is_subtype(&self, other: &Self) -> bool {
        ptr::eq(self, other) || self.bases.iter().any(|base| base.is_subtype(other))
    }

    /// Returns true if `self` derives from `other` and is not `other` itself.
    #[must_use]
    pub fn is_proper_subtype(&self, other: &Self) -> bool {
        !ptr::eq(self, other) && self.is_subtype(other)
    }
}
