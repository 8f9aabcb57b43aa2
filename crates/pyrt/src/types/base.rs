//! The root `object` type and the two singleton types.

use std::sync::{Arc, LazyLock};

use super::{Slots, Type, TypeRef};
use crate::{exception_private::RunResult, object::Object, value::Value};

/// The root of every type hierarchy.
///
/// Only identity hashing is defined here; comparison and repr fall back to the
/// dispatch engine's defaults. Builtin types spell out their own slot tables,
/// so `object`'s slots reach user-defined subclasses only.
pub fn object_type() -> &'static TypeRef {
    static TYPE: LazyLock<TypeRef> = LazyLock::new(|| {
        Type::builtin(
            "object",
            Vec::new(),
            Slots {
                hash: Some(Arc::new(identity_hash)),
                ..Slots::default()
            },
        )
    });
    &TYPE
}

pub fn none_type() -> &'static TypeRef {
    static TYPE: LazyLock<TypeRef> = LazyLock::new(|| {
        Type::builtin(
            "NoneType",
            vec![object_type().clone()],
            Slots {
                hash: Some(Arc::new(identity_hash)),
                repr: Some(Arc::new(|_: &Value| Ok("None".to_owned()))),
                nonzero: Some(Arc::new(|_: &Value| Ok(false))),
                native: Some(Arc::new(|_: &Value| Ok(Object::None))),
                ..Slots::default()
            },
        )
    });
    &TYPE
}

pub fn not_implemented_type() -> &'static TypeRef {
    static TYPE: LazyLock<TypeRef> = LazyLock::new(|| {
        Type::builtin(
            "NotImplementedType",
            vec![object_type().clone()],
            Slots {
                hash: Some(Arc::new(identity_hash)),
                repr: Some(Arc::new(|_: &Value| Ok("NotImplemented".to_owned()))),
                ..Slots::default()
            },
        )
    });
    &TYPE
}

#[expect(clippy::cast_possible_wrap, reason = "addresses are hashed by bit pattern")]
pub(crate) fn identity_hash(v: &Value) -> RunResult<i64> {
    // low bits of an allocation address are always zero
    Ok((v.id() >> 4) as i64)
}
