#![doc = include_str!("../../../README.md")]
#![expect(clippy::cast_possible_truncation, reason = "numeric narrowing is checked")]
#![expect(clippy::cast_sign_loss, reason = "sign-changing casts are intentional")]
#![expect(clippy::needless_pass_by_value, reason = "slot signatures pass values uniformly")]
#![expect(clippy::float_cmp, reason = "numeric semantics require exact float comparison")]

pub mod dispatch;
mod exception_private;
mod frame;
mod object;
mod py_hash;
mod resource;
pub mod tracer;
pub mod types;
mod value;

pub use crate::{
    dispatch::{
        BinaryOp, CompareOp, SlotRole, UnaryOp, abs, add, and, binary_op, collect, compare, compare_bool, contains,
        default_order, del_item, div, div_mod, eq, floor_div, ge, get_item, gt, hash, iadd, iand, idiv, ifloor_div,
        ilshift, imodulo, imul, inplace_op, invert, ior, ipow, irshift, is_equal, is_true, isub, iter, ixor, le, len,
        lshift, lt, modulo, mul, ne, neg, next, or, pos, pow, repr, rshift, set_item, sorted, sub, to_object,
        unary_op, xor,
    },
    exception_private::{ExcType, RunError, RunResult, SimpleException},
    frame::Frame,
    object::{ConversionError, Object},
    resource::{DEFAULT_MAX_LONG_BITS, DEFAULT_MAX_SEQUENCE_LEN, ResourceError, ResourceLimits},
    tracer::{
        DispatchTracer, NoopTracer, ProfilingReport, ProfilingTracer, RecordingTracer, StderrTracer, TraceEvent,
    },
    types::{
        ByteArray, Complex, Dict, DictGuard, Generator, GeneratorBody, GeneratorState, LongInt, SetStorage, Slots,
        Type, TypeRef, parse_complex,
    },
    value::{Payload, Value},
};
