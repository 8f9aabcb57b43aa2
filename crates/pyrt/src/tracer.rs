//! Dispatch tracing infrastructure.
//!
//! Provides a trait-based tracing system for the dispatch engine. Hooks fire at
//! the decision points that are otherwise invisible to callers: which slot
//! handled a binary operator, when a comparison fell back to the default
//! order, when machine integers were promoted to `long`, and every generator
//! state transition.
//!
//! # Architecture
//!
//! | Tracer | Purpose |
//! |--------|---------|
//! | [`NoopTracer`] | Does nothing (the behavior when no tracer is installed) |
//! | [`StderrTracer`] | Human-readable dispatch log to stderr |
//! | [`ProfilingTracer`] | Per-operator counters |
//! | [`RecordingTracer`] | Full event recording for post-mortem analysis |
//!
//! # Usage
//!
//! Values are shared freely between threads, so a tracer cannot be threaded
//! through every call. Instead it is installed for the current thread for the
//! duration of a closure and handed back afterwards:
//!
//! ```
//! use pyrt::{Value, tracer::{ProfilingTracer, with_tracer}};
//!
//! let (sum, tracer) = with_tracer(ProfilingTracer::new(), || pyrt::add(&Value::int(1), &Value::int(2))).unwrap();
//! assert_eq!(sum.unwrap().as_int(), Some(3));
//! assert_eq!(tracer.report().binary_ops, 1);
//! ```

use std::{any::Any, cell::RefCell, fmt};

use indexmap::IndexMap;

use crate::{
    dispatch::{binary::SlotRole, compare::CompareOp},
    exception_private::{RunError, RunResult},
    types::GeneratorState,
};

/// Trace event emitted by the dispatch engine.
///
/// Used by [`RecordingTracer`] to capture a full trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// A slot returned a result for a binary operator.
    BinaryOp {
        /// Operator symbol, e.g. `+` or `divmod()`.
        op: &'static str,
        /// Which candidate slot produced the result.
        role: SlotRole,
        left: String,
        right: String,
    },
    /// Every candidate declined a binary operator; a TypeError follows.
    BinaryUnsupported { op: &'static str, left: String, right: String },
    /// No comparison slot handled the pair; the default total order decided.
    CompareFallback { op: CompareOp, left: String, right: String },
    /// Machine-width integer arithmetic overflowed and was redone as `long`.
    Promotion { op: &'static str },
    /// A generator changed state.
    GeneratorTransition { from: GeneratorState, to: GeneratorState },
}

/// Trait for dispatch tracing.
///
/// All methods have default no-op implementations, so implementations only
/// override the hooks they care about. Hooks must not call back into the
/// dispatch engine: events raised while a hook runs are dropped.
pub trait DispatchTracer: Any + fmt::Debug {
    /// Called when a slot handles a binary operator.
    ///
    /// # Arguments
    /// * `op` - Operator symbol as used in error messages
    /// * `role` - Whether the forward, reflected or in-place slot answered
    /// * `left` / `right` - Type names of the operands in source order
    #[inline(always)]
    fn on_binary_op(&mut self, _op: &'static str, _role: SlotRole, _left: &str, _right: &str) {}

    /// Called when no candidate slot supports a binary operator.
    #[inline(always)]
    fn on_binary_unsupported(&mut self, _op: &'static str, _left: &str, _right: &str) {}

    /// Called when a rich comparison falls back to identity or the default order.
    #[inline(always)]
    fn on_compare_fallback(&mut self, _op: CompareOp, _left: &str, _right: &str) {}

    /// Called when an `int` operation overflows and is recomputed as `long`.
    #[inline(always)]
    fn on_promotion(&mut self, _op: &'static str) {}

    /// Called on every generator state change.
    #[inline(always)]
    fn on_generator_transition(&mut self, _from: GeneratorState, _to: GeneratorState) {}
}

// ============================================================================
// Installation
// ============================================================================

thread_local! {
    static TRACER: RefCell<Option<Box<dyn DispatchTracer>>> = const { RefCell::new(None) };
}

/// Reinstates the previously installed tracer, also when the closure panics.
struct InstallGuard {
    previous: Option<Box<dyn DispatchTracer>>,
    restored: bool,
}

impl InstallGuard {
    fn restore(&mut self) -> Option<Box<dyn DispatchTracer>> {
        self.restored = true;
        let previous = self.previous.take();
        TRACER.with(|slot| slot.replace(previous))
    }
}

impl Drop for InstallGuard {
    fn drop(&mut self) {
        if !self.restored {
            self.restore();
        }
    }
}

/// Runs `f` with `tracer` installed on the current thread, then returns the
/// closure's result together with the tracer.
///
/// Calls nest: an inner `with_tracer` shadows the outer tracer and restores it
/// on exit. Work done on other threads is not traced.
///
/// Fails with an internal error if the installed tracer is no longer the one
/// this call put in place when the closure returns.
pub fn with_tracer<T: DispatchTracer, R>(tracer: T, f: impl FnOnce() -> R) -> RunResult<(R, T)> {
    let previous = TRACER.with(|slot| slot.replace(Some(Box::new(tracer))));
    let mut guard = InstallGuard {
        previous,
        restored: false,
    };
    let result = f();
    let installed: Box<dyn Any> = guard
        .restore()
        .ok_or_else(|| RunError::internal("tracer was removed while installed"))?;
    let tracer = installed
        .downcast::<T>()
        .map_err(|_| RunError::internal("installed tracer was replaced by another type"))?;
    Ok((result, *tracer))
}

/// Forwards an event to the current thread's tracer, if any.
#[inline]
pub(crate) fn emit(event: impl FnOnce(&mut dyn DispatchTracer)) {
    TRACER.with(|slot| {
        // a hook that re-enters dispatch finds the slot borrowed and is skipped
        if let Ok(mut installed) = slot.try_borrow_mut()
            && let Some(tracer) = installed.as_mut()
        {
            event(tracer.as_mut());
        }
    });
}

// ============================================================================
// NoopTracer
// ============================================================================

/// A tracer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl DispatchTracer for NoopTracer {}

// ============================================================================
// StderrTracer
// ============================================================================

/// Tracer that prints a human-readable dispatch log to stderr.
///
/// Output format:
/// ```text
/// [binary] int + float -> reflected
/// [promote] int * overflowed to long
/// [compare] NoneType < int -> default order
/// [generator] Created -> Running
/// ```
#[derive(Debug, Default)]
pub struct StderrTracer {
    /// Maximum number of lines to print. None = unlimited.
    limit: Option<usize>,
    count: usize,
}

impl StderrTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tracer that stops printing after `limit` lines.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            count: 0,
        }
    }

    /// Number of lines printed so far.
    #[must_use]
    pub fn lines_written(&self) -> usize {
        self.count
    }

    fn line(&mut self, args: fmt::Arguments<'_>) {
        if self.limit.is_some_and(|limit| self.count >= limit) {
            return;
        }
        eprintln!("{args}");
        self.count += 1;
        if let Some(limit) = self.limit
            && self.count == limit
        {
            eprintln!("--- trace limit reached ({limit} lines) ---");
        }
    }
}

impl DispatchTracer for StderrTracer {
    fn on_binary_op(&mut self, op: &'static str, role: SlotRole, left: &str, right: &str) {
        self.line(format_args!("[binary] {left} {op} {right} -> {role}"));
    }

    fn on_binary_unsupported(&mut self, op: &'static str, left: &str, right: &str) {
        self.line(format_args!("[binary] {left} {op} {right} -> unsupported"));
    }

    fn on_compare_fallback(&mut self, op: CompareOp, left: &str, right: &str) {
        self.line(format_args!("[compare] {left} {} {right} -> default order", op.symbol()));
    }

    fn on_promotion(&mut self, op: &'static str) {
        self.line(format_args!("[promote] int {op} overflowed to long"));
    }

    fn on_generator_transition(&mut self, from: GeneratorState, to: GeneratorState) {
        self.line(format_args!("[generator] {from} -> {to}"));
    }
}

// ============================================================================
// ProfilingTracer
// ============================================================================

/// Tracer that counts dispatch events.
///
/// Retrieve results via [`ProfilingTracer::report`].
#[derive(Debug, Default)]
pub struct ProfilingTracer {
    /// Handled binary operators keyed by symbol, in first-seen order.
    op_counts: IndexMap<&'static str, u64>,
    reflected: u64,
    unsupported: u64,
    compare_fallbacks: u64,
    promotions: u64,
    generator_transitions: u64,
}

/// Summary report from a profiling trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilingReport {
    /// Per-operator counts, most frequent first.
    pub op_counts: Vec<(&'static str, u64)>,
    /// Total binary operators handled by some slot.
    pub binary_ops: u64,
    /// How many of those were answered by a reflected slot.
    pub reflected: u64,
    pub unsupported: u64,
    pub compare_fallbacks: u64,
    pub promotions: u64,
    pub generator_transitions: u64,
}

impl ProfilingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates a report from the collected counters.
    #[must_use]
    pub fn report(&self) -> ProfilingReport {
        let mut op_counts: Vec<_> = self.op_counts.iter().map(|(&k, &v)| (k, v)).collect();
        // stable sort keeps first-seen order among ties
        op_counts.sort_by(|a, b| b.1.cmp(&a.1));
        ProfilingReport {
            binary_ops: op_counts.iter().map(|(_, n)| n).sum(),
            op_counts,
            reflected: self.reflected,
            unsupported: self.unsupported,
            compare_fallbacks: self.compare_fallbacks,
            promotions: self.promotions,
            generator_transitions: self.generator_transitions,
        }
    }
}

impl DispatchTracer for ProfilingTracer {
    #[inline]
    fn on_binary_op(&mut self, op: &'static str, role: SlotRole, _left: &str, _right: &str) {
        *self.op_counts.entry(op).or_insert(0) += 1;
        if role == SlotRole::Reflected {
            self.reflected += 1;
        }
    }

    fn on_binary_unsupported(&mut self, _op: &'static str, _left: &str, _right: &str) {
        self.unsupported += 1;
    }

    fn on_compare_fallback(&mut self, _op: CompareOp, _left: &str, _right: &str) {
        self.compare_fallbacks += 1;
    }

    fn on_promotion(&mut self, _op: &'static str) {
        self.promotions += 1;
    }

    fn on_generator_transition(&mut self, _from: GeneratorState, _to: GeneratorState) {
        self.generator_transitions += 1;
    }
}

impl fmt::Display for ProfilingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Dispatch Profiling Report ===")?;
        writeln!(f, "Binary ops:            {}", self.binary_ops)?;
        writeln!(f, "  via reflected slot:  {}", self.reflected)?;
        writeln!(f, "Unsupported:           {}", self.unsupported)?;
        writeln!(f, "Compare fallbacks:     {}", self.compare_fallbacks)?;
        writeln!(f, "Long promotions:       {}", self.promotions)?;
        writeln!(f, "Generator transitions: {}", self.generator_transitions)?;
        writeln!(f)?;
        writeln!(f, "--- Operator Frequency ---")?;
        for (op, count) in &self.op_counts {
            let pct = (*count as f64 / self.binary_ops as f64) * 100.0;
            writeln!(f, "  {op:<12} {count:>10}  ({pct:>5.1}%)")?;
        }
        Ok(())
    }
}

// ============================================================================
// RecordingTracer
// ============================================================================

/// Tracer that records every event in chronological order.
///
/// Allocates per event, so use it for tests and short debugging sessions.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    events: Vec<TraceEvent>,
    /// Optional limit on number of events recorded.
    limit: Option<usize>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a recording tracer that stops recording after `limit` events.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            events: Vec::with_capacity(limit.min(1024)),
            limit: Some(limit),
        }
    }

    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    #[must_use]
    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events
    }

    fn record(&mut self, event: TraceEvent) {
        if self.limit.is_some_and(|l| self.events.len() >= l) {
            return;
        }
        self.events.push(event);
    }
}

impl DispatchTracer for RecordingTracer {
    fn on_binary_op(&mut self, op: &'static str, role: SlotRole, left: &str, right: &str) {
        self.record(TraceEvent::BinaryOp {
            op,
            role,
            left: left.to_owned(),
            right: right.to_owned(),
        });
    }

    fn on_binary_unsupported(&mut self, op: &'static str, left: &str, right: &str) {
        self.record(TraceEvent::BinaryUnsupported {
            op,
            left: left.to_owned(),
            right: right.to_owned(),
        });
    }

    fn on_compare_fallback(&mut self, op: CompareOp, left: &str, right: &str) {
        self.record(TraceEvent::CompareFallback {
            op,
            left: left.to_owned(),
            right: right.to_owned(),
        });
    }

    fn on_promotion(&mut self, op: &'static str) {
        self.record(TraceEvent::Promotion { op });
    }

    fn on_generator_transition(&mut self, from: GeneratorState, to: GeneratorState) {
        self.record(TraceEvent::GeneratorTransition { from, to });
    }
}
