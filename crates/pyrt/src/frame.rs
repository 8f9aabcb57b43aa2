//! Suspension state for generator bodies.
//!
//! A generator body is an ordinary function that is re-entered on every
//! resume. It finds where to continue by popping the checkpoint it pushed
//! before suspending, and finds its local state in the frame's locals. The
//! frame is plain data, so a suspended computation is just "body + frame".
//!
//! ```
//! use pyrt::{Frame, RunResult, Value};
//!
//! // yields 10, then 20, then finishes
//! fn body(frame: &mut Frame, _sent: Value) -> RunResult<Option<Value>> {
//!     match frame.resume_point() {
//!         0 => Ok(Some(frame.yield_at(1, Value::int(10)))),
//!         1 => Ok(Some(frame.yield_at(2, Value::int(20)))),
//!         _ => Ok(None),
//!     }
//! }
//!
//! let mut frame = Frame::new();
//! assert_eq!(body(&mut frame, Value::none()).unwrap().unwrap().as_int(), Some(10));
//! assert_eq!(frame.checkpoint_depth(), 1);
//! ```

use crate::value::Value;

/// Saved execution context of a suspended generator body.
#[derive(Debug, Default)]
pub struct Frame {
    /// Stack of resume points; the top is where the next resume continues.
    checkpoints: Vec<usize>,
    locals: Vec<Value>,
}

impl Frame {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records where execution continues after the next suspension.
    pub fn push_checkpoint(&mut self, resume_at: usize) {
        self.checkpoints.push(resume_at);
    }

    pub fn pop_checkpoint(&mut self) -> Option<usize> {
        self.checkpoints.pop()
    }

    /// Pops the pending checkpoint, or returns `0` on first entry.
    pub fn resume_point(&mut self) -> usize {
        self.pop_checkpoint().unwrap_or(0)
    }

    #[must_use]
    pub fn checkpoint_depth(&self) -> usize {
        self.checkpoints.len()
    }

    /// Pushes `resume_at` and hands back `value`, for `return Ok(Some(frame.yield_at(..)))`.
    pub fn yield_at(&mut self, resume_at: usize, value: Value) -> Value {
        self.push_checkpoint(resume_at);
        value
    }

    #[must_use]
    pub fn local(&self, index: usize) -> Option<&Value> {
        self.locals.get(index)
    }

    /// Stores a local, growing the locals with `None` as needed.
    pub fn set_local(&mut self, index: usize, value: Value) {
        if index >= self.locals.len() {
            self.locals.resize(index + 1, Value::none());
        }
        self.locals[index] = value;
    }

    #[must_use]
    pub fn locals(&self) -> &[Value] {
        &self.locals
    }

    /// Drops every checkpoint and local, as when the body finishes.
    pub fn clear(&mut self) {
        self.checkpoints.clear();
        self.locals.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoints_are_lifo() {
        let mut frame = Frame::new();
        assert_eq!(frame.resume_point(), 0);
        frame.push_checkpoint(3);
        frame.push_checkpoint(7);
        assert_eq!(frame.resume_point(), 7);
        assert_eq!(frame.resume_point(), 3);
        assert_eq!(frame.resume_point(), 0);
    }

    #[test]
    fn set_local_grows_with_none() {
        let mut frame = Frame::new();
        frame.set_local(2, Value::int(5));
        assert_eq!(frame.locals().len(), 3);
        assert!(frame.local(0).is_some_and(Value::is_none));
        assert_eq!(frame.local(2).and_then(Value::as_int), Some(5));
        frame.clear();
        assert!(frame.locals().is_empty());
    }
}
