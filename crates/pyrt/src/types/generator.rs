//! Generators: resumable computations driven by an explicit state machine.
//!
//! A generator owns a [`Frame`] and a [`GeneratorBody`]. Each resume takes
//! both out of the generator, runs the body with no lock held and puts them
//! back. The state mutex is the only gate: a resume must move the state into
//! `Running` before it may touch the body, so a generator never has two
//! resumes in flight, while distinct generators run fully in parallel.

use std::{
    fmt,
    sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError},
};

use serde::{Deserialize, Serialize};

use super::{Slots, Type, TypeRef, base::{identity_hash, object_type}};
use crate::{
    exception_private::{ExcType, RunError, RunResult},
    frame::Frame,
    tracer,
    value::{Payload, Value},
};

/// Lifecycle of a generator. `Done` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, Serialize, Deserialize)]
pub enum GeneratorState {
    /// Not resumed yet; the first resume must not send a value.
    Created,
    /// Suspended after producing a value.
    Ready,
    /// A resume is in flight.
    Running,
    /// Exhausted, failed or closed.
    Done,
}

/// The computation a generator drives.
///
/// `resume` is re-entered once per resume with the generator's frame and the
/// sent value (`None` on first entry and for plain `next`). It returns
/// `Ok(Some(v))` to yield `v`, `Ok(None)` when the computation is finished,
/// or an error, which also finishes the generator. Closures of the matching
/// shape implement this trait.
pub trait GeneratorBody: Send {
    fn resume(&mut self, frame: &mut Frame, sent: Value) -> RunResult<Option<Value>>;
}

impl<F> GeneratorBody for F
where
    F: FnMut(&mut Frame, Value) -> RunResult<Option<Value>> + Send,
{
    fn resume(&mut self, frame: &mut Frame, sent: Value) -> RunResult<Option<Value>> {
        self(frame, sent)
    }
}

/// Body and frame; present unless a resume has them checked out.
struct Suspended {
    frame: Frame,
    body: Box<dyn GeneratorBody>,
}

/// Payload of a `generator` value.
pub struct Generator {
    state: Mutex<GeneratorState>,
    suspended: Mutex<Option<Suspended>>,
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator").field("state", &self.state()).finish_non_exhaustive()
    }
}

impl Generator {
    #[must_use]
    pub fn new(body: impl GeneratorBody + 'static) -> Self {
        Self {
            state: Mutex::new(GeneratorState::Created),
            suspended: Mutex::new(Some(Suspended {
                frame: Frame::new(),
                body: Box::new(body),
            })),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, GeneratorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_suspended(&self) -> MutexGuard<'_, Option<Suspended>> {
        self.suspended.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn state(&self) -> GeneratorState {
        *self.lock_state()
    }

    /// Moves the state under the lock the caller already holds.
    fn transition(state: &mut GeneratorState, to: GeneratorState) {
        let from = *state;
        *state = to;
        tracer::emit(|t| t.on_generator_transition(from, to));
    }

    /// Runs the body until it yields, finishes or fails.
    ///
    /// `sent` becomes the value of the suspended yield; it must be `None` on
    /// the first resume. Exhaustion is reported as StopIteration, now and on
    /// every later resume.
    pub fn resume(&self, sent: Value) -> RunResult<Value> {
        {
            let mut state = self.lock_state();
            match *state {
                GeneratorState::Created if !sent.is_none() => return Err(ExcType::generator_send_not_started()),
                GeneratorState::Created | GeneratorState::Ready => {
                    Self::transition(&mut state, GeneratorState::Running);
                }
                GeneratorState::Running => return Err(ExcType::generator_already_executing()),
                GeneratorState::Done => return Err(ExcType::stop_iteration()),
            }
        }
        let mut running = RunningGuard {
            generator: self,
            finished: false,
        };

        let checked_out = self.lock_suspended().take();
        let outcome = match checked_out {
            Some(mut suspended) => {
                let outcome = suspended.body.resume(&mut suspended.frame, sent);
                if matches!(outcome, Ok(Some(_))) {
                    *self.lock_suspended() = Some(suspended);
                }
                outcome
            }
            None => Err(RunError::internal("running generator has no suspended body")),
        };
        running.finished = true;

        let mut state = self.lock_state();
        match outcome {
            Ok(Some(value)) => {
                Self::transition(&mut state, GeneratorState::Ready);
                Ok(value)
            }
            Ok(None) => {
                Self::transition(&mut state, GeneratorState::Done);
                Err(ExcType::stop_iteration())
            }
            Err(err) => {
                Self::transition(&mut state, GeneratorState::Done);
                Err(err)
            }
        }
    }

    /// `gen.next()`: resumes with `None`.
    pub fn next(&self) -> RunResult<Value> {
        self.resume(Value::none())
    }

    /// `gen.send(value)`
    pub fn send(&self, value: Value) -> RunResult<Value> {
        self.resume(value)
    }

    /// Finishes the generator without resuming it, dropping its frame.
    ///
    /// Closing a finished generator does nothing; closing a running one fails.
    pub fn close(&self) -> RunResult<()> {
        let mut state = self.lock_state();
        match *state {
            GeneratorState::Running => Err(ExcType::generator_already_executing()),
            GeneratorState::Done => Ok(()),
            GeneratorState::Created | GeneratorState::Ready => {
                Self::transition(&mut state, GeneratorState::Done);
                drop(state);
                self.lock_suspended().take();
                Ok(())
            }
        }
    }
}

/// Moves a generator whose body unwound out of a resume to `Done`.
struct RunningGuard<'a> {
    generator: &'a Generator,
    finished: bool,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let mut state = self.generator.lock_state();
            Generator::transition(&mut state, GeneratorState::Done);
        }
    }
}

impl Value {
    /// Creates a generator in the `Created` state driving `body`.
    #[must_use]
    pub fn generator(body: impl GeneratorBody + 'static) -> Self {
        Self::from_parts(generator_type().clone(), Payload::Generator(Generator::new(body)))
    }

    /// Creates a generator yielding the items of a Rust iterator.
    ///
    /// Values sent into it are ignored.
    #[must_use]
    pub fn generator_from_iter<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Self>,
        I::IntoIter: Send + 'static,
    {
        let mut items = items.into_iter();
        Self::generator(move |_: &mut Frame, _: Self| -> RunResult<Option<Self>> { Ok(items.next()) })
    }
}

fn generator_of(v: &Value) -> RunResult<&Generator> {
    v.as_generator()
        .ok_or_else(|| RunError::internal("generator slot called on a non-generator payload"))
}

/// The builtin `generator` type. A generator is its own iterator.
pub fn generator_type() -> &'static TypeRef {
    static TYPE: LazyLock<TypeRef> = LazyLock::new(|| {
        Type::builtin(
            "generator",
            vec![object_type().clone()],
            Slots {
                hash: Some(Arc::new(identity_hash)),
                repr: Some(Arc::new(|v: &Value| Ok(format!("<generator object at {:#x}>", v.id())))),
                iter: Some(Arc::new(|v: &Value| Ok(v.clone()))),
                next: Some(Arc::new(|v: &Value| generator_of(v)?.next())),
                ..Slots::default()
            },
        )
    });
    &TYPE
}
