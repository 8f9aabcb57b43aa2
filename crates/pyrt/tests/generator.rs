//! Tests for the generator state machine: lifecycle, send, close and the
//! single-resume guarantee across threads.

use std::{
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Barrier, Mutex, mpsc},
    thread,
};

use pretty_assertions::assert_eq;
use pyrt::{ExcType, Frame, GeneratorState, RunResult, Value};

fn one_two(frame: &mut Frame, _sent: Value) -> RunResult<Option<Value>> {
    match frame.resume_point() {
        0 => Ok(Some(frame.yield_at(1, Value::int(1)))),
        1 => Ok(Some(frame.yield_at(2, Value::int(2)))),
        _ => Ok(None),
    }
}

fn state(generator: &Value) -> GeneratorState {
    generator.as_generator().unwrap().state()
}

/// Yields 1 and 2, then finishes; every later resume is StopIteration.
#[test]
fn lifecycle() {
    let g = Value::generator(one_two);
    assert_eq!(state(&g), GeneratorState::Created);
    assert_eq!(pyrt::next(&g).unwrap().as_int(), Some(1));
    assert_eq!(state(&g), GeneratorState::Ready);
    assert_eq!(pyrt::next(&g).unwrap().as_int(), Some(2));
    assert_eq!(state(&g), GeneratorState::Ready);
    assert!(pyrt::next(&g).unwrap_err().is_stop_iteration());
    assert_eq!(state(&g), GeneratorState::Done);
    assert!(pyrt::next(&g).unwrap_err().is_stop_iteration());
}

/// The first resume may not carry a value.
#[test]
fn send_before_start_fails() {
    let g = Value::generator(one_two);
    let generator = g.as_generator().unwrap();
    let err = generator.send(Value::int(5)).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: can't send non-None value to a just-started generator");
    // the failed send does not start the generator
    assert_eq!(generator.state(), GeneratorState::Created);
    assert_eq!(generator.send(Value::none()).unwrap().as_int(), Some(1));
}

/// Locals survive between resumes and sent values reach the body.
#[test]
fn running_total() {
    fn accumulate(frame: &mut Frame, sent: Value) -> RunResult<Option<Value>> {
        if frame.resume_point() == 0 {
            frame.set_local(0, Value::int(0));
            return Ok(Some(frame.yield_at(1, Value::int(0))));
        }
        if sent.is_none() {
            return Ok(None);
        }
        let total = pyrt::add(frame.local(0).unwrap(), &sent)?;
        frame.set_local(0, total.clone());
        Ok(Some(frame.yield_at(1, total)))
    }

    let g = Value::generator(accumulate);
    let generator = g.as_generator().unwrap();
    generator.next().unwrap();
    assert_eq!(generator.send(Value::int(3)).unwrap().as_int(), Some(3));
    assert_eq!(generator.send(Value::int(4)).unwrap().as_int(), Some(7));
    assert!(generator.next().unwrap_err().is_stop_iteration());
}

/// An error raised by the body finishes the generator.
#[test]
fn body_error_is_terminal() {
    let g = Value::generator(|frame: &mut Frame, _: Value| -> RunResult<Option<Value>> {
        match frame.resume_point() {
            0 => Ok(Some(frame.yield_at(1, Value::int(1)))),
            _ => pyrt::div(&Value::int(1), &Value::int(0)).map(Some),
        }
    });
    pyrt::next(&g).unwrap();
    let err = pyrt::next(&g).unwrap_err();
    assert_eq!(err.exc_type(), Some(ExcType::ZeroDivisionError));
    assert_eq!(state(&g), GeneratorState::Done);
    assert!(pyrt::next(&g).unwrap_err().is_stop_iteration());
}

/// A body that panics leaves the generator finished, not stuck running.
#[test]
fn body_panic_is_terminal() {
    let g = Value::generator(|frame: &mut Frame, _: Value| -> RunResult<Option<Value>> {
        match frame.resume_point() {
            0 => Ok(Some(frame.yield_at(1, Value::int(1)))),
            _ => panic!("body failed"),
        }
    });
    pyrt::next(&g).unwrap();
    let unwound = panic::catch_unwind(AssertUnwindSafe(|| pyrt::next(&g)));
    assert!(unwound.is_err());
    assert_eq!(state(&g), GeneratorState::Done);
    assert!(pyrt::next(&g).unwrap_err().is_stop_iteration());
}

/// A body resuming its own generator is rejected.
#[test]
fn reentrant_resume_fails() {
    let slot: Arc<Mutex<Option<Value>>> = Arc::default();
    let inner = Arc::clone(&slot);
    let g = Value::generator(move |_: &mut Frame, _: Value| -> RunResult<Option<Value>> {
        let me = inner.lock().unwrap().clone().unwrap();
        pyrt::next(&me).map(Some)
    });
    *slot.lock().unwrap() = Some(g.clone());
    let err = pyrt::next(&g).unwrap_err();
    assert_eq!(err.to_string(), "ValueError: generator already executing");
    assert_eq!(state(&g), GeneratorState::Done);
    // break the reference cycle
    slot.lock().unwrap().take();
}

/// Of two threads resuming the same generator at once, exactly one runs the
/// body and the other fails with "already executing".
#[test]
fn concurrent_resume_rejected() {
    let (entered_tx, entered_rx) = mpsc::channel::<()>();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let release_rx = Mutex::new(release_rx);
    let g = Value::generator(move |frame: &mut Frame, _: Value| -> RunResult<Option<Value>> {
        let _ = frame.resume_point();
        entered_tx.send(()).ok();
        release_rx.lock().unwrap().recv().ok();
        Ok(Some(frame.yield_at(1, Value::int(1))))
    });

    let barrier = Arc::new(Barrier::new(2));
    let (result_tx, result_rx) = mpsc::channel();
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let (g, barrier, result_tx) = (g.clone(), Arc::clone(&barrier), result_tx.clone());
            thread::spawn(move || {
                barrier.wait();
                result_tx.send(pyrt::next(&g)).unwrap();
            })
        })
        .collect();

    entered_rx.recv().unwrap();
    // the body is blocked, so the first result must be the rejected resume
    let rejected = result_rx.recv().unwrap().unwrap_err();
    assert_eq!(rejected.to_string(), "ValueError: generator already executing");
    release_tx.send(()).unwrap();
    let accepted = result_rx.recv().unwrap().unwrap();
    assert_eq!(accepted.as_int(), Some(1));
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(state(&g), GeneratorState::Ready);
}

/// While one thread is inside the body, every other resume fails with "already executing".
#[test]
fn resume_while_running_always_fails() {
    let (entered_tx, entered_rx) = mpsc::channel::<()>();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let release_rx = Mutex::new(release_rx);
    let g = Value::generator(move |frame: &mut Frame, _: Value| -> RunResult<Option<Value>> {
        let _ = frame.resume_point();
        entered_tx.send(()).ok();
        release_rx.lock().unwrap().recv().ok();
        Ok(Some(frame.yield_at(1, Value::int(1))))
    });

    let runner = {
        let g = g.clone();
        thread::spawn(move || pyrt::next(&g))
    };
    entered_rx.recv().unwrap();
    assert_eq!(state(&g), GeneratorState::Running);
    for _ in 0..3 {
        let err = pyrt::next(&g).unwrap_err();
        assert_eq!(err.exc_type(), Some(ExcType::ValueError));
        assert_eq!(err.message(), "generator already executing");
    }
    assert!(g.as_generator().unwrap().close().is_err());
    release_tx.send(()).unwrap();
    assert_eq!(runner.join().unwrap().unwrap().as_int(), Some(1));
    assert_eq!(state(&g), GeneratorState::Ready);
}

/// Distinct generators run on separate threads without interfering.
#[test]
fn independent_generators_in_parallel() {
    let handles: Vec<_> = (0..4)
        .map(|n| {
            thread::spawn(move || {
                let g = Value::generator_from_iter((0..100).map(move |i| Value::int(i * n)));
                pyrt::collect(&g).unwrap().iter().filter_map(Value::as_int).sum::<i64>()
            })
        })
        .collect();
    let sums: Vec<i64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(sums, vec![0, 4950, 9900, 14850]);
}

/// Closing stops the generator and drops its frame.
#[test]
fn close_finishes() {
    let g = Value::generator(one_two);
    pyrt::next(&g).unwrap();
    g.as_generator().unwrap().close().unwrap();
    assert_eq!(state(&g), GeneratorState::Done);
    assert!(pyrt::next(&g).unwrap_err().is_stop_iteration());
}

/// A generator is its own iterator and plugs into the iteration protocol.
#[test]
fn iterator_protocol() {
    let g = Value::generator(one_two);
    assert!(pyrt::iter(&g).unwrap().is(&g));
    let items: Vec<i64> = pyrt::collect(&g).unwrap().iter().filter_map(Value::as_int).collect();
    assert_eq!(items, vec![1, 2]);
    assert!(pyrt::contains(&Value::generator(one_two), &Value::int(2)).unwrap());
    assert!(pyrt::repr(&g).unwrap().starts_with("<generator object at 0x"));
}
