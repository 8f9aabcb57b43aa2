//! Tests for `set` / `frozenset`: algebra, comparisons, and mutation detection
//! during comparison and iteration.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use pretty_assertions::assert_eq;
use pyrt::{CompareOp, ExcType, Payload, RunResult, Slots, Type, Value};

fn strs(items: &[&str]) -> Vec<Value> {
    items.iter().map(|s| Value::str(*s)).collect()
}

fn sorted_reprs(set: &Value) -> Vec<String> {
    let items = pyrt::collect(set).unwrap();
    pyrt::sorted(&items).unwrap().iter().map(|v| pyrt::repr(v).unwrap()).collect()
}

/// `{"a"} < {"a", "b"}` holds; `>` does not.
#[test]
fn proper_subset() {
    let s1 = Value::set(Vec::new()).unwrap();
    let s2 = Value::set(Vec::new()).unwrap();
    s1.as_mutable_set().unwrap().add(Value::str("a")).unwrap();
    s2.as_mutable_set().unwrap().add(Value::str("a")).unwrap();
    s2.as_mutable_set().unwrap().add(Value::str("b")).unwrap();
    assert!(pyrt::compare_bool(CompareOp::Lt, &s1, &s2).unwrap());
    assert!(!pyrt::compare_bool(CompareOp::Gt, &s1, &s2).unwrap());
    assert!(pyrt::compare_bool(CompareOp::Le, &s1, &s1).unwrap());
    assert!(!pyrt::compare_bool(CompareOp::Lt, &s1, &s1).unwrap());
    assert!(pyrt::compare_bool(CompareOp::Ge, &s2, &s1).unwrap());
}

/// Sets and frozensets with the same elements are equal; ordering against
/// a non-set is a TypeError while equality is simply false.
#[test]
fn cross_kind_comparison() {
    let set = Value::set(strs(&["x", "y"])).unwrap();
    let frozen = Value::frozenset(strs(&["y", "x"])).unwrap();
    assert!(pyrt::is_equal(&set, &frozen).unwrap());
    assert!(!pyrt::is_equal(&set, &Value::tuple(strs(&["x", "y"]))).unwrap());
    let err = pyrt::lt(&set, &Value::int(1)).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: can only compare to a set");
}

/// Set algebra; the result kind follows the left operand.
#[test]
fn algebra() {
    let a = Value::set(strs(&["a", "b", "c"])).unwrap();
    let b = Value::frozenset(strs(&["c", "d"])).unwrap();
    let union = pyrt::or(&a, &b).unwrap();
    assert_eq!(union.type_name(), "set");
    assert_eq!(sorted_reprs(&union), ["'a'", "'b'", "'c'", "'d'"]);
    let common = pyrt::and(&b, &a).unwrap();
    assert_eq!(common.type_name(), "frozenset");
    assert_eq!(sorted_reprs(&common), ["'c'"]);
    assert_eq!(sorted_reprs(&pyrt::sub(&a, &b).unwrap()), ["'a'", "'b'"]);
    assert_eq!(sorted_reprs(&pyrt::xor(&a, &b).unwrap()), ["'a'", "'b'", "'d'"]);
    let err = pyrt::or(&a, &Value::int(1)).unwrap_err();
    assert_eq!(err.message(), "unsupported operand type(s) for |: 'set' and 'int'");
}

/// In-place operators mutate a `set` but build a new `frozenset`.
#[test]
fn inplace_algebra() {
    let a = Value::set(strs(&["a", "b"])).unwrap();
    let result = pyrt::ior(&a, &Value::set(strs(&["c"])).unwrap()).unwrap();
    assert!(result.is(&a));
    assert_eq!(pyrt::len(&a).unwrap(), 3);
    let result = pyrt::isub(&a, &Value::frozenset(strs(&["a"])).unwrap()).unwrap();
    assert!(result.is(&a));
    assert_eq!(sorted_reprs(&a), ["'b'", "'c'"]);

    let frozen = Value::frozenset(strs(&["a"])).unwrap();
    let result = pyrt::ior(&frozen, &Value::set(strs(&["b"])).unwrap()).unwrap();
    assert!(!result.is(&frozen));
    assert_eq!(pyrt::len(&frozen).unwrap(), 1);
    assert_eq!(pyrt::len(&result).unwrap(), 2);
}

/// Membership, removal and the error cases of the mutating methods.
#[test]
fn element_operations() {
    let s = Value::set(vec![Value::int(1), Value::int(1), Value::float(1.0), Value::int(2)]).unwrap();
    assert_eq!(pyrt::len(&s).unwrap(), 2);
    assert!(pyrt::contains(&s, &Value::long(2)).unwrap());
    let storage = s.as_mutable_set().unwrap();
    assert!(!storage.add(Value::int(2)).unwrap());
    let err = storage.remove(&Value::str("missing")).unwrap_err();
    assert_eq!(err.to_string(), "KeyError: 'missing'");
    assert!(!storage.discard(&Value::str("missing")).unwrap());
    assert!(storage.discard(&Value::int(1)).unwrap());
    storage.pop().unwrap();
    assert_eq!(storage.pop().unwrap_err().to_string(), "KeyError: pop from an empty set");
    assert!(!pyrt::is_true(&s).unwrap());

    let err = storage.add(Value::set(Vec::new()).unwrap()).unwrap_err();
    assert_eq!(err.to_string(), "TypeError: unhashable type: 'set'");
    assert!(Value::frozenset(Vec::new()).unwrap().as_mutable_set().is_none());
}

/// Frozensets hash by content, independent of insertion order.
#[test]
fn frozenset_hash() {
    let a = Value::frozenset(vec![Value::int(1), Value::int(2), Value::int(3)]).unwrap();
    let b = Value::frozenset(vec![Value::int(3), Value::int(1), Value::int(2)]).unwrap();
    assert_eq!(pyrt::hash(&a).unwrap(), pyrt::hash(&b).unwrap());
    let outer = Value::set(vec![a.clone()]).unwrap();
    assert!(pyrt::contains(&outer, &b).unwrap());
    assert!(pyrt::hash(&Value::set(Vec::new()).unwrap()).is_err());
}

/// Repr uses the `set([...])` form.
#[test]
fn repr_forms() {
    assert_eq!(pyrt::repr(&Value::set(Vec::new()).unwrap()).unwrap(), "set()");
    assert_eq!(pyrt::repr(&Value::set(vec![Value::int(1)]).unwrap()).unwrap(), "set([1])");
    assert_eq!(
        pyrt::repr(&Value::frozenset(strs(&["a"])).unwrap()).unwrap(),
        "frozenset(['a'])"
    );
}

/// A key whose `==` adds an element to a set the first time it runs.
fn mutating_key_type(target: Arc<Mutex<Option<Value>>>) -> pyrt::TypeRef {
    let fired = Arc::new(AtomicBool::new(false));
    Type::new_subclass(
        "MutatingKey",
        &[],
        Slots {
            hash: Some(Arc::new(|_: &Value| Ok(7))),
            eq: Some(Arc::new(move |_: &Value, _: &Value| -> RunResult<Value> {
                if !fired.swap(true, Ordering::SeqCst)
                    && let Some(set) = target.lock().unwrap().clone()
                {
                    set.as_mutable_set().unwrap().add(Value::int(99))?;
                }
                Ok(Value::bool(true))
            })),
            ..Slots::default()
        },
    )
}

/// A comparison that observes a mutation of either operand fails instead of
/// answering.
#[test]
fn mutation_during_comparison_is_detected() {
    let target = Arc::new(Mutex::new(None));
    let key_type = mutating_key_type(Arc::clone(&target));
    let key = || Value::new_instance(&key_type, Payload::Object).unwrap();

    let s1 = Value::set(vec![key()]).unwrap();
    let s2 = Value::set(vec![key()]).unwrap();
    *target.lock().unwrap() = Some(s2.clone());

    let err = pyrt::eq(&s1, &s2).unwrap_err();
    assert_eq!(err.exc_type(), Some(ExcType::RuntimeError));
    assert_eq!(err.message(), "set changed during comparison");
    assert_eq!(pyrt::len(&s2).unwrap(), 2);
    target.lock().unwrap().take();
}

/// Without interference the same keys compare equal.
#[test]
fn equal_custom_keys() {
    let target = Arc::new(Mutex::new(None));
    let key_type = mutating_key_type(target);
    let key = || Value::new_instance(&key_type, Payload::Object).unwrap();
    let s1 = Value::set(vec![key()]).unwrap();
    let s2 = Value::set(vec![key()]).unwrap();
    assert!(pyrt::is_equal(&s1, &s2).unwrap());
    assert!(s1.as_set_storage().unwrap().is_subset(s2.as_set_storage().unwrap()).unwrap());
}

/// Adding to a set while iterating over it fails the iteration.
#[test]
fn mutation_during_iteration_is_detected() {
    let s = Value::set(vec![Value::int(1), Value::int(2)]).unwrap();
    let it = pyrt::iter(&s).unwrap();
    pyrt::next(&it).unwrap();
    s.as_mutable_set().unwrap().add(Value::int(3)).unwrap();
    let err = pyrt::next(&it).unwrap_err();
    assert_eq!(err.to_string(), "RuntimeError: Set changed size during iteration");
    // the iterator stays exhausted
    assert!(pyrt::next(&it).unwrap_err().is_stop_iteration());
}

/// Dict iteration is guarded the same way, and dict equality compares values.
#[test]
fn dict_guards() {
    let d = Value::dict();
    pyrt::set_item(&d, &Value::str("a"), &Value::int(1)).unwrap();
    pyrt::set_item(&d, &Value::str("b"), &Value::int(2)).unwrap();
    let it = pyrt::iter(&d).unwrap();
    assert_eq!(pyrt::next(&it).unwrap().as_str(), Some("a"));
    // replacing a value is not a structural change
    pyrt::set_item(&d, &Value::str("a"), &Value::int(10)).unwrap();
    assert_eq!(pyrt::next(&it).unwrap().as_str(), Some("b"));
    pyrt::del_item(&d, &Value::str("a")).unwrap();
    let err = pyrt::next(&it).unwrap_err();
    assert_eq!(err.message(), "dictionary changed size during iteration");

    let other = Value::dict();
    pyrt::set_item(&other, &Value::str("b"), &Value::float(2.0)).unwrap();
    assert!(pyrt::is_equal(&d, &other).unwrap());
    let err = pyrt::get_item(&d, &Value::str("zzz")).unwrap_err();
    assert_eq!(err.to_string(), "KeyError: 'zzz'");
}
