use std::hint::black_box;

use criterion::{Bencher, Criterion, criterion_group, criterion_main};
use pyrt::{Frame, RunResult, Value};

/// Sums `0..n` with `+=`, staying within machine integers.
fn run_int_loop(bench: &mut Bencher, n: i64, expected: i64) {
    let sum = |n: i64| {
        let mut total = Value::int(0);
        for i in 0..n {
            total = pyrt::iadd(&total, &Value::int(i)).unwrap();
        }
        total
    };
    assert_eq!(sum(n).as_int(), Some(expected));
    bench.iter(|| black_box(sum(black_box(n))));
}

/// Repeated doubling that overflows into `long` after 63 steps.
fn run_promoting_loop(bench: &mut Bencher, steps: usize) {
    let double = |steps: usize| {
        let mut value = Value::int(1);
        for _ in 0..steps {
            value = pyrt::mul(&value, &Value::int(2)).unwrap();
        }
        value
    };
    assert_eq!(double(steps).type_name(), "long");
    bench.iter(|| black_box(double(black_box(steps))));
}

/// Builds a set of `n` ints and probes every member.
fn run_set_membership(bench: &mut Bencher, n: i64) {
    let items: Vec<Value> = (0..n).map(Value::int).collect();
    let set = Value::set(items.clone()).unwrap();
    bench.iter(|| {
        for item in &items {
            black_box(pyrt::contains(&set, item).unwrap());
        }
    });
}

fn counter(frame: &mut Frame, _sent: Value) -> RunResult<Option<Value>> {
    let next = frame.resume_point();
    if next >= 1000 {
        return Ok(None);
    }
    Ok(Some(frame.yield_at(next + 1, Value::int(i64::try_from(next).unwrap_or_default()))))
}

/// Drains a generator yielding 1000 ints.
fn run_generator(bench: &mut Bencher) {
    assert_eq!(pyrt::collect(&Value::generator(counter)).unwrap().len(), 1000);
    bench.iter(|| black_box(pyrt::collect(&Value::generator(counter)).unwrap()));
}

/// Sorts mixed numbers through the rich comparison path.
fn run_sort_mixed(bench: &mut Bencher) {
    let values: Vec<Value> = (0..500_i32)
        .map(|i| match i % 3 {
            0 => Value::int(i64::from(997 * i % 500)),
            1 => Value::float(f64::from(i) / 3.0),
            _ => Value::long(i * 7 % 500),
        })
        .collect();
    bench.iter(|| black_box(pyrt::sorted(&values).unwrap()));
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("int_iadd_loop_1000", |b| run_int_loop(b, 1000, 499_500));
    c.bench_function("promoting_mul_100", |b| run_promoting_loop(b, 100));
    c.bench_function("set_membership_1000", |b| run_set_membership(b, 1000));
    c.bench_function("generator_drain_1000", run_generator);
    c.bench_function("sort_mixed_500", run_sort_mixed);
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
