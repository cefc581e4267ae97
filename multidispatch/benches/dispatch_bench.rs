//! Dispatch benchmarks using criterion.
//!
//! Compares cold resolution against cached calls for fixed-arity, variadic
//! and parametric signatures.
//!
//! Run with: cargo bench --bench dispatch_bench

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use multidispatch::{
    DispatchResult, FamilyBuilder, Function, Param, Signature, Type, TypeContext, Value,
};

fn constant(s: &'static str) -> impl Fn(&[Value]) -> DispatchResult<Value> + Send + Sync {
    move |_: &[Value]| Ok(Value::from(s))
}

/// A function with a small hierarchy of two-argument methods.
fn numeric_function(ctx: Arc<TypeContext>) -> Function {
    let f = Function::new("combine", ctx);
    let types = [Type::object(), Type::number(), Type::real(), Type::int(), Type::float()];
    for left in &types {
        for right in &types {
            f.register(Signature::new([left.clone(), right.clone()]), constant("ok"))
                .expect("register");
        }
    }
    f
}

/// Benchmark cached vs cold resolution
fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");
    let f = numeric_function(Arc::new(TypeContext::new()));
    let args = [Value::from(1), Value::from(2.0)];

    group.bench_function("cached", |b| {
        f.call(&args).expect("warm up");
        b.iter(|| black_box(f.call(black_box(&args)).expect("call")));
    });

    group.bench_function("cold", |b| {
        b.iter(|| {
            f.invalidate_cache();
            black_box(f.call(black_box(&args)).expect("call"))
        });
    });

    group.finish();
}

/// Benchmark variadic resolution over growing argument lists
fn bench_varargs(c: &mut Criterion) {
    let mut group = c.benchmark_group("varargs");
    let f = Function::new("sum", Arc::new(TypeContext::new()));
    f.register(Signature::new([]).with_varargs(Type::number()), constant("number"))
        .expect("register");
    f.register(Signature::new([Type::int()]).with_varargs(Type::int()), constant("int"))
        .expect("register");

    for n in [1usize, 4, 16] {
        let args: Vec<Value> = (0..n as i64).map(Value::from).collect();
        group.bench_with_input(BenchmarkId::new("cached", n), &args, |b, args| {
            b.iter(|| black_box(f.call(black_box(args)).expect("call")));
        });
    }

    group.finish();
}

/// Benchmark dispatch on parametric instances
fn bench_parametric(c: &mut Criterion) {
    let mut group = c.benchmark_group("parametric");
    let ctx = Arc::new(TypeContext::new());
    let boxed = ctx
        .define_family(FamilyBuilder::new("Boxed").compare(|ctx, left, right| {
            match (left.as_type(), right.as_type()) {
                (Some(l), Some(r)) => ctx.is_subtype(l, r),
                _ => false,
            }
        }))
        .expect("define family");

    let f = Function::new("unbox", ctx.clone());
    f.register(Signature::new([boxed.clone()]), constant("boxed")).expect("register");
    f.register(
        Signature::new([ctx.index(&boxed, Type::number()).expect("index")]),
        constant("number"),
    )
    .expect("register");

    let value = ctx.construct(&boxed, vec![Value::from(1)]).expect("construct");

    group.bench_function("index", |b| {
        b.iter(|| black_box(ctx.index(&boxed, Param::Type(Type::int())).expect("index")));
    });

    group.bench_function("cached_call", |b| {
        b.iter(|| black_box(f.call(black_box(std::slice::from_ref(&value))).expect("call")));
    });

    group.finish();
}

criterion_group!(benches, bench_resolution, bench_varargs, bench_parametric);
criterion_main!(benches);
