//! Resolution cache behaviour observed through the public API.

mod common;

use std::sync::Arc;

use common::{constant, define_pair, pair_of, shared_context, WarningCounter};
use multidispatch::{
    DispatchConfig, DispatchError, Function, Param, Resolution, Signature, Type, TypeContext,
    TypeOf, Value,
};
use tracing_subscriber::layer::SubscriberExt;

#[test]
fn test_new_specific_method_replaces_cached_resolution() {
    let f = Function::new("f", shared_context());
    f.register(Signature::new([Type::object()]), constant("object")).unwrap();
    assert_eq!(f.call(&[Value::from(1)]).unwrap(), Value::from("object"));
    assert_eq!(f.cache_stats().entries, 1);

    f.register(Signature::new([Type::int()]), constant("int")).unwrap();
    assert_eq!(f.cache_stats().entries, 0);
    assert_eq!(f.call(&[Value::from(1)]).unwrap(), Value::from("int"));
}

#[test]
fn test_cached_failure_cleared_by_registration() {
    let f = Function::new("f", shared_context());
    f.register(Signature::new([Type::int()]), constant("int")).unwrap();
    assert!(f.call(&[Value::from("s")]).is_err());
    assert!(f.call(&[Value::from("s")]).is_err());
    assert_eq!(f.cache_stats().hits, 1);

    f.register(Signature::new([Type::str()]), constant("str")).unwrap();
    assert_eq!(f.call(&[Value::from("s")]).unwrap(), Value::from("str"));
}

#[test]
fn test_resolution_is_deterministic() {
    let f = Function::new("f", shared_context());
    f.register(Signature::new([Type::number(), Type::any()]), constant("a")).unwrap();
    f.register(Signature::new([Type::int(), Type::str()]), constant("b")).unwrap();

    let args = [Value::from(1), Value::from("x")];
    let first = match f.resolve(&args) {
        Resolution::Resolved(method) => method.id(),
        other => panic!("Expected resolution, got {:?}", other),
    };
    for _ in 0..3 {
        match f.resolve(&args) {
            Resolution::Resolved(method) => assert_eq!(method.id(), first),
            other => panic!("Expected resolution, got {:?}", other),
        }
    }
}

#[test]
fn test_explicit_invalidation() {
    let f = Function::new("f", shared_context());
    f.register(Signature::new([Type::int()]), constant("int")).unwrap();
    f.call(&[Value::from(1)]).unwrap();
    f.invalidate_cache();
    assert_eq!(f.cache_stats().entries, 0);
    assert_eq!(f.call(&[Value::from(1)]).unwrap(), Value::from("int"));
}

#[test]
fn test_parametric_instances_get_separate_entries() {
    let ctx = shared_context();
    let pair = define_pair(&ctx);
    let f = Function::new("f", ctx.clone());
    f.register(Signature::new([pair_of(&ctx, &pair, 2, Type::int())]), constant("ints"))
        .unwrap();
    f.register(Signature::new([pair.clone()]), constant("pair")).unwrap();

    let ints = ctx.construct(&pair, vec![Value::from(1), Value::from(2)]).unwrap();
    let floats = ctx.construct(&pair, vec![Value::from(1.0), Value::from(2.0)]).unwrap();
    assert_eq!(f.call(&[ints.clone()]).unwrap(), Value::from("ints"));
    assert_eq!(f.call(&[floats]).unwrap(), Value::from("pair"));
    assert_eq!(f.call(&[ints]).unwrap(), Value::from("ints"));
    assert_eq!(f.cache_stats().entries, 2);
}

struct EverythingIsAFloat;

impl TypeOf for EverythingIsAFloat {
    fn type_of(&self, _ctx: &TypeContext, _value: &Value) -> Type {
        Type::float()
    }
}

#[test]
fn test_replacing_type_inference_invalidates_cache() {
    let ctx = shared_context();
    let pair = define_pair(&ctx);
    let f = Function::new("f", ctx.clone());
    f.register(Signature::new([pair_of(&ctx, &pair, 1, Type::int())]), constant("int pair"))
        .unwrap();
    f.register(Signature::new([Type::object()]), constant("object")).unwrap();

    let value = ctx.construct(&pair, vec![Value::from(1)]).unwrap();
    assert_eq!(f.call(&[value.clone()]).unwrap(), Value::from("int pair"));

    // The entry computed under the old inference stays until the next
    // resolution, which must not serve it.
    ctx.set_type_of(Arc::new(EverythingIsAFloat));
    assert_eq!(f.cache_stats().entries, 1);
    assert_eq!(f.call(&[value]).unwrap(), Value::from("object"));
}

#[test]
fn test_replaced_inference_drives_class_membership() {
    let ctx = shared_context();
    let f = Function::new("f", ctx.clone());
    f.register(Signature::new([Type::int()]), constant("int")).unwrap();
    f.register(Signature::new([Type::float()]), constant("float")).unwrap();
    assert_eq!(f.call(&[Value::from(1)]).unwrap(), Value::from("int"));

    ctx.set_type_of(Arc::new(EverythingIsAFloat));
    assert_eq!(f.call(&[Value::from(1)]).unwrap(), Value::from("float"));
    assert_eq!(f.call(&[Value::from("s")]).unwrap(), Value::from("float"));
}

#[test]
fn test_cached_ambiguity_cleared_by_more_specific_method() {
    let f = Function::new("f", shared_context());
    f.register(Signature::new([Type::int(), Type::number()]), constant("left")).unwrap();
    f.register(Signature::new([Type::number(), Type::int()]), constant("right")).unwrap();

    let args = [Value::from(1), Value::from(2)];
    for _ in 0..2 {
        match f.call(&args) {
            Err(DispatchError::Ambiguous(err)) => assert_eq!(err.candidates.len(), 2),
            other => panic!("Expected ambiguity, got {:?}", other),
        }
    }
    let stats = f.cache_stats();
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.hits, 1);

    f.register(Signature::new([Type::int(), Type::int()]), constant("both")).unwrap();
    assert_eq!(f.cache_stats().entries, 0);
    assert_eq!(f.call(&args).unwrap(), Value::from("both"));
}

fn redefine_twice(config: DispatchConfig) -> (Function, usize) {
    let counter = WarningCounter::default();
    let subscriber = tracing_subscriber::registry().with(counter.clone());
    let f = Function::new("f", Arc::new(TypeContext::with_config(config)));
    tracing::subscriber::with_default(subscriber, || {
        f.register(Signature::new([Type::int()]), constant("first")).unwrap();
        f.register(Signature::new([Type::int()]), constant("second")).unwrap();
    });
    (f, counter.count())
}

#[test]
fn test_redefinition_warns_by_default() {
    let (f, warnings) = redefine_twice(DispatchConfig::default());
    assert_eq!(warnings, 1);
    assert_eq!(f.len(), 1);
    assert_eq!(f.call(&[Value::from(1)]).unwrap(), Value::from("second"));
}

#[test]
fn test_silenced_redefinition_still_replaces() {
    let config = DispatchConfig {
        warn_on_redefinition: false,
        ..DispatchConfig::default()
    };
    let (f, warnings) = redefine_twice(config);
    assert_eq!(warnings, 0);
    assert_eq!(f.len(), 1);
    assert_eq!(f.call(&[Value::from(1)]).unwrap(), Value::from("second"));
}

#[test]
fn test_recognizer_families_make_types_unfaithful() {
    let ctx = Arc::new(TypeContext::with_config(DispatchConfig::default()));
    let sized = ctx
        .define_family(
            multidispatch::FamilyBuilder::new("Sized")
                .extends(Type::list())
                .type_of(|_, v| v.as_list().map(|items| Param::Int(items.len() as i64))),
        )
        .unwrap();
    let f = Function::new("len_kind", ctx.clone());
    f.register(Signature::new([ctx.index(&sized, 2i64).unwrap()]), constant("two"))
        .unwrap();
    f.register(Signature::new([Type::list()]), constant("list")).unwrap();

    let two = Value::list([Value::from(1), Value::from(2)]);
    let three = Value::list([Value::from(1), Value::from(2), Value::from(3)]);
    assert_eq!(f.call(&[two]).unwrap(), Value::from("two"));
    assert_eq!(f.call(&[three]).unwrap(), Value::from("list"));
}
