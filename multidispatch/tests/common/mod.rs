//! Shared helpers for the integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use multidispatch::{DispatchResult, FamilyBuilder, Param, Type, TypeContext, Value};

/// Install a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Subscriber layer counting `WARN` events.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct WarningCounter(Arc<AtomicUsize>);

#[allow(dead_code)]
impl WarningCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarningCounter {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        if *event.metadata().level() == tracing::Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// An implementation that ignores its arguments and returns `s`.
#[allow(dead_code)]
pub fn constant(s: &'static str) -> impl Fn(&[Value]) -> DispatchResult<Value> + Send + Sync {
    move |_: &[Value]| Ok(Value::from(s))
}

/// Define `Pair`, a family indexed by `(n, t)`: instances hold exactly `n`
/// fields, each a member of `t`. `Pair[n, t] <: Pair[m, u]` when `n == m`
/// and `t <: u`.
#[allow(dead_code)]
pub fn define_pair(ctx: &TypeContext) -> Type {
    ctx.define_family(
        FamilyBuilder::new("Pair")
            .validate(|p| match p.as_tuple() {
                Some([Param::Int(n), Param::Type(_)]) if *n >= 0 => Ok(p.clone()),
                _ => Err("expected `(n, type)` with a non-negative `n`".to_string()),
            })
            .infer(|ctx, args| {
                let mut types = args.iter().map(|v| ctx.type_of(v));
                let element = match types.next() {
                    Some(first) => Type::union(std::iter::once(first).chain(types)),
                    None => Type::any(),
                };
                Ok(Param::tuple([Param::Int(args.len() as i64), Param::Type(element)]))
            })
            .compare(|ctx, p, q| match (p.as_tuple(), q.as_tuple()) {
                (Some([Param::Int(n), Param::Type(t)]), Some([Param::Int(m), Param::Type(u)])) => {
                    n == m && ctx.is_subtype(t, u)
                }
                _ => false,
            })
            .construct(|ctx, p, args| {
                let Some([Param::Int(n), Param::Type(t)]) = p.as_tuple() else {
                    return Err(format!("unexpected parameter {}", p));
                };
                if args.len() as i64 != *n {
                    return Err(format!("expected {} fields, got {}", n, args.len()));
                }
                if let Some(bad) = args.iter().find(|v| !ctx.accepts(t, v)) {
                    return Err(format!("field {:?} is not a member of {}", bad, t));
                }
                Ok(args)
            }),
    )
    .expect("Pair family")
}

/// `Pair[n, t]`.
#[allow(dead_code)]
pub fn pair_of(ctx: &TypeContext, pair: &Type, n: i64, t: Type) -> Type {
    ctx.index(pair, Param::tuple([Param::Int(n), Param::Type(t)]))
        .expect("valid Pair parameter")
}

#[allow(dead_code)]
pub fn shared_context() -> Arc<TypeContext> {
    Arc::new(TypeContext::new())
}
