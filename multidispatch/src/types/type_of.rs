//! Runtime type inference.

use tracing::trace;

use crate::context::TypeContext;
use crate::parametric::ParametricType;
use crate::types::Type;
use crate::value::Value;

/// Maps a runtime value to its most specific type.
///
/// Implementations may be swapped at runtime with
/// [`TypeContext::set_type_of`]; doing so invalidates every resolution cache
/// built against the context.
pub trait TypeOf: Send + Sync {
    fn type_of(&self, ctx: &TypeContext, value: &Value) -> Type;

    /// Whether this inference reports every plain value's own class.
    /// Membership tests may then compare classes directly instead of
    /// going through [`TypeOf::type_of`].
    fn is_default(&self) -> bool {
        false
    }
}

/// Parametric instances report their concrete type. Other values are offered
/// to families with a `type_of` hook in definition order, and otherwise
/// report their class.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultTypeOf;

impl TypeOf for DefaultTypeOf {
    fn type_of(&self, ctx: &TypeContext, value: &Value) -> Type {
        if let Value::Instance(inst) = value {
            return inst.ty().clone();
        }
        for family in ctx.recognizers().iter() {
            let Some(hook) = family.type_of_hook() else {
                continue;
            };
            let Some(parameter) = hook(ctx, value) else {
                continue;
            };
            let family_type = Type::Parametric(ParametricType::unparameterized(family.clone()));
            match ctx.index(&family_type, parameter) {
                Ok(ty) => return ty,
                Err(err) => {
                    trace!(family = family.name(), error = %err, "rejected inferred parameter");
                }
            }
        }
        Type::Concrete(value.class())
    }

    fn is_default(&self) -> bool {
        true
    }
}

impl TypeContext {
    /// The most specific type of `value`.
    pub fn type_of(&self, value: &Value) -> Type {
        let inference = self.type_of_impl();
        inference.type_of(self, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parametric::{FamilyBuilder, Param};
    use std::sync::Arc;

    #[test]
    fn test_builtin_values() {
        let ctx = TypeContext::new();
        assert_eq!(ctx.type_of(&Value::from(1)), Type::int());
        assert_eq!(ctx.type_of(&Value::from(true)), Type::bool());
        assert_eq!(ctx.type_of(&Value::list([])), Type::list());
    }

    #[test]
    fn test_hook_recognises_foreign_values() {
        let ctx = TypeContext::new();
        let sized = ctx
            .define_family(FamilyBuilder::new("Sized").extends(Type::list()).type_of(|_, v| {
                v.as_list().map(|items| Param::Int(items.len() as i64))
            }))
            .unwrap();
        let value = Value::list([Value::from(1), Value::from(2)]);
        let ty = ctx.type_of(&value);
        assert_eq!(ty, ctx.index(&sized, 2i64).unwrap());
        assert!(!ty.is_faithful());
        assert_eq!(ctx.type_of(&Value::from("x")), Type::str());
    }

    struct Everything;

    impl TypeOf for Everything {
        fn type_of(&self, _ctx: &TypeContext, _value: &Value) -> Type {
            Type::object()
        }
    }

    #[test]
    fn test_custom_inference_bumps_epoch() {
        let ctx = TypeContext::new();
        let before = ctx.epoch();
        ctx.set_type_of(Arc::new(Everything));
        assert!(ctx.epoch() > before);
        assert_eq!(ctx.type_of(&Value::from(1)), Type::object());
    }
}
