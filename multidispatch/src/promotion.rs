//! Conversion and promotion.
//!
//! A [`Converter`] turns a value into a member of a target type. It is
//! consulted when an implementation's result does not belong to the
//! declared return type of its method.
//!
//! [`ConversionTable`] is the default converter: conversions into each
//! target type are methods of an ordinary dispatched [`Function`], so the
//! most specific conversion for the value's type wins. Promotion rules
//! name the common type two types are converted to before mixed-type
//! arithmetic.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::context::TypeContext;
use crate::dispatch::{MethodId, Resolution, Signature};
use crate::error::{DispatchError, DispatchResult};
use crate::function::Function;
use crate::types::Type;
use crate::value::Value;

/// Converts values to a target type.
pub trait Converter: Send + Sync {
    fn convert(&self, ctx: &TypeContext, value: Value, target: &Type) -> DispatchResult<Value>;
}

/// Passes through values that already belong to the target and rejects the
/// rest.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrictConverter;

impl Converter for StrictConverter {
    fn convert(&self, ctx: &TypeContext, value: Value, target: &Type) -> DispatchResult<Value> {
        if ctx.accepts(target, &value) {
            Ok(value)
        } else {
            Err(conversion_error(ctx, &value, target))
        }
    }
}

fn conversion_error(ctx: &TypeContext, value: &Value, target: &Type) -> DispatchError {
    DispatchError::Conversion {
        value_type: ctx.type_of(value).to_string(),
        target: target.to_string(),
    }
}

/// Registered conversions and promotion rules.
pub struct ConversionTable {
    ctx: Arc<TypeContext>,
    /// Conversions into each target type, in registration order.
    conversions: RwLock<IndexMap<Type, Arc<Function>>>,
    /// Promotion rules dispatch on the pair of types being promoted.
    rules: Function,
    /// Target of each rule, keyed by its parameter pair.
    rule_targets: RwLock<FxHashMap<(Type, Type), Type>>,
}

impl ConversionTable {
    pub fn new(ctx: Arc<TypeContext>) -> Self {
        Self {
            rules: Function::new("promotion_rule", ctx.clone()),
            ctx,
            conversions: RwLock::new(IndexMap::new()),
            rule_targets: RwLock::new(FxHashMap::default()),
        }
    }

    /// Register a conversion from members of `from` into `to`.
    pub fn add_conversion<F>(&self, from: Type, to: Type, f: F) -> DispatchResult<MethodId>
    where
        F: Fn(&Value) -> DispatchResult<Value> + Send + Sync + 'static,
    {
        let function = {
            let mut conversions = self.conversions.write();
            conversions
                .entry(to.clone())
                .or_insert_with(|| {
                    Arc::new(Function::new(format!("convert[{}]", to), self.ctx.clone()))
                })
                .clone()
        };
        function.register(Signature::new([from]), move |args: &[Value]| match args.first() {
            Some(value) => f(value),
            None => Err(DispatchError::implementation("conversion requires a value")),
        })
    }

    /// Convert `value` into a member of `target`.
    ///
    /// Values already belonging to `target` are returned unchanged.
    /// Otherwise conversions registered for `target` itself are tried, then
    /// those registered for subtypes of `target`.
    pub fn convert(&self, value: Value, target: &Type) -> DispatchResult<Value> {
        if self.ctx.accepts(target, &value) {
            return Ok(value);
        }

        let candidates: Vec<Arc<Function>> = {
            let conversions = self.conversions.read();
            let exact = conversions.get(target).cloned();
            exact
                .into_iter()
                .chain(
                    conversions
                        .iter()
                        .filter(|(to, _)| *to != target && self.ctx.is_subtype(to, target))
                        .map(|(_, function)| function.clone()),
                )
                .collect()
        };

        let args = [value];
        for function in candidates {
            match function.resolve(&args) {
                Resolution::Resolved(method) => return method.call(&args),
                Resolution::Ambiguous(err) => return Err(err.into()),
                Resolution::NoMatch(_) => continue,
            }
        }
        Err(conversion_error(&self.ctx, &args[0], target))
    }

    /// Declare that `left` and `right` promote to `to`. Rules are symmetric.
    pub fn add_promotion_rule(&self, left: Type, right: Type, to: Type) -> DispatchResult<()> {
        let mut pairs = vec![(left.clone(), right.clone())];
        if left != right {
            pairs.push((right, left));
        }
        let mut targets = self.rule_targets.write();
        for (a, b) in pairs {
            self.rules.register(
                Signature::new([a.clone(), b.clone()]),
                |_: &[Value]| Ok(Value::None),
            )?;
            targets.insert((a, b), to.clone());
        }
        drop(targets);
        debug!(target = %to, "added promotion rule");
        Ok(())
    }

    /// The common type of `left` and `right`.
    ///
    /// The most specific promotion rule wins. Without an applicable rule, the
    /// supertype of the pair is used when one is a subtype of the other.
    pub fn promotion_type(&self, left: &Type, right: &Type) -> DispatchResult<Type> {
        match self.rules.resolve_types(&[left.clone(), right.clone()]) {
            Resolution::Resolved(method) => {
                if let [a, b] = method.signature().types.as_slice() {
                    let key = (a.clone(), b.clone());
                    if let Some(target) = self.rule_targets.read().get(&key) {
                        return Ok(target.clone());
                    }
                }
            }
            Resolution::Ambiguous(err) => return Err(err.into()),
            Resolution::NoMatch(_) => {}
        }
        if self.ctx.is_subtype(left, right) {
            Ok(right.clone())
        } else if self.ctx.is_subtype(right, left) {
            Ok(left.clone())
        } else {
            Err(DispatchError::NoPromotion {
                left: left.to_string(),
                right: right.to_string(),
            })
        }
    }

    /// Convert `values` to their common type.
    pub fn promote(&self, values: &[Value]) -> DispatchResult<Vec<Value>> {
        let mut types = values.iter().map(|v| self.ctx.type_of(v));
        let Some(first) = types.next() else {
            return Ok(Vec::new());
        };
        let common = types.try_fold(first, |common, ty| self.promotion_type(&common, &ty))?;
        values
            .iter()
            .map(|value| self.convert(value.clone(), &common))
            .collect()
    }
}

impl Converter for ConversionTable {
    fn convert(&self, _ctx: &TypeContext, value: Value, target: &Type) -> DispatchResult<Value> {
        ConversionTable::convert(self, value, target)
    }
}

impl fmt::Debug for ConversionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionTable")
            .field("targets", &self.conversions.read().keys().collect::<Vec<_>>())
            .field("rules", &self.rules.len())
            .finish()
    }
}
