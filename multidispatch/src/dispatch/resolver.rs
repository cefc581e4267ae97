//! The specificity resolver.

use std::cmp::Ordering;
use std::sync::Arc;

use super::result::{AmbiguityError, Mismatch, NoMatchError, Resolution};
use super::signature::Signature;
use super::table::Method;
use crate::context::TypeContext;
use crate::types::Type;
use crate::value::Value;

/// What a resolution is asked to cover.
#[derive(Debug, Clone, Copy)]
pub enum Target<'t> {
    /// Concrete argument values; membership decides applicability.
    Values(&'t [Value]),
    /// Declared argument types; subtyping decides applicability.
    Types(&'t [Type]),
}

impl Target<'_> {
    pub fn len(&self) -> usize {
        match self {
            Target::Values(values) => values.len(),
            Target::Types(types) => types.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Types of the target, for diagnostics.
    pub fn types(&self, ctx: &TypeContext) -> Vec<Type> {
        match self {
            Target::Values(values) => values.iter().map(|v| ctx.type_of(v)).collect(),
            Target::Types(types) => types.to_vec(),
        }
    }
}

/// Selects the most specific applicable method.
pub struct DispatchResolver<'a> {
    ctx: &'a TypeContext,
}

impl<'a> DispatchResolver<'a> {
    pub fn new(ctx: &'a TypeContext) -> Self {
        Self { ctx }
    }

    /// Resolve a call of `function` against `candidates`.
    pub fn resolve(
        &self,
        function: &str,
        target: Target<'_>,
        candidates: &[Arc<Method>],
    ) -> Resolution {
        let applicable = self.applicable(target, candidates);
        self.select(function, target, candidates, applicable)
    }

    /// Filter `candidates` to those applicable to `target`, preserving order.
    pub fn applicable(&self, target: Target<'_>, candidates: &[Arc<Method>]) -> Vec<Arc<Method>> {
        match target {
            Target::Types(types) => {
                let declared = Signature::new(types.iter().cloned());
                candidates
                    .iter()
                    .filter(|m| self.sig_leq(&declared, m.signature()))
                    .cloned()
                    .collect()
            }
            Target::Values(values) => candidates
                .iter()
                .filter(|m| self.is_applicable(m.signature(), values))
                .cloned()
                .collect(),
        }
    }

    /// Check if a signature is applicable to the given argument values.
    ///
    /// The arity must fit (excess arguments go to the variadic tail) and
    /// every argument must belong to the parameter type at its position.
    pub fn is_applicable(&self, signature: &Signature, values: &[Value]) -> bool {
        if !signature.accepts_arity(values.len()) {
            return false;
        }
        values.iter().enumerate().all(|(i, value)| {
            signature
                .type_at(i)
                .is_some_and(|ty| self.ctx.accepts(ty, value))
        })
    }

    /// Measure how far `signature` is from covering `target`.
    ///
    /// The distance is the arity difference after expanding the variadic
    /// tail, plus one for every argument outside its parameter type.
    pub fn mismatch(&self, signature: &Signature, target: Target<'_>) -> Mismatch {
        let n = target.len();
        let fixed = signature.types.len();
        let mut positions = Vec::new();
        let mut tail_misses = 0;
        for i in 0..n {
            let Some(ty) = signature.type_at(i) else {
                break;
            };
            if self.covers(ty, target, i) {
                continue;
            }
            if i < fixed {
                positions.push(i);
            } else {
                tail_misses += 1;
            }
        }
        let expanded = if signature.has_varargs() { fixed.max(n) } else { fixed };
        Mismatch {
            signature: signature.clone(),
            distance: expanded.abs_diff(n) + positions.len() + tail_misses,
            positions,
            varargs_matched: tail_misses == 0,
        }
    }

    fn covers(&self, ty: &Type, target: Target<'_>, i: usize) -> bool {
        match target {
            Target::Values(values) => values.get(i).is_some_and(|v| self.ctx.accepts(ty, v)),
            Target::Types(types) => types.get(i).is_some_and(|t| self.ctx.is_subtype(t, ty)),
        }
    }

    /// Pick the winner among the applicable methods.
    pub fn select(
        &self,
        function: &str,
        target: Target<'_>,
        candidates: &[Arc<Method>],
        applicable: Vec<Arc<Method>>,
    ) -> Resolution {
        if applicable.is_empty() {
            let mut closest: Vec<Mismatch> = candidates
                .iter()
                .map(|m| self.mismatch(m.signature(), target))
                .collect();
            closest.sort_by_key(|m| m.distance);
            return Resolution::NoMatch(NoMatchError {
                function: function.to_string(),
                arg_types: target.types(self.ctx),
                candidates: candidates.iter().map(|m| m.signature().clone()).collect(),
                closest,
            });
        }

        let mut minimal = self.find_minimal(&applicable);
        if minimal.len() > 1 {
            let highest = minimal
                .iter()
                .map(|m| m.signature().precedence)
                .max()
                .unwrap_or_default();
            minimal.retain(|m| m.signature().precedence == highest);
        }

        if minimal.len() == 1 {
            if let Some(method) = minimal.pop() {
                return Resolution::Resolved(method);
            }
        }

        Resolution::Ambiguous(AmbiguityError {
            function: function.to_string(),
            arg_types: target.types(self.ctx),
            candidates: minimal.iter().map(|m| m.signature().clone()).collect(),
        })
    }

    /// Find the minimal methods of the applicable set.
    ///
    /// A method is minimal if no other applicable method is strictly more
    /// specific.
    fn find_minimal(&self, applicable: &[Arc<Method>]) -> Vec<Arc<Method>> {
        applicable
            .iter()
            .filter(|m| {
                !applicable.iter().any(|other| {
                    !Arc::ptr_eq(m, other)
                        && self.is_more_specific(other.signature(), m.signature())
                })
            })
            .cloned()
            .collect()
    }

    /// The specificity partial order: `a` is at least as specific as `b`.
    ///
    /// Arity must be compatible, with the shorter side padded by its
    /// variadic tail. Every position of `a` must be a subtype of the same
    /// position of `b`. When every position is equivalent, a variadic tail
    /// makes a signature less specific than a fixed-arity one.
    pub fn sig_leq(&self, a: &Signature, b: &Signature) -> bool {
        let (n, m) = (a.arity(), b.arity());
        let compatible =
            n == m || (n > m && b.has_varargs()) || (n < m && a.has_varargs());
        if !compatible {
            return false;
        }

        let mut all_equivalent = true;
        for i in 0..n.max(m) {
            let (Some(x), Some(y)) = (a.type_at(i), b.type_at(i)) else {
                return false;
            };
            if !self.ctx.is_subtype(x, y) {
                return false;
            }
            if all_equivalent && !self.ctx.is_subtype(y, x) {
                all_equivalent = false;
            }
        }

        match (&a.varargs, &b.varargs) {
            (Some(x), Some(y)) => self.ctx.is_subtype(x, y),
            (Some(_), None) => !all_equivalent,
            _ => true,
        }
    }

    /// Check if signature `a` is strictly more specific than `b`.
    pub fn is_more_specific(&self, a: &Signature, b: &Signature) -> bool {
        self.sig_leq(a, b) && !self.sig_leq(b, a)
    }

    /// Compare the specificity of two signatures.
    ///
    /// Returns:
    /// - `Ordering::Less` if `a` is more specific
    /// - `Ordering::Greater` if `b` is more specific
    /// - `Ordering::Equal` if neither is (potential ambiguity)
    pub fn compare_specificity(&self, a: &Signature, b: &Signature) -> Ordering {
        match (self.is_more_specific(a, b), self.is_more_specific(b, a)) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => Ordering::Equal,
        }
    }
}
