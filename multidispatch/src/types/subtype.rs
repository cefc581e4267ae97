//! The subtype relation and value membership.

use crate::class::ClassId;
use crate::config::ContainerCheck;
use crate::context::TypeContext;
use crate::parametric::ParametricType;
use crate::types::Type;
use crate::value::Value;

impl TypeContext {
    /// Check whether `a <: b`.
    ///
    /// The relation is reflexive and transitive. `Any` is the top. A union
    /// on the left must fit entirely; a union on the right needs only one
    /// member to fit.
    pub fn is_subtype(&self, a: &Type, b: &Type) -> bool {
        if a == b {
            return true;
        }
        match (a, b) {
            (_, Type::Any) => true,
            (Type::Any, _) => false,

            (Type::Union(members), _) => members.iter().all(|m| self.is_subtype(m, b)),
            (_, Type::Union(members)) => members.iter().any(|m| self.is_subtype(a, m)),

            (Type::Variadic(x), Type::Variadic(y)) => self.is_subtype(x, y),
            (Type::Variadic(_), _) | (_, Type::Variadic(_)) => false,

            // A refinement is a subtype of whatever its base is, but nothing
            // besides itself is known to be a subtype of a refinement.
            (Type::Predicate(p), _) => self.is_subtype(p.base(), b),
            (_, Type::Predicate(_)) => false,

            (Type::Concrete(x), Type::Concrete(y)) => {
                self.owns(x) && self.owns(y) && self.is_descendant(x.id(), y.id())
            }

            (Type::Parametric(x), Type::Parametric(y)) => self.parametric_subtype(x, y),
            (Type::Parametric(x), Type::Concrete(c)) => {
                self.is_descendant(x.family().class().id(), c.id())
            }
            (Type::Concrete(c), Type::Parametric(y)) => {
                !y.is_concrete() && self.is_descendant(c.id(), y.family().class().id())
            }

            (Type::Sequence(x), Type::Sequence(y)) => self.is_subtype(x, y),
            (Type::Sequence(_), Type::Concrete(c)) => self.is_descendant(ClassId::LIST, c.id()),
            (Type::Concrete(c), Type::Sequence(y)) => {
                y.is_any() && self.is_descendant(c.id(), ClassId::LIST)
            }
            (Type::Sequence(_), Type::Parametric(_)) | (Type::Parametric(_), Type::Sequence(_)) => {
                false
            }
        }
    }

    fn parametric_subtype(&self, a: &ParametricType, b: &ParametricType) -> bool {
        if !a.same_family(b) {
            return !b.is_concrete()
                && self.is_descendant(a.family().class().id(), b.family().class().id());
        }
        match (a.parameter(), b.parameter()) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(p), Some(q)) => {
                if a.same_instance(b) {
                    return true;
                }
                match a.family().compare_hook() {
                    Some(compare) => compare(self, p, q),
                    None => false,
                }
            }
        }
    }

    fn owns_value(&self, value: &Value) -> bool {
        match value {
            Value::Object(obj) => self.owns(obj.class()),
            Value::Instance(_) => self.owns(&value.class()),
            _ => true,
        }
    }

    /// Check whether `value` is a member of `ty`.
    ///
    /// For faithful types this coincides with
    /// `is_subtype(type_of(value), ty)`, including under a replaced
    /// [`TypeOf`](crate::types::TypeOf).
    pub fn accepts(&self, ty: &Type, value: &Value) -> bool {
        if !self.uses_default_type_of() && ty.is_faithful() {
            return self.is_subtype(&self.type_of(value), ty);
        }
        match ty {
            Type::Any => true,
            Type::Concrete(class) => {
                self.owns(class)
                    && self.owns_value(value)
                    && self.is_descendant(value.class_id(), class.id())
            }
            Type::Union(members) => members.iter().any(|m| self.accepts(m, value)),
            Type::Parametric(_) => self.is_subtype(&self.type_of(value), ty),
            Type::Variadic(_) => false,
            Type::Predicate(p) => self.accepts(p.base(), value) && p.check(value),
            Type::Sequence(element) => match value.as_list() {
                Some(items) => match self.config().container_check {
                    ContainerCheck::First => {
                        items.first().map_or(true, |first| self.accepts(element, first))
                    }
                    ContainerCheck::All => items.iter().all(|item| self.accepts(element, item)),
                },
                None => false,
            },
        }
    }
}
