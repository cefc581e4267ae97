//! The type model.
//!
//! A [`Type`] is one of:
//!
//! - `Any`, the top of the lattice
//! - `Concrete`, a class from the host hierarchy
//! - `Union`, a flattened and deduplicated set of member types
//! - `Parametric`, a family either unparameterized or indexed by a parameter
//! - `Variadic`, the element type of a trailing variadic parameter
//! - `Predicate`, membership decided by an explicit check over values
//! - `Sequence`, a homogeneous `list` of some element type
//!
//! The subtype relation lives in [`subtype`] and runtime type inference in
//! [`type_of`]; both are methods on [`TypeContext`](crate::TypeContext).

pub mod subtype;
pub mod type_of;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHasher;

use crate::class::{ClassId, ClassRef};
use crate::error::{DispatchError, DispatchResult};
use crate::parametric::{Param, ParametricType};
use crate::value::Value;

pub use type_of::{DefaultTypeOf, TypeOf};

/// Membership check carried by a predicate type.
pub type PredicateFn = dyn Fn(&Value) -> bool + Send + Sync;

/// A type in the subtype lattice.
#[derive(Clone)]
pub enum Type {
    Any,
    Concrete(ClassRef),
    /// Never nested and never holding duplicates. Build with [`Type::union`].
    Union(Arc<[Type]>),
    Parametric(ParametricType),
    Variadic(Arc<Type>),
    Predicate(PredicateType),
    Sequence(Arc<Type>),
}

/// A type whose membership is decided by running a check over the value.
#[derive(Clone)]
pub struct PredicateType {
    name: Arc<str>,
    base: Arc<Type>,
    check: Arc<PredicateFn>,
}

impl PredicateType {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Values must belong to the base before the check runs.
    pub fn base(&self) -> &Type {
        &self.base
    }

    pub fn check(&self, value: &Value) -> bool {
        (self.check)(value)
    }
}

impl PartialEq for PredicateType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.check, &other.check) && self.name == other.name
    }
}

impl Eq for PredicateType {}

impl Hash for PredicateType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        (Arc::as_ptr(&self.check) as *const () as usize).hash(state);
    }
}

impl Type {
    pub fn any() -> Self {
        Type::Any
    }

    pub fn object() -> Self {
        Type::builtin(ClassId::OBJECT)
    }

    pub fn number() -> Self {
        Type::builtin(ClassId::NUMBER)
    }

    pub fn real() -> Self {
        Type::builtin(ClassId::REAL)
    }

    pub fn int() -> Self {
        Type::builtin(ClassId::INT)
    }

    pub fn float() -> Self {
        Type::builtin(ClassId::FLOAT)
    }

    pub fn bool() -> Self {
        Type::builtin(ClassId::BOOL)
    }

    pub fn str() -> Self {
        Type::builtin(ClassId::STR)
    }

    pub fn list() -> Self {
        Type::builtin(ClassId::LIST)
    }

    pub fn tuple() -> Self {
        Type::builtin(ClassId::TUPLE)
    }

    pub fn none() -> Self {
        Type::builtin(ClassId::NONE)
    }

    fn builtin(id: ClassId) -> Self {
        Type::Concrete(ClassRef::builtin(id))
    }

    /// Build a union, flattening nested unions and dropping duplicates.
    ///
    /// A union of one member is that member, and a union containing `Any`
    /// is `Any`. An empty union is kept as-is and rejected at registration.
    pub fn union(members: impl IntoIterator<Item = Type>) -> Self {
        let mut flat: Vec<Type> = Vec::new();
        for member in members {
            match member {
                Type::Union(inner) => {
                    for t in inner.iter() {
                        if !flat.contains(t) {
                            flat.push(t.clone());
                        }
                    }
                }
                Type::Any => return Type::Any,
                other => {
                    if !flat.contains(&other) {
                        flat.push(other);
                    }
                }
            }
        }
        if flat.len() == 1 {
            return flat.pop().unwrap_or(Type::Any);
        }
        Type::Union(flat.into())
    }

    /// Element type of a trailing variadic parameter.
    pub fn variadic(element: Type) -> Self {
        Type::Variadic(Arc::new(element))
    }

    /// A homogeneous `list` of `element`.
    pub fn sequence(element: Type) -> Self {
        Type::Sequence(Arc::new(element))
    }

    /// A type whose members are the values of `base` accepted by `check`.
    pub fn predicate<F>(name: impl Into<Arc<str>>, base: Type, check: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Type::Predicate(PredicateType {
            name: name.into(),
            base: Arc::new(base),
            check: Arc::new(check),
        })
    }

    /// Whether membership of any value coincides with testing its runtime
    /// type, which is what makes exact-match caching sound.
    pub fn is_faithful(&self) -> bool {
        match self {
            Type::Any | Type::Concrete(_) => true,
            Type::Union(members) => members.iter().all(Type::is_faithful),
            Type::Parametric(p) => p.family().is_faithful(),
            Type::Variadic(element) => element.is_faithful(),
            Type::Predicate(_) | Type::Sequence(_) => false,
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Type::Any)
    }

    pub fn as_class(&self) -> Option<&ClassRef> {
        match self {
            Type::Concrete(class) => Some(class),
            _ => None,
        }
    }

    pub fn as_parametric(&self) -> Option<&ParametricType> {
        match self {
            Type::Parametric(p) => Some(p),
            _ => None,
        }
    }

    /// The parameter of a concrete parametric type.
    pub fn parameter(&self) -> DispatchResult<&Param> {
        self.as_parametric()
            .and_then(ParametricType::parameter)
            .ok_or_else(|| DispatchError::NotParametric(self.to_string()))
    }

    /// Reject types that cannot appear in a parameter position.
    pub(crate) fn check_well_formed(&self) -> DispatchResult<()> {
        match self {
            Type::Variadic(_) => Err(DispatchError::MalformedType(format!(
                "`{}` may only appear as a trailing variadic parameter",
                self
            ))),
            Type::Union(members) if members.is_empty() => {
                Err(DispatchError::MalformedType("empty union".to_string()))
            }
            Type::Union(members) => {
                for (i, member) in members.iter().enumerate() {
                    if matches!(member, Type::Union(_)) {
                        return Err(DispatchError::MalformedType(format!(
                            "`{}` is nested in a union",
                            member
                        )));
                    }
                    if members[..i].contains(member) {
                        return Err(DispatchError::MalformedType(format!(
                            "`{}` appears twice in a union",
                            member
                        )));
                    }
                    member.check_well_formed()?;
                }
                Ok(())
            }
            Type::Predicate(p) => p.base.check_well_formed(),
            Type::Sequence(element) => element.check_well_formed(),
            Type::Any | Type::Concrete(_) | Type::Parametric(_) => Ok(()),
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Any, Type::Any) => true,
            (Type::Concrete(a), Type::Concrete(b)) => a == b,
            (Type::Union(a), Type::Union(b)) => {
                a.len() == b.len() && a.iter().all(|t| b.contains(t))
            }
            (Type::Parametric(a), Type::Parametric(b)) => a == b,
            (Type::Variadic(a), Type::Variadic(b)) => a == b,
            (Type::Predicate(a), Type::Predicate(b)) => a == b,
            (Type::Sequence(a), Type::Sequence(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Type::Any => {}
            Type::Concrete(class) => class.hash(state),
            Type::Union(members) => {
                // Members are a set, so combine their hashes order-independently.
                let mut combined = 0u64;
                for (i, member) in members.iter().enumerate() {
                    if members[..i].contains(member) {
                        continue;
                    }
                    let mut hasher = FxHasher::default();
                    member.hash(&mut hasher);
                    combined = combined.wrapping_add(hasher.finish());
                }
                combined.hash(state);
            }
            Type::Parametric(p) => p.hash(state),
            Type::Variadic(element) | Type::Sequence(element) => element.hash(state),
            Type::Predicate(p) => p.hash(state),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => f.write_str("Any"),
            Type::Concrete(class) => write!(f, "{}", class),
            Type::Union(members) => {
                f.write_str("Union[")?;
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", member)?;
                }
                f.write_str("]")
            }
            Type::Parametric(p) => write!(f, "{}", p),
            Type::Variadic(element) => write!(f, "*{}", element),
            Type::Predicate(p) => f.write_str(&p.name),
            Type::Sequence(element) => write!(f, "Seq[{}]", element),
        }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<ClassRef> for Type {
    fn from(class: ClassRef) -> Self {
        Type::Concrete(class)
    }
}

impl From<ParametricType> for Type {
    fn from(p: ParametricType) -> Self {
        Type::Parametric(p)
    }
}
