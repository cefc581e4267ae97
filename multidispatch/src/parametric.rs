//! Parametric type families.
//!
//! A family is a type constructor indexed by an arbitrary [`Param`]. Indexing
//! a family yields a concrete parametric type that is interned: the same
//! parameter always gives back the same type object, so identity is a valid
//! equality test. Every concrete instantiation is a subtype of the
//! unparameterized family.
//!
//! Families customise their behaviour through optional hooks:
//!
//! - **validate**: check (and normalise) a parameter before indexing
//! - **infer**: derive a parameter from constructor arguments
//! - **compare**: decide `F[p] <: F[q]`; defaults to identity
//! - **construct**: check constructor arguments against the parameter
//! - **type_of**: recognise foreign values as members of the family

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::class::ClassRef;
use crate::context::TypeContext;
use crate::error::{DispatchError, DispatchResult};
use crate::types::Type;
use crate::value::{Instance, Value};

/// A type parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Param {
    Int(i64),
    Bool(bool),
    Str(Arc<str>),
    Type(Type),
    Tuple(Arc<[Param]>),
}

impl Param {
    pub fn tuple(items: impl IntoIterator<Item = Param>) -> Self {
        Param::Tuple(items.into_iter().collect())
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Param::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&Type> {
        match self {
            Param::Type(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Param]> {
        match self {
            Param::Tuple(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Int(n) => write!(f, "{}", n),
            Param::Bool(b) => write!(f, "{}", b),
            Param::Str(s) => write!(f, "{:?}", s),
            Param::Type(t) => write!(f, "{}", t),
            Param::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl From<i64> for Param {
    fn from(n: i64) -> Self {
        Param::Int(n)
    }
}

impl From<bool> for Param {
    fn from(b: bool) -> Self {
        Param::Bool(b)
    }
}

impl From<&str> for Param {
    fn from(s: &str) -> Self {
        Param::Str(Arc::from(s))
    }
}

impl From<Type> for Param {
    fn from(t: Type) -> Self {
        Param::Type(t)
    }
}

pub type ValidateHook = Arc<dyn Fn(&Param) -> Result<Param, String> + Send + Sync>;
pub type InferHook = Arc<dyn Fn(&TypeContext, &[Value]) -> Result<Param, String> + Send + Sync>;
pub type CompareHook = Arc<dyn Fn(&TypeContext, &Param, &Param) -> bool + Send + Sync>;
pub type ConstructHook =
    Arc<dyn Fn(&TypeContext, &Param, Vec<Value>) -> Result<Vec<Value>, String> + Send + Sync>;
pub type TypeOfHook = Arc<dyn Fn(&TypeContext, &Value) -> Option<Param> + Send + Sync>;

/// Identifier of a parametric family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FamilyId(u32);

impl FamilyId {
    fn next() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(0);
        FamilyId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A registered parametric family.
pub struct Family {
    id: FamilyId,
    name: Arc<str>,
    /// Class of the family's underlying representation.
    class: ClassRef,
    faithful: bool,
    validate: Option<ValidateHook>,
    infer: Option<InferHook>,
    compare: Option<CompareHook>,
    construct: Option<ConstructHook>,
    type_of: Option<TypeOfHook>,
    interned: RwLock<FxHashMap<Param, Arc<Instantiation>>>,
}

/// One interned instantiation of a family.
#[derive(Debug)]
pub struct Instantiation {
    param: Param,
}

impl Family {
    pub fn id(&self) -> FamilyId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    /// Families that inspect foreign values through a `type_of` hook are
    /// never faithful.
    pub fn is_faithful(&self) -> bool {
        self.faithful && self.type_of.is_none()
    }

    pub(crate) fn type_of_hook(&self) -> Option<&TypeOfHook> {
        self.type_of.as_ref()
    }

    pub(crate) fn compare_hook(&self) -> Option<&CompareHook> {
        self.compare.as_ref()
    }

    /// Number of distinct instantiations created so far.
    pub fn instantiation_count(&self) -> usize {
        self.interned.read().len()
    }

    fn intern(&self, param: Param) -> Arc<Instantiation> {
        if let Some(existing) = self.interned.read().get(&param) {
            return existing.clone();
        }
        let mut interned = self.interned.write();
        interned
            .entry(param)
            .or_insert_with_key(|param| {
                trace!(family = %self.name, parameter = %param, "interning parametric type");
                Arc::new(Instantiation { param: param.clone() })
            })
            .clone()
    }
}

impl fmt::Debug for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Family")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("class", &self.class)
            .field("faithful", &self.is_faithful())
            .finish_non_exhaustive()
    }
}

/// Builder for a parametric family, passed to
/// [`TypeContext::define_family`].
pub struct FamilyBuilder {
    pub(crate) name: Arc<str>,
    pub(crate) parents: Vec<Type>,
    faithful: bool,
    validate: Option<ValidateHook>,
    infer: Option<InferHook>,
    compare: Option<CompareHook>,
    construct: Option<ConstructHook>,
    type_of: Option<TypeOfHook>,
}

impl FamilyBuilder {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            parents: Vec::new(),
            faithful: true,
            validate: None,
            infer: None,
            compare: None,
            construct: None,
            type_of: None,
        }
    }

    /// Declare a parent class (or family) of the underlying representation.
    pub fn extends(mut self, parent: Type) -> Self {
        self.parents.push(parent);
        self
    }

    /// Mark members as depending on more than the value's runtime type.
    pub fn unfaithful(mut self) -> Self {
        self.faithful = false;
        self
    }

    pub fn validate<F>(mut self, f: F) -> Self
    where
        F: Fn(&Param) -> Result<Param, String> + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(f));
        self
    }

    pub fn infer<F>(mut self, f: F) -> Self
    where
        F: Fn(&TypeContext, &[Value]) -> Result<Param, String> + Send + Sync + 'static,
    {
        self.infer = Some(Arc::new(f));
        self
    }

    pub fn compare<F>(mut self, f: F) -> Self
    where
        F: Fn(&TypeContext, &Param, &Param) -> bool + Send + Sync + 'static,
    {
        self.compare = Some(Arc::new(f));
        self
    }

    pub fn construct<F>(mut self, f: F) -> Self
    where
        F: Fn(&TypeContext, &Param, Vec<Value>) -> Result<Vec<Value>, String>
            + Send
            + Sync
            + 'static,
    {
        self.construct = Some(Arc::new(f));
        self
    }

    pub fn type_of<F>(mut self, f: F) -> Self
    where
        F: Fn(&TypeContext, &Value) -> Option<Param> + Send + Sync + 'static,
    {
        self.type_of = Some(Arc::new(f));
        self
    }

    pub(crate) fn build(self, class: ClassRef) -> Family {
        Family {
            id: FamilyId::next(),
            name: self.name,
            class,
            faithful: self.faithful,
            validate: self.validate,
            infer: self.infer,
            compare: self.compare,
            construct: self.construct,
            type_of: self.type_of,
            interned: RwLock::new(FxHashMap::default()),
        }
    }
}

/// A family, either unparameterized or indexed by one interned parameter.
#[derive(Clone)]
pub struct ParametricType {
    family: Arc<Family>,
    instance: Option<Arc<Instantiation>>,
}

impl ParametricType {
    pub(crate) fn unparameterized(family: Arc<Family>) -> Self {
        Self { family, instance: None }
    }

    pub fn family(&self) -> &Arc<Family> {
        &self.family
    }

    /// Whether this is an indexed instantiation rather than the family itself.
    pub fn is_concrete(&self) -> bool {
        self.instance.is_some()
    }

    pub fn parameter(&self) -> Option<&Param> {
        self.instance.as_ref().map(|i| &i.param)
    }

    /// The unparameterized family this type belongs to.
    pub fn unparameterized_type(&self) -> Type {
        Type::Parametric(Self::unparameterized(self.family.clone()))
    }

    pub(crate) fn same_family(&self, other: &ParametricType) -> bool {
        Arc::ptr_eq(&self.family, &other.family)
    }

    pub(crate) fn same_instance(&self, other: &ParametricType) -> bool {
        match (&self.instance, &other.instance) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl PartialEq for ParametricType {
    fn eq(&self, other: &Self) -> bool {
        self.same_family(other) && self.same_instance(other)
    }
}

impl Eq for ParametricType {}

impl Hash for ParametricType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.family.id.hash(state);
        self.instance
            .as_ref()
            .map(|i| Arc::as_ptr(i) as usize)
            .hash(state);
    }
}

impl fmt::Display for ParametricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.instance {
            Some(inst) => write!(f, "{}[{}]", self.family.name, inst.param),
            None => f.write_str(&self.family.name),
        }
    }
}

impl fmt::Debug for ParametricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

fn family_of(ty: &Type) -> DispatchResult<&ParametricType> {
    ty.as_parametric()
        .ok_or_else(|| DispatchError::NotParametric(ty.to_string()))
}

impl TypeContext {
    /// Index a family by a parameter, yielding the interned concrete type.
    ///
    /// The family's validator runs first; a rejected parameter creates no
    /// type.
    pub fn index(&self, family: &Type, parameter: impl Into<Param>) -> DispatchResult<Type> {
        let parametric = family_of(family)?;
        if parametric.is_concrete() {
            return Err(DispatchError::InvalidParameter {
                family: parametric.family.name.to_string(),
                parameter: family.to_string(),
                reason: "type is already parameterized".to_string(),
            });
        }
        let family = &parametric.family;
        let mut parameter = parameter.into();
        if let Some(validate) = &family.validate {
            parameter = validate(&parameter).map_err(|reason| DispatchError::InvalidParameter {
                family: family.name.to_string(),
                parameter: parameter.to_string(),
                reason,
            })?;
        }
        let instance = family.intern(parameter);
        Ok(Type::Parametric(ParametricType {
            family: family.clone(),
            instance: Some(instance),
        }))
    }

    /// Construct an instance.
    ///
    /// On a concrete type this constructs directly. On the unparameterized
    /// family the parameter is inferred from the arguments first (by default
    /// the runtime type of the first argument).
    pub fn construct(&self, ty: &Type, args: Vec<Value>) -> DispatchResult<Value> {
        let parametric = family_of(ty)?;
        let family = &parametric.family;
        let concrete = if parametric.is_concrete() {
            ty.clone()
        } else {
            let parameter = self.infer_parameter(family, &args)?;
            self.index(ty, parameter)?
        };
        let parameter = concrete.parameter()?;
        let fields = match &family.construct {
            Some(construct) => {
                construct(self, parameter, args).map_err(|message| DispatchError::Construction {
                    family: family.name.to_string(),
                    message,
                })?
            }
            None => args,
        };
        Ok(Value::Instance(Arc::new(Instance::new(concrete, fields))))
    }

    fn infer_parameter(&self, family: &Family, args: &[Value]) -> DispatchResult<Param> {
        let inferred = match &family.infer {
            Some(infer) => infer(self, args),
            None => args
                .first()
                .map(|first| Param::Type(self.type_of(first)))
                .ok_or_else(|| "cannot infer a type parameter without arguments".to_string()),
        };
        inferred.map_err(|message| DispatchError::Construction {
            family: family.name.to_string(),
            message,
        })
    }

    /// The parameter of a concrete parametric type.
    pub fn parameter_of(&self, ty: &Type) -> DispatchResult<Param> {
        ty.parameter().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(ctx: &TypeContext) -> Type {
        ctx.define_family(FamilyBuilder::new("Kind")).unwrap()
    }

    #[test]
    fn test_interning_identity() {
        let ctx = TypeContext::new();
        let kind = kind(&ctx);
        let a = ctx.index(&kind, 1i64).unwrap();
        let b = ctx.index(&kind, 1i64).unwrap();
        let c = ctx.index(&kind, 2i64).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(kind.as_parametric().unwrap().family().instantiation_count(), 2);
    }

    #[test]
    fn test_validator_rejects_before_interning() {
        let ctx = TypeContext::new();
        let positive = ctx
            .define_family(FamilyBuilder::new("Positive").validate(|p| match p.as_int() {
                Some(n) if n > 0 => Ok(p.clone()),
                _ => Err("expected a positive integer".to_string()),
            }))
            .unwrap();
        let err = ctx.index(&positive, -1i64).unwrap_err();
        assert!(matches!(err, DispatchError::InvalidParameter { .. }));
        assert_eq!(positive.as_parametric().unwrap().family().instantiation_count(), 0);
        assert!(ctx.index(&positive, 3i64).is_ok());
    }

    #[test]
    fn test_validator_normalises() {
        let ctx = TypeContext::new();
        let abs = ctx
            .define_family(FamilyBuilder::new("Abs").validate(|p| {
                p.as_int().map(|n| Param::Int(n.abs())).ok_or_else(|| "not an int".to_string())
            }))
            .unwrap();
        assert_eq!(ctx.index(&abs, -4i64).unwrap(), ctx.index(&abs, 4i64).unwrap());
    }

    #[test]
    fn test_index_concrete_type_fails() {
        let ctx = TypeContext::new();
        let kind = kind(&ctx);
        let one = ctx.index(&kind, 1i64).unwrap();
        assert!(ctx.index(&one, 2i64).is_err());
        assert!(matches!(ctx.index(&Type::int(), 1i64), Err(DispatchError::NotParametric(_))));
    }

    #[test]
    fn test_default_inference_uses_first_argument() {
        let ctx = TypeContext::new();
        let kind = kind(&ctx);
        let value = ctx.construct(&kind, vec![Value::from(1), Value::from("x")]).unwrap();
        assert_eq!(value.type_parameter().unwrap(), &Param::Type(Type::int()));
        assert_eq!(
            value.as_instance().unwrap().ty(),
            &ctx.index(&kind, Type::int()).unwrap()
        );
    }

    #[test]
    fn test_inference_without_arguments() {
        let ctx = TypeContext::new();
        let kind = kind(&ctx);
        let err = ctx.construct(&kind, vec![]).unwrap_err();
        assert!(matches!(err, DispatchError::Construction { .. }));
    }

    #[test]
    fn test_parameter_of() {
        let ctx = TypeContext::new();
        let kind = kind(&ctx);
        let k = ctx.index(&kind, "label").unwrap();
        assert_eq!(ctx.parameter_of(&k).unwrap(), Param::from("label"));
        assert!(ctx.parameter_of(&kind).is_err());
    }

    #[test]
    fn test_display() {
        let ctx = TypeContext::new();
        let kind = kind(&ctx);
        let t = ctx
            .index(&kind, Param::tuple([Param::Int(2), Param::Type(Type::int())]))
            .unwrap();
        assert_eq!(kind.to_string(), "Kind");
        assert_eq!(t.to_string(), "Kind[(2, int)]");
    }
}
