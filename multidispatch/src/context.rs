//! The shared type context.
//!
//! A [`TypeContext`] owns everything the subtype relation consults: the
//! class hierarchy, the registry of parametric families and the active
//! runtime type inference. It is shared between functions through an `Arc`
//! and is safe to use from many threads.
//!
//! Classes and families belong to the context that declared them. Signatures
//! and parents naming another context's classes are rejected, and such
//! classes are unrelated to every class of this context.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::class::{ClassHierarchy, ClassId, ClassRef, ClassTable, TableId};
use crate::config::DispatchConfig;
use crate::error::{DispatchError, DispatchResult};
use crate::parametric::{Family, FamilyBuilder, ParametricType};
use crate::types::{DefaultTypeOf, Type, TypeOf};

/// Shared state behind the subtype relation.
pub struct TypeContext {
    /// Id of `classes`, readable without the lock.
    table: TableId,
    classes: RwLock<ClassTable>,
    families: RwLock<IndexMap<Arc<str>, Arc<Family>>>,
    /// Families with a `type_of` hook, in definition order.
    recognizers: RwLock<Arc<[Arc<Family>]>>,
    type_of: RwLock<Arc<dyn TypeOf>>,
    /// Cached [`TypeOf::is_default`] of the active inference.
    default_type_of: AtomicBool,
    config: DispatchConfig,
    /// Bumped whenever the result of `type_of` may change for an existing
    /// value. Resolution caches compare against it before use.
    epoch: AtomicU64,
}

impl TypeContext {
    /// Create a context with the default configuration.
    pub fn new() -> Self {
        Self::with_config(DispatchConfig::default())
    }

    pub fn with_config(config: DispatchConfig) -> Self {
        let classes = ClassTable::new();
        Self {
            table: classes.id(),
            classes: RwLock::new(classes),
            families: RwLock::new(IndexMap::new()),
            recognizers: RwLock::new(Arc::from(Vec::new())),
            type_of: RwLock::new(Arc::new(DefaultTypeOf)),
            default_type_of: AtomicBool::new(true),
            config,
            epoch: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    fn bump_epoch(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// Declare a class. Parents may be classes or parametric families; a
    /// class with no parents descends from `object`.
    pub fn declare_class(&self, name: &str, parents: &[Type]) -> DispatchResult<Type> {
        let parent_ids = parents
            .iter()
            .map(|parent| self.parent_class(parent))
            .collect::<DispatchResult<Vec<_>>>()?;
        let class = self.classes.write().declare(name, &parent_ids)?;
        debug!(class = name, id = class.id().index(), "declared class");
        Ok(Type::Concrete(class))
    }

    /// Whether `class` is a builtin or was declared in this context.
    pub fn owns(&self, class: &ClassRef) -> bool {
        class.table() == TableId::BUILTIN || class.table() == self.table
    }

    /// Check that every class named by `ty` belongs to this context.
    pub fn check_owned(&self, ty: &Type) -> DispatchResult<()> {
        let foreign = |class: &ClassRef| {
            DispatchError::UnknownClass(format!(
                "`{}` was declared in another type context",
                class
            ))
        };
        match ty {
            Type::Any => Ok(()),
            Type::Concrete(class) if self.owns(class) => Ok(()),
            Type::Concrete(class) => Err(foreign(class)),
            Type::Parametric(p) if self.owns(p.family().class()) => Ok(()),
            Type::Parametric(p) => Err(foreign(p.family().class())),
            Type::Union(members) => members.iter().try_for_each(|m| self.check_owned(m)),
            Type::Variadic(element) | Type::Sequence(element) => self.check_owned(element),
            Type::Predicate(p) => self.check_owned(p.base()),
        }
    }

    /// Whether class `child` is `ancestor` or one of its descendants.
    pub fn is_descendant(&self, child: ClassId, ancestor: ClassId) -> bool {
        child == ancestor || self.classes.read().is_descendant(child, ancestor)
    }

    /// Declared name of a class.
    pub fn class_name(&self, class: ClassId) -> Option<String> {
        self.classes.read().name(class).map(str::to_string)
    }

    /// Look up a declared class by name.
    pub fn class(&self, name: &str) -> Option<Type> {
        self.classes
            .read()
            .find(name)
            .map(|info| Type::Concrete(info.class.clone()))
    }

    /// Register a parametric family and return its unparameterized type.
    pub fn define_family(&self, builder: FamilyBuilder) -> DispatchResult<Type> {
        if self.families.read().contains_key(&builder.name) {
            return Err(DispatchError::DuplicateFamily(builder.name.to_string()));
        }
        let class = match self.declare_class(&builder.name, &builder.parents)? {
            Type::Concrete(class) => class,
            other => return Err(DispatchError::MalformedType(other.to_string())),
        };
        let family = Arc::new(builder.build(class));

        {
            let mut families = self.families.write();
            if families.contains_key(family.name()) {
                return Err(DispatchError::DuplicateFamily(family.name().to_string()));
            }
            families.insert(Arc::from(family.name()), family.clone());
        }

        if family.type_of_hook().is_some() {
            let mut recognizers = self.recognizers.write();
            let mut updated = recognizers.to_vec();
            updated.push(family.clone());
            *recognizers = updated.into();
            self.bump_epoch();
        }

        debug!(
            family = family.name(),
            faithful = family.is_faithful(),
            "defined parametric family"
        );
        Ok(Type::Parametric(ParametricType::unparameterized(family)))
    }

    /// Look up a family by name, returning its unparameterized type.
    pub fn family(&self, name: &str) -> Option<Type> {
        self.families
            .read()
            .get(name)
            .map(|family| Type::Parametric(ParametricType::unparameterized(family.clone())))
    }

    pub(crate) fn recognizers(&self) -> Arc<[Arc<Family>]> {
        self.recognizers.read().clone()
    }

    pub(crate) fn type_of_impl(&self) -> Arc<dyn TypeOf> {
        self.type_of.read().clone()
    }

    /// Whether class membership can skip `type_of`.
    pub(crate) fn uses_default_type_of(&self) -> bool {
        self.default_type_of.load(Ordering::Acquire)
    }

    /// Replace runtime type inference. Every resolution cache built against
    /// this context is invalidated.
    pub fn set_type_of(&self, inference: Arc<dyn TypeOf>) {
        let mut active = self.type_of.write();
        self.default_type_of.store(inference.is_default(), Ordering::Release);
        *active = inference;
        drop(active);
        self.bump_epoch();
        debug!(epoch = self.epoch(), "replaced type inference");
    }

    fn parent_class(&self, parent: &Type) -> DispatchResult<ClassId> {
        let class = match parent {
            Type::Concrete(class) => class,
            Type::Parametric(p) => p.family().class(),
            other => {
                return Err(DispatchError::MalformedType(format!(
                    "`{}` cannot be used as a parent class",
                    other
                )))
            }
        };
        self.check_owned(parent)?;
        Ok(class.id())
    }
}

impl Default for TypeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeContext")
            .field("classes", &self.classes.read().len())
            .field("families", &self.families.read().len())
            .field("config", &self.config)
            .field("epoch", &self.epoch())
            .finish()
    }
}
