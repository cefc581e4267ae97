//! A named operation: its method table, resolution cache and call path.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::context::TypeContext;
use crate::dispatch::{
    implementation, ArgKey, CacheEntry, CacheKey, CacheStats, DispatchResolver, Implementation,
    Method, MethodId, MethodTable, Resolution, ResolutionCache, Signature, Target,
};
use crate::error::DispatchResult;
use crate::promotion::{Converter, StrictConverter};
use crate::types::Type;
use crate::value::Value;

/// One multiply dispatched operation.
///
/// Registration takes the table write lock and clears the cache before
/// releasing it, so no resolution can observe a new method alongside a
/// stale cached outcome. Resolution holds the read lock while probing and
/// filling the cache. Implementations run with no lock held and may
/// register further methods.
pub struct Function {
    name: Arc<str>,
    ctx: Arc<TypeContext>,
    converter: Arc<dyn Converter>,
    table: RwLock<MethodTable>,
    cache: ResolutionCache,
}

impl Function {
    /// Create a function whose return values are never converted.
    pub fn new(name: impl Into<Arc<str>>, ctx: Arc<TypeContext>) -> Self {
        Self::with_converter(name, ctx, Arc::new(StrictConverter))
    }

    pub fn with_converter(
        name: impl Into<Arc<str>>,
        ctx: Arc<TypeContext>,
        converter: Arc<dyn Converter>,
    ) -> Self {
        Self {
            name: name.into(),
            ctx,
            converter,
            table: RwLock::new(MethodTable::new()),
            cache: ResolutionCache::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> &Arc<TypeContext> {
        &self.ctx
    }

    /// Register a method. A structurally identical signature replaces the
    /// existing method.
    pub fn register<F>(&self, signature: Signature, f: F) -> DispatchResult<MethodId>
    where
        F: Fn(&[Value]) -> DispatchResult<Value> + Send + Sync + 'static,
    {
        self.register_method(signature, implementation(f))
    }

    /// Register one implementation under several signatures. Every signature
    /// is validated before any is registered.
    pub fn register_multi<I, F>(&self, signatures: I, f: F) -> DispatchResult<Vec<MethodId>>
    where
        I: IntoIterator<Item = Signature>,
        F: Fn(&[Value]) -> DispatchResult<Value> + Send + Sync + 'static,
    {
        let signatures: Vec<Signature> = signatures.into_iter().collect();
        for signature in &signatures {
            self.admit(signature)?;
        }
        let shared = implementation(f);
        signatures
            .into_iter()
            .map(|signature| self.register_method(signature, shared.clone()))
            .collect()
    }

    pub fn register_method(
        &self,
        signature: Signature,
        implementation: Implementation,
    ) -> DispatchResult<MethodId> {
        self.admit(&signature)?;
        let method = Arc::new(Method::new(self.name.clone(), signature, implementation));
        let id = method.id();

        let mut table = self.table.write();
        let previous = table.insert(method.clone());
        self.cache.clear();
        drop(table);

        match previous {
            Some(previous) if self.ctx.config().warn_on_redefinition => {
                warn!(
                    function = %self.name,
                    signature = %method.signature(),
                    replaced = %previous.id(),
                    "method redefined"
                );
            }
            _ => {
                debug!(
                    function = %self.name,
                    signature = %method.signature(),
                    %id,
                    "registered method"
                );
            }
        }
        Ok(id)
    }

    /// Reject malformed signatures and classes from another context.
    fn admit(&self, signature: &Signature) -> DispatchResult<()> {
        signature.validate()?;
        signature
            .types
            .iter()
            .chain(&signature.varargs)
            .chain(std::iter::once(&signature.return_type))
            .try_for_each(|ty| self.ctx.check_owned(ty))
    }

    /// Remove a method. Returns whether it was registered.
    pub fn unregister(&self, id: MethodId) -> bool {
        let mut table = self.table.write();
        let removed = table.remove(id).is_some();
        if removed {
            self.cache.clear();
            debug!(function = %self.name, %id, "unregistered method");
        }
        removed
    }

    /// Resolve the method for argument values.
    pub fn resolve(&self, args: &[Value]) -> Resolution {
        let table = self.table.read();
        // Read the epoch before inferring types so a concurrent inference
        // change can only make the entry look stale, never fresh.
        let epoch = self.ctx.epoch();
        let key = CacheKey::Values(
            args.iter()
                .map(|value| ArgKey {
                    class: value.class_id(),
                    ty: self.ctx.type_of(value),
                })
                .collect(),
        );
        let revalidate = !table.is_faithful();
        self.resolve_in(&table, Target::Values(args), key, epoch, revalidate)
    }

    /// Resolve the method for declared argument types: a method applies when
    /// the types are componentwise subtypes of its parameters.
    pub fn resolve_types(&self, types: &[Type]) -> Resolution {
        let table = self.table.read();
        let key = CacheKey::Types(types.to_vec());
        self.resolve_in(&table, Target::Types(types), key, self.ctx.epoch(), false)
    }

    fn resolve_in(
        &self,
        table: &MethodTable,
        target: Target<'_>,
        key: CacheKey,
        epoch: u64,
        revalidate: bool,
    ) -> Resolution {
        let cached = self.cache.get(&key, epoch);
        if !revalidate {
            if let Some(entry) = &cached {
                trace!(function = %self.name, "resolution cache hit");
                return entry.resolution.clone();
            }
        }

        let resolver = DispatchResolver::new(&self.ctx);
        let applicable = resolver.applicable(target, table.methods());
        let ids: Vec<MethodId> = applicable.iter().map(|m| m.id()).collect();

        // Unfaithful tables only reuse an outcome derived from the same
        // applicable set.
        if let Some(entry) = cached {
            if entry.applicable == ids {
                trace!(function = %self.name, "revalidated cached resolution");
                return entry.resolution.clone();
            }
        }

        let resolution = resolver.select(&self.name, target, table.methods(), applicable);
        debug!(
            function = %self.name,
            candidates = table.len(),
            resolved = resolution.is_resolved(),
            "cold resolution"
        );
        if resolution.is_resolved() || self.ctx.config().cache_failures {
            self.cache.insert(
                key,
                CacheEntry {
                    resolution: resolution.clone(),
                    applicable: ids,
                },
                epoch,
            );
        }
        resolution
    }

    /// The method that would run for arguments of the given types.
    pub fn invoke(&self, types: &[Type]) -> DispatchResult<Arc<Method>> {
        self.resolve_types(types).into_result()
    }

    /// Call the most specific method. A result that does not belong to the
    /// declared return type is passed through the converter.
    pub fn call(&self, args: &[Value]) -> DispatchResult<Value> {
        let method = self.resolve(args).into_result()?;
        let result = method.call(args)?;
        let return_type = &method.signature().return_type;
        if return_type.is_any() || self.ctx.accepts(return_type, &result) {
            return Ok(result);
        }
        self.converter.convert(&self.ctx, result, return_type)
    }

    /// Discard every cached outcome.
    pub fn invalidate_cache(&self) {
        // Hold the table lock so no resolution in flight refills the cache
        // from the state being invalidated.
        let _table = self.table.write();
        self.cache.clear();
        debug!(function = %self.name, "invalidated resolution cache");
    }

    /// Registered signatures in registration order.
    pub fn list_signatures(&self) -> Vec<Signature> {
        self.table
            .read()
            .methods()
            .iter()
            .map(|m| m.signature().clone())
            .collect()
    }

    pub fn methods(&self) -> Vec<Arc<Method>> {
        self.table.read().methods().to_vec()
    }

    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("methods", &self.len())
            .field("cache", &self.cache.stats())
            .finish()
    }
}
