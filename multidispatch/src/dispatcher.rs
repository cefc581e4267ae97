//! Namespaces of dispatched functions.
//!
//! A [`Dispatcher`] owns a set of functions by name. Independent dispatchers
//! never share methods, even for functions of the same name, while still
//! sharing one [`TypeContext`] if built with [`Dispatcher::with_context`].

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::context::TypeContext;
use crate::dispatch::{MethodId, NoMatchError, Signature};
use crate::error::{DispatchError, DispatchResult};
use crate::function::Function;
use crate::promotion::ConversionTable;
use crate::value::Value;

pub struct Dispatcher {
    ctx: Arc<TypeContext>,
    conversions: Arc<ConversionTable>,
    functions: RwLock<IndexMap<Arc<str>, Arc<Function>>>,
}

impl Dispatcher {
    /// Create a dispatcher with a fresh type context.
    pub fn new() -> Self {
        Self::with_context(Arc::new(TypeContext::new()))
    }

    pub fn with_context(ctx: Arc<TypeContext>) -> Self {
        Self {
            conversions: Arc::new(ConversionTable::new(ctx.clone())),
            ctx,
            functions: RwLock::new(IndexMap::new()),
        }
    }

    pub fn context(&self) -> &Arc<TypeContext> {
        &self.ctx
    }

    /// Conversions used for declared return types of this dispatcher's
    /// functions.
    pub fn conversions(&self) -> &Arc<ConversionTable> {
        &self.conversions
    }

    /// Get the function named `name`, creating it if needed.
    pub fn function(&self, name: &str) -> Arc<Function> {
        if let Some(function) = self.functions.read().get(name) {
            return function.clone();
        }
        self.functions
            .write()
            .entry(Arc::from(name))
            .or_insert_with(|| {
                debug!(function = name, "created function");
                Arc::new(Function::with_converter(
                    name,
                    self.ctx.clone(),
                    self.conversions.clone(),
                ))
            })
            .clone()
    }

    /// Get an existing function.
    pub fn get(&self, name: &str) -> Option<Arc<Function>> {
        self.functions.read().get(name).cloned()
    }

    pub fn register<F>(&self, name: &str, signature: Signature, f: F) -> DispatchResult<MethodId>
    where
        F: Fn(&[Value]) -> DispatchResult<Value> + Send + Sync + 'static,
    {
        self.function(name).register(signature, f)
    }

    /// Register one implementation of `name` under several signatures.
    pub fn register_multi<I, F>(
        &self,
        name: &str,
        signatures: I,
        f: F,
    ) -> DispatchResult<Vec<MethodId>>
    where
        I: IntoIterator<Item = Signature>,
        F: Fn(&[Value]) -> DispatchResult<Value> + Send + Sync + 'static,
    {
        self.function(name).register_multi(signatures, f)
    }

    /// Call a function by name. An unknown name is not applicable to any
    /// arguments.
    pub fn call(&self, name: &str, args: &[Value]) -> DispatchResult<Value> {
        match self.get(name) {
            Some(function) => function.call(args),
            None => Err(DispatchError::NotApplicable(NoMatchError {
                function: name.to_string(),
                arg_types: args.iter().map(|v| self.ctx.type_of(v)).collect(),
                candidates: Vec::new(),
                closest: Vec::new(),
            })),
        }
    }

    /// Clear the cache of one function, or of all functions.
    pub fn invalidate_cache(&self, name: Option<&str>) {
        match name {
            Some(name) => {
                if let Some(function) = self.get(name) {
                    function.invalidate_cache();
                }
            }
            None => {
                let functions: Vec<_> = self.functions.read().values().cloned().collect();
                for function in functions {
                    function.invalidate_cache();
                }
            }
        }
    }

    /// Signatures registered on `name`; empty for an unknown function.
    pub fn list_signatures(&self, name: &str) -> Vec<Signature> {
        self.get(name)
            .map(|function| function.list_signatures())
            .unwrap_or_default()
    }

    /// Names of all functions, in creation order.
    pub fn functions(&self) -> Vec<String> {
        self.functions.read().keys().map(|name| name.to_string()).collect()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("functions", &self.functions())
            .finish_non_exhaustive()
    }
}
