//! Registered methods and the per-function method table.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;

use super::signature::{Signature, SignatureKey};
use crate::error::DispatchResult;
use crate::value::Value;

/// Unique identifier of a registered method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(u64);

impl MethodId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        MethodId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A method body.
pub type Implementation = Arc<dyn Fn(&[Value]) -> DispatchResult<Value> + Send + Sync>;

/// Box a closure as an [`Implementation`].
pub fn implementation<F>(f: F) -> Implementation
where
    F: Fn(&[Value]) -> DispatchResult<Value> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A signature bound to an implementation.
pub struct Method {
    id: MethodId,
    function: Arc<str>,
    signature: Signature,
    implementation: Implementation,
}

impl Method {
    pub(crate) fn new(
        function: Arc<str>,
        signature: Signature,
        implementation: Implementation,
    ) -> Self {
        Self {
            id: MethodId::next(),
            function,
            signature,
            implementation,
        }
    }

    pub fn id(&self) -> MethodId {
        self.id
    }

    /// Name of the function this method was registered on.
    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Run the implementation without any return-type conversion.
    pub fn call(&self, args: &[Value]) -> DispatchResult<Value> {
        (self.implementation)(args)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("id", &self.id)
            .field("function", &self.function)
            .field("signature", &format_args!("{}", self.signature))
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.function, self.signature)
    }
}

/// The methods of one function, keyed by structural signature identity.
///
/// Listing order is registration order; a redefinition keeps the slot of
/// the method it replaces.
pub(crate) struct MethodTable {
    methods: IndexMap<SignatureKey, Arc<Method>>,
    /// Flat copy of `methods` handed to the resolver.
    snapshot: Vec<Arc<Method>>,
    faithful: bool,
}

impl MethodTable {
    pub(crate) fn new() -> Self {
        Self {
            methods: IndexMap::new(),
            snapshot: Vec::new(),
            faithful: true,
        }
    }

    /// Insert a method, returning the one it replaced.
    pub(crate) fn insert(&mut self, method: Arc<Method>) -> Option<Arc<Method>> {
        let previous = self.methods.insert(method.signature().key(), method);
        self.refresh();
        previous
    }

    pub(crate) fn remove(&mut self, id: MethodId) -> Option<Arc<Method>> {
        let index = self.methods.values().position(|m| m.id() == id)?;
        let (_, removed) = self.methods.shift_remove_index(index)?;
        self.refresh();
        Some(removed)
    }

    fn refresh(&mut self) {
        self.snapshot = self.methods.values().cloned().collect();
        self.faithful = self.snapshot.iter().all(|m| m.signature().is_faithful());
    }

    pub(crate) fn methods(&self) -> &[Arc<Method>] {
        &self.snapshot
    }

    /// Whether every registered signature is faithful.
    pub(crate) fn is_faithful(&self) -> bool {
        self.faithful
    }

    pub(crate) fn len(&self) -> usize {
        self.methods.len()
    }
}
