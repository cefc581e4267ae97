//! Multiple dispatch resolution.
//!
//! This module selects which method implementation to call based on the
//! runtime types of all arguments.
//!
//! # Algorithm Overview
//!
//! 1. **Filter applicable**: keep methods whose arity fits and whose
//!    parameter types cover every argument
//! 2. **Find minimal**: drop every method that has a strictly more specific
//!    applicable rival under [`DispatchResolver::sig_leq`]
//! 3. **Tie-break**: among several minimal methods keep the highest
//!    precedence
//! 4. **Select**: a single survivor wins; otherwise the call is ambiguous
//!
//! # Module Structure
//!
//! - [`signature`] - Declared parameter types, variadic tail and precedence
//! - [`table`] - Registered methods and the per-function method table
//! - [`result`] - Resolution outcomes and errors
//! - [`resolver`] - The specificity resolver
//! - [`cache`] - Memoised outcomes keyed by argument types

mod cache;
mod resolver;
mod result;
mod signature;
mod table;

pub use cache::{ArgKey, CacheEntry, CacheKey, CacheStats, ResolutionCache};

pub use resolver::{DispatchResolver, Target};

pub use result::{AmbiguityError, Mismatch, NoMatchError, Resolution};

pub use signature::Signature;

pub use table::{implementation, Implementation, Method, MethodId};

pub(crate) use table::MethodTable;
