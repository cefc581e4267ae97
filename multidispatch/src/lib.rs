//! Runtime multiple dispatch.
//!
//! A [`Function`] holds many implementations ("methods") of one named
//! operation, each bound to a [`Signature`] of parameter types. A call
//! selects the method whose parameter types are the most specific match for
//! the runtime types of all its arguments, caching the decision per
//! argument-type key.
//!
//! Types live in a lattice ([`Type`]) of classes, unions, predicates,
//! homogeneous sequences and parametric families. Parametric families are
//! indexed by arbitrary [`Param`] values; each instantiation is interned
//! and takes part in subtyping through family-supplied rules.
//!
//! # Example
//!
//! ```
//! use multidispatch::{Dispatcher, Signature, Type, Value};
//!
//! let dispatcher = Dispatcher::new();
//! dispatcher
//!     .register("describe", Signature::new([Type::number()]), |_: &[Value]| {
//!         Ok(Value::from("number"))
//!     })
//!     .unwrap();
//! dispatcher
//!     .register("describe", Signature::new([Type::int()]), |_: &[Value]| {
//!         Ok(Value::from("int"))
//!     })
//!     .unwrap();
//!
//! assert_eq!(dispatcher.call("describe", &[Value::from(1)]).unwrap(), Value::from("int"));
//! assert_eq!(dispatcher.call("describe", &[Value::from(2.0)]).unwrap(), Value::from("number"));
//! ```

pub mod class;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod dispatcher;
pub mod error;
pub mod function;
pub mod parametric;
pub mod promotion;
pub mod types;
pub mod value;

pub use class::{ClassHierarchy, ClassId, ClassRef, ClassTable, TableId};
pub use config::{ConfigError, ContainerCheck, DispatchConfig};
pub use context::TypeContext;
pub use dispatch::{
    AmbiguityError, CacheStats, DispatchResolver, Method, MethodId, Mismatch, NoMatchError,
    Resolution, Signature, Target,
};
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, DispatchResult};
pub use function::Function;
pub use parametric::{Family, FamilyBuilder, Param, ParametricType};
pub use promotion::{ConversionTable, Converter, StrictConverter};
pub use types::{DefaultTypeOf, Type, TypeOf};
pub use value::{Instance, Object, Value};
