//! Errors raised by registration, resolution and the parametric type API.

use thiserror::Error;

use crate::dispatch::{AmbiguityError, NoMatchError};

/// Errors that can occur while registering, resolving or calling methods.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// No registered signature covers the argument types.
    #[error(transparent)]
    NotApplicable(#[from] NoMatchError),

    /// Several incomparable, equal-precedence signatures are most specific.
    #[error(transparent)]
    Ambiguous(#[from] AmbiguityError),

    /// A parametric family's validator rejected an indexing parameter.
    #[error("invalid parameter `{parameter}` for parametric type `{family}`: {reason}")]
    InvalidParameter {
        family: String,
        parameter: String,
        reason: String,
    },

    /// A parametric family's constructor rejected its arguments.
    #[error("cannot construct `{family}`: {message}")]
    Construction { family: String, message: String },

    #[error("`{0}` is not a concrete parametric type or instance")]
    NotParametric(String),

    #[error("malformed type: {0}")]
    MalformedType(String),

    #[error("unknown class: {0}")]
    UnknownClass(String),

    #[error("parametric family `{0}` is already defined")]
    DuplicateFamily(String),

    /// The conversion collaborator could not produce a value of the target type.
    #[error("cannot convert a value of type `{value_type}` to `{target}`")]
    Conversion { value_type: String, target: String },

    #[error("no promotion rule for `{left}` and `{right}`")]
    NoPromotion { left: String, right: String },

    /// Failure reported by a user implementation.
    #[error("{0}")]
    Implementation(String),
}

impl DispatchError {
    /// Build a failure for an implementation to return.
    pub fn implementation(message: impl Into<String>) -> Self {
        Self::Implementation(message.into())
    }

    /// Whether this error came out of resolution rather than execution.
    pub fn is_resolution_error(&self) -> bool {
        matches!(self, Self::NotApplicable(_) | Self::Ambiguous(_))
    }
}

/// Result type used throughout the crate.
pub type DispatchResult<T> = Result<T, DispatchError>;
