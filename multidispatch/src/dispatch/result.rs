//! Dispatch result types and errors.

use std::fmt;
use std::sync::Arc;

use super::signature::Signature;
use super::table::Method;
use crate::error::{DispatchError, DispatchResult};
use crate::types::Type;

/// Result of dispatch resolution.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// A unique method was found.
    Resolved(Arc<Method>),
    /// No applicable methods found.
    NoMatch(NoMatchError),
    /// Multiple methods are ambiguous.
    Ambiguous(AmbiguityError),
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    /// The resolved method, or the resolution failure as an error.
    pub fn into_result(self) -> DispatchResult<Arc<Method>> {
        match self {
            Resolution::Resolved(method) => Ok(method),
            Resolution::NoMatch(err) => Err(DispatchError::NotApplicable(err)),
            Resolution::Ambiguous(err) => Err(DispatchError::Ambiguous(err)),
        }
    }
}

/// Error when no method matches the arguments.
#[derive(Debug, Clone)]
pub struct NoMatchError {
    /// The function that was called.
    pub function: String,
    /// The argument types provided.
    pub arg_types: Vec<Type>,
    /// All signatures that were considered.
    pub candidates: Vec<Signature>,
    /// The candidates ranked by [`Mismatch::distance`], closest first.
    pub closest: Vec<Mismatch>,
}

/// Candidates listed in a [`NoMatchError`] message.
const CLOSEST_SHOWN: usize = 3;

impl fmt::Display for NoMatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "for function `{}`, signature {} could not be resolved",
            self.function,
            Arguments(&self.arg_types)
        )?;
        if self.candidates.is_empty() {
            return f.write_str(" (no methods registered)");
        }
        write!(f, " ({} candidates considered)", self.candidates.len())?;
        if !self.closest.is_empty() {
            f.write_str("; closest candidates:")?;
            for mismatch in self.closest.iter().take(CLOSEST_SHOWN) {
                write!(f, "\n  {}", mismatch)?;
            }
        }
        Ok(())
    }
}

/// How a registered signature fails to cover the arguments of a call.
#[derive(Debug, Clone)]
pub struct Mismatch {
    pub signature: Signature,
    /// Arity difference after expanding the variadic tail, plus the number
    /// of arguments outside their parameter type.
    pub distance: usize,
    /// Positional arguments outside their parameter type.
    pub positions: Vec<usize>,
    /// Whether every argument taken by the variadic tail fits it.
    pub varargs_matched: bool,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (distance {}", self.signature, self.distance)?;
        if !self.positions.is_empty() {
            f.write_str("; mismatched arguments:")?;
            for position in &self.positions {
                write!(f, " {}", position)?;
            }
        }
        if !self.varargs_matched {
            f.write_str("; variadic tail mismatched")?;
        }
        f.write_str(")")
    }
}

/// Error when multiple methods are ambiguous.
#[derive(Debug, Clone)]
pub struct AmbiguityError {
    /// The function that was called.
    pub function: String,
    /// The argument types provided.
    pub arg_types: Vec<Type>,
    /// The competing minimal signatures, after the precedence tie-break.
    pub candidates: Vec<Signature>,
}

impl fmt::Display for AmbiguityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "for function `{}`, signature {} is ambiguous among the following:",
            self.function,
            Arguments(&self.arg_types)
        )?;
        for candidate in &self.candidates {
            write!(f, "\n  {} (precedence: {})", candidate, candidate.precedence)?;
        }
        Ok(())
    }
}

impl std::error::Error for NoMatchError {}

impl std::error::Error for AmbiguityError {}

struct Arguments<'a>(&'a [Type]);

impl fmt::Display for Arguments<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, ty) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", ty)?;
        }
        f.write_str(")")
    }
}
