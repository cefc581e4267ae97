//! Method signatures.

use std::fmt;

use crate::error::{DispatchError, DispatchResult};
use crate::types::Type;

/// Declared parameter types of a method, with an optional variadic tail.
#[derive(Debug, Clone)]
pub struct Signature {
    /// Positional parameter types.
    pub types: Vec<Type>,
    /// Element type of the variadic tail, if any.
    pub varargs: Option<Type>,
    /// Tie-break among otherwise incomparable minimal signatures. Higher wins.
    pub precedence: i32,
    /// Declared return type; `Any` when undeclared.
    pub return_type: Type,
}

impl Signature {
    pub fn new(types: impl IntoIterator<Item = Type>) -> Self {
        Self {
            types: types.into_iter().collect(),
            varargs: None,
            precedence: 0,
            return_type: Type::Any,
        }
    }

    /// Accept any number of trailing arguments of `element`.
    pub fn with_varargs(mut self, element: Type) -> Self {
        self.varargs = Some(element);
        self
    }

    pub fn with_precedence(mut self, precedence: i32) -> Self {
        self.precedence = precedence;
        self
    }

    pub fn returning(mut self, return_type: Type) -> Self {
        self.return_type = return_type;
        self
    }

    /// Number of positional parameters.
    pub fn arity(&self) -> usize {
        self.types.len()
    }

    pub fn has_varargs(&self) -> bool {
        self.varargs.is_some()
    }

    /// Whether a call with `n` arguments fits this signature's arity.
    pub fn accepts_arity(&self, n: usize) -> bool {
        n == self.types.len() || (n > self.types.len() && self.has_varargs())
    }

    /// Parameter type at position `i`, with the variadic tail repeated past
    /// the positional parameters.
    pub fn type_at(&self, i: usize) -> Option<&Type> {
        self.types.get(i).or(self.varargs.as_ref())
    }

    pub fn is_faithful(&self) -> bool {
        self.types.iter().all(Type::is_faithful)
            && self.varargs.as_ref().map_or(true, Type::is_faithful)
    }

    /// Reject malformed parameter types.
    pub fn validate(&self) -> DispatchResult<()> {
        for ty in &self.types {
            ty.check_well_formed()?;
        }
        if let Some(element) = &self.varargs {
            if matches!(element, Type::Variadic(_)) {
                return Err(DispatchError::MalformedType(format!(
                    "nested variadic `*{}`",
                    element
                )));
            }
            element.check_well_formed()?;
        }
        Ok(())
    }

    /// Two signatures are the same method slot when their parameter types and
    /// variadic tails agree; precedence and return type are not part of the
    /// identity.
    pub fn same_parameters(&self, other: &Signature) -> bool {
        self.types == other.types && self.varargs == other.varargs
    }

    pub(crate) fn key(&self) -> SignatureKey {
        SignatureKey {
            types: self.types.clone(),
            varargs: self.varargs.clone(),
        }
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.same_parameters(other)
            && self.precedence == other.precedence
            && self.return_type == other.return_type
    }
}

impl Eq for Signature {}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, ty) in self.types.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", ty)?;
        }
        if let Some(element) = &self.varargs {
            if !self.types.is_empty() {
                f.write_str(", ")?;
            }
            write!(f, "*{}", element)?;
        }
        f.write_str(")")?;
        if !self.return_type.is_any() {
            write!(f, " -> {}", self.return_type)?;
        }
        Ok(())
    }
}

/// Structural identity of a signature within a method table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct SignatureKey {
    types: Vec<Type>,
    varargs: Option<Type>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_at_expands_varargs() {
        let sig = Signature::new([Type::int()]).with_varargs(Type::str());
        assert_eq!(sig.type_at(0), Some(&Type::int()));
        assert_eq!(sig.type_at(1), Some(&Type::str()));
        assert_eq!(sig.type_at(5), Some(&Type::str()));
        assert_eq!(Signature::new([Type::int()]).type_at(1), None);
    }

    #[test]
    fn test_accepts_arity() {
        let fixed = Signature::new([Type::int(), Type::int()]);
        assert!(fixed.accepts_arity(2));
        assert!(!fixed.accepts_arity(1));
        assert!(!fixed.accepts_arity(3));

        let variadic = Signature::new([Type::int()]).with_varargs(Type::int());
        assert!(variadic.accepts_arity(1));
        assert!(variadic.accepts_arity(4));
        assert!(!variadic.accepts_arity(0));
    }

    #[test]
    fn test_identity_ignores_precedence() {
        let a = Signature::new([Type::int()]);
        let b = Signature::new([Type::int()]).with_precedence(3);
        assert!(a.same_parameters(&b));
        assert_eq!(a.key(), b.key());
        assert_ne!(a, b);
    }

    #[test]
    fn test_validate_rejects_malformed() {
        assert!(Signature::new([Type::variadic(Type::int())]).validate().is_err());
        let nested = Signature::new([]).with_varargs(Type::variadic(Type::int()));
        assert!(nested.validate().is_err());
        assert!(Signature::new([Type::int()]).with_varargs(Type::str()).validate().is_ok());
    }

    #[test]
    fn test_display() {
        let sig = Signature::new([Type::int(), Type::str()])
            .with_varargs(Type::float())
            .returning(Type::str());
        assert_eq!(sig.to_string(), "(int, str, *float) -> str");
        assert_eq!(Signature::new([]).with_varargs(Type::int()).to_string(), "(*int)");
    }

    #[test]
    fn test_faithfulness() {
        assert!(Signature::new([Type::int()]).is_faithful());
        let seq = Signature::new([Type::int()]).with_varargs(Type::sequence(Type::int()));
        assert!(!seq.is_faithful());
    }
}
