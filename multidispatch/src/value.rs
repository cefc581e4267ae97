//! Runtime values passed to dispatched calls.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::class::{ClassId, ClassRef};
use crate::error::{DispatchError, DispatchResult};
use crate::parametric::Param;
use crate::types::Type;

/// A runtime value.
#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    List(Arc<[Value]>),
    Tuple(Arc<[Value]>),
    /// An instance of a user-declared class.
    Object(Arc<Object>),
    /// An instance of a concrete parametric type.
    Instance(Arc<Instance>),
}

/// An instance of a user-declared class with an opaque payload.
pub struct Object {
    class: ClassRef,
    data: Box<dyn Any + Send + Sync>,
}

impl Object {
    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    /// Borrow the payload as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.data.downcast_ref()
    }
}

/// An instance of a concrete parametric type.
#[derive(Debug, PartialEq)]
pub struct Instance {
    ty: Type,
    fields: Vec<Value>,
}

impl Instance {
    pub(crate) fn new(ty: Type, fields: Vec<Value>) -> Self {
        Self { ty, fields }
    }

    /// The concrete parametric type this instance was constructed through.
    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn fields(&self) -> &[Value] {
        &self.fields
    }
}

impl Value {
    /// Create an instance of a declared class.
    pub fn object<T: Any + Send + Sync>(class: &Type, data: T) -> DispatchResult<Self> {
        match class {
            Type::Concrete(class) => Ok(Value::Object(Arc::new(Object {
                class: class.clone(),
                data: Box::new(data),
            }))),
            other => Err(DispatchError::MalformedType(format!(
                "`{}` is not a class",
                other
            ))),
        }
    }

    pub fn str(s: impl Into<Arc<str>>) -> Self {
        Value::Str(s.into())
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(items.into_iter().collect())
    }

    pub fn tuple(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Tuple(items.into_iter().collect())
    }

    /// The most-derived runtime class of this value.
    pub fn class(&self) -> ClassRef {
        match self {
            Value::None => ClassRef::builtin(ClassId::NONE),
            Value::Bool(_) => ClassRef::builtin(ClassId::BOOL),
            Value::Int(_) => ClassRef::builtin(ClassId::INT),
            Value::Float(_) => ClassRef::builtin(ClassId::FLOAT),
            Value::Str(_) => ClassRef::builtin(ClassId::STR),
            Value::List(_) => ClassRef::builtin(ClassId::LIST),
            Value::Tuple(_) => ClassRef::builtin(ClassId::TUPLE),
            Value::Object(obj) => obj.class.clone(),
            Value::Instance(inst) => match &inst.ty {
                Type::Parametric(p) => p.family().class().clone(),
                _ => ClassRef::builtin(ClassId::OBJECT),
            },
        }
    }

    /// Id of the most-derived runtime class.
    pub fn class_id(&self) -> ClassId {
        match self {
            Value::None => ClassId::NONE,
            Value::Bool(_) => ClassId::BOOL,
            Value::Int(_) => ClassId::INT,
            Value::Float(_) => ClassId::FLOAT,
            Value::Str(_) => ClassId::STR,
            Value::List(_) => ClassId::LIST,
            Value::Tuple(_) => ClassId::TUPLE,
            Value::Object(obj) => obj.class.id(),
            Value::Instance(_) => self.class().id(),
        }
    }

    /// The type parameter of a parametric instance.
    pub fn type_parameter(&self) -> DispatchResult<&Param> {
        match self {
            Value::Instance(inst) => inst.ty.parameter(),
            other => Err(DispatchError::NotParametric(format!("{:?}", other))),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Instance(inst) => Some(inst),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::List(items) => f.debug_list().entries(items.iter()).finish(),
            Value::Tuple(items) => {
                let mut t = f.debug_tuple("");
                for item in items.iter() {
                    t.field(item);
                }
                t.finish()
            }
            Value::Object(obj) => write!(f, "<{} object>", obj.class),
            Value::Instance(inst) => {
                write!(f, "{}", inst.ty)?;
                let mut t = f.debug_tuple("");
                for field in &inst.fields {
                    t.field(field);
                }
                t.finish()
            }
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_classes() {
        assert_eq!(Value::from(1).class_id(), ClassId::INT);
        assert_eq!(Value::from(1.5).class_id(), ClassId::FLOAT);
        assert_eq!(Value::from(true).class_id(), ClassId::BOOL);
        assert_eq!(Value::from("x").class_id(), ClassId::STR);
        assert_eq!(Value::list([]).class_id(), ClassId::LIST);
        assert_eq!(Value::None.class().name(), "NoneType");
    }

    #[test]
    fn test_object_requires_class() {
        let err = Value::object(&Type::any(), ()).unwrap_err();
        assert!(matches!(err, DispatchError::MalformedType(_)));

        let obj = Value::object(&Type::int(), 7u8).unwrap();
        match &obj {
            Value::Object(o) => assert_eq!(o.downcast_ref::<u8>(), Some(&7)),
            other => panic!("Expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_object_identity_equality() {
        let a = Value::object(&Type::int(), ()).unwrap();
        let b = Value::object(&Type::int(), ()).unwrap();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_type_parameter_of_plain_value() {
        let err = Value::from(3).type_parameter().unwrap_err();
        assert!(matches!(err, DispatchError::NotParametric(_)));
    }

    #[test]
    fn test_debug_rendering() {
        let v = Value::list([Value::from(1), Value::from("a"), Value::None]);
        assert_eq!(format!("{:?}", v), "[1, \"a\", None]");
    }
}
