use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::object::Obj;

/// Runtime value.
///
/// `Nil`, `Bool` and `Number` are plain copies. `Object` carries a shared
/// handle to a heap object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Object(Obj),
}

impl Value {
    /// Builds a string object value.
    pub fn string(text: &str) -> Self {
        Value::Object(Obj::String(Rc::from(text)))
    }

    /// Only `nil` and `false` are falsy.
    pub fn is_falsy(&self) -> bool {
        matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Object(Obj::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Name of the value's runtime type, used in trace output.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Object(obj) => obj.type_name(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl fmt::Display for Value {
    /// Renders a value the way `print` shows it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::Object(obj) => write!(f, "{}", obj),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(Value::Nil.is_falsy());
        assert!(Value::Bool(false).is_falsy());
        assert!(!Value::Bool(true).is_falsy());
        assert!(!Value::Number(0.0).is_falsy());
        assert!(!Value::string("").is_falsy());
    }

    #[test]
    fn test_equality_requires_same_tag() {
        assert_eq!(Value::Nil, Value::Nil);
        assert_ne!(Value::Nil, Value::Bool(false));
        assert_ne!(Value::Number(0.0), Value::Bool(false));
        assert_ne!(Value::Number(1.0), Value::string("1"));
    }

    #[test]
    fn test_strings_compare_by_content() {
        let a = Value::string("lox");
        let b = Value::string("lox");
        assert_eq!(a, b);
        assert_ne!(a, Value::string("lux"));
    }

    #[test]
    fn test_from_primitives() {
        assert_eq!(Value::from(2.5), Value::Number(2.5));
        assert_eq!(Value::from(false), Value::Bool(false));
    }

    #[test]
    fn test_nan_is_not_equal_to_itself() {
        assert_ne!(Value::Number(f64::NAN), Value::Number(f64::NAN));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Nil.to_string(), "nil");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(-0.125).to_string(), "-0.125");
        assert_eq!(Value::string("hi there").to_string(), "hi there");
    }
}
