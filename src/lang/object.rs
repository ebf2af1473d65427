use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::value::Value;
use crate::bytecode::chunk::Chunk;

/// Host callable. Receives the call arguments and returns a value, or an
/// error message that the VM turns into a runtime error.
pub type NativeFn = fn(&[Value]) -> Result<Value, String>;

/// Heap object variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Obj {
    String(Rc<str>),
    Function(Rc<Function>),
    #[serde(skip)]
    Native(Rc<Native>),
}

impl Obj {
    pub fn type_name(&self) -> &'static str {
        match self {
            Obj::String(_) => "string",
            Obj::Function(_) => "function",
            Obj::Native(_) => "native",
        }
    }
}

impl PartialEq for Obj {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Obj::String(a), Obj::String(b)) => a == b,
            (Obj::Function(a), Obj::Function(b)) => Rc::ptr_eq(a, b),
            (Obj::Native(a), Obj::Native(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Obj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Obj::String(s) => write!(f, "{}", s),
            Obj::Function(function) => write!(f, "{}", function),
            Obj::Native(_) => write!(f, "<native fn>"),
        }
    }
}

/// A compiled function body. The top-level script is a `Function` with no
/// name and arity 0.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Function {
    pub arity: u8,
    pub chunk: Chunk,
    pub name: Option<String>,
}

impl Function {
    pub fn new(name: Option<&str>) -> Self {
        Function {
            arity: 0,
            chunk: Chunk::new(),
            name: name.map(str::to_string),
        }
    }

    /// Name shown in runtime backtraces.
    pub fn frame_name(&self) -> &str {
        self.name.as_deref().unwrap_or("script")
    }

    /// Name shown in disassembly headers.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => "<script>".to_string(),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "<fn {}>", name),
            None => write!(f, "<script>"),
        }
    }
}

pub struct Native {
    pub name: String,
    pub function: NativeFn,
}

impl fmt::Debug for Native {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Native").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero(_args: &[Value]) -> Result<Value, String> {
        Ok(Value::Number(0.0))
    }

    #[test]
    fn test_function_identity_equality() {
        let f = Rc::new(Function::new(Some("f")));
        let same = Obj::Function(Rc::clone(&f));
        let twin = Obj::Function(Rc::new(Function::new(Some("f"))));
        assert_eq!(Obj::Function(f), same);
        assert_ne!(same, twin);
    }

    #[test]
    fn test_native_identity_equality() {
        let n = Rc::new(Native {
            name: "zero".to_string(),
            function: zero,
        });
        assert_eq!(Obj::Native(Rc::clone(&n)), Obj::Native(n));
    }

    #[test]
    fn test_names() {
        let script = Function::new(None);
        assert_eq!(script.frame_name(), "script");
        assert_eq!(script.display_name(), "<script>");
        assert_eq!(script.to_string(), "<script>");

        let f = Function::new(Some("fib"));
        assert_eq!(f.frame_name(), "fib");
        assert_eq!(f.display_name(), "fib");
        assert_eq!(f.to_string(), "<fn fib>");
    }
}
