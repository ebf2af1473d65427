use std::collections::HashMap;
use std::rc::Rc;

use crate::lang::value::Value;

/// Global variable table. Entries are created by definitions and never
/// removed; redefinition overwrites.
#[derive(Debug, Default)]
pub struct Globals {
    values: HashMap<Rc<str>, Value>,
}

impl Globals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: Rc<str>, value: Value) {
        self.values.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Overwrites an existing global. Returns false, leaving the table
    /// untouched, when `name` was never defined.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        match self.values.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_then_get() {
        let mut globals = Globals::new();
        globals.define(Rc::from("a"), Value::Number(1.0));
        assert_eq!(globals.get("a"), Some(&Value::Number(1.0)));
        assert_eq!(globals.get("b"), None);
    }

    #[test]
    fn test_redefine_overwrites() {
        let mut globals = Globals::new();
        globals.define(Rc::from("a"), Value::Number(1.0));
        globals.define(Rc::from("a"), Value::Bool(true));
        assert_eq!(globals.get("a"), Some(&Value::Bool(true)));
        assert_eq!(globals.len(), 1);
    }

    #[test]
    fn test_assign_requires_definition() {
        let mut globals = Globals::new();
        assert!(!globals.assign("x", Value::Nil));
        assert!(!globals.contains("x"));

        globals.define(Rc::from("x"), Value::Nil);
        assert!(globals.assign("x", Value::Number(2.0)));
        assert_eq!(globals.get("x"), Some(&Value::Number(2.0)));
    }
}
