//! Lexically scoped name bindings.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::object::Value;

/// A frame of name bindings with an optional link to the enclosing frame.
///
/// Frames are shared: every function call encloses the environment the
/// callee captured at its definition site, and a returned function keeps
/// that environment alive.
#[derive(Debug)]
pub struct Environment {
    store: RefCell<HashMap<String, Value>>,
    outer: Option<Rc<Environment>>,
}

impl Environment {
    /// Creates the outermost frame of a session.
    pub fn new_root() -> Rc<Environment> {
        Rc::new(Environment {
            store: RefCell::new(HashMap::new()),
            outer: None,
        })
    }

    /// Creates a fresh frame whose lookups fall back to `outer`.
    pub fn new_enclosed(outer: Rc<Environment>) -> Rc<Environment> {
        Rc::new(Environment {
            store: RefCell::new(HashMap::new()),
            outer: Some(outer),
        })
    }

    /// Return the binding from the innermost frame that defines `name`.
    pub fn get(&self, name: &str) -> Option<Value> {
        match self.store.borrow().get(name) {
            Some(value) => Some(value.clone()),
            None => self.outer.as_ref().and_then(|outer| outer.get(name)),
        }
    }

    /// Bind `name` in this frame, shadowing any outer binding. Outer
    /// frames are never written.
    pub fn set(&self, name: &str, value: Value) {
        self.store.borrow_mut().insert(name.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get() {
        let env = Environment::new_root();
        env.set("foo", Value::Integer(42));
        assert_eq!(env.get("foo"), Some(Value::Integer(42)));
    }

    #[test]
    fn missing_name_is_none() {
        let env = Environment::new_root();
        assert_eq!(env.get("foo"), None);
    }

    #[test]
    fn lookup_recurses_outward() {
        let outer = Environment::new_root();
        outer.set("foo", Value::Integer(1));
        let inner = Environment::new_enclosed(outer);
        assert_eq!(inner.get("foo"), Some(Value::Integer(1)));
    }

    #[test]
    fn inner_binding_shadows_outer() {
        let outer = Environment::new_root();
        outer.set("foo", Value::Integer(1));
        let inner = Environment::new_enclosed(outer.clone());
        inner.set("foo", Value::Integer(2));

        assert_eq!(inner.get("foo"), Some(Value::Integer(2)));
        assert_eq!(outer.get("foo"), Some(Value::Integer(1)));
    }

    #[test]
    fn set_writes_innermost_frame_only() {
        let outer = Environment::new_root();
        outer.set("foo", Value::Integer(1));
        let inner = Environment::new_enclosed(outer.clone());
        inner.set("bar", Value::Integer(2));

        assert_eq!(outer.get("bar"), None);
    }

    #[test]
    fn rebinding_overwrites() {
        let env = Environment::new_root();
        env.set("foo", Value::Integer(1));
        env.set("foo", Value::Integer(2));
        assert_eq!(env.get("foo"), Some(Value::Integer(2)));
    }
}
