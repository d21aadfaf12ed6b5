//! Lexical variable frames.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::interp::value::{release, Value};

/// One level of variable bindings. Function calls and comprehensions push
/// a child frame whose parent is the frame the function was defined in.
#[derive(Debug, Default)]
pub struct Frame {
    vars: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<Frame>>,
}

impl Frame {
    pub fn root() -> Rc<Frame> {
        Rc::new(Frame::default())
    }

    pub fn child(parent: &Rc<Frame>) -> Rc<Frame> {
        Rc::new(Frame {
            vars: RefCell::new(HashMap::new()),
            parent: Some(Rc::clone(parent)),
        })
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }

    pub fn set(&self, name: impl Into<String>, value: Value) {
        let previous = self.vars.borrow_mut().insert(name.into(), value);
        drop(previous);
    }

    /// Bindings of this frame only, sorted by name.
    pub fn bindings(&self) -> Vec<(String, Value)> {
        let mut out: Vec<_> = self
            .vars
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Move every binding out of the frame.
    pub fn take_values(&self) -> Vec<Value> {
        self.vars.borrow_mut().drain().map(|(_, v)| v).collect()
    }

    /// Drop every binding, breaking reference cycles through closures.
    pub fn clear(&self) {
        release(self.take_values());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_sees_parent_bindings() {
        let root = Frame::root();
        root.set("x", Value::Int(1));
        let child = Frame::child(&root);
        child.set("y", Value::Int(2));

        assert!(matches!(child.lookup("x"), Some(Value::Int(1))));
        assert!(matches!(child.lookup("y"), Some(Value::Int(2))));
        assert!(root.lookup("y").is_none());
    }

    #[test]
    fn test_bindings_are_sorted() {
        let root = Frame::root();
        root.set("b", Value::None);
        root.set("a", Value::None);
        let names: Vec<_> = root.bindings().into_iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
