//! Runtime variable storage: a parent-linked chain of scopes.
//!
//! Each call frame or block owns one `Environment`; the chain's root is the
//! single process-lifetime global environment.  Closures capture a shared
//! `Rc<RefCell<Environment>>` of the frame active at their definition point,
//! which keeps that frame alive after the defining call returns.  Writes
//! through one closure are visible to every closure sharing the captured
//! frame.

use crate::error::{JaqlError, Result};
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Introduce (or overwrite) a binding in this scope.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// The names bound directly in this scope (not the enclosing chain).
    pub fn names(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    /// Dynamic lookup: this scope, then the enclosing chain.  Used for
    /// globals, where the resolver recorded no depth.
    pub fn get(&self, name: &str, line: usize) -> Result<Value> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(JaqlError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    /// Dynamic assignment along the enclosing chain.
    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<()> {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(JaqlError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    /// Walk exactly `distance` enclosing links from `env`.
    ///
    /// The resolver guarantees the ancestor exists; a missing link is an
    /// interpreter bug, reported as a runtime error rather than a panic.
    fn ancestor(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        line: usize,
    ) -> Result<Rc<RefCell<Environment>>> {
        let mut current: Rc<RefCell<Environment>> = Rc::clone(env);

        for _ in 0..distance {
            let next: Option<Rc<RefCell<Environment>>> = current
                .borrow()
                .enclosing
                .as_ref()
                .map(Rc::clone);

            match next {
                Some(parent) => current = parent,
                None => {
                    return Err(JaqlError::runtime(
                        line,
                        "Scope chain shorter than resolved depth.",
                    ));
                }
            }
        }

        Ok(current)
    }

    /// Read `name` from the scope exactly `distance` links up the chain.
    /// No name comparison happens at intermediate frames.
    pub fn get_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        line: usize,
    ) -> Result<Value> {
        let target: Rc<RefCell<Environment>> = Self::ancestor(env, distance, line)?;
        let borrowed = target.borrow();

        match borrowed.values.get(name) {
            Some(value) => Ok(value.clone()),
            None => Err(JaqlError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            )),
        }
    }

    /// Write `name` in the scope exactly `distance` links up the chain.
    pub fn assign_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        value: Value,
        line: usize,
    ) -> Result<()> {
        let target: Rc<RefCell<Environment>> = Self::ancestor(env, distance, line)?;

        target.borrow_mut().values.insert(name.to_string(), value);

        Ok(())
    }
}
