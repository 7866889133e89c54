//! The callable object model: native functions, user functions, classes and
//! instances.
//!
//! A user function pairs its declaration with the environment captured at its
//! definition point (the closure).  Binding a method wraps that closure in a
//! one-entry environment defining `this`, so a method value looked up on an
//! instance keeps resolving `this` correctly when called standalone.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use log::debug;

use crate::ast::FunctionDecl;
use crate::environment::Environment;
use crate::error::{JaqlError, Result};
use crate::interpreter::{Flow, Interpreter};
use crate::token::Token;
use crate::value::Value;

/// The method name that makes a function a class initializer.
pub const INITIALIZER_NAME: &str = "init";

/// A host-provided function exposed in the global environment.
pub struct NativeFunction {
    pub name: String,
    pub arity: usize,
    pub func: fn(&[Value]) -> std::result::Result<Value, String>,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// A user-defined function or method together with its captured closure.
pub struct JaqlFunction {
    declaration: Rc<FunctionDecl>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl fmt::Debug for JaqlFunction {
    // The closure chain may contain this very function; print the name only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JaqlFunction")
            .field("name", &self.name())
            .field("is_initializer", &self.is_initializer)
            .finish()
    }
}

impl JaqlFunction {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Produce a copy of this method whose closure additionally defines
    /// `this` as `instance`.
    pub fn bind(&self, instance: Rc<RefCell<JaqlInstance>>) -> JaqlFunction {
        let mut scope: Environment = Environment::with_enclosing(Rc::clone(&self.closure));
        scope.define("this", Value::Instance(instance));

        JaqlFunction {
            declaration: Rc::clone(&self.declaration),
            closure: Rc::new(RefCell::new(scope)),
            is_initializer: self.is_initializer,
        }
    }

    /// Invoke the function: one fresh environment enclosed by the captured
    /// closure, parameters bound positionally, body executed there.
    ///
    /// A `Flow::Return` unwinding out of the body becomes the call result;
    /// falling off the end yields `nil`.  Initializers always return the
    /// bound `this` instead.
    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        out: &mut dyn Write,
    ) -> Result<Value> {
        debug!("Calling function '{}'", self.name());

        let mut frame: Environment = Environment::with_enclosing(Rc::clone(&self.closure));

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            frame.define(&param.lexeme, argument);
        }

        let flow: Flow =
            interpreter.execute_block(&self.declaration.body, Rc::new(RefCell::new(frame)), out)?;

        if self.is_initializer {
            // The instance lives at depth 0 of the bound closure.
            return Environment::get_at(&self.closure, 0, "this", self.declaration.name.line);
        }

        match flow {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }
}

/// A user-defined class: a named method table with an optional superclass.
pub struct JaqlClass {
    pub name: String,
    superclass: Option<Rc<JaqlClass>>,
    methods: HashMap<String, Rc<JaqlFunction>>,
}

impl fmt::Debug for JaqlClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JaqlClass").field("name", &self.name).finish()
    }
}

impl JaqlClass {
    pub fn new(
        name: String,
        superclass: Option<Rc<JaqlClass>>,
        methods: HashMap<String, Rc<JaqlFunction>>,
    ) -> Self {
        Self {
            name,
            superclass,
            methods,
        }
    }

    /// Method lookup walks this class then the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<JaqlFunction>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }

        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    /// A class's call arity is its initializer's arity, or zero.
    pub fn arity(&self) -> usize {
        self.find_method(INITIALIZER_NAME)
            .map_or(0, |init| init.arity())
    }

    /// Calling a class constructs a new instance, then runs a bound `init`
    /// (if declared) before handing the instance back.
    pub fn call(
        class: &Rc<JaqlClass>,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
        out: &mut dyn Write,
    ) -> Result<Value> {
        debug!("Instantiating class '{}'", class.name);

        let instance: Rc<RefCell<JaqlInstance>> =
            Rc::new(RefCell::new(JaqlInstance::new(Rc::clone(class))));

        if let Some(initializer) = class.find_method(INITIALIZER_NAME) {
            initializer
                .bind(Rc::clone(&instance))
                .call(interpreter, arguments, out)?;
        }

        Ok(Value::Instance(instance))
    }
}

/// A class instance: a field map plus a reference to its class.
pub struct JaqlInstance {
    class: Rc<JaqlClass>,
    fields: HashMap<String, Value>,
}

impl fmt::Debug for JaqlInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JaqlInstance")
            .field("class", &self.class.name)
            .field("fields", &self.fields.keys())
            .finish()
    }
}

impl JaqlInstance {
    pub fn new(class: Rc<JaqlClass>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class.name
    }

    /// Property access: fields shadow methods; a method hit is bound to
    /// `instance` so `this` resolves later.
    pub fn get(instance: &Rc<RefCell<JaqlInstance>>, name: &Token) -> Result<Value> {
        if let Some(value) = instance.borrow().fields.get(&name.lexeme) {
            return Ok(value.clone());
        }

        let class: Rc<JaqlClass> = Rc::clone(&instance.borrow().class);

        if let Some(method) = class.find_method(&name.lexeme) {
            return Ok(Value::Function(Rc::new(method.bind(Rc::clone(instance)))));
        }

        Err(JaqlError::runtime(
            name.line,
            format!("Undefined property '{}'.", name.lexeme),
        ))
    }

    /// Property assignment writes the field unconditionally, creating it if
    /// absent.
    pub fn set(&mut self, name: &Token, value: Value) {
        self.fields.insert(name.lexeme.clone(), value);
    }
}
