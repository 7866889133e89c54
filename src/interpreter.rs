//! Tree-walking evaluator for the Jaql language.
//!
//! Evaluation is recursive: each node's handler is selected by an exhaustive
//! `match` over the `Expr`/`Stmt` variants.  Variable access uses the depth
//! table produced by the resolver — a recorded depth walks exactly that many
//! enclosing frames; an absent entry falls back to the global environment.
//!
//! `return` is modelled as data, not as an unwinding error: statement
//! execution yields a [`Flow`], and the function-call boundary in
//! [`crate::callable::JaqlFunction::call`] converts `Flow::Return` into the
//! call's result.  The resolver statically rejects `return` at top level, so
//! the signal cannot escape the outermost frame.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

use log::{debug, info};

use crate::ast::{Expr, LiteralValue, Stmt};
use crate::callable::{JaqlClass, JaqlFunction, JaqlInstance, NativeFunction};
use crate::environment::Environment;
use crate::error::{JaqlError, Result};
use crate::resolver::Resolutions;
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Outcome of executing one statement: fell through normally, or a `return`
/// is unwinding toward the nearest function-call boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Return(Value),
}

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<usize, usize>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates a new Interpreter and defines native functions such as `clock`.
    pub fn new() -> Self {
        info!("Initializing Interpreter");

        let globals: Rc<RefCell<Environment>> = Rc::new(RefCell::new(Environment::new()));

        debug!("Defining native function 'clock'");

        globals.borrow_mut().define(
            "clock",
            Value::Native(Rc::new(NativeFunction {
                name: "clock".to_string(),
                arity: 0,
                func: |_args: &[Value]| {
                    let timestamp: f64 = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .map_err(|e: SystemTimeError| format!("Clock error: {}", e))?
                        .as_secs_f64();
                    Ok(Value::Number(timestamp))
                },
            })),
        );

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
        }
    }

    /// Names currently bound in the global environment.
    pub fn global_names(&self) -> Vec<String> {
        self.globals.borrow().names()
    }

    /// Merge a resolver pass's depth table into this interpreter.
    ///
    /// Node ids are unique across runs, so entries never collide; keeping
    /// earlier entries lets closures from previous REPL lines keep working.
    pub fn absorb(&mut self, resolutions: Resolutions) {
        debug!("Absorbing {} resolution(s)", resolutions.len());

        self.locals.extend(resolutions);
    }

    /// Interprets a list of statements (a "program").
    ///
    /// The first runtime error aborts the remaining top-level statements;
    /// runtime state after an error is not trustworthy.
    pub fn interpret(&mut self, statements: &[Stmt], out: &mut dyn Write) -> Result<()> {
        debug!("Interpreting {} statements", statements.len());

        for stmt in statements {
            self.execute(stmt, out)?;
        }

        info!("Interpretation completed successfully");
        Ok(())
    }

    /// Executes a single statement.
    pub fn execute(&mut self, stmt: &Stmt, out: &mut dyn Write) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr, out)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr, out)?;
                writeln!(out, "{}", value)?;
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr, out)?,
                    None => Value::Nil,
                };

                debug!("Variable '{}' defined with value: {}", name.lexeme, value);

                self.environment.borrow_mut().define(&name.lexeme, value);
                Ok(Flow::Normal)
            }

            Stmt::Function(declaration) => {
                // capture the current environment as the closure
                let function = JaqlFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );

                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Value::Function(Rc::new(function)));

                info!(
                    "Function '{}' defined with {} parameters",
                    declaration.name.lexeme,
                    declaration.params.len()
                );

                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                let scope: Environment =
                    Environment::with_enclosing(Rc::clone(&self.environment));

                self.execute_block(statements, Rc::new(RefCell::new(scope)), out)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let cond_value: Value = self.evaluate(condition, out)?;

                if is_truthy(&cond_value) {
                    self.execute(then_branch, out)
                } else if let Some(else_stmt) = else_branch {
                    self.execute(else_stmt, out)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                loop {
                    let cond_value: Value = self.evaluate(condition, out)?;
                    if !is_truthy(&cond_value) {
                        break;
                    }

                    if let Flow::Return(value) = self.execute(body, out)? {
                        return Ok(Flow::Return(value));
                    }
                }

                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr, out)?,
                    None => Value::Nil,
                };

                debug!("Returning value: {}", value);

                Ok(Flow::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let superclass: Option<Rc<JaqlClass>> = match superclass {
                    Some(expr) => {
                        let value: Value = self.evaluate(expr, out)?;

                        match value {
                            Value::Class(class) => Some(class),
                            _ => {
                                return Err(JaqlError::runtime(
                                    superclass_line(expr, name),
                                    "Superclass must be a class.",
                                ));
                            }
                        }
                    }
                    None => None,
                };

                self.environment
                    .borrow_mut()
                    .define(&name.lexeme, Value::Nil);

                // methods capture `super` one frame above their closure
                let previous: Rc<RefCell<Environment>> = Rc::clone(&self.environment);
                if let Some(superclass) = &superclass {
                    let mut scope: Environment =
                        Environment::with_enclosing(Rc::clone(&self.environment));
                    scope.define("super", Value::Class(Rc::clone(superclass)));
                    self.environment = Rc::new(RefCell::new(scope));
                }

                let mut table: HashMap<String, Rc<JaqlFunction>> = HashMap::new();
                for method in methods {
                    let is_initializer: bool =
                        method.name.lexeme == crate::callable::INITIALIZER_NAME;

                    table.insert(
                        method.name.lexeme.clone(),
                        Rc::new(JaqlFunction::new(
                            Rc::clone(method),
                            Rc::clone(&self.environment),
                            is_initializer,
                        )),
                    );
                }

                if superclass.is_some() {
                    self.environment = previous;
                }

                let class = JaqlClass::new(name.lexeme.clone(), superclass, table);

                self.environment.borrow_mut().assign(
                    &name.lexeme,
                    Value::Class(Rc::new(class)),
                    name.line,
                )?;

                info!("Class '{}' defined", name.lexeme);

                Ok(Flow::Normal)
            }
        }
    }

    /// Execute `statements` in `environment`, restoring the caller's frame
    /// afterwards on every path (normal exit, `return` unwinding, error).
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
        out: &mut dyn Write,
    ) -> Result<Flow> {
        let previous: Rc<RefCell<Environment>> = Rc::clone(&self.environment);
        self.environment = environment;

        let mut result: Result<Flow> = Ok(Flow::Normal);

        for stmt in statements {
            match self.execute(stmt, out) {
                Ok(Flow::Normal) => continue,
                other => {
                    result = other;
                    break;
                }
            }
        }

        self.environment = previous;

        result
    }

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr, out: &mut dyn Write) -> Result<Value> {
        match expr {
            Expr::Literal(lit) => Ok(literal_value(lit)),

            Expr::Grouping(inner) => self.evaluate(inner, out),

            Expr::Unary { operator, right } => {
                let right_val: Value = self.evaluate(right, out)?;

                match operator.token_type {
                    TokenType::MINUS => match right_val {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        other => Err(number_operand_error(operator, &other)),
                    },

                    TokenType::BANG => Ok(Value::Bool(!is_truthy(&right_val))),

                    _ => Err(JaqlError::runtime(
                        operator.line,
                        format!("Invalid unary operator '{}'.", operator.lexeme),
                    )),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left_val: Value = self.evaluate(left, out)?;
                let right_val: Value = self.evaluate(right, out)?;

                self.binary_op(operator, left_val, right_val)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_val: Value = self.evaluate(left, out)?;

                // short-circuit: the operand itself is the result
                match operator.token_type {
                    TokenType::OR if is_truthy(&left_val) => Ok(left_val),
                    TokenType::AND if !is_truthy(&left_val) => Ok(left_val),
                    _ => self.evaluate(right, out),
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(name, *id),

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value, out)?;

                match self.locals.get(id) {
                    Some(&depth) => Environment::assign_at(
                        &self.environment,
                        depth,
                        &name.lexeme,
                        value.clone(),
                        name.line,
                    )?,
                    None => self.globals.borrow_mut().assign(
                        &name.lexeme,
                        value.clone(),
                        name.line,
                    )?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee_val: Value = self.evaluate(callee, out)?;

                let mut arg_values: Vec<Value> = Vec::with_capacity(arguments.len());
                for arg in arguments {
                    arg_values.push(self.evaluate(arg, out)?);
                }

                self.invoke_callable(callee_val, paren, arg_values, out)
            }

            Expr::Get { object, name } => {
                let object_val: Value = self.evaluate(object, out)?;

                match object_val {
                    Value::Instance(instance) => JaqlInstance::get(&instance, name),
                    _ => Err(JaqlError::runtime(
                        name.line,
                        "Only instances have properties.",
                    )),
                }
            }

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object_val: Value = self.evaluate(object, out)?;

                match object_val {
                    Value::Instance(instance) => {
                        let value: Value = self.evaluate(value, out)?;
                        instance.borrow_mut().set(name, value.clone());
                        Ok(value)
                    }
                    _ => Err(JaqlError::runtime(name.line, "Only instances have fields.")),
                }
            }

            Expr::This { id, keyword } => self.look_up_variable(keyword, *id),

            Expr::Super {
                id,
                keyword,
                method,
            } => {
                let depth: usize = self.locals.get(id).copied().ok_or_else(|| {
                    JaqlError::runtime(keyword.line, "Unresolved 'super' reference.")
                })?;

                let superclass: Value =
                    Environment::get_at(&self.environment, depth, "super", keyword.line)?;
                // `this` lives in the scope just inside `super`
                let object: Value = Environment::get_at(
                    &self.environment,
                    depth.saturating_sub(1),
                    "this",
                    keyword.line,
                )?;

                let (Value::Class(superclass), Value::Instance(instance)) = (superclass, object)
                else {
                    return Err(JaqlError::runtime(
                        keyword.line,
                        "Unresolved 'super' reference.",
                    ));
                };

                match superclass.find_method(&method.lexeme) {
                    Some(found) => Ok(Value::Function(Rc::new(found.bind(instance)))),
                    None => Err(JaqlError::runtime(
                        method.line,
                        format!("Undefined property '{}'.", method.lexeme),
                    )),
                }
            }
        }
    }

    /// Depth-or-global read per the resolution table.
    fn look_up_variable(&self, name: &Token, id: usize) -> Result<Value> {
        match self.locals.get(&id) {
            Some(&depth) => {
                Environment::get_at(&self.environment, depth, &name.lexeme, name.line)
            }
            None => self.globals.borrow().get(&name.lexeme, name.line),
        }
    }

    fn binary_op(&mut self, operator: &Token, left: Value, right: Value) -> Result<Value> {
        match operator.token_type {
            TokenType::PLUS => match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
                (l, r) => Err(JaqlError::runtime(
                    operator.line,
                    format!("{} and {} must be two numbers or two strings.", l, r),
                )),
            },

            TokenType::MINUS => {
                let (a, b) = check_number_operands(operator, left, right)?;
                Ok(Value::Number(a - b))
            }

            TokenType::STAR => {
                let (a, b) = check_number_operands(operator, left, right)?;
                Ok(Value::Number(a * b))
            }

            // IEEE-754 semantics: dividing by zero yields an infinity
            TokenType::SLASH => {
                let (a, b) = check_number_operands(operator, left, right)?;
                Ok(Value::Number(a / b))
            }

            TokenType::GREATER => {
                let (a, b) = check_number_operands(operator, left, right)?;
                Ok(Value::Bool(a > b))
            }

            TokenType::GREATER_EQUAL => {
                let (a, b) = check_number_operands(operator, left, right)?;
                Ok(Value::Bool(a >= b))
            }

            TokenType::LESS => {
                let (a, b) = check_number_operands(operator, left, right)?;
                Ok(Value::Bool(a < b))
            }

            TokenType::LESS_EQUAL => {
                let (a, b) = check_number_operands(operator, left, right)?;
                Ok(Value::Bool(a <= b))
            }

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left == right)),

            TokenType::BANG_EQUAL => Ok(Value::Bool(left != right)),

            _ => Err(JaqlError::runtime(
                operator.line,
                format!("Invalid binary operator '{}'.", operator.lexeme),
            )),
        }
    }

    /// Invokes a callable (native function, user function, or class).
    fn invoke_callable(
        &mut self,
        callee: Value,
        paren: &Token,
        arguments: Vec<Value>,
        out: &mut dyn Write,
    ) -> Result<Value> {
        match callee {
            Value::Native(native) => {
                debug!("Calling native function '{}'", native.name);

                check_arity(native.arity, arguments.len(), paren)?;

                (native.func)(&arguments).map_err(|msg| JaqlError::runtime(paren.line, msg))
            }

            Value::Function(function) => {
                check_arity(function.arity(), arguments.len(), paren)?;

                function.call(self, arguments, out)
            }

            Value::Class(class) => {
                check_arity(class.arity(), arguments.len(), paren)?;

                JaqlClass::call(&class, self, arguments, out)
            }

            _ => Err(JaqlError::runtime(
                paren.line,
                "Can only call functions and classes.",
            )),
        }
    }
}

/// `nil` and `false` are falsy; everything else (zero and `""` included)
/// is truthy.
fn is_truthy(value: &Value) -> bool {
    !matches!(value, Value::Nil | Value::Bool(false))
}

fn literal_value(lit: &LiteralValue) -> Value {
    match lit {
        LiteralValue::Number(n) => Value::Number(*n),
        LiteralValue::Str(s) => Value::Str(s.clone()),
        LiteralValue::True => Value::Bool(true),
        LiteralValue::False => Value::Bool(false),
        LiteralValue::Nil => Value::Nil,
    }
}

fn check_arity(expected: usize, got: usize, paren: &Token) -> Result<()> {
    if expected == got {
        return Ok(());
    }

    Err(JaqlError::runtime(
        paren.line,
        format!("Expected {} arguments but got {}.", expected, got),
    ))
}

fn check_number_operands(operator: &Token, left: Value, right: Value) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((a, b)),
        (l, r) => Err(JaqlError::runtime(
            operator.line,
            format!(
                "Operands {} and {} for operator '{}' must be numbers.",
                l, r, operator.lexeme
            ),
        )),
    }
}

fn number_operand_error(operator: &Token, operand: &Value) -> JaqlError {
    JaqlError::runtime(
        operator.line,
        format!(
            "Operand {} for operator '{}' must be a number.",
            operand, operator.lexeme
        ),
    )
}

fn superclass_line(expr: &Expr, class_name: &Token) -> usize {
    match expr {
        Expr::Variable { name, .. } => name.line,
        _ => class_name.line,
    }
}
