//! Static resolver pass for the **Jaql** interpreter.
//!
//! This resolver does three things in one AST walk:
//! 1. Build lexical scopes (stack of `HashMap<String, bool>` tracking
//!    declared/defined).
//! 2. Report static errors (redeclaration, forward‑read in initializer,
//!    invalid `return`/`this`/`super` placement, self‑inheritance).
//! 3. Record, for *each* resolving expression node, how many scopes up its
//!    binding lives — so the interpreter walks exactly that many frames and
//!    never falls back to a dynamic lookup that would see a later shadowing
//!    local.  Nodes with no recorded depth are globals.
//!
//! All errors go to the [`Diagnostics`] sink and resolution keeps walking
//! the rest of the tree: one bad scope must not hide the next error.

use crate::ast::{Expr, FunctionDecl, Stmt};
use crate::callable::INITIALIZER_NAME;
use crate::error::{Diagnostics, JaqlError};
use crate::token::Token;
use log::{debug, info};
use std::collections::HashMap;

/// What kind of function body are we inside?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionKind {
    None,
    Function,
    Initializer,
    Method,
}

/// What kind of class body are we inside?  Used to validate `this`/`super`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ClassKind {
    None,
    Class,
    Subclass,
}

/// Depth table produced by the resolver: node id → scope distance.
///
/// Read-only during interpretation.  An absent entry means the name
/// resolves dynamically in the global environment.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Resolutions {
    depths: HashMap<usize, usize>,
}

impl Resolutions {
    fn insert(&mut self, id: usize, depth: usize) {
        self.depths.insert(id, depth);
    }

    pub fn get(&self, id: usize) -> Option<usize> {
        self.depths.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.depths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.depths.is_empty()
    }
}

impl IntoIterator for Resolutions {
    type Item = (usize, usize);
    type IntoIter = std::collections::hash_map::IntoIter<usize, usize>;

    fn into_iter(self) -> Self::IntoIter {
        self.depths.into_iter()
    }
}

/// Resolver: tracks scopes, enforces static rules, and records binding
/// distances for the interpreter.
pub struct Resolver<'d> {
    scopes: Vec<HashMap<String, bool>>, // false=declared, true=defined
    current_function: FunctionKind,
    current_class: ClassKind,
    /// Top-level names defined so far (natives included).  Lets the
    /// initializer-read check tell "shadows an existing global" apart from
    /// "reads itself".
    known_globals: std::collections::HashSet<String>,
    /// Name of the global `var` whose initializer is being resolved, if any.
    global_initializing: Option<String>,
    resolutions: Resolutions,
    diag: &'d mut Diagnostics,
}

impl<'d> Resolver<'d> {
    /// Create a new resolver reporting into `diag`.
    pub fn new(diag: &'d mut Diagnostics) -> Self {
        info!("Resolver instantiated");

        let mut known_globals: std::collections::HashSet<String> =
            std::collections::HashSet::new();
        known_globals.insert("clock".to_string());

        Resolver {
            scopes: Vec::new(),
            current_function: FunctionKind::None,
            current_class: ClassKind::None,
            known_globals,
            global_initializing: None,
            resolutions: Resolutions::default(),
            diag,
        }
    }

    /// Pre-seed the set of known top-level names (a REPL's interpreter
    /// already holds definitions from earlier lines).
    pub fn with_known_globals<I>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        self.known_globals.extend(names);
        self
    }

    /// Walk all top‑level statements and hand back the depth table.
    pub fn resolve(mut self, statements: &[Stmt]) -> Resolutions {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        self.resolve_stmts(statements);

        self.resolutions
    }

    fn resolve_stmts(&mut self, statements: &[Stmt]) {
        for stmt in statements {
            self.resolve_stmt(stmt);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        debug!("Resolving stmt: {:?}", stmt);

        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();
                self.resolve_stmts(statements);
                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // declare → resolve initializer → define, so the initializer
                // cannot read the name it is declaring
                self.declare(name);

                if let Some(expr) = initializer {
                    let at_top_level: bool = self.scopes.is_empty();
                    if at_top_level {
                        self.global_initializing = Some(name.lexeme.clone());
                    }

                    self.resolve_expr(expr);

                    if at_top_level {
                        self.global_initializing = None;
                    }
                }

                self.define(name);

                if self.scopes.is_empty() {
                    self.known_globals.insert(name.lexeme.clone());
                }
            }

            Stmt::Function(declaration) => {
                // the name is visible *inside* its own body (recursion)
                self.declare(&declaration.name);
                self.define(&declaration.name);

                if self.scopes.is_empty() {
                    self.known_globals.insert(declaration.name.lexeme.clone());
                }

                self.resolve_function(declaration, FunctionKind::Function);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionKind::None {
                    self.diag.report(JaqlError::resolve(
                        keyword.line,
                        "Can't return from top-level code.",
                    ));
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionKind::Initializer {
                        self.diag.report(JaqlError::resolve(
                            keyword.line,
                            "Can't return a value from an initializer.",
                        ));
                    }

                    self.resolve_expr(expr);
                }
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let enclosing_class: ClassKind = self.current_class;
                self.current_class = ClassKind::Class;

                self.declare(name);
                self.define(name);

                if self.scopes.is_empty() {
                    self.known_globals.insert(name.lexeme.clone());
                }

                if let Some(superclass) = superclass {
                    if let Expr::Variable {
                        name: super_name, ..
                    } = superclass
                    {
                        if super_name.lexeme == name.lexeme {
                            self.diag.report(JaqlError::resolve(
                                super_name.line,
                                "A class can't inherit from itself.",
                            ));
                        }
                    }

                    self.current_class = ClassKind::Subclass;
                    self.resolve_expr(superclass);

                    // the methods' scope chain sees `super` above `this`
                    self.begin_scope();
                    self.scope_define("super");
                }

                self.begin_scope();
                self.scope_define("this");

                for method in methods {
                    let kind: FunctionKind = if method.name.lexeme == INITIALIZER_NAME {
                        FunctionKind::Initializer
                    } else {
                        FunctionKind::Method
                    };

                    self.resolve_function(method, kind);
                }

                self.end_scope();

                if superclass.is_some() {
                    self.end_scope();
                }

                self.current_class = enclosing_class;
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        debug!("Resolving expr: {:?}", expr);

        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner);
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right);
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Variable { id, name } => {
                self.resolve_variable_read(*id, name);
            }

            Expr::Assign { id, name, value } => {
                // first resolve RHS, then bind LHS
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }

            Expr::Get { object, .. } => self.resolve_expr(object),

            Expr::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }

            Expr::This { id, keyword } => {
                if self.current_class == ClassKind::None {
                    self.diag.report(JaqlError::resolve(
                        keyword.line,
                        "Can't use 'this' outside of a class.",
                    ));
                    return;
                }

                self.resolve_local(*id, keyword);
            }

            Expr::Super { id, keyword, .. } => {
                match self.current_class {
                    ClassKind::None => {
                        self.diag.report(JaqlError::resolve(
                            keyword.line,
                            "Can't use 'super' outside of a class.",
                        ));
                    }

                    ClassKind::Class => {
                        self.diag.report(JaqlError::resolve(
                            keyword.line,
                            "Can't use 'super' in a class with no superclass.",
                        ));
                    }

                    ClassKind::Subclass => {}
                }

                self.resolve_local(*id, keyword);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body, restoring the
    /// enclosing function kind afterwards (nested functions resolve right).
    fn resolve_function(&mut self, declaration: &FunctionDecl, kind: FunctionKind) {
        let enclosing: FunctionKind = self.current_function;
        self.current_function = kind;

        self.begin_scope();
        for param in &declaration.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_stmts(&declaration.body);
        self.end_scope();

        self.current_function = enclosing;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    #[inline]
    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    /// Mark `name` visible-but-uninitialized in the current scope.
    fn declare(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(&name.lexeme) {
                self.diag.report(JaqlError::resolve(
                    name.line,
                    "Already a variable with this name in this scope.",
                ));
                return;
            }

            scope.insert(name.lexeme.clone(), false);
        }
    }

    /// Flip `name` to fully initialized.
    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    /// Define an implicit binding (`this` / `super`) in the current scope.
    fn scope_define(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding‑distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this occurrence as a local at depth `d`, or leave it for the
    /// global environment if no enclosing scope declares the name.
    fn resolve_local(&mut self, id: usize, name: &Token) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains_key(&name.lexeme) {
                debug!("Resolved '{}' at depth {}", name.lexeme, depth);
                self.resolutions.insert(id, depth);
                return;
            }
        }

        debug!("Resolved '{}' as global", name.lexeme);
    }

    /// Resolve a variable *read*, with the own-initializer rule.
    ///
    /// A declaration is invisible to its own initializer: while the
    /// nearest-scope entry is still `false`, the read binds to whatever the
    /// name meant *outside* the declaration — an enclosing scope or an
    /// already-known global (`var a = 1; { var a = a + 1; }` reads the outer
    /// `a`).  Only when no such binding exists does the read necessarily
    /// refer to the variable being declared, which is the reported error.
    fn resolve_variable_read(&mut self, id: usize, name: &Token) {
        let shadows_own_declaration: bool = self
            .scopes
            .last()
            .is_some_and(|scope| scope.get(&name.lexeme) == Some(&false));

        if shadows_own_declaration {
            // skip the half-declared entry, search outward
            for (depth, scope) in self.scopes.iter().rev().enumerate().skip(1) {
                if scope.contains_key(&name.lexeme) {
                    debug!(
                        "Initializer read of '{}' bound outward at depth {}",
                        name.lexeme, depth
                    );
                    self.resolutions.insert(id, depth);
                    return;
                }
            }

            if self.known_globals.contains(&name.lexeme) {
                debug!("Initializer read of '{}' bound to global", name.lexeme);
                return;
            }

            self.diag.report(JaqlError::resolve(
                name.line,
                "Can't read local variable in its own initializer.",
            ));
            return;
        }

        // top-level `var a = a;` with no prior `a`
        if self.scopes.is_empty()
            && self.global_initializing.as_deref() == Some(name.lexeme.as_str())
            && !self.known_globals.contains(&name.lexeme)
        {
            self.diag.report(JaqlError::resolve(
                name.line,
                "Can't read local variable in its own initializer.",
            ));
            return;
        }

        self.resolve_local(id, name);
    }
}
