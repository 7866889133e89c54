//! The front-to-back pipeline: scan → parse → resolve → interpret.
//!
//! A [`Session`] owns the interpreter (and with it the process-lifetime
//! global environment) plus the node-id allocator, so it can run many
//! programs in sequence — a REPL feeds it one line at a time and top-level
//! definitions persist between lines.
//!
//! Each stage reports into the caller's [`Diagnostics`] sink; the pipeline
//! stops at the first stage boundary with accumulated static errors and
//! never reaches the interpreter with a broken tree.  The caller maps the
//! sink's flags to exit codes (65 static, 70 runtime).

use std::io::Write;

use log::{debug, info};

use crate::ast::{NodeIds, Stmt};
use crate::error::Diagnostics;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::{Resolutions, Resolver};
use crate::scanner::Scanner;
use crate::token::Token;

#[derive(Default)]
pub struct Session {
    interpreter: Interpreter,
    ids: NodeIds,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one program through the full pipeline.
    ///
    /// `print` output goes to `out`; every error goes to `diag`.  Returns
    /// the parsed statements when the static stages succeeded (whether or
    /// not interpretation then hit a runtime error), `None` otherwise.
    pub fn run(
        &mut self,
        source: &[u8],
        diag: &mut Diagnostics,
        out: &mut dyn Write,
    ) -> Option<Vec<Stmt>> {
        info!("Pipeline run over {} bytes", source.len());

        // ── scan ────────────────────────────────────────────────────────
        let mut tokens: Vec<Token> = Vec::new();

        for item in Scanner::new(source) {
            match item {
                Ok(token) => tokens.push(token),
                Err(e) => diag.report(e),
            }
        }

        if diag.had_error() {
            debug!("Stopping after scan: {} error(s)", diag.errors().len());
            return None;
        }

        // ── parse ───────────────────────────────────────────────────────
        let statements: Vec<Stmt> = Parser::new(&tokens, &mut self.ids, diag).parse();

        if diag.had_error() {
            debug!("Stopping after parse: {} error(s)", diag.errors().len());
            return None;
        }

        // ── resolve ─────────────────────────────────────────────────────
        let known_globals: Vec<String> = self.interpreter.global_names();
        let resolutions: Resolutions = Resolver::new(diag)
            .with_known_globals(known_globals)
            .resolve(&statements);

        if diag.had_error() {
            debug!("Stopping after resolve: {} error(s)", diag.errors().len());
            return None;
        }

        self.interpreter.absorb(resolutions);

        // ── interpret ───────────────────────────────────────────────────
        if let Err(e) = self.interpreter.interpret(&statements, out) {
            diag.report(e);
        }

        Some(statements)
    }
}
