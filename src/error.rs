//! Centralised error hierarchy for the **Jaql** interpreter.
//!
//! All subsystems (scanner, parser, resolver, runtime, CLI) convert their
//! internal failure modes into one of the variants defined here.  This enables
//! a uniform `Result<T>` alias throughout the crate while preserving rich
//! diagnostic detail.
//!
//! The module **does not** print diagnostics itself; accumulated errors are
//! owned by a [`Diagnostics`] sink that each pipeline stage reports into.

use std::io;
use thiserror::Error;

use log::info;

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JaqlError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error: {message}")]
    Parse { message: String, line: usize },

    /// Static‑analysis or resolution failure (e.g. early‑binding errors).
    #[error("[line {line}] Error: {message}")]
    Resolve { message: String, line: usize },

    /// Runtime evaluation error, attributed to the offending token's line.
    #[error("{message}\n[line {line}]")]
    Runtime { message: String, line: usize },

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// UTF‑8 decoding failure when ingesting external text.
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl JaqlError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        JaqlError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Parse error: line={}, msg={}", line, message);

        JaqlError::Parse { message, line }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Resolve error: line={}, msg={}", line, message);

        JaqlError::Resolve { message, line }
    }

    /// Helper constructor for the **interpreter**.
    pub fn runtime<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: line={}, msg={}", line, message);

        JaqlError::Runtime { message, line }
    }

    /// Is this a runtime (dynamic) error rather than a static one?
    pub fn is_runtime(&self) -> bool {
        matches!(self, JaqlError::Runtime { .. })
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, JaqlError>;

/// Accumulating error sink shared by every pipeline stage.
///
/// Stages report and keep going wherever the grammar allows recovery; the
/// driver checks [`had_error`](Diagnostics::had_error) /
/// [`had_runtime_error`](Diagnostics::had_runtime_error) at each stage
/// boundary and maps them to process exit codes 65 / 70.
#[derive(Debug, Default)]
pub struct Diagnostics {
    errors: Vec<JaqlError>,
    had_error: bool,
    had_runtime_error: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one error and raise the matching stage flag.
    pub fn report(&mut self, error: JaqlError) {
        info!("Diagnostics recorded: {}", error);

        if error.is_runtime() {
            self.had_runtime_error = true;
        } else {
            self.had_error = true;
        }

        self.errors.push(error);
    }

    /// True if any static (scan / parse / resolve) error was recorded.
    pub fn had_error(&self) -> bool {
        self.had_error
    }

    /// True if a runtime error was recorded.
    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// All recorded errors, in report order.
    pub fn errors(&self) -> &[JaqlError] {
        &self.errors
    }

    /// Clear flags and stored errors so a REPL can reuse one sink per line.
    pub fn reset(&mut self) {
        self.errors.clear();
        self.had_error = false;
        self.had_runtime_error = false;
    }
}
