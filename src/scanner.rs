//! Module `scanner` implements a one‑pass, streaming lexer for the Jaql
//! language.
//!
//! It transforms a byte slice (`&[u8]`) into a sequence of [`Token`]s,
//! skipping whitespace and `//` comments, and emitting exactly one `EOF`
//! token at the end.  Designed as a `FusedIterator`, it can be chained
//! safely with other iterator adapters.
//!
//! Each `.next()` yields `Result<Token, JaqlError>`: `Ok(token)` is a
//! scanned token, `Err` reports a lexing error with line information.
//! Errors do **not** stop the stream — iteration continues with the next
//! lexeme, so a driver can surface every independent error in one pass.
//!
//! Tokens own their lexemes, so they stay valid after the source buffer is
//! dropped (REPL lines are short‑lived).

use crate::error::{JaqlError, Result};
use crate::token::{Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile‑time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"    => TokenType::AND,
    b"class"  => TokenType::CLASS,
    b"else"   => TokenType::ELSE,
    b"false"  => TokenType::FALSE,
    b"fun"    => TokenType::FUN,
    b"for"    => TokenType::FOR,
    b"if"     => TokenType::IF,
    b"nil"    => TokenType::NIL,
    b"or"     => TokenType::OR,
    b"print"  => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"super"  => TokenType::SUPER,
    b"this"   => TokenType::THIS,
    b"true"   => TokenType::TRUE,
    b"var"    => TokenType::VAR,
    b"while"  => TokenType::WHILE,
};

/// A single‑pass **scanner / lexer** over raw source bytes.
///
/// `start` marks the first byte of the lexeme being scanned, `curr` sits one
/// past the last byte examined, and `line` counts `\n`s for diagnostics.
pub struct Scanner<'a> {
    src: &'a [u8],
    start: usize,
    curr: usize,
    line: usize,
    eof_emitted: bool,
}

impl<'a> Scanner<'a> {
    /// Create a new lexer over `src`.
    #[inline]
    pub fn new(src: &'a [u8]) -> Self {
        info!("Scanner created over {} bytes", src.len());

        Self {
            src,
            start: 0,
            curr: 0,
            line: 1,
            eof_emitted: false,
        }
    }

    // ───────────────────────────── byte primitives ──────────────────────────

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.src.len()
    }

    /// Consume and return the current byte.  Callers guard with
    /// [`is_at_end`](Self::is_at_end); indexing past the end would panic.
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.src[self.curr];
        self.curr += 1;
        b
    }

    /// Current byte without consuming it; `0` past the end so call sites
    /// need no extra branch.
    #[inline(always)]
    fn peek(&self) -> u8 {
        self.src.get(self.curr).copied().unwrap_or(0)
    }

    /// One byte of lookahead beyond [`peek`](Self::peek).  Safe at EOF.
    #[inline(always)]
    fn peek_next(&self) -> u8 {
        self.src.get(self.curr + 1).copied().unwrap_or(0)
    }

    /// Consume the current byte only if it equals `expected`.
    #[inline(always)]
    fn consume_if(&mut self, expected: u8) -> bool {
        if self.peek() == expected {
            self.curr += 1;
            true
        } else {
            false
        }
    }

    /// The current lexeme (`start..curr`), rendered as owned text.
    #[inline]
    fn lexeme(&self) -> String {
        String::from_utf8_lossy(&self.src[self.start..self.curr]).into_owned()
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan one lexeme starting at `self.start`.
    ///
    /// `Ok(Some(kind))` is a recognized token; `Ok(None)` means the lexeme
    /// was trivia (whitespace or a comment) and produced nothing.
    fn scan_token(&mut self) -> Result<Option<TokenType>> {
        let b = self.advance();

        let kind: TokenType = match b {
            // ── single‑character punctuators ──────────────────────────────
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b'-' => TokenType::MINUS,
            b'+' => TokenType::PLUS,
            b';' => TokenType::SEMICOLON,
            b'*' => TokenType::STAR,

            // ── one byte of lookahead picks the two‑character form ───────
            b'!' => {
                if self.consume_if(b'=') {
                    TokenType::BANG_EQUAL
                } else {
                    TokenType::BANG
                }
            }

            b'=' => {
                if self.consume_if(b'=') {
                    TokenType::EQUAL_EQUAL
                } else {
                    TokenType::EQUAL
                }
            }

            b'<' => {
                if self.consume_if(b'=') {
                    TokenType::LESS_EQUAL
                } else {
                    TokenType::LESS
                }
            }

            b'>' => {
                if self.consume_if(b'=') {
                    TokenType::GREATER_EQUAL
                } else {
                    TokenType::GREATER
                }
            }

            // ── `/` vs `//` line comment ─────────────────────────────────
            b'/' => {
                if !self.consume_if(b'/') {
                    TokenType::SLASH
                } else {
                    // Fast‑forward to the next newline (memchr); the `\n`
                    // itself is left for the trivia arm to count.
                    self.curr = match memchr(b'\n', &self.src[self.curr..]) {
                        Some(pos) => self.curr + pos,
                        None => self.src.len(),
                    };

                    return Ok(None);
                }
            }

            // ── trivia ───────────────────────────────────────────────────
            b' ' | b'\r' | b'\t' => return Ok(None),

            b'\n' => {
                self.line += 1;
                return Ok(None);
            }

            // ── literals and names ───────────────────────────────────────
            b'"' => self.string()?,
            b'0'..=b'9' => self.number(),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.identifier(),

            // ── anything else is an error; the byte is already consumed,
            //    so the stream resumes after it ─────────────────────────––
            _ => {
                return Err(JaqlError::lex(
                    self.line,
                    format!("Unexpected character: {}", b as char),
                ));
            }
        };

        Ok(Some(kind))
    }

    /// Rest of a double‑quoted string; the opening `"` is consumed.
    /// Embedded newlines are legal and counted.  Running out of input is an
    /// error, and no token is produced for the partial lexeme.
    fn string(&mut self) -> Result<TokenType> {
        while !self.is_at_end() && self.peek() != b'"' {
            if self.advance() == b'\n' {
                self.line += 1;
            }
        }

        if self.is_at_end() {
            return Err(JaqlError::lex(self.line, "Unterminated string."));
        }

        self.advance(); // closing quote

        // Payload excludes the surrounding quotes.
        let payload: &[u8] = &self.src[self.start + 1..self.curr - 1];

        Ok(TokenType::STRING(
            String::from_utf8_lossy(payload).into_owned(),
        ))
    }

    /// Rest of a numeric literal: digit run, optional `.` + digit run.
    /// Always materialized as `f64`, so `123` becomes `123.0`.
    fn number(&mut self) -> TokenType {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // A `.` only joins the literal when a digit follows; `4.` stays two
        // tokens so property access on call results keeps working.
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance();

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let n: f64 = self.lexeme().parse().unwrap_or(0.0); // digits only, cannot fail
        TokenType::NUMBER(n)
    }

    /// Rest of an identifier; reserved words come out of the `KEYWORDS`
    /// perfect‑hash map, case‑sensitively.
    fn identifier(&mut self) -> TokenType {
        while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
            self.advance();
        }

        KEYWORDS
            .get(&self.src[self.start..self.curr])
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>; // alias = Result<T, JaqlError>

    fn next(&mut self) -> Option<Self::Item> {
        while !self.is_at_end() {
            self.start = self.curr;

            match self.scan_token() {
                Err(e) => return Some(Err(e)),

                Ok(Some(kind)) => {
                    debug!("Scanned token ({:?}) on line {}", kind, self.line);

                    return Some(Ok(Token::new(kind, self.lexeme(), self.line)));
                }

                Ok(None) => continue, // whitespace / comment
            }
        }

        // Exactly one zero-length end marker, carrying the final line.
        if !self.eof_emitted {
            self.eof_emitted = true;
            return Some(Ok(Token::new(TokenType::EOF, "", self.line)));
        }

        None
    }
}

impl<'a> FusedIterator for Scanner<'a> {}
