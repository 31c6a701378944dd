//! Recursive-descent parser
//!
//! Consumes the lexer's token stream and builds a [`Program`]. Errors are
//! collected rather than fatal: after a bad statement the parser skips to
//! the next line and keeps going, so a single run reports every problem in
//! a file.

mod expr;
pub mod preprocessor;
mod stmt;

use std::collections::HashMap;

use crate::ast::Program;
use crate::error::{RuntimeErrorDetail, SyntaxError};
use crate::lexer::{self, Lexeme, Location, Token};

pub use preprocessor::preprocess;

type PResult<T> = Result<T, SyntaxError>;

/// Output of [`parse`] and [`parse_source`].
#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    pub program: Program,
    pub errors: Vec<SyntaxError>,
}

impl ParseResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parse an already lexed and preprocessed token stream.
pub fn parse(tokens: Vec<Token>) -> ParseResult {
    Parser::new(tokens).parse_program()
}

/// Lex, preprocess and parse `source` in one step. Errors from every stage
/// are returned together, in source order per stage.
pub fn parse_source(file: &str, source: &str, defines: &HashMap<String, bool>) -> ParseResult {
    let lexed = lexer::scan(file, source);
    let (tokens, preprocess_errors) = preprocess(lexed.tokens, defines);
    let mut result = parse(tokens);

    // The lexer already reported its own error tokens; drop parser noise
    // that merely points at the same spot.
    let lexed_at: Vec<Location> = lexed.errors.iter().map(|e| e.location.clone()).collect();
    result.errors.retain(|e| !lexed_at.contains(&e.location));

    let mut errors = lexed.errors;
    errors.extend(preprocess_errors);
    errors.append(&mut result.errors);
    result.errors = errors;

    if !result.errors.is_empty() {
        tracing::debug!(file, count = result.errors.len(), "syntax errors");
    }
    result
}

/// Parser state over a token vector.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    errors: Vec<SyntaxError>,
    function_depth: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last(), Some(t) if t.kind == Lexeme::Eof) {
            let location = tokens.last().map(|t| t.location.clone()).unwrap_or_default();
            tokens.push(Token::new(Lexeme::Eof, "", location));
        }
        Self {
            tokens,
            current: 0,
            errors: Vec::new(),
            function_depth: 0,
        }
    }

    pub fn parse_program(mut self) -> ParseResult {
        let mut program = Program::default();
        loop {
            self.skip_separators();
            if self.at_end() {
                break;
            }
            match self.statement().and_then(|stmt| {
                self.expect_statement_end()?;
                Ok(stmt)
            }) {
                Ok(stmt) => program.statements.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }
        ParseResult {
            program,
            errors: self.errors,
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Token Cursor
    // ═══════════════════════════════════════════════════════════════════

    fn peek(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.current.min(last)]
    }

    fn peek_next(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.current + 1).min(last)]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn at_end(&self) -> bool {
        self.peek().kind == Lexeme::Eof
    }

    fn check(&self, kind: Lexeme) -> bool {
        self.peek().kind == kind
    }

    fn check_any(&self, kinds: &[Lexeme]) -> bool {
        kinds.contains(&self.peek().kind)
    }

    fn check_word(&self, word: &str) -> bool {
        self.peek().is_word(word)
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if !self.at_end() {
            self.current += 1;
        }
        token
    }

    fn matches(&mut self, kind: Lexeme) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, kind: Lexeme, message: &str) -> PResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(message))
        }
    }

    fn location(&self) -> Location {
        self.peek().location.clone()
    }

    fn error_here(&self, message: &str) -> SyntaxError {
        let token = self.peek();
        let detail = if token.kind == Lexeme::Eof {
            RuntimeErrorDetail::EndOfFile
        } else {
            RuntimeErrorDetail::BadSyntax
        };
        let found = if token.kind == Lexeme::Newline {
            "end of line".to_string()
        } else {
            format!("'{}'", token.text)
        };
        SyntaxError::new(detail, format!("{message}, found {found}"), token.location.clone())
    }

    fn skip_separators(&mut self) {
        while self.check_any(&[Lexeme::Newline, Lexeme::Colon]) {
            self.advance();
        }
    }

    fn skip_newlines(&mut self) {
        while self.check(Lexeme::Newline) {
            self.advance();
        }
    }

    fn expect_statement_end(&mut self) -> PResult<()> {
        if self.peek().kind.is_terminator() {
            Ok(())
        } else {
            Err(self.error_here("Expected end of statement"))
        }
    }

    /// Skip past the rest of the current line.
    fn synchronize(&mut self) {
        while !self.at_end() {
            if self.advance().kind == Lexeme::Newline {
                return;
            }
        }
    }

    /// An identifier, or any keyword used where a plain name is expected
    /// (member names after `.`, associative array keys).
    fn name_like(&mut self, message: &str) -> PResult<String> {
        let token = self.peek();
        let is_word = token
            .text
            .chars()
            .next()
            .map_or(false, |c| c.is_alphabetic() || c == '_');
        if matches!(token.kind, Lexeme::Identifier) || (is_word && token.kind != Lexeme::Newline) {
            Ok(self.advance().text)
        } else {
            Err(self.error_here(message))
        }
    }
}
