//! Lexical analysis
//!
//! Turns source text into a flat token stream. Keywords are matched
//! case-insensitively while identifiers keep the spelling they were written
//! with. Lexing never stops at the first problem: bad input becomes an
//! [`Lexeme::Error`] token plus a [`SyntaxError`], and scanning carries on.

mod keywords;
mod token;

pub use token::{Lexeme, Literal, Location, Token};

use std::sync::Arc;

use crate::error::{RuntimeErrorDetail, SyntaxError};

/// Output of [`scan`].
#[derive(Debug, Clone, Default)]
pub struct LexResult {
    pub tokens: Vec<Token>,
    pub errors: Vec<SyntaxError>,
}

/// Tokenize `source`, attributing locations to `file`.
pub fn scan(file: &str, source: &str) -> LexResult {
    Lexer::new(file, source).tokenize()
}

/// Streaming scanner over a source file.
pub struct Lexer {
    file: Arc<str>,
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    tokens: Vec<Token>,
    errors: Vec<SyntaxError>,
}

impl Lexer {
    pub fn new(file: &str, source: &str) -> Self {
        Self {
            file: Arc::from(file),
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Scan the whole input. The stream always ends with a newline and
    /// an [`Lexeme::Eof`] token.
    pub fn tokenize(mut self) -> LexResult {
        while !self.at_end() {
            self.scan_token();
        }
        let location = self.location();
        if !matches!(self.tokens.last(), Some(t) if t.kind == Lexeme::Newline) {
            self.tokens.push(Token::new(Lexeme::Newline, "\n", location.clone()));
        }
        self.tokens.push(Token::new(Lexeme::Eof, "", location));
        tracing::trace!(file = %self.file, tokens = self.tokens.len(), "lexed source");
        LexResult {
            tokens: self.tokens,
            errors: self.errors,
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Cursor
    // ═══════════════════════════════════════════════════════════════════

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> char {
        self.peek_at(0)
    }

    fn peek_at(&self, offset: usize) -> char {
        self.chars.get(self.pos + offset).copied().unwrap_or('\0')
    }

    fn advance(&mut self) -> char {
        let c = self.peek();
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn location(&self) -> Location {
        Location {
            file: self.file.clone(),
            line: self.line,
            column: self.column,
        }
    }

    fn push(&mut self, kind: Lexeme, start: usize, location: Location) {
        let text: String = self.chars[start..self.pos].iter().collect();
        self.tokens.push(Token::new(kind, text, location));
    }

    fn error(&mut self, detail: RuntimeErrorDetail, message: String, start: usize, location: Location) {
        self.errors.push(SyntaxError::new(detail, message, location.clone()));
        self.push(Lexeme::Error, start, location);
    }

    // ═══════════════════════════════════════════════════════════════════
    // Token Scanning
    // ═══════════════════════════════════════════════════════════════════

    fn scan_token(&mut self) {
        let start = self.pos;
        let location = self.location();
        let c = self.advance();

        let kind = match c {
            ' ' | '\t' | '\r' => return,
            '\n' => Lexeme::Newline,
            '\'' => {
                self.skip_comment();
                return;
            }
            '(' => Lexeme::LeftParen,
            ')' => Lexeme::RightParen,
            '[' => Lexeme::LeftSquare,
            ']' => Lexeme::RightSquare,
            '{' => Lexeme::LeftBrace,
            '}' => Lexeme::RightBrace,
            ',' => Lexeme::Comma,
            ':' => Lexeme::Colon,
            ';' => Lexeme::Semicolon,
            '^' => Lexeme::Caret,
            '=' => Lexeme::Equal,
            '?' => Lexeme::Print,
            '+' => {
                if self.matches('=') {
                    Lexeme::PlusEqual
                } else if self.matches('+') {
                    Lexeme::PlusPlus
                } else {
                    Lexeme::Plus
                }
            }
            '-' => {
                if self.matches('=') {
                    Lexeme::MinusEqual
                } else if self.matches('-') {
                    Lexeme::MinusMinus
                } else {
                    Lexeme::Minus
                }
            }
            '*' => {
                if self.matches('=') {
                    Lexeme::StarEqual
                } else {
                    Lexeme::Star
                }
            }
            '/' => {
                if self.matches('=') {
                    Lexeme::SlashEqual
                } else {
                    Lexeme::Slash
                }
            }
            '\\' => {
                if self.matches('=') {
                    Lexeme::BackslashEqual
                } else {
                    Lexeme::Backslash
                }
            }
            '<' => {
                if self.matches('=') {
                    Lexeme::LessEqual
                } else if self.matches('>') {
                    Lexeme::LessGreater
                } else if self.matches('<') {
                    if self.matches('=') {
                        Lexeme::LeftShiftEqual
                    } else {
                        Lexeme::LeftShift
                    }
                } else {
                    Lexeme::Less
                }
            }
            '>' => {
                if self.matches('=') {
                    Lexeme::GreaterEqual
                } else if self.matches('>') {
                    if self.matches('=') {
                        Lexeme::RightShiftEqual
                    } else {
                        Lexeme::RightShift
                    }
                } else {
                    Lexeme::Greater
                }
            }
            '.' if self.peek().is_ascii_digit() => {
                self.number(start, location);
                return;
            }
            '.' => Lexeme::Dot,
            '"' => {
                self.string(start, location);
                return;
            }
            '&' if matches!(self.peek(), 'h' | 'H') => {
                self.hex_number(start, location);
                return;
            }
            '#' if self.peek().is_ascii_alphabetic() => {
                self.directive(start, location);
                return;
            }
            c if c.is_ascii_digit() => {
                self.number(start, location);
                return;
            }
            c if c.is_alphabetic() || c == '_' => {
                self.word(start, location);
                return;
            }
            other => {
                self.error(
                    RuntimeErrorDetail::BadSyntax,
                    format!("Unexpected character '{other}'"),
                    start,
                    location,
                );
                return;
            }
        };

        self.push(kind, start, location);
    }

    fn skip_comment(&mut self) {
        while !self.at_end() && self.peek() != '\n' {
            self.advance();
        }
    }

    fn string(&mut self, start: usize, location: Location) {
        let mut value = String::new();
        loop {
            if self.at_end() || self.peek() == '\n' {
                self.error(
                    RuntimeErrorDetail::UnterminatedString,
                    "Unterminated string at end of line".to_string(),
                    start,
                    location,
                );
                return;
            }
            let c = self.advance();
            if c == '"' {
                // `""` inside a string is an escaped quote
                if self.peek() == '"' {
                    self.advance();
                    value.push('"');
                    continue;
                }
                break;
            }
            value.push(c);
        }
        self.push(Lexeme::StringLiteral, start, location);
        if let Some(token) = self.tokens.last_mut() {
            token.literal = Some(Literal::String(value));
        }
    }

    fn hex_number(&mut self, start: usize, location: Location) {
        self.advance(); // the `h`
        let digits_start = self.pos;
        while self.peek().is_ascii_hexdigit() {
            self.advance();
        }
        let digits: String = self.chars[digits_start..self.pos].iter().collect();
        let long = self.matches('&');

        let parsed = u64::from_str_radix(&digits, 16);
        let token = match parsed {
            Ok(n) if long => (Lexeme::LongIntegerLiteral, Literal::Int64(n as i64)),
            // Hex literals wrap into the 32-bit range, so &hFFFFFFFF is -1
            Ok(n) if n <= u32::MAX as u64 => (Lexeme::IntegerLiteral, Literal::Int32(n as u32 as i32)),
            _ => {
                self.error(
                    RuntimeErrorDetail::BadSyntax,
                    format!("Invalid hexadecimal literal '&h{digits}'"),
                    start,
                    location,
                );
                return;
            }
        };
        self.push(token.0, start, location);
        if let Some(last) = self.tokens.last_mut() {
            last.literal = Some(token.1);
        }
    }

    fn number(&mut self, start: usize, location: Location) {
        let mut is_decimal = self.chars[start] == '.';
        let mut double_exponent = false;

        while self.peek().is_ascii_digit() {
            self.advance();
        }
        if self.peek() == '.' && self.peek_at(1).is_ascii_digit() {
            is_decimal = true;
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        } else if self.peek() == '.' && !is_decimal {
            // `1.` is still a float literal
            is_decimal = true;
            self.advance();
        }
        if matches!(self.peek(), 'e' | 'E' | 'd' | 'D')
            && (self.peek_at(1).is_ascii_digit()
                || (matches!(self.peek_at(1), '+' | '-') && self.peek_at(2).is_ascii_digit()))
        {
            double_exponent = matches!(self.peek(), 'd' | 'D');
            is_decimal = true;
            self.advance();
            if matches!(self.peek(), '+' | '-') {
                self.advance();
            }
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let body: String = self.chars[start..self.pos]
            .iter()
            .map(|c| if matches!(c, 'd' | 'D') { 'e' } else { *c })
            .collect();
        let suffix = match self.peek() {
            '%' | '!' | '#' | '&' => Some(self.advance()),
            _ => None,
        };

        let significant = body
            .chars()
            .take_while(|c| !matches!(c, 'e' | 'E'))
            .filter(|c| c.is_ascii_digit())
            .count();

        let result = match suffix {
            Some('%') => body.parse::<f64>().ok().map(|n| (Lexeme::IntegerLiteral, Literal::Int32(n as i32))),
            Some('&') => body.parse::<f64>().ok().map(|n| (Lexeme::LongIntegerLiteral, Literal::Int64(n as i64))),
            Some('!') => body.parse::<f32>().ok().map(|n| (Lexeme::FloatLiteral, Literal::Float(n))),
            Some('#') => body.parse::<f64>().ok().map(|n| (Lexeme::DoubleLiteral, Literal::Double(n))),
            _ if double_exponent || (is_decimal && significant > 7) => {
                body.parse::<f64>().ok().map(|n| (Lexeme::DoubleLiteral, Literal::Double(n)))
            }
            _ if is_decimal => body.parse::<f32>().ok().map(|n| (Lexeme::FloatLiteral, Literal::Float(n))),
            _ => match body.parse::<i64>() {
                Ok(n) if i32::try_from(n).is_ok() => Some((Lexeme::IntegerLiteral, Literal::Int32(n as i32))),
                Ok(n) => Some((Lexeme::LongIntegerLiteral, Literal::Int64(n))),
                Err(_) => body.parse::<f64>().ok().map(|n| (Lexeme::DoubleLiteral, Literal::Double(n))),
            },
        };

        match result {
            Some((kind, literal)) => {
                self.push(kind, start, location);
                if let Some(last) = self.tokens.last_mut() {
                    last.literal = Some(literal);
                }
            }
            None => self.error(
                RuntimeErrorDetail::BadSyntax,
                format!("Invalid numeric literal '{body}'"),
                start,
                location,
            ),
        }
    }

    fn read_word(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_alphanumeric() || self.peek() == '_' {
            self.advance();
        }
        self.chars[start..self.pos].iter().collect()
    }

    /// Peek the next word on the same line without consuming it. Returns
    /// the lowercase word and the offset just past it.
    fn lookahead_word(&self) -> Option<(String, usize)> {
        let mut offset = 0;
        while matches!(self.peek_at(offset), ' ' | '\t') {
            offset += 1;
        }
        let begin = offset;
        while self.peek_at(offset).is_alphanumeric() || self.peek_at(offset) == '_' {
            offset += 1;
        }
        if offset == begin {
            return None;
        }
        let word: String = self.chars[self.pos + begin..self.pos + offset].iter().collect();
        Some((word.to_lowercase(), offset))
    }

    fn skip(&mut self, count: usize) {
        for _ in 0..count {
            self.advance();
        }
    }

    fn word(&mut self, start: usize, location: Location) {
        self.pos = start;
        self.column = location.column;
        let text = self.read_word();
        let lower = text.to_lowercase();

        if lower == "rem" {
            self.skip_comment();
            return;
        }

        if matches!(lower.as_str(), "end" | "else" | "exit" | "continue" | "for") {
            if let Some((next, offset)) = self.lookahead_word() {
                if let Some(kind) = keywords::compound_keyword(&lower, &next) {
                    self.skip(offset);
                    self.push(kind, start, location);
                    return;
                }
            }
        }

        if let Some(kind) = keywords::keyword(&lower) {
            self.push(kind, start, location);
            return;
        }

        // Type designator suffix: name$, count%, ratio!, total#, big&
        if matches!(self.peek(), '$' | '%' | '!' | '#' | '&') && self.peek_at(1) != 'h' {
            self.advance();
        }
        self.push(Lexeme::Identifier, start, location);
    }

    fn directive(&mut self, start: usize, location: Location) {
        let first = self.read_word().to_lowercase();
        let second = self.lookahead_word();
        let found = keywords::directive(&first, second.as_ref().map(|(w, _)| w.as_str()));

        match found {
            Some((kind, consumed_second)) => {
                if consumed_second {
                    if let Some((_, offset)) = second {
                        self.skip(offset);
                    }
                }
                if kind == Lexeme::HashError {
                    let message_start = self.pos;
                    self.skip_comment();
                    let message: String = self.chars[message_start..self.pos].iter().collect();
                    self.push(kind, start, location);
                    if let Some(last) = self.tokens.last_mut() {
                        last.literal = Some(Literal::String(message.trim().to_string()));
                    }
                } else {
                    self.push(kind, start, location);
                }
            }
            None => self.error(
                RuntimeErrorDetail::BadSyntax,
                format!("Unknown preprocessor directive '#{first}'"),
                start,
                location,
            ),
        }
    }
}
