//! Token and source-location types produced by the lexer

use std::fmt;
use std::sync::Arc;

/// A position in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    /// File the token came from
    pub file: Arc<str>,

    /// 1-based line number
    pub line: u32,

    /// 1-based column number
    pub column: u32,
}

impl Location {
    /// Create a location in `file` at `line`/`column`.
    pub fn new(file: impl Into<Arc<str>>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// A location for code that has no backing file (REPL input, host calls).
    pub fn internal() -> Self {
        Self::new("<internal>", 0, 0)
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::internal()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({},{})", self.file, self.line, self.column)
    }
}

/// Literal payload attached to literal tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Invalid,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    String(String),
}

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lexeme {
    // Punctuation
    LeftParen,
    RightParen,
    LeftSquare,
    RightSquare,
    LeftBrace,
    RightBrace,
    Dot,
    Comma,
    Colon,
    Semicolon,
    Newline,

    // Operators
    Caret,
    Minus,
    Plus,
    Star,
    Slash,
    Backslash,
    PlusPlus,
    MinusMinus,
    LeftShift,
    RightShift,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    BackslashEqual,
    LeftShiftEqual,
    RightShiftEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    LessGreater,

    // Literals
    Identifier,
    StringLiteral,
    IntegerLiteral,
    LongIntegerLiteral,
    FloatLiteral,
    DoubleLiteral,
    True,
    False,
    Invalid,

    // Word operators
    And,
    Or,
    Not,
    Mod,

    // Keywords
    If,
    Else,
    ElseIf,
    EndIf,
    For,
    ForEach,
    To,
    Step,
    Next,
    EndFor,
    While,
    EndWhile,
    ExitFor,
    ExitWhile,
    ContinueFor,
    ContinueWhile,
    Function,
    EndFunction,
    Sub,
    EndSub,
    Return,
    Print,
    Try,
    Catch,
    EndTry,
    Throw,
    End,
    Stop,

    // Preprocessor directives
    HashIf,
    HashElseIf,
    HashElse,
    HashEndIf,
    HashConst,
    HashError,

    /// A lexical error; the token text holds the offending source
    Error,

    Eof,
}

impl Lexeme {
    /// Tokens that terminate a statement.
    pub fn is_terminator(self) -> bool {
        matches!(self, Lexeme::Newline | Lexeme::Colon | Lexeme::Eof)
    }

    /// Compound assignment operators (`+=`, `<<=`, ...).
    pub fn is_compound_assign(self) -> bool {
        matches!(
            self,
            Lexeme::PlusEqual
                | Lexeme::MinusEqual
                | Lexeme::StarEqual
                | Lexeme::SlashEqual
                | Lexeme::BackslashEqual
                | Lexeme::LeftShiftEqual
                | Lexeme::RightShiftEqual
        )
    }

    pub fn is_directive(self) -> bool {
        matches!(
            self,
            Lexeme::HashIf
                | Lexeme::HashElseIf
                | Lexeme::HashElse
                | Lexeme::HashEndIf
                | Lexeme::HashConst
                | Lexeme::HashError
        )
    }
}

/// A single lexed token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: Lexeme,

    /// Source text exactly as written
    pub text: String,

    /// Parsed literal value for literal tokens
    pub literal: Option<Literal>,

    pub location: Location,
}

impl Token {
    pub fn new(kind: Lexeme, text: impl Into<String>, location: Location) -> Self {
        Self {
            kind,
            text: text.into(),
            literal: None,
            location,
        }
    }

    pub fn with_literal(mut self, literal: Literal) -> Self {
        self.literal = Some(literal);
        self
    }

    /// Whether this token is an identifier spelled `word` (case-insensitive).
    pub fn is_word(&self, word: &str) -> bool {
        self.kind == Lexeme::Identifier && self.text.eq_ignore_ascii_case(word)
    }
}
