//! Error types for lexing, parsing, evaluation and the host channel

use std::fmt;

use thiserror::Error;

use crate::eval::control::ControlFlow;
use crate::lexer::Location;

/// Catalogue of runtime and syntax error kinds with their numeric codes.
///
/// Codes are stable: scripts observe them through `catch e: e.number`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeErrorDetail {
    NextWithoutFor,
    BadSyntax,
    IndexOutOfBounds,
    DivideByZero,
    TypeMismatch,
    BadBitShift,
    InvalidFormatSpecifier,
    MalformedThrow,
    UserDefined,
    ContinueForWithoutFor,
    ContinueWhileWithoutWhile,
    FunctionNotFound,
    ExitForWithoutFor,
    DuplicateSub,
    ExitWhileWithoutWhile,
    UnterminatedString,
    UnterminatedBlock,
    EndOfFile,
    StackOverflow,
    NotAFunction,
    BadLHS,
    NonNumericArrayIndex,
    UninitializedVariable,
    DotOnNonObject,
    WrongNumberOfParams,
    InterfaceNotAMember,
    MemberFunctionNotFound,
    RoWrongNumberOfParams,
    ObjectClassNotFound,
    Stop,
    UndefinedOperator,
    Internal,
}

impl RuntimeErrorDetail {
    pub fn code(self) -> i32 {
        use RuntimeErrorDetail::*;
        match self {
            NextWithoutFor => 0,
            BadSyntax => 2,
            IndexOutOfBounds => 16,
            DivideByZero => 20,
            TypeMismatch => 24,
            BadBitShift => 30,
            InvalidFormatSpecifier => 36,
            MalformedThrow => 38,
            UserDefined => 40,
            ContinueForWithoutFor => 141,
            ContinueWhileWithoutWhile => 142,
            FunctionNotFound => 145,
            ExitForWithoutFor => 165,
            DuplicateSub => 173,
            ExitWhileWithoutWhile => 175,
            UnterminatedString => 179,
            UnterminatedBlock => 181,
            EndOfFile => 183,
            StackOverflow => 223,
            NotAFunction => 224,
            BadLHS => 228,
            NonNumericArrayIndex => 232,
            UninitializedVariable => 233,
            DotOnNonObject => 236,
            WrongNumberOfParams => 241,
            InterfaceNotAMember => 243,
            MemberFunctionNotFound => 244,
            RoWrongNumberOfParams => 245,
            ObjectClassNotFound => 246,
            Stop => 247,
            UndefinedOperator => 251,
            Internal => 254,
        }
    }

    pub fn message(self) -> &'static str {
        use RuntimeErrorDetail::*;
        match self {
            NextWithoutFor => "Next Without For.",
            BadSyntax => "Syntax Error.",
            IndexOutOfBounds => "Array subscript out of bounds.",
            DivideByZero => "Divide by Zero.",
            TypeMismatch => "Type Mismatch.",
            BadBitShift => "Invalid Bitwise Shift.",
            InvalidFormatSpecifier => "Invalid Format Specifier",
            MalformedThrow => "Invalid argument to Throw",
            UserDefined => "User-specified exception",
            ContinueForWithoutFor => "Continue For is not inside a For loop",
            ContinueWhileWithoutWhile => "Continue While is not inside a While",
            FunctionNotFound => "Function is not defined in component's namespace",
            ExitForWithoutFor => "Exit For is not inside a For loop.",
            DuplicateSub => "SUB or FUNCTION defined twice.",
            ExitWhileWithoutWhile => "Exit While is not inside a While.",
            UnterminatedString => "String missing ending quote.",
            UnterminatedBlock => "A block (such as FOR/NEXT or IF/ENDIF) was not terminated correctly.",
            EndOfFile => "Unexpected End-Of-File.",
            StackOverflow => "Stack overflow.",
            NotAFunction => "Function Call Operator ( ) attempted on non-function.",
            BadLHS => "Invalid value for left-side of expression.",
            NonNumericArrayIndex => "Attempt to use a non-numeric array index not allowed.",
            UninitializedVariable => "Use of uninitialized variable.",
            DotOnNonObject => "'Dot' Operator attempted with invalid BrightScript Component or interface reference.",
            WrongNumberOfParams => "Wrong number of function parameters.",
            InterfaceNotAMember => "Interface not a member of BrightScript Component",
            MemberFunctionNotFound => "Member function not found in BrightScript Component or interface.",
            RoWrongNumberOfParams => "BrightScript Component function call does not have the correct number of parameters.",
            ObjectClassNotFound => "BrightScript Component Class not Found.",
            Stop => "STOP",
            UndefinedOperator => "Unsupported expression operator.",
            Internal => "Internal error.",
        }
    }

    /// The catalogue entry with numeric code `code`, if any.
    pub fn from_code(code: i32) -> Option<Self> {
        use RuntimeErrorDetail::*;
        [
            NextWithoutFor, BadSyntax, IndexOutOfBounds, DivideByZero, TypeMismatch, BadBitShift,
            InvalidFormatSpecifier, MalformedThrow, UserDefined, ContinueForWithoutFor,
            ContinueWhileWithoutWhile, FunctionNotFound, ExitForWithoutFor, DuplicateSub,
            ExitWhileWithoutWhile, UnterminatedString, UnterminatedBlock, EndOfFile, StackOverflow,
            NotAFunction, BadLHS, NonNumericArrayIndex, UninitializedVariable, DotOnNonObject,
            WrongNumberOfParams, InterfaceNotAMember, MemberFunctionNotFound, RoWrongNumberOfParams,
            ObjectClassNotFound, Stop, UndefinedOperator, Internal,
        ]
        .into_iter()
        .find(|detail| detail.code() == code)
    }

    /// Whether this kind belongs to the type-error class: wrong value kind
    /// for an operator, bad container key, or a call signature mismatch.
    pub fn is_type_error(self) -> bool {
        matches!(
            self,
            RuntimeErrorDetail::TypeMismatch
                | RuntimeErrorDetail::WrongNumberOfParams
                | RuntimeErrorDetail::RoWrongNumberOfParams
                | RuntimeErrorDetail::NonNumericArrayIndex
        )
    }
}

impl fmt::Display for RuntimeErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Syntax Errors
// ═══════════════════════════════════════════════════════════════════════

/// A problem found while lexing, preprocessing or parsing.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{location}: {message}")]
pub struct SyntaxError {
    pub detail: RuntimeErrorDetail,
    pub message: String,
    pub location: Location,
}

impl SyntaxError {
    pub fn new(detail: RuntimeErrorDetail, message: impl Into<String>, location: Location) -> Self {
        Self {
            detail,
            message: message.into(),
            location,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Runtime Errors
// ═══════════════════════════════════════════════════════════════════════

/// An error raised while executing a program.
#[derive(Error, Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub detail: RuntimeErrorDetail,

    /// Numeric code seen by scripts; differs from `detail.code()` only for
    /// user throws that supply their own `number`
    pub code: i32,

    pub message: String,
    pub location: Option<Location>,
}

impl RuntimeError {
    pub fn new(detail: RuntimeErrorDetail, message: impl Into<String>) -> Self {
        Self {
            detail,
            code: detail.code(),
            message: message.into(),
            location: None,
        }
    }

    /// An error carrying the catalogue message for `detail`.
    pub fn from_detail(detail: RuntimeErrorDetail) -> Self {
        Self::new(detail, detail.message())
    }

    /// Attach a location unless one is already recorded.
    pub fn at(mut self, location: &Location) -> Self {
        if self.location.is_none() {
            self.location = Some(location.clone());
        }
        self
    }

    pub fn is_type_error(&self) -> bool {
        self.detail.is_type_error()
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (runtime error &h{:02x})", self.message, self.code)?;
        if let Some(location) = &self.location {
            write!(f, " in {location}")?;
        }
        Ok(())
    }
}

/// Errors that unwind evaluation.
///
/// Non-local exits (`return`, `exit for`, ...) travel as
/// [`EvalError::ControlFlow`] until the construct that owns them catches
/// them; reaching a function boundary with one still in flight is a bug in
/// the program and is reported as a runtime error there.
#[derive(Error, Debug, Clone)]
pub enum EvalError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("{0:?} outside of its enclosing construct")]
    ControlFlow(ControlFlow),

    #[error("execution interrupted")]
    Interrupted,

    /// The `end` statement: stop the program without an error
    #[error("program ended")]
    End,
}

impl EvalError {
    pub fn runtime(detail: RuntimeErrorDetail, message: impl Into<String>) -> Self {
        EvalError::Runtime(RuntimeError::new(detail, message))
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        Self::runtime(RuntimeErrorDetail::TypeMismatch, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::runtime(RuntimeErrorDetail::Internal, message)
    }

    /// The catalogue entry for runtime errors, `None` for control flow.
    pub fn detail(&self) -> Option<RuntimeErrorDetail> {
        match self {
            EvalError::Runtime(err) => Some(err.detail),
            _ => None,
        }
    }

    pub fn is_type_error(&self) -> bool {
        matches!(self, EvalError::Runtime(err) if err.is_type_error())
    }

    /// Attach a location to a runtime error that has none yet.
    pub fn at(self, location: &Location) -> Self {
        match self {
            EvalError::Runtime(err) => EvalError::Runtime(err.at(location)),
            other => other,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Shared Channel Errors
// ═══════════════════════════════════════════════════════════════════════

/// Failures of the shared-memory channel between host and interpreter.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("payload of {required} bytes exceeds the channel maximum of {max} bytes")]
    Capacity { required: usize, max: usize },

    #[error("failed to encode channel payload: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode channel payload: {0}")]
    Decode(#[source] serde_json::Error),
}

// ═══════════════════════════════════════════════════════════════════════
// Configuration and Host Errors
// ═══════════════════════════════════════════════════════════════════════

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Top-level error returned across the host boundary.
#[derive(Error, Debug)]
pub enum BriskError {
    #[error("{} syntax error(s), first at {}", .0.len(), first_location(.0))]
    Syntax(Vec<SyntaxError>),

    #[error(transparent)]
    Runtime(RuntimeError),

    #[error("execution interrupted")]
    Interrupted,

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("engine error: {0}")]
    Engine(String),
}

fn first_location(errors: &[SyntaxError]) -> String {
    errors
        .first()
        .map(|e| format!("{}: {}", e.location, e.message))
        .unwrap_or_default()
}

impl From<EvalError> for BriskError {
    fn from(err: EvalError) -> Self {
        match err {
            EvalError::Runtime(err) => BriskError::Runtime(err),
            EvalError::Interrupted => BriskError::Interrupted,
            EvalError::End => BriskError::Engine("program ended".to_string()),
            EvalError::ControlFlow(flow) => BriskError::Runtime(flow.into_error()),
        }
    }
}

/// Result alias for evaluation.
pub type Result<T, E = EvalError> = std::result::Result<T, E>;
