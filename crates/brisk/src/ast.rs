//! Syntax tree produced by the parser
//!
//! The tree is plain owned data with no shared pointers, so a parsed
//! program can be handed to another thread before it runs.

use crate::lexer::{Literal, Location};
use crate::value::ValueKind;

/// Binary operators, including the short-circuiting `and`/`or`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    IntegerDivide,
    Modulo,
    Power,
    LeftShift,
    RightShift,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::IntegerDivide => "\\",
            BinaryOp::Modulo => "mod",
            BinaryOp::Power => "^",
            BinaryOp::LeftShift => "<<",
            BinaryOp::RightShift => ">>",
            BinaryOp::Equal => "=",
            BinaryOp::NotEqual => "<>",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Plus,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Variable(String),
    Grouping(Box<Expr>),
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    DottedGet {
        object: Box<Expr>,
        name: String,
    },
    IndexedGet {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    ArrayLiteral(Vec<Expr>),
    AssocArrayLiteral(Vec<(String, Expr)>),
    /// An anonymous `function`/`sub` expression
    Function(Box<FunctionDecl>),
}

/// A parameter in a function signature.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub name: String,
    pub kind: ValueKind,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    /// `None` for anonymous functions
    pub name: Option<String>,
    pub params: Vec<ParamDecl>,
    pub returns: ValueKind,
    pub is_sub: bool,
    pub body: Vec<Stmt>,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PrintItem {
    Expr(Expr),
    /// `;` joins items without spacing
    Semicolon,
    /// `,` pads to the next 16-column print zone
    Comma,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfBranch {
    pub condition: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Expression(Expr),
    Assign {
        name: String,
        op: Option<BinaryOp>,
        value: Expr,
    },
    DottedSet {
        object: Expr,
        name: String,
        op: Option<BinaryOp>,
        value: Expr,
    },
    IndexedSet {
        object: Expr,
        index: Expr,
        op: Option<BinaryOp>,
        value: Expr,
    },
    Print(Vec<PrintItem>),
    If {
        branches: Vec<IfBranch>,
        else_branch: Option<Vec<Stmt>>,
    },
    For {
        counter: String,
        start: Expr,
        end: Expr,
        step: Option<Expr>,
        body: Vec<Stmt>,
    },
    ForEach {
        item: String,
        collection: Expr,
        body: Vec<Stmt>,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
    },
    ExitFor,
    ExitWhile,
    ContinueFor,
    ContinueWhile,
    Return(Option<Expr>),
    Function(FunctionDecl),
    Try {
        body: Vec<Stmt>,
        catch_var: Option<String>,
        catch_body: Vec<Stmt>,
    },
    Throw(Expr),
    End,
    Stop,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub location: Location,
}

impl Stmt {
    pub fn new(kind: StmtKind, location: Location) -> Self {
        Self { kind, location }
    }
}

/// A parsed source file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

impl Program {
    /// Named function declarations at file level.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.statements.iter().filter_map(|s| match &s.kind {
            StmtKind::Function(decl) => Some(decl),
            _ => None,
        })
    }

    /// Merge another file's statements into this program.
    pub fn extend(&mut self, other: Program) {
        self.statements.extend(other.statements);
    }
}
