//! Program tree for the accepted Python subset.
//!
//! Mirrors the shape of a conventional Python AST (module → statements →
//! expressions) restricted to the node kinds the compiler understands. Every
//! node carries a [`Span`]; all types derive `Serialize`/`Deserialize` so a
//! tree can be exported as JSON.

use crate::compiler::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════
//  Module
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub body: Vec<Stmt>,
    pub span: Span,
}

// ═══════════════════════════════════════════════════════════════
//  Statements
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    FunctionDef(FunctionDef),
    Return(ReturnStmt),
    Expr(ExprStmt),
    Assign(AssignStmt),
    Pass(Span),
}

impl Stmt {
    /// A bare string-literal expression statement (a docstring when it
    /// opens a module or function body).
    pub fn is_docstring(&self) -> bool {
        matches!(
            self,
            Stmt::Expr(ExprStmt {
                value: Expr {
                    kind: ExprKind::Constant(Constant::Str(_)),
                    ..
                },
                ..
            })
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<Param>,
    /// Return annotation, `None` when the `->` clause is absent.
    pub returns: Option<Expr>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// A declared parameter. Parameters are parsed and exported but never
/// lowered; generated functions always take no arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub annotation: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExprStmt {
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignStmt {
    pub targets: Vec<Expr>,
    pub value: Expr,
    pub span: Span,
}

// ═══════════════════════════════════════════════════════════════
//  Expressions
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn constant(value: Constant, span: Span) -> Self {
        Self::new(ExprKind::Constant(value), span)
    }

    pub fn name(id: &str, ctx: ExprContext, span: Span) -> Self {
        Self::new(
            ExprKind::Name(Name {
                id: id.to_string(),
                ctx,
            }),
            span,
        )
    }

    /// The identifier when this is a bare name reference.
    pub fn as_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Name(name) => Some(&name.id),
            _ => None,
        }
    }

    pub fn as_str_constant(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Constant(Constant::Str(s)) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Constant(Constant),
    Name(Name),
    Call(Call),
    Attribute(Box<Expr>, String),
    Subscript(Box<Expr>, Box<Expr>),
    UnaryOp(UnaryOp, Box<Expr>),
    BinOp(Box<Expr>, BinOp, Box<Expr>),
}

impl ExprKind {
    /// Node-kind label used in diagnostics and degraded codegen comments.
    pub fn label(&self) -> &'static str {
        match self {
            ExprKind::Constant(_) => "Constant",
            ExprKind::Name(_) => "Name",
            ExprKind::Call(_) => "Call",
            ExprKind::Attribute(..) => "Attribute",
            ExprKind::Subscript(..) => "Subscript",
            ExprKind::UnaryOp(..) => "UnaryOp",
            ExprKind::BinOp(..) => "BinOp",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Name {
    pub id: String,
    pub ctx: ExprContext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExprContext {
    Load,
    Store,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub func: Box<Expr>,
    pub args: Vec<Expr>,
    pub keywords: Vec<Keyword>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub arg: String,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    Str(String),
    /// Decimal digits of the value, whatever base the source used.
    Int(String),
    Float(f64),
    Bool(bool),
    None,
    Ellipsis,
}

impl Constant {
    /// Name of the Python type of this value, as reported in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Constant::Str(_) => "str",
            Constant::Int(_) => "int",
            Constant::Float(_) => "float",
            Constant::Bool(_) => "bool",
            Constant::None => "NoneType",
            Constant::Ellipsis => "ellipsis",
        }
    }
}

/// Python `repr`-style rendering.
impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Str(s) => write!(f, "{:?}", s),
            Constant::Int(n) => write!(f, "{}", n),
            Constant::Float(n) => write!(f, "{:?}", n),
            Constant::Bool(true) => write!(f, "True"),
            Constant::Bool(false) => write!(f, "False"),
            Constant::None => write!(f, "None"),
            Constant::Ellipsis => write!(f, "Ellipsis"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Pos,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}
