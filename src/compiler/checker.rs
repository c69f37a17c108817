//! Definition checker.
//!
//! A single pre-order pass over the program tree that verifies every
//! function carries a usable return annotation, every referenced name is a
//! built-in or a bound variable, and every literal has a supported type.
//! Errors are collected rather than raised; the pass always runs to the end.

use crate::compiler::ast::*;
use crate::compiler::codegen::types::{classify_annotation, Annotation};
use crate::compiler::span::Span;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, trace};

/// Names that are always defined.
pub const BUILTINS: &[&str] = &["print", "None", "NoneType", "int"];

// ═══════════════════════════════════════════════════════════════
//  Error type
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub span: Span,
}

/// Type recorded for a bound variable. No statement binds names yet, so
/// only callers of [`Checker::bind`] ever populate the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundVar {
    Str,
    Callable,
}

// ═══════════════════════════════════════════════════════════════
//  Checker
// ═══════════════════════════════════════════════════════════════

pub struct Checker {
    errors: Vec<ValidationError>,
    variables: HashMap<String, BoundVar>,
}

impl Default for Checker {
    fn default() -> Self {
        Self::new()
    }
}

impl Checker {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            variables: HashMap::new(),
        }
    }

    /// Record `name` as a bound variable visible to the rest of the pass.
    pub fn bind(&mut self, name: &str, ty: BoundVar) {
        self.variables.insert(name.to_string(), ty);
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Validate the whole module. Returns `true` when no errors were found.
    pub fn check(&mut self, module: &Module) -> bool {
        for stmt in &module.body {
            self.check_stmt(stmt);
        }
        debug!(errors = self.errors.len(), "definition check finished");
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ValidationError> {
        self.errors
    }

    fn error(&mut self, message: String, span: Span) {
        trace!(%span, %message, "validation error");
        self.errors.push(ValidationError { message, span });
    }

    // ── Statements ───────────────────────────────────────────

    fn check_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::FunctionDef(f) => self.check_function(f),
            Stmt::Return(ret) => {
                if let Some(value) = &ret.value {
                    self.check_expr(value);
                }
            }
            Stmt::Expr(stmt) => self.check_expr(&stmt.value),
            Stmt::Assign(assign) => {
                for target in &assign.targets {
                    self.check_expr(target);
                }
                self.check_expr(&assign.value);
            }
            Stmt::Pass(_) => {}
        }
    }

    fn check_function(&mut self, f: &FunctionDef) {
        match classify_annotation(f.returns.as_ref()) {
            Annotation::Absent => {
                self.error(
                    format!("Function {} lacks return type annotation", f.name),
                    f.span,
                );
            }
            Annotation::Unrecognized(_) => {
                let span = f.returns.as_ref().map_or(f.span, |r| r.span);
                self.error(
                    format!("Invalid return type annotation for function {}", f.name),
                    span,
                );
            }
            Annotation::NoneType | Annotation::Int | Annotation::Str => {
                for stmt in &f.body {
                    self.check_stmt(stmt);
                }
            }
        }
    }

    // ── Expressions ──────────────────────────────────────────

    fn check_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Name(name) => self.check_name(&name.id, expr.span),
            ExprKind::Constant(value) => self.check_constant(value, expr.span),
            ExprKind::Call(call) => self.check_call(call),
            ExprKind::Attribute(value, _) => self.check_expr(value),
            ExprKind::Subscript(value, index) => {
                self.check_expr(value);
                self.check_expr(index);
            }
            ExprKind::UnaryOp(_, operand) => self.check_expr(operand),
            ExprKind::BinOp(lhs, _, rhs) => {
                self.check_expr(lhs);
                self.check_expr(rhs);
            }
        }
    }

    fn check_name(&mut self, id: &str, span: Span) {
        if id == "None" || id == "NoneType" {
            return;
        }
        if BUILTINS.contains(&id) || self.is_bound(id) {
            return;
        }
        self.error(format!("Undefined variable: {}", id), span);
    }

    fn check_constant(&mut self, value: &Constant, span: Span) {
        match value {
            Constant::Str(_) | Constant::Int(_) | Constant::None => {}
            Constant::Float(_) | Constant::Bool(_) | Constant::Ellipsis => {
                self.error(
                    format!("Unsupported constant type: {}", value.type_name()),
                    span,
                );
            }
        }
    }

    fn check_call(&mut self, call: &Call) {
        if let Some(name) = call.func.as_name() {
            if name != "print" && !self.is_bound(name) {
                self.error(format!("Undefined function: {}", name), call.func.span);
            }
        }
        // The callee is then validated like any other expression, so an
        // unknown bare name is also reported as an undefined variable.
        self.check_expr(&call.func);

        for arg in &call.args {
            self.check_expr(arg);
        }
        for keyword in &call.keywords {
            self.check_expr(&keyword.value);
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
