//! Pre-check canonicalization of the program tree.

use crate::compiler::ast::*;

/// Rewrite every `-> None` return annotation written as the `None` constant
/// into a `None` name reference, so later stages only see one spelling of
/// the void annotation. Nested definitions are rewritten too.
pub fn normalize_annotations(module: &mut Module) {
    normalize_body(&mut module.body);
}

fn normalize_body(body: &mut [Stmt]) {
    for stmt in body {
        if let Stmt::FunctionDef(f) = stmt {
            normalize_function(f);
        }
    }
}

fn normalize_function(f: &mut FunctionDef) {
    if let Some(returns) = &mut f.returns {
        if matches!(returns.kind, ExprKind::Constant(Constant::None)) {
            *returns = Expr::name("None", ExprContext::Load, returns.span);
        }
    }
    normalize_body(&mut f.body);
}
