use crate::compiler::checker::ValidationError;
use crate::compiler::lexer::LexError;
use crate::compiler::parser::ParseError;
use std::io;
use thiserror::Error;

/// Everything that can stop a compilation.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Every problem the definition checker found, in source order.
    #[error("Type checking failed:\n{}", join_messages(.0))]
    Validation(Vec<ValidationError>),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("cannot serialize syntax tree: {0}")]
    Json(#[from] serde_json::Error),
}

impl CompileError {
    /// The individual validation errors, empty for other kinds of failure.
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            CompileError::Validation(errors) => errors,
            _ => &[],
        }
    }
}

fn join_messages(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
