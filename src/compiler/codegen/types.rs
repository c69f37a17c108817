//! Return-annotation classification and the IR scalar types it maps to.

use crate::compiler::ast::{Constant, Expr, ExprKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Scalar IR types a function can return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IrType {
    Void,
    I32,
    I8Ptr,
}

impl IrType {
    pub fn is_void(self) -> bool {
        self == IrType::Void
    }

    /// Literal used when a non-void function falls off the end of its body.
    /// `None` for `void`, which has no value.
    pub fn zero_value(self) -> Option<&'static str> {
        match self {
            IrType::Void => None,
            IrType::I32 => Some("0"),
            IrType::I8Ptr => Some("null"),
        }
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Void => write!(f, "void"),
            IrType::I32 => write!(f, "i32"),
            IrType::I8Ptr => write!(f, "i8*"),
        }
    }
}

/// What a return annotation denotes, before it is lowered to an [`IrType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    Absent,
    NoneType,
    Int,
    Str,
    /// Anything else, carrying a short description of the annotation.
    Unrecognized(String),
}

impl Annotation {
    pub fn ir_type(&self) -> IrType {
        match self {
            Annotation::Absent | Annotation::NoneType => IrType::Void,
            Annotation::Int => IrType::I32,
            Annotation::Str => IrType::I8Ptr,
            Annotation::Unrecognized(_) => IrType::Void,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Annotation::Unrecognized(_))
    }
}

pub fn classify_annotation(annotation: Option<&Expr>) -> Annotation {
    let Some(expr) = annotation else {
        return Annotation::Absent;
    };
    match &expr.kind {
        ExprKind::Name(name) => match name.id.as_str() {
            "None" | "NoneType" => Annotation::NoneType,
            "int" => Annotation::Int,
            "str" => Annotation::Str,
            other => Annotation::Unrecognized(other.to_string()),
        },
        ExprKind::Constant(Constant::None) => Annotation::NoneType,
        ExprKind::Constant(c) => Annotation::Unrecognized(c.to_string()),
        other => Annotation::Unrecognized(other.label().to_string()),
    }
}

/// Lower a return annotation to its IR type. Unrecognized annotations fall
/// back to `void` without failing.
pub fn map_annotation(annotation: Option<&Expr>) -> IrType {
    let classified = classify_annotation(annotation);
    if let Annotation::Unrecognized(what) = &classified {
        debug!(annotation = %what, "unrecognized return annotation, defaulting to void");
    }
    classified.ir_type()
}
