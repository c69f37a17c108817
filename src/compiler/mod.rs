pub mod ast;
pub mod checker;
pub mod codegen;
pub mod lexer;
pub mod normalize;
pub mod parser;
pub mod span;
pub mod token;
