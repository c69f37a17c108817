pub mod compiler;
pub mod error;

use compiler::ast::Module;
use compiler::checker::Checker;
use compiler::codegen::Emitter;
use compiler::lexer::Lexer;
use compiler::normalize::normalize_annotations;
use compiler::parser::Parser;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub use compiler::codegen::EmitOptions;
pub use error::CompileError;

// ═══════════════════════════════════════════════════════════════
//  Front end
// ═══════════════════════════════════════════════════════════════

/// Lex and parse source text into a program tree, with return annotations
/// normalized.
pub fn parse_source(source: &str) -> Result<Module, CompileError> {
    let tokens = Lexer::new(source).tokenize()?;
    debug!(tokens = tokens.len(), "lexed source");

    let mut module = Parser::new(tokens).parse_module()?;
    normalize_annotations(&mut module);
    debug!(statements = module.body.len(), "parsed module");
    Ok(module)
}

/// Parse source text and return the program tree as pretty-printed JSON.
pub fn source_to_ast_json(source: &str) -> Result<String, CompileError> {
    let module = parse_source(source)?;
    Ok(serde_json::to_string_pretty(&module)?)
}

// ═══════════════════════════════════════════════════════════════
//  Checking and compilation
// ═══════════════════════════════════════════════════════════════

fn check_module(module: &Module) -> Result<(), CompileError> {
    let mut checker = Checker::new();
    if checker.check(module) {
        Ok(())
    } else {
        Err(CompileError::Validation(checker.into_errors()))
    }
}

/// Run the definition checker without generating IR.
pub fn check_source(source: &str) -> Result<(), CompileError> {
    let module = parse_source(source)?;
    check_module(&module)
}

/// Compile source text to LLVM IR.
pub fn compile_source(source: &str) -> Result<String, CompileError> {
    compile_source_with_options(source, &EmitOptions::default())
}

pub fn compile_source_with_options(
    source: &str,
    options: &EmitOptions,
) -> Result<String, CompileError> {
    let module = parse_source(source)?;
    check_module(&module)?;

    let mut emitter = Emitter::with_options(options.clone());
    emitter.emit_module(&module);
    Ok(emitter.finish())
}

/// Compile `input` and write the IR to `output`.
///
/// The IR is written to a temporary file next to `output` and renamed into
/// place, so `output` is either complete or untouched.
pub fn compile_file(input: &Path, output: &Path) -> Result<(), CompileError> {
    compile_file_with_options(input, output, &EmitOptions::default())
}

pub fn compile_file_with_options(
    input: &Path,
    output: &Path,
    options: &EmitOptions,
) -> Result<(), CompileError> {
    let source = fs::read_to_string(input)?;
    let ir = compile_source_with_options(&source, options)?;

    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(ir.as_bytes())?;
    tmp.persist(output).map_err(|e| e.error)?;

    info!(input = %input.display(), output = %output.display(), "compiled");
    Ok(())
}

/// `prog.py` → `prog.ll`.
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("ll")
}
