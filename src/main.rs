use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use morelia::{CompileError, EmitOptions};

#[derive(Parser)]
#[command(name = "morelia")]
#[command(about = "Compile a small subset of Python to LLVM IR")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a source file to LLVM IR
    Compile {
        /// Source file
        file: PathBuf,

        /// Output path (default: the source path with an `.ll` extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Emit `ret <type> <value>` for value returns outside `main`
        #[arg(long)]
        typed_returns: bool,
    },

    /// Check a source file without generating IR
    Check {
        /// Source file
        file: PathBuf,
    },

    /// Print the syntax tree as JSON
    Ast {
        /// Source file
        file: PathBuf,

        /// Write the JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let result = match cli.command {
        Commands::Compile {
            file,
            output,
            typed_returns,
        } => cmd_compile(&file, output, EmitOptions { typed_returns }),
        Commands::Check { file } => cmd_check(&file),
        Commands::Ast { file, output } => cmd_ast(&file, output.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

fn cmd_compile(
    file: &Path,
    output: Option<PathBuf>,
    options: EmitOptions,
) -> Result<(), CompileError> {
    let out_path = output.unwrap_or_else(|| morelia::default_output_path(file));
    morelia::compile_file_with_options(file, &out_path, &options)?;
    eprintln!("wrote {}", out_path.display());
    Ok(())
}

fn cmd_check(file: &Path) -> Result<(), CompileError> {
    let source = fs::read_to_string(file)?;
    morelia::check_source(&source)?;
    eprintln!("ok: {} passed all checks", file.display());
    Ok(())
}

fn cmd_ast(file: &Path, output: Option<&Path>) -> Result<(), CompileError> {
    let source = fs::read_to_string(file)?;
    let json = morelia::source_to_ast_json(&source)?;
    match output {
        Some(out_path) => fs::write(out_path, &json)?,
        None => println!("{}", json),
    }
    Ok(())
}
