//! puffsgen - demo CLI for the Puffs C backend.
//!
//! Reads a JSON-encoded package AST (see `puffs_backend::wire`) and writes
//! the generated C translation unit to stdout or a file. There is no parser
//! here: this binary exists to exercise `puffs_backend::generate` from the
//! command line, not to grow its own source-language front end.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use puffs_backend::config::BackendConfig;
use puffs_backend::wire::{self, WirePackage};

#[derive(Parser)]
#[command(name = "puffsgen")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Lower a JSON-encoded Puffs package AST to a C translation unit", long_about = None)]
struct Args {
    /// JSON file describing the package AST (reads stdin if omitted).
    input: Option<PathBuf>,

    /// Write the generated C to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip the external clang-format pass and emit raw, unformatted C.
    #[arg(long)]
    no_format: bool,

    /// Use this formatter binary instead of `clang-format` on PATH.
    #[arg(long)]
    formatter: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("puffsgen: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let input_text = match &args.input {
        Some(path) => fs::read_to_string(path)?,
        None => std::io::read_to_string(std::io::stdin())?,
    };

    let wire_pkg: WirePackage = serde_json::from_str(&input_text)?;
    let pkg = wire::to_package(wire_pkg);

    let mut cfg = BackendConfig::new();
    if args.no_format {
        cfg = cfg.no_format();
    }
    if let Some(path) = args.formatter {
        cfg = cfg.with_formatter_path(path);
    }

    let generated = puffs_backend::generate(&pkg, &cfg)?;

    match args.output {
        Some(path) => fs::write(path, generated)?,
        None => print!("{generated}"),
    }
    Ok(())
}
