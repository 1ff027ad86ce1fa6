//! C backend for the Puffs systems DSL transpiler.
//!
//! [`generate`] is the single public entry point: given a validated
//! [`Package`] AST and a [`BackendConfig`], it runs the collector, emits the
//! public header and private implementation sections, and (unless
//! `BackendConfig::no_format` was set) pipes the result through an external
//! formatter. The two sections are joined by a single marker line so a
//! caller that wants a `.h`/`.c` pair can split on it.

pub mod ast;
pub mod codegen;
pub mod collector;
pub mod config;
pub mod error;
pub mod format;
pub mod interner;
pub mod mangle;
pub mod status;
pub mod types;
pub mod wire;

pub use ast::Package;
pub use config::BackendConfig;
pub use error::BackendError;

use codegen::{emit_header, emit_implementation, Ctx, HEADER_END_MARKER};
use collector::collect;

/// Lower `pkg` to a single C translation unit: a header section, the
/// [`HEADER_END_MARKER`] line, then the implementation section.
pub fn generate(pkg: &Package, cfg: &BackendConfig) -> Result<String, BackendError> {
    let collected = collect(pkg)?;
    let ctx = Ctx::new(pkg, &collected, cfg);

    let header = emit_header(&ctx)?;
    let implementation = emit_implementation(&ctx)?;
    let combined = format!("{header}\n{HEADER_END_MARKER}\n{implementation}");

    debug_assert_eq!(
        combined.matches(HEADER_END_MARKER).count(),
        1,
        "header/implementation marker must appear exactly once"
    );

    if cfg.skip_format {
        Ok(combined)
    } else {
        format::run(&combined, cfg.formatter_path.as_deref())
    }
}
