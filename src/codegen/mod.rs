//! Codegen submodules, the shared per-package context they read from, and
//! the header/implementation emitters that drive them.

pub mod expressions;
pub mod funcstate;
pub mod functions;
pub mod statements;
pub mod structs;
pub mod suspend;

use std::fmt::Write as _;

use crate::ast::Package;
use crate::collector::Collected;
use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::interner::Interner;
use crate::mangle;
use crate::status::BUILTIN_COUNT;

/// The line that separates the header portion of the output from the
/// implementation portion.
pub const HEADER_END_MARKER: &str = "// C HEADER ENDS HERE.";

/// Read-only context threaded through every codegen submodule: the package
/// being emitted, its interner, the collector's output, and the resource
/// caps in effect.
pub struct Ctx<'a> {
    pub pkg_name: &'a str,
    pub tm: &'a Interner,
    pub collected: &'a Collected,
    pub cfg: &'a BackendConfig,
}

impl<'a> Ctx<'a> {
    pub fn new(pkg: &'a Package, collected: &'a Collected, cfg: &'a BackendConfig) -> Self {
        Ctx {
            pkg_name: &pkg.name,
            tm: &pkg.interner,
            collected,
            cfg,
        }
    }

    /// Look up a built-in or user status's mangled C name by its message.
    pub fn status_name(&self, message: &str) -> Option<&str> {
        self.collected
            .status_list
            .iter()
            .find(|s| s.message == message)
            .map(|s| s.mangled_name.as_str())
    }
}

/// Emit the public header section: include guard, base constants, the
/// status enum, `status_is_error`/`status_string` prototypes, every public
/// struct's layout, public constructor/destructor prototypes, and public
/// function prototypes.
pub fn emit_header(ctx: &Ctx) -> Result<String, BackendError> {
    let mut out = String::new();
    let guard = format!("PUFFS_{}_H_INCLUDED", ctx.pkg_name.to_uppercase());
    let status_ty = mangle::mangle(ctx.pkg_name, "status");

    writeln!(out, "#ifndef {guard}")?;
    writeln!(out, "#define {guard}")?;
    writeln!(out)?;
    emit_base_prelude(&mut out)?;
    writeln!(out)?;
    writeln!(out, "#ifdef __cplusplus")?;
    writeln!(out, "extern \"C\" {{")?;
    writeln!(out, "#endif")?;
    writeln!(out)?;
    emit_status_enum(ctx, &mut out)?;
    writeln!(out)?;
    writeln!(out, "bool {status_ty}_is_error({status_ty} s);")?;
    writeln!(out, "const char* {status_ty}_string({status_ty} s);")?;
    writeln!(out)?;

    for s in &ctx.collected.struct_list {
        if !s.is_public {
            continue;
        }
        for line in structs::render_layout(ctx, s)? {
            writeln!(out, "{line}")?;
        }
        writeln!(out)?;
        if s.is_suspendible {
            writeln!(out, "{}", structs::constructor_prototype(ctx, s))?;
            writeln!(out, "{}", structs::destructor_prototype(ctx, s))?;
            writeln!(out)?;
        }
    }

    for f in &ctx.collected.func_list {
        if !f.is_public {
            continue;
        }
        let receiver_ty = functions::receiver_type_name(ctx, f.receiver);
        writeln!(out, "{}", functions::prototype(ctx, f, receiver_ty.as_deref())?)?;
    }
    writeln!(out)?;

    writeln!(out, "#ifdef __cplusplus")?;
    writeln!(out, "}}  /* extern \"C\" */")?;
    writeln!(out, "#endif")?;
    writeln!(out)?;
    writeln!(out, "#endif  /* {guard} */")?;
    Ok(out)
}

/// Emit the private implementation section: status string tables and
/// predicates, private struct layouts, private constructor/destructor
/// prototypes and bodies (plus bodies for the public ones already
/// prototyped in the header), private function prototypes, and every
/// function's body.
pub fn emit_implementation(ctx: &Ctx) -> Result<String, BackendError> {
    let mut out = String::new();
    emit_status_tables(ctx, &mut out)?;
    writeln!(out)?;

    for s in &ctx.collected.struct_list {
        if s.is_public {
            continue;
        }
        for line in structs::render_layout(ctx, s)? {
            writeln!(out, "{line}")?;
        }
        writeln!(out)?;
    }

    for s in &ctx.collected.struct_list {
        if !s.is_suspendible {
            continue;
        }
        if !s.is_public {
            writeln!(out, "{}", structs::constructor_prototype(ctx, s))?;
            writeln!(out, "{}", structs::destructor_prototype(ctx, s))?;
            writeln!(out)?;
        }
        for line in structs::constructor_body(ctx, s)? {
            writeln!(out, "{line}")?;
        }
        writeln!(out)?;
        for line in structs::destructor_body(ctx, s) {
            writeln!(out, "{line}")?;
        }
        writeln!(out)?;
    }

    for f in &ctx.collected.func_list {
        if f.is_public {
            continue;
        }
        let receiver_ty = functions::receiver_type_name(ctx, f.receiver);
        writeln!(out, "{}", functions::prototype(ctx, f, receiver_ty.as_deref())?)?;
    }
    writeln!(out)?;

    for f in &ctx.collected.func_list {
        let receiver_ty = functions::receiver_type_name(ctx, f.receiver);
        for line in functions::definition(ctx, f, receiver_ty.as_deref())? {
            writeln!(out, "{line}")?;
        }
        writeln!(out)?;
    }

    Ok(out)
}

fn emit_base_prelude(out: &mut String) -> Result<(), BackendError> {
    writeln!(out, "#include <stdbool.h>")?;
    writeln!(out, "#include <stddef.h>")?;
    writeln!(out, "#include <stdint.h>")?;
    writeln!(out, "#include <string.h>")?;
    writeln!(out)?;
    writeln!(out, "#define PUFFS_VERSION 1")?;
    writeln!(out, "#define PUFFS_MAGIC {}", structs::PUFFS_MAGIC)?;
    writeln!(out, "#define PUFFS_ALREADY_ZEROED {}", structs::PUFFS_ALREADY_ZEROED)?;
    writeln!(out, "#define USER_BASE {}", crate::status::USER_BASE)?;
    Ok(())
}

fn emit_status_enum(ctx: &Ctx, out: &mut String) -> Result<(), BackendError> {
    let status_ty = mangle::mangle(ctx.pkg_name, "status");
    writeln!(out, "typedef enum {{")?;
    for s in &ctx.collected.status_list {
        writeln!(out, "  {} = {},", s.mangled_name, s.value)?;
    }
    writeln!(out, "}} {status_ty};")?;
    Ok(())
}

fn emit_status_tables(ctx: &Ctx, out: &mut String) -> Result<(), BackendError> {
    let status_ty = mangle::mangle(ctx.pkg_name, "status");
    let split = BUILTIN_COUNT.min(ctx.collected.status_list.len());
    let (builtins, users) = ctx.collected.status_list.split_at(split);

    writeln!(out, "static const char* {status_ty}_builtin_strings[] = {{")?;
    for s in builtins {
        writeln!(out, "  \"{}\",", s.display_string(ctx.pkg_name))?;
    }
    writeln!(out, "}};")?;
    writeln!(out)?;
    writeln!(out, "static const char* {status_ty}_user_strings[] = {{")?;
    for s in users {
        writeln!(out, "  \"{}\",", s.display_string(ctx.pkg_name))?;
    }
    writeln!(out, "}};")?;
    writeln!(out)?;

    writeln!(out, "bool {status_ty}_is_error({status_ty} s) {{")?;
    writeln!(out, "  return s & 1;")?;
    writeln!(out, "}}")?;
    writeln!(out)?;

    writeln!(out, "const char* {status_ty}_string({status_ty} s) {{")?;
    writeln!(out, "  uint32_t index = (uint32_t)(1 - (int32_t)s) >> 1;")?;
    writeln!(out, "  if (index < {}) {{", builtins.len())?;
    writeln!(out, "    return {status_ty}_builtin_strings[index];")?;
    writeln!(out, "  }}")?;
    writeln!(out, "  if (index >= USER_BASE && index - USER_BASE < {}) {{", users.len())?;
    writeln!(out, "    return {status_ty}_user_strings[index - USER_BASE];")?;
    writeln!(out, "  }}")?;
    writeln!(out, "  return \"{}: unknown status\";", ctx.pkg_name)?;
    writeln!(out, "}}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Decl, File};
    use crate::collector::collect;

    fn pkg_foo(decls: Vec<Decl>) -> Package {
        Package {
            name: "foo".to_string(),
            files: vec![File { decls }],
            interner: Interner::new(),
        }
    }

    #[test]
    fn header_contains_status_enum_and_ok_entry() {
        let pkg = pkg_foo(vec![]);
        let collected = collect(&pkg).unwrap();
        let cfg = BackendConfig::new();
        let ctx = Ctx::new(&pkg, &collected, &cfg);
        let header = emit_header(&ctx).unwrap();
        assert!(header.contains("typedef enum {"));
        assert!(header.contains("puffs_foo_status_ok = 0,"));
        assert!(header.contains("puffs_foo_error_bad_version = -1,"));
    }

    #[test]
    fn output_has_exactly_one_marker() {
        let pkg = pkg_foo(vec![]);
        let collected = collect(&pkg).unwrap();
        let cfg = BackendConfig::new();
        let ctx = Ctx::new(&pkg, &collected, &cfg);
        let full = format!(
            "{}\n{HEADER_END_MARKER}\n{}",
            emit_header(&ctx).unwrap(),
            emit_implementation(&ctx).unwrap()
        );
        assert_eq!(full.matches(HEADER_END_MARKER).count(), 1);
    }

    #[test]
    fn zero_user_statuses_keeps_builtin_table_length() {
        let pkg = pkg_foo(vec![]);
        let collected = collect(&pkg).unwrap();
        let cfg = BackendConfig::new();
        let ctx = Ctx::new(&pkg, &collected, &cfg);
        let implementation = emit_implementation(&ctx).unwrap();
        let builtin_lines = implementation
            .lines()
            .skip_while(|l| !l.contains("_builtin_strings[] = {"))
            .skip(1)
            .take_while(|l| !l.trim_start().starts_with('}'))
            .count();
        assert_eq!(builtin_lines, BUILTIN_COUNT);
    }

    #[test]
    fn status_string_index_recovers_error_status_correctly() {
        let pkg = pkg_foo(vec![]);
        let collected = collect(&pkg).unwrap();
        let cfg = BackendConfig::new();
        let ctx = Ctx::new(&pkg, &collected, &cfg);
        let implementation = emit_implementation(&ctx).unwrap();
        let builtin_strings: Vec<&str> = implementation
            .lines()
            .skip_while(|l| !l.contains("_builtin_strings[] = {"))
            .skip(1)
            .take_while(|l| !l.trim_start().starts_with('}'))
            .collect();

        // `bad version` is status index 1 and an error (value -2*1+1 = -1).
        // The same recovery formula the emitted `status_string` body uses,
        // `(1 - value) >> 1`, must land back on index 1, not index 0.
        let bad_version = collected
            .status_list
            .iter()
            .find(|s| s.message == "bad version")
            .unwrap();
        assert_eq!(bad_version.value, -1);
        let recovered = (1 - bad_version.value) >> 1;
        assert_eq!(recovered, 1);
        assert!(builtin_strings[recovered as usize].contains("bad version"));

        // A non-error builtin still round-trips under the same formula.
        let short_write = collected
            .status_list
            .iter()
            .find(|s| s.message == "short write")
            .unwrap();
        let recovered = (1 - short_write.value) >> 1;
        assert!(builtin_strings[recovered as usize].contains("short write"));
    }
}
