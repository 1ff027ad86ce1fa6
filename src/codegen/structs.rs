//! Struct layout and constructor/destructor emission.
//!
//! Every field lives inside a nested `private_impl` record so the outer
//! typedef stays an opaque, stack-allocatable value to callers. Suspendible
//! structs additionally carry a leading `status` field (first, so the
//! constructor can poison it with only `sizeof(status)` bytes) and a
//! `magic` word checked on entry to every public method.

use crate::ast::StructDef;
use crate::codegen::Ctx;
use crate::error::BackendError;
use crate::mangle;
use crate::types::BaseType;

/// `md5sum("puffs")`'s leading 32 bits, the fixed constructed-ok sentinel.
pub const PUFFS_MAGIC: &str = "0xCB3699CCU";
/// `md5sum("zeroed")`'s leading 32 bits, the "skip memset" sentinel a parent
/// constructor passes to an embedded sub-struct's constructor.
pub const PUFFS_ALREADY_ZEROED: &str = "0x68602EF1U";

fn mangled_struct_name(ctx: &Ctx, s: &StructDef) -> String {
    mangle::mangle(ctx.pkg_name, ctx.tm.resolve(s.name))
}

/// Struct field names whose declared type is another value-embedded
/// package struct, in field declaration order.
fn embedded_substructs<'a>(ctx: &'a Ctx, s: &'a StructDef) -> Vec<(&'a crate::ast::Field, &'a StructDef)> {
    s.fields
        .iter()
        .filter_map(|f| {
            if f.ty.pointers != 0 {
                return None;
            }
            let BaseType::Package(name) = &f.ty.base else {
                return None;
            };
            ctx.collected.struct_map.get(name).map(|sub| (f, sub))
        })
        .collect()
}

/// Render the `typedef struct { ... } puffs_PKG_NAME;` block.
pub fn render_layout(ctx: &Ctx, s: &StructDef) -> Result<Vec<String>, BackendError> {
    let name = mangled_struct_name(ctx, s);
    let status_ty = mangle::mangle(ctx.pkg_name, "status");
    let mut out = Vec::new();
    out.push("typedef struct {".to_string());
    out.push("  struct {".to_string());
    if s.is_suspendible {
        out.push(format!("    {status_ty} status;"));
        out.push("    uint32_t magic;".to_string());
    }
    for field in &s.fields {
        if field.non_zero_default.is_some() {
            return Err(BackendError::Unsupported(format!(
                "struct field '{}' declares a non-zero default",
                ctx.tm.resolve(field.name)
            )));
        }
        let ident = format!("f_{}", ctx.tm.resolve(field.name));
        let decl = field.ty.render_decl(ctx.cfg, ctx.pkg_name, &ident)?;
        out.push(format!("    {decl};"));
    }
    out.push("  } private_impl;".to_string());
    out.push(format!("}} {name};"));
    Ok(out)
}

pub fn constructor_prototype(ctx: &Ctx, s: &StructDef) -> String {
    let name = mangled_struct_name(ctx, s);
    format!(
        "void {name}_constructor({name}* self, uint32_t puffs_version, uint32_t for_internal_use_only);"
    )
}

pub fn destructor_prototype(ctx: &Ctx, s: &StructDef) -> String {
    let name = mangled_struct_name(ctx, s);
    format!("void {name}_destructor({name}* self);")
}

/// The constructor's body, only emitted for suspendible structs.
pub fn constructor_body(ctx: &Ctx, s: &StructDef) -> Result<Vec<String>, BackendError> {
    let name = mangled_struct_name(ctx, s);
    let bad_version = ctx.status_name("bad version").map(str::to_string).ok_or_else(|| {
        BackendError::InternalInvariant("built-in status 'bad version' is missing".to_string())
    })?;
    let mut out = Vec::new();
    out.push(format!(
        "void {name}_constructor({name}* self, uint32_t puffs_version, uint32_t for_internal_use_only) {{"
    ));
    out.push("  if (!self) {".to_string());
    out.push("    return;".to_string());
    out.push("  }".to_string());
    out.push("  if (puffs_version != PUFFS_VERSION) {".to_string());
    out.push(format!("    self->private_impl.status = {bad_version};"));
    out.push("    return;".to_string());
    out.push("  }".to_string());
    out.push(format!("  if (for_internal_use_only != {PUFFS_ALREADY_ZEROED}) {{"));
    out.push("    memset(self, 0, sizeof(*self));".to_string());
    out.push("  }".to_string());
    out.push(format!("  self->private_impl.magic = {PUFFS_MAGIC};"));
    for (field, sub) in embedded_substructs(ctx, s) {
        let sub_name = mangled_struct_name(ctx, sub);
        let field_ident = format!("f_{}", ctx.tm.resolve(field.name));
        if sub.is_suspendible {
            out.push(format!(
                "  {sub_name}_constructor(&self->private_impl.{field_ident}, puffs_version, {PUFFS_ALREADY_ZEROED});"
            ));
        }
    }
    out.push("}".to_string());
    Ok(out)
}

/// The destructor's body, only emitted for suspendible structs.
pub fn destructor_body(ctx: &Ctx, s: &StructDef) -> Vec<String> {
    let name = mangled_struct_name(ctx, s);
    let mut out = Vec::new();
    out.push(format!("void {name}_destructor({name}* self) {{"));
    out.push("  if (!self) {".to_string());
    out.push("    return;".to_string());
    out.push("  }".to_string());
    for (field, sub) in embedded_substructs(ctx, s) {
        if !sub.is_suspendible {
            continue;
        }
        let sub_name = mangled_struct_name(ctx, sub);
        let field_ident = format!("f_{}", ctx.tm.resolve(field.name));
        out.push(format!("  {sub_name}_destructor(&self->private_impl.{field_ident});"));
    }
    out.push("}".to_string());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Decl, Field, File, Package};
    use crate::collector::collect;
    use crate::config::BackendConfig;
    use crate::interner::Interner;
    use crate::types::{Numeric, TypeExpr};

    fn pkg_with_struct(tm: Interner, s: StructDef) -> (Package, crate::collector::Collected) {
        let pkg = Package {
            name: "foo".to_string(),
            files: vec![File {
                decls: vec![Decl::Struct(s)],
            }],
            interner: tm,
        };
        let collected = collect(&pkg).unwrap();
        (pkg, collected)
    }

    #[test]
    fn suspendible_struct_puts_status_first() {
        let mut tm = Interner::new();
        let name = tm.intern("bar");
        let field = tm.intern("count");
        let s = StructDef {
            name,
            fields: vec![Field {
                name: field,
                ty: TypeExpr::numeric(Numeric::U32),
                non_zero_default: None,
            }],
            is_public: true,
            is_suspendible: true,
        };
        let pkg = Package {
            name: "foo".to_string(),
            files: vec![File {
                decls: vec![Decl::Struct(s.clone())],
            }],
            interner: tm,
        };
        let collected = collect(&pkg).unwrap();
        let cfg = BackendConfig::new();
        let ctx = Ctx::new(&pkg, &collected, &cfg);
        let lines = render_layout(&ctx, &s).unwrap();
        let joined = lines.join(" ");
        assert!(joined.contains("puffs_foo_status status;"));
        assert!(joined.contains("uint32_t magic;"));
        assert!(joined.contains("uint32_t f_count;"));
        let status_pos = joined.find("status;").unwrap();
        let field_pos = joined.find("f_count;").unwrap();
        assert!(status_pos < field_pos);
    }

    #[test]
    fn non_zero_default_field_is_rejected() {
        let mut tm = Interner::new();
        let name = tm.intern("bar");
        let field = tm.intern("count");
        let s = StructDef {
            name,
            fields: vec![Field {
                name: field,
                ty: TypeExpr::numeric(Numeric::U32),
                non_zero_default: Some(()),
            }],
            is_public: true,
            is_suspendible: false,
        };
        let (pkg, collected) = pkg_with_struct(tm, s.clone());
        let cfg = BackendConfig::new();
        let ctx = Ctx::new(&pkg, &collected, &cfg);
        assert!(matches!(render_layout(&ctx, &s), Err(BackendError::Unsupported(_))));
    }

    #[test]
    fn constructor_checks_version_before_zeroing() {
        let mut tm = Interner::new();
        let name = tm.intern("bar");
        let s = StructDef {
            name,
            fields: vec![],
            is_public: true,
            is_suspendible: true,
        };
        let pkg = Package {
            name: "foo".to_string(),
            files: vec![File {
                decls: vec![Decl::Struct(s.clone())],
            }],
            interner: tm,
        };
        let collected = collect(&pkg).unwrap();
        let cfg = BackendConfig::new();
        let ctx = Ctx::new(&pkg, &collected, &cfg);
        let body = constructor_body(&ctx, &s).unwrap();
        let joined = body.join("\n");
        assert!(joined.contains("puffs_version != PUFFS_VERSION"));
        assert!(joined.contains("puffs_foo_error_bad_version"));
        let version_check_pos = joined.find("puffs_version != PUFFS_VERSION").unwrap();
        let memset_pos = joined.find("memset").unwrap();
        assert!(version_check_pos < memset_pos);
    }
}
