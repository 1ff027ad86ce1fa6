//! Function prototypes and bodies.
//!
//! Builds the fixed five-step prologue (receiver null check, status latch,
//! magic check, argument validation, local declarations) and the
//! `cleanup0:`-labeled epilogue around the statements `codegen::statements`
//! lowers, then asserts the hoisted-temporary write/read cursors balanced.

use crate::ast::FuncDef;
use crate::codegen::funcstate::FuncScratch;
use crate::codegen::{statements, Ctx};
use crate::error::BackendError;
use crate::mangle;
use crate::status::builtin;

fn mangled_func_name(ctx: &Ctx, receiver: Option<&str>, func_name: &str) -> String {
    match receiver {
        Some(r) => mangle::mangle(ctx.pkg_name, &format!("{r}_{func_name}")),
        None => mangle::mangle(ctx.pkg_name, func_name),
    }
}

fn return_type(ctx: &Ctx, func: &FuncDef) -> String {
    if func.is_suspendible {
        mangle::mangle(ctx.pkg_name, "status")
    } else {
        "void".to_string()
    }
}

fn param_list(ctx: &Ctx, receiver_ty: Option<&str>, func: &FuncDef) -> Result<String, BackendError> {
    let mut parts = Vec::new();
    if let Some(recv) = receiver_ty {
        parts.push(format!("{recv}* self"));
    }
    for param in &func.inputs {
        let ident = format!("a_{}", ctx.tm.resolve(param.name));
        parts.push(param.ty.render_decl(ctx.cfg, ctx.pkg_name, &ident)?);
    }
    if parts.is_empty() {
        parts.push("void".to_string());
    }
    Ok(parts.join(", "))
}

/// Render a function's prototype line (no trailing body).
pub fn prototype(
    ctx: &Ctx,
    func: &FuncDef,
    receiver_ty: Option<&str>,
) -> Result<String, BackendError> {
    let receiver_name = func.receiver.map(|r| ctx.tm.resolve(r).to_string());
    let name = mangled_func_name(ctx, receiver_name.as_deref(), ctx.tm.resolve(func.name));
    let ret = return_type(ctx, func);
    let params = param_list(ctx, receiver_ty, func)?;
    Ok(format!("{ret} {name}({params});"))
}

/// Render a function's full definition: signature, prologue, lowered body,
/// and epilogue.
pub fn definition(
    ctx: &Ctx,
    func: &FuncDef,
    receiver_ty: Option<&str>,
) -> Result<Vec<String>, BackendError> {
    let receiver_name = func.receiver.map(|r| ctx.tm.resolve(r).to_string());
    let name = mangled_func_name(ctx, receiver_name.as_deref(), ctx.tm.resolve(func.name));
    let ret = return_type(ctx, func);
    let params = param_list(ctx, receiver_ty, func)?;
    let has_receiver = receiver_ty.is_some();

    check_body_depth(&func.body, ctx.cfg.max_body_depth, 0)?;

    let mut fs = FuncScratch::new(
        func.is_public,
        func.is_suspendible,
        receiver_name,
        ctx.cfg.max_jump_targets,
        ctx.cfg.max_temp,
    );

    let mut out = Vec::new();
    out.push(format!("{ret} {name}({params}) {{"));

    // Step 1: public receiver null-check.
    if func.is_public && has_receiver {
        if func.is_suspendible {
            let bad_receiver = status_name(ctx, builtin::BAD_RECEIVER)?;
            out.push("  if (!self) {".to_string());
            out.push(format!("    return {bad_receiver};"));
            out.push("  }".to_string());
        } else {
            out.push("  if (!self) {".to_string());
            out.push("    return;".to_string());
            out.push("  }".to_string());
        }
    }

    // Step 2: status latch.
    if func.is_suspendible {
        let status_ty = mangle::mangle(ctx.pkg_name, "status");
        let initial = if has_receiver {
            "self->private_impl.status".to_string()
        } else {
            status_name(ctx, builtin::OK)?
        };
        out.push(format!("  {status_ty} status = {initial};"));
        if func.is_public {
            out.push("  if (status & 1) {".to_string());
            out.push("    return status;".to_string());
            out.push("  }".to_string());
        }
    }

    // Step 3: magic check.
    if func.is_public && has_receiver {
        let constructor_not_called = status_name(ctx, builtin::CONSTRUCTOR_NOT_CALLED)?;
        out.push(format!("  if (self->private_impl.magic != {}) {{", crate::codegen::structs::PUFFS_MAGIC));
        out.push(format!("    status = {constructor_not_called};"));
        out.push("    goto cleanup0;".to_string());
        out.push("  }".to_string());
    }

    // Step 4: argument validation.
    if func.is_public {
        let checks = argument_checks(ctx, func)?;
        if !checks.is_empty() {
            let bad_argument = status_name(ctx, builtin::BAD_ARGUMENT)?;
            out.push(format!("  if ({}) {{", checks.join(" || ")));
            out.push(format!("    status = {bad_argument};"));
            out.push("    goto cleanup0;".to_string());
            out.push("  }".to_string());
        }
    }

    // Step 5 + body: statements.rs declares locals inline, at the point of
    // their `var` statement; every jump in this backend either targets the
    // function-final cleanup0 label or a loop-local break/continue label
    // that sits after its own loop's declarations, so no declaration is
    // ever skipped by a goto.
    out.extend(statements::lower_block(ctx, &mut fs, &func.body, 1)?);

    if func.is_suspendible {
        out.push("cleanup0:".to_string());
        if has_receiver {
            out.push("  self->private_impl.status = status;".to_string());
        }
        out.push("  return status;".to_string());
    }
    out.push("}".to_string());

    fs.check_balanced()?;
    Ok(out)
}

fn status_name(ctx: &Ctx, message: &str) -> Result<String, BackendError> {
    ctx.status_name(message).map(str::to_string).ok_or_else(|| {
        BackendError::InternalInvariant(format!("built-in status '{message}' is missing"))
    })
}

/// One OR-able C boolean expression per input that must hold for the
/// argument to be valid: non-null pointers, tightened numeric bounds.
fn argument_checks(ctx: &Ctx, func: &FuncDef) -> Result<Vec<String>, BackendError> {
    let mut checks = Vec::new();
    for param in &func.inputs {
        let ident = format!("a_{}", ctx.tm.resolve(param.name));
        if param.ty.pointers > 0 {
            checks.push(format!("!{ident}"));
        }
        if let Some((lo, hi)) = param.ty.effective_bounds() {
            if let Some(lo) = lo {
                checks.push(format!("({ident} < {lo})"));
            }
            if let Some(hi) = hi {
                checks.push(format!("({ident} > {hi})"));
            }
        }
    }
    Ok(checks)
}

/// Count the deepest nesting of `if`/`while` blocks in `stmts`, failing
/// **BodyTooDeep** past `max_depth`.
fn check_body_depth(stmts: &[crate::ast::Stmt], max_depth: usize, depth: usize) -> Result<(), BackendError> {
    use crate::ast::Stmt;
    if depth > max_depth {
        return Err(BackendError::BodyTooDeep(format!(
            "function body nests more than {max_depth} levels deep"
        )));
    }
    for stmt in stmts {
        match stmt {
            Stmt::If {
                then_branch,
                else_branch,
                ..
            } => {
                check_body_depth(then_branch, max_depth, depth + 1)?;
                if let Some(else_stmts) = else_branch {
                    check_body_depth(else_stmts, max_depth, depth + 1)?;
                }
            }
            Stmt::While { body, .. } => {
                check_body_depth(body, max_depth, depth + 1)?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Also expose the "is this a leading `self` parameter" fact the type
/// lowering and layout modules need, mirroring `TypeExpr::package`'s
/// package-struct naming.
pub fn receiver_type_name(ctx: &Ctx, receiver: Option<crate::interner::Ident>) -> Option<String> {
    receiver.map(|r| mangle::mangle(ctx.pkg_name, ctx.tm.resolve(r)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Decl, File, Package, Param};
    use crate::collector::collect;
    use crate::config::BackendConfig;
    use crate::interner::Interner;
    use crate::types::{Numeric, TypeExpr};

    fn fixture_with_func(
        tm: Interner,
        func: FuncDef,
    ) -> (Package, crate::collector::Collected, FuncDef) {
        let pkg = Package {
            name: "foo".to_string(),
            files: vec![File {
                decls: vec![Decl::Func(func.clone())],
            }],
            interner: tm,
        };
        let collected = collect(&pkg).unwrap();
        (pkg, collected, func)
    }

    #[test]
    fn non_suspendible_function_returns_void() {
        let mut tm = Interner::new();
        let fname = tm.intern("reset");
        let func = FuncDef {
            receiver: None,
            name: fname,
            inputs: vec![],
            body: vec![],
            is_public: true,
            is_suspendible: false,
        };
        let pkg = Package {
            name: "foo".to_string(),
            files: vec![File { decls: vec![] }],
            interner: tm,
        };
        let collected = collect(&pkg).unwrap();
        let cfg = BackendConfig::new();
        let ctx = Ctx::new(&pkg, &collected, &cfg);
        let proto = prototype(&ctx, &func, None).unwrap();
        assert_eq!(proto, "void puffs_foo_reset(void);");
    }

    #[test]
    fn suspendible_receiver_function_epilogue_writes_back_status() {
        let mut tm = Interner::new();
        let receiver = tm.intern("bar");
        let fname = tm.intern("decode");
        let func = FuncDef {
            receiver: Some(receiver),
            name: fname,
            inputs: vec![],
            body: vec![],
            is_public: true,
            is_suspendible: true,
        };
        let pkg = Package {
            name: "foo".to_string(),
            files: vec![File { decls: vec![] }],
            interner: tm,
        };
        let collected = collect(&pkg).unwrap();
        let cfg = BackendConfig::new();
        let ctx = Ctx::new(&pkg, &collected, &cfg);
        let def = definition(&ctx, &func, Some("puffs_foo_bar")).unwrap();
        let joined = def.join("\n");
        assert!(joined.contains("puffs_foo_status puffs_foo_bar_decode(puffs_foo_bar* self)"));
        assert!(joined.contains("cleanup0:"));
        assert!(joined.contains("self->private_impl.status = status;"));
        assert!(joined.contains("return status;"));
    }

    #[test]
    fn pointer_argument_gets_null_check() {
        let mut tm = Interner::new();
        let fname = tm.intern("decode");
        let arg = tm.intern("src");
        let func = FuncDef {
            receiver: None,
            name: fname,
            inputs: vec![Param {
                name: arg,
                ty: TypeExpr::numeric(Numeric::U8).pointer_to(),
            }],
            body: vec![],
            is_public: true,
            is_suspendible: true,
        };
        let (pkg, collected, func) = fixture_with_func(tm, func);
        let cfg = BackendConfig::new();
        let ctx = Ctx::new(&pkg, &collected, &cfg);
        let def = definition(&ctx, &func, None).unwrap();
        let joined = def.join("\n");
        assert!(joined.contains("!a_src"));
        assert!(joined.contains("puffs_foo_error_bad_argument"));
    }

    #[test]
    fn body_depth_cap_is_enforced() {
        use crate::ast::Stmt;
        let mut tm = Interner::new();
        let fname = tm.intern("decode");
        let mut body = vec![Stmt::Assert];
        for _ in 0..5 {
            body = vec![Stmt::If {
                cond: crate::ast::Expr::Literal(crate::ast::Literal::Bool(true)),
                then_branch: body,
                else_branch: None,
            }];
        }
        let func = FuncDef {
            receiver: None,
            name: fname,
            inputs: vec![],
            body,
            is_public: true,
            is_suspendible: false,
        };
        let (pkg, collected, func) = fixture_with_func(tm, func);
        let cfg = BackendConfig::new().with_max_body_depth(2);
        let ctx = Ctx::new(&pkg, &collected, &cfg);
        assert!(matches!(
            definition(&ctx, &func, None),
            Err(BackendError::BodyTooDeep(_))
        ));
    }
}
