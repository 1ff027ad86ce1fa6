//! Expression lowering.
//!
//! Recursive-descent rendering of an [`Expr`] tree to a C text fragment.
//! Every recursive call bumps a depth counter; exceeding
//! `BackendConfig::max_expr_depth` fails as [`BackendError::ExprTooDeep`]
//! rather than overflowing the real call stack.

use crate::ast::{Expr, Literal};
use crate::codegen::Ctx;
use crate::error::BackendError;

/// Lower `expr` to a C text fragment, fully parenthesized so it composes
/// safely into any surrounding expression without precedence surprises.
pub fn lower(ctx: &Ctx, expr: &Expr) -> Result<String, BackendError> {
    lower_at_depth(ctx, expr, 0)
}

fn lower_at_depth(ctx: &Ctx, expr: &Expr, depth: usize) -> Result<String, BackendError> {
    if depth > ctx.cfg.max_expr_depth {
        return Err(BackendError::ExprTooDeep(format!(
            "expression nests more than {} levels deep",
            ctx.cfg.max_expr_depth
        )));
    }
    let next = depth + 1;
    match expr {
        Expr::Literal(Literal::Bool(b)) => Ok(b.to_string()),
        Expr::Literal(Literal::Int(i)) => Ok(i.to_string()),
        Expr::Literal(Literal::UInt(u)) => Ok(format!("{u}u")),
        Expr::This => Ok("self->private_impl".to_string()),
        Expr::InArg(id) => Ok(format!("a_{}", ctx.tm.resolve(*id))),
        Expr::Local(id) => Ok(format!("v_{}", ctx.tm.resolve(*id))),
        Expr::Field { base, field } => {
            let base_text = lower_at_depth(ctx, base, next)?;
            Ok(format!("{base_text}.f_{}", ctx.tm.resolve(*field)))
        }
        Expr::Index { base, index } => {
            let base_text = lower_at_depth(ctx, base, next)?;
            let index_text = lower_at_depth(ctx, index, next)?;
            Ok(format!("{base_text}[{index_text}]"))
        }
        Expr::Unary { op, operand } => {
            let operand_text = lower_at_depth(ctx, operand, next)?;
            Ok(format!("({}{operand_text})", op.c_text()))
        }
        Expr::Binary { op, lhs, rhs } => {
            let lhs_text = lower_at_depth(ctx, lhs, next)?;
            let rhs_text = lower_at_depth(ctx, rhs, next)?;
            Ok(format!("({lhs_text} {} {rhs_text})", op.c_text()))
        }
        Expr::Cast { operand, ty } => {
            let operand_text = lower_at_depth(ctx, operand, next)?;
            let ty_text = ty.render_cast(ctx.cfg, ctx.pkg_name)?;
            Ok(format!("(({ty_text})({operand_text}))"))
        }
        Expr::LowBits { base, n } => {
            let base_text = lower_at_depth(ctx, base, next)?;
            let n_text = lower_at_depth(ctx, n, next)?;
            Ok(format!("PUFFS_LOW_BITS({base_text}, {n_text})"))
        }
        Expr::TempRead(n) => Ok(format!("t_{n}")),
        Expr::Suspendible(_) => Err(BackendError::InternalInvariant(
            "suspendible call reached expression lowering without being hoisted".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, File, Literal, Op, Package};
    use crate::collector::collect;
    use crate::config::BackendConfig;
    use crate::interner::Interner;

    fn ctx_fixture() -> (Package, crate::collector::Collected, BackendConfig) {
        let tm = Interner::new();
        let pkg = Package {
            name: "foo".to_string(),
            files: vec![File { decls: vec![] }],
            interner: tm,
        };
        let collected = collect(&pkg).unwrap();
        let cfg = BackendConfig::new();
        (pkg, collected, cfg)
    }

    #[test]
    fn this_lowers_to_private_impl() {
        let (pkg, collected, cfg) = ctx_fixture();
        let ctx = Ctx::new(&pkg, &collected, &cfg);
        assert_eq!(lower(&ctx, &Expr::This).unwrap(), "self->private_impl");
    }

    #[test]
    fn field_on_this_chains_dot_access() {
        let mut tm = Interner::new();
        let field = tm.intern("count");
        let pkg = Package {
            name: "foo".to_string(),
            files: vec![File { decls: vec![] }],
            interner: tm,
        };
        let collected = collect(&pkg).unwrap();
        let cfg = BackendConfig::new();
        let ctx = Ctx::new(&pkg, &collected, &cfg);
        let e = Expr::Field {
            base: Box::new(Expr::This),
            field,
        };
        assert_eq!(lower(&ctx, &e).unwrap(), "self->private_impl.f_count");
    }

    #[test]
    fn binary_expr_is_parenthesized() {
        let (pkg, collected, cfg) = ctx_fixture();
        let ctx = Ctx::new(&pkg, &collected, &cfg);
        let e = Expr::Binary {
            op: Op::Add,
            lhs: Box::new(Expr::Literal(Literal::Int(1))),
            rhs: Box::new(Expr::Literal(Literal::Int(2))),
        };
        assert_eq!(lower(&ctx, &e).unwrap(), "(1 + 2)");
    }

    #[test]
    fn raw_suspendible_node_is_rejected() {
        let (pkg, collected, cfg) = ctx_fixture();
        let ctx = Ctx::new(&pkg, &collected, &cfg);
        let e = Expr::Suspendible(crate::ast::SuspendibleCall::ReadU8 {
            src: {
                let mut tm2 = Interner::new();
                tm2.intern("src")
            },
        });
        assert!(matches!(lower(&ctx, &e), Err(BackendError::InternalInvariant(_))));
    }

    #[test]
    fn depth_cap_is_enforced() {
        let (pkg, collected, cfg) = ctx_fixture();
        let cfg = cfg.with_max_expr_depth(2);
        let ctx = Ctx::new(&pkg, &collected, &cfg);
        let mut e = Expr::Literal(Literal::Int(0));
        for _ in 0..5 {
            e = Expr::Unary {
                op: Op::Neg,
                operand: Box::new(e),
            };
        }
        assert!(matches!(lower(&ctx, &e), Err(BackendError::ExprTooDeep(_))));
    }
}
