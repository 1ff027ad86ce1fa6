//! Statement lowering.
//!
//! Lowers one function body (a `Vec<Stmt>`) to C statement lines. Delegates
//! suspendible-call hoisting to [`crate::codegen::suspend`] and plain
//! expression rendering to [`crate::codegen::expressions`]; this module's
//! own job is control flow: `if`/`else if` chains, `while` loops and their
//! break/continue labels, `var` declarations, and `return`.

use crate::ast::{AssignOp, Expr, Stmt};
use crate::codegen::funcstate::FuncScratch;
use crate::codegen::{expressions, suspend, Ctx};
use crate::error::BackendError;
use crate::status::builtin;

/// Lower a statement list to C lines, indented by `indent` levels of four
/// spaces each.
pub fn lower_block(
    ctx: &Ctx,
    fs: &mut FuncScratch,
    stmts: &[Stmt],
    indent: usize,
) -> Result<Vec<String>, BackendError> {
    lower_block_at(ctx, fs, stmts, indent, 0)
}

fn pad(indent: usize) -> String {
    "    ".repeat(indent)
}

fn contains_suspendible(expr: &Expr) -> bool {
    match expr {
        Expr::Suspendible(_) => true,
        Expr::Binary { lhs, rhs, .. } => contains_suspendible(lhs) || contains_suspendible(rhs),
        Expr::Index { base, index } => contains_suspendible(base) || contains_suspendible(index),
        Expr::LowBits { base, n } => contains_suspendible(base) || contains_suspendible(n),
        Expr::Unary { operand, .. } | Expr::Field { base: operand, .. } | Expr::Cast { operand, .. } => {
            contains_suspendible(operand)
        }
        _ => false,
    }
}

fn lower_stmt(
    ctx: &Ctx,
    fs: &mut FuncScratch,
    stmt: &Stmt,
    indent: usize,
    else_if_depth: usize,
) -> Result<Vec<String>, BackendError> {
    let p = pad(indent);
    match stmt {
        Stmt::Assert => Ok(Vec::new()),
        Stmt::Assign { lhs, op, rhs } => {
            if matches!(op, AssignOp::BitClearAssign) {
                return Err(BackendError::Unsupported("~^= bit-clear-assign".to_string()));
            }
            let (mut prologue, lhs2) = suspend::hoist(ctx, fs, lhs)?;
            let (rhs_prologue, rhs2) = suspend::hoist(ctx, fs, rhs)?;
            prologue.extend(rhs_prologue);
            let lhs_text = expressions::lower(ctx, &lhs2)?;
            let rhs_text = expressions::lower(ctx, &rhs2)?;
            for _ in 0..suspend::count_temp_reads(&lhs2) + suspend::count_temp_reads(&rhs2) {
                fs.consume_temp();
            }
            let mut out: Vec<String> = prologue.into_iter().map(|l| format!("{p}{l}")).collect();
            out.push(format!("{p}{lhs_text} {} {rhs_text};", op.c_text()));
            Ok(out)
        }
        Stmt::ExprStmt(expr) => {
            let Expr::Suspendible(_) = expr else {
                return Err(BackendError::BadSourceForm(
                    "expression statement must be a suspendible call".to_string(),
                ));
            };
            let (prologue, rewritten) = suspend::hoist(ctx, fs, expr)?;
            for _ in 0..suspend::count_temp_reads(&rewritten) {
                fs.consume_temp();
            }
            Ok(prologue.into_iter().map(|l| format!("{p}{l}")).collect())
        }
        Stmt::Var { name, ty, init } => {
            let ident = format!("v_{}", ctx.tm.resolve(*name));
            let decl = ty.render_decl(ctx.cfg, ctx.pkg_name, &ident)?;
            let mut out = Vec::new();
            match init {
                Some(init_expr) => {
                    let (prologue, init2) = suspend::hoist(ctx, fs, init_expr)?;
                    out.extend(prologue.into_iter().map(|l| format!("{p}{l}")));
                    let init_text = expressions::lower(ctx, &init2)?;
                    for _ in 0..suspend::count_temp_reads(&init2) {
                        fs.consume_temp();
                    }
                    out.push(format!("{p}{decl} = {init_text};"));
                }
                None if ty.array_len.is_some() => {
                    out.push(format!("{p}{decl};"));
                    let n = ty.array_len.unwrap();
                    let loop_var = format!("i_{}", ctx.tm.resolve(*name));
                    out.push(format!("{p}{{"));
                    out.push(format!("{p}    uint32_t {loop_var};"));
                    out.push(format!(
                        "{p}    for ({loop_var} = 0; {loop_var} < {n}; {loop_var}++) {{"
                    ));
                    out.push(format!("{p}        {ident}[{loop_var}] = 0;"));
                    out.push(format!("{p}    }}"));
                    out.push(format!("{p}}}"));
                }
                None => {
                    out.push(format!("{p}{decl} = 0;"));
                }
            }
            Ok(out)
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            if else_if_depth > ctx.cfg.max_else_if {
                return Err(BackendError::TooDeep(format!(
                    "if/else-if chain nests more than {} conjuncts",
                    ctx.cfg.max_else_if
                )));
            }
            let (prologue, cond2) = suspend::hoist(ctx, fs, cond)?;
            let cond_text = expressions::lower(ctx, &cond2)?;
            for _ in 0..suspend::count_temp_reads(&cond2) {
                fs.consume_temp();
            }
            let mut out: Vec<String> = prologue.into_iter().map(|l| format!("{p}{l}")).collect();
            out.push(format!("{p}if ({cond_text}) {{"));
            out.extend(lower_block_at(ctx, fs, then_branch, indent + 1, 0)?);
            match else_branch {
                None => out.push(format!("{p}}}")),
                Some(stmts) if stmts.len() == 1 && matches!(stmts[0], Stmt::If { .. }) => {
                    out.push(format!("{p}}} else"));
                    out.extend(lower_stmt(ctx, fs, &stmts[0], indent, else_if_depth + 1)?);
                }
                Some(stmts) => {
                    out.push(format!("{p}}} else {{"));
                    out.extend(lower_block_at(ctx, fs, stmts, indent + 1, 0)?);
                    out.push(format!("{p}}}"));
                }
            }
            Ok(out)
        }
        Stmt::While {
            cond,
            body,
            id,
            is_break_target,
            is_continue_target,
        } => {
            if contains_suspendible(cond) {
                return Err(BackendError::Unsupported(
                    "suspendible expressions in a while condition".to_string(),
                ));
            }
            let label_id = fs.jump_target(*id)?;
            let cond_text = expressions::lower(ctx, cond)?;
            let mut out = Vec::new();
            if *is_continue_target {
                out.push(format!("{p}label_{label_id}_continue:;"));
            }
            out.push(format!("{p}while ({cond_text}) {{"));
            out.extend(lower_block_at(ctx, fs, body, indent + 1, 0)?);
            out.push(format!("{p}}}"));
            if *is_break_target {
                out.push(format!("{p}label_{label_id}_break:;"));
            }
            Ok(out)
        }
        Stmt::Break(loop_ref) => {
            let label_id = fs.jump_target(loop_ref.0)?;
            Ok(vec![format!("{p}goto label_{label_id}_break;")])
        }
        Stmt::Continue(loop_ref) => {
            let label_id = fs.jump_target(loop_ref.0)?;
            Ok(vec![format!("{p}goto label_{label_id}_continue;")])
        }
        Stmt::Return(status) => {
            let name = match status {
                None => ctx.status_name(builtin::OK).map(str::to_string),
                Some(s) => ctx
                    .collected
                    .status_map
                    .get(&s.message)
                    .map(|found| found.mangled_name.clone())
                    .or_else(|| ctx.status_name(&s.message).map(str::to_string)),
            };
            let Some(name) = name else {
                return Err(BackendError::InternalInvariant(format!(
                    "return references unknown status '{}'",
                    status.as_ref().map(|s| s.message.as_str()).unwrap_or("ok")
                )));
            };
            if !fs.is_suspendible {
                return Ok(vec![format!("{p}return;")]);
            }
            if fs.is_public {
                Ok(vec![format!("{p}status = {name};"), format!("{p}goto cleanup0;")])
            } else {
                Ok(vec![format!("{p}return {name};")])
            }
        }
    }
}

fn lower_block_at(
    ctx: &Ctx,
    fs: &mut FuncScratch,
    stmts: &[Stmt],
    indent: usize,
    else_if_depth: usize,
) -> Result<Vec<String>, BackendError> {
    let mut out = Vec::new();
    for stmt in stmts {
        out.extend(lower_stmt(ctx, fs, stmt, indent, else_if_depth)?);
    }
    Ok(out)
}
