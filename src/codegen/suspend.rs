//! Suspendible-call hoisting.
//!
//! A trailing-`?` call cannot be embedded in a C expression directly: it may
//! need to check a buffer precondition, set `status` and exit the function,
//! or (for call shapes that produce a value) stash the result somewhere a
//! later part of the same statement can still read it. `hoist` walks one
//! expression in strict left-to-right evaluation order (operands before the
//! operator, the callee before its own effect), rewriting every
//! [`Expr::Suspendible`] node it finds into an [`Expr::TempRead`] and
//! returning the C statement lines that must precede the statement the
//! expression lives in.

use crate::ast::{Expr, SuspendibleCall};
use crate::codegen::expressions;
use crate::codegen::funcstate::FuncScratch;
use crate::codegen::Ctx;
use crate::error::BackendError;
use crate::mangle;
use crate::status::builtin;

/// Hoist every suspendible call out of `expr`, in evaluation order.
/// Returns the prologue statements (already newline-free, one per line) and
/// the rewritten expression with each value-producing hoisted call replaced
/// by an [`Expr::TempRead`].
pub fn hoist(ctx: &Ctx, fs: &mut FuncScratch, expr: &Expr) -> Result<(Vec<String>, Expr), BackendError> {
    match expr {
        Expr::Suspendible(call) => lower_call_shape(ctx, fs, call),
        Expr::Binary { op, lhs, rhs } => {
            let (mut prologue, lhs2) = hoist(ctx, fs, lhs)?;
            let (rhs_prologue, rhs2) = hoist(ctx, fs, rhs)?;
            prologue.extend(rhs_prologue);
            Ok((
                prologue,
                Expr::Binary {
                    op: *op,
                    lhs: Box::new(lhs2),
                    rhs: Box::new(rhs2),
                },
            ))
        }
        Expr::Unary { op, operand } => {
            let (prologue, operand2) = hoist(ctx, fs, operand)?;
            Ok((
                prologue,
                Expr::Unary {
                    op: *op,
                    operand: Box::new(operand2),
                },
            ))
        }
        Expr::Field { base, field } => {
            let (prologue, base2) = hoist(ctx, fs, base)?;
            Ok((
                prologue,
                Expr::Field {
                    base: Box::new(base2),
                    field: *field,
                },
            ))
        }
        Expr::Index { base, index } => {
            let (mut prologue, base2) = hoist(ctx, fs, base)?;
            let (index_prologue, index2) = hoist(ctx, fs, index)?;
            prologue.extend(index_prologue);
            Ok((
                prologue,
                Expr::Index {
                    base: Box::new(base2),
                    index: Box::new(index2),
                },
            ))
        }
        Expr::Cast { operand, ty } => {
            let (prologue, operand2) = hoist(ctx, fs, operand)?;
            Ok((
                prologue,
                Expr::Cast {
                    operand: Box::new(operand2),
                    ty: ty.clone(),
                },
            ))
        }
        Expr::LowBits { base, n } => {
            let (mut prologue, base2) = hoist(ctx, fs, base)?;
            let (n_prologue, n2) = hoist(ctx, fs, n)?;
            prologue.extend(n_prologue);
            Ok((
                prologue,
                Expr::LowBits {
                    base: Box::new(base2),
                    n: Box::new(n2),
                },
            ))
        }
        Expr::Literal(_) | Expr::This | Expr::InArg(_) | Expr::Local(_) | Expr::TempRead(_) => {
            Ok((Vec::new(), expr.clone()))
        }
    }
}

/// Count the [`Expr::TempRead`] nodes in `expr`, so a caller that finally
/// consumes a hoisted result can keep `tempR` in step with `tempW`.
pub fn count_temp_reads(expr: &Expr) -> usize {
    match expr {
        Expr::TempRead(_) => 1,
        Expr::Binary { lhs, rhs, .. } => count_temp_reads(lhs) + count_temp_reads(rhs),
        Expr::Index { base, index } => count_temp_reads(base) + count_temp_reads(index),
        Expr::LowBits { base, n } => count_temp_reads(base) + count_temp_reads(n),
        Expr::Unary { operand, .. } | Expr::Field { base: operand, .. } | Expr::Cast { operand, .. } => {
            count_temp_reads(operand)
        }
        _ => 0,
    }
}

fn status_name(ctx: &Ctx, message: &str) -> Result<String, BackendError> {
    ctx.status_name(message).map(str::to_string).ok_or_else(|| {
        BackendError::InternalInvariant(format!("built-in status '{message}' is missing"))
    })
}

fn lower_call_shape(ctx: &Ctx, fs: &mut FuncScratch, call: &SuspendibleCall) -> Result<(Vec<String>, Expr), BackendError> {
    let exit = fs.exit_stmt();
    match call {
        SuspendibleCall::ReadU8 { src } => {
            let temp_id = fs.alloc_temp()?;
            let src_name = ctx.tm.resolve(*src);
            let unexpected_eof = status_name(ctx, builtin::UNEXPECTED_EOF)?;
            let short_read = status_name(ctx, builtin::SHORT_READ)?;
            let prologue = vec![
                format!("if (a_{src_name}->ri >= a_{src_name}->wi) {{"),
                format!("  status = a_{src_name}->closed ? {unexpected_eof} : {short_read};"),
                format!("  {exit}"),
                "}".to_string(),
                format!("t_{temp_id} = a_{src_name}->ptr[a_{src_name}->ri++];"),
            ];
            Ok((prologue, Expr::TempRead(temp_id)))
        }
        SuspendibleCall::WriteU8 { dst, value } => {
            let (mut prologue, value2) = hoist(ctx, fs, value)?;
            let dst_name = ctx.tm.resolve(*dst);
            let short_write = status_name(ctx, builtin::SHORT_WRITE)?;
            let value_text = expressions::lower(ctx, &value2)?;
            for _ in 0..count_temp_reads(&value2) {
                fs.consume_temp();
            }
            prologue.push(format!("if (a_{dst_name}->wi >= a_{dst_name}->len) {{"));
            prologue.push(format!("  status = {short_write};"));
            prologue.push(format!("  {exit}"));
            prologue.push("}".to_string());
            prologue.push(format!("a_{dst_name}->ptr[a_{dst_name}->wi++] = {value_text};"));
            Ok((prologue, Expr::Literal(crate::ast::Literal::Bool(true))))
        }
        SuspendibleCall::Write { dst, payload } => {
            let (mut prologue, payload2) = hoist(ctx, fs, payload)?;
            let dst_name = ctx.tm.resolve(*dst);
            let closed = status_name(ctx, builtin::CLOSED_FOR_WRITES)?;
            let short_write = status_name(ctx, builtin::SHORT_WRITE)?;
            let payload_text = expressions::lower(ctx, &payload2)?;
            for _ in 0..count_temp_reads(&payload2) {
                fs.consume_temp();
            }
            prologue.push(format!("if (a_{dst_name}->closed) {{"));
            prologue.push(format!("  status = {closed};"));
            prologue.push(format!("  {exit}"));
            prologue.push("}".to_string());
            prologue.push(format!(
                "if (a_{dst_name}->len - a_{dst_name}->wi < sizeof({payload_text})) {{"
            ));
            prologue.push(format!("  status = {short_write};"));
            prologue.push(format!("  {exit}"));
            prologue.push("}".to_string());
            prologue.push(format!(
                "memmove(a_{dst_name}->ptr + a_{dst_name}->wi, &({payload_text}), sizeof({payload_text}));"
            ));
            prologue.push(format!("a_{dst_name}->wi += sizeof({payload_text});"));
            Ok((prologue, Expr::Literal(crate::ast::Literal::Bool(true))))
        }
        SuspendibleCall::MethodCall { method, args } => {
            let receiver = fs.receiver_name.clone().ok_or_else(|| {
                BackendError::BadSourceForm(
                    "method call requires a receiver in scope".to_string(),
                )
            })?;
            let method_name = mangle::mangle(
                ctx.pkg_name,
                &format!("{receiver}_{}", ctx.tm.resolve(*method)),
            );
            let mut call_args = vec!["self".to_string()];
            for (_arg, local) in args {
                call_args.push(format!("a_{}", ctx.tm.resolve(*local)));
            }
            let prologue = vec![
                format!("status = {method_name}({});", call_args.join(", ")),
                "if (status) {".to_string(),
                format!("  {exit}"),
                "}".to_string(),
            ];
            Ok((prologue, Expr::Literal(crate::ast::Literal::Bool(true))))
        }
    }
}
