//! JSON input format for the demo binary.
//!
//! The backend's real input is an AST handed to it in-process by an
//! upstream parser/type-checker; this crate has none, so the `puffsgen`
//! binary accepts the same tree shape serialized as JSON, with identifiers
//! spelled out as plain strings instead of pre-interned [`Ident`]s. Parsing
//! a string into this shape is `serde_json`'s job; turning it into the
//! domain [`Package`] — interning every name exactly once — is this
//! module's only job. No validation beyond shape lives here: a malformed
//! tree surfaces as whatever `BackendError` the collector or an emitter
//! raises once it has a chance to look at it.

use serde::Deserialize;

use crate::ast::{
    AssignOp, Decl, Expr, Field, File, FuncDef, Literal, LoopId, LoopRef, Op, Package, Param,
    Stmt, StatusDecl, StatusRef, StructDef, SuspendibleCall,
};
use crate::interner::Interner;
use crate::types::{BaseType, Numeric, TypeExpr};

#[derive(Deserialize)]
pub struct WirePackage {
    pub name: String,
    pub files: Vec<WireFile>,
}

#[derive(Deserialize)]
pub struct WireFile {
    pub decls: Vec<WireDecl>,
}

#[derive(Deserialize)]
#[serde(tag = "kind")]
pub enum WireDecl {
    Struct(WireStructDef),
    Func(WireFuncDef),
    Status { is_error: bool, message: Option<String> },
}

#[derive(Deserialize)]
pub struct WireStructDef {
    pub name: String,
    pub fields: Vec<WireField>,
    pub is_public: bool,
    pub is_suspendible: bool,
}

#[derive(Deserialize)]
pub struct WireField {
    pub name: String,
    pub ty: WireType,
    #[serde(default)]
    pub non_zero_default: bool,
}

#[derive(Deserialize)]
pub struct WireType {
    pub base: WireBaseType,
    #[serde(default)]
    pub bounds: Option<(i128, i128)>,
    #[serde(default)]
    pub pointers: usize,
    #[serde(default)]
    pub array_len: Option<u64>,
}

#[derive(Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum WireBaseType {
    Numeric(Numeric),
    Package(String),
}

#[derive(Deserialize)]
pub struct WireFuncDef {
    #[serde(default)]
    pub receiver: Option<String>,
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<WireParam>,
    #[serde(default)]
    pub body: Vec<WireStmt>,
    pub is_public: bool,
    pub is_suspendible: bool,
}

#[derive(Deserialize)]
pub struct WireParam {
    pub name: String,
    pub ty: WireType,
}

#[derive(Deserialize)]
#[serde(tag = "kind")]
pub enum WireStmt {
    Assert,
    Assign {
        lhs: WireExpr,
        op: AssignOp,
        rhs: WireExpr,
    },
    ExprStmt { expr: WireExpr },
    If {
        cond: WireExpr,
        then_branch: Vec<WireStmt>,
        #[serde(default)]
        else_branch: Option<Vec<WireStmt>>,
    },
    Break { loop_id: u32 },
    Continue { loop_id: u32 },
    Return {
        #[serde(default)]
        status: Option<WireStatusRef>,
    },
    Var {
        name: String,
        ty: WireType,
        #[serde(default)]
        init: Option<WireExpr>,
    },
    While {
        cond: WireExpr,
        body: Vec<WireStmt>,
        id: u32,
        is_break_target: bool,
        is_continue_target: bool,
    },
}

#[derive(Deserialize)]
pub struct WireStatusRef {
    pub is_error: bool,
    pub message: String,
}

#[derive(Deserialize)]
#[serde(tag = "kind")]
pub enum WireExpr {
    Literal { value: WireLiteral },
    This,
    InArg { name: String },
    Local { name: String },
    Field { base: Box<WireExpr>, field: String },
    Index { base: Box<WireExpr>, index: Box<WireExpr> },
    Unary { op: Op, operand: Box<WireExpr> },
    Binary { op: Op, lhs: Box<WireExpr>, rhs: Box<WireExpr> },
    Cast { operand: Box<WireExpr>, ty: WireType },
    LowBits { base: Box<WireExpr>, n: Box<WireExpr> },
    Suspendible { call: WireSuspendibleCall },
}

#[derive(Deserialize)]
#[serde(untagged)]
pub enum WireLiteral {
    Bool(bool),
    Int(i64),
}

#[derive(Deserialize)]
#[serde(tag = "kind")]
pub enum WireSuspendibleCall {
    ReadU8 { src: String },
    Write { dst: String, payload: Box<WireExpr> },
    WriteU8 { dst: String, value: Box<WireExpr> },
    MethodCall { method: String, args: Vec<(String, String)> },
}

/// Intern every identifier in `wire` and build the domain [`Package`] it
/// describes.
pub fn to_package(wire: WirePackage) -> Package {
    let mut tm = Interner::new();
    let files = wire
        .files
        .into_iter()
        .map(|f| File {
            decls: f.decls.into_iter().map(|d| lower_decl(&mut tm, d)).collect(),
        })
        .collect();
    Package {
        name: wire.name,
        files,
        interner: tm,
    }
}

fn lower_decl(tm: &mut Interner, decl: WireDecl) -> Decl {
    match decl {
        WireDecl::Struct(s) => Decl::Struct(lower_struct(tm, s)),
        WireDecl::Func(f) => Decl::Func(lower_func(tm, f)),
        WireDecl::Status { is_error, message } => Decl::Status(StatusDecl { is_error, message }),
    }
}

fn lower_struct(tm: &mut Interner, s: WireStructDef) -> StructDef {
    StructDef {
        name: tm.intern(&s.name),
        fields: s
            .fields
            .into_iter()
            .map(|f| Field {
                name: tm.intern(&f.name),
                ty: lower_type(f.ty),
                non_zero_default: f.non_zero_default.then_some(()),
            })
            .collect(),
        is_public: s.is_public,
        is_suspendible: s.is_suspendible,
    }
}

fn lower_type(ty: WireType) -> TypeExpr {
    let base = match ty.base {
        WireBaseType::Numeric(n) => BaseType::Numeric(n),
        WireBaseType::Package(name) => BaseType::Package(name),
    };
    TypeExpr {
        base,
        bounds: ty.bounds,
        pointers: ty.pointers,
        array_len: ty.array_len,
    }
}

fn lower_func(tm: &mut Interner, f: WireFuncDef) -> FuncDef {
    FuncDef {
        receiver: f.receiver.map(|r| tm.intern(&r)),
        name: tm.intern(&f.name),
        inputs: f
            .inputs
            .into_iter()
            .map(|p| Param {
                name: tm.intern(&p.name),
                ty: lower_type(p.ty),
            })
            .collect(),
        body: f.body.into_iter().map(|s| lower_stmt(tm, s)).collect(),
        is_public: f.is_public,
        is_suspendible: f.is_suspendible,
    }
}

fn lower_stmt(tm: &mut Interner, stmt: WireStmt) -> Stmt {
    match stmt {
        WireStmt::Assert => Stmt::Assert,
        WireStmt::Assign { lhs, op, rhs } => Stmt::Assign {
            lhs: lower_expr(tm, lhs),
            op,
            rhs: lower_expr(tm, rhs),
        },
        WireStmt::ExprStmt { expr } => Stmt::ExprStmt(lower_expr(tm, expr)),
        WireStmt::If {
            cond,
            then_branch,
            else_branch,
        } => Stmt::If {
            cond: lower_expr(tm, cond),
            then_branch: then_branch.into_iter().map(|s| lower_stmt(tm, s)).collect(),
            else_branch: else_branch.map(|stmts| stmts.into_iter().map(|s| lower_stmt(tm, s)).collect()),
        },
        WireStmt::Break { loop_id } => Stmt::Break(LoopRef(LoopId(loop_id))),
        WireStmt::Continue { loop_id } => Stmt::Continue(LoopRef(LoopId(loop_id))),
        WireStmt::Return { status } => Stmt::Return(status.map(|s| StatusRef {
            is_error: s.is_error,
            message: s.message,
        })),
        WireStmt::Var { name, ty, init } => Stmt::Var {
            name: tm.intern(&name),
            ty: lower_type(ty),
            init: init.map(|e| lower_expr(tm, e)),
        },
        WireStmt::While {
            cond,
            body,
            id,
            is_break_target,
            is_continue_target,
        } => Stmt::While {
            cond: lower_expr(tm, cond),
            body: body.into_iter().map(|s| lower_stmt(tm, s)).collect(),
            id: LoopId(id),
            is_break_target,
            is_continue_target,
        },
    }
}

fn lower_expr(tm: &mut Interner, expr: WireExpr) -> Expr {
    match expr {
        WireExpr::Literal { value } => Expr::Literal(match value {
            WireLiteral::Bool(b) => Literal::Bool(b),
            WireLiteral::Int(i) => Literal::Int(i),
        }),
        WireExpr::This => Expr::This,
        WireExpr::InArg { name } => Expr::InArg(tm.intern(&name)),
        WireExpr::Local { name } => Expr::Local(tm.intern(&name)),
        WireExpr::Field { base, field } => Expr::Field {
            base: Box::new(lower_expr(tm, *base)),
            field: tm.intern(&field),
        },
        WireExpr::Index { base, index } => Expr::Index {
            base: Box::new(lower_expr(tm, *base)),
            index: Box::new(lower_expr(tm, *index)),
        },
        WireExpr::Unary { op, operand } => Expr::Unary {
            op,
            operand: Box::new(lower_expr(tm, *operand)),
        },
        WireExpr::Binary { op, lhs, rhs } => Expr::Binary {
            op,
            lhs: Box::new(lower_expr(tm, *lhs)),
            rhs: Box::new(lower_expr(tm, *rhs)),
        },
        WireExpr::Cast { operand, ty } => Expr::Cast {
            operand: Box::new(lower_expr(tm, *operand)),
            ty: lower_type(ty),
        },
        WireExpr::LowBits { base, n } => Expr::LowBits {
            base: Box::new(lower_expr(tm, *base)),
            n: Box::new(lower_expr(tm, *n)),
        },
        WireExpr::Suspendible { call } => Expr::Suspendible(lower_call(tm, call)),
    }
}

fn lower_call(tm: &mut Interner, call: WireSuspendibleCall) -> SuspendibleCall {
    match call {
        WireSuspendibleCall::ReadU8 { src } => SuspendibleCall::ReadU8 { src: tm.intern(&src) },
        WireSuspendibleCall::Write { dst, payload } => SuspendibleCall::Write {
            dst: tm.intern(&dst),
            payload: Box::new(lower_expr(tm, *payload)),
        },
        WireSuspendibleCall::WriteU8 { dst, value } => SuspendibleCall::WriteU8 {
            dst: tm.intern(&dst),
            value: Box::new(lower_expr(tm, *value)),
        },
        WireSuspendibleCall::MethodCall { method, args } => SuspendibleCall::MethodCall {
            method: tm.intern(&method),
            args: args
                .into_iter()
                .map(|(a, l)| (tm.intern(&a), tm.intern(&l)))
                .collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_minimal_package() {
        let json = r#"{
            "name": "foo",
            "files": [{
                "decls": [{
                    "kind": "Func",
                    "name": "reset",
                    "is_public": true,
                    "is_suspendible": false
                }]
            }]
        }"#;
        let wire: WirePackage = serde_json::from_str(json).unwrap();
        let pkg = to_package(wire);
        assert_eq!(pkg.name, "foo");
        assert_eq!(pkg.files.len(), 1);
        assert!(matches!(pkg.files[0].decls[0], Decl::Func(_)));
    }

    #[test]
    fn rejects_malformed_json() {
        let result: Result<WirePackage, _> = serde_json::from_str("{ not json");
        assert!(result.is_err());
    }
}
