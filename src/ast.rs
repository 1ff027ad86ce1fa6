//! Input AST types.
//!
//! This is the shape the backend expects from its upstream collaborators
//! (parser, type checker, bounds inference): a package name, an interned
//! identifier table, and an ordered list of files, each an ordered list of
//! top-level declarations. Node types form a closed sum; every node exposes
//! a `stringify` rendering used only in error messages, matching the
//! "finite set of kinds with a `string(tm)` rendering" contract.

use crate::interner::{Ident, Interner};
use crate::types::TypeExpr;

/// A single source file: an ordered list of top-level declarations.
#[derive(Debug, Clone)]
pub struct File {
    pub decls: Vec<Decl>,
}

/// A whole package: its name, the files that make it up, and the interner
/// that owns every identifier referenced from them.
#[derive(Debug, Clone)]
pub struct Package {
    pub name: String,
    pub files: Vec<File>,
    pub interner: Interner,
}

/// A top-level declaration.
#[derive(Debug, Clone)]
pub enum Decl {
    Struct(StructDef),
    Func(FuncDef),
    Status(StatusDecl),
}

/// `status "message"` or `error "message"`.
#[derive(Debug, Clone)]
pub struct StatusDecl {
    pub is_error: bool,
    /// The message, already unquoted. `None` if the source form was not a
    /// quoted string literal (the collector rejects this as
    /// `BadSourceForm`).
    pub message: Option<String>,
}

/// A struct field.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: Ident,
    pub ty: TypeExpr,
    /// A declared zero-valued default is represented as `None`; any other
    /// default is represented as `Some`, and is rejected by the struct
    /// layout emitter as `Unsupported`.
    pub non_zero_default: Option<()>,
}

/// A struct declaration.
#[derive(Debug, Clone)]
pub struct StructDef {
    pub name: Ident,
    pub fields: Vec<Field>,
    pub is_public: bool,
    pub is_suspendible: bool,
}

/// A function parameter.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: Ident,
    pub ty: TypeExpr,
}

/// A function declaration.
#[derive(Debug, Clone)]
pub struct FuncDef {
    pub receiver: Option<Ident>,
    pub name: Ident,
    pub inputs: Vec<Param>,
    pub body: Vec<Stmt>,
    pub is_public: bool,
    pub is_suspendible: bool,
}

/// A binary or unary operator, dispatched to a fixed C textual form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Shl,
    Shr,
    And,
    Or,
    Xor,
    Not,
    Neg,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LogicalAnd,
    LogicalOr,
}

impl Op {
    /// The fixed C textual form for this operator.
    pub fn c_text(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Mod => "%",
            Op::Shl => "<<",
            Op::Shr => ">>",
            Op::And => "&",
            Op::Or => "|",
            Op::Xor => "^",
            Op::Not => "~",
            Op::Neg => "-",
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::LogicalAnd => "&&",
            Op::LogicalOr => "||",
        }
    }

    /// True for the unary forms (`Not`, `Neg`); all others are binary.
    pub fn is_unary(self) -> bool {
        matches!(self, Op::Not | Op::Neg)
    }
}

/// The compound-assignment operator used by an `assign` statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ShlAssign,
    ShrAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    /// `~^=`, bit-clear-assign: not yet supported. Lowering emits a
    /// sentinel string and the caller should treat this as `Unsupported`.
    BitClearAssign,
}

impl AssignOp {
    /// The fixed C textual form, or a sentinel for the unsupported
    /// bit-clear-assign compound.
    pub fn c_text(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
            AssignOp::MulAssign => "*=",
            AssignOp::DivAssign => "/=",
            AssignOp::ShlAssign => "<<=",
            AssignOp::ShrAssign => ">>=",
            AssignOp::AndAssign => "&=",
            AssignOp::OrAssign => "|=",
            AssignOp::XorAssign => "^=",
            AssignOp::BitClearAssign => "/* unsupported: ~^= */",
        }
    }
}

/// A constant literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    UInt(u64),
}

/// An expression node. Forms a closed sum; exhaustive matches are expected
/// throughout lowering rather than dynamic dispatch.
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Literal),
    /// The pseudo-receiver `this`, lowering to `self->private_impl`.
    This,
    /// An `in.x` read, lowering to the argument `a_x`.
    InArg(Ident),
    /// Any other bare identifier, lowering to `v_NAME`.
    Local(Ident),
    /// `lhs.field`.
    Field { base: Box<Expr>, field: Ident },
    /// `base[index]`.
    Index { base: Box<Expr>, index: Box<Expr> },
    Unary { op: Op, operand: Box<Expr> },
    Binary { op: Op, lhs: Box<Expr>, rhs: Box<Expr> },
    /// `x as T`.
    Cast { operand: Box<Expr>, ty: TypeExpr },
    /// `x.low_bits(n)`, the one recognized non-suspendible method call.
    LowBits { base: Box<Expr>, n: Box<Expr> },
    /// A suspendible call (trailing `?`), recognized and lowered by
    /// `codegen::suspend`. Unrecognized shapes fail as `Unsupported`.
    Suspendible(SuspendibleCall),
    /// A reference to a hoisted suspendible-call result, e.g. `t_3`.
    /// Synthetic: never produced by an upstream parser, only introduced by
    /// `codegen::suspend`'s rewrite of an expression tree that contained a
    /// `Suspendible` node.
    TempRead(usize),
}

/// The suspendible-call shapes this backend recognizes (spec table, §4.8).
#[derive(Debug, Clone)]
pub enum SuspendibleCall {
    /// `in.src.read_u8?()`.
    ReadU8 { src: Ident },
    /// `in.dst.write?(x: <payload>)`.
    Write { dst: Ident, payload: Box<Expr> },
    /// `in.dst.write_u8?(x)`.
    WriteU8 { dst: Ident, value: Box<Expr> },
    /// `this.METHOD?(ARG: in.ARG, ...)`, a call to another suspendible
    /// method on the same receiver.
    MethodCall {
        method: Ident,
        args: Vec<(Ident, Ident)>,
    },
}

/// A statement node.
#[derive(Debug, Clone)]
pub enum Stmt {
    Assert,
    Assign { lhs: Expr, op: AssignOp, rhs: Expr },
    /// Valid only when `expr` is a suspendible call.
    ExprStmt(Expr),
    If {
        cond: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Option<Vec<Stmt>>,
    },
    Break(LoopRef),
    Continue(LoopRef),
    /// `return` with an optional status keyword; `None` lowers as
    /// `status_ok`.
    Return(Option<StatusRef>),
    Var {
        name: Ident,
        ty: TypeExpr,
        init: Option<Expr>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
        id: LoopId,
        is_break_target: bool,
        is_continue_target: bool,
    },
}

/// Identifies a `while` node for jump-target resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoopId(pub u32);

/// A `break`/`continue`'s reference to its enclosing loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopRef(pub LoopId);

/// A `return`'s reference to a named status: either a built-in message or a
/// user-defined one, resolved by the collector's status table.
#[derive(Debug, Clone)]
pub struct StatusRef {
    pub is_error: bool,
    pub message: String,
}

/// Renders a node for use only in error messages, per the
/// "`string(tm)` rendering" contract: never used in emitted C text.
pub trait Stringify {
    fn stringify(&self, tm: &Interner) -> String;
}

impl Stringify for Expr {
    fn stringify(&self, tm: &Interner) -> String {
        match self {
            Expr::Literal(Literal::Bool(b)) => b.to_string(),
            Expr::Literal(Literal::Int(i)) => i.to_string(),
            Expr::Literal(Literal::UInt(u)) => u.to_string(),
            Expr::This => "this".to_string(),
            Expr::InArg(id) => format!("in.{}", tm.resolve(*id)),
            Expr::Local(id) => tm.resolve(*id).to_string(),
            Expr::Field { base, field } => format!("{}.{}", base.stringify(tm), tm.resolve(*field)),
            Expr::Index { base, index } => format!("{}[{}]", base.stringify(tm), index.stringify(tm)),
            Expr::Unary { op, operand } => format!("{}{}", op.c_text(), operand.stringify(tm)),
            Expr::Binary { op, lhs, rhs } => {
                format!("({} {} {})", lhs.stringify(tm), op.c_text(), rhs.stringify(tm))
            }
            Expr::Cast { operand, .. } => format!("{} as T", operand.stringify(tm)),
            Expr::LowBits { base, n } => format!("{}.low_bits({})", base.stringify(tm), n.stringify(tm)),
            Expr::Suspendible(_) => "<suspendible call>".to_string(),
            Expr::TempRead(n) => format!("t_{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stringify_renders_field_access() {
        let mut tm = Interner::new();
        let field = tm.intern("count");
        let e = Expr::Field {
            base: Box::new(Expr::This),
            field,
        };
        assert_eq!(e.stringify(&tm), "this.count");
    }

    #[test]
    fn op_unary_classification() {
        assert!(Op::Not.is_unary());
        assert!(Op::Neg.is_unary());
        assert!(!Op::Add.is_unary());
    }
}
