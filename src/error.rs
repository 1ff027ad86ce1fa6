//! Backend error taxonomy.
//!
//! Every error the backend can raise is a variant of [`BackendError`]. None
//! of them are swallowed internally: every fallible entry point in this
//! crate returns `Result<_, BackendError>` and propagates with `?`.

use std::fmt;

/// A backend error, covering every backend failure mode.
#[derive(Debug)]
pub enum BackendError {
    /// A status declaration's message was not a quoted string literal, or
    /// some other assumption about AST shape failed.
    BadSourceForm(String),
    /// The struct dependency graph contains a cycle.
    CyclicStructs(String),
    /// A language feature this backend does not implement.
    Unsupported(String),
    /// Local-variable pre-scan recursed past `BackendConfig::max_body_depth`.
    BodyTooDeep(String),
    /// Expression lowering recursed past `BackendConfig::max_expr_depth`.
    ExprTooDeep(String),
    /// An `if`/`else if` chain nested past `BackendConfig::max_else_if`.
    TooDeep(String),
    /// A function used more than `BackendConfig::max_jump_targets` distinct
    /// `while` loops as break/continue targets.
    TooManyJumpTargets(String),
    /// A function hoisted more than `BackendConfig::max_temp` suspendible
    /// calls.
    TooManyTemporaries(String),
    /// A pointer type nested more than `BackendConfig::max_pointers` levels.
    TooManyPointers(String),
    /// A self-check failed (e.g. `tempW != tempR` at function end). This
    /// indicates a bug in the backend, not in the input AST.
    InternalInvariant(String),
    /// The external formatter subprocess failed to spawn or exited non-zero.
    FormatterFailed(String),
    /// Propagated failure while writing to the in-memory output buffer.
    Format(fmt::Error),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::BadSourceForm(s) => write!(f, "bad source form: {s}"),
            BackendError::CyclicStructs(s) => write!(f, "cyclic struct definitions: {s}"),
            BackendError::Unsupported(s) => write!(f, "unsupported: {s}"),
            BackendError::BodyTooDeep(s) => write!(f, "function body too deep: {s}"),
            BackendError::ExprTooDeep(s) => write!(f, "expression too deep: {s}"),
            BackendError::TooDeep(s) => write!(f, "if/else-if chain too deep: {s}"),
            BackendError::TooManyJumpTargets(s) => write!(f, "too many jump targets: {s}"),
            BackendError::TooManyTemporaries(s) => write!(f, "too many temporaries: {s}"),
            BackendError::TooManyPointers(s) => write!(f, "too many pointer levels: {s}"),
            BackendError::InternalInvariant(s) => write!(f, "internal invariant violated: {s}"),
            BackendError::FormatterFailed(s) => write!(f, "formatter failed: {s}"),
            BackendError::Format(e) => write!(f, "output buffer write error: {e}"),
        }
    }
}

impl std::error::Error for BackendError {}

impl From<fmt::Error> for BackendError {
    fn from(e: fmt::Error) -> Self {
        BackendError::Format(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let e = BackendError::Unsupported("slice expressions".into());
        assert_eq!(e.to_string(), "unsupported: slice expressions");
    }

    #[test]
    fn format_error_wraps() {
        let fmt_err: BackendError = fmt::Error.into();
        assert!(matches!(fmt_err, BackendError::Format(_)));
    }
}
