//! Backend configuration.
//!
//! Resource caps default to fixed values, but are
//! overridable so embedders — and this crate's own tests — can exercise the
//! cap-exceeded error paths without constructing enormous ASTs.

use std::path::PathBuf;

/// Default recursion limit for expression lowering (`MaxExprDepth`).
pub const DEFAULT_MAX_EXPR_DEPTH: usize = 256;
/// Default recursion limit for the local-variable pre-scan (`MaxBodyDepth`).
pub const DEFAULT_MAX_BODY_DEPTH: usize = 256;
/// Default cap on hoisted suspendible-call temporaries per function.
pub const DEFAULT_MAX_TEMP: usize = 10_000;
/// Default cap on nested `else if` conjuncts.
pub const DEFAULT_MAX_ELSE_IF: usize = 1_000;
/// Default cap on distinct `while`-loop jump targets per function.
pub const DEFAULT_MAX_JUMP_TARGETS: usize = 1_000_000;
/// Default cap on nested pointer levels in a type.
pub const DEFAULT_MAX_POINTERS: usize = 16;

/// Resource caps and formatter configuration for a backend invocation.
///
/// Construct with [`BackendConfig::new`] and adjust with the `with_*`
/// builder methods; all caps default to fixed values.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub(crate) max_expr_depth: usize,
    pub(crate) max_body_depth: usize,
    pub(crate) max_temp: usize,
    pub(crate) max_else_if: usize,
    pub(crate) max_jump_targets: usize,
    pub(crate) max_pointers: usize,
    pub(crate) formatter_path: Option<PathBuf>,
    pub(crate) skip_format: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            max_expr_depth: DEFAULT_MAX_EXPR_DEPTH,
            max_body_depth: DEFAULT_MAX_BODY_DEPTH,
            max_temp: DEFAULT_MAX_TEMP,
            max_else_if: DEFAULT_MAX_ELSE_IF,
            max_jump_targets: DEFAULT_MAX_JUMP_TARGETS,
            max_pointers: DEFAULT_MAX_POINTERS,
            formatter_path: None,
            skip_format: false,
        }
    }
}

impl BackendConfig {
    /// Create a configuration with every cap at its default value.
    pub fn new() -> Self {
        BackendConfig::default()
    }

    /// Override the expression-lowering recursion cap.
    pub fn with_max_expr_depth(mut self, n: usize) -> Self {
        self.max_expr_depth = n;
        self
    }

    /// Override the local-declaration pre-scan recursion cap.
    pub fn with_max_body_depth(mut self, n: usize) -> Self {
        self.max_body_depth = n;
        self
    }

    /// Override the per-function hoisted-temporary cap.
    pub fn with_max_temp(mut self, n: usize) -> Self {
        self.max_temp = n;
        self
    }

    /// Override the `if`/`else if` chain depth cap.
    pub fn with_max_else_if(mut self, n: usize) -> Self {
        self.max_else_if = n;
        self
    }

    /// Override the per-function jump-target cap.
    pub fn with_max_jump_targets(mut self, n: usize) -> Self {
        self.max_jump_targets = n;
        self
    }

    /// Override the pointer-nesting cap.
    pub fn with_max_pointers(mut self, n: usize) -> Self {
        self.max_pointers = n;
        self
    }

    /// Use a specific formatter binary instead of `clang-format` on PATH.
    pub fn with_formatter_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.formatter_path = Some(path.into());
        self
    }

    /// Skip invoking the external formatter; `generate` returns the raw,
    /// unformatted (but syntactically valid) C text.
    pub fn no_format(mut self) -> Self {
        self.skip_format = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_fixed_caps() {
        let c = BackendConfig::new();
        assert_eq!(c.max_temp, 10_000);
        assert_eq!(c.max_jump_targets, 1_000_000);
        assert_eq!(c.max_pointers, 16);
        assert_eq!(c.max_else_if, 1_000);
        assert!(!c.skip_format);
    }

    #[test]
    fn builder_overrides_caps() {
        let c = BackendConfig::new()
            .with_max_temp(4)
            .with_max_pointers(2)
            .no_format();
        assert_eq!(c.max_temp, 4);
        assert_eq!(c.max_pointers, 2);
        assert!(c.skip_format);
    }
}
