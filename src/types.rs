//! Type lowering.
//!
//! Maps a source type expression to a C type name, pointer decorations, and
//! a trailing array extent.

use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::mangle;

/// A fixed-width numeric base type, or `bool`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize)]
pub enum Numeric {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    Size,
    Bool,
}

impl Numeric {
    /// The C type name this numeric type lowers to.
    pub fn c_name(self) -> &'static str {
        match self {
            Numeric::I8 => "int8_t",
            Numeric::I16 => "int16_t",
            Numeric::I32 => "int32_t",
            Numeric::I64 => "int64_t",
            Numeric::U8 => "uint8_t",
            Numeric::U16 => "uint16_t",
            Numeric::U32 => "uint32_t",
            Numeric::U64 => "uint64_t",
            Numeric::Size => "size_t",
            Numeric::Bool => "bool",
        }
    }

    /// The type's natural (unrefined) inclusive range, used to elide
    /// argument-bounds checks that a refinement doesn't actually tighten.
    /// `None` for `bool`/`size_t`, which this backend never bounds-refines.
    pub fn natural_range(self) -> Option<(i128, i128)> {
        match self {
            Numeric::I8 => Some((i8::MIN as i128, i8::MAX as i128)),
            Numeric::I16 => Some((i16::MIN as i128, i16::MAX as i128)),
            Numeric::I32 => Some((i32::MIN as i128, i32::MAX as i128)),
            Numeric::I64 => Some((i64::MIN as i128, i64::MAX as i128)),
            Numeric::U8 => Some((0, u8::MAX as i128)),
            Numeric::U16 => Some((0, u16::MAX as i128)),
            Numeric::U32 => Some((0, u32::MAX as i128)),
            Numeric::U64 => Some((0, u64::MAX as i128)),
            Numeric::Size | Numeric::Bool => None,
        }
    }
}

/// The base of a type, before pointer/array decoration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseType {
    Numeric(Numeric),
    /// An opaque package-level struct, named by its undecorated source name.
    Package(String),
}

/// A source-level type expression: a base type plus pointer nesting, an
/// optional numeric bounds refinement, and an optional trailing array
/// extent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeExpr {
    pub base: BaseType,
    /// Inclusive refinement bounds, numeric base types only.
    pub bounds: Option<(i128, i128)>,
    /// Levels of pointer nesting; the innermost referent is `base`.
    pub pointers: usize,
    /// Trailing array length, if this is an array type.
    pub array_len: Option<u64>,
}

impl TypeExpr {
    /// A bare numeric type with no refinement, pointers, or array extent.
    pub fn numeric(n: Numeric) -> Self {
        TypeExpr {
            base: BaseType::Numeric(n),
            bounds: None,
            pointers: 0,
            array_len: None,
        }
    }

    /// A bare opaque package-struct type.
    pub fn package(name: impl Into<String>) -> Self {
        TypeExpr {
            base: BaseType::Package(name.into()),
            bounds: None,
            pointers: 0,
            array_len: None,
        }
    }

    /// Add one level of pointer nesting.
    pub fn pointer_to(mut self) -> Self {
        self.pointers += 1;
        self
    }

    /// Refine a numeric type's bounds.
    pub fn with_bounds(mut self, lo: i128, hi: i128) -> Self {
        self.bounds = Some((lo, hi));
        self
    }

    /// Turn this into a fixed-length array of itself.
    pub fn array_of(mut self, len: u64) -> Self {
        self.array_len = Some(len);
        self
    }

    fn base_c_name(&self, pkg: &str) -> String {
        match &self.base {
            BaseType::Numeric(n) => n.c_name().to_string(),
            BaseType::Package(name) => mangle::mangle(pkg, name),
        }
    }

    /// Render a full C declarator for `ident` having this type, e.g.
    /// `uint32_t f_count` or (inside-out, for a pointer-to-array)
    /// `uint8_t (*f_rows)[8]`.
    ///
    /// Fails with [`BackendError::TooManyPointers`] if pointer nesting
    /// exceeds `cfg.max_pointers`.
    pub fn render_decl(
        &self,
        cfg: &BackendConfig,
        pkg: &str,
        ident: &str,
    ) -> Result<String, BackendError> {
        if self.pointers > cfg.max_pointers {
            return Err(BackendError::TooManyPointers(format!(
                "{ident}: {} levels of pointer nesting exceeds cap of {}",
                self.pointers, cfg.max_pointers
            )));
        }
        let base = self.base_c_name(pkg);
        let stars: String = std::iter::repeat('*').take(self.pointers).collect();
        match self.array_len {
            None => Ok(format!("{base} {stars}{ident}")),
            Some(n) if self.pointers == 0 => Ok(format!("{base} {ident}[{n}]")),
            Some(n) => Ok(format!("{base} ({stars}{ident})[{n}]")),
        }
    }

    /// Render the bare type name, with no identifier (used for casts:
    /// `x as T` lowers to `((T)(x))`).
    pub fn render_cast(&self, cfg: &BackendConfig, pkg: &str) -> Result<String, BackendError> {
        if self.pointers > cfg.max_pointers {
            return Err(BackendError::TooManyPointers(format!(
                "cast target: {} levels of pointer nesting exceeds cap of {}",
                self.pointers, cfg.max_pointers
            )));
        }
        let base = self.base_c_name(pkg);
        let stars: String = std::iter::repeat('*').take(self.pointers).collect();
        Ok(format!("{base}{}{stars}", if self.pointers > 0 { " " } else { "" }))
    }

    /// Refinement bounds that actually narrow the base numeric type's
    /// natural range, i.e. the checks argument validation must still emit.
    pub fn effective_bounds(&self) -> Option<(Option<i128>, Option<i128>)> {
        let BaseType::Numeric(n) = &self.base else {
            return None;
        };
        let (lo, hi) = self.bounds?;
        let natural = n.natural_range();
        let lo_needed = match natural {
            Some((nlo, _)) => lo > nlo,
            None => true,
        };
        let hi_needed = match natural {
            Some((_, nhi)) => hi < nhi,
            None => true,
        };
        if !lo_needed && !hi_needed {
            return None;
        }
        Some((lo_needed.then_some(lo), hi_needed.then_some(hi)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_decl_renders() {
        let cfg = BackendConfig::new();
        let t = TypeExpr::numeric(Numeric::U32);
        assert_eq!(t.render_decl(&cfg, "foo", "f_count").unwrap(), "uint32_t f_count");
    }

    #[test]
    fn package_type_is_mangled() {
        let cfg = BackendConfig::new();
        let t = TypeExpr::package("reader");
        assert_eq!(
            t.render_decl(&cfg, "foo", "f_r").unwrap(),
            "puffs_foo_reader f_r"
        );
    }

    #[test]
    fn pointer_and_array_render_inside_out() {
        let cfg = BackendConfig::new();
        let t = TypeExpr::numeric(Numeric::U8).pointer_to().array_of(8);
        assert_eq!(
            t.render_decl(&cfg, "foo", "f_rows").unwrap(),
            "uint8_t (*f_rows)[8]"
        );
    }

    #[test]
    fn plain_array_renders_trailing_extent() {
        let cfg = BackendConfig::new();
        let t = TypeExpr::numeric(Numeric::U8).array_of(4);
        assert_eq!(t.render_decl(&cfg, "foo", "f_buf").unwrap(), "uint8_t f_buf[4]");
    }

    #[test]
    fn too_many_pointers_is_rejected() {
        let cfg = BackendConfig::new().with_max_pointers(2);
        let mut t = TypeExpr::numeric(Numeric::U8);
        for _ in 0..3 {
            t = t.pointer_to();
        }
        assert!(matches!(
            t.render_decl(&cfg, "foo", "x"),
            Err(BackendError::TooManyPointers(_))
        ));
    }

    #[test]
    fn redundant_bounds_are_elided() {
        // u8's natural range is 0..=255; refining to the same range adds nothing.
        let t = TypeExpr::numeric(Numeric::U8).with_bounds(0, 255);
        assert_eq!(t.effective_bounds(), None);
    }

    #[test]
    fn tightened_bounds_are_kept() {
        let t = TypeExpr::numeric(Numeric::U8).with_bounds(1, 200);
        assert_eq!(t.effective_bounds(), Some((Some(1), Some(200))));
    }

    #[test]
    fn one_sided_tightening_only_emits_that_side() {
        let t = TypeExpr::numeric(Numeric::U8).with_bounds(0, 200);
        assert_eq!(t.effective_bounds(), Some((None, Some(200))));
    }
}
