//! Identifier interner.
//!
//! The rest of this backend treats the interner as a borrowed external
//! collaborator exposing only id→name lookup and id equality.
//! This module is a concrete, minimal implementation of that capability so
//! the backend is self-testable without a real upstream parser: intern a
//! name once, hand back a small `Copy` id, compare ids instead of strings
//! everywhere downstream.

use std::collections::HashMap;

/// An interned identifier. Cheap to copy and compare; never re-mangled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ident(u32);

/// Maps interned identifiers to their source text.
///
/// Dedupes by content on intern, the same way a runtime-symbol
/// interner dedupes LLVM global names by string content before emitting a
/// new one.
#[derive(Debug, Default, Clone)]
pub struct Interner {
    names: Vec<String>,
    by_name: HashMap<String, Ident>,
}

impl Interner {
    /// Create an empty interner.
    pub fn new() -> Self {
        Interner::default()
    }

    /// Intern `name`, returning the existing id if already seen.
    pub fn intern(&mut self, name: &str) -> Ident {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = Ident(self.names.len() as u32);
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Resolve an id back to its source text.
    ///
    /// # Panics
    /// Panics if `id` was not produced by this interner — a caller passing
    /// an id from a different `Interner` is a programming error, not a
    /// recoverable backend error.
    pub fn resolve(&self, id: Ident) -> &str {
        &self.names[id.0 as usize]
    }
}
