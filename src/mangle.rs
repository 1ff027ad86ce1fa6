//! Name mangler.
//!
//! Deterministic, collision-free (given the input conventions) mapping from
//! a source-level logical name to a C identifier. Pure function: mangling
//! the same name twice always yields the same result.

/// Prefix for a lowered function argument.
pub const PREFIX_ARG: &str = "a_";
/// Prefix for a lowered struct field.
pub const PREFIX_FIELD: &str = "f_";
/// Prefix for a lowered source-level local variable.
pub const PREFIX_LOCAL: &str = "v_";
/// Prefix for a hoisted suspendible-call-result temporary.
pub const PREFIX_TEMP: &str = "t_";

/// Mangle `name` into a C identifier scoped to package `pkg`.
///
/// Algorithm: prepend `puffs_<pkg>_`, then copy the input
/// character by character — lowercasing ASCII letters, preserving ASCII
/// digits and underscores, turning spaces into underscores, and dropping
/// everything else.
pub fn mangle(pkg: &str, name: &str) -> String {
    let mut out = String::with_capacity(name.len() + pkg.len() + 8);
    out.push_str("puffs_");
    out.push_str(pkg);
    out.push('_');
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push(c.to_ascii_lowercase());
        } else if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' {
            out.push(c);
        } else if c == ' ' {
            out.push('_');
        }
        // all other characters are dropped
    }
    out
}

/// Mangle the name of a user-defined status declaration:
/// `status|error` joined by a space to the quoted message, then mangled.
pub fn mangle_status(pkg: &str, is_error: bool, message: &str) -> String {
    let kind = if is_error { "error" } else { "status" };
    mangle(pkg, &format!("{kind} {message}"))
}
