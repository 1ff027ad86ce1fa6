//! Status codes.
//!
//! A status is a non-positive 32-bit value where the least significant bit
//! is 1 iff the status is a fatal error. Built-in statuses occupy indices
//! `0..builtins().len()`; user-defined statuses start at [`USER_BASE`]. The
//! built-in ordering below is an ABI contract: never reorder, only append.

use crate::mangle::mangle_status;

/// Index at which user-defined statuses begin. Reserves `0..128` for future
/// built-in statuses.
pub const USER_BASE: i64 = 128;

/// One status code: a recoverable "status" or a fatal "error".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// The full C identifier, e.g. `puffs_foo_error_bad_magic`.
    pub mangled_name: String,
    /// The human-readable message, unprefixed, e.g. `"bad magic"`.
    pub message: String,
    /// True iff this status is fatal (lsb of `value` is 1).
    pub is_error: bool,
    /// The numeric status value, always `<= 0`.
    pub value: i64,
}

impl Status {
    /// The package-prefixed display string emitted by `status_string`,
    /// e.g. `"foo: bad magic"`.
    pub fn display_string(&self, pkg: &str) -> String {
        format!("{pkg}: {}", self.message)
    }
}

/// Compute the numeric value for a status at position `index` in its
/// partition (built-in or user), using the `-2*i(+1)` scheme.
fn status_value(index: i64, is_error: bool) -> i64 {
    -2 * index + i64::from(is_error)
}

/// The fixed built-in status table, in ABI-contract order.
///
/// `bad version` is forced to `is_error = true` even though only
/// `unexpected EOF` and `closed for writes` read as errors on their face:
/// the invariant that code -1 is always `bad version`, combined with "lsb
/// of any status value is 1 iff the status is an error", only holds if
/// `bad version` is itself a fatal status. See DESIGN.md.
/// Number of entries in [`BUILTIN_DEFS`], i.e. where the user-defined
/// partition of [`builtin_statuses`]'s caller-appended statuses begins.
pub const BUILTIN_COUNT: usize = 9;

const BUILTIN_DEFS: &[(&str, bool)] = &[
    ("ok", false),
    ("bad version", true),
    ("bad receiver", false),
    ("bad argument", false),
    ("constructor not called", false),
    ("unexpected EOF", true),
    ("short read", false),
    ("short write", false),
    ("closed for writes", true),
];

/// Well-known builtin status messages, for lookup by call-shape matchers in
/// `codegen::suspend` without restringing literals everywhere.
pub mod builtin {
    pub const OK: &str = "ok";
    pub const UNEXPECTED_EOF: &str = "unexpected EOF";
    pub const SHORT_READ: &str = "short read";
    pub const SHORT_WRITE: &str = "short write";
    pub const CLOSED_FOR_WRITES: &str = "closed for writes";
    pub const BAD_ARGUMENT: &str = "bad argument";
    pub const BAD_RECEIVER: &str = "bad receiver";
    pub const CONSTRUCTOR_NOT_CALLED: &str = "constructor not called";
}

/// Build the built-in status list for package `pkg`.
pub fn builtin_statuses(pkg: &str) -> Vec<Status> {
    BUILTIN_DEFS
        .iter()
        .enumerate()
        .map(|(i, (message, is_error))| Status {
            mangled_name: mangle_status(pkg, *is_error, message),
            message: (*message).to_string(),
            is_error: *is_error,
            value: status_value(i as i64, *is_error),
        })
        .collect()
}

/// Build one user-defined status, at position `index` within the
/// user-defined partition (0-based, in source declaration order).
pub fn user_status(pkg: &str, index: usize, is_error: bool, message: &str) -> Status {
    Status {
        mangled_name: mangle_status(pkg, is_error, message),
        message: message.to_string(),
        is_error,
        value: status_value(USER_BASE + index as i64, is_error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_count_matches_table_length() {
        assert_eq!(BUILTIN_COUNT, BUILTIN_DEFS.len());
    }

    #[test]
    fn ok_is_zero() {
        let statuses = builtin_statuses("foo");
        assert_eq!(statuses[0].message, "ok");
        assert_eq!(statuses[0].value, 0);
        assert!(!statuses[0].is_error);
    }

    #[test]
    fn bad_version_is_minus_one_and_error() {
        let statuses = builtin_statuses("foo");
        assert_eq!(statuses[1].message, "bad version");
        assert_eq!(statuses[1].value, -1);
        assert!(statuses[1].is_error);
    }

    #[test]
    fn lsb_matches_is_error_for_all_builtins() {
        for s in builtin_statuses("foo") {
            assert_eq!(s.value & 1 == 1, s.is_error, "{}", s.message);
            assert!(s.value <= 0);
        }
    }

    #[test]
    fn user_status_offset_and_mangling() {
        let s = user_status("foo", 0, true, "bad magic");
        assert_eq!(s.value, -2 * 128 + 1);
        assert_eq!(s.value, -255);
        assert_eq!(s.mangled_name, "puffs_foo_error_bad_magic");
        assert_eq!(s.display_string("foo"), "foo: bad magic");
    }
}
