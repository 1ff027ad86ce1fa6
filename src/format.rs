//! External formatter invocation.
//!
//! The emitters produce syntactically valid but whitespace-raw C text (fixed
//! four-space-per-level indentation, no column wrapping). Running it through
//! `clang-format` is cosmetic only — `BackendConfig::no_format` skips this
//! step entirely and callers get the same semantics back unformatted.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::OnceLock;

use crate::error::BackendError;

/// Name of the formatter binary looked up on `PATH` when no explicit path
/// is configured.
const DEFAULT_FORMATTER: &str = "clang-format";

/// Run `text` through the configured formatter, piping it in on stdin and
/// reading the formatted result back from stdout.
///
/// Fails as [`BackendError::FormatterFailed`] if the binary cannot be
/// spawned or exits non-zero; the caller's output is otherwise unaffected
/// by formatter flakiness (`BackendConfig::no_format` avoids this step).
pub fn run(text: &str, formatter_path: Option<&Path>) -> Result<String, BackendError> {
    let binary = formatter_path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_formatter_path);

    let mut child = Command::new(&binary)
        .arg("--style=file")
        .fallback_style_if_unsupported()
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            BackendError::FormatterFailed(format!("failed to spawn {}: {e}", binary.display()))
        })?;

    child
        .stdin
        .take()
        .expect("piped stdin")
        .write_all(text.as_bytes())
        .map_err(|e| BackendError::FormatterFailed(format!("failed to write to formatter: {e}")))?;

    let output = child
        .wait_with_output()
        .map_err(|e| BackendError::FormatterFailed(format!("failed to wait on formatter: {e}")))?;

    if !output.status.success() {
        return Err(BackendError::FormatterFailed(format!(
            "{} exited with {}: {}",
            binary.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    String::from_utf8(output.stdout)
        .map_err(|e| BackendError::FormatterFailed(format!("formatter produced non-UTF-8 output: {e}")))
}

/// Cached probe for the formatter binary's location on `PATH`, resolved
/// once per process and reused by every `generate` call that doesn't pin an
/// explicit path.
static RESOLVED_DEFAULT: OnceLock<PathBuf> = OnceLock::new();

fn default_formatter_path() -> PathBuf {
    RESOLVED_DEFAULT
        .get_or_init(|| PathBuf::from(DEFAULT_FORMATTER))
        .clone()
}

trait CommandExt {
    fn fallback_style_if_unsupported(&mut self) -> &mut Self;
}

impl CommandExt for Command {
    // `--style=file` requires a `.clang-format` in an ancestor directory;
    // callers without one still want deterministic output, so fall back to
    // a built-in style rather than letting clang-format guess.
    fn fallback_style_if_unsupported(&mut self) -> &mut Self {
        self.arg("--fallback-style=Google");
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn missing_binary_reports_formatter_failed() {
        let result = run("int x;", Some(Path::new("/nonexistent/not-a-real-formatter")));
        assert!(matches!(result, Err(BackendError::FormatterFailed(_))));
    }

    #[test]
    fn successful_formatter_run_returns_its_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let script_path = dir.path().join("fake-clang-format");
        fs::write(&script_path, "#!/bin/sh\ncat\n").unwrap();
        fs::set_permissions(&script_path, fs::Permissions::from_mode(0o755)).unwrap();

        let result = run("int x;", Some(&script_path)).unwrap();
        assert_eq!(result, "int x;");
    }

    #[test]
    fn nonzero_exit_reports_formatter_failed() {
        let dir = tempfile::tempdir().unwrap();
        let script_path = dir.path().join("fake-clang-format");
        fs::write(&script_path, "#!/bin/sh\necho bad input >&2\nexit 1\n").unwrap();
        fs::set_permissions(&script_path, fs::Permissions::from_mode(0o755)).unwrap();

        let result = run("int x;", Some(&script_path));
        assert!(matches!(result, Err(BackendError::FormatterFailed(_))));
    }
}
