//! Tag resolvers: pure functions from tagged scalar text to values.
//!
//! The shared first step is wrapper stripping (`${...}` for env lookups,
//! `$(...)` for shell expressions). Stripping returns a new string and never
//! mutates the input node.

use crate::error::ConfigError;
use crate::registry::{FenceId, FenceKind, PendingFences};
use crate::value::Value;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

pub const LIST_FENCE_START: &str = "[[";
pub const LIST_FENCE_END: &str = "]]";
pub const DICT_FENCE_START: &str = "{{";
pub const DICT_FENCE_END: &str = "}}";

/// Separator between a fence's placeholder and its source expression.
pub const FENCE_SEPARATOR: &str = "-->";

/// Options controlling `!SHELL` subprocess execution.
///
/// Commands run through `sh -c` with full process privileges; there is no
/// sandboxing or allow-listing. Callers loading untrusted documents must
/// treat this as a trust boundary.
#[derive(Debug, Clone, Default)]
pub struct ShellOptions {
    /// Kill the subprocess and fail if it runs longer than this.
    /// `None` blocks indefinitely, matching the historical behavior.
    pub timeout: Option<Duration>,
}

/// Strip a delimiter pair from around `text`, if present.
///
/// Both the prefix and the suffix are removed independently, so a value
/// missing one side is still stripped on the other. Returns a new string.
pub fn strip_wrapper(text: &str, start: &str, end: &str) -> String {
    let text = text.strip_prefix(start).unwrap_or(text);
    let text = text.strip_suffix(end).unwrap_or(text);
    text.to_string()
}

/// Resolve an `!ENV` tag: look the variable up in the process environment.
///
/// Fail-fast on unset variables; there is no defaulting.
pub fn resolve_env(raw: &str) -> Result<Value, ConfigError> {
    let name = strip_wrapper(raw, "${", "}");
    tracing::debug!(variable = %name, "resolving environment reference");
    match std::env::var(&name) {
        Ok(value) => Ok(Value::Env { name, value }),
        Err(_) => Err(ConfigError::EnvVarNotSet { name }),
    }
}

/// Resolve a `!SHELL` tag: run the expression through `sh -c` and capture
/// its trimmed standard output.
pub fn resolve_shell(raw: &str, options: &ShellOptions) -> Result<Value, ConfigError> {
    let command = strip_wrapper(raw, "$(", ")");
    tracing::debug!(command = %command, "running shell expression");

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(&command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ConfigError::ShellSpawn {
            command: command.clone(),
            source,
        })?;

    if let Some(timeout) = options.timeout {
        let deadline = Instant::now() + timeout;
        loop {
            match child.try_wait() {
                Ok(Some(_)) => break,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(ConfigError::ShellTimeout { command, timeout });
                    }
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(source) => {
                    return Err(ConfigError::ShellSpawn { command, source });
                }
            }
        }
    }

    let output = child
        .wait_with_output()
        .map_err(|source| ConfigError::ShellSpawn {
            command: command.clone(),
            source,
        })?;

    if !output.status.success() {
        return Err(ConfigError::ShellExit {
            command,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout)
        .trim_end()
        .to_string();
    Ok(Value::Shell {
        command,
        output: stdout,
    })
}

/// Resolve an `!EXPAND` tag: parse the fence and register it for later
/// expansion, returning a deferred value.
pub fn resolve_fence(raw: &str, fences: &mut PendingFences) -> Result<Value, ConfigError> {
    let (kind, placeholder, source_expr) = parse_fence(raw)?;
    let id: FenceId = fences.register(raw.to_string(), kind, placeholder, source_expr);
    Ok(Value::Deferred(id))
}

/// Parse a fenced scalar into `(kind, placeholder, source_expression)`.
///
/// The fence body sits between the outermost delimiter pair; it must contain
/// exactly one `-->` separator. Zero or several separators is a malformed
/// fence and reported as such, never an index fault.
pub fn parse_fence(raw: &str) -> Result<(FenceKind, String, String), ConfigError> {
    let list_body = between(raw, LIST_FENCE_START, LIST_FENCE_END);
    let dict_body = between(raw, DICT_FENCE_START, DICT_FENCE_END);
    let (kind, body) = match (list_body, dict_body) {
        (Some(body), None) => (FenceKind::List, body),
        (None, Some(body)) => (FenceKind::Dict, body),
        // Neither delimiter pair, or both: there is no one fence to parse.
        (None, None) | (Some(_), Some(_)) => {
            return Err(ConfigError::UnknownFenceType {
                raw: raw.to_string(),
            });
        }
    };

    let parts: Vec<&str> = body.split(FENCE_SEPARATOR).collect();
    if parts.len() != 2 {
        return Err(ConfigError::MalformedFence {
            raw: raw.to_string(),
            separators: parts.len() - 1,
        });
    }

    let placeholder = parts[0].trim().to_string();
    let source_expr = parts[1].trim().to_string();
    Ok((kind, placeholder, source_expr))
}

/// The trimmed text between the first `start` and the last `end`, if both
/// delimiters are present in that order.
fn between(text: &str, start: &str, end: &str) -> Option<String> {
    let open = text.find(start)?;
    let close = text.rfind(end)?;
    let inner_start = open + start.len();
    if close < inner_start {
        return None;
    }
    Some(text[inner_start..close].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Env-var tests mutate process-global state: each uses its own variable.

    #[test]
    fn env_lookup_returns_the_variable_value() {
        unsafe { std::env::set_var("SIMCFG_TEST_RESOLVE_A", "levante") };
        let value = resolve_env("${SIMCFG_TEST_RESOLVE_A}").unwrap();
        assert_eq!(value.as_str(), Some("levante"));
        assert!(matches!(value, Value::Env { ref name, .. } if name == "SIMCFG_TEST_RESOLVE_A"));
    }

    #[test]
    fn env_lookup_without_braces() {
        unsafe { std::env::set_var("SIMCFG_TEST_RESOLVE_B", "plain") };
        assert_eq!(
            resolve_env("SIMCFG_TEST_RESOLVE_B").unwrap().as_str(),
            Some("plain")
        );
    }

    #[test]
    fn unset_variable_fails_with_its_name() {
        let error = resolve_env("${SIMCFG_TEST_RESOLVE_UNSET}").unwrap_err();
        match error {
            ConfigError::EnvVarNotSet { name } => {
                assert_eq!(name, "SIMCFG_TEST_RESOLVE_UNSET");
            }
            other => panic!("expected EnvVarNotSet, got {other:?}"),
        }
    }

    #[test]
    fn shell_output_is_captured_and_trimmed() {
        let value = resolve_shell("$(echo pgierz)", &ShellOptions::default()).unwrap();
        assert_eq!(value.as_str(), Some("pgierz"));
        assert!(matches!(value, Value::Shell { ref command, .. } if command == "echo pgierz"));
    }

    #[test]
    fn failing_command_is_an_error() {
        let error = resolve_shell("$(exit 3)", &ShellOptions::default()).unwrap_err();
        assert!(matches!(error, ConfigError::ShellExit { .. }));
    }

    #[test]
    fn hung_command_is_killed_after_timeout() {
        let options = ShellOptions {
            timeout: Some(Duration::from_millis(100)),
        };
        let error = resolve_shell("$(sleep 30)", &options).unwrap_err();
        assert!(matches!(error, ConfigError::ShellTimeout { .. }));
    }

    #[test]
    fn list_fence_parses_placeholder_and_source() {
        let (kind, placeholder, source) = parse_fence("[[ stream --> streams ]]").unwrap();
        assert_eq!(kind, FenceKind::List);
        assert_eq!(placeholder, "stream");
        assert_eq!(source, "streams");
    }

    #[test]
    fn dict_fence_is_recognized() {
        let (kind, placeholder, source) =
            parse_fence("{{ f --> general.files }}").unwrap();
        assert_eq!(kind, FenceKind::Dict);
        assert_eq!(placeholder, "f");
        assert_eq!(source, "general.files");
    }

    #[test]
    fn unfenced_text_is_an_unknown_fence_type() {
        assert!(matches!(
            parse_fence("no fence markers here"),
            Err(ConfigError::UnknownFenceType { .. })
        ));
    }

    #[test]
    fn missing_separator_is_malformed() {
        let error = parse_fence("[[ just-a-placeholder ]]").unwrap_err();
        assert!(matches!(
            error,
            ConfigError::MalformedFence { separators: 0, .. }
        ));
    }

    #[test]
    fn doubled_separator_is_malformed() {
        let error = parse_fence("[[ a --> b --> c ]]").unwrap_err();
        assert!(matches!(
            error,
            ConfigError::MalformedFence { separators: 2, .. }
        ));
    }

    #[test]
    fn strip_wrapper_handles_partial_wrapping() {
        assert_eq!(strip_wrapper("${NAME}", "${", "}"), "NAME");
        assert_eq!(strip_wrapper("NAME", "${", "}"), "NAME");
        assert_eq!(strip_wrapper("${NAME", "${", "}"), "NAME");
    }

    #[test]
    fn fence_registration_defers_the_value() {
        let mut fences = PendingFences::new();
        let value = resolve_fence("[[ a --> my_list ]]", &mut fences).unwrap();
        assert!(matches!(value, Value::Deferred(_)));
        assert_eq!(fences.len(), 1);
    }
}
