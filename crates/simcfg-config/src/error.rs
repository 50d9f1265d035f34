//! Error types for configuration resolution.
//!
//! Every error here is fatal for the load operation it occurs in: nothing is
//! retried and nothing is silently defaulted. Either the whole document
//! resolves or the caller gets one of these.

use crate::registry::FenceId;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while constructing or postprocessing a document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid YAML.
    #[error("YAML parse error: {0}")]
    Parse(#[from] simcfg_yaml::Error),

    /// An `!ENV` tag named a variable that is not set.
    #[error("environment variable {name} is not set")]
    EnvVarNotSet { name: String },

    /// A `!SHELL` subprocess could not be started.
    #[error("failed to run shell expression '{command}': {source}")]
    ShellSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A `!SHELL` subprocess exited abnormally.
    #[error("shell expression '{command}' exited with {status}: {stderr}")]
    ShellExit {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    /// A `!SHELL` subprocess exceeded the configured timeout and was killed.
    #[error("shell expression '{command}' timed out after {timeout:?}")]
    ShellTimeout { command: String, timeout: Duration },

    /// An `!EXPAND` scalar contained neither a `[[...]]` nor a `{{...}}` fence.
    #[error("unknown fence type in '{raw}': expected [[...]] or {{{{...}}}}")]
    UnknownFenceType { raw: String },

    /// An `!EXPAND` fence body did not contain exactly one `-->` separator.
    #[error(
        "malformed fence '{raw}': expected exactly one '-->' separator, found {separators}"
    )]
    MalformedFence { raw: String, separators: usize },

    /// Deferred expansions survived to the end of postprocessing.
    #[error("unresolved fences after postprocessing: {}", format_ids(ids))]
    UnresolvedFences { ids: Vec<FenceId> },

    /// A pending-fence registry was handed to postprocessing twice.
    #[error("pending-fence registry has already been consumed by a previous postprocess run")]
    RegistryConsumed,

    /// A `${...}` reference never became resolvable (missing target or cycle).
    #[error("variable reference '${{{reference}}}' cannot be resolved")]
    UnresolvedVariable { reference: String },

    /// A `${...}` reference was interpolated into text but points at a collection.
    #[error("variable reference '${{{reference}}}' is not a scalar and cannot be interpolated")]
    VariableNotScalar { reference: String },

    /// A `$(( ... ))` expression could not be evaluated.
    #[error("cannot evaluate '$(( {expr} ))': {message}")]
    MathError { expr: String, message: String },

    /// A choose block had no branch for the selector value and no `"*"` default.
    #[error("choose block '{key}' has no branch matching '{selector}' and no '*' default")]
    ChooseNoMatch { key: String, selector: String },

    /// A choose block's selector path does not exist.
    #[error("choose block '{key}' refers to unknown selector '{selector_path}'")]
    ChooseSelectorMissing { key: String, selector_path: String },

    /// A choose block's value was not a mapping of branches.
    #[error("choose block '{key}' must be a mapping of branches")]
    ChooseBlockNotMapping { key: String },

    /// A selected choose branch was not a mapping and cannot be spliced.
    #[error("branch '{branch}' of choose block '{key}' is not a mapping")]
    ChooseBranchNotMapping { key: String, branch: String },

    /// A fence's source expression does not name anything in the tree.
    #[error("fence source expression '{expr}' does not name a value in the document")]
    FenceSourceMissing { expr: String },

    /// A fence's source expression named a value of the wrong shape.
    #[error("fence source expression '{expr}' must name a {expected}")]
    FenceSourceMismatch { expr: String, expected: &'static str },

    /// The document nests deeper than the configured limit.
    #[error("document nesting too deep (max depth: {max_depth}) at path: {}", path.join("."))]
    NestingTooDeep {
        max_depth: usize,
        path: Vec<String>,
    },
}

fn format_ids(ids: &[FenceId]) -> String {
    let rendered: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
    rendered.join(", ")
}
