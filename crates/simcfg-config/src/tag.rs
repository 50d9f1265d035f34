//! The closed set of tags the configuration language understands.
//!
//! Dispatch on tags is an exhaustive `match` over this enum rather than on
//! raw tag strings, so the compiler guarantees every tag kind is handled.

/// A scalar tag, parsed from the YAML tag suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarTag {
    /// `!ENV` — read an environment variable.
    Env,

    /// `!SHELL` — run a shell expression and capture its output.
    Shell,

    /// `!EXPAND` — defer a fenced value for expansion during postprocessing.
    Expand,

    /// Any other local tag; falls back to default scalar construction.
    Other(String),
}

impl ScalarTag {
    /// Parse a tag suffix (the part after `!`).
    pub fn from_suffix(suffix: &str) -> Self {
        match suffix {
            "ENV" => ScalarTag::Env,
            "SHELL" => ScalarTag::Shell,
            "EXPAND" => ScalarTag::Expand,
            other => ScalarTag::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for ScalarTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarTag::Env => write!(f, "!ENV"),
            ScalarTag::Shell => write!(f, "!SHELL"),
            ScalarTag::Expand => write!(f, "!EXPAND"),
            ScalarTag::Other(name) => write!(f, "!{name}"),
        }
    }
}
