//! The document constructor: raw YAML nodes to values.
//!
//! Walks the parsed tree depth-first. Collections recurse preserving order;
//! scalars dispatch on their tag. The constructor is the only writer of the
//! pending-fence registry: every `!EXPAND` scalar is registered before
//! construction returns.

use crate::error::ConfigError;
use crate::registry::PendingFences;
use crate::resolve::{resolve_env, resolve_fence, resolve_shell, ShellOptions};
use crate::tag::ScalarTag;
use crate::value::Value;
use indexmap::IndexMap;
use simcfg_yaml::YamlNode;

/// Options for one load operation.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Subprocess policy for `!SHELL` tags.
    pub shell: ShellOptions,

    /// Maximum nesting depth for construction and every postprocessing pass.
    pub max_depth: usize,

    /// Bound on substitution/choose fixpoint rounds before a cycle is assumed.
    pub max_rounds: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            shell: ShellOptions::default(),
            max_depth: 256,
            max_rounds: 64,
        }
    }
}

/// Construct the value tree for a parsed document, registering deferred
/// fences in `fences`.
pub fn construct(
    node: YamlNode,
    fences: &mut PendingFences,
    options: &LoadOptions,
) -> Result<Value, ConfigError> {
    construct_inner(node, fences, options, &mut Vec::new())
}

fn construct_inner(
    node: YamlNode,
    fences: &mut PendingFences,
    options: &LoadOptions,
    path: &mut Vec<String>,
) -> Result<Value, ConfigError> {
    if path.len() > options.max_depth {
        return Err(ConfigError::NestingTooDeep {
            max_depth: options.max_depth,
            path: path.clone(),
        });
    }

    if node.is_sequence() {
        let items = node.into_sequence().unwrap_or_default();
        let mut sequence = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            path.push(index.to_string());
            sequence.push(construct_inner(item, fences, options, path)?);
            path.pop();
        }
        return Ok(Value::Sequence(sequence));
    }

    if node.is_mapping() {
        let entries = node.into_mapping().unwrap_or_default();
        let mut mapping = IndexMap::with_capacity(entries.len());
        for entry in entries {
            // Non-string keys have no place in the configuration language.
            let Some(key) = entry.key.yaml.as_str().map(str::to_string) else {
                tracing::debug!(at = %entry.key.source, "skipping non-string mapping key");
                continue;
            };
            path.push(key.clone());
            let value = construct_inner(entry.value, fences, options, path)?;
            path.pop();
            mapping.insert(key, value);
        }
        return Ok(Value::Mapping(mapping));
    }

    construct_scalar(node, fences, options)
}

fn construct_scalar(
    node: YamlNode,
    fences: &mut PendingFences,
    options: &LoadOptions,
) -> Result<Value, ConfigError> {
    let Some(tag) = &node.tag else {
        return Ok(Value::Scalar(node.yaml));
    };

    // Tagged scalars are always parsed as literal strings.
    let text = node.yaml.as_str().unwrap_or_default();
    let parsed = ScalarTag::from_suffix(&tag.suffix);
    tracing::debug!(tag = %parsed, text = %text, at = %node.source, "dispatching tagged scalar");

    match parsed {
        ScalarTag::Env => resolve_env(text),
        ScalarTag::Shell => resolve_shell(text, &options.shell),
        ScalarTag::Expand => resolve_fence(text, fences),
        ScalarTag::Other(name) => {
            // Unknown tags are not an error: fall back to default scalar
            // construction, as the underlying parser would.
            tracing::debug!(tag = %name, "unrecognized tag, keeping scalar as-is");
            Ok(Value::Scalar(node.yaml))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FenceKind;

    fn construct_str(content: &str) -> (Value, PendingFences) {
        let node = simcfg_yaml::parse(content).expect("fixture parses");
        let mut fences = PendingFences::new();
        let value = construct(node, &mut fences, &LoadOptions::default()).expect("constructs");
        (value, fences)
    }

    #[test]
    fn untagged_document_passes_through() {
        let (value, fences) = construct_str("general:\n  models: [echam, fesom]\n  cores: 128");
        assert!(fences.is_empty());

        let general = value.as_mapping().unwrap().get("general").unwrap();
        let models = general.as_mapping().unwrap().get("models").unwrap();
        assert_eq!(models.as_sequence().unwrap().len(), 2);
    }

    #[test]
    fn env_tag_resolves_during_construction() {
        unsafe { std::env::set_var("SIMCFG_TEST_CONSTRUCT_A", "MY_VAR") };
        let (value, _) = construct_str("my_var: !ENV ${SIMCFG_TEST_CONSTRUCT_A}");
        let my_var = value.as_mapping().unwrap().get("my_var").unwrap();
        assert_eq!(my_var.as_str(), Some("MY_VAR"));
    }

    #[test]
    fn missing_env_variable_fails_construction() {
        let node = simcfg_yaml::parse("x: !ENV ${SIMCFG_TEST_CONSTRUCT_UNSET}").unwrap();
        let mut fences = PendingFences::new();
        let error = construct(node, &mut fences, &LoadOptions::default()).unwrap_err();
        assert!(matches!(error, ConfigError::EnvVarNotSet { .. }));
    }

    #[test]
    fn shell_tag_runs_during_construction() {
        let (value, _) = construct_str("user: !SHELL $(echo pgierz)");
        let user = value.as_mapping().unwrap().get("user").unwrap();
        assert_eq!(user.as_str(), Some("pgierz"));
    }

    #[test]
    fn expand_tag_registers_a_fence() {
        let (value, fences) = construct_str("streams: !EXPAND \"[[ s --> my_list ]]\"");
        assert_eq!(fences.len(), 1);

        let streams = value.as_mapping().unwrap().get("streams").unwrap();
        let Value::Deferred(id) = streams else {
            panic!("expected a deferred value, got {streams:?}");
        };
        let entry = fences.get(*id).unwrap();
        assert_eq!(entry.kind, FenceKind::List);
        assert_eq!(entry.placeholder, "s");
        assert_eq!(entry.source_expr, "my_list");
    }

    #[test]
    fn bad_fence_fails_construction() {
        let node = simcfg_yaml::parse("x: !EXPAND \"no fence markers here\"").unwrap();
        let mut fences = PendingFences::new();
        let error = construct(node, &mut fences, &LoadOptions::default()).unwrap_err();
        assert!(matches!(error, ConfigError::UnknownFenceType { .. }));
    }

    #[test]
    fn unknown_tag_falls_back_to_plain_scalar() {
        let (value, fences) = construct_str("when: !date 2024-01-01");
        assert!(fences.is_empty());
        let when = value.as_mapping().unwrap().get("when").unwrap();
        assert_eq!(when.as_str(), Some("2024-01-01"));
    }

    #[test]
    fn mapping_order_survives_construction() {
        let (value, _) = construct_str("b: 1\na: 2\nc: 3");
        let keys: Vec<&String> = value.as_mapping().unwrap().keys().collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }
}
