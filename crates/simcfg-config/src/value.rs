//! The resolved (or partially resolved) value model.

use crate::registry::FenceId;
use indexmap::IndexMap;
use yaml_rust2::Yaml;

/// A configuration value after construction.
///
/// Construction turns every raw YAML node into one of these. `Env` and
/// `Shell` are terminal values that remember where their text came from;
/// `Deferred` is the only non-terminal variant and must be replaced during
/// postprocessing — it never reaches a consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A plain scalar, immutable once created.
    Scalar(Yaml),

    /// An ordered list of values.
    Sequence(Vec<Value>),

    /// An ordered mapping with unique string keys. Insertion order is
    /// significant and preserved through every pass.
    Mapping(IndexMap<String, Value>),

    /// A resolved `!ENV` reference.
    Env { name: String, value: String },

    /// A resolved `!SHELL` reference.
    Shell { command: String, output: String },

    /// An unresolved `!EXPAND` fence, keyed into the pending registry.
    Deferred(FenceId),
}

impl Value {
    pub fn string(text: impl Into<String>) -> Self {
        Value::Scalar(Yaml::String(text.into()))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Value::Scalar(_) | Value::Env { .. } | Value::Shell { .. })
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Value::Sequence(_))
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, Value::Mapping(_))
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    /// String view of this value, if it is textual.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Scalar(Yaml::String(s)) => Some(s),
            Value::Env { value, .. } => Some(value),
            Value::Shell { output, .. } => Some(output),
            _ => None,
        }
    }

    /// Render this value as scalar text, for interpolation into templates.
    ///
    /// Collections and deferred fences have no scalar rendering.
    pub fn render(&self) -> Option<String> {
        match self {
            Value::Scalar(yaml) => render_yaml(yaml),
            Value::Env { value, .. } => Some(value.clone()),
            Value::Shell { output, .. } => Some(output.clone()),
            Value::Sequence(_) | Value::Mapping(_) | Value::Deferred(_) => None,
        }
    }

    /// Whether any `Deferred` value is reachable from this subtree.
    pub fn contains_deferred(&self) -> bool {
        match self {
            Value::Deferred(_) => true,
            Value::Sequence(items) => items.iter().any(Value::contains_deferred),
            Value::Mapping(entries) => entries.values().any(Value::contains_deferred),
            _ => false,
        }
    }

    /// Collect the ids of all reachable `Deferred` values, in tree order.
    pub fn deferred_ids(&self) -> Vec<FenceId> {
        let mut ids = Vec::new();
        self.collect_deferred(&mut ids);
        ids
    }

    fn collect_deferred(&self, ids: &mut Vec<FenceId>) {
        match self {
            Value::Deferred(id) => ids.push(*id),
            Value::Sequence(items) => {
                for item in items {
                    item.collect_deferred(ids);
                }
            }
            Value::Mapping(entries) => {
                for value in entries.values() {
                    value.collect_deferred(ids);
                }
            }
            _ => {}
        }
    }

    /// Convert a fully resolved tree back into plain Yaml for serialization.
    ///
    /// Must only be called after postprocessing; any `Deferred` still present
    /// degrades to `Yaml::BadValue`, which the completeness check rules out.
    pub fn to_yaml(&self) -> Yaml {
        match self {
            Value::Scalar(yaml) => yaml.clone(),
            Value::Env { value, .. } => Yaml::String(value.clone()),
            Value::Shell { output, .. } => Yaml::String(output.clone()),
            Value::Sequence(items) => Yaml::Array(items.iter().map(Value::to_yaml).collect()),
            Value::Mapping(entries) => Yaml::Hash(
                entries
                    .iter()
                    .map(|(key, value)| (Yaml::String(key.clone()), value.to_yaml()))
                    .collect(),
            ),
            Value::Deferred(_) => Yaml::BadValue,
        }
    }
}

fn render_yaml(yaml: &Yaml) -> Option<String> {
    match yaml {
        Yaml::String(s) => Some(s.clone()),
        Yaml::Integer(i) => Some(i.to_string()),
        Yaml::Real(r) => Some(r.clone()),
        Yaml::Boolean(b) => Some(b.to_string()),
        Yaml::Null => Some("null".to_string()),
        _ => None,
    }
}
