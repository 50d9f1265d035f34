//! Variable substitution pass.
//!
//! Replaces `${dot.path}` references in plain scalars with the referenced
//! value from elsewhere in the tree. A scalar that is nothing but a single
//! reference takes the referenced value itself, preserving its type;
//! references embedded in surrounding text interpolate the rendered scalar
//! text instead.
//!
//! References may point at scalars that themselves contain references, so
//! the rewrite runs to a bounded fixpoint. A round that makes no progress
//! while references remain means a missing target or a cycle, and fails.
//! On a fully substituted tree the pass is a no-op.

use crate::construct::LoadOptions;
use crate::error::ConfigError;
use crate::path::lookup;
use crate::value::Value;
use once_cell::sync::Lazy;
use regex::Regex;
use yaml_rust2::Yaml;

static VAR_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid regex"));

/// Run variable substitution over the whole tree.
pub fn substitute_variables(tree: Value, options: &LoadOptions) -> Result<Value, ConfigError> {
    let mut current = tree;
    for _round in 0..options.max_rounds {
        if first_reference(&current).is_none() {
            return Ok(current);
        }
        let snapshot = current.clone();
        let mut progress = false;
        current = rewrite(current, &snapshot, &mut progress, 0, options)?;
        if !progress {
            // Remaining references can never resolve: missing target or a
            // self-referential copy.
            let reference = first_reference(&current).unwrap_or_default();
            return Err(ConfigError::UnresolvedVariable { reference });
        }
    }
    match first_reference(&current) {
        None => Ok(current),
        Some(reference) => Err(ConfigError::UnresolvedVariable { reference }),
    }
}

fn rewrite(
    value: Value,
    root: &Value,
    progress: &mut bool,
    depth: usize,
    options: &LoadOptions,
) -> Result<Value, ConfigError> {
    if depth > options.max_depth {
        return Err(ConfigError::NestingTooDeep {
            max_depth: options.max_depth,
            path: Vec::new(),
        });
    }
    match value {
        Value::Sequence(items) => {
            let mut rewritten = Vec::with_capacity(items.len());
            for item in items {
                rewritten.push(rewrite(item, root, progress, depth + 1, options)?);
            }
            Ok(Value::Sequence(rewritten))
        }
        Value::Mapping(entries) => {
            let mut rewritten = indexmap::IndexMap::with_capacity(entries.len());
            for (key, item) in entries {
                rewritten.insert(key, rewrite(item, root, progress, depth + 1, options)?);
            }
            Ok(Value::Mapping(rewritten))
        }
        Value::Scalar(Yaml::String(text)) => rewrite_scalar(text, root, progress),
        other => Ok(other),
    }
}

fn rewrite_scalar(
    text: String,
    root: &Value,
    progress: &mut bool,
) -> Result<Value, ConfigError> {
    // A scalar that is exactly one reference takes the referenced value,
    // whatever its type.
    if let Some(reference) = whole_reference(&text) {
        match lookup(root, reference) {
            // Copying a deferred fence would duplicate its id; leave the
            // reference alone and let the fixpoint loop report it.
            Some(target) if !target.contains_deferred() => {
                let target = target.clone();
                if target.as_str() != Some(text.as_str()) {
                    *progress = true;
                }
                return Ok(target);
            }
            _ => return Ok(Value::Scalar(Yaml::String(text))),
        }
    }

    if !VAR_REF.is_match(&text) {
        return Ok(Value::Scalar(Yaml::String(text)));
    }

    // Embedded references interpolate rendered scalar text. Unknown targets
    // are left in place for the fixpoint loop to diagnose.
    let mut result = String::with_capacity(text.len());
    let mut last = 0;
    for captures in VAR_REF.captures_iter(&text) {
        let whole = captures.get(0).expect("match exists");
        let reference = &captures[1];
        result.push_str(&text[last..whole.start()]);
        match lookup(root, reference) {
            Some(target) => match target.render() {
                Some(rendered) => {
                    tracing::debug!(reference = %reference, "substituted variable");
                    result.push_str(&rendered);
                    *progress = true;
                }
                None => {
                    return Err(ConfigError::VariableNotScalar {
                        reference: reference.to_string(),
                    });
                }
            },
            None => result.push_str(whole.as_str()),
        }
        last = whole.end();
    }
    result.push_str(&text[last..]);
    Ok(Value::Scalar(Yaml::String(result)))
}

/// If the trimmed text is exactly `${...}`, return the inner reference.
fn whole_reference(text: &str) -> Option<&str> {
    let trimmed = text.trim();
    let inner = trimmed.strip_prefix("${")?.strip_suffix('}')?;
    if inner.contains('}') || inner.contains("${") {
        return None;
    }
    Some(inner)
}

/// First `${...}` reference found anywhere in the tree, if any.
fn first_reference(value: &Value) -> Option<String> {
    match value {
        Value::Scalar(Yaml::String(text)) => VAR_REF
            .captures(text)
            .map(|captures| captures[1].to_string()),
        Value::Sequence(items) => items.iter().find_map(first_reference),
        Value::Mapping(entries) => entries.values().find_map(first_reference),
        _ => None,
    }
}
