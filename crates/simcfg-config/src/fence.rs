//! Fence-resolution pass.
//!
//! Runs last: every `Deferred` id left by construction is expanded against
//! the tree as the earlier passes rewrote it, so a fence over
//! `dims: ["$(( 1 + 1 ))"]` sees the evaluated numbers, not the raw text.
//!
//! A list fence `[[ placeholder --> path ]]` expands over a sequence at
//! `path`, producing one element per source element. A dict fence
//! `{{ placeholder --> path }}` expands over a mapping, keyed by the source
//! mapping's keys. Text surrounding the fence delimiters, if any, becomes a
//! per-element template with the element's rendered text spliced in.

use crate::construct::LoadOptions;
use crate::error::ConfigError;
use crate::path::lookup;
use crate::registry::{DeferredExpansion, FenceKind, PendingFences};
use crate::resolve::{
    DICT_FENCE_END, DICT_FENCE_START, LIST_FENCE_END, LIST_FENCE_START,
};
use crate::value::Value;
use indexmap::IndexMap;

/// Expand every deferred fence in `tree`, consuming the registry entries.
pub fn expand_fences(
    tree: Value,
    fences: &mut PendingFences,
    options: &LoadOptions,
) -> Result<Value, ConfigError> {
    // The snapshot is what source expressions resolve against: fences see
    // the tree as the earlier passes left it, not each other's output.
    let snapshot = tree.clone();
    let expanded = rewrite(tree, &snapshot, fences, 0, options)?;

    let mut leftover = fences.outstanding_ids();
    leftover.extend(expanded.deferred_ids());
    if !leftover.is_empty() {
        return Err(ConfigError::UnresolvedFences { ids: leftover });
    }
    Ok(expanded)
}

fn rewrite(
    value: Value,
    snapshot: &Value,
    fences: &mut PendingFences,
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
        Value::Deferred(id) => {
            let entry = fences
                .take(id)
                .ok_or_else(|| ConfigError::UnresolvedFences { ids: vec![id] })?;
            expand_one(&entry, snapshot)
        }
        Value::Sequence(items) => Ok(Value::Sequence(
            items
                .into_iter()
                .map(|item| rewrite(item, snapshot, fences, depth + 1, options))
                .collect::<Result<_, _>>()?,
        )),
        Value::Mapping(entries) => Ok(Value::Mapping(
            entries
                .into_iter()
                .map(|(key, item)| {
                    Ok((key, rewrite(item, snapshot, fences, depth + 1, options)?))
                })
                .collect::<Result<IndexMap<_, _>, ConfigError>>()?,
        )),
        other => Ok(other),
    }
}

fn expand_one(entry: &DeferredExpansion, snapshot: &Value) -> Result<Value, ConfigError> {
    let source =
        lookup(snapshot, &entry.source_expr).ok_or_else(|| ConfigError::FenceSourceMissing {
            expr: entry.source_expr.clone(),
        })?;
    let (prefix, suffix) = template_parts(&entry.raw, entry.kind);
    tracing::debug!(id = %entry.id, source = %entry.source_expr, "expanding fence");

    match entry.kind {
        FenceKind::List => {
            let Value::Sequence(elements) = source else {
                return Err(ConfigError::FenceSourceMismatch {
                    expr: entry.source_expr.clone(),
                    expected: "sequence",
                });
            };
            let expanded = elements
                .iter()
                .map(|element| apply_template(element, prefix, suffix, &entry.raw))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Sequence(expanded))
        }
        FenceKind::Dict => {
            let Value::Mapping(entries) = source else {
                return Err(ConfigError::FenceSourceMismatch {
                    expr: entry.source_expr.clone(),
                    expected: "mapping",
                });
            };
            let expanded = entries
                .iter()
                .map(|(key, element)| {
                    Ok((key.clone(), apply_template(element, prefix, suffix, &entry.raw)?))
                })
                .collect::<Result<IndexMap<_, _>, ConfigError>>()?;
            Ok(Value::Mapping(expanded))
        }
    }
}

/// Produce the expansion of one source element.
///
/// A bare fence takes the element as-is; surrounding text turns the element
/// into rendered text inside that template. A source element containing an
/// unexpanded fence of its own cannot be copied out, that id would then
/// appear twice.
fn apply_template(
    element: &Value,
    prefix: &str,
    suffix: &str,
    raw: &str,
) -> Result<Value, ConfigError> {
    if prefix.trim().is_empty() && suffix.trim().is_empty() {
        if let Some(id) = element.deferred_ids().first() {
            return Err(ConfigError::UnresolvedFences { ids: vec![*id] });
        }
        return Ok(element.clone());
    }
    let text = element
        .render()
        .ok_or_else(|| ConfigError::FenceSourceMismatch {
            expr: raw.to_string(),
            expected: "scalar element",
        })?;
    Ok(Value::string(format!("{prefix}{text}{suffix}")))
}

/// The fixed text before the opening delimiter and after the closing one.
fn template_parts(raw: &str, kind: FenceKind) -> (&str, &str) {
    let (start, end) = match kind {
        FenceKind::List => (LIST_FENCE_START, LIST_FENCE_END),
        FenceKind::Dict => (DICT_FENCE_START, DICT_FENCE_END),
    };
    match (raw.find(start), raw.rfind(end)) {
        (Some(open), Some(close)) if close >= open => {
            (&raw[..open], &raw[close + end.len()..])
        }
        // Registration already validated the delimiters; treat anything
        // else as a bare fence.
        _ => ("", ""),
    }
}
