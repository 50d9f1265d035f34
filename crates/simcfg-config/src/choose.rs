//! Conditional-resolution ("choose") pass.
//!
//! A mapping entry whose key is `choose_<path>` selects between branches
//! based on the value `<path>` resolves to:
//!
//! ```yaml
//! computer: levante
//! choose_computer:
//!   levante:
//!     cores_per_node: 128
//!   "*":
//!     cores_per_node: 64
//! ```
//!
//! The selector is looked up among the block's siblings first, then as an
//! absolute path from the document root. The selected branch must be a
//! mapping; its entries are spliced into the parent mapping in place of the
//! choose entry. A branch may itself contain choose blocks, which resolve
//! in the same walk. After the pass no `choose_` keys remain, so running it
//! again is a no-op.

use crate::construct::LoadOptions;
use crate::error::ConfigError;
use crate::path::lookup;
use crate::value::Value;
use indexmap::IndexMap;

const CHOOSE_PREFIX: &str = "choose_";
const DEFAULT_BRANCH: &str = "*";

/// Run choose resolution over the whole tree.
pub fn resolve_chooses(tree: Value, options: &LoadOptions) -> Result<Value, ConfigError> {
    let snapshot = tree.clone();
    rewrite(tree, &snapshot, 0, options)
}

fn rewrite(
    value: Value,
    root: &Value,
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
        Value::Sequence(items) => Ok(Value::Sequence(
            items
                .into_iter()
                .map(|item| rewrite(item, root, depth + 1, options))
                .collect::<Result<_, _>>()?,
        )),
        Value::Mapping(entries) => rewrite_mapping(entries, root, depth, options),
        other => Ok(other),
    }
}

fn rewrite_mapping(
    entries: IndexMap<String, Value>,
    root: &Value,
    depth: usize,
    options: &LoadOptions,
) -> Result<Value, ConfigError> {
    // Siblings are visible to selector lookups even when the choose block
    // precedes them in the document.
    let siblings = entries.clone();
    let mut resolved: IndexMap<String, Value> = IndexMap::with_capacity(entries.len());

    for (key, value) in entries {
        let Some(selector_path) = choose_selector(&key) else {
            resolved.insert(key, rewrite(value, root, depth + 1, options)?);
            continue;
        };

        let Value::Mapping(mut branches) = value else {
            return Err(ConfigError::ChooseBlockNotMapping { key });
        };

        // Entries already resolved in this mapping win over the raw
        // siblings, so a block can key off another block's output.
        let selector = lookup_selector(&resolved, selector_path)
            .or_else(|| lookup_selector(&siblings, selector_path))
            .or_else(|| lookup(root, selector_path).and_then(Value::render))
            .ok_or_else(|| {
                ConfigError::ChooseSelectorMissing {
                    key: key.clone(),
                    selector_path: selector_path.to_string(),
                }
            })?;

        let branch_key = if branches.contains_key(&selector) {
            selector.clone()
        } else if branches.contains_key(DEFAULT_BRANCH) {
            DEFAULT_BRANCH.to_string()
        } else {
            return Err(ConfigError::ChooseNoMatch {
                key,
                selector,
            });
        };
        tracing::debug!(block = %key, selector = %selector, branch = %branch_key, "resolved choose block");

        let branch = branches
            .shift_remove(&branch_key)
            .unwrap_or(Value::Mapping(IndexMap::new()));
        let branch = rewrite(branch, root, depth + 1, options)?;
        let Value::Mapping(branch_entries) = branch else {
            return Err(ConfigError::ChooseBranchNotMapping {
                key,
                branch: branch_key,
            });
        };

        // Splice the branch where the choose entry sat. Existing keys keep
        // their position but take the branch's value; keys defined later in
        // the parent still override on their own insert.
        for (branch_key, branch_value) in branch_entries {
            resolved.insert(branch_key, branch_value);
        }
    }

    Ok(Value::Mapping(resolved))
}

/// The selector path of a choose key, if this is one.
fn choose_selector(key: &str) -> Option<&str> {
    let path = key.strip_prefix(CHOOSE_PREFIX)?;
    if path.is_empty() {
        return None;
    }
    Some(path)
}

/// Look the selector up within one mapping's entries and render it to the
/// string branch keys are compared against.
fn lookup_selector(entries: &IndexMap<String, Value>, path: &str) -> Option<String> {
    let value = match path.split_once('.') {
        None => entries.get(path),
        Some((head, rest)) => entries.get(head).and_then(|value| lookup(value, rest)),
    };
    value?.render()
}
