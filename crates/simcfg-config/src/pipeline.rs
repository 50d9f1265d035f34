//! The postprocessing pipeline and the one-call load entry points.
//!
//! Passes run in a fixed order, each traversing the whole tree before the
//! next starts: variable substitution, arithmetic evaluation, conditional
//! resolution, and finally fence expansion. The first three are pure
//! rewrites sharing one shape; fence expansion additionally drains the
//! pending-fence registry, which is why it sits outside the trait.

use crate::choose::resolve_chooses;
use crate::construct::{construct, LoadOptions};
use crate::error::ConfigError;
use crate::fence::expand_fences;
use crate::math::evaluate_math;
use crate::registry::PendingFences;
use crate::subst::substitute_variables;
use crate::value::Value;

/// One tree-to-tree rewrite of the postprocessing pipeline.
pub trait Pass {
    fn name(&self) -> &'static str;

    fn apply(&self, tree: Value, options: &LoadOptions) -> Result<Value, ConfigError>;
}

struct SubstituteVariables;
struct EvaluateMath;
struct ResolveChooses;

impl Pass for SubstituteVariables {
    fn name(&self) -> &'static str {
        "subst"
    }

    fn apply(&self, tree: Value, options: &LoadOptions) -> Result<Value, ConfigError> {
        substitute_variables(tree, options)
    }
}

impl Pass for EvaluateMath {
    fn name(&self) -> &'static str {
        "math"
    }

    fn apply(&self, tree: Value, options: &LoadOptions) -> Result<Value, ConfigError> {
        evaluate_math(tree, options)
    }
}

impl Pass for ResolveChooses {
    fn name(&self) -> &'static str {
        "choose"
    }

    fn apply(&self, tree: Value, options: &LoadOptions) -> Result<Value, ConfigError> {
        resolve_chooses(tree, options)
    }
}

/// The rewrite passes in pipeline order, fence expansion excluded.
pub fn rewrite_passes() -> Vec<Box<dyn Pass>> {
    vec![
        Box::new(SubstituteVariables),
        Box::new(EvaluateMath),
        Box::new(ResolveChooses),
    ]
}

/// Run the full pipeline over a constructed tree, draining `fences`.
///
/// The registry is marked consumed up front: a registry that already fed
/// one postprocess run cannot satisfy another tree's deferred ids.
pub fn postprocess(
    tree: Value,
    fences: &mut PendingFences,
    options: &LoadOptions,
) -> Result<Value, ConfigError> {
    fences.begin_drain()?;
    let mut tree = tree;
    for pass in rewrite_passes() {
        tracing::debug!(pass = pass.name(), "running postprocessing pass");
        tree = pass.apply(tree, options)?;
    }
    tracing::debug!(pass = "fence", pending = fences.len(), "running postprocessing pass");
    expand_fences(tree, fences, options)
}

/// Load a document from YAML text: parse, construct, postprocess.
///
/// Each call uses a fresh pending-fence registry, so concurrent loads never
/// observe each other's fences.
pub fn load(content: &str) -> Result<Value, ConfigError> {
    load_with_options(content, None, &LoadOptions::default())
}

/// Like [`load`], recording `filename` in parse diagnostics.
pub fn load_file(content: &str, filename: &str) -> Result<Value, ConfigError> {
    load_with_options(content, Some(filename), &LoadOptions::default())
}

pub fn load_with_options(
    content: &str,
    filename: Option<&str>,
    options: &LoadOptions,
) -> Result<Value, ConfigError> {
    let node = match filename {
        Some(name) => simcfg_yaml::parse_file(content, name)?,
        None => simcfg_yaml::parse(content)?,
    };
    let mut fences = PendingFences::new();
    let tree = construct(node, &mut fences, options)?;
    postprocess(tree, &mut fences, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use yaml_rust2::Yaml;

    #[test]
    fn load_runs_every_pass_in_order() {
        let doc = "\
machine: levante
nodes: 4
cores: \"$(( ${nodes} * 128 ))\"
choose_machine:
  levante:
    partition: compute
";
        let tree = load(doc).unwrap();
        let map = tree.as_mapping().unwrap();
        assert_eq!(map.get("cores").unwrap(), &Value::Scalar(Yaml::Integer(512)));
        assert_eq!(map.get("partition").unwrap().as_str(), Some("compute"));
        assert!(!map.contains_key("choose_machine"));
    }

    #[test]
    fn a_drained_registry_cannot_be_reused() {
        let mut fences = PendingFences::new();
        let tree = Value::Mapping(Default::default());
        postprocess(tree.clone(), &mut fences, &LoadOptions::default()).unwrap();
        assert!(matches!(
            postprocess(tree, &mut fences, &LoadOptions::default()),
            Err(ConfigError::RegistryConsumed)
        ));
    }

    #[test]
    fn parse_errors_surface_through_load() {
        assert!(matches!(
            load("key: [unclosed"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn pass_order_is_fixed() {
        let names: Vec<_> = rewrite_passes().iter().map(|p| p.name()).collect();
        assert_eq!(names, ["subst", "math", "choose"]);
    }
}
