//! End-to-end loads through the public API.

use simcfg_config::{load, load_with_options, ConfigError, LoadOptions, Value};
use yaml_rust2::Yaml;

fn get<'a>(tree: &'a Value, path: &str) -> &'a Value {
    simcfg_config::path::lookup(tree, path)
        .unwrap_or_else(|| panic!("missing path {path}"))
}

#[test]
fn env_and_shell_tags_resolve_at_load_time() {
    unsafe { std::env::set_var("SIMCFG_IT_ACCOUNT", "ab0246") };
    let doc = "\
general:
  my_var: !ENV ${SIMCFG_IT_ACCOUNT}
person:
  user: !SHELL $(echo pgierz)
";
    let tree = load(doc).unwrap();
    assert_eq!(get(&tree, "general.my_var").as_str(), Some("ab0246"));
    assert_eq!(get(&tree, "person.user").as_str(), Some("pgierz"));
}

#[test]
fn unset_env_variable_fails_the_load() {
    let error = load("a: !ENV ${SIMCFG_IT_NEVER_SET}\n").unwrap_err();
    assert!(matches!(error, ConfigError::EnvVarNotSet { ref name } if name == "SIMCFG_IT_NEVER_SET"));
}

#[test]
fn list_fence_expands_over_its_source() {
    let doc = "\
my_list:
  - x
  - y
streams: !EXPAND \"[[ s --> my_list ]]\"
";
    let tree = load(doc).unwrap();
    let streams = get(&tree, "streams").as_sequence().unwrap();
    assert_eq!(streams.len(), 2);
    assert_eq!(streams[0].as_str(), Some("x"));
    assert_eq!(streams[1].as_str(), Some("y"));
}

#[test]
fn fences_observe_values_from_earlier_passes() {
    // The source sequence holds arithmetic; the expansion must see the
    // evaluated numbers, proving fences run last.
    let doc = "\
dims:
  - \"$(( 1 + 1 ))\"
  - \"$(( 2 + 2 ))\"
streams: !EXPAND \"[[ d --> dims ]]\"
";
    let tree = load(doc).unwrap();
    let streams = get(&tree, "streams").as_sequence().unwrap();
    assert_eq!(streams[0], Value::Scalar(Yaml::Integer(2)));
    assert_eq!(streams[1], Value::Scalar(Yaml::Integer(4)));
}

#[test]
fn dict_fence_expands_keyed_by_source() {
    let doc = "\
files:
  restart: restart.nc
  output: output.nc
links: !EXPAND \"ln -s {{ f --> files }}\"
";
    let tree = load(doc).unwrap();
    let links = get(&tree, "links").as_mapping().unwrap();
    assert_eq!(links.get("restart").unwrap().as_str(), Some("ln -s restart.nc"));
    assert_eq!(links.get("output").unwrap().as_str(), Some("ln -s output.nc"));
}

#[test]
fn expand_without_fence_markers_fails() {
    let error = load("streams: !EXPAND \"no markers\"\n").unwrap_err();
    assert!(matches!(error, ConfigError::UnknownFenceType { .. }));
}

#[test]
fn fence_over_missing_source_fails() {
    let error = load("streams: !EXPAND \"[[ s --> nowhere ]]\"\n").unwrap_err();
    assert!(matches!(error, ConfigError::FenceSourceMissing { .. }));
}

#[test]
fn substitution_arithmetic_and_choose_compose() {
    let doc = "\
computer: levante
nodes: 4
choose_computer:
  levante:
    cores_per_node: 128
  \"*\":
    cores_per_node: 64
total: \"$(( ${nodes} * 32 ))\"
";
    let tree = load(doc).unwrap();
    assert_eq!(get(&tree, "cores_per_node"), &Value::Scalar(Yaml::Integer(128)));
    assert_eq!(get(&tree, "total"), &Value::Scalar(Yaml::Integer(128)));
    assert!(tree.as_mapping().unwrap().get("choose_computer").is_none());
}

#[test]
fn whole_reference_substitution_preserves_types() {
    let doc = "\
resolution:
  levels: 95
copy: \"${resolution}\"
label: \"res-${resolution.levels}\"
";
    let tree = load(doc).unwrap();
    assert_eq!(get(&tree, "copy.levels"), &Value::Scalar(Yaml::Integer(95)));
    assert_eq!(get(&tree, "label").as_str(), Some("res-95"));
}

#[test]
fn unresolved_reference_fails_with_its_text() {
    let error = load("a: \"${does.not.exist}\"\n").unwrap_err();
    match error {
        ConfigError::UnresolvedVariable { reference } => {
            assert!(reference.contains("does.not.exist"));
        }
        other => panic!("expected UnresolvedVariable, got {other:?}"),
    }
}

#[test]
fn nesting_beyond_max_depth_fails() {
    let options = LoadOptions {
        max_depth: 2,
        ..LoadOptions::default()
    };
    let doc = "\
a:
  b:
    c:
      d: 1
";
    let error = load_with_options(doc, None, &options).unwrap_err();
    match error {
        ConfigError::NestingTooDeep { max_depth, .. } => assert_eq!(max_depth, 2),
        other => panic!("expected NestingTooDeep, got {other:?}"),
    }
}

#[test]
fn rotating_reference_cycle_exhausts_the_round_bound() {
    // Every round rewrites each reference to the next one in the ring, so
    // progress never stops; the round bound is what terminates this.
    let options = LoadOptions {
        max_rounds: 8,
        ..LoadOptions::default()
    };
    let doc = "\
a: \"${b}\"
b: \"${c}\"
c: \"${a}\"
";
    let error = load_with_options(doc, None, &options).unwrap_err();
    assert!(matches!(error, ConfigError::UnresolvedVariable { .. }));
}

#[test]
fn shell_timeout_is_enforced() {
    let options = LoadOptions {
        shell: simcfg_config::ShellOptions {
            timeout: Some(std::time::Duration::from_millis(100)),
        },
        ..LoadOptions::default()
    };
    let error = load_with_options("slow: !SHELL $(sleep 30)\n", None, &options).unwrap_err();
    assert!(matches!(error, ConfigError::ShellTimeout { .. }));
}

#[test]
fn unknown_tags_pass_through_as_text() {
    let tree = load("value: !CUSTOM something\n").unwrap();
    assert_eq!(get(&tree, "value").as_str(), Some("something"));
}

#[test]
fn mapping_order_survives_the_whole_pipeline() {
    let doc = "\
zulu: 1
alpha: 2
mike: 3
";
    let tree = load(doc).unwrap();
    let keys: Vec<_> = tree.as_mapping().unwrap().keys().cloned().collect();
    assert_eq!(keys, ["zulu", "alpha", "mike"]);
}
