//! Event-driven parser producing [`YamlNode`] trees.

use crate::{Error, MappingEntry, Result, SourceInfo, YamlNode, YamlTag};
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser, Tag};
use yaml_rust2::scanner::{Marker, TScalarStyle};
use yaml_rust2::Yaml;

/// Parse a single YAML document from a string.
///
/// If the input contains multiple documents, only the first is parsed.
///
/// # Example
///
/// ```rust
/// use simcfg_yaml::parse;
///
/// let node = parse("model: fesom").unwrap();
/// assert!(node.is_mapping());
/// ```
///
/// # Errors
///
/// Returns an error if the input is not valid YAML or contains no document.
pub fn parse(content: &str) -> Result<YamlNode> {
    parse_impl(content, None)
}

/// Parse a single YAML document, recording the filename in source locations.
///
/// # Errors
///
/// Returns an error if the input is not valid YAML or contains no document.
pub fn parse_file(content: &str, filename: &str) -> Result<YamlNode> {
    parse_impl(content, Some(filename))
}

fn parse_impl(content: &str, filename: Option<&str>) -> Result<YamlNode> {
    let mut parser = Parser::new_from_str(content);
    let mut builder = NodeBuilder::new(filename);

    parser.load(&mut builder, false).map_err(Error::from)?;

    if let Some(error) = builder.error.take() {
        return Err(error);
    }
    builder.root.take().ok_or(Error::UnexpectedEof { location: None })
}

/// Incremental tree builder fed by the yaml-rust2 event stream.
struct NodeBuilder {
    filename: Option<String>,

    /// Containers currently being built, innermost last.
    stack: Vec<OpenNode>,

    root: Option<YamlNode>,

    /// First structural error, if any. The event callback cannot return a
    /// Result, so errors are parked here and surfaced after loading.
    error: Option<Error>,
}

enum OpenNode {
    Sequence {
        start: Marker,
        items: Vec<YamlNode>,
    },
    Mapping {
        start: Marker,
        entries: Vec<(YamlNode, Option<YamlNode>)>,
    },
}

impl NodeBuilder {
    fn new(filename: Option<&str>) -> Self {
        Self {
            filename: filename.map(str::to_string),
            stack: Vec::new(),
            root: None,
            error: None,
        }
    }

    fn source_info(&self, marker: &Marker, len: usize) -> SourceInfo {
        let mut info = SourceInfo::from_marker(marker, len);
        if let Some(ref filename) = self.filename {
            info = info.with_file(filename.clone());
        }
        info
    }

    fn finish_node(&mut self, node: YamlNode) {
        match self.stack.last_mut() {
            None => {
                // Completed the document root.
                self.root = Some(node);
            }
            Some(OpenNode::Sequence { items, .. }) => items.push(node),
            Some(OpenNode::Mapping { entries, .. }) => match entries.last_mut() {
                Some((_, slot @ None)) => *slot = Some(node),
                _ => entries.push((node, None)),
            },
        }
    }

    fn fail(&mut self, message: &str, marker: &Marker) {
        if self.error.is_none() {
            self.error = Some(Error::InvalidStructure {
                message: message.to_string(),
                location: Some(self.source_info(marker, 0)),
            });
        }
    }
}

impl MarkedEventReceiver for NodeBuilder {
    fn on_event(&mut self, ev: Event, marker: Marker) {
        if self.error.is_some() {
            return;
        }
        match ev {
            Event::Nothing
            | Event::StreamStart
            | Event::StreamEnd
            | Event::DocumentStart
            | Event::DocumentEnd => {}

            Event::Scalar(value, style, _anchor_id, tag) => {
                let source = self.source_info(&marker, value.len());
                let tag = local_tag(tag, &source);

                let node = match tag {
                    // Tagged scalars keep their literal text: the tag decides
                    // how the text is interpreted later, so type inference
                    // must not get there first.
                    Some(tag) => {
                        YamlNode::tagged_scalar(Yaml::String(value), source, tag)
                    }
                    // Only plain scalars are inferred; quoted text stays text.
                    None if style == TScalarStyle::Plain => {
                        YamlNode::scalar(infer_scalar(&value), source)
                    }
                    None => YamlNode::scalar(Yaml::String(value), source),
                };
                self.finish_node(node);
            }

            Event::SequenceStart(_anchor_id, _tag) => {
                self.stack.push(OpenNode::Sequence {
                    start: marker,
                    items: Vec::new(),
                });
            }

            Event::SequenceEnd => {
                match self.stack.pop() {
                    Some(OpenNode::Sequence { start, items }) => {
                        let len = marker.index().saturating_sub(start.index());
                        let source = self.source_info(&start, len);
                        let yaml = Yaml::Array(items.iter().map(|n| n.yaml.clone()).collect());
                        let node = YamlNode::sequence(yaml, source, items);
                        self.finish_node(node);
                    }
                    _ => self.fail("sequence end without matching start", &marker),
                }
            }

            Event::MappingStart(_anchor_id, _tag) => {
                self.stack.push(OpenNode::Mapping {
                    start: marker,
                    entries: Vec::new(),
                });
            }

            Event::MappingEnd => {
                match self.stack.pop() {
                    Some(OpenNode::Mapping { start, entries }) => {
                        let len = marker.index().saturating_sub(start.index());
                        let source = self.source_info(&start, len);

                        let mut built = Vec::with_capacity(entries.len());
                        let mut hash = yaml_rust2::yaml::Hash::new();
                        for (key, value) in entries {
                            let Some(value) = value else {
                                self.fail("mapping entry without a value", &marker);
                                return;
                            };
                            let span_start = key.source.offset;
                            let span_len =
                                value.source.end_offset().saturating_sub(span_start);
                            let entry_span = SourceInfo::new(
                                self.filename.clone(),
                                span_start,
                                key.source.line,
                                key.source.col,
                                span_len,
                            );
                            hash.insert(key.yaml.clone(), value.yaml.clone());
                            built.push(MappingEntry::new(key, value, entry_span));
                        }

                        let node = YamlNode::mapping(Yaml::Hash(hash), source, built);
                        self.finish_node(node);
                    }
                    _ => self.fail("mapping end without matching start", &marker),
                }
            }

            Event::Alias(_anchor_id) => {
                // Anchors/aliases are not supported; an alias degrades to null.
                let source = self.source_info(&marker, 0);
                self.finish_node(YamlNode::scalar(Yaml::Null, source));
            }
        }
    }
}

/// Extract a local (`!name`) tag, ignoring core YAML tags.
fn local_tag(tag: Option<Tag>, source: &SourceInfo) -> Option<YamlTag> {
    let tag = tag?;
    if tag.handle != "!" || tag.suffix.is_empty() {
        return None;
    }
    Some(YamlTag {
        suffix: tag.suffix,
        source: source.clone(),
    })
}

/// Infer the Yaml type of an untagged scalar (int, float, bool, null, string).
fn infer_scalar(value: &str) -> Yaml {
    if let Ok(i) = value.parse::<i64>() {
        return Yaml::Integer(i);
    }
    if value.parse::<f64>().is_ok() {
        return Yaml::Real(value.to_string());
    }
    match value {
        "true" | "True" | "TRUE" => Yaml::Boolean(true),
        "false" | "False" | "FALSE" => Yaml::Boolean(false),
        "null" | "Null" | "NULL" | "~" | "" => Yaml::Null,
        _ => Yaml::String(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scalars_with_type_inference() {
        assert_eq!(parse("42").unwrap().yaml.as_i64(), Some(42));
        assert_eq!(parse("true").unwrap().yaml.as_bool(), Some(true));
        assert_eq!(parse("hello").unwrap().yaml.as_str(), Some("hello"));
        assert!(parse("~").unwrap().yaml.is_null());
    }

    #[test]
    fn parses_nested_structure() {
        let node = parse(
            r#"
general:
  setup_name: awicm
  models:
    - echam
    - fesom
"#,
        )
        .unwrap();

        let general = node.get_mapping_value("general").unwrap();
        assert!(general.is_mapping());
        let models = general.get_mapping_value("models").unwrap();
        assert!(models.is_sequence());
        assert_eq!(models.len(), 2);
        assert_eq!(
            models.as_sequence().unwrap()[1].yaml.as_str(),
            Some("fesom")
        );
    }

    #[test]
    fn captures_local_tags_on_scalars() {
        let node = parse("user: !ENV ${USER}").unwrap();
        let user = node.get_mapping_value("user").unwrap();

        let tag = user.tag.as_ref().expect("tag should be captured");
        assert_eq!(tag.suffix, "ENV");
        // Tagged scalars stay literal strings, untouched by inference.
        assert_eq!(user.yaml.as_str(), Some("${USER}"));
    }

    #[test]
    fn tagged_numeric_scalar_stays_a_string() {
        let node = parse("n: !SHELL 42").unwrap();
        let n = node.get_mapping_value("n").unwrap();
        assert_eq!(n.yaml.as_str(), Some("42"));
    }

    #[test]
    fn quoted_scalars_are_not_inferred() {
        let node = parse("n: \"42\"").unwrap();
        assert_eq!(node.get_mapping_value("n").unwrap().yaml.as_str(), Some("42"));
    }

    #[test]
    fn untagged_scalars_have_no_tag() {
        let node = parse("plain: value").unwrap();
        assert!(node.get_mapping_value("plain").unwrap().tag.is_none());
    }

    #[test]
    fn mapping_order_is_preserved() {
        let node = parse("b: 1\na: 2\nc: 3").unwrap();
        let keys: Vec<&str> = node
            .as_mapping()
            .unwrap()
            .iter()
            .map(|e| e.key.yaml.as_str().unwrap())
            .collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn records_source_positions() {
        let node = parse_file("title: Run", "run.yaml").unwrap();
        assert_eq!(node.source.file, Some("run.yaml".into()));

        let title = node.get_mapping_value("title").unwrap();
        assert_eq!(title.source.line, 1);
        assert!(title.source.col > 1);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(parse("").is_err());
    }

    #[test]
    fn syntax_error_is_reported() {
        let error = parse("key: [unclosed").unwrap_err();
        assert!(matches!(error, Error::ParseError { .. }));
    }
}
