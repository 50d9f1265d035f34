//! The parsed YAML tree: owned values with source locations and tags.

use crate::SourceInfo;
use yaml_rust2::Yaml;

/// A local tag attached to a scalar node (e.g. `!ENV`, `!SHELL`, `!EXPAND`).
///
/// Only the tag suffix is stored; the leading `!` handle is implied. Core
/// YAML tags (`tag:yaml.org,2002:*`) are not recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YamlTag {
    /// Tag name without the `!` prefix.
    pub suffix: String,

    /// Where the tagged scalar appears in the source.
    pub source: SourceInfo,
}

/// A YAML value with source tracking and optional tag.
///
/// Uses the owned data approach: each node stores a complete
/// `yaml-rust2::Yaml` value plus a parallel children structure that carries
/// per-child source information. This trades some memory for an API without
/// lifetime parameters, which matters because resolved trees outlive the
/// text they were parsed from.
#[derive(Debug, Clone)]
pub struct YamlNode {
    /// The complete underlying Yaml value for this subtree.
    pub yaml: Yaml,

    /// Source location of this node.
    pub source: SourceInfo,

    /// Local tag on this scalar, if any.
    pub tag: Option<YamlTag>,

    children: Children,
}

#[derive(Debug, Clone)]
enum Children {
    /// Scalars and null values.
    Leaf,

    /// Sequence elements, in document order.
    Sequence(Vec<YamlNode>),

    /// Mapping entries, in document order.
    Mapping(Vec<MappingEntry>),
}

/// A key/value pair in a YAML mapping, with per-part source tracking.
#[derive(Debug, Clone)]
pub struct MappingEntry {
    pub key: YamlNode,
    pub value: YamlNode,

    /// Span covering the whole entry (key through value).
    pub entry_span: SourceInfo,
}

impl YamlNode {
    /// Create a scalar (leaf) node without a tag.
    pub fn scalar(yaml: Yaml, source: SourceInfo) -> Self {
        Self {
            yaml,
            source,
            tag: None,
            children: Children::Leaf,
        }
    }

    /// Create a scalar node carrying a tag.
    pub fn tagged_scalar(yaml: Yaml, source: SourceInfo, tag: YamlTag) -> Self {
        Self {
            yaml,
            source,
            tag: Some(tag),
            children: Children::Leaf,
        }
    }

    /// Create a sequence node from its elements.
    pub fn sequence(yaml: Yaml, source: SourceInfo, items: Vec<YamlNode>) -> Self {
        Self {
            yaml,
            source,
            tag: None,
            children: Children::Sequence(items),
        }
    }

    /// Create a mapping node from its entries.
    pub fn mapping(yaml: Yaml, source: SourceInfo, entries: Vec<MappingEntry>) -> Self {
        Self {
            yaml,
            source,
            tag: None,
            children: Children::Mapping(entries),
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.children, Children::Leaf)
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.children, Children::Sequence(_))
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self.children, Children::Mapping(_))
    }

    /// Sequence elements, if this is a sequence.
    pub fn as_sequence(&self) -> Option<&[YamlNode]> {
        match &self.children {
            Children::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Mapping entries, if this is a mapping.
    pub fn as_mapping(&self) -> Option<&[MappingEntry]> {
        match &self.children {
            Children::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up a mapping value by string key.
    pub fn get_mapping_value(&self, key: &str) -> Option<&YamlNode> {
        match &self.children {
            Children::Mapping(entries) => entries
                .iter()
                .find(|entry| entry.key.yaml.as_str() == Some(key))
                .map(|entry| &entry.value),
            _ => None,
        }
    }

    /// Number of children (sequence length or mapping entry count).
    pub fn len(&self) -> usize {
        match &self.children {
            Children::Leaf => 0,
            Children::Sequence(items) => items.len(),
            Children::Mapping(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume self, returning owned sequence elements.
    pub fn into_sequence(self) -> Option<Vec<YamlNode>> {
        match self.children {
            Children::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Consume self, returning owned mapping entries.
    pub fn into_mapping(self) -> Option<Vec<MappingEntry>> {
        match self.children {
            Children::Mapping(entries) => Some(entries),
            _ => None,
        }
    }
}

impl MappingEntry {
    pub fn new(key: YamlNode, value: YamlNode, entry_span: SourceInfo) -> Self {
        Self {
            key,
            value,
            entry_span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_node_has_no_children() {
        let node = YamlNode::scalar(Yaml::String("x".into()), SourceInfo::default());
        assert!(node.is_scalar());
        assert!(!node.is_sequence());
        assert!(!node.is_mapping());
        assert_eq!(node.len(), 0);
        assert!(node.tag.is_none());
    }

    #[test]
    fn tagged_scalar_keeps_tag() {
        let tag = YamlTag {
            suffix: "ENV".into(),
            source: SourceInfo::default(),
        };
        let node = YamlNode::tagged_scalar(
            Yaml::String("${HOME}".into()),
            SourceInfo::default(),
            tag,
        );
        assert_eq!(node.tag.as_ref().map(|t| t.suffix.as_str()), Some("ENV"));
    }

    #[test]
    fn mapping_lookup_by_key() {
        let key = YamlNode::scalar(Yaml::String("name".into()), SourceInfo::default());
        let value = YamlNode::scalar(Yaml::String("fesom".into()), SourceInfo::default());
        let entry = MappingEntry::new(key, value, SourceInfo::default());

        let mut hash = yaml_rust2::yaml::Hash::new();
        hash.insert(Yaml::String("name".into()), Yaml::String("fesom".into()));
        let node = YamlNode::mapping(Yaml::Hash(hash), SourceInfo::default(), vec![entry]);

        assert!(node.is_mapping());
        assert_eq!(
            node.get_mapping_value("name").unwrap().yaml.as_str(),
            Some("fesom")
        );
        assert!(node.get_mapping_value("missing").is_none());
    }

    #[test]
    fn sequence_elements_in_order() {
        let items = vec![
            YamlNode::scalar(Yaml::Integer(1), SourceInfo::default()),
            YamlNode::scalar(Yaml::Integer(2), SourceInfo::default()),
        ];
        let node = YamlNode::sequence(
            Yaml::Array(vec![Yaml::Integer(1), Yaml::Integer(2)]),
            SourceInfo::default(),
            items,
        );
        let elems = node.as_sequence().unwrap();
        assert_eq!(elems[0].yaml.as_i64(), Some(1));
        assert_eq!(elems[1].yaml.as_i64(), Some(2));
    }
}
