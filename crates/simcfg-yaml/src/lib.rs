//! # simcfg-yaml
//!
//! YAML parsing with source location tracking and scalar tag capture.
//!
//! This crate produces a [`YamlNode`] tree: every node wraps an owned
//! `yaml-rust2::Yaml` value together with its position in the source text,
//! and scalars additionally carry any local tag (`!ENV`, `!SHELL`,
//! `!EXPAND`, ...) that was attached to them. The run-configuration
//! language implemented on top of this crate is tag-driven, so tags are
//! first-class here rather than being discarded during parsing.
//!
//! Mapping entry order is preserved; it is semantically significant for
//! later serialization.
//!
//! ## Example
//!
//! ```rust
//! use simcfg_yaml::parse;
//!
//! let node = parse("user: !ENV ${USER}").unwrap();
//! let user = node.get_mapping_value("user").unwrap();
//! assert_eq!(user.tag.as_ref().map(|t| t.suffix.as_str()), Some("ENV"));
//! ```

mod error;
mod node;
mod parser;
mod source_info;

pub use error::{Error, Result};
pub use node::{MappingEntry, YamlNode, YamlTag};
pub use parser::{parse, parse_file};
pub use source_info::SourceInfo;
