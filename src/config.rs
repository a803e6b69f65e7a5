//! Mapping document loading.
//!
//! One YAML document declares both the record shapes and any transform
//! registrations layered over the built-in set. [`MappingConfig::build`]
//! turns a parsed document into the registry and graph the decoder
//! needs.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::schema::{SchemaGraph, ShapeConfig};
use crate::transform::{TransformConfig, TransformRegistry};

/// Top-level mapping document.
///
/// # Example
///
/// ```yaml
/// shapes:
///   - name: person
///     target_type: person
///     header: true
///     fields:
///       - position: 0
///         attribute: id
///       - position: 1
///         attribute: first_name
///         transform: firstWord
///       - position: 3
///         attribute: email
///         reference: email
///   - name: email
///     target_type: email
///     fields:
///       - position: 3
///         attribute: id
/// transforms:
///   - name: upper
///     builtin: allUpperCase
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Record shape declarations.
    pub shapes: Vec<ShapeConfig>,

    /// Transform registrations layered over the built-in set.
    #[serde(default)]
    pub transforms: Vec<TransformConfig>,
}

impl MappingConfig {
    /// Parse a mapping document from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, LoadError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read and parse a mapping document from a file.
    ///
    /// # Errors
    ///
    /// * [`LoadError::Io`] - The file could not be read
    /// * [`LoadError::Yaml`] - The document does not match the layout
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Build the transform registry and schema graph this mapping
    /// declares.
    ///
    /// The registry starts from the built-in set under canonical names;
    /// declared transforms are layered on top and may shadow them.
    pub fn build(self) -> Result<(TransformRegistry, SchemaGraph), LoadError> {
        let mut registry = TransformRegistry::with_builtins();
        registry.register_configs(&self.transforms);
        let graph = SchemaGraph::load(self.shapes, &registry)?;
        Ok((registry, graph))
    }
}
