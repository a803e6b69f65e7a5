//! Error types for schema loading and record decoding.
//!
//! Loading fails loudly: an unresolvable configuration is rejected
//! before any row is read. Decoding fails quietly: per-row and
//! per-field faults are logged and folded into partial results, so the
//! variants here cover only the failures a caller can act on.

use thiserror::Error;

/// Errors raised while loading a mapping into a usable schema graph.
#[derive(Debug, Error)]
pub enum LoadError {
    /// A field declared a transform the registry cannot resolve.
    #[error("unknown transform '{transform}' on field '{attribute}' of shape '{shape}'")]
    UnknownTransform {
        transform: String,
        shape: String,
        attribute: String,
    },

    /// Shape references form a cycle; decoding would recurse forever.
    #[error("cyclic shape reference: {path}")]
    CyclicReference { path: String },

    /// The mapping file could not be read.
    #[error("failed to read mapping file: {0}")]
    Io(#[from] std::io::Error),

    /// The mapping document is not valid YAML for the expected layout.
    #[error("failed to parse mapping document: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors surfaced by the decoder.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The requested root shape is not in the graph.
    #[error("unknown shape: {0}")]
    UnknownShape(String),

    /// No constructor is registered for a shape's target type.
    #[error("no constructor registered for target type '{target_type}' (shape '{shape}')")]
    Instantiation { target_type: String, shape: String },
}
