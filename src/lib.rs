//! # Rowbind: Schema-Driven Positional Record Decoding
//!
//! Rowbind turns flat, position-addressed rows of string fields into
//! typed, possibly nested records, driven entirely by a declarative
//! mapping loaded once at startup.
//!
//! ## Features
//!
//! - **Declarative shapes**: map row positions to record attributes, with
//!   per-field transforms and defaults
//! - **Nested decoding**: a field can reference another shape, decoded
//!   against the *same* row at its own positions
//! - **Transform registry**: named, pre-resolved field transforms with a
//!   built-in set and closure-based extensions
//! - **Best-effort rows**: per-field faults leave attributes unset and
//!   per-row faults skip records; a decode run never aborts mid-stream
//! - **Pluggable sources and targets**: rows come from any [`LineSource`],
//!   records go into any [`Record`] implementation
//!
//! ## Example: mapping document
//!
//! ```yaml
//! shapes:
//!   - name: employee
//!     target_type: employee
//!     header: true
//!     fields:
//!       - position: 0
//!         attribute: id
//!       - position: 1
//!         attribute: first_name
//!         transform: firstWord
//!       - position: 1
//!         attribute: last_name
//!         transform: lastWord
//!       - position: 2
//!         attribute: designation
//!         reference: designation
//!   - name: designation
//!     target_type: designation
//!     fields:
//!       - position: 2
//!         attribute: value
//! ```
//!
//! ## Example: decoding
//!
//! ```ignore
//! use rowbind::{MappingConfig, RecordDecoder, RecordFactory, GenericRecord, VecLineSource};
//!
//! let (_registry, graph) = MappingConfig::load_from_file("mapping.yaml")?.build()?;
//!
//! let mut factory = RecordFactory::new();
//! factory.register_default::<GenericRecord>("employee");
//! factory.register_default::<GenericRecord>("designation");
//!
//! let decoder = RecordDecoder::new(&graph, &factory);
//! let source = VecLineSource::from_rows(&[
//!     &["empNo", "name", "designation"],
//!     &["123456", "John Q Public", "Lead"],
//! ]);
//! for record in decoder.records("employee", Box::new(source))? {
//!     let employee = record.downcast::<GenericRecord>().unwrap();
//!     println!("{}", employee.to_json());
//! }
//! ```

// Core modules
pub mod value;
pub mod transform;
pub mod schema;
pub mod record;
pub mod reader;
pub mod decode;

// Mapping document loading
pub mod config;

// Error types
pub mod error;

// Re-export key types
pub use value::FieldValue;
pub use transform::{
    BuiltinTransform, Transform, TransformConfig, TransformError, TransformRegistry,
    NONE_TRANSFORM,
};
pub use schema::{FieldConfig, FieldKind, FieldSpec, RecordShape, SchemaGraph, ShapeConfig};
pub use record::{AttrValue, Constructor, GenericRecord, Record, RecordFactory, SetError};
pub use reader::{LineSource, RowSource, VecLineSource};
pub use decode::{RecordDecoder, RecordStream};
pub use config::MappingConfig;
pub use error::{DecodeError, LoadError};
