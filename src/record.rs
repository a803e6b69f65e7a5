//! Decoded record plumbing: the attribute sink trait, the constructor
//! registry, and a map-backed generic record.
//!
//! The decoder never reflects over target types. Every decodable type
//! implements [`Record`] to accept attribute values, and is registered
//! in a [`RecordFactory`] under the target-type key its shape declares.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;

use crate::value::FieldValue;

/// Error type for attribute assignment.
#[derive(Debug, Clone, Error)]
pub enum SetError {
    /// The record has no attribute under that name.
    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),

    /// The attribute exists but rejected the value.
    #[error("attribute '{attribute}' rejected value: {reason}")]
    Rejected { attribute: String, reason: String },
}

/// Value assigned to one record attribute: a transformed scalar or a
/// record decoded from the same row.
pub enum AttrValue {
    Field(FieldValue),
    Record(Box<dyn Record>),
}

impl AttrValue {
    /// View the scalar value, if this is one.
    pub fn as_field(&self) -> Option<&FieldValue> {
        match self {
            AttrValue::Field(value) => Some(value),
            AttrValue::Record(_) => None,
        }
    }

    /// Take the nested record, if this is one.
    pub fn into_record(self) -> Option<Box<dyn Record>> {
        match self {
            AttrValue::Field(_) => None,
            AttrValue::Record(record) => Some(record),
        }
    }
}

impl fmt::Debug for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Field(value) => write!(f, "Field({:?})", value),
            AttrValue::Record(_) => write!(f, "Record(..)"),
        }
    }
}

/// Sink for decoded attribute values.
///
/// The decoder assigns every field it decodes through this trait; an
/// implementation maps attribute names onto its own storage. Returning
/// an error skips that attribute without failing the row.
///
/// # Example
///
/// ```ignore
/// use rowbind::{AttrValue, FieldValue, Record, SetError};
///
/// #[derive(Default)]
/// struct Designation {
///     value: String,
/// }
///
/// impl Record for Designation {
///     fn set_attribute(&mut self, attribute: &str, value: AttrValue) -> Result<(), SetError> {
///         match (attribute, value) {
///             ("value", AttrValue::Field(FieldValue::Text(text))) => {
///                 self.value = text;
///                 Ok(())
///             }
///             (other, _) => Err(SetError::UnknownAttribute(other.to_string())),
///         }
///     }
///
///     fn as_any(&self) -> &dyn std::any::Any {
///         self
///     }
///
///     fn into_any(self: Box<Self>) -> Box<dyn std::any::Any> {
///         self
///     }
/// }
/// ```
pub trait Record {
    /// Assign one decoded value onto an attribute.
    fn set_attribute(&mut self, attribute: &str, value: AttrValue) -> Result<(), SetError>;

    /// Borrowed upcast, so decoded records can be downcast to their
    /// concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Owned upcast, for consuming a decoded record.
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl dyn Record {
    /// Downcast a borrowed record to a concrete type.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    /// Downcast an owned record to a concrete type.
    pub fn downcast<T: 'static>(self: Box<Self>) -> Option<Box<T>> {
        self.into_any().downcast().ok()
    }
}

/// Constructor producing one empty record.
pub type Constructor = Box<dyn Fn() -> Box<dyn Record> + Send + Sync>;

/// Registry mapping target-type keys to record constructors.
///
/// Decodable types are registered explicitly before decoding starts;
/// a shape whose target type has no entry fails per row, not at load.
pub struct RecordFactory {
    constructors: HashMap<String, Constructor>,
}

impl RecordFactory {
    /// Create a new empty factory.
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register a constructor under a target-type key.
    pub fn register(&mut self, target_type: impl Into<String>, constructor: Constructor) {
        self.constructors.insert(target_type.into(), constructor);
    }

    /// Register `T::default` as the constructor for a target-type key.
    pub fn register_default<T>(&mut self, target_type: impl Into<String>)
    where
        T: Record + Default + 'static,
    {
        self.register(
            target_type,
            Box::new(|| Box::new(T::default()) as Box<dyn Record>),
        );
    }

    /// Construct an empty record for a target type, if registered.
    pub fn instantiate(&self, target_type: &str) -> Option<Box<dyn Record>> {
        self.constructors.get(target_type).map(|construct| construct())
    }

    /// Check if a target type has a registered constructor.
    pub fn has_type(&self, target_type: &str) -> bool {
        self.constructors.contains_key(target_type)
    }
}

impl Default for RecordFactory {
    fn default() -> Self {
        Self::new()
    }
}

/// Map-backed record for consumers that want decoded data without
/// defining a target type.
///
/// Attributes keep assignment order, which follows field position
/// order, so JSON snapshots are deterministic.
#[derive(Default)]
pub struct GenericRecord {
    attributes: IndexMap<String, AttrValue>,
}

impl GenericRecord {
    /// Create a new empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw attribute value, if set.
    pub fn get(&self, attribute: &str) -> Option<&AttrValue> {
        self.attributes.get(attribute)
    }

    /// Scalar attribute value, if set.
    pub fn field(&self, attribute: &str) -> Option<&FieldValue> {
        self.attributes.get(attribute).and_then(AttrValue::as_field)
    }

    /// Scalar attribute as text, if set and textual.
    pub fn text(&self, attribute: &str) -> Option<&str> {
        self.field(attribute).and_then(FieldValue::as_text)
    }

    /// Nested record attribute, if set and itself a `GenericRecord`.
    pub fn nested(&self, attribute: &str) -> Option<&GenericRecord> {
        match self.attributes.get(attribute) {
            Some(AttrValue::Record(record)) => record.as_any().downcast_ref(),
            _ => None,
        }
    }

    /// Number of attributes set.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Whether no attribute has been set.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// JSON snapshot of the record, nested `GenericRecord`s included.
    /// Nested records of other types snapshot as null.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (attribute, value) in &self.attributes {
            let json = match value {
                AttrValue::Field(field) => {
                    serde_json::to_value(field).unwrap_or(serde_json::Value::Null)
                }
                AttrValue::Record(record) => record
                    .as_any()
                    .downcast_ref::<GenericRecord>()
                    .map(GenericRecord::to_json)
                    .unwrap_or(serde_json::Value::Null),
            };
            map.insert(attribute.clone(), json);
        }
        serde_json::Value::Object(map)
    }
}

impl fmt::Debug for GenericRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.attributes.iter()).finish()
    }
}

impl Record for GenericRecord {
    fn set_attribute(&mut self, attribute: &str, value: AttrValue) -> Result<(), SetError> {
        self.attributes.insert(attribute.to_string(), value);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}
