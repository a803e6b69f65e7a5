//! Recursive row-to-record decoding.
//!
//! One decoder serves a whole decode run: it borrows the schema graph
//! and record factory, both read-only, and turns one row plus one shape
//! into one record. Reference fields recurse into their target shape
//! against the same row, so a single physical row can back several
//! logical records at different positions.

use thiserror::Error;

use crate::error::DecodeError;
use crate::record::{AttrValue, Record, RecordFactory, SetError};
use crate::reader::{LineSource, RowSource};
use crate::schema::{FieldKind, FieldSpec, RecordShape, SchemaGraph};

/// Per-field fault. Logged at the row level; never surfaced to callers.
#[derive(Debug, Error)]
enum FieldFault {
    #[error("row too short: position {position} outside row of width {width}")]
    RowTooShort { position: usize, width: usize },

    #[error("attribute rejected: {0}")]
    Set(#[from] SetError),

    #[error("nested decode failed: {0}")]
    Nested(#[from] DecodeError),
}

/// Decodes rows into records.
///
/// The graph and factory are read-only during decoding, so one decoder
/// serves many rows, and independent rows may be decoded concurrently
/// through shared references.
#[derive(Clone, Copy)]
pub struct RecordDecoder<'a> {
    graph: &'a SchemaGraph,
    factory: &'a RecordFactory,
}

impl<'a> RecordDecoder<'a> {
    /// Create a decoder over a loaded graph and a populated factory.
    pub fn new(graph: &'a SchemaGraph, factory: &'a RecordFactory) -> Self {
        Self { graph, factory }
    }

    /// Decode one row against a shape.
    ///
    /// Per-field faults (row too short, rejected value, failed nested
    /// instantiation) leave the affected attribute unset and are
    /// logged; the record still completes. Only a failure to
    /// instantiate `shape`'s own target type fails the row.
    ///
    /// # Arguments
    ///
    /// * `row` - Raw field values; nested shapes read this same row
    /// * `shape` - Root shape to decode against
    pub fn decode(
        &self,
        row: &[String],
        shape: &RecordShape,
    ) -> Result<Box<dyn Record>, DecodeError> {
        let mut record =
            self.factory
                .instantiate(&shape.target_type)
                .ok_or_else(|| DecodeError::Instantiation {
                    target_type: shape.target_type.clone(),
                    shape: shape.name.clone(),
                })?;

        for field in &shape.fields {
            if let Err(fault) = self.decode_field(row, field, record.as_mut()) {
                tracing::warn!(
                    shape = %shape.name,
                    attribute = %field.attribute,
                    position = field.position,
                    %fault,
                    "field skipped"
                );
            }
        }

        Ok(record)
    }

    /// Decode every row from a line source against a named root shape.
    ///
    /// The stream honors the shape's header flag.
    ///
    /// # Errors
    ///
    /// * [`DecodeError::UnknownShape`] - No shape loaded under `shape_name`
    pub fn records(
        &self,
        shape_name: &str,
        source: Box<dyn LineSource>,
    ) -> Result<RecordStream<'a>, DecodeError> {
        let shape = self
            .graph
            .get(shape_name)
            .ok_or_else(|| DecodeError::UnknownShape(shape_name.to_string()))?;

        Ok(RecordStream {
            decoder: *self,
            shape,
            rows: RowSource::new(source, shape.header),
        })
    }

    fn decode_field(
        &self,
        row: &[String],
        field: &FieldSpec,
        record: &mut dyn Record,
    ) -> Result<(), FieldFault> {
        let value = match &field.kind {
            FieldKind::Scalar { transform, .. } => {
                let raw =
                    row.get(field.position)
                        .map(String::as_str)
                        .ok_or(FieldFault::RowTooShort {
                            position: field.position,
                            width: row.len(),
                        })?;
                AttrValue::Field(transform.apply(Some(raw)))
            }
            // Same row, reinterpreted by the referenced shape's own
            // positions. The load-time cycle check bounds the
            // recursion.
            FieldKind::Reference { shape, .. } => {
                let nested = self.graph.shape_at(*shape);
                AttrValue::Record(self.decode(row, nested)?)
            }
        };

        record.set_attribute(&field.attribute, value)?;
        Ok(())
    }
}

/// Iterator over decoded records from one line source.
///
/// Rows whose record could not be instantiated are skipped with a
/// warning, so the stream may yield fewer records than the source has
/// rows. Per-field faults never skip a row; they only leave attributes
/// unset.
pub struct RecordStream<'a> {
    decoder: RecordDecoder<'a>,
    shape: &'a RecordShape,
    rows: RowSource,
}

impl<'a> RecordStream<'a> {
    /// Name of the root shape this stream decodes.
    pub fn shape_name(&self) -> &str {
        &self.shape.name
    }

    /// Release the underlying line source early. Iteration afterwards
    /// reports exhaustion.
    pub fn close(&mut self) {
        self.rows.close();
    }
}

impl<'a> Iterator for RecordStream<'a> {
    type Item = Box<dyn Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let row = self.rows.next_row()?;
            match self.decoder.decode(&row, self.shape) {
                Ok(record) => return Some(record),
                Err(error) => {
                    tracing::warn!(shape = %self.shape.name, %error, "row skipped");
                }
            }
        }
    }
}
