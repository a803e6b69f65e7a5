//! Shape declarations and the resolved schema graph.
//!
//! A mapping starts as plain [`ShapeConfig`] records, usually parsed
//! from YAML. [`SchemaGraph::load`] resolves them in two passes: index
//! every shape by name, then bind each field to either a pre-resolved
//! transform or the table index of the shape it references. References
//! that match no shape degrade to plain scalars with a warning; unknown
//! transform names and reference cycles fail the whole load.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::transform::{Transform, TransformRegistry, NONE_TRANSFORM};

/// Reserved reference name declaring a plain scalar field.
const NO_REFERENCE: &str = "none";

fn default_transform() -> String {
    NONE_TRANSFORM.to_string()
}

fn default_reference() -> String {
    NO_REFERENCE.to_string()
}

/// One field declaration inside a shape, as parsed from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    /// Zero-based position of the raw value within the row.
    pub position: usize,

    /// Attribute the decoded value is assigned to.
    pub attribute: String,

    /// Transform applied to the raw value; `"none"` is the identity.
    #[serde(default = "default_transform")]
    pub transform: String,

    /// Shape decoded from the same row to produce this field's value;
    /// `"none"` declares a plain scalar field.
    #[serde(default = "default_reference")]
    pub reference: String,
}

impl FieldConfig {
    /// Declare a scalar field with the identity transform.
    pub fn new(position: usize, attribute: impl Into<String>) -> Self {
        Self {
            position,
            attribute: attribute.into(),
            transform: default_transform(),
            reference: default_reference(),
        }
    }

    /// Set the transform name.
    pub fn with_transform(mut self, transform: impl Into<String>) -> Self {
        self.transform = transform.into();
        self
    }

    /// Set the referenced shape name.
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = reference.into();
        self
    }
}

/// One record shape as parsed from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeConfig {
    /// Unique name other shapes reference this one by.
    pub name: String,

    /// Factory key of the record type to instantiate.
    pub target_type: String,

    /// Whether a row source feeding this shape as the root starts with
    /// a header row.
    #[serde(default)]
    pub header: bool,

    /// Field declarations, in any order.
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

impl ShapeConfig {
    /// Declare an empty shape.
    pub fn new(name: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_type: target_type.into(),
            header: false,
            fields: Vec::new(),
        }
    }

    /// Set the header flag.
    pub fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    /// Add a field declaration.
    pub fn with_field(mut self, field: FieldConfig) -> Self {
        self.fields.push(field);
        self
    }
}

/// Resolved behavior of a field.
#[derive(Clone)]
pub enum FieldKind {
    /// Apply a transform to the raw value at the field's position.
    Scalar {
        /// Declared transform name, kept for diagnostics.
        transform_name: String,
        /// Pre-resolved shared implementation.
        transform: Arc<dyn Transform>,
    },

    /// Decode another shape against the same row.
    Reference {
        /// Name of the referenced shape.
        shape_name: String,
        /// Table index of the referenced shape in the graph.
        shape: usize,
    },
}

impl fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Scalar { transform_name, .. } => f
                .debug_struct("Scalar")
                .field("transform", transform_name)
                .finish(),
            FieldKind::Reference { shape_name, shape } => f
                .debug_struct("Reference")
                .field("shape", shape_name)
                .field("index", shape)
                .finish(),
        }
    }
}

/// One resolved field of a [`RecordShape`].
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Zero-based position within the row.
    pub position: usize,

    /// Attribute assigned on the decoded record.
    pub attribute: String,

    /// How the raw value becomes the attribute value.
    pub kind: FieldKind,
}

/// One resolved record shape: where each attribute comes from within a
/// row and which type the decoder instantiates.
#[derive(Debug, Clone)]
pub struct RecordShape {
    /// Unique shape name.
    pub name: String,

    /// Factory key of the record type to instantiate.
    pub target_type: String,

    /// Whether a row source feeding this shape as the root skips a
    /// header row.
    pub header: bool,

    /// Fields in ascending position order; equal positions keep
    /// declaration order.
    pub fields: Vec<FieldSpec>,

    /// Highest declared position. Advisory lower bound on row width,
    /// not enforced against incoming rows.
    pub max_position: usize,
}

/// Name-keyed table of resolved shapes.
///
/// Built once by [`SchemaGraph::load`] and read-only afterwards, so it
/// can be shared freely across threads. Reference fields hold table
/// indices rather than owning their target shape, which is what lets
/// shapes reference each other without ownership knots.
pub struct SchemaGraph {
    shapes: IndexMap<String, RecordShape>,
}

impl fmt::Debug for SchemaGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaGraph")
            .field("shapes", &self.shape_names())
            .finish()
    }
}

impl SchemaGraph {
    /// Resolve shape declarations into a decodable graph.
    ///
    /// # Arguments
    ///
    /// * `configs` - Parsed shape declarations, in any order
    /// * `transforms` - Registry every scalar field resolves against
    ///
    /// # Errors
    ///
    /// * [`LoadError::UnknownTransform`] - A field declared a transform
    ///   the registry cannot resolve
    /// * [`LoadError::CyclicReference`] - Shape references form a cycle
    pub fn load(
        configs: Vec<ShapeConfig>,
        transforms: &TransformRegistry,
    ) -> Result<Self, LoadError> {
        // Pass 1: index by name. A repeated name replaces the earlier
        // declaration.
        let mut declared: IndexMap<String, ShapeConfig> = IndexMap::new();
        for config in configs {
            if declared.contains_key(&config.name) {
                tracing::warn!(shape = %config.name, "duplicate shape name; later declaration wins");
            }
            declared.insert(config.name.clone(), config);
        }

        // Pass 2: resolve fields against the complete name table, so
        // forward references work regardless of declaration order.
        let mut shapes: IndexMap<String, RecordShape> = IndexMap::with_capacity(declared.len());
        for (name, config) in &declared {
            let mut fields = Vec::with_capacity(config.fields.len());
            for field in &config.fields {
                fields.push(resolve_field(field, config, &declared, transforms)?);
            }
            let fields = normalize_fields(name, fields);
            let max_position = fields.iter().map(|field| field.position).max().unwrap_or(0);

            shapes.insert(
                name.clone(),
                RecordShape {
                    name: name.clone(),
                    target_type: config.target_type.clone(),
                    header: config.header,
                    fields,
                    max_position,
                },
            );
        }

        // Pass 3: reject reference cycles so the decoder can recurse
        // without a depth guard.
        check_cycles(&shapes)?;

        Ok(Self { shapes })
    }

    /// Look up a shape by name.
    pub fn get(&self, name: &str) -> Option<&RecordShape> {
        self.shapes.get(name)
    }

    /// Table index of a shape, usable with [`SchemaGraph::shape_at`].
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.shapes.get_index_of(name)
    }

    /// Shape at a table index. Reference fields hold these indices.
    ///
    /// # Panics
    ///
    /// Panics if `index` did not come from this graph.
    pub fn shape_at(&self, index: usize) -> &RecordShape {
        &self.shapes[index]
    }

    /// Number of shapes loaded.
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Whether the graph holds no shapes.
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Names of all loaded shapes, in declaration order.
    pub fn shape_names(&self) -> Vec<&str> {
        self.shapes.keys().map(String::as_str).collect()
    }
}

fn resolve_field(
    field: &FieldConfig,
    shape: &ShapeConfig,
    declared: &IndexMap<String, ShapeConfig>,
    transforms: &TransformRegistry,
) -> Result<FieldSpec, LoadError> {
    let kind = if field.reference != NO_REFERENCE {
        match declared.get_index_of(field.reference.as_str()) {
            Some(target) => FieldKind::Reference {
                shape_name: field.reference.clone(),
                shape: target,
            },
            None => {
                // Degraded fields still resolve their declared
                // transform, so a bad transform name fails the load
                // even here.
                tracing::warn!(
                    shape = %shape.name,
                    attribute = %field.attribute,
                    reference = %field.reference,
                    "reference matches no shape; field degrades to a scalar"
                );
                scalar_kind(field, shape, transforms)?
            }
        }
    } else {
        scalar_kind(field, shape, transforms)?
    };

    Ok(FieldSpec {
        position: field.position,
        attribute: field.attribute.clone(),
        kind,
    })
}

fn scalar_kind(
    field: &FieldConfig,
    shape: &ShapeConfig,
    transforms: &TransformRegistry,
) -> Result<FieldKind, LoadError> {
    let transform = transforms
        .resolve(&field.transform)
        .map_err(|_| LoadError::UnknownTransform {
            transform: field.transform.clone(),
            shape: shape.name.clone(),
            attribute: field.attribute.clone(),
        })?;

    Ok(FieldKind::Scalar {
        transform_name: field.transform.clone(),
        transform,
    })
}

/// Collapse exact duplicates (first declaration wins), then order by
/// position. The sort is stable, so fields sharing a position keep
/// their declaration order.
fn normalize_fields(shape: &str, fields: Vec<FieldSpec>) -> Vec<FieldSpec> {
    let mut seen: HashSet<(usize, String)> = HashSet::new();
    let mut unique = Vec::with_capacity(fields.len());
    for field in fields {
        if seen.insert((field.position, field.attribute.clone())) {
            unique.push(field);
        } else {
            tracing::debug!(
                shape = %shape,
                position = field.position,
                attribute = %field.attribute,
                "duplicate field declaration collapsed"
            );
        }
    }
    unique.sort_by_key(|field| field.position);
    unique
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

fn check_cycles(shapes: &IndexMap<String, RecordShape>) -> Result<(), LoadError> {
    let mut marks = vec![Mark::Unvisited; shapes.len()];
    let mut path = Vec::new();
    for index in 0..shapes.len() {
        if marks[index] == Mark::Unvisited {
            visit(shapes, index, &mut marks, &mut path)?;
        }
    }
    Ok(())
}

fn visit(
    shapes: &IndexMap<String, RecordShape>,
    index: usize,
    marks: &mut [Mark],
    path: &mut Vec<usize>,
) -> Result<(), LoadError> {
    marks[index] = Mark::InProgress;
    path.push(index);

    let shape = &shapes[index];
    for field in &shape.fields {
        if let FieldKind::Reference { shape: target, .. } = &field.kind {
            match marks[*target] {
                Mark::Done => {}
                Mark::Unvisited => visit(shapes, *target, marks, path)?,
                Mark::InProgress => {
                    return Err(LoadError::CyclicReference {
                        path: cycle_path(shapes, path, *target),
                    });
                }
            }
        }
    }

    path.pop();
    marks[index] = Mark::Done;
    Ok(())
}

fn cycle_path(shapes: &IndexMap<String, RecordShape>, path: &[usize], target: usize) -> String {
    let start = path.iter().position(|&index| index == target).unwrap_or(0);
    let mut names: Vec<&str> = path[start..]
        .iter()
        .map(|&index| shapes[index].name.as_str())
        .collect();
    names.push(shapes[target].name.as_str());
    names.join(" -> ")
}
