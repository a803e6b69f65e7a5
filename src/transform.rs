//! Named field transforms and the registry that resolves them.
//!
//! A transform is a pure conversion applied to one raw field value
//! before assignment. The registry maps declarative names to shared
//! implementations; cacheable transforms are constructed once at load
//! time, and the identity transform is always available under the
//! reserved name `"none"`.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::FieldValue;

/// Reserved name of the identity transform, registered before any
/// configured entry so fields that declare no transform always resolve.
pub const NONE_TRANSFORM: &str = "none";

/// Error type for transform resolution.
#[derive(Debug, Clone, Error)]
pub enum TransformError {
    /// No transform registered under the requested name.
    #[error("transform not found: {0}")]
    NotFound(String),
}

/// A pure, named conversion from one raw field value to a typed scalar.
///
/// Transforms run once per scalar field per row. They carry no per-call
/// state and must not block. Absent input is passed through so each
/// transform decides its own null behavior; every builtin maps `None`
/// to [`FieldValue::Null`].
pub trait Transform: Send + Sync {
    /// Apply the transform to one raw field value.
    fn apply(&self, raw: Option<&str>) -> FieldValue;
}

/// Closure-based implementation of [`Transform`].
impl<F> Transform for F
where
    F: Fn(Option<&str>) -> FieldValue + Send + Sync,
{
    fn apply(&self, raw: Option<&str>) -> FieldValue {
        self(raw)
    }
}

fn identity(raw: Option<&str>) -> FieldValue {
    raw.map(String::from).into()
}

fn all_upper_case(raw: Option<&str>) -> FieldValue {
    raw.map(|s| s.to_uppercase().trim().to_string()).into()
}

fn all_lower_case(raw: Option<&str>) -> FieldValue {
    raw.map(|s| s.to_lowercase().trim().to_string()).into()
}

fn first_word(raw: Option<&str>) -> FieldValue {
    raw.map(|s| s.split(' ').next().unwrap_or("").trim().to_string())
        .into()
}

fn last_word(raw: Option<&str>) -> FieldValue {
    // Trailing separators produce empty tokens; the last word is the
    // last non-empty one.
    raw.map(|s| {
        s.rsplit(' ')
            .find(|w| !w.is_empty())
            .unwrap_or("")
            .trim()
            .to_string()
    })
    .into()
}

fn trim_word(raw: Option<&str>) -> FieldValue {
    raw.map(|s| s.trim().to_string()).into()
}

/// Built-in transform implementations selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BuiltinTransform {
    /// Identity; the raw value passes through untouched.
    None,
    /// Upper-cases the value, then trims surrounding whitespace.
    AllUpperCase,
    /// Lower-cases the value, then trims surrounding whitespace.
    AllLowerCase,
    /// First space-separated word, trimmed.
    FirstWord,
    /// Last space-separated word, trimmed.
    LastWord,
    /// Trims surrounding whitespace.
    TrimWord,
}

impl BuiltinTransform {
    /// Every builtin, in registration order.
    pub const ALL: [BuiltinTransform; 6] = [
        BuiltinTransform::None,
        BuiltinTransform::AllUpperCase,
        BuiltinTransform::AllLowerCase,
        BuiltinTransform::FirstWord,
        BuiltinTransform::LastWord,
        BuiltinTransform::TrimWord,
    ];

    /// Name the builtin registers under when no alias is configured.
    pub fn canonical_name(self) -> &'static str {
        match self {
            BuiltinTransform::None => NONE_TRANSFORM,
            BuiltinTransform::AllUpperCase => "allUpperCase",
            BuiltinTransform::AllLowerCase => "allLowerCase",
            BuiltinTransform::FirstWord => "firstWord",
            BuiltinTransform::LastWord => "lastWord",
            BuiltinTransform::TrimWord => "trimWord",
        }
    }

    /// Construct the shared implementation for this builtin.
    pub fn construct(self) -> Arc<dyn Transform> {
        match self {
            BuiltinTransform::None => Arc::new(identity),
            BuiltinTransform::AllUpperCase => Arc::new(all_upper_case),
            BuiltinTransform::AllLowerCase => Arc::new(all_lower_case),
            BuiltinTransform::FirstWord => Arc::new(first_word),
            BuiltinTransform::LastWord => Arc::new(last_word),
            BuiltinTransform::TrimWord => Arc::new(trim_word),
        }
    }
}

fn default_cacheable() -> bool {
    true
}

/// One declarative transform registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Name fields refer to the transform by.
    pub name: String,

    /// Built-in implementation backing the name.
    pub builtin: BuiltinTransform,

    /// Whether one shared instance serves every use. Entries needing
    /// per-use construction are skipped at registration and cannot be
    /// resolved by fields.
    #[serde(default = "default_cacheable")]
    pub cacheable: bool,
}

impl TransformConfig {
    /// Declare a cacheable registration of a builtin under a name.
    pub fn new(name: impl Into<String>, builtin: BuiltinTransform) -> Self {
        Self {
            name: name.into(),
            builtin,
            cacheable: true,
        }
    }
}

/// Registry resolving transform names to shared implementations.
///
/// The identity transform is registered under [`NONE_TRANSFORM`] before
/// anything else. The registry is read-only once schema loading starts
/// and can be shared across threads.
///
/// # Example
///
/// ```ignore
/// use rowbind::TransformRegistry;
///
/// let registry = TransformRegistry::with_builtins();
/// let upper = registry.resolve("allUpperCase")?;
/// assert_eq!(upper.apply(Some("anupam")).to_string(), "ANUPAM");
/// ```
pub struct TransformRegistry {
    transforms: HashMap<String, Arc<dyn Transform>>,
}

impl TransformRegistry {
    /// Create a registry holding only the identity transform.
    pub fn new() -> Self {
        let mut transforms: HashMap<String, Arc<dyn Transform>> = HashMap::new();
        transforms.insert(NONE_TRANSFORM.to_string(), Arc::new(identity));
        Self { transforms }
    }

    /// Create a registry pre-loaded with every builtin under its
    /// canonical name.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for builtin in BuiltinTransform::ALL {
            registry.register(builtin.canonical_name(), builtin.construct());
        }
        registry
    }

    /// Create a registry from configured entries plus the identity
    /// transform.
    pub fn from_configs(configs: &[TransformConfig]) -> Self {
        let mut registry = Self::new();
        registry.register_configs(configs);
        registry
    }

    /// Register a transform under a name, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, transform: Arc<dyn Transform>) {
        self.transforms.insert(name.into(), transform);
    }

    /// Register configured entries. Non-cacheable entries are skipped:
    /// without a shared instance there is nothing to resolve against.
    pub fn register_configs(&mut self, configs: &[TransformConfig]) {
        for config in configs {
            if !config.cacheable {
                tracing::debug!(name = %config.name, "non-cacheable transform not pre-constructed");
                continue;
            }
            self.register(config.name.clone(), config.builtin.construct());
        }
    }

    /// Resolve a transform by name.
    ///
    /// # Returns
    ///
    /// * `Ok(transform)` - Shared instance registered under `name`
    /// * `Err(TransformError::NotFound)` - Nothing registered under `name`
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Transform>, TransformError> {
        self.transforms
            .get(name)
            .cloned()
            .ok_or_else(|| TransformError::NotFound(name.to_string()))
    }

    /// Check if a transform is registered.
    pub fn has_transform(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    /// Get list of all registered transform names.
    pub fn list_transforms(&self) -> Vec<String> {
        self.transforms.keys().cloned().collect()
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::new()
    }
}
