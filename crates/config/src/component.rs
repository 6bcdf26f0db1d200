//! The per-component configuration envelope.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::BatchingConfig;

#[cfg(test)]
#[path = "component_test.rs"]
mod tests;

/// The envelope every input, output and processor document shares.
///
/// # Example
///
/// ```json
/// {
///   "type": "channel",
///   "label": "ingest",
///   "processors": [{"type": "noop"}],
///   "batching": {"count": 10, "period": "5s"},
///   "capacity": 64
/// }
/// ```
///
/// `capacity` above lands in [`ComponentConfig::extra`] and is
/// interpreted by the `channel` factory.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComponentConfig {
    /// The component type discriminator.
    #[serde(rename = "type", default)]
    pub type_name: String,

    /// The component's unique label within its kind. May be empty for
    /// stream components; resources reject empty labels.
    #[serde(default)]
    pub label: String,

    /// Processors attached to this component. Inputs and outputs apply
    /// them before handing transactions to or from the pipeline.
    #[serde(default)]
    pub processors: Vec<ComponentConfig>,

    /// Batching policy, recognised by outputs.
    #[serde(default)]
    pub batching: Option<BatchingConfig>,

    /// Remaining type-specific fields, interpreted by the factory for
    /// `type_name`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ComponentConfig {
    /// An envelope for the given type with no further fields.
    pub fn of_type(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    /// Set the label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// A type-specific string field.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key)?.as_str()
    }

    /// A type-specific integer field.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.extra.get(key)?.as_i64()
    }

    /// A type-specific boolean field.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.extra.get(key)?.as_bool()
    }
}
