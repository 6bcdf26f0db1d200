//! Resource configuration groups.

use serde::Deserialize;

use crate::ComponentConfig;

/// Labelled resources declared for a manager, grouped by kind.
///
/// Declaration order within a group is preserved; resources may reference
/// one another in any order because lookups are late-bound.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResourcesConfig {
    /// Inputs registered as shared resources.
    pub resource_inputs: Vec<ComponentConfig>,

    /// Outputs registered as shared resources.
    pub resource_outputs: Vec<ComponentConfig>,

    /// Processors registered as shared resources.
    pub resource_processors: Vec<ComponentConfig>,

    /// Caches registered as shared resources.
    pub resource_caches: Vec<ComponentConfig>,

    /// Rate limits registered as shared resources.
    pub resource_rate_limits: Vec<ComponentConfig>,
}

impl ResourcesConfig {
    /// Whether no resources are declared at all.
    pub fn is_empty(&self) -> bool {
        self.resource_inputs.is_empty()
            && self.resource_outputs.is_empty()
            && self.resource_processors.is_empty()
            && self.resource_caches.is_empty()
            && self.resource_rate_limits.is_empty()
    }
}
