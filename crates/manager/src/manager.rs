//! The resource manager.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};

use sluice_batch::{BatchingConfig, Policy};
use sluice_component::{Cache, RateLimit, Resources, SharedProcessor};
use sluice_config::{ComponentConfig, ResourcesConfig};
use sluice_input::Input;
use sluice_message::{Error, Transaction};
use sluice_output::{Batcher, Processed, StreamOutput};

use crate::{Builders, Pipes};

#[cfg(test)]
#[path = "manager_test.rs"]
mod tests;

/// A shared handle to a resource input.
pub type SharedInput = Arc<Mutex<Input>>;

/// A shared handle to a resource output.
pub type SharedOutput = Arc<Mutex<Box<dyn StreamOutput>>>;

/// Owns labelled resource components for the lifetime of the process.
///
/// Resources are declared through [`ResourcesConfig`] and may reference
/// one another by label in any order; lookups are late-bound and fail
/// fast with `unable to locate resource: <label>` instead of blocking.
pub struct Manager {
    builders: Builders,

    caches: RwLock<HashMap<String, Arc<dyn Cache>>>,
    rate_limits: RwLock<HashMap<String, Arc<dyn RateLimit>>>,
    processors: RwLock<HashMap<String, SharedProcessor>>,
    inputs: RwLock<HashMap<String, SharedInput>>,
    outputs: RwLock<HashMap<String, SharedOutput>>,

    pipes: Pipes,
}

impl Manager {
    /// A manager with the default builder registries and no resources.
    pub fn new() -> Arc<Self> {
        Self::with_builders(Builders::new())
    }

    /// A manager using the given builder registries.
    pub fn with_builders(builders: Builders) -> Arc<Self> {
        Arc::new(Self {
            builders,
            caches: RwLock::new(HashMap::new()),
            rate_limits: RwLock::new(HashMap::new()),
            processors: RwLock::new(HashMap::new()),
            inputs: RwLock::new(HashMap::new()),
            outputs: RwLock::new(HashMap::new()),
            pipes: Pipes::new(),
        })
    }

    /// Build every resource declared in `conf`, in declaration order per
    /// group: caches, rate limits, processors, inputs, outputs.
    ///
    /// Construction may look up not-yet-built resources; such early
    /// accesses fail with the locate error and are expected to be
    /// retried by the caller once everything is up.
    pub fn build_resources(self: &Arc<Self>, conf: &ResourcesConfig) -> Result<(), Error> {
        for c in &conf.resource_caches {
            self.add_cache_from_config(c)?;
        }
        for c in &conf.resource_rate_limits {
            self.add_rate_limit_from_config(c)?;
        }
        for c in &conf.resource_processors {
            self.add_processor_from_config(c)?;
        }
        for c in &conf.resource_inputs {
            self.add_input_from_config(c)?;
        }
        for c in &conf.resource_outputs {
            self.add_output_from_config(c)?;
        }
        Ok(())
    }

    fn check_label<T>(
        kind: &str,
        label: &str,
        existing: &HashMap<String, T>,
    ) -> Result<(), Error> {
        if label.is_empty() {
            return Err(Error::EmptyLabel {
                kind: kind.to_owned(),
            });
        }
        if existing.contains_key(label) {
            return Err(Error::LabelCollision {
                kind: kind.to_owned(),
                label: label.to_owned(),
            });
        }
        Ok(())
    }

    /// Build and register a cache resource.
    pub fn add_cache_from_config(self: &Arc<Self>, conf: &ComponentConfig) -> Result<(), Error> {
        let cache = self.builders.cache(&conf.type_name)?(conf)?;
        let mut caches = self.caches.write().expect("cache registry lock");
        Self::check_label("cache", &conf.label, &caches)?;
        caches.insert(conf.label.clone(), cache);
        tracing::debug!(cache = %conf.label, "cache resource registered");
        Ok(())
    }

    /// Build and register a rate limit resource.
    pub fn add_rate_limit_from_config(
        self: &Arc<Self>,
        conf: &ComponentConfig,
    ) -> Result<(), Error> {
        let rate_limit = self.builders.rate_limit(&conf.type_name)?(conf)?;
        let mut rate_limits = self.rate_limits.write().expect("rate limit registry lock");
        Self::check_label("rate limit", &conf.label, &rate_limits)?;
        rate_limits.insert(conf.label.clone(), rate_limit);
        tracing::debug!(rate_limit = %conf.label, "rate limit resource registered");
        Ok(())
    }

    /// Build and register a processor resource.
    pub fn add_processor_from_config(
        self: &Arc<Self>,
        conf: &ComponentConfig,
    ) -> Result<(), Error> {
        let processor = self.new_processor(conf)?;
        let mut processors = self.processors.write().expect("processor registry lock");
        Self::check_label("processor", &conf.label, &processors)?;
        processors.insert(conf.label.clone(), Arc::new(Mutex::new(processor)));
        tracing::debug!(processor = %conf.label, "processor resource registered");
        Ok(())
    }

    /// Build and register an input resource.
    pub fn add_input_from_config(self: &Arc<Self>, conf: &ComponentConfig) -> Result<(), Error> {
        let input = self.new_input(conf)?;
        let mut inputs = self.inputs.write().expect("input registry lock");
        Self::check_label("input", &conf.label, &inputs)?;
        inputs.insert(conf.label.clone(), Arc::new(Mutex::new(input)));
        tracing::debug!(input = %conf.label, "input resource registered");
        Ok(())
    }

    /// Build and register an output resource.
    pub fn add_output_from_config(self: &Arc<Self>, conf: &ComponentConfig) -> Result<(), Error> {
        let output = self.new_output(conf)?;
        let mut outputs = self.outputs.write().expect("output registry lock");
        Self::check_label("output", &conf.label, &outputs)?;
        outputs.insert(conf.label.clone(), Arc::new(Mutex::new(output)));
        tracing::debug!(output = %conf.label, "output resource registered");
        Ok(())
    }

    /// Build an unregistered processor from config, resolving nested
    /// documents through the builder registry.
    pub fn new_processor(
        self: &Arc<Self>,
        conf: &ComponentConfig,
    ) -> Result<sluice_component::BoxProcessor, Error> {
        let resources: Arc<dyn Resources> = Arc::clone(self) as Arc<dyn Resources>;
        self.builders.build_processor(conf, &resources)
    }

    /// Build an unregistered input from config. A `processors` list on
    /// the envelope is built through the registry and attached, so the
    /// chain runs before transactions reach the consumer.
    pub fn new_input(self: &Arc<Self>, conf: &ComponentConfig) -> Result<Input, Error> {
        let resources: Arc<dyn Resources> = Arc::clone(self) as Arc<dyn Resources>;
        let input = self.builders.input(&conf.type_name)?(conf, &resources)?;
        if conf.processors.is_empty() {
            return Ok(input);
        }
        let chain = self.builders.build_processors(&conf.processors, &resources)?;
        Ok(input.with_processors(chain, 16))
    }

    /// Build an unregistered output from config. A `batching` block
    /// prefixes the output with a policy batcher; a `processors` list is
    /// attached ahead of that, so the chain runs before batching and
    /// writing.
    pub fn new_output(
        self: &Arc<Self>,
        conf: &ComponentConfig,
    ) -> Result<Box<dyn StreamOutput>, Error> {
        let resources: Arc<dyn Resources> = Arc::clone(self) as Arc<dyn Resources>;
        let mut output = self.builders.output(&conf.type_name)?(conf, &resources)?;

        if let Some(batching) = conf.batching.as_ref().filter(|b| !b.is_noop()) {
            let policy = self.policy_from_config(batching, &resources)?;
            output = Box::new(Batcher::new(policy, output));
        }
        if !conf.processors.is_empty() {
            let chain = self.builders.build_processors(&conf.processors, &resources)?;
            output = Box::new(Processed::new(chain, output));
        }
        Ok(output)
    }

    /// Build a batching policy from its configuration block.
    fn policy_from_config(
        self: &Arc<Self>,
        conf: &BatchingConfig,
        resources: &Arc<dyn Resources>,
    ) -> Result<Policy, Error> {
        if conf.check.is_some() {
            return Err(Error::config(
                "batching check expressions are compiled by the expression layer \
                 and cannot be built from configuration alone",
            ));
        }
        let processors = self.builders.build_processors(&conf.processors, resources)?;
        Ok(Policy::new(
            conf.count,
            conf.byte_size,
            conf.period,
            None,
            processors,
        ))
    }

    /// Whether an input resource is registered under `label`.
    pub fn probe_input(&self, label: &str) -> bool {
        self.inputs.read().expect("input registry lock").contains_key(label)
    }

    /// The input resource registered under `label`.
    pub fn input(&self, label: &str) -> Result<SharedInput, Error> {
        self.inputs
            .read()
            .expect("input registry lock")
            .get(label)
            .cloned()
            .ok_or_else(|| Error::ResourceNotFound(label.to_owned()))
    }

    /// Whether an output resource is registered under `label`.
    pub fn probe_output(&self, label: &str) -> bool {
        self.outputs
            .read()
            .expect("output registry lock")
            .contains_key(label)
    }

    /// The output resource registered under `label`.
    pub fn output(&self, label: &str) -> Result<SharedOutput, Error> {
        self.outputs
            .read()
            .expect("output registry lock")
            .get(label)
            .cloned()
            .ok_or_else(|| Error::ResourceNotFound(label.to_owned()))
    }

    /// Tear down every owned resource, reverse of construction order:
    /// outputs, inputs, processors, then the passive resources.
    pub async fn close(&self, timeout: Duration) -> Result<(), Error> {
        let outputs: Vec<SharedOutput> = {
            let mut map = self.outputs.write().expect("output registry lock");
            map.drain().map(|(_, v)| v).collect()
        };
        for output in outputs {
            let output = output.lock().await;
            output.close_async();
            output.wait_for_close(timeout).await?;
        }

        let inputs: Vec<SharedInput> = {
            let mut map = self.inputs.write().expect("input registry lock");
            map.drain().map(|(_, v)| v).collect()
        };
        for input in inputs {
            let input = input.lock().await;
            input.close_async();
            input.wait_for_close(timeout).await?;
        }

        let processors: Vec<SharedProcessor> = {
            let mut map = self.processors.write().expect("processor registry lock");
            map.drain().map(|(_, v)| v).collect()
        };
        for processor in processors {
            processor.lock().await.close();
        }

        self.rate_limits.write().expect("rate limit registry lock").clear();
        self.caches.write().expect("cache registry lock").clear();
        Ok(())
    }
}

impl Resources for Manager {
    fn probe_cache(&self, label: &str) -> bool {
        self.caches.read().expect("cache registry lock").contains_key(label)
    }

    fn cache(&self, label: &str) -> Result<Arc<dyn Cache>, Error> {
        self.caches
            .read()
            .expect("cache registry lock")
            .get(label)
            .cloned()
            .ok_or_else(|| Error::ResourceNotFound(label.to_owned()))
    }

    fn probe_rate_limit(&self, label: &str) -> bool {
        self.rate_limits
            .read()
            .expect("rate limit registry lock")
            .contains_key(label)
    }

    fn rate_limit(&self, label: &str) -> Result<Arc<dyn RateLimit>, Error> {
        self.rate_limits
            .read()
            .expect("rate limit registry lock")
            .get(label)
            .cloned()
            .ok_or_else(|| Error::ResourceNotFound(label.to_owned()))
    }

    fn probe_processor(&self, label: &str) -> bool {
        self.processors
            .read()
            .expect("processor registry lock")
            .contains_key(label)
    }

    fn processor(&self, label: &str) -> Result<SharedProcessor, Error> {
        self.processors
            .read()
            .expect("processor registry lock")
            .get(label)
            .cloned()
            .ok_or_else(|| Error::ResourceNotFound(label.to_owned()))
    }

    fn set_pipe(&self, name: &str, tx: mpsc::Sender<Transaction>) {
        self.pipes.set(name, tx);
    }

    fn get_pipe(&self, name: &str) -> Option<mpsc::Sender<Transaction>> {
        self.pipes.get(name)
    }

    fn unset_pipe(&self, name: &str, tx: &mpsc::Sender<Transaction>) {
        self.pipes.unset(name, tx);
    }
}
