//! Per-kind component factory registries.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use sluice_component::{BoxProcessor, Cache, LocalRateLimit, MemoryCache, RateLimit, Resources};
use sluice_config::ComponentConfig;
use sluice_input::Input;
use sluice_message::Error;
use sluice_output::{PipeWriter, StreamOutput, WriterOutput};
use sluice_processor::{Catch, Noop, Resource, TryChain};

/// Builds a processor from its configuration envelope.
///
/// The registry itself is passed back in so combinators can resolve
/// their nested `processors` documents recursively.
pub type ProcessorBuilder = Arc<
    dyn Fn(&ComponentConfig, &Builders, &Arc<dyn Resources>) -> Result<BoxProcessor, Error>
        + Send
        + Sync,
>;

/// Builds a cache from its configuration envelope.
pub type CacheBuilder = Arc<dyn Fn(&ComponentConfig) -> Result<Arc<dyn Cache>, Error> + Send + Sync>;

/// Builds a rate limit from its configuration envelope.
pub type RateLimitBuilder =
    Arc<dyn Fn(&ComponentConfig) -> Result<Arc<dyn RateLimit>, Error> + Send + Sync>;

/// Builds an input from its configuration envelope.
pub type InputBuilder =
    Arc<dyn Fn(&ComponentConfig, &Arc<dyn Resources>) -> Result<Input, Error> + Send + Sync>;

/// Builds an output from its configuration envelope.
pub type OutputBuilder = Arc<
    dyn Fn(&ComponentConfig, &Arc<dyn Resources>) -> Result<Box<dyn StreamOutput>, Error>
        + Send
        + Sync,
>;

/// Builder shared by the `try` and `fallback` type names.
fn build_try(
    conf: &ComponentConfig,
    builders: &Builders,
    resources: &Arc<dyn Resources>,
) -> Result<BoxProcessor, Error> {
    let children = builders.build_processors(&conf.processors, resources)?;
    Ok(Box::new(TryChain::new(children)))
}

/// Name of a pipe taken from the `pipe` field, falling back to the
/// component's label.
fn pipe_name(conf: &ComponentConfig, kind: &str) -> Result<String, Error> {
    match conf.get_str("pipe") {
        Some(name) if !name.is_empty() => Ok(name.to_owned()),
        _ if !conf.label.is_empty() => Ok(conf.label.clone()),
        _ => Err(Error::config(format!(
            "channel {kind} requires a 'pipe' name or a label"
        ))),
    }
}

/// Type-discriminated factory registries for every component kind.
///
/// Ships with the in-process defaults: `noop`, `resource`, `catch` and
/// `try`/`fallback` processors, the `memory` cache, the `local` rate
/// limit, and `channel` inputs/outputs rendezvousing through the pipe
/// registry. Combinators whose configuration embeds interpolated
/// expressions (switch, branch, sleep, metric) are constructed
/// programmatically against the expression seam instead. Adapters
/// register their own types before resources are built.
pub struct Builders {
    processors: HashMap<String, ProcessorBuilder>,
    caches: HashMap<String, CacheBuilder>,
    rate_limits: HashMap<String, RateLimitBuilder>,
    inputs: HashMap<String, InputBuilder>,
    outputs: HashMap<String, OutputBuilder>,
}

impl Builders {
    /// A registry holding the in-process defaults.
    pub fn new() -> Self {
        let mut builders = Self {
            processors: HashMap::new(),
            caches: HashMap::new(),
            rate_limits: HashMap::new(),
            inputs: HashMap::new(),
            outputs: HashMap::new(),
        };

        builders.register_processor("noop", |_, _, _| Ok(Box::new(Noop) as BoxProcessor));
        builders.register_processor("resource", |conf, _, resources| {
            let target = conf
                .get_str("resource")
                .ok_or_else(|| Error::config("resource processor requires a 'resource' field"))?;
            Ok(Box::new(Resource::new(target, Arc::clone(resources))) as BoxProcessor)
        });
        builders.register_processor("catch", |conf, builders, resources| {
            let children = builders.build_processors(&conf.processors, resources)?;
            Ok(Box::new(Catch::new(children)) as BoxProcessor)
        });
        builders.register_processor("try", build_try);
        builders.register_processor("fallback", build_try);

        builders.register_cache("memory", |_| Ok(Arc::new(MemoryCache::new()) as Arc<dyn Cache>));

        builders.register_rate_limit("local", |conf| {
            let count = conf.get_int("count").unwrap_or(1000).max(1) as usize;
            let interval = Duration::from_millis(conf.get_int("interval_ms").unwrap_or(1000).max(1) as u64);
            Ok(Arc::new(LocalRateLimit::new(count, interval)) as Arc<dyn RateLimit>)
        });

        // The channel input owns a fresh in-process channel and
        // registers its sending half as a pipe; producers (and channel
        // outputs) look the pipe up by name.
        builders.register_input("channel", |conf, resources| {
            let name = pipe_name(conf, "input")?;
            let capacity = conf.get_int("capacity").unwrap_or(16).max(1) as usize;
            let (tx, rx) = mpsc::channel(capacity);
            resources.set_pipe(&name, tx);
            Ok(Input::from_channel(rx))
        });

        builders.register_output("channel", |conf, resources| {
            let name = pipe_name(conf, "output")?;
            let writer = PipeWriter::new(name, Arc::clone(resources));
            Ok(Box::new(WriterOutput::new(writer)) as Box<dyn StreamOutput>)
        });

        builders
    }

    /// Register a processor type.
    pub fn register_processor<F>(&mut self, type_name: &str, builder: F)
    where
        F: Fn(&ComponentConfig, &Builders, &Arc<dyn Resources>) -> Result<BoxProcessor, Error>
            + Send
            + Sync
            + 'static,
    {
        self.processors.insert(type_name.to_owned(), Arc::new(builder));
    }

    /// Register a cache type.
    pub fn register_cache<F>(&mut self, type_name: &str, builder: F)
    where
        F: Fn(&ComponentConfig) -> Result<Arc<dyn Cache>, Error> + Send + Sync + 'static,
    {
        self.caches.insert(type_name.to_owned(), Arc::new(builder));
    }

    /// Register a rate limit type.
    pub fn register_rate_limit<F>(&mut self, type_name: &str, builder: F)
    where
        F: Fn(&ComponentConfig) -> Result<Arc<dyn RateLimit>, Error> + Send + Sync + 'static,
    {
        self.rate_limits.insert(type_name.to_owned(), Arc::new(builder));
    }

    /// Register an input type.
    pub fn register_input<F>(&mut self, type_name: &str, builder: F)
    where
        F: Fn(&ComponentConfig, &Arc<dyn Resources>) -> Result<Input, Error>
            + Send
            + Sync
            + 'static,
    {
        self.inputs.insert(type_name.to_owned(), Arc::new(builder));
    }

    /// Register an output type.
    pub fn register_output<F>(&mut self, type_name: &str, builder: F)
    where
        F: Fn(&ComponentConfig, &Arc<dyn Resources>) -> Result<Box<dyn StreamOutput>, Error>
            + Send
            + Sync
            + 'static,
    {
        self.outputs.insert(type_name.to_owned(), Arc::new(builder));
    }

    /// Build a processor, resolving nested documents through this
    /// registry.
    pub fn build_processor(
        &self,
        conf: &ComponentConfig,
        resources: &Arc<dyn Resources>,
    ) -> Result<BoxProcessor, Error> {
        let builder = self
            .processors
            .get(&conf.type_name)
            .ok_or_else(|| Error::InvalidType(conf.type_name.clone()))?;
        builder(conf, self, resources)
    }

    /// Build a processor chain in document order.
    pub fn build_processors(
        &self,
        confs: &[ComponentConfig],
        resources: &Arc<dyn Resources>,
    ) -> Result<Vec<BoxProcessor>, Error> {
        confs
            .iter()
            .map(|conf| self.build_processor(conf, resources))
            .collect()
    }

    pub(crate) fn cache(&self, type_name: &str) -> Result<&CacheBuilder, Error> {
        self.caches
            .get(type_name)
            .ok_or_else(|| Error::InvalidType(type_name.to_owned()))
    }

    pub(crate) fn rate_limit(&self, type_name: &str) -> Result<&RateLimitBuilder, Error> {
        self.rate_limits
            .get(type_name)
            .ok_or_else(|| Error::InvalidType(type_name.to_owned()))
    }

    pub(crate) fn input(&self, type_name: &str) -> Result<&InputBuilder, Error> {
        self.inputs
            .get(type_name)
            .ok_or_else(|| Error::InvalidType(type_name.to_owned()))
    }

    pub(crate) fn output(&self, type_name: &str) -> Result<&OutputBuilder, Error> {
        self.outputs
            .get(type_name)
            .ok_or_else(|| Error::InvalidType(type_name.to_owned()))
    }
}

impl Default for Builders {
    fn default() -> Self {
        Self::new()
    }
}
