//! Application-scoped cache of the discovered module set.
//!
//! The set is computed on first use and stored under a fixed attribute name.
//! Concurrent first requests may each compute and store a set; the walk is
//! a deterministic function of host state, so every stored value is equal
//! and the last write is kept. No lock is taken.

use crate::config_loader::ResolverConfig;
use crate::context::{self, ExecutionContext};
use crate::environment::{self, Environment};
use crate::errors::FacesResult;
use crate::module_graph::{ModuleRuntime, WiringSnapshot};
use crate::priority::Classifier;
use crate::walker::{DependencyWalker, DiscoveredModuleSet};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Attribute name of the cache slot: the walker's qualified name
pub const DISCOVERY_CACHE_KEY: &str = "faces_util::walker::DependencyWalker";

/// A discovered set together with the runtime that loads from its modules
#[derive(Clone)]
pub struct ModuleDiscovery {
    set: Arc<DiscoveredModuleSet>,
    runtime: Arc<dyn ModuleRuntime>,
}

impl ModuleDiscovery {
    pub fn new(set: DiscoveredModuleSet, runtime: Arc<dyn ModuleRuntime>) -> Self {
        Self {
            set: Arc::new(set),
            runtime,
        }
    }

    pub fn set(&self) -> &DiscoveredModuleSet {
        &self.set
    }

    pub fn shared_set(&self) -> Arc<DiscoveredModuleSet> {
        Arc::clone(&self.set)
    }

    pub fn runtime(&self) -> &dyn ModuleRuntime {
        self.runtime.as_ref()
    }
}

impl fmt::Debug for ModuleDiscovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDiscovery").field("set", &self.set).finish()
    }
}

/// Entry point shared by every resolution consumer
#[derive(Debug, Clone)]
pub struct DiscoveryCache {
    environment: Environment,
    config: Arc<ResolverConfig>,
    classifier: Arc<Classifier>,
}

impl DiscoveryCache {
    pub fn new(environment: Environment, config: ResolverConfig) -> Self {
        let classifier = Arc::new(config.classifier());
        Self {
            environment,
            config: Arc::new(config),
            classifier,
        }
    }

    /// Uses the process-wide environment flags
    pub fn from_process(config: ResolverConfig) -> Self {
        Self::new(environment::current(), config)
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Cached discovery for the context's application, computing it on a
    /// miss. `None` outside a modular runtime or when the host published no
    /// root module.
    pub fn discovery(&self, ctx: &ExecutionContext<'_>) -> FacesResult<Option<ModuleDiscovery>> {
        let store = ctx.application_store()?;
        if !self.environment.is_modular_runtime_present() {
            return Ok(None);
        }

        if let Some(cached) = store
            .get_attribute(DISCOVERY_CACHE_KEY)
            .and_then(|value| value.downcast::<ModuleDiscovery>().ok())
        {
            debug!(message = "Discovery cache hit", count = cached.set().len());
            return Ok(Some((*cached).clone()));
        }

        let Some(handle) = context::root_module(ctx, &self.config.root_context_attribute)? else {
            debug!(message = "No root module published; discovery unavailable");
            return Ok(None);
        };

        let snapshot = WiringSnapshot::capture(handle.runtime.as_ref());
        let set = DependencyWalker::new(&snapshot, &self.classifier).discover(handle.root);
        let discovery = ModuleDiscovery::new(set, handle.runtime);

        store.set_attribute(DISCOVERY_CACHE_KEY, Arc::new(discovery.clone()));
        debug!(
            message = "Cached discovered modules",
            count = discovery.set().len()
        );
        Ok(Some(discovery))
    }

    /// The discovered set, empty when discovery is unavailable
    pub fn get_or_compute(&self, ctx: &ExecutionContext<'_>) -> FacesResult<Arc<DiscoveredModuleSet>> {
        Ok(self
            .discovery(ctx)?
            .map(|discovery| discovery.shared_set())
            .unwrap_or_default())
    }
}
