// src/tests/test_utils.rs
// Shared fixtures: module graphs, host contexts and a call-counting runtime

use crate::config_loader::ResolverConfig;
use crate::context::{publish_root_module, RuntimeHandle, SimpleHostContext, DEFAULT_ROOT_CONTEXT_ATTRIBUTE};
use crate::discovery_cache::DiscoveryCache;
use crate::environment::Environment;
use crate::module_graph::{
    LoadFailure, LoadedType, Module, ModuleGraph, ModuleId, ModuleLoader, ModuleRuntime, ModuleWiring,
    RequirementKind::{Dynamic, Static},
    WiringSnapshot,
};
use crate::priority::Classifier;
use crate::static_runtime::StaticModuleRuntime;
use crate::walker::{DependencyWalker, DiscoveredModuleSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use url::Url;

pub const ROOT: ModuleId = 1;
pub const UTIL: ModuleId = 2;
pub const ALLOY: ModuleId = 3;
pub const BRIDGE_API: ModuleId = 4;
pub const BRIDGE_IMPL: ModuleId = 5;
pub const BRIDGE_EXT: ModuleId = 6;
pub const PRIMEFACES: ModuleId = 7;
pub const COMMONS: ModuleId = 8;
pub const RUNTIME: ModuleId = 9;

/// Portlet deployment: the root statically uses the runtime, the utility
/// library, the bridge API and a plain commons library, and carries a blanket
/// dynamic import that wires it to the alloy and theme libraries.
pub fn portlet_runtime() -> StaticModuleRuntime {
    let mut runtime = StaticModuleRuntime::new();
    runtime.add_module(0, "system.bundle");
    runtime.add_module(ROOT, "com.example.portlet");
    runtime.add_module(UTIL, "com.liferay.faces.util");
    runtime.add_module(ALLOY, "com.liferay.faces.alloy");
    runtime.add_module(BRIDGE_API, "com.liferay.faces.bridge.api");
    runtime.add_module(BRIDGE_IMPL, "com.liferay.faces.bridge.impl");
    runtime.add_module(BRIDGE_EXT, "com.liferay.faces.bridge.ext");
    runtime.add_module(PRIMEFACES, "org.primefaces");
    runtime.add_module(COMMONS, "org.apache.commons.io");
    runtime.add_module(RUNTIME, "org.glassfish.javax.faces");

    runtime.set_imports(
        ROOT,
        Some("javax.faces, com.liferay.faces.util.context, javax.portlet.faces, org.apache.commons.io"),
        Some("*"),
    );
    runtime.add_wire(ROOT, 0, Static);
    runtime.add_wire(ROOT, RUNTIME, Static);
    runtime.add_wire(ROOT, UTIL, Static);
    runtime.add_wire(ROOT, BRIDGE_API, Static);
    runtime.add_wire(ROOT, COMMONS, Static);
    runtime.add_wire(ROOT, ALLOY, Dynamic);
    runtime.add_wire(ROOT, PRIMEFACES, Dynamic);

    runtime.set_imports(BRIDGE_IMPL, Some("javax.portlet.faces, javax.faces"), None);
    runtime.add_wire(BRIDGE_IMPL, BRIDGE_API, Static);
    runtime.add_wire(BRIDGE_IMPL, RUNTIME, Static);
    runtime.add_wire(BRIDGE_EXT, BRIDGE_API, Static);
    runtime.add_wire(UTIL, RUNTIME, Static);
    runtime
}

pub fn walk(runtime: &StaticModuleRuntime, root: ModuleId) -> DiscoveredModuleSet {
    let snapshot = WiringSnapshot::capture(runtime);
    DependencyWalker::new(&snapshot, Classifier::builtin()).discover(root)
}

/// Host context with the root handle published
pub fn host_with_root(runtime: Arc<dyn ModuleRuntime>, root: ModuleId) -> SimpleHostContext {
    let host = SimpleHostContext::default();
    publish_root_module(&host.attributes, DEFAULT_ROOT_CONTEXT_ATTRIBUTE, RuntimeHandle::new(root, runtime));
    host
}

pub fn modular_cache() -> DiscoveryCache {
    DiscoveryCache::new(Environment::modular(false), ResolverConfig::default())
}

/// Delegates to a static runtime and counts content and load calls
pub struct CountingRuntime {
    pub inner: StaticModuleRuntime,
    pub own_entry_calls: AtomicUsize,
    pub load_calls: AtomicUsize,
}

impl CountingRuntime {
    pub fn new(inner: StaticModuleRuntime) -> Self {
        Self {
            inner,
            own_entry_calls: AtomicUsize::new(0),
            load_calls: AtomicUsize::new(0),
        }
    }

    pub fn own_entry_count(&self) -> usize {
        self.own_entry_calls.load(Ordering::SeqCst)
    }

    pub fn load_count(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }
}

impl ModuleGraph for CountingRuntime {
    fn installed_modules(&self) -> Vec<Module> {
        self.inner.installed_modules()
    }

    fn module(&self, id: ModuleId) -> Option<Module> {
        ModuleGraph::module(&self.inner, id)
    }

    fn wiring(&self, id: ModuleId) -> Option<ModuleWiring> {
        self.inner.wiring(id)
    }

    fn library_module(&self) -> Option<ModuleId> {
        self.inner.library_module()
    }
}

impl ModuleLoader for CountingRuntime {
    fn load_type(&self, module: ModuleId, name: &str) -> Result<LoadedType, LoadFailure> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        ModuleLoader::load_type(&self.inner, module, name)
    }

    fn own_entry(&self, module: ModuleId, path: &str) -> Option<Url> {
        self.own_entry_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.own_entry(module, path)
    }

    fn own_entries(&self, module: ModuleId, dir: &str, suffix: &str) -> Vec<String> {
        self.inner.own_entries(module, dir, suffix)
    }

    fn resource(&self, module: ModuleId, path: &str) -> Option<Url> {
        ModuleLoader::resource(&self.inner, module, path)
    }

    fn resources(&self, module: ModuleId, path: &str) -> Vec<Url> {
        ModuleLoader::resources(&self.inner, module, path)
    }

    fn read(&self, url: &Url) -> std::io::Result<String> {
        self.inner.read(url)
    }
}
