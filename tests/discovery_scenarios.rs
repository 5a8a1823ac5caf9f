//! End-to-end discovery scenarios through the public API
//!
//! Each test publishes a root module on a host context the way a container
//! would, then drives discovery and lookups through the shared cache.

use faces_util::config_loader::ResolverConfig;
use faces_util::context::{publish_root_module, SimpleFacesContext, SimpleHostContext, DEFAULT_ROOT_CONTEXT_ATTRIBUTE};
use faces_util::environment::Environment;
use faces_util::module_graph::{LoadFailure, ModuleGraph, ModuleLoader, ModuleWiring, RequirementKind};
use faces_util::static_runtime::{EmptyLoader, StaticModuleRuntime};
use faces_util::type_resolver::resolve_type;
use faces_util::{DiscoveryCache, DiscoveryKey, ExecutionContext, LoadedType, Module, PriorityKey, RuntimeHandle};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn host_for(runtime: Arc<StaticModuleRuntime>, root: u64) -> SimpleHostContext {
    let host = SimpleHostContext::default();
    publish_root_module(&host.attributes, DEFAULT_ROOT_CONTEXT_ATTRIBUTE, RuntimeHandle::new(root, runtime));
    host
}

fn cache() -> DiscoveryCache {
    DiscoveryCache::new(Environment::modular(false), ResolverConfig::default())
}

#[test]
fn dynamic_only_extension_library_is_excluded() {
    let mut runtime = StaticModuleRuntime::new();
    runtime.add_module(10, "com.example.guestbook.portlet");
    runtime.add_module(11, "com.liferay.faces.util");
    runtime.add_module(12, "org.primefaces");
    runtime.set_imports(10, Some("com.liferay.faces.util.context"), Some("*"));
    runtime.add_wire(10, 11, RequirementKind::Static);
    runtime.add_wire(10, 12, RequirementKind::Dynamic);

    let host = host_for(Arc::new(runtime), 10);
    let set = cache().get_or_compute(&ExecutionContext::Host(&host)).unwrap();

    assert_eq!(
        set.identities(),
        vec![(DiscoveryKey::ROOT, 10), (PriorityKey::UtilityLibrary.into(), 11)]
    );
}

#[test]
fn bridge_companions_join_through_the_api() {
    let mut runtime = StaticModuleRuntime::new();
    runtime.add_module(10, "com.example.guestbook.portlet");
    runtime.add_module(20, "com.liferay.faces.bridge.api");
    runtime.add_module(21, "com.liferay.faces.bridge.impl");
    runtime.add_module(22, "com.liferay.faces.bridge.ext");
    runtime.add_wire(10, 20, RequirementKind::Static);
    runtime.add_wire(21, 20, RequirementKind::Static);
    runtime.add_wire(22, 20, RequirementKind::Static);

    let host = host_for(Arc::new(runtime), 10);
    let faces = SimpleFacesContext::new(&host);
    let set = cache().get_or_compute(&ExecutionContext::Faces(&faces)).unwrap();

    assert_eq!(set.get(PriorityKey::BridgeApi).map(|m| m.id), Some(20));
    assert_eq!(set.get(PriorityKey::BridgeImpl).map(|m| m.id), Some(21));
    assert_eq!(set.get(PriorityKey::BridgeExt).map(|m| m.id), Some(22));
}

/// Counts packaged-content lookups made against the runtime
struct EntryCounter {
    inner: StaticModuleRuntime,
    own_entry_calls: AtomicUsize,
}

impl ModuleGraph for EntryCounter {
    fn installed_modules(&self) -> Vec<Module> {
        self.inner.installed_modules()
    }

    fn module(&self, id: u64) -> Option<Module> {
        ModuleGraph::module(&self.inner, id)
    }

    fn wiring(&self, id: u64) -> Option<ModuleWiring> {
        self.inner.wiring(id)
    }

    fn library_module(&self) -> Option<u64> {
        self.inner.library_module()
    }
}

impl ModuleLoader for EntryCounter {
    fn load_type(&self, module: u64, name: &str) -> Result<LoadedType, LoadFailure> {
        ModuleLoader::load_type(&self.inner, module, name)
    }

    fn own_entry(&self, module: u64, path: &str) -> Option<url::Url> {
        self.own_entry_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.own_entry(module, path)
    }

    fn own_entries(&self, module: u64, dir: &str, suffix: &str) -> Vec<String> {
        self.inner.own_entries(module, dir, suffix)
    }

    fn resource(&self, module: u64, path: &str) -> Option<url::Url> {
        ModuleLoader::resource(&self.inner, module, path)
    }

    fn resources(&self, module: u64, path: &str) -> Vec<url::Url> {
        ModuleLoader::resources(&self.inner, module, path)
    }

    fn read(&self, url: &url::Url) -> std::io::Result<String> {
        self.inner.read(url)
    }
}

#[test]
fn utility_type_resolves_without_traversal() {
    let mut inner = StaticModuleRuntime::new();
    inner.add_module(10, "com.example.guestbook.portlet");
    inner.add_module(11, "com.liferay.faces.util");
    inner.add_wire(10, 11, RequirementKind::Static);
    inner.add_type(11, "com.liferay.faces.util.Foo", &[]);

    let runtime = Arc::new(EntryCounter {
        inner,
        own_entry_calls: AtomicUsize::new(0),
    });
    let host = SimpleHostContext::default();
    publish_root_module(&host.attributes, DEFAULT_ROOT_CONTEXT_ATTRIBUTE, RuntimeHandle::new(10, runtime.clone()));

    let loaded = resolve_type(&cache(), &ExecutionContext::Host(&host), "com.liferay.faces.util.Foo", &EmptyLoader).unwrap();
    assert_eq!(loaded.module, Some(11));
    assert_eq!(runtime.own_entry_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn concurrent_first_calls_agree_on_keys() {
    let mut runtime = StaticModuleRuntime::new();
    runtime.add_module(10, "com.example.guestbook.portlet");
    runtime.add_module(11, "com.liferay.faces.util");
    runtime.add_module(13, "org.glassfish.javax.faces");
    runtime.add_wire(10, 11, RequirementKind::Static);
    runtime.add_wire(10, 13, RequirementKind::Static);
    let host = host_for(Arc::new(runtime), 10);
    let cache = cache();

    let (left, right) = std::thread::scope(|scope| {
        let run = || {
            cache
                .get_or_compute(&ExecutionContext::Host(&host))
                .unwrap()
                .keys()
                .copied()
                .collect::<BTreeSet<_>>()
        };
        let a = scope.spawn(run);
        let b = scope.spawn(run);
        (a.join().unwrap(), b.join().unwrap())
    });

    assert_eq!(left, right);
    assert!(left.contains(&DiscoveryKey::ROOT));
    assert!(left.contains(&DiscoveryKey::from(PriorityKey::UtilityLibrary)));
    assert!(left.contains(&DiscoveryKey::from(PriorityKey::FrameworkRuntime)));
}

#[test]
fn foundation_module_is_never_discovered() {
    let mut runtime = StaticModuleRuntime::new();
    runtime.add_module(0, "system.bundle");
    runtime.add_module(10, "com.example.guestbook.portlet");
    runtime.add_wire(10, 0, RequirementKind::Static);

    let host = host_for(Arc::new(runtime), 10);
    let set = cache().get_or_compute(&ExecutionContext::Host(&host)).unwrap();
    assert!(!set.contains_module(0));
    assert_eq!(set.len(), 1);
}
