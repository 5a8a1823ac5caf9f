//! Execution context adapter.
//!
//! Three context shapes reach this crate: the framework's per-request
//! context, its external (container-facing) context, and the bare host
//! context. All of them lead to an application-scoped attribute store,
//! which backs the discovery cache and holds the root-module handle.

use crate::errors::{FacesError, FacesResult};
use crate::module_graph::{ModuleId, ModuleRuntime};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Attribute name under which the host publishes the root module handle
pub const DEFAULT_ROOT_CONTEXT_ATTRIBUTE: &str = "osgi-bundlecontext";

pub type AttributeValue = Arc<dyn Any + Send + Sync>;

/// Key-value attribute store shared by every request of an application
pub trait AttributeStore: Send + Sync {
    fn get_attribute(&self, name: &str) -> Option<AttributeValue>;
    fn set_attribute(&self, name: &str, value: AttributeValue);
}

/// Generic host context (servlet-context equivalent)
pub trait HostContext {
    fn attributes(&self) -> &dyn AttributeStore;
}

/// Framework external context
pub trait ExternalContext {
    fn application_map(&self) -> &dyn AttributeStore;

    /// Underlying host context when the container exposes it
    fn host_context(&self) -> Option<&dyn HostContext>;
}

/// Framework per-request context
pub trait FacesContext {
    fn external_context(&self) -> &dyn ExternalContext;
}

/// The context shapes accepted by discovery and resolution
#[derive(Clone, Copy)]
pub enum ExecutionContext<'a> {
    Faces(&'a dyn FacesContext),
    External(&'a dyn ExternalContext),
    Host(&'a dyn HostContext),
    /// Anything else, named for diagnostics
    Unrecognized(&'static str),
}

impl fmt::Debug for ExecutionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionContext::Faces(_) => f.write_str("ExecutionContext::Faces"),
            ExecutionContext::External(_) => f.write_str("ExecutionContext::External"),
            ExecutionContext::Host(_) => f.write_str("ExecutionContext::Host"),
            ExecutionContext::Unrecognized(shape) => write!(f, "ExecutionContext::Unrecognized({shape})"),
        }
    }
}

impl<'a> ExecutionContext<'a> {
    /// Application-scoped store for this context
    pub fn application_store(&self) -> FacesResult<&'a dyn AttributeStore> {
        match *self {
            ExecutionContext::Faces(faces) => Ok(faces.external_context().application_map()),
            ExecutionContext::External(external) => Ok(external.application_map()),
            ExecutionContext::Host(host) => Ok(host.attributes()),
            ExecutionContext::Unrecognized(shape) => Err(FacesError::invalid_context(shape)),
        }
    }

    /// Store holding host-published attributes. Falls back to the
    /// application map when the host context is not exposed.
    fn host_attributes(&self) -> FacesResult<&'a dyn AttributeStore> {
        match *self {
            ExecutionContext::Faces(faces) => {
                let external = faces.external_context();
                Ok(external
                    .host_context()
                    .map(|host| host.attributes())
                    .unwrap_or_else(|| external.application_map()))
            }
            ExecutionContext::External(external) => Ok(external
                .host_context()
                .map(|host| host.attributes())
                .unwrap_or_else(|| external.application_map())),
            ExecutionContext::Host(host) => Ok(host.attributes()),
            ExecutionContext::Unrecognized(shape) => Err(FacesError::invalid_context(shape)),
        }
    }
}

/// Host-published handle to the root module and the runtime serving it
#[derive(Clone)]
pub struct RuntimeHandle {
    pub root: ModuleId,
    pub runtime: Arc<dyn ModuleRuntime>,
}

impl RuntimeHandle {
    pub fn new(root: ModuleId, runtime: Arc<dyn ModuleRuntime>) -> Self {
        Self { root, runtime }
    }
}

impl fmt::Debug for RuntimeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeHandle").field("root", &self.root).finish()
    }
}

/// Look up the root module handle. Absence is a normal condition.
pub fn root_module(ctx: &ExecutionContext<'_>, attribute: &str) -> FacesResult<Option<RuntimeHandle>> {
    let store = ctx.host_attributes()?;
    Ok(store
        .get_attribute(attribute)
        .and_then(|value| value.downcast::<RuntimeHandle>().ok())
        .map(|handle| (*handle).clone()))
}

/// Publish a root module handle the way a host would
pub fn publish_root_module(store: &dyn AttributeStore, attribute: &str, handle: RuntimeHandle) {
    store.set_attribute(attribute, Arc::new(handle));
}

/// `RwLock<HashMap>` backed attribute store
#[derive(Default)]
pub struct MapAttributeStore {
    values: RwLock<HashMap<String, AttributeValue>>,
}

impl MapAttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.read().map(|values| values.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AttributeStore for MapAttributeStore {
    fn get_attribute(&self, name: &str) -> Option<AttributeValue> {
        self.values.read().ok()?.get(name).cloned()
    }

    fn set_attribute(&self, name: &str, value: AttributeValue) {
        // a poisoned store only loses the write; readers recompute
        if let Ok(mut values) = self.values.write() {
            values.insert(name.to_string(), value);
        }
    }
}

/// Minimal host context owning its attribute store
#[derive(Default)]
pub struct SimpleHostContext {
    pub attributes: MapAttributeStore,
}

impl HostContext for SimpleHostContext {
    fn attributes(&self) -> &dyn AttributeStore {
        &self.attributes
    }
}

/// External context whose application map is the host context's store
pub struct SimpleExternalContext<'a> {
    pub host: &'a SimpleHostContext,
}

impl ExternalContext for SimpleExternalContext<'_> {
    fn application_map(&self) -> &dyn AttributeStore {
        &self.host.attributes
    }

    fn host_context(&self) -> Option<&dyn HostContext> {
        Some(self.host)
    }
}

/// Request context wrapping an external context
pub struct SimpleFacesContext<'a> {
    pub external: SimpleExternalContext<'a>,
}

impl<'a> SimpleFacesContext<'a> {
    pub fn new(host: &'a SimpleHostContext) -> Self {
        Self {
            external: SimpleExternalContext { host },
        }
    }
}

impl FacesContext for SimpleFacesContext<'_> {
    fn external_context(&self) -> &dyn ExternalContext {
        &self.external
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::static_runtime::StaticModuleRuntime;

    #[test]
    fn test_all_shapes_reach_the_same_store() {
        let host = SimpleHostContext::default();
        let faces = SimpleFacesContext::new(&host);

        ExecutionContext::Host(&host)
            .application_store()
            .unwrap()
            .set_attribute("shared", Arc::new(42u32));

        for ctx in [
            ExecutionContext::Faces(&faces),
            ExecutionContext::External(&faces.external),
            ExecutionContext::Host(&host),
        ] {
            let value = ctx.application_store().unwrap().get_attribute("shared").unwrap();
            assert_eq!(value.downcast_ref::<u32>(), Some(&42));
        }
    }

    #[test]
    fn test_unrecognized_shape_is_invalid() {
        let ctx = ExecutionContext::Unrecognized("portlet-session");
        match ctx.application_store() {
            Err(FacesError::InvalidContext { shape }) => assert_eq!(shape, "portlet-session"),
            other => panic!("Expected InvalidContext, got: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_root_module_lookup() {
        let host = SimpleHostContext::default();
        let ctx = ExecutionContext::Host(&host);
        assert!(root_module(&ctx, DEFAULT_ROOT_CONTEXT_ATTRIBUTE).unwrap().is_none());

        let runtime = Arc::new(StaticModuleRuntime::new());
        publish_root_module(&host.attributes, DEFAULT_ROOT_CONTEXT_ATTRIBUTE, RuntimeHandle::new(5, runtime));
        let handle = root_module(&ctx, DEFAULT_ROOT_CONTEXT_ATTRIBUTE).unwrap().unwrap();
        assert_eq!(handle.root, 5);
    }

    #[test]
    fn test_wrong_attribute_type_is_absent() {
        let host = SimpleHostContext::default();
        host.attributes.set_attribute(DEFAULT_ROOT_CONTEXT_ATTRIBUTE, Arc::new("not a handle"));
        let ctx = ExecutionContext::Host(&host);
        assert!(root_module(&ctx, DEFAULT_ROOT_CONTEXT_ATTRIBUTE).unwrap().is_none());
    }
}
