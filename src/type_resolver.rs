//! Type lookup against the discovered modules.
//!
//! 1. A type name under a well-known family's namespace goes straight to
//!    that family's module. Public bridge types ask the API module first.
//! 2. Otherwise every discovered module is tried in priority order, but a
//!    module only loads the type when the type file is packaged inside it.
//!    Broad dynamic imports would otherwise let a module hand out types
//!    that belong to someone else. The root module loads through its whole
//!    effective classpath.
//! 3. The caller's default loader is the last resort.

use crate::context::ExecutionContext;
use crate::discovery_cache::{DiscoveryCache, ModuleDiscovery};
use crate::errors::{FacesError, FacesResult};
use crate::module_graph::{type_file_path, DefaultLoader, LoadFailure, LoadedType, Module, ModuleRuntime};
use crate::priority::{Classifier, DiscoveryKey};
use crate::visitor::{first_found, traverse, FnVisitor};
use tracing::debug;

/// Resolve `name` for the application of `ctx`
pub fn resolve_type(
    cache: &DiscoveryCache,
    ctx: &ExecutionContext<'_>,
    name: &str,
    default: &dyn DefaultLoader,
) -> FacesResult<LoadedType> {
    match cache.discovery(ctx)? {
        Some(discovery) => resolve_type_in(&discovery, cache.classifier(), name, default),
        None => load_from_default(name, default),
    }
}

/// Resolve against an already obtained discovery
pub fn resolve_type_in(
    discovery: &ModuleDiscovery,
    classifier: &Classifier,
    name: &str,
    default: &dyn DefaultLoader,
) -> FacesResult<LoadedType> {
    if let Some(found) = find_in_modules(discovery, classifier, name) {
        return Ok(found);
    }
    load_from_default(name, default)
}

/// Discovered modules only, no fallback
pub fn find_in_modules(discovery: &ModuleDiscovery, classifier: &Classifier, name: &str) -> Option<LoadedType> {
    let set = discovery.set();
    let runtime = discovery.runtime();
    let mut skip = Vec::new();

    for key in classifier.type_candidates(name) {
        let Some(module) = set.get(key) else {
            continue;
        };
        if let Some(found) = attempt(runtime, module, name) {
            debug!(message = "Type resolved by family", type_name = name, family = %key);
            return Some(found);
        }
        skip.push(DiscoveryKey::Priority(key));
    }

    let path = type_file_path(name);
    let mut visitor = FnVisitor::new(None, |_key, module: &Module, result| {
        if is_packaged(runtime, module, &path) {
            if let Some(found) = attempt(runtime, module, name) {
                result.set(Some(found));
            }
        }
    })
    .on_root(|module, result| {
        if let Some(found) = attempt(runtime, module, name) {
            result.set(Some(found));
        }
    })
    .stop_when(first_found);

    let found = traverse(set, &skip, &mut visitor);
    if found.is_none() {
        debug!(message = "Type not packaged by any discovered module", type_name = name);
    }
    found
}

/// True when `path` is packaged inside `module` itself
pub(crate) fn is_packaged(runtime: &dyn ModuleRuntime, module: &Module, path: &str) -> bool {
    runtime.own_entry(module.id, path).is_some()
}

/// One loader attempt; failures are logged and swallowed
fn attempt(runtime: &dyn ModuleRuntime, module: &Module, name: &str) -> Option<LoadedType> {
    match runtime.load_type(module.id, name) {
        Ok(found) => Some(found),
        Err(LoadFailure::Absent) => None,
        Err(LoadFailure::Linkage(message)) => {
            debug!(
                message = "Module failed to load type; trying next",
                module = %module.identifier,
                type_name = name,
                error = %message
            );
            None
        }
    }
}

fn load_from_default(name: &str, default: &dyn DefaultLoader) -> FacesResult<LoadedType> {
    match default.load_type(name) {
        Ok(found) => Ok(found),
        Err(LoadFailure::Absent) => Err(FacesError::not_found("type", name)),
        Err(LoadFailure::Linkage(message)) => {
            debug!(message = "Default loader failed to load type", type_name = name, error = %message);
            Err(FacesError::not_found("type", name))
        }
    }
}
