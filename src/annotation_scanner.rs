//! Annotation scanning over the discovered modules' packaged types.

use crate::context::ExecutionContext;
use crate::discovery_cache::{DiscoveryCache, ModuleDiscovery};
use crate::errors::FacesResult;
use crate::module_graph::{type_name_from_path, LoadFailure, LoadedType, Module};
use crate::visitor::{traverse, FnVisitor};
use lazy_static::lazy_static;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

lazy_static! {
    /// Annotation types the framework's scanning contract handles
    pub static ref HANDLED_ANNOTATIONS: BTreeSet<&'static str> = [
        "javax.faces.bean.ManagedBean",
        "javax.faces.component.FacesComponent",
        "javax.faces.component.behavior.FacesBehavior",
        "javax.faces.convert.FacesConverter",
        "javax.faces.event.ListenerFor",
        "javax.faces.event.ListenersFor",
        "javax.faces.event.NamedEvent",
        "javax.faces.application.ResourceDependencies",
        "javax.faces.application.ResourceDependency",
        "javax.faces.render.FacesBehaviorRenderer",
        "javax.faces.render.FacesRenderer",
        "javax.faces.validator.FacesValidator",
    ]
    .into_iter()
    .collect();
}

/// Annotation type name to the types carrying it
pub type AnnotatedTypes = BTreeMap<String, Vec<LoadedType>>;

/// Scan every discovered module. Empty outside a modular runtime, where the
/// host container performs the scan itself.
pub fn scan_annotated_types(cache: &DiscoveryCache, ctx: &ExecutionContext<'_>) -> FacesResult<AnnotatedTypes> {
    match cache.discovery(ctx)? {
        Some(discovery) => Ok(scan_discovery(&discovery, &cache.config().web_classes_prefix)),
        None => Ok(AnnotatedTypes::new()),
    }
}

pub fn scan_discovery(discovery: &ModuleDiscovery, classes_prefix: &str) -> AnnotatedTypes {
    let runtime = discovery.runtime();

    let mut visitor = FnVisitor::new(AnnotatedTypes::new(), |_key, module: &Module, result| {
        for path in runtime.own_entries(module.id, "", ".class") {
            let Some(name) = type_name_from_path(&path, classes_prefix) else {
                continue;
            };
            let loaded = match runtime.load_type(module.id, &name) {
                Ok(loaded) => loaded,
                Err(LoadFailure::Absent) => continue,
                Err(LoadFailure::Linkage(error)) => {
                    debug!(
                        message = "Skipping type that failed to load",
                        module = %module.identifier,
                        type_name = %name,
                        error = %error
                    );
                    continue;
                }
            };
            record(result.get_mut(), loaded);
        }
    });

    let annotated = traverse(discovery.set(), &[], &mut visitor);
    info!(
        message = "Scanned annotated types",
        annotations = annotated.len(),
        types = annotated.values().map(Vec::len).sum::<usize>()
    );
    annotated
}

fn record(annotated: &mut AnnotatedTypes, loaded: LoadedType) {
    for annotation in &loaded.annotations {
        if !HANDLED_ANNOTATIONS.contains(annotation.as_str()) {
            continue;
        }
        let types = annotated.entry(annotation.clone()).or_default();
        if !types.iter().any(|existing| existing.name == loaded.name) {
            types.push(loaded.clone());
        }
    }
}
