// config_filter.rs - Drops configuration documents of libraries that are wired but unused
//
// A library can be reachable in the wiring graph without the application
// using it. Its documents then name types that are packaged by a discovered
// module but cannot be loaded, so such a document is dropped. Names that no
// discovered module packages (component families, renderer types, types of
// the host container) are not checked.

use crate::config_loader::ResolverConfig;
use crate::context::ExecutionContext;
use crate::discovery_cache::{DiscoveryCache, ModuleDiscovery};
use crate::errors::FacesResult;
use crate::module_graph::{type_file_path, DefaultLoader, Module};
use crate::type_resolver::resolve_type_in;
use crate::visitor::{traverse, FnVisitor};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};
use url::Url;

lazy_static! {
    static ref COMMENT_PATTERN: Regex = Regex::new(r"(?s)<!--.*?-->").unwrap();
    static ref CDATA_PATTERN: Regex = Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").unwrap();
    static ref LEAF_TEXT_PATTERN: Regex = Regex::new(r">([^<>]+)<").unwrap();
    static ref TYPE_NAME_PATTERN: Regex =
        Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*(\.[A-Za-z_$][A-Za-z0-9_$]*)+$").unwrap();
}

/// Configuration document families gathered from discovered modules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// `*faces-config.xml`
    FacesConfig,
    /// `*.taglib.xml`
    Taglib,
}

impl DocumentKind {
    pub fn suffix<'c>(&self, config: &'c ResolverConfig) -> &'c str {
        match self {
            DocumentKind::FacesConfig => &config.faces_config_suffix,
            DocumentKind::Taglib => &config.taglib_suffix,
        }
    }
}

/// Why a candidate document was dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    MissingType(String),
    Unreadable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedDocument {
    pub url: Url,
    pub reason: DropReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFilterOutcome {
    pub retained: Vec<Url>,
    pub dropped: Vec<DroppedDocument>,
}

/// Every discovered module's own documents below `dir` ending in `suffix`,
/// in priority order. The root module's `dir` + `suffix` document itself is
/// left out: the host runtime reads it from the application directly.
pub fn collect_config_documents(discovery: &ModuleDiscovery, dir: &str, suffix: &str) -> Vec<Url> {
    let runtime = discovery.runtime();
    let root_default = format!("{dir}{suffix}");

    let collect = |module: &Module, skip: Option<&str>, found: &mut Vec<Url>| {
        for path in runtime.own_entries(module.id, dir, suffix) {
            if skip == Some(path.as_str()) {
                continue;
            }
            if let Some(url) = runtime.own_entry(module.id, &path) {
                found.push(url);
            }
        }
    };

    let mut visitor = FnVisitor::new(Vec::new(), |_key, module: &Module, result| {
        collect(module, None, result.get_mut());
    })
    .on_root(|module, result| collect(module, Some(root_default.as_str()), result.get_mut()));
    traverse(discovery.set(), &[], &mut visitor)
}

/// Collect documents of `kind` from the context's discovery
pub fn collect_config_documents_for(
    cache: &DiscoveryCache,
    ctx: &ExecutionContext<'_>,
    kind: DocumentKind,
) -> FacesResult<Vec<Url>> {
    let config = cache.config();
    Ok(cache
        .discovery(ctx)?
        .map(|discovery| collect_config_documents(&discovery, &config.config_document_dir, kind.suffix(config)))
        .unwrap_or_default())
}

/// Keep only documents whose packaged type names all load. Without a
/// discovery the candidates are returned untouched.
pub fn filter_config_documents(
    cache: &DiscoveryCache,
    ctx: &ExecutionContext<'_>,
    candidates: Vec<Url>,
    default: &dyn DefaultLoader,
) -> FacesResult<ConfigFilterOutcome> {
    let Some(discovery) = cache.discovery(ctx)? else {
        return Ok(ConfigFilterOutcome {
            retained: candidates,
            dropped: Vec::new(),
        });
    };

    let mut outcome = ConfigFilterOutcome::default();
    for url in candidates {
        match check_document(&discovery, cache, &url, default) {
            None => outcome.retained.push(url),
            Some(reason) => {
                warn!(message = "Dropping configuration document", url = %url, reason = ?reason);
                outcome.dropped.push(DroppedDocument { url, reason });
            }
        }
    }

    info!(
        message = "Filtered configuration documents",
        retained = outcome.retained.len(),
        dropped = outcome.dropped.len()
    );
    Ok(outcome)
}

fn check_document(
    discovery: &ModuleDiscovery,
    cache: &DiscoveryCache,
    url: &Url,
    default: &dyn DefaultLoader,
) -> Option<DropReason> {
    let content = match discovery.runtime().read(url) {
        Ok(content) => content,
        Err(e) => return Some(DropReason::Unreadable(e.to_string())),
    };

    let classes_prefix = &cache.config().web_classes_prefix;
    extract_type_names(&content).into_iter().find_map(|name| {
        if !is_packaged_by_discovery(discovery, &name, classes_prefix) {
            debug!(message = "Leaf not packaged by a discovered module", url = %url, name = %name);
            return None;
        }
        resolve_type_in(discovery, cache.classifier(), &name, default)
            .err()
            .map(|_| DropReason::MissingType(name))
    })
}

/// True when some discovered module packages the type file of `name`. The
/// root keeps its types below `classes_prefix`.
pub fn is_packaged_by_discovery(discovery: &ModuleDiscovery, name: &str, classes_prefix: &str) -> bool {
    let runtime = discovery.runtime();
    let path = type_file_path(name);
    let root_path = format!("{classes_prefix}{path}");

    let mut visitor = FnVisitor::new(false, |_key, module: &Module, result| {
        if runtime.own_entry(module.id, &path).is_some() {
            result.set(true);
        }
    })
    .on_root(|module, result| {
        if runtime.own_entry(module.id, &root_path).is_some() {
            result.set(true);
        }
    })
    .stop_when(|result| *result.get());
    traverse(discovery.set(), &[], &mut visitor)
}

/// Leaf text nodes that look like fully qualified type names. At least one
/// segment must start upper-case, which rules out bare namespaces.
pub fn extract_type_names(xml: &str) -> Vec<String> {
    let without_comments = COMMENT_PATTERN.replace_all(xml, "");
    let unwrapped = CDATA_PATTERN.replace_all(&without_comments, "$1");

    let mut names: Vec<String> = Vec::new();
    for capture in LEAF_TEXT_PATTERN.captures_iter(&unwrapped) {
        let text = capture[1].trim();
        if !TYPE_NAME_PATTERN.is_match(text) {
            continue;
        }
        let has_type_segment = text
            .split('.')
            .any(|segment| segment.chars().next().is_some_and(|c| c.is_ascii_uppercase()));
        if has_type_segment && !names.iter().any(|existing| existing == text) {
            names.push(text.to_string());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_type_names() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<faces-config version="2.2">
    <!-- <component-class>com.example.Commented</component-class> -->
    <application>
        <resource-handler>com.example.faces.ResourceHandlerImpl</resource-handler>
        <default-render-kit-id>HTML_BASIC</default-render-kit-id>
    </application>
    <component>
        <component-type>com.example.Button</component-type>
        <component-class><![CDATA[com.example.component.ButtonImpl]]></component-class>
    </component>
    <factory>
        <render-kit-factory>com.example.faces.ResourceHandlerImpl</render-kit-factory>
    </factory>
    <name>com.example.lowercase.only</name>
    <version>2.2</version>
</faces-config>"#;

        let names = extract_type_names(xml);
        assert_eq!(
            names,
            vec![
                "com.example.faces.ResourceHandlerImpl",
                "com.example.Button",
                "com.example.component.ButtonImpl",
            ]
        );
    }

    #[test]
    fn test_no_leaf_text() {
        assert!(extract_type_names("<faces-config/>").is_empty());
    }
}
