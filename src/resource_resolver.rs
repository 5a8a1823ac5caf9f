//! Resource and resource-bundle lookup against the discovered modules.
//!
//! Single lookups follow the type lookup shape: family fast path, packaged
//! content traversal, default loader. Multi-result lookups gather from every
//! discovered module and always add the default loader's results; duplicates
//! are removed by comparing the URLs' serialized form.

use crate::context::ExecutionContext;
use crate::discovery_cache::{DiscoveryCache, ModuleDiscovery};
use crate::errors::{FacesError, FacesResult};
use crate::module_graph::{DefaultLoader, Module};
use crate::priority::{Classifier, DiscoveryKey};
use crate::visitor::{first_found, traverse, FnVisitor};
use indexmap::IndexMap;
use std::fmt;
use tracing::debug;
use url::Url;

/// First resource at `path`
pub fn resolve_resource(
    cache: &DiscoveryCache,
    ctx: &ExecutionContext<'_>,
    path: &str,
    default: &dyn DefaultLoader,
) -> FacesResult<Url> {
    let found = match cache.discovery(ctx)? {
        Some(discovery) => find_resource_in(&discovery, cache.classifier(), path),
        None => None,
    };
    found
        .or_else(|| default.resource(path))
        .ok_or_else(|| FacesError::not_found("resource", path))
}

/// Every resource at `path`, deduplicated, module results first
pub fn resolve_resources(
    cache: &DiscoveryCache,
    ctx: &ExecutionContext<'_>,
    path: &str,
    default: &dyn DefaultLoader,
) -> FacesResult<Vec<Url>> {
    let mut merged: IndexMap<String, Url> = IndexMap::new();

    if let Some(discovery) = cache.discovery(ctx)? {
        for url in collect_resources_in(&discovery, path) {
            merged.entry(url.as_str().to_string()).or_insert(url);
        }
    }
    for url in default.resources(path) {
        merged.entry(url.as_str().to_string()).or_insert(url);
    }

    debug!(message = "Resolved resources", path = path, count = merged.len());
    Ok(merged.into_values().collect())
}

/// Discovered modules only, no fallback
pub fn find_resource_in(discovery: &ModuleDiscovery, classifier: &Classifier, path: &str) -> Option<Url> {
    let set = discovery.set();
    let runtime = discovery.runtime();
    let path = path.trim_start_matches('/');
    let mut skip = Vec::new();

    if let Some(key) = classifier.key_for_resource_path(path) {
        if let Some(module) = set.get(key) {
            if let Some(url) = runtime.resource(module.id, path) {
                return Some(url);
            }
            skip.push(DiscoveryKey::Priority(key));
        }
    }

    let mut visitor = FnVisitor::new(None, |_key, module: &Module, result| {
        if let Some(url) = runtime.own_entry(module.id, path) {
            result.set(Some(url));
        }
    })
    .on_root(|module, result| {
        if let Some(url) = runtime.resource(module.id, path) {
            result.set(Some(url));
        }
    })
    .stop_when(first_found);

    traverse(set, &skip, &mut visitor)
}

fn collect_resources_in(discovery: &ModuleDiscovery, path: &str) -> Vec<Url> {
    let runtime = discovery.runtime();
    let path = path.trim_start_matches('/');

    let mut visitor = FnVisitor::new(Vec::new(), |_key, module: &Module, result| {
        if let Some(url) = runtime.own_entry(module.id, path) {
            result.get_mut().push(url);
        }
    })
    .on_root(|module, result| {
        result.get_mut().extend(runtime.resources(module.id, path));
    });

    traverse(discovery.set(), &[], &mut visitor)
}

/// Language, country and variant of a bundle lookup
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Locale {
    pub language: String,
    pub country: String,
    pub variant: String,
}

impl Locale {
    pub fn new(language: &str, country: &str, variant: &str) -> Self {
        Self {
            language: language.to_lowercase(),
            country: country.to_uppercase(),
            variant: variant.to_string(),
        }
    }

    /// Accepts `en`, `en_US`, `en-US` and `en_US_POSIX`
    pub fn parse(tag: &str) -> Self {
        let mut parts = tag.trim().splitn(3, ['_', '-']);
        let language = parts.next().unwrap_or_default();
        let country = parts.next().unwrap_or_default();
        let variant = parts.next().unwrap_or_default();
        Self::new(language, country, variant)
    }

    pub fn root() -> Self {
        Self::default()
    }

    /// Bundle suffixes from most to least specific, ending with the base
    pub fn candidate_suffixes(&self) -> Vec<String> {
        let mut suffixes = Vec::new();
        if !self.language.is_empty() {
            if !self.country.is_empty() {
                if !self.variant.is_empty() {
                    suffixes.push(format!("_{}_{}_{}", self.language, self.country, self.variant));
                }
                suffixes.push(format!("_{}_{}", self.language, self.country));
            }
            suffixes.push(format!("_{}", self.language));
        }
        suffixes.push(String::new());
        suffixes
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = self.candidate_suffixes().into_iter().next().unwrap_or_default();
        f.write_str(suffix.trim_start_matches('_'))
    }
}

/// Where a resource bundle was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceBundleLocation {
    pub base_name: String,
    /// Locale suffix that matched, empty for the base bundle
    pub suffix: String,
    pub url: Url,
}

/// Most specific properties bundle for `base_name` and `locale`
pub fn resolve_resource_bundle(
    cache: &DiscoveryCache,
    ctx: &ExecutionContext<'_>,
    base_name: &str,
    locale: &Locale,
    default: &dyn DefaultLoader,
) -> FacesResult<ResourceBundleLocation> {
    let discovery = cache.discovery(ctx)?;
    let base_path = base_name.replace('.', "/");

    for suffix in locale.candidate_suffixes() {
        let path = format!("{base_path}{suffix}.properties");
        let found = discovery
            .as_ref()
            .and_then(|discovery| find_resource_in(discovery, cache.classifier(), &path))
            .or_else(|| default.resource(&path));

        if let Some(url) = found {
            debug!(message = "Resolved resource bundle", base_name = base_name, path = %path);
            return Ok(ResourceBundleLocation {
                base_name: base_name.to_string(),
                suffix,
                url,
            });
        }
    }

    Err(FacesError::not_found("resource bundle", format!("{base_name} ({locale})")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_parse() {
        assert_eq!(Locale::parse("en_US"), Locale::new("en", "US", ""));
        assert_eq!(Locale::parse("pt-br"), Locale::new("pt", "BR", ""));
        assert_eq!(Locale::parse("ja_JP_JP").variant, "JP");
        assert_eq!(Locale::parse("").candidate_suffixes(), vec![String::new()]);
    }

    #[test]
    fn test_candidate_suffixes_most_specific_first() {
        let locale = Locale::new("en", "US", "POSIX");
        assert_eq!(
            locale.candidate_suffixes(),
            vec!["_en_US_POSIX", "_en_US", "_en", ""]
        );
        assert_eq!(locale.to_string(), "en_US_POSIX");
    }
}
