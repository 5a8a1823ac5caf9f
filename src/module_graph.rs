//! Read-only view of the host's module registry and wiring graph.
//!
//! The host owns the live graph. Discovery copies the parts it needs into a
//! `WiringSnapshot` (modules and edge lists keyed by identity) and walks that
//! copy, so nothing here holds references back into host objects.

use crate::errors::{FacesError, FacesResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};
use url::Url;

/// Host-assigned module identity
pub type ModuleId = u64;

/// Identity of the host's foundational module, never a discovery candidate
pub const FOUNDATION_MODULE_ID: ModuleId = 0;

/// Manifest header carrying the static import list
pub const IMPORT_HEADER: &str = "Import-Package";

/// Manifest header carrying the dynamic (wildcard) import list
pub const DYNAMIC_IMPORT_HEADER: &str = "DynamicImport-Package";

/// Declared import lists of a module
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestMetadata {
    #[serde(default)]
    pub static_imports: Vec<String>,
    #[serde(default)]
    pub dynamic_imports: Vec<String>,
}

impl ManifestMetadata {
    /// Parse both header values. Missing or blank headers mean no imports.
    pub fn from_headers(import_package: Option<&str>, dynamic_import_package: Option<&str>) -> Self {
        Self {
            static_imports: import_package.map(parse_header_tokens).unwrap_or_default(),
            dynamic_imports: dynamic_import_package.map(parse_header_tokens).unwrap_or_default(),
        }
    }

    /// Like `from_headers`, but a malformed header is logged and read as
    /// declaring no imports
    pub fn for_module(module: ModuleId, import_package: Option<&str>, dynamic_import_package: Option<&str>) -> Self {
        Self::from_headers(
            checked_header(module, IMPORT_HEADER, import_package),
            checked_header(module, DYNAMIC_IMPORT_HEADER, dynamic_import_package),
        )
    }

    pub fn from_header_map(headers: &HashMap<String, String>) -> Self {
        Self::from_headers(
            headers.get(IMPORT_HEADER).map(String::as_str),
            headers.get(DYNAMIC_IMPORT_HEADER).map(String::as_str),
        )
    }
}

/// Reject a header value whose double quotes do not balance
pub fn validate_header(module: ModuleId, header: &str, value: &str) -> FacesResult<()> {
    if value.chars().filter(|ch| *ch == '"').count() % 2 != 0 {
        return Err(FacesError::malformed_metadata(module, header));
    }
    Ok(())
}

fn checked_header<'v>(module: ModuleId, header: &str, value: Option<&'v str>) -> Option<&'v str> {
    let value = value?;
    match validate_header(module, header, value) {
        Ok(()) => Some(value),
        Err(e) => {
            warn!(message = "Ignoring malformed manifest header", error = %e);
            None
        }
    }
}

/// Split a header value into namespace tokens.
///
/// Clauses are separated by commas outside double quotes. Attributes and
/// directives after the first `;` of a clause are dropped.
pub fn parse_header_tokens(value: &str) -> Vec<String> {
    let mut clauses = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for ch in value.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                current.push(ch);
            }
            ',' if !quoted => clauses.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    clauses.push(current);

    clauses
        .iter()
        .filter_map(|clause| {
            let token = clause.split(';').next().unwrap_or_default().trim();
            (!token.is_empty()).then(|| token.to_string())
        })
        .collect()
}

/// A deployable unit in the host's module graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub identifier: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub metadata: ManifestMetadata,
}

impl Module {
    pub fn new(id: ModuleId, identifier: impl Into<String>) -> Self {
        Self {
            id,
            identifier: identifier.into(),
            version: None,
            metadata: ManifestMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: ManifestMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn is_foundation(&self) -> bool {
        self.id == FOUNDATION_MODULE_ID
    }
}

/// Whether a requirement was declared unconditionally or lazily
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementKind {
    Static,
    Dynamic,
}

/// Namespace of package-level wiring
pub const PACKAGE_NAMESPACE: &str = "osgi.wiring.package";

/// A resolved dependency link from `requirer` to `provider`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WiringEdge {
    pub requirer: ModuleId,
    pub provider: ModuleId,
    pub kind: RequirementKind,
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_namespace() -> String {
    PACKAGE_NAMESPACE.to_string()
}

impl WiringEdge {
    pub fn new(requirer: ModuleId, provider: ModuleId, kind: RequirementKind) -> Self {
        Self {
            requirer,
            provider,
            kind,
            namespace: default_namespace(),
        }
    }

    pub fn in_namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    pub fn is_dynamic(&self) -> bool {
        self.kind == RequirementKind::Dynamic
    }

    pub fn is_package_wire(&self) -> bool {
        self.namespace == PACKAGE_NAMESPACE
    }
}

/// Required and provided edges of one resolved module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleWiring {
    pub required: Vec<WiringEdge>,
    pub provided: Vec<WiringEdge>,
}

/// A type made available by a loader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedType {
    pub name: String,
    /// Defining module, `None` when the default loader supplied it
    #[serde(default)]
    pub module: Option<ModuleId>,
    #[serde(default)]
    pub annotations: Vec<String>,
}

/// Why a single loader attempt produced no type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadFailure {
    /// The loader has no such type
    Absent,
    /// The loader claims the type but defining it failed
    Linkage(String),
}

/// Source of module records and wiring
pub trait ModuleGraph: Send + Sync {
    fn installed_modules(&self) -> Vec<Module>;

    fn module(&self, id: ModuleId) -> Option<Module>;

    /// `None` for modules without wiring (unresolved or fragments)
    fn wiring(&self, id: ModuleId) -> Option<ModuleWiring>;

    /// Module that packages this library, if the host can tell
    fn library_module(&self) -> Option<ModuleId>;
}

/// Per-module type and resource access
pub trait ModuleLoader: Send + Sync {
    /// Load through the module's effective classpath, including imports
    fn load_type(&self, module: ModuleId, name: &str) -> Result<LoadedType, LoadFailure>;

    /// Entry packaged inside the module itself
    fn own_entry(&self, module: ModuleId, path: &str) -> Option<Url>;

    /// Paths of packaged entries below `dir` ending in `suffix`
    fn own_entries(&self, module: ModuleId, dir: &str, suffix: &str) -> Vec<String>;

    /// First resource on the module's effective classpath
    fn resource(&self, module: ModuleId, path: &str) -> Option<Url>;

    /// All resources on the module's effective classpath
    fn resources(&self, module: ModuleId, path: &str) -> Vec<Url>;

    fn read(&self, url: &Url) -> std::io::Result<String>;
}

/// Everything discovery and resolution need from the host
pub trait ModuleRuntime: ModuleGraph + ModuleLoader {}

impl<T: ModuleGraph + ModuleLoader> ModuleRuntime for T {}

/// Fallback loader used when the discovered modules yield nothing
pub trait DefaultLoader {
    fn load_type(&self, name: &str) -> Result<LoadedType, LoadFailure>;

    fn resource(&self, path: &str) -> Option<Url>;

    fn resources(&self, path: &str) -> Vec<Url>;
}

/// Arena copy of the host graph taken once per discovery
#[derive(Debug, Clone, Default)]
pub struct WiringSnapshot {
    modules: HashMap<ModuleId, Module>,
    wiring: HashMap<ModuleId, ModuleWiring>,
    library_module: Option<ModuleId>,
}

impl WiringSnapshot {
    pub fn capture<G: ModuleGraph + ?Sized>(graph: &G) -> Self {
        let mut snapshot = Self {
            library_module: graph.library_module(),
            ..Default::default()
        };

        for module in graph.installed_modules() {
            if let Some(wiring) = graph.wiring(module.id) {
                snapshot.wiring.insert(module.id, wiring);
            }
            snapshot.modules.insert(module.id, module);
        }

        debug!(
            message = "Captured wiring snapshot",
            modules = snapshot.modules.len(),
            wired = snapshot.wiring.len()
        );
        snapshot
    }

    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(&id)
    }

    pub fn required(&self, id: ModuleId) -> Option<&[WiringEdge]> {
        self.wiring.get(&id).map(|wiring| wiring.required.as_slice())
    }

    pub fn provided(&self, id: ModuleId) -> Option<&[WiringEdge]> {
        self.wiring.get(&id).map(|wiring| wiring.provided.as_slice())
    }

    pub fn library_module(&self) -> Option<ModuleId> {
        self.library_module
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// `a.b.Type` to `a/b/Type.class`
pub fn type_file_path(type_name: &str) -> String {
    format!("{}.class", type_name.replace('.', "/"))
}

/// `a/b/Type.class` to `a.b.Type`, dropping a classes-directory prefix.
/// Descriptor files (`module-info`, `package-info`) are not types.
pub fn type_name_from_path(path: &str, classes_prefix: &str) -> Option<String> {
    let path = path.trim_start_matches('/');
    let path = path.strip_prefix(classes_prefix).unwrap_or(path);
    let stem = path.strip_suffix(".class")?;
    let simple = stem.rsplit('/').next().unwrap_or(stem);
    if stem.is_empty() || simple == "module-info" || simple == "package-info" {
        return None;
    }
    Some(stem.replace('/', "."))
}
