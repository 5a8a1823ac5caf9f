//! In-memory module runtime described by TOML or JSON.
//!
//! Serves as the host for the diagnostic binary and as the fixture for tests.
//! A module's effective classpath is its own content followed by the content
//! of every module it is wired to.

use crate::errors::{FacesError, FacesResult};
use crate::module_graph::{
    type_file_path, DefaultLoader, LoadFailure, LoadedType, ManifestMetadata, Module, ModuleGraph, ModuleId,
    ModuleLoader, ModuleWiring, RequirementKind, WiringEdge,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use url::Url;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescription {
    pub name: String,
    #[serde(default)]
    pub annotations: Vec<String>,
    /// Present in the module but fails to define
    #[serde(default)]
    pub broken: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescription {
    pub id: ModuleId,
    pub identifier: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub import_package: Option<String>,
    #[serde(default)]
    pub dynamic_import_package: Option<String>,
    #[serde(default)]
    pub entries: Vec<String>,
    #[serde(default)]
    pub types: Vec<TypeDescription>,
    /// Packaged documents by path
    #[serde(default)]
    pub documents: BTreeMap<String, String>,
    /// No wiring, as for unresolved modules and fragments
    #[serde(default)]
    pub unresolved: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultLoaderDescription {
    #[serde(default)]
    pub types: Vec<TypeDescription>,
    #[serde(default)]
    pub resources: Vec<String>,
}

/// Serialized form of a whole runtime
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeDescription {
    #[serde(default)]
    pub library_module: Option<ModuleId>,
    #[serde(default)]
    pub modules: Vec<ModuleDescription>,
    #[serde(default)]
    pub wires: Vec<WiringEdge>,
    #[serde(default)]
    pub default_loader: DefaultLoaderDescription,
}

#[derive(Debug, Clone)]
struct StaticModule {
    module: Module,
    entries: BTreeSet<String>,
    types: BTreeMap<String, TypeDescription>,
    unresolved: bool,
}

#[derive(Debug, Clone, Default)]
pub struct StaticModuleRuntime {
    library_module: Option<ModuleId>,
    modules: BTreeMap<ModuleId, StaticModule>,
    wires: Vec<WiringEdge>,
    documents: HashMap<String, String>,
    default_types: BTreeMap<String, TypeDescription>,
    default_resources: Vec<String>,
}

pub fn module_entry_url(id: ModuleId, path: &str) -> Option<Url> {
    Url::parse(&format!("bundle://{id}/{}", path.trim_start_matches('/'))).ok()
}

pub fn default_resource_url(path: &str) -> Option<Url> {
    Url::parse(&format!("file:///default/{}", path.trim_start_matches('/'))).ok()
}

impl StaticModuleRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_description(description: RuntimeDescription) -> Self {
        let mut runtime = Self {
            library_module: description.library_module,
            wires: description.wires,
            ..Default::default()
        };

        for desc in description.modules {
            let id = desc.id;
            runtime.add_module(id, &desc.identifier);
            runtime.set_imports(
                id,
                desc.import_package.as_deref(),
                desc.dynamic_import_package.as_deref(),
            );
            if let Some(module) = runtime.modules.get_mut(&id) {
                module.module.version = desc.version;
                module.unresolved = desc.unresolved;
            }
            for entry in desc.entries {
                runtime.add_entry(id, &entry);
            }
            for ty in desc.types {
                runtime.insert_type(id, ty);
            }
            for (path, content) in desc.documents {
                runtime.add_document(id, &path, &content);
            }
        }

        for ty in description.default_loader.types {
            runtime.default_types.insert(ty.name.clone(), ty);
        }
        runtime.default_resources = description.default_loader.resources;
        runtime
    }

    pub fn from_toml_str(raw: &str) -> FacesResult<Self> {
        let description: RuntimeDescription = toml::from_str(raw)?;
        Ok(Self::from_description(description))
    }

    pub fn from_json_str(raw: &str) -> FacesResult<Self> {
        let description: RuntimeDescription = serde_json::from_str(raw)?;
        Ok(Self::from_description(description))
    }

    /// `.json` files are read as JSON, everything else as TOML
    pub fn from_file(path: &Path) -> FacesResult<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| FacesError::io(format!("reading runtime description {}", path.display()), e))?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&raw),
            _ => Self::from_toml_str(&raw),
        }
    }

    pub fn add_module(&mut self, id: ModuleId, identifier: &str) {
        self.modules.insert(
            id,
            StaticModule {
                module: Module::new(id, identifier),
                entries: BTreeSet::new(),
                types: BTreeMap::new(),
                unresolved: false,
            },
        );
    }

    pub fn set_imports(&mut self, id: ModuleId, import_package: Option<&str>, dynamic_import_package: Option<&str>) {
        if let Some(module) = self.modules.get_mut(&id) {
            module.module.metadata = ManifestMetadata::for_module(id, import_package, dynamic_import_package);
        }
    }

    pub fn add_wire(&mut self, requirer: ModuleId, provider: ModuleId, kind: RequirementKind) {
        self.wires.push(WiringEdge::new(requirer, provider, kind));
    }

    pub fn add_edge(&mut self, edge: WiringEdge) {
        self.wires.push(edge);
    }

    pub fn add_entry(&mut self, id: ModuleId, path: &str) {
        if let Some(module) = self.modules.get_mut(&id) {
            module.entries.insert(path.trim_start_matches('/').to_string());
        }
    }

    pub fn add_type(&mut self, id: ModuleId, name: &str, annotations: &[&str]) {
        self.insert_type(
            id,
            TypeDescription {
                name: name.to_string(),
                annotations: annotations.iter().map(|a| a.to_string()).collect(),
                broken: false,
            },
        );
    }

    pub fn add_broken_type(&mut self, id: ModuleId, name: &str) {
        self.insert_type(
            id,
            TypeDescription {
                name: name.to_string(),
                annotations: Vec::new(),
                broken: true,
            },
        );
    }

    fn insert_type(&mut self, id: ModuleId, ty: TypeDescription) {
        if let Some(module) = self.modules.get_mut(&id) {
            module.entries.insert(type_file_path(&ty.name));
            module.types.insert(ty.name.clone(), ty);
        }
    }

    pub fn add_document(&mut self, id: ModuleId, path: &str, content: &str) {
        self.add_entry(id, path);
        if let Some(url) = module_entry_url(id, path) {
            self.documents.insert(url.as_str().to_string(), content.to_string());
        }
    }

    pub fn mark_unresolved(&mut self, id: ModuleId) {
        if let Some(module) = self.modules.get_mut(&id) {
            module.unresolved = true;
        }
    }

    pub fn set_library_module(&mut self, id: ModuleId) {
        self.library_module = Some(id);
    }

    pub fn add_default_type(&mut self, name: &str) {
        self.default_types.insert(
            name.to_string(),
            TypeDescription {
                name: name.to_string(),
                ..Default::default()
            },
        );
    }

    pub fn add_default_resource(&mut self, path: &str) {
        self.default_resources.push(path.trim_start_matches('/').to_string());
    }

    fn is_wired(&self, id: ModuleId) -> bool {
        self.modules.get(&id).is_some_and(|module| !module.unresolved)
    }

    /// Providers on the module's effective classpath, in wire order
    fn providers(&self, id: ModuleId) -> Vec<ModuleId> {
        if !self.is_wired(id) {
            return Vec::new();
        }
        let mut providers: Vec<ModuleId> = Vec::new();
        for wire in self.wires.iter().filter(|wire| wire.requirer == id) {
            if !providers.contains(&wire.provider) {
                providers.push(wire.provider);
            }
        }
        providers
    }

    fn own_type(&self, id: ModuleId, name: &str) -> Option<Result<LoadedType, LoadFailure>> {
        let ty = self.modules.get(&id)?.types.get(name)?;
        Some(to_loaded(ty, Some(id)))
    }
}

fn to_loaded(ty: &TypeDescription, module: Option<ModuleId>) -> Result<LoadedType, LoadFailure> {
    if ty.broken {
        return Err(LoadFailure::Linkage(format!("{} could not be defined", ty.name)));
    }
    Ok(LoadedType {
        name: ty.name.clone(),
        module,
        annotations: ty.annotations.clone(),
    })
}

impl ModuleGraph for StaticModuleRuntime {
    fn installed_modules(&self) -> Vec<Module> {
        self.modules.values().map(|module| module.module.clone()).collect()
    }

    fn module(&self, id: ModuleId) -> Option<Module> {
        self.modules.get(&id).map(|module| module.module.clone())
    }

    fn wiring(&self, id: ModuleId) -> Option<ModuleWiring> {
        if !self.is_wired(id) {
            return None;
        }
        Some(ModuleWiring {
            required: self.wires.iter().filter(|wire| wire.requirer == id).cloned().collect(),
            provided: self.wires.iter().filter(|wire| wire.provider == id).cloned().collect(),
        })
    }

    fn library_module(&self) -> Option<ModuleId> {
        self.library_module
    }
}

impl ModuleLoader for StaticModuleRuntime {
    fn load_type(&self, module: ModuleId, name: &str) -> Result<LoadedType, LoadFailure> {
        if let Some(result) = self.own_type(module, name) {
            return result;
        }
        self.providers(module)
            .into_iter()
            .find_map(|provider| self.own_type(provider, name))
            .unwrap_or(Err(LoadFailure::Absent))
    }

    fn own_entry(&self, module: ModuleId, path: &str) -> Option<Url> {
        let path = path.trim_start_matches('/');
        let found = self.modules.get(&module)?.entries.contains(path);
        if found {
            module_entry_url(module, path)
        } else {
            None
        }
    }

    fn own_entries(&self, module: ModuleId, dir: &str, suffix: &str) -> Vec<String> {
        let dir = dir.trim_start_matches('/');
        self.modules
            .get(&module)
            .map(|m| {
                m.entries
                    .iter()
                    .filter(|entry| entry.starts_with(dir) && entry.ends_with(suffix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn resource(&self, module: ModuleId, path: &str) -> Option<Url> {
        self.own_entry(module, path).or_else(|| {
            self.providers(module)
                .into_iter()
                .find_map(|provider| self.own_entry(provider, path))
        })
    }

    fn resources(&self, module: ModuleId, path: &str) -> Vec<Url> {
        std::iter::once(module)
            .chain(self.providers(module))
            .filter_map(|id| self.own_entry(id, path))
            .collect()
    }

    fn read(&self, url: &Url) -> std::io::Result<String> {
        self.documents.get(url.as_str()).cloned().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, format!("no document at {url}"))
        })
    }
}

impl DefaultLoader for StaticModuleRuntime {
    fn load_type(&self, name: &str) -> Result<LoadedType, LoadFailure> {
        self.default_types
            .get(name)
            .map(|ty| to_loaded(ty, None))
            .unwrap_or(Err(LoadFailure::Absent))
    }

    fn resource(&self, path: &str) -> Option<Url> {
        let path = path.trim_start_matches('/');
        self.default_resources
            .iter()
            .find(|resource| resource.as_str() == path)
            .and_then(|resource| default_resource_url(resource))
    }

    fn resources(&self, path: &str) -> Vec<Url> {
        DefaultLoader::resource(self, path).into_iter().collect()
    }
}

/// Default loader that finds nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyLoader;

impl DefaultLoader for EmptyLoader {
    fn load_type(&self, _name: &str) -> Result<LoadedType, LoadFailure> {
        Err(LoadFailure::Absent)
    }

    fn resource(&self, _path: &str) -> Option<Url> {
        None
    }

    fn resources(&self, _path: &str) -> Vec<Url> {
        Vec::new()
    }
}
