//! Library root for the `faces_util` crate
//! Module discovery and lookup resolution for component web UI applications
//! deployed on a modular runtime

// Core error handling
pub mod errors;

// Configuration & CLI
pub mod cli;
pub mod config_loader;

// Host environment
pub mod context;
pub mod environment;
pub mod module_graph;
pub mod static_runtime;

// Discovery
pub mod discovery_cache;
pub mod priority;
pub mod visitor;
pub mod walker;

// Resolution consumers
pub mod annotation_scanner;
pub mod config_filter;
pub mod resource_resolver;
pub mod type_resolver;


pub use context::{ExecutionContext, RuntimeHandle};
pub use discovery_cache::{DiscoveryCache, ModuleDiscovery, DISCOVERY_CACHE_KEY};
pub use errors::{FacesError, FacesResult};
pub use module_graph::{DefaultLoader, LoadedType, Module, ModuleId, ModuleRuntime};
pub use priority::{DiscoveryKey, PriorityKey};
pub use walker::DiscoveredModuleSet;
