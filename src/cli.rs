use crate::annotation_scanner::scan_annotated_types;
use crate::config_filter::{collect_config_documents_for, filter_config_documents, DocumentKind, DropReason};
use crate::config_loader::ResolverConfig;
use crate::context::{publish_root_module, ExecutionContext, RuntimeHandle, SimpleHostContext};
use crate::discovery_cache::DiscoveryCache;
use crate::environment;
use crate::errors::{FacesError, FacesResult};
use crate::module_graph::ModuleId;
use crate::resource_resolver::{resolve_resource, resolve_resources};
use crate::static_runtime::StaticModuleRuntime;
use crate::type_resolver::resolve_type;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

/// Top-level CLI interface
#[derive(Parser)]
#[command(
    name = "faces-modules",
    version = "0.1.0",
    about = "Inspect module discovery and lookup resolution against a described runtime"
)]
pub struct Cli {
    /// Runtime description (TOML, or JSON with a .json extension)
    #[arg(short, long)]
    pub runtime: PathBuf,

    /// Identity of the root module
    #[arg(long)]
    pub root: ModuleId,

    /// Resolver configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the discovered modules in priority order
    Discover,

    /// Resolve a type by qualified name
    ResolveType {
        name: String,
    },

    /// Resolve a resource by path
    ResolveResource {
        path: String,
        /// Print every match instead of the first
        #[arg(long)]
        all: bool,
    },

    /// List annotated types per handled annotation
    ScanAnnotations,

    /// Show which configuration documents survive filtering
    FilterConfigs {
        /// Filter tag library documents instead of faces configuration
        #[arg(long)]
        taglibs: bool,
    },
}

/// Run a parsed command, returning the lines to print
pub fn run(cli: &Cli, config: ResolverConfig) -> FacesResult<Vec<String>> {
    let runtime = Arc::new(StaticModuleRuntime::from_file(&cli.runtime)?);
    let environment = environment::initialize(Some(runtime.as_ref()), &config.weaver_identifier);

    let host = SimpleHostContext::default();
    publish_root_module(
        &host.attributes,
        &config.root_context_attribute,
        RuntimeHandle::new(cli.root, runtime.clone()),
    );
    let ctx = ExecutionContext::Host(&host);
    let cache = DiscoveryCache::new(environment, config);
    let default = runtime.as_ref();

    let mut lines = Vec::new();
    match &cli.command {
        Commands::Discover => {
            let set = cache.get_or_compute(&ctx)?;
            for (key, module) in set.iter() {
                lines.push(format!("{:<18} #{:<5} {}", key.to_string(), module.id, module.identifier));
            }
            if environment.is_weaver_present() {
                lines.push("weaver: present".to_string());
            }
        }
        Commands::ResolveType { name } => match resolve_type(&cache, &ctx, name, default) {
            Ok(loaded) => lines.push(match loaded.module {
                Some(id) => format!("{} -> module #{id}", loaded.name),
                None => format!("{} -> default loader", loaded.name),
            }),
            Err(e) if e.is_not_found() => lines.push(format!("{name}: not found")),
            Err(e) => return Err(e),
        },
        Commands::ResolveResource { path, all: true } => {
            for url in resolve_resources(&cache, &ctx, path, default)? {
                lines.push(url.to_string());
            }
        }
        Commands::ResolveResource { path, all: false } => match resolve_resource(&cache, &ctx, path, default) {
            Ok(url) => lines.push(url.to_string()),
            Err(e) if e.is_not_found() => lines.push(format!("{path}: not found")),
            Err(e) => return Err(e),
        },
        Commands::ScanAnnotations => {
            for (annotation, types) in scan_annotated_types(&cache, &ctx)? {
                lines.push(annotation);
                for loaded in types {
                    lines.push(format!("  {}", loaded.name));
                }
            }
        }
        Commands::FilterConfigs { taglibs } => {
            let kind = if *taglibs { DocumentKind::Taglib } else { DocumentKind::FacesConfig };
            let candidates = collect_config_documents_for(&cache, &ctx, kind)?;
            let outcome = filter_config_documents(&cache, &ctx, candidates, default)?;
            for url in &outcome.retained {
                lines.push(format!("retained {url}"));
            }
            for dropped in &outcome.dropped {
                let reason = match &dropped.reason {
                    DropReason::MissingType(name) => format!("missing type {name}"),
                    DropReason::Unreadable(error) => format!("unreadable: {error}"),
                };
                lines.push(format!("dropped  {} ({reason})", dropped.url));
            }
        }
    }

    if lines.is_empty() && cache.get_or_compute(&ctx)?.is_empty() {
        return Err(FacesError::not_found("root module", cli.root.to_string()));
    }
    Ok(lines)
}
