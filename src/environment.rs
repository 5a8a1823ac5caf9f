// environment.rs - Detection of the modular runtime and the weaving companion
//
// Detection runs once per process through `initialize`. The flags are
// immutable afterwards; `current` reports "absent" until initialization.

use crate::module_graph::ModuleGraph;
use std::sync::OnceLock;
use tracing::info;

/// Identifier of the bytecode-weaving companion module
pub const DEFAULT_WEAVER_IDENTIFIER: &str = "com.liferay.faces.osgi.weaver";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Environment {
    modular_runtime: bool,
    weaver: bool,
}

static ENVIRONMENT: OnceLock<Environment> = OnceLock::new();

impl Environment {
    /// No modular runtime, no weaver
    pub const fn absent() -> Self {
        Self {
            modular_runtime: false,
            weaver: false,
        }
    }

    /// Modular runtime present, weaver as given
    pub const fn modular(weaver: bool) -> Self {
        Self {
            modular_runtime: true,
            weaver,
        }
    }

    /// Inspect a host graph. `None` means the host runtime is not available.
    pub fn detect<G: ModuleGraph + ?Sized>(host: Option<&G>, weaver_identifier: &str) -> Self {
        match host {
            None => Self::absent(),
            Some(graph) => Self {
                modular_runtime: true,
                weaver: graph
                    .installed_modules()
                    .iter()
                    .any(|module| module.identifier == weaver_identifier),
            },
        }
    }

    pub fn is_modular_runtime_present(&self) -> bool {
        self.modular_runtime
    }

    pub fn is_weaver_present(&self) -> bool {
        self.weaver
    }
}

/// Detect once for the whole process. Later calls return the first result.
pub fn initialize<G: ModuleGraph + ?Sized>(host: Option<&G>, weaver_identifier: &str) -> Environment {
    *ENVIRONMENT.get_or_init(|| {
        let environment = Environment::detect(host, weaver_identifier);
        info!(
            message = "Environment detected",
            modular_runtime = environment.modular_runtime,
            weaver = environment.weaver
        );
        environment
    })
}

/// Flags recorded by `initialize`, or `absent` before it ran
pub fn current() -> Environment {
    ENVIRONMENT.get().copied().unwrap_or_default()
}
