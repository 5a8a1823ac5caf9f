//! Dependency graph walker and classifier.
//!
//! Starting at the root module, the walker follows required package wiring
//! edges, classifies every accepted provider by its identifier and returns the
//! modules ordered by `DiscoveryKey`.
//!
//! Edges are rejected when they lead to the foundational module, to a
//! module already accepted, or when they only exist because the requiring
//! module declared an overly broad wildcard dynamic import covering a
//! well-known library family that its static imports never mention.
//! Such wildcards make libraries reachable without the module using them.

use crate::module_graph::{Module, ModuleId, WiringEdge, WiringSnapshot, FOUNDATION_MODULE_ID};
use crate::priority::{Classifier, DiscoveryKey, PriorityKey};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Ordered result of a discovery walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredModuleSet {
    entries: BTreeMap<DiscoveryKey, Module>,
}

impl DiscoveredModuleSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<&Module> {
        self.entries.get(&DiscoveryKey::ROOT)
    }

    pub fn get(&self, key: impl Into<DiscoveryKey>) -> Option<&Module> {
        self.entries.get(&key.into())
    }

    pub fn contains_key(&self, key: impl Into<DiscoveryKey>) -> bool {
        self.entries.contains_key(&key.into())
    }

    pub fn contains_module(&self, id: ModuleId) -> bool {
        self.key_of(id).is_some()
    }

    pub fn key_of(&self, id: ModuleId) -> Option<DiscoveryKey> {
        self.entries
            .iter()
            .find(|(_, module)| module.id == id)
            .map(|(key, _)| *key)
    }

    /// Entries in `DiscoveryKey` order
    pub fn iter(&self) -> impl Iterator<Item = (&DiscoveryKey, &Module)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &DiscoveryKey> {
        self.entries.keys()
    }

    /// Key to identity mapping, for comparing two discoveries
    pub fn identities(&self) -> Vec<(DiscoveryKey, ModuleId)> {
        self.entries.iter().map(|(key, module)| (*key, module.id)).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Walks a wiring snapshot from a root module
pub struct DependencyWalker<'a> {
    snapshot: &'a WiringSnapshot,
    classifier: &'a Classifier,
}

/// Mutable state of one walk: accepted identities and their candidate role
struct Walk {
    accepted: BTreeMap<ModuleId, Option<PriorityKey>>,
}

impl<'a> DependencyWalker<'a> {
    pub fn new(snapshot: &'a WiringSnapshot, classifier: &'a Classifier) -> Self {
        Self { snapshot, classifier }
    }

    pub fn discover(&self, root: ModuleId) -> DiscoveredModuleSet {
        let Some(root_module) = self.snapshot.module(root) else {
            warn!(message = "Root module not installed", root = root);
            return DiscoveredModuleSet::empty();
        };
        if root_module.is_foundation() {
            warn!(message = "Foundational module cannot be a discovery root");
            return DiscoveredModuleSet::empty();
        }

        let mut walk = Walk {
            accepted: BTreeMap::new(),
        };
        walk.accepted.insert(root, Some(PriorityKey::RootModule));

        if self.snapshot.library_module() == Some(root) {
            debug!(
                message = "Library packaged inside the root module; skipping walk",
                root = %root_module.identifier
            );
        } else {
            self.walk(root, &mut walk);
        }

        let set = self.assemble(root, walk);
        info!(
            message = "Discovered modules",
            root = %root_module.identifier,
            count = set.len()
        );
        set
    }

    fn walk(&self, module_id: ModuleId, walk: &mut Walk) {
        let Some(edges) = self.snapshot.required(module_id) else {
            debug!(message = "Module has no wiring; skipping", module = module_id);
            return;
        };

        for edge in edges.iter().filter(|edge| edge.is_package_wire()) {
            let provider_id = edge.provider;
            if provider_id == FOUNDATION_MODULE_ID || walk.accepted.contains_key(&provider_id) {
                continue;
            }
            let Some(provider) = self.snapshot.module(provider_id) else {
                continue;
            };

            let role = self.classifier.classify(&provider.identifier);
            if let Some(key) = role {
                if self.is_dynamic_false_positive(edge, key) {
                    debug!(
                        message = "Skipping edge created by a broad dynamic import",
                        requirer = edge.requirer,
                        provider = %provider.identifier,
                        family = %key
                    );
                    continue;
                }
            }

            debug!(
                message = "Accepted edge",
                requirer = edge.requirer,
                provider = %provider.identifier,
                role = ?role
            );
            walk.accepted.insert(provider_id, role);

            if role == Some(PriorityKey::BridgeApi) {
                self.pull_bridge_companions(provider_id, walk);
            }
            self.walk(provider_id, walk);
        }
    }

    /// Modules requiring the bridge API whose identifiers name a bridge
    /// implementation or extension
    fn pull_bridge_companions(&self, api_id: ModuleId, walk: &mut Walk) {
        let Some(provided) = self.snapshot.provided(api_id) else {
            return;
        };

        for edge in provided.iter().filter(|edge| edge.is_package_wire()) {
            let dependent_id = edge.requirer;
            if dependent_id == FOUNDATION_MODULE_ID || walk.accepted.contains_key(&dependent_id) {
                continue;
            }
            let Some(dependent) = self.snapshot.module(dependent_id) else {
                continue;
            };
            let role = self.classifier.classify(&dependent.identifier);
            if role.is_some_and(|key| key.is_bridge_companion()) {
                debug!(message = "Accepted bridge companion", module = %dependent.identifier);
                walk.accepted.insert(dependent_id, role);
                self.walk(dependent_id, walk);
            }
        }
    }

    fn is_dynamic_false_positive(&self, edge: &WiringEdge, key: PriorityKey) -> bool {
        if !edge.is_dynamic() || !key.is_library() {
            return false;
        }
        let (Some(family), Some(requirer)) = (self.classifier.family(key), self.snapshot.module(edge.requirer))
        else {
            return false;
        };

        let metadata = &requirer.metadata;
        metadata
            .dynamic_imports
            .iter()
            .any(|token| family.is_overly_broad_wildcard(token))
            && !family.is_mentioned_by(&metadata.static_imports)
    }

    /// Build the keyed set. When several modules share a role, the lowest
    /// identity keeps the role and the others are keyed by identity.
    fn assemble(&self, root: ModuleId, walk: Walk) -> DiscoveredModuleSet {
        let mut entries = BTreeMap::new();
        let mut taken: BTreeSet<PriorityKey> = BTreeSet::new();
        taken.insert(PriorityKey::RootModule);

        for (id, role) in walk.accepted {
            let Some(module) = self.snapshot.module(id) else {
                continue;
            };
            let key = if id == root {
                DiscoveryKey::ROOT
            } else {
                match role {
                    Some(key) if taken.insert(key) => DiscoveryKey::Priority(key),
                    _ => DiscoveryKey::Unclassified(id),
                }
            };
            entries.insert(key, module.clone());
        }

        DiscoveredModuleSet { entries }
    }
}

/// Walk `snapshot` from `root` with `classifier`
pub fn discover(snapshot: &WiringSnapshot, classifier: &Classifier, root: ModuleId) -> DiscoveredModuleSet {
    DependencyWalker::new(snapshot, classifier).discover(root)
}
