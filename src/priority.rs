//! Priority classification of discovered modules.
//!
//! A discovered module is keyed either by a well-known role (`PriorityKey`)
//! or, when its identifier matches no known family, by its raw identity.
//! `DiscoveryKey` orders all roles first, in declaration order, followed by
//! unclassified modules in identity order.

use crate::module_graph::ModuleId;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Well-known roles, declared in their fixed priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityKey {
    RootModule,
    FrameworkRuntime,
    UtilityLibrary,
    ExtensionLibraryA,
    BridgeApi,
    BridgeImpl,
    BridgeExt,
    ThemeLibraryA,
    ThemeLibraryB,
    ThemeLibraryC,
}

impl PriorityKey {
    pub const ALL: [PriorityKey; 10] = [
        PriorityKey::RootModule,
        PriorityKey::FrameworkRuntime,
        PriorityKey::UtilityLibrary,
        PriorityKey::ExtensionLibraryA,
        PriorityKey::BridgeApi,
        PriorityKey::BridgeImpl,
        PriorityKey::BridgeExt,
        PriorityKey::ThemeLibraryA,
        PriorityKey::ThemeLibraryB,
        PriorityKey::ThemeLibraryC,
    ];

    /// Roles subject to the dynamic-import false-positive filter
    pub fn is_library(&self) -> bool {
        !matches!(self, PriorityKey::RootModule | PriorityKey::FrameworkRuntime)
    }

    /// Companions pulled in through reverse dependencies of the bridge API
    pub fn is_bridge_companion(&self) -> bool {
        matches!(self, PriorityKey::BridgeImpl | PriorityKey::BridgeExt)
    }
}

impl fmt::Display for PriorityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PriorityKey::RootModule => "RootModule",
            PriorityKey::FrameworkRuntime => "FrameworkRuntime",
            PriorityKey::UtilityLibrary => "UtilityLibrary",
            PriorityKey::ExtensionLibraryA => "ExtensionLibraryA",
            PriorityKey::BridgeApi => "BridgeAPI",
            PriorityKey::BridgeImpl => "BridgeImpl",
            PriorityKey::BridgeExt => "BridgeExt",
            PriorityKey::ThemeLibraryA => "ThemeLibraryA",
            PriorityKey::ThemeLibraryB => "ThemeLibraryB",
            PriorityKey::ThemeLibraryC => "ThemeLibraryC",
        };
        f.write_str(name)
    }
}

/// Key of an entry in a discovered module set
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiscoveryKey {
    Priority(PriorityKey),
    Unclassified(ModuleId),
}

impl DiscoveryKey {
    pub const ROOT: DiscoveryKey = DiscoveryKey::Priority(PriorityKey::RootModule);

    pub fn is_root(&self) -> bool {
        *self == Self::ROOT
    }

    pub fn priority(&self) -> Option<PriorityKey> {
        match self {
            DiscoveryKey::Priority(key) => Some(*key),
            DiscoveryKey::Unclassified(_) => None,
        }
    }
}

impl From<PriorityKey> for DiscoveryKey {
    fn from(key: PriorityKey) -> Self {
        DiscoveryKey::Priority(key)
    }
}

impl fmt::Display for DiscoveryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryKey::Priority(key) => write!(f, "{key}"),
            DiscoveryKey::Unclassified(id) => write!(f, "module#{id}"),
        }
    }
}

/// How a module identifier is compared against a family identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FamilyMatch {
    Exact,
    Prefix,
    Suffix,
}

/// One row of the family-identifier contract table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyPattern {
    pub key: PriorityKey,
    #[serde(rename = "match")]
    pub matching: FamilyMatch,
    pub identifier: String,
    /// Namespace prefix of the types and resources the family packages
    pub package: String,
}

impl FamilyPattern {
    pub fn new(key: PriorityKey, matching: FamilyMatch, identifier: &str, package: &str) -> Self {
        Self {
            key,
            matching,
            identifier: identifier.to_string(),
            package: package.to_string(),
        }
    }

    pub fn matches_identifier(&self, identifier: &str) -> bool {
        match self.matching {
            FamilyMatch::Exact => identifier == self.identifier,
            FamilyMatch::Prefix => identifier.starts_with(&self.identifier),
            FamilyMatch::Suffix => identifier.ends_with(&self.identifier),
        }
    }

    /// True when `name` is `package` itself or lives below it
    pub fn covers_namespace(&self, name: &str) -> bool {
        name == self.package
            || (name.starts_with(&self.package) && name[self.package.len()..].starts_with('.'))
    }

    /// `*` and every `S.*` where `S` is a strict dot-segment prefix of the
    /// package. `package.*` names the family itself and is not broad.
    pub fn is_overly_broad_wildcard(&self, token: &str) -> bool {
        if token == "*" {
            return true;
        }
        let Some(stem) = token.strip_suffix(".*") else {
            return false;
        };
        if stem.is_empty() || stem.len() >= self.package.len() {
            return false;
        }
        self.package.starts_with(stem) && self.package[stem.len()..].starts_with('.')
    }

    /// True when any static import token names the family's namespace
    pub fn is_mentioned_by<S: AsRef<str>>(&self, static_imports: &[S]) -> bool {
        static_imports
            .iter()
            .any(|token| self.covers_namespace(token.as_ref().trim_end_matches(".*")))
    }

    fn resource_prefix(&self) -> String {
        format!("{}/", self.package.replace('.', "/"))
    }
}

/// The built-in family table, in classification order
pub fn default_families() -> Vec<FamilyPattern> {
    use FamilyMatch::Exact;
    use PriorityKey::*;
    vec![
        FamilyPattern::new(FrameworkRuntime, Exact, "org.glassfish.javax.faces", "javax.faces"),
        FamilyPattern::new(UtilityLibrary, Exact, "com.liferay.faces.util", "com.liferay.faces.util"),
        FamilyPattern::new(ExtensionLibraryA, Exact, "org.primefaces", "org.primefaces"),
        FamilyPattern::new(BridgeApi, Exact, "com.liferay.faces.bridge.api", "javax.portlet.faces"),
        FamilyPattern::new(BridgeImpl, Exact, "com.liferay.faces.bridge.impl", "com.liferay.faces.bridge"),
        FamilyPattern::new(BridgeExt, Exact, "com.liferay.faces.bridge.ext", "com.liferay.faces.bridge.ext"),
        FamilyPattern::new(ThemeLibraryA, Exact, "com.liferay.faces.clay", "com.liferay.faces.clay"),
        FamilyPattern::new(ThemeLibraryB, Exact, "com.liferay.faces.portal", "com.liferay.faces.portal"),
        FamilyPattern::new(ThemeLibraryC, Exact, "com.liferay.faces.alloy", "com.liferay.faces.alloy"),
    ]
}

/// Type namespaces routed to a role without being one of its family
/// packages: runtime implementation types and the bridge's portlet helpers
const EXTRA_TYPE_ROUTES: [(&str, PriorityKey); 2] = [
    ("com.sun.faces", PriorityKey::FrameworkRuntime),
    ("com.liferay.faces.portlet", PriorityKey::BridgeImpl),
];

fn under_namespace(name: &str, namespace: &str) -> bool {
    name.len() > namespace.len() && name.starts_with(namespace) && name[namespace.len()..].starts_with('.')
}

lazy_static! {
    static ref DEFAULT_CLASSIFIER: Classifier = Classifier::new(default_families());
}

/// Maps module identifiers, type names and resource paths onto roles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    families: Vec<FamilyPattern>,
}

impl Default for Classifier {
    fn default() -> Self {
        DEFAULT_CLASSIFIER.clone()
    }
}

impl Classifier {
    pub fn new(families: Vec<FamilyPattern>) -> Self {
        Self { families }
    }

    /// Process-wide classifier built from the built-in table
    pub fn builtin() -> &'static Classifier {
        &DEFAULT_CLASSIFIER
    }

    pub fn families(&self) -> &[FamilyPattern] {
        &self.families
    }

    pub fn family(&self, key: PriorityKey) -> Option<&FamilyPattern> {
        self.families.iter().find(|family| family.key == key)
    }

    /// First family in table order whose identifier pattern matches
    pub fn classify(&self, identifier: &str) -> Option<PriorityKey> {
        self.families
            .iter()
            .find(|family| family.matches_identifier(identifier))
            .map(|family| family.key)
    }

    /// Family owning a qualified type name; the longest package prefix wins
    pub fn key_for_type_name(&self, type_name: &str) -> Option<PriorityKey> {
        self.families
            .iter()
            .filter(|family| under_namespace(type_name, &family.package))
            .max_by_key(|family| family.package.len())
            .map(|family| family.key)
    }

    /// Roles whose modules are tried first for `type_name`, in order.
    ///
    /// Bridge types outside an `.internal.` package are usually public API,
    /// so the API module is asked before the implementation module.
    pub fn type_candidates(&self, type_name: &str) -> Vec<PriorityKey> {
        let key = self.key_for_type_name(type_name).or_else(|| {
            EXTRA_TYPE_ROUTES
                .iter()
                .find(|(namespace, _)| under_namespace(type_name, namespace))
                .map(|(_, key)| *key)
        });

        match key {
            Some(PriorityKey::BridgeImpl) if !type_name.contains(".internal.") => {
                vec![PriorityKey::BridgeApi, PriorityKey::BridgeImpl]
            }
            Some(key) => vec![key],
            None => Vec::new(),
        }
    }

    /// Family owning a resource path, compared in `/` form
    pub fn key_for_resource_path(&self, path: &str) -> Option<PriorityKey> {
        let path = path.trim_start_matches('/');
        self.families
            .iter()
            .filter(|family| path.starts_with(&family.resource_prefix()))
            .max_by_key(|family| family.package.len())
            .map(|family| family.key)
    }
}
