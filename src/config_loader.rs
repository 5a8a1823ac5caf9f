use crate::context::DEFAULT_ROOT_CONTEXT_ATTRIBUTE;
use crate::environment::DEFAULT_WEAVER_IDENTIFIER;
use crate::errors::{FacesError, FacesResult};
use crate::priority::{default_families, Classifier, FamilyPattern, PriorityKey};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Default configuration file, read from the working directory when present
pub const DEFAULT_CONFIG_FILE: &str = "faces-util.toml";

/// Settings for discovery and lookup resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_root_context_attribute")]
    pub root_context_attribute: String,
    #[serde(default = "default_weaver_identifier")]
    pub weaver_identifier: String,
    /// Directory searched for configuration documents in every module
    #[serde(default = "default_config_document_dir")]
    pub config_document_dir: String,
    #[serde(default = "default_faces_config_suffix")]
    pub faces_config_suffix: String,
    #[serde(default = "default_taglib_suffix")]
    pub taglib_suffix: String,
    #[serde(default = "default_web_classes_prefix")]
    pub web_classes_prefix: String,
    #[serde(default = "default_families")]
    pub families: Vec<FamilyPattern>,
}

fn default_root_context_attribute() -> String {
    DEFAULT_ROOT_CONTEXT_ATTRIBUTE.to_string()
}

fn default_weaver_identifier() -> String {
    DEFAULT_WEAVER_IDENTIFIER.to_string()
}

fn default_config_document_dir() -> String {
    "META-INF/".to_string()
}

fn default_faces_config_suffix() -> String {
    "faces-config.xml".to_string()
}

fn default_taglib_suffix() -> String {
    ".taglib.xml".to_string()
}

fn default_web_classes_prefix() -> String {
    "WEB-INF/classes/".to_string()
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            root_context_attribute: default_root_context_attribute(),
            weaver_identifier: default_weaver_identifier(),
            config_document_dir: default_config_document_dir(),
            faces_config_suffix: default_faces_config_suffix(),
            taglib_suffix: default_taglib_suffix(),
            web_classes_prefix: default_web_classes_prefix(),
            families: default_families(),
        }
    }
}

impl ResolverConfig {
    pub fn validate(&self) -> FacesResult<()> {
        if self.root_context_attribute.trim().is_empty() {
            return Err(FacesError::config("root_context_attribute must be set"));
        }
        if self.faces_config_suffix.trim().is_empty() || self.taglib_suffix.trim().is_empty() {
            return Err(FacesError::config("configuration document suffixes must be set"));
        }

        let mut seen = HashSet::new();
        for family in &self.families {
            if family.key == PriorityKey::RootModule {
                return Err(FacesError::config("root_module cannot be matched by identifier"));
            }
            if family.identifier.trim().is_empty() || family.package.trim().is_empty() {
                return Err(FacesError::config(format!(
                    "family {} needs an identifier and a package",
                    family.key
                )));
            }
            if !seen.insert(family.key) {
                return Err(FacesError::config(format!("family {} declared twice", family.key)));
            }
        }
        Ok(())
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::new(self.families.clone())
    }
}

/// Layer defaults, the TOML file and `FACES_` environment variables
pub fn load_config(path: Option<&Path>) -> FacesResult<ResolverConfig> {
    let file = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    let figment = Figment::from(Serialized::defaults(ResolverConfig::default()))
        .merge(Toml::file(file))
        .merge(Env::prefixed("FACES_").split("__"));

    let config: ResolverConfig = figment.extract()?;
    config.validate()?;
    Ok(config)
}
