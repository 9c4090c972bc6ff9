//! Defaults for mark-new-topics operations.
//!
//! Loaded from `~/.config/tabula/mark.toml` when present:
//!
//! ```toml
//! judgment_action = "mass"
//!
//! [service]
//! endpoint = "https://wikidata.reconci.link/en/api"
//! identifier_space = "http://www.wikidata.org/entity/"
//! schema_space = "http://www.wikidata.org/prop/direct/"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tabula_engine::recon::MASS_JUDGMENT_ACTION;
use tabula_engine::ReconConfig;

use crate::error::ReconError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkDefaults {
    /// Provenance tag written on every recon a batch run produces.
    pub judgment_action: String,
    pub service: ServiceDefaults,
}

/// Service descriptor used when the target column has no recon config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceDefaults {
    pub endpoint: Option<String>,
    pub identifier_space: Option<String>,
    pub schema_space: Option<String>,
}

impl Default for MarkDefaults {
    fn default() -> Self {
        Self {
            judgment_action: MASS_JUDGMENT_ACTION.to_string(),
            service: ServiceDefaults::default(),
        }
    }
}

impl MarkDefaults {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let defaults: MarkDefaults =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        defaults.validate()?;
        Ok(defaults)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.judgment_action.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "judgment_action must not be empty".into(),
            ));
        }
        for (field, value) in [
            ("service.endpoint", &self.service.endpoint),
            ("service.identifier_space", &self.service.identifier_space),
            ("service.schema_space", &self.service.schema_space),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(ReconError::ConfigValidation(format!(
                    "{field} must be omitted or non-empty"
                )));
            }
        }
        Ok(())
    }

    /// Default config file location.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tabula").join("mark.toml"))
    }

    /// Load from `path`, falling back to defaults if the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ReconError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load from the default location.
    pub fn load() -> Result<Self, ReconError> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn recon_config(&self) -> ReconConfig {
        ReconConfig::standard(
            self.service.endpoint.clone(),
            self.service.identifier_space.clone(),
            self.service.schema_space.clone(),
        )
    }
}
