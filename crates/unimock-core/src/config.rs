//! Configuration loading for Unimock
//!
//! The configuration file is a YAML mapping with two top-level keys:
//! `sections` (URL families with ID-extraction policy) and `scenarios`
//! (canned responses loaded at startup). A second, scenarios-only file may
//! supply additional scenarios as a bare list.
//!
//! Scenario `data` values beginning with `@`, `< `, or `<@ ` reference
//! fixture files resolved relative to the configuration file's directory.
//! Absolute paths and `..` traversal are rejected at load time; a reference
//! to a missing file falls back to the literal string with a warning.

use crate::scenario::Scenario;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Component, Path};
use tokio::fs;

/// Configuration for one section (a URL family)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionConfig {
    /// Path pattern claiming requests for this section
    pub path_pattern: String,
    /// Body-path expressions evaluated against structured request bodies
    #[serde(default)]
    pub body_id_paths: Vec<String>,
    /// Header names whose first non-empty value becomes an external ID
    #[serde(default)]
    pub header_id_names: Vec<String>,
    /// Compare literal pattern segments case-sensitively
    #[serde(default)]
    pub case_sensitive: bool,
    /// Reserved; parsed and stored but not enforced
    #[serde(default)]
    pub strict_path: bool,
    /// Echo the stored body in the POST response
    #[serde(default)]
    pub return_body: bool,
}

/// One scenario entry as it appears in configuration files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Scenario key; minted when absent
    #[serde(default)]
    pub uuid: Option<String>,
    /// HTTP method the scenario responds to
    pub method: String,
    /// Path glob the scenario responds to
    pub path: String,
    /// Response status code
    pub status_code: u16,
    /// Response content type
    #[serde(default)]
    pub content_type: Option<String>,
    /// Optional Location header value
    #[serde(default)]
    pub location: Option<String>,
    /// Optional extra response headers
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Response body, inline or as a fixture reference
    #[serde(default)]
    pub data: String,
}

impl ScenarioConfig {
    /// Convert into the runtime scenario shape (`"METHOD /path"` key form).
    pub fn into_scenario(self) -> Scenario {
        Scenario {
            uuid: self.uuid,
            request_path: format!("{} {}", self.method, self.path),
            status_code: self.status_code,
            content_type: self.content_type,
            location: self.location,
            headers: self.headers,
            data: self.data,
        }
    }
}

/// Top-level configuration file shape
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnimockConfig {
    /// Section name to section definition
    #[serde(default)]
    pub sections: HashMap<String, SectionConfig>,
    /// Scenarios installed at startup
    #[serde(default)]
    pub scenarios: Vec<ScenarioConfig>,
}

/// Load the main configuration file, resolving scenario fixture references
/// relative to the file's directory.
pub async fn load_config(path: &Path) -> Result<UnimockConfig> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| Error::config(format!("failed to read {}: {e}", path.display())))?;
    let mut config: UnimockConfig = serde_yaml::from_str(&content)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    for scenario in &mut config.scenarios {
        scenario.data = resolve_data_reference(base_dir, &scenario.data).await?;
    }
    tracing::info!(
        sections = config.sections.len(),
        scenarios = config.scenarios.len(),
        "loaded configuration from {}",
        path.display()
    );
    Ok(config)
}

/// Load a scenarios-only file: a bare YAML list of scenario entries.
pub async fn load_scenarios_file(path: &Path) -> Result<Vec<ScenarioConfig>> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| Error::config(format!("failed to read {}: {e}", path.display())))?;
    let mut scenarios: Vec<ScenarioConfig> = serde_yaml::from_str(&content)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    for scenario in &mut scenarios {
        scenario.data = resolve_data_reference(base_dir, &scenario.data).await?;
    }
    Ok(scenarios)
}

/// Resolve a scenario `data` value. Fixture references (`@path`, `< path`,
/// `<@ path`) are read from disk; everything else passes through verbatim.
async fn resolve_data_reference(base_dir: &Path, data: &str) -> Result<String> {
    let reference = if let Some(rest) = data.strip_prefix("<@ ") {
        rest
    } else if let Some(rest) = data.strip_prefix("< ") {
        rest
    } else if let Some(rest) = data.strip_prefix('@') {
        rest
    } else {
        return Ok(data.to_string());
    };

    let candidate = Path::new(reference.trim());
    if candidate.is_absolute() {
        return Err(Error::config(format!(
            "fixture reference '{reference}' must be relative to the config directory"
        )));
    }
    if candidate.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(Error::config(format!(
            "fixture reference '{reference}' must not traverse outside the config directory"
        )));
    }

    match fs::read_to_string(base_dir.join(candidate)).await {
        Ok(content) => Ok(content),
        Err(e) => {
            tracing::warn!(
                "fixture '{}' could not be read ({e}); using the literal reference",
                candidate.display()
            );
            Ok(data.to_string())
        }
    }
}
