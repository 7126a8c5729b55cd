use anyhow::{Context, Result};
use route_compiler_core::{policy::PolicySnapshot, registry::RegistrySnapshot, rule::RuleSet};
use serde::Deserialize;
use std::path::Path;

/// Everything a compilation reads: the authored rule sets plus the registry
/// and destination policies they are resolved against.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub rule_sets: Vec<RuleSet>,
    #[serde(default)]
    pub services: RegistrySnapshot,
    #[serde(default)]
    pub policies: PolicySnapshot,
}

impl Snapshot {
    /// Reads a snapshot from a `.json` file, or from YAML otherwise.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let is_json = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
        let snapshot = if is_json {
            serde_json::from_str(&contents).map_err(anyhow::Error::from)
        } else {
            Self::from_yaml(&contents)
        };
        snapshot.with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        serde_yaml::from_str(contents).map_err(Into::into)
    }
}
