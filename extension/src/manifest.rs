// Extension manifest, the subset the runtime reads.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub version: String,
    /// Seconds until the periodic task first fires.
    #[serde(default = "default_periodic_delay_secs")]
    pub periodic_delay_secs: u64,
    /// Seconds between periodic task fires.
    #[serde(default = "default_periodic_period_secs")]
    pub periodic_period_secs: u64,
}

impl Manifest {
    pub fn load(path: &str) -> Result<Self> {
        let content =
            fs::read_to_string(path).context(format!("Failed to read manifest file: {}", path))?;
        let manifest: Manifest =
            toml::from_str(&content).context("Failed to parse manifest file")?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// The scaffold's built-in identity: one minute to the first
    /// periodic fire, then hourly.
    pub fn builtin() -> Self {
        Self {
            name: "Extension Scaffold".to_string(),
            version: "1.0.0".to_string(),
            periodic_delay_secs: default_periodic_delay_secs(),
            periodic_period_secs: default_periodic_period_secs(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("Manifest name must not be empty");
        }
        if self.version.trim().is_empty() {
            anyhow::bail!("Manifest version must not be empty");
        }
        if self.periodic_period_secs == 0 {
            anyhow::bail!("Periodic period must be at least one second");
        }
        Ok(())
    }
}

fn default_periodic_delay_secs() -> u64 {
    60
}

fn default_periodic_period_secs() -> u64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_parses_with_defaults() {
        let manifest: Manifest = toml::from_str(
            r#"
            name = "Scaffold"
            version = "1.0.0"
            "#,
        )
        .unwrap();
        assert_eq!(manifest.periodic_delay_secs, 60);
        assert_eq!(manifest.periodic_period_secs, 3600);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_manifest_rejects_empty_name() {
        let manifest = Manifest {
            name: "  ".to_string(),
            ..Manifest::builtin()
        };
        assert!(manifest.validate().is_err());
    }
}
