//! Shell configuration
//!
//! Settings come from an optional TOML file and are then overridden by
//! command-line flags:
//!
//! ```toml
//! file = "people.bin"
//! unit = "years"
//! log_level = "debug"
//!
//! [store]
//! policy = "tombstone_on_delete"
//! capacity = 11
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use recfile_engine::StoreOptions;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShellConfig {
    /// Record file to open or create
    pub file: PathBuf,
    pub store: StoreOptions,
    /// Word printed after each record's attribute
    pub unit: String,
    pub log_level: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        ShellConfig {
            file: PathBuf::from("data.bin"),
            store: StoreOptions::default(),
            unit: "years".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl ShellConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recfile_engine::CompactionPolicy;

    #[test]
    fn test_defaults() {
        let config = ShellConfig::parse("").unwrap();
        assert_eq!(config, ShellConfig::default());
        assert_eq!(config.store.policy, CompactionPolicy::ShiftOnDelete);
        assert_eq!(config.store.capacity, 11);
    }

    #[test]
    fn test_full_file() {
        let config = ShellConfig::parse(
            r#"
            file = "people.bin"
            unit = "anos"

            [store]
            policy = "tombstone_on_delete"
            capacity = 13
            "#,
        )
        .unwrap();
        assert_eq!(config.file, PathBuf::from("people.bin"));
        assert_eq!(config.unit, "anos");
        assert_eq!(config.store.policy, CompactionPolicy::TombstoneOnDelete);
        assert_eq!(config.store.capacity, 13);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_rejects_unknown_keys() {
        assert!(ShellConfig::parse("cache_size = 10").is_err());
        assert!(ShellConfig::parse("[store]\npolicy = \"compact\"").is_err());
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recfile.toml");
        fs::write(&path, "unit = \"kg\"\n").unwrap();
        assert_eq!(ShellConfig::load(&path).unwrap().unit, "kg");
        assert!(ShellConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}
