//! On-disk configuration.
//!
//! ```toml
//! empty_in = "reject"
//!
//! [[dialects]]
//! match = "cockroach"
//! dialect = "sql-operator"
//! ```
//!
//! Each `[[dialects]]` entry registers an alias adapter ahead of the
//! built-ins, in file order (the last entry ends up first).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::compose::{install_global_filter, EmptyInPolicy, JsonFilter};
use crate::dialect::registry::AliasAdapter;
use crate::dialect::{AdapterRegistry, DialectKind};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonqConfig {
    #[serde(default)]
    pub empty_in: EmptyInPolicy,
    #[serde(default)]
    pub dialects: Vec<DialectAlias>,
}

/// Route connections whose identity contains `fragment` to `dialect`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialectAlias {
    #[serde(rename = "match")]
    pub fragment: String,
    pub dialect: DialectKind,
}

impl JsonqConfig {
    /// Load from the default location, or defaults if the file is missing.
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = Self::from_toml_str(&data)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        info!(path = %path.display(), aliases = config.dialects.len(), "loaded jsonq config");
        Ok(config)
    }

    pub fn from_toml_str(data: &str) -> Result<Self> {
        let config: Self = toml::from_str(data)?;
        if let Some(alias) = config.dialects.iter().find(|a| a.fragment.trim().is_empty()) {
            anyhow::bail!("dialect alias for {} has an empty match", alias.dialect);
        }
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = toml::to_string_pretty(self)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Built-in adapters plus the configured aliases.
    pub fn build_registry(&self) -> AdapterRegistry {
        let mut registry = AdapterRegistry::new();
        for alias in &self.dialects {
            registry.register(Box::new(AliasAdapter::new(
                alias.fragment.trim(),
                alias.dialect,
            )));
        }
        registry
    }

    /// A `JsonFilter` over `build_registry()` with the configured policy.
    pub fn build_filter(&self) -> JsonFilter {
        JsonFilter::with_registry(std::sync::Arc::new(self.build_registry()))
            .with_empty_in(self.empty_in)
    }

    /// Make `build_filter()` the filter behind the `json_*` methods. Returns
    /// `false` if one was already installed or already in use.
    pub fn install_global(&self) -> bool {
        install_global_filter(self.build_filter())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    Ok(config_dir.join("jsonq").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionInfo;

    #[test]
    fn test_empty_config_is_default() {
        let config = JsonqConfig::from_toml_str("").unwrap();
        assert_eq!(config, JsonqConfig::default());
        assert_eq!(config.empty_in, EmptyInPolicy::AlwaysFalse);
    }

    #[test]
    fn test_parse_full_config() {
        let config = JsonqConfig::from_toml_str(
            r#"
            empty_in = "reject"

            [[dialects]]
            match = "cockroach"
            dialect = "sql-operator"

            [[dialects]]
            match = "documentdb"
            dialect = "document"
            "#,
        )
        .unwrap();
        assert_eq!(config.empty_in, EmptyInPolicy::Reject);
        assert_eq!(config.dialects.len(), 2);
        assert_eq!(config.dialects[1].dialect, DialectKind::Document);
    }

    #[test]
    fn test_unknown_dialect_rejected() {
        let result = JsonqConfig::from_toml_str(
            r#"
            [[dialects]]
            match = "x"
            dialect = "sql-magic"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_match_rejected() {
        let result = JsonqConfig::from_toml_str(
            r#"
            [[dialects]]
            match = "  "
            dialect = "generic"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_build_registry_puts_aliases_first() {
        let config = JsonqConfig {
            empty_in: EmptyInPolicy::AlwaysFalse,
            dialects: vec![
                DialectAlias {
                    fragment: "cockroach".into(),
                    dialect: DialectKind::SqlOperator,
                },
                DialectAlias {
                    fragment: "tidb".into(),
                    dialect: DialectKind::SqlFunction,
                },
            ],
        };
        let registry = config.build_registry();
        assert_eq!(
            registry.adapter_names(),
            vec![
                "sql-function:tidb",
                "sql-operator:cockroach",
                "mysql",
                "pgsql",
                "mongodb"
            ]
        );
        assert_eq!(
            registry.select(&ConnectionInfo::new("tidb")).dialect(),
            DialectKind::SqlFunction
        );
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = JsonqConfig {
            empty_in: EmptyInPolicy::Reject,
            dialects: vec![DialectAlias {
                fragment: "cockroach".into(),
                dialect: DialectKind::SqlOperator,
            }],
        };
        config.save_to(&path).unwrap();
        assert_eq!(JsonqConfig::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_install_global_after_first_use_is_refused() {
        crate::compose::global_filter();
        let config = JsonqConfig {
            empty_in: EmptyInPolicy::Reject,
            dialects: Vec::new(),
        };
        assert!(!config.install_global());
    }

    #[test]
    fn test_load_from_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(JsonqConfig::load_from(&dir.path().join("absent.toml")).is_err());
    }
}
