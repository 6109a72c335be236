//! Configuration types.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AttendanceError, AttendanceResult};

/// Overrides `data_dir`.
pub const ENV_DATA_DIR: &str = "ATTENDANCE_DATA_DIR";
/// Overrides `default_expected_address`. An empty value clears it.
pub const ENV_DEFAULT_EXPECTED_ADDRESS: &str = "ATTENDANCE_DEFAULT_EXPECTED_ADDRESS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttendanceConfig {
    /// Directory holding both store files.
    pub data_dir: PathBuf,
    /// Tabular store file name, relative to `data_dir`.
    pub tabular_file: String,
    /// Document store file name, relative to `data_dir`.
    pub document_file: String,
    /// Process-wide expected address used when an identity has no entry.
    pub default_expected_address: Option<String>,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            tabular_file: "attendance.csv".to_string(),
            document_file: "attendance.json".to_string(),
            default_expected_address: None,
            log_filter: "attendance=info".to_string(),
        }
    }
}

impl AttendanceConfig {
    /// Load from a TOML file; a missing file yields the defaults.
    pub fn load(path: &Path) -> AttendanceResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            AttendanceError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        Self::from_toml_str(&content).map_err(|e| {
            AttendanceError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    pub fn from_toml_str(content: &str) -> AttendanceResult<Self> {
        toml::from_str(content).map_err(|e| AttendanceError::Config(e.to_string()))
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|d| !d.trim().is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(address) = lookup(ENV_DEFAULT_EXPECTED_ADDRESS) {
            self.default_expected_address = Some(address);
        }
        self
    }

    pub fn tabular_path(&self) -> PathBuf {
        self.data_dir.join(&self.tabular_file)
    }

    pub fn document_path(&self) -> PathBuf {
        self.data_dir.join(&self.document_file)
    }

    /// The default expected address, `None` when unset or blank.
    pub fn default_expected(&self) -> Option<&str> {
        self.default_expected_address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }

    /// Returns warnings for questionable settings and an error for unusable ones.
    pub fn validate(&self) -> AttendanceResult<Vec<String>> {
        if self.tabular_file.trim().is_empty() || self.document_file.trim().is_empty() {
            return Err(AttendanceError::Config(
                "store file names must not be empty".to_string(),
            ));
        }
        if self.tabular_path() == self.document_path() {
            return Err(AttendanceError::Config(
                "tabular and document stores must use different files".to_string(),
            ));
        }

        let mut warnings = Vec::new();
        if self.default_expected().is_none() {
            warnings.push(
                "No default expected address configured; identities without an entry are always Absent"
                    .to_string(),
            );
        }
        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AttendanceConfig::from_toml_str(
            r#"
            data_dir = "/var/lib/attendance"
            default_expected_address = "203.0.113.9"
            "#,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/attendance"));
        assert_eq!(config.tabular_file, "attendance.csv");
        assert_eq!(config.default_expected(), Some("203.0.113.9"));
        assert_eq!(
            config.document_path(),
            PathBuf::from("/var/lib/attendance/attendance.json")
        );
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        assert!(matches!(
            AttendanceConfig::from_toml_str("data_dir = ["),
            Err(AttendanceError::Config(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_DATA_DIR, "/tmp/attendance"),
            (ENV_DEFAULT_EXPECTED_ADDRESS, "  "),
        ]
        .into_iter()
        .collect();
        let config = AttendanceConfig {
            default_expected_address: Some("203.0.113.9".into()),
            ..Default::default()
        }
        .with_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.data_dir, PathBuf::from("/tmp/attendance"));
        // A blank override clears the default.
        assert_eq!(config.default_expected(), None);
    }

    #[test]
    fn test_validate() {
        let warnings = AttendanceConfig::default().validate().unwrap();
        assert_eq!(warnings.len(), 1);

        let clash = AttendanceConfig {
            document_file: "attendance.csv".into(),
            ..Default::default()
        };
        assert!(clash.validate().is_err());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AttendanceConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AttendanceConfig::default());
    }
}
