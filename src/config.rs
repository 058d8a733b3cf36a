use crate::error::{AuditError, Result};
use crate::normalize::NullPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything a run needs to know. Passed explicitly into each stage so tests
/// can swap key names or field lists without touching shared state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Canonical join key, after column standardization.
    pub key: String,
    /// Name the CRM extract uses for the join key; renamed to `key` on load.
    pub crm_key_alias: Option<String>,
    /// Fields compared between sources for rows present on both sides, in report order.
    pub critical_fields: Vec<String>,
    /// Fields cleaned down to digits, `.` and `-` and parsed as numbers.
    pub numeric_fields: Vec<String>,
    pub null_policy: NullPolicy,
    pub base_dir: PathBuf,
    /// Relative to `base_dir` unless absolute.
    pub mp_path: PathBuf,
    pub crm_path: PathBuf,
    pub output_dir: PathBuf,
    pub reports: ReportNames,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportNames {
    pub new_records: String,
    pub missing_records: String,
    pub critical_changes: String,
}

impl Default for ReportNames {
    fn default() -> Self {
        Self {
            new_records: "audit_new_records.csv".to_string(),
            missing_records: "audit_missing_records.csv".to_string(),
            critical_changes: "audit_critical_changes.csv".to_string(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            key: "ffm_subscriber_id".to_string(),
            crm_key_alias: Some("mp_id".to_string()),
            critical_fields: vec![
                "plan_hios_id".to_string(),
                "policy_status".to_string(),
                "subsidy".to_string(),
                "net_premium".to_string(),
                "effective_date".to_string(),
            ],
            numeric_fields: vec!["subsidy".to_string(), "net_premium".to_string()],
            null_policy: NullPolicy::default(),
            base_dir: PathBuf::from("."),
            mp_path: PathBuf::from("src/cleaning/mp_clean_file.csv"),
            crm_path: PathBuf::from("src/cleaning/crm_clean_file.csv"),
            output_dir: PathBuf::from("data/audits"),
            reports: ReportNames::default(),
        }
    }
}

impl AuditConfig {
    /// Load overrides from a JSON file. Keys not present keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| AuditError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| AuditError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.key.trim().is_empty() {
            return Err(AuditError::Config("join key must not be empty".to_string()));
        }
        if let Some(field) = self.critical_fields.iter().find(|f| **f == self.key) {
            return Err(AuditError::Config(format!(
                "join key {} cannot also be a critical field",
                field
            )));
        }
        Ok(())
    }

    pub fn is_numeric(&self, column: &str) -> bool {
        self.numeric_fields.iter().any(|f| f == column)
    }

    pub fn mp_input(&self) -> PathBuf {
        self.base_dir.join(&self.mp_path)
    }

    pub fn crm_input(&self) -> PathBuf {
        self.base_dir.join(&self.crm_path)
    }

    pub fn output_path(&self) -> PathBuf {
        self.base_dir.join(&self.output_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths_and_fields() {
        let config = AuditConfig::default();
        assert_eq!(config.key, "ffm_subscriber_id");
        assert_eq!(config.critical_fields.len(), 5);
        assert!(config.is_numeric("subsidy"));
        assert!(!config.is_numeric("policy_status"));
        assert_eq!(
            config.mp_input(),
            PathBuf::from("./src/cleaning/mp_clean_file.csv")
        );
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: AuditConfig =
            serde_json::from_str(r#"{"key": "member_id", "null_policy": "literal_nan"}"#).unwrap();
        assert_eq!(config.key, "member_id");
        assert_eq!(config.null_policy, NullPolicy::LiteralNan);
        assert_eq!(config.reports, ReportNames::default());
        assert_eq!(config.numeric_fields, vec!["subsidy", "net_premium"]);
    }

    #[test]
    fn test_key_cannot_be_critical_field() {
        let config = AuditConfig {
            critical_fields: vec!["ffm_subscriber_id".to_string()],
            ..AuditConfig::default()
        };
        assert!(matches!(config.validate(), Err(AuditError::Config(_))));
    }
}
