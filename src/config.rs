use crate::error::{AnalyticsError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_FETCH_BATCH_DAYS: u32 = 30;

/// Engine-wide settings that do not change per request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Width, in days, of each date window requested from the data source.
    pub fetch_batch_days: u32,

    /// Branch codes that never show up as selectable branches (e.g. the consolidation code).
    pub excluded_branch_codes: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fetch_batch_days: DEFAULT_FETCH_BATCH_DAYS,
            excluded_branch_codes: vec!["99".to_string()],
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch_batch_days == 0 {
            return Err(AnalyticsError::ConfigError(
                "fetch_batch_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = EngineConfig::from_json_str(r#"{"fetch_batch_days": 7}"#).unwrap();
        assert_eq!(config.fetch_batch_days, 7);
        assert_eq!(config.excluded_branch_codes, vec!["99".to_string()]);

        let empty = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(empty, EngineConfig::default());
    }

    #[test]
    fn test_zero_batch_rejected() {
        let result = EngineConfig::from_json_str(r#"{"fetch_batch_days": 0}"#);
        assert!(matches!(result, Err(AnalyticsError::ConfigError(_))));
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        let result = EngineConfig::from_json_str("{not json");
        assert!(matches!(result, Err(AnalyticsError::SerializationError(_))));
    }

    #[test]
    fn test_from_path_reads_json_file() {
        let path = std::env::temp_dir().join(format!("engine-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"excluded_branch_codes": ["98", "99"]}"#).unwrap();

        let config = EngineConfig::from_path(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.fetch_batch_days, DEFAULT_FETCH_BATCH_DAYS);
        assert_eq!(config.excluded_branch_codes.len(), 2);

        let missing = EngineConfig::from_path(&path);
        assert!(matches!(missing, Err(AnalyticsError::IoError(_))));
    }
}
