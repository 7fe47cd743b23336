//! Output pattern configuration

use serde::{Deserialize, Serialize};

/// Regular expressions that override the exit code
///
/// Empty strings are treated the same as absent patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    pub success_pattern: Option<String>,
    pub failure_pattern: Option<String>,
    pub case_insensitive: bool,
}

impl PatternConfig {
    pub fn success(pattern: impl Into<String>) -> Self {
        Self { success_pattern: Some(pattern.into()), ..Default::default() }
    }

    pub fn failure(pattern: impl Into<String>) -> Self {
        Self { failure_pattern: Some(pattern.into()), ..Default::default() }
    }

    pub fn with_success(mut self, pattern: impl Into<String>) -> Self {
        self.success_pattern = Some(pattern.into());
        self
    }

    pub fn with_failure(mut self, pattern: impl Into<String>) -> Self {
        self.failure_pattern = Some(pattern.into());
        self
    }

    pub fn case_insensitive(mut self, enabled: bool) -> Self {
        self.case_insensitive = enabled;
        self
    }

    /// The success pattern, if set and non-empty
    pub fn success_pattern(&self) -> Option<&str> {
        self.success_pattern.as_deref().filter(|p| !p.is_empty())
    }

    /// The failure pattern, if set and non-empty
    pub fn failure_pattern(&self) -> Option<&str> {
        self.failure_pattern.as_deref().filter(|p| !p.is_empty())
    }

    /// Whether any non-empty pattern is configured
    pub fn is_empty(&self) -> bool {
        self.success_pattern().is_none() && self.failure_pattern().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_strings_are_absent() {
        let config = PatternConfig {
            success_pattern: Some(String::new()),
            failure_pattern: Some("ERROR".into()),
            case_insensitive: false,
        };

        assert_eq!(config.success_pattern(), None);
        assert_eq!(config.failure_pattern(), Some("ERROR"));
        assert!(!config.is_empty());
        assert!(PatternConfig::success("").is_empty());
    }

    #[test]
    fn test_builder() {
        let config = PatternConfig::success("ok").with_failure("fail").case_insensitive(true);
        assert_eq!(config.success_pattern(), Some("ok"));
        assert_eq!(config.failure_pattern(), Some("fail"));
        assert!(config.case_insensitive);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: PatternConfig =
            serde_json::from_str(r#"{"failure_pattern": "panic"}"#).unwrap();
        assert_eq!(config.failure_pattern(), Some("panic"));
        assert!(!config.case_insensitive);
    }
}
