// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Analyzer configuration

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// Where a field's own key segment comes from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeySource {
    /// The declared field name
    #[default]
    Name,
    /// An alternate-name tag such as `json`, falling back to the name
    Tag(String),
}

/// Field key policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyConfig {
    /// Source of a field's own key segment
    pub source: KeySource,
    /// Prefix nested keys with their ancestors' keys
    pub join: bool,
    /// Separator between joined segments
    pub separator: char,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            source: KeySource::Name,
            join: true,
            separator: '.',
        }
    }
}

impl KeyConfig {
    /// Take key segments from the `tag` alternate-name tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.source = KeySource::Tag(tag.into());
        self
    }

    /// Enable or disable joining with ancestor keys
    pub fn with_join(mut self, join: bool) -> Self {
        self.join = join;
        self
    }

    /// Set the join separator
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }
}

/// Configuration options for the analyzer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Field key policy
    pub keys: KeyConfig,
    /// Reserved name of the context field, matched case-insensitively
    pub context_field_name: String,
    /// Insert `isvalid` for self-validating types
    pub auto_isvalid: bool,
    /// Stop a batch at the first failing record
    pub fail_fast_batch: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            keys: KeyConfig::default(),
            context_field_name: "context".to_string(),
            auto_isvalid: true,
            fail_fast_batch: false,
        }
    }
}

impl AnalyzerConfig {
    /// Load a configuration from JSON; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AnalyzerConfig =
            serde_json::from_str(json).map_err(|e| AnalysisError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the key policy
    pub fn with_keys(mut self, keys: KeyConfig) -> Self {
        self.keys = keys;
        self
    }

    /// Set the reserved context field name
    pub fn with_context_field_name(mut self, name: impl Into<String>) -> Self {
        self.context_field_name = name.into();
        self
    }

    /// Enable or disable automatic `isvalid` insertion
    pub fn with_auto_isvalid(mut self, enabled: bool) -> Self {
        self.auto_isvalid = enabled;
        self
    }

    /// Enable or disable fail-fast batches
    pub fn with_fail_fast_batch(mut self, enabled: bool) -> Self {
        self.fail_fast_batch = enabled;
        self
    }

    /// Check the configuration for unusable values
    pub fn validate(&self) -> Result<()> {
        if self.context_field_name.trim().is_empty() {
            return Err(AnalysisError::config("context_field_name must not be empty"));
        }
        if self.keys.separator.is_alphanumeric() || self.keys.separator.is_whitespace() {
            return Err(AnalysisError::config(format!(
                "key separator '{}' must be a punctuation character",
                self.keys.separator
            )));
        }
        if let KeySource::Tag(tag) = &self.keys.source {
            if tag.is_empty() {
                return Err(AnalysisError::config("key source tag must not be empty"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.keys.source, KeySource::Name);
        assert!(config.keys.join);
        assert_eq!(config.keys.separator, '.');
        assert_eq!(config.context_field_name, "context");
        assert!(config.auto_isvalid);
        assert!(!config.fail_fast_batch);
    }

    #[test]
    fn test_from_json() {
        let config = AnalyzerConfig::from_json_str(
            r#"{"keys": {"source": {"tag": "json"}, "separator": "/"}, "fail_fast_batch": true}"#,
        )
        .unwrap();
        assert_eq!(config.keys.source, KeySource::Tag("json".to_string()));
        assert_eq!(config.keys.separator, '/');
        assert!(config.keys.join);
        assert!(config.fail_fast_batch);
        assert_eq!(config.context_field_name, "context");

        let empty = AnalyzerConfig::from_json_str("{}").unwrap();
        assert_eq!(empty, AnalyzerConfig::default());
    }

    #[test]
    fn test_invalid_json() {
        let err = AnalyzerConfig::from_json_str(r#"{"auto_isvalid": "yes"}"#).unwrap_err();
        assert!(matches!(err, AnalysisError::Config { .. }));

        let err = AnalyzerConfig::from_json_str(r#"{"context_field_name": " "}"#).unwrap_err();
        assert!(matches!(err, AnalysisError::Config { .. }));

        let err = AnalyzerConfig::from_json_str(r#"{"keys": {"separator": "x"}}"#).unwrap_err();
        assert!(matches!(err, AnalysisError::Config { .. }));
    }

    #[test]
    fn test_builders() {
        let config = AnalyzerConfig::default()
            .with_keys(KeyConfig::default().with_tag("json").with_join(false))
            .with_context_field_name("ctx")
            .with_auto_isvalid(false);
        assert_eq!(config.keys.source, KeySource::Tag("json".to_string()));
        assert!(!config.keys.join);
        assert_eq!(config.context_field_name, "ctx");
        assert!(!config.auto_isvalid);
        assert!(config.validate().is_ok());
    }
}
