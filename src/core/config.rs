//! Engine configuration
//!
//! Configuration can be built in code or loaded from TOML:
//!
//! ```toml
//! operator_precedence = "custom_wins"
//! pattern_cache_capacity = 4096
//! ```

use crate::core::error::{PbacError, Result};
use crate::core::iam::{CustomPredicate, Value, DEFAULT_PATTERN_CACHE_CAPACITY};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Which operator wins when a custom operator reuses a built-in name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorPrecedence {
    /// Built-in semantics cannot be replaced; colliding custom operators are ignored
    #[default]
    BuiltinsWin,
    /// A custom operator replaces the built-in of the same name
    CustomWins,
}

/// Tunable engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Override rule for custom condition operators
    pub operator_precedence: OperatorPrecedence,

    /// Number of compiled wildcard patterns kept in the LRU cache
    pub pattern_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            operator_precedence: OperatorPrecedence::default(),
            pattern_cache_capacity: DEFAULT_PATTERN_CACHE_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML configuration
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| PbacError::InvalidConfig(e.to_string()))
    }

    /// Validate all fields
    pub fn validate(&self) -> Result<()> {
        if self.pattern_cache_capacity == 0 {
            return Err(PbacError::InvalidConfig(
                "pattern_cache_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Construction options for a [`PolicyEngine`](crate::PolicyEngine)
///
/// # Examples
///
/// ```
/// use pbac::{EngineOptions, PolicyEngine};
///
/// let options = EngineOptions::new()
///     .with_condition("EqualsFoo", |actual, expected| {
///         expected.as_bool() == Some(true) && actual.and_then(|a| a.as_str()) == Some("foo")
///     });
/// let engine = PolicyEngine::with_options(Vec::new(), options);
/// assert!(engine.registry().contains("ForAnyValue:EqualsFoo"));
/// ```
#[derive(Clone, Default)]
pub struct EngineOptions {
    pub config: EngineConfig,
    pub(crate) conditions: Vec<(String, CustomPredicate)>,
}

impl EngineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the engine configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the override rule for custom operators
    pub fn with_precedence(mut self, precedence: OperatorPrecedence) -> Self {
        self.config.operator_precedence = precedence;
        self
    }

    /// Register a custom condition operator
    ///
    /// The operator also gains `IfExists`, `ForAllValues:` and `ForAnyValue:`
    /// variants.
    pub fn with_condition<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(Option<&Value>, &Value) -> bool + Send + Sync + 'static,
    {
        self.conditions.push((name.into(), Arc::new(predicate)));
        self
    }

    /// Names of the custom operators registered so far
    pub fn condition_names(&self) -> impl Iterator<Item = &str> {
        self.conditions.iter().map(|(name, _)| name.as_str())
    }
}

impl fmt::Debug for EngineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineOptions")
            .field("config", &self.config)
            .field("conditions", &self.condition_names().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.operator_precedence, OperatorPrecedence::BuiltinsWin);
        assert_eq!(config.pattern_cache_capacity, DEFAULT_PATTERN_CACHE_CAPACITY);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
            operator_precedence = "custom_wins"
            pattern_cache_capacity = 16
            "#,
        )
        .unwrap();
        assert_eq!(config.operator_precedence, OperatorPrecedence::CustomWins);
        assert_eq!(config.pattern_cache_capacity, 16);
    }

    #[test]
    fn test_from_toml_partial() {
        let config = EngineConfig::from_toml_str("pattern_cache_capacity = 8").unwrap();
        assert_eq!(config.operator_precedence, OperatorPrecedence::BuiltinsWin);
    }

    #[test]
    fn test_from_toml_rejects_zero_capacity() {
        let err = EngineConfig::from_toml_str("pattern_cache_capacity = 0").unwrap_err();
        assert!(matches!(err, PbacError::InvalidConfig(_)));
    }

    #[test]
    fn test_from_toml_rejects_unknown_precedence() {
        let err = EngineConfig::from_toml_str(r#"operator_precedence = "sometimes""#).unwrap_err();
        assert!(matches!(err, PbacError::Config(_)));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = EngineConfig {
            operator_precedence: OperatorPrecedence::CustomWins,
            pattern_cache_capacity: 42,
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(EngineConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_options_builder() {
        let options = EngineOptions::new()
            .with_precedence(OperatorPrecedence::CustomWins)
            .with_condition("AlwaysTrue", |_, _| true);
        assert_eq!(options.config.operator_precedence, OperatorPrecedence::CustomWins);
        assert_eq!(options.condition_names().collect::<Vec<_>>(), vec!["AlwaysTrue"]);
    }
}
