use crate::{CoreError, CoreResult};
use cypher_query_builder::Settings;
use serde::Deserialize;

/// Translator configuration, usually deserialized from the host's JSON settings.
/// Every key is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct TranslatorConfig {
    /// String values in `@auth` templates starting with this prefix reference claims.
    pub claim_prefix: String,
    /// Enables the `_MATCHES` comparator.
    pub enable_regex: bool,
    pub default_limit: Option<i64>,
    pub max_limit: Option<i64>,
    /// Procedure aborting the transaction when its first argument is true.
    pub validate_procedure: String,
    pub cursor_prefix: String,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        let settings = Settings::default();

        Self {
            claim_prefix: settings.claim_prefix,
            enable_regex: settings.enable_regex,
            default_limit: settings.default_limit,
            max_limit: settings.max_limit,
            validate_procedure: settings.validate_procedure,
            cursor_prefix: settings.cursor_prefix,
        }
    }
}

impl TranslatorConfig {
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|err| CoreError::schema("config", err.to_string()))?;
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CoreResult<()> {
        for (key, limit) in [("defaultLimit", self.default_limit), ("maxLimit", self.max_limit)] {
            if limit.is_some_and(|limit| limit < 1) {
                return Err(CoreError::schema(format!("config.{key}"), "must be a positive integer"));
            }
        }

        if self.validate_procedure.is_empty() {
            return Err(CoreError::schema("config.validateProcedure", "must not be empty"));
        }

        Ok(())
    }
}

impl From<TranslatorConfig> for Settings {
    fn from(config: TranslatorConfig) -> Self {
        Settings {
            claim_prefix: config.claim_prefix,
            enable_regex: config.enable_regex,
            default_limit: config.default_limit,
            max_limit: config.max_limit,
            validate_procedure: config.validate_procedure,
            cursor_prefix: config.cursor_prefix,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_keys_take_defaults() {
        let config = TranslatorConfig::from_json(r#"{ "maxLimit": 100, "enableRegex": true }"#).unwrap();

        assert_eq!(config.claim_prefix, "$jwt.");
        assert_eq!(config.cursor_prefix, "arrayconnection:");
        assert_eq!(config.max_limit, Some(100));
        assert!(config.enable_regex);
        assert_eq!(Settings::from(TranslatorConfig::default()), Settings::default());
    }

    #[test]
    fn limits_must_be_positive() {
        let err = TranslatorConfig::from_json(r#"{ "defaultLimit": 0 }"#).unwrap_err();

        assert_eq!(err, CoreError::schema("config.defaultLimit", "must be a positive integer"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(TranslatorConfig::from_json(r#"{ "claimPrefx": "$ctx." }"#).is_err());
    }
}
