// ABOUTME: Parameter value types with environment interpolation.
// ABOUTME: Handles literal values and references to environment variables.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// A resource parameter: a literal, or `{ env: NAME, default: ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    pub fn resolve(&self) -> Result<String> {
        match self {
            EnvValue::Literal(s) => Ok(s.clone()),
            EnvValue::FromEnv { var, default } => match std::env::var(var) {
                Ok(val) => Ok(val),
                Err(_) => default
                    .clone()
                    .ok_or_else(|| Error::MissingEnvVar(var.clone())),
            },
        }
    }
}

pub fn resolve_env_map(map: &HashMap<String, EnvValue>) -> Result<HashMap<String, String>> {
    map.iter()
        .map(|(k, v)| v.resolve().map(|resolved| (k.clone(), resolved)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_resolves_to_itself() {
        let value: EnvValue = serde_yaml::from_str("standard").unwrap();
        assert_eq!(value.resolve().unwrap(), "standard");
    }

    #[test]
    fn env_reference_uses_default_when_unset() {
        temp_env::with_var_unset("VERITY_TEST_UNSET_SKU", || {
            let value: EnvValue =
                serde_yaml::from_str("{ env: VERITY_TEST_UNSET_SKU, default: basic }").unwrap();
            assert_eq!(value.resolve().unwrap(), "basic");
        });
    }

    #[test]
    fn env_reference_without_default_is_an_error() {
        temp_env::with_var_unset("VERITY_TEST_UNSET_REGION", || {
            let value: EnvValue = serde_yaml::from_str("{ env: VERITY_TEST_UNSET_REGION }").unwrap();
            let err = value.resolve().unwrap_err();
            assert!(matches!(err, Error::MissingEnvVar(ref v) if v == "VERITY_TEST_UNSET_REGION"));
        });
    }
}
