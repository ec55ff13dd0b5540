// ABOUTME: Provisioner backed by project scripts (exists, validate, provision, delete).
// ABOUTME: Resource context goes in as env vars; provision outputs come back as JSON.

use async_trait::async_trait;
use std::collections::HashMap;

use super::{BackendError, Outputs, Provisioner};
use crate::deploy::DeploymentSpec;
use crate::scripts::{Script, ScriptOutput, ScriptRunner};
use crate::types::ResourceId;

pub struct ScriptProvisioner {
    runner: ScriptRunner,
}

impl ScriptProvisioner {
    pub fn new(runner: ScriptRunner) -> Self {
        Self { runner }
    }

    fn spec_env(spec: &DeploymentSpec) -> HashMap<String, String> {
        let mut env = id_env(&spec.id);
        env.insert("VERITY_RESOURCE_TYPE".to_string(), spec.resource_type.clone());
        env.insert("VERITY_RESOURCE_NAME".to_string(), spec.name.clone());
        env.insert("VERITY_TEMPLATE".to_string(), spec.template.clone());
        for (key, value) in &spec.parameters {
            env.insert(format!("VERITY_PARAM_{}", env_key(key)), value.clone());
        }
        if let Ok(json) = serde_json::to_string(&spec.parameters) {
            env.insert("VERITY_PARAMETERS".to_string(), json);
        }
        env
    }

    fn timed_out(&self, output: &ScriptOutput) -> Option<BackendError> {
        output
            .timed_out
            .then(|| BackendError::TimedOut(self.runner.timeout()))
    }
}

fn id_env(id: &ResourceId) -> HashMap<String, String> {
    let mut env = HashMap::new();
    env.insert("VERITY_RESOURCE_ID".to_string(), id.to_string());
    env
}

/// `db-sku.name` becomes `DB_SKU_NAME`.
fn env_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Parse provision stdout as a JSON object of outputs.
///
/// Values may be bare (`{"url": "https://..."}`) or wrapped the way ARM
/// reports them (`{"url": {"type": "string", "value": "https://..."}}`).
/// Empty stdout means no outputs.
pub(crate) fn parse_outputs(stdout: &str) -> Result<Outputs, BackendError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Outputs::new());
    }

    let parsed: serde_json::Map<String, serde_json::Value> = serde_json::from_str(trimmed)
        .map_err(|e| BackendError::Provision(format!("invalid provision output: {e}")))?;

    Ok(parsed
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::Object(mut wrapped) if wrapped.contains_key("value") => {
                    wrapped.remove("value").unwrap_or_default()
                }
                other => other,
            };
            let rendered = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (key, rendered)
        })
        .collect())
}

#[async_trait]
impl Provisioner for ScriptProvisioner {
    async fn exists(&self, id: &ResourceId) -> Result<bool, BackendError> {
        let Some(output) = self.runner.run(Script::Exists, &id_env(id)).await else {
            return Ok(false);
        };
        if let Some(err) = self.timed_out(&output) {
            return Err(err);
        }
        match output.exit_code {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(BackendError::Lookup(output.failure_message())),
        }
    }

    async fn validate(&self, spec: &DeploymentSpec) -> Result<(), BackendError> {
        let Some(output) = self.runner.run(Script::Validate, &Self::spec_env(spec)).await else {
            tracing::debug!(resource = %spec.id, "no validate script; skipping validation");
            return Ok(());
        };
        if let Some(err) = self.timed_out(&output) {
            return Err(err);
        }
        if output.success {
            Ok(())
        } else {
            Err(BackendError::Validation(output.failure_message()))
        }
    }

    async fn provision(&self, spec: &DeploymentSpec) -> Result<Outputs, BackendError> {
        let Some(output) = self.runner.run(Script::Provision, &Self::spec_env(spec)).await else {
            return Err(BackendError::Unavailable(format!(
                "no provision script in {}",
                self.runner.dir().display()
            )));
        };
        if let Some(err) = self.timed_out(&output) {
            return Err(err);
        }
        if !output.success {
            return Err(BackendError::Provision(output.failure_message()));
        }
        parse_outputs(&output.stdout)
    }

    async fn delete(&self, id: &ResourceId) -> Result<(), BackendError> {
        let Some(output) = self.runner.run(Script::Delete, &id_env(id)).await else {
            return Err(BackendError::Unavailable(format!(
                "no delete script in {}",
                self.runner.dir().display()
            )));
        };
        if let Some(err) = self.timed_out(&output) {
            return Err(err);
        }
        if output.success {
            Ok(())
        } else {
            Err(BackendError::Delete(output.failure_message()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_are_upper_snake() {
        assert_eq!(env_key("db-sku.name"), "DB_SKU_NAME");
        assert_eq!(env_key("region"), "REGION");
    }

    #[test]
    fn spec_env_includes_parameters() {
        let spec = DeploymentSpec::new("db", "postgres", "main-db", "db.bicep")
            .with_parameter("sku", "basic");
        let env = ScriptProvisioner::spec_env(&spec);
        assert_eq!(env["VERITY_RESOURCE_ID"], "db");
        assert_eq!(env["VERITY_TEMPLATE"], "db.bicep");
        assert_eq!(env["VERITY_PARAM_SKU"], "basic");
        assert_eq!(env["VERITY_PARAMETERS"], r#"{"sku":"basic"}"#);
    }

    #[test]
    fn parses_bare_and_wrapped_outputs() {
        let outputs =
            parse_outputs(r#"{"url": "https://db", "port": 5432, "key": {"type": "string", "value": "k1"}}"#)
                .unwrap();
        assert_eq!(outputs["url"], "https://db");
        assert_eq!(outputs["port"], "5432");
        assert_eq!(outputs["key"], "k1");
    }

    #[test]
    fn empty_stdout_means_no_outputs() {
        assert!(parse_outputs("  \n").unwrap().is_empty());
    }

    #[test]
    fn malformed_stdout_is_provision_error() {
        let err = parse_outputs("not json").unwrap_err();
        assert!(matches!(err, BackendError::Provision(_)));
    }
}
