// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates verity.yml template files.

use std::path::Path;

use crate::error::{Error, Result};

use super::CONFIG_FILENAME;

pub fn init_config(dir: &Path, project: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let project = match project {
        Some(name) if name.trim().is_empty() => {
            return Err(Error::InvalidConfig("project name cannot be empty".to_string()));
        }
        Some(name) => name.to_string(),
        None => dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("my-project")
            .to_string(),
    };

    std::fs::write(&config_path, generate_template_yaml(&project))?;

    Ok(())
}

fn generate_template_yaml(project: &str) -> String {
    format!(
        r#"project: {project}

# Scripts in this directory back the provisioning and testing steps:
# exists, validate, provision, delete, test
scripts: .verity/scripts

deploy:
  max_concurrent: 4
  rollback: true
  provision_timeout: 10m

retry:
  base_delay: 1s
  max_delay: 60s
  max_attempts: 3

fix:
  max_attempts: 3
  # tool:
  #   program: specify
  #   args: [bicep]

testing:
  base_url: http://localhost:8080

resources:
  - id: storage
    type: storage-account
    template: infra/storage.bicep
    parameters:
      sku: Standard_LRS
  - id: app
    type: web-app
    template: infra/app.bicep
    depends_on: [storage]
    parameters:
      region: {{ env: VERITY_REGION, default: westeurope }}

endpoints:
  - path: /health
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn template_parses_and_plans() {
        let config = Config::from_yaml(&generate_template_yaml("demo")).unwrap();
        assert_eq!(config.project, "demo");
        assert_eq!(config.resources.len(), 2);
        assert_eq!(config.endpoints.len(), 1);
    }
}
