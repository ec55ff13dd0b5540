// ABOUTME: Plan command implementation.
// ABOUTME: Prints deployment order and parallel batches without deploying anything.

use verity::config::Config;
use verity::error::{Error, Result};

/// Print the deployment order and batches for the configured resources.
pub fn plan(config: &Config) -> Result<()> {
    let graph = config.graph();
    let order = graph.ordered_resources()?;
    let batches = graph
        .deployment_batches()
        .map_err(|e| Error::InvalidConfig(e.to_string()))?;

    println!("Project: {}", config.project);

    if order.is_empty() {
        println!("No resources declared");
    } else {
        let order: Vec<String> = order.iter().map(ToString::to_string).collect();
        println!("Deployment order: {}", order.join(" -> "));
        for (index, batch) in batches.iter().enumerate() {
            let members: Vec<String> = batch.iter().map(ToString::to_string).collect();
            println!("  Batch {}: {}", index + 1, members.join(", "));
        }
    }

    if !config.endpoints.is_empty() {
        println!("Endpoints:");
        for endpoint in &config.endpoints {
            println!("  {endpoint}");
        }
    }

    Ok(())
}
