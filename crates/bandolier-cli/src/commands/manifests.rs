use super::{json_pretty, EXIT_SUCCESS};
use bandolier_core::WorkloadResolver;

pub fn run(resolver: &mut WorkloadResolver, best_effort: bool, json: bool) -> Result<u8, String> {
    let outcome = resolver.collect().map_err(|e| e.to_string())?;
    if !best_effort {
        if let Some(deferred) = &outcome.deferred_error {
            return Err(deferred.to_string());
        }
    }

    if json {
        if best_effort {
            println!("{}", json_pretty(&outcome)?);
        } else {
            println!("{}", json_pretty(&outcome.manifests)?);
        }
        return Ok(EXIT_SUCCESS);
    }

    if let Some(deferred) = &outcome.deferred_error {
        eprintln!("warning: {deferred}");
    }
    if outcome.manifests.is_empty() {
        println!("no workload manifests found");
    } else {
        println!("{:<40} {:<16} {:<16} DIRECTORY", "MANIFEST", "VERSION", "BAND");
        for m in &outcome.manifests {
            println!(
                "{:<40} {:<16} {:<16} {}",
                m.manifest_id,
                m.version_label(),
                m.feature_band,
                m.manifest_directory.display()
            );
        }
    }
    Ok(EXIT_SUCCESS)
}
