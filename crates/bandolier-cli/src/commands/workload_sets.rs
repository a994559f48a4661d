use super::{json_pretty, EXIT_SUCCESS};
use bandolier_core::WorkloadResolver;
use bandolier_schema::WorkloadSet;

pub fn run(resolver: &WorkloadResolver, json: bool) -> Result<u8, String> {
    let available = resolver
        .available_workload_sets()
        .map_err(|e| e.to_string())?;
    let mut sets: Vec<&WorkloadSet> = available.values().collect();
    sets.sort_by(|a, b| match (a.parsed_version(), b.parsed_version()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.version.cmp(&b.version),
    });

    if json {
        println!("{}", json_pretty(&sets)?);
    } else if sets.is_empty() {
        println!(
            "no workload sets installed for band {}",
            resolver.sdk_feature_band()
        );
    } else {
        println!("{:<24} {:<10} MANIFESTS", "VERSION", "BASELINE");
        for set in &sets {
            println!(
                "{:<24} {:<10} {}",
                set.version,
                if set.is_baseline { "yes" } else { "no" },
                set.manifest_versions.len()
            );
        }
    }
    Ok(EXIT_SUCCESS)
}
