use super::{colorize_installed, colorize_kind, json_pretty, EXIT_SUCCESS};
use bandolier_core::WorkloadResolver;

pub fn run(resolver: &mut WorkloadResolver, json: bool) -> Result<u8, String> {
    let version = resolver.workload_version().map_err(|e| e.to_string())?;
    if json {
        println!("{}", json_pretty(&version)?);
    } else {
        println!("version:    {}", version.version);
        println!("kind:       {}", colorize_kind(version.kind));
        println!("status:     {}", colorize_installed(version.installed));
    }
    Ok(EXIT_SUCCESS)
}
