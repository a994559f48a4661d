use super::{colorize_installed, json_pretty, EXIT_SUCCESS};
use bandolier_core::WorkloadResolver;

pub fn run(resolver: &mut WorkloadResolver, json: bool) -> Result<u8, String> {
    let info = resolver
        .global_json_information()
        .map_err(|e| e.to_string())?;
    if json {
        println!("{}", json_pretty(&info)?);
        return Ok(EXIT_SUCCESS);
    }
    match info {
        Some(info) => {
            println!("path:       {}", info.global_json_path.display());
            println!("version:    {}", info.workload_version);
            println!("status:     {}", colorize_installed(info.workload_version_installed));
        }
        None => println!("no workload version pinned by global.json"),
    }
    Ok(EXIT_SUCCESS)
}
