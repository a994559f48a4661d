pub mod band;
pub mod completions;
pub mod global_json;
pub mod man_pages;
pub mod manifests;
pub mod version;
pub mod workload_sets;

use bandolier_core::VersionKind;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_RESOLUTION_ERROR: u8 = 3;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

/// Exit code for an error message produced by a command.
pub fn exit_code_for(msg: &str) -> u8 {
    if msg.starts_with("invalid argument:")
        || msg.starts_with("config parse error:")
        || msg.starts_with("failed to read config")
    {
        EXIT_CONFIG_ERROR
    } else if msg.starts_with("workload version") || msg.starts_with("manifest ") {
        EXIT_RESOLUTION_ERROR
    } else {
        EXIT_FAILURE
    }
}

pub fn colorize_kind(kind: VersionKind) -> String {
    use console::Style;
    match kind {
        VersionKind::WorkloadSet => Style::new().green().apply_to("workload set").to_string(),
        VersionKind::WorkloadSetMode => Style::new()
            .yellow()
            .apply_to("workload set mode")
            .to_string(),
        VersionKind::LooseManifests => Style::new().cyan().apply_to("loose manifests").to_string(),
    }
}

pub fn colorize_installed(installed: bool) -> String {
    use console::Style;
    if installed {
        Style::new().green().apply_to("installed").to_string()
    } else {
        Style::new().red().bold().apply_to("not installed").to_string()
    }
}
