mod commands;

use bandolier_core::{ResolverOptions, WorkloadResolver};
use bandolier_store::SdkLayout;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::exit_code_for;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;

#[derive(Debug, Parser)]
#[command(
    name = "bandolier",
    version,
    about = "Inspect which workload manifests an SDK installation resolves to"
)]
struct Cli {
    /// Root of the SDK installation (the directory holding `sdk/` and `sdk-manifests/`).
    #[arg(long, global = true)]
    sdk_root: Option<PathBuf>,

    /// SDK version to resolve for; defaults to the newest under `<sdk-root>/sdk`.
    #[arg(long, global = true)]
    sdk_version: Option<String>,

    /// User profile directory used for user-local installs (default: ~/.dotnet).
    #[arg(long, global = true)]
    user_profile: Option<PathBuf>,

    /// Read resolver options from a TOML file; flags override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Resolve against this workload set version instead of any pin.
    #[arg(long, global = true, conflicts_with = "global_json")]
    workload_version: Option<String>,

    /// Read the workload pin from this global.json.
    #[arg(long, global = true, conflicts_with = "search_from")]
    global_json: Option<PathBuf>,

    /// Look for global.json in this directory and its ancestors (default: current directory).
    #[arg(long, global = true)]
    search_from: Option<PathBuf>,

    /// Additional manifest root, searched before the SDK's own (repeatable).
    #[arg(long = "manifest-root", global = true)]
    manifest_roots: Vec<PathBuf>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the resolved workload manifests.
    Manifests {
        /// Report a missing global.json workload set instead of failing.
        #[arg(long, default_value_t = false)]
        best_effort: bool,
    },
    /// Show the workload version of the current resolution.
    Version,
    /// List the workload sets installed for the SDK's feature band.
    WorkloadSets,
    /// Show the SDK version and its feature band.
    Band,
    /// Show the workload version pinned by global.json.
    GlobalJson,
    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages.
    ManPages {
        /// Output directory.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("BANDOLIER_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let json = cli.json;
    let result = match &cli.command {
        Commands::Completions { shell } => commands::completions::run::<Cli>(*shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(dir),
        Commands::Manifests { best_effort } => resolver_for(&cli)
            .and_then(|mut resolver| commands::manifests::run(&mut resolver, *best_effort, json)),
        Commands::Version => {
            resolver_for(&cli).and_then(|mut resolver| commands::version::run(&mut resolver, json))
        }
        Commands::WorkloadSets => {
            resolver_for(&cli).and_then(|resolver| commands::workload_sets::run(&resolver, json))
        }
        Commands::Band => {
            resolver_for(&cli).and_then(|resolver| commands::band::run(&resolver, json))
        }
        Commands::GlobalJson => resolver_for(&cli)
            .and_then(|mut resolver| commands::global_json::run(&mut resolver, json)),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(exit_code_for(&msg))
        }
    }
}

fn resolver_for(cli: &Cli) -> Result<WorkloadResolver, String> {
    let options = resolver_options(cli)?;
    WorkloadResolver::new(&options).map_err(|e| e.to_string())
}

/// Merge the config file, flags, and process environment into resolver options.
fn resolver_options(cli: &Cli) -> Result<ResolverOptions, String> {
    let mut options = match &cli.config {
        Some(path) => ResolverOptions::load(path).map_err(|e| e.to_string())?,
        None => ResolverOptions::default(),
    };

    if let Some(root) = &cli.sdk_root {
        options.sdk_root = root.clone();
    }
    if options.sdk_root.as_os_str().is_empty() {
        return Err(
            "invalid argument: no sdk root; pass --sdk-root or set sdk_root in the config file"
                .to_owned(),
        );
    }

    if let Some(version) = &cli.sdk_version {
        options.sdk_version = version.clone();
    }
    if options.sdk_version.trim().is_empty() {
        let layout = SdkLayout::new(&options.sdk_root);
        let installed = layout.installed_sdk_versions().map_err(|e| e.to_string())?;
        let newest = installed.last().ok_or_else(|| {
            format!(
                "invalid argument: no sdk versions found under {}",
                layout.root().join("sdk").display()
            )
        })?;
        debug!("defaulting to sdk {newest}");
        options.sdk_version = newest.to_string();
    }

    if let Some(profile) = &cli.user_profile {
        options.user_profile_dir = Some(profile.clone());
    }
    if options.user_profile_dir.is_none() {
        options.user_profile_dir =
            std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".dotnet"));
    }
    options.manifest_roots.extend(cli.manifest_roots.iter().cloned());

    if let Some(version) = &cli.workload_version {
        options.workload_set_version = Some(version.clone());
        options.global_json_path = None;
    } else if let Some(path) = &cli.global_json {
        options.global_json_path = Some(path.clone());
    } else if options.workload_set_version.is_none() && options.global_json_path.is_none() {
        let start = match &cli.search_from {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()
                .map_err(|e| format!("cannot determine current directory: {e}"))?,
        };
        options = options.with_global_json_from(&start);
    }

    Ok(options.with_environment())
}
