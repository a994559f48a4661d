//! Workload manifest resolution for Bandolier.
//!
//! Given an SDK installation, this crate answers which workload manifests are
//! active. `WorkloadResolver` ties the pieces together: `ResolverOptions`
//! validates inputs and computes manifest roots, `ResolutionPolicy` picks the
//! active workload set or install-state overrides, `ManifestAggregator` merges
//! directory probing with those overrides, and the identity module labels the
//! result.

pub mod aggregate;
pub mod config;
pub mod identity;
pub mod policy;
pub mod readable;
pub mod resolver;

pub use aggregate::{ManifestAggregator, ResolutionOutcome};
pub use config::{
    ResolverOptions, CONFIG_FILE, IGNORE_DEFAULT_ROOTS_ENV, MANIFEST_ROOTS_ENV,
};
pub use identity::{compute_manifest_label, VersionKind, WorkloadVersion};
pub use policy::{
    ActiveWorkloadSet, DeferredError, GlobalJsonPin, InstallStateOverrides, PinSource,
    ResolutionPolicy, Selection,
};
pub use readable::{ReadableManifest, UNKNOWN_VERSION};
pub use resolver::{GlobalJsonInformation, WorkloadResolver};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("schema error: {0}")]
    Schema(#[from] bandolier_schema::SchemaError),
    #[error("store error: {0}")]
    Store(#[from] bandolier_store::StoreError),
    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("workload version {version} was not found")]
    WorkloadSetNotFound { version: String },
    #[error(
        "workload version {version}, which was specified in {}, was not found; install it to continue",
        path.display()
    )]
    GlobalJsonWorkloadSetNotFound { version: String, path: PathBuf },
    #[error(
        "workload version {version}, recorded in install state {}, was not found",
        path.display()
    )]
    InstallStateWorkloadSetNotFound { version: String, path: PathBuf },
    #[error("manifest {specifier} from workload version {workload_set_version} was not found")]
    ManifestFromWorkloadSetNotFound {
        specifier: String,
        workload_set_version: String,
    },
    #[error("manifest {specifier} from install state {} was not found", path.display())]
    ManifestFromInstallStateNotFound { specifier: String, path: PathBuf },
}

impl CoreError {
    /// Errors caused by caller input rather than the state of the SDK on disk.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_) | Self::ConfigRead { .. } | Self::ConfigParse(_)
        )
    }
}
