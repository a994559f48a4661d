//! Read-only view of the SDK's on-disk workload layout for Bandolier.
//!
//! This crate provides the storage layer: `SdkLayout` and `ManifestRoots` for
//! the bit-exact directory contract, `ManifestDirectoryProbe` for picking the
//! authoritative manifest directory of one manifest id, `WorkloadSetCatalog`
//! for enumerating installed workload sets per feature band, and
//! `KnownManifests` for the SDK-shipped manifest id list. Nothing here writes.

pub mod catalog;
pub mod known;
pub mod layout;
pub mod probe;

pub use catalog::{latest_workload_set, read_workload_set_folder, WorkloadSetCatalog};
pub use known::KnownManifests;
pub use layout::{
    install_state_file, workload_metadata_dir, ManifestRoots, SdkLayout, BASELINE_WORKLOAD_SET_FILE,
    INCLUDED_MANIFESTS_FILE, INSTALL_STATE_DIR, INSTALL_STATE_FILE, KNOWN_MANIFESTS_FILE,
    LOCALIZE_DIR, SDK_MANIFESTS_DIR, USER_LOCAL_MARKER, WORKLOAD_MANIFEST_FILE, WORKLOAD_SETS_DIR,
    WORKLOAD_SET_FILE_SUFFIX,
};
pub use probe::{ManifestDirectoryProbe, ProbedManifest, DEFAULT_OUTDATED_MANIFEST_IDS};

use bandolier_schema::SchemaError;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl StoreError {
    pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
        move |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Immediate subdirectories of `dir`, sorted by path so scans never depend on
/// filesystem enumeration order. A missing directory yields nothing.
pub fn sorted_subdirectories(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(StoreError::io(dir))? {
        let entry = entry.map_err(StoreError::io(dir))?;
        let path = entry.path();
        if path.is_dir() {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}
