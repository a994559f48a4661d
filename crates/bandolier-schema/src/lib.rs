//! Value types and document parsers for Bandolier workload manifest resolution.
//!
//! This crate is the schema layer: comparable release versions (`VersionTag`),
//! SDK release lines (`FeatureBand`), case-insensitive manifest identifiers
//! (`ManifestId`, `ManifestSpecifier`), workload-set documents (`WorkloadSet`),
//! the installer's persisted `InstallState`, and the global.json workload pin.
//! Nothing here walks directories; that is the store crate's job.

pub mod band;
pub mod global_json;
pub mod install_state;
pub mod specifier;
pub mod types;
pub mod version;
pub mod workload_set;

pub use band::FeatureBand;
pub use global_json::{find_global_json, read_workload_version, GLOBAL_JSON_FILE};
pub use install_state::{InstallState, INSTALL_STATE_SET_VERSION};
pub use specifier::{parse_version_and_band, ManifestSpecifier};
pub use types::ManifestId;
pub use version::{VersionError, VersionTag};
pub use workload_set::{workload_set_feature_band, PinnedManifest, WorkloadSet};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid entry for manifest '{id}' in {}: {source}", path.display())]
    InvalidEntry {
        id: String,
        path: PathBuf,
        source: VersionError,
    },
    #[error(transparent)]
    Version(#[from] VersionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_display_names_path() {
        let e = SchemaError::Read {
            path: PathBuf::from("/sdk/default.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        let msg = e.to_string();
        assert!(msg.contains("/sdk/default.json"));
        assert!(msg.contains("gone"));
    }

    #[test]
    fn schema_error_display_version() {
        let e: SchemaError = VersionTag::parse("x.y").unwrap_err().into();
        assert!(e.to_string().contains("x.y"));
    }
}
