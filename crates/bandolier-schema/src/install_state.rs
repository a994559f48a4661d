use crate::band::FeatureBand;
use crate::workload_set::WorkloadSet;
use crate::SchemaError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Version label given to the pseudo workload set built from install-state manifests.
pub const INSTALL_STATE_SET_VERSION: &str = "install-state";

/// Persisted snapshot written by the installer to
/// `<installStateRoot>/<band>/InstallState/default.json`.
///
/// Read-only here. Every field is optional; unknown fields are ignored so newer
/// installers can add keys without breaking resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_workload_sets: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload_version: Option<String>,
    /// `manifestId -> "version/featureBand"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifests: Option<BTreeMap<String, String>>,
}

impl InstallState {
    pub fn parse(json: &str, origin: &Path) -> Result<Self, SchemaError> {
        serde_json::from_str(json).map_err(|source| SchemaError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, SchemaError> {
        let content = fs::read_to_string(path).map_err(|source| SchemaError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, path)
    }

    /// Pinned workload-set version, with blank strings treated as absent.
    pub fn pinned_workload_version(&self) -> Option<&str> {
        self.workload_version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// The explicit manifest map as a workload set, entries without a band defaulting to `band`.
    pub fn manifest_overrides(
        &self,
        band: &FeatureBand,
        origin: &Path,
    ) -> Result<Option<WorkloadSet>, SchemaError> {
        self.manifests
            .as_ref()
            .map(|entries| {
                WorkloadSet::from_manifest_map(
                    INSTALL_STATE_SET_VERSION,
                    band.clone(),
                    entries,
                    origin,
                )
            })
            .transpose()
    }
}
