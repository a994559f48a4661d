use crate::band::FeatureBand;
use crate::specifier::{parse_version_and_band, ManifestSpecifier};
use crate::types::ManifestId;
use crate::version::{VersionError, VersionTag};
use crate::SchemaError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Version and band one manifest is pinned to inside a workload set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PinnedManifest {
    pub version: VersionTag,
    pub feature_band: FeatureBand,
}

/// A named, versioned bundle of manifest versions known to work together.
///
/// Read once from `<root>/<band>/workloadsets/<version>/` and never mutated
/// after the catalog hands it out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkloadSet {
    pub version: String,
    pub feature_band: FeatureBand,
    pub manifest_versions: BTreeMap<ManifestId, PinnedManifest>,
    /// Set when the folder carries `baseline.workloadset.json`.
    pub is_baseline: bool,
}

impl WorkloadSet {
    pub fn new(version: impl Into<String>, feature_band: FeatureBand) -> Self {
        Self {
            version: version.into(),
            feature_band,
            manifest_versions: BTreeMap::new(),
            is_baseline: false,
        }
    }

    /// Build a set from an in-memory `id -> "version/band"` map, as found in install state.
    pub fn from_manifest_map(
        version: impl Into<String>,
        feature_band: FeatureBand,
        entries: &BTreeMap<String, String>,
        origin: &Path,
    ) -> Result<Self, SchemaError> {
        let mut set = Self::new(version, feature_band);
        set.insert_entries(entries, origin)?;
        Ok(set)
    }

    /// Merge one `*.workloadset.json` document into this set.
    pub fn add_document(&mut self, json: &str, origin: &Path) -> Result<(), SchemaError> {
        let entries: BTreeMap<String, String> =
            serde_json::from_str(json).map_err(|source| SchemaError::Parse {
                path: origin.to_path_buf(),
                source,
            })?;
        self.insert_entries(&entries, origin)
    }

    fn insert_entries(
        &mut self,
        entries: &BTreeMap<String, String>,
        origin: &Path,
    ) -> Result<(), SchemaError> {
        for (id, value) in entries {
            let (version, feature_band) = parse_version_and_band(value, &self.feature_band)
                .map_err(|source| SchemaError::InvalidEntry {
                    id: id.clone(),
                    path: origin.to_path_buf(),
                    source,
                })?;
            self.manifest_versions.insert(
                ManifestId::new(id.as_str()),
                PinnedManifest {
                    version,
                    feature_band,
                },
            );
        }
        Ok(())
    }

    pub fn parsed_version(&self) -> Result<VersionTag, VersionError> {
        VersionTag::parse(&self.version)
    }

    pub fn specifiers(&self) -> impl Iterator<Item = ManifestSpecifier> + '_ {
        self.manifest_versions.iter().map(|(id, pinned)| {
            ManifestSpecifier::new(
                id.clone(),
                pinned.version.clone(),
                pinned.feature_band.clone(),
            )
        })
    }

    pub fn is_empty(&self) -> bool {
        self.manifest_versions.is_empty()
    }
}

/// The feature band a workload-set version belongs to.
///
/// `8.0.201` and `8.0.201.1` belong to `8.0.200`; `9.0.100-preview.2.1` to `9.0.100-preview`.
pub fn workload_set_feature_band(version: &str) -> Result<FeatureBand, VersionError> {
    Ok(FeatureBand::from_version(&VersionTag::parse(version)?))
}
