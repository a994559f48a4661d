use bandolier_schema::{FeatureBand, ManifestId};
use bandolier_store::{LOCALIZE_DIR, WORKLOAD_MANIFEST_FILE};
use serde::Serialize;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// One resolved manifest, ready to be opened by a consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadableManifest {
    pub manifest_id: ManifestId,
    pub manifest_directory: PathBuf,
    pub manifest_path: PathBuf,
    pub feature_band: FeatureBand,
    /// `None` when a flat manifest's own version field could not be read.
    pub version: Option<String>,
}

/// Stands in for a manifest version that could not be read.
pub const UNKNOWN_VERSION: &str = "unknown";

impl ReadableManifest {
    pub fn new(
        manifest_id: ManifestId,
        manifest_directory: PathBuf,
        feature_band: FeatureBand,
        version: Option<String>,
    ) -> Self {
        let manifest_path = manifest_directory.join(WORKLOAD_MANIFEST_FILE);
        Self {
            manifest_id,
            manifest_directory,
            manifest_path,
            feature_band,
            version,
        }
    }

    /// Fresh read handle on `WorkloadManifest.json`.
    pub fn open_manifest(&self) -> io::Result<File> {
        File::open(&self.manifest_path)
    }

    /// Localization file for `culture`, walking up to parent cultures (`pt-BR` then `pt`).
    pub fn localization_path(&self, culture: &str) -> Option<PathBuf> {
        let localize = self.manifest_directory.join(LOCALIZE_DIR);
        culture_chain(culture)
            .map(|c| localize.join(format!("WorkloadManifest.{c}.json")))
            .find(|p| p.is_file())
    }

    /// `Ok(None)` when no localization exists for the culture or any parent.
    pub fn open_localization(&self, culture: &str) -> io::Result<Option<File>> {
        self.localization_path(culture)
            .map(File::open)
            .transpose()
    }

    pub fn directory(&self) -> &Path {
        &self.manifest_directory
    }

    /// The version, or [`UNKNOWN_VERSION`].
    pub fn version_label(&self) -> &str {
        self.version.as_deref().unwrap_or(UNKNOWN_VERSION)
    }

    /// `"{id}.{band}.{version}"`, the per-manifest input to the identity label.
    pub fn identity_key(&self) -> String {
        format!(
            "{}.{}.{}",
            self.manifest_id,
            self.feature_band,
            self.version_label()
        )
    }
}

fn culture_chain(culture: &str) -> impl Iterator<Item = &str> {
    let culture = culture.trim();
    std::iter::successors((!culture.is_empty()).then_some(culture), |c| {
        c.rfind('-').map(|i| &c[..i])
    })
}
