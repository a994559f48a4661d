use crate::{sorted_subdirectories, StoreError};
use bandolier_schema::{FeatureBand, ManifestSpecifier, VersionTag};
use std::path::{Path, PathBuf};

pub const WORKLOAD_MANIFEST_FILE: &str = "WorkloadManifest.json";
pub const WORKLOAD_SETS_DIR: &str = "workloadsets";
pub const WORKLOAD_SET_FILE_SUFFIX: &str = ".workloadset.json";
pub const BASELINE_WORKLOAD_SET_FILE: &str = "baseline.workloadset.json";
pub const SDK_MANIFESTS_DIR: &str = "sdk-manifests";
pub const INSTALL_STATE_DIR: &str = "InstallState";
pub const INSTALL_STATE_FILE: &str = "default.json";
pub const KNOWN_MANIFESTS_FILE: &str = "KnownWorkloadManifests.txt";
pub const INCLUDED_MANIFESTS_FILE: &str = "IncludedWorkloadManifests.txt";
pub const USER_LOCAL_MARKER: &str = "userlocal";
pub const LOCALIZE_DIR: &str = "localize";

/// Directory layout of one SDK installation.
///
/// ```text
/// <sdk_root>/sdk-manifests/                           default manifest root
/// <sdk_root>/sdk/<sdk_version>/KnownWorkloadManifests.txt
/// <sdk_root>/metadata/workloads/<band>/userlocal      user-local install marker
/// <sdk_root>/metadata/workloads/<band>/InstallState/default.json
/// ```
#[derive(Debug, Clone)]
pub struct SdkLayout {
    root: PathBuf,
}

impl SdkLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn manifests_root(&self) -> PathBuf {
        self.root.join(SDK_MANIFESTS_DIR)
    }

    #[inline]
    pub fn sdk_dir(&self, sdk_version: &str) -> PathBuf {
        self.root.join("sdk").join(sdk_version)
    }

    /// Root under which per-band install state lives: `<sdk_root>/metadata/workloads`.
    #[inline]
    pub fn workload_metadata_dir(&self) -> PathBuf {
        workload_metadata_dir(&self.root)
    }

    #[inline]
    pub fn user_local_marker(&self, band: &FeatureBand) -> PathBuf {
        self.workload_metadata_dir()
            .join(band.to_string())
            .join(USER_LOCAL_MARKER)
    }

    /// Whether workloads for `band` are installed into the user profile instead of the SDK root.
    pub fn is_user_local(&self, band: &FeatureBand) -> bool {
        self.user_local_marker(band).is_file()
    }

    /// Candidate known-manifest list files, preferred name first.
    pub fn known_manifests_candidates(&self, sdk_version: &str) -> [PathBuf; 2] {
        let dir = self.sdk_dir(sdk_version);
        [
            dir.join(KNOWN_MANIFESTS_FILE),
            dir.join(INCLUDED_MANIFESTS_FILE),
        ]
    }

    /// SDK versions installed under `<sdk_root>/sdk`, ascending. Unparseable names are skipped.
    pub fn installed_sdk_versions(&self) -> Result<Vec<VersionTag>, StoreError> {
        let mut versions: Vec<VersionTag> = sorted_subdirectories(&self.root.join("sdk"))?
            .iter()
            .filter_map(|dir| dir.file_name()?.to_str().map(VersionTag::parse))
            .filter_map(Result::ok)
            .collect();
        versions.sort();
        Ok(versions)
    }
}

/// `<base>/metadata/workloads`, where `base` is the SDK root or, in user-local mode,
/// the user profile.
pub fn workload_metadata_dir(base: &Path) -> PathBuf {
    base.join("metadata").join("workloads")
}

/// `<install_state_root>/<band>/InstallState/default.json`.
pub fn install_state_file(install_state_root: &Path, band: &FeatureBand) -> PathBuf {
    install_state_root
        .join(band.to_string())
        .join(INSTALL_STATE_DIR)
        .join(INSTALL_STATE_FILE)
}

/// Manifest roots in priority order, highest first.
///
/// Each root holds `<root>/<band>/<manifest_id>/...` and
/// `<root>/<band>/workloadsets/<version>/...`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestRoots {
    roots: Vec<PathBuf>,
}

impl ManifestRoots {
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut deduped: Vec<PathBuf> = Vec::new();
        for root in roots {
            if !deduped.contains(&root) {
                deduped.push(root);
            }
        }
        Self { roots: deduped }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.roots.iter()
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn as_slice(&self) -> &[PathBuf] {
        &self.roots
    }

    /// The root searched last; by convention the SDK's own `sdk-manifests`.
    pub fn lowest_priority(&self) -> Option<&Path> {
        self.roots.last().map(PathBuf::as_path)
    }

    #[inline]
    pub fn band_dir(root: &Path, band: &FeatureBand) -> PathBuf {
        root.join(band.to_string())
    }

    #[inline]
    pub fn workload_sets_dir(root: &Path, band: &FeatureBand) -> PathBuf {
        Self::band_dir(root, band).join(WORKLOAD_SETS_DIR)
    }

    #[inline]
    pub fn specified_manifest_dir(root: &Path, spec: &ManifestSpecifier) -> PathBuf {
        Self::band_dir(root, &spec.feature_band)
            .join(spec.id.as_str())
            .join(spec.version.as_str())
    }

    /// Exact `<root>/<band>/<id>/<version>/` lookup; the first root holding a
    /// manifest document at that path wins.
    pub fn find_specified(&self, spec: &ManifestSpecifier) -> Option<PathBuf> {
        self.roots
            .iter()
            .map(|root| Self::specified_manifest_dir(root, spec))
            .find(|dir| dir.join(WORKLOAD_MANIFEST_FILE).is_file())
    }
}

impl<'a> IntoIterator for &'a ManifestRoots {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.roots.iter()
    }
}
