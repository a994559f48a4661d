use crate::layout::{WORKLOAD_MANIFEST_FILE, WORKLOAD_SETS_DIR};
use crate::{sorted_subdirectories, StoreError};
use bandolier_schema::{ManifestId, VersionTag};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Manifest ids from early previews that were later folded into other manifests.
/// Directories with these names are never treated as manifests.
pub const DEFAULT_OUTDATED_MANIFEST_IDS: &[&str] = &[
    "microsoft.net.workload.android",
    "microsoft.net.workload.blazorwebassembly",
    "microsoft.net.workload.ios",
    "microsoft.net.workload.maccatalyst",
    "microsoft.net.workload.macos",
    "microsoft.net.workload.tvos",
    "microsoft.net.workload.mono.toolchain",
];

/// Outcome of probing one `<root>/<band>/<manifest_id>` directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbedManifest {
    pub id: ManifestId,
    /// Directory that holds the authoritative `WorkloadManifest.json`.
    pub directory: PathBuf,
    /// `None` when a flat manifest's own version field could not be read.
    pub version: Option<VersionTag>,
}

#[derive(Debug, Deserialize)]
struct ManifestHeader {
    #[serde(default)]
    version: Option<String>,
}

/// Picks the authoritative manifest directory for one manifest id.
///
/// The outdated-id set is injected at construction and immutable afterwards.
#[derive(Debug, Clone)]
pub struct ManifestDirectoryProbe {
    outdated_ids: BTreeSet<ManifestId>,
}

impl Default for ManifestDirectoryProbe {
    fn default() -> Self {
        Self::new(DEFAULT_OUTDATED_MANIFEST_IDS.iter().copied())
    }
}

impl ManifestDirectoryProbe {
    pub fn new<I, S>(outdated_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ManifestId>,
    {
        Self {
            outdated_ids: outdated_ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn outdated_ids(&self) -> impl Iterator<Item = &ManifestId> {
        self.outdated_ids.iter()
    }

    /// Whether a directory name can never name a manifest.
    pub fn is_excluded(&self, name: &str) -> bool {
        name.eq_ignore_ascii_case(WORKLOAD_SETS_DIR)
            || self.outdated_ids.contains(&ManifestId::from(name))
    }

    /// Resolve `<root>/<band>/<manifest_id>` to its authoritative directory.
    ///
    /// Versioned subfolders (`<id>/<version>/WorkloadManifest.json`) always win
    /// over a flat `<id>/WorkloadManifest.json`; the highest parsed version is
    /// taken. A flat manifest whose version cannot be read still resolves, with
    /// an unknown version.
    pub fn resolve(&self, manifest_dir: &Path) -> Result<Option<ProbedManifest>, StoreError> {
        let Some(name) = manifest_dir.file_name().and_then(|n| n.to_str()) else {
            return Ok(None);
        };
        if self.is_excluded(name) {
            debug!("skipping reserved manifest directory {}", manifest_dir.display());
            return Ok(None);
        }
        if !manifest_dir.is_dir() {
            return Ok(None);
        }
        let id = ManifestId::new(name);

        let newest = sorted_subdirectories(manifest_dir)?
            .into_iter()
            .filter(|dir| dir.join(WORKLOAD_MANIFEST_FILE).is_file())
            .filter_map(|dir| {
                let version = VersionTag::parse(dir.file_name()?.to_str()?).ok()?;
                Some((dir, version))
            })
            .max_by(|(a_dir, a_ver), (b_dir, b_ver)| {
                a_ver.cmp(b_ver).then_with(|| a_dir.cmp(b_dir))
            });

        if let Some((directory, version)) = newest {
            return Ok(Some(ProbedManifest {
                id,
                directory,
                version: Some(version),
            }));
        }

        let flat = manifest_dir.join(WORKLOAD_MANIFEST_FILE);
        if flat.is_file() {
            let version = read_manifest_version(&flat);
            return Ok(Some(ProbedManifest {
                id,
                directory: manifest_dir.to_path_buf(),
                version,
            }));
        }

        Ok(None)
    }
}

/// Best-effort read of the `version` field of a manifest document.
fn read_manifest_version(path: &Path) -> Option<VersionTag> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            debug!("cannot read {}: {e}", path.display());
            return None;
        }
    };
    let header: ManifestHeader = match serde_json::from_str(&content) {
        Ok(header) => header,
        Err(e) => {
            debug!("cannot parse {}: {e}", path.display());
            return None;
        }
    };
    let raw = header.version?;
    match VersionTag::parse(&raw) {
        Ok(version) => Some(version),
        Err(e) => {
            debug!("ignoring version in {}: {e}", path.display());
            None
        }
    }
}
