use crate::policy::Selection;
use crate::readable::ReadableManifest;
use bandolier_schema::FeatureBand;
use serde::Serialize;

/// What the reported workload version stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionKind {
    /// A concrete workload set version.
    WorkloadSet,
    /// Install state opted into workload sets but none is installed yet; the version is the band.
    WorkloadSetMode,
    /// No workload set; the version is a content label over the loose manifests.
    LooseManifests,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkloadVersion {
    pub version: String,
    pub kind: VersionKind,
    /// False only for a global.json pin whose workload set is not installed.
    pub installed: bool,
}

impl WorkloadVersion {
    /// The version implied by the selection alone, without looking at any manifest.
    ///
    /// `None` means the caller must aggregate manifests and label them with
    /// [`compute_manifest_label`].
    pub fn from_selection(selection: &Selection, band: &FeatureBand) -> Option<Self> {
        if let Some(pin) = &selection.global_json_pin {
            return Some(Self {
                version: pin.version.clone(),
                kind: VersionKind::WorkloadSet,
                installed: selection.deferred.is_none(),
            });
        }
        if let Some(active) = &selection.workload_set {
            return Some(Self {
                version: active.set.version.clone(),
                kind: VersionKind::WorkloadSet,
                installed: true,
            });
        }
        let opted_in = selection
            .install_state
            .as_ref()
            .and_then(|s| s.use_workload_sets)
            .unwrap_or(false);
        opted_in.then(|| Self {
            version: band.without_prerelease().to_string(),
            kind: VersionKind::WorkloadSetMode,
            installed: true,
        })
    }

    pub fn loose(band: &FeatureBand, manifests: &[ReadableManifest]) -> Self {
        Self {
            version: compute_manifest_label(band, manifests),
            kind: VersionKind::LooseManifests,
            installed: true,
        }
    }
}

/// `"{band}-manifests.{hash}"` over the ids, bands and versions of `manifests`.
///
/// The input is sorted by id first, so the label does not depend on the order
/// the manifests were resolved in. The band is rendered without its prerelease
/// label.
pub fn compute_manifest_label(band: &FeatureBand, manifests: &[ReadableManifest]) -> String {
    let mut sorted: Vec<&ReadableManifest> = manifests.iter().collect();
    sorted.sort_by(|a, b| a.manifest_id.cmp(&b.manifest_id));

    let joined = sorted
        .iter()
        .map(|m| m.identity_key())
        .collect::<Vec<_>>()
        .join(";");
    let hex = blake3::hash(joined.as_bytes()).to_hex().to_string();

    format!("{}-manifests.{}", band.without_prerelease(), &hex[..8])
}
