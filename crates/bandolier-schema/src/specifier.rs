use crate::band::FeatureBand;
use crate::types::ManifestId;
use crate::version::{VersionError, VersionTag};
use serde::Serialize;
use std::fmt;

/// Exactly one on-disk manifest: `<root>/<feature_band>/<id>/<version>/`.
///
/// Equality is field-wise, with the id compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ManifestSpecifier {
    pub id: ManifestId,
    pub version: VersionTag,
    pub feature_band: FeatureBand,
}

impl ManifestSpecifier {
    pub fn new(id: impl Into<ManifestId>, version: VersionTag, feature_band: FeatureBand) -> Self {
        Self {
            id: id.into(),
            version,
            feature_band,
        }
    }
}

impl fmt::Display for ManifestSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}/{}", self.id, self.version, self.feature_band)
    }
}

/// Parse a `"version/featureBand"` entry as written in workload-set and
/// install-state documents. A missing band means `default_band`.
pub fn parse_version_and_band(
    value: &str,
    default_band: &FeatureBand,
) -> Result<(VersionTag, FeatureBand), VersionError> {
    match value.split_once('/') {
        Some((version, band)) => Ok((VersionTag::parse(version)?, FeatureBand::parse(band)?)),
        None => Ok((VersionTag::parse(value)?, default_band.clone())),
    }
}
