use crate::version::{VersionError, VersionTag};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Prerelease labels that mark internal builds of a stable band rather than a preview band.
const NON_PREVIEW_LABELS: &[&str] = &["dev", "ci", "rtm"];

/// An SDK release line: `major.minor.patch00[-label]`.
///
/// Derived from a full SDK version by truncating the patch to its hundreds and
/// keeping only the first prerelease label. Manifests and workload sets are laid
/// out on disk under the band's string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FeatureBand {
    major: u64,
    minor: u64,
    patch: u64,
    prerelease: Option<String>,
}

impl FeatureBand {
    pub fn from_version(version: &VersionTag) -> Self {
        let prerelease = version
            .prerelease()
            .and_then(|pre| pre.split('.').next())
            .filter(|label| !NON_PREVIEW_LABELS.contains(label))
            .map(str::to_owned);

        Self {
            major: version.major(),
            minor: version.minor(),
            patch: (version.patch() / 100) * 100,
            prerelease,
        }
    }

    pub fn parse(input: &str) -> Result<Self, VersionError> {
        Ok(Self::from_version(&VersionTag::parse(input)?))
    }

    pub fn prerelease(&self) -> Option<&str> {
        self.prerelease.as_deref()
    }

    #[must_use]
    pub fn without_prerelease(&self) -> Self {
        Self {
            prerelease: None,
            ..self.clone()
        }
    }

    /// Numeric identity of the band, ignoring any prerelease label.
    pub fn release_key(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }

    /// True when `self` is an earlier release line than `other`, ignoring prerelease labels.
    pub fn is_older_release_than(&self, other: &FeatureBand) -> bool {
        self.release_key() < other.release_key()
    }

    pub fn to_version(&self) -> VersionTag {
        let tag = VersionTag::new(self.major, self.minor, self.patch);
        match &self.prerelease {
            Some(label) => tag.with_prerelease(label),
            None => tag,
        }
    }
}

impl Ord for FeatureBand {
    fn cmp(&self, other: &Self) -> Ordering {
        self.release_key()
            .cmp(&other.release_key())
            .then_with(|| match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for FeatureBand {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FeatureBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(label) = &self.prerelease {
            write!(f, "-{label}")?;
        }
        Ok(())
    }
}

impl FromStr for FeatureBand {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FeatureBand {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FeatureBand> for String {
    fn from(value: FeatureBand) -> Self {
        value.to_string()
    }
}

impl From<&VersionTag> for FeatureBand {
    fn from(value: &VersionTag) -> Self {
        Self::from_version(value)
    }
}
