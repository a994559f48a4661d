use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

const MIN_COMPONENTS: usize = 2;
const MAX_COMPONENTS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("invalid version '{input}': {reason}")]
    Format { input: String, reason: String },
}

impl VersionError {
    fn format(input: &str, reason: impl Into<String>) -> Self {
        VersionError::Format {
            input: input.to_owned(),
            reason: reason.into(),
        }
    }
}

/// A parsed release version: `major.minor[.patch[.revision]][-prerelease][+build]`.
///
/// Ordering is total. Numeric components compare first (missing components
/// count as 0), then a release without prerelease sorts above any prerelease
/// of the same numbers. Build metadata is kept for display only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionTag {
    components: [u64; MAX_COMPONENTS],
    component_count: usize,
    prerelease: Option<String>,
    build: Option<String>,
    /// Input spelling, kept so paths built from a version match the directory names on disk.
    text: String,
}

impl VersionTag {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            components: [major, minor, patch, 0],
            component_count: 3,
            prerelease: None,
            build: None,
            text: format!("{major}.{minor}.{patch}"),
        }
    }

    #[must_use]
    pub fn with_prerelease(mut self, prerelease: &str) -> Self {
        self.prerelease = (!prerelease.is_empty()).then(|| prerelease.to_owned());
        self.build = None;
        self.text = self.render();
        self
    }

    pub fn parse(input: &str) -> Result<Self, VersionError> {
        if input.is_empty() {
            return Err(VersionError::format(input, "empty string"));
        }

        let (rest, build) = match input.split_once('+') {
            Some((rest, build)) => {
                validate_identifiers(input, build, "build metadata")?;
                (rest, Some(build.to_owned()))
            }
            None => (input, None),
        };

        let (core, prerelease) = match rest.split_once('-') {
            Some((core, pre)) => {
                validate_identifiers(input, pre, "prerelease")?;
                (core, Some(pre.to_owned()))
            }
            None => (rest, None),
        };

        let parts: Vec<&str> = core.split('.').collect();
        if parts.len() < MIN_COMPONENTS || parts.len() > MAX_COMPONENTS {
            return Err(VersionError::format(
                input,
                format!(
                    "expected {MIN_COMPONENTS} to {MAX_COMPONENTS} numeric components, found {}",
                    parts.len()
                ),
            ));
        }

        let mut components = [0u64; MAX_COMPONENTS];
        for (slot, part) in components.iter_mut().zip(&parts) {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(VersionError::format(
                    input,
                    format!("'{part}' is not a numeric component"),
                ));
            }
            *slot = part
                .parse()
                .map_err(|_| VersionError::format(input, format!("'{part}' is out of range")))?;
        }

        Ok(Self {
            components,
            component_count: parts.len(),
            prerelease,
            build,
            text: input.to_owned(),
        })
    }

    fn render(&self) -> String {
        let mut out = self.components[..self.component_count]
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".");
        if let Some(pre) = &self.prerelease {
            out.push('-');
            out.push_str(pre);
        }
        if let Some(build) = &self.build {
            out.push('+');
            out.push_str(build);
        }
        out
    }

    #[inline]
    pub fn major(&self) -> u64 {
        self.components[0]
    }

    #[inline]
    pub fn minor(&self) -> u64 {
        self.components[1]
    }

    #[inline]
    pub fn patch(&self) -> u64 {
        self.components[2]
    }

    /// Fourth numeric component, used by workload-set versions such as `8.0.201.1`.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.components[3]
    }

    pub fn prerelease(&self) -> Option<&str> {
        self.prerelease.as_deref()
    }

    pub fn build_metadata(&self) -> Option<&str> {
        self.build.as_deref()
    }

    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// The same version with prerelease and build metadata removed.
    #[must_use]
    pub fn release(&self) -> Self {
        let mut release = Self {
            components: self.components,
            component_count: self.component_count,
            prerelease: None,
            build: None,
            text: String::new(),
        };
        release.text = release.render();
        release
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

fn validate_identifiers(input: &str, section: &str, what: &str) -> Result<(), VersionError> {
    for ident in section.split('.') {
        if ident.is_empty() {
            return Err(VersionError::format(input, format!("empty {what} identifier")));
        }
        if !ident
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-')
        {
            return Err(VersionError::format(
                input,
                format!("invalid character in {what} identifier '{ident}'"),
            ));
        }
    }
    Ok(())
}

fn compare_prerelease(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ord = compare_identifier(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn compare_identifier(a: &str, b: &str) -> Ordering {
    let a_numeric = a.bytes().all(|c| c.is_ascii_digit());
    let b_numeric = b.bytes().all(|c| c.is_ascii_digit());
    match (a_numeric, b_numeric) {
        // Compare by length first so arbitrarily long digit runs never overflow.
        (true, true) => {
            let a = a.trim_start_matches('0');
            let b = b.trim_start_matches('0');
            a.len().cmp(&b.len()).then_with(|| a.cmp(b))
        }
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.cmp(b),
    }
}

impl Ord for VersionTag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components
            .cmp(&other.components)
            .then_with(|| match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => compare_prerelease(a, b),
            })
    }
}

impl PartialOrd for VersionTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for VersionTag {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VersionTag {}

impl Hash for VersionTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.components.hash(state);
        // Numeric prerelease identifiers compare without leading zeros.
        if let Some(pre) = &self.prerelease {
            for ident in pre.split('.') {
                if ident.bytes().all(|b| b.is_ascii_digit()) {
                    ident.trim_start_matches('0').hash(state);
                } else {
                    ident.hash(state);
                }
            }
        }
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for VersionTag {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionTag {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<VersionTag> for String {
    fn from(value: VersionTag) -> Self {
        value.to_string()
    }
}
