use crate::CoreError;
use bandolier_schema::{find_global_json, FeatureBand, VersionTag};
use bandolier_store::{workload_metadata_dir, ManifestDirectoryProbe, ManifestRoots, SdkLayout};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extra manifest roots, highest priority first, in the platform's path-list syntax.
pub const MANIFEST_ROOTS_ENV: &str = "DOTNETSDK_WORKLOAD_MANIFEST_ROOTS";
/// Any non-empty value drops the SDK and user-local default roots.
pub const IGNORE_DEFAULT_ROOTS_ENV: &str = "DOTNETSDK_WORKLOAD_MANIFEST_IGNORE_DEFAULT_ROOTS";
/// Default name of the optional TOML file the CLI reads options from.
pub const CONFIG_FILE: &str = "bandolier.toml";

/// Inputs to a `WorkloadResolver`.
///
/// Can be built in code, read from a TOML file, or both. Environment
/// variables are applied explicitly through [`ResolverOptions::with_environment`]
/// or [`ResolverOptions::with_env_lookup`] so tests never touch process state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverOptions {
    pub sdk_root: PathBuf,
    pub sdk_version: String,
    pub user_profile_dir: Option<PathBuf>,
    pub global_json_path: Option<PathBuf>,
    pub workload_set_version: Option<String>,
    /// Additional roots, searched after environment roots and before the defaults.
    pub manifest_roots: Vec<PathBuf>,
    pub ignore_default_roots: bool,
    /// Replaces the built-in outdated manifest id list when set.
    pub outdated_manifest_ids: Option<Vec<String>>,
    #[serde(skip)]
    pub environment_roots: Vec<PathBuf>,
}

impl ResolverOptions {
    pub fn new(sdk_root: impl Into<PathBuf>, sdk_version: impl Into<String>) -> Self {
        Self {
            sdk_root: sdk_root.into(),
            sdk_version: sdk_version.into(),
            ..Self::default()
        }
    }

    /// Parse options from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, CoreError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path).map_err(|source| CoreError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("loaded resolver options from {}", path.display());
        Self::from_toml_str(&content)
    }

    #[must_use]
    pub fn with_user_profile(mut self, dir: impl Into<PathBuf>) -> Self {
        self.user_profile_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_global_json(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_json_path = Some(path.into());
        self
    }

    /// Use the nearest `global.json` at or above `start`, if any.
    #[must_use]
    pub fn with_global_json_from(mut self, start: &Path) -> Self {
        self.global_json_path = find_global_json(start);
        match &self.global_json_path {
            Some(path) => debug!("found {}", path.display()),
            None => debug!("no global.json at or above {}", start.display()),
        }
        self
    }

    #[must_use]
    pub fn with_workload_set_version(mut self, version: impl Into<String>) -> Self {
        self.workload_set_version = Some(version.into());
        self
    }

    #[must_use]
    pub fn with_manifest_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.manifest_roots.push(root.into());
        self
    }

    #[must_use]
    pub fn with_ignore_default_roots(mut self, ignore: bool) -> Self {
        self.ignore_default_roots = ignore;
        self
    }

    #[must_use]
    pub fn with_outdated_manifest_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outdated_manifest_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Apply the manifest-root environment variables of the current process.
    #[must_use]
    pub fn with_environment(self) -> Self {
        self.with_env_lookup(|key| std::env::var_os(key))
    }

    /// Apply the manifest-root environment variables through `lookup`.
    #[must_use]
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        if let Some(value) = lookup(MANIFEST_ROOTS_ENV) {
            self.environment_roots = std::env::split_paths(&value)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
            debug!(
                "{MANIFEST_ROOTS_ENV} adds {} manifest root(s)",
                self.environment_roots.len()
            );
        }
        if lookup(IGNORE_DEFAULT_ROOTS_ENV).is_some_and(|v| !v.is_empty()) {
            self.ignore_default_roots = true;
        }
        self
    }

    /// Argument checks that need no filesystem access. Returns the parsed SDK version.
    pub fn validate(&self) -> Result<VersionTag, CoreError> {
        if self.sdk_root.as_os_str().is_empty() {
            return Err(CoreError::InvalidArgument(
                "sdk root must not be empty".to_owned(),
            ));
        }
        if self.sdk_version.trim().is_empty() {
            return Err(CoreError::InvalidArgument(
                "sdk version must not be empty".to_owned(),
            ));
        }
        let sdk_version = VersionTag::parse(self.sdk_version.trim())
            .map_err(|e| CoreError::InvalidArgument(e.to_string()))?;

        if let Some(version) = &self.workload_set_version {
            if self.global_json_path.is_some() {
                return Err(CoreError::InvalidArgument(
                    "an explicit workload set version cannot be combined with a global.json path"
                        .to_owned(),
                ));
            }
            if version.trim().is_empty() {
                return Err(CoreError::InvalidArgument(
                    "workload set version must not be empty".to_owned(),
                ));
            }
        }
        Ok(sdk_version)
    }

    /// Manifest roots in priority order: environment, explicit, user-local, SDK default.
    pub fn manifest_roots(&self, layout: &SdkLayout, band: &FeatureBand) -> ManifestRoots {
        let mut roots = self.environment_roots.clone();
        roots.extend(self.manifest_roots.iter().cloned());
        if self.ignore_default_roots {
            debug!("default manifest roots ignored");
        } else {
            if let Some(profile) = self.user_local_profile(layout, band) {
                roots.push(profile.join(bandolier_store::SDK_MANIFESTS_DIR));
            }
            roots.push(layout.manifests_root());
        }
        ManifestRoots::new(roots)
    }

    /// `<sdk_root or user_profile>/metadata/workloads`, the parent of per-band install state.
    pub fn install_state_root(&self, layout: &SdkLayout, band: &FeatureBand) -> PathBuf {
        match self.user_local_profile(layout, band) {
            Some(profile) => workload_metadata_dir(profile),
            None => layout.workload_metadata_dir(),
        }
    }

    pub fn probe(&self) -> ManifestDirectoryProbe {
        match &self.outdated_manifest_ids {
            Some(ids) => ManifestDirectoryProbe::new(ids.iter().map(String::as_str)),
            None => ManifestDirectoryProbe::default(),
        }
    }

    fn user_local_profile(&self, layout: &SdkLayout, band: &FeatureBand) -> Option<&Path> {
        if !layout.is_user_local(band) {
            return None;
        }
        let profile = self.user_profile_dir.as_deref();
        if profile.is_none() {
            warn!(
                "band {band} is marked user-local but no user profile directory was given; using the sdk root"
            );
        }
        profile
    }
}
