use crate::CoreError;
use bandolier_schema::{
    read_workload_version, workload_set_feature_band, FeatureBand, InstallState, WorkloadSet,
};
use bandolier_store::{latest_workload_set, ManifestRoots, WorkloadSetCatalog};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where the active workload set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PinSource {
    Explicit,
    GlobalJson,
    InstallState,
    LatestAvailable,
}

impl fmt::Display for PinSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Explicit => "explicit",
            Self::GlobalJson => "global.json",
            Self::InstallState => "install state",
            Self::LatestAvailable => "latest available",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveWorkloadSet {
    pub set: WorkloadSet,
    pub source: PinSource,
}

/// Explicit manifest map from the install-state file, layered over directory probing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallStateOverrides {
    pub manifests: WorkloadSet,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalJsonPin {
    pub path: PathBuf,
    pub version: String,
}

/// A global.json pin that names a workload set which is not installed.
///
/// Recorded instead of raised so callers installing the pinned version can
/// still read the best-effort manifest set; the strict accessors turn it into
/// [`CoreError::GlobalJsonWorkloadSetNotFound`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeferredError {
    pub version: String,
    pub global_json_path: PathBuf,
}

impl DeferredError {
    pub fn to_error(&self) -> CoreError {
        CoreError::GlobalJsonWorkloadSetNotFound {
            version: self.version.clone(),
            path: self.global_json_path.clone(),
        }
    }
}

impl fmt::Display for DeferredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_error())
    }
}

/// Outcome of the pin policy, computed once per resolver and reused until refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub workload_set: Option<ActiveWorkloadSet>,
    pub install_state_overrides: Option<InstallStateOverrides>,
    pub global_json_pin: Option<GlobalJsonPin>,
    pub deferred: Option<DeferredError>,
    pub install_state: Option<InstallState>,
}

impl Selection {
    pub fn active_set(&self) -> Option<&WorkloadSet> {
        self.workload_set.as_ref().map(|a| &a.set)
    }
}

/// Decides which workload set, if any, drives resolution.
///
/// Sources are tried in order and the first match wins:
///
/// 1. an explicit version from the caller (fatal when missing)
/// 2. a `sdk.workloadVersion` pin in global.json (deferred when missing)
/// 3. the install-state file's `workloadVersion` (fatal when missing)
/// 4. the highest workload set installed for the band
///
/// The install-state file is read whenever it exists. Its `workloadVersion`
/// only applies when neither 1 nor 2 pinned a version, but its manifest map is
/// always layered over the active set.
pub struct ResolutionPolicy<'a> {
    band: &'a FeatureBand,
    catalog: WorkloadSetCatalog<'a>,
    explicit_version: Option<&'a str>,
    global_json_path: Option<&'a Path>,
    install_state_path: &'a Path,
}

impl<'a> ResolutionPolicy<'a> {
    pub fn new(
        band: &'a FeatureBand,
        roots: &'a ManifestRoots,
        install_state_path: &'a Path,
    ) -> Self {
        Self {
            band,
            catalog: WorkloadSetCatalog::new(roots),
            explicit_version: None,
            global_json_path: None,
            install_state_path,
        }
    }

    #[must_use]
    pub fn with_explicit_version(mut self, version: Option<&'a str>) -> Self {
        self.explicit_version = version;
        self
    }

    #[must_use]
    pub fn with_global_json(mut self, path: Option<&'a Path>) -> Self {
        self.global_json_path = path;
        self
    }

    pub fn select(&self) -> Result<Selection, CoreError> {
        let available = self.catalog.available(self.band)?;
        debug!(
            "{} workload set(s) available for band {}",
            available.len(),
            self.band
        );
        let mut selection = Selection::default();

        if let Some(version) = self.explicit_version {
            let set = self
                .find(&available, version)?
                .ok_or_else(|| CoreError::WorkloadSetNotFound {
                    version: version.to_owned(),
                })?;
            info!("using workload set {} (explicit)", set.version);
            selection.workload_set = Some(ActiveWorkloadSet {
                set,
                source: PinSource::Explicit,
            });
        } else if let Some(path) = self.global_json_path {
            if let Some(version) = read_workload_version(path)? {
                match self.find(&available, &version)? {
                    Some(set) => {
                        info!("using workload set {} from {}", set.version, path.display());
                        selection.workload_set = Some(ActiveWorkloadSet {
                            set,
                            source: PinSource::GlobalJson,
                        });
                    }
                    None => {
                        warn!(
                            "workload set {version} pinned by {} is not installed",
                            path.display()
                        );
                        selection.deferred = Some(DeferredError {
                            version: version.clone(),
                            global_json_path: path.to_path_buf(),
                        });
                    }
                }
                selection.global_json_pin = Some(GlobalJsonPin {
                    path: path.to_path_buf(),
                    version,
                });
            }
        }

        if self.install_state_path.is_file() {
            let state = InstallState::from_path(self.install_state_path)?;
            let pinned = self.explicit_version.is_some() || selection.global_json_pin.is_some();
            match state.pinned_workload_version() {
                Some(version) if pinned => {
                    debug!("install state pin {version} is overridden by a higher-priority pin");
                }
                Some(version) => {
                    let set = self.find(&available, version)?.ok_or_else(|| {
                        CoreError::InstallStateWorkloadSetNotFound {
                            version: version.to_owned(),
                            path: self.install_state_path.to_path_buf(),
                        }
                    })?;
                    info!("using workload set {} from install state", set.version);
                    selection.workload_set = Some(ActiveWorkloadSet {
                        set,
                        source: PinSource::InstallState,
                    });
                }
                None => {}
            }
            selection.install_state_overrides = state
                .manifest_overrides(self.band, self.install_state_path)?
                .map(|manifests| InstallStateOverrides {
                    manifests,
                    path: self.install_state_path.to_path_buf(),
                });
            selection.install_state = Some(state);
        }

        if selection.workload_set.is_none() {
            if let Some(set) = latest_workload_set(&available) {
                debug!("using latest installed workload set {}", set.version);
                selection.workload_set = Some(ActiveWorkloadSet {
                    set: set.clone(),
                    source: PinSource::LatestAvailable,
                });
            }
        }

        Ok(selection)
    }

    /// Look `version` up in this band, then in the band the version itself encodes.
    fn find(
        &self,
        available: &BTreeMap<String, WorkloadSet>,
        version: &str,
    ) -> Result<Option<WorkloadSet>, CoreError> {
        if let Some(set) = available.get(version) {
            return Ok(Some(set.clone()));
        }
        let own_band = match workload_set_feature_band(version) {
            Ok(band) => band,
            Err(e) => {
                debug!("workload set version {version} encodes no band: {e}");
                return Ok(None);
            }
        };
        if own_band == *self.band {
            return Ok(None);
        }
        debug!("looking for workload set {version} in band {own_band}");
        Ok(self.catalog.available(&own_band)?.remove(version))
    }
}
