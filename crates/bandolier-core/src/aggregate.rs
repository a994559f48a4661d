use crate::identity::WorkloadVersion;
use crate::policy::{DeferredError, Selection};
use crate::readable::ReadableManifest;
use crate::CoreError;
use bandolier_schema::{FeatureBand, ManifestId};
use bandolier_store::{
    sorted_subdirectories, KnownManifests, ManifestDirectoryProbe, ManifestRoots, ProbedManifest,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Best-effort result of one aggregation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionOutcome {
    pub manifests: Vec<ReadableManifest>,
    /// Set when a global.json pin names an uninstalled workload set.
    pub deferred_error: Option<DeferredError>,
    pub workload_version: WorkloadVersion,
}

impl ResolutionOutcome {
    /// The manifests, or the deferred error if there is one.
    pub fn into_manifests(self) -> Result<Vec<ReadableManifest>, CoreError> {
        match self.deferred_error {
            Some(deferred) => Err(deferred.to_error()),
            None => Ok(self.manifests),
        }
    }
}

/// Merges directory probing, the active workload set, install-state overrides
/// and the known-manifest fallback into one list with one entry per id.
pub struct ManifestAggregator<'a> {
    band: &'a FeatureBand,
    roots: &'a ManifestRoots,
    probe: &'a ManifestDirectoryProbe,
    selection: &'a Selection,
    known: Option<&'a KnownManifests>,
}

impl<'a> ManifestAggregator<'a> {
    pub fn new(
        band: &'a FeatureBand,
        roots: &'a ManifestRoots,
        probe: &'a ManifestDirectoryProbe,
        selection: &'a Selection,
    ) -> Self {
        Self {
            band,
            roots,
            probe,
            selection,
            known: None,
        }
    }

    #[must_use]
    pub fn with_known(mut self, known: Option<&'a KnownManifests>) -> Self {
        self.known = known;
        self
    }

    pub fn collect(&self) -> Result<ResolutionOutcome, CoreError> {
        let mut by_id: HashMap<ManifestId, ReadableManifest> = HashMap::new();

        for candidates in self.baseline_candidates()? {
            for dir in candidates {
                if let Some(probed) = self.probe.resolve(&dir)? {
                    let manifest = readable_from_probe(probed, self.band);
                    trace!(
                        "probed {} at {}",
                        manifest.manifest_id,
                        manifest.manifest_directory.display()
                    );
                    by_id.insert(manifest.manifest_id.clone(), manifest);
                    break;
                }
            }
        }

        if let Some(active) = &self.selection.workload_set {
            for spec in active.set.specifiers() {
                let directory = self.roots.find_specified(&spec).ok_or_else(|| {
                    CoreError::ManifestFromWorkloadSetNotFound {
                        specifier: spec.to_string(),
                        workload_set_version: active.set.version.clone(),
                    }
                })?;
                let manifest = ReadableManifest::new(
                    spec.id.clone(),
                    directory,
                    spec.feature_band.clone(),
                    Some(spec.version.to_string()),
                );
                by_id.insert(spec.id, manifest);
            }
        }

        if let Some(overrides) = &self.selection.install_state_overrides {
            for spec in overrides.manifests.specifiers() {
                let directory = self.roots.find_specified(&spec).ok_or_else(|| {
                    CoreError::ManifestFromInstallStateNotFound {
                        specifier: spec.to_string(),
                        path: overrides.path.clone(),
                    }
                })?;
                let manifest = ReadableManifest::new(
                    spec.id.clone(),
                    directory,
                    spec.feature_band.clone(),
                    Some(spec.version.to_string()),
                );
                by_id.insert(spec.id, manifest);
            }
        }

        if let Some(known) = self.known {
            for id in known.ids() {
                if by_id.contains_key(id) {
                    continue;
                }
                match self.fallback(id)? {
                    Some(manifest) => {
                        debug!(
                            "manifest {id} not in band {}, using band {}",
                            self.band, manifest.feature_band
                        );
                        by_id.insert(id.clone(), manifest);
                    }
                    None => debug!("known manifest {id} is not installed"),
                }
            }
        }

        let mut manifests: Vec<ReadableManifest> = by_id.into_values().collect();
        manifests.sort_by(|a, b| {
            let position = |m: &ReadableManifest| {
                self.known
                    .and_then(|k| k.position(&m.manifest_id))
                    .unwrap_or(usize::MAX)
            };
            position(a)
                .cmp(&position(b))
                .then_with(|| a.manifest_id.cmp(&b.manifest_id))
        });

        let workload_version = WorkloadVersion::from_selection(self.selection, self.band)
            .unwrap_or_else(|| WorkloadVersion::loose(self.band, &manifests));

        Ok(ResolutionOutcome {
            manifests,
            deferred_error: self.selection.deferred.clone(),
            workload_version,
        })
    }

    /// Manifest directories of this band grouped by name, highest-priority root first.
    ///
    /// The first directory in a group that resolves is used; versions are not
    /// compared across roots.
    fn baseline_candidates(&self) -> Result<Vec<Vec<PathBuf>>, CoreError> {
        let mut by_name: BTreeMap<ManifestId, Vec<PathBuf>> = BTreeMap::new();
        for root in self.roots {
            for dir in sorted_subdirectories(&ManifestRoots::band_dir(root, self.band))? {
                if let Some(name) = dir.file_name().and_then(|n| n.to_str()) {
                    by_name.entry(ManifestId::new(name)).or_default().push(dir);
                }
            }
        }
        Ok(by_name.into_values().collect())
    }

    /// Search older bands of the lowest-priority root for a manifest missing from this band.
    fn fallback(&self, id: &ManifestId) -> Result<Option<ReadableManifest>, CoreError> {
        let Some(root) = self.roots.lowest_priority() else {
            return Ok(None);
        };
        let current_release = self.band.without_prerelease();
        let mut candidates: Vec<(FeatureBand, PathBuf)> = band_directories(root)?
            .into_iter()
            .filter(|(band, _)| band.is_older_release_than(self.band) || *band == current_release)
            .collect();
        candidates.sort_by(|(a, _), (b, _)| b.cmp(a));

        for (band, band_dir) in candidates {
            if let Some(probed) = self.probe.resolve(&band_dir.join(id.as_str()))? {
                return Ok(Some(readable_from_probe(probed, &band)));
            }
        }
        Ok(None)
    }
}

/// Band directories under `root`; names that do not parse as a band are skipped.
fn band_directories(root: &Path) -> Result<Vec<(FeatureBand, PathBuf)>, CoreError> {
    Ok(sorted_subdirectories(root)?
        .into_iter()
        .filter_map(|dir| {
            let band = FeatureBand::parse(dir.file_name()?.to_str()?).ok()?;
            Some((band, dir))
        })
        .collect())
}

fn readable_from_probe(probed: ProbedManifest, band: &FeatureBand) -> ReadableManifest {
    let version = probed.version.as_ref().map(ToString::to_string);
    ReadableManifest::new(probed.id, probed.directory, band.clone(), version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::VersionKind;
    use crate::policy::{ActiveWorkloadSet, InstallStateOverrides, PinSource};
    use bandolier_schema::WorkloadSet;
    use bandolier_store::WORKLOAD_MANIFEST_FILE;
    use std::fs;

    fn band(s: &str) -> FeatureBand {
        FeatureBand::parse(s).unwrap()
    }

    fn write_manifest(dir: &Path, version: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join(WORKLOAD_MANIFEST_FILE),
            format!(r#"{{"version": "{version}"}}"#),
        )
        .unwrap();
    }

    fn ids(outcome: &ResolutionOutcome) -> Vec<String> {
        outcome
            .manifests
            .iter()
            .map(|m| m.manifest_id.to_string())
            .collect()
    }

    fn set_with(version: &str, b: &FeatureBand, entries: &[(&str, &str)]) -> WorkloadSet {
        let map = entries
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        WorkloadSet::from_manifest_map(version, b.clone(), &map, Path::new("test")).unwrap()
    }

    #[test]
    fn single_root_probes_every_directory() {
        let root = tempfile::tempdir().unwrap();
        write_manifest(&root.path().join("8.0.100").join("Beta").join("2.0.0"), "2.0.0");
        write_manifest(&root.path().join("8.0.100").join("alpha"), "1.0.0");
        fs::create_dir_all(root.path().join("8.0.100").join("Empty")).unwrap();

        let roots = ManifestRoots::new(vec![root.path().to_path_buf()]);
        let b = band("8.0.100");
        let probe = ManifestDirectoryProbe::default();
        let selection = Selection::default();
        let outcome = ManifestAggregator::new(&b, &roots, &probe, &selection)
            .collect()
            .unwrap();
        assert_eq!(ids(&outcome), vec!["alpha", "Beta"]);
        assert_eq!(outcome.manifests[1].version.as_deref(), Some("2.0.0"));
        assert_eq!(outcome.workload_version.kind, VersionKind::LooseManifests);
        assert!(outcome.deferred_error.is_none());
    }

    #[test]
    fn higher_priority_root_shadows_by_directory_name() {
        let high = tempfile::tempdir().unwrap();
        let low = tempfile::tempdir().unwrap();
        write_manifest(&high.path().join("8.0.100").join("X").join("1.0.0"), "1.0.0");
        write_manifest(&low.path().join("8.0.100").join("x").join("9.0.0"), "9.0.0");
        write_manifest(&low.path().join("8.0.100").join("Y").join("1.0.0"), "1.0.0");

        let roots = ManifestRoots::new(vec![high.path().to_path_buf(), low.path().to_path_buf()]);
        let b = band("8.0.100");
        let probe = ManifestDirectoryProbe::default();
        let selection = Selection::default();
        let outcome = ManifestAggregator::new(&b, &roots, &probe, &selection)
            .collect()
            .unwrap();
        assert_eq!(outcome.manifests.len(), 2);
        let x = &outcome.manifests[0];
        assert_eq!(x.version.as_deref(), Some("1.0.0"));
        assert!(x.manifest_directory.starts_with(high.path()));
    }

    #[test]
    fn unresolvable_high_priority_directory_falls_through() {
        let high = tempfile::tempdir().unwrap();
        let low = tempfile::tempdir().unwrap();
        fs::create_dir_all(high.path().join("8.0.100").join("X")).unwrap();
        write_manifest(&low.path().join("8.0.100").join("X").join("2.0.0"), "2.0.0");

        let roots = ManifestRoots::new(vec![high.path().to_path_buf(), low.path().to_path_buf()]);
        let b = band("8.0.100");
        let probe = ManifestDirectoryProbe::default();
        let selection = Selection::default();
        let outcome = ManifestAggregator::new(&b, &roots, &probe, &selection)
            .collect()
            .unwrap();
        assert_eq!(outcome.manifests.len(), 1);
        assert!(outcome.manifests[0].manifest_directory.starts_with(low.path()));
    }

    #[test]
    fn unreadable_flat_manifest_has_unknown_version() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("8.0.100").join("Contoso.Flat");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(WORKLOAD_MANIFEST_FILE), "{ not json").unwrap();

        let roots = ManifestRoots::new(vec![root.path().to_path_buf()]);
        let b = band("8.0.100");
        let probe = ManifestDirectoryProbe::default();
        let selection = Selection::default();
        let outcome = ManifestAggregator::new(&b, &roots, &probe, &selection)
            .collect()
            .unwrap();
        let flat = &outcome.manifests[0];
        assert_eq!(flat.manifest_directory, dir);
        assert_eq!(flat.version, None);
        assert_eq!(flat.identity_key(), "Contoso.Flat.8.0.100.unknown");
    }

    #[test]
    fn workload_set_overrides_probed_version() {
        let root = tempfile::tempdir().unwrap();
        let band_dir = root.path().join("8.0.200");
        write_manifest(&band_dir.join("X").join("1.0.0"), "1.0.0");
        write_manifest(&band_dir.join("X").join("2.0.0"), "2.0.0");

        let roots = ManifestRoots::new(vec![root.path().to_path_buf()]);
        let b = band("8.0.200");
        let probe = ManifestDirectoryProbe::default();
        let selection = Selection {
            workload_set: Some(ActiveWorkloadSet {
                set: set_with("8.0.201", &b, &[("X", "1.0.0")]),
                source: PinSource::LatestAvailable,
            }),
            ..Selection::default()
        };
        let outcome = ManifestAggregator::new(&b, &roots, &probe, &selection)
            .collect()
            .unwrap();
        assert_eq!(outcome.manifests.len(), 1);
        assert_eq!(outcome.manifests[0].version.as_deref(), Some("1.0.0"));
        assert_eq!(outcome.workload_version.version, "8.0.201");
    }

    #[test]
    fn missing_workload_set_manifest_is_fatal() {
        let root = tempfile::tempdir().unwrap();
        let roots = ManifestRoots::new(vec![root.path().to_path_buf()]);
        let b = band("8.0.200");
        let probe = ManifestDirectoryProbe::default();
        let selection = Selection {
            workload_set: Some(ActiveWorkloadSet {
                set: set_with("8.0.201", &b, &[("X", "3.0.0")]),
                source: PinSource::Explicit,
            }),
            ..Selection::default()
        };
        let err = ManifestAggregator::new(&b, &roots, &probe, &selection)
            .collect()
            .unwrap_err();
        match err {
            CoreError::ManifestFromWorkloadSetNotFound {
                specifier,
                workload_set_version,
            } => {
                assert_eq!(specifier, "X: 3.0.0/8.0.200");
                assert_eq!(workload_set_version, "8.0.201");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn install_state_overrides_can_point_to_other_band() {
        let root = tempfile::tempdir().unwrap();
        write_manifest(&root.path().join("8.0.200").join("X").join("2.0.0"), "2.0.0");
        write_manifest(&root.path().join("8.0.100").join("X").join("1.5.0"), "1.5.0");

        let roots = ManifestRoots::new(vec![root.path().to_path_buf()]);
        let b = band("8.0.200");
        let probe = ManifestDirectoryProbe::default();
        let selection = Selection {
            install_state_overrides: Some(InstallStateOverrides {
                manifests: set_with("install-state", &b, &[("X", "1.5.0/8.0.100")]),
                path: PathBuf::from("/state/default.json"),
            }),
            ..Selection::default()
        };
        let outcome = ManifestAggregator::new(&b, &roots, &probe, &selection)
            .collect()
            .unwrap();
        let x = &outcome.manifests[0];
        assert_eq!(x.version.as_deref(), Some("1.5.0"));
        assert_eq!(x.feature_band, band("8.0.100"));
    }

    #[test]
    fn known_manifest_falls_back_to_older_band() {
        let root = tempfile::tempdir().unwrap();
        write_manifest(&root.path().join("8.0.300").join("A").join("3.0.0"), "3.0.0");
        write_manifest(&root.path().join("8.0.100").join("B").join("1.0.0"), "1.0.0");
        write_manifest(&root.path().join("8.0.200").join("B").join("2.0.0"), "2.0.0");
        write_manifest(&root.path().join("8.0.400").join("B").join("4.0.0"), "4.0.0");

        let roots = ManifestRoots::new(vec![root.path().to_path_buf()]);
        let b = band("8.0.300");
        let probe = ManifestDirectoryProbe::default();
        let selection = Selection::default();
        let known = KnownManifests::parse("B\nA\nMissing\n");
        let outcome = ManifestAggregator::new(&b, &roots, &probe, &selection)
            .with_known(Some(&known))
            .collect()
            .unwrap();
        assert_eq!(ids(&outcome), vec!["B", "A"]);
        assert_eq!(outcome.manifests[0].version.as_deref(), Some("2.0.0"));
        assert_eq!(outcome.manifests[0].feature_band, band("8.0.200"));
    }

    #[test]
    fn prerelease_band_falls_back_to_its_release_band() {
        let root = tempfile::tempdir().unwrap();
        write_manifest(&root.path().join("9.0.100").join("B").join("1.0.0"), "1.0.0");
        write_manifest(&root.path().join("9.0.100-preview").join("A").join("1.0.0"), "1.0.0");

        let roots = ManifestRoots::new(vec![root.path().to_path_buf()]);
        let b = band("9.0.100-preview.5");
        let probe = ManifestDirectoryProbe::default();
        let selection = Selection::default();
        let known = KnownManifests::parse("A\nB\n");
        let outcome = ManifestAggregator::new(&b, &roots, &probe, &selection)
            .with_known(Some(&known))
            .collect()
            .unwrap();
        assert_eq!(ids(&outcome), vec!["A", "B"]);
        assert_eq!(outcome.manifests[1].feature_band, band("9.0.100"));
    }

    #[test]
    fn unknown_ids_sort_after_known_ids() {
        let root = tempfile::tempdir().unwrap();
        for id in ["zeta", "Alpha", "Known"] {
            write_manifest(&root.path().join("8.0.100").join(id).join("1.0.0"), "1.0.0");
        }
        let roots = ManifestRoots::new(vec![root.path().to_path_buf()]);
        let b = band("8.0.100");
        let probe = ManifestDirectoryProbe::default();
        let selection = Selection::default();
        let known = KnownManifests::parse("Known\n");
        let outcome = ManifestAggregator::new(&b, &roots, &probe, &selection)
            .with_known(Some(&known))
            .collect()
            .unwrap();
        assert_eq!(ids(&outcome), vec!["Known", "Alpha", "zeta"]);
    }

    #[test]
    fn deferred_error_is_carried_and_raised_on_demand() {
        let root = tempfile::tempdir().unwrap();
        let roots = ManifestRoots::new(vec![root.path().to_path_buf()]);
        let b = band("8.0.100");
        let probe = ManifestDirectoryProbe::default();
        let selection = Selection {
            deferred: Some(DeferredError {
                version: "8.0.199".to_owned(),
                global_json_path: PathBuf::from("/w/global.json"),
            }),
            ..Selection::default()
        };
        let outcome = ManifestAggregator::new(&b, &roots, &probe, &selection)
            .collect()
            .unwrap();
        assert!(outcome.deferred_error.is_some());
        assert!(matches!(
            outcome.into_manifests(),
            Err(CoreError::GlobalJsonWorkloadSetNotFound { .. })
        ));
    }
}
