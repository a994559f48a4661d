use crate::layout::{ManifestRoots, BASELINE_WORKLOAD_SET_FILE, WORKLOAD_SET_FILE_SUFFIX};
use crate::{sorted_subdirectories, StoreError};
use bandolier_schema::{FeatureBand, VersionTag, WorkloadSet};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Enumerates the workload sets installed for a feature band across all manifest roots.
pub struct WorkloadSetCatalog<'a> {
    roots: &'a ManifestRoots,
}

impl<'a> WorkloadSetCatalog<'a> {
    pub fn new(roots: &'a ManifestRoots) -> Self {
        Self { roots }
    }

    /// All workload sets under `<root>/<band>/workloadsets/<version>/`, keyed by version string.
    ///
    /// Roots are visited lowest priority first so that a higher-priority root
    /// overwrites any same-versioned set found earlier. No lookup crosses into
    /// another band.
    pub fn available(
        &self,
        band: &FeatureBand,
    ) -> Result<BTreeMap<String, WorkloadSet>, StoreError> {
        let mut sets = BTreeMap::new();
        for root in self.roots.iter().rev() {
            let sets_dir = ManifestRoots::workload_sets_dir(root, band);
            for dir in sorted_subdirectories(&sets_dir)? {
                let Some(version) = dir.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if let Err(e) = VersionTag::parse(version) {
                    debug!("skipping workload set folder {}: {e}", dir.display());
                    continue;
                }
                if let Some(set) = read_workload_set_folder(&dir, version, band)? {
                    sets.insert(version.to_owned(), set);
                }
            }
        }
        Ok(sets)
    }
}

/// Read every `*.workloadset.json` in `dir` into one set.
///
/// A folder without any such document is not a workload set and yields `None`.
pub fn read_workload_set_folder(
    dir: &Path,
    version: &str,
    band: &FeatureBand,
) -> Result<Option<WorkloadSet>, StoreError> {
    let mut documents = Vec::new();
    for entry in fs::read_dir(dir).map_err(StoreError::io(dir))? {
        let path = entry.map_err(StoreError::io(dir))?.path();
        let is_document = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.to_ascii_lowercase().ends_with(WORKLOAD_SET_FILE_SUFFIX));
        if is_document && path.is_file() {
            documents.push(path);
        }
    }
    if documents.is_empty() {
        debug!("no workload set documents in {}", dir.display());
        return Ok(None);
    }
    documents.sort();

    let mut set = WorkloadSet::new(version, band.clone());
    for path in &documents {
        let content = fs::read_to_string(path).map_err(StoreError::io(path))?;
        set.add_document(&content, path)?;
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.eq_ignore_ascii_case(BASELINE_WORKLOAD_SET_FILE))
        {
            set.is_baseline = true;
        }
    }
    Ok(Some(set))
}

/// The set with the highest parsed version; equal versions fall back to the version string.
pub fn latest_workload_set(sets: &BTreeMap<String, WorkloadSet>) -> Option<&WorkloadSet> {
    sets.iter()
        .filter_map(|(key, set)| Some((VersionTag::parse(key).ok()?, key, set)))
        .max_by(|(a, a_key, _), (b, b_key, _)| a.cmp(b).then_with(|| a_key.cmp(b_key)))
        .map(|(_, _, set)| set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::WORKLOAD_SETS_DIR;
    use bandolier_schema::ManifestId;
    use std::path::PathBuf;

    fn band(s: &str) -> FeatureBand {
        FeatureBand::parse(s).unwrap()
    }

    fn write_set(root: &Path, band: &str, version: &str, body: &str) -> PathBuf {
        let dir = root.join(band).join(WORKLOAD_SETS_DIR).join(version);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("microsoft.net.workloads.workloadset.json"), body).unwrap();
        dir
    }

    #[test]
    fn lists_sets_for_band_only() {
        let root = tempfile::tempdir().unwrap();
        write_set(root.path(), "8.0.200", "8.0.201", r#"{"X": "1.0.0"}"#);
        write_set(root.path(), "8.0.200", "8.0.202", r#"{"X": "1.0.1"}"#);
        write_set(root.path(), "8.0.300", "8.0.300", r#"{"X": "2.0.0"}"#);

        let roots = ManifestRoots::new(vec![root.path().to_path_buf()]);
        let sets = WorkloadSetCatalog::new(&roots).available(&band("8.0.200")).unwrap();
        let versions: Vec<&String> = sets.keys().collect();
        assert_eq!(versions, vec!["8.0.201", "8.0.202"]);
        assert_eq!(sets["8.0.201"].feature_band, band("8.0.200"));
    }

    #[test]
    fn higher_priority_root_wins_for_same_version() {
        let high = tempfile::tempdir().unwrap();
        let low = tempfile::tempdir().unwrap();
        write_set(high.path(), "8.0.100", "1.2.3", r#"{"X": "9.9.9"}"#);
        write_set(low.path(), "8.0.100", "1.2.3", r#"{"X": "1.1.1"}"#);

        let roots = ManifestRoots::new(vec![high.path().to_path_buf(), low.path().to_path_buf()]);
        let sets = WorkloadSetCatalog::new(&roots).available(&band("8.0.100")).unwrap();
        let pinned = &sets["1.2.3"].manifest_versions[&ManifestId::new("X")];
        assert_eq!(pinned.version.to_string(), "9.9.9");
    }

    #[test]
    fn folders_without_documents_or_version_names_are_skipped() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(
            root.path()
                .join("8.0.100")
                .join(WORKLOAD_SETS_DIR)
                .join("8.0.101"),
        )
        .unwrap();
        write_set(root.path(), "8.0.100", "scratch", r#"{"X": "1.0.0"}"#);

        let roots = ManifestRoots::new(vec![root.path().to_path_buf()]);
        let sets = WorkloadSetCatalog::new(&roots).available(&band("8.0.100")).unwrap();
        assert!(sets.is_empty());
    }

    #[test]
    fn documents_in_one_folder_are_merged_and_baseline_flagged() {
        let root = tempfile::tempdir().unwrap();
        let dir = write_set(root.path(), "8.0.100", "8.0.101", r#"{"A": "1.0.0"}"#);
        fs::write(dir.join(BASELINE_WORKLOAD_SET_FILE), r#"{"B": "2.0.0/8.0.100"}"#).unwrap();

        let set = read_workload_set_folder(&dir, "8.0.101", &band("8.0.100"))
            .unwrap()
            .unwrap();
        assert_eq!(set.manifest_versions.len(), 2);
        assert!(set.is_baseline);
    }

    #[test]
    fn malformed_document_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        write_set(root.path(), "8.0.100", "8.0.101", "{ nope");
        let roots = ManifestRoots::new(vec![root.path().to_path_buf()]);
        assert!(WorkloadSetCatalog::new(&roots).available(&band("8.0.100")).is_err());
    }

    #[test]
    fn latest_uses_version_ordering_not_string_ordering() {
        let root = tempfile::tempdir().unwrap();
        for v in ["8.0.109", "8.0.110", "8.0.110-preview.1"] {
            write_set(root.path(), "8.0.100", v, r#"{"X": "1.0.0"}"#);
        }
        let roots = ManifestRoots::new(vec![root.path().to_path_buf()]);
        let sets = WorkloadSetCatalog::new(&roots).available(&band("8.0.100")).unwrap();
        assert_eq!(latest_workload_set(&sets).unwrap().version, "8.0.110");
        assert!(latest_workload_set(&BTreeMap::new()).is_none());
    }
}
