use crate::layout::SdkLayout;
use crate::StoreError;
use bandolier_schema::ManifestId;
use std::collections::HashMap;
use std::fs;
use tracing::debug;

/// The SDK-shipped list of expected manifest ids, in file order.
///
/// Drives both the fallback search for missing manifests and the order in
/// which resolved manifests are handed to consumers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownManifests {
    ids: Vec<ManifestId>,
    positions: HashMap<ManifestId, usize>,
}

impl KnownManifests {
    /// One id per line; blank lines are ignored and repeated ids keep their first position.
    pub fn parse(content: &str) -> Self {
        let mut known = Self::default();
        for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let id = ManifestId::new(line);
            if !known.positions.contains_key(&id) {
                known.positions.insert(id.clone(), known.ids.len());
                known.ids.push(id);
            }
        }
        known
    }

    /// Load `KnownWorkloadManifests.txt`, falling back to `IncludedWorkloadManifests.txt`.
    pub fn load(layout: &SdkLayout, sdk_version: &str) -> Result<Option<Self>, StoreError> {
        for path in layout.known_manifests_candidates(sdk_version) {
            if path.is_file() {
                let content = fs::read_to_string(&path).map_err(StoreError::io(&path))?;
                let known = Self::parse(&content);
                debug!("loaded {} known manifest ids from {}", known.len(), path.display());
                return Ok(Some(known));
            }
        }
        Ok(None)
    }

    pub fn ids(&self) -> &[ManifestId] {
        &self.ids
    }

    pub fn position(&self, id: &ManifestId) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn contains(&self, id: &ManifestId) -> bool {
        self.positions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{INCLUDED_MANIFESTS_FILE, KNOWN_MANIFESTS_FILE};

    #[test]
    fn parse_keeps_file_order_and_first_position() {
        let known = KnownManifests::parse("Zeta\n\n  Alpha  \nzeta\nMid\n");
        let ids: Vec<&str> = known.ids().iter().map(ManifestId::as_str).collect();
        assert_eq!(ids, vec!["Zeta", "Alpha", "Mid"]);
        assert_eq!(known.position(&ManifestId::new("ZETA")), Some(0));
        assert_eq!(known.position(&ManifestId::new("mid")), Some(2));
        assert!(known.position(&ManifestId::new("Other")).is_none());
    }

    #[test]
    fn load_prefers_known_file_then_included_file() {
        let root = tempfile::tempdir().unwrap();
        let layout = SdkLayout::new(root.path());
        let sdk_dir = layout.sdk_dir("8.0.100");
        fs::create_dir_all(&sdk_dir).unwrap();

        assert!(KnownManifests::load(&layout, "8.0.100").unwrap().is_none());

        fs::write(sdk_dir.join(INCLUDED_MANIFESTS_FILE), "Included\n").unwrap();
        let known = KnownManifests::load(&layout, "8.0.100").unwrap().unwrap();
        assert!(known.contains(&ManifestId::new("included")));

        fs::write(sdk_dir.join(KNOWN_MANIFESTS_FILE), "Known\n").unwrap();
        let known = KnownManifests::load(&layout, "8.0.100").unwrap().unwrap();
        assert!(known.contains(&ManifestId::new("Known")));
        assert!(!known.contains(&ManifestId::new("Included")));
    }
}
