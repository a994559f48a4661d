use crate::aggregate::{ManifestAggregator, ResolutionOutcome};
use crate::config::ResolverOptions;
use crate::identity::WorkloadVersion;
use crate::policy::{ResolutionPolicy, Selection};
use crate::readable::ReadableManifest;
use crate::CoreError;
use bandolier_schema::{FeatureBand, VersionTag, WorkloadSet};
use bandolier_store::{
    install_state_file, KnownManifests, ManifestDirectoryProbe, ManifestRoots, SdkLayout,
    WorkloadSetCatalog,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// What a global.json file pins, and whether the pinned set is installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GlobalJsonInformation {
    pub global_json_path: PathBuf,
    pub workload_version: String,
    pub workload_version_installed: bool,
}

/// Everything fixed at construction time.
#[derive(Debug)]
struct ResolverContext {
    sdk_version: VersionTag,
    band: FeatureBand,
    layout: SdkLayout,
    roots: ManifestRoots,
    probe: ManifestDirectoryProbe,
    install_state_path: PathBuf,
    explicit_version: Option<String>,
    global_json_path: Option<PathBuf>,
}

impl ResolverContext {
    fn policy(&self) -> ResolutionPolicy<'_> {
        ResolutionPolicy::new(&self.band, &self.roots, &self.install_state_path)
            .with_explicit_version(self.explicit_version.as_deref())
            .with_global_json(self.global_json_path.as_deref())
    }
}

/// Resolves the active workload manifests of one SDK installation.
///
/// Construction only validates arguments and computes the manifest roots.
/// The pin selection is computed on the first call that needs it and cached
/// until [`WorkloadResolver::refresh`]; selection errors surface from that call.
#[derive(Debug)]
pub struct WorkloadResolver {
    context: ResolverContext,
    selection: Option<Selection>,
}

impl WorkloadResolver {
    pub fn new(options: &ResolverOptions) -> Result<Self, CoreError> {
        let sdk_version = options.validate()?;
        let band = FeatureBand::from_version(&sdk_version);
        let layout = SdkLayout::new(&options.sdk_root);
        let roots = options.manifest_roots(&layout, &band);
        let install_state_path =
            install_state_file(&options.install_state_root(&layout, &band), &band);

        debug!(
            "sdk {sdk_version} (band {band}) with {} manifest root(s)",
            roots.len()
        );
        for root in &roots {
            debug!("manifest root {}", root.display());
        }

        Ok(Self {
            context: ResolverContext {
                sdk_version,
                band,
                layout,
                roots,
                probe: options.probe(),
                install_state_path,
                explicit_version: options
                    .workload_set_version
                    .as_ref()
                    .map(|v| v.trim().to_owned()),
                global_json_path: options.global_json_path.clone(),
            },
            selection: None,
        })
    }

    pub fn sdk_version(&self) -> &VersionTag {
        &self.context.sdk_version
    }

    pub fn sdk_feature_band(&self) -> &FeatureBand {
        &self.context.band
    }

    pub fn manifest_roots(&self) -> &ManifestRoots {
        &self.context.roots
    }

    pub fn install_state_path(&self) -> &Path {
        &self.context.install_state_path
    }

    /// Workload sets installed for the SDK's own band, keyed by version string.
    pub fn available_workload_sets(&self) -> Result<BTreeMap<String, WorkloadSet>, CoreError> {
        Ok(WorkloadSetCatalog::new(&self.context.roots).available(&self.context.band)?)
    }

    /// The cached pin selection, computing it if needed.
    pub fn selection(&mut self) -> Result<&Selection, CoreError> {
        current_selection(&mut self.selection, &self.context)
    }

    /// Best-effort resolution: a global.json pin that is not installed is
    /// reported in the outcome instead of failing.
    pub fn collect(&mut self) -> Result<ResolutionOutcome, CoreError> {
        let selection = current_selection(&mut self.selection, &self.context)?;
        let known = KnownManifests::load(&self.context.layout, self.context.sdk_version.as_str())?;
        ManifestAggregator::new(
            &self.context.band,
            &self.context.roots,
            &self.context.probe,
            selection,
        )
        .with_known(known.as_ref())
        .collect()
    }

    /// The resolved manifests, one per id, in stable order.
    pub fn manifests(&mut self) -> Result<Vec<ReadableManifest>, CoreError> {
        self.collect()?.into_manifests()
    }

    /// The version label for the current resolution.
    ///
    /// Only aggregates manifests when no workload set is in play.
    pub fn workload_version(&mut self) -> Result<WorkloadVersion, CoreError> {
        let selection = current_selection(&mut self.selection, &self.context)?;
        if let Some(version) = WorkloadVersion::from_selection(selection, &self.context.band) {
            return Ok(version);
        }
        Ok(self.collect()?.workload_version)
    }

    /// `None` when no global.json was given or it carries no workload pin.
    pub fn global_json_information(
        &mut self,
    ) -> Result<Option<GlobalJsonInformation>, CoreError> {
        let selection = current_selection(&mut self.selection, &self.context)?;
        Ok(selection
            .global_json_pin
            .as_ref()
            .map(|pin| GlobalJsonInformation {
                global_json_path: pin.path.clone(),
                workload_version: pin.version.clone(),
                workload_version_installed: selection.deferred.is_none(),
            }))
    }

    /// Drop the cached selection so the next call re-reads the disk.
    pub fn refresh(&mut self) {
        debug!("resolver refreshed");
        self.selection = None;
    }
}

fn current_selection<'s>(
    slot: &'s mut Option<Selection>,
    context: &ResolverContext,
) -> Result<&'s Selection, CoreError> {
    let selection = match slot.take() {
        Some(selection) => selection,
        None => context.policy().select()?,
    };
    Ok(slot.insert(selection))
}
