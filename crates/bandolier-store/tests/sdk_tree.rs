//! Scans of a realistic SDK tree spread over two manifest roots.

use bandolier_schema::{FeatureBand, ManifestId, ManifestSpecifier, VersionTag};
use bandolier_store::{
    latest_workload_set, KnownManifests, ManifestDirectoryProbe, ManifestRoots, SdkLayout,
    WorkloadSetCatalog, WORKLOAD_MANIFEST_FILE,
};
use std::fs;
use std::path::Path;

fn manifest(root: &Path, band: &str, id: &str, version: &str) {
    let dir = root.join(band).join(id).join(version);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join(WORKLOAD_MANIFEST_FILE),
        format!(r#"{{ "version": "{version}" }}"#),
    )
    .unwrap();
}

fn workload_set(root: &Path, band: &str, version: &str, body: &str) {
    let dir = root.join(band).join("workloadsets").join(version);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("microsoft.net.workloads.workloadset.json"), body).unwrap();
}

#[test]
fn two_root_tree_scan() {
    let sdk = tempfile::tempdir().unwrap();
    let user = tempfile::tempdir().unwrap();
    let layout = SdkLayout::new(sdk.path());
    let sdk_manifests = layout.manifests_root();

    manifest(&sdk_manifests, "8.0.100", "Microsoft.NET.Sdk.Android", "34.0.43");
    manifest(&sdk_manifests, "8.0.100", "Microsoft.NET.Sdk.Android", "34.0.52");
    manifest(user.path(), "8.0.100", "Microsoft.NET.Sdk.Android", "34.0.95");
    workload_set(
        &sdk_manifests,
        "8.0.100",
        "8.0.101",
        r#"{ "Microsoft.NET.Sdk.Android": "34.0.43" }"#,
    );
    workload_set(
        user.path(),
        "8.0.100",
        "8.0.102",
        r#"{ "Microsoft.NET.Sdk.Android": "34.0.95" }"#,
    );

    let roots = ManifestRoots::new(vec![user.path().to_path_buf(), sdk_manifests.clone()]);
    let band = FeatureBand::parse("8.0.100").unwrap();

    let sets = WorkloadSetCatalog::new(&roots).available(&band).unwrap();
    assert_eq!(sets.len(), 2);
    assert_eq!(latest_workload_set(&sets).unwrap().version, "8.0.102");

    let probe = ManifestDirectoryProbe::default();
    let sdk_android =
        ManifestRoots::band_dir(&sdk_manifests, &band).join("Microsoft.NET.Sdk.Android");
    let probed = probe.resolve(&sdk_android).unwrap().unwrap();
    assert_eq!(probed.version.unwrap().to_string(), "34.0.52");

    let pinned = ManifestSpecifier::new(
        "Microsoft.NET.Sdk.Android",
        VersionTag::parse("34.0.43").unwrap(),
        band.clone(),
    );
    let found = roots.find_specified(&pinned).unwrap();
    assert!(found.starts_with(&sdk_manifests));

    let user_pinned = ManifestSpecifier::new(
        "Microsoft.NET.Sdk.Android",
        VersionTag::parse("34.0.95").unwrap(),
        band,
    );
    assert!(roots.find_specified(&user_pinned).unwrap().starts_with(user.path()));
}

#[test]
fn known_manifests_come_from_sdk_version_dir() {
    let sdk = tempfile::tempdir().unwrap();
    let layout = SdkLayout::new(sdk.path());
    let dir = layout.sdk_dir("8.0.204");
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("KnownWorkloadManifests.txt"),
        "microsoft.net.sdk.android\nmicrosoft.net.sdk.ios\n",
    )
    .unwrap();

    let known = KnownManifests::load(&layout, "8.0.204").unwrap().unwrap();
    assert_eq!(known.len(), 2);
    assert_eq!(
        known.position(&ManifestId::new("Microsoft.NET.Sdk.iOS")),
        Some(1)
    );
    assert!(KnownManifests::load(&layout, "8.0.100").unwrap().is_none());
}
