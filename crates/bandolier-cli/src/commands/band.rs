use super::{json_pretty, EXIT_SUCCESS};
use bandolier_core::WorkloadResolver;

pub fn run(resolver: &WorkloadResolver, json: bool) -> Result<u8, String> {
    let band = resolver.sdk_feature_band();
    if json {
        let value = serde_json::json!({
            "sdk_version": resolver.sdk_version().to_string(),
            "feature_band": band.to_string(),
            "manifest_roots": resolver.manifest_roots().as_slice(),
            "install_state": resolver.install_state_path(),
        });
        println!("{}", json_pretty(&value)?);
    } else {
        println!("sdk_version:    {}", resolver.sdk_version());
        println!("feature_band:   {band}");
        for root in resolver.manifest_roots() {
            println!("manifest_root:  {}", root.display());
        }
        println!("install_state:  {}", resolver.install_state_path().display());
    }
    Ok(EXIT_SUCCESS)
}
