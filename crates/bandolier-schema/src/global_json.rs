use crate::SchemaError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const GLOBAL_JSON_FILE: &str = "global.json";

#[derive(Debug, Default, Deserialize)]
struct GlobalJsonDocument {
    #[serde(default)]
    sdk: Option<SdkSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SdkSection {
    #[serde(default)]
    workload_version: Option<String>,
}

/// Walk from `start` up through its ancestors and return the first `global.json` found.
pub fn find_global_json(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(GLOBAL_JSON_FILE))
        .find(|candidate| candidate.is_file())
}

/// Parse the `sdk.workloadVersion` pin out of global.json content.
pub fn parse_workload_version(json: &str, origin: &Path) -> Result<Option<String>, SchemaError> {
    let doc: GlobalJsonDocument = serde_json::from_str(json).map_err(|source| SchemaError::Parse {
        path: origin.to_path_buf(),
        source,
    })?;
    Ok(doc
        .sdk
        .and_then(|sdk| sdk.workload_version)
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty()))
}

/// Read the workload-set pin from a global.json file. A missing file has no pin.
pub fn read_workload_version(path: &Path) -> Result<Option<String>, SchemaError> {
    if !path.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|source| SchemaError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_workload_version(&content, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_nearest_ancestor() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("proj").join("sub");
        let deep = sub.join("deep");
        fs::create_dir_all(&deep).unwrap();
        fs::write(dir.path().join("proj").join(GLOBAL_JSON_FILE), "{}").unwrap();
        fs::write(sub.join(GLOBAL_JSON_FILE), "{}").unwrap();

        assert_eq!(find_global_json(&deep), Some(sub.join(GLOBAL_JSON_FILE)));
    }

    #[test]
    fn start_directory_itself_is_checked() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(GLOBAL_JSON_FILE), "{}").unwrap();
        assert_eq!(
            find_global_json(dir.path()),
            Some(dir.path().join(GLOBAL_JSON_FILE))
        );
    }

    #[test]
    fn reads_workload_version() {
        let pin = parse_workload_version(
            r#"{ "sdk": { "version": "8.0.100", "workloadVersion": "8.0.100-rc.1" } }"#,
            Path::new(GLOBAL_JSON_FILE),
        )
        .unwrap();
        assert_eq!(pin.as_deref(), Some("8.0.100-rc.1"));
    }

    #[test]
    fn missing_sdk_section_has_no_pin() {
        let pin = parse_workload_version(
            r#"{ "msbuild-sdks": { "Foo": "1.0.0" } }"#,
            Path::new(GLOBAL_JSON_FILE),
        )
        .unwrap();
        assert!(pin.is_none());
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(parse_workload_version("{ sdk: ", Path::new(GLOBAL_JSON_FILE)).is_err());
    }

    #[test]
    fn missing_file_has_no_pin() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_workload_version(&dir.path().join(GLOBAL_JSON_FILE))
            .unwrap()
            .is_none());
    }
}
