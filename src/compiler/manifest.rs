//! Externals from the project manifest.
//!
//! Every dependency declared in `package.json` stays a runtime `require`
//! in the compiled pages instead of being bundled into them.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

const MANIFEST: &str = "package.json";

/// Dependency sections of `package.json` we care about.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    dependencies: Option<BTreeMap<String, serde_json::Value>>,
    dev_dependencies: Option<BTreeMap<String, serde_json::Value>>,
    peer_dependencies: Option<BTreeMap<String, serde_json::Value>>,
    optional_dependencies: Option<BTreeMap<String, serde_json::Value>>,
}

/// All dependency names declared in `dir/package.json`, sorted.
///
/// A missing or malformed manifest means "no externals".
pub fn runtime_dependencies(dir: &Path) -> Vec<String> {
    let Ok(content) = fs::read_to_string(dir.join(MANIFEST)) else {
        return Vec::new();
    };
    let Ok(manifest) = serde_json::from_str::<Manifest>(&content) else {
        return Vec::new();
    };

    let names: BTreeSet<String> = [
        manifest.dependencies,
        manifest.dev_dependencies,
        manifest.peer_dependencies,
        manifest.optional_dependencies,
    ]
    .into_iter()
    .flatten()
    .flat_map(BTreeMap::into_keys)
    .collect();

    names.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_collects_all_sections() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(MANIFEST),
            r#"{
                "name": "site",
                "dependencies": { "react": "^16.8.0", "react-dom": "^16.8.0" },
                "devDependencies": { "webpack": "^4.0.0", "react": "^16.8.0" },
                "peerDependencies": { "styled-components": "^4.0.0" },
                "optionalDependencies": { "fsevents": "*" }
            }"#,
        )
        .unwrap();

        let deps = runtime_dependencies(dir.path());
        assert_eq!(
            deps,
            ["fsevents", "react", "react-dom", "styled-components", "webpack"]
        );
    }

    #[test]
    fn test_missing_manifest_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(runtime_dependencies(dir.path()).is_empty());
    }

    #[test]
    fn test_malformed_manifest_is_empty() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(MANIFEST), "{ not json").unwrap();
        assert!(runtime_dependencies(dir.path()).is_empty());
    }

    #[test]
    fn test_null_section_is_ignored() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(MANIFEST),
            r#"{ "dependencies": null, "devDependencies": { "esbuild": "^0.20" } }"#,
        )
        .unwrap();
        assert_eq!(runtime_dependencies(dir.path()), ["esbuild"]);
    }

    #[test]
    fn test_manifest_without_dependencies() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(MANIFEST), r#"{ "name": "bare" }"#).unwrap();
        assert!(runtime_dependencies(dir.path()).is_empty());
    }
}
