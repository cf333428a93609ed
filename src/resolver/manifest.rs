//! Dependency manifest (`package.json`) handling

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use super::ResolveError;

/// Manifest consulted when `--packageJson` is not given
pub const DEFAULT_MANIFEST: &str = "./package.json";

/// The parts of a manifest that decide what stays external
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub dependencies: BTreeMap<String, serde_json::Value>,

    #[serde(default)]
    pub peer_dependencies: BTreeMap<String, serde_json::Value>,
}

impl Manifest {
    /// Read a manifest. Failures are fatal only for an explicitly named file.
    pub fn load(path: &Path, explicit: bool) -> Result<Self, ResolveError> {
        let not_found = |reason: String| ResolveError::ManifestNotFound {
            path: path.to_path_buf(),
            reason,
        };

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if explicit => return Err(not_found(e.to_string())),
            Err(e) => {
                debug!("No manifest at {} ({})", path.display(), e);
                return Ok(Self::default());
            }
        };

        match serde_json::from_str(&content) {
            Ok(manifest) => Ok(manifest),
            Err(e) if explicit => Err(not_found(e.to_string())),
            Err(e) => {
                warn!("Ignoring unparsable manifest {}: {}", path.display(), e);
                Ok(Self::default())
            }
        }
    }

    /// Every package name the manifest depends on
    pub fn package_names(&self) -> impl Iterator<Item = &str> {
        self.dependencies
            .keys()
            .chain(self.peer_dependencies.keys())
            .map(String::as_str)
    }
}

/// Union of the explicit externals and, when `manifest` is given, its
/// dependency names
pub fn externals(explicit: &[String], manifest: Option<&Manifest>) -> BTreeSet<String> {
    let mut external: BTreeSet<String> = explicit.iter().cloned().collect();

    if let Some(manifest) = manifest {
        external.extend(manifest.package_names().map(str::to_string));
    }

    external
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const PACKAGE_JSON: &str = r#"{
        "name": "api",
        "dependencies": { "express": "^4.18.0", "pg": "^8.0.0" },
        "peerDependencies": { "typescript": "*" },
        "devDependencies": { "vitest": "^1.0.0" }
    }"#;

    #[test]
    fn test_externals_without_manifest() {
        let external = externals(&["sharp".to_string(), "sharp".to_string()], None);
        assert_eq!(external, BTreeSet::from(["sharp".to_string()]));
    }

    #[test]
    fn test_externals_union_with_manifest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("package.json");
        fs::write(&path, PACKAGE_JSON).unwrap();

        let manifest = Manifest::load(&path, true).unwrap();
        let external = externals(&["pg".to_string(), "sharp".to_string()], Some(&manifest));

        let expected: BTreeSet<String> = ["express", "pg", "sharp", "typescript"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(external, expected);
    }

    #[test]
    fn test_missing_default_manifest_is_empty() {
        let dir = TempDir::new().unwrap();
        let manifest = Manifest::load(&dir.path().join("package.json"), false).unwrap();

        assert_eq!(manifest.package_names().count(), 0);
    }

    #[test]
    fn test_missing_explicit_manifest_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = Manifest::load(&dir.path().join("deps.json"), true).unwrap_err();

        assert!(err.to_string().starts_with("manifest not found"));
    }

    #[test]
    fn test_malformed_explicit_manifest_reports_not_found() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deps.json");
        fs::write(&path, "{ \"dependencies\": ").unwrap();

        let err = Manifest::load(&path, true).unwrap_err();
        assert!(matches!(err, ResolveError::ManifestNotFound { .. }));
    }
}
