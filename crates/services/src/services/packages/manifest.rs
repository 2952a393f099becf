use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

/// Manifest file expected in every package root.
pub const MANIFEST_FILE: &str = "package.json";

/// Subtree of a package root holding its panel views.
pub const PANEL_DIR: &str = "panel";

/// The fields of `package.json` the registry consumes. Everything else the
/// manifest declares is kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PackageManifest {
    pub name: String,

    /// Panel name -> panel definition. Only the names matter to the registry;
    /// definitions are passed through to whoever opens the panel.
    #[serde(default)]
    pub panels: BTreeMap<String, Value>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// A loaded package: its root directory plus the parsed manifest.
///
/// Replaced wholesale on reload; the registry keys these by root path.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageInfo {
    pub path: PathBuf,
    pub manifest: PackageManifest,
}

impl PackageInfo {
    /// Parse `<root>/package.json` into a fresh `PackageInfo`.
    pub fn load(root: &Path) -> Result<Self> {
        let manifest_path = root.join(MANIFEST_FILE);
        let raw = fs::read_to_string(&manifest_path)
            .with_context(|| format!("failed to read manifest {manifest_path:?}"))?;
        let manifest: PackageManifest = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse manifest {manifest_path:?}"))?;

        Ok(Self {
            path: root.to_path_buf(),
            manifest,
        })
    }

    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn panel_dir(&self) -> PathBuf {
        self.path.join(PANEL_DIR)
    }

    /// Fully-qualified panel identifiers, `<package>.<panel>`, in declaration
    /// (sorted) order.
    pub fn panel_ids(&self) -> impl Iterator<Item = String> + '_ {
        self.manifest
            .panels
            .keys()
            .map(|panel| format!("{}.{panel}", self.manifest.name))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn parses_name_panels_and_extra_fields() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(MANIFEST_FILE),
            json!({
                "name": "console",
                "version": "1.0.0",
                "panels": {
                    "log": { "main": "panel/log.js" },
                    "errors": { "main": "panel/errors.js" }
                }
            })
            .to_string(),
        )
        .unwrap();

        let info = PackageInfo::load(dir.path()).unwrap();
        assert_eq!(info.name(), "console");
        assert_eq!(
            info.panel_ids().collect::<Vec<_>>(),
            vec!["console.errors", "console.log"]
        );
        assert_eq!(info.manifest.extra.get("version"), Some(&json!("1.0.0")));
    }

    #[test]
    fn missing_panels_defaults_to_empty() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), r#"{"name":"headless"}"#).unwrap();

        let info = PackageInfo::load(dir.path()).unwrap();
        assert_eq!(info.panel_ids().count(), 0);
    }

    #[test]
    fn missing_manifest_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(PackageInfo::load(dir.path()).is_err());
    }
}
