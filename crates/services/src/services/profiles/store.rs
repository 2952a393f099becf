use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
};

use serde_json::{Map, Value};
use thiserror::Error;

use super::profile::Profile;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("no profile path registered for scope `{0}`")]
    UnregisteredScope(String),
    #[error("failed to serialize profile document")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Profile persistence service.
///
/// Owns the `scope -> directory` registry and the `path -> Profile` cache.
/// Profile I/O is synchronous: configuration files are small and loads are
/// infrequent (startup, explicit save, on-disk edits during development).
#[derive(Debug, Default)]
pub struct ProfileStore {
    scopes: RwLock<HashMap<String, PathBuf>>,
    cache: RwLock<HashMap<PathBuf, Arc<Profile>>>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the storage directory for a profile scope (e.g. `global`,
    /// `local`, `project`). Registering the same scope again overwrites the
    /// previous directory silently.
    pub fn register_profile_path(&self, scope: impl Into<String>, dir: impl Into<PathBuf>) {
        let scope = scope.into();
        let dir = dir.into();
        tracing::debug!("registering profile scope `{scope}` -> {dir:?}");
        self.scopes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(scope, dir);
    }

    /// Load the profile `<dir>/<name>.json` for a registered scope.
    ///
    /// Returns the cached instance when one exists for the resolved path; the
    /// on-disk file is not re-read even if it changed externally. A missing
    /// file is created from `default` (or an empty document). With a default
    /// template, keys absent from the template are dropped, keys missing from
    /// the document are filled in, and the reconciled document is re-persisted
    /// immediately.
    ///
    /// Malformed JSON is recovered into an empty document with a logged
    /// warning; write failures propagate.
    pub fn load_profile(
        &self,
        name: &str,
        scope: &str,
        default: Option<&Map<String, Value>>,
    ) -> Result<Arc<Profile>, ProfileError> {
        let dir = self
            .scopes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(scope)
            .cloned();
        let Some(dir) = dir else {
            tracing::error!(
                "failed to load profile `{name}`: scope `{scope}` is not registered, \
                 register it first"
            );
            return Err(ProfileError::UnregisteredScope(scope.to_string()));
        };

        let path = dir.join(format!("{name}.json"));

        if let Some(profile) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&path)
        {
            return Ok(profile.clone());
        }

        let data = if path.exists() {
            let mut data = match read_document(&path) {
                Ok(parsed) => parsed,
                Err(err) => {
                    tracing::warn!("failed to load profile `{name}`, error message: {err:#}");
                    Map::new()
                }
            };

            if let Some(default) = default {
                data.retain(|key, _| default.contains_key(key));
                for (key, value) in default {
                    data.entry(key.clone()).or_insert_with(|| value.clone());
                }
                // save again so the on-disk copy matches the template
                write_document(&path, &data)?;
            }

            data
        } else {
            let data = default.cloned().unwrap_or_default();
            write_document(&path, &data)?;
            data
        };

        let profile = Arc::new(Profile::new(path.clone(), data));
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path, profile.clone());

        Ok(profile)
    }
}

fn read_document(path: &Path) -> anyhow::Result<Map<String, Value>> {
    let raw = fs::read_to_string(path)?;
    let parsed = serde_json::from_str(&raw)?;
    Ok(parsed)
}

pub(super) fn write_document(path: &Path, data: &Map<String, Value>) -> Result<(), ProfileError> {
    let json = serde_json::to_string_pretty(data)?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn template() -> Map<String, Value> {
        let Value::Object(map) = json!({ "theme": "dark", "volume": 5 }) else {
            unreachable!()
        };
        map
    }

    fn read_back(path: &Path) -> Map<String, Value> {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn missing_file_is_created_from_template() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::new();
        store.register_profile_path("global", dir.path());

        let profile = store
            .load_profile("app", "global", Some(&template()))
            .unwrap();

        assert_eq!(profile.data(), template());
        assert_eq!(read_back(&dir.path().join("app.json")), template());
    }

    #[test]
    fn missing_file_without_template_is_created_empty() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::new();
        store.register_profile_path("global", dir.path());

        let profile = store.load_profile("settings", "global", None).unwrap();

        assert!(profile.data().is_empty());
        assert!(read_back(&dir.path().join("settings.json")).is_empty());
    }

    #[test]
    fn second_load_returns_the_same_instance() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::new();
        store.register_profile_path("global", dir.path());

        let first = store.load_profile("app", "global", None).unwrap();
        first.set("theme", json!("light"));

        // Edit on disk behind the cache's back; the cached instance wins.
        fs::write(dir.path().join("app.json"), r#"{"theme":"solarized"}"#).unwrap();

        let second = store.load_profile("app", "global", None).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.get("theme"), Some(json!("light")));
    }

    #[test]
    fn default_merge_drops_stale_keys_and_fills_missing_ones() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("app.json"),
            r#"{"theme":"light","stale":"x"}"#,
        )
        .unwrap();

        let store = ProfileStore::new();
        store.register_profile_path("global", dir.path());

        let profile = store
            .load_profile("app", "global", Some(&template()))
            .unwrap();

        let expected: Map<String, Value> = {
            let Value::Object(map) = json!({ "theme": "light", "volume": 5 }) else {
                unreachable!()
            };
            map
        };
        assert_eq!(profile.data(), expected);

        // Self-healing: the reconciled document was written back to disk.
        assert_eq!(read_back(&dir.path().join("app.json")), expected);
    }

    #[test]
    fn corrupt_file_recovers_to_template() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.json"), "{not json").unwrap();

        let store = ProfileStore::new();
        store.register_profile_path("global", dir.path());

        let profile = store
            .load_profile("app", "global", Some(&template()))
            .unwrap();
        assert_eq!(profile.data(), template());
    }

    #[test]
    fn corrupt_file_without_template_recovers_to_empty() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.json"), "]]").unwrap();

        let store = ProfileStore::new();
        store.register_profile_path("global", dir.path());

        let profile = store.load_profile("app", "global", None).unwrap();
        assert!(profile.data().is_empty());
    }

    #[test]
    fn unregistered_scope_is_an_error() {
        let store = ProfileStore::new();
        let err = store.load_profile("app", "nowhere", None).unwrap_err();
        assert!(matches!(err, ProfileError::UnregisteredScope(scope) if scope == "nowhere"));
    }

    #[test]
    fn registering_a_scope_twice_overwrites() {
        let old = TempDir::new().unwrap();
        let new = TempDir::new().unwrap();
        let store = ProfileStore::new();
        store.register_profile_path("global", old.path());
        store.register_profile_path("global", new.path());

        let profile = store.load_profile("app", "global", None).unwrap();
        assert!(profile.path().starts_with(new.path()));
    }

    #[test]
    fn save_persists_mutations_as_pretty_json() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::new();
        store.register_profile_path("global", dir.path());

        let profile = store.load_profile("app", "global", None).unwrap();
        profile.set("volume", json!(11));
        profile.save().unwrap();

        let raw = fs::read_to_string(dir.path().join("app.json")).unwrap();
        assert_eq!(raw, "{\n  \"volume\": 11\n}");
    }

    #[test]
    fn clear_empties_in_place_and_stays_saveable() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::new();
        store.register_profile_path("global", dir.path());

        let profile = store
            .load_profile("app", "global", Some(&template()))
            .unwrap();
        profile.clear();
        assert!(profile.data().is_empty());

        profile.save().unwrap();
        assert!(read_back(&dir.path().join("app.json")).is_empty());
    }

    #[test]
    fn write_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::new();
        store.register_profile_path("global", dir.path().join("does-not-exist"));

        let err = store.load_profile("app", "global", None).unwrap_err();
        assert!(matches!(err, ProfileError::Io(_)));
    }
}
