//! Loading and persisting state documents, selected per environment

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

use crate::{errors::DeployError, types::EnvironmentKey};

/// The extension of every state document
pub const STATE_FILE_EXTENSION: &str = "json";

/// Owns the on-disk lifecycle of one state document
#[derive(Clone, Debug)]
pub struct StateStore {
    /// The path the document is loaded from and saved to
    path: PathBuf,
}

impl StateStore {
    /// Construct a store over an explicit path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StateStore { path: path.into() }
    }

    /// Construct a store over the document selected for the given environment
    pub fn for_environment(dir: &Path, base_name: &str, env: &EnvironmentKey) -> Self {
        let path = Self::resolve_path(dir, base_name, env);
        info!("state file for environment {}: {}", env, path.display());
        StateStore { path }
    }

    /// `<dir>/<base_name>.<env>.json` if it exists, else `<dir>/<base_name>.json`
    pub fn resolve_path(dir: &Path, base_name: &str, env: &EnvironmentKey) -> PathBuf {
        let env_path = dir.join(format!("{base_name}.{env}.{STATE_FILE_EXTENSION}"));
        if env_path.exists() {
            env_path
        } else {
            Self::base_path(dir, base_name)
        }
    }

    /// `<dir>/<base_name>.json`
    pub fn base_path(dir: &Path, base_name: &str) -> PathBuf {
        dir.join(format!("{base_name}.{STATE_FILE_EXTENSION}"))
    }

    /// The path this store reads and writes
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document, or return `default` unchanged if none exists yet.
    ///
    /// A document that exists but does not parse is an error.
    pub fn load<T: DeserializeOwned>(&self, default: T) -> Result<T, DeployError> {
        if !self.path.exists() {
            return Ok(default);
        }

        let contents = fs::read_to_string(&self.path)
            .map_err(|e| DeployError::ReadState(format!("{}: {}", self.path.display(), e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| DeployError::MalformedState(format!("{}: {}", self.path.display(), e)))
    }

    /// Persist the document as pretty-printed JSON.
    ///
    /// Writes a sibling temporary file and renames it over the target.
    pub fn save<T: Serialize>(&self, document: &T) -> Result<(), DeployError> {
        let contents = serde_json::to_string_pretty(document)
            .map_err(|e| DeployError::WriteState(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| DeployError::WriteState(format!("{}: {}", parent.display(), e)))?;
        }

        let tmp_path = self.path.with_extension(format!("{STATE_FILE_EXTENSION}.tmp"));
        fs::write(&tmp_path, contents)
            .map_err(|e| DeployError::WriteState(format!("{}: {}", tmp_path.display(), e)))?;
        fs::rename(&tmp_path, &self.path)
            .map_err(|e| DeployError::WriteState(format!("{}: {}", self.path.display(), e)))?;

        info!("state written to {}", self.path.display());
        Ok(())
    }
}

/// Activate a named variant by copying `<base_name>.<variant>.json` over
/// `<base_name>.json` in the first of `search_dirs` that holds the variant.
///
/// Returns the activated path, or `None` if no directory holds the variant.
pub fn switch_config(
    search_dirs: &[PathBuf],
    base_name: &str,
    variant: &str,
) -> Result<Option<PathBuf>, DeployError> {
    for dir in search_dirs {
        let source = dir.join(format!("{base_name}.{variant}.{STATE_FILE_EXTENSION}"));
        if !source.exists() {
            continue;
        }

        let target = StateStore::base_path(dir, base_name);
        fs::copy(&source, &target)
            .map_err(|e| DeployError::WriteState(format!("{}: {}", target.display(), e)))?;

        info!("switched {} to {}", target.display(), source.display());
        return Ok(Some(target));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::{
        errors::DeployError,
        types::{Arg, EnvironmentKey, UnitDocument, UnitRecord},
    };

    use super::{switch_config, StateStore};

    fn sample_document() -> UnitDocument {
        let mut units = UnitDocument::new();
        units.insert(
            "Treasury".to_string(),
            UnitRecord {
                address: "0x0000000000000000000000000000000000000001".to_string(),
                deployed: true,
                ..Default::default()
            },
        );
        units.insert(
            "Router".to_string(),
            UnitRecord::with_constructor_args(vec![Arg::reference("Treasury")]),
        );
        units
    }

    #[test]
    fn test_environment_file_selection() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("d.json"), "{}").unwrap();
        fs::write(dir.path().join("d.7.json"), "{}").unwrap();

        assert_eq!(
            StateStore::resolve_path(dir.path(), "d", &EnvironmentKey::Id(7)),
            dir.path().join("d.7.json")
        );
        assert_eq!(
            StateStore::resolve_path(dir.path(), "d", &EnvironmentKey::Id(9)),
            dir.path().join("d.json")
        );
    }

    #[test]
    fn test_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join(".data.json"));

        let loaded = store.load(sample_document()).unwrap();
        assert_eq!(loaded, sample_document());
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join(".data.json"));

        store.save(&sample_document()).unwrap();
        let loaded: UnitDocument = store.load(UnitDocument::new()).unwrap();

        assert_eq!(loaded, sample_document());
        assert_eq!(
            loaded.keys().collect::<Vec<_>>(),
            vec!["Treasury", "Router"]
        );

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\n  \"Treasury\": {"));
        assert!(raw.contains("\"${Treasury.address}\""));

        // Keys the engine does not track survive a load and save
        fs::write(
            store.path(),
            r#"{ "Treasury": { "address": "", "deployed": false, "note": "keep me" } }"#,
        )
        .unwrap();
        let loaded: UnitDocument = store.load(UnitDocument::new()).unwrap();
        assert_eq!(loaded["Treasury"].extra["note"], "keep me");

        store.save(&loaded).unwrap();
        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"note\": \"keep me\""));
    }

    #[test]
    fn test_malformed_document_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".data.json");
        fs::write(&path, "{ not json").unwrap();

        let res = StateStore::new(path).load(UnitDocument::new());
        assert!(matches!(res, Err(DeployError::MalformedState(_))));
    }

    #[test]
    fn test_switch_config_prefers_first_dir() {
        let home = tempfile::tempdir().unwrap();
        let local = tempfile::tempdir().unwrap();
        fs::write(local.path().join(".hardhat.data.goerli.json"), "{\"a\":1}").unwrap();

        let dirs = vec![home.path().to_path_buf(), local.path().to_path_buf()];
        let activated = switch_config(&dirs, ".hardhat.data", "goerli").unwrap();

        assert_eq!(activated, Some(local.path().join(".hardhat.data.json")));
        assert_eq!(
            fs::read_to_string(local.path().join(".hardhat.data.json")).unwrap(),
            "{\"a\":1}"
        );
        assert_eq!(switch_config(&dirs, ".hardhat.data", "mainnet").unwrap(), None);
    }
}
