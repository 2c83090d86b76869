use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use drift_backend::Endpoint;
use drift_store::StoreLayout;

use crate::error::{SessionError, SessionResult};

pub const CONFIG_FILE: &str = "drift.toml";
pub const DATASTORE_DIR: &str = "datastore";
pub const CATALOG_FILE: &str = "catalog.db";

/// Contents of `drift.toml`.
///
/// Has no `Default`; the backend endpoint must always be named.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DriftConfig {
    /// Directory holding `datastore/` and `catalog.db`. Relative paths are
    /// resolved against the directory of the config file.
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,
    pub backend: BackendConfig,
    #[serde(default)]
    pub store: StoreLayout,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub endpoint: Endpoint,
    #[serde(default = "default_query_candidates")]
    pub query_candidates: usize,
    #[serde(default = "default_diffuse_candidates")]
    pub diffuse_candidates: usize,
    #[serde(default = "default_skip_rate")]
    pub default_skip_rate: f32,
}

/// Per-request sizes and rates a session uses when the caller gives none.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenerationDefaults {
    pub query_candidates: usize,
    pub diffuse_candidates: usize,
    pub skip_rate: f32,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            query_candidates: default_query_candidates(),
            diffuse_candidates: default_diffuse_candidates(),
            skip_rate: default_skip_rate(),
        }
    }
}

fn default_workspace() -> PathBuf {
    PathBuf::from(".")
}

fn default_query_candidates() -> usize {
    8
}

fn default_diffuse_candidates() -> usize {
    10
}

fn default_skip_rate() -> f32 {
    0.5
}

impl BackendConfig {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            query_candidates: default_query_candidates(),
            diffuse_candidates: default_diffuse_candidates(),
            default_skip_rate: default_skip_rate(),
        }
    }

    pub fn defaults(&self) -> GenerationDefaults {
        GenerationDefaults {
            query_candidates: self.query_candidates,
            diffuse_candidates: self.diffuse_candidates,
            skip_rate: self.default_skip_rate,
        }
    }
}

impl DriftConfig {
    /// A config for `endpoint` with every other setting at its default.
    pub fn new(workspace: impl Into<PathBuf>, endpoint: Endpoint) -> Self {
        Self {
            workspace: workspace.into(),
            backend: BackendConfig::new(endpoint),
            store: StoreLayout::default(),
        }
    }

    /// Read and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> SessionResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            SessionError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if config.workspace.is_relative() {
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            config.workspace = base.join(&config.workspace);
        }
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> SessionResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| SessionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> SessionResult<String> {
        toml::to_string_pretty(self).map_err(|e| SessionError::Config(e.to_string()))
    }

    fn validate(&self) -> SessionResult<()> {
        let b = &self.backend;
        if b.query_candidates == 0 || b.diffuse_candidates == 0 {
            return Err(SessionError::Config(
                "candidate counts must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&b.default_skip_rate) {
            return Err(SessionError::Config(format!(
                "default_skip_rate must be within 0..=1, got {}",
                b.default_skip_rate
            )));
        }
        if !(1..=4).contains(&self.store.prefix_len) {
            return Err(SessionError::Config(format!(
                "store.prefix_len must be within 1..=4, got {}",
                self.store.prefix_len
            )));
        }
        Ok(())
    }

    pub fn datastore_dir(&self) -> PathBuf {
        self.workspace.join(DATASTORE_DIR)
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.workspace.join(CATALOG_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let c = DriftConfig::from_toml_str(
            r#"
            [backend]
            endpoint = "tcp://127.0.0.1:51005"
            "#,
        )
        .unwrap();
        assert_eq!(c.workspace, PathBuf::from("."));
        assert_eq!(
            c.backend.endpoint,
            Endpoint::Tcp {
                host: "127.0.0.1".into(),
                port: 51005
            }
        );
        assert_eq!(c.backend.defaults(), GenerationDefaults::default());
        assert_eq!(c.store.prefix_len, 4);
        assert_eq!(c.datastore_dir(), PathBuf::from("./datastore"));
        assert_eq!(c.catalog_path(), PathBuf::from("./catalog.db"));
    }

    #[test]
    fn endpoint_is_required() {
        let err = DriftConfig::from_toml_str("[backend]\nquery_candidates = 4\n").unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
    }

    #[test]
    fn bad_endpoint_is_rejected() {
        let err = DriftConfig::from_toml_str("[backend]\nendpoint = \"grpc://x:1\"\n").unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for text in [
            "[backend]\nendpoint = \"synthetic://1\"\nquery_candidates = 0\n",
            "[backend]\nendpoint = \"synthetic://1\"\ndefault_skip_rate = 1.5\n",
            "[backend]\nendpoint = \"synthetic://1\"\n[store]\nprefix_len = 6\n",
        ] {
            assert!(DriftConfig::from_toml_str(text).is_err(), "{text}");
        }
    }

    #[test]
    fn toml_round_trip() {
        let mut c = DriftConfig::new("/srv/drift", Endpoint::Synthetic { seed: 3 });
        c.backend.diffuse_candidates = 6;
        c.store.prefix_len = 2;
        let text = c.to_toml_string().unwrap();
        assert_eq!(DriftConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn load_resolves_workspace_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            "workspace = \"ws\"\n[backend]\nendpoint = \"synthetic://0\"\n",
        )
        .unwrap();
        let c = DriftConfig::load(&path).unwrap();
        assert_eq!(c.workspace, dir.path().join("ws"));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DriftConfig::load(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
    }
}
