//! JSON5 config loading with a small user/cwd layer stack.
//!
//! Layers are discovered, checked against the schema, merged key-by-key and
//! decoded into a final `ScribeConfig`.

mod merge;
mod schema;


use crate::{ConfigError, ScribeConfig};
use directories::BaseDirs;
use log::{debug, info};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Default config filename in local layers.
const DEFAULT_CONFIG_FILE: &str = "scribe.json5";
/// Default config directory under the user's home.
const DEFAULT_CONFIG_DIR: &str = ".scribe";
/// Vault folder used when no root is configured.
const DEFAULT_VAULT_DIR: &str = "vault";

/// Effective config plus metadata about which layers were loaded.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// The merged, validated config.
    pub config: ScribeConfig,
    /// Metadata for each layer that contributed.
    pub layers: Vec<ConfigLayer>,
}

/// Origin for a single config layer in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// User-specific configuration.
    User,
    /// Current working directory configuration.
    Cwd,
    /// Explicit overrides (highest precedence).
    Runtime,
}

/// Metadata about a loaded config layer.
#[derive(Debug, Clone)]
pub struct ConfigLayer {
    /// Layer origin.
    pub source: ConfigLayerSource,
    /// Location on disk.
    pub path: PathBuf,
}

/// Options controlling layered config discovery and overrides.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    /// Working directory used to find the cwd layer.
    pub cwd: PathBuf,
    /// Optional user config path (defaults to `~/.scribe/scribe.json5`).
    pub user_config_path: Option<PathBuf>,
    /// Override config paths applied last, in order.
    pub runtime_paths: Vec<PathBuf>,
}

impl LayeredConfigOptions {
    /// Create options with default layer locations for the provided cwd.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            user_config_path: default_user_config_path(),
            runtime_paths: Vec::new(),
        }
    }

    /// Add an override config path that is applied last.
    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }
}

impl ScribeConfig {
    /// Load a single config from a path (no layering).
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        info!("loading config from path: {}", path.as_ref().display());
        let contents = fs::read_to_string(path)?;
        let value: Value = json5::from_str(&contents)?;
        config_from_value(value, "config")
    }

    /// Load a single config from JSON5 contents (no layering).
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value = json5::from_str(contents)?;
        config_from_value(value, "config")
    }

    /// Load the user and cwd layers using default locations.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        info!(
            "loading layered config with defaults (cwd={})",
            cwd.as_ref().display()
        );
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    /// Load a layered config stack.
    ///
    /// Layer precedence (low -> high): user, cwd, runtime overrides. Missing
    /// user/cwd files are skipped; a missing runtime file is an error.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let mut layers = Vec::new();
        let mut merged = Value::Object(serde_json::Map::new());

        let discovered = [
            (ConfigLayerSource::User, options.user_config_path.clone()),
            (
                ConfigLayerSource::Cwd,
                Some(options.cwd.join(DEFAULT_CONFIG_FILE)),
            ),
        ];
        for (source, path) in discovered {
            let Some(path) = path else {
                continue;
            };
            if !path.exists() {
                debug!(
                    "skipping missing layer (source={:?}, path={})",
                    source,
                    path.display()
                );
                continue;
            }
            let value = load_layer_value(source, &path)?;
            merge::merge_json_values(&mut merged, &value);
            layers.push(ConfigLayer { source, path });
        }

        for path in &options.runtime_paths {
            let value = load_layer_value(ConfigLayerSource::Runtime, path)?;
            merge::merge_json_values(&mut merged, &value);
            layers.push(ConfigLayer {
                source: ConfigLayerSource::Runtime,
                path: path.clone(),
            });
        }

        let config = config_from_value(merged, "effective")?;
        info!("layered config loaded (layers={})", layers.len());
        Ok(LayeredConfig { config, layers })
    }

    /// Validate configuration invariants that cannot be expressed in serde.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.orchestrator.max_rounds == 0 {
            return Err(ConfigError::InvalidField {
                path: "orchestrator.max_rounds".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.context.index_queue_capacity == 0 {
            return Err(ConfigError::InvalidField {
                path: "context.index_queue_capacity".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.vault.tasks_file.trim().is_empty() {
            return Err(ConfigError::InvalidField {
                path: "vault.tasks_file".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if self
            .vault
            .protected_prefixes
            .iter()
            .any(|prefix| prefix.trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "protected prefixes cannot be empty strings".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the absolute vault root for this config.
    ///
    /// Relative roots resolve against `cwd`; an unset root falls back to
    /// `~/.scribe/vault`, or `<cwd>/.scribe/vault` without a home directory.
    pub fn resolve_vault_root(&self, cwd: impl AsRef<Path>) -> PathBuf {
        let cwd = cwd.as_ref();
        if let Some(root) = self.vault.root.as_ref() {
            let root = PathBuf::from(root);
            if root.is_absolute() {
                debug!("using absolute vault root: {}", root.display());
                return root;
            }
            debug!(
                "resolving vault root relative to cwd: {}",
                cwd.join(&root).display()
            );
            return cwd.join(root);
        }

        let base = BaseDirs::new()
            .map(|dirs| dirs.home_dir().to_path_buf())
            .unwrap_or_else(|| cwd.to_path_buf());
        base.join(DEFAULT_CONFIG_DIR).join(DEFAULT_VAULT_DIR)
    }
}

/// Default user config path under the home directory.
fn default_user_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| {
        dirs.home_dir()
            .join(DEFAULT_CONFIG_DIR)
            .join(DEFAULT_CONFIG_FILE)
    })
}

/// Read and schema-check one layer.
fn load_layer_value(source: ConfigLayerSource, path: &Path) -> Result<Value, ConfigError> {
    debug!(
        "loading config layer (source={:?}, path={})",
        source,
        path.display()
    );
    let contents = fs::read_to_string(path)?;
    let value: Value = json5::from_str(&contents)?;
    schema::validate_layer_schema(&value, &layer_label(source, path))?;
    Ok(value)
}

/// Build a user-friendly label for schema validation errors.
fn layer_label(source: ConfigLayerSource, path: &Path) -> String {
    let name = match source {
        ConfigLayerSource::User => "user",
        ConfigLayerSource::Cwd => "cwd",
        ConfigLayerSource::Runtime => "runtime",
    };
    format!("{name}({})", path.display())
}

fn config_from_value(value: Value, label: &str) -> Result<ScribeConfig, ConfigError> {
    schema::validate_layer_schema(&value, label)?;
    let config: ScribeConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}
