//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/kbtree/kbtree.toml`
//! 3. Local config: `<dir>/.kbtree.toml` (usually the working directory)
//! 4. Environment variables: `KBTREE_*` prefix

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::Viewer;

/// Who the CLI resolves hierarchies for.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ViewerConfig {
    /// Administrators see inactive and district-restricted categories
    pub admin: bool,
    /// District tags of a non-admin viewer
    pub districts: Vec<String>,
}

impl ViewerConfig {
    pub fn to_viewer(&self) -> Viewer {
        if self.admin {
            Viewer::Admin
        } else {
            Viewer::member(self.districts.iter().cloned())
        }
    }
}

/// Output options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DisplayConfig {
    /// List linked procedures below each category in `tree`
    pub show_procedures: bool,
    /// Print structural warnings after results
    pub show_warnings: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_procedures: true,
            show_warnings: true,
        }
    }
}

/// Raw viewer config for intermediate parsing (Option to detect "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawViewerConfig {
    pub admin: Option<bool>,
    pub districts: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawDisplayConfig {
    pub show_procedures: Option<bool>,
    pub show_warnings: Option<bool>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub data_file: Option<PathBuf>,
    pub viewer: RawViewerConfig,
    pub display: RawDisplayConfig,
}

impl ViewerConfig {
    /// Merge arrays with union semantics and negation support.
    ///
    /// - Items from overlay are added to base
    /// - Items prefixed with `!` remove the corresponding item from the result
    /// - Duplicates are de-duplicated
    ///
    /// # Examples
    /// ```ignore
    /// merge_array(&["north", "south"], &["east"])   // → ["east", "north", "south"]
    /// merge_array(&["north", "south"], &["!north"]) // → ["south"]
    /// ```
    pub fn merge_array(base: &[String], overlay: &[String]) -> Vec<String> {
        let mut result: HashSet<String> = base.iter().cloned().collect();

        for item in overlay {
            if let Some(negated) = item.strip_prefix('!') {
                result.remove(negated);
            } else {
                result.insert(item.clone());
            }
        }

        // Convert to sorted Vec for deterministic output
        let mut vec: Vec<String> = result.into_iter().collect();
        vec.sort();
        vec
    }

    /// Merge overlay onto self: scalars overlay-wins, districts union.
    pub fn merge(&self, overlay: &RawViewerConfig) -> Self {
        Self {
            admin: overlay.admin.unwrap_or(self.admin),
            districts: overlay
                .districts
                .as_ref()
                .map(|o| Self::merge_array(&self.districts, o))
                .unwrap_or_else(|| self.districts.clone()),
        }
    }

    /// Apply global config onto defaults: districts REPLACE.
    pub fn apply_global(&self, global: &RawViewerConfig) -> Self {
        Self {
            admin: global.admin.unwrap_or(self.admin),
            districts: global
                .districts
                .clone()
                .unwrap_or_else(|| self.districts.clone()),
        }
    }
}

impl DisplayConfig {
    fn merge(&self, overlay: &RawDisplayConfig) -> Self {
        Self {
            show_procedures: overlay.show_procedures.unwrap_or(self.show_procedures),
            show_warnings: overlay.show_warnings.unwrap_or(self.show_warnings),
        }
    }
}

/// Unified configuration for kbtree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Catalog document (TOML, or JSON with a `.json` extension)
    pub data_file: PathBuf,
    pub viewer: ViewerConfig,
    pub display: DisplayConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            viewer: ViewerConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

/// Default catalog location under the platform data directory.
fn default_data_file() -> PathBuf {
    ProjectDirs::from("", "", "kbtree")
        .map(|dirs| dirs.data_dir().join("catalog.toml"))
        .unwrap_or_else(|| PathBuf::from("~/.kbtree/catalog.toml"))
}

/// Get the XDG config directory for kbtree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "kbtree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("kbtree.toml"))
}

/// Get the path to the local config file in a directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".kbtree.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

/// Expand shell variables and tilde in a path-like string.
pub fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

impl Settings {
    /// Viewer the CLI resolves for.
    pub fn viewer(&self) -> Viewer {
        self.viewer.to_viewer()
    }

    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        let expanded = expand_path(self.data_file.to_string_lossy().as_ref());
        self.data_file = PathBuf::from(expanded);
    }

    /// Merge overlay config onto self (base) with union semantics for arrays.
    ///
    /// A relative `data_file` is resolved against `base_dir`, the directory
    /// holding the overlay file.
    fn merge_with(&self, overlay: &RawSettings, base_dir: &Path) -> Self {
        Self {
            data_file: overlay
                .data_file
                .as_ref()
                .map(|p| resolve_relative(p, base_dir))
                .unwrap_or_else(|| self.data_file.clone()),
            viewer: self.viewer.merge(&overlay.viewer),
            display: self.display.merge(&overlay.display),
        }
    }

    /// Apply global config onto defaults with REPLACE semantics for arrays.
    fn apply_global(&self, global: &RawSettings) -> Self {
        Self {
            data_file: global
                .data_file
                .clone()
                .unwrap_or_else(|| self.data_file.clone()),
            viewer: self.viewer.apply_global(&global.viewer),
            display: self.display.merge(&global.display),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Optional directory holding a local `.kbtree.toml`
    ///
    /// # Array Merge Semantics
    /// - Defaults → Global: REPLACE (global defines the real baseline)
    /// - Global → Local: UNION with negation support
    /// - Any → Env vars: REPLACE (explicit user override)
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Load global config (REPLACES defaults)
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.apply_global(&raw);
            }
        }

        // 3. Load and merge local config (UNION with global)
        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw, dir);
            }
        }

        // 4. Apply environment variables (replaces - explicit override)
        current = Self::apply_env_overrides(current)?;

        // Expand ~ and $VAR in path-like fields
        current.expand_paths();

        Ok(current)
    }

    /// Apply KBTREE_* environment variables as explicit overrides.
    ///
    /// `KBTREE_DATA_FILE`, `KBTREE_VIEWER__ADMIN`, `KBTREE_VIEWER__DISTRICTS`
    /// (comma separated), `KBTREE_DISPLAY__SHOW_PROCEDURES`,
    /// `KBTREE_DISPLAY__SHOW_WARNINGS`.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("KBTREE")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("viewer.districts")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_string("data_file") {
            settings.data_file = PathBuf::from(val);
        }
        if let Ok(val) = config.get_bool("viewer.admin") {
            settings.viewer.admin = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("viewer.districts") {
            settings.viewer.districts = val;
        }
        if let Ok(val) = config.get_bool("display.show_procedures") {
            settings.display.show_procedures = val;
        }
        if let Ok(val) = config.get_bool("display.show_warnings") {
            settings.display.show_warnings = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# kbtree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/kbtree/kbtree.toml  (defines your baseline)
#   Local:  ./.kbtree.toml                (per-directory additions)
#   Env:    KBTREE_* environment variables (explicit overrides)
#
# Array Merge Semantics:
#   Global config REPLACES compiled defaults.
#   Local config UNIONS with global.
#   Use "!tag" in local config to REMOVE an inherited item:
#     districts = ["east", "!north"]  # adds east, removes north

# Catalog document (TOML, or JSON when the extension is .json)
# data_file = "~/.local/share/kbtree/catalog.toml"

[viewer]
# Administrators see inactive and district-restricted categories
# admin = false

# Districts of a non-admin viewer
# districts = ["north"]

[display]
# List linked procedures in `kbtree tree`
# show_procedures = true

# Print structural warnings (cycles, dangling parents) after results
# show_warnings = true
"#
        .to_string()
    }
}

fn resolve_relative(path: &Path, base_dir: &Path) -> PathBuf {
    let expanded = PathBuf::from(expand_path(path.to_string_lossy().as_ref()));
    if expanded.is_absolute() {
        expanded
    } else {
        base_dir.join(expanded)
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
