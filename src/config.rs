//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/itpcat/itpcat.toml`
//! 3. Local config: `<data_dir>/.itpcat.toml`
//! 4. Environment variables: `ITPCAT_*` prefix
//! 5. `--data-dir` on the command line

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;

/// Unified configuration for itpcat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the catalog sources (default: ./data)
    pub data_dir: PathBuf,
    /// MSC taxonomy JSON, relative to data_dir
    pub taxonomy_file: PathBuf,
    /// Library index CSV, relative to data_dir
    pub library_index: PathBuf,
    /// Directory of per-library package CSVs, relative to data_dir
    pub library_dir: PathBuf,
    /// Leave empty categories out of printed trees and tables
    pub hide_empty: bool,
    /// Collapse packages sharing a name (verified rows win)
    pub dedupe_packages: bool,
    /// Explicit index file name -> package CSV path, consulted before library_dir
    pub library_files: BTreeMap<String, PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            taxonomy_file: PathBuf::from("msc.json"),
            library_index: PathBuf::from("libraries.csv"),
            library_dir: PathBuf::from("library_data"),
            hide_empty: false,
            dedupe_packages: false,
            library_files: BTreeMap::new(),
        }
    }
}

/// Raw settings for intermediate parsing (`None` means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub data_dir: Option<PathBuf>,
    pub taxonomy_file: Option<PathBuf>,
    pub library_index: Option<PathBuf>,
    pub library_dir: Option<PathBuf>,
    pub hide_empty: Option<bool>,
    pub dedupe_packages: Option<bool>,
    pub library_files: Option<BTreeMap<String, PathBuf>>,
}

/// Get the XDG config directory for itpcat.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "itpcat").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("itpcat.toml"))
}

/// Get the path to the local config file in a data directory.
pub fn local_config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(".itpcat.toml")
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

/// Expand `~`, `$VAR` and `${VAR}` in a path string.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(expand_env_vars(path.to_string_lossy().as_ref()))
}

impl Settings {
    pub fn taxonomy_path(&self) -> PathBuf {
        self.data_dir.join(&self.taxonomy_file)
    }

    pub fn library_index_path(&self) -> PathBuf {
        self.data_dir.join(&self.library_index)
    }

    /// Resolve a `file` column of the library index to a package CSV.
    ///
    /// Explicit `library_files` entries win; relative entries resolve against
    /// data_dir.
    pub fn library_file_path(&self, file: &str) -> PathBuf {
        match self.library_files.get(file) {
            Some(path) => self.data_dir.join(path),
            None => self.data_dir.join(&self.library_dir).join(file),
        }
    }

    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        self.data_dir = expand_path(&self.data_dir);
        self.taxonomy_file = expand_path(&self.taxonomy_file);
        self.library_index = expand_path(&self.library_index);
        self.library_dir = expand_path(&self.library_dir);
        for path in self.library_files.values_mut() {
            *path = expand_path(path);
        }
    }

    /// Merge overlay config onto self (base).
    ///
    /// - Scalar options: overlay wins if Some, otherwise keep base
    /// - `library_files`: union, overlay entries replace base entries of the same name
    pub fn merge_with(&self, overlay: &RawSettings) -> Self {
        let mut library_files = self.library_files.clone();
        if let Some(files) = &overlay.library_files {
            library_files.extend(files.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Self {
            data_dir: overlay
                .data_dir
                .clone()
                .unwrap_or_else(|| self.data_dir.clone()),
            taxonomy_file: overlay
                .taxonomy_file
                .clone()
                .unwrap_or_else(|| self.taxonomy_file.clone()),
            library_index: overlay
                .library_index
                .clone()
                .unwrap_or_else(|| self.library_index.clone()),
            library_dir: overlay
                .library_dir
                .clone()
                .unwrap_or_else(|| self.library_dir.clone()),
            hide_empty: overlay.hide_empty.unwrap_or(self.hide_empty),
            dedupe_packages: overlay.dedupe_packages.unwrap_or(self.dedupe_packages),
            library_files,
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `data_dir` - Data directory given on the command line; overrides every
    ///   layer and selects the local config file
    pub fn load(data_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        if let Some(dir) = data_dir {
            current.data_dir = dir.to_path_buf();
        }

        // 3. Local config next to the data
        let local_path = local_config_path(&expand_path(&current.data_dir));
        if local_path.exists() {
            let raw = load_raw_settings(&local_path)?;
            current = current.merge_with(&raw);
        }

        // 4. Environment variables (explicit override)
        current = Self::apply_env_overrides(current)?;

        // 5. Command line
        if let Some(dir) = data_dir {
            current.data_dir = dir.to_path_buf();
        }

        current.expand_paths();
        Ok(current)
    }

    /// Apply ITPCAT_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("ITPCAT").separator("__"))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("data_dir") {
            settings.data_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("taxonomy_file") {
            settings.taxonomy_file = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("library_index") {
            settings.library_index = PathBuf::from(val);
        }
        if let Ok(val) = config.get_string("library_dir") {
            settings.library_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get_bool("hide_empty") {
            settings.hide_empty = val;
        }
        if let Ok(val) = config.get_bool("dedupe_packages") {
            settings.dedupe_packages = val;
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
        r#"# itpcat configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/itpcat/itpcat.toml
#   Local:  <data_dir>/.itpcat.toml
#   Env:    ITPCAT_* environment variables
#   CLI:    --data-dir

# Directory holding msc.json, libraries.csv and library_data/
# data_dir = "data"

# Sources, relative to data_dir
# taxonomy_file = "msc.json"
# library_index = "libraries.csv"
# library_dir = "library_data"

# Leave empty categories out of trees and tables
# hide_empty = false

# Collapse packages sharing a name (verified rows win)
# dedupe_packages = false

# Explicit locations for files named in the library index
[library_files]
# "afp_packages.csv" = "~/afp/afp_packages.csv"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_defaults_when_resolving_paths_then_joins_data_dir() {
        let settings = Settings::default();
        assert_eq!(settings.taxonomy_path(), PathBuf::from("data/msc.json"));
        assert_eq!(
            settings.library_file_path("coq.csv"),
            PathBuf::from("data/library_data/coq.csv")
        );
    }

    #[test]
    fn given_library_file_override_when_resolving_then_uses_override() {
        let mut settings = Settings::default();
        settings
            .library_files
            .insert("afp.csv".into(), PathBuf::from("/srv/afp.csv"));
        assert_eq!(
            settings.library_file_path("afp.csv"),
            PathBuf::from("/srv/afp.csv")
        );
    }

    #[test]
    fn given_tilde_in_data_dir_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            data_dir: PathBuf::from("~/itp"),
            ..Default::default()
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        let data_dir = settings.data_dir.to_string_lossy();
        assert!(
            data_dir.starts_with(&home),
            "data_dir should start with home dir: {}",
            data_dir
        );
        assert!(!data_dir.contains('~'));
    }

    #[test]
    fn given_overlay_when_merging_then_scalars_override_and_maps_union() {
        let mut base = Settings::default();
        base.library_files
            .insert("a.csv".into(), PathBuf::from("base/a.csv"));
        base.library_files
            .insert("b.csv".into(), PathBuf::from("base/b.csv"));

        let overlay = RawSettings {
            hide_empty: Some(true),
            library_files: Some(BTreeMap::from([
                ("b.csv".to_string(), PathBuf::from("local/b.csv")),
                ("c.csv".to_string(), PathBuf::from("local/c.csv")),
            ])),
            ..Default::default()
        };

        let result = base.merge_with(&overlay);

        assert!(result.hide_empty);
        assert!(!result.dedupe_packages);
        assert_eq!(result.data_dir, PathBuf::from("data"));
        assert_eq!(result.library_files.len(), 3);
        assert_eq!(result.library_files["a.csv"], PathBuf::from("base/a.csv"));
        assert_eq!(result.library_files["b.csv"], PathBuf::from("local/b.csv"));
    }

    #[test]
    fn given_settings_when_serializing_then_round_trips_through_toml() {
        let settings = Settings::default();
        let toml = settings.to_toml().unwrap();
        let parsed: Settings = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn given_template_when_parsing_then_is_valid_toml() {
        let raw: RawSettings = toml::from_str(&Settings::template()).unwrap();
        assert!(raw.data_dir.is_none());
        assert_eq!(raw.library_files.map(|m| m.len()), Some(0));
    }
}
