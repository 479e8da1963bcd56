//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/procguide/procguide.toml`
//! 3. Local config: file passed with `--config`
//! 4. Environment variables: `PROCGUIDE_*` prefix, `__` between section and key

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;

/// Cache tiers and entry lifetimes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheSettings {
    /// Fast tier capacity in entries
    pub capacity: usize,
    /// Lifetime of a generated tree
    pub tree_ttl_secs: u64,
    /// Lifetime of merged search results
    pub search_ttl_secs: u64,
    /// Directory of the durable tier; unset keeps the cache in memory only
    pub durable_dir: Option<PathBuf>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: 100,
            tree_ttl_secs: 1800,
            search_ttl_secs: 3600,
            durable_dir: None,
        }
    }
}

/// External search command and fan-out limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SearchSettings {
    /// Command printing a JSON array of `{title, url, description}`
    pub command: Option<String>,
    pub args: Vec<String>,
    /// Pause between consecutive search calls
    pub delay_ms: u64,
    pub max_queries: usize,
    pub max_results: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            command: None,
            args: vec![],
            delay_ms: 1200,
            max_queries: 4,
            max_results: 15,
        }
    }
}

/// External text-generation command and strategy order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Command reading a JSON request on stdin and printing the response
    pub command: Option<String>,
    pub args: Vec<String>,
    /// Strategy names, tried in order
    pub strategies: Vec<String>,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            command: None,
            args: vec![],
            strategies: vec!["rich".into(), "simplified".into(), "minimal".into()],
        }
    }
}

/// Raw sections for intermediate parsing: `None` means "not specified, inherit".
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawCacheSettings {
    pub capacity: Option<usize>,
    pub tree_ttl_secs: Option<u64>,
    pub search_ttl_secs: Option<u64>,
    pub durable_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSearchSettings {
    pub command: Option<String>,
    pub args: Option<Vec<String>>,
    pub delay_ms: Option<u64>,
    pub max_queries: Option<usize>,
    pub max_results: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawGeneratorSettings {
    pub command: Option<String>,
    pub args: Option<Vec<String>>,
    pub strategies: Option<Vec<String>>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub cache: RawCacheSettings,
    pub search: RawSearchSettings,
    pub generator: RawGeneratorSettings,
}

/// Unified configuration for procguide.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Settings {
    pub cache: CacheSettings,
    pub search: SearchSettings,
    pub generator: GeneratorSettings,
}

/// Get the XDG config directory for procguide.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "procguide").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("procguide.toml"))
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

/// Expand `~`, `$VAR` and `${VAR}`; unknown variables leave the input as is.
fn expand(value: &str) -> String {
    shellexpand::full(value)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

impl Settings {
    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        if let Some(dir) = &self.cache.durable_dir {
            self.cache.durable_dir = Some(PathBuf::from(expand(&dir.to_string_lossy())));
        }
        if let Some(cmd) = &self.search.command {
            self.search.command = Some(expand(cmd));
        }
        if let Some(cmd) = &self.generator.command {
            self.generator.command = Some(expand(cmd));
        }
    }

    /// Overlay wins wherever it specifies a value; arrays are replaced whole.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        let (c, s, g) = (&overlay.cache, &overlay.search, &overlay.generator);
        Self {
            cache: CacheSettings {
                capacity: c.capacity.unwrap_or(self.cache.capacity),
                tree_ttl_secs: c.tree_ttl_secs.unwrap_or(self.cache.tree_ttl_secs),
                search_ttl_secs: c.search_ttl_secs.unwrap_or(self.cache.search_ttl_secs),
                durable_dir: c
                    .durable_dir
                    .clone()
                    .or_else(|| self.cache.durable_dir.clone()),
            },
            search: SearchSettings {
                command: s.command.clone().or_else(|| self.search.command.clone()),
                args: s.args.clone().unwrap_or_else(|| self.search.args.clone()),
                delay_ms: s.delay_ms.unwrap_or(self.search.delay_ms),
                max_queries: s.max_queries.unwrap_or(self.search.max_queries),
                max_results: s.max_results.unwrap_or(self.search.max_results),
            },
            generator: GeneratorSettings {
                command: g.command.clone().or_else(|| self.generator.command.clone()),
                args: g.args.clone().unwrap_or_else(|| self.generator.args.clone()),
                strategies: g
                    .strategies
                    .clone()
                    .unwrap_or_else(|| self.generator.strategies.clone()),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local` - Optional explicit config file; it must exist
    pub fn load(local: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(local_path) = local {
            if !local_path.exists() {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", local_path.display()),
                });
            }
            current = current.merge_with(&load_raw_settings(local_path)?);
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply PROCGUIDE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("PROCGUIDE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("search.args")
                .with_list_parse_key("generator.args")
                .with_list_parse_key("generator.strategies"),
        );

        let config = builder.build().map_err(config_err)?;

        if let Some(val) = get_count(&config, "cache.capacity")? {
            settings.cache.capacity = val as usize;
        }
        if let Some(val) = get_count(&config, "cache.tree_ttl_secs")? {
            settings.cache.tree_ttl_secs = val;
        }
        if let Some(val) = get_count(&config, "cache.search_ttl_secs")? {
            settings.cache.search_ttl_secs = val;
        }
        if let Ok(val) = config.get_string("cache.durable_dir") {
            settings.cache.durable_dir = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get_string("search.command") {
            settings.search.command = Some(val);
        }
        if let Ok(val) = config.get::<Vec<String>>("search.args") {
            settings.search.args = val;
        }
        if let Some(val) = get_count(&config, "search.delay_ms")? {
            settings.search.delay_ms = val;
        }
        if let Some(val) = get_count(&config, "search.max_queries")? {
            settings.search.max_queries = val as usize;
        }
        if let Some(val) = get_count(&config, "search.max_results")? {
            settings.search.max_results = val as usize;
        }
        if let Ok(val) = config.get_string("generator.command") {
            settings.generator.command = Some(val);
        }
        if let Ok(val) = config.get::<Vec<String>>("generator.args") {
            settings.generator.args = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("generator.strategies") {
            settings.generator.strategies = val;
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
        r#"# procguide configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/procguide/procguide.toml
#   Local:  file given with --config
#   Env:    PROCGUIDE_<SECTION>__<KEY>, e.g. PROCGUIDE_CACHE__CAPACITY=200

[cache]
# Fast tier capacity (entries)
# capacity = 100

# Lifetime of generated trees and of merged search results
# tree_ttl_secs = 1800
# search_ttl_secs = 3600

# Durable tier directory; leave unset for a memory-only cache
# durable_dir = "~/.cache/procguide"

[search]
# Command printing a JSON array of {title, url, description} for the query
# given as its last argument
# command = "~/bin/websearch"
# args = ["--json"]

# Pause between consecutive search calls
# delay_ms = 1200
# max_queries = 4
# max_results = 15

[generator]
# Command reading {"prompt", "max_output_tokens", "temperature"} as JSON on
# stdin and printing the model response
# command = "~/bin/generate"
# args = []

# Strategies tried in order until one yields a valid tree
# strategies = ["rich", "simplified", "minimal"]
"#
        .to_string()
    }
}

/// Read a non-negative integer override, `None` if unset.
fn get_count(config: &Config, key: &str) -> Result<Option<u64>, ApplicationError> {
    match config.get_int(key) {
        Ok(val) => u64::try_from(val)
            .map(Some)
            .map_err(|_| ApplicationError::Config {
                message: format!("{key} must not be negative: {val}"),
            }),
        Err(ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(config_err(e)),
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
    fn given_default_settings_when_created_then_has_expected_values() {
        let settings = Settings::default();

        assert_eq!(settings.cache.capacity, 100);
        assert_eq!(settings.cache.tree_ttl_secs, 1800);
        assert_eq!(settings.search.delay_ms, 1200);
        assert_eq!(
            settings.generator.strategies,
            vec!["rich", "simplified", "minimal"]
        );
    }

    #[test]
    fn given_tilde_in_durable_dir_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings::default();
        settings.cache.durable_dir = Some(PathBuf::from("~/.cache/procguide"));

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        let dir = settings.cache.durable_dir.unwrap();
        assert!(dir.to_string_lossy().starts_with(&home), "{}", dir.display());
    }

    #[test]
    fn given_partial_overlay_when_merging_then_keeps_unspecified_values() {
        let overlay: RawSettings = toml::from_str(
            r#"
            [cache]
            capacity = 5
            [generator]
            strategies = ["minimal"]
            "#,
        )
        .unwrap();

        let merged = Settings::default().merge_with(&overlay);

        assert_eq!(merged.cache.capacity, 5);
        assert_eq!(merged.cache.tree_ttl_secs, 1800);
        assert_eq!(merged.generator.strategies, vec!["minimal"]);
    }

    #[test]
    fn given_template_when_parsed_then_is_valid_toml() {
        let parsed: Result<RawSettings, _> = toml::from_str(&Settings::template());
        assert!(parsed.is_ok());
    }
}
