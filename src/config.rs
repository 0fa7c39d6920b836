//! Configuration file parsing, defaults, and merging.
//!
//! Configuration is loaded in layers (last wins):
//! 1. Built-in defaults
//! 2. Global config from `~/.scout/config.toml`
//! 3. Per-project config from `<root>/.scout/config.toml`
//!
//! Each layer only overrides fields it explicitly sets; absent fields
//! are left at their previous value.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Public config types (fully resolved, no Options)
// ---------------------------------------------------------------------------

/// Top-level configuration, fully resolved with defaults applied.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Config {
    pub index: IndexConfig,
    pub search: SearchConfig,
    pub ignore: IgnoreConfig,
}

/// Inventory / parsing settings.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexConfig {
    /// Maximum file size (in KiB) the scanner will read.
    pub max_file_size_kb: u64,
    /// Extra file extensions treated as code beyond the built-in set.
    pub additional_extensions: Vec<String>,
}

/// Search defaults and caps.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Default number of context lines around advanced-search matches.
    pub context_lines: usize,
    /// Default result cap for advanced search.
    pub max_results: usize,
    /// Result cap for reference scans (these legitimately return many hits).
    pub reference_cap: usize,
}

/// Ignore / exclusion settings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IgnoreConfig {
    /// Extra glob patterns to exclude from walks and indexing.
    pub patterns: Vec<String>,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_file_size_kb: 1024,
            additional_extensions: Vec::new(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            context_lines: 2,
            max_results: 50,
            reference_cap: 1000,
        }
    }
}

// ---------------------------------------------------------------------------
// Option-based overlay types (for partial deserialization)
// ---------------------------------------------------------------------------

/// Mirror of [`Config`] where every field is `Option`, so we can
/// deserialize a partial TOML file and overlay only the keys that are
/// present.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigOverlay {
    index: Option<IndexOverlay>,
    search: Option<SearchOverlay>,
    ignore: Option<IgnoreOverlay>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct IndexOverlay {
    max_file_size_kb: Option<u64>,
    additional_extensions: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SearchOverlay {
    context_lines: Option<usize>,
    max_results: Option<usize>,
    reference_cap: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct IgnoreOverlay {
    patterns: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Merge helpers
// ---------------------------------------------------------------------------

impl Config {
    /// Apply an overlay on top of this config, replacing only the fields
    /// that are `Some` in the overlay.
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        if let Some(idx) = overlay.index {
            if let Some(v) = idx.max_file_size_kb {
                self.index.max_file_size_kb = v;
            }
            if let Some(v) = idx.additional_extensions {
                self.index.additional_extensions = v;
            }
        }
        if let Some(s) = overlay.search {
            if let Some(v) = s.context_lines {
                self.search.context_lines = v;
            }
            if let Some(v) = s.max_results {
                self.search.max_results = v;
            }
            if let Some(v) = s.reference_cap {
                self.search.reference_cap = v;
            }
        }
        if let Some(ign) = overlay.ignore
            && let Some(v) = ign.patterns
        {
            self.ignore.patterns = v;
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Path of the global config file, if a home directory can be determined.
fn global_config_path() -> Option<PathBuf> {
    #[allow(deprecated)]
    std::env::home_dir().map(|home| home.join(".scout").join("config.toml"))
}

/// Parse one TOML file into an overlay. A missing file yields an empty
/// overlay; a malformed file is an error.
fn load_overlay(path: &Path) -> Result<ConfigOverlay> {
    if !path.is_file() {
        return Ok(ConfigOverlay::default());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("malformed config file {}", path.display()))
}

/// Load the fully-resolved configuration for a project root.
pub fn load(project_root: &Path) -> Result<Config> {
    let mut config = Config::default();
    if let Some(global) = global_config_path() {
        config.apply_overlay(load_overlay(&global)?);
    }
    let local = project_root.join(".scout").join("config.toml");
    config.apply_overlay(load_overlay(&local)?);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn defaults_are_sane() {
        let c = Config::default();
        assert_eq!(c.index.max_file_size_kb, 1024);
        assert_eq!(c.search.context_lines, 2);
        assert_eq!(c.search.max_results, 50);
        assert!(c.ignore.patterns.is_empty());
    }

    #[test]
    fn overlay_replaces_only_present_fields() {
        let mut c = Config::default();
        let overlay: ConfigOverlay = toml::from_str(
            r#"
            [search]
            max_results = 10
            "#,
        )
        .unwrap();
        c.apply_overlay(overlay);
        assert_eq!(c.search.max_results, 10);
        // untouched fields keep their defaults
        assert_eq!(c.search.context_lines, 2);
        assert_eq!(c.index.max_file_size_kb, 1024);
    }

    #[test]
    fn overlay_sets_ignore_patterns() {
        let mut c = Config::default();
        let overlay: ConfigOverlay = toml::from_str(
            r#"
            [ignore]
            patterns = ["generated/", "*.min.js"]
            "#,
        )
        .unwrap();
        c.apply_overlay(overlay);
        assert_eq!(c.ignore.patterns, vec!["generated/", "*.min.js"]);
    }

    #[test]
    fn missing_file_yields_empty_overlay() {
        let td = tempfile::tempdir().unwrap();
        let overlay = load_overlay(&td.path().join("nope.toml")).unwrap();
        assert!(overlay.index.is_none());
        assert!(overlay.search.is_none());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let td = tempfile::tempdir().unwrap();
        let p = td.path().join("config.toml");
        fs::write(&p, "not [ valid toml").unwrap();
        assert!(load_overlay(&p).is_err());
    }

    #[test]
    fn per_project_file_is_applied() {
        let td = tempfile::tempdir().unwrap();
        let dir = td.path().join(".scout");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("config.toml"),
            "[index]\nmax_file_size_kb = 64\n",
        )
        .unwrap();
        let c = load(td.path()).unwrap();
        assert_eq!(c.index.max_file_size_kb, 64);
    }
}
