//! Site configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. The file lives at
//! the project root, next to the source directory:
//!
//! ```text
//! project/
//! ├── config.toml              # Site config (overrides stock defaults)
//! └── source/
//!     ├── layouts/
//!     │   ├── layout.html      # Default layout
//!     │   ├── 1.x.html
//!     │   └── 2.x.html
//!     ├── stylesheets/
//!     ├── javascripts/
//!     ├── images/
//!     ├── index.html.md
//!     └── documentation/
//!         ├── 1.x/
//!         └── 2.x/
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! source_dir = "source"
//! build_dir = "build"
//! default_layout = "layout"
//!
//! [assets]
//! css_dir = "stylesheets"
//! js_dir = "javascripts"
//! images_dir = "images"
//!
//! [markdown]
//! engine = "redcarpet"
//! fenced_code_blocks = true
//! smartypants = true
//! autolink = true
//! with_toc_data = true
//!
//! [syntax]
//! enabled = true
//! line_anchors = false
//!
//! [i18n]
//! enforce_available_locales = false
//!
//! [versions]
//! latest_version = "3.0.2"
//! v1_version = "1.7.7"
//!
//! [version_aliases]
//! version = "latest_version"
//!
//! [[pages]]
//! pattern = "/documentation/1.x/*"
//! layout = "1.x"
//!
//! [deploy]
//! build_before = true
//! method = "git"
//! branch = "master"
//! remote = "origin"
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Tables merge key by key on top of the stock
//! defaults; arrays (such as `pages`) replace the stock value wholesale:
//!
//! ```toml
//! [versions]
//! latest_version = "3.1.0"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::layout::{Layout, LayoutResolver, PageRule};
use crate::versions::VersionTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path};
use thiserror::Error;

/// Name of the configuration file at the project root.
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Invalid page pattern {pattern:?}: {reason}")]
    Pattern { pattern: String, reason: String },
    #[error("Version {key:?} is not a semantic version: {value:?}")]
    Version { key: String, value: String },
    #[error("Version alias {alias:?} points at unknown version {target:?}")]
    Alias { alias: String, target: String },
}

/// Site configuration loaded from `config.toml`.
///
/// All fields have defaults matching the canonical documentation site. User
/// config files need only specify the values they want to override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Directory holding pages, layouts and assets, relative to the project root.
    pub source_dir: String,
    /// Output directory for the generated site, relative to the project root.
    pub build_dir: String,
    /// Layout applied when no page rule matches.
    pub default_layout: String,
    /// Asset directory names inside `source_dir`.
    pub assets: AssetsConfig,
    /// Flags passed through to the markdown renderer.
    pub markdown: MarkdownConfig,
    /// Code block highlighting markup.
    pub syntax: SyntaxConfig,
    /// Locale handling flags.
    pub i18n: I18nConfig,
    /// Version constants exposed to templates, keyed by symbolic name.
    pub versions: BTreeMap<String, String>,
    /// Names that resolve to another entry of `versions`.
    pub version_aliases: BTreeMap<String, String>,
    /// Ordered path → layout rules. First match wins.
    pub pages: Vec<PageRule>,
    /// Publishing settings.
    pub deploy: DeployConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        let versions = [
            ("latest_version", "3.0.2"),
            ("latest_play_support_version", "2.2.0"),
            ("v1_version", "1.7.7"),
            ("v2_version", "2.6.0"),
            ("h2_version", "1.4.178"),
            ("logback_version", "1.1.2"),
        ];
        let aliases = [
            ("version", "latest_version"),
            ("v1_latest_version", "v1_version"),
            ("v2_latest_version", "v2_version"),
        ];
        Self {
            source_dir: "source".to_string(),
            build_dir: "build".to_string(),
            default_layout: "layout".to_string(),
            assets: AssetsConfig::default(),
            markdown: MarkdownConfig::default(),
            syntax: SyntaxConfig::default(),
            i18n: I18nConfig::default(),
            versions: versions
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            version_aliases: aliases
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            pages: vec![
                PageRule::new("/documentation/1.x/*", Layout::Named("1.x".to_string())),
                PageRule::new("/documentation/2.x/*", Layout::Named("2.x".to_string())),
            ],
            deploy: DeployConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values, including the page patterns and version strings.
    ///
    /// Everything a build would trip over later is checked here so a broken
    /// config aborts before any page is touched.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_layout.trim().is_empty() {
            return Err(ConfigError::Validation(
                "default_layout must not be empty".into(),
            ));
        }
        let source = project_dir("source_dir", &self.source_dir)?;
        let build = project_dir("build_dir", &self.build_dir)?;
        if build.is_empty() {
            return Err(ConfigError::Validation(
                "build_dir must be a subdirectory of the project root".into(),
            ));
        }
        if build.starts_with(&source) || source.starts_with(&build) {
            return Err(ConfigError::Validation(format!(
                "build_dir {:?} and source_dir {:?} must not contain each other",
                self.build_dir, self.source_dir
            )));
        }
        self.assets.validate()?;
        self.deploy.validate()?;
        LayoutResolver::new(&self.pages, &self.default_layout)?;
        VersionTable::new(&self.versions, &self.version_aliases)?;
        Ok(())
    }
}

/// Normal components of a project-relative directory. `.` segments are
/// dropped, so `"."` and `"./"` come back empty.
fn project_dir<'a>(key: &str, dir: &'a str) -> Result<Vec<&'a std::ffi::OsStr>, ConfigError> {
    if dir.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{key} must not be empty")));
    }
    let mut parts = Vec::new();
    for component in Path::new(dir).components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            _ => {
                return Err(ConfigError::Validation(format!(
                    "{key} must be a relative path inside the project root, got {dir:?}"
                )));
            }
        }
    }
    Ok(parts)
}

/// Asset directory roots, relative to `source_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssetsConfig {
    pub css_dir: String,
    pub js_dir: String,
    pub images_dir: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            css_dir: "stylesheets".to_string(),
            js_dir: "javascripts".to_string(),
            images_dir: "images".to_string(),
        }
    }
}

impl AssetsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let dirs = [
            ("assets.css_dir", &self.css_dir),
            ("assets.js_dir", &self.js_dir),
            ("assets.images_dir", &self.images_dir),
        ];
        for (key, dir) in dirs {
            if dir.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
            if Path::new(dir.as_str()).is_absolute() || dir.split('/').any(|c| c == "..") {
                return Err(ConfigError::Validation(format!(
                    "{key} must be a path inside source_dir, got {dir:?}"
                )));
            }
        }
        if self.css_dir == self.js_dir
            || self.css_dir == self.images_dir
            || self.js_dir == self.images_dir
        {
            return Err(ConfigError::Validation(
                "asset directories must be distinct".into(),
            ));
        }
        Ok(())
    }
}

/// Markdown rendering backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkdownEngine {
    /// Extended dialect: tables and strikethrough on top of CommonMark.
    #[default]
    Redcarpet,
    /// Strict CommonMark, no extensions.
    Commonmark,
}

/// Flags passed through to the markdown renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkdownConfig {
    pub engine: MarkdownEngine,
    /// Treat ```` ``` ```` fences as code blocks.
    pub fenced_code_blocks: bool,
    /// Curly quotes, dashes and ellipses.
    pub smartypants: bool,
    /// Turn bare URLs into links.
    pub autolink: bool,
    /// Give headings `id` anchors and collect a table of contents.
    pub with_toc_data: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            engine: MarkdownEngine::Redcarpet,
            fenced_code_blocks: true,
            smartypants: true,
            autolink: true,
            with_toc_data: true,
        }
    }
}

/// Code block highlighting markup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyntaxConfig {
    /// Wrap fenced code in `highlight` markup with a language class.
    pub enabled: bool,
    /// Emit a linkable `L{n}` anchor for every code line.
    pub line_anchors: bool,
}

impl Default for SyntaxConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            line_anchors: false,
        }
    }
}

/// Locale handling flags. Carried for templates; not enforced by the build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct I18nConfig {
    pub enforce_available_locales: bool,
}

/// How the built site is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployMethod {
    /// Commit the build directory to a branch and force-push it.
    #[default]
    Git,
}

/// Publishing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeployConfig {
    /// Run a full build before publishing.
    pub build_before: bool,
    pub method: DeployMethod,
    /// Branch the built output is committed to.
    pub branch: String,
    /// Remote the branch is pushed to.
    pub remote: String,
    /// Message for the publish commit.
    pub commit_message: String,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            build_before: true,
            method: DeployMethod::Git,
            branch: "master".to_string(),
            remote: "origin".to_string(),
            commit_message: "Automated commit by docsite".to_string(),
        }
    }
}

impl DeployConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.branch.is_empty() || self.branch.chars().any(char::is_whitespace) {
            return Err(ConfigError::Validation(format!(
                "deploy.branch must be a non-empty name without whitespace, got {:?}",
                self.branch
            )));
        }
        if self.remote.trim().is_empty() {
            return Err(ConfigError::Validation(
                "deploy.remote must not be empty".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged on top of.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay, arrays included, replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from the project root as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the site config from `config.toml` in the project root.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    let config = resolve_config(base, overlay)?;
    log::debug!(
        "loaded config from {} ({} page rules, {} versions)",
        root.display(),
        config.pages.len(),
        config.versions.len()
    );
    Ok(config)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# docsite Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Tables merge key by key on top of these defaults; arrays such as
# [[pages]] replace the default list entirely.
# Unknown keys will cause an error.

# Directory holding pages, layouts and assets.
source_dir = "source"

# Output directory for the generated site.
build_dir = "build"

# Layout used when no [[pages]] rule matches. Looked up as
# <source_dir>/layouts/<name>.html; a built-in document is used if missing.
default_layout = "layout"

# ---------------------------------------------------------------------------
# Asset directories (inside source_dir, copied verbatim)
# ---------------------------------------------------------------------------
[assets]
css_dir = "stylesheets"
js_dir = "javascripts"
images_dir = "images"

# ---------------------------------------------------------------------------
# Markdown
# ---------------------------------------------------------------------------
[markdown]
# "redcarpet" (tables, strikethrough) or "commonmark" (strict).
engine = "redcarpet"
fenced_code_blocks = true
smartypants = true
autolink = true
# Heading id anchors for in-page links.
with_toc_data = true

# ---------------------------------------------------------------------------
# Code block markup
# ---------------------------------------------------------------------------
[syntax]
enabled = true
# Add an L<n> anchor to every code line.
line_anchors = false

# ---------------------------------------------------------------------------
# Locales
# ---------------------------------------------------------------------------
[i18n]
enforce_available_locales = false

# ---------------------------------------------------------------------------
# Version constants, available in pages and layouts as {{ name }}
# Placeholders are replaced everywhere in a page, code blocks included.
# Write \{{ for a literal "{{" in code samples.
# ---------------------------------------------------------------------------
[versions]
latest_version = "3.0.2"
latest_play_support_version = "2.2.0"
v1_version = "1.7.7"
v2_version = "2.6.0"
h2_version = "1.4.178"
logback_version = "1.1.2"

# Names that resolve to one of the versions above.
[version_aliases]
version = "latest_version"
v1_latest_version = "v1_version"
v2_latest_version = "v2_version"

# ---------------------------------------------------------------------------
# Page layout rules, evaluated in order. First match wins.
# A pattern is an anchored path, optionally ending in a single "*".
# Use layout = false to render matching pages without a layout.
# ---------------------------------------------------------------------------
[[pages]]
pattern = "/documentation/1.x/*"
layout = "1.x"

[[pages]]
pattern = "/documentation/2.x/*"
layout = "2.x"

# ---------------------------------------------------------------------------
# Deployment
# ---------------------------------------------------------------------------
[deploy]
# Build the site before publishing.
build_before = true
method = "git"
branch = "master"
remote = "origin"
commit_message = "Automated commit by docsite"
"##
}
