//! The immutable build context.
//!
//! A [`Site`] is assembled once from a validated [`SiteConfig`]: the compiled
//! page rules, the version table and the markdown renderer. It is then shared
//! by reference with every stage (and every rayon worker) for the rest of the
//! invocation. Nothing on it is mutable.

use crate::config::{self, ConfigError, SiteConfig};
use crate::layout::{LayoutError, LayoutResolver, Resolution};
use crate::markdown::MarkdownRenderer;
use crate::versions::{UnknownKeyError, VersionTable};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct Site {
    root: PathBuf,
    config: SiteConfig,
    resolver: LayoutResolver,
    versions: VersionTable,
    markdown: MarkdownRenderer,
}

impl Site {
    /// Load `config.toml` from `root` and build the context.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let config = config::load_config(root)?;
        Self::from_config(root, config)
    }

    pub fn from_config(root: &Path, config: SiteConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let resolver = LayoutResolver::new(&config.pages, &config.default_layout)?;
        let versions = VersionTable::new(&config.versions, &config.version_aliases)?;
        let markdown = MarkdownRenderer::new(&config.markdown, &config.syntax);
        log::info!(
            "site at {}: {} page rules, {} version keys",
            root.display(),
            config.pages.len(),
            versions.len()
        );
        Ok(Self {
            root: root.to_path_buf(),
            config,
            resolver,
            versions,
            markdown,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn resolver(&self) -> &LayoutResolver {
        &self.resolver
    }

    pub fn versions(&self) -> &VersionTable {
        &self.versions
    }

    pub fn markdown(&self) -> &MarkdownRenderer {
        &self.markdown
    }

    pub fn source_dir(&self) -> PathBuf {
        self.root.join(&self.config.source_dir)
    }

    pub fn build_dir(&self) -> PathBuf {
        self.root.join(&self.config.build_dir)
    }

    pub fn layouts_dir(&self) -> PathBuf {
        self.source_dir().join("layouts")
    }

    /// Layout for a site-relative request path.
    pub fn layout_for(&self, request_path: &str) -> Result<Resolution<'_>, LayoutError> {
        self.resolver.resolve(request_path)
    }

    /// Version string for a symbolic name.
    pub fn version(&self, key: &str) -> Result<&str, UnknownKeyError> {
        self.versions.get(key)
    }
}
