//! Source tree scanning.
//!
//! Walks `source_dir` and sorts every file into one of three buckets:
//!
//! ```text
//! source/
//! ├── layouts/
//! │   ├── layout.html              # Layout template "layout"
//! │   └── 1.x.html                 # Layout template "1.x"
//! ├── stylesheets/site.css         # Asset (css_dir)
//! ├── javascripts/site.js          # Asset (js_dir)
//! ├── images/logo.png              # Asset (images_dir)
//! ├── _partials/                   # Underscore prefix: skipped
//! ├── index.html.md                # Page → /index.html
//! ├── CNAME                        # Asset (copied verbatim)
//! └── documentation/
//!     └── 1.x/
//!         ├── index.html.md        # Page → /documentation/1.x/index.html
//!         └── routing.md           # Page → /documentation/1.x/routing.html
//! ```
//!
//! ## Page Paths
//!
//! - `name.html.md`, `name.md`, `name.markdown` → `/name.html` (markdown)
//! - `name.html` → `/name.html` (HTML, interpolated but not converted)
//!
//! Everything inside an asset directory is an asset regardless of extension.
//!
//! ## Validation
//!
//! - The source directory must exist.
//! - Two sources may not produce the same output path.

use crate::config::AssetsConfig;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Directory under `source_dir` holding layout templates.
pub const LAYOUTS_DIR: &str = "layouts";

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Source directory not found: {0}")]
    MissingSource(PathBuf),
    #[error("{first} and {second} both produce {output}")]
    DuplicateOutput {
        output: String,
        first: String,
        second: String,
    },
}

/// Manifest output from the scan stage.
#[derive(Debug, Serialize)]
pub struct Manifest {
    pub pages: Vec<Page>,
    pub layouts: Vec<LayoutTemplate>,
    pub assets: Vec<Asset>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    Markdown,
    Html,
}

/// A renderable page.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    /// Path relative to `source_dir`, `/`-separated.
    pub source_path: String,
    /// Site-relative URL path, e.g. `/documentation/1.x/index.html`.
    pub request_path: String,
    /// Path relative to the build directory.
    pub output_path: String,
    /// First `# heading` (markdown) or `<h1>` (HTML); derived from the file name otherwise.
    pub title: String,
    pub kind: PageKind,
    #[serde(skip)]
    pub body: String,
}

/// A layout template from `layouts/`.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutTemplate {
    pub name: String,
    pub source_path: String,
    #[serde(skip)]
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Stylesheet,
    Javascript,
    Image,
    Other,
}

/// A file copied verbatim into the build directory.
#[derive(Debug, Clone, Serialize)]
pub struct Asset {
    pub source_path: String,
    pub kind: AssetKind,
}

impl Manifest {
    pub fn layout(&self, name: &str) -> Option<&LayoutTemplate> {
        self.layouts.iter().find(|l| l.name == name)
    }

    /// Site-relative URLs of the assets of one kind, in scan order.
    pub fn asset_urls(&self, kind: AssetKind) -> Vec<String> {
        self.assets
            .iter()
            .filter(|a| a.kind == kind)
            .map(|a| format!("/{}", a.source_path))
            .collect()
    }
}

pub fn scan(source: &Path, assets: &AssetsConfig) -> Result<Manifest, ScanError> {
    if !source.is_dir() {
        return Err(ScanError::MissingSource(source.to_path_buf()));
    }

    let mut pages = Vec::new();
    let mut layouts = Vec::new();
    let mut asset_files = Vec::new();

    let walker = WalkDir::new(source)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_skipped(e.file_name().to_string_lossy().as_ref()));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(source)
            .map(to_site_path)
            .unwrap_or_default();

        if let Some(kind) = asset_kind(&rel, assets) {
            asset_files.push(Asset {
                source_path: rel,
                kind,
            });
        } else if let Some(name) = layout_name(&rel) {
            layouts.push(LayoutTemplate {
                name: name.to_string(),
                body: fs::read_to_string(entry.path())?,
                source_path: rel,
            });
        } else if rel.starts_with(&format!("{LAYOUTS_DIR}/")) {
            log::debug!("ignoring non-template file {rel}");
        } else if let Some((request_path, kind)) = page_request_path(&rel) {
            let body = fs::read_to_string(entry.path())?;
            pages.push(Page {
                title: page_title(&body, kind, &rel),
                output_path: request_path.trim_start_matches('/').to_string(),
                request_path,
                source_path: rel,
                kind,
                body,
            });
        } else {
            asset_files.push(Asset {
                source_path: rel,
                kind: AssetKind::Other,
            });
        }
    }

    check_unique_outputs(&pages, &asset_files)?;
    log::info!(
        "scanned {}: {} pages, {} layouts, {} assets",
        source.display(),
        pages.len(),
        layouts.len(),
        asset_files.len()
    );

    Ok(Manifest {
        pages,
        layouts,
        assets: asset_files,
    })
}

/// Partials (`_name`) and hidden entries (`.name`) never reach the output.
fn is_skipped(name: &str) -> bool {
    name.starts_with('.') || name.starts_with('_')
}

fn to_site_path(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn asset_kind(rel: &str, assets: &AssetsConfig) -> Option<AssetKind> {
    let under = |dir: &str| {
        let dir = dir.trim_matches('/');
        rel.strip_prefix(dir).is_some_and(|rest| rest.starts_with('/'))
    };
    if under(&assets.css_dir) {
        Some(AssetKind::Stylesheet)
    } else if under(&assets.js_dir) {
        Some(AssetKind::Javascript)
    } else if under(&assets.images_dir) {
        Some(AssetKind::Image)
    } else {
        None
    }
}

/// `layouts/<name>.html` → `<name>`. Nested directories are not layouts.
fn layout_name(rel: &str) -> Option<&str> {
    let file = rel.strip_prefix(LAYOUTS_DIR)?.strip_prefix('/')?;
    if file.contains('/') {
        return None;
    }
    file.strip_suffix(".html").filter(|name| !name.is_empty())
}

/// Map a source path to its request path, or `None` if it is not a page.
pub fn page_request_path(rel: &str) -> Option<(String, PageKind)> {
    let (stem, kind) = if let Some(stem) = rel.strip_suffix(".html.md") {
        (stem, PageKind::Markdown)
    } else if let Some(stem) = rel
        .strip_suffix(".md")
        .or_else(|| rel.strip_suffix(".markdown"))
    {
        (stem, PageKind::Markdown)
    } else if let Some(stem) = rel.strip_suffix(".html") {
        (stem, PageKind::Html)
    } else {
        return None;
    };
    if stem.is_empty() || stem.ends_with('/') {
        return None;
    }
    Some((format!("/{stem}.html"), kind))
}

fn page_title(body: &str, kind: PageKind, rel: &str) -> String {
    let found = match kind {
        PageKind::Markdown => body
            .lines()
            .find(|line| line.starts_with("# "))
            .map(|line| line.trim_start_matches("# ").trim().to_string()),
        PageKind::Html => html_h1(body),
    };
    found
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| title_from_path(rel))
}

/// Text of the first `<h1>`, tags stripped.
fn html_h1(body: &str) -> Option<String> {
    let open = body.find("<h1")?;
    let content_start = open + body[open..].find('>')? + 1;
    let content_end = content_start + body[content_start..].find("</h1>")?;
    let mut text = String::new();
    let mut in_tag = false;
    for c in body[content_start..content_end].chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    Some(text.trim().to_string())
}

/// `documentation/1.x/getting-started.md` → "getting started";
/// `index` pages take their directory's name.
fn title_from_path(rel: &str) -> String {
    let mut parts: Vec<&str> = rel.split('/').collect();
    let file = parts.pop().unwrap_or_default();
    let stem = file.split('.').next().unwrap_or(file);
    let name = if stem == "index" {
        parts.pop().unwrap_or("Home")
    } else {
        stem
    };
    name.replace(['-', '_'], " ")
}

fn check_unique_outputs(pages: &[Page], assets: &[Asset]) -> Result<(), ScanError> {
    let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
    let outputs = pages
        .iter()
        .map(|p| (p.output_path.as_str(), p.source_path.as_str()))
        .chain(
            assets
                .iter()
                .map(|a| (a.source_path.as_str(), a.source_path.as_str())),
        );
    for (output, source) in outputs {
        if let Some(first) = seen.insert(output, source) {
            return Err(ScanError::DuplicateOutput {
                output: output.to_string(),
                first: first.to_string(),
                second: source.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use tempfile::TempDir;

    // =========================================================================
    // Path mapping
    // =========================================================================

    #[test]
    fn markdown_request_paths() {
        assert_eq!(
            page_request_path("documentation/1.x/index.html.md"),
            Some((
                "/documentation/1.x/index.html".to_string(),
                PageKind::Markdown
            ))
        );
        assert_eq!(
            page_request_path("documentation/routing.md"),
            Some(("/documentation/routing.html".to_string(), PageKind::Markdown))
        );
        assert_eq!(
            page_request_path("notes.markdown"),
            Some(("/notes.html".to_string(), PageKind::Markdown))
        );
    }

    #[test]
    fn html_request_path() {
        assert_eq!(
            page_request_path("404.html"),
            Some(("/404.html".to_string(), PageKind::Html))
        );
    }

    #[test]
    fn non_page_paths() {
        assert_eq!(page_request_path("CNAME"), None);
        assert_eq!(page_request_path("feed.xml"), None);
        assert_eq!(page_request_path(".md"), None);
    }

    #[test]
    fn titles_from_path() {
        assert_eq!(title_from_path("documentation/getting-started.md"), "getting started");
        assert_eq!(title_from_path("documentation/1.x/index.html.md"), "1.x");
        assert_eq!(title_from_path("index.html.md"), "Home");
    }

    #[test]
    fn html_h1_strips_tags() {
        assert_eq!(
            html_h1("<body><h1 class=\"t\">Not <em>Found</em></h1></body>"),
            Some("Not Found".to_string())
        );
        assert_eq!(html_h1("<p>none</p>"), None);
    }

    // =========================================================================
    // Scanning
    // =========================================================================

    #[test]
    fn scan_classifies_fixture_tree() {
        let tmp = setup_project();
        let manifest = scan(&tmp.path().join("source"), &AssetsConfig::default()).unwrap();

        let requests: Vec<&str> = manifest
            .pages
            .iter()
            .map(|p| p.request_path.as_str())
            .collect();
        assert_eq!(
            requests,
            vec![
                "/404.html",
                "/documentation/1.x/index.html",
                "/documentation/2.x/index.html",
                "/documentation/2.x/routing.html",
                "/index.html",
            ]
        );

        let layouts: Vec<&str> = manifest.layouts.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(layouts, vec!["1.x", "2.x", "layout"]);

        assert_eq!(
            manifest.asset_urls(AssetKind::Stylesheet),
            vec!["/stylesheets/site.css"]
        );
        assert_eq!(
            manifest.asset_urls(AssetKind::Javascript),
            vec!["/javascripts/site.js"]
        );
        assert_eq!(manifest.asset_urls(AssetKind::Image), vec!["/images/logo.svg"]);
        assert_eq!(manifest.asset_urls(AssetKind::Other), vec!["/CNAME"]);
    }

    #[test]
    fn scan_extracts_titles() {
        let tmp = setup_project();
        let manifest = scan(&tmp.path().join("source"), &AssetsConfig::default()).unwrap();
        assert_eq!(find_page(&manifest, "/index.html").title, "Skinny Framework");
        assert_eq!(find_page(&manifest, "/404.html").title, "Not Found");
    }

    #[test]
    fn scan_skips_partials_and_hidden() {
        let tmp = setup_project();
        let source = tmp.path().join("source");
        fs::create_dir_all(source.join("_partials")).unwrap();
        fs::write(source.join("_partials/nav.html"), "<nav></nav>").unwrap();
        fs::write(source.join("_draft.md"), "# Draft").unwrap();
        fs::write(source.join(".DS_Store"), "").unwrap();

        let manifest = scan(&source, &AssetsConfig::default()).unwrap();
        assert!(manifest.pages.iter().all(|p| !p.source_path.contains('_')));
        assert!(manifest.assets.iter().all(|a| !a.source_path.starts_with('.')));
    }

    #[test]
    fn markdown_inside_asset_dir_is_asset() {
        let tmp = setup_project();
        let source = tmp.path().join("source");
        fs::write(source.join("stylesheets/README.md"), "# css").unwrap();

        let manifest = scan(&source, &AssetsConfig::default()).unwrap();
        assert!(manifest.pages.iter().all(|p| p.source_path != "stylesheets/README.md"));
        assert!(
            manifest
                .assets
                .iter()
                .any(|a| a.source_path == "stylesheets/README.md" && a.kind == AssetKind::Stylesheet)
        );
    }

    #[test]
    fn custom_asset_dirs_are_respected() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("source");
        fs::create_dir_all(source.join("css")).unwrap();
        fs::write(source.join("css/app.css"), "body{}").unwrap();

        let assets = AssetsConfig {
            css_dir: "css".to_string(),
            ..AssetsConfig::default()
        };
        let manifest = scan(&source, &assets).unwrap();
        assert_eq!(manifest.asset_urls(AssetKind::Stylesheet), vec!["/css/app.css"]);
    }

    #[test]
    fn missing_source_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = scan(&tmp.path().join("nope"), &AssetsConfig::default());
        assert!(matches!(result, Err(ScanError::MissingSource(_))));
    }

    #[test]
    fn duplicate_output_is_error() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("source");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("about.md"), "# About").unwrap();
        fs::write(source.join("about.html"), "<h1>About</h1>").unwrap();

        let result = scan(&source, &AssetsConfig::default());
        assert!(matches!(
            result,
            Err(ScanError::DuplicateOutput { ref output, .. }) if output == "about.html"
        ));
    }
}
