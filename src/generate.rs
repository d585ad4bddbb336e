//! Page rendering and site output.
//!
//! For every scanned page:
//!
//! 1. Interpolate `{{ name }}` placeholders in the page source.
//! 2. Convert markdown to HTML (HTML pages are used as-is).
//! 3. Resolve the layout from the page rules and wrap the content in it.
//!
//! Pages render in parallel with rayon; every worker reads the same immutable
//! [`Site`]. Rendering finishes for the whole site before anything is
//! written, so a single bad page aborts the build with an untouched output
//! directory.
//!
//! ## Layout Templates
//!
//! `layouts/<name>.html` may use `{{ yield }}` (the page content),
//! `{{ title }}`, `{{ path }}`, `{{ layout }}`, `{{ toc }}` (a nested list of
//! heading links when `with_toc_data` is on) and any version key.
//!
//! If the default layout has no template file, a built-in document is used
//! that links every stylesheet and script found in the asset directories. A
//! missing named layout is an error.
//!
//! ## Output Structure
//!
//! ```text
//! build/
//! ├── .git/                         # Preserved across builds (deploy repo)
//! ├── index.html
//! ├── stylesheets/site.css
//! └── documentation/
//!     └── 1.x/index.html
//! ```

use crate::layout::LayoutError;
use crate::markdown::TocEntry;
use crate::scan::{self, AssetKind, LayoutTemplate, Manifest, Page, PageKind, ScanError};
use crate::site::Site;
use crate::template::{self, Context, RenderError};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),
    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
    #[error("{}: layout {layout:?} not found in layouts/", page.display())]
    MissingLayout { layout: String, page: PathBuf },
}

/// A page rendered in memory, ready to be written.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub request_path: String,
    pub output_path: String,
    pub title: String,
    /// `None` for pages rendered without a layout.
    pub layout: Option<String>,
    pub html: String,
    pub toc: Vec<TocEntry>,
}

/// Summary of a finished build.
#[derive(Debug)]
pub struct BuildReport {
    pub output_dir: PathBuf,
    pub pages: Vec<RenderedPage>,
    pub assets: usize,
}

/// Scan, render and write the whole site into the build directory.
pub fn build(site: &Site) -> Result<BuildReport, GenerateError> {
    let manifest = scan::scan(&site.source_dir(), &site.config().assets)?;
    let pages = render_site(site, &manifest)?;
    let output_dir = site.build_dir();
    write_site(&pages, &manifest, &site.source_dir(), &output_dir)?;
    log::info!(
        "built {} pages and {} assets into {}",
        pages.len(),
        manifest.assets.len(),
        output_dir.display()
    );
    Ok(BuildReport {
        output_dir,
        assets: manifest.assets.len(),
        pages,
    })
}

/// Render every page of the manifest.
///
/// Fails with the first error in page order; nothing is written either way.
pub fn render_site(site: &Site, manifest: &Manifest) -> Result<Vec<RenderedPage>, GenerateError> {
    let stylesheets = manifest.asset_urls(AssetKind::Stylesheet);
    let scripts = manifest.asset_urls(AssetKind::Javascript);
    let builtin = BuiltinLayout {
        stylesheets: &stylesheets,
        scripts: &scripts,
    };

    let results: Vec<Result<RenderedPage, GenerateError>> = manifest
        .pages
        .par_iter()
        .map(|page| render_page(site, manifest, &builtin, page))
        .collect();
    results.into_iter().collect()
}

struct BuiltinLayout<'a> {
    stylesheets: &'a [String],
    scripts: &'a [String],
}

fn render_page(
    site: &Site,
    manifest: &Manifest,
    builtin: &BuiltinLayout<'_>,
    page: &Page,
) -> Result<RenderedPage, GenerateError> {
    let source_path = site.source_dir().join(&page.source_path);
    let resolution = site.layout_for(&page.request_path)?;
    let layout_name = resolution.layout_name();
    log::debug!("rendering {} with layout {:?}", page.request_path, layout_name);

    let title = page_title(site, page)?;
    let escaped_title = html! { (title) }.into_string();
    let ctx = Context::new(site.versions())
        .with("title", &escaped_title)
        .with("path", &page.request_path)
        .with("layout", layout_name.unwrap_or_default());

    let body = template::interpolate(&page.body, &source_path, &ctx)?;
    let (content, toc) = match page.kind {
        PageKind::Markdown => {
            let rendered = site.markdown().render(&body);
            (rendered.html, rendered.toc)
        }
        PageKind::Html => (body, Vec::new()),
    };

    let html = match layout_name {
        None => content,
        Some(name) => match manifest.layout(name) {
            Some(layout) => apply_layout(site, layout, ctx, &content, &toc)?,
            None if name == site.resolver().default_layout() => {
                builtin_document(&title, &content, builtin).into_string()
            }
            None => {
                return Err(GenerateError::MissingLayout {
                    layout: name.to_string(),
                    page: source_path,
                });
            }
        },
    };

    Ok(RenderedPage {
        request_path: page.request_path.clone(),
        output_path: page.output_path.clone(),
        title,
        layout: layout_name.map(str::to_string),
        html,
        toc,
    })
}

/// Page title with `{{ name }}` placeholders filled from the version table.
pub fn page_title(site: &Site, page: &Page) -> Result<String, GenerateError> {
    let source_path = site.source_dir().join(&page.source_path);
    let ctx = Context::new(site.versions());
    Ok(template::interpolate(&page.title, &source_path, &ctx)?)
}

/// Replace every scanned title with its interpolated form, for display.
pub fn resolve_titles(site: &Site, manifest: &mut Manifest) -> Result<(), GenerateError> {
    for page in &mut manifest.pages {
        page.title = page_title(site, page)?;
    }
    Ok(())
}

fn apply_layout(
    site: &Site,
    layout: &LayoutTemplate,
    ctx: Context<'_>,
    content: &str,
    toc: &[TocEntry],
) -> Result<String, GenerateError> {
    let toc_html = render_toc(toc).into_string();
    let ctx = ctx.with("yield", content).with("toc", &toc_html);
    let path = site.layouts_dir().join(format!("{}.html", layout.name));
    Ok(template::interpolate(&layout.body, &path, &ctx)?)
}

/// Document used when the default layout has no template file.
fn builtin_document(title: &str, content: &str, builtin: &BuiltinLayout<'_>) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                @for href in builtin.stylesheets {
                    link rel="stylesheet" href=(href);
                }
            }
            body {
                main {
                    (PreEscaped(content))
                }
                @for src in builtin.scripts {
                    script src=(src) {}
                }
            }
        }
    }
}

/// Nested `<ul>` of heading links. Deeper levels nest under the previous entry.
pub fn render_toc(toc: &[TocEntry]) -> Markup {
    fn level_list(entries: &[TocEntry]) -> Markup {
        let Some(first) = entries.first() else {
            return html! {};
        };
        let base = entries.iter().map(|e| e.level).min().unwrap_or(first.level);
        let mut groups: Vec<(&TocEntry, &[TocEntry])> = Vec::new();
        let mut i = 0;
        while i < entries.len() {
            let head = &entries[i];
            let mut j = i + 1;
            while j < entries.len() && entries[j].level > base {
                j += 1;
            }
            groups.push((head, &entries[i + 1..j]));
            i = j;
        }
        html! {
            ul.toc {
                @for (entry, children) in groups {
                    li {
                        a href={ "#" (entry.id) } { (entry.text) }
                        @if !children.is_empty() {
                            (level_list(children))
                        }
                    }
                }
            }
        }
    }
    level_list(toc)
}

/// Write rendered pages and copy assets into `output_dir`.
///
/// Stale output is removed first; a `.git` directory at the top of the
/// output is kept so the deploy repository survives rebuilds.
pub fn write_site(
    pages: &[RenderedPage],
    manifest: &Manifest,
    source_dir: &Path,
    output_dir: &Path,
) -> Result<(), GenerateError> {
    clean_output(output_dir)?;

    for page in pages {
        let dest = output_dir.join(&page.output_path);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&dest, &page.html)?;
    }

    for asset in &manifest.assets {
        let dest = output_dir.join(&asset.source_path);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source_dir.join(&asset.source_path), &dest)?;
    }
    Ok(())
}

fn clean_output(output_dir: &Path) -> std::io::Result<()> {
    if !output_dir.exists() {
        return fs::create_dir_all(output_dir);
    }
    for entry in fs::read_dir(output_dir)? {
        let entry = entry?;
        if entry.file_name() == ".git" {
            continue;
        }
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::layout::{Layout, PageRule};
    use crate::test_helpers::*;
    use tempfile::TempDir;

    fn load(tmp: &TempDir) -> Site {
        Site::load(tmp.path()).unwrap()
    }

    fn rendered<'a>(pages: &'a [RenderedPage], request_path: &str) -> &'a RenderedPage {
        pages
            .iter()
            .find(|p| p.request_path == request_path)
            .unwrap_or_else(|| panic!("page {request_path} not rendered"))
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    #[test]
    fn pages_use_rule_layouts() {
        let tmp = setup_project();
        let site = load(&tmp);
        let manifest = scan::scan(&site.source_dir(), &site.config().assets).unwrap();
        let pages = render_site(&site, &manifest).unwrap();

        let v1 = rendered(&pages, "/documentation/1.x/index.html");
        assert_eq!(v1.layout.as_deref(), Some("1.x"));
        assert!(v1.html.contains("<body class=\"docs-1x\">"));

        let v2 = rendered(&pages, "/documentation/2.x/routing.html");
        assert_eq!(v2.layout.as_deref(), Some("2.x"));
        assert!(v2.html.contains("<body class=\"docs-2x\">"));

        let home = rendered(&pages, "/index.html");
        assert_eq!(home.layout.as_deref(), Some("layout"));
    }

    #[test]
    fn versions_are_interpolated() {
        let tmp = setup_project();
        let site = load(&tmp);
        let manifest = scan::scan(&site.source_dir(), &site.config().assets).unwrap();
        let pages = render_site(&site, &manifest).unwrap();

        let home = rendered(&pages, "/index.html");
        assert!(home.html.contains("3.0.2"));
        assert!(!home.html.contains("{{"));

        let v1 = rendered(&pages, "/documentation/1.x/index.html");
        assert!(v1.html.contains("1.7.7"));
    }

    #[test]
    fn layout_receives_title_and_toc() {
        let tmp = setup_project();
        let site = load(&tmp);
        let manifest = scan::scan(&site.source_dir(), &site.config().assets).unwrap();
        let pages = render_site(&site, &manifest).unwrap();

        let routing = rendered(&pages, "/documentation/2.x/routing.html");
        assert!(routing.html.contains("<title>Routing</title>"));
        assert!(routing.html.contains("<a href=\"#path-parameters\">Path parameters</a>"));
    }

    #[test]
    fn html_pages_are_not_markdown_converted() {
        let tmp = setup_project();
        let site = load(&tmp);
        let manifest = scan::scan(&site.source_dir(), &site.config().assets).unwrap();
        let pages = render_site(&site, &manifest).unwrap();

        let not_found = rendered(&pages, "/404.html");
        assert!(not_found.html.contains("<h1>Not Found</h1>"));
        assert!(not_found.toc.is_empty());
    }

    #[test]
    fn layout_false_renders_bare_page() {
        let tmp = setup_project();
        let mut config = SiteConfig::default();
        config.pages.insert(0, PageRule::new("/404.html", Layout::None));
        let site = Site::from_config(tmp.path(), config).unwrap();
        let manifest = scan::scan(&site.source_dir(), &site.config().assets).unwrap();
        let pages = render_site(&site, &manifest).unwrap();

        let not_found = rendered(&pages, "/404.html");
        assert_eq!(not_found.layout, None);
        assert!(!not_found.html.contains("<html"));
    }

    #[test]
    fn builtin_layout_used_when_default_template_missing() {
        let tmp = setup_project();
        fs::remove_file(tmp.path().join("source/layouts/layout.html")).unwrap();
        let site = load(&tmp);
        let manifest = scan::scan(&site.source_dir(), &site.config().assets).unwrap();
        let pages = render_site(&site, &manifest).unwrap();

        let home = rendered(&pages, "/index.html");
        assert!(home.html.starts_with("<!DOCTYPE html>"));
        assert!(home.html.contains("<link rel=\"stylesheet\" href=\"/stylesheets/site.css\">"));
        assert!(home.html.contains("<script src=\"/javascripts/site.js\"></script>"));
    }

    #[test]
    fn missing_named_layout_is_error() {
        let tmp = setup_project();
        fs::remove_file(tmp.path().join("source/layouts/2.x.html")).unwrap();
        let site = load(&tmp);
        let manifest = scan::scan(&site.source_dir(), &site.config().assets).unwrap();
        let err = render_site(&site, &manifest).unwrap_err();
        assert!(matches!(err, GenerateError::MissingLayout { ref layout, .. } if layout == "2.x"));
    }

    #[test]
    fn unknown_version_names_the_page() {
        let tmp = setup_project();
        fs::write(
            tmp.path().join("source/documentation/2.x/broken.md"),
            "# Broken\n\nUse {{ v3_version }}\n",
        )
        .unwrap();
        let site = load(&tmp);
        let manifest = scan::scan(&site.source_dir(), &site.config().assets).unwrap();
        let err = render_site(&site, &manifest).unwrap_err();
        match err {
            GenerateError::Render(RenderError::UnknownKey { template, key, .. }) => {
                assert_eq!(key, "v3_version");
                assert!(template.ends_with("documentation/2.x/broken.md"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn titles_are_interpolated() {
        let tmp = setup_project();
        fs::write(
            tmp.path().join("source/release.md"),
            "# Skinny {{ latest_version }}\n\nReleased.\n",
        )
        .unwrap();
        let site = load(&tmp);
        let manifest = scan::scan(&site.source_dir(), &site.config().assets).unwrap();
        let pages = render_site(&site, &manifest).unwrap();

        let release = rendered(&pages, "/release.html");
        assert_eq!(release.title, "Skinny 3.0.2");
        assert!(release.html.contains("<title>Skinny 3.0.2 | Skinny Framework</title>"));
        assert!(!release.html.contains("{{"));
    }

    #[test]
    fn builtin_layout_gets_interpolated_title() {
        let tmp = setup_project();
        fs::remove_file(tmp.path().join("source/layouts/layout.html")).unwrap();
        fs::write(
            tmp.path().join("source/release.md"),
            "# Skinny {{ latest_version }}\n",
        )
        .unwrap();
        let site = load(&tmp);
        let manifest = scan::scan(&site.source_dir(), &site.config().assets).unwrap();
        let pages = render_site(&site, &manifest).unwrap();

        let release = rendered(&pages, "/release.html");
        assert!(release.html.contains("<title>Skinny 3.0.2</title>"));
    }

    #[test]
    fn resolve_titles_updates_manifest() {
        let tmp = setup_project();
        fs::write(
            tmp.path().join("source/release.md"),
            "# Release {{ v1_latest_version }}\n",
        )
        .unwrap();
        let site = load(&tmp);
        let mut manifest = scan::scan(&site.source_dir(), &site.config().assets).unwrap();
        resolve_titles(&site, &mut manifest).unwrap();
        assert_eq!(find_page(&manifest, "/release.html").title, "Release 1.7.7");
    }

    #[test]
    fn code_blocks_are_interpolated_unless_escaped() {
        let tmp = setup_project();
        fs::write(
            tmp.path().join("source/templates.md"),
            "# Templates\n\n```scala\nval v = \"{{ latest_version }}\"\nval m = \"\\{{ name }}\"\n```\n",
        )
        .unwrap();
        let site = load(&tmp);
        let manifest = scan::scan(&site.source_dir(), &site.config().assets).unwrap();
        let pages = render_site(&site, &manifest).unwrap();

        let page = rendered(&pages, "/templates.html");
        assert!(page.html.contains("3.0.2"));
        assert!(page.html.contains("{{ name }}"));
    }

    // =========================================================================
    // Writing
    // =========================================================================

    #[test]
    fn build_writes_pages_and_assets() {
        let tmp = setup_project();
        let site = load(&tmp);
        let report = build(&site).unwrap();

        let out = tmp.path().join("build");
        assert_eq!(report.output_dir, out);
        assert_eq!(report.pages.len(), 5);
        assert_eq!(report.assets, 4);
        assert!(out.join("index.html").is_file());
        assert!(out.join("documentation/1.x/index.html").is_file());
        assert!(out.join("documentation/2.x/routing.html").is_file());
        assert!(out.join("stylesheets/site.css").is_file());
        assert!(out.join("CNAME").is_file());
        assert!(!out.join("layouts").exists());
    }

    #[test]
    fn failed_build_writes_nothing() {
        let tmp = setup_project();
        fs::write(tmp.path().join("source/bad.md"), "{{ nope }}").unwrap();
        let site = load(&tmp);
        assert!(build(&site).is_err());
        assert!(!tmp.path().join("build").exists());
    }

    #[test]
    fn rebuild_removes_stale_files_but_keeps_git() {
        let tmp = setup_project();
        let out = tmp.path().join("build");
        fs::create_dir_all(out.join(".git")).unwrap();
        fs::write(out.join(".git/HEAD"), "ref: refs/heads/master\n").unwrap();
        fs::write(out.join("stale.html"), "old").unwrap();

        build(&load(&tmp)).unwrap();
        assert!(!out.join("stale.html").exists());
        assert!(out.join(".git/HEAD").is_file());
    }

    // =========================================================================
    // TOC markup
    // =========================================================================

    #[test]
    fn toc_nests_deeper_levels() {
        let entry = |level, id: &str| TocEntry {
            level,
            text: id.to_string(),
            id: id.to_string(),
        };
        let toc = vec![entry(2, "a"), entry(3, "a1"), entry(2, "b")];
        let html = render_toc(&toc).into_string();
        assert_eq!(
            html,
            "<ul class=\"toc\"><li><a href=\"#a\">a</a><ul class=\"toc\"><li><a href=\"#a1\">a1</a></li></ul></li><li><a href=\"#b\">b</a></li></ul>"
        );
    }

    #[test]
    fn empty_toc_renders_nothing() {
        assert_eq!(render_toc(&[]).into_string(), "");
    }
}
