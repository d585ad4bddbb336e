//! CLI output formatting for every command.
//!
//! Each page is shown by title and positional index first, with its source
//! file and layout as indented context lines. Paths are secondary: the output
//! reads as a content inventory.
//!
//! ## Scan
//!
//! ```text
//! Pages
//! 001 Skinny Framework → /index.html
//!     Source: index.html.md
//!     Layout: layout (default)
//! 002 Skinny 1.x → /documentation/1.x/index.html
//!     Source: documentation/1.x/index.html.md
//!     Layout: 1.x (rule /documentation/1.x/*)
//!
//! Layouts
//!     1.x      layouts/1.x.html
//!
//! Assets
//!     stylesheet  stylesheets/site.css
//! ```
//!
//! ## Build
//!
//! ```text
//! 001 Skinny Framework → index.html [layout]
//! 002 Not Found → 404.html [bare]
//!
//! Generated 2 pages, 4 assets → build
//! ```
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! do no I/O.

use crate::deploy::GitStep;
use crate::generate::BuildReport;
use crate::layout::{Layout, LayoutError, LayoutResolver, Resolution};
use crate::scan::{AssetKind, Manifest};
use crate::versions::{Source, VersionTable};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn asset_label(kind: AssetKind) -> &'static str {
    match kind {
        AssetKind::Stylesheet => "stylesheet",
        AssetKind::Javascript => "javascript",
        AssetKind::Image => "image",
        AssetKind::Other => "file",
    }
}

/// One-line description of how a path resolved.
///
/// ```text
/// 1.x (rule /documentation/1.x/*)
/// none (rule /404.html)
/// layout (default)
/// ```
fn describe_resolution(resolution: &Resolution<'_>, resolver: &LayoutResolver) -> String {
    match *resolution {
        Resolution::Rule { index, layout } => {
            let name = match layout {
                Layout::Named(name) => name.as_str(),
                Layout::None => "none",
            };
            let pattern = resolver.rule_pattern(index).unwrap_or("?");
            format!("{} (rule {})", name, pattern)
        }
        Resolution::Default(name) => format!("{} (default)", name),
    }
}

// ============================================================================
// Scan
// ============================================================================

/// Format the scanned source tree: pages with their layouts, templates, assets.
pub fn format_scan_output(manifest: &Manifest, resolver: &LayoutResolver) -> Vec<String> {
    let mut lines = vec!["Pages".to_string()];

    for (i, page) in manifest.pages.iter().enumerate() {
        lines.push(format!(
            "{} {} → {}",
            format_index(i + 1),
            page.title,
            page.request_path
        ));
        lines.push(format!("{}Source: {}", indent(1), page.source_path));
        let layout = match resolver.resolve(&page.request_path) {
            Ok(resolution) => describe_resolution(&resolution, resolver),
            Err(e) => format!("error: {}", e),
        };
        lines.push(format!("{}Layout: {}", indent(1), layout));
    }

    if !manifest.layouts.is_empty() {
        lines.push(String::new());
        lines.push("Layouts".to_string());
        let width = manifest
            .layouts
            .iter()
            .map(|l| l.name.len())
            .max()
            .unwrap_or(0);
        for layout in &manifest.layouts {
            lines.push(format!(
                "{}{:<width$}  {}",
                indent(1),
                layout.name,
                layout.source_path
            ));
        }
    }

    if !manifest.assets.is_empty() {
        lines.push(String::new());
        lines.push("Assets".to_string());
        for asset in &manifest.assets {
            lines.push(format!(
                "{}{:<10}  {}",
                indent(1),
                asset_label(asset.kind),
                asset.source_path
            ));
        }
    }

    lines
}

pub fn print_scan_output(manifest: &Manifest, resolver: &LayoutResolver) {
    for line in format_scan_output(manifest, resolver) {
        println!("{}", line);
    }
}

// ============================================================================
// Build
// ============================================================================

/// Format the result of a build: every written page and a summary line.
pub fn format_build_output(report: &BuildReport) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, page) in report.pages.iter().enumerate() {
        let layout = page.layout.as_deref().unwrap_or("bare");
        lines.push(format!(
            "{} {} → {} [{}]",
            format_index(i + 1),
            page.title,
            page.output_path,
            layout
        ));
    }
    lines.push(String::new());
    lines.push(format!(
        "Generated {} {}, {} {} → {}",
        report.pages.len(),
        plural(report.pages.len(), "page", "pages"),
        report.assets,
        plural(report.assets, "asset", "assets"),
        report.output_dir.display()
    ));
    lines
}

pub fn print_build_output(report: &BuildReport) {
    for line in format_build_output(report) {
        println!("{}", line);
    }
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 { one } else { many }
}

// ============================================================================
// Layout lookup
// ============================================================================

/// Format the layout lookup of a single request path.
///
/// ```text
/// /documentation/1.x/index.html → 1.x (rule /documentation/1.x/*)
/// ```
pub fn format_resolution(
    path: &str,
    result: &Result<Resolution<'_>, LayoutError>,
    resolver: &LayoutResolver,
) -> String {
    match result {
        Ok(resolution) => format!("{} → {}", path, describe_resolution(resolution, resolver)),
        Err(e) => format!("{:?} → error: {}", path, e),
    }
}

// ============================================================================
// Versions
// ============================================================================

/// Format the full version table, aligned, with alias targets noted.
///
/// ```text
/// latest_version      3.0.2
/// version             3.0.2  (alias of latest_version)
/// ```
pub fn format_versions(table: &VersionTable) -> Vec<String> {
    let width = table.iter().map(|(k, _, _)| k.len()).max().unwrap_or(0);
    table
        .iter()
        .map(|(key, value, source)| match source {
            Source::Literal => format!("{:<width$}  {}", key, value),
            Source::Alias(target) => {
                format!("{:<width$}  {}  (alias of {})", key, value, target)
            }
        })
        .collect()
}

pub fn print_versions(table: &VersionTable) {
    for line in format_versions(table) {
        println!("{}", line);
    }
}

// ============================================================================
// Deploy
// ============================================================================

/// Format the git steps of a deploy. A dry run labels them as not executed.
pub fn format_deploy_plan(steps: &[GitStep], dry_run: bool) -> Vec<String> {
    let mut lines = Vec::with_capacity(steps.len() + 1);
    lines.push(if dry_run {
        "Deploy plan (dry run, nothing executed)".to_string()
    } else {
        "Deployed".to_string()
    });
    for (i, step) in steps.iter().enumerate() {
        lines.push(format!(
            "{}{} {}",
            indent(1),
            format_index(i + 1),
            step.command_line()
        ));
    }
    lines
}

pub fn print_deploy_plan(steps: &[GitStep], dry_run: bool) {
    for line in format_deploy_plan(steps, dry_run) {
        println!("{}", line);
    }
}
