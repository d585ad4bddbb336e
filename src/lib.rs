//! # Docsite
//!
//! A static documentation site builder for projects that publish docs for
//! several major versions side by side. Pages under a version's directory are
//! wrapped in that version's layout, and any page can reference released
//! version numbers by symbolic name.
//!
//! # Architecture
//!
//! ```text
//! config.toml  →  Site        (validated config, compiled rules, version table)
//! source/      →  Manifest    (pages, layout templates, assets)
//! Manifest     →  build/      (rendered in parallel, written only if all succeed)
//! build/       →  git remote  (deploy)
//! ```
//!
//! Configuration is loaded once and never mutated afterwards. The [`site::Site`]
//! built from it is shared by reference with every rendering worker.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `config.toml` loading, merging over stock defaults, validation |
//! | [`layout`] | First-match page rules: request path → layout |
//! | [`versions`] | Symbolic version names and aliases → version strings |
//! | [`site`] | The immutable build context assembled from a validated config |
//! | [`scan`] | Walks the source directory into a manifest of pages, layouts, assets |
//! | [`template`] | `{{ name }}` interpolation of versions and page variables |
//! | [`markdown`] | Markdown → HTML with fenced code, autolinks, heading anchors |
//! | [`generate`] | Renders every page into its layout and writes the build directory |
//! | [`deploy`] | Publishes the build directory to a git branch |
//! | [`output`] | CLI output formatting |
//!
//! # Page Rules
//!
//! ```toml
//! [[pages]]
//! pattern = "/documentation/1.x/*"
//! layout = "1.x"
//!
//! [[pages]]
//! pattern = "/404.html"
//! layout = false
//! ```
//!
//! Rules are tried in declaration order and the first match wins. A pattern
//! ending in `*` matches by prefix; anything else must match the whole path.
//! `layout = false` renders the page without a layout. Paths no rule matches
//! use `default_layout`.

pub mod config;
pub mod deploy;
pub mod generate;
pub mod layout;
pub mod markdown;
pub mod output;
pub mod scan;
pub mod site;
pub mod template;
pub mod versions;

#[cfg(test)]
pub(crate) mod test_helpers;
