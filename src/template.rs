//! `{{ name }}` interpolation for pages and layouts.
//!
//! Placeholders are looked up first among page-local values (`title`, `path`,
//! `layout`, and `yield` inside layouts) and then in the [`VersionTable`].
//! A name found in neither fails the render with the template's path, so a
//! typo in `{{ latest_verison }}` stops the build instead of shipping a page
//! with a hole in it.
//!
//! Interpolation runs on the raw page source before markdown is parsed, so
//! placeholders inside fenced blocks and inline code are replaced too. That is
//! how install snippets pick up `{{ latest_version }}`. Code samples that need
//! a literal `{{` (Mustache, Scala string interpolation) write it as `\{{`.

use crate::versions::VersionTable;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("{}:{line}: unknown variable {key:?}", template.display())]
    UnknownKey {
        template: PathBuf,
        line: usize,
        key: String,
    },
    #[error("{}:{line}: unterminated '{{{{'", template.display())]
    Unterminated { template: PathBuf, line: usize },
    #[error("{}:{line}: invalid variable name {name:?}", template.display())]
    InvalidName {
        template: PathBuf,
        line: usize,
        name: String,
    },
}

impl RenderError {
    /// Path of the template the error points at.
    pub fn template(&self) -> &Path {
        match self {
            RenderError::UnknownKey { template, .. }
            | RenderError::Unterminated { template, .. }
            | RenderError::InvalidName { template, .. } => template,
        }
    }
}

/// Values visible to a template.
#[derive(Debug, Clone)]
pub struct Context<'a> {
    locals: Vec<(&'a str, &'a str)>,
    versions: &'a VersionTable,
}

impl<'a> Context<'a> {
    pub fn new(versions: &'a VersionTable) -> Self {
        Self {
            locals: Vec::new(),
            versions,
        }
    }

    /// Add a page-local value. Locals shadow versions of the same name.
    pub fn with(mut self, key: &'a str, value: &'a str) -> Self {
        self.locals.push((key, value));
        self
    }

    fn lookup(&self, key: &str) -> Option<&'a str> {
        self.locals
            .iter()
            .rev()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
            .or_else(|| self.versions.get(key).ok())
    }
}

/// Replace every `{{ name }}` in `source`.
///
/// `template` is only used for error reporting.
pub fn interpolate(source: &str, template: &Path, ctx: &Context<'_>) -> Result<String, RenderError> {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;
    let mut line = 1;

    while let Some(start) = rest.find("{{") {
        let before = &rest[..start];
        line += before.matches('\n').count();

        if before.ends_with('\\') {
            out.push_str(&before[..before.len() - 1]);
            out.push_str("{{");
            rest = &rest[start + 2..];
            continue;
        }
        out.push_str(before);

        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or_else(|| RenderError::Unterminated {
            template: template.to_path_buf(),
            line,
        })?;
        let raw = &after[..end];
        let name = raw.trim();

        if name.is_empty() || !name.chars().all(is_name_char) {
            return Err(RenderError::InvalidName {
                template: template.to_path_buf(),
                line,
                name: raw.to_string(),
            });
        }

        let value = ctx.lookup(name).ok_or_else(|| RenderError::UnknownKey {
            template: template.to_path_buf(),
            line,
            key: name.to_string(),
        })?;
        out.push_str(value);

        line += raw.matches('\n').count();
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;

    fn table() -> VersionTable {
        let config = SiteConfig::default();
        VersionTable::new(&config.versions, &config.version_aliases).unwrap()
    }

    fn path() -> &'static Path {
        Path::new("source/index.html.md")
    }

    #[test]
    fn replaces_version_variables() {
        let versions = table();
        let ctx = Context::new(&versions);
        let out = interpolate(
            "libraryDependencies += \"org.skinny-framework\" %% \"skinny-framework\" % \"{{ latest_version }}\"",
            path(),
            &ctx,
        )
        .unwrap();
        assert!(out.ends_with("% \"3.0.2\""));
    }

    #[test]
    fn whitespace_inside_braces_is_optional() {
        let versions = table();
        let ctx = Context::new(&versions);
        assert_eq!(
            interpolate("{{h2_version}}/{{  logback_version  }}", path(), &ctx).unwrap(),
            "1.4.178/1.1.2"
        );
    }

    #[test]
    fn locals_shadow_versions() {
        let versions = table();
        let ctx = Context::new(&versions).with("version", "local");
        assert_eq!(interpolate("{{ version }}", path(), &ctx).unwrap(), "local");
    }

    #[test]
    fn later_locals_win() {
        let versions = table();
        let ctx = Context::new(&versions).with("title", "a").with("title", "b");
        assert_eq!(interpolate("{{ title }}", path(), &ctx).unwrap(), "b");
    }

    #[test]
    fn unknown_key_reports_template_and_line() {
        let versions = table();
        let ctx = Context::new(&versions);
        let err = interpolate("# Intro\n\nUse {{ latest_verison }}\n", path(), &ctx).unwrap_err();
        match &err {
            RenderError::UnknownKey { line, key, .. } => {
                assert_eq!(*line, 3);
                assert_eq!(key, "latest_verison");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.template(), path());
        assert!(err.to_string().starts_with("source/index.html.md:3:"));
    }

    #[test]
    fn unterminated_placeholder_is_error() {
        let versions = table();
        let ctx = Context::new(&versions);
        let err = interpolate("text {{ latest_version", path(), &ctx).unwrap_err();
        assert!(matches!(err, RenderError::Unterminated { line: 1, .. }));
    }

    #[test]
    fn invalid_name_is_error() {
        let versions = table();
        let ctx = Context::new(&versions);
        assert!(matches!(
            interpolate("{{ a b }}", path(), &ctx),
            Err(RenderError::InvalidName { .. })
        ));
        assert!(matches!(
            interpolate("{{}}", path(), &ctx),
            Err(RenderError::InvalidName { .. })
        ));
    }

    #[test]
    fn escaped_braces_are_literal() {
        let versions = table();
        let ctx = Context::new(&versions);
        assert_eq!(
            interpolate(r"\{{ not_a_var }}", path(), &ctx).unwrap(),
            "{{ not_a_var }}"
        );
    }

    #[test]
    fn text_without_placeholders_is_unchanged() {
        let versions = table();
        let ctx = Context::new(&versions);
        let text = "plain { braces } and } stray";
        assert_eq!(interpolate(text, path(), &ctx).unwrap(), text);
    }
}
