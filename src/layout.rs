//! Path → layout resolution.
//!
//! Page rules bind a path pattern to a layout:
//!
//! ```toml
//! [[pages]]
//! pattern = "/documentation/1.x/*"
//! layout = "1.x"
//!
//! [[pages]]
//! pattern = "/feed.xml"
//! layout = false
//! ```
//!
//! Patterns are anchored (leading `/`) and may end in a single `*`, which
//! matches any suffix. A pattern without `*` matches exactly one path.
//! Rules are evaluated in declaration order and the first match wins; a path
//! no rule matches gets the site's default layout.
//!
//! Patterns are compiled once by [`LayoutResolver::new`]. A malformed pattern
//! is a [`ConfigError`], so it surfaces when the config loads rather than
//! when the first page renders.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LayoutError {
    #[error("request path must not be empty")]
    EmptyPath,
}

/// Layout assigned to a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LayoutValue", into = "LayoutValue")]
pub enum Layout {
    /// Wrap the page in `layouts/<name>.html`.
    Named(String),
    /// Render the page without any layout.
    None,
}

/// On-disk form: a layout name, or `false` for no layout.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum LayoutValue {
    Name(String),
    Flag(bool),
}

impl TryFrom<LayoutValue> for Layout {
    type Error = String;

    fn try_from(value: LayoutValue) -> Result<Self, Self::Error> {
        match value {
            LayoutValue::Name(name) => Ok(Layout::Named(name)),
            LayoutValue::Flag(false) => Ok(Layout::None),
            LayoutValue::Flag(true) => {
                Err("layout = true is ambiguous: name a layout or use false".to_string())
            }
        }
    }
}

impl From<Layout> for LayoutValue {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::Named(name) => LayoutValue::Name(name),
            Layout::None => LayoutValue::Flag(false),
        }
    }
}

/// A `[[pages]]` entry as written in `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PageRule {
    pub pattern: String,
    pub layout: Layout,
}

impl PageRule {
    pub fn new(pattern: impl Into<String>, layout: Layout) -> Self {
        Self {
            pattern: pattern.into(),
            layout,
        }
    }
}

/// A compiled page pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    /// No wildcard: matches this path only.
    Exact(String),
    /// Trailing `*`: matches any path starting with the literal prefix.
    Prefix(String),
}

impl PathPattern {
    /// Parse a pattern such as `/documentation/1.x/*` or `/index.html`.
    pub fn parse(pattern: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::Pattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        if pattern.trim().is_empty() {
            return Err(invalid("pattern is empty"));
        }
        if !pattern.starts_with('/') {
            return Err(invalid("pattern must start with '/'"));
        }
        match pattern.find('*') {
            None => Ok(PathPattern::Exact(pattern.to_string())),
            Some(pos) if pos == pattern.len() - 1 => {
                Ok(PathPattern::Prefix(pattern[..pos].to_string()))
            }
            Some(_) => Err(invalid("'*' is only allowed as the final character")),
        }
    }

    /// Whether a normalized request path falls under this pattern.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(exact) => path == exact,
            PathPattern::Prefix(prefix) => path.starts_with(prefix.as_str()),
        }
    }
}

/// Outcome of resolving a request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// The rule at `index` (declaration order) matched.
    Rule { index: usize, layout: &'a Layout },
    /// No rule matched; the site default applies.
    Default(&'a str),
}

impl<'a> Resolution<'a> {
    /// The layout name to wrap the page in, or `None` for a bare page.
    pub fn layout_name(&self) -> Option<&'a str> {
        match *self {
            Resolution::Rule {
                layout: Layout::Named(name),
                ..
            } => Some(name.as_str()),
            Resolution::Rule {
                layout: Layout::None,
                ..
            } => None,
            Resolution::Default(name) => Some(name),
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    source: String,
    pattern: PathPattern,
    layout: Layout,
}

/// Ordered, validated page rules plus the default layout.
#[derive(Debug, Clone)]
pub struct LayoutResolver {
    rules: Vec<CompiledRule>,
    default_layout: String,
}

impl LayoutResolver {
    /// Compile `rules` in order. Fails on the first malformed rule.
    pub fn new(rules: &[PageRule], default_layout: &str) -> Result<Self, ConfigError> {
        let compiled = rules
            .iter()
            .map(|rule| {
                let pattern = PathPattern::parse(&rule.pattern)?;
                if matches!(&rule.layout, Layout::Named(name) if name.trim().is_empty()) {
                    return Err(ConfigError::Validation(format!(
                        "page rule {:?} has an empty layout name",
                        rule.pattern
                    )));
                }
                Ok(CompiledRule {
                    source: rule.pattern.clone(),
                    pattern,
                    layout: rule.layout.clone(),
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self {
            rules: compiled,
            default_layout: default_layout.to_string(),
        })
    }

    /// Resolve the layout for a site-relative path.
    ///
    /// A missing leading `/` is added before matching.
    pub fn resolve(&self, request_path: &str) -> Result<Resolution<'_>, LayoutError> {
        if request_path.is_empty() {
            return Err(LayoutError::EmptyPath);
        }
        let normalized;
        let path = if request_path.starts_with('/') {
            request_path
        } else {
            normalized = format!("/{request_path}");
            normalized.as_str()
        };

        let resolution = self
            .rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.pattern.matches(path))
            .map(|(index, rule)| Resolution::Rule {
                index,
                layout: &rule.layout,
            })
            .unwrap_or(Resolution::Default(&self.default_layout));

        log::debug!("layout for {path}: {resolution:?}");
        Ok(resolution)
    }

    pub fn default_layout(&self) -> &str {
        &self.default_layout
    }

    /// Pattern text of the rule at `index`, as written in the config.
    pub fn rule_pattern(&self, index: usize) -> Option<&str> {
        self.rules.get(index).map(|r| r.source.as_str())
    }

    /// Every layout name a rule or the default can select.
    pub fn layout_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .rules
            .iter()
            .filter_map(|r| match &r.layout {
                Layout::Named(name) => Some(name.as_str()),
                Layout::None => None,
            })
            .chain(std::iter::once(self.default_layout.as_str()))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}
