//! Documentation version constants.
//!
//! Pages and layouts interpolate release numbers (`{{ latest_version }}`,
//! `{{ h2_version }}`) rather than hard-coding them, so a release only needs
//! a config change. The table is built once per invocation and never mutated.
//!
//! Aliases give a second name to an existing entry:
//!
//! ```toml
//! [versions]
//! latest_version = "3.0.2"
//!
//! [version_aliases]
//! version = "latest_version"
//! ```
//!
//! An alias must point at a literal entry, not at another alias.

use crate::config::ConfigError;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown version key {key:?}")]
pub struct UnknownKeyError {
    pub key: String,
}

/// Where a table entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source<'a> {
    Literal,
    /// Resolved through an alias of the named literal.
    Alias(&'a str),
}

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    value: String,
    alias_of: Option<String>,
}

/// Immutable symbolic-name → semantic-version map.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionTable {
    entries: BTreeMap<String, Entry>,
}

impl VersionTable {
    /// Validate `literals`, resolve `aliases` against them, and build the table.
    pub fn new(
        literals: &BTreeMap<String, String>,
        aliases: &BTreeMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let mut entries = BTreeMap::new();

        for (key, value) in literals {
            if !is_semver(value) {
                return Err(ConfigError::Version {
                    key: key.clone(),
                    value: value.clone(),
                });
            }
            entries.insert(
                key.clone(),
                Entry {
                    value: value.clone(),
                    alias_of: None,
                },
            );
        }

        for (alias, target) in aliases {
            if literals.contains_key(alias) {
                return Err(ConfigError::Validation(format!(
                    "version alias {alias:?} shadows a version of the same name"
                )));
            }
            let value = literals.get(target).ok_or_else(|| ConfigError::Alias {
                alias: alias.clone(),
                target: target.clone(),
            })?;
            entries.insert(
                alias.clone(),
                Entry {
                    value: value.clone(),
                    alias_of: Some(target.clone()),
                },
            );
        }

        log::debug!(
            "version table: {} versions, {} aliases",
            literals.len(),
            aliases.len()
        );
        Ok(Self { entries })
    }

    /// Look up a version by symbolic name.
    pub fn get(&self, key: &str) -> Result<&str, UnknownKeyError> {
        self.entries
            .get(key)
            .map(|e| e.value.as_str())
            .ok_or_else(|| UnknownKeyError {
                key: key.to_string(),
            })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by key, aliases included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, Source<'_>)> {
        self.entries.iter().map(|(key, entry)| {
            let source = match &entry.alias_of {
                Some(target) => Source::Alias(target.as_str()),
                None => Source::Literal,
            };
            (key.as_str(), entry.value.as_str(), source)
        })
    }
}

/// `MAJOR.MINOR.PATCH`, optionally followed by `-prerelease` and/or `+build`.
fn is_semver(value: &str) -> bool {
    let (rest, build) = match value.split_once('+') {
        Some((rest, build)) => (rest, Some(build)),
        None => (value, None),
    };
    let (core, pre) = match rest.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (rest, None),
    };

    let numbers: Vec<&str> = core.split('.').collect();
    let core_ok = numbers.len() == 3
        && numbers
            .iter()
            .all(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()));

    let ident_ok = |s: &str| {
        s.split('.').all(|part| {
            !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
    };

    core_ok && pre.is_none_or(ident_ok) && build.is_none_or(ident_ok)
}
