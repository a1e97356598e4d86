//! File names for exported assets.
//!
//! Node identifiers such as `12:345` or `I1:2;3:4` are not portable file
//! names, and node names collide freely. Names here are slugified with the
//! `slug` crate and made unique within one export by suffixing a counter
//! (`cover`, `cover-2`, `cover-3`).

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use slug::slugify;
use thiserror::Error;

use super::tree::NodeId;

const FALLBACK_STEM: &str = "node";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NamingError {
    #[error("file name source text is empty")]
    EmptyInput,
    #[error("failed to derive a file name from `{input}`")]
    Unrepresentable { input: String },
    #[error("unknown naming strategy `{0}` (expected id or name)")]
    UnknownStrategy(String),
}

/// What an asset's file name is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingStrategy {
    #[default]
    Id,
    Name,
}

impl fmt::Display for NamingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamingStrategy::Id => f.write_str("id"),
            NamingStrategy::Name => f.write_str("name"),
        }
    }
}

impl FromStr for NamingStrategy {
    type Err = NamingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" => Ok(NamingStrategy::Id),
            "name" => Ok(NamingStrategy::Name),
            _ => Err(NamingError::UnknownStrategy(s.to_string())),
        }
    }
}

/// Derive a file stem from arbitrary text.
pub fn derive_file_stem(input: &str) -> Result<String, NamingError> {
    if input.trim().is_empty() {
        return Err(NamingError::EmptyInput);
    }

    let candidate = slugify(input);
    if candidate.is_empty() {
        return Err(NamingError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Hands out unique file stems within a single export.
#[derive(Debug, Default)]
pub struct AssetNamer {
    strategy: NamingStrategy,
    taken: HashSet<String>,
}

impl AssetNamer {
    pub fn new(strategy: NamingStrategy) -> Self {
        Self {
            strategy,
            taken: HashSet::new(),
        }
    }

    /// Stem for the node `id` named `name`. Falls back to the identifier when
    /// the name yields nothing usable.
    pub fn stem_for(&mut self, id: &NodeId, name: &str) -> String {
        let from_id = || derive_file_stem(id.as_str()).unwrap_or_else(|_| FALLBACK_STEM.into());
        let base = match self.strategy {
            NamingStrategy::Id => from_id(),
            NamingStrategy::Name => derive_file_stem(name).unwrap_or_else(|_| from_id()),
        };

        if self.taken.insert(base.clone()) {
            return base;
        }

        let mut attempt = 2usize;
        loop {
            let candidate = format!("{base}-{attempt}");
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_become_portable_stems() {
        let mut namer = AssetNamer::new(NamingStrategy::Id);
        assert_eq!(namer.stem_for(&"12:345".into(), "ignored"), "12-345");
        assert_eq!(namer.stem_for(&"I1:2;3:4".into(), "ignored"), "i1-2-3-4");
    }

    #[test]
    fn names_fall_back_to_identifiers() {
        let mut namer = AssetNamer::new(NamingStrategy::Name);
        assert_eq!(namer.stem_for(&"1:2".into(), "Home Screen"), "home-screen");
        assert_eq!(namer.stem_for(&"1:3".into(), "   "), "1-3");
    }

    #[test]
    fn collisions_receive_counters() {
        let mut namer = AssetNamer::new(NamingStrategy::Name);
        assert_eq!(namer.stem_for(&"1:1".into(), "Cover"), "cover");
        assert_eq!(namer.stem_for(&"1:2".into(), "cover"), "cover-2");
        assert_eq!(namer.stem_for(&"1:3".into(), "Cover 2"), "cover-2-2");
        assert_eq!(namer.stem_for(&"1:4".into(), "COVER"), "cover-3");
    }

    #[test]
    fn strategy_parses_case_insensitively() {
        assert_eq!("Name".parse::<NamingStrategy>(), Ok(NamingStrategy::Name));
        assert_eq!(
            "slug".parse::<NamingStrategy>(),
            Err(NamingError::UnknownStrategy("slug".into()))
        );
    }

    #[test]
    fn empty_input_is_reported() {
        assert_eq!(derive_file_stem(""), Err(NamingError::EmptyInput));
    }
}
