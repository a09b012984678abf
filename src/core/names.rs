//! Compound stimulus names.
//!
//! A compound is named by the sorted concatenation of its elementary cues.
//! An elementary cue is one letter followed by optional prime marks or
//! superscript digits (`A`, `A'`, `B''`, `C²`), or a parenthesized configural
//! group such as `(AB)` that stands for a compound as a learning unit of its own.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{PalmsError, PalmsResult};

/// One elementary cue or one configural group.
pub(crate) const ELEMENT_PATTERN: &str = r"\([^()]+\)|[A-Za-zÑñ]'*[⁰¹²³⁴⁵⁶⁷⁸⁹]*";

static ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(ELEMENT_PATTERN).expect("element pattern is valid"));

/// Name resolution options for one experiment run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CueConfig {
    /// Add a synthetic `(AB)` unit whenever a compound `AB` is presented.
    pub configural: bool,
}

impl CueConfig {
    pub fn elemental() -> Self {
        Self { configural: false }
    }

    pub fn configural() -> Self {
        Self { configural: true }
    }
}

/// Decompose `name` into sorted, distinct elementary components.
///
/// Fails when the components do not cover the whole input exactly once, which
/// catches stray characters as well as repeated cues (`AAB`).
pub fn split(name: &str) -> PalmsResult<Vec<String>> {
    let parts: BTreeSet<&str> = ELEMENT.find_iter(name).map(|m| m.as_str()).collect();

    let covered: usize = parts.iter().map(|p| p.len()).sum();
    if covered != name.len() || parts.is_empty() {
        return Err(PalmsError::MalformedName(name.to_string()));
    }

    Ok(parts.into_iter().map(str::to_string).collect())
}

/// Constituents that learn when `name` is presented.
///
/// Same as [`split`], plus the configural unit for compounds of two or more
/// elementary cues when `cues.configural` is set.
pub fn list_cs(name: &str, cues: CueConfig) -> PalmsResult<Vec<String>> {
    let mut parts = split(name)?;

    if cues.configural {
        let elementary: Vec<&str> = parts
            .iter()
            .filter(|p| !p.starts_with('('))
            .map(String::as_str)
            .collect();
        if elementary.len() > 1 {
            let configural = format!("({})", elementary.concat());
            parts.push(configural);
        }
    }

    Ok(parts)
}

/// Name of the compound made of every cue in `a` and `b`.
///
/// Inputs are names this crate produced, so tokens are read leniently.
pub fn union(a: &str, b: &str) -> String {
    let parts: BTreeSet<&str> = ELEMENT
        .find_iter(a)
        .chain(ELEMENT.find_iter(b))
        .map(|m| m.as_str())
        .collect();
    parts.into_iter().collect()
}

/// Sort key used when listing the series of a phase: shorter compounds
/// first, ignoring primes and parentheses.
pub fn display_order(name: &str) -> (usize, String) {
    let bare = name.chars().filter(|c| !matches!(c, '\'' | '(' | ')')).count();
    (bare, name.to_string())
}
