// src/version/mod.rs

//! Dotted package versions and version ranges
//!
//! Recipe versions are upstream release strings such as `1.4.18`. They are
//! ordered component-wise, and `@`-terms in predicates match either a single
//! version (including its sub-versions, so `@1.4` matches `1.4.18`) or an
//! inclusive range written `low:high` with either bound optional.

use crate::error::{Error, Result};
use semver::Version as SemVersion;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A dotted release version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    raw: String,
}

impl Version {
    /// Parse a version string
    ///
    /// Accepts any non-empty string of alphanumeric components separated by
    /// `.`, `-` or `_`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::ParseError("Empty version string".to_string()));
        }
        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')))
        {
            return Err(Error::ParseError(format!(
                "Invalid character '{}' in version '{}'",
                c, s
            )));
        }
        if s.split(['.', '-', '_']).any(|part| part.is_empty()) {
            return Err(Error::ParseError(format!("Empty component in version '{}'", s)));
        }
        Ok(Self { raw: s.to_string() })
    }

    /// The version as written in the recipe
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn components(&self) -> Vec<&str> {
        self.raw.split(['.', '-', '_']).collect()
    }

    /// Normalize the leading three numeric components for ordering
    fn to_semver(&self) -> SemVersion {
        let parts = self.components();
        let num = |i: usize| parts.get(i).and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);
        SemVersion::new(num(0), num(1), num(2))
    }

    /// True if `self` equals `other` or is a sub-version of it (`1.4.18` of `1.4`)
    pub fn has_prefix(&self, other: &Version) -> bool {
        let mine = self.components();
        let theirs = other.components();
        theirs.len() <= mine.len() && mine.iter().zip(theirs.iter()).all(|(a, b)| a == b)
    }
}

fn compare_component(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        // Numeric components sort after alphabetic ones (1.0.rc1 < 1.0.1)
        (Ok(_), Err(_)) => Ordering::Greater,
        (Err(_), Ok(_)) => Ordering::Less,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.to_semver().cmp(&other.to_semver()) {
            Ordering::Equal => {}
            ord => return ord,
        }

        let mine = self.components();
        let theirs = other.components();
        for (a, b) in mine.iter().zip(theirs.iter()) {
            match compare_component(a, b) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }
        // Spellings that normalise alike still differ, to agree with Eq
        mine.len()
            .cmp(&theirs.len())
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = Error;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        Version::parse(&s)
    }
}

impl From<Version> for String {
    fn from(v: Version) -> String {
        v.raw
    }
}

/// A version constraint as written after `@` in a predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionRange {
    /// A single version and its sub-versions
    Exact(Version),
    /// Inclusive range; either bound may be open
    Between {
        low: Option<Version>,
        high: Option<Version>,
    },
}

impl VersionRange {
    /// Parse `1.4.18`, `1.4.17:1.4.18`, `:1.4` or `1.4:`
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::ParseError("Empty version constraint".to_string()));
        }

        match s.split_once(':') {
            None => Ok(VersionRange::Exact(Version::parse(s)?)),
            Some((low, high)) => {
                if high.contains(':') {
                    return Err(Error::ParseError(format!(
                        "Version range '{}' has more than one ':'",
                        s
                    )));
                }
                let low = if low.is_empty() { None } else { Some(Version::parse(low)?) };
                let high = if high.is_empty() { None } else { Some(Version::parse(high)?) };
                Ok(VersionRange::Between { low, high })
            }
        }
    }

    /// Check whether a concrete version satisfies this constraint
    pub fn contains(&self, version: &Version) -> bool {
        match self {
            VersionRange::Exact(v) => version.has_prefix(v),
            VersionRange::Between { low, high } => {
                let above = low.as_ref().is_none_or(|l| version >= l);
                let below = high
                    .as_ref()
                    .is_none_or(|h| version <= h || version.has_prefix(h));
                above && below
            }
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionRange::Exact(v) => write!(f, "{}", v),
            VersionRange::Between { low, high } => {
                if let Some(l) = low {
                    write!(f, "{}", l)?;
                }
                write!(f, ":")?;
                if let Some(h) = high {
                    write!(f, "{}", h)?;
                }
                Ok(())
            }
        }
    }
}
