// src/recipe/condition.rs

//! `when` predicates for patches, dependencies, and configure arguments
//!
//! A predicate is a conjunction of terms written with the same sigils as a
//! spec string:
//!
//! - `@1.4.18`, `@1.4.17:1.4.18` - package version
//! - `%clang`, `%gcc@9:` - compiler family (and version)
//! - `+sigsegv` / `~sigsegv` - variant enabled / disabled
//! - `platform=darwin`, `os=sierra`, `target=x86_64` - architecture
//! - `!<term>` - negation of a single term
//!
//! The empty predicate always holds.

use crate::error::{Error, Result};
use crate::recipe::spec::BuildSpec;
use crate::version::VersionRange;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One lexical unit of a spec string or predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    /// Bare package name (`m4`)
    Name(String),
    /// `@range`
    Version(VersionRange),
    /// `%family[@range]`
    Compiler {
        family: String,
        version: Option<VersionRange>,
    },
    /// `+name` or `~name`
    Variant { name: String, enabled: bool },
    /// `key=value`
    KeyValue { key: String, value: String },
    /// `!token`
    Not(Box<Token>),
}

fn check_identifier(name: &str, sigil: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::ParseError(format!("Missing name after {} operator", sigil)));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(Error::ParseError(format!("Invalid name '{}' after {}", name, sigil)));
    }
    Ok(())
}

/// Split a single word into sigil-led segments
///
/// `m4@1.4.18+sigsegv%gcc@9.3.0` becomes `m4`, `@1.4.18`, `+sigsegv`,
/// `%gcc@9.3.0`. An `@` directly following a compiler name belongs to it.
fn split_segments(word: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut in_compiler = word.starts_with('%');

    for (i, c) in word.char_indices().skip(1) {
        match c {
            '+' | '~' | '%' => {
                segments.push(&word[start..i]);
                start = i;
                in_compiler = c == '%';
            }
            '@' if in_compiler => in_compiler = false,
            '@' => {
                segments.push(&word[start..i]);
                start = i;
            }
            _ => {}
        }
    }
    segments.push(&word[start..]);
    segments
}

fn parse_segment(segment: &str) -> Result<Token> {
    if let Some(rest) = segment.strip_prefix('@') {
        return Ok(Token::Version(VersionRange::parse(rest)?));
    }
    if let Some(rest) = segment.strip_prefix('+') {
        check_identifier(rest, "+")?;
        return Ok(Token::Variant {
            name: rest.to_string(),
            enabled: true,
        });
    }
    if let Some(rest) = segment.strip_prefix('~') {
        check_identifier(rest, "~")?;
        return Ok(Token::Variant {
            name: rest.to_string(),
            enabled: false,
        });
    }
    if let Some(rest) = segment.strip_prefix('%') {
        let (family, version) = match rest.split_once('@') {
            Some((family, range)) => (family, Some(VersionRange::parse(range)?)),
            None => (rest, None),
        };
        check_identifier(family, "%")?;
        return Ok(Token::Compiler {
            family: family.to_string(),
            version,
        });
    }
    check_identifier(segment, "package")?;
    Ok(Token::Name(segment.to_string()))
}

/// Tokenize a spec string or predicate
pub(crate) fn tokenize(s: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();

    for word in s.split_whitespace() {
        let (negated, body) = match word.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, word),
        };
        if body.is_empty() {
            return Err(Error::ParseError("Missing term after ! operator".to_string()));
        }

        let mut word_tokens = if !body.starts_with(['@', '+', '~', '%']) && body.contains('=') {
            let (key, value) = body.split_once('=').unwrap_or((body, ""));
            if key.is_empty() || value.is_empty() {
                return Err(Error::ParseError(format!("Malformed key=value term '{}'", body)));
            }
            vec![Token::KeyValue {
                key: key.to_string(),
                value: value.to_string(),
            }]
        } else {
            split_segments(body)
                .into_iter()
                .map(parse_segment)
                .collect::<Result<Vec<_>>>()?
        };

        if negated {
            if word_tokens.len() != 1 {
                return Err(Error::ParseError(format!(
                    "Negation applies to a single term, got '{}'",
                    word
                )));
            }
            let inner = word_tokens.remove(0);
            tokens.push(Token::Not(Box::new(inner)));
        } else {
            tokens.extend(word_tokens);
        }
    }

    Ok(tokens)
}

/// A single predicate term
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Version(VersionRange),
    Compiler {
        family: String,
        version: Option<VersionRange>,
    },
    Variant {
        name: String,
        enabled: bool,
    },
    Platform(String),
    Os(String),
    Target(String),
    Not(Box<Term>),
}

impl Term {
    fn from_token(token: Token) -> Result<Self> {
        match token {
            Token::Version(range) => Ok(Term::Version(range)),
            Token::Compiler { family, version } => Ok(Term::Compiler { family, version }),
            Token::Variant { name, enabled } => Ok(Term::Variant { name, enabled }),
            Token::KeyValue { key, value } => match key.as_str() {
                "platform" => Ok(Term::Platform(value)),
                "os" => Ok(Term::Os(value)),
                "target" => Ok(Term::Target(value)),
                _ => Err(Error::ParseError(format!(
                    "Unknown predicate key '{}' (expected platform, os, or target)",
                    key
                ))),
            },
            Token::Not(inner) => Ok(Term::Not(Box::new(Term::from_token(*inner)?))),
            Token::Name(name) => Err(Error::ParseError(format!(
                "Package name '{}' is not allowed in a predicate",
                name
            ))),
        }
    }

    /// Evaluate this term against a resolved build
    pub fn satisfied_by(&self, spec: &BuildSpec) -> bool {
        match self {
            Term::Version(range) => range.contains(&spec.version),
            Term::Compiler { family, version } => {
                spec.compiler.family == *family
                    && version.as_ref().is_none_or(|range| {
                        spec.compiler.version.as_ref().is_some_and(|v| range.contains(v))
                    })
            }
            Term::Variant { name, enabled } => spec.variant(name) == *enabled,
            Term::Platform(p) => spec.arch.platform == *p,
            Term::Os(os) => spec.arch.os == *os,
            Term::Target(t) => spec.arch.target == *t,
            Term::Not(inner) => !inner.satisfied_by(spec),
        }
    }

    fn variant_name(&self) -> Option<&str> {
        match self {
            Term::Variant { name, .. } => Some(name.as_str()),
            Term::Not(inner) => inner.variant_name(),
            _ => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Version(range) => write!(f, "@{}", range),
            Term::Compiler { family, version } => {
                write!(f, "%{}", family)?;
                if let Some(range) = version {
                    write!(f, "@{}", range)?;
                }
                Ok(())
            }
            Term::Variant { name, enabled } => {
                write!(f, "{}{}", if *enabled { "+" } else { "~" }, name)
            }
            Term::Platform(p) => write!(f, "platform={}", p),
            Term::Os(os) => write!(f, "os={}", os),
            Term::Target(t) => write!(f, "target={}", t),
            Term::Not(inner) => write!(f, "!{}", inner),
        }
    }
}

/// A conjunction of terms; empty means "always"
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Condition {
    terms: Vec<Term>,
}

impl Condition {
    /// The predicate that always holds
    pub fn always() -> Self {
        Self::default()
    }

    /// Parse a predicate string
    pub fn parse(s: &str) -> Result<Self> {
        let terms = tokenize(s)?
            .into_iter()
            .map(Term::from_token)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { terms })
    }

    /// True if this predicate has no terms
    pub fn is_always(&self) -> bool {
        self.terms.is_empty()
    }

    /// The terms of this predicate, in written order
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Evaluate against a resolved build; all terms must hold
    pub fn satisfied_by(&self, spec: &BuildSpec) -> bool {
        self.terms.iter().all(|term| term.satisfied_by(spec))
    }

    /// Names of variants this predicate refers to
    pub fn variant_names(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().filter_map(Term::variant_name)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.terms.iter().map(|t| t.to_string()).collect();
        write!(f, "{}", parts.join(" "))
    }
}

impl FromStr for Condition {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Condition::parse(s)
    }
}

impl TryFrom<String> for Condition {
    type Error = Error;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        Condition::parse(&s)
    }
}

impl From<Condition> for String {
    fn from(c: Condition) -> Self {
        c.to_string()
    }
}
