//! Version specification and range parsing
//!
//! Implements npm-style dependency specifiers:
//! - `1.2.3`, `=1.2.3`, `v1.2.3` - Exact version
//! - `>=1.2.0`, `> 1.2.0`, `<2`, `<=2.1` - Primitive comparators
//! - `1`, `1.x`, `1.2.*`, `*` - X-ranges
//! - `~1.2.3` - Patch-level changes (>=1.2.3 <1.3.0)
//! - `^1.2.3` - Changes that keep the left-most non-zero component
//! - `1.2.3 - 2.3.4` - Hyphen ranges (inclusive)
//! - `^1.0.0 || ^2.0.0` - Alternatives
//! - `latest`, `next` - Dist-tags
//! - `npm:other@^1.0.0` - Aliases
//!
//! A prerelease version only satisfies a comparator set when one of the
//! set's comparators names the same `major.minor.patch` with a prerelease.

use semver::{Prerelease, Version};
use serde::{Deserialize, Serialize};
use npmirror_errors::VersionError;
use std::fmt;
use std::str::FromStr;

/// A single primitive version constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionConstraint {
    Exact(Version),
    GreaterEqual(Version),
    LessEqual(Version),
    Greater(Version),
    Less(Version),
}

impl VersionConstraint {
    /// Check if a version satisfies this constraint
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Self::Exact(v) => version == v,
            Self::GreaterEqual(v) => version >= v,
            Self::LessEqual(v) => version <= v,
            Self::Greater(v) => version > v,
            Self::Less(v) => version < v,
        }
    }

    /// The version this constraint compares against
    #[must_use]
    pub fn version(&self) -> &Version {
        match self {
            Self::Exact(v)
            | Self::GreaterEqual(v)
            | Self::LessEqual(v)
            | Self::Greater(v)
            | Self::Less(v) => v,
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(v) => write!(f, "={v}"),
            Self::GreaterEqual(v) => write!(f, ">={v}"),
            Self::LessEqual(v) => write!(f, "<={v}"),
            Self::Greater(v) => write!(f, ">{v}"),
            Self::Less(v) => write!(f, "<{v}"),
        }
    }
}

/// A conjunction of constraints; empty means any release version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparatorSet {
    constraints: Vec<VersionConstraint>,
}

impl ComparatorSet {
    /// Check if a version satisfies every constraint of the set
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        if !self.constraints.iter().all(|c| c.matches(version)) {
            return false;
        }
        if version.pre.is_empty() {
            return true;
        }
        self.constraints.iter().any(|c| {
            let v = c.version();
            !v.pre.is_empty()
                && v.major == version.major
                && v.minor == version.minor
                && v.patch == version.patch
        })
    }

    /// Get the constraints
    #[must_use]
    pub fn constraints(&self) -> &[VersionConstraint] {
        &self.constraints
    }

    fn parse(input: &str) -> Result<Self, VersionError> {
        let tokens = tokenize(input);

        if tokens.len() == 3 && tokens[1] == "-" {
            return Ok(Self {
                constraints: hyphen_range(&tokens[0], &tokens[2], input)?,
            });
        }

        let mut constraints = Vec::new();
        for token in &tokens {
            constraints.extend(desugar(token, input)?);
        }
        Ok(Self { constraints })
    }
}

/// An npm version range: any of several comparator sets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRange {
    raw: String,
    sets: Vec<ComparatorSet>,
}

impl VersionRange {
    /// Range that accepts any release version
    #[must_use]
    pub fn any() -> Self {
        Self {
            raw: "*".to_string(),
            sets: vec![ComparatorSet {
                constraints: Vec::new(),
            }],
        }
    }

    /// Range that accepts exactly one version
    #[must_use]
    pub fn exact(version: Version) -> Self {
        Self {
            raw: version.to_string(),
            sets: vec![ComparatorSet {
                constraints: vec![VersionConstraint::Exact(version)],
            }],
        }
    }

    /// Check if a version satisfies any alternative
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        self.sets.iter().any(|set| set.matches(version))
    }

    /// Pick the highest version that satisfies the range
    pub fn max_satisfying<'a, I>(&self, versions: I) -> Option<&'a Version>
    where
        I: IntoIterator<Item = &'a Version>,
    {
        versions.into_iter().filter(|v| self.matches(v)).max()
    }

    /// Get the comparator sets
    #[must_use]
    pub fn sets(&self) -> &[ComparatorSet] {
        &self.sets
    }

    /// Check if this range accepts any release version
    #[must_use]
    pub fn is_any(&self) -> bool {
        self.sets.iter().any(|s| s.constraints.is_empty())
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let sets = s
            .split("||")
            .map(ComparatorSet::parse)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: if s.is_empty() { "*".to_string() } else { s.to_string() },
            sets,
        })
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// A dependency specifier as found in a package manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionSpec {
    /// Dist-tag such as `latest`
    Tag(String),
    /// Semver range
    Range(VersionRange),
    /// `npm:<name>@<spec>` alias
    Alias { name: String, spec: Box<VersionSpec> },
    /// Git, URL, file or link specifiers that cannot be served from a registry
    Unsupported(String),
}

impl VersionSpec {
    /// The `latest` dist-tag
    #[must_use]
    pub fn latest() -> Self {
        Self::Tag(crate::LATEST_TAG.to_string())
    }

    /// Parse a dependency value from a manifest
    ///
    /// # Errors
    ///
    /// Returns `VersionError::InvalidRange` if the value is neither a
    /// tag, a range, an alias nor a recognizable non-registry specifier.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let s = input.trim();

        if let Some(rest) = s.strip_prefix("npm:") {
            let at = rest
                .char_indices()
                .skip(1)
                .find(|(_, c)| *c == '@')
                .map(|(i, _)| i);
            let (name, spec) = match at {
                Some(i) => (&rest[..i], &rest[i + 1..]),
                None => (rest, ""),
            };
            if name.is_empty() {
                return Err(VersionError::InvalidRange {
                    input: input.to_string(),
                });
            }
            return Ok(Self::Alias {
                name: name.to_string(),
                spec: Box::new(Self::parse(spec)?),
            });
        }

        if s.contains(':') || s.contains('/') {
            return Ok(Self::Unsupported(s.to_string()));
        }

        if is_tag(s) {
            return Ok(Self::Tag(s.to_string()));
        }

        Ok(Self::Range(s.parse()?))
    }
}

impl FromStr for VersionSpec {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(tag) => write!(f, "{tag}"),
            Self::Range(range) => write!(f, "{range}"),
            Self::Alias { name, spec } => write!(f, "npm:{name}@{spec}"),
            Self::Unsupported(raw) => write!(f, "{raw}"),
        }
    }
}

fn is_tag(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_alphabetic() || s.eq_ignore_ascii_case("x") {
        return false;
    }
    if first == 'v' && chars.next().is_some_and(|c| c.is_ascii_digit()) {
        return false;
    }
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Split a comparator set into tokens, gluing bare operators to their version
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut pending_op: Option<String> = None;

    for word in input.split_whitespace() {
        let is_operator = matches!(word, ">" | ">=" | "<" | "<=" | "=" | "~" | "~>" | "^");
        if is_operator {
            pending_op = Some(word.to_string());
            continue;
        }
        match pending_op.take() {
            Some(op) => tokens.push(format!("{op}{word}")),
            None => tokens.push(word.to_string()),
        }
    }
    if let Some(op) = pending_op {
        tokens.push(op);
    }
    tokens
}

/// A possibly incomplete version such as `1`, `1.x` or `1.2.3-beta.1`
#[derive(Debug, Clone)]
struct Partial {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    pre: Prerelease,
}

impl Partial {
    fn parse(s: &str, input: &str) -> Result<Self, VersionError> {
        let invalid = || VersionError::InvalidRange {
            input: input.to_string(),
        };

        let s = s.trim_start_matches('=').trim_start_matches('v');
        let s = s.split('+').next().unwrap_or_default();
        let (core, pre) = match s.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (s, None),
        };

        let mut parts = [None; 3];
        let mut wildcard = false;
        let pieces: Vec<&str> = if core.is_empty() {
            Vec::new()
        } else {
            core.split('.').collect()
        };
        if pieces.len() > 3 {
            return Err(invalid());
        }
        for (slot, piece) in parts.iter_mut().zip(&pieces) {
            if wildcard || matches!(*piece, "x" | "X" | "*") {
                wildcard = true;
                continue;
            }
            *slot = Some(piece.parse::<u64>().map_err(|_| invalid())?);
        }

        let pre = match pre {
            Some(pre) if parts.iter().all(Option::is_some) => {
                Prerelease::new(pre).map_err(|_| invalid())?
            }
            Some(_) => return Err(invalid()),
            None => Prerelease::EMPTY,
        };

        Ok(Self {
            major: parts[0],
            minor: parts[1],
            patch: parts[2],
            pre,
        })
    }

    fn is_full(&self) -> bool {
        self.patch.is_some()
    }

    /// Lowest version matching the partial (missing components are zero)
    fn floor(&self) -> Version {
        let mut v = Version::new(
            self.major.unwrap_or(0),
            self.minor.unwrap_or(0),
            self.patch.unwrap_or(0),
        );
        v.pre = self.pre.clone();
        v
    }

    /// First version above everything the partial covers, or `None` for `*`
    fn ceiling(&self) -> Option<Version> {
        match (self.major, self.minor, self.patch) {
            (None, _, _) => None,
            (Some(major), None, _) => Some(Version::new(major + 1, 0, 0)),
            (Some(major), Some(minor), None) => Some(Version::new(major, minor + 1, 0)),
            (Some(major), Some(minor), Some(patch)) => Some(Version::new(major, minor, patch + 1)),
        }
    }
}

fn nothing() -> Vec<VersionConstraint> {
    vec![VersionConstraint::Less(Version::new(0, 0, 0))]
}

fn x_range(p: &Partial) -> Vec<VersionConstraint> {
    if p.major.is_none() {
        return Vec::new();
    }
    if p.is_full() {
        return vec![VersionConstraint::Exact(p.floor())];
    }
    let mut out = vec![VersionConstraint::GreaterEqual(p.floor())];
    out.extend(p.ceiling().map(VersionConstraint::Less));
    out
}

fn tilde(p: &Partial) -> Vec<VersionConstraint> {
    let Some(major) = p.major else {
        return Vec::new();
    };
    let upper = match p.minor {
        Some(minor) => Version::new(major, minor + 1, 0),
        None => Version::new(major + 1, 0, 0),
    };
    vec![
        VersionConstraint::GreaterEqual(p.floor()),
        VersionConstraint::Less(upper),
    ]
}

fn caret(p: &Partial) -> Vec<VersionConstraint> {
    let Some(major) = p.major else {
        return Vec::new();
    };
    let upper = match (major, p.minor, p.patch) {
        (0, Some(0), Some(patch)) => Version::new(0, 0, patch + 1),
        (0, Some(0), None) => Version::new(0, 1, 0),
        (0, Some(minor), _) => Version::new(0, minor + 1, 0),
        (major, _, _) => Version::new(major + 1, 0, 0),
    };
    vec![
        VersionConstraint::GreaterEqual(p.floor()),
        VersionConstraint::Less(upper),
    ]
}

fn desugar(token: &str, input: &str) -> Result<Vec<VersionConstraint>, VersionError> {
    let (op, rest) = split_operator(token);
    let p = Partial::parse(rest, input)?;

    let constraints = match op {
        "" | "=" => x_range(&p),
        "~" | "~>" => tilde(&p),
        "^" => caret(&p),
        ">=" => {
            if p.major.is_none() {
                Vec::new()
            } else {
                vec![VersionConstraint::GreaterEqual(p.floor())]
            }
        }
        ">" => match (p.is_full(), p.ceiling()) {
            (true, _) => vec![VersionConstraint::Greater(p.floor())],
            (false, Some(ceiling)) => vec![VersionConstraint::GreaterEqual(ceiling)],
            (false, None) => nothing(),
        },
        "<" => {
            if p.major.is_none() {
                nothing()
            } else {
                vec![VersionConstraint::Less(p.floor())]
            }
        }
        "<=" => match (p.is_full(), p.ceiling()) {
            (true, _) => vec![VersionConstraint::LessEqual(p.floor())],
            (false, Some(ceiling)) => vec![VersionConstraint::Less(ceiling)],
            (false, None) => Vec::new(),
        },
        _ => {
            return Err(VersionError::InvalidRange {
                input: input.to_string(),
            })
        }
    };
    Ok(constraints)
}

fn split_operator(token: &str) -> (&str, &str) {
    for op in [">=", "<=", "~>", ">", "<", "=", "~", "^"] {
        if let Some(rest) = token.strip_prefix(op) {
            return (op, rest);
        }
    }
    ("", token)
}

fn hyphen_range(
    lower: &str,
    upper: &str,
    input: &str,
) -> Result<Vec<VersionConstraint>, VersionError> {
    let lower = Partial::parse(lower, input)?;
    let upper = Partial::parse(upper, input)?;

    let mut out = Vec::new();
    if lower.major.is_some() {
        out.push(VersionConstraint::GreaterEqual(lower.floor()));
    }
    if upper.is_full() {
        out.push(VersionConstraint::LessEqual(upper.floor()));
    } else if let Some(ceiling) = upper.ceiling() {
        out.push(VersionConstraint::Less(ceiling));
    }
    Ok(out)
}
