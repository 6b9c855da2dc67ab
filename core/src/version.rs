//! Dotted numeric versions with an optional sub-version suffix.
//!
//! The accepted grammar is one or more groups of 1–2 digits joined by `.`,
//! optionally followed by `-` and a 1–2 digit sub-version:
//!
//! ```text
//! 1        1.2        10.4.2        1.0-3        1.2.3.4.5.6
//! ```
//!
//! Ordering is numeric and component-wise. A shorter version is padded
//! with zeros, so `2.1` equals `2.1.0`. The sub-version is informational
//! and takes no part in ordering, equality or hashing:
//!
//! ```
//! use version_gate_core::VersionString;
//!
//! let v = |s: &str| s.parse::<VersionString>().unwrap();
//! assert!(v("2.0") < v("2.0.1"));
//! assert_eq!(v("2.1"), v("2.1.0"));
//! assert_eq!(v("2.0-1"), v("2.0"));
//! assert!(v("2.0-9") < v("2.0.1"));
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{GateError, Result};

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        ^
        (?P<core>(?:\d{1,2}\.)*\d{1,2})  # dotted components
        (?:-(?P<sub>\d{1,2}))?           # optional sub-version
        $
        ",
    )
    .expect("version regex")
});

/// A validated version such as `1.2`, `10.4.2` or `1.0-3`.
///
/// Immutable once parsed. [`Display`](fmt::Display) writes back the exact
/// text that was parsed, so `2.1.0`, `2.1` and `2.1-4` compare equal but
/// print differently.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionString {
    raw: String,
    components: Vec<u8>,
    sub_version: Option<u8>,
}

impl VersionString {
    /// Parses a version string.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::InvalidFormat`] carrying `raw` when the input is
    /// empty, non-numeric, has a group of three or more digits, a trailing
    /// dot, or a dangling hyphen.
    pub fn parse(raw: &str) -> Result<Self> {
        let caps = VERSION_RE
            .captures(raw)
            .ok_or_else(|| GateError::InvalidFormat(raw.to_string()))?;

        let components = caps["core"]
            .split('.')
            .map(|part| part.parse::<u8>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| GateError::InvalidFormat(raw.to_string()))?;

        let sub_version = caps
            .name("sub")
            .map(|m| m.as_str().parse::<u8>())
            .transpose()
            .map_err(|_| GateError::InvalidFormat(raw.to_string()))?;

        Ok(Self {
            raw: raw.to_string(),
            components,
            sub_version,
        })
    }

    /// Returns the same version without its `-N` suffix.
    ///
    /// Used when checking a declared migration against the running app,
    /// so that `2.0-3` is acceptable while the app is at `2.0`.
    pub fn strip_sub_version(&self) -> Self {
        match self.raw.split_once('-') {
            Some((core, _)) => Self {
                raw: core.to_string(),
                components: self.components.clone(),
                sub_version: None,
            },
            None => self.clone(),
        }
    }

    /// The dotted numeric components, left to right.
    pub fn components(&self) -> &[u8] {
        &self.components
    }

    /// The sub-version suffix, if one was given.
    pub fn sub_version(&self) -> Option<u8> {
        self.sub_version
    }

    /// The text this version was parsed from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Components with trailing zeros removed, so equal versions share a
    /// canonical form for hashing.
    fn significant_components(&self) -> &[u8] {
        let len = self
            .components
            .iter()
            .rposition(|&c| c != 0)
            .map_or(0, |i| i + 1);
        &self.components[..len]
    }
}

impl Ord for VersionString {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.components.len().max(other.components.len());
        for i in 0..len {
            let a = self.components.get(i).copied().unwrap_or(0);
            let b = other.components.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for VersionString {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for VersionString {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VersionString {}

impl Hash for VersionString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant_components().hash(state);
    }
}

impl fmt::Display for VersionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for VersionString {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionString {
    type Error = GateError;

    fn try_from(raw: String) -> Result<Self> {
        Self::parse(&raw)
    }
}

impl TryFrom<&str> for VersionString {
    type Error = GateError;

    fn try_from(raw: &str) -> Result<Self> {
        Self::parse(raw)
    }
}

impl From<VersionString> for String {
    fn from(version: VersionString) -> Self {
        version.raw
    }
}
