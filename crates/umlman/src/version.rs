use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ErrorKind, UmlError};

/// Semantic version `MAJOR.MINOR.PATCH[-PRE]` as used in diagram file names.
///
/// Parsing is strict: no leading `v`, no surrounding whitespace, no build
/// metadata and no leading zeros in numeric components, so that
/// `to_string` reproduces the parsed text exactly. A file such as
/// `x-01.0.0.puml` therefore has no identity and is left out of listings.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Version {
    major: u64,
    minor: u64,
    patch: u64,
    pre: Option<String>,
}

fn version_regex() -> &'static Regex {
    static VERSION_REGEX: OnceLock<Regex> = OnceLock::new();
    VERSION_REGEX.get_or_init(|| {
        Regex::new(r"^(\d+)\.(\d+)\.(\d+)(?:-([A-Za-z0-9.-]+))?$").expect("valid version regex")
    })
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
        }
    }

    pub fn with_pre_release(mut self, pre: impl Into<String>) -> Self {
        self.pre = Some(pre.into());
        self
    }

    pub fn parse(input: &str) -> Result<Self, UmlError> {
        let caps = version_regex().captures(input).ok_or_else(|| {
            UmlError::new(
                ErrorKind::VersionParsing,
                format!("`{input}` is not a MAJOR.MINOR.PATCH[-PRE] version"),
            )
            .with_context("version", input)
        })?;

        let numeric = |idx: usize| -> Result<u64, UmlError> {
            let text = &caps[idx];
            if text.len() > 1 && text.starts_with('0') {
                return Err(UmlError::new(
                    ErrorKind::VersionParsing,
                    format!("`{input}` has a leading zero in a numeric component"),
                )
                .with_context("version", input));
            }
            text.parse::<u64>().map_err(|err| {
                UmlError::new(
                    ErrorKind::VersionParsing,
                    format!("`{input}` has an out-of-range component"),
                )
                .with_context("version", input)
                .with_source(err)
            })
        };

        Ok(Self {
            major: numeric(1)?,
            minor: numeric(2)?,
            patch: numeric(3)?,
            pre: caps.get(4).map(|m| m.as_str().to_string()),
        })
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    pub fn patch(&self) -> u64 {
        self.patch
    }

    pub fn pre_release(&self) -> Option<&str> {
        self.pre.as_deref()
    }

    pub fn is_pre_release(&self) -> bool {
        self.pre.is_some()
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "-{pre}")?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = UmlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Version::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn parses_release_and_pre_release() {
        let plain = v("1.2.3");
        assert_eq!((plain.major(), plain.minor(), plain.patch()), (1, 2, 3));
        assert_eq!(plain.pre_release(), None);

        let pre = v("1.0.0-beta.1");
        assert_eq!(pre.pre_release(), Some("beta.1"));

        let dashed = v("2.0.0-rc-2");
        assert_eq!(dashed.pre_release(), Some("rc-2"));

        assert!(!plain.is_pre_release());
        assert!(pre.is_pre_release());
        assert_eq!(Version::new(1, 0, 0).with_pre_release("beta.1"), pre);
    }

    #[test]
    fn rejects_loose_forms() {
        for input in [
            "v1.0.0", "1.0.0 ", " 1.0.0", "1.0", "1.0.0-", "1.0.0+build", "01.0.0", "",
            "1.0.0-beta_1",
        ] {
            let err = Version::parse(input).expect_err(input);
            assert_eq!(err.kind(), ErrorKind::VersionParsing, "{input}");
        }
    }

    #[test]
    fn display_round_trips() {
        for input in ["0.0.0", "1.2.3", "10.20.30-alpha.1", "1.0.0-x-y.z"] {
            assert_eq!(v(input).to_string(), input);
            assert_eq!(Version::parse(&v(input).to_string()).unwrap(), v(input));
        }
    }

    #[test]
    fn ordering_is_numeric_then_release_over_pre_release() {
        assert!(v("1.10.0") > v("1.9.0"));
        assert!(v("2.0.0") > v("1.99.99"));
        assert!(v("1.0.0") > v("1.0.0-rc.1"));
        assert!(v("1.0.0-beta") > v("1.0.0-alpha"));
        assert_eq!(v("1.0.0-beta").cmp(&v("1.0.0-beta")), Ordering::Equal);
    }

    #[test]
    fn ordering_is_antisymmetric() {
        let versions = ["0.1.0", "1.0.0", "1.0.0-alpha", "1.0.0-beta.2", "3.2.1"];
        for a in versions {
            for b in versions {
                assert_eq!(v(a).cmp(&v(b)), v(b).cmp(&v(a)).reverse(), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&v("1.0.0-beta.1")).unwrap();
        assert_eq!(json, "\"1.0.0-beta.1\"");
        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v("1.0.0-beta.1"));
    }
}
