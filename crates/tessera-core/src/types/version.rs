//! Two-part semantic version numbers for entities.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{ErrorCode, TesseraError};
use crate::types::ChangeKind;

/// Entity version: the integer part counts breaking changes, the fractional
/// part counts non-breaking changes since the last breaking one.
///
/// The two parts are kept as separate integers, so `1.9` followed by a minor
/// change becomes `1.10` rather than rolling over into `2.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    /// Version assigned to every newly created entity.
    pub const INITIAL: Version = Version { major: 1, minor: 0 };

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Version that follows a change of the given kind.
    pub fn bump(self, kind: ChangeKind) -> Self {
        match kind {
            ChangeKind::NoChange => self,
            ChangeKind::Minor => Self::new(self.major, self.minor + 1),
            ChangeKind::Major => Self::new(self.major + 1, 0),
            ChangeKind::Created => Self::INITIAL,
        }
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::INITIAL
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for Version {
    type Err = TesseraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TesseraError::Parse {
            message: format!("invalid version '{}'", s),
            code: ErrorCode::ParseInvalidVersion,
        };

        let (major, minor) = match s.trim().split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (s.trim(), "0"),
        };
        let major = major.parse::<u32>().map_err(|_| invalid())?;
        let minor = minor.parse::<u32>().map_err(|_| invalid())?;
        Ok(Self::new(major, minor))
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct VersionVisitor;

        impl<'de> Visitor<'de> for VersionVisitor {
            type Value = Version;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a version string such as \"1.2\" or a decimal number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Version, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Version, E> {
                let major = u32::try_from(v).map_err(E::custom)?;
                Ok(Version::new(major, 0))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Version, E> {
                let major = u32::try_from(v).map_err(E::custom)?;
                Ok(Version::new(major, 0))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Version, E> {
                // A float cannot tell 1.1 from 1.10; only whole numbers are accepted.
                if v.fract() != 0.0 || v < 0.0 || v > f64::from(u32::MAX) {
                    return Err(E::custom(format!(
                        "version {} must be a \"major.minor\" string",
                        v
                    )));
                }
                Ok(Version::new(v as u32, 0))
            }
        }

        deserializer.deserialize_any(VersionVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minor_bump_keeps_major() {
        let v = Version::new(1, 0).bump(ChangeKind::Minor);
        assert_eq!(v, Version::new(1, 1));

        let v = Version::new(3, 9).bump(ChangeKind::Minor);
        assert_eq!(v, Version::new(3, 10));
        assert_eq!(v.major, 3);
    }

    #[test]
    fn test_major_bump_resets_minor() {
        let v = Version::new(1, 4).bump(ChangeKind::Major);
        assert_eq!(v, Version::new(2, 0));
    }

    #[test]
    fn test_no_change_and_created() {
        let v = Version::new(4, 2);
        assert_eq!(v.bump(ChangeKind::NoChange), v);
        assert_eq!(v.bump(ChangeKind::Created), Version::INITIAL);
    }

    #[test]
    fn test_ordering() {
        assert!(Version::new(1, 10) > Version::new(1, 9));
        assert!(Version::new(2, 0) > Version::new(1, 10));
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("1.2".parse::<Version>().unwrap(), Version::new(1, 2));
        assert_eq!("3".parse::<Version>().unwrap(), Version::new(3, 0));
        assert_eq!(Version::new(1, 10).to_string(), "1.10");
        assert!("one.two".parse::<Version>().is_err());
        assert!("-1.0".parse::<Version>().is_err());
    }

    #[test]
    fn test_serde_accepts_strings_and_whole_numbers() {
        let v: Version = serde_json::from_str("\"2.3\"").unwrap();
        assert_eq!(v, Version::new(2, 3));

        let v: Version = serde_json::from_str("\"1.10\"").unwrap();
        assert_eq!(v, Version::new(1, 10));

        let v: Version = serde_json::from_str("2").unwrap();
        assert_eq!(v, Version::new(2, 0));

        let v: Version = serde_json::from_str("3.0").unwrap();
        assert_eq!(v, Version::new(3, 0));

        let json = serde_json::to_string(&Version::new(1, 4)).unwrap();
        assert_eq!(json, "\"1.4\"");
    }

    #[test]
    fn test_serde_rejects_fractional_numbers() {
        // 1.10 and 1.1 are the same float
        for raw in ["0.1", "1.10", "1.1", "-1.0"] {
            let err = serde_json::from_str::<Version>(raw).unwrap_err();
            assert!(err.to_string().contains("major.minor"), "{raw}: {err}");
        }
        assert!(serde_json::from_str::<Version>("-1").is_err());
    }
}
