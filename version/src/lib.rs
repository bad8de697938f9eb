//! Pure version parsing and comparison for network device software versions.
//!
//! Nothing here touches I/O or the store; every function is a total function
//! of its arguments, which is what lets [`ScanEngine`](../fleetguard_module_scan)
//! call `is_affected` millions of times per scan without a database round trip.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("unparseable version: {0:?}")]
    Unparseable(String),
}

/// A normalized `(major, minor, patch, suffix)` tuple.
///
/// Absent trailing components are treated as `0` for comparison purposes but
/// are not the same as an explicit `0` when re-rendered; `Version` only
/// stores what `normalize` could parse numerically plus a trailing
/// lexicographic suffix (e.g. the `a` in `17.9.1a`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub suffix: Option<String>,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            suffix: None,
        }
    }

    /// `(major, minor)` — two versions are on the same train iff these are equal.
    pub fn train(&self) -> (u64, u64) {
        (self.major, self.minor)
    }

    pub fn same_train(&self, other: &Version) -> bool {
        self.train() == other.train()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(suffix) = &self.suffix {
            write!(f, "{suffix}")?;
        }
        Ok(())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.suffix, &other.suffix) {
                (None, None) => Ordering::Equal,
                // no suffix sorts before any suffix on an otherwise-equal numeric version
                // (e.g. 17.9.1 < 17.9.1a), matching vendor release-train ordering.
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

/// Strips leading zeros per numeric component and splits a trailing
/// non-numeric run off the last component as the suffix. Missing trailing
/// components default to `0`.
pub fn normalize(raw: &str) -> Result<Version, VersionError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(VersionError::Unparseable(raw.to_string()));
    }

    let parts: Vec<&str> = raw.split('.').collect();
    if parts.is_empty() || parts.len() > 4 {
        return Err(VersionError::Unparseable(raw.to_string()));
    }

    let mut numeric = [0u64; 3];
    let mut suffix = None;

    for (i, part) in parts.iter().take(3).enumerate() {
        let digits_end = part
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(idx, _)| idx)
            .unwrap_or(part.len());
        let (num_str, rest) = part.split_at(digits_end);
        if num_str.is_empty() {
            return Err(VersionError::Unparseable(raw.to_string()));
        }
        let stripped = num_str.trim_start_matches('0');
        let value: u64 = if stripped.is_empty() {
            0
        } else {
            stripped
                .parse()
                .map_err(|_| VersionError::Unparseable(raw.to_string()))?
        };
        numeric[i] = value;

        if !rest.is_empty() {
            if i != parts.len().min(3) - 1 {
                // a suffix can only trail the last numeric component we parse
                return Err(VersionError::Unparseable(raw.to_string()));
            }
            suffix = Some(rest.to_string());
        }
    }

    Ok(Version {
        major: numeric[0],
        minor: numeric[1],
        patch: numeric[2],
        suffix,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PatternKind {
    Explicit,
    Wildcard,
    OpenLater,
    OpenEarlier,
    MajorWildcard,
    Unknown,
}

/// The parsed projection of an `affected_versions_raw` expression, per §4.1.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedExpression {
    pub pattern_kind: Option<PatternKind>,
    pub version_min: Option<Version>,
    pub version_max: Option<Version>,
    pub explicit_list: Vec<Version>,
}

impl ParsedExpression {
    fn unknown() -> Self {
        Self {
            pattern_kind: Some(PatternKind::Unknown),
            ..Default::default()
        }
    }
}

/// Detects one of the five pattern kinds from the raw vendor expression text.
///
/// Malformed input is never a fatal error: it collapses to
/// [`PatternKind::Unknown`], which `is_affected` always evaluates to `false`
/// — this is the "unparseable" sentinel described in §4.1's failure model.
pub fn parse_expression(raw: &str) -> ParsedExpression {
    let raw = raw.trim();
    if raw.is_empty() {
        return ParsedExpression::unknown();
    }

    let lower = raw.to_ascii_lowercase();

    if let Some(stripped) = lower.strip_suffix("and later") {
        let prefix = raw[..stripped.len()].trim();
        return parse_and_later(prefix).unwrap_or_else(|_| ParsedExpression::unknown());
    }

    if let Some(stripped) = lower.strip_suffix("and earlier") {
        let prefix = raw[..stripped.len()].trim();
        return parse_and_earlier(prefix).unwrap_or_else(|_| ParsedExpression::unknown());
    }

    if is_wildcard_token(raw) {
        return parse_wildcard(raw).unwrap_or_else(|_| ParsedExpression::unknown());
    }

    // Explicit: a single version, or a space/comma separated list of versions.
    let tokens: Vec<&str> = raw
        .split([',', ' '])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if !tokens.is_empty() {
        let parsed: Result<Vec<Version>, VersionError> =
            tokens.iter().map(|t| normalize(t)).collect();
        if let Ok(versions) = parsed {
            if !versions.is_empty() {
                let min = versions.iter().min().cloned();
                let max = versions.iter().max().cloned();
                return ParsedExpression {
                    pattern_kind: Some(PatternKind::Explicit),
                    version_min: min,
                    version_max: max,
                    explicit_list: versions,
                };
            }
        }
    }

    ParsedExpression::unknown()
}

fn is_wildcard_token(raw: &str) -> bool {
    let lower = raw.to_ascii_lowercase();
    lower.ends_with(".x") || lower.ends_with(".*")
}

fn parse_digit_component(part: &str, raw: &str) -> Result<u64, VersionError> {
    let stripped = part.trim_start_matches('0');
    if stripped.is_empty() {
        Ok(0)
    } else {
        stripped
            .parse()
            .map_err(|_| VersionError::Unparseable(raw.to_string()))
    }
}

fn parse_wildcard(raw: &str) -> Result<ParsedExpression, VersionError> {
    // "A.B.x", "A.B.*" -> Wildcard with version_min = (A, B, 0)
    let trimmed = raw.trim_end_matches(['x', 'X', '*']).trim_end_matches('.');
    let parts: Vec<&str> = trimmed.split('.').collect();
    if parts.len() < 2 {
        return Err(VersionError::Unparseable(raw.to_string()));
    }
    let major = parse_digit_component(parts[0], raw)?;
    let minor = parse_digit_component(parts[1], raw)?;
    Ok(ParsedExpression {
        pattern_kind: Some(PatternKind::Wildcard),
        version_min: Some(Version::new(major, minor, 0)),
        version_max: None,
        explicit_list: vec![],
    })
}

fn parse_and_later(prefix: &str) -> Result<ParsedExpression, VersionError> {
    // "A.B and later" (no patch component) -> MajorWildcard, matches later trains.
    let parts: Vec<&str> = prefix.split('.').collect();
    if parts.len() == 2 {
        let v = normalize(&format!("{prefix}.0"))?;
        return Ok(ParsedExpression {
            pattern_kind: Some(PatternKind::MajorWildcard),
            version_min: Some(v),
            version_max: None,
            explicit_list: vec![],
        });
    }
    // "A.B.C and later" -> OpenLater, scoped to the same train.
    let v = normalize(prefix)?;
    Ok(ParsedExpression {
        pattern_kind: Some(PatternKind::OpenLater),
        version_min: Some(v),
        version_max: None,
        explicit_list: vec![],
    })
}

fn parse_and_earlier(prefix: &str) -> Result<ParsedExpression, VersionError> {
    let v = normalize(prefix)?;
    Ok(ParsedExpression {
        pattern_kind: Some(PatternKind::OpenEarlier),
        version_min: None,
        version_max: Some(v),
        explicit_list: vec![],
    })
}

/// The inputs `ScanEngine` needs to decide a single candidate's version match,
/// mirrored from the persisted `Vulnerability` fields so this module never
/// depends on the store crate.
pub struct AffectedQuery<'a> {
    pub kind: PatternKind,
    pub version_min: Option<&'a Version>,
    pub version_max: Option<&'a Version>,
    pub explicit_list: &'a [Version],
    pub fixed_version: Option<&'a Version>,
}

/// Evaluates §4.1's match semantics for a single candidate against a device
/// version. Returns a human-readable reason alongside the verdict for audit
/// output (§4.1, "echoed in scan output for auditability").
pub fn is_affected(device_version: &Version, query: AffectedQuery<'_>) -> (bool, String) {
    let (matched, reason) = match query.kind {
        PatternKind::Explicit => {
            if query.explicit_list.iter().any(|v| v == device_version) {
                (true, format!("{device_version} is an explicitly listed version"))
            } else {
                (false, format!("{device_version} not in explicit list"))
            }
        }
        PatternKind::Wildcard => match query.version_min {
            Some(min) if device_version.same_train(min) => (
                true,
                format!("{device_version} is on train {:?}", min.train()),
            ),
            _ => (false, "different train".to_string()),
        },
        PatternKind::OpenLater => match query.version_min {
            Some(min) => {
                if device_version.same_train(min) && device_version >= min {
                    (
                        true,
                        format!("{device_version} >= {min} on the same train"),
                    )
                } else if !device_version.same_train(min) {
                    (false, "later train not covered by OpenLater".to_string())
                } else {
                    (false, format!("{device_version} < {min}"))
                }
            }
            None => (false, "missing version_min".to_string()),
        },
        PatternKind::OpenEarlier => match query.version_max {
            Some(max) => {
                if device_version <= max {
                    (true, format!("{device_version} <= {max}"))
                } else {
                    (false, format!("{device_version} > {max}"))
                }
            }
            None => (false, "missing version_max".to_string()),
        },
        PatternKind::MajorWildcard => match query.version_min {
            Some(min) => {
                if device_version >= min {
                    (true, format!("{device_version} >= {min} (any later train)"))
                } else {
                    (false, format!("{device_version} < {min}"))
                }
            }
            None => (false, "missing version_min".to_string()),
        },
        PatternKind::Unknown => (false, "unparseable affected-versions expression".to_string()),
    };

    if matched {
        if let Some(fixed) = query.fixed_version {
            if device_version >= fixed {
                return (false, format!("fixed in {fixed}"));
            }
        }
    }

    (matched, reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("17.03.05", 17, 3, 5)]
    #[case("17.3.5", 17, 3, 5)]
    #[case("0.0.1", 0, 0, 1)]
    fn normalize_strips_leading_zeros(
        #[case] raw: &str,
        #[case] major: u64,
        #[case] minor: u64,
        #[case] patch: u64,
    ) {
        let v = normalize(raw).unwrap();
        assert_eq!((v.major, v.minor, v.patch), (major, minor, patch));
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in ["17.10.3", "1.2.3a", "0.1.0"] {
            let once = normalize(raw).unwrap();
            let twice = normalize(&once.to_string()).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn suffix_sorts_after_bare_version() {
        let bare = normalize("17.9.1").unwrap();
        let suffixed = normalize("17.9.1a").unwrap();
        assert!(bare < suffixed);
    }

    #[test]
    fn explicit_pattern() {
        let parsed = parse_expression("17.10.1, 17.10.2");
        assert_eq!(parsed.pattern_kind, Some(PatternKind::Explicit));
        assert_eq!(parsed.explicit_list.len(), 2);
    }

    #[test]
    fn wildcard_pattern() {
        let parsed = parse_expression("17.10.x");
        assert_eq!(parsed.pattern_kind, Some(PatternKind::Wildcard));
        assert_eq!(parsed.version_min.unwrap(), Version::new(17, 10, 0));
    }

    #[test]
    fn open_later_within_train() {
        let parsed = parse_expression("17.10.3 and later");
        assert_eq!(parsed.pattern_kind, Some(PatternKind::OpenLater));
        let min = parsed.version_min.clone().unwrap();

        let query = |v: &Version| AffectedQuery {
            kind: PatternKind::OpenLater,
            version_min: Some(&min),
            version_max: None,
            explicit_list: &[],
            fixed_version: None,
        };

        assert!(is_affected(&normalize("17.10.3").unwrap(), query(&min)).0);
        assert!(!is_affected(&normalize("17.10.2").unwrap(), query(&min)).0);
        assert!(is_affected(&normalize("17.10.5").unwrap(), query(&min)).0);
        assert!(!is_affected(&normalize("17.11.0").unwrap(), query(&min)).0);
    }

    #[test]
    fn major_wildcard_crosses_trains() {
        let parsed = parse_expression("17.10 and later");
        assert_eq!(parsed.pattern_kind, Some(PatternKind::MajorWildcard));
        let min = parsed.version_min.clone().unwrap();

        let query = AffectedQuery {
            kind: PatternKind::MajorWildcard,
            version_min: Some(&min),
            version_max: None,
            explicit_list: &[],
            fixed_version: None,
        };

        assert!(is_affected(&normalize("17.10.0").unwrap(), query).0);
        let query2 = AffectedQuery {
            kind: PatternKind::MajorWildcard,
            version_min: Some(&min),
            version_max: None,
            explicit_list: &[],
            fixed_version: None,
        };
        assert!(is_affected(&normalize("17.11.0").unwrap(), query2).0);
        let query3 = AffectedQuery {
            kind: PatternKind::MajorWildcard,
            version_min: Some(&min),
            version_max: None,
            explicit_list: &[],
            fixed_version: None,
        };
        assert!(!is_affected(&normalize("16.12.5").unwrap(), query3).0);
    }

    #[test]
    fn fixed_version_overrides_match() {
        let min = normalize("17.10.3").unwrap();
        let fixed = normalize("17.10.7").unwrap();
        let query = |v: &Version| AffectedQuery {
            kind: PatternKind::OpenLater,
            version_min: Some(&min),
            version_max: None,
            explicit_list: &[],
            fixed_version: Some(&fixed),
        };
        assert!(!is_affected(&normalize("17.10.7").unwrap(), query(&fixed)).0);
        assert!(is_affected(&normalize("17.10.6").unwrap(), query(&fixed)).0);
    }

    #[test]
    fn unknown_pattern_never_matches() {
        let parsed = parse_expression("see advisory for details");
        assert_eq!(parsed.pattern_kind, Some(PatternKind::Unknown));
        let query = AffectedQuery {
            kind: PatternKind::Unknown,
            version_min: None,
            version_max: None,
            explicit_list: &[],
            fixed_version: None,
        };
        assert!(!is_affected(&normalize("1.0.0").unwrap(), query).0);
    }
}
