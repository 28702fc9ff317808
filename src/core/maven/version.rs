// ─── Versions ───
// Maven version ordering and range requirements.

use std::cmp::Ordering;
use std::fmt;

use crate::core::error::{StageError, StageResult};

fn split_version(raw: &str) -> (Vec<u64>, Option<&str>) {
    let boundary = raw
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(raw.len());
    let numeric = raw[..boundary]
        .split('.')
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| segment.parse::<u64>().ok())
        .collect();
    let qualifier = raw[boundary..].trim_start_matches(['-', '.', '_']);
    let qualifier = if qualifier.is_empty() {
        None
    } else {
        Some(qualifier)
    };
    (numeric, qualifier)
}

/// Compare two version strings.
///
/// Numeric segments are compared left to right with missing segments read
/// as zero. A qualified version (`3.3.2-rc1`, `3.3.2-SNAPSHOT`) sorts below
/// the plain release with the same numbers.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    // Deterministic tiebreaker for versions with identical parts.
    equivalence_cmp(a, b).then_with(|| a.cmp(b))
}

/// Ordering under which `3.3` and `3.3.0` are equal.
fn equivalence_cmp(a: &str, b: &str) -> Ordering {
    let (a_parts, a_qualifier) = split_version(a);
    let (b_parts, b_qualifier) = split_version(b);

    let max_len = a_parts.len().max(b_parts.len());
    for idx in 0..max_len {
        let a_val = a_parts.get(idx).copied().unwrap_or(0);
        let b_val = b_parts.get(idx).copied().unwrap_or(0);
        match a_val.cmp(&b_val) {
            Ordering::Equal => continue,
            non_eq => return non_eq,
        }
    }

    match (a_qualifier, b_qualifier) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => compare_qualifiers(x, y),
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum QualifierToken {
    Text(String),
    Number(u64),
}

/// `rc2` → `[Text("rc"), Number(2)]`; separators split tokens and are dropped.
fn qualifier_tokens(qualifier: &str) -> Vec<QualifierToken> {
    let mut tokens = Vec::new();
    let mut rest = qualifier;
    while let Some(first) = rest.chars().next() {
        if matches!(first, '-' | '.' | '_') {
            rest = &rest[1..];
            continue;
        }
        let digits = first.is_ascii_digit();
        let end = rest
            .find(|c: char| c.is_ascii_digit() != digits || matches!(c, '-' | '.' | '_'))
            .unwrap_or(rest.len());
        let (token, tail) = rest.split_at(end);
        tokens.push(match token.parse::<u64>() {
            Ok(n) if digits => QualifierToken::Number(n),
            _ => QualifierToken::Text(token.to_ascii_lowercase()),
        });
        rest = tail;
    }
    tokens
}

fn compare_qualifiers(a: &str, b: &str) -> Ordering {
    qualifier_tokens(a).cmp(&qualifier_tokens(b))
}

pub fn is_snapshot(version: &str) -> bool {
    version.ends_with("-SNAPSHOT")
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Bound {
    version: String,
    inclusive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Interval {
    lower: Option<Bound>,
    upper: Option<Bound>,
}

impl Interval {
    fn contains(&self, version: &str) -> bool {
        let above_lower = match &self.lower {
            None => true,
            Some(bound) => match equivalence_cmp(version, &bound.version) {
                Ordering::Greater => true,
                Ordering::Equal => bound.inclusive,
                Ordering::Less => false,
            },
        };
        let below_upper = match &self.upper {
            None => true,
            Some(bound) => match equivalence_cmp(version, &bound.version) {
                Ordering::Less => true,
                Ordering::Equal => bound.inclusive,
                Ordering::Greater => false,
            },
        };
        above_lower && below_upper
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Requirement {
    /// A bare version: exactly that version.
    Exact(String),
    /// Highest available release.
    Latest,
    /// Union of bracketed intervals.
    Intervals(Vec<Interval>),
}

/// A version requirement in Maven range notation.
///
/// `3.3.2`, `[3.3,3.4)`, `[3.3.1]`, `(,3.3.2]`, `[1,2),[3,)`, `latest`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    raw: String,
    requirement: Requirement,
}

impl VersionRange {
    pub fn parse(raw: &str) -> StageResult<Self> {
        let trimmed = raw.trim();
        let invalid = |why: &str| StageError::InvalidVersionRange(format!("{trimmed:?}: {why}"));

        if trimmed.is_empty() {
            return Err(invalid("empty"));
        }

        let requirement = if matches!(trimmed, "latest" | "latest.release" | "+") {
            Requirement::Latest
        } else if trimmed.starts_with('[') || trimmed.starts_with('(') {
            Requirement::Intervals(parse_intervals(trimmed).map_err(|why| invalid(&why))?)
        } else if trimmed.contains(['[', ']', '(', ')', ',', ' ']) {
            return Err(invalid("unexpected range delimiter"));
        } else {
            Requirement::Exact(trimmed.to_string())
        };

        Ok(Self {
            raw: trimmed.to_string(),
            requirement,
        })
    }

    pub fn is_exact(&self) -> bool {
        matches!(self.requirement, Requirement::Exact(_))
    }

    /// The single version named by an exact requirement.
    pub fn exact_version(&self) -> Option<&str> {
        match &self.requirement {
            Requirement::Exact(v) => Some(v),
            _ => None,
        }
    }

    pub fn contains(&self, version: &str) -> bool {
        match &self.requirement {
            Requirement::Exact(v) => v == version,
            Requirement::Latest => !is_snapshot(version),
            Requirement::Intervals(intervals) => {
                !is_snapshot(version) && intervals.iter().any(|i| i.contains(version))
            }
        }
    }

    /// Highest candidate satisfying this requirement.
    pub fn select<'a, I>(&self, candidates: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        candidates
            .into_iter()
            .filter(|candidate| self.contains(candidate))
            .max_by(|a, b| compare_versions(a, b))
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_intervals(raw: &str) -> Result<Vec<Interval>, String> {
    let mut intervals = Vec::new();
    let mut rest = raw;

    while !rest.is_empty() {
        let lower_inclusive = match rest.chars().next() {
            Some('[') => true,
            Some('(') => false,
            _ => return Err(format!("expected '[' or '(' at {rest:?}")),
        };
        let close = rest
            .find([']', ')'])
            .ok_or_else(|| "unterminated range".to_string())?;
        let upper_inclusive = rest.as_bytes()[close] == b']';
        let body = &rest[1..close];

        let interval = match body.split_once(',') {
            None => {
                let version = body.trim();
                if version.is_empty() || !lower_inclusive || !upper_inclusive {
                    return Err("single-version range must be written [v]".into());
                }
                let bound = Bound {
                    version: version.to_string(),
                    inclusive: true,
                };
                Interval {
                    lower: Some(bound.clone()),
                    upper: Some(bound),
                }
            }
            Some((low, high)) => {
                if high.contains(',') {
                    return Err("too many bounds".into());
                }
                let bound = |v: &str, inclusive: bool| {
                    let v = v.trim();
                    (!v.is_empty()).then(|| Bound {
                        version: v.to_string(),
                        inclusive,
                    })
                };
                let lower = bound(low, lower_inclusive);
                let upper = bound(high, upper_inclusive);
                if let (Some(l), Some(u)) = (&lower, &upper) {
                    if equivalence_cmp(&l.version, &u.version) == Ordering::Greater {
                        return Err("lower bound above upper bound".into());
                    }
                }
                if lower.is_none() && lower_inclusive {
                    return Err("unbounded lower end must use '('".into());
                }
                if upper.is_none() && upper_inclusive {
                    return Err("unbounded upper end must use ')'".into());
                }
                Interval { lower, upper }
            }
        };
        intervals.push(interval);

        rest = rest[close + 1..].trim_start();
        if let Some(next) = rest.strip_prefix(',') {
            rest = next.trim_start();
            if rest.is_empty() {
                return Err("trailing ','".into());
            }
        } else if !rest.is_empty() {
            return Err(format!("unexpected {rest:?} after range"));
        }
    }

    Ok(intervals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ordering_pads_missing_segments() {
        assert_eq!(compare_versions("3.3.0.1", "3.3"), Ordering::Greater);
        assert_eq!(compare_versions("3.3.10", "3.3.2"), Ordering::Greater);
        assert_eq!(compare_versions("3.2.9", "3.3"), Ordering::Less);
    }

    #[test]
    fn qualified_versions_sort_below_releases() {
        assert_eq!(compare_versions("3.3.2-rc1", "3.3.2"), Ordering::Less);
        assert_eq!(compare_versions("3.3.2-SNAPSHOT", "3.3.1"), Ordering::Greater);
    }

    #[test]
    fn qualifier_digits_compare_numerically() {
        assert_eq!(compare_versions("3.3.2-rc10", "3.3.2-rc2"), Ordering::Greater);
        assert_eq!(compare_versions("3.3.2-beta", "3.3.2-rc1"), Ordering::Less);
        assert_eq!(compare_versions("3.3.2-RC1", "3.3.2-rc1.1"), Ordering::Less);
        assert_eq!(equivalence_cmp("3.3.2-RC2", "3.3.2-rc2"), Ordering::Equal);

        let range = VersionRange::parse("[3.3,3.4)").unwrap();
        let picked = range.select(["3.3.2-rc2", "3.3.2-rc10", "3.3.1"]);
        assert_eq!(picked, Some("3.3.2-rc10"));
    }

    #[test]
    fn exact_requirement_matches_only_itself() {
        let range = VersionRange::parse("3.3.2").unwrap();
        assert!(range.is_exact());
        assert!(range.contains("3.3.2"));
        assert!(!range.contains("3.3.3"));
    }

    #[test]
    fn half_open_interval() {
        let range = VersionRange::parse("[3.3,3.4)").unwrap();
        assert!(range.contains("3.3"));
        assert!(range.contains("3.3.2"));
        assert!(!range.contains("3.4.0"));
        assert!(!range.contains("3.2.3"));

        let inclusive = VersionRange::parse("[3.3,3.4]").unwrap();
        assert!(inclusive.contains("3.4.0"));
    }

    #[test]
    fn union_of_intervals_and_unbounded_ends() {
        let range = VersionRange::parse("(,1.0],[2.0,)").unwrap();
        assert!(range.contains("0.9"));
        assert!(range.contains("1.0"));
        assert!(!range.contains("1.5"));
        assert!(range.contains("7"));
    }

    #[test]
    fn select_picks_highest_release_and_skips_snapshots() {
        let range = VersionRange::parse("[3.2,)").unwrap();
        let available = ["3.2.3", "3.3.2", "3.3.1", "3.4.0-SNAPSHOT"];
        assert_eq!(range.select(available), Some("3.3.2"));

        let latest = VersionRange::parse("latest").unwrap();
        assert_eq!(latest.select(available), Some("3.3.2"));

        let none = VersionRange::parse("[4,5)").unwrap();
        assert_eq!(none.select(available), None);
    }

    #[test]
    fn rejects_malformed_ranges() {
        for raw in ["", "[3.3", "[3.4,3.3]", "[,1)", "(3.3)", "1.0,2.0", "[1,2),"] {
            assert!(VersionRange::parse(raw).is_err(), "{raw:?} should be rejected");
        }
    }
}
