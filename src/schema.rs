//! Archive-spec parsing (C2) and validation (C3).
//!
//! Textual archive specs look like `10s:1h` (10-second precision, 1 hour
//! of retention) or `1m:60` (1-minute precision, 60 points of retention).
//! See spec §4.2 for the exact grammar.

use regex::Regex;
use std::sync::OnceLock;

use super::error::{Error, Result};

/// A parsed, not-yet-validated archive request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveSpec {
    pub seconds_per_point: u32,
    pub points: u32,
}

/// A validated archive, in canonical (finest-to-coarsest) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub precision: u32,
    pub points: u32,
}

impl RetentionPolicy {
    pub fn retention(&self) -> u64 {
        self.precision as u64 * self.points as u64
    }

    pub fn size_on_disk(&self) -> u64 {
        super::point::POINT_SIZE as u64 * self.points as u64
    }
}

/// The validated, canonically ordered set of archives for one file.
#[derive(Debug, Clone)]
pub struct Schema {
    pub retention_policies: Vec<RetentionPolicy>,
}

impl Schema {
    pub fn new_from_retention_specs<S: AsRef<str>>(specs: &[S]) -> Result<Schema> {
        let parsed = parse_archive_specs(specs)?;
        let policies = validate(parsed)?;
        Ok(Schema {
            retention_policies: policies,
        })
    }

    pub fn max_retention(&self) -> u64 {
        self.retention_policies
            .iter()
            .map(|p| p.retention())
            .max()
            .unwrap_or(0)
    }

    /// Total bytes occupied by all archives' point rings (excludes header
    /// and archive-descriptor directory; see `file::header::archives_start`).
    pub fn archives_size_on_disk(&self) -> u64 {
        self.retention_policies.iter().map(|p| p.size_on_disk()).sum()
    }
}

// Unit words and their multiplier in seconds. `y` is 52*7*365 days by
// construction, not a calendar year (spec §4.2) -- preserved bit-exactly.
const UNITS: &[(&str, u64)] = &[
    ("seconds", 1),
    ("minutes", 60),
    ("hours", 3600),
    ("days", 86400),
    ("weeks", 604_800),
    ("years", 604_800 * 365),
];

fn unit_multiplier(unit: &str) -> Option<u64> {
    if unit.is_empty() {
        return None;
    }
    UNITS
        .iter()
        .find(|(word, _)| word.starts_with(unit))
        .map(|(_, mult)| *mult)
}

fn side_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)([A-Za-z]*)$").unwrap())
}

/// Parses one side of a `PRECISION:RETENTION` token: a number followed by
/// an optional unit. Returns `(numeric, multiplier_if_unit_present)`.
fn parse_side(side: &str) -> Result<(u64, Option<u64>)> {
    let caps = side_regex()
        .captures(side)
        .ok_or_else(|| Error::Config(format!("unparseable number: {side:?}")))?;
    let numeric: u64 = caps[1]
        .parse()
        .map_err(|_| Error::Config(format!("unparseable number: {side:?}")))?;
    let unit_str = &caps[2];
    if unit_str.is_empty() {
        Ok((numeric, None))
    } else {
        let mult = unit_multiplier(unit_str)
            .ok_or_else(|| Error::Config(format!("unknown unit: {unit_str:?}")))?;
        Ok((numeric, Some(mult)))
    }
}

fn parse_one(token: &str) -> Result<ArchiveSpec> {
    let (left, right) = token
        .split_once(':')
        .ok_or_else(|| Error::Config(format!("missing colon in archive spec: {token:?}")))?;

    let (precision_num, precision_unit) = parse_side(left)?;
    let seconds_per_point = precision_num * precision_unit.unwrap_or(1);
    if seconds_per_point == 0 {
        return Err(Error::Config(format!("zero precision in archive spec: {token:?}")));
    }

    let (retention_num, retention_unit) = parse_side(right)?;
    let points = match retention_unit {
        // unit given: the numeric is seconds of retention
        Some(mult) => (retention_num * mult) / seconds_per_point as u64,
        // no unit: the numeric is already the point count
        None => retention_num,
    };
    if points == 0 {
        return Err(Error::Config(format!("zero points in archive spec: {token:?}")));
    }

    Ok(ArchiveSpec {
        seconds_per_point: seconds_per_point as u32,
        points: points as u32,
    })
}

pub fn parse_archive_specs<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<ArchiveSpec>> {
    if tokens.is_empty() {
        return Err(Error::Config("no archive specs given".to_string()));
    }
    tokens.iter().map(|t| parse_one(t.as_ref())).collect()
}

/// Enforces V1-V4 (spec §3) over an ascending-sorted archive list, and
/// returns the canonical `RetentionPolicy` sequence.
fn validate(mut specs: Vec<ArchiveSpec>) -> Result<Vec<RetentionPolicy>> {
    specs.sort_by_key(|s| s.seconds_per_point);

    for pair in specs.windows(2) {
        let (a, b) = (pair[0], pair[1]);

        if !(a.seconds_per_point < b.seconds_per_point) {
            return Err(Error::Config(format!(
                "a {}-second archive cannot be followed by a {}-second archive \
                 (archives must be ordered finest to coarsest with no duplicate precision)",
                a.seconds_per_point, b.seconds_per_point
            )));
        }

        if b.seconds_per_point % a.seconds_per_point != 0 {
            return Err(Error::Config(format!(
                "archive precisions must evenly divide: {} does not divide {}",
                a.seconds_per_point, b.seconds_per_point
            )));
        }

        let a_retention = a.seconds_per_point as u64 * a.points as u64;
        let b_retention = b.seconds_per_point as u64 * b.points as u64;
        if a_retention > b_retention {
            return Err(Error::Config(format!(
                "finer archive must not have greater retention than coarser archive: {a_retention}s > {b_retention}s"
            )));
        }

        let k = b.seconds_per_point / a.seconds_per_point;
        if a.points < k {
            return Err(Error::Config(format!(
                "archive of {} points cannot be consolidated into chunks of {k} points",
                a.points
            )));
        }
    }

    Ok(specs
        .into_iter()
        .map(|s| RetentionPolicy {
            precision: s.seconds_per_point,
            points: s.points,
        })
        .collect())
}
