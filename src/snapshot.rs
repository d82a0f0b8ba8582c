//! Snapshot file naming.
//!
//! The remote source publishes one compressed JSON snapshot every five seconds of a day, named by
//! its UTC time of day, e.g. `000005Z.json.gz`. Raw snapshots are staged in object storage under
//! a per-day partition and prepared snapshots are written locally with the `.gz` suffix removed.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use time::{Date, Month};

/// Seconds between consecutive snapshots.
pub const SNAPSHOT_INTERVAL_SECONDS: u32 = 5;

/// Number of snapshots published per day.
pub const SNAPSHOTS_PER_DAY: usize = (24 * 60 * 60 / SNAPSHOT_INTERVAL_SECONDS) as usize;

/// Suffix of a raw snapshot file.
pub const SNAPSHOT_SUFFIX: &str = ".json.gz";

/// Suffix of a prepared snapshot file.
pub const PREPARED_SUFFIX: &str = ".json";

/// Return the snapshot filename published at a given second of the day.
fn snapshot_filename(second_of_day: u32) -> String {
    let hour = second_of_day / 3600;
    let minute = (second_of_day % 3600) / 60;
    let second = second_of_day % 60;
    format!("{hour:02}{minute:02}{second:02}Z{SNAPSHOT_SUFFIX}")
}

/// Returns every snapshot filename of a day in ascending time order.
pub fn snapshot_filenames() -> impl Iterator<Item = String> {
    (0..SNAPSHOTS_PER_DAY as u32).map(|index| snapshot_filename(index * SNAPSHOT_INTERVAL_SECONDS))
}

/// Returns the first `limit` snapshot filenames of a day.
///
/// If `limit` exceeds [SNAPSHOTS_PER_DAY] all filenames are returned.
pub fn first_snapshot_filenames(limit: usize) -> Vec<String> {
    snapshot_filenames().take(limit).collect()
}

/// Returns the name of the prepared file corresponding to a raw snapshot object key.
///
/// Any leading key prefix is removed and the `.json.gz` suffix replaced with `.json`.
/// Returns `None` if the key has no basename, e.g. a directory marker.
pub fn prepared_filename(key: &str) -> Option<String> {
    let basename = key.rsplit('/').next().unwrap_or(key);
    if basename.is_empty() {
        return None;
    }
    Some(basename.replace(SNAPSHOT_SUFFIX, PREPARED_SUFFIX))
}

/// Error parsing a [SnapshotDay].
#[derive(Debug, Error, PartialEq)]
#[error("invalid snapshot day {0:?}, expected YYYYMMDD")]
pub struct ParseSnapshotDayError(String);

/// The day whose snapshots are ingested.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SnapshotDay {
    year: u16,
    month: u8,
    day: u8,
}

impl SnapshotDay {
    /// Return a new SnapshotDay, or `None` if the date does not exist.
    pub fn new(year: u16, month: u8, day: u8) -> Option<Self> {
        let calendar_month = Month::try_from(month).ok()?;
        Date::from_calendar_date(year.into(), calendar_month, day).ok()?;
        Some(SnapshotDay { year, month, day })
    }

    /// Path of the day's snapshots relative to the source URL, e.g. `2023/11/01`.
    pub fn url_path(&self) -> String {
        format!("{:04}/{:02}/{:02}", self.year, self.month, self.day)
    }

    /// Object store key prefix for the day's raw snapshots, e.g. `raw/day=20231101/`.
    pub fn raw_prefix(&self) -> String {
        format!("raw/day={self}/")
    }

    /// Object store key of a raw snapshot.
    pub fn raw_key(&self, filename: &str) -> String {
        format!("{}{filename}", self.raw_prefix())
    }
}

impl Default for SnapshotDay {
    /// 1st November 2023.
    fn default() -> Self {
        SnapshotDay {
            year: 2023,
            month: 11,
            day: 1,
        }
    }
}

impl fmt::Display for SnapshotDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}{:02}", self.year, self.month, self.day)
    }
}

impl FromStr for SnapshotDay {
    type Err = ParseSnapshotDayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let error = || ParseSnapshotDayError(s.to_string());
        if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(error());
        }
        let year = s[0..4].parse().map_err(|_| error())?;
        let month = s[4..6].parse().map_err(|_| error())?;
        let day = s[6..8].parse().map_err(|_| error())?;
        SnapshotDay::new(year, month, day).ok_or_else(error)
    }
}
