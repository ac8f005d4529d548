use std::fmt;
use std::str::FromStr;

use chrono::NaiveTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const CLOCK_FORMAT: &str = "%H:%M";

/// A half-open time-of-day window `[start, end)`, written as `"HH:MM-HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeInterval {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeInterval {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        overlaps(self.start, self.end, other.start, other.end)
    }
}

/// Strict half-open intersection test. Touching endpoints do not overlap.
pub fn overlaps(start1: NaiveTime, end1: NaiveTime, start2: NaiveTime, end2: NaiveTime) -> bool {
    start1 < end2 && end1 > start2
}

/// True when any window of `a` overlaps any window of `b`.
pub fn any_overlap(a: &[TimeInterval], b: &[TimeInterval]) -> bool {
    a.iter().any(|left| b.iter().any(|right| left.overlaps(right)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalParseError(String);

impl fmt::Display for IntervalParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid time interval {:?}, expected HH:MM-HH:MM", self.0)
    }
}

impl std::error::Error for IntervalParseError {}

impl FromStr for TimeInterval {
    type Err = IntervalParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || IntervalParseError(raw.to_string());

        let (start, end) = raw.split_once('-').ok_or_else(invalid)?;
        let start = parse_clock(start).ok_or_else(invalid)?;
        let end = parse_clock(end).ok_or_else(invalid)?;

        Ok(Self { start, end })
    }
}

/// Parses exactly `HH:MM`; chrono alone would also take `9:00`.
fn parse_clock(raw: &str) -> Option<NaiveTime> {
    let bytes = raw.as_bytes();
    let well_formed = bytes.len() == 5
        && bytes[2] == b':'
        && [0, 1, 3, 4].iter().all(|&i| bytes[i].is_ascii_digit());
    if !well_formed {
        return None;
    }
    NaiveTime::parse_from_str(raw, CLOCK_FORMAT).ok()
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format(CLOCK_FORMAT),
            self.end.format(CLOCK_FORMAT)
        )
    }
}

impl Serialize for TimeInterval {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeInterval {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
