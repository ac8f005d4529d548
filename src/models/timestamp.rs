//! Wire format for timestamps: `YYYY-MM-DDTHH:MM:SS.ffffffZ`, always UTC.

use chrono::{DateTime, Duration, DurationRound, NaiveDateTime, Utc};

use crate::error::AppError;

const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";
const PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

pub fn format(at: &DateTime<Utc>) -> String {
    at.format(WIRE_FORMAT).to_string()
}

pub fn parse(raw: &str) -> Result<DateTime<Utc>, AppError> {
    let invalid = || AppError::InvalidTimestamp(format!("{raw:?} is not YYYY-MM-DDTHH:MM:SS.ffffffZ"));

    let body = raw.strip_suffix('Z').ok_or_else(invalid)?;
    let (_, fraction) = body.rsplit_once('.').ok_or_else(invalid)?;
    if fraction.is_empty() || fraction.len() > 6 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let naive = NaiveDateTime::parse_from_str(body, PARSE_FORMAT).map_err(|_| invalid())?;
    Ok(naive.and_utc())
}

/// Current time at microsecond precision, so a stamp survives a trip
/// through the wire format unchanged.
pub fn now() -> DateTime<Utc> {
    let now = Utc::now();
    now.duration_trunc(Duration::microseconds(1)).unwrap_or(now)
}

pub fn serialize<S: serde::Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(at))
}

/// `#[serde(with = "timestamp::option")]` for optional wire timestamps.
pub mod option {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(at) => serializer.serialize_str(&super::format(at)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| super::parse(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Timelike, Utc};

    use super::{format, now, parse};

    #[test]
    fn formats_with_microseconds_and_trailing_z() {
        let at = Utc.with_ymd_and_hms(2021, 3, 28, 11, 35, 7).unwrap()
            + chrono::Duration::microseconds(42);
        assert_eq!(format(&at), "2021-03-28T11:35:07.000042Z");
    }

    #[test]
    fn parses_short_and_full_fractions() {
        let full = parse("2021-01-10T10:33:01.420000Z").unwrap();
        let short = parse("2021-01-10T10:33:01.42Z").unwrap();
        assert_eq!(full, short);
        assert_eq!(full.nanosecond(), 420_000_000);
    }

    #[test]
    fn rejects_malformed_timestamps() {
        for raw in [
            "",
            "2021-01-10T10:33:01Z",
            "2021-01-10T10:33:01.42",
            "2021-01-10T10:33:01.42+00:00",
            "2021-01-10 10:33:01.42Z",
            "2021-13-10T10:33:01.42Z",
            "2021-01-10T10:33:01.1234567Z",
            "yesterday",
        ] {
            assert!(parse(raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn now_round_trips_through_wire_format() {
        let stamp = now();
        assert_eq!(parse(&format(&stamp)).unwrap(), stamp);
    }
}
