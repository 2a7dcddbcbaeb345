//! Collection timestamps.

use std::fmt;

use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Wire form of the zero timestamp.
const ZERO_TIME: &str = "0001-01-01T00:00:00Z";

/// Wall-clock instant at which a snapshot was collected.
///
/// The zero value means "never collected". It orders before every real
/// instant, so latest-wins merges compare timestamps directly.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(Option<DateTime<Utc>>);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(None);

    pub fn new(at: DateTime<Utc>) -> Self {
        Self(Some(at))
    }

    pub fn now() -> Self {
        Self(Some(Utc::now()))
    }

    /// Builds a timestamp from Unix seconds; out-of-range input yields zero.
    pub fn from_unix(secs: i64) -> Self {
        Self(DateTime::from_timestamp(secs, 0))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_none()
    }

    pub fn get(&self) -> Option<DateTime<Utc>> {
        self.0
    }

    /// Moves `self` forward to `other` if `other` is later.
    pub fn keep_latest(&mut self, other: Timestamp) {
        if *self < other {
            *self = other;
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(at) => f.write_str(&at.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            None => f.write_str(ZERO_TIME),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let Some(text) = Option::<String>::deserialize(deserializer)? else {
            return Ok(Timestamp::ZERO);
        };
        let at = DateTime::parse_from_rfc3339(&text)
            .map_err(serde::de::Error::custom)?
            .with_timezone(&Utc);
        // Producers encode "unset" as the first instant of year 1.
        if at.year() <= 1 {
            return Ok(Timestamp::ZERO);
        }
        Ok(Timestamp(Some(at)))
    }
}

/// Reads JSON `null` as the type's default (producers emit `null` for empty
/// lists and maps).
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn is_zero_u64(v: &u64) -> bool {
    *v == 0
}
