//! Metric category selection mask.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Bit-field of metric categories, one bit per category.
///
/// Used only as a selection filter: the caller builds one per request and it
/// is never changed afterwards. On the wire it is the decimal mask.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Default)]
#[serde(transparent)]
pub struct MetricType(u32);

impl MetricType {
    pub const NONE: MetricType = MetricType(0);
    pub const SCANNER: MetricType = MetricType(1 << 0);
    pub const DISK: MetricType = MetricType(1 << 1);
    pub const OS: MetricType = MetricType(1 << 2);
    pub const BATCH_JOBS: MetricType = MetricType(1 << 3);
    pub const SITE_RESYNC: MetricType = MetricType(1 << 4);
    pub const NET: MetricType = MetricType(1 << 5);
    pub const MEM: MetricType = MetricType(1 << 6);
    pub const CPU: MetricType = MetricType(1 << 7);
    pub const RPC: MetricType = MetricType(1 << 8);
    pub const RUNTIME: MetricType = MetricType(1 << 9);
    pub const ALL: MetricType = MetricType((1 << 10) - 1);

    const NAMED: [(MetricType, &'static str); 10] = [
        (Self::SCANNER, "scanner"),
        (Self::DISK, "disk"),
        (Self::OS, "os"),
        (Self::BATCH_JOBS, "batch-jobs"),
        (Self::SITE_RESYNC, "site-resync"),
        (Self::NET, "net"),
        (Self::MEM, "mem"),
        (Self::CPU, "cpu"),
        (Self::RPC, "rpc"),
        (Self::RUNTIME, "runtime"),
    ];

    pub const fn from_bits(bits: u32) -> Self {
        MetricType(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True when every bit set in `x` is also set in `self`.
    pub const fn contains(self, x: MetricType) -> bool {
        self.0 & x.0 == x.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Name of a single-category mask; `None` for composite or unknown masks.
    pub fn name(self) -> Option<&'static str> {
        Self::NAMED
            .iter()
            .find(|(t, _)| *t == self)
            .map(|(_, name)| *name)
    }

    /// The defined single categories set in this mask, lowest bit first.
    pub fn iter(self) -> impl Iterator<Item = MetricType> {
        Self::NAMED
            .into_iter()
            .map(|(t, _)| t)
            .filter(move |t| self.contains(*t))
    }
}

impl BitOr for MetricType {
    type Output = MetricType;

    fn bitor(self, rhs: MetricType) -> MetricType {
        MetricType(self.0 | rhs.0)
    }
}

impl BitOrAssign for MetricType {
    fn bitor_assign(&mut self, rhs: MetricType) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = self.iter().filter_map(MetricType::name).collect();
        f.write_str(&names.join(","))
    }
}

/// Error for an unrecognized category list.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricTypeParseError {
    pub input: String,
}

impl fmt::Display for MetricTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown metric type '{}', expected a decimal mask or a comma list of: all, none, {}",
            self.input,
            MetricType::NAMED.map(|(_, n)| n).join(", ")
        )
    }
}

impl std::error::Error for MetricTypeParseError {}

impl FromStr for MetricType {
    type Err = MetricTypeParseError;

    /// Accepts a decimal mask (`"129"`) or category names (`"scanner,cpu"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
            return s
                .parse::<u32>()
                .map(MetricType::from_bits)
                .map_err(|_| MetricTypeParseError { input: s.into() });
        }

        let mut mask = MetricType::NONE;
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            mask |= match part.to_ascii_lowercase().as_str() {
                "all" => MetricType::ALL,
                "none" => MetricType::NONE,
                name => Self::NAMED
                    .iter()
                    .find(|(_, n)| *n == name)
                    .map(|(t, _)| *t)
                    .ok_or_else(|| MetricTypeParseError { input: part.into() })?,
            };
        }
        Ok(mask)
    }
}
