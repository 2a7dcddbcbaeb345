//! Summary statistics over latency samples.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Fixed summary of a set of duration samples.
///
/// All fields are zero when computed from no samples.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, Default)]
pub struct Timings {
    #[serde(with = "nanos")]
    pub avg: Duration,
    #[serde(with = "nanos")]
    pub p50: Duration,
    #[serde(with = "nanos")]
    pub p75: Duration,
    #[serde(with = "nanos")]
    pub p95: Duration,
    #[serde(with = "nanos")]
    pub p99: Duration,
    #[serde(with = "nanos")]
    pub p999: Duration,
    /// Mean of the slowest 5%.
    #[serde(rename = "l5p", with = "nanos")]
    pub long5p: Duration,
    /// Mean of the fastest 5%.
    #[serde(rename = "s5p", with = "nanos")]
    pub short5p: Duration,
    #[serde(with = "nanos")]
    pub max: Duration,
    #[serde(with = "nanos")]
    pub min: Duration,
    /// Population standard deviation.
    #[serde(rename = "sdev", with = "nanos")]
    pub std_dev: Duration,
    #[serde(with = "nanos")]
    pub range: Duration,
}

/// Collected duration samples.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct TimeDurations(Vec<Duration>);

impl TimeDurations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, d: Duration) {
        self.0.push(d);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Duration] {
        &self.0
    }

    /// Computes the summary. Sorts the samples ascending in place.
    pub fn measure(&mut self) -> Timings {
        let s = &mut self.0;
        if s.is_empty() {
            return Timings::default();
        }
        s.sort_unstable();

        let n = s.len();
        let min = s[0];
        let max = s[n - 1];
        let avg = mean(s);

        let long_from = round_index(n, 0.95);
        let long5p = match s.get(long_from..) {
            Some(tail) if tail.len() > 1 => mean(tail),
            _ => max,
        };
        let short_to = round_index(n, 0.05).min(n);
        let short5p = if short_to > 1 { mean(&s[..short_to]) } else { min };

        let avg_ns = avg.as_nanos() as f64;
        let variance = s
            .iter()
            .map(|d| {
                let diff = d.as_nanos() as f64 - avg_ns;
                diff * diff
            })
            .sum::<f64>()
            / n as f64;

        Timings {
            avg,
            p50: s[n / 2],
            p75: s[percentile_index(n, 0.75)],
            p95: s[percentile_index(n, 0.95)],
            p99: s[percentile_index(n, 0.99)],
            p999: s[percentile_index(n, 0.999)],
            long5p,
            short5p,
            max,
            min,
            std_dev: Duration::from_nanos(variance.sqrt() as u64),
            range: max - min,
        }
    }
}

impl From<Vec<Duration>> for TimeDurations {
    fn from(v: Vec<Duration>) -> Self {
        TimeDurations(v)
    }
}

impl FromIterator<Duration> for TimeDurations {
    fn from_iter<I: IntoIterator<Item = Duration>>(iter: I) -> Self {
        TimeDurations(iter.into_iter().collect())
    }
}

impl Extend<Duration> for TimeDurations {
    fn extend<I: IntoIterator<Item = Duration>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

/// `floor(n * q + 0.5)`
fn round_index(n: usize, q: f64) -> usize {
    (n as f64 * q + 0.5).floor() as usize
}

fn percentile_index(n: usize, q: f64) -> usize {
    round_index(n, q).saturating_sub(1).min(n - 1)
}

/// Integer mean; `s` must not be empty.
fn mean(s: &[Duration]) -> Duration {
    let sum: u128 = s.iter().map(Duration::as_nanos).sum();
    let avg = sum / s.len() as u128;
    Duration::from_nanos(u64::try_from(avg).unwrap_or(u64::MAX))
}

mod nanos {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_nanos)
    }
}
