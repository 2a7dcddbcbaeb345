//! Latency sample input for the `timings` command.
//!
//! One sample per line, either `<duration>` or `<host> <duration>`. A
//! duration is written with a unit (`12ms`, `1.5s`) or as bare nanoseconds.
//! Blank lines and lines starting with `#` are skipped.

use std::collections::BTreeMap;
use std::time::Duration;

use rtmetrics_core::util::{DurationParseError, parse_duration};
use rtmetrics_core::{NodeLatency, TimeDurations};

/// A sample line that could not be read.
#[derive(Debug)]
pub struct SampleError {
    pub line: usize,
    pub source: DurationParseError,
}

impl std::fmt::Display for SampleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.source)
    }
}

impl std::error::Error for SampleError {}

/// Samples grouped by host; unlabelled samples are kept apart.
#[derive(Debug, Default)]
pub struct Samples {
    pub unlabelled: TimeDurations,
    pub by_host: BTreeMap<String, Vec<Duration>>,
}

impl Samples {
    pub fn parse(text: &str) -> Result<Self, SampleError> {
        let mut samples = Samples::default();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (host, value) = match line.split_once(char::is_whitespace) {
                Some((host, value)) => (Some(host), value.trim()),
                None => (None, line),
            };
            let d = parse_sample(value).map_err(|source| SampleError {
                line: idx + 1,
                source,
            })?;
            match host {
                Some(host) => samples.by_host.entry(host.to_string()).or_default().push(d),
                None => samples.unlabelled.push(d),
            }
        }
        Ok(samples)
    }

    /// One latency summary per host, sorted by address.
    pub fn per_host(&self) -> Vec<NodeLatency> {
        self.by_host
            .iter()
            .map(|(host, durations)| NodeLatency::measure(host.clone(), durations.iter().copied()))
            .collect()
    }
}

fn parse_sample(value: &str) -> Result<Duration, DurationParseError> {
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        return value
            .parse::<u64>()
            .map(Duration::from_nanos)
            .map_err(|e| DurationParseError {
                input: value.to_string(),
                message: e.to_string(),
            });
    }
    parse_duration(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_units_and_bare_nanos() {
        let s = Samples::parse("12ms\n1.5s\n\n# warmup excluded\n2500\n").unwrap();
        assert_eq!(
            s.unlabelled.as_slice(),
            &[
                Duration::from_millis(12),
                Duration::from_millis(1500),
                Duration::from_nanos(2500)
            ]
        );
        assert!(s.by_host.is_empty());
    }

    #[test]
    fn groups_by_host() {
        let s = Samples::parse("node2 10ms\nnode1 4ms\nnode2   30ms\n").unwrap();
        let latencies = s.per_host();
        assert_eq!(latencies.len(), 2);
        assert_eq!(latencies[0].node.addr, "node1");
        assert_eq!(latencies[1].timings.avg, Duration::from_millis(20));
        assert_eq!(latencies[1].timings.max, Duration::from_millis(30));
    }

    #[test]
    fn reports_bad_line_number() {
        let err = Samples::parse("1ms\n2ms\nfast\n").unwrap_err();
        assert_eq!(err.line, 3);
        assert!(err.to_string().starts_with("line 3:"));
    }
}
