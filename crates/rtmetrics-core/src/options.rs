//! Request options for a metrics stream.

use std::time::Duration;

use url::form_urlencoded;

use crate::metric_type::MetricType;
use crate::util::{DurationParseError, format_duration, parse_duration};

/// Admin API path serving the metrics stream.
pub const METRICS_PATH: &str = "/minio/admin/v3/metrics";

/// Smallest sampling interval the server honors.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// What to collect and how often.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetricsOptions {
    /// Categories to collect.
    pub types: MetricType,
    /// Number of samples to send; 0 streams until the client disconnects.
    pub n: u32,
    /// Minimum time between samples.
    pub interval: Duration,
    /// Only collect from these nodes; empty means all.
    pub hosts: Vec<String>,
    /// Include a per-node breakdown next to the aggregate.
    pub by_host: bool,
    /// Only collect from these drives; empty means all.
    pub disks: Vec<String>,
    /// Include a per-drive breakdown.
    pub by_disk: bool,
    /// Restrict batch job metrics to one job.
    pub by_job_id: String,
    /// Restrict site resync metrics to one deployment.
    pub by_dep_id: String,
}

impl Default for MetricsOptions {
    fn default() -> Self {
        Self {
            types: MetricType::ALL,
            n: 0,
            interval: MIN_INTERVAL,
            hosts: Vec::new(),
            by_host: false,
            disks: Vec::new(),
            by_disk: false,
            by_job_id: String::new(),
            by_dep_id: String::new(),
        }
    }
}

/// Error for a malformed query parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionsError {
    InvalidNumber { key: &'static str, value: String },
    InvalidBool { key: &'static str, value: String },
    InvalidInterval(DurationParseError),
}

impl std::fmt::Display for OptionsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionsError::InvalidNumber { key, value } => {
                write!(f, "invalid value '{}' for '{}': expected a number", value, key)
            }
            OptionsError::InvalidBool { key, value } => {
                write!(f, "invalid value '{}' for '{}': expected true or false", value, key)
            }
            OptionsError::InvalidInterval(e) => write!(f, "invalid interval: {}", e),
        }
    }
}

impl std::error::Error for OptionsError {}

impl From<DurationParseError> for OptionsError {
    fn from(e: DurationParseError) -> Self {
        OptionsError::InvalidInterval(e)
    }
}

impl MetricsOptions {
    /// Query parameters for the stream request, in a stable order.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("types", self.types.bits().to_string()),
            ("n", self.n.to_string()),
            ("interval", format_duration(self.interval)),
        ];
        if !self.hosts.is_empty() {
            pairs.push(("hosts", self.hosts.join(",")));
        }
        if self.by_host {
            pairs.push(("by-host", "true".to_string()));
        }
        if !self.disks.is_empty() {
            pairs.push(("disks", self.disks.join(",")));
        }
        if self.by_disk {
            pairs.push(("by-disk", "true".to_string()));
        }
        if !self.by_job_id.is_empty() {
            pairs.push(("by-jobID", self.by_job_id.clone()));
        }
        if !self.by_dep_id.is_empty() {
            pairs.push(("by-depID", self.by_dep_id.clone()));
        }
        pairs
    }

    /// Form-encoded query string (without the leading `?`).
    pub fn query_string(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query_pairs())
            .finish()
    }

    /// Decodes a raw query string, with or without the leading `?`.
    pub fn parse_query(query: &str) -> Result<Self, OptionsError> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs: Vec<(String, String)> =
            form_urlencoded::parse(query.as_bytes()).into_owned().collect();
        Self::from_query(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    /// Rebuilds options from decoded query pairs, as the server does.
    ///
    /// Unknown keys are ignored. Missing keys keep their defaults. Boolean
    /// flags take `true` or `false` in any case; an empty value is `false`.
    pub fn from_query<'a, I>(pairs: I) -> Result<Self, OptionsError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut opts = MetricsOptions::default();
        for (key, value) in pairs {
            match key {
                "types" => {
                    let bits = value.parse::<u32>().map_err(|_| OptionsError::InvalidNumber {
                        key: "types",
                        value: value.to_string(),
                    })?;
                    opts.types = MetricType::from_bits(bits);
                }
                "n" => {
                    opts.n = value.parse().map_err(|_| OptionsError::InvalidNumber {
                        key: "n",
                        value: value.to_string(),
                    })?;
                }
                "interval" => opts.interval = parse_duration(value)?,
                "hosts" => opts.hosts = split_list(value),
                "disks" => opts.disks = split_list(value),
                "by-host" => opts.by_host = parse_bool("by-host", value)?,
                "by-disk" => opts.by_disk = parse_bool("by-disk", value)?,
                "by-jobID" => opts.by_job_id = value.to_string(),
                "by-depID" => opts.by_dep_id = value.to_string(),
                _ => {}
            }
        }
        Ok(opts)
    }

    /// Interval the server will actually use: rounded up to whole seconds,
    /// never below one second.
    pub fn effective_interval(&self) -> Duration {
        let mut secs = self.interval.as_secs();
        if self.interval.subsec_nanos() > 0 {
            secs += 1;
        }
        Duration::from_secs(secs).max(MIN_INTERVAL)
    }

    /// Sample cap, `None` for an unbounded stream.
    pub fn sample_limit(&self) -> Option<u32> {
        (self.n > 0).then_some(self.n)
    }

    pub fn wants_host(&self, host: &str) -> bool {
        self.hosts.is_empty() || self.hosts.iter().any(|h| h == host)
    }

    pub fn wants_disk(&self, disk: &str) -> bool {
        self.disks.is_empty() || self.disks.iter().any(|d| d == disk)
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, OptionsError> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.is_empty() || value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(OptionsError::InvalidBool {
            key,
            value: value.to_string(),
        })
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
