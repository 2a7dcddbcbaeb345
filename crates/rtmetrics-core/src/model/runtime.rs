//! Language runtime counters reported by each server process.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::time::null_as_default;
use crate::merge::{Merge, sum_by_key};

/// Distribution of a runtime metric.
///
/// `buckets` holds the bucket boundaries, `counts[i]` the samples falling in
/// `[buckets[i], buckets[i + 1])`.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct Float64Histogram {
    #[serde(rename = "Counts", default, deserialize_with = "null_as_default")]
    pub counts: Vec<u64>,
    #[serde(rename = "Buckets", default, deserialize_with = "null_as_default")]
    pub buckets: Vec<f64>,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(default)]
pub struct RuntimeMetrics {
    #[serde(
        rename = "uintMetrics",
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub uint_metrics: BTreeMap<String, u64>,

    #[serde(
        rename = "floatMetrics",
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub float_metrics: BTreeMap<String, f64>,

    #[serde(
        rename = "histMetrics",
        skip_serializing_if = "BTreeMap::is_empty",
        deserialize_with = "null_as_default"
    )]
    pub hist_metrics: BTreeMap<String, Float64Histogram>,

    /// Number of snapshots merged into this value.
    pub n: i64,
}

impl Merge for RuntimeMetrics {
    fn merge(&mut self, other: &Self) {
        sum_by_key(&mut self.uint_metrics, &other.uint_metrics);
        sum_by_key(&mut self.float_metrics, &other.float_metrics);

        for (name, hist) in &other.hist_metrics {
            let Some(existing) = self
                .hist_metrics
                .get_mut(name)
                .filter(|h| !h.buckets.is_empty())
            else {
                self.hist_metrics.insert(name.clone(), hist.clone());
                continue;
            };
            // Runtime histograms share their layout; anything else cannot be combined.
            if existing.buckets.len() == hist.buckets.len() {
                for (count, add) in existing.counts.iter_mut().zip(&hist.counts) {
                    *count += add;
                }
            }
        }

        self.n += other.n;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hist(counts: &[u64], buckets: &[f64]) -> Float64Histogram {
        Float64Histogram {
            counts: counts.to_vec(),
            buckets: buckets.to_vec(),
        }
    }

    fn runtime(gc: u64, heap: f64, pauses: Float64Histogram) -> RuntimeMetrics {
        RuntimeMetrics {
            uint_metrics: BTreeMap::from([("/gc/cycles/total:gc-cycles".to_string(), gc)]),
            float_metrics: BTreeMap::from([("/gc/heap/goal:bytes".to_string(), heap)]),
            hist_metrics: BTreeMap::from([("/gc/pauses:seconds".to_string(), pauses)]),
            n: 1,
        }
    }

    #[test]
    fn scalars_sum_and_histograms_add_bucketwise() {
        let mut agg = runtime(10, 1.5, hist(&[1, 2, 3], &[0.0, 1.0, 2.0, 3.0]));
        agg.merge(&runtime(5, 0.5, hist(&[4, 0, 1], &[0.0, 1.0, 2.0, 3.0])));

        assert_eq!(agg.uint_metrics["/gc/cycles/total:gc-cycles"], 15);
        assert_eq!(agg.float_metrics["/gc/heap/goal:bytes"], 2.0);
        assert_eq!(agg.hist_metrics["/gc/pauses:seconds"].counts, vec![5, 2, 4]);
        assert_eq!(agg.n, 2);
    }

    #[test]
    fn mismatched_bucket_layout_is_left_alone() {
        let mut agg = runtime(1, 1.0, hist(&[1, 1], &[0.0, 1.0, 2.0]));
        agg.merge(&runtime(1, 1.0, hist(&[9, 9, 9], &[0.0, 1.0, 2.0, 3.0])));
        assert_eq!(agg.hist_metrics["/gc/pauses:seconds"].counts, vec![1, 1]);
    }

    #[test]
    fn merging_default_is_a_no_op() {
        let mut agg = runtime(4, 2.5, hist(&[1, 2], &[0.0, 1.0, 2.0]));
        agg.merge(&RuntimeMetrics::default());
        assert_eq!(agg, runtime(4, 2.5, hist(&[1, 2], &[0.0, 1.0, 2.0])));
    }

    #[test]
    fn missing_histogram_is_inserted() {
        let mut agg = RuntimeMetrics::default();
        let other = runtime(3, 0.25, hist(&[2], &[0.0, 1.0]));
        agg.merge(&other);
        assert_eq!(agg, other);
    }

    #[test]
    fn wire_names() {
        let json = r#"{"uintMetrics":{"a":1},"histMetrics":{"h":{"Counts":[1,2],"Buckets":[0,1,2]}},"n":1}"#;
        let m: RuntimeMetrics = serde_json::from_str(json).unwrap();
        assert_eq!(m.uint_metrics["a"], 1);
        assert_eq!(m.hist_metrics["h"].counts, vec![1, 2]);
        assert!(m.float_metrics.is_empty());
    }
}
