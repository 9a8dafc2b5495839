//! Gap filling for time-series results.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDateTime;

use super::Granularity;

/// Fill gaps in a grouped time-series result.
///
/// When `fill` is set, every native bucket boundary in `[start, end)` is
/// materialized first, so the output has no holes regardless of data
/// sparsity. Buckets are then walked in chronological order and every series
/// key absent from a bucket is substituted: zero for per-bucket counts, the
/// most recently observed value (zero before the first observation) for
/// cumulative ones. Cumulative series therefore come out monotonic and
/// gap-free.
#[must_use]
pub fn fill_series(
    mut counts: BTreeMap<String, BTreeMap<String, i64>>,
    keys: &[String],
    start: NaiveDateTime,
    end: NaiveDateTime,
    granularity: Granularity,
    cumulative: bool,
    fill: bool,
) -> BTreeMap<String, BTreeMap<String, i64>> {
    if fill {
        let mut t = start;
        while t < end {
            counts
                .entry(t.format(granularity.bucket_format()).to_string())
                .or_default();
            t += granularity.step();
        }
    }

    // Bucket labels sort lexicographically in chronological order, so the
    // BTreeMap walk is the chronological walk.
    let mut carried: HashMap<&String, i64> = keys.iter().map(|key| (key, 0)).collect();
    for bucket in counts.values_mut() {
        for key in keys {
            if let Some(value) = bucket.get(key) {
                if cumulative {
                    carried.insert(key, *value);
                }
            } else {
                let substitute = if cumulative { carried[key] } else { 0 };
                bucket.insert(key.clone(), substitute);
            }
        }
    }

    counts
}
