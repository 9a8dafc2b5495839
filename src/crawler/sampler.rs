//! Weighted review sampling.
//!
//! The review phase re-fetches a bounded random slice of the known id range,
//! biased toward recently posted messages so fresh content gets repaired
//! sooner. The bias is an exponential decay: a brand-new message carries
//! `RECENT_MULTIPLIER` extra weight, halving every `RECENT_HALF_LIFE_HOURS`,
//! and every id keeps a floor weight of 1 so old and never-seen ids stay
//! reachable.

use std::collections::HashMap;

use anyhow::Result;
use chrono::NaiveDateTime;
use rand::seq::index;
use rand::Rng;

use crate::constants::{RECENT_HALF_LIFE_HOURS, RECENT_MULTIPLIER, REVIEW_CANDIDATE_FACTOR};
use crate::db::{self, Database};

/// Draw up to `size` distinct message ids from `[floor_mid, max_mid]`,
/// recency-weighted by the stored post times.
///
/// # Errors
///
/// Returns an error if the post-time lookup fails.
pub async fn draw_review_sample(
    db: &Database,
    floor_mid: i64,
    max_mid: i64,
    size: usize,
    now: NaiveDateTime,
) -> Result<Vec<i64>> {
    // The rng is scoped to keep it off await points (ThreadRng is not Send).
    let candidates = {
        let mut rng = rand::thread_rng();
        uniform_candidates(
            floor_mid,
            max_mid,
            size.saturating_mul(REVIEW_CANDIDATE_FACTOR),
            &mut rng,
        )
    };

    let times = db::posted_times(db.pool(), &candidates).await?;

    let mut rng = rand::thread_rng();
    Ok(select_weighted(&candidates, &times, size, now, &mut rng))
}

/// Distinct ids drawn uniformly from `[floor, max]`, at most `pool` of them.
fn uniform_candidates<R: Rng>(floor: i64, max: i64, pool: usize, rng: &mut R) -> Vec<i64> {
    if max < floor {
        return Vec::new();
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let population = (max - floor + 1) as usize;
    let pool = pool.min(population);

    index::sample(rng, population, pool)
        .into_iter()
        .map(|i| floor + i as i64)
        .collect()
}

/// Weighted bottom-N selection over the candidate pool.
///
/// Each candidate gets the priority key `exp_draw / weight` (an exponential
/// variate scaled down by its weight); taking the N smallest keys selects
/// each id with probability proportional to its weight, without ever touching
/// ids outside the pool.
pub fn select_weighted<R: Rng>(
    candidates: &[i64],
    times: &HashMap<i64, NaiveDateTime>,
    size: usize,
    now: NaiveDateTime,
    rng: &mut R,
) -> Vec<i64> {
    let mut keyed: Vec<(f64, i64)> = candidates
        .iter()
        .map(|&mid| {
            let weight = recency_weight(times.get(&mid).copied(), now);
            let uniform: f64 = rng.gen_range(f64::EPSILON..1.0);
            (-uniform.ln() / weight, mid)
        })
        .collect();

    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    keyed.truncate(size);
    keyed.into_iter().map(|(_, mid)| mid).collect()
}

/// Sampling weight for a message given its stored post time. Ids with no
/// stored post time are unweighted.
#[must_use]
pub fn recency_weight(posted_at: Option<NaiveDateTime>, now: NaiveDateTime) -> f64 {
    let Some(posted) = posted_at else {
        return 1.0;
    };

    let age_hours = ((now - posted).num_seconds() as f64 / 3600.0).max(0.0);
    RECENT_MULTIPLIER * 0.5_f64.powf(age_hours / RECENT_HALF_LIFE_HOURS as f64) + 1.0
}
