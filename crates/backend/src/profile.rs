use std::time::Instant;

use geo_recommender_shared::models::{ProfileStats, QueryParams};
use rand::Rng;
use tracing::info;

use crate::error::StoreError;
use crate::store::KdTreeStore;

const PROFILE_AGE: u32 = 23;

/// Summary statistics of `samples`.
///
/// Variance is the unbiased estimate. Skewness and excess kurtosis use the
/// biased moment estimators. Degenerate inputs report zero spread.
pub fn describe(samples: &[f64]) -> ProfileStats {
    let nobs = samples.len();
    if nobs == 0 {
        return ProfileStats::default();
    }
    let n = nobs as f64;

    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = samples.iter().sum::<f64>() / n;

    let moment = |p: i32| samples.iter().map(|x| (x - mean).powi(p)).sum::<f64>() / n;
    let (m2, m3, m4) = (moment(2), moment(3), moment(4));

    let variance = if nobs > 1 { m2 * n / (n - 1.0) } else { 0.0 };
    let (skewness, kurtosis) = if m2 > 0.0 {
        (m3 / m2.powf(1.5), m4 / (m2 * m2) - 3.0)
    } else {
        (0.0, 0.0)
    };

    let over = samples.iter().filter(|&&s| s >= 1.0).count();

    ProfileStats {
        nobs,
        min,
        max,
        mean,
        variance,
        skewness,
        kurtosis,
        fraction_over_one_second: over as f64 / n,
    }
}

/// Time `num_loops` random queries against the index.
pub fn run_profiling<R: Rng + ?Sized>(
    store: &KdTreeStore,
    num_loops: usize,
    num_neighbors: usize,
    age_proximity: u32,
    rng: &mut R,
) -> Result<ProfileStats, StoreError> {
    info!(num_loops, num_neighbors, age_proximity, "profiling queries");

    let mut timings = Vec::new();
    for _ in 0..num_loops {
        let target = QueryParams {
            latitude: rng.gen_range(-90.0..=90.0) / 2.0,
            longitude: rng.gen_range(-180.0..=180.0),
            age: PROFILE_AGE,
        };
        let start = Instant::now();
        store.k_nearest_neighbors(&target, num_neighbors, age_proximity)?;
        timings.push(start.elapsed().as_secs_f64());
    }

    let stats = describe(&timings);
    info!(
        mean = stats.mean,
        max = stats.max,
        fraction_over_one_second = stats.fraction_over_one_second,
        "profiling done"
    );
    Ok(stats)
}
