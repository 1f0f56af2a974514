//! Pearson correlation of the sample-level series.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::error::{CorpusError, CorpusResult};
use crate::scorer::SampleAggregates;

/// Minimum number of paired observations.
pub const MIN_SAMPLES: usize = 2;

/// Correlation coefficient with its two-sided p-value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    /// Pearson's r; NaN when either series is constant or contains NaN.
    pub coefficient: f64,
    /// Two-sided p-value under the null of zero correlation.
    pub p_value: f64,
    /// Number of pairs.
    pub samples: usize,
}

/// Pearson correlation of `x` and `y`.
pub fn correlate(x: &[f64], y: &[f64]) -> CorpusResult<Correlation> {
    if x.len() != y.len() || x.len() < MIN_SAMPLES {
        return Err(CorpusError::InsufficientSamples {
            required: MIN_SAMPLES,
            x_len: x.len(),
            y_len: y.len(),
        });
    }

    let n = x.len();
    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (xi, yi) in x.iter().zip(y) {
        let (dx, dy) = (xi - mean_x, yi - mean_y);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let denominator = (sxx * syy).sqrt();
    if denominator == 0.0 || denominator.is_nan() {
        return Ok(Correlation { coefficient: f64::NAN, p_value: f64::NAN, samples: n });
    }

    let r = (sxy / denominator).clamp(-1.0, 1.0);
    Ok(Correlation { coefficient: r, p_value: p_value(r, n), samples: n })
}

/// Two-sided p-value of r from the t distribution with n - 2 degrees of freedom.
fn p_value(r: f64, n: usize) -> f64 {
    if n == MIN_SAMPLES {
        // Two points are always perfectly correlated.
        return 1.0;
    }
    if (1.0 - r.abs()) <= f64::EPSILON {
        return 0.0;
    }

    let df = (n - 2) as f64;
    let t = r * (df / (1.0 - r * r)).sqrt();
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0),
        Err(_) => f64::NAN,
    }
}

/// Citation count against each reference statistic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationReport {
    /// Against mean reference percentile.
    pub mean: Correlation,
    /// Against minimum reference percentile.
    pub min: Correlation,
    /// Against maximum reference percentile.
    pub max: Correlation,
    /// Against number of reference topics.
    pub topics: Correlation,
}

/// Correlate the collected series.
pub fn report(aggregates: &SampleAggregates) -> CorpusResult<CorrelationReport> {
    let counts = &aggregates.citation_counts;
    Ok(CorrelationReport {
        mean: correlate(counts, &aggregates.means)?,
        min: correlate(counts, &aggregates.mins)?,
        max: correlate(counts, &aggregates.maxes)?,
        topics: correlate(counts, &aggregates.topic_counts)?,
    })
}
