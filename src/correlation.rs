use std::collections::BTreeMap;

use statrs::distribution::{ContinuousCDF, StudentsT};
use tracing::debug;

use crate::error::{AnalysisError, InsufficientData, Result};
use crate::models::{AlignedNewsItem, CorrelationResult, DailyReturn, TradingDay};

/// Correlate per-day sentiment with same-day returns.
///
/// Only days present in both maps take part. The coefficient is Pearson's r
/// clamped to [-1, 1]; the p-value is two-sided under a Student t
/// distribution with `n - 2` degrees of freedom.
pub fn correlate(
    aligned_sentiment: &BTreeMap<TradingDay, f64>,
    returns: &BTreeMap<TradingDay, f64>,
) -> Result<CorrelationResult> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = aligned_sentiment
        .iter()
        .filter_map(|(day, sentiment)| returns.get(day).map(|ret| (*sentiment, *ret)))
        .unzip();

    let n = xs.len();
    debug!(
        "Joined {} of {} sentiment days with {} return days",
        n,
        aligned_sentiment.len(),
        returns.len()
    );

    if n < 2 {
        return Err(InsufficientData::TooFewPairs { found: n }.into());
    }
    if is_constant(&xs) {
        return Err(InsufficientData::ZeroVariance { series: "sentiment", pairs: n }.into());
    }
    if is_constant(&ys) {
        return Err(InsufficientData::ZeroVariance { series: "returns", pairs: n }.into());
    }

    // Two points always lie on a line
    if n == 2 {
        let slope_sign = (xs[1] - xs[0]).signum() * (ys[1] - ys[0]).signum();
        return Ok(CorrelationResult {
            coefficient: slope_sign,
            p_value: 1.0,
            sample_size: n,
        });
    }

    let coefficient = pearson(&xs, &ys).clamp(-1.0, 1.0);
    let p_value = two_sided_p_value(coefficient, n)?;

    Ok(CorrelationResult {
        coefficient,
        p_value,
        sample_size: n,
    })
}

/// Pearson's r over equally long, non-constant series
fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let dxs = scaled_deviations(xs);
    let dys = scaled_deviations(ys);

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (dx, dy) in dxs.iter().zip(&dys) {
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    sxy / (sxx.sqrt() * syy.sqrt())
}

/// Deviations from the mean divided by the largest absolute deviation.
///
/// r is scale invariant; keeping deviations within [-1, 1] stops their
/// squares from underflowing for tiny-magnitude series.
fn scaled_deviations(values: &[f64]) -> Vec<f64> {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let deviations: Vec<f64> = values.iter().map(|v| v - mean).collect();
    let scale = deviations.iter().fold(0.0_f64, |m, d| m.max(d.abs()));
    if scale == 0.0 {
        return deviations;
    }
    deviations.into_iter().map(|d| d / scale).collect()
}

fn two_sided_p_value(r: f64, n: usize) -> Result<f64> {
    if r.abs() >= 1.0 {
        return Ok(0.0);
    }

    let df = (n - 2) as f64;
    let t = r * (df / (1.0 - r * r)).sqrt();
    let dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| AnalysisError::InvalidParameter(format!("t distribution: {}", e)))?;

    let p = 2.0 * (1.0 - dist.cdf(t.abs()));
    Ok(p.clamp(0.0, 1.0))
}

fn is_constant(values: &[f64]) -> bool {
    values.iter().all(|v| *v == values[0])
}

/// Mean sentiment of the scored headlines attributed to each trading day
pub fn daily_sentiment(aligned: &[AlignedNewsItem]) -> BTreeMap<TradingDay, f64> {
    let mut sums: BTreeMap<TradingDay, (f64, usize)> = BTreeMap::new();
    for news in aligned {
        if let Some(score) = news.item.sentiment {
            let entry = sums.entry(news.trading_day).or_insert((0.0, 0));
            entry.0 += score;
            entry.1 += 1;
        }
    }

    sums.into_iter()
        .map(|(day, (sum, count))| (day, sum / count as f64))
        .collect()
}

/// Index daily returns by trading day
pub fn returns_by_day(returns: &[DailyReturn]) -> BTreeMap<TradingDay, f64> {
    returns
        .iter()
        .map(|r| (r.trading_day, r.return_pct))
        .collect()
}
