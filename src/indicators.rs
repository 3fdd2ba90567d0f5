//! Technical indicators over a close-price series.
//!
//! Outputs follow TA-Lib conventions: each series is as long as its input,
//! warm-up positions are `None`, EMAs are seeded with a simple average and RSI
//! uses Wilder smoothing.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::models::PriceBar;

/// Window parameters for the indicator set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndicatorParams {
    pub sma_short: usize,
    pub sma_long: usize,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            sma_short: 20,
            sma_long: 50,
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
        }
    }
}

impl IndicatorParams {
    pub fn validate(&self) -> Result<()> {
        let periods = [
            ("sma_short", self.sma_short),
            ("sma_long", self.sma_long),
            ("rsi_period", self.rsi_period),
            ("macd_fast", self.macd_fast),
            ("macd_slow", self.macd_slow),
            ("macd_signal", self.macd_signal),
        ];
        if let Some((name, _)) = periods.iter().find(|(_, p)| *p == 0) {
            return Err(AnalysisError::InvalidParameter(format!("{} must be positive", name)));
        }
        if self.macd_fast >= self.macd_slow {
            return Err(AnalysisError::InvalidParameter(format!(
                "MACD fast period {} must be shorter than slow period {}",
                self.macd_fast, self.macd_slow
            )));
        }
        Ok(())
    }
}

/// MACD line, signal line and histogram
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MacdSeries {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

/// Simple moving average
pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }

    let mut sum: f64 = values[..period].iter().sum();
    out[period - 1] = Some(sum / period as f64);
    for i in period..values.len() {
        sum += values[i] - values[i - period];
        out[i] = Some(sum / period as f64);
    }
    out
}

/// Exponential moving average seeded with the SMA of the first `period` values
pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }
    ema_from(values, period, period - 1)
}

/// EMA whose first output sits at `start`, seeded with the SMA of the
/// `period` values ending there
fn ema_from(values: &[f64], period: usize, start: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || start + 1 < period || start >= values.len() {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let seed_window = &values[start + 1 - period..=start];
    let mut prev = seed_window.iter().sum::<f64>() / period as f64;
    out[start] = Some(prev);

    for i in start + 1..values.len() {
        prev = (values[i] - prev) * k + prev;
        out[i] = Some(prev);
    }
    out
}

/// Relative Strength Index with Wilder smoothing; first value at `period`
pub fn rsi(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() <= period {
        return out;
    }

    let (mut avg_gain, mut avg_loss) = (0.0, 0.0);
    for i in 1..=period {
        let change = values[i] - values[i - 1];
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss -= change;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    out[period] = Some(rsi_value(avg_gain, avg_loss));

    let p = period as f64;
    for i in period + 1..values.len() {
        let change = values[i] - values[i - 1];
        let (gain, loss) = if change > 0.0 { (change, 0.0) } else { (0.0, -change) };
        avg_gain = (avg_gain * (p - 1.0) + gain) / p;
        avg_loss = (avg_loss * (p - 1.0) + loss) / p;
        out[i] = Some(rsi_value(avg_gain, avg_loss));
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    let total = avg_gain + avg_loss;
    if total == 0.0 {
        0.0
    } else {
        100.0 * avg_gain / total
    }
}

/// MACD with TA-Lib alignment: all three outputs start at `slow + signal - 2`
pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let n = values.len();
    let empty = MacdSeries {
        macd: vec![None; n],
        signal: vec![None; n],
        histogram: vec![None; n],
    };
    if fast == 0 || signal == 0 || fast >= slow || n < slow + signal - 1 {
        return empty;
    }

    // Both EMAs start where the slow one does
    let start = slow - 1;
    let fast_ema = ema_from(values, fast, start);
    let slow_ema = ema_from(values, slow, start);

    let line: Vec<f64> = (start..n)
        .filter_map(|i| Some(fast_ema[i]? - slow_ema[i]?))
        .collect();
    let signal_line = ema(&line, signal);

    let first = start + signal - 1;
    let mut series = empty;
    for i in first..n {
        let j = i - start;
        let (m, s) = match signal_line[j] {
            Some(s) => (line[j], s),
            None => continue,
        };
        series.macd[i] = Some(m);
        series.signal[i] = Some(s);
        series.histogram[i] = Some(m - s);
    }
    series
}

/// Indicator columns for one ticker, aligned with its price rows
#[derive(Debug, Clone, Serialize)]
pub struct IndicatorFrame {
    pub params: IndicatorParams,
    pub dates: Vec<NaiveDate>,
    pub sma_short: Vec<Option<f64>>,
    pub sma_long: Vec<Option<f64>>,
    pub rsi: Vec<Option<f64>>,
    pub macd: MacdSeries,
}

/// Values of every indicator on the most recent row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorSnapshot {
    pub date: NaiveDate,
    pub sma_short: Option<f64>,
    pub sma_long: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
}

impl IndicatorFrame {
    pub fn compute(bars: &[PriceBar], params: &IndicatorParams) -> Result<Self> {
        params.validate()?;
        let closes: Vec<f64> = bars.iter().map(|bar| bar.close).collect();

        Ok(Self {
            params: *params,
            dates: bars.iter().map(|bar| bar.date).collect(),
            sma_short: sma(&closes, params.sma_short),
            sma_long: sma(&closes, params.sma_long),
            rsi: rsi(&closes, params.rsi_period),
            macd: macd(&closes, params.macd_fast, params.macd_slow, params.macd_signal),
        })
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn latest(&self) -> Option<IndicatorSnapshot> {
        let i = self.dates.len().checked_sub(1)?;
        Some(IndicatorSnapshot {
            date: self.dates[i],
            sma_short: self.sma_short[i],
            sma_long: self.sma_long[i],
            rsi: self.rsi[i],
            macd: self.macd.macd[i],
            macd_signal: self.macd.signal[i],
            macd_histogram: self.macd.histogram[i],
        })
    }
}

/// Compute indicators for every ticker
pub fn apply_to_all(
    stocks: &BTreeMap<String, Vec<PriceBar>>,
    params: &IndicatorParams,
) -> Result<BTreeMap<String, IndicatorFrame>> {
    stocks
        .iter()
        .map(|(ticker, bars)| {
            debug!("Computing indicators for {} ({} bars)", ticker, bars.len());
            IndicatorFrame::compute(bars, params).map(|frame| (ticker.clone(), frame))
        })
        .collect()
}
