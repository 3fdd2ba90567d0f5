//! Return and risk metrics over a price series.
//!
//! Window statistics come from one of two backends. [`MetricsBackend::check`]
//! decides up front whether the requested backend can handle a series and
//! reports a typed reason when it falls back to the manual calculation.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;
use statrs::statistics::Statistics;
use tracing::{debug, warn};

use crate::error::AnalysisError;
use crate::indicators::sma;
use crate::models::{DailyReturn, PriceBar};

/// Trading days used to annualize daily figures
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Close-to-close returns; the first day has none.
///
/// A day whose previous close is zero or not finite yields no return.
pub fn daily_returns(bars: &[PriceBar]) -> Vec<DailyReturn> {
    bars.windows(2)
        .filter_map(|pair| {
            let (prev, cur) = (&pair[0], &pair[1]);
            if prev.close == 0.0 || !prev.close.is_finite() {
                return None;
            }
            Some(DailyReturn {
                trading_day: cur.date,
                return_pct: cur.close / prev.close - 1.0,
            })
        })
        .collect()
}

/// Where window statistics are computed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum MetricsBackend {
    /// `statrs` descriptive statistics
    #[default]
    Statrs,
    /// Hand-written running sums
    Manual,
}

impl FromStr for MetricsBackend {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "statrs" | "library" => Ok(MetricsBackend::Statrs),
            "manual" => Ok(MetricsBackend::Manual),
            other => Err(AnalysisError::Config(format!(
                "unknown metrics backend {:?} (expected statrs or manual)",
                other
            ))),
        }
    }
}

impl fmt::Display for MetricsBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricsBackend::Statrs => write!(f, "statrs"),
            MetricsBackend::Manual => write!(f, "manual"),
        }
    }
}

/// Why the requested backend was not used
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FallbackReason {
    InsufficientHistory { bars: usize, required: usize },
    NonPositivePrice { date: NaiveDate },
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::InsufficientHistory { bars, required } => {
                write!(f, "{} bars, at least {} required", bars, required)
            }
            FallbackReason::NonPositivePrice { date } => {
                write!(f, "non-positive or missing close on {}", date)
            }
        }
    }
}

/// The backend actually used, and why if it differs from the request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendChoice {
    pub backend: MetricsBackend,
    pub fallback: Option<FallbackReason>,
}

impl MetricsBackend {
    /// Decide whether this backend supports the series.
    ///
    /// The statrs backend needs a full longest window of returns and strictly
    /// positive, finite closes; anything else is routed to the manual backend.
    pub fn check(self, bars: &[PriceBar], params: &MetricsParams) -> BackendChoice {
        let reason = match self {
            MetricsBackend::Manual => None,
            MetricsBackend::Statrs => {
                let required = params.longest_window() + 1;
                if bars.len() < required {
                    Some(FallbackReason::InsufficientHistory {
                        bars: bars.len(),
                        required,
                    })
                } else {
                    bars.iter()
                        .find(|bar| !(bar.close.is_finite() && bar.close > 0.0))
                        .map(|bar| FallbackReason::NonPositivePrice { date: bar.date })
                }
            }
        };

        match reason {
            None => BackendChoice {
                backend: self,
                fallback: None,
            },
            Some(reason) => BackendChoice {
                backend: MetricsBackend::Manual,
                fallback: Some(reason),
            },
        }
    }

    fn window_stats(self, window: &[f64]) -> (f64, f64) {
        match self {
            MetricsBackend::Statrs => (window.iter().mean(), window.iter().std_dev()),
            MetricsBackend::Manual => {
                let n = window.len() as f64;
                let (sum, sum_sq) = window
                    .iter()
                    .fold((0.0, 0.0), |(s, sq), v| (s + v, sq + v * v));
                let mean = sum / n;
                let var = ((sum_sq - sum * mean) / (n - 1.0)).max(0.0);
                (mean, var.sqrt())
            }
        }
    }
}

/// Window lengths and rates for the metric set
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsParams {
    pub volatility_short: usize,
    pub volatility_long: usize,
    pub sma_window: usize,
    pub sharpe_window: usize,
    /// Annual risk-free rate as a fraction
    pub risk_free_rate: f64,
}

impl Default for MetricsParams {
    fn default() -> Self {
        Self {
            volatility_short: 20,
            volatility_long: 30,
            sma_window: 20,
            sharpe_window: 30,
            risk_free_rate: 0.0,
        }
    }
}

impl MetricsParams {
    fn longest_window(&self) -> usize {
        self.volatility_short
            .max(self.volatility_long)
            .max(self.sharpe_window)
    }
}

/// Metric columns for one ticker, aligned with its price rows
#[derive(Debug, Clone, Serialize)]
pub struct MetricsFrame {
    pub backend: BackendChoice,
    pub dates: Vec<NaiveDate>,
    pub returns: Vec<Option<f64>>,
    pub volatility_20d: Vec<Option<f64>>,
    pub volatility_30d: Vec<Option<f64>>,
    pub cumulative_returns: Vec<Option<f64>>,
    pub price_sma_20: Vec<Option<f64>>,
    pub sharpe_30d: Vec<Option<f64>>,
    pub drawdown: Vec<f64>,
    pub max_drawdown: f64,
}

impl MetricsFrame {
    pub fn compute(
        ticker: &str,
        bars: &[PriceBar],
        params: &MetricsParams,
        requested: MetricsBackend,
    ) -> Self {
        let choice = requested.check(bars, params);
        if let Some(reason) = &choice.fallback {
            warn!(
                "⚠️  {}: {} backend unavailable ({}), using {} calculation",
                ticker, requested, reason, choice.backend
            );
        }
        let backend = choice.backend;

        let closes: Vec<f64> = bars.iter().map(|bar| bar.close).collect();
        let returns = row_returns(&closes);

        let annualize = TRADING_DAYS_PER_YEAR.sqrt();
        let volatility = |window: usize| {
            rolling(&returns, window, |w| {
                let (_, std) = backend.window_stats(w);
                Some(std * annualize)
            })
        };
        let daily_rf = params.risk_free_rate / TRADING_DAYS_PER_YEAR;

        let (drawdown, max_drawdown) = drawdown_series(&closes);
        debug!("{}: metrics computed with {} backend over {} bars", ticker, backend, bars.len());

        Self {
            dates: bars.iter().map(|bar| bar.date).collect(),
            volatility_20d: volatility(params.volatility_short),
            volatility_30d: volatility(params.volatility_long),
            cumulative_returns: cumulative(&returns),
            price_sma_20: sma(&closes, params.sma_window),
            sharpe_30d: rolling(&returns, params.sharpe_window, |w| {
                let (mean, std) = backend.window_stats(w);
                (std > 0.0).then(|| (mean - daily_rf) / std * annualize)
            }),
            returns,
            drawdown,
            max_drawdown,
            backend: choice,
        }
    }

    /// Latest defined value of a column
    pub fn latest(column: &[Option<f64>]) -> Option<f64> {
        column.last().copied().flatten()
    }
}

/// Per-row returns; rows without a previous usable close are `None`
fn row_returns(closes: &[f64]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(closes.len());
    if closes.is_empty() {
        return out;
    }
    out.push(None);
    for pair in closes.windows(2) {
        let ret = (pair[0] != 0.0 && pair[0].is_finite()).then(|| pair[1] / pair[0] - 1.0);
        out.push(ret.filter(|r| r.is_finite()));
    }
    out
}

/// Apply `stat` to every full window; a window with a gap yields `None`
fn rolling<F>(values: &[Option<f64>], window: usize, stat: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    let mut out = vec![None; values.len()];
    if window < 2 || values.len() < window {
        return out;
    }

    let mut buf = Vec::with_capacity(window);
    for end in window - 1..values.len() {
        buf.clear();
        buf.extend(values[end + 1 - window..=end].iter().flatten().copied());
        if buf.len() == window {
            out[end] = stat(&buf);
        }
    }
    out
}

/// Compounded return since the first row; gaps keep the running product
fn cumulative(returns: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut growth = 1.0;
    returns
        .iter()
        .map(|r| {
            r.map(|r| {
                growth *= 1.0 + r;
                growth - 1.0
            })
        })
        .collect()
}

/// Decline from the running maximum close, and its deepest value
fn drawdown_series(closes: &[f64]) -> (Vec<f64>, f64) {
    let mut peak = f64::NEG_INFINITY;
    let mut worst: f64 = 0.0;

    let series = closes
        .iter()
        .map(|&close| {
            peak = peak.max(close);
            let dd = if peak > 0.0 { close / peak - 1.0 } else { 0.0 };
            worst = worst.min(dd);
            dd
        })
        .collect();
    (series, worst)
}
