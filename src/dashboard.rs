use std::fmt;

use chrono::NaiveDate;

use crate::indicators::{IndicatorFrame, IndicatorSnapshot};
use crate::metrics::MetricsFrame;
use crate::models::PriceBar;

/// Direction implied by a pair of crossing lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Bullish,
    Bearish,
}

impl Trend {
    fn from_cross(fast: f64, slow: f64) -> Self {
        if fast > slow {
            Trend::Bullish
        } else {
            Trend::Bearish
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Bullish => write!(f, "BULLISH"),
            Trend::Bearish => write!(f, "BEARISH"),
        }
    }
}

/// RSI reading classified against the 30/70 bands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsiZone {
    Oversold,
    Neutral,
    Overbought,
}

impl RsiZone {
    pub fn classify(rsi: f64) -> Self {
        if rsi < 30.0 {
            RsiZone::Oversold
        } else if rsi > 70.0 {
            RsiZone::Overbought
        } else {
            RsiZone::Neutral
        }
    }
}

impl fmt::Display for RsiZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RsiZone::Oversold => write!(f, "OVERSOLD"),
            RsiZone::Neutral => write!(f, "NEUTRAL"),
            RsiZone::Overbought => write!(f, "OVERBOUGHT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovingAverageSignal {
    pub trend: Trend,
    pub short: f64,
    pub long: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiSignal {
    pub value: f64,
    pub zone: RsiZone,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdSignal {
    pub trend: Trend,
    pub macd: f64,
    pub signal: f64,
}

/// How a metric value is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricFormat {
    Percent,
    Ratio,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricLine {
    pub label: &'static str,
    pub value: f64,
    pub format: MetricFormat,
}

/// Latest indicator and metric readings for one ticker
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub ticker: String,
    pub date: NaiveDate,
    pub close: f64,
    pub short_window: usize,
    pub long_window: usize,
    pub rsi_period: usize,
    pub moving_average: Option<MovingAverageSignal>,
    pub rsi: Option<RsiSignal>,
    pub macd: Option<MacdSignal>,
    pub metrics: Vec<MetricLine>,
}

impl DashboardSummary {
    /// Summarise the last row; `None` when there are no bars
    pub fn from_frames(
        ticker: &str,
        bars: &[PriceBar],
        indicators: &IndicatorFrame,
        metrics: &MetricsFrame,
    ) -> Option<Self> {
        let last = bars.last()?;
        let snapshot: IndicatorSnapshot = indicators.latest()?;

        let moving_average = match (snapshot.sma_short, snapshot.sma_long) {
            (Some(short), Some(long)) => Some(MovingAverageSignal {
                trend: Trend::from_cross(short, long),
                short,
                long,
            }),
            _ => None,
        };
        let rsi = snapshot.rsi.map(|value| RsiSignal {
            value,
            zone: RsiZone::classify(value),
        });
        let macd = match (snapshot.macd, snapshot.macd_signal) {
            (Some(macd), Some(signal)) => Some(MacdSignal {
                trend: Trend::from_cross(macd, signal),
                macd,
                signal,
            }),
            _ => None,
        };

        let candidates = [
            ("Volatility 30D", MetricsFrame::latest(&metrics.volatility_30d), MetricFormat::Percent),
            ("Sharpe 30D", MetricsFrame::latest(&metrics.sharpe_30d), MetricFormat::Ratio),
            ("Max Drawdown", Some(metrics.max_drawdown), MetricFormat::Percent),
            ("Cumulative Returns", MetricsFrame::latest(&metrics.cumulative_returns), MetricFormat::Percent),
        ];
        let metrics = candidates
            .into_iter()
            .filter_map(|(label, value, format)| {
                value
                    .filter(|v| v.is_finite())
                    .map(|value| MetricLine { label, value, format })
            })
            .collect();

        Some(Self {
            ticker: ticker.to_string(),
            date: last.date,
            close: last.close,
            short_window: indicators.params.sma_short,
            long_window: indicators.params.sma_long,
            rsi_period: indicators.params.rsi_period,
            moving_average,
            rsi,
            macd,
            metrics,
        })
    }
}

impl fmt::Display for DashboardSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "📈 LATEST INDICATOR VALUES - {} ({})", self.ticker, self.date)?;
        writeln!(f, "{}", "-".repeat(40))?;
        writeln!(f, "💰 Current Price: ${:.2}", self.close)?;

        if let Some(ma) = &self.moving_average {
            writeln!(f, "📊 Moving Average Signal: {}", ma.trend)?;
            writeln!(f, "   {}-day SMA: ${:.2}", self.short_window, ma.short)?;
            writeln!(f, "   {}-day SMA: ${:.2}", self.long_window, ma.long)?;
        }
        if let Some(rsi) = &self.rsi {
            writeln!(f, "🎯 RSI ({}): {:.1} - {}", self.rsi_period, rsi.value, rsi.zone)?;
        }
        if let Some(macd) = &self.macd {
            writeln!(f, "📉 MACD Signal: {}", macd.trend)?;
            writeln!(f, "   MACD: {:.3}, Signal: {:.3}", macd.macd, macd.signal)?;
        }
        if !self.metrics.is_empty() {
            writeln!(f, "📊 METRICS:")?;
            for line in &self.metrics {
                match line.format {
                    MetricFormat::Percent => writeln!(f, "   • {}: {:.2}%", line.label, line.value * 100.0)?,
                    MetricFormat::Ratio => writeln!(f, "   • {}: {:.4}", line.label, line.value)?,
                }
            }
        }
        Ok(())
    }
}
