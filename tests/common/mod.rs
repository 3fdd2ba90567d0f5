//! Common test utilities and helpers

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, Weekday};
use tempfile::TempDir;

/// Test data utilities
pub mod test_data {
    use super::*;
    use rust_stocks_sentiment::models::PriceBar;

    /// Weekdays starting at `start`, skipping Saturdays and Sundays
    pub fn business_days(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
        let mut days = Vec::with_capacity(count);
        let mut day = start;
        while days.len() < count {
            if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                days.push(day);
            }
            day = day.succ_opt().unwrap();
        }
        days
    }

    /// Closes that start at 100 and move by the given returns
    pub fn closes_from_returns(returns: &[f64]) -> Vec<f64> {
        let mut closes = vec![100.0];
        for r in returns {
            let last = *closes.last().unwrap();
            closes.push(last * (1.0 + r));
        }
        closes
    }

    /// Price bars on consecutive business days from `start`
    pub fn create_test_bars(start: NaiveDate, closes: &[f64]) -> Vec<PriceBar> {
        business_days(start, closes.len())
            .into_iter()
            .zip(closes)
            .map(|(date, &close)| PriceBar {
                date,
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000_000.0,
            })
            .collect()
    }

    /// Returns that wiggle enough to give every window some variance
    pub fn sample_returns(count: usize) -> Vec<f64> {
        let pattern = [0.012, -0.018, 0.007, 0.021, -0.009, 0.003, -0.014, 0.016];
        (0..count).map(|i| pattern[i % pattern.len()] * (1.0 + i as f64 / 100.0)).collect()
    }
}

/// Temporary data directory with price and news files
pub struct TestDataDir {
    dir: TempDir,
}

impl TestDataDir {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `<ticker>.csv` with the standard OHLCV header
    pub fn write_prices(&self, ticker: &str, bars: &[rust_stocks_sentiment::PriceBar]) -> PathBuf {
        let mut body = String::from("Date,Open,High,Low,Close,Volume\n");
        for bar in bars {
            body.push_str(&format!(
                "{},{},{},{},{},{}\n",
                bar.date, bar.open, bar.high, bar.low, bar.close, bar.volume
            ));
        }
        self.write_file(&format!("{}.csv", ticker), &body)
    }

    /// Write an arbitrary file, returning its path
    pub fn write_file(&self, name: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }
}

/// Logging utilities for tests
pub mod logging {
    use std::sync::Once;
    use tracing::{debug, info};

    static INIT: Once = Once::new();

    /// Initialize test logging
    pub fn init_test_logging() {
        INIT.call_once(|| {
            let _ = tracing::subscriber::set_global_default(
                tracing_subscriber::fmt()
                    .with_env_filter("rust_stocks_sentiment=debug")
                    .with_test_writer()
                    .finish(),
            );
        });
    }

    /// Log test step
    pub fn log_test_step(step: &str) {
        info!("🧪 Test Step: {}", step);
    }

    /// Log test data
    pub fn log_test_data<T: std::fmt::Debug>(label: &str, data: &T) {
        debug!("📊 {}: {:?}", label, data);
    }
}
