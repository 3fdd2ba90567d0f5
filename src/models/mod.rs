use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::calendar::FallbackPolicy;
use crate::metrics::MetricsBackend;

/// A calendar date on which the instrument traded.
pub type TradingDay = NaiveDate;

/// Tickers analysed when neither `TICKERS` nor `--tickers` is given.
pub const DEFAULT_TICKERS: [&str; 6] = ["AAPL", "AMZN", "GOOG", "META", "MSFT", "NVDA"];

/// One cleaned row of a per-ticker OHLCV file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// A news headline, optionally scored.
///
/// Sentiment is attached once through [`NewsItem::with_sentiment`]; the
/// record is never mutated in place afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub timestamp: NaiveDateTime,
    pub headline: String,
    pub ticker: Option<String>,
    pub sentiment: Option<f64>,
}

impl NewsItem {
    pub fn new(timestamp: NaiveDateTime, headline: impl Into<String>) -> Self {
        Self {
            timestamp,
            headline: headline.into(),
            ticker: None,
            sentiment: None,
        }
    }

    pub fn for_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into());
        self
    }

    /// Attach a polarity score, clamped to [-1, 1].
    pub fn with_sentiment(mut self, score: f64) -> Self {
        self.sentiment = Some(score.clamp(-1.0, 1.0));
        self
    }

    /// True when the item carries no ticker or carries `ticker` (case-insensitive).
    pub fn concerns(&self, ticker: &str) -> bool {
        self.ticker
            .as_deref()
            .map_or(true, |own| own.eq_ignore_ascii_case(ticker))
    }
}

/// A news item mapped onto the trading day it is assumed to influence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedNewsItem {
    #[serde(flatten)]
    pub item: NewsItem,
    #[serde(rename = "Trading_Day")]
    pub trading_day: TradingDay,
}

/// Close-to-close return of one trading day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyReturn {
    #[serde(rename = "Trading_Day")]
    pub trading_day: TradingDay,
    #[serde(rename = "Daily_Return")]
    pub return_pct: f64,
}

/// Pearson correlation between daily sentiment and daily returns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrelationResult {
    pub coefficient: f64,
    pub p_value: f64,
    pub sample_size: usize,
}

impl CorrelationResult {
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: String,
    pub news_path: String,
    pub tickers: Vec<String>,
    pub metrics_backend: MetricsBackend,
    pub risk_free_rate: f64,
    pub max_concurrent_tickers: usize,
    pub unmapped_news: FallbackPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: "../data/data".to_string(),
            news_path: "data/news.csv".to_string(),
            tickers: DEFAULT_TICKERS.iter().map(|t| t.to_string()).collect(),
            metrics_backend: MetricsBackend::default(),
            risk_free_rate: 0.0,
            max_concurrent_tickers: 4,
            unmapped_news: FallbackPolicy::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from any key lookup, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let tickers = match lookup("TICKERS") {
            Some(list) => parse_ticker_list(&list),
            None => defaults.tickers,
        };
        if tickers.is_empty() {
            anyhow::bail!("TICKERS must name at least one ticker");
        }

        let metrics_backend = match lookup("METRICS_BACKEND") {
            Some(value) => value.parse()?,
            None => defaults.metrics_backend,
        };

        let unmapped_news = match lookup("UNMAPPED_NEWS_POLICY") {
            Some(value) => value.parse()?,
            None => defaults.unmapped_news,
        };

        let risk_free_rate = match lookup("RISK_FREE_RATE") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("RISK_FREE_RATE must be a number, got {:?}", value))?,
            None => defaults.risk_free_rate,
        };

        Ok(Config {
            data_dir: lookup("DATA_DIR").unwrap_or(defaults.data_dir),
            news_path: lookup("NEWS_PATH").unwrap_or(defaults.news_path),
            tickers,
            metrics_backend,
            risk_free_rate,
            max_concurrent_tickers: lookup("MAX_CONCURRENT_TICKERS")
                .and_then(|v| v.trim().parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.max_concurrent_tickers),
            unmapped_news,
        })
    }
}

/// Split a comma separated ticker list, upper-casing and dropping blanks
pub fn parse_ticker_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .collect()
}
