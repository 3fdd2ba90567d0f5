use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::calendar::{FallbackPolicy, TradingDayIndex};
use crate::correlation::{correlate, daily_sentiment, returns_by_day};
use crate::dashboard::DashboardSummary;
use crate::data_loader::DataLoader;
use crate::error::{AnalysisError, Result};
use crate::indicators::{IndicatorFrame, IndicatorParams};
use crate::metrics::{daily_returns, MetricsBackend, MetricsFrame, MetricsParams};
use crate::models::{Config, CorrelationResult, NewsItem};
use crate::sentiment::{score_news, SentimentScorer};

/// Correlation outcome for a single ticker
#[derive(Debug, Clone, Serialize)]
pub struct TickerCorrelation {
    pub ticker: String,
    pub news_items: usize,
    pub news_days: usize,
    pub return_days: usize,
    pub result: CorrelationResult,
}

/// One ticker's result, successful or not
#[derive(Debug, Serialize)]
pub struct TickerOutcome {
    pub ticker: String,
    #[serde(serialize_with = "serialize_outcome")]
    pub outcome: Result<TickerCorrelation>,
}

fn serialize_outcome<S>(outcome: &Result<TickerCorrelation>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    #[derive(Serialize)]
    #[serde(rename_all = "snake_case")]
    enum Repr<'a> {
        Ok(&'a TickerCorrelation),
        Error(String),
    }

    match outcome {
        Ok(correlation) => Repr::Ok(correlation).serialize(serializer),
        Err(e) => Repr::Error(e.to_string()).serialize(serializer),
    }
}

/// Results of a multi-ticker run, sorted by ticker
#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub outcomes: Vec<TickerOutcome>,
}

impl AnalysisReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &TickerCorrelation> {
        self.outcomes.iter().filter_map(|o| o.outcome.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &AnalysisError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.outcome.as_ref().err().map(|e| (o.ticker.as_str(), e)))
    }
}

/// Runs per-ticker analyses; a failing ticker never stops the others
pub struct AnalysisRunner {
    loader: DataLoader,
    scorer: Arc<dyn SentimentScorer>,
    policy: FallbackPolicy,
    backend: MetricsBackend,
    metrics_params: MetricsParams,
    indicator_params: IndicatorParams,
    max_concurrent: usize,
}

impl AnalysisRunner {
    pub fn new(config: &Config, scorer: Arc<dyn SentimentScorer>) -> Self {
        Self {
            loader: DataLoader::new(&config.data_dir),
            scorer,
            policy: config.unmapped_news,
            backend: config.metrics_backend,
            metrics_params: MetricsParams {
                risk_free_rate: config.risk_free_rate,
                ..MetricsParams::default()
            },
            indicator_params: IndicatorParams::default(),
            max_concurrent: config.max_concurrent_tickers.max(1),
        }
    }

    pub fn loader(&self) -> &DataLoader {
        &self.loader
    }

    /// Correlate news sentiment with next-trading-day returns for each ticker
    pub async fn correlate_tickers(&self, news: Vec<NewsItem>, tickers: &[String]) -> AnalysisReport {
        let total = tickers.len();
        info!(
            "📊 Correlating {} news items across {} tickers (max {} in parallel)",
            news.len(),
            total,
            self.max_concurrent
        );

        // Headlines shared by several tickers are scored once
        let news = Arc::new(score_news(self.scorer.as_ref(), news));
        let mut results = stream::iter(tickers.to_vec())
            .map(|ticker| {
                let loader = self.loader.clone();
                let news = Arc::clone(&news);
                let policy = self.policy;

                async move {
                    let task_ticker = ticker.clone();
                    let outcome = tokio::task::spawn_blocking(move || {
                        correlate_ticker(&loader, &news, &task_ticker, policy)
                    })
                    .await
                    .unwrap_or_else(|e| Err(AnalysisError::Task(e.to_string())));
                    TickerOutcome { ticker, outcome }
                }
            })
            .buffer_unordered(self.max_concurrent);

        let mut outcomes = Vec::with_capacity(total);
        let mut processed = 0;
        while let Some(outcome) = results.next().await {
            processed += 1;
            match &outcome.outcome {
                Ok(c) => info!(
                    "✅ {}/{}: {} r = {:+.4}, p = {:.4} over {} days",
                    processed, total, c.ticker, c.result.coefficient, c.result.p_value, c.result.sample_size
                ),
                Err(e) => error!("❌ {}/{}: {} failed - {}", processed, total, outcome.ticker, e),
            }
            outcomes.push(outcome);
        }

        outcomes.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        let report = AnalysisReport { outcomes };
        info!(
            "✅ Correlation run completed: {} succeeded, {} failed",
            report.succeeded().count(),
            report.failed().count()
        );
        report
    }

    /// Latest indicator and metric readings per ticker
    pub async fn dashboards(&self, tickers: &[String]) -> Vec<(String, Result<DashboardSummary>)> {
        let mut results = stream::iter(tickers.to_vec())
            .map(|ticker| {
                let loader = self.loader.clone();
                let backend = self.backend;
                let metrics_params = self.metrics_params;
                let indicator_params = self.indicator_params;

                async move {
                    let task_ticker = ticker.clone();
                    let summary = tokio::task::spawn_blocking(move || {
                        summarize_ticker(&loader, &task_ticker, &indicator_params, &metrics_params, backend)
                    })
                    .await
                    .unwrap_or_else(|e| Err(AnalysisError::Task(e.to_string())));
                    (ticker, summary)
                }
            })
            .buffer_unordered(self.max_concurrent);

        let mut summaries = Vec::with_capacity(tickers.len());
        while let Some(entry) = results.next().await {
            summaries.push(entry);
        }
        summaries.sort_by(|a, b| a.0.cmp(&b.0));
        summaries
    }
}

/// Full pipeline for one ticker: prices, index, alignment, correlation.
///
/// `news` is expected to be scored already; unscored items do not count
/// towards the daily sentiment.
pub fn correlate_ticker(
    loader: &DataLoader,
    news: &[NewsItem],
    ticker: &str,
    policy: FallbackPolicy,
) -> Result<TickerCorrelation> {
    let bars = loader.load_stock(ticker)?;
    let index = TradingDayIndex::from_prices(&bars)?;

    let relevant: Vec<NewsItem> = news.iter().filter(|n| n.concerns(ticker)).cloned().collect();
    debug!("{}: {} of {} news items apply", ticker, relevant.len(), news.len());

    let aligned = index.align_news_with_policy(&relevant, policy);
    let sentiment = daily_sentiment(&aligned);
    let returns = returns_by_day(&daily_returns(&bars));

    let result = correlate(&sentiment, &returns)?;
    Ok(TickerCorrelation {
        ticker: ticker.to_string(),
        news_items: aligned.len(),
        news_days: sentiment.len(),
        return_days: returns.len(),
        result,
    })
}

/// Indicators, metrics and dashboard for one ticker
pub fn summarize_ticker(
    loader: &DataLoader,
    ticker: &str,
    indicator_params: &IndicatorParams,
    metrics_params: &MetricsParams,
    backend: MetricsBackend,
) -> Result<DashboardSummary> {
    let bars = loader.load_stock(ticker)?;
    if bars.is_empty() {
        return Err(AnalysisError::NoPriceHistory(ticker.to_string()));
    }
    let indicators = IndicatorFrame::compute(&bars, indicator_params)?;
    let metrics = MetricsFrame::compute(ticker, &bars, metrics_params, backend);

    DashboardSummary::from_frames(ticker, &bars, &indicators, &metrics)
        .ok_or_else(|| AnalysisError::NoPriceHistory(ticker.to_string()))
}
