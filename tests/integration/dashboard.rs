use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;

use rust_stocks_sentiment::{
    dashboard::Trend, metrics::MetricsBackend, sentiment::VaderScorer, AnalysisError,
    AnalysisRunner, Config,
};

use crate::common::{test_data, TestDataDir};

fn write_trending(dir: &TestDataDir, ticker: &str, drift: f64, days: usize) {
    let returns: Vec<f64> = test_data::sample_returns(days - 1)
        .into_iter()
        .map(|r| r + drift)
        .collect();
    let start = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
    dir.write_prices(
        ticker,
        &test_data::create_test_bars(start, &test_data::closes_from_returns(&returns)),
    );
}

fn runner(dir: &TestDataDir, backend: MetricsBackend) -> AnalysisRunner {
    let config = Config {
        data_dir: dir.path().display().to_string(),
        metrics_backend: backend,
        ..Config::default()
    };
    AnalysisRunner::new(&config, Arc::new(VaderScorer::new()))
}

#[test_log::test(tokio::test)]
async fn test_dashboards_report_trend_per_ticker() {
    let dir = TestDataDir::new();
    write_trending(&dir, "UP", 0.01, 90);
    write_trending(&dir, "DOWN", -0.01, 90);

    let tickers = vec!["UP".to_string(), "DOWN".to_string(), "GONE".to_string()];
    let dashboards = runner(&dir, MetricsBackend::Statrs).dashboards(&tickers).await;

    let names: Vec<&str> = dashboards.iter().map(|(t, _)| t.as_str()).collect();
    assert_eq!(names, vec!["DOWN", "GONE", "UP"]);

    let down = dashboards[0].1.as_ref().unwrap();
    assert_eq!(down.moving_average.unwrap().trend, Trend::Bearish);
    assert!(down.metrics.iter().any(|m| m.label == "Max Drawdown" && m.value < -0.3));

    assert_matches!(&dashboards[1].1, Err(AnalysisError::NotFound(_)));

    let up = dashboards[2].1.as_ref().unwrap();
    assert_eq!(up.moving_average.unwrap().trend, Trend::Bullish);
    assert!(up.macd.is_some());
    assert!(up.to_string().contains("LATEST INDICATOR VALUES - UP"));
}

#[test_log::test(tokio::test)]
async fn test_backends_produce_the_same_dashboard() {
    let dir = TestDataDir::new();
    write_trending(&dir, "AAPL", 0.002, 70);
    let tickers = vec!["AAPL".to_string()];

    let library = runner(&dir, MetricsBackend::Statrs).dashboards(&tickers).await;
    let manual = runner(&dir, MetricsBackend::Manual).dashboards(&tickers).await;

    let library = library[0].1.as_ref().unwrap();
    let manual = manual[0].1.as_ref().unwrap();
    assert_eq!(library.metrics.len(), manual.metrics.len());
    for (a, b) in library.metrics.iter().zip(&manual.metrics) {
        assert_eq!(a.label, b.label);
        assert!((a.value - b.value).abs() < 1e-9, "{}: {} vs {}", a.label, a.value, b.value);
    }
}

#[test_log::test(tokio::test)]
async fn test_header_only_file_has_no_dashboard() {
    let dir = TestDataDir::new();
    dir.write_file("EMPTY.csv", "Date,Open,High,Low,Close,Volume\n");

    let dashboards = runner(&dir, MetricsBackend::Statrs)
        .dashboards(&["EMPTY".to_string()])
        .await;
    assert_matches!(&dashboards[0].1, Err(AnalysisError::NoPriceHistory(ticker)) if ticker == "EMPTY");
}
