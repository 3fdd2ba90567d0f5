use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rust_stocks_sentiment::{
    calendar::FallbackPolicy,
    metrics::MetricsBackend,
    models::{parse_ticker_list, Config},
    sentiment::VaderScorer,
    AnalysisRunner,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "News sentiment vs. stock returns", long_about = None)]
struct Cli {
    /// Directory holding one <TICKER>.csv price file per ticker
    #[arg(long, global = true)]
    data_dir: Option<String>,

    /// Comma separated tickers, e.g. AAPL,MSFT
    #[arg(long, global = true)]
    tickers: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Correlate headline sentiment with next-trading-day returns
    Correlate {
        /// News CSV with headline and date columns
        #[arg(long)]
        news: Option<String>,

        /// What to do with news published after the last trading day
        #[arg(long, value_parser = parse_policy)]
        unmapped_news: Option<FallbackPolicy>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the latest indicators and risk metrics per ticker
    Dashboard {
        /// statrs or manual
        #[arg(long, value_parser = parse_backend)]
        backend: Option<MetricsBackend>,
    },
}

fn parse_policy(value: &str) -> std::result::Result<FallbackPolicy, String> {
    value.parse().map_err(|e| format!("{}", e))
}

fn parse_backend(value: &str) -> std::result::Result<MetricsBackend, String> {
    value.parse().map_err(|e| format!("{}", e))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rust_stocks_sentiment=info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("❌ Configuration Error: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(list) = cli.tickers {
        let tickers = parse_ticker_list(&list);
        if tickers.is_empty() {
            anyhow::bail!("--tickers must name at least one ticker");
        }
        config.tickers = tickers;
    }

    match cli.command {
        Command::Correlate { news, unmapped_news, json } => {
            if let Some(path) = news {
                config.news_path = path;
            }
            if let Some(policy) = unmapped_news {
                config.unmapped_news = policy;
            }
            run_correlate(&config, json).await
        }
        Command::Dashboard { backend } => {
            if let Some(backend) = backend {
                config.metrics_backend = backend;
            }
            run_dashboard(&config).await
        }
    }
}

async fn run_correlate(config: &Config, json: bool) -> Result<()> {
    info!("🚀 Starting sentiment correlation for {}", config.tickers.join(", "));

    let runner = AnalysisRunner::new(config, Arc::new(VaderScorer::new()));
    let news = runner.loader().load_news(&config.news_path)?;
    let report = runner.correlate_tickers(news, &config.tickers).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!("📊 SENTIMENT / RETURN CORRELATION");
    println!("=================================");
    for correlation in report.succeeded() {
        let result = &correlation.result;
        let marker = if result.is_significant(0.05) { "✅" } else { "➖" };
        println!(
            "{} {:<6} r = {:+.4}  p = {:.4}  n = {:<4} ({} headlines)",
            marker, correlation.ticker, result.coefficient, result.p_value, result.sample_size, correlation.news_items
        );
    }
    for (ticker, e) in report.failed() {
        println!("❌ {:<6} {}", ticker, e);
    }

    if report.succeeded().next().is_none() {
        anyhow::bail!("no ticker produced a correlation");
    }
    Ok(())
}

async fn run_dashboard(config: &Config) -> Result<()> {
    info!("🚀 Building dashboards with the {} backend", config.metrics_backend);

    let runner = AnalysisRunner::new(config, Arc::new(VaderScorer::new()));
    let mut failures = 0;
    for (ticker, summary) in runner.dashboards(&config.tickers).await {
        match summary {
            Ok(summary) => println!("\n{}", summary),
            Err(e) => {
                failures += 1;
                eprintln!("❌ {}: {}", ticker, e);
            }
        }
    }

    if failures == config.tickers.len() {
        anyhow::bail!("no dashboard could be built");
    }
    Ok(())
}
