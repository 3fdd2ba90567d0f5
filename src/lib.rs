pub mod analysis;
pub mod calendar;
pub mod correlation;
pub mod dashboard;
pub mod data_loader;
pub mod error;
pub mod indicators;
pub mod metrics;
pub mod models;
pub mod sentiment;

pub use analysis::{AnalysisReport, AnalysisRunner, TickerCorrelation, TickerOutcome};
pub use calendar::{FallbackPolicy, TradingDayIndex};
pub use correlation::correlate;
pub use data_loader::DataLoader;
pub use error::{AnalysisError, InsufficientData, Result};
pub use models::{Config, CorrelationResult, NewsItem, PriceBar, TradingDay};
