//! Headline polarity scoring.
//!
//! The scorer is a seam: [`VaderScorer`] wraps the VADER lexicon, tests and
//! callers with their own model plug in through [`SentimentScorer`].

use tracing::{debug, info};
use vader_sentiment::SentimentIntensityAnalyzer;

use crate::models::NewsItem;

/// Produces a polarity score in [-1, 1] for a piece of text
pub trait SentimentScorer: Send + Sync {
    fn polarity(&self, text: &str) -> f64;
}

/// VADER compound score of a headline
pub struct VaderScorer {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl VaderScorer {
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }
}

impl Default for VaderScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentScorer for VaderScorer {
    fn polarity(&self, text: &str) -> f64 {
        if text.trim().is_empty() {
            return 0.0;
        }

        let scores = self.analyzer.polarity_scores(text);
        scores
            .get("compound")
            .copied()
            .unwrap_or(0.0)
            .clamp(-1.0, 1.0)
    }
}

/// Attach sentiment to every unscored item; already scored items pass through
pub fn score_news<S>(scorer: &S, items: Vec<NewsItem>) -> Vec<NewsItem>
where
    S: SentimentScorer + ?Sized,
{
    let total = items.len();
    let mut scored = 0;

    let items: Vec<NewsItem> = items
        .into_iter()
        .map(|item| {
            if item.sentiment.is_some() {
                return item;
            }
            scored += 1;
            let score = scorer.polarity(&item.headline);
            debug!("Scored {:+.3}: {}", score, item.headline);
            item.with_sentiment(score)
        })
        .collect();

    info!("🧠 Scored {} of {} headlines", scored, total);
    items
}
