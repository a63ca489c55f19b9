//! Result aggregation for the two sentiment models.
//!
//! This module turns one analysis payload into per-model views ready for
//! charts and tables, plus the comparison tables shown side by side.
//! Everything here is a pure transformation: the same payload always
//! yields the same views, and missing data resolves to defaults.

use crate::models::{
    AccuracyEntry, ComparisonSummary, LabelShares, ModelResultView, ModelType, Prediction,
    ProcessingTimeEntry, RawAnalysisPayload, RawReview, ResultsBundle, ReviewView,
    SentimentLabel,
};

/// Build the view of one model over the payload.
pub fn process_model_results(payload: &RawAnalysisPayload, model: ModelType) -> ModelResultView {
    let processing_time = payload
        .processing_time
        .for_model(model)
        .map(|t| t.trim_start_matches('-').to_string())
        .unwrap_or_default();

    ModelResultView {
        model,
        product_name: payload.product_name.clone(),
        analysis_date: payload.analysis_date.clone(),
        total_reviews: payload.total_reviews,
        processing_time,
        accuracy: model.accuracy(),
        sentiment_distribution: payload.sentiment_distribution.for_model(model),
        top_keywords: payload.top_keywords.clone(),
        topic_distribution: payload.topic_distribution.clone(),
        summary: payload.summary_text(),
        review_details: payload
            .review_details
            .iter()
            .map(|review| review_view(review, model))
            .collect(),
    }
}

/// Derive the display sentiment of one review for one model.
pub fn review_view(review: &RawReview, model: ModelType) -> ReviewView {
    let (label, score) = top_prediction(review.predictions(model));
    let sentiment = SentimentLabel::from_label(label);

    ReviewView {
        review: review.clone(),
        sentiment,
        confidence: score.clamp(0.0, 1.0),
        color: sentiment.color().to_string(),
    }
}

/// Pick the prediction with the highest score.
///
/// The running maximum starts at the sentinel `("", 0.0)` and is only
/// replaced by a strictly greater score, so the first of several equal
/// maxima wins and an empty (or all-zero) set yields the sentinel.
pub fn top_prediction(predictions: &[Prediction]) -> (&str, f64) {
    predictions
        .iter()
        .fold(("", 0.0), |(label, score), cur| {
            if cur.score > score {
                (cur.label.as_str(), cur.score)
            } else {
                (label, score)
            }
        })
}

/// Parse a processing time such as `"-2.3s"` into absolute seconds.
///
/// Unparseable or missing values read as 0.
pub fn parse_seconds(text: &str) -> f64 {
    let trimmed = text.trim();
    let number = trimmed.strip_suffix('s').unwrap_or(trimmed).trim();

    if number.is_empty() {
        return 0.0;
    }

    number
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(f64::abs)
        .unwrap_or(0.0)
}

/// Build the accuracy and processing time comparison tables.
pub fn build_comparison(
    pretrained: &ModelResultView,
    naive_bayes: &ModelResultView,
) -> ComparisonSummary {
    let views = [pretrained, naive_bayes];

    ComparisonSummary {
        accuracy_comparison: views
            .iter()
            .map(|view| AccuracyEntry {
                model: view.model.display_name().to_string(),
                accuracy: view.accuracy,
            })
            .collect(),
        processing_time_comparison: views
            .iter()
            .map(|view| ProcessingTimeEntry {
                name: view.model.chart_name().to_string(),
                time: parse_seconds(&view.processing_time),
                color: view.model.chart_color().to_string(),
            })
            .collect(),
    }
}

/// Build both model views, the comparison and the shared summary.
pub fn build_results(payload: &RawAnalysisPayload) -> ResultsBundle {
    let pretrained = process_model_results(payload, ModelType::Pretrained);
    let naivebayes = process_model_results(payload, ModelType::NaiveBayes);
    let comparison = build_comparison(&pretrained, &naivebayes);

    ResultsBundle {
        pretrained,
        naivebayes,
        summary: payload.summary_text(),
        comparison,
    }
}

/// Label with the largest share; the first label (in order) wins ties.
pub fn dominant_sentiment(shares: &LabelShares) -> Option<(&str, f64)> {
    shares.iter().fold(None, |best, (label, pct)| match best {
        Some((_, best_pct)) if *pct <= best_pct => best,
        _ => Some((label.as_str(), *pct)),
    })
}

/// Review counts per display sentiment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SentimentCounts {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

impl SentimentCounts {
    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }

    pub fn add(&mut self, sentiment: SentimentLabel) {
        match sentiment {
            SentimentLabel::Positive => self.positive += 1,
            SentimentLabel::Negative => self.negative += 1,
            SentimentLabel::Neutral => self.neutral += 1,
        }
    }
}

/// Count reviews by their display sentiment.
pub fn sentiment_counts(reviews: &[ReviewView]) -> SentimentCounts {
    let mut counts = SentimentCounts::default();
    for review in reviews {
        counts.add(review.sentiment);
    }
    counts
}

/// One page of reviews.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a> {
    pub items: &'a [ReviewView],
    /// 1-based page number actually shown.
    pub page: usize,
    pub total_pages: usize,
    /// Index of the first item on this page within the full list.
    pub offset: usize,
}

/// Slice out one page of reviews.
///
/// `page` is clamped into the valid range and a `per_page` of 0 is
/// treated as 1. There is always at least one (possibly empty) page.
pub fn paginate(reviews: &[ReviewView], page: usize, per_page: usize) -> Page<'_> {
    let per_page = per_page.max(1);
    let total_pages = reviews.len().div_ceil(per_page).max(1);
    let page = page.clamp(1, total_pages);
    let offset = (page - 1) * per_page;
    let end = (offset + per_page).min(reviews.len());

    Page {
        items: &reviews[offset.min(end)..end],
        page,
        total_pages,
        offset,
    }
}
