//! Data models for sentiment analysis results.
//!
//! This module contains the payload shapes returned by the analysis API
//! (and replayed from history) as well as the per-model views derived
//! from them for charts, tables and exports.
//!
//! Every payload field is optional on the wire. Absent, `null` or
//! wrongly-shaped values resolve to their documented defaults at
//! deserialization time, so the rest of the crate works with plain
//! values and never chains optional lookups.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Summary text used when the payload carries none.
pub const DEFAULT_SUMMARY: &str = "Sentiment analysis has been completed.";

/// Label → percentage breakdown for one model over a whole run.
pub type LabelShares = BTreeMap<String, f64>;

/// Model name → predictions, as nested under `transformer` or `ml`.
pub type ModelOutputs = BTreeMap<String, PredictionSet>;

/// The two classifiers the analysis API runs on every review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    /// Three-class transformer model ("IndoBERT").
    Pretrained,
    /// Two-class probabilistic model ("NaiveBayes").
    NaiveBayes,
}

impl ModelType {
    /// Both models, in display order.
    pub const ALL: [ModelType; 2] = [ModelType::Pretrained, ModelType::NaiveBayes];

    /// Fixed accuracy figure shown for the model.
    ///
    /// The payload carries no ground-truth labels, so this is a constant
    /// rather than a measured value.
    pub fn accuracy(&self) -> u32 {
        match self {
            ModelType::Pretrained => 92,
            ModelType::NaiveBayes => 94,
        }
    }

    /// Key of the concrete model inside its family.
    pub fn model_key(&self) -> &'static str {
        match self {
            ModelType::Pretrained => "IndoBERT",
            ModelType::NaiveBayes => "NaiveBayes",
        }
    }

    /// Name used in the accuracy comparison.
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelType::Pretrained => "Pre-trained",
            ModelType::NaiveBayes => "Naive Bayes",
        }
    }

    /// Name used in the processing time comparison.
    pub fn chart_name(&self) -> &'static str {
        match self {
            ModelType::Pretrained => "Pre-trained Model",
            ModelType::NaiveBayes => "Naive Bayes",
        }
    }

    /// Chart color for the model.
    pub fn chart_color(&self) -> &'static str {
        match self {
            ModelType::Pretrained => "#3B82F6",
            ModelType::NaiveBayes => "#8B5CF6",
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.chart_name())
    }
}

/// Display sentiment of a single review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    /// Map a raw model label through the fixed vocabulary.
    ///
    /// Only the exact lowercase labels are recognised; anything else,
    /// including the empty label, is `Neutral`.
    pub fn from_label(label: &str) -> Self {
        match label {
            "positive" => SentimentLabel::Positive,
            "negative" => SentimentLabel::Negative,
            _ => SentimentLabel::Neutral,
        }
    }

    /// Chart color for the label.
    pub fn color(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "#10B981",
            SentimentLabel::Negative => "#EF4444",
            SentimentLabel::Neutral => "#6B7280",
        }
    }

    /// Returns an emoji representation of the label.
    pub fn emoji(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "🟢",
            SentimentLabel::Negative => "🔴",
            SentimentLabel::Neutral => "⚪",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentimentLabel::Positive => write!(f, "Positive"),
            SentimentLabel::Negative => write!(f, "Negative"),
            SentimentLabel::Neutral => write!(f, "Neutral"),
        }
    }
}

/// How an analysis was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    /// Pasted or listed texts.
    Text,
    /// Uploaded CSV/Excel file.
    File,
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisKind::Text => write!(f, "text"),
            AnalysisKind::File => write!(f, "file"),
        }
    }
}

/// One label/score pair produced by a model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(default, deserialize_with = "lenient")]
    pub label: String,
    /// Numeric strings are accepted; anything unparseable reads as 0.
    #[serde(default, deserialize_with = "lenient_number")]
    pub score: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
impl Prediction {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
            extra: Map::new(),
        }
    }
}

/// All predictions of one model for one review.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionSet {
    /// A malformed entry reads as an empty, zero-score prediction.
    #[serde(default, deserialize_with = "lenient_seq")]
    pub predictions: Vec<Prediction>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
impl PredictionSet {
    pub fn new(predictions: Vec<Prediction>) -> Self {
        Self {
            predictions,
            extra: Map::new(),
        }
    }
}

/// A single review as returned by the analysis API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReview {
    #[serde(default, deserialize_with = "lenient")]
    pub text: String,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub transformer: Option<ModelOutputs>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub ml: Option<ModelOutputs>,
    /// Extracted keywords, kept exactly as received.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Value>,
    /// Topics as received; a missing or falsy value reads as `[]`.
    #[serde(default = "empty_list", deserialize_with = "list_or_value")]
    pub topics: Value,
    /// Any other fields the API attached.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for RawReview {
    fn default() -> Self {
        Self {
            text: String::new(),
            transformer: None,
            ml: None,
            keywords: None,
            topics: empty_list(),
            extra: Map::new(),
        }
    }
}

impl RawReview {
    /// Predictions of the given model, empty when absent.
    pub fn predictions(&self, model: ModelType) -> &[Prediction] {
        let family = match model {
            ModelType::Pretrained => self.transformer.as_ref(),
            ModelType::NaiveBayes => self.ml.as_ref(),
        };

        family
            .and_then(|outputs| outputs.get(model.model_key()))
            .map(|set| set.predictions.as_slice())
            .unwrap_or(&[])
    }
}

/// Elapsed time per model family, e.g. `"-2.3s"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingTime {
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub transformer: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub naive_bayes: Option<String>,
}

impl ProcessingTime {
    pub fn for_model(&self, model: ModelType) -> Option<&str> {
        match model {
            ModelType::Pretrained => self.transformer.as_deref(),
            ModelType::NaiveBayes => self.naive_bayes.as_deref(),
        }
    }
}

/// Run-level sentiment breakdown per model family.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentDistribution {
    #[serde(default, deserialize_with = "lenient_model_shares")]
    pub transformer: BTreeMap<String, LabelShares>,
    #[serde(default, deserialize_with = "lenient_model_shares")]
    pub ml: BTreeMap<String, LabelShares>,
}

impl SentimentDistribution {
    /// Breakdown for the given model, empty when absent.
    pub fn for_model(&self, model: ModelType) -> LabelShares {
        let family = match model {
            ModelType::Pretrained => &self.transformer,
            ModelType::NaiveBayes => &self.ml,
        };
        family.get(model.model_key()).cloned().unwrap_or_default()
    }
}

/// A keyword and its weight across the run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    #[serde(default, deserialize_with = "lenient")]
    pub text: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub value: f64,
}

/// A topic, its weight and how many reviews mention it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    #[serde(default, deserialize_with = "lenient")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub value: f64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub count: u64,
}

/// The full analysis API response for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAnalysisPayload {
    #[serde(default, deserialize_with = "lenient")]
    pub product_name: String,
    #[serde(default, deserialize_with = "lenient")]
    pub analysis_date: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_reviews: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub processing_time: ProcessingTime,
    #[serde(default, deserialize_with = "lenient_text", skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(
        default,
        rename = "overall_summary",
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub overall_summary: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub sentiment_distribution: SentimentDistribution,
    #[serde(default, deserialize_with = "lenient_seq_skip")]
    pub top_keywords: Vec<Keyword>,
    #[serde(default, deserialize_with = "lenient_seq_skip")]
    pub topic_distribution: Vec<Topic>,
    /// A malformed review keeps its position as an empty review.
    #[serde(default, deserialize_with = "lenient_seq")]
    pub review_details: Vec<RawReview>,
}

impl RawAnalysisPayload {
    /// The synopsis shared by both models.
    pub fn summary_text(&self) -> String {
        [self.summary.as_deref(), self.overall_summary.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_SUMMARY)
            .to_string()
    }
}

/// A review enriched with the winning prediction of one model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewView {
    #[serde(flatten)]
    pub review: RawReview,
    pub sentiment: SentimentLabel,
    pub confidence: f64,
    pub color: String,
}

/// Chart- and table-ready results for one model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelResultView {
    pub model: ModelType,
    pub product_name: String,
    pub analysis_date: String,
    pub total_reviews: u64,
    pub processing_time: String,
    pub accuracy: u32,
    pub sentiment_distribution: LabelShares,
    pub top_keywords: Vec<Keyword>,
    pub topic_distribution: Vec<Topic>,
    pub summary: String,
    pub review_details: Vec<ReviewView>,
}

/// One row of the accuracy comparison chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccuracyEntry {
    pub model: String,
    pub accuracy: u32,
}

/// One bar of the processing time comparison chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingTimeEntry {
    pub name: String,
    pub time: f64,
    pub color: String,
}

/// Side-by-side comparison of both models.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSummary {
    pub accuracy_comparison: Vec<AccuracyEntry>,
    pub processing_time_comparison: Vec<ProcessingTimeEntry>,
}

/// Everything derived from one payload; this is the exported document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsBundle {
    pub pretrained: ModelResultView,
    pub naivebayes: ModelResultView,
    pub summary: String,
    pub comparison: ComparisonSummary,
}

impl ResultsBundle {
    pub fn view(&self, model: ModelType) -> &ModelResultView {
        match model {
            ModelType::Pretrained => &self.pretrained,
            ModelType::NaiveBayes => &self.naivebayes,
        }
    }
}

/// Coerce a JSON number or numeric string to a finite `f64`, else 0.
pub fn coerce_number(value: &Value) -> f64 {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite()).unwrap_or(0.0)
}

pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

pub(crate) fn lenient_seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_items(value, false))
}

pub(crate) fn lenient_seq_skip<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_items(value, true))
}

/// Elements of a JSON list, each parsed on its own. Elements that fail to
/// parse are dropped when `skip_invalid` is set, defaulted otherwise. A
/// non-list value is an empty list.
fn lenient_items<T>(value: Value, skip_invalid: bool) -> Vec<T>
where
    T: DeserializeOwned + Default,
{
    let Value::Array(items) = value else {
        return Vec::new();
    };

    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(parsed) => Some(parsed),
            Err(_) if skip_invalid => None,
            Err(_) => Some(T::default()),
        })
        .collect()
}

fn empty_list() -> Value {
    Value::Array(Vec::new())
}

/// Keep any truthy value; `null`, `false`, `0` and `""` become `[]`.
fn list_or_value<'de, D>(deserializer: D) -> Result<Value, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let falsy = match &value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    };
    Ok(if falsy { empty_list() } else { value })
}

pub(crate) fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_number(&value))
}

pub(crate) fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_number(&value).max(0.0) as u64)
}

pub(crate) fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

pub(crate) fn lenient_model_shares<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, LabelShares>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Object(models) = value else {
        return Ok(BTreeMap::new());
    };

    Ok(models
        .into_iter()
        .filter_map(|(model, shares)| match shares {
            Value::Object(shares) => Some((
                model,
                shares
                    .iter()
                    .map(|(label, pct)| (label.clone(), coerce_number(pct)))
                    .collect(),
            )),
            _ => None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sentiment_label_mapping() {
        assert_eq!(SentimentLabel::from_label("positive"), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_label("negative"), SentimentLabel::Negative);
        assert_eq!(SentimentLabel::from_label("neutral"), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_label(""), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_label("Positive"), SentimentLabel::Neutral);
    }

    #[test]
    fn test_sentiment_colors() {
        assert_eq!(SentimentLabel::Positive.color(), "#10B981");
        assert_eq!(SentimentLabel::Negative.color(), "#EF4444");
        assert_eq!(SentimentLabel::Neutral.color(), "#6B7280");
    }

    #[test]
    fn test_model_constants() {
        assert_eq!(ModelType::Pretrained.accuracy(), 92);
        assert_eq!(ModelType::NaiveBayes.accuracy(), 94);
        assert_eq!(ModelType::Pretrained.model_key(), "IndoBERT");
        assert_eq!(
            serde_json::to_value(ModelType::NaiveBayes).unwrap(),
            json!("naivebayes")
        );
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(&json!(0.81)), 0.81);
        assert_eq!(coerce_number(&json!(" 0.5 ")), 0.5);
        assert_eq!(coerce_number(&json!("high")), 0.0);
        assert_eq!(coerce_number(&json!("NaN")), 0.0);
        assert_eq!(coerce_number(&Value::Null), 0.0);
    }

    #[test]
    fn test_payload_defaults_on_missing_fields() {
        let payload: RawAnalysisPayload = serde_json::from_value(json!({
            "productName": "Kopi",
        }))
        .unwrap();

        assert_eq!(payload.product_name, "Kopi");
        assert_eq!(payload.total_reviews, 0);
        assert!(payload.review_details.is_empty());
        assert!(payload.top_keywords.is_empty());
        assert!(payload.topic_distribution.is_empty());
        assert_eq!(payload.summary_text(), DEFAULT_SUMMARY);
    }

    #[test]
    fn test_payload_malformed_fields_fall_back() {
        let payload: RawAnalysisPayload = serde_json::from_value(json!({
            "productName": "Kopi",
            "totalReviews": "12",
            "processingTime": "Selesai",
            "reviewDetails": "not a list",
            "topicDistribution": null,
            "sentimentDistribution": {"transformer": {"IndoBERT": {"positive": "60", "negative": 40}}},
        }))
        .unwrap();

        assert_eq!(payload.total_reviews, 12);
        assert_eq!(payload.processing_time, ProcessingTime::default());
        assert!(payload.review_details.is_empty());
        assert!(payload.topic_distribution.is_empty());

        let shares = payload.sentiment_distribution.for_model(ModelType::Pretrained);
        assert_eq!(shares.get("positive"), Some(&60.0));
        assert_eq!(shares.get("negative"), Some(&40.0));
        assert!(payload
            .sentiment_distribution
            .for_model(ModelType::NaiveBayes)
            .is_empty());
    }

    #[test]
    fn test_summary_prefers_summary_over_overall() {
        let payload: RawAnalysisPayload = serde_json::from_value(json!({
            "summary": "Mostly positive",
            "overall_summary": "ignored",
        }))
        .unwrap();
        assert_eq!(payload.summary_text(), "Mostly positive");

        let payload: RawAnalysisPayload = serde_json::from_value(json!({
            "overall_summary": "From the API",
        }))
        .unwrap();
        assert_eq!(payload.summary_text(), "From the API");
    }

    #[test]
    fn test_bad_review_does_not_discard_the_rest() {
        let payload: RawAnalysisPayload = serde_json::from_value(json!({
            "totalReviews": 3,
            "reviewDetails": [
                {"text": "Enak", "transformer": {"IndoBERT": {"predictions": [{"label": "positive", "score": 0.9}]}}},
                {"text": "Lama", "transformer": {"IndoBERT": {"predictions": [{"label": "negative", "score": 0.8}]}}},
                null
            ],
            "topKeywords": [{"text": "enak", "value": 3}, "oops", {"text": "lama", "value": 1}],
        }))
        .unwrap();

        assert_eq!(payload.review_details.len(), 3);
        assert_eq!(payload.review_details[0].text, "Enak");
        assert_eq!(payload.review_details[1].predictions(ModelType::Pretrained).len(), 1);
        assert_eq!(payload.review_details[2], RawReview::default());

        let keywords: Vec<_> = payload.top_keywords.iter().map(|k| k.text.as_str()).collect();
        assert_eq!(keywords, vec!["enak", "lama"]);
    }

    #[test]
    fn test_bad_prediction_does_not_discard_the_rest() {
        let set: PredictionSet = serde_json::from_value(json!({
            "predictions": [{"label": "negative", "score": 0.95}, null]
        }))
        .unwrap();

        assert_eq!(set.predictions.len(), 2);
        assert_eq!(set.predictions[0].label, "negative");
        assert_eq!(set.predictions[0].score, 0.95);
        assert_eq!(set.predictions[1], Prediction::default());
    }

    #[test]
    fn test_review_topics_kept_unless_falsy() {
        let review: RawReview = serde_json::from_value(json!({"text": "a", "topics": "Rasa"})).unwrap();
        assert_eq!(review.topics, json!("Rasa"));
        assert_eq!(serde_json::to_value(&review).unwrap()["topics"], json!("Rasa"));

        let review: RawReview = serde_json::from_value(json!({"text": "a", "topics": null})).unwrap();
        assert_eq!(review.topics, json!([]));

        let review: RawReview = serde_json::from_value(json!({"text": "a"})).unwrap();
        assert_eq!(review.topics, json!([]));
    }

    #[test]
    fn test_review_preserves_unknown_fields() {
        let review: RawReview = serde_json::from_value(json!({
            "text": "Enak sekali",
            "rating": 5,
            "keywords": [["enak", 0.9]],
            "ml": {"NaiveBayes": {"predictions": [{"label": "positive", "score": "0.7"}]}},
        }))
        .unwrap();

        assert_eq!(review.extra.get("rating"), Some(&json!(5)));
        assert_eq!(review.keywords, Some(json!([["enak", 0.9]])));
        assert_eq!(review.topics, json!([]));
        assert_eq!(review.predictions(ModelType::NaiveBayes)[0].score, 0.7);
        assert!(review.predictions(ModelType::Pretrained).is_empty());

        let back = serde_json::to_value(&review).unwrap();
        assert_eq!(back["rating"], json!(5));
        assert!(back.get("transformer").is_none());
    }
}
