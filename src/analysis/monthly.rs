//! Monthly aggregates over stored analysis history.

use crate::analysis::aggregator::{process_model_results, SentimentCounts};
use crate::history::HistoryRecord;
use crate::models::ModelType;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Maximum number of topics listed per month.
const TOP_TOPICS: usize = 5;

/// Sentiment summary of every analysis run in one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    /// `YYYY-MM`.
    pub month: String,
    pub analyses: usize,
    pub total_reviews: usize,
    /// Percentages of classified reviews, one decimal.
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
    /// Most mentioned topics, by summed review count.
    pub top_topics: Vec<String>,
}

/// Month key (`YYYY-MM`) of a record.
pub fn month_key(record: &HistoryRecord) -> String {
    record.timestamp.format("%Y-%m").to_string()
}

/// Group records by month, oldest month first.
pub fn group_by_month(records: &[HistoryRecord]) -> BTreeMap<String, Vec<&HistoryRecord>> {
    let mut grouped: BTreeMap<String, Vec<&HistoryRecord>> = BTreeMap::new();

    for record in records {
        grouped.entry(month_key(record)).or_default().push(record);
    }

    grouped
}

/// Summarise the records of `month` as seen by `model`.
///
/// Records from other months are ignored, so the full history can be
/// passed in.
pub fn monthly_summary(month: &str, records: &[HistoryRecord], model: ModelType) -> MonthlySummary {
    summarize(
        month,
        records.iter().filter(|r| month_key(r) == month),
        model,
    )
}

/// One summary per month present in the history, newest month first.
pub fn monthly_breakdown(records: &[HistoryRecord], model: ModelType) -> Vec<MonthlySummary> {
    group_by_month(records)
        .into_iter()
        .rev()
        .map(|(month, group)| summarize(&month, group, model))
        .collect()
}

fn summarize<'a>(
    month: &str,
    records: impl IntoIterator<Item = &'a HistoryRecord>,
    model: ModelType,
) -> MonthlySummary {
    let mut counts = SentimentCounts::default();
    let mut topics: HashMap<&str, u64> = HashMap::new();
    let mut analyses = 0;

    for record in records {
        analyses += 1;

        let view = process_model_results(&record.results, model);
        for review in &view.review_details {
            counts.add(review.sentiment);
        }

        for topic in &record.results.topic_distribution {
            if !topic.name.is_empty() {
                let total = topics.entry(topic.name.as_str()).or_default();
                *total = total.saturating_add(topic.count);
            }
        }
    }

    let mut ranked: Vec<_> = topics.into_iter().collect();
    // Count descending, then name, so equal counts list deterministically.
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.truncate(TOP_TOPICS);

    let total = counts.total();

    MonthlySummary {
        month: month.to_string(),
        analyses,
        total_reviews: total,
        positive: percentage(counts.positive, total),
        neutral: percentage(counts.neutral, total),
        negative: percentage(counts.negative, total),
        top_topics: ranked.into_iter().map(|(name, _)| name.to_string()).collect(),
    }
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ((part as f64 / total as f64) * 1000.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisKind, RawAnalysisPayload};
    use chrono::{TimeZone, Utc};

    fn record(year: i32, month: u32, day: u32) -> HistoryRecord {
        let payload: RawAnalysisPayload =
            serde_json::from_str(include_str!("../../fixtures/payload.json")).unwrap();

        HistoryRecord {
            id: format!("{}-{}-{}", year, month, day),
            user_id: "alice".to_string(),
            product_name: payload.product_name.clone(),
            analysis_type: AnalysisKind::Text,
            timestamp: Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap(),
            results: payload,
        }
    }

    #[test]
    fn test_group_by_month() {
        let records = vec![record(2026, 9, 3), record(2026, 10, 1), record(2026, 10, 18)];
        let grouped = group_by_month(&records);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped.get("2026-10").map(|v| v.len()), Some(2));
        assert_eq!(grouped.get("2026-09").map(|v| v.len()), Some(1));
    }

    #[test]
    fn test_monthly_summary() {
        let records = vec![record(2026, 10, 1), record(2026, 10, 18), record(2026, 9, 3)];
        let summary = monthly_summary("2026-10", &records, ModelType::Pretrained);

        assert_eq!(summary.analyses, 2);
        assert_eq!(summary.total_reviews, 8);
        assert_eq!(summary.positive, 50.0);
        assert_eq!(summary.neutral, 25.0);
        assert_eq!(summary.negative, 25.0);
        assert_eq!(summary.top_topics, vec!["Rasa", "Pengiriman"]);
    }

    #[test]
    fn test_monthly_summary_naive_bayes() {
        let records = vec![record(2026, 10, 1)];
        let summary = monthly_summary("2026-10", &records, ModelType::NaiveBayes);

        assert_eq!(summary.positive, 75.0);
        assert_eq!(summary.negative, 25.0);
        assert_eq!(summary.neutral, 0.0);
    }

    #[test]
    fn test_empty_month() {
        let summary = monthly_summary("2020-01", &[record(2026, 10, 1)], ModelType::Pretrained);
        assert_eq!(summary.analyses, 0);
        assert_eq!(summary.total_reviews, 0);
        assert_eq!(summary.positive, 0.0);
        assert!(summary.top_topics.is_empty());
    }

    #[test]
    fn test_huge_topic_counts_saturate() {
        let mut first = record(2026, 10, 1);
        let mut second = record(2026, 10, 2);
        for rec in [&mut first, &mut second] {
            rec.results.topic_distribution = serde_json::from_value(serde_json::json!([
                {"name": "Rasa", "count": 1e20},
                {"name": "Harga", "count": 5}
            ]))
            .unwrap();
        }

        let summary = monthly_summary("2026-10", &[first, second], ModelType::Pretrained);
        assert_eq!(summary.top_topics, vec!["Rasa", "Harga"]);
    }

    #[test]
    fn test_breakdown_matches_single_month_summaries() {
        let records = vec![record(2026, 9, 3), record(2026, 10, 1), record(2026, 10, 18)];
        let breakdown = monthly_breakdown(&records, ModelType::NaiveBayes);

        assert_eq!(breakdown[0], monthly_summary("2026-10", &records, ModelType::NaiveBayes));
        assert_eq!(breakdown[1], monthly_summary("2026-09", &records, ModelType::NaiveBayes));
        assert_eq!(breakdown[0].analyses, 2);
    }

    #[test]
    fn test_monthly_breakdown_newest_first() {
        let records = vec![record(2026, 8, 3), record(2026, 10, 1)];
        let breakdown = monthly_breakdown(&records, ModelType::Pretrained);

        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].month, "2026-10");
        assert_eq!(breakdown[1].month, "2026-08");
    }
}
