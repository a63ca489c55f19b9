//! Markdown report generation and JSON export.
//!
//! This module renders aggregated results, stored history and monthly
//! summaries as Markdown, and serializes the comparison bundle for export.

use crate::analysis::{dominant_sentiment, paginate, sentiment_counts, MonthlySummary};
use crate::history::HistoryRecord;
use crate::models::{ComparisonSummary, ModelResultView, ModelType, ResultsBundle};
use anyhow::Result;

/// Longest review excerpt shown in the review table.
const MAX_EXCERPT_CHARS: usize = 120;

/// What to include in a results report.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Models to render, in order.
    pub models: Vec<ModelType>,
    pub include_reviews: bool,
    /// 1-based page of the review table.
    pub page: usize,
    pub per_page: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            models: ModelType::ALL.to_vec(),
            include_reviews: true,
            page: 1,
            per_page: 10,
        }
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(bundle: &ResultsBundle, options: &ReportOptions) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# Sentiment Analysis Report\n\n");

    // Overview section
    output.push_str(&generate_overview_section(bundle));

    // Table of contents
    output.push_str(&generate_table_of_contents(options));

    // One section per model
    for model in &options.models {
        output.push_str(&generate_model_section(bundle.view(*model), options));
    }

    // Comparison
    if options.models.len() > 1 {
        output.push_str(&generate_comparison_section(&bundle.comparison));
    }

    // Footer
    output.push_str(&generate_footer());

    output
}

/// Generate the overview section.
fn generate_overview_section(bundle: &ResultsBundle) -> String {
    let view = &bundle.pretrained;
    let mut section = String::new();

    section.push_str("## Overview\n\n");
    section.push_str(&format!("- **Product:** {}\n", view.product_name));
    section.push_str(&format!("- **Analysis Date:** {}\n", view.analysis_date));
    section.push_str(&format!("- **Total Reviews:** {}\n", view.total_reviews));
    section.push_str("\n");
    section.push_str(&format!("> {}\n\n", bundle.summary));

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(options: &ReportOptions) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Overview](#overview)\n");

    for model in &options.models {
        toc.push_str(&format!("- [{}](#{})\n", model.chart_name(), anchor(model)));
    }

    if options.models.len() > 1 {
        toc.push_str("- [Model Comparison](#model-comparison)\n");
    }

    toc.push_str("\n");

    toc
}

fn anchor(model: &ModelType) -> String {
    model.chart_name().replace(' ', "-").to_lowercase()
}

/// Generate the section of one model.
fn generate_model_section(view: &ModelResultView, options: &ReportOptions) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", view.model.chart_name()));

    let processing_time = if view.processing_time.is_empty() {
        "n/a"
    } else {
        view.processing_time.as_str()
    };
    section.push_str(&format!("- **Processing Time:** {}\n", processing_time));
    section.push_str(&format!("- **Accuracy:** {}%\n", view.accuracy));
    if let Some((label, pct)) = dominant_sentiment(&view.sentiment_distribution) {
        section.push_str(&format!(
            "- **Dominant Sentiment:** {} ({}% of total)\n",
            label, pct
        ));
    }
    section.push_str("\n");

    // Distribution as reported by the API
    if !view.sentiment_distribution.is_empty() {
        section.push_str("### Sentiment Distribution\n\n");
        section.push_str("| Sentiment | Share |\n");
        section.push_str("|:---|:---:|\n");
        for (label, pct) in &view.sentiment_distribution {
            section.push_str(&format!("| {} | {}% |\n", label, pct));
        }
        section.push_str("\n");
    }

    // Per-review counts as derived here
    let counts = sentiment_counts(&view.review_details);
    if counts.total() > 0 {
        section.push_str("### Review Classification\n\n");
        section.push_str("| 🟢 Positive | ⚪ Neutral | 🔴 Negative | **Total** |\n");
        section.push_str("|:---:|:---:|:---:|:---:|\n");
        section.push_str(&format!(
            "| {} | {} | {} | **{}** |\n\n",
            counts.positive,
            counts.neutral,
            counts.negative,
            counts.total()
        ));
    }

    if !view.top_keywords.is_empty() {
        section.push_str("### Top Keywords\n\n");
        section.push_str("| Keyword | Weight |\n");
        section.push_str("|:---|:---:|\n");
        for keyword in &view.top_keywords {
            section.push_str(&format!("| {} | {} |\n", cell(&keyword.text), keyword.value));
        }
        section.push_str("\n");
    }

    if !view.topic_distribution.is_empty() {
        section.push_str("### Topics\n\n");
        section.push_str("| Topic | Share | Reviews |\n");
        section.push_str("|:---|:---:|:---:|\n");
        for topic in &view.topic_distribution {
            section.push_str(&format!(
                "| {} | {} | {} |\n",
                cell(&topic.name),
                topic.value,
                topic.count
            ));
        }
        section.push_str("\n");
    }

    if options.include_reviews {
        section.push_str(&generate_reviews_table(view, options));
    }

    section
}

/// Generate one page of the review table.
fn generate_reviews_table(view: &ModelResultView, options: &ReportOptions) -> String {
    let mut section = String::new();

    section.push_str("### Reviews\n\n");

    if view.review_details.is_empty() {
        section.push_str("No reviews in this analysis.\n\n");
        return section;
    }

    let page = paginate(&view.review_details, options.page, options.per_page);
    section.push_str(&format!(
        "*Page {} of {} ({} reviews)*\n\n",
        page.page,
        page.total_pages,
        view.review_details.len()
    ));
    section.push_str("| # | Sentiment | Confidence | Review |\n");
    section.push_str("|:---:|:---|:---:|:---|\n");

    for (i, review) in page.items.iter().enumerate() {
        section.push_str(&format!(
            "| {} | {} {} | {:.0}% | {} |\n",
            page.offset + i + 1,
            review.sentiment.emoji(),
            review.sentiment,
            review.confidence * 100.0,
            excerpt(&review.review.text)
        ));
    }
    section.push_str("\n");

    section
}

/// Single-line, table-safe excerpt of a review.
fn excerpt(text: &str) -> String {
    let flat = flatten(text);
    let mut short: String = flat.chars().take(MAX_EXCERPT_CHARS).collect();
    if flat.chars().count() > MAX_EXCERPT_CHARS {
        short.push('…');
    }
    short.replace('|', "\\|")
}

/// Text made safe for a single Markdown table cell.
fn cell(text: &str) -> String {
    flatten(text).replace('|', "\\|")
}

fn flatten(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Generate the model comparison section.
fn generate_comparison_section(comparison: &ComparisonSummary) -> String {
    let mut section = String::new();

    section.push_str("## Model Comparison\n\n");

    section.push_str("### Accuracy\n\n");
    section.push_str("| Model | Accuracy |\n");
    section.push_str("|:---|:---:|\n");
    for entry in &comparison.accuracy_comparison {
        section.push_str(&format!("| {} | {}% |\n", entry.model, entry.accuracy));
    }
    section.push_str("\n");

    section.push_str("### Processing Time\n\n");
    section.push_str("| Model | Seconds |\n");
    section.push_str("|:---|:---:|\n");
    for entry in &comparison.processing_time_comparison {
        section.push_str(&format!("| {} | {} |\n", entry.name, entry.time));
    }
    section.push_str("\n");

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by Sentiview*\n");

    footer
}

/// Generate a JSON export of the comparison bundle.
pub fn generate_json_report(bundle: &ResultsBundle) -> Result<String> {
    serde_json::to_string_pretty(bundle).map_err(Into::into)
}

/// Default export file name: `analysis-comparison-{product}-{date}.json`.
///
/// Characters outside `[A-Za-z0-9_-]` in the product name become `-`.
pub fn export_file_name(product_name: &str, date: chrono::NaiveDate) -> String {
    let product: String = product_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();

    format!(
        "analysis-comparison-{}-{}.json",
        product,
        date.format("%Y-%m-%d")
    )
}

/// Generate the history listing.
pub fn generate_history_table(records: &[HistoryRecord]) -> String {
    let mut output = String::new();

    output.push_str("# Analysis History\n\n");

    if records.is_empty() {
        output.push_str("No analyses stored yet.\n");
        return output;
    }

    output.push_str("| Id | Product | Date | Type | Reviews |\n");
    output.push_str("|:---|:---|:---|:---:|:---:|\n");

    for record in records {
        output.push_str(&format!(
            "| `{}` | {} | {} | {} | {} |\n",
            record.id,
            cell(&record.product_name),
            record.timestamp.format("%Y-%m-%d %H:%M"),
            record.analysis_type,
            record.results.total_reviews
        ));
    }

    output
}

/// Generate the monthly summary report.
pub fn generate_monthly_report(model: ModelType, summaries: &[MonthlySummary]) -> String {
    let mut output = String::new();

    output.push_str(&format!("# Monthly Report ({})\n\n", model.chart_name()));

    if summaries.iter().all(|s| s.analyses == 0) {
        output.push_str("No analyses in the selected period.\n\n");
        return output;
    }

    for summary in summaries {
        output.push_str(&format!("## {}\n\n", summary.month));
        output.push_str(&format!("- **Analyses:** {}\n", summary.analyses));
        output.push_str(&format!("- **Reviews:** {}\n", summary.total_reviews));
        output.push_str(&format!("- **Positive:** {}%\n", summary.positive));
        output.push_str(&format!("- **Neutral:** {}%\n", summary.neutral));
        output.push_str(&format!("- **Negative:** {}%\n", summary.negative));

        if !summary.top_topics.is_empty() {
            output.push_str(&format!(
                "- **Top Topics:** {}\n",
                summary.top_topics.join(", ")
            ));
        }
        output.push_str("\n");
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::build_results;
    use crate::models::{AnalysisKind, RawAnalysisPayload};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn fixture_payload() -> RawAnalysisPayload {
        serde_json::from_str(include_str!("../../fixtures/payload.json")).unwrap()
    }

    fn fixture_bundle() -> ResultsBundle {
        build_results(&fixture_payload())
    }

    #[test]
    fn test_generate_markdown_report() {
        let markdown = generate_markdown_report(&fixture_bundle(), &ReportOptions::default());

        assert!(markdown.contains("# Sentiment Analysis Report"));
        assert!(markdown.contains("Kopi Susu Gula Aren"));
        assert!(markdown.contains("## Pre-trained Model"));
        assert!(markdown.contains("## Naive Bayes"));
        assert!(markdown.contains("## Model Comparison"));
        assert!(markdown.contains("| Pre-trained Model | 2.3 |"));
        assert!(markdown.contains("- **Accuracy:** 94%"));
        assert!(markdown.contains("Most customers praise the taste"));
    }

    #[test]
    fn test_single_model_report_skips_comparison() {
        let options = ReportOptions {
            models: vec![ModelType::NaiveBayes],
            ..ReportOptions::default()
        };
        let markdown = generate_markdown_report(&fixture_bundle(), &options);

        assert!(markdown.contains("## Naive Bayes"));
        assert!(!markdown.contains("## Pre-trained Model"));
        assert!(!markdown.contains("## Model Comparison"));
        assert!(markdown.contains("- **Dominant Sentiment:** positive (75% of total)"));
    }

    #[test]
    fn test_review_table_pagination() {
        let options = ReportOptions {
            models: vec![ModelType::Pretrained],
            page: 2,
            per_page: 3,
            ..ReportOptions::default()
        };
        let markdown = generate_markdown_report(&fixture_bundle(), &options);

        assert!(markdown.contains("*Page 2 of 2 (4 reviews)*"));
        assert!(markdown.contains("| 4 | 🟢 Positive | 71% |"));
        assert!(!markdown.contains("Kopinya enak banget"));
    }

    #[test]
    fn test_reviews_can_be_left_out() {
        let options = ReportOptions {
            include_reviews: false,
            ..ReportOptions::default()
        };
        let markdown = generate_markdown_report(&fixture_bundle(), &options);
        assert!(!markdown.contains("### Reviews"));
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("a |  b\nc"), "a \\| b c");
        let long = "x".repeat(200);
        assert_eq!(excerpt(&long).chars().count(), MAX_EXCERPT_CHARS + 1);
    }

    #[test]
    fn test_table_cells_are_escaped() {
        let mut payload = fixture_payload();
        payload.top_keywords[0].text = "enak|banget".to_string();
        payload.topic_distribution[0].name = "Rasa | Aroma".to_string();

        let markdown = generate_markdown_report(&build_results(&payload), &ReportOptions::default());
        assert!(markdown.contains("| enak\\|banget | 12 |"));
        assert!(markdown.contains("| Rasa \\| Aroma | 60 | 3 |"));

        let record = HistoryRecord {
            id: "2026-10-19T09_15_42_000Z".to_string(),
            user_id: "alice".to_string(),
            product_name: "Kopi | Susu".to_string(),
            analysis_type: AnalysisKind::Text,
            timestamp: Utc.with_ymd_and_hms(2026, 10, 19, 9, 15, 42).unwrap(),
            results: payload,
        };
        let table = generate_history_table(&[record]);
        assert!(table.contains("| Kopi \\| Susu |"));
    }

    #[test]
    fn test_generate_json_report() {
        let json = generate_json_report(&fixture_bundle()).unwrap();

        assert!(json.contains("\"pretrained\""));
        assert!(json.contains("\"naivebayes\""));
        assert!(json.contains("\"accuracyComparison\""));
        assert!(json.contains("\"processingTimeComparison\""));
        assert!(json.contains("\"reviewDetails\""));
        assert!(json.contains("\"rating\": 5"));
    }

    #[test]
    fn test_export_file_name() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(
            export_file_name("Kopi Susu/Gula", date),
            "analysis-comparison-Kopi-Susu-Gula-2026-10-19.json"
        );
    }

    #[test]
    fn test_generate_history_table() {
        let record = HistoryRecord {
            id: "2026-10-19T09_15_42_000Z".to_string(),
            user_id: "alice".to_string(),
            product_name: "Kopi".to_string(),
            analysis_type: AnalysisKind::File,
            timestamp: Utc.with_ymd_and_hms(2026, 10, 19, 9, 15, 42).unwrap(),
            results: fixture_payload(),
        };

        let table = generate_history_table(&[record]);
        assert!(table.contains("| `2026-10-19T09_15_42_000Z` | Kopi | 2026-10-19 09:15 | file | 4 |"));
        assert!(generate_history_table(&[]).contains("No analyses stored yet."));
    }

    #[test]
    fn test_generate_monthly_report() {
        let summary = MonthlySummary {
            month: "2026-10".to_string(),
            analyses: 2,
            total_reviews: 8,
            positive: 50.0,
            neutral: 25.0,
            negative: 25.0,
            top_topics: vec!["Rasa".to_string()],
        };

        let report = generate_monthly_report(ModelType::Pretrained, &[summary]);
        assert!(report.contains("## 2026-10"));
        assert!(report.contains("- **Positive:** 50%"));
        assert!(report.contains("- **Top Topics:** Rasa"));
    }
}
