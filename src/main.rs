//! Sentiview - product review sentiment analysis from the command line
//!
//! Submits reviews to the sentiment analysis API, which scores them with a
//! pre-trained transformer (IndoBERT) and a Naive Bayes classifier, and
//! renders per-model results and a comparison of the two.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (API failure, bad input, unreadable history, etc.)

mod analysis;
mod api;
mod cli;
mod config;
mod history;
mod models;
mod report;

use anyhow::{anyhow, bail, Context, Result};
use api::{split_texts, AnalysisClient, ClientConfig, SessionAuth};
use chrono::Local;
use cli::{
    AnalyzeArgs, Args, Command, HistoryCommand, ModelChoice, MonthlyArgs, OutputFormat, RenderArgs,
    ShowArgs,
};
use config::{Config, CONFIG_FILE};
use history::HistoryStore;
use indicatif::{ProgressBar, ProgressStyle};
use models::{AnalysisKind, ModelType, RawAnalysisPayload};
use report::ReportOptions;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Load configuration before logging, it can raise the log level
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(args.log_level(config.general.verbose));

    info!("Sentiview v{}", env!("CARGO_PKG_VERSION"));
    debug!("Command: {:?}", args.command);
    debug!("Configuration: {:?}", config);

    match run(args, config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .sentiview.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize the API endpoint, history location, and report layout.");
    Ok(())
}

/// Initialize logging. `RUST_LOG` wins over the verbosity settings.
fn init_logging(level: tracing::Level) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Dispatch the chosen command.
async fn run(args: Args, config: Config) -> Result<()> {
    let store = HistoryStore::new(&config.history.dir);
    debug!("History store at {}", store.root().display());

    let Some(command) = args.command.clone() else {
        return Ok(());
    };

    match command {
        Command::Analyze(analyze) => run_analyze(&args, &config, &store, &analyze).await,
        Command::Show(show) => run_show(&config, &store, &show),
        Command::History(HistoryCommand::List) => run_history_list(&config, &store),
        Command::History(HistoryCommand::Delete { id }) => run_history_delete(&config, &store, &id),
        Command::Monthly(monthly) => run_monthly(&config, &store, &monthly),
    }
}

/// Submit reviews, store the run and render the results.
async fn run_analyze(
    args: &Args,
    config: &Config,
    store: &HistoryStore,
    analyze: &AnalyzeArgs,
) -> Result<()> {
    let client_config = ClientConfig {
        base_url: config.api.base_url.clone(),
        token_endpoint: config.api.token_endpoint.clone(),
        timeout_seconds: config.api.timeout_seconds,
    };
    let mut client = AnalysisClient::new(client_config, api::TokenCache::new())?;
    if let Some(ref session_token) = args.session_token {
        client = client.with_session(SessionAuth {
            user_id: config.history.user_id.clone(),
            session_token: session_token.clone(),
        });
    }

    println!("🔬 Analyzing reviews for: {}", analyze.product);
    println!("   API: {}", config.api.base_url);
    println!("   Timeout: {}s", config.api.timeout_seconds);

    let texts = match analyze.file {
        Some(_) => Vec::new(),
        None => collect_texts(analyze).await?,
    };
    if analyze.file.is_none() && texts.is_empty() {
        bail!("No review text to analyze");
    }

    let spinner = start_spinner(args.quiet);

    let outcome = match analyze.file {
        Some(ref file) => {
            spinner.set_message(format!("Uploading {}...", file.display()));
            client
                .analyze_file(file)
                .await
                .map(|response| (AnalysisKind::File, response))
        }
        None => {
            spinner.set_message(format!("Analyzing {} reviews...", texts.len()));
            client
                .analyze_texts(&texts)
                .await
                .map(|response| (AnalysisKind::Text, response))
        }
    };
    spinner.finish_and_clear();

    let (kind, response) = outcome?;
    if !client.tokens().is_empty() {
        debug!("{} access tokens cached", client.tokens().len());
    }

    let analysis_date = Local::now().format("%d/%m/%Y %H.%M.%S").to_string();
    let payload = response.into_payload(&analyze.product, &analysis_date);
    info!(
        "Analysis complete: {} reviews for {}",
        payload.total_reviews, payload.product_name
    );

    if config.history.enabled && !analyze.no_save {
        match store.save(&config.history.user_id, &analyze.product, kind, &payload) {
            Ok(record) => println!("💾 Saved to history as {}", record.id),
            Err(e) => warn!("Failed to save analysis to history: {:#}", e),
        }
    }

    render_results(config, &payload, &analyze.render)
}

fn start_spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Review texts from `--text` values or `--text-file`, one per line.
async fn collect_texts(analyze: &AnalyzeArgs) -> Result<Vec<String>> {
    if let Some(ref path) = analyze.text_file {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read review file: {}", path.display()))?;
        return Ok(split_texts(&content));
    }

    Ok(analyze
        .texts
        .iter()
        .flat_map(|text| split_texts(text))
        .collect())
}

/// Render a stored or saved payload.
fn run_show(config: &Config, store: &HistoryStore, show: &ShowArgs) -> Result<()> {
    let payload = match (&show.payload, &show.history) {
        (Some(path), _) => load_payload_file(path)?,
        (None, Some(id)) => {
            store
                .get(&config.history.user_id, id)?
                .ok_or_else(|| anyhow!("No stored analysis with id {}", id))?
                .results
        }
        (None, None) => bail!("Nothing to show: pass a payload file or --history <ID>"),
    };

    render_results(config, &payload, &show.render)
}

/// Read a payload from disk. A saved history record is accepted too.
fn load_payload_file(path: &Path) -> Result<RawAnalysisPayload> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read payload file: {}", path.display()))?;
    let mut value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse payload file: {}", path.display()))?;

    if let Some(results) = value.get_mut("results").filter(|r| r.is_object()) {
        debug!("{} holds a history record, using its results", path.display());
        value = results.take();
    }

    serde_json::from_value(value)
        .with_context(|| format!("Payload file has an unexpected shape: {}", path.display()))
}

/// Build the comparison bundle, write the report and print a summary.
fn render_results(config: &Config, payload: &RawAnalysisPayload, render: &RenderArgs) -> Result<()> {
    let bundle = analysis::build_results(payload);

    let options = ReportOptions {
        models: selected_models(render.model),
        include_reviews: config.report.include_reviews,
        page: render.page,
        per_page: config.report.per_page,
    };

    let (content, default_path) = match render.format {
        OutputFormat::Json => (
            report::generate_json_report(&bundle)?,
            PathBuf::from(report::export_file_name(
                &payload.product_name,
                Local::now().date_naive(),
            )),
        ),
        OutputFormat::Markdown => (
            report::generate_markdown_report(&bundle, &options),
            PathBuf::from(&config.general.output),
        ),
    };
    let output = render.output.clone().unwrap_or(default_path);

    std::fs::write(&output, &content)
        .with_context(|| format!("Failed to write report to {}", output.display()))?;

    // Print summary
    println!("\n📊 Analysis Summary: {}", bundle.pretrained.product_name);
    println!("   Reviews: {}", bundle.pretrained.total_reviews);
    for model in &options.models {
        let view = bundle.view(*model);
        let counts = analysis::sentiment_counts(&view.review_details);
        let dominant = analysis::dominant_sentiment(&view.sentiment_distribution)
            .map(|(label, pct)| format!("{} ({}%)", label, pct))
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "   {} [{}] dominant: {} | 🟢 {} ⚪ {} 🔴 {}",
            model.display_name(),
            if view.processing_time.is_empty() {
                "n/a"
            } else {
                view.processing_time.as_str()
            },
            dominant,
            counts.positive,
            counts.neutral,
            counts.negative
        );
    }
    println!("\n✅ Report saved to: {}", output.display());

    Ok(())
}

fn run_history_list(config: &Config, store: &HistoryStore) -> Result<()> {
    let records = store.list(&config.history.user_id)?;
    info!("{} stored analyses for {}", records.len(), config.history.user_id);

    print!("{}", report::generate_history_table(&records));
    Ok(())
}

fn run_history_delete(config: &Config, store: &HistoryStore, id: &str) -> Result<()> {
    if !store.delete(&config.history.user_id, id)? {
        bail!("No stored analysis with id {}", id);
    }

    println!("🗑️  Deleted analysis {}", id);
    Ok(())
}

fn run_monthly(config: &Config, store: &HistoryStore, monthly: &MonthlyArgs) -> Result<()> {
    let records = store.list(&config.history.user_id)?;

    for model in selected_models(monthly.model) {
        let summaries = match monthly.month {
            Some(ref month) => vec![analysis::monthly_summary(month, &records, model)],
            None => analysis::monthly_breakdown(&records, model),
        };
        print!("{}", report::generate_monthly_report(model, &summaries));
    }

    Ok(())
}

fn selected_models(choice: ModelChoice) -> Vec<ModelType> {
    match choice {
        ModelChoice::Pretrained => vec![ModelType::Pretrained],
        ModelChoice::NaiveBayes => vec![ModelType::NaiveBayes],
        ModelChoice::Both => ModelType::ALL.to_vec(),
    }
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is set up, so problems go straight to stderr.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Ignoring {}: {:#}", CONFIG_FILE, e);
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selected_models() {
        assert_eq!(selected_models(ModelChoice::Pretrained), vec![ModelType::Pretrained]);
        assert_eq!(selected_models(ModelChoice::NaiveBayes), vec![ModelType::NaiveBayes]);
        assert_eq!(selected_models(ModelChoice::Both).len(), 2);
    }

    #[test]
    fn test_load_payload_file_accepts_history_record() {
        let dir = tempfile::tempdir().unwrap();
        let payload = include_str!("../fixtures/payload.json");

        let raw = dir.path().join("payload.json");
        std::fs::write(&raw, payload).unwrap();

        let record = dir.path().join("record.json");
        std::fs::write(
            &record,
            format!(r#"{{"id": "x", "productName": "ignored", "results": {}}}"#, payload),
        )
        .unwrap();

        let from_raw = load_payload_file(&raw).unwrap();
        let from_record = load_payload_file(&record).unwrap();
        assert_eq!(from_raw.product_name, "Kopi Susu Gula Aren");
        assert_eq!(from_record.product_name, "Kopi Susu Gula Aren");
        assert_eq!(from_record.review_details.len(), 4);
    }

    #[test]
    fn test_load_payload_file_rejects_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(load_payload_file(&path).is_err());
    }
}
