//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sentiview - product review sentiment analysis from the terminal
///
/// Submit reviews to the analysis API, compare the pre-trained and
/// Naive Bayes models side by side, and keep a history of every run.
///
/// Examples:
///   sentiview analyze --product "Kopi Susu" --file reviews.csv
///   sentiview analyze --product "Kopi Susu" --text "Enak sekali" --text "Terlalu manis"
///   sentiview show results.json --model naivebayes --page 2
///   sentiview history list
///   sentiview monthly --month 2026-10
///   sentiview --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .sentiview.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Analysis API base URL
    #[arg(long, value_name = "URL", env = "SENTIVIEW_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// User whose history is read and written
    #[arg(long, value_name = "ID", env = "SENTIVIEW_USER", global = true)]
    pub user: Option<String>,

    /// Session token exchanged for API access tokens
    #[arg(
        long,
        value_name = "TOKEN",
        env = "SENTIVIEW_SESSION_TOKEN",
        hide_env_values = true,
        global = true
    )]
    pub session_token: Option<String>,

    /// Directory of the history store
    #[arg(long, value_name = "DIR", global = true)]
    pub history_dir: Option<PathBuf>,

    /// Generate a default .sentiview.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Submit reviews to the analysis API and report the results
    Analyze(AnalyzeArgs),

    /// Render results from a saved payload file or a history record
    Show(ShowArgs),

    /// List or delete stored analyses
    #[command(subcommand)]
    History(HistoryCommand),

    /// Monthly sentiment summary over stored analyses
    Monthly(MonthlyArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Product the reviews belong to
    #[arg(short, long, value_name = "NAME")]
    pub product: String,

    /// Review text (repeatable)
    #[arg(long = "text", value_name = "TEXT")]
    pub texts: Vec<String>,

    /// Text file with one review per line
    #[arg(long, value_name = "FILE")]
    pub text_file: Option<PathBuf>,

    /// CSV or Excel file to upload (csv, xlsx, xls)
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Do not store this run in the history
    #[arg(long)]
    pub no_save: bool,

    #[command(flatten)]
    pub render: RenderArgs,
}

impl AnalyzeArgs {
    /// Number of input sources given; exactly one is allowed.
    pub fn source_count(&self) -> usize {
        [
            !self.texts.is_empty(),
            self.text_file.is_some(),
            self.file.is_some(),
        ]
        .into_iter()
        .filter(|given| *given)
        .count()
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct ShowArgs {
    /// Payload JSON file (as returned by the API or exported)
    #[arg(
        value_name = "PAYLOAD",
        required_unless_present = "history",
        conflicts_with = "history"
    )]
    pub payload: Option<PathBuf>,

    /// Replay a stored analysis by id
    #[arg(long, value_name = "ID")]
    pub history: Option<String>,

    #[command(flatten)]
    pub render: RenderArgs,
}

/// Rendering options shared by `analyze` and `show`.
#[derive(clap::Args, Debug, Clone)]
pub struct RenderArgs {
    /// Which model's results to render
    #[arg(short, long, default_value = "both", value_name = "MODEL")]
    pub model: ModelChoice,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Page of the review table to render
    #[arg(long, default_value = "1", value_name = "N")]
    pub page: usize,

    /// Reviews per page
    #[arg(long, value_name = "N")]
    pub per_page: Option<usize>,

    /// Leave the review table out of the report
    #[arg(long)]
    pub no_reviews: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// List stored analyses, newest first
    List,
    /// Delete a stored analysis
    Delete {
        /// Id of the analysis (see `history list`)
        id: String,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct MonthlyArgs {
    /// Month to summarise; all months when omitted
    #[arg(long, value_name = "YYYY-MM")]
    pub month: Option<String>,

    /// Which model's sentiments to count
    #[arg(short, long, default_value = "pretrained", value_name = "MODEL")]
    pub model: ModelChoice,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format (the full comparison bundle)
    Json,
}

/// Model selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ModelChoice {
    /// Pre-trained transformer model
    Pretrained,
    /// Naive Bayes model
    #[value(name = "naivebayes")]
    NaiveBayes,
    /// Both models
    Both,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Rendering options of the active command, if it renders results.
    pub fn render_options(&self) -> Option<&RenderArgs> {
        match self.command {
            Some(Command::Analyze(ref a)) => Some(&a.render),
            Some(Command::Show(ref s)) => Some(&s.render),
            _ => None,
        }
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        let Some(ref command) = self.command else {
            return Err(
                "A command is required (analyze, show, history, monthly) unless --init-config is given"
                    .to_string(),
            );
        };

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Validate API URL format
        if let Some(ref url) = self.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        // Validate timeout if provided
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(render) = self.render_options() {
            if render.page == 0 {
                return Err("Page must be at least 1".to_string());
            }
            if render.per_page == Some(0) {
                return Err("Reviews per page must be at least 1".to_string());
            }
        }

        match command {
            Command::Analyze(analyze) => validate_analyze(analyze),
            Command::Monthly(monthly) => match monthly.month {
                Some(ref month) if !is_valid_month(month) => {
                    Err(format!("Month must be in YYYY-MM format: {}", month))
                }
                _ => Ok(()),
            },
            Command::Show(_) | Command::History(_) => Ok(()),
        }
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `--quiet` wins over `verbose = true` in the config file.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

fn validate_analyze(analyze: &AnalyzeArgs) -> Result<(), String> {
    if analyze.product.trim().is_empty() {
        return Err("Product name must not be empty".to_string());
    }

    match analyze.source_count() {
        0 => return Err("Provide reviews with --text, --text-file or --file".to_string()),
        1 => {}
        _ => return Err("Use only one of --text, --text-file or --file".to_string()),
    }

    for path in [&analyze.text_file, &analyze.file].into_iter().flatten() {
        if !path.is_file() {
            return Err(format!("Input file does not exist: {}", path.display()));
        }
    }

    Ok(())
}

fn is_valid_month(month: &str) -> bool {
    chrono::NaiveDate::parse_from_str(&format!("{}-01", month), "%Y-%m-%d").is_ok()
        && month.len() == 7
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_args() -> RenderArgs {
        RenderArgs {
            model: ModelChoice::Both,
            format: OutputFormat::Markdown,
            output: None,
            page: 1,
            per_page: None,
            no_reviews: false,
        }
    }

    fn analyze_args() -> AnalyzeArgs {
        AnalyzeArgs {
            product: "Kopi".to_string(),
            texts: vec!["Enak".to_string()],
            text_file: None,
            file: None,
            no_save: false,
            render: render_args(),
        }
    }

    fn make_args(command: Command) -> Args {
        Args {
            command: Some(command),
            config: None,
            verbose: false,
            quiet: false,
            api_url: None,
            timeout: None,
            user: None,
            session_token: None,
            history_dir: None,
            init_config: false,
        }
    }

    #[test]
    fn test_valid_analyze() {
        let args = make_args(Command::Analyze(analyze_args()));
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_analyze_requires_exactly_one_source() {
        let mut analyze = analyze_args();
        analyze.texts.clear();
        assert!(make_args(Command::Analyze(analyze.clone())).validate().is_err());

        analyze.texts = vec!["Enak".to_string()];
        analyze.file = Some(PathBuf::from("Cargo.toml"));
        assert!(make_args(Command::Analyze(analyze)).validate().is_err());
    }

    #[test]
    fn test_analyze_missing_file() {
        let mut analyze = analyze_args();
        analyze.texts.clear();
        analyze.file = Some(PathBuf::from("does/not/exist.csv"));
        assert!(make_args(Command::Analyze(analyze)).validate().is_err());
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args(Command::History(HistoryCommand::List));
        args.api_url = Some("api.example.com".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args(Command::History(HistoryCommand::List));
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_page_bounds() {
        let mut show = ShowArgs {
            payload: Some(PathBuf::from("results.json")),
            history: None,
            render: render_args(),
        };
        show.render.page = 0;
        assert!(make_args(Command::Show(show.clone())).validate().is_err());

        show.render.page = 1;
        show.render.per_page = Some(0);
        assert!(make_args(Command::Show(show)).validate().is_err());
    }

    #[test]
    fn test_command_required_without_init_config() {
        let mut args = make_args(Command::History(HistoryCommand::List));
        args.command = None;
        assert!(args.validate().is_err());

        args.init_config = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_month_validation() {
        assert!(is_valid_month("2026-10"));
        assert!(!is_valid_month("2026-13"));
        assert!(!is_valid_month("10-2026"));
        assert!(!is_valid_month("2026-1"));

        let args = make_args(Command::Monthly(MonthlyArgs {
            month: Some("October".to_string()),
            model: ModelChoice::Pretrained,
        }));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_parse_subcommands() {
        let args = Args::try_parse_from([
            "sentiview",
            "show",
            "results.json",
            "--model",
            "naivebayes",
            "--page",
            "2",
        ])
        .unwrap();

        let render = args.render_options().unwrap();
        assert_eq!(render.model, ModelChoice::NaiveBayes);
        assert_eq!(render.page, 2);
        assert_eq!(render.format, OutputFormat::Markdown);

        let args = Args::try_parse_from(["sentiview", "history", "delete", "abc"]).unwrap();
        assert!(matches!(
            args.command,
            Some(Command::History(HistoryCommand::Delete { ref id })) if id == "abc"
        ));
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args(Command::History(HistoryCommand::List));
        assert_eq!(args.log_level(false), tracing::Level::INFO);
        assert_eq!(args.log_level(true), tracing::Level::DEBUG);

        args.verbose = true;
        assert_eq!(args.log_level(false), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(false), tracing::Level::ERROR);
        assert_eq!(args.log_level(true), tracing::Level::ERROR);
    }
}
