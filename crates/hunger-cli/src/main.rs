//! hunger: answer Robotoff questions or review products from the terminal.
//!
//! Drives a headless annotation session: the buffer keeps candidates ahead of
//! the user, answers are submitted in the background.

mod session;

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use hunger_buffer::{BufferConfig, BufferController};
use hunger_core::{EventBus, FilterConfig};
use hunger_remote::{RemoteConfig, RobotoffClient, SearchClient};

#[derive(Parser)]
#[command(name = "hunger")]
#[command(author, version, about = "Annotation work queue for Open Food Facts")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    buffer: BufferArgs,
}

#[derive(Args)]
struct BufferArgs {
    /// Refill when fewer items than this are buffered
    #[arg(long, global = true)]
    threshold: Option<usize>,

    /// Items requested per page
    #[arg(long, global = true)]
    page_size: Option<u32>,

    /// Always start on page 1 instead of a random page
    #[arg(long, global = true)]
    no_random_start: bool,

    /// Log answers instead of sending them
    #[arg(long, global = true)]
    dry_run: bool,

    /// Question language
    #[arg(long, global = true)]
    lang: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer insight questions
    Questions {
        /// Insight type (label, brand, category, ...)
        #[arg(long)]
        insight_type: Option<String>,

        /// Predicted value tag (e.g. en:organic)
        #[arg(long)]
        value_tag: Option<String>,

        /// Country tag; en:world disables the filter
        #[arg(long)]
        country: Option<String>,

        #[arg(long)]
        brand: Option<String>,

        /// Questions for one product barcode
        #[arg(long)]
        code: Option<String>,

        /// Most scanned products first instead of random order
        #[arg(long)]
        popular: bool,
    },

    /// Review products whose packaging needs completing
    Products {
        /// Country tag (default en:france); en:world disables the filter
        #[arg(long)]
        country: Option<String>,

        /// Contributor who created the product
        #[arg(long)]
        creator: Option<String>,

        #[arg(long)]
        brand: Option<String>,

        /// One product by barcode
        #[arg(long)]
        code: Option<String>,
    },
}

impl Commands {
    fn filter(&self) -> FilterConfig {
        match self {
            Commands::Questions {
                insight_type,
                value_tag,
                country,
                brand,
                code,
                popular,
            } => FilterConfig {
                insight_type: insight_type.clone(),
                value_tag: value_tag.clone(),
                country: country.clone(),
                brand: brand.clone(),
                code: code.clone(),
                sort_by_popularity: *popular,
                ..FilterConfig::questions()
            },
            Commands::Products {
                country,
                creator,
                brand,
                code,
            } => FilterConfig {
                country: country.clone(),
                creator: creator.clone(),
                brand: brand.clone(),
                code: code.clone(),
                ..FilterConfig::products()
            },
        }
    }
}

fn buffer_config(args: &BufferArgs) -> BufferConfig {
    let mut config = BufferConfig::from_env();
    if let Some(threshold) = args.threshold {
        config = config.with_threshold(threshold);
    }
    if let Some(page_size) = args.page_size {
        config = config.with_page_size(page_size);
    }
    if args.no_random_start {
        config = config.with_randomize_start(false);
    }
    if args.dry_run {
        config = config.with_dry_run(true);
    }
    config
}

/// Initialize tracing.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, enables file logging)
///   LOG_ANSI    - "true"/"false" override ANSI colors
///   RUST_LOG    - standard env filter (default: "warn,hunger_cli=info")
fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "warn,hunger_cli=info".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    let guard = if let Some(ref path) = log_file {
        let file_dir = std::path::Path::new(path)
            .parent()
            .unwrap_or(std::path::Path::new("."));
        let file_name = std::path::Path::new(path)
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("hunger.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        // Console output goes to stderr, stdout belongs to the session.
        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stderr)"),
        "Logging initialized"
    );
    guard
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut remote = RemoteConfig::from_env();
    if let Some(lang) = cli.buffer.lang.clone() {
        remote = remote.with_lang(lang);
    }
    let config = buffer_config(&cli.buffer);
    let filter = cli.command.filter();

    let source = SearchClient::new(remote.clone())?;
    let sink = RobotoffClient::new(remote)?;
    let events = EventBus::default();
    session::log_events(events.subscribe());

    let controller = BufferController::builder(Arc::new(source), Arc::new(sink))
        .config(config)
        .events(events)
        .start(filter);

    session::run(controller).await
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let _log_guard = init_logging();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Session failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hunger_core::CandidateSource;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_questions_filter_from_args() {
        let cli = Cli::parse_from([
            "hunger",
            "questions",
            "--insight-type",
            "label",
            "--value-tag",
            "en:organic",
            "--popular",
        ]);
        let filter = cli.command.filter();
        assert_eq!(filter.source, CandidateSource::Questions);
        assert_eq!(filter.insight_type.as_deref(), Some("label"));
        assert_eq!(filter.value_tag.as_deref(), Some("en:organic"));
        assert!(filter.sort_by_popularity);
    }

    #[test]
    fn test_products_filter_and_global_flags() {
        let cli = Cli::parse_from([
            "hunger",
            "products",
            "--creator",
            "kiliweb",
            "--threshold",
            "4",
            "--dry-run",
        ]);
        let filter = cli.command.filter();
        assert_eq!(filter.source, CandidateSource::Products);
        assert_eq!(filter.creator.as_deref(), Some("kiliweb"));
        let config = buffer_config(&cli.buffer);
        assert_eq!(config.threshold, 4);
        assert!(config.dry_run);
    }
}
