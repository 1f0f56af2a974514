//! Novelty Corpus - Entry Point
//!
//! `run` builds the corpus end to end, `window` re-runs the novelty engine on
//! an existing corpus, and `results` summarizes the engine's output files.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use novelty_corpus::config::{Config, CooccurrenceUnit, IndicatorKind, MeanDivisor, MinPolicy};
use novelty_corpus::formatters::{self, ResponseFormat};
use novelty_corpus::models::PartitionYear;
use novelty_corpus::pipeline::{Pipeline, WindowRun};
use novelty_corpus::results;
use novelty_corpus::store::CorpusStore;
use novelty_corpus::window::{ProcessEngine, WindowOrchestrator};

#[derive(Parser, Debug)]
#[command(name = "novelty-corpus")]
#[command(about = "Build a year-partitioned OpenAlex citation corpus and score it for novelty")]
#[command(version)]
struct Cli {
    /// OpenAlex API key (optional)
    #[arg(long, env = "OPENALEX_API_KEY", global = true)]
    api_key: Option<String>,

    /// Contact address for the OpenAlex polite pool
    #[arg(long, env = "OPENALEX_MAILTO", global = true)]
    mailto: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG", global = true)]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Select, expand, score, persist, and run windows
    Run(RunArgs),
    /// Run the novelty engine over an existing corpus
    Window(WindowArgs),
    /// Summarize indicator results written by the engine
    Results(ResultsArgs),
}

#[derive(Args, Debug)]
struct CorpusArgs {
    /// Corpus root directory
    #[arg(long, env = "CORPUS_ROOT")]
    corpus_root: Option<PathBuf>,

    /// Trailing window length in years
    #[arg(long, env = "NOVELTY_LOOKBACK")]
    lookback: Option<i32>,

    /// Indicator to request from the novelty engine
    #[arg(long, value_enum, default_value_t)]
    indicator: IndicatorKind,

    /// Co-occurrence unit for the novelty engine
    #[arg(long, value_enum, default_value_t)]
    unit: CooccurrenceUnit,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    format: ResponseFormat,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    corpus: CorpusArgs,

    /// Search text for the candidate pool
    #[arg(long)]
    query: Option<String>,

    /// OpenAlex filter expression
    #[arg(long)]
    filter: Option<String>,

    /// Candidate pool size
    #[arg(long)]
    per_page: Option<u32>,

    /// Where to write the sample snapshot
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Novelty engine command; windows are skipped without one
    #[arg(long, env = "NOVELTY_ENGINE_CMD")]
    engine_cmd: Option<PathBuf>,

    /// Reference fetches in flight per paper
    #[arg(long, default_value = "1")]
    concurrency: usize,

    /// Denominator of the mean reference percentile
    #[arg(long, value_enum, default_value_t)]
    mean_divisor: MeanDivisor,

    /// Which reference supplies the minimum percentile
    #[arg(long, value_enum, default_value_t)]
    min_policy: MinPolicy,
}

#[derive(Args, Debug)]
struct WindowArgs {
    #[command(flatten)]
    corpus: CorpusArgs,

    /// Novelty engine command
    #[arg(long, env = "NOVELTY_ENGINE_CMD")]
    engine_cmd: PathBuf,

    /// Focal year (repeatable); defaults to every year in the corpus
    #[arg(long = "focal-year")]
    focal_years: Vec<i32>,
}

#[derive(Args, Debug)]
struct ResultsArgs {
    /// Results root directory
    #[arg(long)]
    results_root: Option<PathBuf>,

    /// Indicator to read
    #[arg(long, value_enum, default_value_t)]
    indicator: IndicatorKind,

    /// Variable the indicator was computed on
    #[arg(long, default_value = "referenced_works")]
    variable: String,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    format: ResponseFormat,
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer().compact()).init();
    }
}

fn apply_corpus_args(config: &mut Config, args: &CorpusArgs) -> anyhow::Result<()> {
    if let Some(root) = &args.corpus_root {
        config.corpus_root.clone_from(root);
    }
    if let Some(lookback) = args.lookback {
        anyhow::ensure!(lookback > 0, "--lookback must be positive");
        config.lookback = lookback;
    }
    config.indicator = args.indicator;
    config.cooccurrence_unit = args.unit;
    Ok(())
}

async fn run(mut config: Config, args: RunArgs) -> anyhow::Result<()> {
    apply_corpus_args(&mut config, &args.corpus)?;
    if let Some(query) = args.query {
        config.search.query = query;
    }
    if let Some(filter) = args.filter {
        config.search.filter = filter;
    }
    if let Some(per_page) = args.per_page {
        config.search.per_page = per_page;
    }
    if let Some(snapshot) = args.snapshot {
        config.sample_snapshot = snapshot;
    }
    if args.engine_cmd.is_some() {
        config.engine_command = args.engine_cmd;
    }
    config.concurrency = args.concurrency.max(1);
    config.scoring.mean_divisor = args.mean_divisor;
    config.scoring.min_policy = args.min_policy;

    tracing::info!(
        query = %config.search.query,
        corpus_root = %config.corpus_root.display(),
        engine = config.engine_command.is_some(),
        "Starting corpus run"
    );

    let pipeline = Pipeline::from_config(config)?;
    let report = pipeline.run().await?;

    match args.corpus.format {
        ResponseFormat::Markdown => println!("{}", formatters::format_run_report_markdown(&report)),
        ResponseFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&formatters::compact_run_report(&report))?);
        }
    }
    Ok(())
}

async fn window(mut config: Config, args: WindowArgs) -> anyhow::Result<()> {
    apply_corpus_args(&mut config, &args.corpus)?;

    let store = Arc::new(CorpusStore::new(&config.corpus_root));
    let focal_years = if args.focal_years.is_empty() {
        store
            .years()?
            .into_iter()
            .filter_map(PartitionYear::year)
            .filter_map(|y| i32::try_from(y).ok())
            .collect()
    } else {
        args.focal_years
    };

    let engine = Arc::new(ProcessEngine::new(args.engine_cmd));
    let orchestrator = WindowOrchestrator::new(engine, store, config.lookback, config.indicator)
        .with_unit(config.cooccurrence_unit);

    let runs: Vec<WindowRun> = orchestrator
        .run_many(focal_years)
        .await
        .into_iter()
        .map(|(focal_year, result)| match result {
            Ok(report) => WindowRun { rank: None, focal_year, report: Some(report), error: None },
            Err(e) => WindowRun { rank: None, focal_year, report: None, error: Some(e.to_string()) },
        })
        .collect();

    match args.corpus.format {
        ResponseFormat::Markdown => {
            for run in &runs {
                println!("{}", formatters::format_window_markdown(run));
            }
        }
        ResponseFormat::Json => {
            let value: Vec<_> = runs.iter().map(formatters::compact_window_run).collect();
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(())
}

fn show_results(config: &Config, args: &ResultsArgs) -> anyhow::Result<()> {
    let root = args.results_root.as_ref().unwrap_or(&config.results_root);
    let rows = results::read_indicator_results(root, args.indicator, &args.variable)?;
    let summary = results::summarize(&rows);

    match args.format {
        ResponseFormat::Markdown => {
            println!("{}", formatters::format_results_markdown(args.indicator, &summary));
        }
        ResponseFormat::Json => {
            let value = formatters::results_json(args.indicator, &rows, &summary);
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting novelty-corpus");

    let mut config = Config::from_env()?;
    if cli.api_key.is_some() || cli.mailto.is_some() {
        let base = Config::new(cli.api_key, cli.mailto);
        config.api_key = base.api_key;
        config.mailto = base.mailto;
        config.rate_limit_delay = base.rate_limit_delay;
    }

    match cli.command {
        Command::Run(args) => run(config, args).await,
        Command::Window(args) => window(config, args).await,
        Command::Results(args) => show_results(&config, &args),
    }
}
