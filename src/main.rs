use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use std::path::PathBuf;
use std::process::ExitCode;

use tpch_collect::{CollectError, CollectRequest, Config, collect_run};

mod cli_logger;

use cli_logger::CliLogger;

/// Collects the artifacts of one TPC-H run into a semicolon-delimited record.
#[derive(Debug, Parser)]
#[command(name = "tpch-collect", version)]
struct Cli {
    /// Directory with stats-before.log, stats-after.log, results.log, explain/ and bench.log.
    input: PathBuf,

    /// Output file; must not exist unless --append is given.
    output: PathBuf,

    /// Query timeout in seconds; slower queries are recorded as cancelled.
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Fail on garbled results.log lines instead of coercing them.
    #[arg(long)]
    strict: bool,

    /// Append to an existing output file instead of refusing it.
    #[arg(long)]
    append: bool,

    /// Config file (missing file means defaults).
    #[arg(long, default_value = "tpch-collect.toml")]
    config: PathBuf,

    /// PostgreSQL server log to summarize checkpoint activity from.
    #[arg(long, value_name = "PATH")]
    pg_log: Option<PathBuf>,

    /// Print the run summary as JSON.
    #[arg(long)]
    json: bool,

    #[arg(long)]
    no_color: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    let logger = CliLogger::new(cli.json, cli.no_color);

    match run(&cli, &logger) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            logger.print_error(&format!("{err:#}"));
            let configuration = err
                .downcast_ref::<CollectError>()
                .is_some_and(CollectError::is_configuration);
            if configuration {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: &Cli, logger: &CliLogger) -> Result<()> {
    let config = Config::load_optional(&cli.config).with_overrides(cli.timeout, cli.strict);
    let request = CollectRequest {
        input: cli.input.clone(),
        output: cli.output.clone(),
        append: cli.append,
        pg_log: cli.pg_log.clone(),
    };
    let summary = collect_run(&request, &config)?;
    if !summary.cancelled.is_empty() {
        logger.print_warning(&format!(
            "{} queries reached the {}s timeout and were recorded without a duration",
            summary.cancelled.len(),
            config.query_timeout_secs
        ));
    }
    logger.print_summary(&summary)
}

/// Logs go to stderr so stdout only carries the summary.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("tpch_collect={level}").parse() {
        filter = filter.add_directive(directive);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
