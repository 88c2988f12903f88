use anyhow::Result;
use clap::Parser;
use socks_check::{
    app,
    config::Config,
    proxy::checker::{
        DEFAULT_CHECK_ANSWER, DEFAULT_CHECK_URL, DEFAULT_ERROR_DELAY_SECS, DEFAULT_REQ_LENGTH,
        DEFAULT_REQ_TIMEOUT_SECS,
    },
    proxy::pool::DEFAULT_CONCURRENCY,
    report::OutputPaths,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Typical (simple, trivial) utility for SOCKS proxy checking
#[derive(Parser)]
#[command(name = "socks-check")]
#[command(about = "Check a list of SOCKS proxies with a pool of concurrent workers")]
struct Cli {
    /// File with the proxy list to check (HOST:PORT per line)
    #[arg(long, value_name = "SOURCE-PROXY-LIST-PATH")]
    source: Option<PathBuf>,

    /// File to write working proxies to
    #[arg(long, value_name = "GOOD-RESULT-PROXY-LIST-PATH")]
    good: Option<PathBuf>,

    /// File to write working proxies to, in CSV format
    #[arg(long, value_name = "GOOD-RESULT-PROXY-LIST-CSV-PATH")]
    good_csv: Option<PathBuf>,

    /// File to write failed proxies to
    #[arg(long, value_name = "BAD-RESULT-PROXY-LIST-PATH")]
    bad: Option<PathBuf>,

    /// File to write failed proxies to, in CSV format
    #[arg(long, value_name = "BAD-RESULT-PROXY-LIST-CSV-PATH")]
    bad_csv: Option<PathBuf>,

    /// Command run for every working proxy, with host, port and elapsed microseconds as arguments
    #[arg(long, value_name = "GOOD-HOOK-SCRIPT")]
    good_hook: Option<String>,

    /// URL fetched through each proxy
    #[arg(long, default_value = DEFAULT_CHECK_URL)]
    check_url: String,

    /// Text the fetched page must contain
    #[arg(long, default_value = DEFAULT_CHECK_ANSWER)]
    check_answer: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_REQ_TIMEOUT_SECS)]
    req_timeout: f64,

    /// Maximum number of response bytes read
    #[arg(long, default_value_t = DEFAULT_REQ_LENGTH)]
    req_length: u64,

    /// Number of parallel workers
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    conc: usize,

    /// Delay in seconds a worker waits after a failed check
    #[arg(long, default_value_t = DEFAULT_ERROR_DELAY_SECS)]
    error_delay: f64,

    /// Log debug output (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> Config {
        Config {
            source: self.source,
            outputs: OutputPaths {
                good: self.good,
                good_csv: self.good_csv,
                bad: self.bad,
                bad_csv: self.bad_csv,
            },
            good_hook: self.good_hook,
            check_url: self.check_url,
            check_answer: self.check_answer,
            req_timeout: self.req_timeout,
            req_length: self.req_length,
            concurrency: self.conc,
            error_delay: self.error_delay,
        }
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "socks_check=debug" } else { "socks_check=info" };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let config = cli.into_config();
    config.validate()?;

    // One cooperative scheduler for the workers; probes go to the blocking pool
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .max_blocking_threads(config.concurrency)
        .thread_name("socks-check-probe")
        .build()?;

    runtime.block_on(app::run(&config))?;

    Ok(())
}
