use std::{fs::OpenOptions, path::PathBuf, sync::Mutex, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, Level};
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*};

mod app;
mod error;
mod fetch;
mod fingerprint;
mod listing;
mod settings;
mod walk;
mod writer;

use crate::error::MirrorError;
use settings::{Settings, DEFAULT_OUTPUT_DIR, DEFAULT_ROOT_URL};

#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// The contents API url of the repository root
    #[arg(default_value = DEFAULT_ROOT_URL)]
    url: String,

    /// The directory to download to
    #[arg(default_value = DEFAULT_OUTPUT_DIR)]
    path: PathBuf,

    /// Maximum number of requests in flight at once (unbounded if not given)
    #[arg(long)]
    max_tasks: Option<usize>,

    /// Maximum directory depth to descend into
    #[arg(long)]
    max_depth: Option<usize>,

    /// Per-request timeout in seconds, 0 disables it
    #[arg(long, default_value_t = settings::DEFAULT_TIMEOUT.as_secs())]
    timeout: u64,

    /// Also append log lines to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn settings(&self) -> Settings {
        let mut settings = Settings::new(&self.url, &self.path);
        settings.max_tasks = self.max_tasks;
        settings.max_depth = self.max_depth;
        settings.request_timeout = (self.timeout > 0).then(|| Duration::from_secs(self.timeout));
        settings
    }
}

fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };

    let file_layer = match &cli.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Error while trying to open log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(LevelFilter::from_level(level))
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(())
}

/// The class of the error that ended a run, looking through download wrappers.
fn failure_category(err: &anyhow::Error) -> &'static str {
    err.downcast_ref::<MirrorError>()
        .map(|e| e.root_cause().category())
        .unwrap_or("unexpected")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    if let Err(e) = app::run(&cli.settings()).await {
        error!("{} error: {e:#}", failure_category(&e));
        std::process::exit(1);
    }

    Ok(())
}
