//! runboard - dashboard test orchestrator
//!
//! ## Usage
//!
//! ```bash
//! # Run one test
//! runboard run login
//!
//! # Run a batch in the given order, two at a time
//! runboard batch --tests login,checkout,search --concurrency 2 --delay 500
//!
//! # Show or create the configuration
//! runboard config show
//! runboard config init
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use runboard::cli::{self, Args, Command, ConfigAction};
use runboard::config::AppConfig;
use runboard::executor::{ExecutionSession, SessionState};
use runboard::http::HttpClient;
use runboard::output::{ConsoleSink, OutputFormat, ResultFormatter};
use runboard::selection::OrderedSelection;
use runboard::utils::logger::{init_logger, LogLevel};

/// How often the batch command checks whether the session has finished
const WAIT_STEP: Duration = Duration::from_millis(200);

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(LogLevel::from_verbosity(args.verbose));

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_default()?,
    };
    if let Some(server) = &args.server {
        config.server_url = server.clone();
        config.validate()?;
    }

    let format = OutputFormat::parse(&args.format)
        .with_context(|| format!("Unknown output format: {}", args.format))?;
    let mut formatter = ResultFormatter::new(format);
    if args.no_color {
        formatter = formatter.no_color();
    }

    match args.command {
        Command::Run { name } => run_single(&config, formatter, &name).await,
        Command::Batch(batch_args) => run_batch(&config, formatter, batch_args).await,
        Command::Config(config_args) => manage_config(&config, config_args.action),
    }
}

fn build_session(
    config: &AppConfig,
    formatter: ResultFormatter,
) -> Result<(ExecutionSession, Arc<ConsoleSink>)> {
    let base_url = config.api_base_url();
    debug!("Using dashboard API at {}", base_url);

    let api = Arc::new(
        HttpClient::with_timeout(&base_url, config.timeout_secs)
            .context("Failed to create HTTP client")?,
    );
    let console = Arc::new(ConsoleSink::stdout(formatter));
    let session = ExecutionSession::with_poll_interval(
        api,
        console.clone(),
        console.clone(),
        config.poll_interval(),
    );
    Ok((session, console))
}

async fn run_single(config: &AppConfig, formatter: ResultFormatter, name: &str) -> Result<()> {
    let (session, _console) = build_session(config, formatter)?;
    let result = session.run_single(name).await?;
    if !result.status.is_success() {
        bail!("{}", result.headline());
    }
    Ok(())
}

async fn run_batch(
    config: &AppConfig,
    formatter: ResultFormatter,
    args: cli::BatchArgs,
) -> Result<()> {
    let (session, console) = build_session(config, formatter)?;

    let mut selection = OrderedSelection::new(args.tests.iter().map(String::as_str));
    selection.select_all();
    let execution = selection.to_config(
        args.concurrency.unwrap_or(config.default_concurrency),
        args.delay.unwrap_or(config.default_delay_ms),
    );

    let handle = session.start(execution).await?;
    info!("Monitoring execution {}", handle);

    let state = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl+C")?;
                info!("Interrupted, tearing down execution {}", handle);
                session.teardown();
                break session.state();
            }
            _ = tokio::time::sleep(WAIT_STEP) => {
                let state = session.state();
                if matches!(state, SessionState::Completed(_) | SessionState::Abandoned(_)) {
                    break state;
                }
            }
        }
    };

    console.print_summary();
    session.teardown();

    match state {
        SessionState::Completed(_) => {
            let failures = console
                .last_summary()
                .map(|s| s.failure_count)
                .unwrap_or_default();
            if failures > 0 {
                bail!("{failures} test(s) failed in execution {handle}");
            }
            Ok(())
        }
        SessionState::Abandoned(_) => bail!("Lost track of execution {handle}"),
        _ => bail!("Execution {handle} was interrupted"),
    }
}

fn manage_config(config: &AppConfig, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let yaml = serde_yaml::to_string(config).context("Failed to serialize config")?;
            println!("{yaml}");
        }
        ConfigAction::Init { path, force } => {
            let path = match path.or_else(AppConfig::user_config_path) {
                Some(path) => path,
                None => bail!("No configuration directory available; pass a path"),
            };
            if path.exists() && !force {
                bail!("{} already exists; use --force to overwrite", path.display());
            }
            AppConfig::default().save(&path)?;
            println!("✓ Wrote default configuration to {}", path.display());
        }
    }
    Ok(())
}
