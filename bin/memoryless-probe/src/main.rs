//! Memoryless probe
//!
//! Takes probes at exponentially distributed intervals and logs each one,
//! either through the recurring runner or by reading a ticker. Useful for
//! checking the scheduler's spacing against the configured distribution.

mod args;
mod config;
mod errors;
mod probe;

use anyhow::Context;
use args::{Args, EnvArgs};
use config::{Config, Mode};
use errors::Result;
use memoryless::CancellationToken;
use memoryless_common::logging;
use tokio::{runtime, signal};
use tracing::{info, warn};

fn main() -> Result<()> {
    let args: Args = argh::from_env();
    if let Err(e) = main_inner(args) {
        eprintln!("FATAL ERROR: {e}");

        return Err(e);
    }

    Ok(())
}

fn main_inner(args: Args) -> Result<()> {
    let config = Config::from_args(&args)?;

    // Start runtime for async IO tasks.
    let rt = runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("memoryless-rt")
        .build()
        .context("init: build rt")?;

    // Init the logging before we do anything else.
    init_logging(&config);

    info!(
        mode = %config.mode,
        count = ?config.count,
        expected = ?config.schedule.expected(),
        min = ?config.schedule.min(),
        max = ?config.schedule.max_bound(),
        once = config.schedule.once(),
        "starting probe"
    );

    let cancel = CancellationToken::new();
    rt.spawn(shutdown_on_ctrl_c(cancel.clone()));

    let stats = rt.block_on(async {
        match config.mode {
            Mode::Run => probe::probe_with_runner(cancel, config.schedule, config.count).await,
            Mode::Ticker => probe::probe_with_ticker(cancel, config.schedule, config.count).await,
        }
    })?;

    probe::report(&stats, &config.schedule);
    Ok(())
}

/// Cancels `cancel` on ctrl-c. Returns early once probing finishes on its own.
async fn shutdown_on_ctrl_c(cancel: CancellationToken) {
    tokio::select! {
        res = signal::ctrl_c() => match res {
            Ok(()) => {
                info!("received ctrl-c, stopping");
                cancel.cancel();
            }
            Err(e) => warn!(%e, "failed to listen for ctrl-c, probing continues"),
        },
        _ = cancel.cancelled() => {}
    }
}

/// Sets up the logging system from the config file, with environment
/// variables taking precedence.
fn init_logging(config: &Config) {
    let env_args = EnvArgs::from_env();

    let service_label = env_args
        .service_label
        .as_deref()
        .or(config.logging.service_label.as_deref());
    let log_dir = env_args
        .log_dir
        .as_ref()
        .or(config.logging.log_dir.as_ref());

    logging::init_logging_from_config(logging::LoggingInitConfig {
        service_base_name: "memoryless-probe",
        service_label,
        log_dir,
        log_file_prefix: config.logging.log_file_prefix.as_deref(),
        json_format: config.logging.json_format,
        default_log_prefix: "memoryless-probe",
    });
}
