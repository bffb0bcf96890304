use std::time::Duration;

use clap::Parser;

use liminal::config::{default_config, load_config, PipelineManager};

/// Liminal - a transactional stream-processing substrate
#[derive(Parser)]
#[command(name = "liminal")]
#[command(author = "Keith Bugeja <keith.bugeja@um.edu.mt>")]
#[command(version = "0.2.0")]
#[command(about = "Liminal: a transactional, acknowledged stream-processing engine")]
#[command(long_about =
"------------------------------------------------------------
    ██╗     ██╗███╗   ███╗██╗███╗   ██╗ █████╗ ██╗
    ██║     ██║████╗ ████║██║████╗  ██║██╔══██╗██║
    ██║     ██║██╔████╔██║██║██╔██╗ ██║███████║██║
    ██║     ██║██║╚██╔╝██║██║██║╚██╗██║██╔══██║██║
    ███████╗██║██║ ╚═╝ ██║██║██║ ╚████║██║  ██║███████╗
    ╚══════╝╚═╝╚═╝     ╚═╝╚═╝╚═╝  ╚═══╝╚═╝  ╚═╝╚══════╝

    Transactional stream processing: every message is acked
    exactly once, all the way back to its source.
------------------------------------------------------------")]
struct Cli {
    /// Configuration file path. Falls back to a minimal built-in pipeline
    /// if omitted.
    #[arg(short, long)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Seconds to wait for the pipeline to drain after Ctrl-C before giving up.
    #[arg(long, default_value_t = 10)]
    shutdown_grace_secs: u64,
}

#[tokio::main(flavor = "multi_thread", worker_threads = 32)]
async fn main() {
    let cli = Cli::parse();

    liminal::logging::init_logging(&cli.log_level);

    let config = match &cli.config {
        Some(path) => match load_config(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::error!("failed to load config from '{}': {}", path, e);
                std::process::exit(1);
            }
        },
        None => {
            tracing::info!("no --config given, running the built-in default pipeline");
            default_config()
        }
    };

    let manager = match PipelineManager::from_config(config) {
        Ok(manager) => manager,
        Err(e) => {
            tracing::error!("failed to build pipeline: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("pipeline running, press Ctrl-C to stop");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown requested, draining in-flight messages");
            manager.close_async();
        }
        _ = manager.wait_until_done() => {
            tracing::info!("pipeline finished on its own");
            return;
        }
    }

    let grace = Duration::from_secs(cli.shutdown_grace_secs);
    if tokio::time::timeout(grace, manager.wait_until_done())
        .await
        .is_err()
    {
        tracing::warn!(
            "pipeline did not finish draining within {:?}, exiting anyway",
            grace
        );
    }
}
