//! Daemon entry point: load configuration, run the one-shot ingestion pass,
//! then hand control to the retention loop until Ctrl-C.

use clap::Parser;
use mothball_archive::{
    IngestOptions, MemoryRegistry, RetentionPolicy, Selection, ingest, retention, unix_now,
};
use mothball_config::error::ErrorKind as ConfigErrorKind;
use mothball_config::{Settings, write_default};
use mothball_storage::Store;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Age-based file archival and retention daemon.
#[derive(Parser, Debug)]
#[command(name = "mothball", version, about)]
struct Args {
    /// Path to the configuration file (`.json` or `.toml`).
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match daemon(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(error = ?error, "fatal error");
            ExitCode::FAILURE
        },
    }
}

async fn daemon(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let settings = match Settings::load(&args.config) {
        Ok(settings) => settings,
        Err(error) if matches!(&*error, ConfigErrorKind::NotFound(_)) => {
            // First run: hand the operator a complete document to edit
            // instead of a validation error for a file that isn't there.
            write_default(&args.config)?;
            return Ok(());
        },
        Err(error) => return Err(error.into()),
    };

    let source = Store::new(&settings.source_folder)?;
    let target = Store::new(&settings.target_folder)?;
    let mut registry = MemoryRegistry::new();

    let options = IngestOptions {
        selection: Selection {
            matcher: settings.file_name_matches.clone(),
            min_size: settings.minimum_file_size.bytes(),
            max_size: settings.maximum_file_size.bytes(),
        },
        template: settings.template.clone(),
        compress: settings.compress_files,
        keep_in_source: settings.keep_in_source,
    };
    ingest(&source, &target, &mut registry, &options, unix_now()).await?;

    let policy = RetentionPolicy {
        blocks: settings.time_blocks.clone(),
        delete_offline_after: settings.delete_offline_after.seconds(),
        missing: settings.missing_file_behaviour,
    };

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received ctrl-c, stopping at the next tick boundary");
        }
        signal_token.cancel();
    });

    retention::run(
        &target,
        &mut registry,
        &policy,
        settings.delay_between_checks.as_std(),
        shutdown,
    )
    .await;
    Ok(())
}
