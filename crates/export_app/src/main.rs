mod cli;
mod progress;
mod settings;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use engine_logging::{engine_error, engine_info, engine_warn, level_from_verbosity, LogOptions};
use export_engine::{ExportConfig, Pipeline};
use tokio_util::sync::CancellationToken;

use crate::cli::Cli;
use crate::progress::LogProgressSink;
use crate::settings::{build_config, load_file_settings, FileSettings};

fn main() -> ExitCode {
    let cli = Cli::parse();
    engine_logging::initialize(LogOptions {
        level: level_from_verbosity(cli.verbose),
        file: cli.log_file.clone(),
    });

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            engine_error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let file = match cli.config.as_deref() {
        Some(path) => load_file_settings(path)?,
        None => FileSettings::default(),
    };
    let config = build_config(cli, file)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(export(config))
}

async fn export(config: ExportConfig) -> Result<()> {
    let pipeline = Pipeline::from_config(config)?;
    engine_info!(
        "Exporting space {} as {} into {:?}",
        pipeline.config().credentials.space_id,
        pipeline.config().options.format,
        pipeline.config().working_dir
    );

    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn(cancel_on_interrupt(cancel.clone()));
    let result = pipeline.run(Arc::new(LogProgressSink), &cancel).await;
    interrupt.abort();
    let summary = match result {
        Ok(summary) => summary,
        Err(err) if err.is_cancelled() => bail!("export cancelled during {}", err.stage()),
        Err(err) => return Err(err.into()),
    };

    println!("Export downloaded and unzipped.");
    engine_info!(
        "{:?}: {} files extracted, {} files and {} directories renamed, {} references rewritten",
        summary.normalize.export_root,
        summary.extracted_files,
        summary.normalize.files_renamed,
        summary.normalize.dirs_renamed,
        summary.normalize.references_rewritten
    );
    if summary.normalize.rewrite_failures > 0 {
        engine_warn!(
            "{} markdown files could not be rewritten",
            summary.normalize.rewrite_failures
        );
    }
    Ok(())
}

async fn cancel_on_interrupt(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            engine_warn!("Interrupted, cancelling export");
            cancel.cancel();
        }
        Err(err) => engine_warn!("Could not listen for Ctrl-C: {}", err),
    }
}
