#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use crate::{
    appender::DedupAppender,
    config::Args,
    generator::Strategy,
    seed::{load_corpus_or_empty, CorpusKind},
    worker::WorkerPool,
};
use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod appender;
mod config;
mod generator;
mod mode;
mod pool;
mod seed;
mod worker;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Failed to run {}: {e}", env!("CARGO_CRATE_NAME"));
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    std::env::set_var("RUST_LOG", args.verbosity());

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut config = args.config();
    config.validate()?;

    let cwd = std::env::current_dir().context("failed to determine working directory")?;
    config.resolve_paths(&cwd);

    let seen = pool::load(&config.wordlist_file)
        .await
        .unwrap_or_else(|e| {
            warn!("Failed to load existing passwords, starting with none: {e}");
            pool::SeenSet::default()
        });

    let words = load_corpus_or_empty(&config.dictionary_file, CorpusKind::Dictionary).await;
    let names = load_corpus_or_empty(&config.names_file, CorpusKind::Names).await;

    let mode = if let Some(mode) = args.mode() {
        mode
    } else {
        mode::prompt(BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?
    };
    let strategy = Strategy::for_mode(mode, config.length(), words, names);

    let appender = Arc::new(
        DedupAppender::new(config.wordlist_file, seen, config.sync_writes)
            .with_target(config.target),
    );
    info!(
        path = %appender.path().display(),
        %mode,
        target = ?config.target,
        "Writing new passwords to wordlist"
    );

    let shutdown = CancellationToken::new();
    let workers = WorkerPool::spawn(
        config.concurrency,
        &strategy,
        &appender,
        config.seed,
        &shutdown,
    );

    tokio::spawn(watch_for_shutdown(shutdown));

    let report = workers.join().await?;
    info!(
        recorded = report.recorded,
        duplicates = report.duplicates,
        failed = report.failed,
        total = appender.len().await,
        "Password generation finished"
    );

    Ok(())
}

async fn watch_for_shutdown(shutdown: CancellationToken) {
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                error!("Failed to listen for ctrl-c: {e}");
                return;
            }

            info!("Received ctrl-c, initiating shutdown");
            shutdown.cancel();
        }
        () = shutdown.cancelled() => {}
    }
}
