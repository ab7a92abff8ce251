// SPDX-License-Identifier: MIT
// Copyright (c) 2026 bkpd contributors

//! bkpd — drives one pipeline step (or a full run) per invocation.
//!
//! Intended to be invoked periodically by an external scheduler (cron,
//! systemd timer); this binary does not decide when to run, only what to do
//! once invoked. `enqueue` adds a target to the queue; `run` drives the
//! Pipeline Driver to completion, a stall, or shutdown.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

mod config;
mod error;

use std::path::PathBuf;
use std::sync::Arc;

use bkp_adapters::{AesGcmCodec, FixedSizeChunker, ObjectStoreRemote, OsFilesystem, Sha256Hasher, ZfsSnapshotProducer, ZstdCodec};
use bkp_core::{BackupTarget, BackupType};
use bkp_engine::{lifecycle, Pipeline};
use bkp_storage::StateStore;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use config::Config;
use error::{RunnerError, EXIT_FATAL};
use fs2::FileExt;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "bkpd", about = "Off-site backup pipeline runner")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Drive the pipeline: one run to completion, a stall, or shutdown.
    Run,
    /// Append a backup target to the queue.
    Enqueue {
        dataset: String,
        #[arg(value_parser = parse_backup_type)]
        backup_type: BackupType,
        /// Target date, YYYY-MM-DD.
        date: String,
    },
}

fn parse_backup_type(s: &str) -> Result<BackupType, String> {
    s.parse()
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(EXIT_FATAL);
        }
    };

    let _log_guard = match setup_logging(&config.state_dir) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("error setting up logging: {e}");
            std::process::exit(EXIT_FATAL);
        }
    };

    let lock_path = config.state_dir.join("bkpd.lock");
    let _lock = match acquire_lock(&lock_path) {
        Ok(file) => file,
        Err(e) => {
            error!(%e, "failed to acquire lock");
            std::process::exit(e.exit_code());
        }
    };

    let exit_code = match cli.command {
        Command::Run => run(&config).await.err().map(|e| {
            error!(%e, "run failed");
            e.exit_code()
        }),
        Command::Enqueue { dataset, backup_type, date } => enqueue(&config, dataset, backup_type, date)
            .await
            .err()
            .map(|e| {
                error!(%e, "enqueue failed");
                e.exit_code()
            }),
    };

    std::process::exit(exit_code.unwrap_or(error::EXIT_IDLE));
}

async fn run(config: &Config) -> Result<(), RunnerError> {
    let store = StateStore::new(&config.state_dir);
    let producer = ZfsSnapshotProducer::new();
    let chunker = FixedSizeChunker::new(config.chunk_size);
    let compression = ZstdCodec::default();
    let encryption = AesGcmCodec::new(config.encryption_key()?);
    let remote = ObjectStoreRemote::new(build_object_store(config)?);
    let filesystem = OsFilesystem::new();
    let mut local_hasher = Sha256Hasher::new();
    let mut remote_hasher = Sha256Hasher::new();

    let mut pipeline = Pipeline {
        store: &store,
        producer: &producer,
        chunker: &chunker,
        compression: &compression,
        encryption: &encryption,
        remote: &remote,
        filesystem: &filesystem,
        local_hasher: &mut local_hasher,
        remote_hasher: &mut remote_hasher,
        root: config.temp_root.clone(),
    };

    pipeline.run(true).await?;
    info!("run complete");
    Ok(())
}

async fn enqueue(config: &Config, dataset: String, backup_type: BackupType, date: String) -> Result<(), RunnerError> {
    let target_date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|_| RunnerError::InvalidDate(date.clone()))?;

    let store = StateStore::new(&config.state_dir);
    let producer = ZfsSnapshotProducer::new();
    let target = BackupTarget::new(dataset, backup_type, target_date);

    lifecycle::enqueue(&store, &producer, target).await?;
    info!("enqueued");
    Ok(())
}

fn build_object_store(config: &Config) -> Result<Arc<dyn object_store::ObjectStore>, RunnerError> {
    // Credentials come from the environment (AWS_ACCESS_KEY_ID,
    // AWS_SECRET_ACCESS_KEY), the same secret-via-environment shape the
    // encryption key uses — neither belongs in the config file.
    let mut builder = object_store::aws::AmazonS3Builder::from_env()
        .with_bucket_name(config.bucket.clone())
        .with_region(config.region.clone());
    if let Some(endpoint) = &config.endpoint {
        builder = builder.with_endpoint(endpoint.clone()).with_allow_http(true);
    }
    let store = builder
        .build()
        .map_err(|e| RunnerError::Adapter(bkp_adapters::AdapterError::Remote(e.to_string())))?;
    Ok(Arc::new(store))
}

fn acquire_lock(lock_path: &PathBuf) -> Result<std::fs::File, RunnerError> {
    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent).map_err(RunnerError::LockIo)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .open(lock_path)
        .map_err(RunnerError::LockIo)?;
    file.try_lock_exclusive().map_err(|_| RunnerError::LockHeld(lock_path.clone()))?;
    Ok(file)
}

fn setup_logging(state_dir: &std::path::Path) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    std::fs::create_dir_all(state_dir)?;
    let file_appender = tracing_appender::rolling::never(state_dir, "bkpd.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
