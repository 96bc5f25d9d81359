//! Clipvault CLI — list a clip bucket and upload recordings with progress.
//!
//! Configuration comes from the environment (see `clipvault-core::config`):
//! set CLIPVAULT_BUCKET plus either S3 settings or LOCAL_STORAGE_PATH.

use std::path::PathBuf;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};

use clipvault_cli::{format_progress, init_tracing};
use clipvault_core::Config;
use clipvault_storage::keys::clip_key;
use clipvault_storage::{
    create_object_store, StorageClient, TransferId, TransferObserver, TransferState,
};

#[derive(Parser)]
#[command(name = "clipvault", about = "Object-storage client for recorded clips")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every key in the configured bucket
    List,
    /// Upload a clip and follow its progress until it finishes
    Upload {
        /// Path to the local file to upload
        file: PathBuf,
        /// Object key; defaults to a timestamp-derived clip key
        #[arg(long)]
        key: Option<String>,
    },
}

/// Logs every session event, the way the capture app surfaced them.
struct LogObserver;

impl TransferObserver for LogObserver {
    fn on_state_changed(&mut self, id: TransferId, state: TransferState) {
        tracing::info!(transfer_id = id, state = %state, "Transfer state changed");
    }

    fn on_progress(&mut self, id: TransferId, bytes_transferred: u64, bytes_total: u64) {
        tracing::info!(
            transfer_id = id,
            progress = %format_progress(bytes_transferred, bytes_total),
            "Upload progress"
        );
        if bytes_transferred == bytes_total {
            tracing::info!(transfer_id = id, total_bytes = bytes_total, "All bytes transferred");
        }
    }

    fn on_error(&mut self, id: TransferId, error: &clipvault_storage::StorageError) {
        tracing::error!(transfer_id = id, error = %error, "Upload error");
    }
}

fn print_keys(keys: &[String]) {
    for key in keys {
        println!("{}", key);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let config = Config::from_env().context(
        "Failed to load configuration. Set CLIPVAULT_BUCKET plus S3_REGION or LOCAL_STORAGE_PATH",
    )?;

    let store = create_object_store(&config).await?;
    let client = StorageClient::with_limits(
        store,
        config.upload_part_size_bytes,
        config.multipart_threshold_bytes,
    )?;

    let cli = Cli::parse();

    match cli.command {
        Commands::List => {
            let keys = client.list_all_keys(&config.bucket).await?;
            print_keys(&keys);
        }
        Commands::Upload { file, key } => {
            let key = key.unwrap_or_else(|| clip_key(&Local::now()));

            let handle = client.upload(&config.bucket, &key, &file)?;
            handle.observe(Box::new(LogObserver));

            match handle.wait().await {
                TransferState::Completed => {
                    println!("uploaded {} as {}", file.display(), key);
                    // Refresh the listing so the new clip shows up.
                    let keys = client.list_all_keys(&config.bucket).await?;
                    print_keys(&keys);
                }
                TransferState::Failed => {
                    anyhow::bail!("upload of {} failed", file.display());
                }
                TransferState::Canceled => {
                    anyhow::bail!("upload of {} was canceled", file.display());
                }
                state => {
                    anyhow::bail!("upload ended in unexpected state: {}", state);
                }
            }
        }
    }

    Ok(())
}
