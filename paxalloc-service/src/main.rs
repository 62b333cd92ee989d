use anyhow::Context;
use paxalloc_service::app_config::Config;
use paxalloc_service::{spawn_snapshot_writer, AllocationActor, BatchOutput, TripBundle};
use paxalloc_shared::AllocationSpace;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paxalloc_service=debug,paxalloc_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Reading trip bundle from {}", config.batch.input_path);

    let bundle = TripBundle::read(&config.batch.input_path)
        .await
        .with_context(|| format!("Failed to read {}", config.batch.input_path))?;
    let (trip, session) = bundle
        .open_session(config.roster.clone())
        .context("Failed to open allocation session")?;

    let handle = AllocationActor::spawn(session, &config.actor);

    // Snapshot writer
    let writer = config
        .batch
        .snapshot_path
        .as_ref()
        .map(|path| spawn_snapshot_writer(handle.subscribe_snapshots(), PathBuf::from(path)));

    if config.batch.auto_fill {
        for space in [AllocationSpace::Seats, AllocationSpace::Rooms] {
            for container_id in handle.container_ids(space).await? {
                let report = handle
                    .auto_fill(container_id.clone())
                    .await
                    .with_context(|| format!("Auto-fill failed for {}", container_id))?;
                if !report.unplaced.is_empty() {
                    tracing::warn!(
                        container_id = %container_id,
                        unplaced = report.unplaced.len(),
                        "Container ran out of room"
                    );
                }
            }
        }
    }

    let output = BatchOutput {
        operational_data: handle.snapshot().await?,
        manifest: handle.manifest(trip).await?,
    };
    let json = serde_json::to_string_pretty(&output)?;

    match &config.batch.output_path {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("Failed to write {}", path))?;
            tracing::info!("Wrote allocation result to {}", path);
        }
        None => println!("{}", json),
    }

    // Closing the actor ends the snapshot stream
    drop(handle);
    if let Some(writer) = writer {
        writer.await.context("Snapshot writer panicked")?;
    }

    Ok(())
}
