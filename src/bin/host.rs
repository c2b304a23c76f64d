//! waystones-host binary
//!
//! Standalone host around the waystone core: inspects a persisted
//! registry, repairs drift, and can run as a long-lived process with the
//! fire-and-forget persistence writer and periodic autosave.
//!
//! ## Configuration (env / TOML via `config` crate)
//!
//! | Key                          | Default       | Description                      |
//! |------------------------------|---------------|----------------------------------|
//! | `WAYSTONES_DISCOVER_ITEM`    | *(empty)*     | Item charged on discovery        |
//! | `WAYSTONES_DISCOVER_AMOUNT`  | `0`           | Discovery cost amount            |
//! | `WAYSTONES_COST_ITEM`        | *(empty)*     | Item charged per teleport        |
//! | `WAYSTONES_COST_AMOUNT`      | `0`           | Teleport cost amount             |
//! | `WAYSTONES_BREAK_PERMISSION` | `anyone`      | anyone/owner_only/op_only/nobody |
//! | `WAYSTONES_AUTOSAVE_SECS`    | `60`          | Autosave interval (`--watch`)    |

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use waystones::{
    JsonFileStore, PersistenceHandle, PersistenceWriter, SimWorld, WaystoneService,
    WaystonesConfig,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "waystones-host", about = "Waystone network host", version)]
struct Args {
    /// Path of the JSON record store
    #[arg(long, env = "WAYSTONES_STORE", default_value = "waystones.json")]
    store: PathBuf,

    /// Optional TOML config file (overlaid by WAYSTONES_* env vars)
    #[arg(long, env = "WAYSTONES_CONFIG")]
    config: Option<PathBuf>,

    /// Dump the raw record blobs as JSON instead of the table
    #[arg(long)]
    json: bool,

    /// Reconcile structure state and compact the store, then exit
    #[arg(long)]
    scrub: bool,

    /// Keep running with the background writer and periodic autosave
    #[arg(long)]
    watch: bool,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("waystones=debug".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = WaystonesConfig::load(args.config.as_deref())?;
    let store = Arc::new(JsonFileStore::open(&args.store)?);
    let adapter = Arc::new(SimWorld::new());

    log::info!(
        "Starting waystones-host (store='{}', autosave={}s)",
        args.store.display(),
        config.autosave_secs,
    );

    if args.watch {
        return watch(config, store, adapter).await;
    }

    let service = WaystoneService::new(config, adapter, PersistenceHandle::disabled());
    let loaded = service.load(store.as_ref());

    if args.scrub {
        let repaired = service.structures().reconcile();
        service.save_all(store.as_ref());
        log::info!("Scrub complete: {} record(s), {} repair(s)", loaded, repaired);
        return Ok(());
    }

    if args.json {
        let blobs: Vec<_> = service.registry().all().iter().map(|r| r.to_blob()).collect();
        println!("{}", serde_json::to_string_pretty(&blobs)?);
        return Ok(());
    }

    print_table(&service);
    Ok(())
}

// ---------------------------------------------------------------------------
// Modes
// ---------------------------------------------------------------------------

/// Long-lived mode: mutations mirror through the background writer and
/// the full registry flushes on an autosave interval and at shutdown.
async fn watch(
    config: WaystonesConfig,
    store: Arc<JsonFileStore>,
    adapter: Arc<SimWorld>,
) -> Result<()> {
    let autosave_secs = config.autosave_secs.max(1);
    let (handle, writer) = PersistenceWriter::spawn(store.clone());
    let service = WaystoneService::new(config, adapter, handle);
    service.load(store.as_ref());

    let mut autosave = tokio::time::interval(std::time::Duration::from_secs(autosave_secs));
    autosave.tick().await; // first tick fires immediately

    loop {
        tokio::select! {
            _ = autosave.tick() => {
                service.save_all(store.as_ref());
                log::debug!("Autosaved {} record(s)", service.registry().len());
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("waystones-host shutting down (SIGINT)");
                break;
            }
        }
    }

    service.save_all(store.as_ref());
    // Dropping the service releases the writer's channel so it drains out.
    drop(service);
    writer.await?;
    Ok(())
}

fn print_table(service: &WaystoneService) {
    println!(
        "{:<20} {:<34} {:<24} {:<16} {}",
        "NAME", "HASH", "POSITION", "OWNER", "FLAGS"
    );
    let mut records = service.registry().all();
    records.sort_by(|a, b| a.name.cmp(&b.name));
    for record in &records {
        let mut flags = Vec::new();
        if record.is_global {
            flags.push("global");
        }
        if record.is_active() {
            flags.push("active");
        }
        if record.has_moss_overlay {
            flags.push("mossy");
        }
        if record.is_world_generated {
            flags.push("worldgen");
        }
        println!(
            "{:<20} {:<34} {:<24} {:<16} {}",
            record.name,
            record.hash,
            record.position.to_string(),
            record.owner.as_deref().unwrap_or("-"),
            flags.join(","),
        );
    }

    let stats = service.stats();
    println!(
        "\n{} waystone(s), {} global",
        stats.registered, stats.global
    );
}
