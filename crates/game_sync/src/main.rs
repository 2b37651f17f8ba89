use std::{path::PathBuf, sync::Arc, time::Duration};

use app::{AppBuilder, Application, LoggingOptions};
use clap::Parser;
use color_eyre::{Result, eyre::eyre};
use game_sync::{ConfigTables, GameSync, SyncEvent};
use network_client::{ClientConfig, ClientNetworkRuntime, LogSettings};
use network_shared::{Credentials, ServerEndpoint};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

struct SyncClientDev;

impl Application for SyncClientDev {
    const APP_ID: &'static str = "sync_client";
}

#[derive(Parser)]
#[command(name = "sync_client_dev")]
#[command(about = "Forge of Stories sync client - connects, loads all player data and logs every sync event")]
struct Args {
    /// Client configuration file
    #[arg(short, long, default_value = "client.toml")]
    config: PathBuf,

    /// Server address (`host:port`), overrides the config file
    #[arg(short, long)]
    server: Option<ServerEndpoint>,

    #[arg(short, long, default_value = "doctor")]
    username: String,

    #[arg(short, long, default_value = "")]
    password: String,

    /// Directory holding item.json, stage.json and backpack_type.json
    #[arg(long)]
    config_tables: Option<PathBuf>,

    /// How long to keep listening for pushes after the initial load
    #[arg(long, default_value_t = 10)]
    listen_secs: u64,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let mut config = ClientConfig::load_or_default(&args.config)?;
    if let Some(server) = &args.server {
        config.networking.host = server.host.clone();
        config.networking.port = server.port;
    }

    let _app = AppBuilder::<SyncClientDev>::new(env!("CARGO_PKG_VERSION"), logging_options(&config.logging))
        .map_err(|err| eyre!("failed to initialise logging: {err}"))?
        .build_simple();

    let tables = match &args.config_tables {
        Some(dir) => ConfigTables::load_dir(dir)?,
        None => {
            warn!("no config tables given, every backpack item will be dropped");
            ConfigTables::default()
        }
    };

    let runtime = ClientNetworkRuntime::multi_thread()?;
    runtime.block_on(run(args, config, Arc::new(tables)))
}

fn logging_options(settings: &LogSettings) -> LoggingOptions {
    LoggingOptions {
        level: settings.level.as_deref().and_then(LoggingOptions::parse_level),
        console: settings.console,
        file: settings.file,
        directory: settings.directory.clone(),
    }
}

async fn run(args: Args, config: ClientConfig, tables: Arc<ConfigTables>) -> Result<()> {
    let endpoint = config.networking.endpoint();
    let sync = GameSync::init(config.networking, tables);
    let mut events = sync.subscribe();

    info!(%endpoint, user = %args.username, "connecting");
    sync.connect(&Credentials::new(args.username, args.password)).await?;

    let player = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(SyncEvent::PlayerDataReceive(player)) => return Some(player),
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return None,
            }
        }
    })
    .await
    .ok()
    .flatten()
    .ok_or_else(|| eyre!("login was not answered with player data"))?;
    info!(player_id = player.id, name = %player.player_name, level = player.level, "logged in");

    sync.inventory().request_backpack(player.id).await?;
    sync.roster().request_operators().await?;
    sync.stage().request_player_stages().await?;

    let listen = tokio::time::sleep(Duration::from_secs(args.listen_secs));
    tokio::pin!(listen);
    loop {
        tokio::select! {
            _ = &mut listen => break,
            event = events.recv() => match event {
                Ok(event) => info!(event = event.name(), "sync event"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event subscriber lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    info!(
        items = sync.inventory().count(),
        backpack_types = sync.inventory().backpack_types().len(),
        operators = sync.roster().count(),
        stages = sync.stage().count(),
        metrics = ?sync.metrics(),
        "session summary"
    );
    sync.shutdown().await;
    Ok(())
}
