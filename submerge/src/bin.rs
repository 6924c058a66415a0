//! The node executable (spec.md §6's external interfaces realized as a
//! process): parses a small `clap` CLI, loads `NodeConfig`, opens the
//! `redb`-backed store, and drives a `Server<RowDb>`. Run with no
//! subcommand starts an idle node; `demo` exercises the pipeline
//! end-to-end against a throwaway store so the evaluation core's
//! behavior can be seen without a federation peer to talk to.

use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use submerge::{OfflineFederationClient, Server};
use submerge_admin::{init_logging, LogFormat, NodeConfig};
use submerge_base::Result;
use submerge_model::{RoomId, RoomVersion, UserId};
use submerge_rowdb::RowDb;

#[derive(Parser)]
#[command(name = "submerge", about = "Event evaluation core node")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a config file and sit idle, holding the store open. There is
    /// no client/federation HTTP listener in this workspace (spec.md §1
    /// places that transport out of scope), so "running" means the node
    /// is ready to have events injected into it in-process.
    Run {
        #[arg(long, default_value = "submerge.toml")]
        config: PathBuf,
    },
    /// Stand up a node against a throwaway store and push a handful of
    /// locally originated events through it, printing the fault each
    /// admission raised.
    Demo {
        #[arg(long)]
        server_name: Option<String>,
    },
}

fn main() -> Result<()> {
    init_logging(LogFormat::Pretty);
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build()?;
    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, async move {
        match cli.command {
            Command::Run { config } => run(config).await,
            Command::Demo { server_name } => demo(server_name).await,
        }
    })
}

async fn run(config_path: PathBuf) -> Result<()> {
    let config = if config_path.exists() {
        NodeConfig::from_file(&config_path)?
    } else {
        tracing::warn!(path = %config_path.display(), "no config file found, starting with defaults");
        NodeConfig::default()
    };
    std::fs::create_dir_all(&config.data_dir)?;
    let store = RowDb::open(config.data_dir.join("events.redb"))?;
    let server = Server::new(config, store, Arc::new(OfflineFederationClient))?;
    tracing::info!(server_name = %server.server_name(), "node started");

    // No client/federation listener is wired up (spec.md §1); idle here
    // rather than returning, since a real deployment would be driven by
    // inbound requests this process doesn't yet accept.
    futures::future::pending::<()>().await;
    Ok(())
}

async fn demo(server_name: Option<String>) -> Result<()> {
    let dir = tempfile_dir()?;
    let mut config = NodeConfig::default();
    config.server_name = server_name.unwrap_or_else(|| "localhost".to_string());
    config.data_dir = dir.clone();
    let store = RowDb::open(dir.join("demo.redb"))?;
    let server = Server::new(config, store, Arc::new(OfflineFederationClient))?;

    let room_version = RoomVersion::CREATE_ROOM_DEFAULT;
    let creator = UserId::new(format!("@demo:{}", server.config.server_name));
    let room = RoomId::new(format!("!demo-room:{}", server.config.server_name));

    let create_fault = server
        .inject_local("m.room.create", creator.clone(), room.clone(), Some(String::new()), json!({"creator": creator.as_str()}), room_version)
        .await;
    println!("m.room.create -> {create_fault}");

    let join_fault = server
        .inject_local(
            "m.room.member",
            creator.clone(),
            room.clone(),
            Some(creator.as_str().to_string()),
            json!({"membership": "join"}),
            room_version,
        )
        .await;
    println!("m.room.member (join) -> {join_fault}");

    let message_fault = server
        .inject_local("m.room.message", creator.clone(), room.clone(), None, json!({"msgtype": "m.text", "body": "hello"}), room_version)
        .await;
    println!("m.room.message -> {message_fault}");

    server.record_sequence_metrics();
    println!(
        "sequence: uncommitted={} committed={} retired={}",
        server.vm.sequence.uncommitted(),
        server.vm.sequence.committed(),
        server.vm.sequence.retired()
    );

    Ok(())
}

fn tempfile_dir() -> Result<PathBuf> {
    let dir = std::env::temp_dir().join(format!("submerge-demo-{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
