mod cli;
mod config;
mod daemon_log;
mod emulator;
mod netemu_paths;
mod rpc;
mod session_daemon;
mod version;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use config::DaemonConfig;
use emulator::events::EventKind;
use rpc::api_service::CoreApiClient;
use rpc::wire::StreamRequest;
use session_daemon::rpc_client;
use session_daemon::rpc_subscription::{EventSubscription, StreamMessage};
use std::path::Path;
use tarpc::context;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = DaemonConfig::resolve(cli.config.as_deref())?;

    match cli.command {
        Command::Serve { log_to_file } => {
            let log_path = if log_to_file {
                Some(netemu_paths::daemon_log_path()?)
            } else {
                None
            };
            daemon_log::init_logging(&config.log_level, log_path.as_deref())?;
            session_daemon::run_daemon(config).await
        }
        command => {
            daemon_log::init_logging("warn", None)?;
            run_client_command(&config, command).await
        }
    }
}

async fn run_client_command(config: &DaemonConfig, command: Command) -> Result<()> {
    let client = rpc_client::connect_with_retry(config.listen).await?;
    check_version(&client).await;

    match command {
        Command::Serve { .. } => bail!("serve does not run against a live daemon"),
        Command::Sessions => {
            let sessions = client.get_sessions(context::current()).await?;
            if sessions.is_empty() {
                println!("no sessions");
            }
            for session in sessions {
                println!(
                    "{:>4}  state {}  {} nodes",
                    session.id, session.state, session.nodes
                );
            }
        }
        Command::CreateSession => {
            let session = client.create_session(context::current()).await?;
            println!("{}", session.id);
        }
        Command::DeleteSession { session_id } => {
            if !client.delete_session(context::current(), session_id).await? {
                bail!("session {} not found", session_id);
            }
        }
        Command::SetState { session_id, state } => {
            if !client
                .set_session_state(context::current(), session_id, state)
                .await??
            {
                bail!("session {} refused state {}", session_id, state);
            }
        }
        Command::Watch {
            session_id,
            kind,
            resync,
        } => watch(config, session_id, kind, resync).await?,
        Command::Save { session_id, output } => {
            let data = client.save_scenario(context::current(), session_id).await??;
            std::fs::write(&output, data)
                .with_context(|| format!("Failed to write {}", output.display()))?;
        }
        Command::Open { path } => open(&client, &path).await?,
    }
    Ok(())
}

async fn check_version(client: &CoreApiClient) {
    match client.build_sha(context::current()).await {
        Ok(sha) if sha != version::BUILD_SHA => {
            eprintln!(
                "warning: daemon build {} differs from client build {}",
                sha,
                version::short_sha()
            );
        }
        Ok(_) => {}
        Err(e) => tracing::warn!("version check failed: {}", e),
    }
}

async fn watch(
    config: &DaemonConfig,
    session_id: u32,
    kind: EventKind,
    resync: bool,
) -> Result<()> {
    let request = StreamRequest {
        session_id,
        kind,
        resync,
    };
    let mut subscription = EventSubscription::connect(config.stream_listen, request).await?;
    while let Some(message) = subscription.recv().await {
        match message {
            StreamMessage::Event(event) => println!("{}", serde_json::to_string(&event)?),
            StreamMessage::Closed(reason) => {
                eprintln!("stream closed: {}", reason);
                break;
            }
        }
    }
    Ok(())
}

async fn open(client: &CoreApiClient, path: &Path) -> Result<()> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let opened = client.open_scenario(context::current(), data).await?;
    if !opened.result {
        bail!("daemon rejected scenario {}", path.display());
    }
    println!("{}", opened.session_id);
    Ok(())
}
