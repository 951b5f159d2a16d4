use crate::emulator::events::EventKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "netemud")]
#[command(about = "Network emulation session daemon")]
#[command(version)]
pub struct Cli {
    /// Daemon configuration file (default: ~/.netemu/daemon.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the daemon in the foreground
    Serve {
        /// Write logs to ~/.netemu/logs/netemud.log instead of stderr
        #[arg(long)]
        log_to_file: bool,
    },

    /// List sessions on a running daemon
    Sessions,

    CreateSession,

    DeleteSession { session_id: u32 },

    /// Move a session to a state by code (1 definition .. 6 shutdown)
    SetState { session_id: u32, state: u32 },

    /// Print a session's events as JSON lines
    Watch {
        session_id: u32,

        /// node, link, session, config, exception or file
        #[arg(long, default_value = "node")]
        kind: EventKind,

        /// Replay the current session state first
        #[arg(long)]
        resync: bool,
    },

    /// Save a session as a scenario document
    Save {
        session_id: u32,
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Open a scenario document into a new session
    Open { path: PathBuf },
}
