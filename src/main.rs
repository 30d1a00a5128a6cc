//! Gchat core - snapshot inspection tool
//!
//! Reads the chat logs and unread counts a session persisted to disk.

use anyhow::Context;
use clap::{Parser, Subcommand};
use gchat_core::config::Config;
use gchat_core::conversation::ConversationKey;
use gchat_core::snapshot::{SessionSnapshot, SnapshotStore};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Gchat core - inspect persisted session state
#[derive(Parser)]
#[command(name = "gchat-core")]
#[command(about = "Inspect the chat logs and unread counts saved by a Gchat session")]
struct Cli {
    /// Snapshot file (defaults to the data directory)
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List conversations with message and unread counts
    Conversations,

    /// Print the chat log of one conversation
    Log {
        /// Contact address; any /resource suffix is ignored
        address: String,

        /// Number of most recent messages to show
        #[arg(short = 'n', long, default_value = "50")]
        lines: usize,
    },

    /// Show unread counts
    Unread,

    /// Delete the snapshot
    Clear,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match cli.snapshot {
        Some(path) => Config::default().with_snapshot_file(path),
        None => Config::default(),
    };
    let store = SnapshotStore::new(&config);
    debug!(path = %store.path().display(), "Using snapshot");

    match cli.command {
        Commands::Conversations => cmd_conversations(&store),
        Commands::Log { address, lines } => cmd_log(&store, &address, lines),
        Commands::Unread => cmd_unread(&store),
        Commands::Clear => cmd_clear(&store),
    }
}

fn load(store: &SnapshotStore) -> anyhow::Result<SessionSnapshot> {
    store
        .load()
        .with_context(|| format!("reading snapshot {}", store.path().display()))
}

fn cmd_conversations(store: &SnapshotStore) -> anyhow::Result<()> {
    let snapshot = load(store)?;
    let conversations = snapshot.conversations();

    if conversations.is_empty() {
        println!("No conversations");
        return Ok(());
    }

    for key in conversations {
        let messages = snapshot.history(&key).len();
        let unread = snapshot.unread.get(&key).copied().unwrap_or(0);
        println!("{}  {} messages, {} unread", key, messages, unread);
    }

    Ok(())
}

fn cmd_log(store: &SnapshotStore, address: &str, lines: usize) -> anyhow::Result<()> {
    let snapshot = load(store)?;
    let key = ConversationKey::from_address(address);
    let history = snapshot.history(&key);

    if history.is_empty() {
        println!("No messages for {}", key);
        return Ok(());
    }

    let start = history.len().saturating_sub(lines);
    for message in &history[start..] {
        let marker = if message.is_offline() { " (offline)" } else { "" };
        println!(
            "[{}] {}{}: {}",
            message.received_at().format("%Y-%m-%d %H:%M"),
            message.from(),
            marker,
            message.body().unwrap_or_default()
        );
    }

    Ok(())
}

fn cmd_unread(store: &SnapshotStore) -> anyhow::Result<()> {
    let snapshot = load(store)?;

    let unread: Vec<_> = snapshot.unread.iter().filter(|(_, c)| **c > 0).collect();
    if unread.is_empty() {
        println!("No unread messages");
        return Ok(());
    }

    for (key, count) in unread {
        println!("{}  {}", key, count);
    }
    println!("Total: {}", snapshot.unread_total());

    Ok(())
}

fn cmd_clear(store: &SnapshotStore) -> anyhow::Result<()> {
    if store.remove()? {
        println!("Removed {}", store.path().display());
    } else {
        println!("No snapshot at {}", store.path().display());
    }
    Ok(())
}
