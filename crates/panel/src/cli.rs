//! Command-line surface of the control panel.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use overlay_core::overlay::OverlayKind;
use overlay_core::types::DbId;

#[derive(Debug, Parser)]
#[command(version, about = "Livestream overlay control panel")]
pub struct Cli {
    /// Skip confirmation prompts.
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and store the session.
    Login {
        #[arg(short, long)]
        username: String,
        /// Read from stdin when omitted.
        #[arg(short, long, env = "OVERLAY_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Create an account and store the session.
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "OVERLAY_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the stored session.
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// Manage overlays.
    #[command(subcommand)]
    Overlays(OverlayCommand),
    /// Manage the stream source.
    #[command(subcommand)]
    Stream(StreamCommand),
}

#[derive(Debug, Subcommand)]
pub enum OverlayCommand {
    /// List all overlays.
    List,
    /// Show one overlay as JSON.
    Show { id: DbId },
    /// Create an overlay.
    Add(OverlayFields),
    /// Edit an overlay; omitted fields keep their value.
    Edit {
        id: DbId,
        #[command(flatten)]
        fields: OverlayFieldChanges,
    },
    /// Move an overlay.
    Move { id: DbId, x: f64, y: f64 },
    /// Resize an overlay.
    Resize { id: DbId, width: f64, height: f64 },
    /// Delete an overlay.
    Remove { id: DbId },
    /// Replay a recorded pointer gesture (one JSON event per line).
    Gesture { id: DbId, file: PathBuf },
}

#[derive(Debug, Subcommand)]
pub enum StreamCommand {
    /// Show the source and what the player would load.
    Show,
    /// Set the stream source URL.
    Set { url: String },
    /// Show the backend converter status.
    Status,
    /// Stop the backend converter.
    Stop,
}

/// Fields of the create form. Defaults match a fresh form.
#[derive(Debug, Clone, Args)]
pub struct OverlayFields {
    #[arg(short = 't', long = "type", default_value = "text")]
    pub kind: OverlayKind,
    #[arg(short, long)]
    pub content: String,
    #[arg(long, default_value_t = 0.0)]
    pub x: f64,
    #[arg(long, default_value_t = 0.0)]
    pub y: f64,
    #[arg(long, default_value_t = overlay_core::overlay::DEFAULT_WIDTH)]
    pub width: f64,
    #[arg(long, default_value_t = overlay_core::overlay::DEFAULT_HEIGHT)]
    pub height: f64,
}

/// Optional fields of the edit form.
#[derive(Debug, Clone, Default, Args)]
pub struct OverlayFieldChanges {
    #[arg(short = 't', long = "type")]
    pub kind: Option<OverlayKind>,
    #[arg(short, long)]
    pub content: Option<String>,
    #[arg(long)]
    pub x: Option<f64>,
    #[arg(long)]
    pub y: Option<f64>,
    #[arg(long)]
    pub width: Option<f64>,
    #[arg(long)]
    pub height: Option<f64>,
}
