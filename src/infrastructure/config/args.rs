use super::app_config::LogLevel;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "marketchat",
    version,
    about = "Real-time marketplace chat client",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH", global = true)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    /// Session token. Overrides the keyring for this run.
    #[arg(long, env = "MARKETCHAT_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Id of the signed-in user.
    #[arg(long, env = "MARKETCHAT_USER_ID", global = true)]
    pub user_id: Option<String>,

    /// REST API base URL.
    #[arg(long, value_name = "URL", env = "MARKETCHAT_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Socket server URL.
    #[arg(long, value_name = "URL", env = "MARKETCHAT_SOCKET_URL", global = true)]
    pub socket_url: Option<String>,

    /// Enable desktop notifications.
    #[arg(long, global = true)]
    pub desktop_notifications: Option<bool>,

    /// Ring the terminal bell on new messages.
    #[arg(long, global = true)]
    pub sound: Option<bool>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List conversation threads with unread counts.
    Threads,
    /// Print the history of a thread.
    Open(OpenArgs),
    /// Send a message to a thread.
    Send(SendArgs),
    /// Follow live messages and notifications until interrupted.
    Watch(WatchArgs),
    /// Accept a provider's application and open the resulting chat.
    Approve(ApproveArgs),
    /// Verify a token and store it in the system keyring.
    Login,
    /// Remove the stored token.
    Logout,
}

/// Thread selection, either directly or through its order.
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct ThreadTarget {
    /// Thread id.
    #[arg(long)]
    pub thread: Option<String>,

    /// Order id; waits for the order's thread to appear.
    #[arg(long)]
    pub order: Option<String>,
}

#[derive(Debug, Args)]
pub struct OpenArgs {
    #[command(flatten)]
    pub target: ThreadTarget,

    /// Human-readable order reference shown while waiting.
    #[arg(long = "ref", value_name = "REF")]
    pub display_ref: Option<String>,

    /// Also fetch this many older pages.
    #[arg(long, default_value_t = 0)]
    pub older_pages: u32,
}

#[derive(Debug, Args)]
pub struct SendArgs {
    /// Thread id.
    #[arg(long)]
    pub thread: String,

    /// Message text.
    #[arg(required = true, num_args = 1..)]
    pub text: Vec<String>,
}

impl SendArgs {
    #[must_use]
    pub fn message(&self) -> String {
        self.text.join(" ")
    }
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Thread to keep open and mark read while watching.
    #[arg(long)]
    pub thread: Option<String>,
}

#[derive(Debug, Args)]
pub struct ApproveArgs {
    /// Service request id.
    #[arg(long)]
    pub request: String,

    /// Provider application id.
    #[arg(long)]
    pub application: String,
}
