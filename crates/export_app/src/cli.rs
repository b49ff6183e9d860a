use std::path::PathBuf;

use clap::{ArgAction, Parser};
use export_engine::ExportFormat;

#[derive(Debug, Parser)]
#[command(name = "workspace-export")]
#[command(
    about = "Export a workspace, download the archive and strip hash suffixes from the extracted tree",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Session token sent as the `token_v2` cookie
    #[arg(long, env = "NOTION_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Workspace (space) to export
    #[arg(long, env = "NOTION_SPACE_ID")]
    pub space_id: Option<String>,

    /// Active user id sent with every request
    #[arg(long, env = "NOTION_USER_ID")]
    pub user_id: Option<String>,

    /// Export format (markdown or html)
    #[arg(long)]
    pub format: Option<ExportFormat>,

    /// Locale requested for the export
    #[arg(long)]
    pub locale: Option<String>,

    /// Time zone requested for the export
    #[arg(long)]
    pub time_zone: Option<String>,

    /// Seconds between status polls
    #[arg(long, value_name = "SECONDS")]
    pub poll_interval: Option<u64>,

    /// Give up waiting for the export after this many seconds
    #[arg(long, value_name = "SECONDS", conflicts_with = "no_max_wait")]
    pub max_wait: Option<u64>,

    /// Wait for the export for as long as it takes
    #[arg(long)]
    pub no_max_wait: bool,

    /// Directory that is wiped and refilled on every run
    #[arg(long, value_name = "DIR")]
    pub working_dir: Option<PathBuf>,

    /// RON file with non-secret settings; flags override it
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Also write the log to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}
