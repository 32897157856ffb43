use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::LevelFilter;

use crate::logging::LogDestination;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Convert Word exam documents into Moodle quiz packages",
    long_about = None
)]
pub struct Cli {
    /// Settings file (allow-list, default key, pipeline command)
    #[arg(long, global = true, env = "QUIZPRESS_CONFIG", default_value = "quizpress.toml")]
    pub config: PathBuf,

    /// Per-user profile remembering the login and saved API key
    #[arg(long, global = true, env = "QUIZPRESS_PROFILE", default_value = ".quizpress_profile.ron")]
    pub profile: PathBuf,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn log_destination(&self) -> LogDestination {
        match &self.log_file {
            Some(path) => LogDestination::Both(path.clone()),
            None => LogDestination::Terminal,
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in with an allowed email address and remember it
    Login { email: String },
    /// Forget the remembered login
    Logout,
    /// Show login, key and configuration status
    Status,
    /// Manage the saved image-hosting API key
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
    /// List the system default ID mapping files
    Mappings,
    /// Convert documents and write the result archive
    Run(RunArgs),
}

#[derive(Subcommand, Debug)]
pub enum KeyAction {
    /// Save a key for later runs
    Save { key: String },
    /// Remove the saved key
    Clear,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Word documents (.docx) to convert
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Upload this ID mapping file (.xlsx)
    #[arg(long, conflicts_with = "default_mapping")]
    pub mapping: Option<PathBuf>,

    /// Use the named system default mapping file
    #[arg(long)]
    pub default_mapping: Option<String>,

    /// API key for this run; overrides the saved key
    #[arg(long)]
    pub api_key: Option<String>,

    /// Directory receiving the result archive
    #[arg(short, long, default_value = ".")]
    pub out: PathBuf,

    /// Skip writing manifest.json next to the archive
    #[arg(long)]
    pub no_manifest: bool,
}
