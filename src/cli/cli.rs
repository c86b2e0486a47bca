use std::path::PathBuf;

use clap::Parser;

use crate::application::data::LogLevel;

/// Keep a replica directory identical to a source directory.
///
/// Values not given on the command line are taken from the config file, then
/// from the built-in defaults.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    /// Directory to mirror from [default: source]
    #[clap(long, short)]
    pub source: Option<PathBuf>,

    /// Directory to mirror into [default: replica]
    #[clap(long, short)]
    pub replica: Option<PathBuf>,

    /// Seconds to wait between passes [default: 60]
    #[clap(long, short)]
    pub interval: Option<u64>,

    /// File that receives a copy of every log record [default: log.txt]
    #[clap(long, short)]
    pub log_file: Option<PathBuf>,

    #[clap(long, default_value = "info", value_enum)]
    pub log_level: LogLevel,

    /// YAML file with source, replica, interval and log_file settings
    #[clap(long, short)]
    pub config: Option<PathBuf>,

    /// Run a single pass and exit
    #[clap(long)]
    pub once: bool,
}
