use std::path::PathBuf;
use std::time::Duration;

use crate::application::data::LogLevel;
use crate::cli::Cli;
use crate::config::ConfigFile;

const DEFAULT_SOURCE: &str = "source";
const DEFAULT_REPLICA: &str = "replica";
const DEFAULT_INTERVAL_SECS: u64 = 60;
const DEFAULT_LOG_FILE: &str = "log.txt";

/// Fully resolved settings for a run.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub source: PathBuf,
    pub replica: PathBuf,
    pub interval: Duration,
    pub log_file: PathBuf,
    pub log_level: LogLevel,
    pub once: bool,
}

impl RuntimeConfig {
    /// Command line wins over the config file, which wins over the defaults.
    pub fn resolve(cli: Cli, file: Option<ConfigFile>) -> Self {
        let file = file.unwrap_or_default();

        Self {
            source: cli
                .source
                .or(file.source)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE)),
            replica: cli
                .replica
                .or(file.replica)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_REPLICA)),
            interval: Duration::from_secs(
                cli.interval
                    .or(file.interval)
                    .unwrap_or(DEFAULT_INTERVAL_SECS),
            ),
            log_file: cli
                .log_file
                .or(file.log_file)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            log_level: cli.log_level,
            once: cli.once,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("dirmirror").chain(args.iter().copied()))
            .expect("Failed to parse arguments")
    }

    #[test]
    fn defaults_apply_without_flags_or_file() {
        let config = RuntimeConfig::resolve(parse(&[]), None);

        assert_eq!(config.source, PathBuf::from("source"));
        assert_eq!(config.replica, PathBuf::from("replica"));
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.log_file, PathBuf::from("log.txt"));
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(!config.once);
    }

    #[test]
    fn short_and_long_flags_are_accepted() {
        let cli = parse(&["-s", "in", "-r", "out", "-i", "5", "-l", "sync.log", "--once"]);
        let config = RuntimeConfig::resolve(cli, None);

        assert_eq!(config.source, PathBuf::from("in"));
        assert_eq!(config.replica, PathBuf::from("out"));
        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.log_file, PathBuf::from("sync.log"));
        assert!(config.once);

        let cli = parse(&[
            "--source",
            "a",
            "--replica",
            "b",
            "--interval",
            "0",
            "--log-file",
            "c",
            "--log-level",
            "debug",
        ]);
        let config = RuntimeConfig::resolve(cli, None);
        assert_eq!(config.interval, Duration::ZERO);
        assert_eq!(config.log_level, LogLevel::Debug);
    }

    #[test]
    fn command_line_overrides_config_file() {
        let file = ConfigFile {
            source: Some(PathBuf::from("file-source")),
            replica: Some(PathBuf::from("file-replica")),
            interval: Some(10),
            log_file: None,
        };

        let config = RuntimeConfig::resolve(parse(&["--replica", "cli-replica"]), Some(file));

        assert_eq!(config.source, PathBuf::from("file-source"));
        assert_eq!(config.replica, PathBuf::from("cli-replica"));
        assert_eq!(config.interval, Duration::from_secs(10));
        assert_eq!(config.log_file, PathBuf::from("log.txt"));
    }

    #[test]
    fn negative_interval_is_rejected() {
        assert!(Cli::try_parse_from(["dirmirror", "--interval", "-3"]).is_err());
    }
}
