use std::sync::Arc;

use snafu::Snafu;
use snafu::prelude::*;
use tracing::{error, info};

use crate::application::{RuntimeConfig, setup_tracing};
use crate::cli::Cli;
use crate::config::{ConfigFile, ConfigFileError};
use crate::driver::{Driver, DriverError};
use crate::reconciler::{Reconciler, TracingReporter};

pub struct Application;

impl Application {
    /// Merges the command line with the optional config file.
    pub async fn configure(cli: Cli) -> Result<RuntimeConfig, ApplicationError> {
        let config_file = match &cli.config {
            Some(path) => Some(ConfigFile::read(path).await.context(ConfigSnafu)?),
            None => None,
        };

        Ok(RuntimeConfig::resolve(cli, config_file))
    }

    pub fn init_logging(config: &RuntimeConfig) -> Result<(), ApplicationError> {
        setup_tracing(config).context(LoggingSnafu)
    }

    pub async fn run(config: impl Into<Arc<RuntimeConfig>>) -> Result<(), ApplicationError> {
        let driver = Driver::new(config.into(), Reconciler::new(TracingReporter));

        let passes = driver
            .run(Self::interrupted())
            .await
            .context(DriverSnafu)?;
        info!("Stopped after {passes} passes");

        Ok(())
    }

    /// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
    async fn interrupted() {
        match compio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupt received"),
            Err(e) => {
                error!("Failed to listen for interrupts: {e}");
                futures::future::pending::<()>().await;
            }
        }
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered while loading the config file"))]
    ConfigError { source: ConfigFileError },
    #[snafu(display("Critical failure encountered while setting up logging"))]
    LoggingError {
        source: crate::application::LoggingError,
    },
    #[snafu(display("Critical failure encountered while synchronizing"))]
    DriverError { source: DriverError },
}
