#![allow(clippy::enum_variant_names)]

use clap::Parser as _;
use tracing::debug;

use crate::{
    application::{Application, ApplicationError},
    cli::Cli,
};

mod application;
mod cli;
mod comparator;
mod config;
mod driver;
mod ext;
mod reconciler;

#[compio::main]
#[snafu::report]
async fn main() -> Result<(), ApplicationError> {
    let cli_args = Cli::parse();
    let config = Application::configure(cli_args).await?;
    Application::init_logging(&config)?;
    debug!("Resolved configuration: {config:?}");

    Application::run(config).await?;

    Ok(())
}
