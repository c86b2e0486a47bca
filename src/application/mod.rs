#[allow(clippy::module_inception)]
mod application;
pub mod data;
mod logging;
mod runtime_config;

pub use application::{Application, ApplicationError};
pub use logging::{LoggingError, setup_tracing};
pub use runtime_config::RuntimeConfig;
