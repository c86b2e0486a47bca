//! Repeats reconciliation passes on a fixed interval until told to stop.

#[allow(clippy::module_inception)]
mod driver;

pub use driver::{Driver, DriverError};
