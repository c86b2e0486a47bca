use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

use futures::{FutureExt, pin_mut, select};
use snafu::{ResultExt, Snafu};
use tracing::{debug, info, warn};

use crate::application::RuntimeConfig;
use crate::ext::BestEffortPathExt;
use crate::reconciler::{Reconciler, SyncReporter};

pub struct Driver<R> {
    config: Arc<RuntimeConfig>,
    reconciler: Reconciler<R>,
}

impl<R: SyncReporter> Driver<R> {
    pub fn new(config: Arc<RuntimeConfig>, reconciler: Reconciler<R>) -> Self {
        Self { config, reconciler }
    }

    #[cfg(test)]
    pub fn reconciler(&self) -> &Reconciler<R> {
        &self.reconciler
    }

    /// Checks the source root and makes sure the replica root exists.
    pub fn prepare(&self) -> Result<(), DriverError> {
        let source = &self.config.source;
        let metadata = source.metadata().context(SourceMissingSnafu {
            path: source.clone(),
        })?;
        if !metadata.is_dir() {
            return Err(DriverError::SourceNotDirectory {
                path: source.clone(),
            });
        }

        let replica = &self.config.replica;
        match replica.metadata() {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            Ok(_) => Err(DriverError::ReplicaNotDirectory {
                path: replica.clone(),
            }),
            Err(error) if error.kind() == ErrorKind::NotFound => {
                std::fs::create_dir_all(replica).context(CreateReplicaSnafu {
                    path: replica.clone(),
                })?;
                info!(
                    "Created replica root {}",
                    replica.best_effort_path_display()
                );
                Ok(())
            }
            Err(error) => Err(error).context(CreateReplicaSnafu {
                path: replica.clone(),
            }),
        }
    }

    /// Runs passes until `shutdown` resolves, or once if so configured.
    ///
    /// `shutdown` is watched both between and during passes. Returns the number
    /// of passes started.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) -> Result<usize, DriverError> {
        self.prepare()?;
        info!(
            "Mirroring {} into {} every {}s",
            self.config.source.best_effort_path_display(),
            self.config.replica.best_effort_path_display(),
            self.config.interval.as_secs()
        );

        let shutdown = shutdown.fuse();
        pin_mut!(shutdown);
        let mut passes = 0;

        loop {
            passes += 1;
            debug!("Starting pass {passes}");

            let pass = self
                .reconciler
                .reconcile(&self.config.source, &self.config.replica)
                .fuse();
            pin_mut!(pass);
            select! {
                summary = pass => {
                    if summary.failed > 0 {
                        warn!("Pass {passes} finished: {summary}");
                    } else if summary.is_noop() {
                        debug!("Pass {passes} finished: replica already up to date");
                    } else {
                        info!("Pass {passes} finished: {summary}");
                    }
                }
                () = shutdown => {
                    info!("Shutdown requested during pass {passes}, stopping");
                    return Ok(passes);
                }
            }

            if self.config.once {
                return Ok(passes);
            }

            // A pass that overran the interval is simply followed by the next one.
            let sleep = compio::time::sleep(self.config.interval).fuse();
            pin_mut!(sleep);
            select! {
                () = sleep => {}
                () = shutdown => {
                    info!("Shutdown requested, stopping after {passes} passes");
                    return Ok(passes);
                }
            }
        }
    }
}

#[derive(Debug, Snafu)]
pub enum DriverError {
    #[snafu(display("Source directory {} cannot be accessed", path.best_effort_path_display()))]
    SourceMissing {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Source {} is not a directory", path.best_effort_path_display()))]
    SourceNotDirectory { path: PathBuf },
    #[snafu(display("Replica {} exists but is not a directory", path.best_effort_path_display()))]
    ReplicaNotDirectory { path: PathBuf },
    #[snafu(display("Failed to create replica root {}", path.best_effort_path_display()))]
    CreateReplicaError {
        path: PathBuf,
        source: std::io::Error,
    },
}
