use std::{io, time::Duration};

use thiserror::Error;

use crate::metrics::MetricKind;

/// Errors surfaced by the [`crate::Registry`] at registration time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("metric {name:?} is already registered as a {existing}, not a {requested}")]
    KindMismatch {
        name: String,
        existing: MetricKind,
        requested: MetricKind,
    },
}

/// Lifecycle misuse of a [`crate::Reporter`], plus failures to bring up its
/// background thread.
#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("reporter is already running")]
    AlreadyRunning,
    #[error("reporter is not running")]
    NotRunning,
    #[error("reporter thread died and its sender was lost")]
    WorkerLost,
    #[error("report_once cannot block inside an async runtime")]
    InsideRuntime,
    #[error("report interval must be non-zero")]
    InvalidInterval,
    #[error("failed to build reporter runtime: {0}")]
    Runtime(#[source] io::Error),
    #[error("failed to spawn reporter thread: {0}")]
    Spawn(#[source] io::Error),
}

/// Failures talking to a metrics backend. These never leave the reporter's
/// background thread; they are logged and counted instead.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("{op} timed out after {after:?}")]
    Timeout { op: &'static str, after: Duration },
    #[error("sender is not connected")]
    NotConnected,
}
