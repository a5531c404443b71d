use async_trait::async_trait;

use crate::{error::TransportError, metrics::MetricKind};

pub mod graphite;

/// The transport a backend implements. A [`crate::Reporter`] drives its
/// sender through one `connect`, any number of `send`s and one `close` per
/// report cycle, and never overlaps two cycles, so implementations need no
/// locking and no call-order checks of their own.
#[async_trait]
pub trait Sender: Send + 'static {
    async fn connect(&mut self) -> Result<(), TransportError>;

    async fn send(
        &mut self,
        name: &str,
        value: &str,
        timestamp: u64,
        kind: MetricKind,
    ) -> Result<(), TransportError>;

    async fn close(&mut self) -> Result<(), TransportError>;
}

#[async_trait]
impl Sender for Box<dyn Sender> {
    async fn connect(&mut self) -> Result<(), TransportError> {
        (**self).connect().await
    }

    async fn send(
        &mut self,
        name: &str,
        value: &str,
        timestamp: u64,
        kind: MetricKind,
    ) -> Result<(), TransportError> {
        (**self).send(name, value, timestamp, kind).await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        (**self).close().await
    }
}
