//! Telemetry sinks.
//!
//! A sink receives one record per drone per tick. Implementations must not
//! block; a slow consumer should drop records rather than stall a drone loop.

use std::sync::Arc;

use fleet_core::Telemetry;
use tokio::sync::mpsc;

use crate::error::SinkError;

pub trait TelemetrySink: Send + Sync {
    fn publish(&self, telemetry: &Telemetry) -> Result<(), SinkError>;
}

impl<F> TelemetrySink for F
where
    F: Fn(&Telemetry) -> Result<(), SinkError> + Send + Sync,
{
    fn publish(&self, telemetry: &Telemetry) -> Result<(), SinkError> {
        self(telemetry)
    }
}

/// Forwards records into a bounded channel without waiting.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<Telemetry>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Telemetry>) -> Self {
        Self { tx }
    }

    /// Create a sink and the receiving half of its channel.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Telemetry>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl TelemetrySink for ChannelSink {
    fn publish(&self, telemetry: &Telemetry) -> Result<(), SinkError> {
        self.tx.try_send(telemetry.clone()).map_err(|err| match err {
            mpsc::error::TrySendError::Full(t) => SinkError::Full(t.drone_id),
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })
    }
}

/// Logs every record at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn publish(&self, t: &Telemetry) -> Result<(), SinkError> {
        tracing::debug!(
            drone_id = %t.drone_id,
            status = %t.status,
            lat = t.lat,
            lon = t.lon,
            altitude_m = t.altitude_m,
            battery_pct = t.battery_pct,
            "telemetry"
        );
        Ok(())
    }
}

/// Publishes to several sinks. Every sink is tried; the first error is returned.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn TelemetrySink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl TelemetrySink for FanoutSink {
    fn publish(&self, telemetry: &Telemetry) -> Result<(), SinkError> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(err) = sink.publish(telemetry) {
                first_err.get_or_insert(err);
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
