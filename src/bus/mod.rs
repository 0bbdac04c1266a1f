//! Message Bus Module
//!
//! Routes inbound events from the event transport to the dispatcher and job
//! reports from finished jobs back out to whatever consumes them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Transport  │────>│  MessageBus │────>│ Dispatcher  │
//! │   (stdin)   │     │  (inbound)  │     │   (jobs)    │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            ▲
//!                            │ outbound (JobReport)
//!                            │
//! ┌─────────────┐     ┌─────────────┐
//! │  Consumer   │<────│  MessageBus │
//! └─────────────┘     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use helmsman::bus::{InboundEvent, MessageBus, MessageSent};
//!
//! #[tokio::main]
//! async fn main() {
//!     let bus = MessageBus::new();
//!
//!     let event = InboundEvent::MessageSent(MessageSent::new("m1", "c1", "p1", "Hello"));
//!     bus.publish_inbound(event).await.unwrap();
//!
//!     if let Some(received) = bus.consume_inbound().await {
//!         assert_eq!(received.message_id(), "m1");
//!     }
//! }
//! ```

pub mod message;

pub use message::{InboundEvent, JobReport, JobStatus, MessageCancel, MessageSent};

use crate::error::{HelmError, Result};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::Mutex;

/// Default buffer size for both channels
pub const DEFAULT_BUFFER_SIZE: usize = 100;

/// Inbound events and outbound job reports over bounded MPSC queues.
///
/// Clones share the same underlying channels.
pub struct MessageBus {
    inbound_tx: mpsc::Sender<InboundEvent>,
    inbound_rx: Arc<Mutex<mpsc::Receiver<InboundEvent>>>,
    outbound_tx: mpsc::Sender<JobReport>,
    outbound_rx: Arc<Mutex<mpsc::Receiver<JobReport>>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    /// Creates a bus whose channels hold at most `buffer_size` items each.
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(buffer_size.max(1));
        let (outbound_tx, outbound_rx) = mpsc::channel(buffer_size.max(1));

        Self {
            inbound_tx,
            inbound_rx: Arc::new(Mutex::new(inbound_rx)),
            outbound_tx,
            outbound_rx: Arc::new(Mutex::new(outbound_rx)),
        }
    }

    /// Publishes an inbound event, waiting for buffer space.
    ///
    /// # Errors
    /// Returns `HelmError::BusClosed` if the receiver has been dropped.
    pub async fn publish_inbound(&self, event: InboundEvent) -> Result<()> {
        self.inbound_tx
            .send(event)
            .await
            .map_err(|_| HelmError::BusClosed)
    }

    /// Next inbound event, or `None` once every sender is gone.
    pub async fn consume_inbound(&self) -> Option<InboundEvent> {
        self.inbound_rx.lock().await.recv().await
    }

    /// Next inbound event that is already queued, without waiting for more.
    pub async fn try_consume_inbound(&self) -> Option<InboundEvent> {
        self.inbound_rx.lock().await.try_recv().ok()
    }

    pub async fn publish_outbound(&self, report: JobReport) -> Result<()> {
        self.outbound_tx
            .send(report)
            .await
            .map_err(|_| HelmError::BusClosed)
    }

    pub async fn consume_outbound(&self) -> Option<JobReport> {
        self.outbound_rx.lock().await.recv().await
    }

    /// A sender that can be moved into a producer task.
    ///
    /// The inbound side closes once the bus and every sender are dropped.
    pub fn inbound_sender(&self) -> mpsc::Sender<InboundEvent> {
        self.inbound_tx.clone()
    }

    pub fn outbound_sender(&self) -> mpsc::Sender<JobReport> {
        self.outbound_tx.clone()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MessageBus {
    fn clone(&self) -> Self {
        Self {
            inbound_tx: self.inbound_tx.clone(),
            inbound_rx: Arc::clone(&self.inbound_rx),
            outbound_tx: self.outbound_tx.clone(),
            outbound_rx: Arc::clone(&self.outbound_rx),
        }
    }
}
