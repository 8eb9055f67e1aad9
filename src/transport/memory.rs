//! In-process transport fed through channels.
//!
//! Each stream name gets one channel. The sending half stays with the caller,
//! the receiving half is handed out by the first `open` for that name.
//! Dropping the [`UnitSender`] ends the feed.
//!
//! # Example
//!
//! ```
//! use livetail_client::transport::MemoryTransport;
//!
//! let transport = MemoryTransport::new();
//! let feed = transport.feed("app-logs");
//! assert!(!feed.is_closed());
//! assert_eq!(transport.open_count(), 0);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{TailTransport, Target, UnitStream};
use crate::codec::TicketCodec;
use crate::error::{LiveTailError, Result};
use crate::protocol::FlightUnit;

type UnitReceiver = mpsc::UnboundedReceiver<Result<FlightUnit>>;

#[derive(Default)]
struct Feeds {
    pending: HashMap<String, UnitReceiver>,
    opens: Vec<(Target, String)>,
}

/// Channel-backed transport. Clones share the same feeds.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    feeds: Arc<Mutex<Feeds>>,
}

impl MemoryTransport {
    /// Create a transport with no feeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a feed for `stream`, replacing any feed not yet opened.
    pub fn feed(&self, stream: &str) -> UnitSender {
        let (tx, rx) = mpsc::unbounded_channel();
        self.feeds.lock().pending.insert(stream.to_string(), rx);
        UnitSender { tx }
    }

    /// Every successful open so far, as `(target, stream)`.
    pub fn opens(&self) -> Vec<(Target, String)> {
        self.feeds.lock().opens.clone()
    }

    /// Number of successful opens.
    pub fn open_count(&self) -> usize {
        self.feeds.lock().opens.len()
    }
}

#[async_trait]
impl TailTransport for MemoryTransport {
    async fn open(&self, target: &Target, ticket: Bytes) -> Result<UnitStream> {
        let stream = TicketCodec::decode(&ticket)?;

        let rx = {
            let mut feeds = self.feeds.lock();
            let rx = feeds.pending.remove(&stream).ok_or_else(|| {
                LiveTailError::Transport(format!("Stream '{}' not available on {}", stream, target))
            })?;
            feeds.opens.push((target.clone(), stream));
            rx
        };

        let units = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        Ok(units.boxed())
    }
}

/// Sending half of a memory feed.
#[derive(Debug, Clone)]
pub struct UnitSender {
    tx: mpsc::UnboundedSender<Result<FlightUnit>>,
}

impl UnitSender {
    /// Deliver one unit. Returns false if the feed is gone.
    pub fn send(&self, unit: FlightUnit) -> bool {
        self.tx.send(Ok(unit)).is_ok()
    }

    /// Deliver units in order. Returns false if the feed is gone.
    pub fn send_all(&self, units: impl IntoIterator<Item = FlightUnit>) -> bool {
        units.into_iter().all(|unit| self.send(unit))
    }

    /// Fail the feed mid-stream.
    pub fn fail(&self, err: LiveTailError) -> bool {
        self.tx.send(Err(err)).is_ok()
    }

    /// Check if the reading side has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
