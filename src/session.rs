//! Session controller: one live-tail feed at a time.
//!
//! The [`SessionController`] owns the bounded window and the decode pipeline.
//! A pipeline is a spawned task that reads transport units, reassembles and
//! decodes them, and applies the results to shared state:
//!
//! ```text
//! transport ─► FrameReassembler ─► BatchDecoder ─► BoundedLog ─► filter ─► view()
//! ```
//!
//! Every pipeline carries the generation it was started under. `abort()`,
//! `reset()` and a restarting `start()` bump the generation under the state
//! lock, and every side effect of a pipeline re-checks it under that same
//! lock. A batch decoded by a superseded pipeline is therefore never appended,
//! no matter when it resolves.
//!
//! # Example
//!
//! ```ignore
//! use livetail_client::{FlightTransport, SessionController};
//!
//! #[tokio::main]
//! async fn main() -> livetail_client::error::Result<()> {
//!     let session = SessionController::builder()
//!         .host("logs.internal")
//!         .capacity(200)
//!         .build(FlightTransport::new());
//!
//!     session.start("app-logs", 8815).await?;
//!     let mut updates = session.updates();
//!     while updates.changed().await.is_ok() {
//!         let view = session.view();
//!         println!("{:?}: {} rows", view.status, view.rows.len());
//!     }
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::codec::TicketCodec;
use crate::config::LiveTailConfig;
use crate::decoder::{BatchDecoder, DecodedUnit};
use crate::error::{LiveTailError, Result};
use crate::filter::{filter, SearchQuery};
use crate::model::Schema;
use crate::protocol::FrameReassembler;
use crate::transport::{TailTransport, Target};
use crate::window::{BoundedLog, Snapshot};

/// Lifecycle state of the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Nothing started yet, or reset.
    Idle,
    /// Feed requested, schema not received yet.
    Connecting,
    /// Schema received; batches are being appended.
    Streaming,
    /// Aborted while streaming, or the feed ended.
    Stopped,
    /// Aborted before the feed produced a schema.
    Aborted,
    /// Failed. The message is kept in `LiveTailView::error`.
    Errored,
}

impl SessionStatus {
    /// Check if a pipeline may still change the session.
    pub fn is_active(&self) -> bool {
        matches!(self, SessionStatus::Connecting | SessionStatus::Streaming)
    }
}

/// Everything the UI needs to render one frame.
#[derive(Debug, Clone, Serialize)]
pub struct LiveTailView {
    pub status: SessionStatus,
    pub target: Option<Target>,
    pub stream: Option<String>,
    pub schema: Option<Schema>,
    /// Window rows matching the query, oldest first.
    pub rows: Snapshot,
    pub query: String,
    pub error: Option<String>,
    /// Rows in the window before filtering.
    pub total_rows: usize,
}

/// State shared between the controller and its pipeline.
struct Shared {
    generation: u64,
    status: SessionStatus,
    target: Option<Target>,
    stream: Option<String>,
    schema: Option<Schema>,
    log: BoundedLog,
    query: SearchQuery,
    error: Option<String>,
}

impl Shared {
    fn new(capacity: usize) -> Self {
        Self {
            generation: 0,
            status: SessionStatus::Idle,
            target: None,
            stream: None,
            schema: None,
            log: BoundedLog::new(capacity),
            query: SearchQuery::default(),
            error: None,
        }
    }

    /// Invalidate the running pipeline and drop its data.
    fn teardown(&mut self) {
        self.generation += 1;
        self.log.clear();
        self.schema = None;
    }
}

/// Builder for a [`SessionController`].
///
/// # Example
///
/// ```
/// use livetail_client::{MemoryTransport, SessionController};
///
/// let session = SessionController::builder()
///     .capacity(50)
///     .host("10.0.0.7")
///     .build(MemoryTransport::new());
/// assert_eq!(session.config().capacity, 50);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SessionControllerBuilder {
    config: LiveTailConfig,
}

impl SessionControllerBuilder {
    /// Create a builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the window capacity.
    ///
    /// Default: 100
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// Set the host used by [`SessionController::start`].
    ///
    /// Default: `localhost`
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the URL scheme used by [`SessionController::start`].
    ///
    /// Default: `http`
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.config.scheme = scheme.into();
        self
    }

    /// Set the largest accepted message header.
    pub fn max_metadata_size(mut self, size: usize) -> Self {
        self.config.max_metadata_size = size;
        self
    }

    /// Set the largest accepted message body.
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: LiveTailConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the controller over a transport.
    pub fn build<T: TailTransport>(self, transport: T) -> SessionController {
        SessionController::new(Arc::new(transport), self.config)
    }
}

/// Drives one live-tail session at a time.
pub struct SessionController {
    transport: Arc<dyn TailTransport>,
    config: LiveTailConfig,
    shared: Arc<Mutex<Shared>>,
    changes: Arc<watch::Sender<u64>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SessionController {
    /// Create a new controller builder.
    pub fn builder() -> SessionControllerBuilder {
        SessionControllerBuilder::new()
    }

    fn new(transport: Arc<dyn TailTransport>, config: LiveTailConfig) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            transport,
            shared: Arc::new(Mutex::new(Shared::new(config.capacity))),
            config,
            changes: Arc::new(changes),
            task: Mutex::new(None),
        }
    }

    /// Configuration this controller was built with.
    pub fn config(&self) -> &LiveTailConfig {
        &self.config
    }

    /// Start tailing `stream` on the configured host at `port`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSessionRequest` for an empty stream name or port 0.
    pub async fn start(&self, stream: &str, port: u16) -> Result<()> {
        let target = Target::new(self.config.host.clone(), port).with_scheme(&self.config.scheme);
        self.start_target(target, stream).await
    }

    /// Start tailing `stream` on an explicit endpoint.
    ///
    /// Starting the stream that is already connecting or streaming on the
    /// same target does nothing. Any other start tears down the current
    /// pipeline, clears the window and opens a new feed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSessionRequest` for an empty stream name or an
    /// unusable target. The current session is torn down and marked errored.
    pub async fn start_target(&self, target: Target, stream: &str) -> Result<()> {
        let generation = {
            let mut shared = self.shared.lock();

            if shared.status.is_active()
                && shared.target.as_ref() == Some(&target)
                && shared.stream.as_deref() == Some(stream)
            {
                tracing::debug!("Already tailing '{}' on {}", stream, target);
                return Ok(());
            }

            shared.teardown();
            shared.target = Some(target.clone());
            shared.stream = Some(stream.to_string());

            if let Err(e) = Self::validate_request(&target, stream) {
                tracing::warn!("Rejected start request: {}", e);
                shared.status = SessionStatus::Errored;
                shared.error = Some(e.to_string());
                drop(shared);
                self.stop_task();
                self.notify();
                return Err(e);
            }

            shared.status = SessionStatus::Connecting;
            shared.error = None;
            shared.generation
        };
        self.notify();

        // The previous pipeline can no longer touch shared state; make sure
        // its task and transport are gone before opening the next feed.
        let previous = self.task.lock().take();
        if let Some(handle) = previous {
            handle.abort();
            let _ = handle.await;
        }

        let ticket = TicketCodec::encode(stream)?;

        // Another start, abort or reset may have run while the old task was
        // winding down. Only the current generation may spawn and own a task.
        let shared = self.shared.lock();
        if shared.generation != generation {
            tracing::debug!("Start of pipeline {} superseded before spawn", generation);
            return Ok(());
        }

        tracing::debug!(
            "Starting pipeline {} for '{}' on {}",
            generation,
            stream,
            target
        );
        let pipeline = Pipeline {
            generation,
            shared: self.shared.clone(),
            changes: self.changes.clone(),
        };
        let handle = tokio::spawn(pipeline.run(
            self.transport.clone(),
            target,
            ticket,
            self.config.clone(),
        ));

        if let Some(stale) = self.task.lock().replace(handle) {
            stale.abort();
        }
        drop(shared);
        Ok(())
    }

    fn validate_request(target: &Target, stream: &str) -> Result<()> {
        if stream.trim().is_empty() {
            return Err(LiveTailError::InvalidSessionRequest(
                "stream name must not be empty".to_string(),
            ));
        }
        target.validate()
    }

    /// Stop the current session.
    ///
    /// Takes effect immediately: nothing decoded by the current pipeline is
    /// appended after this returns. The window is cleared and the schema
    /// discarded. An errored session keeps its status and message.
    pub fn abort(&self) {
        {
            let mut shared = self.shared.lock();
            shared.teardown();
            shared.status = match shared.status {
                SessionStatus::Connecting => SessionStatus::Aborted,
                SessionStatus::Streaming => SessionStatus::Stopped,
                other => other,
            };
            tracing::debug!("Session aborted, now {:?}", shared.status);
        }
        self.stop_task();
        self.notify();
    }

    /// Abort and return to `Idle` with no query, error or endpoint.
    pub fn reset(&self) {
        {
            let mut shared = self.shared.lock();
            shared.teardown();
            shared.status = SessionStatus::Idle;
            shared.target = None;
            shared.stream = None;
            shared.query = SearchQuery::default();
            shared.error = None;
        }
        self.stop_task();
        self.notify();
    }

    /// Replace the live search query. The window itself is untouched.
    pub fn set_search_query(&self, text: &str) {
        self.shared.lock().query = SearchQuery::new(text);
        self.notify();
    }

    /// Current status.
    pub fn status(&self) -> SessionStatus {
        self.shared.lock().status
    }

    /// Unfiltered snapshot of the window.
    pub fn snapshot(&self) -> Snapshot {
        self.shared.lock().log.snapshot()
    }

    /// Consistent view of the session with the query applied.
    pub fn view(&self) -> LiveTailView {
        let (mut view, query) = {
            let shared = self.shared.lock();
            let view = LiveTailView {
                status: shared.status,
                target: shared.target.clone(),
                stream: shared.stream.clone(),
                schema: shared.schema.clone(),
                rows: shared.log.snapshot(),
                query: shared.query.as_str().to_string(),
                error: shared.error.clone(),
                total_rows: shared.log.len(),
            };
            (view, shared.query.clone())
        };
        view.rows = filter(&view.rows, &query);
        view
    }

    /// Change counter, bumped on every observable state change.
    pub fn updates(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    fn stop_task(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
    }

    fn notify(&self) {
        self.changes.send_modify(|n| *n += 1);
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}

/// One run of the decode pipeline.
struct Pipeline {
    generation: u64,
    shared: Arc<Mutex<Shared>>,
    changes: Arc<watch::Sender<u64>>,
}

impl Pipeline {
    async fn run(
        self,
        transport: Arc<dyn TailTransport>,
        target: Target,
        ticket: bytes::Bytes,
        config: LiveTailConfig,
    ) {
        match self.pump(transport.as_ref(), &target, ticket, &config).await {
            Ok(()) => self.finish(None),
            Err(e) => {
                if self.is_current() {
                    tracing::error!("Live tail on {} failed: {}", target, e);
                }
                self.finish(Some(e));
            }
        }
    }

    async fn pump(
        &self,
        transport: &dyn TailTransport,
        target: &Target,
        ticket: bytes::Bytes,
        config: &LiveTailConfig,
    ) -> Result<()> {
        if !self.is_current() {
            return Ok(());
        }
        let mut units = transport.open(target, ticket).await?;
        let mut reassembler = FrameReassembler::with_max_metadata(config.max_metadata_size);
        let mut decoder = BatchDecoder::with_limits(config.max_metadata_size, config.max_body_size);

        while let Some(unit) = units.next().await {
            if !self.is_current() {
                tracing::debug!("Pipeline {} superseded, dropping feed", self.generation);
                return Ok(());
            }

            let framed = reassembler.push(&unit?)?;
            for decoded in decoder.push(&framed)? {
                if !self.apply(decoded) {
                    return Ok(());
                }
            }
        }

        tracing::debug!(
            "Feed ended after {} units, {} rows",
            reassembler.units(),
            decoder.rows()
        );
        Ok(())
    }

    fn is_current(&self) -> bool {
        self.shared.lock().generation == self.generation
    }

    /// Apply one decoded unit. Returns false if this pipeline is stale.
    fn apply(&self, unit: DecodedUnit) -> bool {
        {
            let mut shared = self.shared.lock();
            if shared.generation != self.generation {
                return false;
            }
            match unit {
                DecodedUnit::Schema(schema) => {
                    tracing::debug!("Schema received: {} columns", schema.len());
                    shared.schema = Some(schema);
                    shared.status = SessionStatus::Streaming;
                }
                DecodedUnit::Batch(rows) => shared.log.append(rows),
                DecodedUnit::EndOfStream => return true,
            }
        }
        self.changes.send_modify(|n| *n += 1);
        true
    }

    /// Record how the feed ended, if this pipeline is still current.
    fn finish(&self, error: Option<LiveTailError>) {
        {
            let mut shared = self.shared.lock();
            if shared.generation != self.generation {
                return;
            }
            match error {
                Some(e) => {
                    shared.status = SessionStatus::Errored;
                    shared.error = Some(e.to_string());
                }
                None => shared.status = SessionStatus::Stopped,
            }
        }
        self.changes.send_modify(|n| *n += 1);
    }
}
