//! # livetail-client
//!
//! Live-tail streaming engine for a log-ingestion platform.
//!
//! This crate opens a server-streamed feed for one log stream, rebuilds the
//! Arrow IPC message stream from the transport units it receives, decodes it
//! into rows, and keeps only the newest rows in a bounded window that can be
//! filtered live by a text query.
//!
//! ## Architecture
//!
//! - **Transport**: Arrow Flight `DoGet` with a JSON ticket `{"stream": name}`
//! - **Framing**: units are reassembled into prefixed, aligned IPC messages
//! - **Decoding**: incremental, one message at a time, schema first
//! - **Window**: fixed capacity, oldest rows evicted first
//! - **Session**: start/abort/restart with a generation check before every append
//!
//! ## Example
//!
//! ```ignore
//! use livetail_client::{FlightTransport, SessionController};
//!
//! #[tokio::main]
//! async fn main() {
//!     let session = SessionController::builder()
//!         .capacity(100)
//!         .build(FlightTransport::new());
//!
//!     session.start("app-logs", 8815).await.unwrap();
//!     session.set_search_query("error");
//!
//!     let view = session.view();
//!     println!("{}", serde_json::to_string(&view).unwrap());
//! }
//! ```

pub mod codec;
pub mod config;
pub mod decoder;
pub mod error;
pub mod filter;
pub mod model;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod window;

#[cfg(test)]
mod fixtures;

pub use config::LiveTailConfig;
pub use decoder::{BatchDecoder, DecodedUnit};
pub use error::LiveTailError;
pub use filter::{filter, SearchQuery};
pub use model::{Column, ColumnType, Row, Schema, Value};
pub use protocol::{FlightUnit, FrameReassembler};
pub use session::{LiveTailView, SessionController, SessionControllerBuilder, SessionStatus};
pub use transport::{FlightTransport, MemoryTransport, TailTransport, Target, UnitSender};
pub use window::{BoundedLog, Snapshot};
