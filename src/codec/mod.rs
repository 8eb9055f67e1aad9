//! Codec module - payload encoding for the live-tail feed.
//!
//! - [`TicketCodec`] - JSON ticket that names the stream to open
//! - [`rows`] - Arrow columns to [`Value`](crate::model::Value) rows

pub mod rows;
mod ticket;

pub use rows::{column_type, rows_from_batch, schema_from_arrow};
pub use ticket::{TailTicket, TicketCodec};
