//! Arrow Flight transport.
//!
//! Connects a tonic channel to the target and calls `DoGet` with the JSON
//! ticket. Every `FlightData` item becomes one [`FlightUnit`].

use arrow_flight::flight_service_client::FlightServiceClient;
use arrow_flight::Ticket;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tonic::transport::Endpoint;

use super::{TailTransport, Target, UnitStream};
use crate::error::{LiveTailError, Result};
use crate::protocol::FlightUnit;

/// Flight `DoGet` client. A new channel is connected per feed.
#[derive(Debug, Clone, Default)]
pub struct FlightTransport;

impl FlightTransport {
    /// Create a Flight transport.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TailTransport for FlightTransport {
    async fn open(&self, target: &Target, ticket: Bytes) -> Result<UnitStream> {
        let url = target.url();
        tracing::debug!("Connecting to {}", url);

        let channel = Endpoint::from_shared(url)?.connect().await?;
        let mut client = FlightServiceClient::new(channel);
        let response = client.do_get(Ticket { ticket }).await?;

        let units = response.into_inner().map(|item| {
            item.map(FlightUnit::from)
                .map_err(LiveTailError::from)
        });
        Ok(units.boxed())
    }
}
