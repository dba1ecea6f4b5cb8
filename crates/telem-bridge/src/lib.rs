//! Glue between the vehicle's MQTT topic and the Elasticsearch index.
//!
//! Frames arrive through [`transport`], go through [`pipeline::Pipeline`] (decode, log, map)
//! and land in a [`store::DocumentStore`]. A bad frame is logged and dropped; it never stops
//! the stream.

use thiserror::Error;

pub mod config;
pub mod pipeline;
pub mod store;
pub mod transport;

/// Failures talking to the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store responded {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to read CA certificate {path}: {source}")]
    CaCert {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures on the MQTT side or while producing simulated frames.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("MQTT client error: {0}")]
    Client(#[from] rumqttc::ClientError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] vehicle_telem::Error),
}
