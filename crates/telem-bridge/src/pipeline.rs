//! Per-frame processing: decode, log, map, index.

use chrono::{DateTime, FixedOffset};
use tracing::{info, warn};
use vehicle_telem::{DecodeError, DocumentMapper, FrameDecoder, VehicleStatus};

use crate::{store::DocumentStore, StoreError};

/// What happened to one frame.
#[derive(Debug)]
pub enum Outcome {
    Indexed,
    Rejected(DecodeError),
    StoreFailed(StoreError),
}

pub struct Pipeline<S> {
    decoder: FrameDecoder,
    mapper: DocumentMapper,
    store: S,
}

impl<S: DocumentStore> Pipeline<S> {
    pub fn new(decoder: FrameDecoder, mapper: DocumentMapper, store: S) -> Self {
        Self {
            decoder,
            mapper,
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Process one payload, stamping it as observed now in the decoder's time zone.
    pub async fn handle_frame(&self, payload: &[u8]) -> Outcome {
        let observed_at = self.decoder.config().time_zone.now();
        self.handle_frame_at(payload, observed_at).await
    }

    /// Failures are logged and reported in the returned [`Outcome`], never propagated: the next
    /// frame is processed regardless.
    pub async fn handle_frame_at(
        &self,
        payload: &[u8],
        observed_at: DateTime<FixedOffset>,
    ) -> Outcome {
        let status = match self.decoder.decode(payload) {
            Ok(status) => status,
            Err(err) => {
                warn!(%err, len = payload.len(), "dropping frame");
                return Outcome::Rejected(err);
            }
        };
        log_status(&status);

        let doc = self.mapper.to_document(status, observed_at);
        match self.store.index(&doc).await {
            Ok(()) => {
                info!(time = %doc.time, "data indexed");
                Outcome::Indexed
            }
            Err(err) => {
                warn!(%err, time = %doc.time, "failed to index data");
                Outcome::StoreFailed(err)
            }
        }
    }
}

fn log_status(status: &VehicleStatus) {
    let loc = status.location();
    let fix = if status.is_location_dead_reckoned() {
        "DR"
    } else {
        "GNSS"
    };
    info!(
        time = %status.time().format("%Y-%m-%d %H:%M:%S"),
        lon = %format_args!("{:.5}", loc.x),
        lat = %format_args!("{:.5}", loc.y),
        alt_m = %format_args!("{:.1}", loc.z),
        fix,
        speed_mps = %format_args!("{:.2}", status.velocity().magnitude()),
        accel_mps2 = %format_args!("{:.2}", status.acceleration().magnitude()),
        signal_pct = status.signal_strength(),
        battery = status.battery_status(),
        "new status"
    );
}
