//! MQTT transport: delivers raw frame payloads from the telemetry topic, and publishes simulated
//! frames onto it.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};
use vehicle_telem::{
    model::{TelemStream, TimeDelta},
    protocol::encode,
    FrameZone,
};

use crate::TransportError;

/// Pause before polling again after a connection error. The event loop reconnects on the next
/// poll.
const RECONNECT_PAUSE: Duration = Duration::from_secs(2);
const REQUEST_CAPACITY: usize = 64;
const SUBSCRIBE_QOS: QoS = QoS::AtMostOnce;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MqttConfig {
    pub server: String,
    pub port: u16,
    pub topic: String,
    pub client_id: String,
    pub keep_alive: Duration,
}

impl MqttConfig {
    pub fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.server, self.port);
        options.set_keep_alive(self.keep_alive);
        options
    }
}

/// What the subscriber loop does in response to one event from the broker connection.
#[derive(Debug, PartialEq)]
enum Step {
    /// A session was (re)established: renew the subscription.
    Subscribe,
    /// A frame arrived on the topic.
    Deliver(Bytes),
    Idle,
}

fn on_event(event: Event) -> Step {
    match event {
        // Refused connections surface as poll errors, so every ConnAck seen here is accepted.
        Event::Incoming(Packet::ConnAck(_)) => Step::Subscribe,
        Event::Incoming(Packet::Publish(publish)) => {
            debug!(topic = %publish.topic, len = publish.payload.len(), "frame received");
            Step::Deliver(publish.payload)
        }
        Event::Incoming(Packet::Disconnect) => {
            warn!("broker closed the MQTT session");
            Step::Idle
        }
        _ => Step::Idle,
    }
}

/// Subscribe to the configured topic and hand every payload to `deliver`, one at a time.
///
/// The subscription is renewed on every ConnAck so it survives reconnects. Runs until the client
/// can no longer queue requests.
pub async fn subscribe<F, Fut>(config: &MqttConfig, mut deliver: F) -> Result<(), TransportError>
where
    F: FnMut(Bytes) -> Fut,
    Fut: Future<Output = ()>,
{
    info!(
        server = %config.server,
        port = config.port,
        "connecting to MQTT broker"
    );
    let (client, mut eventloop) = AsyncClient::new(config.options(), REQUEST_CAPACITY);
    loop {
        match eventloop.poll().await.map(on_event) {
            Ok(Step::Subscribe) => {
                info!("connected to MQTT broker");
                client.subscribe(&config.topic, SUBSCRIBE_QOS).await?;
                info!(topic = %config.topic, "subscribed");
            }
            Ok(Step::Deliver(payload)) => deliver(payload).await,
            Ok(Step::Idle) => {}
            Err(err) => {
                warn!(%err, "MQTT connection error, retrying in {:?}", RECONNECT_PAUSE);
                tokio::time::sleep(RECONNECT_PAUSE).await;
            }
        }
    }
}

/// Drive an event loop until our own Disconnect has gone out.
async fn drive(mut eventloop: EventLoop) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                info!(code = ?ack.code, "publisher connected");
            }
            Ok(_) => {}
            Err(err) => {
                warn!(%err, "MQTT connection error, retrying in {:?}", RECONNECT_PAUSE);
                tokio::time::sleep(RECONNECT_PAUSE).await;
            }
        }
    }
}

/// Sample `stream` every `period` and publish each sample as an encoded frame. Publishes
/// `count` frames, or runs forever when `count` is `None`.
pub async fn publish_frames<S: TelemStream>(
    config: &MqttConfig,
    stream: &mut S,
    period: Duration,
    count: Option<u64>,
    time_zone: FrameZone,
) -> Result<(), TransportError> {
    let (client, eventloop) = AsyncClient::new(config.options(), REQUEST_CAPACITY);
    let mut driver = tokio::spawn(drive(eventloop));

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let delta_t = TimeDelta::from(period);
    let mut sent = 0u64;
    while count.map_or(true, |count| sent < count) {
        ticker.tick().await;
        let at = time_zone.now();
        let status = stream.next(delta_t, at)?;
        let frame = encode(&status)?;
        client
            .publish(
                &config.topic,
                QoS::AtLeastOnce,
                false,
                frame.as_bytes().to_vec(),
            )
            .await?;
        sent += 1;
        info!(
            sent,
            time = %status.time(),
            lat = status.location().y,
            lon = status.location().x,
            "published frame"
        );
    }

    client.disconnect().await?;
    if !finish_driver(&mut driver, RECONNECT_PAUSE * 5).await {
        warn!("timed out flushing MQTT publisher");
    }
    Ok(())
}

/// Wait up to `wait` for the publisher's event loop to finish, aborting it otherwise. Returns
/// whether it finished on its own.
async fn finish_driver(driver: &mut JoinHandle<()>, wait: Duration) -> bool {
    if timeout(wait, &mut *driver).await.is_ok() {
        return true;
    }
    driver.abort();
    false
}
