//! Command-line and environment configuration.
//!
//! Every option can be given as a flag or through the environment variable named next to it;
//! defaults match the public test broker and a local single-node Elasticsearch.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use vehicle_telem::{
    coord::{BBoxWGS, LatLon},
    DecoderConfig, FrameZone, MapperConfig, TGResult,
};

use crate::{store::StoreConfig, transport::MqttConfig};

const MQTT_KEEP_ALIVE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Parser)]
#[command(name = "telem-bridge", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub mqtt: MqttArgs,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub protocol: ProtocolArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Subscribe to the telemetry topic and index every valid frame (default).
    Listen,
    /// Publish frames from a simulated vehicle onto the telemetry topic.
    Simulate(SimulateArgs),
}

#[derive(Debug, Clone, Args)]
pub struct MqttArgs {
    #[arg(long, env = "MQTT_SERVER", default_value = "broker.hivemq.com", global = true)]
    pub mqtt_server: String,

    #[arg(long, env = "MQTT_PORT", default_value_t = 1883, global = true)]
    pub mqtt_port: u16,

    #[arg(
        long,
        env = "MQTT_TOPIC",
        default_value = "ut-cps/vehicle-monitoring",
        global = true
    )]
    pub mqtt_topic: String,

    #[arg(
        long,
        env = "MQTT_CLIENT_ID",
        default_value = "telem_bridge_listener",
        global = true
    )]
    pub mqtt_client_id: String,
}

#[derive(Debug, Clone, Args)]
pub struct StoreArgs {
    #[arg(long, env = "ES_HOST", default_value = "https://localhost:9200", global = true)]
    pub es_host: String,

    #[arg(long, env = "ES_INDEX", default_value = "vehicle-status", global = true)]
    pub es_index: String,

    #[arg(long, env = "ES_USER", global = true)]
    pub es_user: Option<String>,

    #[arg(long, env = "ES_PASSWORD", hide_env_values = true, global = true)]
    pub es_password: Option<String>,

    /// PEM file with the cluster's CA certificate.
    #[arg(long, env = "ES_CA_CERT", global = true)]
    pub es_ca_cert: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct ProtocolArgs {
    /// Zone the vehicle's clock runs in: an IANA name ("Asia/Tehran") or a fixed UTC offset
    /// ("+03:30").
    #[arg(
        long,
        env = "TELEM_TIME_ZONE",
        default_value = "Asia/Tehran",
        value_parser = parse_time_zone,
        global = true
    )]
    pub time_zone: FrameZone,

    /// Identifier written into every document's `vehicle` field.
    #[arg(
        long,
        env = "TELEM_VEHICLE",
        default_value = vehicle_telem::document::DEFAULT_VEHICLE,
        global = true
    )]
    pub vehicle: String,
}

#[derive(Debug, Clone, Args)]
pub struct SimulateArgs {
    /// Milliseconds between frames.
    #[arg(long, default_value_t = 1000)]
    pub interval_ms: u64,

    /// Stop after this many frames.
    #[arg(long)]
    pub count: Option<u64>,

    #[arg(long, default_value_t = 35.80, allow_negative_numbers = true)]
    pub north: f64,
    #[arg(long, default_value_t = 51.30, allow_negative_numbers = true)]
    pub west: f64,
    #[arg(long, default_value_t = 35.65, allow_negative_numbers = true)]
    pub south: f64,
    #[arg(long, default_value_t = 51.50, allow_negative_numbers = true)]
    pub east: f64,

    #[arg(long, default_value_t = 20.0)]
    pub max_speed_mps: f32,

    #[arg(long, default_value_t = 1200.0, allow_negative_numbers = true)]
    pub altitude_m: f32,

    /// Report a negative battery status (adapter power).
    #[arg(long)]
    pub external_power: bool,
}

pub fn parse_time_zone(s: &str) -> Result<FrameZone, String> {
    s.parse::<FrameZone>().map_err(|e| e.to_string())
}

impl Cli {
    /// The selected subcommand, `listen` when none was given.
    pub fn mode(&self) -> Command {
        self.command.clone().unwrap_or(Command::Listen)
    }

    pub fn decoder_config(&self) -> DecoderConfig {
        DecoderConfig {
            time_zone: self.protocol.time_zone,
        }
    }

    pub fn mapper_config(&self) -> MapperConfig {
        MapperConfig {
            vehicle: self.protocol.vehicle.clone(),
        }
    }

    pub fn store_config(&self) -> StoreConfig {
        let auth = match (&self.store.es_user, &self.store.es_password) {
            (Some(user), Some(password)) => Some((user.clone(), password.clone())),
            _ => None,
        };
        StoreConfig {
            host: self.store.es_host.clone(),
            index: self.store.es_index.clone(),
            auth,
            ca_cert: self.store.es_ca_cert.clone(),
        }
    }

    /// Broker settings. The simulator connects under its own client id so it can share a
    /// broker with a running listener.
    pub fn mqtt_config(&self) -> MqttConfig {
        let client_id = match self.mode() {
            Command::Listen => self.mqtt.mqtt_client_id.clone(),
            Command::Simulate(_) => format!("{}-sim", self.mqtt.mqtt_client_id),
        };
        MqttConfig {
            server: self.mqtt.mqtt_server.clone(),
            port: self.mqtt.mqtt_port,
            topic: self.mqtt.mqtt_topic.clone(),
            client_id,
            keep_alive: MQTT_KEEP_ALIVE,
        }
    }
}

impl SimulateArgs {
    pub fn bbox(&self) -> TGResult<BBoxWGS> {
        BBoxWGS::new(
            LatLon::new(self.north, self.west)?,
            LatLon::new(self.south, self.east)?,
        )
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

#[cfg(test)]
mod test {
    use chrono::FixedOffset;
    use clap::CommandFactory;

    use super::*;

    /// Every variable the CLI falls back to.
    const ENV_VARS: [&str; 11] = [
        "MQTT_SERVER",
        "MQTT_PORT",
        "MQTT_TOPIC",
        "MQTT_CLIENT_ID",
        "ES_HOST",
        "ES_INDEX",
        "ES_USER",
        "ES_PASSWORD",
        "ES_CA_CERT",
        "TELEM_TIME_ZONE",
        "TELEM_VEHICLE",
    ];

    /// Parse with the process environment cleared of the CLI's variables.
    fn parse(args: &[&str]) -> Cli {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
        Cli::try_parse_from(std::iter::once("telem-bridge").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_env_vars_cover_cli() {
        let declared: Vec<String> = Cli::command()
            .get_arguments()
            .filter_map(|arg| arg.get_env())
            .map(|env| env.to_string_lossy().into_owned())
            .collect();
        assert_eq!(declared.len(), ENV_VARS.len());
        for var in ENV_VARS {
            assert!(declared.iter().any(|d| d == var), "{var}");
        }
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        assert!(matches!(cli.mode(), Command::Listen));
        assert_eq!(
            cli.decoder_config().time_zone,
            FrameZone::Named(chrono_tz::Asia::Tehran)
        );
        assert_eq!(cli.mapper_config().vehicle, "cps-tracer");
        let store = cli.store_config();
        assert_eq!(store.host, "https://localhost:9200");
        assert_eq!(store.index, "vehicle-status");
        assert_eq!(store.auth, None);
        let mqtt = cli.mqtt_config();
        assert_eq!(mqtt.server, "broker.hivemq.com");
        assert_eq!(mqtt.port, 1883);
        assert_eq!(mqtt.topic, "ut-cps/vehicle-monitoring");
        assert_eq!(mqtt.client_id, "telem_bridge_listener");
        assert_eq!(mqtt.keep_alive, Duration::from_secs(10));
    }

    #[test]
    fn test_auth_requires_both_parts() {
        let cli = parse(&["--es-user", "elastic"]);
        assert_eq!(cli.store_config().auth, None);

        let cli = parse(&["--es-user", "elastic", "--es-password", "secret"]);
        assert_eq!(
            cli.store_config().auth,
            Some(("elastic".to_string(), "secret".to_string()))
        );
    }

    #[test]
    fn test_time_zone_values() {
        assert_eq!(
            parse_time_zone("Asia/Tehran").unwrap(),
            FrameZone::Named(chrono_tz::Asia::Tehran)
        );
        assert_eq!(
            parse_time_zone("+03:30").unwrap(),
            FrameZone::Fixed(FixedOffset::east_opt(12600).unwrap())
        );
        assert_eq!(
            parse_time_zone("-05:00").unwrap(),
            FrameZone::Fixed(FixedOffset::west_opt(18000).unwrap())
        );
        assert_eq!(
            parse_time_zone("UTC").unwrap(),
            FrameZone::Fixed(FixedOffset::east_opt(0).unwrap())
        );
        assert!(parse_time_zone("Tehran").is_err());

        let cli = parse(&["--time-zone", "Europe/Berlin"]);
        assert_eq!(
            cli.decoder_config().time_zone,
            FrameZone::Named(chrono_tz::Europe::Berlin)
        );
    }

    #[test]
    fn test_simulate_subcommand() {
        let cli = parse(&[
            "simulate",
            "--count",
            "5",
            "--interval-ms",
            "250",
            "--mqtt-client-id",
            "bench",
        ]);
        let Command::Simulate(args) = cli.mode() else {
            panic!("expected simulate");
        };
        assert_eq!(args.count, Some(5));
        assert_eq!(args.interval(), Duration::from_millis(250));
        assert!(args.bbox().unwrap().contains(LatLon {
            lat: 35.7,
            lon: 51.4
        }));
        assert_eq!(cli.mqtt_config().client_id, "bench-sim");
    }
}
