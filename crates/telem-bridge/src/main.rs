//! `telem-bridge` entry point.
//!
//! `listen` (the default) bootstraps the index and streams frames from MQTT into it.
//! `simulate` publishes frames from a random-walk vehicle for end-to-end testing.

use anyhow::Context;
use bytes::Bytes;
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vehicle_telem::{model::RandomWalk, DocumentMapper, FrameDecoder};

use telem_bridge::{
    config::{Cli, Command, SimulateArgs},
    pipeline::Pipeline,
    store::{DocumentStore, ElasticsearchStore},
    transport,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides the default INFO level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.mode() {
        Command::Listen => listen(&cli).await,
        Command::Simulate(args) => simulate(&cli, &args).await,
    }
}

async fn listen(cli: &Cli) -> anyhow::Result<()> {
    let store_config = cli.store_config();
    let store =
        ElasticsearchStore::new(&store_config).context("failed to build Elasticsearch client")?;
    store.ensure_index().await.with_context(|| {
        format!(
            "failed to check/create index '{}' on {}",
            store_config.index, store_config.host
        )
    })?;

    let pipeline = Pipeline::new(
        FrameDecoder::new(cli.decoder_config()),
        DocumentMapper::new(cli.mapper_config()),
        store,
    );
    let mqtt = cli.mqtt_config();
    let pipeline = &pipeline;
    let deliver = move |payload: Bytes| async move {
        pipeline.handle_frame(&payload).await;
    };

    tokio::select! {
        res = transport::subscribe(&mqtt, deliver) => {
            res.context("MQTT subscriber stopped")?;
        }
        _ = shutdown_signal() => {
            info!("shutting down");
        }
    }
    Ok(())
}

async fn simulate(cli: &Cli, args: &SimulateArgs) -> anyhow::Result<()> {
    let bbox = args.bbox().context("invalid simulation bounding box")?;
    let mut walk = RandomWalk::new(bbox, args.max_speed_mps).with_altitude(args.altitude_m);
    if args.external_power {
        walk = walk.on_external_power();
    }
    let mqtt = cli.mqtt_config();
    info!(topic = %mqtt.topic, interval = ?args.interval(), count = ?args.count, "starting simulator");

    tokio::select! {
        res = transport::publish_frames(
            &mqtt,
            &mut walk,
            args.interval(),
            args.count,
            cli.decoder_config().time_zone,
        ) => {
            res.context("simulator stopped")?;
        }
        _ = shutdown_signal() => {
            info!("shutting down");
        }
    }
    Ok(())
}

/// Resolves on CTRL+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::warn!(%err, "failed to listen for CTRL+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(err) => {
                tracing::warn!(%err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
