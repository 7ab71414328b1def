use anyhow::Context;
use tracing::{error, info, warn};

use addrsync_addresses::AddressProjection;
use addrsync_infra::db::connect_lazy;
use addrsync_infra::{
    BulkSynchronizer, CatchUpDriver, DriverState, PostgresEventSource, PostgresSpatialStore,
    Settings,
};

#[tokio::main]
async fn main() {
    addrsync_observability::init();

    if let Err(err) = run().await {
        error!(error = ?err, "address projector stopped on a fatal error");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    info!(
        event_table = %settings.event_table,
        poll_interval_secs = settings.poll_interval_secs,
        timestamp_source = ?settings.timestamp_source,
        "starting address projector"
    );

    let events_pool = connect_lazy(&settings.event_store_connection_string, 2)
        .context("event store connection")?;
    // One connection per exported family.
    let postgis_pool =
        connect_lazy(&settings.postgis_connection_string, 2).context("PostGIS connection")?;

    let source = PostgresEventSource::new(
        events_pool,
        &settings.event_table,
        settings.replay_batch_size,
    );
    let store = PostgresSpatialStore::new(postgis_pool, settings.export_timeout());
    let synchronizer = BulkSynchronizer::new(
        store,
        settings.access_address.clone(),
        settings.unit_address.clone(),
    );
    let driver = CatchUpDriver::new(
        source,
        synchronizer,
        AddressProjection::new(settings.projection_options()),
        settings.poll_interval(),
    );

    let mut handle = driver.spawn();

    let requested = tokio::select! {
        signal = shutdown_signal() => {
            signal.context("installing signal handlers")?;
            true
        }
        _ = handle.wait_for(DriverState::ShuttingDown) => false,
    };

    if requested {
        info!(state = ?handle.state(), "shutdown requested; waiting for the driver to stop");
        handle.shutdown();
    }

    let summary = handle.join().await.context("catch-up driver")?;
    info!(
        replayed = summary.replayed,
        caught_up = summary.caught_up,
        syncs = summary.syncs,
        "address projector stopped"
    );
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            ctrl_c = tokio::signal::ctrl_c() => ctrl_c,
            _ = terminate.recv() => {
                warn!("received SIGTERM");
                Ok(())
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
