mod cli;

use crate::cli::{AccessSinkArg, CacheBackendArg, StorageBackendArg, CLI};
use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use waypoint_cache::{MokaLinkCache, RedisLinkCache};
use waypoint_core::{AccessSink, DistributedCache, LinkRepository, LinkStore, StorageError};
use waypoint_gateway::{App, AppState};
use waypoint_resolver::{
    LinkManager, ResolutionEngine, ResolverConfig, TracingAccessSink, TrackerConfig,
};
use waypoint_storage::{InMemoryRepository, MySqlAccessSink, MySqlRepository};
use waypoint_telemetry::TelemetryConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::try_parse()?;

    let _telemetry = waypoint_telemetry::init(
        TelemetryConfig::builder()
            .service_name("waypoint-gateway")
            .format(config.log_format)
            .otlp_endpoint(config.otlp_endpoint.clone())
            .build(),
    )?;

    info!(
        listen_addr = %config.listen_addr,
        storage_backend = %config.storage,
        cache_backend = %config.cache,
        access_sink = %config.access_sink,
        "starting waypoint gateway"
    );

    let mysql = match &config.mysql_dsn {
        Some(dsn)
            if config.storage == StorageBackendArg::Mysql
                || config.access_sink == AccessSinkArg::Mysql =>
        {
            Some(
                MySqlRepository::connect(dsn)
                    .await
                    .context("failed to connect to MySQL")?,
            )
        }
        _ => None,
    };

    let (store, repository) = match config.storage {
        StorageBackendArg::InMemory => split_repository(InMemoryRepository::new()),
        StorageBackendArg::Mysql => {
            split_repository(mysql.clone().context("mysql dsn is required")?)
        }
    };

    let l2: Arc<dyn DistributedCache> = match config.cache {
        CacheBackendArg::Moka => Arc::new(MokaLinkCache::new()),
        CacheBackendArg::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .context("redis url is required when cache backend is redis")?;
            Arc::new(RedisLinkCache::connect(url).await?)
        }
    };

    let sink: Arc<dyn AccessSink> = match config.access_sink {
        AccessSinkArg::Log => Arc::new(TracingAccessSink),
        AccessSinkArg::Mysql => {
            let repo = mysql.as_ref().context("mysql dsn is required")?;
            Arc::new(MySqlAccessSink::new(repo.pool().clone()))
        }
    };

    let engine = Arc::new(ResolutionEngine::new(
        resolver_config(&config),
        l2,
        store,
        sink,
    )?);

    let manager = LinkManager::new(repository, engine.invalidator());
    for seed in &config.links {
        match manager
            .create(seed.short_key.clone(), seed.destination_url.as_str(), "cli")
            .await
        {
            Ok(_) => {}
            Err(StorageError::Conflict(key)) => {
                warn!(key = %key, "Seed link already exists, keeping stored destination")
            }
            Err(e) => return Err(e.into()),
        }
    }

    let app = App::router(AppState::new(Arc::clone(&engine)));
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "gateway listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("draining access recorder");
    engine.shutdown().await;

    Ok(())
}

/// The engine reads through `LinkStore`, the seeding path writes through
/// `LinkRepository`; both views share one instance.
fn split_repository<R: LinkRepository>(
    repository: R,
) -> (Arc<dyn LinkStore>, Arc<dyn LinkRepository>) {
    let repository = Arc::new(repository);
    let store: Arc<dyn LinkStore> = repository.clone();
    let repository: Arc<dyn LinkRepository> = repository;
    (store, repository)
}

fn resolver_config(config: &CLI) -> ResolverConfig {
    let base = ResolverConfig::builder()
        .l1_capacity(config.l1_capacity)
        .tracker(
            TrackerConfig::builder()
                .max_keys(config.tracker_max_keys)
                .retain(config.tracker_retain)
                .build(),
        )
        .l2_timeout(Duration::from_millis(config.l2_timeout_ms))
        .store_timeout(Duration::from_millis(config.store_timeout_ms))
        .access_queue_capacity(config.access_queue_capacity)
        .sink_timeout(Duration::from_millis(config.sink_timeout_ms))
        .drain_timeout(Duration::from_millis(config.drain_timeout_ms));

    match config.negative_ttl_secs {
        Some(secs) => base.negative_ttl(Duration::from_secs(secs)).build(),
        None => base.build(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
