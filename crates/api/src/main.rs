//! Order service entry point.

use std::sync::Arc;

use api::config::Config;
use api::query::QueryService;
use api::routes::orders::AppState;
use order_cache::OrderCache;
use order_consumer::{ConsumerConfig, OrderConsumer, ensure_topic};
use order_store::PostgresOrderStore;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() {
    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    let config = Config::from_env();

    // 3. Connect to the store
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(config.db_timeout)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");
    let store = PostgresOrderStore::new(pool, config.db_timeout);
    let cache = OrderCache::new(config.cache_ttl);

    // 4. Warm the cache with recent orders before accepting traffic
    if let Err(err) = api::preload::preload_cache(&store, &cache, config.preload_count).await {
        tracing::warn!(error = %err, "cache preload failed");
    }

    // 5. Provision the feed topic and start the ingestion consumer
    ensure_topic(&config.kafka_brokers, &config.kafka_topic, 1, 1)
        .await
        .expect("failed to ensure feed topic");

    let consumer = OrderConsumer::new(
        &ConsumerConfig {
            brokers: config.kafka_brokers.clone(),
            group_id: config.kafka_group.clone(),
            topic: config.kafka_topic.clone(),
        },
        store.clone(),
    )
    .expect("failed to create consumer");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let consumer_task = tokio::spawn(async move {
        if let Err(err) = consumer.run(shutdown_rx).await {
            tracing::error!(error = %err, "consumer terminated with error");
        }
    });

    // 6. Build and serve the application
    let state = Arc::new(AppState {
        query: QueryService::new(store, cache),
    });
    let app = api::create_app(state, metrics_handle, &config.static_dir);

    let addr = config.addr();
    tracing::info!(%addr, "starting order service");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // 7. Stop ingestion; an in-flight message finishes its
    // write-then-commit step before the loop exits.
    let _ = shutdown_tx.send(true);
    let _ = consumer_task.await;

    tracing::info!("server shut down gracefully");
}
