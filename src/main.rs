use std::sync::Arc;

use clap::Parser;
use futures_util::future::join_all;
use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

use order_dispatch::client::StockServiceClient;
use order_dispatch::handler::OrderCreatedHandler;
use order_dispatch::listener::{create_consumer, DeadLetterPublisher, ListenerContainer};
use order_dispatch::messaging::RedpandaClient;
use order_dispatch::metrics::{self, Metrics};
use order_dispatch::service::DispatchService;
use order_dispatch::DispatchConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_dispatch=debug"))
        )
        .init();

    let config = DispatchConfig::parse();
    config.validate()?;

    // Fixed for the lifetime of the process, stamped on every OrderDispatched
    let processed_by_id = Uuid::new_v4();

    tracing::info!(
        processed_by_id = %processed_by_id,
        brokers = %config.bootstrap_servers,
        group = %config.consumer_group,
        topic = %config.order_created_topic,
        stock_service = %config.stock_service_endpoint,
        "🚀 Starting order dispatch"
    );

    // === 1. Metrics ===
    let metrics = Arc::new(Metrics::new()?);
    let metrics_registry = Arc::new(metrics.registry().clone());
    let metrics_port = config.metrics_port;
    std::thread::spawn(move || {
        let result = actix_web::rt::System::new()
            .block_on(metrics::start_metrics_server(metrics_registry, metrics_port));
        if let Err(e) = result {
            tracing::error!("Metrics server error: {}", e);
        }
    });

    // === 2. Collaborators ===
    let publisher = Arc::new(RedpandaClient::new(&config)?);
    let checker = Arc::new(StockServiceClient::from_config(&config)?);
    let service = Arc::new(DispatchService::new(
        checker,
        publisher.clone(),
        processed_by_id,
        metrics.clone(),
    ));
    let handler = Arc::new(OrderCreatedHandler::new(service));
    let container = Arc::new(ListenerContainer::new(
        handler,
        DeadLetterPublisher::new(publisher),
        config.backoff(),
        metrics,
    ));

    // === 3. Listeners, one consumer each in the same group ===
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut listeners = Vec::with_capacity(config.concurrency);
    for instance in 0..config.concurrency {
        let consumer = create_consumer(&config, instance)?;
        let container = container.clone();
        let shutdown = shutdown_rx.clone();
        listeners.push(tokio::spawn(async move { container.run(consumer, shutdown).await }));
    }
    tracing::info!(listeners = config.concurrency, "Listening for order.created");

    // === 4. Run until Ctrl-C ===
    tokio::signal::ctrl_c().await?;
    tracing::info!("🛑 Shutdown requested, finishing in-flight records");
    if shutdown_tx.send(true).is_err() {
        tracing::warn!("No listener left to receive shutdown, all exited early");
    }

    for result in join_all(listeners).await {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Listener failed"),
            Err(e) => tracing::error!(error = %e, "Listener task panicked"),
        }
    }

    tracing::info!("Order dispatch stopped");
    Ok(())
}
