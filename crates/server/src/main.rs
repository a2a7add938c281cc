//! Courier server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{Router, middleware, routing::get};
use courier_api::{StreamingState, middleware::AppState, router as api_router, streaming_handler};
use courier_common::{Config, HttpBlobStore};
use courier_core::services::{
    AccessGate, AttachmentService, ChatService, EventPublisherService, HttpBlockChecker,
    HttpIdentityProvider, IdentityProviderService, TicketService,
};
use courier_db::repositories::{
    ChatMessageRepository, ChatRepository, TicketMessageRepository, TicketRepository,
};
use courier_queue::{AttachmentCleanupJob, RedisCleanupQueue, RedisPubSub};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courier=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting courier server...");

    // Load configuration
    let config = Config::load()?;
    let service_timeout = Duration::from_secs(config.services.timeout_secs);

    // Connect to database and run migrations
    let db = courier_db::init(&config).await?;
    info!("Connected to database");

    info!("Running database migrations...");
    courier_db::migrate(&db).await?;
    info!("Migrations completed");

    // Connect to Redis for the deferred-cleanup queue
    info!("Connecting to Redis...");
    let redis_client = redis::Client::open(config.redis.url.as_str())?;
    let redis_conn = redis::aio::ConnectionManager::new(redis_client).await?;
    let cleanup_storage = apalis_redis::RedisStorage::<AttachmentCleanupJob>::new(redis_conn);
    info!("Connected to Redis job queue");

    // Initialize Redis Pub/Sub for cross-instance fan-out
    let pubsub = Arc::new(RedisPubSub::new(&config.redis.url, &config.redis.prefix).await?);
    pubsub.start().await?;
    let events: EventPublisherService = pubsub.clone();

    // Initialize repositories
    let db = Arc::new(db);
    let chat_repo = ChatRepository::new(Arc::clone(&db));
    let chat_message_repo = ChatMessageRepository::new(Arc::clone(&db));
    let ticket_repo = TicketRepository::new(Arc::clone(&db));
    let ticket_message_repo = TicketMessageRepository::new(Arc::clone(&db));

    // Initialize external service clients
    let identity_provider: IdentityProviderService = Arc::new(HttpIdentityProvider::new(
        &config.services.identity_url,
        service_timeout,
    )?);
    let blocks = Arc::new(HttpBlockChecker::new(
        &config.services.blocks_url,
        &config.services.access_key,
        service_timeout,
    )?);
    let blob_store = Arc::new(HttpBlobStore::new(
        &config.services.files_url,
        &config.services.access_key,
        service_timeout,
    )?);

    // Initialize services
    let attachments = AttachmentService::new(
        blob_store,
        Arc::new(RedisCleanupQueue::new(cleanup_storage)),
        config.cleanup.page_size,
    );
    let chat_service = ChatService::new(
        chat_repo.clone(),
        chat_message_repo,
        blocks.clone(),
        attachments.clone(),
        events.clone(),
    );
    let ticket_service = TicketService::new(
        ticket_repo.clone(),
        ticket_message_repo,
        blocks,
        attachments,
        events,
    );
    let gate = AccessGate::new(chat_repo, ticket_repo);

    // Initialize streaming state and bridge Pub/Sub into it
    let streaming = StreamingState::new();
    {
        let streaming = streaming.clone();
        let mut rx = pubsub.subscribe_local();
        tokio::spawn(async move {
            while let Ok(message) = rx.recv().await {
                streaming.publish(&message.channel, message.payload);
            }
            info!("Pub/Sub bridge stopped");
        });
    }

    // Create app state
    let state = AppState {
        chat_service,
        ticket_service,
        gate,
        identity_provider,
        streaming,
    };

    // Build router
    let app = Router::new()
        .route("/streaming", get(streaming_handler))
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            courier_api::middleware::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pubsub.shutdown().await?;

    info!("Server shutdown complete");
    Ok(())
}
