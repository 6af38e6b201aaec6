/// Media Service - HTTP Server
///
/// Serves cached category listings and like/follow actions.
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use cache_invalidation::{
    ChangeNotification, ChangePublisher, ChangeSink, ChangeSubscriber, InvalidationError,
    LocalChangeBus,
};
use flourish_cache::CacheMetrics;
use media_service::db::{PgInteractionRepository, PgMediaRepository};
use media_service::handlers::{self, MediaHandlerState};
use media_service::metrics::serve_metrics;
use media_service::models::ContentCategory;
use media_service::services::MediaPageLoader;
use media_service::Config;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SERVICE_NAME: &str = "media-service";

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into());

    if std::env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        env = %config.app.env,
        page_size = config.cache.page_size,
        freshness = %config.cache.interaction_freshness,
        "Starting media-service"
    );

    // Initialize database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    if let Err(e) = CacheMetrics::register(prometheus::default_registry()) {
        warn!(error = %e, "Cache metrics not registered");
    }

    // Change notifications: Redis when configured, otherwise in-process only
    let local_bus = LocalChangeBus::default();
    let sink: Arc<dyn ChangeSink> = match &config.redis.url {
        Some(url) => Arc::new(
            ChangePublisher::new(url, SERVICE_NAME.to_string())
                .await
                .context("Failed to connect change publisher to Redis")?,
        ),
        None => Arc::new(local_bus.clone()),
    };

    let loader = Arc::new(
        MediaPageLoader::new(
            Arc::new(PgMediaRepository::new(db_pool.clone())),
            Arc::new(PgInteractionRepository::new(db_pool)),
            config.cache.page_loader(),
        )
        .with_change_sink(sink, SERVICE_NAME.to_string()),
    );

    let subscriber_loader = Arc::clone(&loader);
    let on_change = move |msg: ChangeNotification| {
        let loader = Arc::clone(&subscriber_loader);
        async move {
            loader.on_interaction_change(&msg);
            Ok::<(), InvalidationError>(())
        }
    };
    let subscription = match &config.redis.url {
        Some(url) => ChangeSubscriber::new(url)
            .await
            .context("Invalid REDIS_URL")?
            .subscribe(on_change)
            .await
            .context("Failed to subscribe to interaction changes")?,
        None => {
            info!("REDIS_URL not set; interaction changes stay local to this instance");
            local_bus.subscribe(on_change)
        }
    };

    let janitors = [
        loader
            .page_cache()
            .spawn_janitor(config.cache.janitor_interval()),
        loader
            .interaction_cache()
            .spawn_janitor(config.cache.janitor_interval()),
    ];

    if config.cache.warm_on_start {
        loader.warm(&ContentCategory::ALL).await;
    }

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    info!(address = %bind_address, "Media service listening");

    let state = web::Data::new(MediaHandlerState {
        loader: Arc::clone(&loader),
    });

    HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(state.clone())
            .configure(handlers::configure)
            .route("/metrics", web::get().to(serve_metrics))
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .run()
    .await?;

    subscription.abort();
    for janitor in janitors {
        janitor.abort();
    }
    info!("Media service stopped");
    Ok(())
}
