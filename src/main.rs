use axum::extract::DefaultBodyLimit;
use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use staff_import::app_state::AppState;
use staff_import::config::AppConfig;
use staff_import::db::{self, person_queries::PgPersonStore, queries::PgJobStore, JobStore};
use staff_import::routes;
use staff_import::services::import::ImportService;
use staff_import::services::registry::PersonTypeRegistry;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = AppConfig::from_env().expect("Failed to load configuration from environment");
    let settings = config.import_settings();

    tracing::info!(
        batch_size = settings.batch_size,
        max_concurrent = settings.max_concurrent_imports,
        scratch_dir = %settings.scratch_dir.display(),
        "Initializing staff-import server"
    );

    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    metrics::describe_counter!("import_jobs_submitted_total", "Import jobs accepted for processing");
    metrics::describe_counter!(
        "import_jobs_rejected_total",
        "Uploads rejected before a job was created"
    );
    metrics::describe_counter!("import_jobs_completed_total", "Import jobs completed");
    metrics::describe_counter!("import_jobs_failed_total", "Import jobs that failed");
    metrics::describe_counter!("import_rows_persisted_total", "Person rows committed by imports");
    metrics::describe_histogram!(
        "import_processing_seconds",
        "Time to parse and persist one import file"
    );
    metrics::describe_gauge!(
        "import_throughput_rows_per_second",
        "Throughput of the most recently completed import"
    );

    tracing::info!("Connecting to PostgreSQL database");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    let jobs: Arc<dyn JobStore> = Arc::new(PgJobStore::new(db_pool.clone()));
    let persons = Arc::new(PgPersonStore::new(db_pool));
    let registry = PersonTypeRegistry::with_defaults();
    tracing::info!(types = ?registry.labels(), "Registered person types");

    let imports = ImportService::new(Arc::clone(&jobs), persons, registry, settings);
    let state = AppState::new(imports, jobs);

    let app = Router::new()
        .merge(routes::router(state))
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
