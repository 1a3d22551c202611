use std::{path::PathBuf, sync::Arc};

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    classify::ServerErrorsFailureClass,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::Span;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod analytics;
pub mod domain;
pub mod file_reply;
pub mod gallery;
mod handlers;
pub mod normalize;
pub mod sitemap;
pub mod slug;
pub mod sqlite;

extern crate serde;

#[cfg(test)] // <-- not needed in integration tests
extern crate rstest;

use crate::sqlite::{Mode, Sqlite};
use std::env;
use std::net::SocketAddr;
use std::path::Path;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DB_FILE: &str = "folio.db";
const CURRENT_DIR: &str = "./";
const DEFAULT_PUBLIC_URL: &str = "http://localhost:5000";

extern crate tokio;

/// Shared per-deployment state: the database location and the public
/// base URL used for image and sitemap links. Stores are constructed
/// from it per request.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<PathBuf>,
    pub public_url: Arc<String>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_images,
        handlers::search_images,
        handlers::featured_images,
        handlers::grouped_images,
        handlers::like_photo,
        handlers::admin_list_images,
        handlers::admin_search_images,
        handlers::upload_images,
        handlers::upload_zip,
        handlers::update_metadata,
        handlers::delete_image,
        handlers::get_image_content,
        handlers::track_event,
        handlers::analytics_summary,
        handlers::analytics_dashboard,
        handlers::analytics_image_stats,
        handlers::analytics_daily_stats,
        handlers::clear_analytics,
        handlers::sitemap_xml,
    ),
    components(schemas(
        kernel::ImageRecord,
        kernel::AdminImageRecord,
        kernel::Pagination,
        kernel::ArtworkGroup,
        kernel::DeleteResult,
        kernel::ListImagesResponse,
        kernel::SearchImagesResponse,
        kernel::AdminListImagesResponse,
        kernel::AdminSearchImagesResponse,
        kernel::FeaturedImagesResponse,
        kernel::GroupedImagesResponse,
        kernel::GalleryErrorResponse,
        kernel::LikeRequest,
        kernel::LikeResponse,
        kernel::MetadataUpdateRequest,
        kernel::OkResponse,
        kernel::PageView,
        kernel::ImageView,
        kernel::Interaction,
        kernel::TrackRequest,
        kernel::PeriodStats,
        kernel::SummaryData,
        kernel::SummaryResponse,
        kernel::CountEntry,
        kernel::TrafficSources,
        kernel::DeviceSplit,
        kernel::DashboardMetrics,
        kernel::DashboardData,
        kernel::DashboardResponse,
        kernel::ImageStat,
        kernel::ImageStatsResponse,
        kernel::DailyStat,
        kernel::DailyStatsResponse,
        kernel::CollectionClear,
        kernel::ClearAnalyticsResponse,
        kernel::AnalyticsErrorResponse,
    ))
)]
struct ApiDoc;

pub async fn run() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "folio=debug,server=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Configuration from environment
    let db_file = env::var("FOLIO_DATA_FILE").unwrap_or_else(|_| String::from(DB_FILE));
    let dir = env::var("FOLIO_DATA_DIR").unwrap_or_else(|_| String::from(CURRENT_DIR));
    let port = env::var("FOLIO_PORT").unwrap_or_else(|_| String::from("5000"));
    let public_url =
        env::var("FOLIO_PUBLIC_URL").unwrap_or_else(|_| String::from(DEFAULT_PUBLIC_URL));

    // Start init
    let db = Path::new(&dir).join(&db_file);
    if !db.exists() {
        Sqlite::open(db.clone(), Mode::ReadWrite)
            .expect("Database file cannot be created")
            .new_database()
            .expect("Database schema cannot be created");
    }

    let socket: SocketAddr = format!("0.0.0.0:{port}").parse().expect("invalid port");
    tracing::debug!("listening on {socket}");

    let app = create_routes(db, public_url);

    let listener = tokio::net::TcpListener::bind(socket)
        .await
        .expect("cannot bind listen socket");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server failed");
}

pub fn create_routes(db: PathBuf, public_url: String) -> Router {
    let state = AppState {
        db: Arc::new(db),
        public_url: Arc::new(public_url),
    };
    Router::new()
        .route("/api/images", get(handlers::list_images))
        .route("/api/images/search", get(handlers::search_images))
        .route("/api/images/featured", get(handlers::featured_images))
        .route("/api/images/grouped", get(handlers::grouped_images))
        .route("/api/images/like", post(handlers::like_photo))
        .route(
            "/api/admin/images",
            get(handlers::admin_list_images).delete(handlers::delete_image),
        )
        .route("/api/admin/images/search", get(handlers::admin_search_images))
        .route("/api/admin/images/metadata", post(handlers::update_metadata))
        .route("/api/admin/images/:folder", post(handlers::upload_images))
        .route("/api/admin/images/:folder/zip", post(handlers::upload_zip))
        .route("/api/analytics/track", post(handlers::track_event))
        .route("/api/analytics/summary", get(handlers::analytics_summary))
        .route(
            "/api/analytics/dashboard",
            get(handlers::analytics_dashboard),
        )
        .route("/api/analytics/images", get(handlers::analytics_image_stats))
        .route("/api/analytics/daily", get(handlers::analytics_daily_stats))
        .route("/api/analytics/clear", post(handlers::clear_analytics))
        .route("/files/*path", get(handlers::get_image_content))
        .route("/sitemap.xml", get(handlers::sitemap_xml))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http().on_failure(
                    |error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                        tracing::error!("Server error: {error}");
                    },
                ))
                .layer(DefaultBodyLimit::disable())
                .layer(RequestBodyLimitLayer::new(
                    2 * 1024 * 1024 * 1024, /* 2GB */
                ))
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .into_inner(),
        )
        .with_state(state)
}

pub async fn shutdown_signal() {
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    println!("signal received, starting graceful shutdown");
}
