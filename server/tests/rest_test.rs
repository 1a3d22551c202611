use std::collections::HashMap;
use std::net::SocketAddr;
use std::net::TcpListener;
use std::path::Path;
use std::{env, path::PathBuf};

use futures::channel::oneshot;
use futures::channel::oneshot::Sender;
use kernel::{
    AdminListImagesResponse, ClearAnalyticsResponse, DashboardResponse, FeaturedImagesResponse,
    GroupedImagesResponse, LikeResponse, ListImagesResponse, SearchImagesResponse,
    SummaryResponse, TrackRequest,
};
use rand::Rng;
use reqwest::Client;
use reqwest::StatusCode;
use serial_test::serial;
use server::domain::ObjectStore;
use server::sqlite::{Mode, Sqlite};
use test_context::{test_context, AsyncTestContext};
use tokio::task::JoinHandle;
use uuid::Uuid;

const FOLIO_TEST_ROOT: &str = "folio_test";
const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ\
                            abcdefghijklmnopqrstuvwxyz\
                            0123456789_";
const DB_LEN: usize = 20;
const SECRET_TOKEN: &str = "tok123";

struct FolioAsyncContext {
    db: PathBuf,
    port: String,
    shutdown: Sender<()>,
    join: JoinHandle<()>,
}

impl FolioAsyncContext {
    fn base(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    async fn remove_db(db_path: PathBuf) {
        tokio::fs::remove_file(db_path.clone())
            .await
            .unwrap_or_default();
        let base_db_file = db_path.as_os_str().to_str().unwrap().to_owned();
        let shm_file = base_db_file.clone() + "-shm";
        let wal_file = base_db_file + "-wal";
        tokio::fs::remove_file(shm_file).await.unwrap_or_default();
        tokio::fs::remove_file(wal_file).await.unwrap_or_default();
    }
}

fn get_available_port() -> Option<u16> {
    loop {
        let port = rand::thread_rng().gen_range(8000..9000);
        if port_is_available(port) {
            return Some(port);
        }
    }
}

fn port_is_available(port: u16) -> bool {
    TcpListener::bind(("0.0.0.0", port)).is_ok()
}

fn generate_db_name() -> String {
    let mut rng = rand::thread_rng();
    (0..DB_LEN)
        .map(|_| {
            let ix = rng.gen_range(0..CHARSET.len());
            CHARSET[ix] as char
        })
        .collect()
}

fn meta(entries: &[(&str, &str)]) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect()
}

fn seed(db: &Path) {
    let mut store = Sqlite::open(db, Mode::ReadWrite).unwrap();
    store
        .insert_object("gallery/heron.1.jpg", "image/jpeg", b"h1".to_vec())
        .unwrap();
    store
        .insert_object("gallery/heron.2.jpg", "image/jpeg", b"h2".to_vec())
        .unwrap();
    store
        .insert_object("gallery/sunset.jpg", "image/jpeg", b"sun".to_vec())
        .unwrap();
    store
        .set_metadata(
            "gallery/sunset.jpg",
            &meta(&[
                ("title", "Sunset"),
                ("description", "A heron at dawn"),
                ("alt", "Evening sky"),
            ]),
        )
        .unwrap();
    store
        .insert_object("gallery/secret.jpg", "image/jpeg", b"hidden".to_vec())
        .unwrap();
    store
        .set_metadata("gallery/secret.jpg", &meta(&[("downloadToken", SECRET_TOKEN)]))
        .unwrap();
    // Folder placeholder and non-image objects never reach listings.
    store
        .insert_object("gallery/placeholder", "application/octet-stream", vec![])
        .unwrap();
    store
        .insert_object("gallery/notes.txt", "text/plain", b"notes".to_vec())
        .unwrap();
    store
        .insert_object("featured/pick.jpg", "image/jpeg", b"pick".to_vec())
        .unwrap();
}

impl AsyncTestContext for FolioAsyncContext {
    async fn setup() -> FolioAsyncContext {
        let root = env::temp_dir().join(FOLIO_TEST_ROOT);
        tokio::fs::create_dir_all(&root).await.unwrap_or_default();
        let db = root.join(generate_db_name());
        FolioAsyncContext::remove_db(db.clone()).await;

        Sqlite::open(db.clone(), Mode::ReadWrite)
            .expect("Database file cannot be created")
            .new_database()
            .expect("Database schema cannot be created");
        seed(&db);

        let port = get_available_port().unwrap().to_string();
        let socket: SocketAddr = format!("127.0.0.1:{port}").parse().unwrap();
        let app = server::create_routes(db.clone(), format!("http://localhost:{port}"));

        let listener = tokio::net::TcpListener::bind(socket).await.unwrap();
        let (shutdown, rx) = oneshot::channel::<()>();
        let join = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    rx.await.ok();
                })
                .await
                .unwrap();
        });

        FolioAsyncContext {
            db,
            port,
            shutdown,
            join,
        }
    }

    async fn teardown(self) {
        self.shutdown.send(()).unwrap_or_default();
        self.join.await.unwrap_or_default();
        FolioAsyncContext::remove_db(self.db).await;
    }
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn list_images_paginates_with_counts(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();
    let uri = format!("{}/api/images?limit=2", ctx.base());

    // Act
    let listing: ListImagesResponse = client
        .get(uri)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    assert!(listing.success);
    assert_eq!(listing.images.len(), 2);
    assert_eq!(listing.pagination.total_count, 4);
    assert_eq!(listing.pagination.total_pages, 2);
    assert!(listing.pagination.has_more);
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn list_images_second_page_has_remainder(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();
    let uri = format!("{}/api/images?limit=3&page=2", ctx.base());

    // Act
    let listing: ListImagesResponse = client
        .get(uri)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    assert_eq!(listing.images.len(), 1);
    assert!(!listing.pagination.has_more);
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn list_images_unknown_folder_is_empty(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();
    let uri = format!("{}/api/images?folder=nothing", ctx.base());

    // Act
    let listing: ListImagesResponse = client
        .get(uri)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    assert!(listing.success);
    assert!(listing.images.is_empty());
    assert_eq!(listing.pagination.total_count, 0);
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn series_members_are_detected_from_filenames(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();
    let uri = format!("{}/api/images", ctx.base());

    // Act
    let listing: ListImagesResponse = client
        .get(uri)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    let heron = listing
        .images
        .iter()
        .find(|image| image.name == "heron.2.jpg")
        .unwrap();
    assert!(heron.is_series);
    assert_eq!(heron.title, "heron");
    assert_eq!(heron.series_index, 2);
    let sunset = listing
        .images
        .iter()
        .find(|image| image.name == "sunset.jpg")
        .unwrap();
    assert!(!sunset.is_series);
    assert_eq!(sunset.title, "Sunset");
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn search_matches_description_case_insensitively(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();
    let uri = format!("{}/api/images/search?q=HERON", ctx.base());

    // Act
    let result: SearchImagesResponse = client
        .get(uri)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    assert!(result.success);
    assert_eq!(result.search_query, "HERON");
    // Two series members by title plus sunset.jpg by description.
    assert_eq!(result.pagination.total_count, 3);
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn search_blank_query_returns_everything(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();
    let uri = format!("{}/api/images/search?q=", ctx.base());

    // Act
    let result: SearchImagesResponse = client
        .get(uri)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    assert_eq!(result.pagination.total_count, 4);
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn featured_images_are_unpaginated(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();
    let uri = format!("{}/api/images/featured", ctx.base());

    // Act
    let result: FeaturedImagesResponse = client
        .get(uri)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    assert!(result.success);
    assert_eq!(result.total_count, 1);
    assert_eq!(result.images[0].name, "pick.jpg");
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn grouped_endpoint_folds_series_under_one_title(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();
    let uri = format!("{}/api/images/grouped", ctx.base());

    // Act
    let result: GroupedImagesResponse = client
        .get(uri)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    let heron = result
        .artworks
        .iter()
        .find(|group| group.title == "heron")
        .unwrap();
    assert!(heron.is_series);
    assert_eq!(heron.images.len(), 2);
    assert!(heron.images[0].contains("heron.1.jpg"));
    assert!(heron.images[1].contains("heron.2.jpg"));
    let ids: Vec<u32> = result.artworks.iter().map(|g| g.id).collect();
    assert_eq!(ids, (1..=ids.len() as u32).collect::<Vec<u32>>());
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn like_without_image_path_is_rejected(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();
    let uri = format!("{}/api/images/like", ctx.base());

    // Act
    let response = client
        .post(uri)
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn like_increments_by_one_each_time(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();
    let uri = format!("{}/api/images/like", ctx.base());
    let body = serde_json::json!({"imagePath": "gallery/sunset.jpg"});

    // Act
    let first: LikeResponse = client
        .post(&uri)
        .json(&body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let second: LikeResponse = client
        .post(&uri)
        .json(&body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    assert_eq!(first.new_likes_count, 1);
    assert_eq!(second.new_likes_count, 2);
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn admin_listing_exposes_raw_metadata(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();
    let uri = format!("{}/api/admin/images", ctx.base());

    // Act
    let listing: AdminListImagesResponse = client
        .get(uri)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    let sunset = listing
        .images
        .iter()
        .find(|admin| admin.record.name == "sunset.jpg")
        .unwrap();
    assert_eq!(sunset.bucket, "gallery");
    assert_eq!(sunset.full_path, "gallery/sunset.jpg");
    assert_eq!(sunset.metadata.get("description").unwrap(), "A heron at dawn");
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn uploaded_image_appears_in_listing(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();
    let file_name = format!("{}.jpg", Uuid::new_v4());
    let part = reqwest::multipart::Part::bytes(b"fresh".to_vec())
        .file_name(file_name.clone())
        .mime_str("image/jpeg")
        .unwrap();
    let form = reqwest::multipart::Form::new().part("file", part);

    // Act
    let response = client
        .post(format!("{}/api/admin/images/gallery", ctx.base()))
        .multipart(form)
        .send()
        .await
        .unwrap();
    let inserted: Vec<i64> = response.json().await.unwrap();
    let listing: ListImagesResponse = client
        .get(format!("{}/api/images?limit=100", ctx.base()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    assert_eq!(inserted.len(), 1);
    assert!(listing.images.iter().any(|image| image.name == file_name));
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn file_content_respects_download_tokens(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();

    // Act
    let open = client
        .get(format!("{}/files/gallery/sunset.jpg", ctx.base()))
        .send()
        .await
        .unwrap();
    let denied = client
        .get(format!("{}/files/gallery/secret.jpg", ctx.base()))
        .send()
        .await
        .unwrap();
    let granted = client
        .get(format!(
            "{}/files/gallery/secret.jpg?token={SECRET_TOKEN}",
            ctx.base()
        ))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(open.status(), StatusCode::OK);
    assert_eq!(
        open.headers().get("content-type").unwrap(),
        "image/jpeg"
    );
    assert_eq!(open.bytes().await.unwrap().as_ref(), b"sun");
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);
    assert_eq!(granted.status(), StatusCode::OK);
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn missing_file_is_not_found(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();

    // Act
    let response = client
        .get(format!("{}/files/gallery/nope.jpg", ctx.base()))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

fn page_view(visitor: &str, page: &str) -> TrackRequest {
    TrackRequest {
        event_type: "pageView".to_owned(),
        visitor_id: visitor.to_owned(),
        session_id: format!("s-{visitor}"),
        page_name: Some(page.to_owned()),
        image_title: None,
        interaction_type: None,
        target: None,
        referrer: None,
        user_agent: Some("Mozilla/5.0 (iPhone; Mobile)".to_owned()),
    }
}

async fn track(client: &Client, base: &str, event: &TrackRequest) {
    let response = client
        .post(format!("{base}/api/analytics/track"))
        .json(event)
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn dashboard_excludes_admin_pages_from_metrics(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();
    track(&client, &ctx.base(), &page_view("v1", "home")).await;
    track(&client, &ctx.base(), &page_view("v2", "Admin")).await;
    let image_view = TrackRequest {
        event_type: "imageView".to_owned(),
        visitor_id: "v1".to_owned(),
        session_id: "s-v1".to_owned(),
        page_name: None,
        image_title: Some("Sunset".to_owned()),
        interaction_type: None,
        target: None,
        referrer: None,
        user_agent: None,
    };
    track(&client, &ctx.base(), &image_view).await;

    // Act
    let dashboard: DashboardResponse = client
        .get(format!("{}/api/analytics/dashboard?timeRange=1d", ctx.base()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    let metrics = &dashboard.data.metrics;
    assert_eq!(metrics.total_page_views, 1);
    assert_eq!(metrics.unique_visitors, 1);
    assert_eq!(metrics.total_image_views, 1);
    assert_eq!(metrics.devices.mobile, 1);
    assert_eq!(metrics.popular_images[0].name, "Sunset");
    // Raw pass-through keeps the admin record.
    assert_eq!(dashboard.data.page_views.len(), 2);
    assert_eq!(dashboard.data.time_range, "1d");
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn summary_counts_todays_traffic(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();
    track(&client, &ctx.base(), &page_view("v1", "home")).await;
    track(&client, &ctx.base(), &page_view("v1", "gallery")).await;

    // Act
    let summary: SummaryResponse = client
        .get(format!("{}/api/analytics/summary", ctx.base()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    assert!(summary.success);
    assert_eq!(summary.data.today.page_views, 2);
    assert_eq!(summary.data.today.unique_visitors, 1);
    assert_eq!(summary.data.yesterday.page_views, 0);
    assert_eq!(summary.data.page_views_growth, 100);
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn clear_analytics_reports_per_collection_counts(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();
    track(&client, &ctx.base(), &page_view("v1", "home")).await;

    // Act
    let cleared: ClearAnalyticsResponse = client
        .post(format!("{}/api/analytics/clear", ctx.base()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    assert!(cleared.success);
    assert_eq!(cleared.results.len(), 6);
    // The page view plus its visitor and session rollups.
    assert!(cleared.total_deleted >= 3);
    let page_views = cleared
        .results
        .iter()
        .find(|entry| entry.collection == "pageViews")
        .unwrap();
    assert_eq!(page_views.deleted, 1);
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn sitemap_lists_static_pages_and_image_slugs(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();

    // Act
    let response = client
        .get(format!("{}/sitemap.xml", ctx.base()))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/xml"
    );
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "public, max-age=86400"
    );
    let body = response.text().await.unwrap();
    assert!(body.contains("<loc>"));
    assert!(body.contains("/about</loc>"));
    assert!(body.contains("/gallery/"));
    assert!(body.contains("sunset"));
}

#[test_context(FolioAsyncContext)]
#[tokio::test]
#[serial]
async fn cors_is_open_for_any_origin(ctx: &mut FolioAsyncContext) {
    // Arrange
    let client = Client::new();

    // Act
    let response = client
        .request(
            reqwest::Method::OPTIONS,
            format!("{}/api/images", ctx.base()),
        )
        .header("origin", "https://example.com")
        .header("access-control-request-method", "GET")
        .send()
        .await
        .unwrap();

    // Assert
    assert!(response.status().is_success());
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "*"
    );
}
