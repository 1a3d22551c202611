#![allow(clippy::unused_async)]
use std::fmt::Display;
use std::io::{self, Cursor};
use std::time::Instant;

use axum::body::{Body, Bytes};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use futures::{Stream, StreamExt, TryStreamExt};
use kernel::{
    AdminListImagesResponse, AdminSearchImagesResponse, AnalyticsErrorResponse,
    ClearAnalyticsResponse, DailyStatsResponse, DashboardResponse, DeleteResult,
    FeaturedImagesResponse, GalleryErrorResponse, GroupedImagesResponse, ImageStatsResponse,
    ImageView, Interaction, LikeRequest, LikeResponse, ListImagesResponse,
    MetadataUpdateRequest, OkResponse, PageView, SearchImagesResponse, SummaryResponse,
    TrackRequest,
};
use serde::Deserialize;
use tokio_util::io::StreamReader;

use crate::analytics::{self, TimeRange};
use crate::domain::{EventStore, ObjectStore, StorageError};
use crate::file_reply::ImageReply;
use crate::gallery::{self, ADMIN_DEFAULT_LIMIT, DEFAULT_FOLDER, DEFAULT_LIMIT};
use crate::sitemap;
use crate::sqlite::{Mode, Sqlite};
use crate::AppState;

const DEFAULT_IMAGE_STATS_LIMIT: usize = 10;
const DEFAULT_DAILY_DAYS: u32 = 7;

#[derive(Deserialize)]
pub struct ListQuery {
    folder: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    folder: Option<String>,
    q: Option<String>,
    query: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
}

#[derive(Deserialize)]
pub struct FolderQuery {
    folder: Option<String>,
}

#[derive(Deserialize)]
pub struct DashboardQuery {
    #[serde(rename = "timeRange")]
    time_range: Option<String>,
}

#[derive(Deserialize)]
pub struct LimitQuery {
    limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct DaysQuery {
    days: Option<u32>,
}

#[derive(Deserialize)]
pub struct ImagePathQuery {
    #[serde(rename = "imagePath")]
    image_path: String,
}

#[derive(Deserialize)]
pub struct TokenQuery {
    token: Option<String>,
}

/// Lists one page of images from a folder. Folder placeholders are
/// filtered out before the count is taken.
#[utoipa::path(
    get,
    path = "/api/images",
    tag = "gallery",
    params(
        ("folder" = Option<String>, Query, description = "Folder prefix, defaults to gallery"),
        ("page" = Option<u32>, Query, description = "1-based page number"),
        ("limit" = Option<u32>, Query, description = "Page size")
    ),
    responses(
        (status = 200, description = "One page of images", body = ListImagesResponse),
        (status = 500, description = "Server error", body = GalleryErrorResponse)
    ),
)]
pub async fn list_images(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Response {
    let folder = params.folder.unwrap_or_else(|| DEFAULT_FOLDER.to_owned());
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).max(1);

    let result = execute(&state, Mode::ReadOnly, |mut store| {
        gallery::list_images(&mut store, &folder, page, limit, &state.public_url)
    });
    match result {
        Ok(listing) => ok_json(ListImagesResponse {
            success: true,
            images: listing.images,
            pagination: listing.pagination,
        }),
        Err(e) => gallery_error(&e),
    }
}

/// Case-insensitive substring search over title, description, alt text
/// and filename. A blank query matches everything.
#[utoipa::path(
    get,
    path = "/api/images/search",
    tag = "gallery",
    params(
        ("folder" = Option<String>, Query, description = "Folder prefix, defaults to gallery"),
        ("q" = Option<String>, Query, description = "Search query"),
        ("query" = Option<String>, Query, description = "Alias for q"),
        ("page" = Option<u32>, Query, description = "1-based page number"),
        ("limit" = Option<u32>, Query, description = "Page size")
    ),
    responses(
        (status = 200, description = "Matching images", body = SearchImagesResponse),
        (status = 500, description = "Server error", body = GalleryErrorResponse)
    ),
)]
pub async fn search_images(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Response {
    let folder = params.folder.unwrap_or_else(|| DEFAULT_FOLDER.to_owned());
    let query = params.q.or(params.query).unwrap_or_default();
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).max(1);

    let result = execute(&state, Mode::ReadOnly, |mut store| {
        gallery::search_images(&mut store, &folder, &query, page, limit, &state.public_url)
    });
    match result {
        Ok(listing) => ok_json(SearchImagesResponse {
            success: true,
            images: listing.images,
            pagination: listing.pagination,
            search_query: query,
        }),
        Err(e) => gallery_error(&e),
    }
}

/// Full listing of the featured folder, no pagination.
#[utoipa::path(
    get,
    path = "/api/images/featured",
    tag = "gallery",
    responses(
        (status = 200, description = "All featured images", body = FeaturedImagesResponse),
        (status = 500, description = "Server error", body = GalleryErrorResponse)
    ),
)]
pub async fn featured_images(State(state): State<AppState>) -> Response {
    let result = execute(&state, Mode::ReadOnly, |mut store| {
        gallery::featured_images(&mut store, &state.public_url)
    });
    match result {
        Ok(images) => ok_json(FeaturedImagesResponse {
            success: true,
            total_count: images.len() as u64,
            images,
        }),
        Err(e) => gallery_error(&e),
    }
}

/// Legacy endpoint: every image in one request, clustered into artwork
/// groups with series members folded under their shared title.
#[utoipa::path(
    get,
    path = "/api/images/grouped",
    tag = "gallery",
    params(
        ("folder" = Option<String>, Query, description = "Folder prefix, defaults to gallery")
    ),
    responses(
        (status = 200, description = "Grouped artworks", body = GroupedImagesResponse),
        (status = 500, description = "Server error", body = GalleryErrorResponse)
    ),
)]
pub async fn grouped_images(
    State(state): State<AppState>,
    Query(params): Query<FolderQuery>,
) -> Response {
    let folder = params.folder.unwrap_or_else(|| DEFAULT_FOLDER.to_owned());
    let result = execute(&state, Mode::ReadOnly, |mut store| {
        gallery::all_images(&mut store, &folder, &state.public_url)
    });
    match result {
        Ok(images) => ok_json(GroupedImagesResponse {
            success: true,
            artworks: gallery::group_images(&images),
        }),
        Err(e) => gallery_error(&e),
    }
}

/// Increments the like counter of one image atomically in the store.
#[utoipa::path(
    post,
    path = "/api/images/like",
    tag = "gallery",
    request_body = LikeRequest,
    responses(
        (status = 200, description = "New like count", body = LikeResponse),
        (status = 400, description = "Missing imagePath", body = GalleryErrorResponse),
        (status = 500, description = "Server error", body = GalleryErrorResponse)
    ),
)]
pub async fn like_photo(
    State(state): State<AppState>,
    Json(request): Json<LikeRequest>,
) -> Response {
    let Some(path) = request
        .image_path
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(GalleryErrorResponse {
                success: false,
                error: "imagePath is required".to_owned(),
                images: Vec::new(),
            }),
        )
            .into_response();
    };

    match execute(&state, Mode::ReadWrite, |mut store| {
        store.increment_likes(path)
    }) {
        Ok(count) => ok_json(LikeResponse {
            success: true,
            new_likes_count: count,
        }),
        Err(e) => gallery_error(&e),
    }
}

/// Admin listing: normalized records plus the raw storage attributes
/// and custom metadata the public endpoints hide.
#[utoipa::path(
    get,
    path = "/api/admin/images",
    tag = "admin",
    params(
        ("folder" = Option<String>, Query, description = "Folder prefix, defaults to gallery"),
        ("page" = Option<u32>, Query, description = "1-based page number"),
        ("limit" = Option<u32>, Query, description = "Page size, defaults to 100")
    ),
    responses(
        (status = 200, description = "One page of admin records", body = AdminListImagesResponse),
        (status = 500, description = "Server error", body = GalleryErrorResponse)
    ),
)]
pub async fn admin_list_images(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Response {
    let folder = params.folder.unwrap_or_else(|| DEFAULT_FOLDER.to_owned());
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(ADMIN_DEFAULT_LIMIT).max(1);

    let result = execute(&state, Mode::ReadOnly, |mut store| {
        gallery::admin_list_images(&mut store, &folder, page, limit, &state.public_url)
    });
    match result {
        Ok(listing) => ok_json(AdminListImagesResponse {
            success: true,
            images: listing.images,
            pagination: listing.pagination,
        }),
        Err(e) => gallery_error(&e),
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/images/search",
    tag = "admin",
    params(
        ("folder" = Option<String>, Query, description = "Folder prefix, defaults to gallery"),
        ("q" = Option<String>, Query, description = "Search query"),
        ("page" = Option<u32>, Query, description = "1-based page number"),
        ("limit" = Option<u32>, Query, description = "Page size, defaults to 100")
    ),
    responses(
        (status = 200, description = "Matching admin records", body = AdminSearchImagesResponse),
        (status = 500, description = "Server error", body = GalleryErrorResponse)
    ),
)]
pub async fn admin_search_images(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Response {
    let folder = params.folder.unwrap_or_else(|| DEFAULT_FOLDER.to_owned());
    let query = params.q.or(params.query).unwrap_or_default();
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(ADMIN_DEFAULT_LIMIT).max(1);

    let result = execute(&state, Mode::ReadOnly, |mut store| {
        gallery::admin_search_images(&mut store, &folder, &query, page, limit, &state.public_url)
    });
    match result {
        Ok(listing) => ok_json(AdminSearchImagesResponse {
            success: true,
            images: listing.images,
            pagination: listing.pagination,
            search_query: query,
        }),
        Err(e) => gallery_error(&e),
    }
}

/// Uploads several images from a multipart form into a folder.
#[utoipa::path(
    post,
    path = "/api/admin/images/{folder}",
    tag = "admin",
    params(
        ("folder" = String, Path, description = "Target folder")
    ),
    responses(
        (status = 201, description = "Objects created", body = [i64]),
        (status = 500, description = "Server error", body = String)
    ),
)]
pub async fn upload_images(
    Path(folder): Path<String>,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Response {
    let mut store = match Sqlite::open(state.db.as_path(), Mode::ReadWrite) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("{e}");
            return internal_server_error(&e);
        }
    };

    tracing::info!("upload into folder: {folder}");
    let mut inserted: Vec<i64> = vec![];
    while let Ok(Some(field)) = multipart.next_field().await {
        let file_name = field.file_name().unwrap_or_default().to_owned();
        let content_type = field
            .content_type()
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| guess_content_type(&file_name).to_owned());
        match read_from_stream(field).await {
            Ok((data, read_bytes)) => {
                let path = format!("{folder}/{file_name}");
                let insert_result = store.insert_object(&path, &content_type, data);
                if let Some(id) =
                    log_object_operation_result(insert_result, &path, read_bytes as u64)
                {
                    inserted.push(id);
                }
            }
            Err(e) => {
                tracing::error!("{e}");
                return internal_server_error(&e);
            }
        }
    }

    (StatusCode::CREATED, Json(inserted)).into_response()
}

/// Uploads a zip archive, inserting every contained file into the
/// folder.
#[utoipa::path(
    post,
    path = "/api/admin/images/{folder}/zip",
    tag = "admin",
    params(
        ("folder" = String, Path, description = "Target folder")
    ),
    responses(
        (status = 201, description = "Objects created", body = [i64]),
        (status = 500, description = "Server error", body = String)
    ),
)]
pub async fn upload_zip(
    Path(folder): Path<String>,
    State(state): State<AppState>,
    body: Body,
) -> Response {
    let data = match read_from_stream(body.into_data_stream()).await {
        Ok((data, _)) => data,
        Err(e) => {
            tracing::error!("{e}");
            return internal_server_error(&e);
        }
    };

    let mut archive = match zip::ZipArchive::new(Cursor::new(data)) {
        Ok(archive) => archive,
        Err(e) => {
            tracing::error!("{:#?}", e);
            return internal_server_error(&e);
        }
    };

    let result = execute(&state, Mode::ReadWrite, move |mut store| {
        let mut inserted: Vec<i64> = vec![];
        for i in 0..archive.len() {
            match archive.by_index(i) {
                Ok(mut zip_file) => {
                    let outpath = zip_file.mangled_name();
                    let Some(name) = outpath.to_str() else {
                        continue;
                    };
                    let Ok(capacity) = usize::try_from(zip_file.size()) else {
                        continue;
                    };
                    let mut writer: Vec<u8> = Vec::with_capacity(capacity);
                    match std::io::copy(&mut zip_file, &mut writer) {
                        Ok(read) => {
                            let path = format!("{folder}/{name}");
                            let content_type = guess_content_type(name).to_owned();
                            let insert_result = store.insert_object(&path, &content_type, writer);
                            if let Some(id) =
                                log_object_operation_result(insert_result, &path, read)
                            {
                                inserted.push(id);
                            }
                        }
                        Err(e) => {
                            tracing::error!("zip file copy error: {e}");
                        }
                    }
                }
                Err(e) => {
                    tracing::error!("file not extracted. Error: {:#?}", e);
                }
            }
        }
        Ok(inserted)
    });
    match result {
        Ok(inserted) => (StatusCode::CREATED, Json(inserted)).into_response(),
        Err(e) => internal_server_error(&e),
    }
}

/// Upserts custom metadata keys on one object.
#[utoipa::path(
    post,
    path = "/api/admin/images/metadata",
    tag = "admin",
    request_body = MetadataUpdateRequest,
    responses(
        (status = 200, description = "Metadata updated", body = OkResponse),
        (status = 500, description = "Server error", body = GalleryErrorResponse)
    ),
)]
pub async fn update_metadata(
    State(state): State<AppState>,
    Json(request): Json<MetadataUpdateRequest>,
) -> Response {
    match execute(&state, Mode::ReadWrite, |mut store| {
        store.set_metadata(&request.image_path, &request.entries)
    }) {
        Ok(()) => ok_json(OkResponse { success: true }),
        Err(e) => gallery_error(&e),
    }
}

/// Deletes one object and its metadata.
#[utoipa::path(
    delete,
    path = "/api/admin/images",
    tag = "admin",
    params(
        ("imagePath" = String, Query, description = "Object key to delete")
    ),
    responses(
        (status = 200, description = "Object deleted", body = DeleteResult),
        (status = 404, description = "Object not found", body = DeleteResult)
    ),
)]
pub async fn delete_image(
    State(state): State<AppState>,
    Query(params): Query<ImagePathQuery>,
) -> Response {
    let result = execute(&state, Mode::ReadWrite, |mut store| {
        store.delete_object(&params.image_path)
    });
    match result {
        Ok(deleted) => {
            if deleted.objects > 0 {
                tracing::info!("object '{}' deleted", params.image_path);
                (StatusCode::OK, Json(deleted)).into_response()
            } else {
                tracing::info!("object '{}' does not exist", params.image_path);
                (StatusCode::NOT_FOUND, Json(deleted)).into_response()
            }
        }
        Err(e) => gallery_error(&e),
    }
}

/// Serves one object's bytes. Objects carrying a download token
/// require the matching `token` query parameter.
#[utoipa::path(
    get,
    path = "/files/{path}",
    tag = "files",
    params(
        ("path" = String, Path, description = "Object key"),
        ("token" = Option<String>, Query, description = "Download token when the object requires one")
    ),
    responses(
        (status = 200, description = "Image binary content", body = Vec<u8>, content_type = "application/octet-stream"),
        (status = 403, description = "Missing or wrong token", body = String),
        (status = 404, description = "Object not found", body = String)
    ),
)]
pub async fn get_image_content(
    Path(path): Path<String>,
    Query(params): Query<TokenQuery>,
    State(state): State<AppState>,
) -> Response {
    let result = execute(&state, Mode::ReadOnly, |mut store| {
        let (object, data) = store.object_data(&path)?;
        let metadata = store.object_metadata(&path)?;
        Ok((object, data, metadata))
    });
    match result {
        Ok((object, data, metadata)) => {
            if let Some(required) = metadata.get("downloadToken") {
                if params.token.as_deref() != Some(required.as_str()) {
                    return (
                        StatusCode::FORBIDDEN,
                        "missing or invalid download token".to_owned(),
                    )
                        .into_response();
                }
            }
            ImageReply::new(data, object).into_response()
        }
        Err(StorageError::NotFound(path)) => {
            (StatusCode::NOT_FOUND, format!("no such object: {path}")).into_response()
        }
        Err(e) => {
            tracing::error!("{e}");
            internal_server_error(&e)
        }
    }
}

/// Records one analytics event into its collection and the presence
/// rollups.
#[utoipa::path(
    post,
    path = "/api/analytics/track",
    tag = "analytics",
    request_body = TrackRequest,
    responses(
        (status = 200, description = "Event recorded", body = OkResponse),
        (status = 400, description = "Unknown event type", body = AnalyticsErrorResponse),
        (status = 500, description = "Server error", body = AnalyticsErrorResponse)
    ),
)]
pub async fn track_event(
    State(state): State<AppState>,
    Json(event): Json<TrackRequest>,
) -> Response {
    let now = Utc::now();
    let result = match event.event_type.as_str() {
        "pageView" => execute(&state, Mode::ReadWrite, |mut store| {
            store.record_page_view(&PageView {
                timestamp: now,
                visitor_id: event.visitor_id.clone(),
                session_id: event.session_id.clone(),
                page_name: event.page_name.clone().unwrap_or_default(),
                referrer: event.referrer.clone(),
                user_agent: event.user_agent.clone(),
            })
        }),
        "imageView" => execute(&state, Mode::ReadWrite, |mut store| {
            store.record_image_view(&ImageView {
                timestamp: now,
                visitor_id: event.visitor_id.clone(),
                session_id: event.session_id.clone(),
                image_title: event.image_title.clone().unwrap_or_default(),
                referrer: event.referrer.clone(),
                user_agent: event.user_agent.clone(),
            })
        }),
        "interaction" => execute(&state, Mode::ReadWrite, |mut store| {
            store.record_interaction(&Interaction {
                timestamp: now,
                visitor_id: event.visitor_id.clone(),
                session_id: event.session_id.clone(),
                interaction_type: event.interaction_type.clone().unwrap_or_default(),
                target: event.target.clone(),
            })
        }),
        other => {
            return (
                StatusCode::BAD_REQUEST,
                Json(AnalyticsErrorResponse {
                    success: false,
                    error: format!("unknown event type '{other}'"),
                    data: None,
                }),
            )
                .into_response();
        }
    };
    match result {
        Ok(()) => ok_json(OkResponse { success: true }),
        Err(e) => analytics_error(&e),
    }
}

/// Today / yesterday / last-week traffic summary with day-over-day
/// growth.
#[utoipa::path(
    get,
    path = "/api/analytics/summary",
    tag = "analytics",
    responses(
        (status = 200, description = "Traffic summary", body = SummaryResponse),
        (status = 500, description = "Server error", body = AnalyticsErrorResponse)
    ),
)]
pub async fn analytics_summary(State(state): State<AppState>) -> Response {
    let result = execute(&state, Mode::ReadOnly, |mut store| {
        Ok(analytics::summary(&mut store, Utc::now()))
    });
    match result {
        Ok(data) => ok_json(SummaryResponse {
            success: true,
            data,
        }),
        Err(e) => analytics_error(&e),
    }
}

/// Aggregated dashboard for one time range plus raw capped event
/// arrays.
#[utoipa::path(
    get,
    path = "/api/analytics/dashboard",
    tag = "analytics",
    params(
        ("timeRange" = Option<String>, Query, description = "1d, 7d, 30d or 90d; defaults to 7d")
    ),
    responses(
        (status = 200, description = "Dashboard data", body = DashboardResponse),
        (status = 500, description = "Server error", body = AnalyticsErrorResponse)
    ),
)]
pub async fn analytics_dashboard(
    State(state): State<AppState>,
    Query(params): Query<DashboardQuery>,
) -> Response {
    let range = TimeRange::parse(params.time_range.as_deref().unwrap_or_default());
    let result = execute(&state, Mode::ReadOnly, |mut store| {
        Ok(analytics::dashboard(&mut store, range, Utc::now()))
    });
    match result {
        Ok(data) => ok_json(DashboardResponse {
            success: true,
            data,
        }),
        Err(e) => analytics_error(&e),
    }
}

/// View counts per image title, most viewed first.
#[utoipa::path(
    get,
    path = "/api/analytics/images",
    tag = "analytics",
    params(
        ("limit" = Option<usize>, Query, description = "Number of entries, defaults to 10")
    ),
    responses(
        (status = 200, description = "Image view ranking", body = ImageStatsResponse),
        (status = 500, description = "Server error", body = AnalyticsErrorResponse)
    ),
)]
pub async fn analytics_image_stats(
    State(state): State<AppState>,
    Query(params): Query<LimitQuery>,
) -> Response {
    let limit = params.limit.unwrap_or(DEFAULT_IMAGE_STATS_LIMIT).max(1);
    let result = execute(&state, Mode::ReadOnly, |mut store| {
        Ok(analytics::image_stats(&mut store, limit, Utc::now()))
    });
    match result {
        Ok(data) => ok_json(ImageStatsResponse {
            success: true,
            data,
        }),
        Err(e) => analytics_error(&e),
    }
}

/// Per-day traffic counters for the last N days, oldest first.
#[utoipa::path(
    get,
    path = "/api/analytics/daily",
    tag = "analytics",
    params(
        ("days" = Option<u32>, Query, description = "Number of days, defaults to 7")
    ),
    responses(
        (status = 200, description = "Daily counters", body = DailyStatsResponse),
        (status = 500, description = "Server error", body = AnalyticsErrorResponse)
    ),
)]
pub async fn analytics_daily_stats(
    State(state): State<AppState>,
    Query(params): Query<DaysQuery>,
) -> Response {
    let days = params.days.unwrap_or(DEFAULT_DAILY_DAYS).max(1);
    let result = execute(&state, Mode::ReadOnly, |mut store| {
        Ok(analytics::daily_stats(&mut store, days, Utc::now()))
    });
    match result {
        Ok(data) => ok_json(DailyStatsResponse {
            success: true,
            data,
        }),
        Err(e) => analytics_error(&e),
    }
}

/// Best-effort sweep of all six analytics collections. Per-collection
/// failures are reported as zero deletions, never as a request
/// failure.
#[utoipa::path(
    post,
    path = "/api/analytics/clear",
    tag = "analytics",
    responses(
        (status = 200, description = "Collections cleared", body = ClearAnalyticsResponse),
        (status = 500, description = "Server error", body = AnalyticsErrorResponse)
    ),
)]
pub async fn clear_analytics(State(state): State<AppState>) -> Response {
    let result = execute(&state, Mode::ReadWrite, |mut store| {
        Ok(analytics::clear_all(&mut store))
    });
    match result {
        Ok((results, total_deleted)) => ok_json(ClearAnalyticsResponse {
            success: true,
            message: format!("deleted {total_deleted} analytics documents"),
            total_deleted,
            results,
        }),
        Err(e) => analytics_error(&e),
    }
}

/// Dynamic sitemap: static pages plus one URL per gallery image,
/// located by slug. Cached for a day.
#[utoipa::path(
    get,
    path = "/sitemap.xml",
    tag = "site",
    responses(
        (status = 200, description = "Sitemap XML", body = String, content_type = "application/xml")
    ),
)]
pub async fn sitemap_xml(State(state): State<AppState>) -> Response {
    let slugs = execute(&state, Mode::ReadOnly, |mut store| {
        Ok(sitemap::image_slugs(&mut store, &state.public_url))
    })
    .unwrap_or_default();
    let xml = sitemap::render(&state.public_url, &slugs);
    (
        [
            (header::CONTENT_TYPE, "application/xml"),
            (header::CACHE_CONTROL, "public, max-age=86400"),
        ],
        xml,
    )
        .into_response()
}

fn ok_json<T: serde::Serialize>(value: T) -> Response {
    (StatusCode::OK, Json(value)).into_response()
}

fn gallery_error(e: &StorageError) -> Response {
    tracing::error!("{e}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(GalleryErrorResponse {
            success: false,
            error: e.to_string(),
            images: Vec::new(),
        }),
    )
        .into_response()
}

fn analytics_error(e: &StorageError) -> Response {
    tracing::error!("{e}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(AnalyticsErrorResponse {
            success: false,
            error: e.to_string(),
            data: None,
        }),
    )
        .into_response()
}

fn internal_server_error<E: ToString>(e: &E) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
}

fn execute<F, R>(state: &AppState, mode: Mode, action: F) -> Result<R, StorageError>
where
    F: FnOnce(Sqlite) -> Result<R, StorageError>,
{
    let start = Instant::now();
    match Sqlite::open(state.db.as_path(), mode) {
        Ok(store) => {
            let res = action(store);
            let duration = start.elapsed();
            tracing::debug!("store query time: {:?}", duration);
            res
        }
        Err(e) => {
            tracing::error!("{e}");
            Err(e)
        }
    }
}

fn log_object_operation_result<E: Display>(
    operation_result: Result<i64, E>,
    path: &str,
    read_bytes: u64,
) -> Option<i64> {
    match operation_result {
        Ok(id) => {
            tracing::info!("object: {} read: {} object id: {}", path, read_bytes, id);
            Some(id)
        }
        Err(e) => {
            tracing::error!("object '{}' not inserted. Error: {}", path, e);
            None
        }
    }
}

fn guess_content_type(name: &str) -> &'static str {
    let ext = name.rsplit('.').next().unwrap_or_default().to_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

async fn read_from_stream<S, E>(stream: S) -> io::Result<(Vec<u8>, usize)>
where
    S: Stream<Item = Result<Bytes, E>> + StreamExt,
    E: Sync + std::error::Error + Send + 'static,
{
    // Convert the stream into an `AsyncRead`.
    let body_with_io_error = stream.map_err(io::Error::other);
    let body_reader = StreamReader::new(body_with_io_error);
    futures::pin_mut!(body_reader);
    let mut buffer = Vec::new();

    let copied_bytes = tokio::io::copy(&mut body_reader, &mut buffer).await?;
    let copied_bytes = usize::try_from(copied_bytes).unwrap_or(usize::MAX);
    Ok((buffer, copied_bytes))
}
