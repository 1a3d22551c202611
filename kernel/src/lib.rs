#![warn(clippy::unwrap_in_result)]
#![warn(clippy::unwrap_used)]

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One image object from the portfolio store, in normalized form.
///
/// Series membership is derived from the `name.N.ext` filename convention
/// or, failing that, from explicit metadata fields. `series_index` is only
/// meaningful when `is_series` is true.
#[derive(Serialize, Deserialize, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    /// Storage object key, unique and stable per listing
    pub id: String,
    /// Storage object key (same value as `id`)
    pub path: String,
    /// Filename component of the path
    pub name: String,
    /// Dereferenceable URL for the image content
    pub src: String,
    /// Display name; for series members, the shared base name
    pub title: String,
    /// Alternative text, defaults to the filename
    pub alt: String,
    /// Free-text description, empty when absent
    pub description: String,
    /// Scientific name of the subject, empty when absent
    pub scientific_name: String,
    /// Capture location, empty when absent
    pub location: String,
    /// True when the image belongs to a numbered series
    pub is_series: bool,
    /// 1-based order within a series
    pub series_index: u32,
    /// Object size in bytes, storage-provided
    pub size: i64,
    /// Object creation time, storage-provided, RFC 3339
    pub time_created: String,
    /// MIME type, storage-provided
    pub content_type: String,
    /// Like counter, mutated only by the like operation
    pub likes: i64,
}

/// Admin-shaped image record: the normalized record plus the raw
/// storage attributes the public endpoints hide.
#[derive(Serialize, Deserialize, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminImageRecord {
    #[serde(flatten)]
    pub record: ImageRecord,
    /// Full object key including the folder prefix
    pub full_path: String,
    /// Folder the object was listed from
    pub bucket: String,
    /// Raw custom metadata map as stored
    pub metadata: HashMap<String, String>,
}

/// Paging envelope computed against the pre-pagination result count.
#[derive(Serialize, Deserialize, Clone, Copy, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total_count: u64,
    pub has_more: bool,
    pub total_pages: u32,
}

/// Derived gallery entry grouping series members under one title.
///
/// Not persisted anywhere; rebuilt from the current listing on every
/// request. `images` keeps listing encounter order.
#[derive(Serialize, Deserialize, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ArtworkGroup {
    /// 1-based sequential id in output order
    pub id: u32,
    pub title: String,
    pub alt: String,
    pub description: String,
    /// Member image URLs in listing encounter order
    pub images: Vec<String>,
    /// True when two or more records shared the title
    pub is_series: bool,
}

/// Result of deleting one object and its metadata entries.
#[derive(Serialize, Deserialize, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    /// Number of object rows deleted
    pub objects: u64,
    /// Number of custom metadata entries deleted
    pub meta_entries: u64,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListImagesResponse {
    pub success: bool,
    pub images: Vec<ImageRecord>,
    pub pagination: Pagination,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchImagesResponse {
    pub success: bool,
    pub images: Vec<ImageRecord>,
    pub pagination: Pagination,
    pub search_query: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminListImagesResponse {
    pub success: bool,
    pub images: Vec<AdminImageRecord>,
    pub pagination: Pagination,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminSearchImagesResponse {
    pub success: bool,
    pub images: Vec<AdminImageRecord>,
    pub pagination: Pagination,
    pub search_query: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeaturedImagesResponse {
    pub success: bool,
    pub images: Vec<ImageRecord>,
    pub total_count: u64,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GroupedImagesResponse {
    pub success: bool,
    pub artworks: Vec<ArtworkGroup>,
}

/// Error envelope for gallery endpoints. Always paired with HTTP 500.
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GalleryErrorResponse {
    pub success: bool,
    pub error: String,
    pub images: Vec<ImageRecord>,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LikeRequest {
    /// Object key of the image to like; request is rejected when absent
    pub image_path: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    pub success: bool,
    pub new_likes_count: i64,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetadataUpdateRequest {
    pub image_path: String,
    /// Metadata keys to upsert on the object
    pub entries: HashMap<String, String>,
}

/// One recorded page view. Written by the track endpoint, read by the
/// aggregation queries.
#[derive(Serialize, Deserialize, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    pub timestamp: DateTime<Utc>,
    pub visitor_id: String,
    pub session_id: String,
    pub page_name: String,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
}

/// One recorded image view.
#[derive(Serialize, Deserialize, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageView {
    pub timestamp: DateTime<Utc>,
    pub visitor_id: String,
    pub session_id: String,
    pub image_title: String,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
}

/// One recorded interaction event.
#[derive(Serialize, Deserialize, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub timestamp: DateTime<Utc>,
    pub visitor_id: String,
    pub session_id: String,
    pub interaction_type: String,
    pub target: Option<String>,
}

/// Incoming analytics event. `event_type` selects the collection:
/// `pageView`, `imageView` or `interaction`.
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrackRequest {
    pub event_type: String,
    pub visitor_id: String,
    pub session_id: String,
    pub page_name: Option<String>,
    pub image_title: Option<String>,
    pub interaction_type: Option<String>,
    pub target: Option<String>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
}

/// Bare acknowledgement envelope for write operations with no payload.
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OkResponse {
    pub success: bool,
}

/// Event counts for one time window.
#[derive(Serialize, Deserialize, Default, Clone, Copy, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PeriodStats {
    pub page_views: u64,
    pub image_views: u64,
    pub interactions: u64,
    pub unique_visitors: u64,
}

/// Day-over-day summary with growth percentages (today vs yesterday).
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryData {
    pub today: PeriodStats,
    pub yesterday: PeriodStats,
    pub last_week: PeriodStats,
    pub page_views_growth: i64,
    pub image_views_growth: i64,
    pub visitors_growth: i64,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub success: bool,
    pub data: SummaryData,
}

/// Name/count pair used for popularity rankings.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CountEntry {
    pub name: String,
    pub count: u64,
}

#[derive(Serialize, Deserialize, Default, Clone, Copy, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TrafficSources {
    pub direct: u64,
    pub referral: u64,
}

#[derive(Serialize, Deserialize, Default, Clone, Copy, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSplit {
    pub mobile: u64,
    pub desktop: u64,
}

/// Aggregated dashboard metrics over one time range. Page views on the
/// admin page are excluded from every visitor and page metric.
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_page_views: u64,
    pub total_image_views: u64,
    pub total_interactions: u64,
    pub unique_visitors: u64,
    pub unique_sessions: u64,
    pub popular_pages: Vec<CountEntry>,
    pub popular_images: Vec<CountEntry>,
    pub traffic_sources: TrafficSources,
    pub devices: DeviceSplit,
    pub interaction_types: Vec<CountEntry>,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub metrics: DashboardMetrics,
    /// Raw pass-through events, newest first, capped
    pub page_views: Vec<PageView>,
    pub image_views: Vec<ImageView>,
    pub interactions: Vec<Interaction>,
    pub time_range: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub success: bool,
    pub data: DashboardData,
}

/// View count for one image title.
#[derive(Serialize, Deserialize, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageStat {
    pub title: String,
    pub views: u64,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageStatsResponse {
    pub success: bool,
    pub data: Vec<ImageStat>,
}

/// Per-day counters for the daily stats endpoint, date as `YYYY-MM-DD`.
#[derive(Serialize, Deserialize, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyStat {
    pub date: String,
    pub page_views: u64,
    pub image_views: u64,
    pub unique_visitors: u64,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DailyStatsResponse {
    pub success: bool,
    pub data: Vec<DailyStat>,
}

/// Deletion count for one analytics collection. A failed collection is
/// reported with `deleted = 0` rather than aborting the sweep.
#[derive(Serialize, Deserialize, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CollectionClear {
    pub collection: String,
    pub deleted: u64,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClearAnalyticsResponse {
    pub success: bool,
    pub message: String,
    pub total_deleted: u64,
    pub results: Vec<CollectionClear>,
}

/// Error envelope for analytics endpoints. Always paired with HTTP 500;
/// `data` serializes as an explicit null.
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsErrorResponse {
    pub success: bool,
    pub error: String,
    #[schema(value_type = Option<Object>)]
    pub data: Option<()>,
}
