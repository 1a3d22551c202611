use std::collections::HashMap;
use std::fmt::{Debug, Display};

use chrono::{DateTime, Utc};
use kernel::{DeleteResult, ImageView, Interaction, PageView};
use thiserror::Error;

/// One raw object as yielded by a prefix listing, before any metadata
/// fetch or normalization.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub id: i64,
    pub path: String,
    pub content_type: String,
    pub size: i64,
    pub time_created: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("metadata fetch failed for '{path}': {source}")]
    MetadataFetch {
        path: String,
        source: rusqlite::Error,
    },
    #[error("unknown analytics collection '{0}'")]
    UnknownCollection(String),
}

/// Capability-scoped view of the object store backing the gallery.
///
/// Handlers construct an implementation per request; nothing here is
/// shared mutable state.
pub trait ObjectStore {
    type Err: Debug + Display;

    /// All objects whose key starts with `folder + "/"`, in key order.
    fn list_objects(&mut self, folder: &str) -> Result<Vec<StoredObject>, Self::Err>;

    /// Raw custom metadata map for one object. Empty map when the object
    /// carries no metadata.
    fn object_metadata(&mut self, path: &str) -> Result<HashMap<String, String>, Self::Err>;

    fn insert_object(
        &mut self,
        path: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<i64, Self::Err>;

    fn object_data(&mut self, path: &str) -> Result<(StoredObject, Vec<u8>), Self::Err>;

    /// Upserts custom metadata keys on an existing object.
    fn set_metadata(
        &mut self,
        path: &str,
        entries: &HashMap<String, String>,
    ) -> Result<(), Self::Err>;

    /// Atomic in-store like increment returning the new count.
    fn increment_likes(&mut self, path: &str) -> Result<i64, Self::Err>;

    fn delete_object(&mut self, path: &str) -> Result<DeleteResult, Self::Err>;
}

/// The analytics document store: three typed event collections plus the
/// rollup collections swept by the clear operation.
pub trait EventStore {
    type Err: Debug + Display;

    fn record_page_view(&mut self, view: &PageView) -> Result<(), Self::Err>;

    fn record_image_view(&mut self, view: &ImageView) -> Result<(), Self::Err>;

    fn record_interaction(&mut self, event: &Interaction) -> Result<(), Self::Err>;

    /// Page views with `start <= timestamp < end`, newest first, capped.
    fn page_views_between(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cap: usize,
    ) -> Result<Vec<PageView>, Self::Err>;

    fn image_views_between(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cap: usize,
    ) -> Result<Vec<ImageView>, Self::Err>;

    fn interactions_between(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cap: usize,
    ) -> Result<Vec<Interaction>, Self::Err>;

    /// Deletes every document in one named collection, returning the
    /// number of documents removed.
    fn clear_collection(&mut self, collection: &str) -> Result<usize, Self::Err>;
}
