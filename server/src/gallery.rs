//! Gallery listing, search and grouping over the object store.
//!
//! Listing paginates the raw key listing before any metadata is
//! fetched, so per-request fetch cost is bounded by the page size.
//! Search needs the normalized text fields for matching, so it
//! normalizes everything first and paginates afterwards. Per-object
//! metadata failures never abort a request: the failed item is logged
//! and dropped, and the pre-fetch total count is kept as-is.

use std::collections::HashMap;

use kernel::{AdminImageRecord, ArtworkGroup, ImageRecord, Pagination};

use crate::domain::{ObjectStore, StoredObject};
use crate::normalize::{filename, normalize};

pub const DEFAULT_FOLDER: &str = "gallery";
pub const FEATURED_FOLDER: &str = "featured";
pub const DEFAULT_LIMIT: u32 = 20;
pub const ADMIN_DEFAULT_LIMIT: u32 = 100;

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "webp", "svg"];

pub struct ListPage {
    pub images: Vec<ImageRecord>,
    pub pagination: Pagination,
}

pub struct AdminListPage {
    pub images: Vec<AdminImageRecord>,
    pub pagination: Pagination,
}

/// True when the key names an image object rather than a folder
/// placeholder: it must contain a `.` and end in a known extension.
pub fn is_image_key(path: &str) -> bool {
    let name = filename(path);
    if !name.contains('.') {
        return false;
    }
    match name.rsplit('.').next() {
        Some(ext) => IMAGE_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known)),
        None => false,
    }
}

pub fn paginate(page: u32, limit: u32, total_count: usize) -> Pagination {
    let offset = (page as usize - 1) * limit as usize;
    Pagination {
        page,
        limit,
        total_count: total_count as u64,
        has_more: offset + (limit as usize) < total_count,
        total_pages: total_count.div_ceil(limit as usize) as u32,
    }
}

/// One page of the folder listing. Only the sliced page is normalized;
/// `total_count` is computed from the filtered listing before any
/// metadata fetch, so a dropped item shrinks the page but not the
/// count.
pub fn list_images<S: ObjectStore>(
    store: &mut S,
    folder: &str,
    page: u32,
    limit: u32,
    base_url: &str,
) -> Result<ListPage, S::Err> {
    let filtered = list_image_objects(store, folder)?;
    let total_count = filtered.len();
    let offset = (page as usize - 1) * limit as usize;

    let mut images = Vec::new();
    for object in filtered.into_iter().skip(offset).take(limit as usize) {
        match store.object_metadata(&object.path) {
            Ok(metadata) => images.push(normalize(&object, &metadata, base_url)),
            Err(e) => {
                tracing::warn!("dropping '{}' from listing: {e}", object.path);
            }
        }
    }

    Ok(ListPage {
        images,
        pagination: paginate(page, limit, total_count),
    })
}

/// Substring search across the normalized text fields. Everything is
/// normalized up front because matching needs the metadata; pagination
/// runs against the filtered count.
pub fn search_images<S: ObjectStore>(
    store: &mut S,
    folder: &str,
    query: &str,
    page: u32,
    limit: u32,
    base_url: &str,
) -> Result<ListPage, S::Err> {
    let objects = list_image_objects(store, folder)?;
    let all = normalize_all(store, objects, base_url);
    let matched: Vec<ImageRecord> = all
        .into_iter()
        .filter(|record| matches_query(record, query))
        .collect();
    let total_count = matched.len();
    let offset = (page as usize - 1) * limit as usize;

    Ok(ListPage {
        images: matched
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .collect(),
        pagination: paginate(page, limit, total_count),
    })
}

/// Admin-shaped listing: same slicing as `list_images`, each record
/// carrying the raw metadata map and storage attributes.
pub fn admin_list_images<S: ObjectStore>(
    store: &mut S,
    folder: &str,
    page: u32,
    limit: u32,
    base_url: &str,
) -> Result<AdminListPage, S::Err> {
    let filtered = list_image_objects(store, folder)?;
    let total_count = filtered.len();
    let offset = (page as usize - 1) * limit as usize;

    let mut images = Vec::new();
    for object in filtered.into_iter().skip(offset).take(limit as usize) {
        match store.object_metadata(&object.path) {
            Ok(metadata) => images.push(admin_record(&object, metadata, folder, base_url)),
            Err(e) => {
                tracing::warn!("dropping '{}' from admin listing: {e}", object.path);
            }
        }
    }

    Ok(AdminListPage {
        images,
        pagination: paginate(page, limit, total_count),
    })
}

pub fn admin_search_images<S: ObjectStore>(
    store: &mut S,
    folder: &str,
    query: &str,
    page: u32,
    limit: u32,
    base_url: &str,
) -> Result<AdminListPage, S::Err> {
    let objects = list_image_objects(store, folder)?;
    let mut all = Vec::new();
    for object in objects {
        match store.object_metadata(&object.path) {
            Ok(metadata) => all.push(admin_record(&object, metadata, folder, base_url)),
            Err(e) => {
                tracing::warn!("dropping '{}' from admin search: {e}", object.path);
            }
        }
    }
    let matched: Vec<AdminImageRecord> = all
        .into_iter()
        .filter(|admin| matches_query(&admin.record, query))
        .collect();
    let total_count = matched.len();
    let offset = (page as usize - 1) * limit as usize;

    Ok(AdminListPage {
        images: matched
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .collect(),
        pagination: paginate(page, limit, total_count),
    })
}

/// Full normalized listing of the featured folder, no pagination.
pub fn featured_images<S: ObjectStore>(
    store: &mut S,
    base_url: &str,
) -> Result<Vec<ImageRecord>, S::Err> {
    let objects = list_image_objects(store, FEATURED_FOLDER)?;
    Ok(normalize_all(store, objects, base_url))
}

/// Every image in a folder, normalized, unpaginated. Feeds the legacy
/// grouped endpoint.
pub fn all_images<S: ObjectStore>(
    store: &mut S,
    folder: &str,
    base_url: &str,
) -> Result<Vec<ImageRecord>, S::Err> {
    let objects = list_image_objects(store, folder)?;
    Ok(normalize_all(store, objects, base_url))
}

/// Cluster records into artwork groups: series members share their
/// title, standalone images keep a key of their own. Member URLs stay
/// in listing encounter order, not `series_index` order, matching the
/// behavior of the listing this was ported from.
pub fn group_images(images: &[ImageRecord]) -> Vec<ArtworkGroup> {
    let mut order: Vec<ArtworkGroup> = Vec::new();
    let mut index_by_key: HashMap<String, usize> = HashMap::new();

    for record in images {
        let key = if record.is_series {
            record.title.clone()
        } else {
            let label = if record.title.is_empty() {
                &record.name
            } else {
                &record.title
            };
            format!("individual_{label}")
        };

        match index_by_key.get(&key) {
            Some(&ix) => {
                order[ix].images.push(record.src.clone());
                if order[ix].images.len() > 1 {
                    order[ix].is_series = true;
                }
            }
            None => {
                index_by_key.insert(key, order.len());
                order.push(ArtworkGroup {
                    id: 0,
                    title: record.title.clone(),
                    alt: record.alt.clone(),
                    description: record.description.clone(),
                    images: vec![record.src.clone()],
                    is_series: false,
                });
            }
        }
    }

    for (ix, group) in order.iter_mut().enumerate() {
        group.id = ix as u32 + 1;
    }
    order
}

fn list_image_objects<S: ObjectStore>(
    store: &mut S,
    folder: &str,
) -> Result<Vec<StoredObject>, S::Err> {
    Ok(store
        .list_objects(folder)?
        .into_iter()
        .filter(|object| is_image_key(&object.path))
        .collect())
}

fn normalize_all<S: ObjectStore>(
    store: &mut S,
    objects: Vec<StoredObject>,
    base_url: &str,
) -> Vec<ImageRecord> {
    let mut records = Vec::with_capacity(objects.len());
    for object in objects {
        match store.object_metadata(&object.path) {
            Ok(metadata) => records.push(normalize(&object, &metadata, base_url)),
            Err(e) => {
                tracing::warn!("dropping '{}': {e}", object.path);
            }
        }
    }
    records
}

fn matches_query(record: &ImageRecord, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    [
        &record.title,
        &record.description,
        &record.alt,
        &record.name,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(&needle))
}

fn admin_record(
    object: &StoredObject,
    metadata: HashMap<String, String>,
    folder: &str,
    base_url: &str,
) -> AdminImageRecord {
    AdminImageRecord {
        record: normalize(object, &metadata, base_url),
        full_path: object.path.clone(),
        bucket: folder.to_owned(),
        metadata,
    }
}
