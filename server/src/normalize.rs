//! Normalization of raw storage objects into gallery image records.
//!
//! Series membership comes first from the `name.N.ext` filename
//! convention (a numbered suffix before the extension, e.g.
//! `heron.3.jpg`), which overrides any explicit metadata; only
//! filenames outside the convention fall back to the stored
//! `isSeries`/`title`/`seriesIndex` fields.

use std::collections::HashMap;
use std::sync::LazyLock;

use kernel::ImageRecord;
use regex::Regex;

use crate::domain::StoredObject;

static SERIES_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)\.(\d+)(\.[A-Za-z0-9]+)?$").expect("series pattern"));

/// Filename component of an object key, the part after the last `/`.
pub fn filename(path: &str) -> &str {
    match path.rfind('/') {
        Some(ix) => &path[ix + 1..],
        None => path,
    }
}

/// Build the normalized record for one object from its raw custom
/// metadata map. Metadata fetch failures are the caller's concern;
/// normalization itself cannot fail.
pub fn normalize(
    object: &StoredObject,
    metadata: &HashMap<String, String>,
    base_url: &str,
) -> ImageRecord {
    let name = filename(&object.path);

    let (is_series, title, series_index) = match SERIES_PATTERN.captures(name) {
        Some(caps) => {
            let base = caps.get(1).map(|m| m.as_str()).unwrap_or(name);
            let index = caps
                .get(2)
                .and_then(|m| m.as_str().parse::<u32>().ok())
                .unwrap_or(1);
            (true, base.to_owned(), index)
        }
        None => {
            let is_series = metadata
                .get("isSeries")
                .is_some_and(|value| value == "true");
            let title = metadata
                .get("title")
                .cloned()
                .unwrap_or_else(|| name.to_owned());
            let index = metadata
                .get("seriesIndex")
                .and_then(|value| value.parse::<u32>().ok())
                .unwrap_or(1);
            (is_series, title, index)
        }
    };

    ImageRecord {
        id: object.path.clone(),
        path: object.path.clone(),
        name: name.to_owned(),
        src: resolve_src(&object.path, metadata, base_url),
        title,
        alt: metadata
            .get("alt")
            .cloned()
            .unwrap_or_else(|| name.to_owned()),
        description: metadata.get("description").cloned().unwrap_or_default(),
        scientific_name: metadata
            .get("scientificName")
            .cloned()
            .unwrap_or_default(),
        location: metadata.get("location").cloned().unwrap_or_default(),
        is_series,
        series_index,
        size: object.size,
        time_created: object.time_created.to_rfc3339(),
        content_type: object.content_type.clone(),
        likes: metadata
            .get("likes")
            .and_then(|value| value.parse::<i64>().ok())
            .unwrap_or(0),
    }
}

/// Content URL for one object. With a download token the URL is
/// token-qualified; without one a plain URL is produced, which a
/// private deployment will refuse. Known gap, kept as-is.
fn resolve_src(path: &str, metadata: &HashMap<String, String>, base_url: &str) -> String {
    let encoded = encode_path(path);
    match metadata.get("downloadToken") {
        Some(token) => format!("{base_url}/files/{encoded}?token={token}"),
        None => format!("{base_url}/files/{encoded}"),
    }
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
