use axum::{
    body::Body,
    http::HeaderValue,
    response::{IntoResponse, Response},
};

use crate::domain::StoredObject;

/// Binary image reply served inline with the stored content type and a
/// day-long cache lifetime, matching the sitemap's cache window.
pub struct ImageReply {
    data: Vec<u8>,
    object: StoredObject,
}

impl ImageReply {
    #[must_use]
    pub fn new(data: Vec<u8>, object: StoredObject) -> Self {
        Self { data, object }
    }

    fn name_from_path(&self) -> &str {
        let path = &self.object.path;
        if let Some(ix) = path.rfind('/') {
            &path[ix + 1..]
        } else {
            path
        }
    }
}

impl IntoResponse for ImageReply {
    fn into_response(self) -> Response {
        let file_name = self.name_from_path().to_owned();
        let size = self.object.size.to_string();
        let content_type = self.object.content_type.clone();
        let mut res = Body::from(self.data).into_response();
        if let Ok(val) = HeaderValue::from_str(&content_type) {
            res.headers_mut().insert("content-type", val);
        }
        let disposition = format!(r#"inline; filename="{file_name}""#);
        if let Ok(val) = HeaderValue::from_str(disposition.as_str()) {
            res.headers_mut().insert("content-disposition", val);
        }
        if let Ok(val) = HeaderValue::from_str(size.as_str()) {
            res.headers_mut().insert("content-length", val);
        }
        res.headers_mut().insert(
            "cache-control",
            HeaderValue::from_static("public, max-age=86400"),
        );
        res
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("", "")]
    #[case("file.jpg", "file.jpg")]
    #[case("gallery/file.jpg", "file.jpg")]
    #[case("gallery/nested/file.jpg", "file.jpg")]
    #[trace]
    fn name_from_path(#[case] path: &str, #[case] expected: &str) {
        // Arrange
        let object = StoredObject {
            id: 1,
            path: path.to_owned(),
            content_type: "image/jpeg".to_owned(),
            size: 1,
            time_created: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        };
        let reply = ImageReply::new(Vec::new(), object);

        // Act
        let name = reply.name_from_path();

        // Assert
        assert_eq!(name, expected);
    }
}
