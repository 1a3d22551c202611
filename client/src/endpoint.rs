use core::fmt;

use url::Url;

/// REST endpoint builder over a base URI: path segments are appended
/// percent-encoded, query parameters collected separately.
#[derive(Clone)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    #[must_use]
    pub fn new(uri: &str) -> Option<Endpoint> {
        let base = Url::parse(uri).ok()?;
        Some(Endpoint { url: base })
    }

    pub fn append_path(&mut self, path: &str) -> &mut Self {
        if let Ok(mut segments) = self.url.path_segments_mut() {
            segments.pop_if_empty();
            for part in path.split('/').filter(|part| !part.is_empty()) {
                segments.push(part);
            }
        }
        self
    }

    pub fn query(&mut self, key: &str, value: &str) -> &mut Self {
        self.url.query_pairs_mut().append_pair(key, value);
        self
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn new_correct_some() {
        // Arrange

        // Act
        let e = Endpoint::new("http://localhost");

        // Assert
        assert!(e.is_some());
    }

    #[test]
    fn new_incorrect_none() {
        // Arrange

        // Act
        let e = Endpoint::new("http/localhost");

        // Assert
        assert!(e.is_none());
    }

    #[rstest]
    #[case("http://localhost", "api/images", "http://localhost/api/images")]
    #[case("http://localhost/", "api/images", "http://localhost/api/images")]
    #[case("http://localhost", "/api/images", "http://localhost/api/images")]
    #[case("http://localhost/x", "y", "http://localhost/x/y")]
    #[case("http://localhost/x/", "y", "http://localhost/x/y")]
    #[trace]
    fn append_path_tests(#[case] base: &str, #[case] path: &str, #[case] expected: &str) {
        // Arrange
        let mut e = Endpoint::new(base).unwrap();

        // Act
        e.append_path(path);

        // Assert
        assert_eq!(e.to_string().as_str(), expected);
    }

    #[test]
    fn append_path_twice() {
        // Arrange
        let mut e = Endpoint::new("http://localhost").unwrap();

        // Act
        e.append_path("api").append_path("images");

        // Assert
        assert_eq!(e.to_string().as_str(), "http://localhost/api/images");
    }

    #[test]
    fn query_parameters_are_encoded() {
        // Arrange
        let mut e = Endpoint::new("http://localhost").unwrap();

        // Act
        e.append_path("api/images/search")
            .query("q", "heron at dawn")
            .query("page", "2");

        // Assert
        assert_eq!(
            e.to_string().as_str(),
            "http://localhost/api/images/search?q=heron+at+dawn&page=2"
        );
    }

    #[test]
    fn path_segments_are_encoded() {
        // Arrange
        let mut e = Endpoint::new("http://localhost").unwrap();

        // Act
        e.append_path("files/gallery/winter light.jpg");

        // Assert
        assert_eq!(
            e.to_string().as_str(),
            "http://localhost/files/gallery/winter%20light.jpg"
        );
    }
}
