//! Dynamic sitemap rendering: the static marketing pages plus one URL
//! per valid gallery image, located by its slug.

use crate::domain::ObjectStore;
use crate::gallery::{is_image_key, DEFAULT_FOLDER};
use crate::normalize::normalize;
use crate::slug::generate_slug;

pub const STATIC_PAGES: [&str; 5] = ["", "gallery", "about", "services", "contact"];

/// Slugs for every image object in the gallery folder. A listing
/// failure degrades to no image entries; per-object metadata failures
/// drop only that object.
pub fn image_slugs<S: ObjectStore>(store: &mut S, base_url: &str) -> Vec<String> {
    let objects = match store.list_objects(DEFAULT_FOLDER) {
        Ok(objects) => objects,
        Err(e) => {
            tracing::warn!("sitemap listing failed, emitting static pages only: {e}");
            return Vec::new();
        }
    };

    let mut slugs = Vec::new();
    for object in objects.into_iter().filter(|o| is_image_key(&o.path)) {
        match store.object_metadata(&object.path) {
            Ok(metadata) => {
                let record = normalize(&object, &metadata, base_url);
                slugs.push(generate_slug(
                    &record.title,
                    &record.scientific_name,
                    &object.id.to_string(),
                ));
            }
            Err(e) => {
                tracing::warn!("dropping '{}' from sitemap: {e}", object.path);
            }
        }
    }
    slugs
}

/// Render the sitemap XML document for the given base URL and slugs.
pub fn render(base_url: &str, image_slugs: &[String]) -> String {
    let mut xml = String::with_capacity(512 + image_slugs.len() * 96);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#);
    xml.push('\n');

    for page in STATIC_PAGES {
        let loc = if page.is_empty() {
            format!("{base_url}/")
        } else {
            format!("{base_url}/{page}")
        };
        push_url(&mut xml, &loc);
    }
    for slug in image_slugs {
        push_url(&mut xml, &format!("{base_url}/gallery/{slug}"));
    }

    xml.push_str("</urlset>\n");
    xml
}

fn push_url(xml: &mut String, loc: &str) {
    xml.push_str("  <url><loc>");
    xml.push_str(&escape(loc));
    xml.push_str("</loc></url>\n");
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_static_pages_and_images() {
        let slugs = vec!["philippine-eagle-1".to_owned(), "heron-2".to_owned()];

        let xml = render("http://localhost:5000", &slugs);

        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains("<loc>http://localhost:5000/</loc>"));
        assert!(xml.contains("<loc>http://localhost:5000/gallery</loc>"));
        assert!(xml.contains("<loc>http://localhost:5000/about</loc>"));
        assert!(xml.contains("<loc>http://localhost:5000/services</loc>"));
        assert!(xml.contains("<loc>http://localhost:5000/contact</loc>"));
        assert!(xml.contains("<loc>http://localhost:5000/gallery/philippine-eagle-1</loc>"));
        assert!(xml.contains("<loc>http://localhost:5000/gallery/heron-2</loc>"));
        assert!(xml.ends_with("</urlset>\n"));
    }

    #[test]
    fn escapes_ampersands_in_locations() {
        let xml = render("http://localhost:5000?a=1&b=2", &[]);

        assert!(xml.contains("?a=1&amp;b=2"));
    }
}
