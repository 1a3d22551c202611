use std::time::Duration;

use comfy_table::{presets::UTF8_HORIZONTAL_ONLY, Attribute, Cell, ContentArrangement, Table};
use endpoint::Endpoint;
use kernel::{
    ImageRecord, LikeRequest, LikeResponse, ListImagesResponse, SearchImagesResponse,
    SummaryResponse,
};
use reqwest::Client;

pub mod endpoint;

pub struct ListParams {
    pub uri: String,
    pub folder: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub struct SearchParams {
    pub uri: String,
    pub query: String,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub async fn list_images(params: ListParams) {
    let mut endpoint = Endpoint::new(&params.uri).expect("invalid server URI");
    endpoint.append_path("api/images");
    if let Some(folder) = &params.folder {
        endpoint.query("folder", folder);
    }
    if let Some(page) = params.page {
        endpoint.query("page", &page.to_string());
    }
    if let Some(limit) = params.limit {
        endpoint.query("limit", &limit.to_string());
    }

    let client = Client::new();
    match client.get(endpoint.to_string()).send().await {
        Ok(response) => match response.json::<ListImagesResponse>().await {
            Ok(listing) => {
                print_images(&listing.images);
                println!(
                    "page {}/{} ({} images total)",
                    listing.pagination.page,
                    listing.pagination.total_pages,
                    listing.pagination.total_count
                );
            }
            Err(e) => println!("JSON decode error: {e}"),
        },
        Err(e) => {
            println!("error: {e}");
        }
    }
}

pub async fn search_images(params: SearchParams) {
    let mut endpoint = Endpoint::new(&params.uri).expect("invalid server URI");
    endpoint
        .append_path("api/images/search")
        .query("q", &params.query);
    if let Some(page) = params.page {
        endpoint.query("page", &page.to_string());
    }
    if let Some(limit) = params.limit {
        endpoint.query("limit", &limit.to_string());
    }

    let client = Client::new();
    match client.get(endpoint.to_string()).send().await {
        Ok(response) => match response.json::<SearchImagesResponse>().await {
            Ok(listing) => {
                print_images(&listing.images);
                println!(
                    "query '{}': {} matches",
                    listing.search_query, listing.pagination.total_count
                );
            }
            Err(e) => println!("JSON decode error: {e}"),
        },
        Err(e) => {
            println!("error: {e}");
        }
    }
}

pub async fn like_image(uri: &str, image_path: &str) {
    let mut endpoint = Endpoint::new(uri).expect("invalid server URI");
    endpoint.append_path("api/images/like");

    let body = LikeRequest {
        image_path: Some(image_path.to_owned()),
    };
    let client = Client::new();
    match client.post(endpoint.to_string()).json(&body).send().await {
        Ok(response) => match response.json::<LikeResponse>().await {
            Ok(liked) => {
                println!("{} now has {} likes", image_path, liked.new_likes_count);
            }
            Err(e) => println!("JSON decode error: {e}"),
        },
        Err(e) => {
            println!("error: {e}");
        }
    }
}

pub async fn show_summary(uri: &str) {
    let mut endpoint = Endpoint::new(uri).expect("invalid server URI");
    endpoint.append_path("api/analytics/summary");

    let client = Client::new();
    match client.get(endpoint.to_string()).send().await {
        Ok(response) => match response.json::<SummaryResponse>().await {
            Ok(summary) => print_summary(&summary),
            Err(e) => println!("JSON decode error: {e}"),
        },
        Err(e) => {
            println!("error: {e}");
        }
    }
}

pub async fn show_image_stats(uri: &str, limit: Option<u32>) {
    let mut endpoint = Endpoint::new(uri).expect("invalid server URI");
    endpoint.append_path("api/analytics/images");
    if let Some(limit) = limit {
        endpoint.query("limit", &limit.to_string());
    }

    let client = Client::new();
    match client.get(endpoint.to_string()).send().await {
        Ok(response) => match response.json::<serde_json::Value>().await {
            Ok(stats) => match serde_json::to_string_pretty(&stats) {
                Ok(rendered) => println!("{rendered}"),
                Err(e) => println!("JSON encode error: {e}"),
            },
            Err(e) => println!("JSON decode error: {e}"),
        },
        Err(e) => {
            println!("error: {e}");
        }
    }
}

/// Build-time gallery fetch with a hard ceiling: any error or timeout
/// degrades to an empty list instead of failing the caller.
pub async fn fetch_gallery_bounded(
    uri: &str,
    folder: &str,
    timeout: Duration,
) -> Vec<ImageRecord> {
    let Some(mut endpoint) = Endpoint::new(uri) else {
        return Vec::new();
    };
    endpoint
        .append_path("api/images")
        .query("folder", folder)
        .query("limit", "1000");

    let Ok(client) = Client::builder().timeout(timeout).build() else {
        return Vec::new();
    };
    let Ok(response) = client.get(endpoint.to_string()).send().await else {
        return Vec::new();
    };
    match response.json::<ListImagesResponse>().await {
        Ok(listing) => listing.images,
        Err(_) => Vec::new(),
    }
}

fn print_images(images: &[ImageRecord]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_HORIZONTAL_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120)
        .set_header(vec![
            Cell::new("Title").add_attribute(Attribute::Bold),
            Cell::new("Path").add_attribute(Attribute::Bold),
            Cell::new("Series").add_attribute(Attribute::Bold),
            Cell::new("Likes").add_attribute(Attribute::Bold),
        ]);

    for image in images {
        let series = if image.is_series {
            format!("#{}", image.series_index)
        } else {
            String::from("-")
        };
        table.add_row(vec![
            Cell::new(&image.title),
            Cell::new(&image.path),
            Cell::new(series),
            Cell::new(image.likes),
        ]);
    }
    println!("{table}");
}

fn print_summary(summary: &SummaryResponse) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_HORIZONTAL_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120)
        .set_header(vec![
            Cell::new("Window").add_attribute(Attribute::Bold),
            Cell::new("Page views").add_attribute(Attribute::Bold),
            Cell::new("Image views").add_attribute(Attribute::Bold),
            Cell::new("Visitors").add_attribute(Attribute::Bold),
        ]);

    let data = &summary.data;
    for (label, stats) in [
        ("today", data.today),
        ("yesterday", data.yesterday),
        ("last week", data.last_week),
    ] {
        table.add_row(vec![
            Cell::new(label),
            Cell::new(stats.page_views),
            Cell::new(stats.image_views),
            Cell::new(stats.unique_visitors),
        ]);
    }
    println!("{table}");
    println!(
        "growth vs yesterday: views {:+}% visitors {:+}%",
        data.page_views_growth, data.visitors_growth
    );
}
