use client::{ListParams, SearchParams};

pub async fn list_images(params: ListParams) {
    client::list_images(params).await;
}

pub async fn search_images(params: SearchParams) {
    client::search_images(params).await;
}

pub async fn like_image(uri: &str, image_path: &str) {
    client::like_image(uri, image_path).await;
}

pub async fn show_summary(uri: &str) {
    client::show_summary(uri).await;
}

pub async fn show_image_stats(uri: &str, limit: Option<u32>) {
    client::show_image_stats(uri, limit).await;
}
