//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with methods for every endpoint, building the multipart
//! bodies the way the admin frontend would. When routes or request formats
//! change, update only this file.

use super::constants::*;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use std::time::Duration;

/// HTTP test client carrying an optional admin key
pub struct TestClient {
    pub client: reqwest::Client,
    pub base_url: String,
    admin_key: Option<String>,
}

impl TestClient {
    /// Creates a client with no admin key (for testing the access gate)
    pub fn anonymous(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            admin_key: None,
        }
    }

    /// Creates a client that presents the test admin key on every request
    pub fn admin(base_url: String) -> Self {
        let mut client = Self::anonymous(base_url);
        client.admin_key = Some(TEST_ADMIN_KEY.to_string());
        client
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(key) = &self.admin_key {
            builder = builder.header("x-admin-key", key);
        }
        builder
    }

    // =========================================================================
    // Multipart helpers
    // =========================================================================

    fn with_fields(mut form: Form, fields: &[(&str, &str)]) -> Form {
        for (name, value) in fields {
            form = form.text(name.to_string(), value.to_string());
        }
        form
    }

    pub fn audio_part() -> Part {
        Part::bytes(AUDIO_BYTES.to_vec()).file_name("song.mp3")
    }

    pub fn image_part() -> Part {
        Part::bytes(IMAGE_BYTES.to_vec()).file_name("cover.jpg")
    }

    // =========================================================================
    // Tracks
    // =========================================================================

    /// POST /tracks with both payloads attached
    pub async fn create_track(
        &self,
        title: &str,
        artist: &str,
        collection_id: Option<&str>,
    ) -> Response {
        let mut form = Form::new()
            .text("title", title.to_string())
            .text("artist", artist.to_string())
            .text("duration", "180")
            .part("audio_file", Self::audio_part())
            .part("image_file", Self::image_part());
        if let Some(collection_id) = collection_id {
            form = form.text("collection_id", collection_id.to_string());
        }
        self.post_track_form(form).await
    }

    /// POST /tracks with an arbitrary multipart form
    pub async fn post_track_form(&self, form: Form) -> Response {
        self.request(reqwest::Method::POST, "/tracks")
            .multipart(form)
            .send()
            .await
            .expect("create track request failed")
    }

    /// PATCH /tracks/{id} with only text fields
    pub async fn edit_track(&self, id: &str, fields: &[(&str, &str)]) -> Response {
        let form = Self::with_fields(Form::new(), fields);
        self.request(reqwest::Method::PATCH, &format!("/tracks/{}", id))
            .multipart(form)
            .send()
            .await
            .expect("edit track request failed")
    }

    /// PUT /tracks/{id} with an arbitrary multipart form
    pub async fn put_track_form(&self, id: &str, form: Form) -> Response {
        self.request(reqwest::Method::PUT, &format!("/tracks/{}", id))
            .multipart(form)
            .send()
            .await
            .expect("edit track request failed")
    }

    pub async fn delete_track(&self, id: &str) -> Response {
        self.request(reqwest::Method::DELETE, &format!("/tracks/{}", id))
            .send()
            .await
            .expect("delete track request failed")
    }

    pub async fn list_tracks(&self) -> Response {
        self.request(reqwest::Method::GET, "/tracks")
            .send()
            .await
            .expect("list tracks request failed")
    }

    // =========================================================================
    // Collections
    // =========================================================================

    pub async fn create_collection(&self, title: &str, artist: &str) -> Response {
        let form = Form::new()
            .text("title", title.to_string())
            .text("artist", artist.to_string())
            .text("release_year", "2024")
            .part("image_file", Self::image_part());
        self.post_collection_form(form).await
    }

    pub async fn post_collection_form(&self, form: Form) -> Response {
        self.request(reqwest::Method::POST, "/collections")
            .multipart(form)
            .send()
            .await
            .expect("create collection request failed")
    }

    pub async fn edit_collection(&self, id: &str, fields: &[(&str, &str)]) -> Response {
        let form = Self::with_fields(Form::new(), fields);
        self.request(reqwest::Method::PATCH, &format!("/collections/{}", id))
            .multipart(form)
            .send()
            .await
            .expect("edit collection request failed")
    }

    pub async fn delete_collection(&self, id: &str) -> Response {
        self.request(reqwest::Method::DELETE, &format!("/collections/{}", id))
            .send()
            .await
            .expect("delete collection request failed")
    }

    // =========================================================================
    // Discovery feeds and stats
    // =========================================================================

    pub async fn get(&self, path: &str) -> Response {
        self.request(reqwest::Method::GET, path)
            .send()
            .await
            .expect("get request failed")
    }

    pub async fn featured(&self) -> Response {
        self.get("/tracks/featured").await
    }

    pub async fn made_for_you(&self) -> Response {
        self.get("/tracks/made-for-you").await
    }

    pub async fn trending(&self) -> Response {
        self.get("/tracks/trending").await
    }

    pub async fn home(&self) -> Response {
        self.get("/").await
    }
}
