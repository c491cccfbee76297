//! End-to-end tests for track endpoints
//!
//! Covers creation, editing (including collection reassignment), deletion,
//! the admin gate, and upload boundary enforcement.

mod common;

use common::{TestClient, TestServer, TEST_MAX_FILE_SIZE};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;

#[tokio::test]
async fn test_create_track_returns_entity_with_urls() {
    let server = TestServer::spawn().await;
    let client = TestClient::admin(server.base_url.clone());

    let response = client.create_track("Opening Track", "The Test Band", None).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let track: serde_json::Value = response.json().await.unwrap();
    assert_eq!(track["title"], "Opening Track");
    assert_eq!(track["artist"], "The Test Band");
    assert_eq!(track["duration_secs"], 180);
    assert!(track["collection_id"].is_null());
    assert!(track["audio_url"].as_str().unwrap().contains("/media/"));
    assert!(track["image_url"].as_str().unwrap().contains("/media/"));
    assert!(track.get("membership_warning").is_none());
}

#[tokio::test]
async fn test_created_media_is_served() {
    let server = TestServer::spawn().await;
    let client = TestClient::admin(server.base_url.clone());

    let response = client.create_track("Song", "Artist", None).await;
    let track: serde_json::Value = response.json().await.unwrap();

    let audio_url = track["audio_url"].as_str().unwrap();
    let fetched = client.client.get(audio_url).send().await.unwrap();
    assert_eq!(fetched.status(), StatusCode::OK);
    assert_eq!(fetched.bytes().await.unwrap().as_ref(), common::AUDIO_BYTES);
}

#[tokio::test]
async fn test_create_track_without_image_is_rejected() {
    let server = TestServer::spawn().await;
    let client = TestClient::admin(server.base_url.clone());

    let form = Form::new()
        .text("title", "No Cover")
        .text("artist", "Artist")
        .part("audio_file", TestClient::audio_part());
    let response = client.post_track_form(form).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(server.catalog_store.tracks_count(), 0);
}

#[tokio::test]
async fn test_create_track_without_audio_is_rejected() {
    let server = TestServer::spawn().await;
    let client = TestClient::admin(server.base_url.clone());

    let form = Form::new()
        .text("title", "No Audio")
        .part("image_file", TestClient::image_part());
    let response = client.post_track_form(form).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(server.catalog_store.tracks_count(), 0);
}

#[tokio::test]
async fn test_oversized_upload_is_rejected_at_the_boundary() {
    let server = TestServer::spawn().await;
    let client = TestClient::admin(server.base_url.clone());

    let mut oversized = vec![0xFF, 0xD8, 0xFF, 0xE0];
    oversized.resize(TEST_MAX_FILE_SIZE as usize + 1, 0);
    let form = Form::new()
        .text("title", "Huge")
        .part("audio_file", TestClient::audio_part())
        .part("image_file", Part::bytes(oversized).file_name("cover.jpg"));
    let response = client.post_track_form(form).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(server.catalog_store.tracks_count(), 0);
}

#[tokio::test]
async fn test_mutations_require_admin_key() {
    let server = TestServer::spawn().await;
    let client = TestClient::anonymous(server.base_url.clone());

    let response = client.create_track("Song", "Artist", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client.delete_track("any-id").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = client.list_tracks().await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(server.catalog_store.tracks_count(), 0);
}

#[tokio::test]
async fn test_list_tracks_newest_first() {
    let server = TestServer::spawn().await;
    let client = TestClient::admin(server.base_url.clone());

    let mut created_ids = Vec::new();
    for title in ["first", "second", "third"] {
        let response = client.create_track(title, "Artist", None).await;
        let track: serde_json::Value = response.json().await.unwrap();
        created_ids.push(track["id"].as_str().unwrap().to_string());
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let response = client.list_tracks().await;
    assert_eq!(response.status(), StatusCode::OK);
    let listed: Vec<serde_json::Value> = response.json().await.unwrap();
    let listed_ids: Vec<&str> = listed.iter().map(|t| t["id"].as_str().unwrap()).collect();

    created_ids.reverse();
    assert_eq!(listed_ids, created_ids);
}

#[tokio::test]
async fn test_edit_track_updates_only_supplied_fields() {
    let server = TestServer::spawn().await;
    let client = TestClient::admin(server.base_url.clone());

    let response = client.create_track("Original", "Artist", None).await;
    let track: serde_json::Value = response.json().await.unwrap();
    let id = track["id"].as_str().unwrap();

    let response = client.edit_track(id, &[("title", "Renamed")]).await;
    assert_eq!(response.status(), StatusCode::OK);

    let edited: serde_json::Value = response.json().await.unwrap();
    assert_eq!(edited["title"], "Renamed");
    assert_eq!(edited["artist"], "Artist");
    assert_eq!(edited["audio_url"], track["audio_url"]);
}

#[tokio::test]
async fn test_edit_track_replaces_audio_via_put() {
    let server = TestServer::spawn().await;
    let client = TestClient::admin(server.base_url.clone());

    let response = client.create_track("Song", "Artist", None).await;
    let track: serde_json::Value = response.json().await.unwrap();
    let id = track["id"].as_str().unwrap();

    // Different bytes, so content addressing yields a different URL
    let form = Form::new().part(
        "audio_file",
        Part::bytes(vec![0x49, 0x44, 0x33, 0x04, 0x01, 0x02, 0x03]).file_name("new.mp3"),
    );
    let response = client.put_track_form(id, form).await;
    assert_eq!(response.status(), StatusCode::OK);

    let edited: serde_json::Value = response.json().await.unwrap();
    assert_ne!(edited["audio_url"], track["audio_url"]);
    assert_eq!(edited["image_url"], track["image_url"]);
}

#[tokio::test]
async fn test_edit_missing_track_returns_404() {
    let server = TestServer::spawn().await;
    let client = TestClient::admin(server.base_url.clone());

    let response = client.edit_track("nonexistent", &[("title", "x")]).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_track_then_404() {
    let server = TestServer::spawn().await;
    let client = TestClient::admin(server.base_url.clone());

    let response = client.create_track("Doomed", "Artist", None).await;
    let track: serde_json::Value = response.json().await.unwrap();
    let id = track["id"].as_str().unwrap();

    let response = client.delete_track(id).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = client.delete_track(id).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reassigning_track_moves_membership() {
    let server = TestServer::spawn().await;
    let client = TestClient::admin(server.base_url.clone());

    let a: serde_json::Value = client
        .create_collection("Collection A", "Artist")
        .await
        .json()
        .await
        .unwrap();
    let b: serde_json::Value = client
        .create_collection("Collection B", "Artist")
        .await
        .json()
        .await
        .unwrap();
    let a_id = a["id"].as_str().unwrap();
    let b_id = b["id"].as_str().unwrap();

    let track: serde_json::Value = client
        .create_track("Mover", "Artist", Some(a_id))
        .await
        .json()
        .await
        .unwrap();
    let track_id = track["id"].as_str().unwrap();

    let response = client.edit_track(track_id, &[("collection_id", b_id)]).await;
    assert_eq!(response.status(), StatusCode::OK);

    let a_after = server.catalog_store.get_collection(a_id).unwrap().unwrap();
    let b_after = server.catalog_store.get_collection(b_id).unwrap().unwrap();
    assert!(a_after.members.is_empty());
    assert_eq!(b_after.members, vec![track_id.to_string()]);
}

#[tokio::test]
async fn test_create_track_in_missing_collection_reports_warning() {
    let server = TestServer::spawn().await;
    let client = TestClient::admin(server.base_url.clone());

    let response = client.create_track("Orphan", "Artist", Some("ghost")).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let track: serde_json::Value = response.json().await.unwrap();
    assert!(track["membership_warning"].is_string());
    assert_eq!(server.catalog_store.tracks_count(), 1);
}
