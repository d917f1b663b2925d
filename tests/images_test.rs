//! Ingest, metadata, and deletion behavior over the HTTP surface.

mod helpers;

use helpers::{png_fixture, setup_test_app, upload_form, upload_png, RED};

#[tokio::test]
async fn test_upload_returns_metadata_and_thumbnail() {
    let Some(app) = setup_test_app().await else { return };

    let response = app
        .server
        .post("/v1/images")
        .multipart(upload_form(
            png_fixture(500, 300, RED),
            "image/png",
            "photo.png",
        ))
        .await;
    assert_eq!(response.status_code(), 201);

    let body: serde_json::Value = response.json();
    assert!(body["imageId"].is_string());
    assert_eq!(body["mimeType"], "image/png");
    assert!(body["size"].as_i64().unwrap() > 0);

    // The thumbnail is derived synchronously and fits inside 400px.
    let thumb_url = body["thumbnailUrl"].as_str().unwrap();
    let thumb = app.read_blob(thumb_url);
    let (w, h) = helpers::image_dimensions(&thumb);
    assert!(w <= 400 && h <= 400);
}

#[tokio::test]
async fn test_get_image_metadata() {
    let Some(app) = setup_test_app().await else { return };
    let (id, _) = upload_png(&app, 320, 240).await;

    let response = app.server.get(&format!("/v1/images/{id}")).await;
    assert_eq!(response.status_code(), 200);

    let body: serde_json::Value = response.json();
    assert_eq!(body["imageId"], id.to_string());
    assert_eq!(body["mimeType"], "image/png");
    // With no revisions the download URL serves the original.
    let original = app.read_blob(body["downloadUrl"].as_str().unwrap());
    assert_eq!(helpers::image_dimensions(&original), (320, 240));
}

#[tokio::test]
async fn test_get_missing_image_is_404() {
    let Some(app) = setup_test_app().await else { return };
    let response = app
        .server
        .get(&format!("/v1/images/{}", uuid::Uuid::new_v4()))
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_upload_without_file_is_400() {
    let Some(app) = setup_test_app().await else { return };
    let form = axum_test::multipart::MultipartForm::new().add_text("note", "no image here");
    let response = app.server.post("/v1/images").multipart(form).await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_oversized_upload_is_413() {
    let Some(app) = setup_test_app().await else { return };

    // Over the 10 MiB cap but under the router body limit, so the service
    // gate produces the response. The size gate runs before decoding.
    let data = vec![0u8; 10 * 1024 * 1024 + 512 * 1024];
    let response = app
        .server
        .post("/v1/images")
        .multipart(upload_form(data, "image/png", "big.png"))
        .await;
    assert_eq!(response.status_code(), 413);
}

#[tokio::test]
async fn test_unsupported_mime_is_415() {
    let Some(app) = setup_test_app().await else { return };

    let response = app
        .server
        .post("/v1/images")
        .multipart(upload_form(
            b"GIF89a...".to_vec(),
            "image/gif",
            "anim.gif",
        ))
        .await;
    assert_eq!(response.status_code(), 415);
}

#[tokio::test]
async fn test_undecodable_payload_is_422() {
    let Some(app) = setup_test_app().await else { return };

    let response = app
        .server
        .post("/v1/images")
        .multipart(upload_form(
            b"not actually a png".to_vec(),
            "image/png",
            "fake.png",
        ))
        .await;
    assert_eq!(response.status_code(), 422);
}

#[tokio::test]
async fn test_delete_cascades_rows_and_blobs() {
    let Some(app) = setup_test_app().await else { return };
    let (id, thumb_url) = upload_png(&app, 400, 400).await;

    // Create two revisions so the results bucket has content.
    for _ in 0..2 {
        let response = app
            .server
            .post(&format!("/v1/images/{id}/rotate"))
            .json(&serde_json::json!({"degrees": 90}))
            .await;
        assert_eq!(response.status_code(), 202);
    }
    assert_eq!(app.bucket_files_with_prefix("results", &id.to_string()), 2);

    let response = app.server.delete(&format!("/v1/images/{id}")).await;
    assert_eq!(response.status_code(), 204);

    // Rows gone.
    assert_eq!(
        app.server.get(&format!("/v1/images/{id}")).await.status_code(),
        404
    );
    assert_eq!(
        app.server
            .get(&format!("/v1/images/{id}/history"))
            .await
            .status_code(),
        404
    );
    // Blobs gone: every result object and the thumbnail.
    assert_eq!(app.bucket_files_with_prefix("results", &id.to_string()), 0);
    assert!(!app.blob_exists(&thumb_url));

    // Deleting again is a 404, not an error.
    assert_eq!(
        app.server.delete(&format!("/v1/images/{id}")).await.status_code(),
        404
    );
}

#[tokio::test]
async fn test_thumbnail_endpoint_serves_webp_and_rederives() {
    let Some(app) = setup_test_app().await else { return };
    let (id, _) = upload_png(&app, 800, 600).await;

    let response = app.server.get(&format!("/v1/images/{id}/thumbnail")).await;
    assert_eq!(response.status_code(), 200);
    let bytes = response.as_bytes().to_vec();
    assert_eq!(&bytes[..4], b"RIFF");
    let (w, h) = helpers::image_dimensions(&bytes);
    assert!(w <= 400 && h <= 400);

    // A transform invalidates the cached preview; the rederive on the
    // next miss follows the active artifact, so the new thumbnail has
    // the rotated orientation (800x600 -> 600x800 -> fit 300x400).
    let response = app
        .server
        .post(&format!("/v1/images/{id}/rotate"))
        .json(&serde_json::json!({"degrees": 90}))
        .await;
    assert_eq!(response.status_code(), 202);

    let response = app.server.get(&format!("/v1/images/{id}/thumbnail")).await;
    assert_eq!(response.status_code(), 200);
    let bytes = response.as_bytes().to_vec();
    assert_eq!(helpers::image_dimensions(&bytes), (300, 400));
}

#[tokio::test]
async fn test_health() {
    let Some(app) = setup_test_app().await else { return };
    let response = app.server.get("/health").await;
    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}
