//! Transform pipeline behavior: apply, undo, history, validation.

mod helpers;

use helpers::{setup_test_app, upload_png};
use serde_json::json;

#[tokio::test]
async fn test_rotate_round_trip_dimensions() {
    let Some(app) = setup_test_app().await else { return };
    let (id, _) = upload_png(&app, 100, 200).await;

    let response = app
        .server
        .post(&format!("/v1/images/{id}/rotate"))
        .json(&json!({"degrees": 90}))
        .await;
    assert_eq!(response.status_code(), 202);
    let body: serde_json::Value = response.json();
    assert_eq!(body["operation"], "rotate");
    assert_eq!(body["params"]["degrees"], 90);

    let rotated = app.read_blob(body["downloadUrl"].as_str().unwrap());
    assert_eq!(helpers::image_dimensions(&rotated), (200, 100));

    // Rotating back restores the original shape and solid color.
    let response = app
        .server
        .post(&format!("/v1/images/{id}/rotate"))
        .json(&json!({"degrees": 270}))
        .await;
    assert_eq!(response.status_code(), 202);
    let body: serde_json::Value = response.json();
    let restored = app.read_blob(body["downloadUrl"].as_str().unwrap());
    assert_eq!(helpers::image_dimensions(&restored), (100, 200));

    let img = image::load_from_memory(&restored).unwrap().to_rgba8();
    assert_eq!(img.get_pixel(50, 100), &helpers::RED);
}

#[tokio::test]
async fn test_compress_transcodes_to_jpeg() {
    let Some(app) = setup_test_app().await else { return };
    let (id, _) = upload_png(&app, 300, 300).await;

    let response = app
        .server
        .post(&format!("/v1/images/{id}/compress"))
        .json(&json!({"quality": 60}))
        .await;
    assert_eq!(response.status_code(), 202);
    let body: serde_json::Value = response.json();

    let url = body["downloadUrl"].as_str().unwrap();
    assert!(url.contains(".jpg"), "compress output is jpeg: {url}");
    let blob = app.read_blob(url);
    assert_eq!(&blob[..2], &[0xFF, 0xD8]);
}

#[tokio::test]
async fn test_resize_fit_inside() {
    let Some(app) = setup_test_app().await else { return };
    let (id, _) = upload_png(&app, 400, 200).await;

    let response = app
        .server
        .post(&format!("/v1/images/{id}/resize"))
        .json(&json!({"width": 800}))
        .await;
    assert_eq!(response.status_code(), 202);
    let body: serde_json::Value = response.json();
    let blob = app.read_blob(body["downloadUrl"].as_str().unwrap());
    assert_eq!(helpers::image_dimensions(&blob), (800, 400));
}

#[tokio::test]
async fn test_undo_chain() {
    let Some(app) = setup_test_app().await else { return };
    let (id, _) = upload_png(&app, 200, 200).await;

    let rev1: serde_json::Value = app
        .server
        .post(&format!("/v1/images/{id}/rotate"))
        .json(&json!({"degrees": 90}))
        .await
        .json();
    let rev2: serde_json::Value = app
        .server
        .post(&format!("/v1/images/{id}/flip"))
        .json(&json!({"horizontal": true, "vertical": false}))
        .await
        .json();
    assert_eq!(rev2["operation"], "flip");

    // Undo returns rev1 as the now-active revision.
    let response = app.server.post(&format!("/v1/images/{id}/undo")).await;
    assert_eq!(response.status_code(), 200);
    let undone: serde_json::Value = response.json();
    assert_eq!(undone["revisionId"], rev1["revisionId"]);

    // History shows only rev1; rev2 is tombstoned, not deleted.
    let history: serde_json::Value = app
        .server
        .get(&format!("/v1/images/{id}/history"))
        .await
        .json();
    let revisions = history["revisions"].as_array().unwrap();
    assert_eq!(revisions.len(), 1);
    assert_eq!(revisions[0]["revisionId"], rev1["revisionId"]);

    // A new apply parents off rev1, diverging from the tombstoned tail.
    let rev3: serde_json::Value = app
        .server
        .post(&format!("/v1/images/{id}/rotate"))
        .json(&json!({"degrees": 180}))
        .await
        .json();
    assert_eq!(rev3["operation"], "rotate");

    let history: serde_json::Value = app
        .server
        .get(&format!("/v1/images/{id}/history"))
        .await
        .json();
    let revisions = history["revisions"].as_array().unwrap();
    assert_eq!(revisions.len(), 2);
    assert_eq!(revisions[1]["revisionId"], rev3["revisionId"]);
    assert_eq!(revisions[1]["parentId"], rev1["revisionId"]);
}

#[tokio::test]
async fn test_repeated_undo_walks_back_then_fails() {
    let Some(app) = setup_test_app().await else { return };
    let (id, _) = upload_png(&app, 200, 200).await;

    // No revisions yet: nothing to undo.
    let response = app.server.post(&format!("/v1/images/{id}/undo")).await;
    assert_eq!(response.status_code(), 400);

    for degrees in [90, 180] {
        app.server
            .post(&format!("/v1/images/{id}/rotate"))
            .json(&json!({"degrees": degrees}))
            .await;
    }

    // First undo walks to the first revision.
    assert_eq!(
        app.server
            .post(&format!("/v1/images/{id}/undo"))
            .await
            .status_code(),
        200
    );
    // The first revision has no parent revision: cannot undo past the
    // original.
    assert_eq!(
        app.server
            .post(&format!("/v1/images/{id}/undo"))
            .await
            .status_code(),
        400
    );
}

#[tokio::test]
async fn test_operation_validation_rejections() {
    let Some(app) = setup_test_app().await else { return };
    let (id, _) = upload_png(&app, 300, 300).await;

    let cases = [
        ("rotate", json!({"degrees": 45})),
        ("resize", json!({"width": 100})),
        ("resize", json!({})),
        ("resize", json!({"height": 4001})),
        ("compress", json!({"quality": 5})),
        ("compress", json!({"quality": 150})),
    ];
    for (op, body) in cases {
        let response = app
            .server
            .post(&format!("/v1/images/{id}/{op}"))
            .json(&body)
            .await;
        assert_eq!(response.status_code(), 400, "{op} {body}");
    }

    // No revision was created by any rejected operation.
    let history: serde_json::Value = app
        .server
        .get(&format!("/v1/images/{id}/history"))
        .await
        .json();
    assert!(history["revisions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_binary_operation_endpoint() {
    let Some(app) = setup_test_app().await else { return };
    let (id, _) = upload_png(&app, 100, 200).await;

    let encoded = pixed_proto::encode(&pixed_core::models::Operation::Rotate { degrees: 90 });
    let response = app
        .server
        .post(&format!("/v1/images/{id}/ops"))
        .bytes(encoded.clone().into())
        .content_type("application/octet-stream")
        .await;
    assert_eq!(response.status_code(), 202);
    let body: serde_json::Value = response.json();
    assert_eq!(body["operation"], "rotate");
    let blob = app.read_blob(body["downloadUrl"].as_str().unwrap());
    assert_eq!(helpers::image_dimensions(&blob), (200, 100));

    // A tampered message fails the checksum and rejects with 400.
    let mut tampered = encoded;
    tampered[12] ^= 0x01;
    let response = app
        .server
        .post(&format!("/v1/images/{id}/ops"))
        .bytes(tampered.into())
        .content_type("application/octet-stream")
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_transform_on_missing_image_is_404() {
    let Some(app) = setup_test_app().await else { return };
    let response = app
        .server
        .post(&format!("/v1/images/{}/rotate", uuid::Uuid::new_v4()))
        .json(&json!({"degrees": 90}))
        .await;
    assert_eq!(response.status_code(), 404);
}
