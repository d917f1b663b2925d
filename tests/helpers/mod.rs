//! Shared helpers for the end-to-end suite.
//!
//! The suite drives the real router over `axum-test` against live Postgres
//! and Redis. Tests skip themselves when `DATABASE_URL` or `REDIS_URL` is
//! absent so the pure tests stay runnable anywhere. Storage always runs on
//! a per-test temp directory in local-filesystem mode, which also lets
//! tests read result blobs straight off disk.

#![allow(dead_code)]

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::PathBuf;
use uuid::Uuid;

use pixed_core::Config;

pub struct TestApp {
    pub server: TestServer,
    storage_dir: tempfile::TempDir,
}

pub const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Build the full app against live infrastructure, or None to skip.
pub async fn setup_test_app() -> Option<TestApp> {
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("skipping: DATABASE_URL not set");
            return None;
        }
    };
    let redis_url = match std::env::var("REDIS_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("skipping: REDIS_URL not set");
            return None;
        }
    };

    let storage_dir = tempfile::tempdir().expect("create temp storage dir");
    let config = Config {
        server_port: 0,
        cors_origin: None,
        database_url,
        db_max_connections: 5,
        redis_url,
        gcp_project_id: None,
        gcs_bucket_prefix: "pixed".to_string(),
        local_storage_path: storage_dir.path().display().to_string(),
        local_storage_base_url: "http://localhost:3000/files".to_string(),
        skip_db_check: false,
    };

    let (_state, router) = pixed_api::setup::initialize_app(config)
        .await
        .expect("initialize app");

    Some(TestApp {
        server: TestServer::new(router).expect("build test server"),
        storage_dir,
    })
}

impl TestApp {
    /// Map a local-mode signed URL back to its file on disk and read it.
    pub fn read_blob(&self, download_url: &str) -> Vec<u8> {
        let rel = download_url
            .split("/files/")
            .nth(1)
            .expect("local download url")
            .split('?')
            .next()
            .unwrap();
        let path: PathBuf = self.storage_dir.path().join(rel);
        std::fs::read(&path).unwrap_or_else(|e| panic!("read blob {}: {e}", path.display()))
    }

    pub fn blob_exists(&self, download_url: &str) -> bool {
        let rel = download_url
            .split("/files/")
            .nth(1)
            .expect("local download url")
            .split('?')
            .next()
            .unwrap();
        self.storage_dir.path().join(rel).exists()
    }

    /// Count files under one bucket directory whose name starts with `prefix`.
    pub fn bucket_files_with_prefix(&self, bucket: &str, prefix: &str) -> usize {
        let dir = self.storage_dir.path().join(bucket);
        match std::fs::read_dir(dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .filter(|e| {
                    e.file_name()
                        .to_str()
                        .is_some_and(|name| name.starts_with(prefix))
                })
                .count(),
            Err(_) => 0,
        }
    }
}

pub fn png_fixture(width: u32, height: u32, color: Rgba<u8>) -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, color));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

pub fn image_dimensions(data: &[u8]) -> (u32, u32) {
    use image::GenericImageView;
    image::load_from_memory(data).unwrap().dimensions()
}

pub fn upload_form(data: Vec<u8>, mime: &str, filename: &str) -> MultipartForm {
    MultipartForm::new().add_part(
        "image",
        Part::bytes(data).file_name(filename).mime_type(mime),
    )
}

/// Upload a PNG fixture and return its id plus thumbnail URL.
pub async fn upload_png(app: &TestApp, width: u32, height: u32) -> (Uuid, String) {
    let response = app
        .server
        .post("/v1/images")
        .multipart(upload_form(
            png_fixture(width, height, RED),
            "image/png",
            "fixture.png",
        ))
        .await;
    assert_eq!(response.status_code(), 201, "{}", response.text());
    let body: serde_json::Value = response.json();
    let id = body["imageId"].as_str().unwrap().parse().unwrap();
    let thumb = body["thumbnailUrl"].as_str().unwrap().to_string();
    (id, thumb)
}
