//! Raw-body uploads.
//!
//! Videos and avatars are sniffed before they are stored; a payload whose
//! bytes don't match the expected kind is rejected with `InvalidUpload` no
//! matter what name or content type the client sent.

use actix_web::{web, HttpResponse};
use std::sync::Arc;
use tracing::info;

use crate::error::{AppError, Result};
use crate::media::{sniff_image, sniff_video, MAX_AVATAR_BYTES, MAX_VIDEO_BYTES};
use crate::models::ApiResponse;
use crate::services::session::AuthenticatedRequest;
use crate::storage::{self, content_type_for, BlobStore, LocalBlobStore};

pub const UPLOAD_KEY_HEADER: &str = "X-Upload-Key";

#[derive(Clone)]
pub struct UploadState {
    pub blobs: Arc<dyn BlobStore>,
    pub base_url: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/videos/{filename}")
            .app_data(web::PayloadConfig::new(MAX_VIDEO_BYTES))
            .route(web::put().to(upload_video)),
    )
    .service(
        web::resource("/avatars/{filename}")
            .app_data(web::PayloadConfig::new(MAX_AVATAR_BYTES))
            .route(web::put().to(upload_avatar)),
    )
    .service(
        web::resource("/thumbs/{filename}")
            .app_data(web::PayloadConfig::new(MAX_AVATAR_BYTES))
            .route(web::put().to(upload_thumb)),
    );
}

fn uploaded(url: String) -> HttpResponse {
    HttpResponse::Ok()
        .insert_header((UPLOAD_KEY_HEADER, url))
        .json(ApiResponse::success())
}

pub async fn upload_video(
    auth: AuthenticatedRequest,
    path: web::Path<String>,
    body: web::Bytes,
    state: web::Data<UploadState>,
) -> Result<HttpResponse> {
    let content_type = sniff_video(&body)
        .ok_or_else(|| AppError::InvalidUpload("Uploaded file is not a valid video".to_string()))?;

    let name = format!("{}_{}", auth.viewer, path.into_inner());
    let url = storage::save(state.blobs.as_ref(), "videos", &name, body.to_vec(), content_type).await?;
    info!(user_id = auth.viewer, size = body.len(), "video uploaded");
    Ok(uploaded(url))
}

pub async fn upload_avatar(
    auth: AuthenticatedRequest,
    path: web::Path<String>,
    body: web::Bytes,
    state: web::Data<UploadState>,
) -> Result<HttpResponse> {
    let content_type = sniff_image(&body)
        .ok_or_else(|| AppError::InvalidUpload("Uploaded file is not a valid image".to_string()))?;

    let name = format!("{}_{}", auth.viewer, path.into_inner());
    let url = storage::save(state.blobs.as_ref(), "avatars", &name, body.to_vec(), content_type).await?;
    info!(user_id = auth.viewer, size = body.len(), "avatar uploaded");
    Ok(uploaded(url))
}

/// Thumbnails are rendered server-side when a post is published, so the
/// body is discarded.
pub async fn upload_thumb(
    _auth: AuthenticatedRequest,
    _path: web::Path<String>,
    _body: web::Bytes,
    state: web::Data<UploadState>,
) -> Result<HttpResponse> {
    Ok(uploaded(format!("{}/autoGenThumb", state.base_url)))
}

/// `GET /uploads/{key}`: files written by the local driver.
pub async fn serve_upload(
    path: web::Path<String>,
    store: web::Data<LocalBlobStore>,
) -> Result<HttpResponse> {
    let key = path.into_inner();
    let bytes = store.read(&key).await?;
    Ok(HttpResponse::Ok()
        .content_type(content_type_for(&key))
        .body(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Session;
    use crate::storage::StorageError;
    use actix_web::{test, App};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingStore {
        keys: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl BlobStore for RecordingStore {
        async fn put(&self, key: &str, _bytes: Vec<u8>, content_type: &str) -> std::result::Result<String, StorageError> {
            self.keys
                .lock()
                .unwrap()
                .push((key.to_string(), content_type.to_string()));
            Ok(self.public_url(key))
        }

        fn public_url(&self, key: &str) -> String {
            format!("https://cdn.test/{}", key)
        }
    }

    fn viewer() -> AuthenticatedRequest {
        AuthenticatedRequest {
            viewer: 9,
            session: Session {
                token: "t".into(),
                user_id: 9,
                client_id: String::new(),
                created_at: Utc::now(),
            },
        }
    }

    fn state(store: Arc<RecordingStore>) -> web::Data<UploadState> {
        web::Data::new(UploadState {
            blobs: store,
            base_url: "https://api.test".to_string(),
        })
    }

    #[actix_web::test]
    async fn test_video_is_sniffed_and_keyed_by_user() {
        let store = Arc::new(RecordingStore::default());
        let mp4 = web::Bytes::from_static(&[0, 0, 0, 0x18, b'f', b't', b'y', b'p', b'i', b's', b'o', b'm']);

        let response = upload_video(viewer(), web::Path::from("clip.mp4".to_string()), mp4, state(store.clone()))
            .await
            .unwrap();

        let header = response.headers().get(UPLOAD_KEY_HEADER).unwrap().to_str().unwrap();
        let keys = store.keys.lock().unwrap();
        let (key, content_type) = &keys[0];
        assert!(key.starts_with("videos/"));
        assert!(key.ends_with("_9_clip.mp4"));
        assert_eq!(content_type, "video/mp4");
        assert_eq!(header, format!("https://cdn.test/{}", key));
    }

    #[actix_web::test]
    async fn test_non_video_is_rejected() {
        let store = Arc::new(RecordingStore::default());
        let err = upload_video(
            viewer(),
            web::Path::from("clip.mp4".to_string()),
            web::Bytes::from_static(b"definitely text"),
            state(store.clone()),
        )
        .await
        .unwrap_err();

        assert_eq!(err.code(), 104);
        assert_eq!(err.public_message(), "Uploaded file is not a valid video");
        assert!(store.keys.lock().unwrap().is_empty());
    }

    #[actix_web::test]
    async fn test_thumb_points_at_generated_thumbnail() {
        let response = upload_thumb(
            viewer(),
            web::Path::from("t.png".to_string()),
            web::Bytes::new(),
            state(Arc::new(RecordingStore::default())),
        )
        .await
        .unwrap();
        assert_eq!(
            response.headers().get(UPLOAD_KEY_HEADER).unwrap(),
            "https://api.test/autoGenThumb"
        );
    }

    #[actix_web::test]
    async fn test_local_files_are_served_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "https://api.test");
        store.put("avatars/1_a.png", b"png-bytes".to_vec(), "image/png").await.unwrap();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(store))
                .route("/uploads/{key:.*}", web::get().to(serve_upload)),
        )
        .await;

        let req = test::TestRequest::get().uri("/uploads/avatars/1_a.png").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        assert_eq!(resp.headers().get("content-type").unwrap(), "image/png");
        assert_eq!(test::read_body(resp).await, "png-bytes");

        let req = test::TestRequest::get().uri("/uploads/avatars/missing.png").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
    }
}
