use axum::{
    Router,
    body::{Body, to_bytes},
    http::Request,
    response::Response,
};
use gemini_relay::{
    catalog::ModelCatalog,
    config::{GeminiConfig, ServerConfig},
    llm::InferenceGateway,
    server::{AppState, create_router},
    staging::UploadStore,
};
use serde_json::Value;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tempfile::TempDir;

pub const BOUNDARY: &str = "relay-test-boundary";

/// A router wired to `gateway`, staging into a fresh temporary directory.
pub struct TestApp {
    pub router: Router,
    pub upload_dir: TempDir,
    pub public_dir: TempDir,
}

impl TestApp {
    pub fn new(gateway: Arc<dyn InferenceGateway>) -> Self {
        Self::with_server_config(gateway, ServerConfig::default())
    }

    /// Like [`TestApp::new`], keeping every field of `server` except the
    /// staging and public directories.
    pub fn with_server_config(gateway: Arc<dyn InferenceGateway>, server: ServerConfig) -> Self {
        let upload_dir = TempDir::new().expect("Failed to create upload dir");
        let public_dir = TempDir::new().expect("Failed to create public dir");

        let server = ServerConfig {
            upload_dir: upload_dir.path().to_string_lossy().to_string(),
            public_dir: public_dir.path().to_string_lossy().to_string(),
            ..server
        };

        let state = AppState {
            gateway,
            uploads: Arc::new(UploadStore::new(upload_dir.path()).unwrap()),
            catalog: Arc::new(ModelCatalog::default()),
        };

        Self {
            router: create_router(state, &server),
            upload_dir,
            public_dir,
        }
    }

    /// Files currently present in the staging directory.
    pub fn staged_files(&self) -> Vec<PathBuf> {
        staged_files(self.upload_dir.path())
    }
}

pub fn staged_files(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect()
}

pub fn test_gemini_config(server_uri: &str) -> GeminiConfig {
    GeminiConfig {
        api_key: "test-api-key".to_string(),
        base_url: format!("{}/v1beta", server_uri),
        upload_base_url: format!("{}/upload/v1beta", server_uri),
        timeout_secs: 5,
        ..Default::default()
    }
}

pub enum FormPart<'a> {
    Text {
        name: &'a str,
        value: &'a str,
    },
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

pub fn text_part<'a>(name: &'a str, value: &'a str) -> FormPart<'a> {
    FormPart::Text { name, value }
}

pub fn file_part<'a>(
    name: &'a str,
    file_name: &'a str,
    content_type: &'a str,
    data: &'a [u8],
) -> FormPart<'a> {
    FormPart::File {
        name,
        file_name,
        content_type,
        data,
    }
}

/// Builds a `multipart/form-data` POST request.
pub fn multipart_request(uri: &str, parts: &[FormPart<'_>]) -> Request<Body> {
    let mut body = Vec::new();

    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            FormPart::Text { name, value } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                        name, value
                    )
                    .as_bytes(),
                );
            }
            FormPart::File {
                name,
                file_name,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                // An empty content type leaves the header out entirely
                if !content_type.is_empty() {
                    body.extend_from_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
                }
                body.extend_from_slice(b"\r\n");
                body.extend_from_slice(data);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).expect("response body is not JSON")
}
