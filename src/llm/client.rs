use super::types::*;
use crate::{
    Error, Result,
    catalog::{Category, ModelCatalog},
    config::GeminiConfig,
    staging::StagedFile,
};
use async_trait::async_trait;
use reqwest::{
    Body, RequestBuilder, Response,
    header::{CONTENT_LENGTH, CONTENT_TYPE},
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info};

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// Remote text-generation capability. Every call is an independent round
/// trip; nothing is cached or retried.
#[async_trait]
pub trait InferenceGateway: Send + Sync {
    async fn submit_text(&self, prompt: &str) -> Result<InferenceReply>;

    async fn submit_with_attachment(
        &self,
        category: Category,
        prompt: &str,
        file: &StagedFile,
    ) -> Result<InferenceReply>;
}

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    upload_base_url: String,
    catalog: Arc<ModelCatalog>,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig, catalog: Arc<ModelCatalog>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            upload_base_url: config.upload_base_url.trim_end_matches('/').to_string(),
            catalog,
        })
    }

    /// Registers a staged file with the Files API using the resumable
    /// protocol: one request opens the session, a second sends the bytes and
    /// finalizes it. The bytes are streamed from disk.
    pub async fn upload_file(&self, file: &StagedFile) -> Result<ContentReference> {
        let metadata = UploadMetadata {
            file: UploadFileMetadata {
                display_name: file.file_name().to_string(),
            },
        };

        let start = self
            .authorized(self.http.post(format!("{}/files", self.upload_base_url)))
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", file.size().to_string())
            .header("X-Goog-Upload-Header-Content-Type", file.mime_type())
            .json(&metadata);
        let response = send(start).await?;

        let upload_url = response
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| Error::inference("Gemini did not return an upload URL"))?;

        debug!(
            "Uploading {} bytes of {} to Gemini",
            file.size(),
            file.mime_type()
        );

        let body = Body::from(file.open().await?);

        let finalize = self
            .authorized(self.http.post(upload_url))
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header(CONTENT_TYPE, file.mime_type())
            .header(CONTENT_LENGTH, file.size())
            .body(body);
        let uploaded: UploadFileResponse = send(finalize).await?.json().await.map_err(transport)?;

        if uploaded.file.state.as_deref() == Some("FAILED") {
            return Err(Error::inference(format!(
                "Gemini failed to process uploaded file {}",
                file.file_name()
            )));
        }

        info!(
            "Uploaded {} to Gemini as {}",
            file.file_name(),
            uploaded.file.name.as_deref().unwrap_or(&uploaded.file.uri)
        );

        Ok(ContentReference {
            uri: uploaded.file.uri,
            mime_type: uploaded
                .file
                .mime_type
                .unwrap_or_else(|| file.mime_type().to_string()),
        })
    }

    pub async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<InferenceReply> {
        debug!(
            "Calling {} with {} content part(s)",
            model,
            request.contents.iter().map(|c| c.parts.len()).sum::<usize>()
        );

        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        let builder = self.authorized(self.http.post(url)).json(request);
        let response: GenerateContentResponse = send(builder).await?.json().await.map_err(transport)?;

        match response.text() {
            Some(text) => {
                debug!("Received {} characters from {}", text.chars().count(), model);
                Ok(InferenceReply::new(text))
            }
            None => {
                let reason = response
                    .prompt_feedback
                    .and_then(|f| f.block_reason)
                    .unwrap_or_else(|| "no candidates returned".to_string());
                Err(Error::inference(format!(
                    "Gemini returned no reply: {}",
                    reason
                )))
            }
        }
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header(API_KEY_HEADER, &self.api_key)
    }
}

#[async_trait]
impl InferenceGateway for GeminiClient {
    async fn submit_text(&self, prompt: &str) -> Result<InferenceReply> {
        let model = self.catalog.model_for(Category::Text);
        self.generate(model, &GenerateContentRequest::text(prompt))
            .await
    }

    async fn submit_with_attachment(
        &self,
        category: Category,
        prompt: &str,
        file: &StagedFile,
    ) -> Result<InferenceReply> {
        let reference = self.upload_file(file).await?;
        let model = self.catalog.model_for(category);
        self.generate(
            model,
            &GenerateContentRequest::with_attachment(prompt, &reference),
        )
        .await
    }
}

/// Sends the request and turns any non-2xx answer into an inference error
/// carrying the provider's message.
async fn send(builder: RequestBuilder) -> Result<Response> {
    let response = builder.send().await.map_err(transport)?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| format!("Gemini API error {}: {}", status, body.trim()));
    Err(Error::inference(message))
}

fn transport(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::inference("Request to Gemini timed out")
    } else {
        Error::inference(e.to_string())
    }
}
