use super::types::{
    ApiError, AttachmentForm, HealthResponse, ModelsResponse, ReplyResponse, TextRequest,
};
use crate::{
    Error, Result,
    catalog::{Category, ModelCatalog},
    llm::InferenceGateway,
    staging::UploadStore,
};
use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection, rejection::JsonRejection},
    http::StatusCode,
};
use std::sync::Arc;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

const PROMPT_FIELD: &str = "prompt";

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn InferenceGateway>,
    pub uploads: Arc<UploadStore>,
    pub catalog: Arc<ModelCatalog>,
}

pub async fn generate_text(
    State(state): State<AppState>,
    payload: std::result::Result<Json<TextRequest>, JsonRejection>,
) -> std::result::Result<Json<ReplyResponse>, ApiError> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(
            rejection @ (JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_)),
        ) => {
            debug!("Malformed text payload: {}", rejection.body_text());
            return Err(ApiError::invalid_text(format!(
                "Invalid JSON payload: {}",
                rejection.body_text()
            )));
        }
        Err(rejection) => {
            debug!("Rejected text payload: {}", rejection.body_text());
            return Err(ApiError::invalid_text("No payload was sent!"));
        }
    };

    let prompt = request
        .prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::invalid_text("prompt must not be empty!"))?;

    info!("Received text request ({} characters)", prompt.chars().count());

    match state.gateway.submit_text(&prompt).await {
        Ok(reply) => Ok(Json(ReplyResponse { reply: reply.text })),
        Err(e) => {
            error!("Text generation failed: {}", e);
            Err(e.into())
        }
    }
}

pub async fn generate_from_image(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Json<ReplyResponse>, ApiError> {
    generate_from_file(Category::Image, state, multipart).await
}

pub async fn generate_from_audio(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Json<ReplyResponse>, ApiError> {
    generate_from_file(Category::Audio, state, multipart).await
}

pub async fn generate_from_document(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Json<ReplyResponse>, ApiError> {
    generate_from_file(Category::Document, state, multipart).await
}

async fn generate_from_file(
    category: Category,
    state: AppState,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Json<ReplyResponse>, ApiError> {
    let span = info_span!("generate", %category, request_id = %Uuid::new_v4());
    stage_and_submit(category, state, multipart)
        .instrument(span)
        .await
}

/// Stages the upload, submits it, and releases it on every path out.
async fn stage_and_submit(
    category: Category,
    state: AppState,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<Json<ReplyResponse>, ApiError> {
    let multipart = multipart.map_err(|rejection| {
        warn!("Rejected multipart payload: {}", rejection.body_text());
        ApiError::bad_request(rejection.body_text())
    })?;

    let form = read_attachment_form(category, &state.uploads, multipart)
        .await
        .map_err(|e| {
            warn!("Failed to read upload: {}", e);
            ApiError::from(e)
        })?;

    let Some(file) = form.file else {
        let message = format!("{} file is required", category.field_name());
        return Err(Error::validation(message).into());
    };

    let prompt = form
        .prompt
        .filter(|p| !p.trim().is_empty())
        .or_else(|| category.default_prompt().map(str::to_string))
        .unwrap_or_default();

    info!(
        "Submitting {} ({}, {} bytes)",
        file.file_name(),
        file.mime_type(),
        file.size()
    );

    let result = state
        .gateway
        .submit_with_attachment(category, &prompt, &file)
        .await;
    file.release();

    match result {
        Ok(reply) => Ok(Json(ReplyResponse { reply: reply.text })),
        Err(e) => {
            error!("Generation from {} failed: {}", category, e);
            Err(ApiError::Internal(e.to_string()))
        }
    }
}

/// Reads the optional prompt and the single file field named after the
/// category. Unrelated fields are skipped.
async fn read_attachment_form(
    category: Category,
    uploads: &UploadStore,
    mut multipart: Multipart,
) -> Result<AttachmentForm> {
    let mut form = AttachmentForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::upload(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == PROMPT_FIELD {
            let text = field
                .text()
                .await
                .map_err(|e| Error::upload(e.to_string()))?;
            form.prompt = Some(text);
        } else if name == category.field_name() {
            if form.file.is_some() {
                return Err(Error::upload(format!(
                    "only one {} file may be uploaded",
                    category.field_name()
                )));
            }
            let file_name = field.file_name().map(str::to_string);
            let mime_type = field.content_type().map(str::to_string);
            let staged = uploads
                .stage(file_name.as_deref(), mime_type.as_deref(), field)
                .await?;
            form.file = Some(staged);
        } else {
            debug!("Ignoring multipart field {:?}", name);
        }
    }

    Ok(form)
}

pub async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    let models = state
        .catalog
        .models()
        .into_iter()
        .map(str::to_string)
        .collect();
    let categories = Category::ALL
        .iter()
        .map(|c| (c.to_string(), state.catalog.model_for(*c).to_string()))
        .collect();

    Json(ModelsResponse { models, categories })
}

/// The server keeps no transcript, so there is nothing to delete.
pub async fn clear_chat() -> StatusCode {
    debug!("Chat clear requested");
    StatusCode::NO_CONTENT
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
