use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::attachments::UploadedFile;
use crate::auth::CallerIdentity;
use crate::dispatch::{DispatchOutcome, DispatchRequest};
use crate::error::AppError;
use crate::state::SharedState;

#[derive(Debug, Default, Deserialize)]
pub struct SendRequest {
    pub account_id: Option<Uuid>,
    #[serde(default)]
    pub to: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default)]
    pub bcc: Vec<String>,
    #[serde(default)]
    pub subject: String,
    pub html_body: Option<String>,
    pub text_body: Option<String>,
}

/// Compose-and-send. JSON body for plain messages; multipart when the caller
/// attaches files. Attachments are staged before the relay is contacted, and
/// the staged references come back in the response either way, so a failed
/// send never loses the uploads.
pub async fn send(
    auth: CallerIdentity,
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/json");

    let (request, files) = if content_type.contains("multipart/form-data") {
        parse_multipart(&headers, body).await?
    } else {
        let request: SendRequest = serde_json::from_slice(&body)
            .map_err(|e| AppError::Validation(format!("invalid request body: {e}")))?;
        (request, Vec::new())
    };

    let config = state
        .resolver
        .resolve(auth.user_id, request.account_id)
        .await?;

    let attachments = state.stager.stage(files).await?;

    let outcome = state
        .engine
        .send(DispatchRequest {
            config,
            sender_name: auth.display_name,
            to: request.to,
            cc: request.cc,
            bcc: request.bcc,
            subject: request.subject,
            html_body: request.html_body,
            text_body: request.text_body,
            attachments: attachments.clone(),
        })
        .await?;

    let response = match outcome {
        DispatchOutcome::Delivered {
            message_id,
            response,
        } => json!({
            "success": true,
            "message_id": message_id,
            "response": response,
            "attachments": attachments,
        }),
        DispatchOutcome::Rejected { kind, message } => json!({
            "success": false,
            "error_kind": kind,
            "message": message,
            "attachments": attachments,
        }),
    };

    Ok(Json(response))
}

async fn parse_multipart(
    headers: &HeaderMap,
    body: Bytes,
) -> Result<(SendRequest, Vec<UploadedFile>), AppError> {
    let boundary = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| multer::parse_boundary(ct).ok())
        .ok_or_else(|| AppError::Validation("Missing multipart boundary".to_string()))?;

    let stream = futures_util::stream::once(async { Ok::<_, std::io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut request = SendRequest::default();
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "attachments" {
            let file_name = field.file_name().unwrap_or("attachment").to_string();
            let content_type = field
                .content_type()
                .map(|m| m.to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string());
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Attachment read error: {e}")))?;
            files.push(UploadedFile {
                file_name,
                content_type,
                bytes,
            });
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::Validation(format!("Field read error: {e}")))?;

        match name.as_str() {
            "account_id" => {
                request.account_id = Some(value.parse().map_err(|_| {
                    AppError::Validation("invalid account_id".to_string())
                })?);
            }
            "to" => request.to = parse_recipient_list(&value),
            "cc" => request.cc = parse_recipient_list(&value),
            "bcc" => request.bcc = parse_recipient_list(&value),
            "subject" => request.subject = value,
            "html_body" => request.html_body = Some(value),
            "text_body" => request.text_body = Some(value),
            _ => {}
        }
    }

    Ok((request, files))
}

/// Recipients arrive either as a JSON array or as an RFC-5322 style
/// comma-separated list.
fn parse_recipient_list(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.starts_with('[') {
        if let Ok(list) = serde_json::from_str::<Vec<String>>(trimmed) {
            return list;
        }
    }
    trimmed
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
