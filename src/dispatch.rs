use std::error::Error as _;
use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Body, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::StagedAttachment;
use crate::resolver::ResolvedSmtp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchErrorKind {
    AuthenticationRejected,
    ConnectionFailed,
    RecipientRejected,
    Timeout,
}

/// What a send attempt produced. Relay-side failures are data, not errors:
/// a bad credential or an unreachable host must never abort the surrounding
/// request pipeline.
#[derive(Debug)]
pub enum DispatchOutcome {
    Delivered { message_id: String, response: String },
    Rejected { kind: DispatchErrorKind, message: String },
}

#[derive(Debug)]
pub struct VerifyResult {
    pub success: bool,
    pub message: String,
}

/// Everything one send attempt needs. The resolved config carries the
/// decrypted secret; the request is dropped as soon as the attempt finishes.
pub struct DispatchRequest {
    pub config: ResolvedSmtp,
    /// Owner's display name; used for the From header when the account has
    /// no from_name of its own.
    pub sender_name: Option<String>,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub html_body: Option<String>,
    pub text_body: Option<String>,
    pub attachments: Vec<StagedAttachment>,
}

pub struct DispatchEngine {
    deadline: Duration,
}

impl DispatchEngine {
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    /// Attempt delivery. `Err` only for caller problems (malformed addresses,
    /// missing body) and local staging faults; anything the relay does wrong
    /// comes back as `DispatchOutcome::Rejected`.
    pub async fn send(&self, request: DispatchRequest) -> Result<DispatchOutcome, AppError> {
        let message_id = format!("{}@{}", Uuid::now_v7(), request.config.host);

        let mut parts = Vec::with_capacity(request.attachments.len());
        for attachment in &request.attachments {
            parts.push(load_attachment(attachment).await?);
        }

        let message = assemble_message(&request, &message_id, parts)?;
        let transport = build_transport(&request.config).map_err(AppError::Internal)?;

        let outcome = match tokio::time::timeout(self.deadline, transport.send(message)).await {
            Ok(Ok(response)) => {
                tracing::info!(%message_id, host = %request.config.host, "message dispatched");
                DispatchOutcome::Delivered {
                    message_id,
                    response: response.code().to_string(),
                }
            }
            Ok(Err(err)) => {
                let (kind, message) = classify_smtp_error(&err);
                tracing::warn!(host = %request.config.host, ?kind, "dispatch failed: {message}");
                DispatchOutcome::Rejected { kind, message }
            }
            Err(_) => DispatchOutcome::Rejected {
                kind: DispatchErrorKind::Timeout,
                message: format!(
                    "relay {} did not respond within {:?}",
                    request.config.host, self.deadline
                ),
            },
        };

        Ok(outcome)
    }

    /// Open a session and authenticate without sending anything. Same
    /// non-throwing contract as `send`.
    pub async fn verify(&self, config: &ResolvedSmtp) -> VerifyResult {
        let transport = match build_transport(config) {
            Ok(t) => t,
            Err(message) => return VerifyResult { success: false, message },
        };

        match tokio::time::timeout(self.deadline, transport.test_connection()).await {
            Ok(Ok(true)) => VerifyResult {
                success: true,
                message: "connection and authentication succeeded".to_string(),
            },
            Ok(Ok(false)) => VerifyResult {
                success: false,
                message: "relay refused the connection check".to_string(),
            },
            Ok(Err(err)) => {
                let (_, message) = classify_smtp_error(&err);
                VerifyResult {
                    success: false,
                    message,
                }
            }
            Err(_) => VerifyResult {
                success: false,
                message: format!("relay {} did not respond within {:?}", config.host, self.deadline),
            },
        }
    }
}

fn build_transport(
    config: &ResolvedSmtp,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, String> {
    let creds = Credentials::new(config.username.clone(), config.password.clone());

    let transport = if config.secure {
        AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| format!("SMTP relay error: {e}"))?
            .port(config.port)
            .credentials(creds)
            .build()
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| format!("SMTP starttls error: {e}"))?
            .port(config.port)
            .credentials(creds)
            .build()
    };

    Ok(transport)
}

async fn load_attachment(attachment: &StagedAttachment) -> Result<SinglePart, AppError> {
    let bytes = tokio::fs::read(&attachment.path)
        .await
        .map_err(|e| AppError::Internal(format!("cannot read staged attachment: {e}")))?;

    let content_type = ContentType::parse(&attachment.content_type)
        .or_else(|_| ContentType::parse("application/octet-stream"))
        .map_err(|e| AppError::Internal(format!("invalid content type: {e}")))?;

    Ok(Attachment::new(attachment.file_name.clone()).body(Body::new(bytes), content_type))
}

fn assemble_message(
    request: &DispatchRequest,
    message_id: &str,
    attachment_parts: Vec<SinglePart>,
) -> Result<Message, AppError> {
    if request.to.is_empty() {
        return Err(AppError::Validation(
            "at least one recipient is required".to_string(),
        ));
    }
    if request.html_body.is_none() && request.text_body.is_none() {
        return Err(AppError::Validation(
            "a text or HTML body is required".to_string(),
        ));
    }

    let from_address: Address = request.config.username.parse().map_err(|_| {
        AppError::Validation(format!(
            "account username '{}' is not a valid sender address",
            request.config.username
        ))
    })?;
    let from_name = request
        .config
        .from_name
        .clone()
        .or_else(|| request.sender_name.clone());

    let mut builder = Message::builder()
        .from(Mailbox::new(from_name, from_address))
        .subject(request.subject.clone())
        .message_id(Some(message_id.to_string()));

    for recipient in &request.to {
        builder = builder.to(parse_recipient(recipient)?);
    }
    for recipient in &request.cc {
        builder = builder.cc(parse_recipient(recipient)?);
    }
    for recipient in &request.bcc {
        builder = builder.bcc(parse_recipient(recipient)?);
    }

    let body = match (&request.text_body, &request.html_body) {
        (Some(text), Some(html)) => {
            BodyPart::Multi(MultiPart::alternative_plain_html(text.clone(), html.clone()))
        }
        (Some(text), None) => BodyPart::Single(SinglePart::plain(text.clone())),
        (None, Some(html)) => BodyPart::Single(SinglePart::html(html.clone())),
        (None, None) => unreachable!("checked above"),
    };

    let message = if attachment_parts.is_empty() {
        match body {
            BodyPart::Multi(mp) => builder.multipart(mp),
            BodyPart::Single(sp) => builder.singlepart(sp),
        }
    } else {
        let mut mixed = match body {
            BodyPart::Multi(mp) => MultiPart::mixed().multipart(mp),
            BodyPart::Single(sp) => MultiPart::mixed().singlepart(sp),
        };
        for part in attachment_parts {
            mixed = mixed.singlepart(part);
        }
        builder.multipart(mixed)
    };

    message.map_err(|e| AppError::Validation(format!("cannot build message: {e}")))
}

enum BodyPart {
    Multi(MultiPart),
    Single(SinglePart),
}

fn parse_recipient(raw: &str) -> Result<Mailbox, AppError> {
    raw.trim()
        .parse::<Mailbox>()
        .map_err(|_| AppError::Validation(format!("invalid recipient address '{raw}'")))
}

/// Map a transport failure onto the caller-facing taxonomy. Response codes
/// drive the split between credential and recipient problems; everything
/// below the SMTP layer is a connectivity failure.
fn classify_smtp_error(
    err: &lettre::transport::smtp::Error,
) -> (DispatchErrorKind, String) {
    let mut message = err.to_string();
    if let Some(source) = err.source() {
        message = format!("{message}: {source}");
    }

    if err.is_timeout() {
        return (DispatchErrorKind::Timeout, message);
    }

    if let Some(code) = err.status() {
        let code: u16 = code.to_string().parse().unwrap_or(0);
        let kind = match code {
            530 | 534 | 535 | 538 => DispatchErrorKind::AuthenticationRejected,
            550 | 551 | 552 | 553 | 554 => DispatchErrorKind::RecipientRejected,
            _ => DispatchErrorKind::ConnectionFailed,
        };
        return (kind, message);
    }

    (DispatchErrorKind::ConnectionFailed, message)
}
