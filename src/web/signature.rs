//! Ed25519 request signature check for the interactions endpoint

use axum::{
    body::Body,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use serenity::interactions_endpoint::Verifier;
use std::sync::Arc;
use tracing::warn;

use crate::error::BotError;

pub const SIGNATURE_HEADER: &str = "X-Signature-Ed25519";
pub const TIMESTAMP_HEADER: &str = "X-Signature-Timestamp";

/// Interaction payloads are small; anything larger is refused
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared signature verifier type
pub type SharedVerifier = Arc<Verifier>;

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Reject requests whose body was not signed with the application key
pub async fn require_signature(
    State(verifier): State<SharedVerifier>,
    request: Request,
    next: Next,
) -> Result<Response, BotError> {
    let (parts, body) = request.into_parts();

    let (Some(signature), Some(timestamp)) = (
        header(&parts.headers, SIGNATURE_HEADER),
        header(&parts.headers, TIMESTAMP_HEADER),
    ) else {
        warn!("Interaction request without signature headers");
        return Err(BotError::InvalidSignature);
    };

    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| {
            warn!("Failed to read interaction body: {}", e);
            BotError::InvalidSignature
        })?;

    if verifier.verify(signature, timestamp, &bytes).is_err() {
        warn!("Interaction request with invalid signature");
        return Err(BotError::InvalidSignature);
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(request).await)
}
