//! # Credential Relay
//!
//! `POST /session` exchanges the server-held API key for a short-lived
//! client credential by calling the upstream sessions endpoint. The relay
//! is stateless: nothing about the caller is retained between requests,
//! and the upstream response body is passed through to the client
//! byte-for-byte so the credential format never needs to be understood
//! here.
//!
//! Every failure path answers 500 with the fixed body
//! `{"error": "Error generating session", "details": "..."}`.

use crate::{error::AppError, state::AppState};
use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{error, info};

pub async fn create_session(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let config = state.get_config();

    let api_key = config.upstream.api_key.as_deref().ok_or_else(|| {
        error!("session requested but no upstream API key is configured");
        AppError::SessionGeneration(
            "Server configuration error: OpenAI API key not found.".to_string(),
        )
    })?;

    info!(model = %config.upstream.model, "minting upstream session credential");

    let response = state
        .http
        .post(&config.upstream.sessions_url)
        .bearer_auth(api_key)
        .header("OpenAI-Beta", "realtime=v1")
        .json(&json!({
            "model": config.upstream.model,
            "voice": config.upstream.voice,
        }))
        .send()
        .await
        .map_err(|e| {
            error!(error = %e, "upstream session request did not complete");
            AppError::SessionGeneration(e.to_string())
        })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| {
        error!(error = %e, "failed to read upstream session response");
        AppError::SessionGeneration(e.to_string())
    })?;

    if !status.is_success() {
        // Prefer the upstream's own error message; fall back to the raw
        // body when it is not the expected JSON shape.
        let details = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(|m| m.as_str())
                    .map(String::from)
            })
            .unwrap_or(body);
        error!(status = status.as_u16(), details = %details, "upstream rejected session request");
        return Err(AppError::SessionGeneration(details));
    }

    info!("session credential minted");

    // Verbatim pass-through: the client parses the upstream shape itself.
    Ok(HttpResponse::Ok()
        .content_type("application/json")
        .body(body))
}
