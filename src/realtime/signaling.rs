//! Credential acquisition and the offer/answer exchange.
//!
//! Two HTTP round-trips establish a session: one `POST` to the relay to
//! mint a short-lived credential, then one `POST` of the raw offer SDP to
//! the upstream realtime endpoint authenticated with that credential.
//! Neither call is retried; a failure is terminal for the attempt.

use std::fmt;

use async_trait::async_trait;

use super::SessionError;

/// Short-lived bearer token authorizing one signaling exchange.
///
/// Issued by the upstream provider, consumed exactly once, never persisted.
#[derive(Clone)]
pub struct SessionCredential(String);

impl SessionCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Bearer tokens stay out of logs.
impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionCredential(..)")
    }
}

/// Mints one `SessionCredential` per session attempt.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn create_session(&self) -> Result<SessionCredential, SessionError>;
}

/// Performs the offer/answer SDP exchange with the upstream endpoint.
#[async_trait]
pub trait SignalingExchange: Send + Sync {
    /// Send the local offer SDP, authenticated with the credential, and
    /// return the raw answer SDP.
    async fn exchange(
        &self,
        credential: &SessionCredential,
        offer_sdp: &str,
    ) -> Result<String, SessionError>;
}

/// `CredentialSource` backed by the credential relay's `POST /session`.
pub struct HttpCredentialSource {
    client: reqwest::Client,
    session_url: String,
}

impl HttpCredentialSource {
    pub fn new(client: reqwest::Client, session_url: impl Into<String>) -> Self {
        Self {
            client,
            session_url: session_url.into(),
        }
    }
}

#[async_trait]
impl CredentialSource for HttpCredentialSource {
    async fn create_session(&self) -> Result<SessionCredential, SessionError> {
        let response = self
            .client
            .post(&self.session_url)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| SessionError::NetworkFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|e| SessionError::NetworkFailure(e.to_string()))?;
            // The relay reports failures as {error, details}; fall back to
            // the raw body when it sends anything else.
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("details").and_then(|d| d.as_str()).map(String::from))
                .unwrap_or_else(|| format!("HTTP error! status: {}", status.as_u16()));
            return Err(SessionError::UpstreamRejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SessionError::NetworkFailure(e.to_string()))?;

        match body
            .get("client_secret")
            .and_then(|s| s.get("value"))
            .and_then(|v| v.as_str())
        {
            Some(token) => Ok(SessionCredential::new(token)),
            None => Err(SessionError::NegotiationFailed(
                "no client secret value in session response".to_string(),
            )),
        }
    }
}

/// `SignalingExchange` posting raw SDP to the model-qualified upstream URL.
pub struct HttpSignalingExchange {
    client: reqwest::Client,
    realtime_url: String,
    model: String,
}

impl HttpSignalingExchange {
    pub fn new(
        client: reqwest::Client,
        realtime_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            realtime_url: realtime_url.into(),
            model: model.into(),
        }
    }
}

#[async_trait]
impl SignalingExchange for HttpSignalingExchange {
    async fn exchange(
        &self,
        credential: &SessionCredential,
        offer_sdp: &str,
    ) -> Result<String, SessionError> {
        let url = format!("{}?model={}", self.realtime_url, self.model);
        let response = self
            .client
            .post(&url)
            .bearer_auth(credential.as_str())
            .header("Content-Type", "application/sdp")
            .header("OpenAI-Beta", "realtime=v1")
            .body(offer_sdp.to_string())
            .send()
            .await
            .map_err(|e| SessionError::NetworkFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "SDP exchange rejected");
            return Err(SessionError::NegotiationFailed(format!(
                "WebRTC connection error: {}",
                status.as_u16()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| SessionError::NetworkFailure(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_debug_does_not_leak_the_token() {
        let credential = SessionCredential::new("tok_secret");
        assert!(!format!("{:?}", credential).contains("tok_secret"));
        assert_eq!(credential.as_str(), "tok_secret");
    }
}
