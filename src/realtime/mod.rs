//! # Realtime Voice Session Management
//!
//! This module owns the entire lifecycle of one peer-to-peer realtime voice
//! session against the upstream speech model: credential acquisition,
//! microphone capture, WebRTC offer/answer negotiation, the signaling data
//! channel, mute/unmute control, and deterministic teardown.
//!
//! ## Session Lifecycle:
//! 1. **Idle**: Session constructed, nothing acquired
//! 2. **Acquiring**: Fetching a short-lived credential from the relay
//! 3. **Negotiating**: Peer connection, microphone, offer/answer exchange
//! 4. **Connected**: Media flowing, signaling channel live
//! 5. **Closed**: All resources released
//! 6. **Failed**: Terminal; a new attempt needs a new session instance
//!
//! ## Seams:
//! Every collaborator sits behind a trait (`CredentialSource`,
//! `SignalingExchange`, `MicrophoneSource`, `AudioSink`, `PeerTransport`) so
//! the state machine is testable without network or hardware. Production
//! implementations live in `webrtc.rs` (webrtc-rs) and `signaling.rs`
//! (reqwest).

pub mod chat;
pub mod media;
pub mod peer;
pub mod session;
pub mod signaling;
pub mod webrtc;

pub use chat::{ChatEntry, Identity, SignalEvent};
pub use media::{AudioSink, MediaTrack, MicrophoneSource, PlaybackSink};
pub use peer::{OutboundSender, PeerConnector, PeerTransport};
pub use session::{ConnectionPhase, RealtimeSession, SessionConfig};
pub use signaling::{
    CredentialSource, HttpCredentialSource, HttpSignalingExchange, SessionCredential,
    SignalingExchange,
};

use thiserror::Error;

/// Error taxonomy for session establishment and control.
///
/// Every establishment failure is terminal for the session instance; there
/// is no retry anywhere in this module. Malformed inbound signaling messages
/// are not part of this taxonomy because they are logged and dropped, never
/// surfaced.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Required server-side configuration (the upstream API key) is absent.
    #[error("{0}")]
    ConfigurationMissing(String),

    /// The upstream (or the relay on its behalf) answered with a non-success
    /// status. The message is the human-readable text extracted from the
    /// response body, surfaced verbatim.
    #[error("{message}")]
    UpstreamRejected { status: u16, message: String },

    /// The request never produced a response.
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// Microphone access was denied or produced no audio track. Hard stop:
    /// the session cannot proceed without outbound audio.
    #[error("microphone unavailable: {0}")]
    MicrophoneUnavailable(String),

    /// Any failure between peer creation and remote-description commit.
    #[error("negotiation failed: {0}")]
    NegotiationFailed(String),

    /// Mute/unmute was requested without a recorded sender and local track.
    #[error("no active track or sender for this session")]
    NoActiveTrack,

    /// Unmute was requested after the capture track ended. The caller must
    /// start a whole new session; there is no in-place recovery.
    #[error("microphone track ended; the session must be restarted")]
    TrackEnded,
}

impl From<::webrtc::Error> for SessionError {
    fn from(e: ::webrtc::Error) -> Self {
        SessionError::NegotiationFailed(e.to_string())
    }
}
