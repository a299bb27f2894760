//! Peer connection seams.
//!
//! `PeerTransport` is the narrow surface the session state machine needs
//! from a peer connection: inbound-track delivery, publishing the local
//! track, one signaling data channel, offer/answer commits, and close.
//! `webrtc.rs` provides the production implementation over webrtc-rs.

use std::sync::Arc;

use async_trait::async_trait;

use super::media::MediaTrack;
use super::SessionError;

/// Callback invoked for every inbound audio track the remote side opens.
pub type RemoteTrackHandler<T> = Box<dyn Fn(Arc<T>) + Send + Sync>;

/// Callback invoked for every text payload on the signaling channel.
pub type SignalHandler = Box<dyn Fn(String) + Send + Sync>;

/// Control handle for the outbound audio payload.
///
/// Swapping the track through this handle mutes/unmutes without
/// renegotiating the connection.
#[async_trait]
pub trait OutboundSender: Send + Sync {
    type Track: MediaTrack;

    /// Replace the outbound payload. `None` sends nothing (mute) while the
    /// capture track keeps running.
    async fn replace_track(&self, track: Option<Arc<Self::Track>>) -> Result<(), SessionError>;
}

/// One peer connection, exclusively owned by one session.
#[async_trait]
pub trait PeerTransport: Send + Sync + 'static {
    type Local: MediaTrack;
    type Remote: MediaTrack;
    type Sender: OutboundSender<Track = Self::Local>;

    /// Register the inbound-track handler. Must be installed before
    /// negotiation so no early track is missed.
    fn on_remote_track(&self, handler: RemoteTrackHandler<Self::Remote>);

    /// Attach the local track as a sendable stream, returning the sender
    /// handle used later for mute/unmute.
    async fn publish(&self, track: Arc<Self::Local>) -> Result<Arc<Self::Sender>, SessionError>;

    /// Open the signaling data channel and route its text payloads to
    /// `on_message`.
    async fn open_signal_channel(
        &self,
        label: &str,
        on_message: SignalHandler,
    ) -> Result<(), SessionError>;

    /// Generate the local session offer, commit it as the local
    /// description, and return its SDP.
    async fn create_offer(&self) -> Result<String, SessionError>;

    /// Commit the remote answer SDP as the remote description.
    async fn accept_answer(&self, sdp: &str) -> Result<(), SessionError>;

    /// Clear event handlers and close the connection. Idempotent; never
    /// fails.
    async fn close(&self);
}

/// Creates the peer connection for a session attempt.
#[async_trait]
pub trait PeerConnector: Send + Sync {
    type Peer: PeerTransport;

    async fn connect(&self) -> Result<Arc<Self::Peer>, SessionError>;
}
