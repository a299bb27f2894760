//! Production peer transport over webrtc-rs.
//!
//! `WebrtcConnector` builds one `RTCPeerConnection` per session attempt with
//! the default codec and interceptor set. The local capture track is an
//! Opus `TrackLocalStaticSample` fed by the audio capture pipeline; inbound
//! tracks are drained continuously so the depacketizer and interceptors keep
//! running even before a playback consumer is wired up.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, info, warn};
use uuid::Uuid;

use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MediaEngine, MIME_TYPE_OPUS};
use webrtc::api::APIBuilder;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::RTCDataChannel;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::media::Sample;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::rtp_transceiver::rtp_sender::RTCRtpSender;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

use super::media::{MediaTrack, MicrophoneSource};
use super::peer::{OutboundSender, PeerConnector, PeerTransport, RemoteTrackHandler, SignalHandler};
use super::SessionError;

/// Local Opus capture track.
///
/// Wraps a sample-writing local track; whatever captures microphone audio
/// pushes encoded Opus frames through `write_sample`.
pub struct LocalMicrophone {
    id: String,
    track: Arc<TrackLocalStaticSample>,
    live: AtomicBool,
}

impl LocalMicrophone {
    fn new() -> Self {
        let id = format!("mic-{}", Uuid::new_v4());
        let track = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                clock_rate: 48000,
                channels: 2,
                ..Default::default()
            },
            id.clone(),
            "microphone".to_owned(),
        ));
        Self {
            id,
            track,
            live: AtomicBool::new(true),
        }
    }

    /// Push one encoded Opus frame onto the track.
    pub async fn write_frame(&self, data: Bytes, duration: Duration) -> Result<(), SessionError> {
        if !self.is_live() {
            return Err(SessionError::TrackEnded);
        }
        self.track
            .write_sample(&Sample {
                data,
                duration,
                ..Default::default()
            })
            .await?;
        Ok(())
    }
}

impl MediaTrack for LocalMicrophone {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }
}

/// `MicrophoneSource` minting one fresh capture track per call.
#[derive(Default)]
pub struct WebrtcMicrophone;

#[async_trait]
impl MicrophoneSource for WebrtcMicrophone {
    type Track = LocalMicrophone;

    async fn open(&self) -> Result<Arc<LocalMicrophone>, SessionError> {
        let track = Arc::new(LocalMicrophone::new());
        info!(track = %track.id(), "opened local capture track");
        Ok(track)
    }
}

/// Inbound audio track delivered by the remote peer.
pub struct RemoteAudioTrack {
    id: String,
    inner: Arc<TrackRemote>,
    live: AtomicBool,
}

impl RemoteAudioTrack {
    pub fn inner(&self) -> &Arc<TrackRemote> {
        &self.inner
    }
}

impl MediaTrack for RemoteAudioTrack {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.live.store(false, Ordering::SeqCst);
    }
}

/// Mute/unmute handle over the negotiated RTP sender.
pub struct WebrtcSender {
    inner: Arc<RTCRtpSender>,
}

#[async_trait]
impl OutboundSender for WebrtcSender {
    type Track = LocalMicrophone;

    async fn replace_track(&self, track: Option<Arc<LocalMicrophone>>) -> Result<(), SessionError> {
        let payload: Option<Arc<dyn TrackLocal + Send + Sync>> =
            track.map(|t| t.track.clone() as Arc<dyn TrackLocal + Send + Sync>);
        self.inner.replace_track(payload).await?;
        Ok(())
    }
}

type RemoteHandlerSlot = Arc<Mutex<Option<RemoteTrackHandler<RemoteAudioTrack>>>>;

/// `PeerTransport` over one `RTCPeerConnection`.
pub struct WebrtcPeer {
    pc: Arc<RTCPeerConnection>,
    remote_handler: RemoteHandlerSlot,
    signal_channel: Mutex<Option<Arc<RTCDataChannel>>>,
    closed: AtomicBool,
}

impl WebrtcPeer {
    fn new(pc: Arc<RTCPeerConnection>) -> Arc<Self> {
        let peer = Arc::new(Self {
            pc,
            remote_handler: Arc::new(Mutex::new(None)),
            signal_channel: Mutex::new(None),
            closed: AtomicBool::new(false),
        });

        // Registered before negotiation so the first inbound track is never
        // missed.
        let handler_slot = peer.remote_handler.clone();
        peer.pc.on_track(Box::new(move |track, _receiver, _transceiver| {
            let handler_slot = handler_slot.clone();
            Box::pin(async move {
                if track.kind() != RTPCodecType::Audio {
                    debug!(kind = ?track.kind(), "ignoring non-audio inbound track");
                    return;
                }
                let remote = Arc::new(RemoteAudioTrack {
                    id: track.id(),
                    inner: track.clone(),
                    live: AtomicBool::new(true),
                });
                info!(
                    track = %remote.id,
                    codec = %track.codec().capability.mime_type,
                    "inbound audio track arrived"
                );

                let drained = remote.clone();
                tokio::spawn(async move {
                    while drained.is_live() {
                        if let Err(e) = drained.inner.read_rtp().await {
                            debug!(track = %drained.id, error = %e, "inbound track ended");
                            break;
                        }
                    }
                    drained.stop();
                });

                let handler = handler_slot.lock().unwrap();
                match handler.as_ref() {
                    Some(handler) => handler(remote),
                    None => warn!(track = %remote.id, "inbound track arrived before a handler was set"),
                }
            })
        }));

        peer
    }
}

#[async_trait]
impl PeerTransport for WebrtcPeer {
    type Local = LocalMicrophone;
    type Remote = RemoteAudioTrack;
    type Sender = WebrtcSender;

    fn on_remote_track(&self, handler: RemoteTrackHandler<RemoteAudioTrack>) {
        *self.remote_handler.lock().unwrap() = Some(handler);
    }

    async fn publish(&self, track: Arc<LocalMicrophone>) -> Result<Arc<WebrtcSender>, SessionError> {
        let sender = self
            .pc
            .add_track(track.track.clone() as Arc<dyn TrackLocal + Send + Sync>)
            .await?;

        // Drain RTCP so the interceptors keep processing reports.
        let rtcp_sender = sender.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 1500];
            while let Ok((_, _)) = rtcp_sender.read(&mut buf).await {}
        });

        Ok(Arc::new(WebrtcSender { inner: sender }))
    }

    async fn open_signal_channel(
        &self,
        label: &str,
        on_message: SignalHandler,
    ) -> Result<(), SessionError> {
        let dc = self.pc.create_data_channel(label, None).await?;

        let handler = Arc::new(on_message);
        dc.on_message(Box::new(move |msg: DataChannelMessage| {
            let handler = handler.clone();
            Box::pin(async move {
                match String::from_utf8(msg.data.to_vec()) {
                    Ok(text) => handler(text),
                    Err(_) => debug!("dropping non-utf8 signaling payload"),
                }
            })
        }));

        let label = label.to_string();
        dc.on_open(Box::new(move || {
            info!(channel = %label, "signaling channel open");
            Box::pin(async {})
        }));

        *self.signal_channel.lock().unwrap() = Some(dc);
        Ok(())
    }

    async fn create_offer(&self) -> Result<String, SessionError> {
        let offer = self.pc.create_offer(None).await?;

        // Wait for ICE gathering so the offer carries its candidates; the
        // upstream exchange is a single POST with no trickle path.
        let mut gather_complete = self.pc.gathering_complete_promise().await;
        self.pc.set_local_description(offer).await?;
        let _ = gather_complete.recv().await;

        match self.pc.local_description().await {
            Some(local) => Ok(local.sdp),
            None => Err(SessionError::NegotiationFailed(
                "local description missing after ICE gathering".to_string(),
            )),
        }
    }

    async fn accept_answer(&self, sdp: &str) -> Result<(), SessionError> {
        let answer = RTCSessionDescription::answer(sdp.to_string())?;
        self.pc.set_remote_description(answer).await?;
        Ok(())
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.remote_handler.lock().unwrap().take();
        self.signal_channel.lock().unwrap().take();
        if let Err(e) = self.pc.close().await {
            debug!(error = %e, "error while closing peer connection");
        }
    }
}

/// Builds peer connections with the stock codec and interceptor set.
pub struct WebrtcConnector {
    ice_servers: Vec<String>,
}

impl WebrtcConnector {
    pub fn new(ice_servers: Vec<String>) -> Self {
        Self { ice_servers }
    }
}

impl Default for WebrtcConnector {
    fn default() -> Self {
        Self::new(vec!["stun:stun.l.google.com:19302".to_string()])
    }
}

#[async_trait]
impl PeerConnector for WebrtcConnector {
    type Peer = WebrtcPeer;

    async fn connect(&self) -> Result<Arc<WebrtcPeer>, SessionError> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;

        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let ice_servers = self
            .ice_servers
            .iter()
            .map(|url| RTCIceServer {
                urls: vec![url.clone()],
                ..Default::default()
            })
            .collect();

        let pc = Arc::new(
            api.new_peer_connection(RTCConfiguration {
                ice_servers,
                ..Default::default()
            })
            .await?,
        );

        Ok(WebrtcPeer::new(pc))
    }
}
