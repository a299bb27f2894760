//! The realtime session state machine.
//!
//! One `RealtimeSession` instance drives one connection attempt:
//! `Idle → Acquiring → Negotiating → Connected → Closed`, with a terminal
//! `Failed` reachable from any non-Closed state. `start()` is single-flight
//! by construction — it can only ever run once per instance, and recovery
//! from `Failed` means constructing a fresh session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use super::chat::{ChatEntry, ChatLog, Identity, SignalEvent};
use super::media::{AudioSink, MediaTrack, MicrophoneSource};
use super::peer::{OutboundSender, PeerConnector, PeerTransport};
use super::signaling::{CredentialSource, SignalingExchange};
use super::SessionError;

type LocalTrack<C> = <<C as PeerConnector>::Peer as PeerTransport>::Local;
type RemoteTrack<C> = <<C as PeerConnector>::Peer as PeerTransport>::Remote;
type SenderOf<C> = <<C as PeerConnector>::Peer as PeerTransport>::Sender;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Idle,
    Acquiring,
    Negotiating,
    Connected,
    Closed,
    Failed,
}

impl ConnectionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionPhase::Idle => "idle",
            ConnectionPhase::Acquiring => "acquiring",
            ConnectionPhase::Negotiating => "negotiating",
            ConnectionPhase::Connected => "connected",
            ConnectionPhase::Closed => "closed",
            ConnectionPhase::Failed => "failed",
        }
    }
}

/// Display names and channel label for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub local_name: String,
    pub assistant_name: String,
    pub channel_label: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            local_name: "You".to_string(),
            assistant_name: "AI Assistant".to_string(),
            channel_label: "oai-events".to_string(),
        }
    }
}

/// State shared with the signaling-channel callback.
///
/// The callback only appends to the chat log and reads the mic flag, so the
/// session and the channel handler never contend on anything else.
struct SessionShared {
    mic_active: AtomicBool,
    chat: ChatLog,
    local_name: String,
    assistant_name: String,
}

impl SessionShared {
    fn handle_signal(&self, raw: &str) {
        match serde_json::from_str::<SignalEvent>(raw) {
            Ok(SignalEvent::Transcript { text }) => {
                // A muted user's stale transcript is not echoed back.
                if self.mic_active.load(Ordering::SeqCst) {
                    self.chat
                        .push(ChatEntry::new(Identity::LocalUser, &self.local_name, text));
                } else {
                    debug!("dropping transcript while microphone is muted");
                }
            }
            Ok(SignalEvent::Response { text }) => {
                self.chat
                    .push(ChatEntry::new(Identity::RemoteAi, &self.assistant_name, text));
            }
            Ok(SignalEvent::Unknown) => {
                debug!("ignoring signaling event with unrecognized kind");
            }
            Err(e) => {
                debug!(error = %e, "dropping malformed signaling message");
            }
        }
    }

    fn push_system(&self, text: &str) {
        self.chat
            .push(ChatEntry::new(Identity::System, "System", text));
    }
}

/// One realtime voice session. Owns the peer connection, the microphone
/// track, the outbound sender handle, and the inbound audio sink for its
/// whole lifetime.
pub struct RealtimeSession<C: PeerConnector> {
    connector: C,
    credentials: Arc<dyn CredentialSource>,
    signaling: Arc<dyn SignalingExchange>,
    microphone: Arc<dyn MicrophoneSource<Track = LocalTrack<C>>>,
    sink: Arc<dyn AudioSink<Track = RemoteTrack<C>>>,
    config: SessionConfig,

    shared: Arc<SessionShared>,
    phase: Mutex<ConnectionPhase>,
    started: AtomicBool,
    connected: AtomicBool,
    in_progress: AtomicBool,
    last_error: Mutex<Option<String>>,

    peer: Mutex<Option<Arc<C::Peer>>>,
    mic_track: Mutex<Option<Arc<LocalTrack<C>>>>,
    sender: Mutex<Option<Arc<SenderOf<C>>>>,

    // Serializes mute/unmute so interleaved replace-track calls can never
    // leave the sender in an inconsistent state.
    toggle_gate: tokio::sync::Mutex<()>,
}

impl<C: PeerConnector> RealtimeSession<C> {
    pub fn new(
        connector: C,
        credentials: Arc<dyn CredentialSource>,
        signaling: Arc<dyn SignalingExchange>,
        microphone: Arc<dyn MicrophoneSource<Track = LocalTrack<C>>>,
        sink: Arc<dyn AudioSink<Track = RemoteTrack<C>>>,
        config: SessionConfig,
    ) -> Self {
        let shared = Arc::new(SessionShared {
            mic_active: AtomicBool::new(true),
            chat: ChatLog::default(),
            local_name: config.local_name.clone(),
            assistant_name: config.assistant_name.clone(),
        });
        Self {
            connector,
            credentials,
            signaling,
            microphone,
            sink,
            config,
            shared,
            phase: Mutex::new(ConnectionPhase::Idle),
            started: AtomicBool::new(false),
            connected: AtomicBool::new(false),
            in_progress: AtomicBool::new(false),
            last_error: Mutex::new(None),
            peer: Mutex::new(None),
            mic_track: Mutex::new(None),
            sender: Mutex::new(None),
            toggle_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        *self.phase.lock().unwrap()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn is_in_progress(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    pub fn microphone_active(&self) -> bool {
        self.shared.mic_active.load(Ordering::SeqCst)
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap().clone()
    }

    pub fn chat_entries(&self) -> Vec<ChatEntry> {
        self.shared.chat.snapshot()
    }

    fn set_phase(&self, phase: ConnectionPhase) {
        *self.phase.lock().unwrap() = phase;
    }

    /// Establish the session. Runs the whole negotiation in strict sequence
    /// and either reaches `Connected` or lands in terminal `Failed`.
    pub async fn start(&self) -> Result<(), SessionError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(SessionError::NegotiationFailed(
                "session already started; construct a new instance".to_string(),
            ));
        }

        self.in_progress.store(true, Ordering::SeqCst);
        self.set_phase(ConnectionPhase::Acquiring);

        let result = self.establish().await;
        self.in_progress.store(false, Ordering::SeqCst);

        match result {
            Ok(()) => {
                self.connected.store(true, Ordering::SeqCst);
                self.set_phase(ConnectionPhase::Connected);
                info!("realtime session established");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "realtime session failed");
                *self.last_error.lock().unwrap() = Some(err.to_string());
                self.set_phase(ConnectionPhase::Failed);
                Err(err)
            }
        }
    }

    async fn establish(&self) -> Result<(), SessionError> {
        let credential = self.credentials.create_session().await?;
        debug!("session credential obtained");

        self.set_phase(ConnectionPhase::Negotiating);
        let peer = self.connector.connect().await?;
        *self.peer.lock().unwrap() = Some(peer.clone());

        // Inbound audio: bind the first track, ignore the rest.
        let sink = self.sink.clone();
        peer.on_remote_track(Box::new(move |track| {
            let id = track.id().to_string();
            if sink.attach(track) {
                info!(track = %id, "bound inbound audio track to playback sink");
            } else {
                info!(track = %id, "playback sink already bound; ignoring inbound track");
            }
        }));

        let mic = self.microphone.open().await?;
        *self.mic_track.lock().unwrap() = Some(mic.clone());

        let sender = peer.publish(mic).await?;
        *self.sender.lock().unwrap() = Some(sender);

        let shared = self.shared.clone();
        peer.open_signal_channel(
            &self.config.channel_label,
            Box::new(move |raw| shared.handle_signal(&raw)),
        )
        .await?;

        // Local description is committed before the offer leaves, and the
        // answer is committed before connectivity is declared.
        let offer_sdp = peer.create_offer().await?;
        let answer_sdp = self.signaling.exchange(&credential, &offer_sdp).await?;
        peer.accept_answer(&answer_sdp).await?;

        Ok(())
    }

    /// Mute (`false`) or unmute (`true`) the outbound audio.
    ///
    /// Muting swaps the sender's payload out while the capture track keeps
    /// running; unmuting restores the original track. Toggles serialize:
    /// one in flight completes before the next touches the sender.
    pub async fn set_microphone_active(&self, active: bool) -> Result<(), SessionError> {
        let _gate = self.toggle_gate.lock().await;

        let sender = self
            .sender
            .lock()
            .unwrap()
            .clone()
            .ok_or(SessionError::NoActiveTrack)?;
        let track = self
            .mic_track
            .lock()
            .unwrap()
            .clone()
            .ok_or(SessionError::NoActiveTrack)?;

        if active {
            if !track.is_live() {
                return Err(SessionError::TrackEnded);
            }
            sender.replace_track(Some(track)).await?;
        } else {
            sender.replace_track(None).await?;
        }

        self.shared.mic_active.store(active, Ordering::SeqCst);
        self.shared.push_system(if active {
            "Conversation resumed - microphone active"
        } else {
            "Conversation paused - microphone muted"
        });
        info!(active, "microphone toggled");
        Ok(())
    }

    /// Release every acquired resource. Safe to call from any state, any
    /// number of times, including before anything was acquired.
    pub async fn close(&self) {
        if let Some(track) = self.mic_track.lock().unwrap().take() {
            track.stop();
        }
        self.sender.lock().unwrap().take();
        self.sink.detach();

        let peer = self.peer.lock().unwrap().take();
        if let Some(peer) = peer {
            peer.close().await;
        }

        self.connected.store(false, Ordering::SeqCst);
        self.in_progress.store(false, Ordering::SeqCst);

        let mut phase = self.phase.lock().unwrap();
        // Failed stays terminal; everything else ends Closed.
        if *phase != ConnectionPhase::Failed {
            *phase = ConnectionPhase::Closed;
        }
        debug!("realtime session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::media::PlaybackSink;
    use crate::realtime::peer::{RemoteTrackHandler, SignalHandler};
    use crate::realtime::signaling::SessionCredential;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct FakeTrack {
        id: String,
        live: AtomicBool,
    }

    impl FakeTrack {
        fn new(id: &str) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                live: AtomicBool::new(true),
            })
        }
    }

    impl MediaTrack for FakeTrack {
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

    struct FakeMicrophone {
        track: Arc<FakeTrack>,
        deny: bool,
        opened: AtomicUsize,
    }

    impl FakeMicrophone {
        fn granting() -> Arc<Self> {
            Arc::new(Self {
                track: FakeTrack::new("mic-0"),
                deny: false,
                opened: AtomicUsize::new(0),
            })
        }

        fn denying() -> Arc<Self> {
            Arc::new(Self {
                track: FakeTrack::new("mic-0"),
                deny: true,
                opened: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl MicrophoneSource for FakeMicrophone {
        type Track = FakeTrack;

        async fn open(&self) -> Result<Arc<FakeTrack>, SessionError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            if self.deny {
                return Err(SessionError::MicrophoneUnavailable(
                    "permission denied".to_string(),
                ));
            }
            Ok(self.track.clone())
        }
    }

    #[derive(Default)]
    struct FakeSender {
        current: Mutex<Option<Arc<FakeTrack>>>,
        replace_calls: AtomicUsize,
    }

    #[async_trait]
    impl OutboundSender for FakeSender {
        type Track = FakeTrack;

        async fn replace_track(&self, track: Option<Arc<FakeTrack>>) -> Result<(), SessionError> {
            self.replace_calls.fetch_add(1, Ordering::SeqCst);
            *self.current.lock().unwrap() = track;
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakePeer {
        remote_handler: Mutex<Option<RemoteTrackHandler<FakeTrack>>>,
        signal_handler: Mutex<Option<SignalHandler>>,
        sender: Arc<FakeSender>,
        published: Mutex<Option<Arc<FakeTrack>>>,
        offer_created: AtomicBool,
        answer: Mutex<Option<String>>,
        closed: AtomicBool,
    }

    impl FakePeer {
        fn fire_remote_track(&self, track: Arc<FakeTrack>) {
            if let Some(handler) = self.remote_handler.lock().unwrap().as_ref() {
                handler(track);
            }
        }

        fn fire_signal(&self, raw: &str) {
            if let Some(handler) = self.signal_handler.lock().unwrap().as_ref() {
                handler(raw.to_string());
            }
        }
    }

    #[async_trait]
    impl PeerTransport for FakePeer {
        type Local = FakeTrack;
        type Remote = FakeTrack;
        type Sender = FakeSender;

        fn on_remote_track(&self, handler: RemoteTrackHandler<FakeTrack>) {
            *self.remote_handler.lock().unwrap() = Some(handler);
        }

        async fn publish(&self, track: Arc<FakeTrack>) -> Result<Arc<FakeSender>, SessionError> {
            *self.published.lock().unwrap() = Some(track.clone());
            *self.sender.current.lock().unwrap() = Some(track);
            Ok(self.sender.clone())
        }

        async fn open_signal_channel(
            &self,
            _label: &str,
            on_message: SignalHandler,
        ) -> Result<(), SessionError> {
            *self.signal_handler.lock().unwrap() = Some(on_message);
            Ok(())
        }

        async fn create_offer(&self) -> Result<String, SessionError> {
            self.offer_created.store(true, Ordering::SeqCst);
            Ok("v=0 fake-offer".to_string())
        }

        async fn accept_answer(&self, sdp: &str) -> Result<(), SessionError> {
            *self.answer.lock().unwrap() = Some(sdp.to_string());
            Ok(())
        }

        async fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
            *self.remote_handler.lock().unwrap() = None;
            *self.signal_handler.lock().unwrap() = None;
        }
    }

    struct FakeConnector {
        peer: Arc<FakePeer>,
    }

    #[async_trait]
    impl PeerConnector for FakeConnector {
        type Peer = FakePeer;

        async fn connect(&self) -> Result<Arc<FakePeer>, SessionError> {
            Ok(self.peer.clone())
        }
    }

    struct FakeCredentials {
        reject: Option<(u16, String)>,
        calls: AtomicUsize,
    }

    impl FakeCredentials {
        fn granting() -> Arc<Self> {
            Arc::new(Self {
                reject: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn rejecting(status: u16, message: &str) -> Arc<Self> {
            Arc::new(Self {
                reject: Some((status, message.to_string())),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CredentialSource for FakeCredentials {
        async fn create_session(&self) -> Result<SessionCredential, SessionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reject {
                Some((status, message)) => Err(SessionError::UpstreamRejected {
                    status: *status,
                    message: message.clone(),
                }),
                None => Ok(SessionCredential::new("tok_abc")),
            }
        }
    }

    struct FakeSignaling {
        seen_token: Mutex<Option<String>>,
    }

    impl FakeSignaling {
        fn answering() -> Arc<Self> {
            Arc::new(Self {
                seen_token: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl SignalingExchange for FakeSignaling {
        async fn exchange(
            &self,
            credential: &SessionCredential,
            _offer_sdp: &str,
        ) -> Result<String, SessionError> {
            *self.seen_token.lock().unwrap() = Some(credential.as_str().to_string());
            Ok("v=0 fake-answer".to_string())
        }
    }

    struct Harness {
        session: RealtimeSession<FakeConnector>,
        peer: Arc<FakePeer>,
        microphone: Arc<FakeMicrophone>,
        signaling: Arc<FakeSignaling>,
        sink: Arc<PlaybackSink<FakeTrack>>,
    }

    fn harness_with(
        credentials: Arc<FakeCredentials>,
        microphone: Arc<FakeMicrophone>,
    ) -> Harness {
        let peer = Arc::new(FakePeer::default());
        let signaling = FakeSignaling::answering();
        let sink = Arc::new(PlaybackSink::<FakeTrack>::new());
        let session = RealtimeSession::new(
            FakeConnector { peer: peer.clone() },
            credentials,
            signaling.clone(),
            microphone.clone(),
            sink.clone(),
            SessionConfig::default(),
        );
        Harness {
            session,
            peer,
            microphone,
            signaling,
            sink,
        }
    }

    fn harness() -> Harness {
        harness_with(FakeCredentials::granting(), FakeMicrophone::granting())
    }

    #[tokio::test]
    async fn establishes_end_to_end() {
        let h = harness();
        h.session.start().await.unwrap();

        assert_eq!(h.session.phase(), ConnectionPhase::Connected);
        assert!(h.session.is_connected());
        assert!(!h.session.is_in_progress());
        assert!(h.session.last_error().is_none());
        assert_eq!(
            h.signaling.seen_token.lock().unwrap().as_deref(),
            Some("tok_abc")
        );
        assert!(h.peer.offer_created.load(Ordering::SeqCst));
        assert_eq!(
            h.peer.answer.lock().unwrap().as_deref(),
            Some("v=0 fake-answer")
        );
    }

    #[tokio::test]
    async fn relay_rejection_fails_before_microphone_acquisition() {
        let h = harness_with(
            FakeCredentials::rejecting(
                500,
                "Server configuration error: OpenAI API key not found.",
            ),
            FakeMicrophone::granting(),
        );

        let err = h.session.start().await.unwrap_err();
        assert!(matches!(err, SessionError::UpstreamRejected { status: 500, .. }));
        assert_eq!(h.session.phase(), ConnectionPhase::Failed);
        assert!(!h.session.is_connected());
        assert_eq!(
            h.session.last_error().as_deref(),
            Some("Server configuration error: OpenAI API key not found.")
        );
        assert_eq!(h.microphone.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn microphone_denial_is_a_hard_stop() {
        let h = harness_with(FakeCredentials::granting(), FakeMicrophone::denying());

        let err = h.session.start().await.unwrap_err();
        assert!(matches!(err, SessionError::MicrophoneUnavailable(_)));
        assert_eq!(h.session.phase(), ConnectionPhase::Failed);
        assert!(!h.peer.offer_created.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn start_is_single_flight_per_instance() {
        let h = harness();
        h.session.start().await.unwrap();
        assert!(h.session.start().await.is_err());
        // The second call must not have re-run the pipeline.
        assert_eq!(h.microphone.opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn second_inbound_track_is_ignored() {
        let h = harness();
        h.session.start().await.unwrap();

        h.peer.fire_remote_track(FakeTrack::new("remote-1"));
        h.peer.fire_remote_track(FakeTrack::new("remote-2"));

        assert_eq!(h.sink.bound_track().unwrap().id(), "remote-1");
    }

    #[tokio::test]
    async fn mute_keeps_capture_running_and_unmute_restores_identity() {
        let h = harness();
        h.session.start().await.unwrap();
        let original = h.microphone.track.clone();

        h.session.set_microphone_active(false).await.unwrap();
        assert!(h.peer.sender.current.lock().unwrap().is_none());
        assert!(original.is_live());
        assert!(!h.session.microphone_active());

        h.session.set_microphone_active(true).await.unwrap();
        let restored = h.peer.sender.current.lock().unwrap().clone().unwrap();
        assert!(Arc::ptr_eq(&restored, &original));
        assert!(h.session.microphone_active());
    }

    #[tokio::test]
    async fn unmute_after_track_end_is_rejected() {
        let h = harness();
        h.session.start().await.unwrap();

        h.session.set_microphone_active(false).await.unwrap();
        let replaces_before = h.peer.sender.replace_calls.load(Ordering::SeqCst);
        h.microphone.track.stop();

        let err = h.session.set_microphone_active(true).await.unwrap_err();
        assert!(matches!(err, SessionError::TrackEnded));
        assert!(!h.session.microphone_active());
        // The sender was never touched by the rejected unmute.
        assert_eq!(
            h.peer.sender.replace_calls.load(Ordering::SeqCst),
            replaces_before
        );
    }

    #[tokio::test]
    async fn toggle_without_session_is_rejected() {
        let h = harness();
        let err = h.session.set_microphone_active(false).await.unwrap_err();
        assert!(matches!(err, SessionError::NoActiveTrack));
        assert!(h.session.microphone_active());
        assert!(h.session.chat_entries().is_empty());
    }

    #[tokio::test]
    async fn toggles_append_system_entries() {
        let h = harness();
        h.session.start().await.unwrap();

        h.session.set_microphone_active(false).await.unwrap();
        h.session.set_microphone_active(true).await.unwrap();

        let entries = h.session.chat_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].identity, Identity::System);
        assert!(entries[0].text.contains("paused"));
        assert!(entries[1].text.contains("resumed"));
    }

    #[tokio::test]
    async fn transcripts_are_gated_by_the_mic_flag_responses_are_not() {
        let h = harness();
        h.session.start().await.unwrap();

        h.session.set_microphone_active(false).await.unwrap();
        let baseline = h.session.chat_entries().len();

        h.peer.fire_signal(r#"{"kind":"transcript","text":"stale words"}"#);
        assert_eq!(h.session.chat_entries().len(), baseline);

        h.peer.fire_signal(r#"{"kind":"response","text":"still listening"}"#);
        let entries = h.session.chat_entries();
        assert_eq!(entries.len(), baseline + 1);
        assert_eq!(entries.last().unwrap().identity, Identity::RemoteAi);

        h.session.set_microphone_active(true).await.unwrap();
        h.peer.fire_signal(r#"{"kind":"transcript","text":"fresh words"}"#);
        let entries = h.session.chat_entries();
        assert_eq!(entries.last().unwrap().identity, Identity::LocalUser);
        assert_eq!(entries.last().unwrap().text, "fresh words");
    }

    #[tokio::test]
    async fn malformed_and_unknown_signals_are_dropped() {
        let h = harness();
        h.session.start().await.unwrap();
        let baseline = h.session.chat_entries().len();

        h.peer.fire_signal("not json at all");
        h.peer.fire_signal(r#"{"kind":"rate_limit","detail":"slow down"}"#);
        h.peer.fire_signal(r#"{"no_kind":true}"#);

        assert_eq!(h.session.chat_entries().len(), baseline);
        assert_eq!(h.session.phase(), ConnectionPhase::Connected);
    }

    #[tokio::test]
    async fn close_releases_resources_and_is_idempotent() {
        let h = harness();
        h.session.start().await.unwrap();
        h.peer.fire_remote_track(FakeTrack::new("remote-1"));
        let mic = h.microphone.track.clone();

        h.session.close().await;
        assert_eq!(h.session.phase(), ConnectionPhase::Closed);
        assert!(!h.session.is_connected());
        assert!(!mic.is_live());
        assert!(h.sink.bound_track().is_none());
        assert!(h.peer.closed.load(Ordering::SeqCst));

        // Closing again is a no-op.
        h.session.close().await;
        assert_eq!(h.session.phase(), ConnectionPhase::Closed);
    }

    #[tokio::test]
    async fn close_before_start_never_panics() {
        let h = harness();
        h.session.close().await;
        h.session.close().await;
        assert_eq!(h.session.phase(), ConnectionPhase::Closed);
    }

    #[tokio::test]
    async fn toggle_after_close_is_rejected() {
        let h = harness();
        h.session.start().await.unwrap();
        h.session.close().await;

        let err = h.session.set_microphone_active(false).await.unwrap_err();
        assert!(matches!(err, SessionError::NoActiveTrack));
    }
}
