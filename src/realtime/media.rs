//! Media seams: capture tracks, the microphone source, and the inbound
//! audio sink.
//!
//! The session owns at most one microphone track and binds at most one
//! inbound track to its playback sink (first-track-wins). Both sides of the
//! media path sit behind traits so the session state machine can run against
//! test doubles.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::SessionError;

/// An audio track with an observable lifetime.
pub trait MediaTrack: Send + Sync + 'static {
    fn id(&self) -> &str;

    /// Whether the track is still producing (or accepting) media. A stopped
    /// or ended track never becomes live again.
    fn is_live(&self) -> bool;

    /// Stop the track permanently. Idempotent.
    fn stop(&self);
}

/// Produces the local capture track for a session.
#[async_trait]
pub trait MicrophoneSource: Send + Sync {
    type Track: MediaTrack;

    /// Open the microphone and hand over exactly one audio track.
    ///
    /// Denied access or an empty capture is `MicrophoneUnavailable`; the
    /// session cannot proceed without outbound audio.
    async fn open(&self) -> Result<Arc<Self::Track>, SessionError>;
}

/// Destination for inbound (remote) audio.
pub trait AudioSink: Send + Sync {
    type Track: MediaTrack;

    /// Bind a track to the sink. Returns `false` without side effects if a
    /// track is already bound (first-track-wins).
    fn attach(&self, track: Arc<Self::Track>) -> bool;

    /// Release the bound track, if any. Idempotent.
    fn detach(&self);

    fn bound_track(&self) -> Option<Arc<Self::Track>>;
}

/// Default sink: holds the first bound track and ignores the rest.
pub struct PlaybackSink<T: MediaTrack> {
    bound: Mutex<Option<Arc<T>>>,
}

impl<T: MediaTrack> Default for PlaybackSink<T> {
    fn default() -> Self {
        Self {
            bound: Mutex::new(None),
        }
    }
}

impl<T: MediaTrack> PlaybackSink<T> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T: MediaTrack> AudioSink for PlaybackSink<T> {
    type Track = T;

    fn attach(&self, track: Arc<T>) -> bool {
        let mut bound = self.bound.lock().unwrap();
        if bound.is_some() {
            return false;
        }
        *bound = Some(track);
        true
    }

    fn detach(&self) {
        self.bound.lock().unwrap().take();
    }

    fn bound_track(&self) -> Option<Arc<T>> {
        self.bound.lock().unwrap().clone()
    }
}
