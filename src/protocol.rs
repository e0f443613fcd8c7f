//! Messages exchanged between the media bindings, the sync controller and
//! whatever renders the session.
//!
//! Media handles send load/error/end notifications keyed by the entry they
//! were bound to over the controller's own unbounded channel, so a burst of
//! session traffic can never push one out. The controller publishes session
//! state changes on the bus.

use crate::playlist::{EntryId, VideoEntry};

/// Top-level envelope for all bus traffic.
#[derive(Debug, Clone)]
pub enum Message {
    Session(SessionNotification),
}

/// Asynchronous notification coming from a bound media element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEventKind {
    /// Enough data arrived for the element to be controllable.
    Loaded,
    /// The source could not be fetched or decoded.
    Failed,
    /// Playback reached the natural end of the media.
    Ended,
}

/// Media notification addressed to a stable entry id, never to a list index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaEvent {
    pub entry: EntryId,
    pub kind: MediaEventKind,
}

/// Aggregate transport state reflecting the last command issued to all entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    #[default]
    Stopped,
    Playing,
}

/// Session-level notifications published by the controller.
#[derive(Debug, Clone)]
pub enum SessionNotification {
    ModeChanged(PlaybackMode),
    PlaylistChanged(Vec<VideoEntry>),
    /// Query string written to the address bar by a save.
    ShareLinkSaved(String),
}

impl MediaEvent {
    pub fn new(entry: EntryId, kind: MediaEventKind) -> Self {
        Self { entry, kind }
    }
}
