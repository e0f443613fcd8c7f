//! Binding between playlist entries and the media elements that render them.
//!
//! Handles are stored in an arena keyed by `EntryId`, so removing an entry
//! never shifts another entry's handle and a stale notification cannot be
//! routed to the wrong element.

use std::collections::HashMap;

use log::{debug, warn};
use tokio::sync::oneshot;

use crate::playlist::EntryId;

/// Settlement of a single play request.
pub type PlayRequest = oneshot::Receiver<Result<(), MediaError>>;

/// Reasons a media element refuses to start playback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    /// Blocked by the host, e.g. an autoplay policy.
    #[error("playback not allowed: {0}")]
    NotAllowed(String),
    /// Interrupted by a later load or pause.
    #[error("playback aborted: {0}")]
    Aborted(String),
    #[error("source not supported: {0}")]
    NotSupported(String),
    /// The element went away before settling the request.
    #[error("play request dropped before settling")]
    Dropped,
}

/// Imperative control surface of one rendered media element.
///
/// Load, error and end notifications are not part of the trait; the element
/// sends them to the controller's media event channel as `MediaEvent`s tagged
/// with its entry id.
pub trait MediaHandle {
    /// Requests playback start. The returned receiver settles once the element
    /// has either started or refused.
    fn play(&mut self) -> PlayRequest;
    fn pause(&mut self);
    /// Moves the playback position, in seconds.
    fn seek(&mut self, seconds: f64);
    /// Current playback position, in seconds.
    fn current_time(&self) -> f64;
    /// Points the element at a new source url.
    fn set_source(&mut self, url: &str);
}

/// Arena of attached handles.
pub struct MediaBindings<H> {
    handles: HashMap<EntryId, H>,
}

impl<H> Default for MediaBindings<H> {
    fn default() -> Self {
        Self {
            handles: HashMap::new(),
        }
    }
}

impl<H: MediaHandle> MediaBindings<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handle` to `entry`, returning any handle it replaces.
    pub fn attach(&mut self, entry: EntryId, handle: H) -> Option<H> {
        debug!("MediaBindings: attaching handle for entry {}", entry);
        self.handles.insert(entry, handle)
    }

    /// Releases the handle bound to `entry`.
    pub fn detach(&mut self, entry: EntryId) -> Option<H> {
        let handle = self.handles.remove(&entry);
        if handle.is_some() {
            debug!("MediaBindings: released handle for entry {}", entry);
        }
        handle
    }

    pub fn contains(&self, entry: EntryId) -> bool {
        self.handles.contains_key(&entry)
    }

    pub fn get(&self, entry: EntryId) -> Option<&H> {
        self.handles.get(&entry)
    }

    pub fn get_mut(&mut self, entry: EntryId) -> Option<&mut H> {
        self.handles.get_mut(&entry)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Seeks the bound handle, if any. Returns whether a handle was present.
    pub fn seek(&mut self, entry: EntryId, seconds: f64) -> bool {
        match self.handles.get_mut(&entry) {
            Some(handle) => {
                handle.seek(seconds);
                true
            }
            None => false,
        }
    }

    pub fn current_time(&self, entry: EntryId) -> Option<f64> {
        self.handles.get(&entry).map(|handle| handle.current_time())
    }

    /// Seeks every target to its start time and requests playback. Targets
    /// without a handle are skipped. The returned requests settle on their own;
    /// the arena is free for further commands while they are pending.
    pub fn start_from(&mut self, targets: &[(EntryId, f64)]) -> Vec<(EntryId, PlayRequest)> {
        let mut pending = Vec::with_capacity(targets.len());
        for (entry, start_time) in targets {
            let Some(handle) = self.handles.get_mut(entry) else {
                debug!("MediaBindings: no handle for loaded entry {}, skipping", entry);
                continue;
            };
            handle.seek(*start_time);
            pending.push((*entry, handle.play()));
        }
        pending
    }

    /// Pauses every attached handle.
    pub fn pause_all(&mut self) {
        for handle in self.handles.values_mut() {
            handle.pause();
        }
    }

    /// Seeks every target to its start time and pauses it.
    pub fn reset_to(&mut self, targets: &[(EntryId, f64)]) {
        for (entry, start_time) in targets {
            if let Some(handle) = self.handles.get_mut(entry) {
                handle.seek(*start_time);
                handle.pause();
            }
        }
    }
}

/// Waits for every play request to settle and returns the rejections.
/// A request whose element went away counts as `MediaError::Dropped`.
pub async fn settle(pending: Vec<(EntryId, PlayRequest)>) -> Vec<(EntryId, MediaError)> {
    let mut rejections = Vec::new();
    for (entry, request) in pending {
        let outcome = match request.await {
            Ok(outcome) => outcome,
            Err(_) => Err(MediaError::Dropped),
        };
        if let Err(err) = outcome {
            warn!("MediaBindings: play request for entry {} rejected: {}", entry, err);
            rejections.push((entry, err));
        }
    }
    rejections
}
