//! Top-level controller for synchronized playback.
//!
//! Owns the playlist, the handle arena and the aggregate playback mode. Media
//! notifications arrive on a dedicated unbounded channel and are applied by
//! `drain_media_events`; state changes are published on the bus as
//! `SessionNotification`s.

use log::{debug, info, trace, warn};
use tokio::sync::broadcast::Sender;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

use crate::{
    config::{Config, EndBehavior},
    media_binding::{self, MediaBindings, MediaError, MediaHandle, PlayRequest},
    playlist::{EntryId, Playlist, StartTimeEdit},
    protocol::{MediaEvent, MediaEventKind, Message, PlaybackMode, SessionNotification},
    share_link::{self, AddressBar, ShareLinkError},
    start_time_input::{format_seconds, round_seconds},
};

pub struct SyncController<H: MediaHandle> {
    playlist: Playlist,
    bindings: MediaBindings<H>,
    mode: PlaybackMode,
    /// Set by `start_play_all`, cleared by any later transport command.
    play_pending: bool,
    config: Config,
    media_sender: UnboundedSender<MediaEvent>,
    media_events: UnboundedReceiver<MediaEvent>,
    bus_producer: Sender<Message>,
}

impl<H: MediaHandle> SyncController<H> {
    pub fn new(playlist: Playlist, config: Config, bus_producer: Sender<Message>) -> Self {
        let (media_sender, media_events) = mpsc::unbounded_channel();
        Self {
            playlist,
            bindings: MediaBindings::new(),
            mode: PlaybackMode::Stopped,
            play_pending: false,
            config,
            media_sender,
            media_events,
            bus_producer,
        }
    }

    /// Restores the initial playlist from the page query string.
    pub fn from_query(query: &str, config: Config, bus_producer: Sender<Message>) -> Self {
        let decoded = share_link::decode_query(query, &config.share);
        info!(
            "SyncController: initial playlist from {:?} ({} entries)",
            decoded.source,
            decoded.entries.len()
        );
        let playlist = Playlist::from_saved(decoded.entries);
        Self::new(playlist, config, bus_producer)
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn bindings(&self) -> &MediaBindings<H> {
        &self.bindings
    }

    /// Sender that media handles use to report load, error and end events.
    pub fn media_event_sender(&self) -> UnboundedSender<MediaEvent> {
        self.media_sender.clone()
    }

    pub fn add_video(&mut self) -> EntryId {
        let id = self.playlist.add_entry();
        debug!("SyncController: added entry {}", id);
        self.broadcast_playlist_changed();
        id
    }

    /// Removes the entry at `index` and releases its handle.
    pub fn remove_video(&mut self, index: usize) {
        let Some(removed) = self.playlist.remove_entry(index) else {
            return;
        };
        self.bindings.detach(removed.id);
        debug!("SyncController: removed entry {} at index {}", removed.id, index);
        self.broadcast_playlist_changed();
    }

    pub fn update_url(&mut self, index: usize, url: &str) {
        let Some(id) = self.playlist.entry(index).map(|entry| entry.id) else {
            debug!("SyncController: update_url index {} out of bounds", index);
            return;
        };
        self.playlist.update_url(index, url);
        if let Some(handle) = self.bindings.get_mut(id) {
            handle.set_source(url);
        }
        self.broadcast_playlist_changed();
    }

    /// Stores typed start-time text; a parseable value also seeks the bound
    /// preview to it right away.
    pub fn update_start_time_text(&mut self, index: usize, text: &str) -> StartTimeEdit {
        let edit = self.playlist.update_start_time_text(index, text);
        match edit {
            StartTimeEdit::Applied(seconds) => {
                if let Some(entry) = self.playlist.entry(index) {
                    self.bindings.seek(entry.id, seconds);
                }
                self.broadcast_playlist_changed();
            }
            StartTimeEdit::Partial => self.broadcast_playlist_changed(),
            StartTimeEdit::Rejected => {
                trace!("SyncController: rejected start time text {:?}", text)
            }
        }
        edit
    }

    /// Binds a rendered media element to the entry currently at `index`.
    /// The handle stays latent until its load or error notification arrives.
    pub fn attach_handle(&mut self, index: usize, mut handle: H) -> Option<EntryId> {
        let entry = self.playlist.entry(index)?;
        let id = entry.id;
        handle.set_source(&entry.url);
        self.bindings.attach(id, handle);
        Some(id)
    }

    pub fn detach_handle(&mut self, index: usize) -> Option<H> {
        let id = self.playlist.entry(index)?.id;
        self.bindings.detach(id)
    }

    /// Applies one media notification. Notifications for entries that no
    /// longer exist are dropped.
    pub fn handle_media_event(&mut self, event: MediaEvent) {
        if self.playlist.index_of(event.entry).is_none() {
            debug!(
                "SyncController: ignoring {:?} for removed entry {}",
                event.kind, event.entry
            );
            return;
        }
        match event.kind {
            MediaEventKind::Loaded => {
                self.playlist.mark_loaded_by_id(event.entry, true);
                self.broadcast_playlist_changed();
            }
            MediaEventKind::Failed => {
                warn!("SyncController: entry {} failed to load", event.entry);
                self.playlist.mark_loaded_by_id(event.entry, false);
                self.broadcast_playlist_changed();
            }
            MediaEventKind::Ended => match self.config.playback.end_behavior {
                EndBehavior::StopAll => self.set_mode(PlaybackMode::Stopped),
                EndBehavior::EntryOnly => {
                    debug!("SyncController: entry {} ended", event.entry)
                }
            },
        }
    }

    /// Applies every queued media notification. Returns how many were applied.
    pub fn drain_media_events(&mut self) -> usize {
        let mut applied = 0;
        loop {
            match self.media_events.try_recv() {
                Ok(event) => {
                    self.handle_media_event(event);
                    applied += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        applied
    }

    /// Seeks every loaded entry to its start offset and requests playback.
    /// Unloaded entries are skipped. The returned requests borrow nothing from
    /// the controller, so `pause_all` and other commands stay available while
    /// they settle; pass the result of `media_binding::settle` to
    /// `finish_play_all`.
    pub fn start_play_all(&mut self) -> Vec<(EntryId, PlayRequest)> {
        let targets = self.playlist.loaded_targets();
        debug!("SyncController: play_all over {} loaded entries", targets.len());
        self.play_pending = true;
        self.bindings.start_from(&targets)
    }

    /// Applies the outcome of a `start_play_all`. No rejection sets the mode to
    /// `Playing`; any rejection leaves it `Stopped` without pausing the entries
    /// that did start. A pause or reset issued in between wins and the outcome
    /// is dropped.
    pub fn finish_play_all(&mut self, rejections: Vec<(EntryId, MediaError)>) {
        if !std::mem::take(&mut self.play_pending) {
            debug!("SyncController: play_all superseded, ignoring its outcome");
            return;
        }
        if rejections.is_empty() {
            self.set_mode(PlaybackMode::Playing);
        } else {
            warn!(
                "SyncController: {} entries refused to play",
                rejections.len()
            );
            self.set_mode(PlaybackMode::Stopped);
        }
    }

    /// Starts every loaded entry and waits for all requests to settle.
    pub async fn play_all(&mut self) {
        let pending = self.start_play_all();
        let rejections = media_binding::settle(pending).await;
        self.finish_play_all(rejections);
    }

    pub fn pause_all(&mut self) {
        self.play_pending = false;
        self.bindings.pause_all();
        self.set_mode(PlaybackMode::Stopped);
    }

    /// Rewinds every loaded entry to its start offset and pauses it.
    pub fn reset_all(&mut self) {
        self.play_pending = false;
        let targets = self.playlist.loaded_targets();
        self.bindings.reset_to(&targets);
        self.set_mode(PlaybackMode::Stopped);
    }

    /// Uses the bound player's current position as the entry's start offset.
    pub fn capture_current_time_as_start(&mut self, index: usize) -> Option<f64> {
        let id = self.playlist.entry(index)?.id;
        let position = self.bindings.current_time(id)?;
        let seconds = round_seconds(position, self.config.playback.capture_decimals);
        self.update_start_time_text(index, &format_seconds(seconds));
        self.playlist.set_start_time(index, seconds);
        Some(seconds)
    }

    /// Encodes the playlist into the address bar query. Returns the query written.
    pub fn save_to_url(&self, address_bar: &mut impl AddressBar) -> Result<String, ShareLinkError> {
        let query = share_link::encode_query(&self.playlist.saved_entries(), &self.config.share)?;
        address_bar.replace_query(&query);
        info!("SyncController: saved {} entries to url", self.playlist.len());
        let _ = self
            .bus_producer
            .send(Message::Session(SessionNotification::ShareLinkSaved(
                query.clone(),
            )));
        Ok(query)
    }

    /// Full share link for the configured page address.
    pub fn share_url(&self) -> Result<String, ShareLinkError> {
        share_link::share_url(
            &self.config.share.base_url,
            &self.playlist.saved_entries(),
            &self.config.share,
        )
    }

    fn set_mode(&mut self, mode: PlaybackMode) {
        if self.mode == mode {
            return;
        }
        debug!("SyncController: mode {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
        let _ = self
            .bus_producer
            .send(Message::Session(SessionNotification::ModeChanged(mode)));
    }

    fn broadcast_playlist_changed(&self) {
        let _ = self
            .bus_producer
            .send(Message::Session(SessionNotification::PlaylistChanged(
                self.playlist.snapshot(),
            )));
    }
}
