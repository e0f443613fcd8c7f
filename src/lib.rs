//! Synchronized playback of several videos, each from its own start offset,
//! with the playlist shareable through a single URL query parameter.

pub mod config;
pub mod media_binding;
pub mod playlist;
pub mod protocol;
pub mod share_link;
pub mod start_time_input;
pub mod sync_controller;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use config::Config;
pub use media_binding::{MediaBindings, MediaError, MediaHandle, PlayRequest};
pub use playlist::{EntryId, Playlist, StartTimeEdit, VideoEntry};
pub use protocol::{MediaEvent, MediaEventKind, Message, PlaybackMode, SessionNotification};
pub use share_link::{AddressBar, DecodeSource, SavedEntry, ShareLinkError};
pub use sync_controller::SyncController;
