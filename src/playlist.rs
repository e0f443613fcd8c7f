use std::fmt;

use log::debug;
use uuid::Uuid;

use crate::share_link::SavedEntry;
use crate::start_time_input::StartTimeInput;

/// Stable identity of a playlist entry. Survives removals and reorders of
/// other entries, so late media notifications can never hit the wrong row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(Uuid);

impl EntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One video: source url, start offset in seconds and whether the source loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoEntry {
    pub id: EntryId,
    pub url: String,
    pub start_time: f64,
    pub is_loaded: bool,
}

impl VideoEntry {
    fn new(url: String, start_time: f64) -> Self {
        Self {
            id: EntryId::new(),
            url,
            start_time,
            is_loaded: false,
        }
    }
}

/// Outcome of a start-time text edit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StartTimeEdit {
    /// Text failed the numeric gate; nothing changed.
    Rejected,
    /// Text stored, but it is not a complete number yet.
    Partial,
    /// Text stored and the entry's start time set to the parsed value.
    Applied(f64),
}

struct PlaylistRow {
    entry: VideoEntry,
    start_time_input: StartTimeInput,
}

/// Ordered entries, each paired with its start-time text field.
#[derive(Default)]
pub struct Playlist {
    rows: Vec<PlaylistRow>,
}

impl Playlist {
    pub fn new() -> Playlist {
        Playlist { rows: Vec::new() }
    }

    /// Builds a playlist from restored `{url, startTime}` pairs. Nothing is loaded yet.
    pub fn from_saved(saved: Vec<SavedEntry>) -> Playlist {
        let rows = saved
            .into_iter()
            .map(|saved| PlaylistRow {
                start_time_input: StartTimeInput::from_seconds(saved.start_time),
                entry: VideoEntry::new(saved.url, saved.start_time),
            })
            .collect();
        Playlist { rows }
    }

    /// Appends an empty entry with a `"0"` start time.
    pub fn add_entry(&mut self) -> EntryId {
        let entry = VideoEntry::new(String::new(), 0.0);
        let id = entry.id;
        self.rows.push(PlaylistRow {
            entry,
            start_time_input: StartTimeInput::default(),
        });
        id
    }

    /// Sets the url and clears the loaded flag. Out-of-range indices are ignored.
    pub fn update_url(&mut self, index: usize, url: &str) {
        let Some(row) = self.rows.get_mut(index) else {
            debug!("update_url: Index {} out of bounds", index);
            return;
        };
        row.entry.url = url.to_string();
        row.entry.is_loaded = false;
    }

    /// Stores typed start-time text. The start time only moves when the text
    /// parses to a finite number.
    pub fn update_start_time_text(&mut self, index: usize, text: &str) -> StartTimeEdit {
        let Some(row) = self.rows.get_mut(index) else {
            debug!("update_start_time_text: Index {} out of bounds", index);
            return StartTimeEdit::Rejected;
        };
        let Some(input) = StartTimeInput::accept(text) else {
            return StartTimeEdit::Rejected;
        };
        let edit = match input.value() {
            Some(seconds) => {
                row.entry.start_time = seconds;
                StartTimeEdit::Applied(seconds)
            }
            None => StartTimeEdit::Partial,
        };
        row.start_time_input = input;
        edit
    }

    /// Overwrites the start time without touching the displayed text.
    pub fn set_start_time(&mut self, index: usize, seconds: f64) {
        if let Some(row) = self.rows.get_mut(index) {
            row.entry.start_time = seconds;
        }
    }

    pub fn mark_loaded(&mut self, index: usize, ok: bool) {
        if let Some(row) = self.rows.get_mut(index) {
            row.entry.is_loaded = ok;
        }
    }

    /// Id-keyed variant of `mark_loaded`. Returns `false` for unknown ids.
    pub fn mark_loaded_by_id(&mut self, id: EntryId, ok: bool) -> bool {
        match self.index_of(id) {
            Some(index) => {
                self.mark_loaded(index, ok);
                true
            }
            None => false,
        }
    }

    /// Removes the entry and its text; later entries shift down by one.
    pub fn remove_entry(&mut self, index: usize) -> Option<VideoEntry> {
        if index >= self.rows.len() {
            debug!("remove_entry: Index {} out of bounds", index);
            return None;
        }
        Some(self.rows.remove(index).entry)
    }

    pub fn index_of(&self, id: EntryId) -> Option<usize> {
        self.rows.iter().position(|row| row.entry.id == id)
    }

    pub fn entry(&self, index: usize) -> Option<&VideoEntry> {
        self.rows.get(index).map(|row| &row.entry)
    }

    pub fn start_time_text(&self, index: usize) -> Option<&str> {
        self.rows.get(index).map(|row| row.start_time_input.text())
    }

    pub fn entries(&self) -> impl Iterator<Item = &VideoEntry> {
        self.rows.iter().map(|row| &row.entry)
    }

    pub fn start_time_texts(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|row| row.start_time_input.text())
    }

    /// Loaded entries in display order as `(id, start_time)`.
    pub fn loaded_targets(&self) -> Vec<(EntryId, f64)> {
        self.entries()
            .filter(|entry| entry.is_loaded)
            .map(|entry| (entry.id, entry.start_time))
            .collect()
    }

    /// Projection persisted in share links.
    pub fn saved_entries(&self) -> Vec<SavedEntry> {
        self.entries()
            .map(|entry| SavedEntry {
                url: entry.url.clone(),
                start_time: entry.start_time,
            })
            .collect()
    }

    pub fn snapshot(&self) -> Vec<VideoEntry> {
        self.entries().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{Playlist, StartTimeEdit};
    use crate::share_link::SavedEntry;

    fn assert_parity(playlist: &Playlist) {
        assert_eq!(playlist.entries().count(), playlist.start_time_texts().count());
        assert_eq!(playlist.entries().count(), playlist.len());
    }

    #[test]
    fn test_add_entry_uses_defaults() {
        let mut playlist = Playlist::new();
        let id = playlist.add_entry();

        let entry = playlist.entry(0).expect("entry should exist");
        assert_eq!(entry.id, id);
        assert!(entry.url.is_empty());
        assert_eq!(entry.start_time, 0.0);
        assert!(!entry.is_loaded);
        assert_eq!(playlist.start_time_text(0), Some("0"));
    }

    #[test]
    fn test_add_remove_sequences_keep_texts_aligned() {
        let mut playlist = Playlist::new();
        let ops = [
            true, true, false, true, true, true, false, false, true, false, false, false, false,
        ];
        let mut expected_len = 0usize;
        for (step, add) in ops.iter().enumerate() {
            if *add {
                playlist.add_entry();
                let last = playlist.len() - 1;
                playlist.update_start_time_text(last, &step.to_string());
                expected_len += 1;
            } else if playlist.remove_entry(step % playlist.len().max(1)).is_some() {
                expected_len -= 1;
            }
            assert_parity(&playlist);
            assert_eq!(playlist.len(), expected_len);
        }
        assert!(playlist.is_empty());
    }

    #[test]
    fn test_remove_entry_shifts_later_rows_down() {
        let mut playlist = Playlist::new();
        let first = playlist.add_entry();
        let second = playlist.add_entry();
        let third = playlist.add_entry();
        playlist.update_start_time_text(2, "7.5");

        let removed = playlist.remove_entry(1).expect("middle entry should be removed");
        assert_eq!(removed.id, second);
        assert_eq!(playlist.index_of(first), Some(0));
        assert_eq!(playlist.index_of(third), Some(1));
        assert_eq!(playlist.index_of(second), None);
        assert_eq!(playlist.start_time_text(1), Some("7.5"));
        assert_parity(&playlist);
    }

    #[test]
    fn test_remove_entry_out_of_range_is_ignored() {
        let mut playlist = Playlist::new();
        playlist.add_entry();
        assert!(playlist.remove_entry(3).is_none());
        assert_eq!(playlist.len(), 1);
    }

    #[test]
    fn test_update_url_clears_loaded_flag() {
        let mut playlist = Playlist::new();
        playlist.add_entry();
        playlist.mark_loaded(0, true);

        playlist.update_url(0, "https://cdn.example.com/a.mp4");
        let entry = playlist.entry(0).expect("entry should exist");
        assert_eq!(entry.url, "https://cdn.example.com/a.mp4");
        assert!(!entry.is_loaded);
    }

    #[test]
    fn test_update_url_out_of_range_is_noop() {
        let mut playlist = Playlist::new();
        playlist.update_url(0, "https://cdn.example.com/a.mp4");
        assert!(playlist.is_empty());
    }

    #[test]
    fn test_partial_text_keeps_last_valid_start_time() {
        let mut playlist = Playlist::new();
        playlist.add_entry();
        assert_eq!(playlist.update_start_time_text(0, "4"), StartTimeEdit::Applied(4.0));

        assert_eq!(playlist.update_start_time_text(0, "-"), StartTimeEdit::Partial);
        assert_eq!(playlist.start_time_text(0), Some("-"));
        assert_eq!(playlist.entry(0).map(|e| e.start_time), Some(4.0));

        assert_eq!(playlist.update_start_time_text(0, "-1.5"), StartTimeEdit::Applied(-1.5));
        assert_eq!(playlist.entry(0).map(|e| e.start_time), Some(-1.5));
    }

    #[test]
    fn test_rejected_text_leaves_display_untouched() {
        let mut playlist = Playlist::new();
        playlist.add_entry();
        playlist.update_start_time_text(0, "12.");

        assert_eq!(playlist.update_start_time_text(0, "12.a"), StartTimeEdit::Rejected);
        assert_eq!(playlist.start_time_text(0), Some("12."));
        assert_eq!(playlist.entry(0).map(|e| e.start_time), Some(12.0));
    }

    #[test]
    fn test_mark_loaded_by_unknown_id_is_ignored() {
        let mut playlist = Playlist::new();
        let id = playlist.add_entry();
        playlist.remove_entry(0);
        assert!(!playlist.mark_loaded_by_id(id, true));
    }

    #[test]
    fn test_from_saved_initializes_texts_and_unloaded_entries() {
        let playlist = Playlist::from_saved(vec![
            SavedEntry {
                url: "http://a".to_string(),
                start_time: 1.5,
            },
            SavedEntry {
                url: "http://b".to_string(),
                start_time: 0.0,
            },
        ]);
        let texts: Vec<&str> = playlist.start_time_texts().collect();
        assert_eq!(texts, vec!["1.5", "0"]);
        assert!(playlist.entries().all(|entry| !entry.is_loaded));
        assert!(playlist.loaded_targets().is_empty());
    }
}
