//! Application model: the list cursor and the latest playback snapshot.
//!
//! The audio thread owns the transport; `App` only mirrors what it
//! publishes and keeps the UI-local cursor state.

use crate::audio::{PlaybackHandle, PlaybackInfo, TransportState};
use crate::playlist::Playlist;

/// The main application model.
pub struct App {
    /// Latest snapshot pulled from the audio thread.
    pub info: PlaybackInfo,
    /// Cursor position in the track list.
    pub selected: usize,
    pub playback_handle: Option<PlaybackHandle>,

    /// When set, the cursor tracks the active track.
    pub follow_playback: bool,
    /// A picked index the audio thread has not made active yet.
    pub pending_follow_index: Option<usize>,
    /// Active index at the time of the pending pick.
    pick_origin: Option<usize>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self {
            info: PlaybackInfo::default(),
            selected: 0,
            playback_handle: None,
            follow_playback: true,
            pending_follow_index: None,
            pick_origin: None,
        }
    }

    /// Attach a `PlaybackHandle` used to observe playback progress.
    pub fn set_playback_handle(&mut self, h: PlaybackHandle) {
        self.playback_handle = Some(h);
    }

    pub fn playlist(&self) -> &Playlist {
        &self.info.playlist
    }

    /// Return true if the playlist contains any tracks.
    pub fn has_tracks(&self) -> bool {
        !self.info.playlist.is_empty()
    }

    /// Index of the active track, if there is one.
    pub fn active_index(&self) -> Option<usize> {
        (self.info.state != TransportState::Empty).then_some(self.info.index)
    }

    /// Display label for the track at `index`.
    pub fn label(&self, index: usize) -> String {
        self.info
            .playlist
            .get(index)
            .map(|t| t.label(index))
            .unwrap_or_default()
    }

    /// Pull a fresh snapshot from the playback handle, if attached.
    pub fn refresh(&mut self) {
        let snapshot = self
            .playback_handle
            .as_ref()
            .and_then(|h| h.lock().ok().map(|info| info.clone()));
        if let Some(info) = snapshot {
            self.apply_snapshot(info);
        }
    }

    /// Replace the mirrored snapshot and keep the cursor valid.
    pub fn apply_snapshot(&mut self, info: PlaybackInfo) {
        self.info = info;
        let active = self.active_index();
        if let Some(pending) = self.pending_follow_index {
            // Hold the cursor on the pick until the transport moves.
            if active == Some(pending) || active != self.pick_origin {
                self.pending_follow_index = None;
                if let Some(active) = active {
                    self.selected = active;
                }
            }
        } else if let Some(active) = active.filter(|_| self.follow_playback) {
            self.selected = active;
        }
        self.clamp_selected();
    }

    /// Enable following playback (cursor follows currently playing track).
    pub fn follow_playback_on(&mut self) {
        self.follow_playback = true;
        self.pending_follow_index = None;
        if let Some(active) = self.active_index() {
            self.selected = active;
        }
    }

    /// Disable follow-playback and clear any pending follow index.
    pub fn follow_playback_off(&mut self) {
        self.follow_playback = false;
        self.pending_follow_index = None;
    }

    /// Move the cursor down, wrapping to the top.
    pub fn next(&mut self) {
        let len = self.info.playlist.len();
        if len == 0 {
            return;
        }
        self.follow_playback_off();
        self.selected = (self.selected + 1) % len;
    }

    /// Move the cursor up, wrapping to the bottom.
    pub fn prev(&mut self) {
        let len = self.info.playlist.len();
        if len == 0 {
            return;
        }
        self.follow_playback_off();
        self.selected = (self.selected + len - 1) % len;
    }

    pub fn select_first(&mut self) {
        if self.has_tracks() {
            self.follow_playback_off();
            self.selected = 0;
        }
    }

    pub fn select_last(&mut self) {
        if self.has_tracks() {
            self.follow_playback_off();
            self.selected = self.info.playlist.len() - 1;
        }
    }

    /// Cursor pick: returns the index to hand to the transport.
    ///
    /// Picking re-enables follow mode so the cursor stays on the new track.
    pub fn pick_selected(&mut self) -> Option<usize> {
        if !self.has_tracks() {
            return None;
        }
        self.follow_playback = true;
        self.pending_follow_index = Some(self.selected);
        self.pick_origin = self.active_index();
        Some(self.selected)
    }

    /// Status line label for the transport state.
    pub fn state_label(&self) -> &'static str {
        if self.info.output_error.is_some() {
            return "No audio output";
        }
        match self.info.state {
            TransportState::Empty if !self.info.fetched => "Fetching",
            TransportState::Empty => "No tracks",
            TransportState::Loading if self.info.load_failed => "Unavailable",
            TransportState::Loading => "Loading",
            TransportState::Paused => "Paused",
            TransportState::Playing => "Playing",
        }
    }

    fn clamp_selected(&mut self) {
        let len = self.info.playlist.len();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }
}
