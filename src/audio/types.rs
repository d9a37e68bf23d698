//! Audio-related small types and handles.
//!
//! This module defines the commands accepted by the audio thread, the
//! playback snapshot shared with the UI and the transport tuning knobs.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::playlist::Playlist;

/// Lowest gain the volume control accepts (decibels).
pub const VOLUME_MIN_DB: f32 = -30.0;
/// Highest gain the volume control accepts (decibels).
pub const VOLUME_MAX_DB: f32 = 6.0;

/// What to do when the active track cannot be loaded.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum LoadFailurePolicy {
    /// Keep the failed track selected; next/previous still work.
    #[default]
    Stay,
    /// Advance to the next track, keeping the play intent.
    Skip,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AudioCmd {
    /// Start or resume playback of the loaded track.
    Play,
    /// Pause playback, remembering the position.
    Pause,
    /// Toggle pause/resume.
    TogglePause,
    /// Seek to an absolute position in seconds.
    Seek(f64),
    /// Seek relative to the current position (seconds, positive or negative).
    SeekBy(f64),
    /// Skip to the next track.
    Next,
    /// Go to the previous track.
    Prev,
    /// Select a track by playlist index; the active one toggles play/pause.
    Pick(usize),
    /// Set the output gain in decibels.
    SetVolume(f32),
    /// Quit the audio thread, optionally fading out over `fade_out_ms` milliseconds.
    Quit { fade_out_ms: u64 },
}

/// Coarse transport state, derived from the playlist and load/play flags.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum TransportState {
    /// No tracks available.
    #[default]
    Empty,
    /// The active track's buffer is not ready (or failed to load).
    Loading,
    Paused,
    Playing,
}

/// Tuning for a [`Transport`](super::Transport).
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// How often the position ticker samples while playing.
    pub tick_interval: Duration,
    /// End-of-track tolerance in seconds.
    pub end_epsilon: f64,
    pub failure_policy: LoadFailurePolicy,
    /// Initial gain in decibels.
    pub volume_db: f32,
    /// Start the first track as soon as the playlist arrives and it has loaded.
    pub autoplay: bool,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            end_epsilon: 0.1,
            failure_policy: LoadFailurePolicy::Stay,
            volume_db: -6.0,
            autoplay: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
/// Runtime playback information shared with the UI.
pub struct PlaybackInfo {
    /// Whether the playlist fetch has completed (successfully or not).
    pub fetched: bool,
    pub playlist: Playlist,
    pub state: TransportState,
    /// Active playlist index. Meaningless while `state` is `Empty`.
    pub index: usize,
    /// Play intent; while loading this means "start once ready".
    pub playing: bool,
    pub loaded: bool,
    /// The active track failed to download or decode.
    pub load_failed: bool,
    /// Current position in seconds.
    pub position: f64,
    /// Track duration in seconds, `0` until loaded.
    pub duration: f64,
    pub volume_db: f32,
    /// Set when no audio output could be opened.
    pub output_error: Option<String>,
}

pub type PlaybackHandle = Arc<Mutex<PlaybackInfo>>;

/// Convert decibels to a linear amplitude factor.
pub fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}
