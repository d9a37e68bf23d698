//! Single-track transport state machine.
//!
//! `Transport` owns every piece of mutable playback state: the playlist, the
//! active index, the play intent, the offset/start-time pair used to derive
//! the live position, the one live [`TrackBuffer`] and the position ticker.
//! It never blocks; loads are handed to a [`BufferLoader`] and their results
//! come back through [`Transport::load_finished`].

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::LoadError;
use crate::playlist::Playlist;

use super::buffer::{BufferLoader, Generation, LoadRequest, TrackBuffer};
use super::ticker::PositionTicker;
use super::types::{
    AudioCmd, LoadFailurePolicy, PlaybackInfo, TransportOptions, TransportState, VOLUME_MAX_DB,
    VOLUME_MIN_DB, db_to_gain,
};

/// Outcome of one position sample.
#[derive(Debug, Clone, PartialEq)]
pub enum Tick {
    /// Ticker not armed or not playing; nothing sampled.
    Idle,
    /// Current position in seconds.
    Position(f64),
    /// The track ended and the transport moved on.
    Advanced { from: usize, to: usize },
}

pub struct Transport<L: BufferLoader> {
    loader: L,
    buffer: Option<L::Buffer>,
    ticker: PositionTicker,

    playlist: Playlist,
    fetched: bool,
    active_index: usize,

    playing: bool,
    loaded: bool,
    load_failed: bool,

    /// Position at which output last started or paused.
    offset: f64,
    /// Wall clock at the last start; `None` unless output is running.
    started_at: Option<Instant>,
    duration: f64,

    generation: Generation,
    in_flight: Option<Generation>,
    consecutive_failures: usize,

    end_epsilon: f64,
    failure_policy: LoadFailurePolicy,
    autoplay: bool,
    volume_db: f32,
}

impl<L: BufferLoader> Transport<L> {
    pub fn new(loader: L, options: TransportOptions) -> Self {
        Self {
            loader,
            buffer: None,
            ticker: PositionTicker::new(options.tick_interval),
            playlist: Playlist::default(),
            fetched: false,
            active_index: 0,
            playing: false,
            loaded: false,
            load_failed: false,
            offset: 0.0,
            started_at: None,
            duration: 0.0,
            generation: Generation::default(),
            in_flight: None,
            consecutive_failures: 0,
            end_epsilon: options.end_epsilon.max(0.0),
            failure_policy: options.failure_policy,
            autoplay: options.autoplay,
            volume_db: clamp_volume(options.volume_db).unwrap_or(0.0),
        }
    }

    pub fn state(&self) -> TransportState {
        if self.playlist.is_empty() {
            TransportState::Empty
        } else if !self.loaded {
            TransportState::Loading
        } else if self.playing {
            TransportState::Playing
        } else {
            TransportState::Paused
        }
    }

    #[cfg(test)]
    pub fn active_index(&self) -> usize {
        self.active_index
    }

    #[cfg(test)]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    #[cfg(test)]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    #[cfg(test)]
    pub fn offset(&self) -> f64 {
        self.offset
    }

    #[cfg(test)]
    pub fn duration(&self) -> f64 {
        self.duration
    }

    #[cfg(test)]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn volume_db(&self) -> f32 {
        self.volume_db
    }

    #[cfg(test)]
    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    #[cfg(test)]
    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// The live buffer, if one is attached.
    pub fn buffer_mut(&mut self) -> Option<&mut L::Buffer> {
        self.buffer.as_mut()
    }

    /// Live position in seconds, clamped into `[0, duration]`.
    pub fn position(&self, now: Instant) -> f64 {
        match self.started_at {
            Some(started) if self.loaded && self.playing => {
                let elapsed = now.saturating_duration_since(started).as_secs_f64();
                self.clamp_to_track(self.offset + elapsed)
            }
            _ => self.offset,
        }
    }

    /// Install the fetched playlist and begin loading its first track.
    pub fn set_playlist(&mut self, playlist: Playlist) {
        self.fetched = true;
        self.playlist = playlist;
        self.active_index = 0;
        self.consecutive_failures = 0;

        if self.playlist.is_empty() {
            info!("playlist is empty; transport idle");
            self.release_buffer();
            self.in_flight = None;
            self.generation = self.generation.next();
            self.playing = false;
            return;
        }

        info!(tracks = self.playlist.len(), "playlist installed");
        self.playing = self.autoplay;
        self.begin_load();
    }

    /// Apply a transport command. `Quit` tears down without fading; the
    /// owning thread fades out first.
    pub fn apply(&mut self, cmd: AudioCmd, now: Instant) {
        match cmd {
            AudioCmd::Play => self.play(now),
            AudioCmd::Pause => self.pause(now),
            AudioCmd::TogglePause => self.toggle(now),
            AudioCmd::Seek(t) => self.seek(t, now),
            AudioCmd::SeekBy(delta) => self.seek_by(delta, now),
            AudioCmd::Next => self.next(),
            AudioCmd::Prev => self.previous(),
            AudioCmd::Pick(i) => self.pick(i, now),
            AudioCmd::SetVolume(db) => self.set_volume_db(db),
            AudioCmd::Quit { .. } => self.shutdown(),
        }
    }

    pub fn play(&mut self, now: Instant) {
        match self.state() {
            TransportState::Paused => {
                self.playing = true;
                self.start_output(now);
                debug!(index = self.active_index, offset = self.offset, "play");
            }
            // Remember the intent so the track starts once its buffer is ready.
            TransportState::Loading if !self.load_failed => self.playing = true,
            _ => debug!(state = ?self.state(), "play ignored"),
        }
    }

    pub fn pause(&mut self, now: Instant) {
        match self.state() {
            TransportState::Playing => {
                self.offset = self.position(now);
                if let Some(buffer) = self.buffer.as_mut() {
                    buffer.stop();
                }
                self.started_at = None;
                self.ticker.cancel();
                self.playing = false;
                debug!(index = self.active_index, offset = self.offset, "pause");
            }
            TransportState::Loading => self.playing = false,
            _ => {}
        }
    }

    pub fn toggle(&mut self, now: Instant) {
        if self.playing {
            self.pause(now);
        } else {
            self.play(now);
        }
    }

    /// Move to `t` seconds, clamped into the track. Ignored until loaded.
    pub fn seek(&mut self, t: f64, now: Instant) {
        if !self.loaded || t.is_nan() {
            return;
        }

        let target = self.clamp_to_track(t);
        self.offset = target;
        if self.playing {
            if let Some(buffer) = self.buffer.as_mut() {
                buffer.stop();
                buffer.start(target);
            }
            self.started_at = Some(now);
        }
        debug!(offset = target, "seek");
    }

    pub fn seek_by(&mut self, delta: f64, now: Instant) {
        if self.loaded {
            self.seek(self.position(now) + delta, now);
        }
    }

    pub fn next(&mut self) {
        self.consecutive_failures = 0;
        self.step(1);
    }

    pub fn previous(&mut self) {
        self.consecutive_failures = 0;
        self.step(-1);
    }

    /// Select track `index`. The active track toggles instead of reloading.
    pub fn pick(&mut self, index: usize, now: Instant) {
        if index >= self.playlist.len() {
            warn!(index, len = self.playlist.len(), "pick out of range");
            return;
        }
        if index == self.active_index {
            self.toggle(now);
            return;
        }

        self.active_index = index;
        self.consecutive_failures = 0;
        self.begin_load();
    }

    pub fn set_volume_db(&mut self, db: f32) {
        let Some(db) = clamp_volume(db) else {
            return;
        };
        self.volume_db = db;
        if let Some(buffer) = self.buffer.as_mut() {
            buffer.set_volume(db_to_gain(db));
        }
    }

    /// Deliver the result of a load. Results for anything but the request
    /// currently in flight are disposed and dropped.
    pub fn load_finished(
        &mut self,
        generation: Generation,
        result: Result<L::Buffer, LoadError>,
        now: Instant,
    ) {
        if self.in_flight != Some(generation) {
            debug!(%generation, current = %self.generation, "discarding stale track load");
            if let Ok(mut buffer) = result {
                buffer.dispose();
            }
            return;
        }
        self.in_flight = None;

        match result {
            Ok(mut buffer) => {
                buffer.set_volume(db_to_gain(self.volume_db));
                let duration = buffer.duration();
                self.duration = if duration.is_finite() && duration > 0.0 {
                    duration
                } else {
                    0.0
                };
                self.offset = 0.0;
                self.loaded = true;
                self.load_failed = false;
                self.consecutive_failures = 0;
                self.buffer = Some(buffer);
                info!(index = self.active_index, duration = self.duration, "track ready");

                if self.playing {
                    self.start_output(now);
                }
            }
            Err(e) => {
                warn!(index = self.active_index, error = %e, "track failed to load");
                self.load_failed = true;
                self.consecutive_failures += 1;

                if self.failure_policy == LoadFailurePolicy::Skip {
                    if self.consecutive_failures < self.playlist.len() {
                        self.step(1);
                    } else {
                        warn!("every track failed to load; not skipping further");
                    }
                }
            }
        }
    }

    /// True when the position ticker wants a sample at `now`.
    pub fn tick_due(&mut self, now: Instant) -> bool {
        self.ticker.poll(now)
    }

    /// How long the owner may wait for messages before the next tick.
    pub fn next_wakeup(&self, now: Instant, idle: Duration) -> Duration {
        self.ticker.time_until_due(now, idle)
    }

    #[cfg(test)]
    pub fn ticker_armed(&self) -> bool {
        self.ticker.is_armed()
    }

    /// Sample the position and auto-advance at the end of the track.
    pub fn tick(&mut self, now: Instant) -> Tick {
        if !self.ticker.is_armed() || self.state() != TransportState::Playing {
            return Tick::Idle;
        }

        let position = self.position(now);
        let reached_end = self.duration > 0.0 && position >= self.duration - self.end_epsilon;
        let drained = self.buffer.as_ref().is_some_and(|b| b.finished());

        if reached_end || drained {
            let from = self.active_index;
            self.consecutive_failures = 0;
            self.step(1);
            debug!(from, to = self.active_index, "auto-advance");
            Tick::Advanced {
                from,
                to: self.active_index,
            }
        } else {
            Tick::Position(position)
        }
    }

    /// Cancel the ticker, dispose the live buffer and invalidate any load in flight.
    pub fn shutdown(&mut self) {
        self.release_buffer();
        self.in_flight = None;
        self.generation = self.generation.next();
        self.playing = false;
        debug!("transport shut down");
    }

    pub fn snapshot(&self, now: Instant) -> PlaybackInfo {
        PlaybackInfo {
            fetched: self.fetched,
            playlist: self.playlist.clone(),
            state: self.state(),
            index: self.active_index,
            playing: self.playing,
            loaded: self.loaded,
            load_failed: self.load_failed,
            position: self.position(now),
            duration: self.duration,
            volume_db: self.volume_db,
            output_error: None,
        }
    }

    fn step(&mut self, delta: isize) {
        let len = self.playlist.len();
        if len == 0 {
            return;
        }
        let next = (self.active_index as isize + delta).rem_euclid(len as isize);
        self.active_index = next as usize;
        self.begin_load();
    }

    fn begin_load(&mut self) {
        self.release_buffer();
        self.generation = self.generation.next();

        let Some(track) = self.playlist.get(self.active_index) else {
            self.in_flight = None;
            return;
        };

        let request = LoadRequest {
            generation: self.generation,
            index: self.active_index,
            url: track.url.clone(),
        };
        debug!(index = request.index, generation = %request.generation, url = %request.url, "loading track");
        self.in_flight = Some(self.generation);
        self.loader.load(request);
    }

    /// Stop and dispose the outgoing buffer and reset per-track state.
    fn release_buffer(&mut self) {
        self.ticker.cancel();
        if let Some(mut buffer) = self.buffer.take() {
            buffer.stop();
            buffer.dispose();
        }
        self.loaded = false;
        self.load_failed = false;
        self.duration = 0.0;
        self.offset = 0.0;
        self.started_at = None;
    }

    fn start_output(&mut self, now: Instant) {
        if let Some(buffer) = self.buffer.as_mut() {
            buffer.start(self.offset);
        }
        self.started_at = Some(now);
        self.ticker.arm(now);
    }

    fn clamp_to_track(&self, t: f64) -> f64 {
        if self.duration > 0.0 {
            t.clamp(0.0, self.duration)
        } else if t.is_finite() {
            t.max(0.0)
        } else {
            0.0
        }
    }
}

fn clamp_volume(db: f32) -> Option<f32> {
    if db.is_nan() {
        None
    } else {
        Some(db.clamp(VOLUME_MIN_DB, VOLUME_MAX_DB))
    }
}
