//! The decode/playback primitive the transport drives.
//!
//! A [`BufferLoader`] turns a URL into a [`TrackBuffer`] asynchronously and
//! reports back through `Transport::load_finished`, tagged with the
//! [`Generation`] the request was issued under.

use std::fmt;

/// Identifies one load request. Bumped on every track switch and on teardown.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub generation: Generation,
    /// Playlist index the request was made for.
    pub index: usize,
    pub url: String,
}

/// A decoded, seekable track attached to the audio output.
pub trait TrackBuffer {
    /// Length in seconds.
    fn duration(&self) -> f64;

    /// Begin output at `offset` seconds, replacing any output already running.
    fn start(&mut self, offset: f64);

    fn stop(&mut self);

    /// Set linear output gain.
    fn set_volume(&mut self, gain: f32);

    /// True once started output has drained naturally.
    fn finished(&self) -> bool;

    /// Stop output and release decoded data. The buffer is unusable afterwards.
    fn dispose(&mut self);
}

/// Starts asynchronous loads. Completion is delivered out of band.
pub trait BufferLoader {
    type Buffer: TrackBuffer;

    fn load(&mut self, request: LoadRequest);
}
