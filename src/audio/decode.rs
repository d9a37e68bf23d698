//! `rodio`-backed implementation of the decode/playback primitive.
//!
//! Tracks are downloaded whole, decoded into interleaved samples held in
//! memory, and played by building a fresh `Sink` over a [`TrackSource`]
//! that starts at the frame for the requested offset. Seeking therefore
//! never touches the decoder again, and every sink shares the same samples.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use rodio::mixer::Mixer;
use rodio::{Decoder, Sink, Source};
use tracing::{debug, warn};

use crate::error::LoadError;

use super::buffer::{BufferLoader, LoadRequest, TrackBuffer};
use super::thread::AudioMsg;

/// Fully decoded audio, interleaved.
#[derive(Debug, Clone)]
pub struct DecodedTrack {
    channels: u16,
    sample_rate: u32,
    samples: Arc<[f32]>,
}

impl DecodedTrack {
    /// Decode an in-memory encoded file (mp3, flac, ogg, wav, ...).
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, LoadError> {
        let decoder =
            Decoder::new(Cursor::new(bytes)).map_err(|e| LoadError::Decode(e.to_string()))?;
        let channels = decoder.channels();
        let sample_rate = decoder.sample_rate();
        let samples: Vec<f32> = decoder.collect();
        Self::from_samples(channels, sample_rate, samples)
    }

    pub fn from_samples(
        channels: u16,
        sample_rate: u32,
        samples: Vec<f32>,
    ) -> Result<Self, LoadError> {
        if channels == 0 || sample_rate == 0 || samples.len() < channels as usize {
            return Err(LoadError::Empty);
        }
        Ok(Self {
            channels,
            sample_rate,
            samples: Arc::from(samples),
        })
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Index one past the last sample of the last whole frame.
    fn end_sample(&self) -> usize {
        self.frames() * self.channels as usize
    }

    /// Interleaved index of the frame containing `offset` seconds.
    fn start_sample(&self, offset: f64) -> usize {
        let frame = (offset.max(0.0) * self.sample_rate as f64).floor() as usize;
        frame
            .saturating_mul(self.channels as usize)
            .min(self.end_sample())
    }

    /// Interleaved samples starting at the frame containing `offset` seconds.
    pub fn samples_from(&self, offset: f64) -> &[f32] {
        &self.samples[self.start_sample(offset)..self.end_sample()]
    }
}

/// Plays a [`DecodedTrack`] from a frame offset without copying its samples.
pub struct TrackSource {
    samples: Arc<[f32]>,
    pos: usize,
    end: usize,
    channels: u16,
    sample_rate: u32,
}

impl TrackSource {
    pub fn new(track: &DecodedTrack, offset: f64) -> Self {
        Self {
            samples: Arc::clone(&track.samples),
            pos: track.start_sample(offset),
            end: track.end_sample(),
            channels: track.channels,
            sample_rate: track.sample_rate,
        }
    }
}

impl Iterator for TrackSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.pos >= self.end {
            return None;
        }
        let sample = self.samples[self.pos];
        self.pos += 1;
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.end - self.pos;
        (left, Some(left))
    }
}

impl ExactSizeIterator for TrackSource {}

impl Source for TrackSource {
    fn current_span_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        let frames = (self.end - self.pos) / self.channels as usize;
        Some(Duration::from_secs_f64(
            frames as f64 / self.sample_rate as f64,
        ))
    }
}

/// Download and decode `url`. Runs on a loader thread.
pub fn fetch_track(client: &Client, url: &str) -> Result<DecodedTrack, LoadError> {
    let response = client.get(url).send()?;
    if !response.status().is_success() {
        return Err(LoadError::Status(response.status()));
    }
    let bytes = response.bytes()?;
    debug!(url, bytes = bytes.len(), "track downloaded");
    DecodedTrack::from_bytes(bytes.to_vec())
}

/// Loads tracks on short-lived worker threads and posts the result back to
/// the audio thread.
pub struct RodioLoader {
    client: Client,
    tx: Sender<AudioMsg>,
}

impl RodioLoader {
    pub fn new(client: Client, tx: Sender<AudioMsg>) -> Self {
        Self { client, tx }
    }
}

impl BufferLoader for RodioLoader {
    type Buffer = RodioBuffer;

    fn load(&mut self, request: LoadRequest) {
        let client = self.client.clone();
        let tx = self.tx.clone();
        let generation = request.generation;

        let spawned = thread::Builder::new()
            .name("encore-load".to_string())
            .spawn(move || {
                let result = fetch_track(&client, &request.url);
                // The audio thread may already be gone on shutdown.
                let _ = tx.send(AudioMsg::Loaded { generation, result });
            });

        if let Err(e) = spawned {
            warn!(error = %e, "failed to spawn track loader");
            let _ = self.tx.send(AudioMsg::Loaded {
                generation,
                result: Err(LoadError::Worker(e)),
            });
        }
    }
}

/// A decoded track attached to the output mixer.
pub struct RodioBuffer {
    track: Option<DecodedTrack>,
    mixer: Mixer,
    sink: Option<Sink>,
    gain: f32,
}

impl RodioBuffer {
    pub fn new(track: DecodedTrack, mixer: Mixer) -> Self {
        Self {
            track: Some(track),
            mixer,
            sink: None,
            gain: 1.0,
        }
    }
}

impl TrackBuffer for RodioBuffer {
    fn duration(&self) -> f64 {
        self.track.as_ref().map_or(0.0, DecodedTrack::duration_secs)
    }

    fn start(&mut self, offset: f64) {
        self.stop();
        let Some(track) = self.track.as_ref() else {
            return;
        };

        let source = TrackSource::new(track, offset);
        let sink = Sink::connect_new(&self.mixer);
        sink.set_volume(self.gain);
        sink.append(source);
        sink.play();
        self.sink = Some(sink);
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn set_volume(&mut self, gain: f32) {
        self.gain = gain;
        if let Some(sink) = self.sink.as_ref() {
            sink.set_volume(gain);
        }
    }

    fn finished(&self) -> bool {
        self.sink.as_ref().is_some_and(Sink::empty)
    }

    fn dispose(&mut self) {
        self.stop();
        self.track = None;
    }
}
