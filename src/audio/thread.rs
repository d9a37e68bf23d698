use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use rodio::OutputStreamBuilder;
use rodio::mixer::Mixer;
use tracing::{debug, error, info, trace};

use crate::error::LoadError;
use crate::playlist::Playlist;

use super::buffer::{BufferLoader, Generation, TrackBuffer};
use super::decode::{DecodedTrack, RodioBuffer, RodioLoader};
use super::transport::{Tick, Transport};
use super::types::{AudioCmd, PlaybackHandle, TransportOptions, db_to_gain};

/// How long the loop sleeps when the ticker is not armed.
const IDLE_WAIT: Duration = Duration::from_millis(250);

/// Everything the audio thread reacts to.
#[derive(Debug)]
pub enum AudioMsg {
    /// A user intent.
    Cmd(AudioCmd),
    /// The playlist fetch finished.
    Playlist(Playlist),
    /// A track load finished, tagged with the generation it was issued under.
    Loaded {
        generation: Generation,
        result: Result<DecodedTrack, LoadError>,
    },
}

pub(super) fn spawn_audio_thread(
    tx: Sender<AudioMsg>,
    rx: Receiver<AudioMsg>,
    playback_info: PlaybackHandle,
    options: TransportOptions,
    client: Client,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut stream = match OutputStreamBuilder::open_default_stream() {
            Ok(stream) => stream,
            Err(e) => {
                error!(error = %e, "no audio output device; playback disabled");
                if let Ok(mut info) = playback_info.lock() {
                    info.output_error = Some(e.to_string());
                }
                return;
            }
        };
        // rodio logs to stderr when OutputStream is dropped. That's useful in debugging,
        // but noisy for a TUI app.
        stream.log_on_drop(false);

        let mixer = stream.mixer().clone();
        let mut transport = Transport::new(RodioLoader::new(client, tx), options);
        publish(&transport, &playback_info);
        info!("audio thread started");

        loop {
            let timeout = transport.next_wakeup(Instant::now(), IDLE_WAIT);
            match rx.recv_timeout(timeout) {
                Ok(AudioMsg::Cmd(AudioCmd::Quit { fade_out_ms })) => {
                    let gain = db_to_gain(transport.volume_db());
                    if let Some(buffer) = transport.buffer_mut() {
                        // Fade out gently before stopping.
                        fade_out(buffer, gain, fade_out_ms);
                    }
                    transport.shutdown();
                    // Update shared state so UI/MPRIS don't keep showing Playing.
                    publish(&transport, &playback_info);
                    break;
                }
                Ok(msg) => handle_msg(&mut transport, msg, &mixer),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    transport.shutdown();
                    break;
                }
            }

            let now = Instant::now();
            if transport.tick_due(now) {
                match transport.tick(now) {
                    Tick::Idle => {}
                    Tick::Position(position) => trace!(position, "tick"),
                    Tick::Advanced { from, to } => debug!(from, to, "track ended, advanced"),
                }
            }
            publish(&transport, &playback_info);
        }

        info!("audio thread stopped");
    })
}

fn handle_msg(transport: &mut Transport<RodioLoader>, msg: AudioMsg, mixer: &Mixer) {
    let now = Instant::now();
    match msg {
        AudioMsg::Cmd(cmd) => {
            debug!(?cmd, "audio command");
            transport.apply(cmd, now);
        }
        AudioMsg::Playlist(playlist) => transport.set_playlist(playlist),
        AudioMsg::Loaded { generation, result } => {
            let result = result.map(|track| RodioBuffer::new(track, mixer.clone()));
            transport.load_finished(generation, result, now);
        }
    }
}

fn publish<L: BufferLoader>(transport: &Transport<L>, playback_info: &PlaybackHandle) {
    if let Ok(mut info) = playback_info.lock() {
        *info = transport.snapshot(Instant::now());
    }
}

fn fade_out<B: TrackBuffer>(buffer: &mut B, from_gain: f32, fade_out_ms: u64) {
    if fade_out_ms == 0 {
        buffer.set_volume(0.0);
        return;
    }
    let steps: u64 = 20;
    let step_ms = (fade_out_ms / steps).max(1);
    for step in 1..=steps {
        let t = step as f32 / steps as f32;
        buffer.set_volume(from_gain * (1.0 - t));
        thread::sleep(Duration::from_millis(step_ms));
    }
    buffer.set_volume(0.0);
}
