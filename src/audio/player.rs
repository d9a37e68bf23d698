use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use reqwest::blocking::Client;

use crate::playlist::Playlist;

use super::thread::{AudioMsg, spawn_audio_thread};
use super::types::{AudioCmd, PlaybackHandle, PlaybackInfo, TransportOptions};

pub struct AudioPlayer {
    tx: Sender<AudioMsg>,
    playback: PlaybackHandle,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl AudioPlayer {
    /// Spawn the audio thread. `client` is used for track downloads.
    pub fn new(options: TransportOptions, client: Client) -> Self {
        let (tx, rx) = mpsc::channel::<AudioMsg>();
        let playback_info: PlaybackHandle = Arc::new(Mutex::new(PlaybackInfo::default()));

        let audio_handle =
            spawn_audio_thread(tx.clone(), rx, playback_info.clone(), options, client);

        Self {
            tx,
            playback: playback_info,
            join: Mutex::new(Some(audio_handle)),
        }
    }

    pub fn playback_handle(&self) -> PlaybackHandle {
        self.playback.clone()
    }

    pub fn send(&self, cmd: AudioCmd) -> Result<(), mpsc::SendError<AudioMsg>> {
        self.tx.send(AudioMsg::Cmd(cmd))
    }

    /// A sender the playlist fetch thread can deliver its result through.
    pub fn playlist_sender(&self) -> PlaylistSender {
        PlaylistSender {
            tx: self.tx.clone(),
        }
    }

    pub fn quit_softly(&self, fade_out: Duration) {
        let _ = self.send(AudioCmd::Quit {
            fade_out_ms: fade_out.as_millis() as u64,
        });

        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
    }
}

/// One-shot delivery of the fetched playlist to the audio thread.
pub struct PlaylistSender {
    tx: Sender<AudioMsg>,
}

impl PlaylistSender {
    pub fn deliver(self, playlist: Playlist) -> Result<(), mpsc::SendError<AudioMsg>> {
        self.tx.send(AudioMsg::Playlist(playlist))
    }
}
