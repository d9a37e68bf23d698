use std::thread::{self, JoinHandle};
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{error, warn};

use crate::audio::{LoadFailurePolicy, PlaylistSender, TransportOptions};
use crate::config;
use crate::playlist::{self, Playlist};

/// How long a track download may take to connect. The transfer itself is unbounded.
const TRACK_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Map settings onto the transport's tuning knobs.
pub fn transport_options(settings: &config::Settings) -> TransportOptions {
    TransportOptions {
        tick_interval: Duration::from_millis(settings.audio.tick_ms),
        end_epsilon: settings.audio.end_epsilon_secs,
        failure_policy: match settings.playback.on_load_failure {
            config::LoadFailureSetting::Stay => LoadFailurePolicy::Stay,
            config::LoadFailureSetting::Skip => LoadFailurePolicy::Skip,
        },
        volume_db: settings.audio.volume_db,
        autoplay: settings.playback.autoplay,
    }
}

/// HTTP client used by the track loader.
pub fn track_client(settings: &config::Settings) -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(TRACK_CONNECT_TIMEOUT)
        .timeout(None)
        .user_agent(settings.playlist.user_agent.clone())
        .build()
}

/// Fetch the playlist once on a background thread and hand it to the audio thread.
///
/// Any failure ends up as an empty playlist so the transport renders its
/// "no tracks" state.
pub fn spawn_playlist_fetch(
    settings: config::PlaylistSettings,
    sender: PlaylistSender,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("encore-playlist".to_string())
        .spawn(move || {
            let playlist = match playlist::build_sources(&settings) {
                Ok(sources) => playlist::fetch_playlist(&sources),
                Err(e) => {
                    error!(error = %e, "could not build playlist client");
                    Playlist::default()
                }
            };
            if sender.deliver(playlist).is_err() {
                warn!("audio thread gone before the playlist arrived");
            }
        })
}
