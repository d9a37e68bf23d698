use std::path::PathBuf;

use serde::Deserialize;

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/encore/config.toml` or `~/.config/encore/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `ENCORE__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub playlist: PlaylistSettings,
    pub audio: AudioSettings,
    pub playback: PlaybackSettings,
    pub controls: ControlsSettings,
    pub ui: UiSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaylistSettings {
    /// GraphQL endpoint queried for `btcPlaylist` (primary source).
    pub graphql_endpoint: String,
    /// JSON list endpoint used when the primary source yields nothing.
    pub fallback_endpoint: String,
    /// Base URL relative track URLs are resolved against.
    pub base_url: String,
    /// User-Agent sent to the fallback endpoint, which rejects bare clients.
    pub user_agent: String,
    /// Per-request timeout for playlist requests (seconds).
    pub timeout_secs: u64,
}

impl Default for PlaylistSettings {
    fn default() -> Self {
        Self {
            graphql_endpoint: "https://btc.858webdesign.com/graphql".to_string(),
            fallback_endpoint:
                "https://backend.petereichhorst.com/wp-json/audio/v1/list?sort=mtime_desc"
                    .to_string(),
            base_url: "https://btc.858webdesign.com".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/119.0 Safari/537.36"
                .to_string(),
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Position ticker period (milliseconds).
    pub tick_ms: u64,
    /// Tolerance used when deciding a track has reached its end (seconds).
    pub end_epsilon_secs: f64,
    /// Initial output gain in decibels, within `[-30, 6]`.
    pub volume_db: f32,
    /// Fade-out duration when quitting (milliseconds).
    /// Set to 0 to stop immediately.
    pub quit_fade_out_ms: u64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            end_epsilon_secs: 0.1,
            volume_db: -6.0,
            quit_fade_out_ms: 400,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Start playing the first track as soon as it has loaded.
    pub autoplay: bool,
    /// What to do when a track fails to download or decode.
    pub on_load_failure: LoadFailureSetting,
}

#[derive(Debug, Copy, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LoadFailureSetting {
    /// Leave the failed track selected; the user can skip manually.
    #[default]
    #[serde(alias = "stay-stuck", alias = "stuck")]
    Stay,
    /// Move on to the next track automatically.
    #[serde(alias = "auto-skip", alias = "auto_skip", alias = "next")]
    Skip,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlsSettings {
    /// Number of seconds to seek when pressing `H` / `L`.
    pub seek_seconds: u64,
    /// Decibels added or removed per `+` / `-` press.
    pub volume_step_db: f32,
}

impl Default for ControlsSettings {
    fn default() -> Self {
        Self {
            seek_seconds: 5,
            volume_step_db: 3.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// The text rendered inside the top header box.
    pub header_text: String,
    /// Whether the cursor starts in "follow playback" mode.
    pub follow_playback: bool,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            header_text: " ~ live from the rehearsal room ~ ".to_string(),
            follow_playback: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `tracing` filter directive; `RUST_LOG` wins when set.
    pub level: String,
    /// Log file location. Defaults to the XDG state directory.
    pub file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info,hyper_util=warn,reqwest=warn,hyper=warn".to_string(),
            file: None,
        }
    }
}
