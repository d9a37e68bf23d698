//! Error types shared by the playlist source and the track loader.

use thiserror::Error;

/// Failure while fetching or parsing a playlist from one source.
#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error("playlist request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("playlist endpoint returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("malformed playlist JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected playlist shape: {0}")]
    Shape(&'static str),
}

/// Failure while downloading or decoding a single track.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("track download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("track download returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("failed to decode track: {0}")]
    Decode(String),

    #[error("track contains no audio")]
    Empty,

    #[error("could not start track loader: {0}")]
    Worker(#[from] std::io::Error),
}
