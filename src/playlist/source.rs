use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::config::PlaylistSettings;
use crate::error::PlaylistError;

use super::model::{Playlist, Track};
use super::normalize::{clean_title, normalize_url, strip_extension, title_from_url};

const PLAYLIST_QUERY: &str = r#"
  query Playlist {
    btcPlaylist {
      title
      audioUrl
    }
  }
"#;

const FALLBACK_ACCEPT: &str = "application/json,text/plain,*/*";

/// Something that can produce an ordered list of tracks.
pub trait PlaylistSource: Send {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn fetch(&self) -> Result<Vec<Track>, PlaylistError>;
}

/// Primary source: the CMS GraphQL `btcPlaylist` field.
pub struct GraphqlSource {
    client: Client,
    endpoint: String,
    base_url: String,
}

impl GraphqlSource {
    pub fn new(client: Client, endpoint: String, base_url: String) -> Self {
        Self {
            client,
            endpoint,
            base_url,
        }
    }
}

impl PlaylistSource for GraphqlSource {
    fn name(&self) -> &'static str {
        "graphql"
    }

    fn fetch(&self) -> Result<Vec<Track>, PlaylistError> {
        let body = json!({ "query": PLAYLIST_QUERY, "variables": {} });
        let response = self.client.post(&self.endpoint).json(&body).send()?;
        if !response.status().is_success() {
            return Err(PlaylistError::Status(response.status()));
        }
        let text = response.text()?;
        parse_graphql_playlist(&text, &self.base_url)
    }
}

/// Fallback source: a JSON array of `{ url, name }` entries, newest last.
pub struct FallbackSource {
    client: Client,
    endpoint: String,
    base_url: String,
    user_agent: String,
}

impl FallbackSource {
    pub fn new(client: Client, endpoint: String, base_url: String, user_agent: String) -> Self {
        Self {
            client,
            endpoint,
            base_url,
            user_agent,
        }
    }
}

impl PlaylistSource for FallbackSource {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn fetch(&self) -> Result<Vec<Track>, PlaylistError> {
        let response = self
            .client
            .get(&self.endpoint)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, FALLBACK_ACCEPT)
            .send()?;
        if !response.status().is_success() {
            return Err(PlaylistError::Status(response.status()));
        }
        let text = response.text()?;
        parse_fallback_playlist(&text, &self.base_url)
    }
}

#[derive(Deserialize)]
struct GraphqlResponse {
    data: Option<GraphqlData>,
    #[serde(default)]
    errors: Vec<GraphqlErrorEntry>,
}

#[derive(Deserialize)]
struct GraphqlData {
    #[serde(rename = "btcPlaylist")]
    btc_playlist: Option<Value>,
}

#[derive(Deserialize)]
struct GraphqlErrorEntry {
    message: Option<String>,
}

/// Parse a GraphQL `btcPlaylist` response body into tracks.
///
/// Entries without a string `audioUrl` are skipped; an explicit title wins
/// over one derived from the file name.
pub fn parse_graphql_playlist(body: &str, base_url: &str) -> Result<Vec<Track>, PlaylistError> {
    let response: GraphqlResponse = serde_json::from_str(body)?;

    if let Some(first) = response.errors.first() {
        let message = first
            .message
            .clone()
            .unwrap_or_else(|| "GraphQL error".to_string());
        return Err(PlaylistError::GraphQl(message));
    }

    let entries = match response.data.and_then(|d| d.btc_playlist) {
        Some(Value::Array(entries)) => entries,
        _ => return Err(PlaylistError::Shape("btcPlaylist missing or not a list")),
    };

    let tracks = entries
        .iter()
        .filter_map(|entry| {
            let raw_url = entry.get("audioUrl").and_then(Value::as_str)?;
            let url = normalize_url(raw_url, base_url)?;
            let title = entry
                .get("title")
                .and_then(Value::as_str)
                .and_then(clean_title)
                .or_else(|| title_from_url(&url));
            Some(Track { url, title })
        })
        .collect();

    Ok(tracks)
}

/// Parse the fallback endpoint's JSON array into tracks.
///
/// The endpoint lists oldest first, so the result is reversed.
pub fn parse_fallback_playlist(body: &str, base_url: &str) -> Result<Vec<Track>, PlaylistError> {
    let value: Value = serde_json::from_str(body)?;
    let Value::Array(entries) = value else {
        return Err(PlaylistError::Shape("expected a JSON array"));
    };

    let mut tracks: Vec<Track> = entries
        .iter()
        .filter_map(|entry| {
            let raw_url = entry.get("url").and_then(Value::as_str)?;
            let url = normalize_url(raw_url, base_url)?;
            let title = entry
                .get("name")
                .and_then(Value::as_str)
                .and_then(|name| clean_title(strip_extension(name.trim())))
                .or_else(|| title_from_url(&url));
            Some(Track { url, title })
        })
        .collect();
    tracks.reverse();

    Ok(tracks)
}

/// Try each source in order and return the first non-empty playlist.
///
/// Never fails: if every source errors or comes back empty the result is an
/// empty playlist.
pub fn fetch_playlist(sources: &[Box<dyn PlaylistSource>]) -> Playlist {
    for source in sources {
        match source.fetch() {
            Ok(tracks) if !tracks.is_empty() => {
                info!(
                    source = source.name(),
                    count = tracks.len(),
                    "loaded playlist"
                );
                return Playlist::from(tracks);
            }
            Ok(_) => warn!(source = source.name(), "playlist source returned no tracks"),
            Err(e) => warn!(source = source.name(), error = %e, "playlist source failed"),
        }
    }

    warn!("no playlist source produced any tracks");
    Playlist::default()
}

/// Build the primary and fallback sources from settings.
pub fn build_sources(
    settings: &PlaylistSettings,
) -> Result<Vec<Box<dyn PlaylistSource>>, PlaylistError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()?;

    Ok(vec![
        Box::new(GraphqlSource::new(
            client.clone(),
            settings.graphql_endpoint.clone(),
            settings.base_url.clone(),
        )),
        Box::new(FallbackSource::new(
            client,
            settings.fallback_endpoint.clone(),
            settings.base_url.clone(),
            settings.user_agent.clone(),
        )),
    ])
}
