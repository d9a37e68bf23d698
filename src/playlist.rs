//! Playlist source: fetches the ordered track list from the CMS.
//!
//! The primary source is the CMS GraphQL `btcPlaylist` query; when it yields
//! nothing the JSON list endpoint is tried instead. Any failure degrades to an
//! empty playlist, which the transport renders as "no tracks available".

mod model;
mod normalize;
mod source;

pub use model::{Playlist, Track};
pub use normalize::{normalize_url, title_from_url};
pub use source::{
    FallbackSource, GraphqlSource, PlaylistSource, build_sources, fetch_playlist,
    parse_fallback_playlist, parse_graphql_playlist,
};
