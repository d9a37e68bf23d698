use std::sync::Arc;

/// One playable entry. Immutable once fetched; duplicates are allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// Absolute, normalized audio URL.
    pub url: String,
    pub title: Option<String>,
}

impl Track {
    /// Title to show for the track at `index`, falling back to its position.
    pub fn label(&self, index: usize) -> String {
        match self.title.as_deref() {
            Some(t) if !t.trim().is_empty() => t.to_string(),
            _ => format!("Track {}", index + 1),
        }
    }
}

/// Ordered track list. Position is the only identity a track has.
///
/// Cloning is cheap so snapshots can carry the list to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    tracks: Arc<[Track]>,
}

impl Playlist {
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }
}

impl Default for Playlist {
    fn default() -> Self {
        Self::from(Vec::new())
    }
}

impl From<Vec<Track>> for Playlist {
    fn from(tracks: Vec<Track>) -> Self {
        Self {
            tracks: Arc::from(tracks),
        }
    }
}
