use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub type SongId = i64;

/// A song in the battle catalog. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: SongId,
    pub title: String,
    pub artist: String,
    /// Untagged songs are left out of genre affinity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default)]
    pub media_url: String,
}

impl Song {
    /// Genre tag, treating a blank tag as untagged.
    pub fn genre_tag(&self) -> Option<&str> {
        self.genre
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
    }
}

/// Read-only song list with id lookup.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    songs: Vec<Song>,
    index: HashMap<SongId, usize>,
}

impl Catalog {
    /// Build a catalog. Later duplicates of an id are dropped.
    pub fn new(songs: Vec<Song>) -> Self {
        let mut kept = Vec::with_capacity(songs.len());
        let mut index = HashMap::with_capacity(songs.len());
        for song in songs {
            if index.contains_key(&song.id) {
                continue;
            }
            index.insert(song.id, kept.len());
            kept.push(song);
        }
        Self { songs: kept, index }
    }

    /// Parse a JSON array of songs.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let songs: Vec<Song> = serde_json::from_str(json)?;
        Ok(Self::new(songs))
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn get(&self, id: SongId) -> Option<&Song> {
        self.index.get(&id).map(|&i| &self.songs[i])
    }

    pub fn ids(&self) -> Vec<SongId> {
        self.songs.iter().map(|s| s.id).collect()
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }
}
