use serde::{Deserialize, Deserializer, Serialize};

/// Everything cached for one artist: identity plus every song's lyrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistSnapshot {
    pub artist: Artist,
    #[serde(default)]
    pub songs: Vec<SongRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub name: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongRecord {
    pub title: String,
    /// Older documents store `null` for songs without lyrics.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub lyrics: String,
}

/// Artist as resolved by the catalog's search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistIdentity {
    pub id: u64,
    pub name: String,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongSummary {
    pub id: u64,
    pub title: String,
}

/// One page of an artist's song list.
#[derive(Debug, Clone, Default)]
pub struct SongPage {
    pub songs: Vec<SongSummary>,
    pub has_next_page: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongDetails {
    pub title: String,
    /// Where the lyrics text can be retrieved from (the song's web page).
    pub lyrics_url: String,
}

impl ArtistSnapshot {
    pub fn new(identity: &ArtistIdentity, songs: Vec<SongRecord>) -> Self {
        Self {
            artist: Artist {
                name: identity.name.clone(),
                image_url: identity.image_url.clone(),
            },
            songs,
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
