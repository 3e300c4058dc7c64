//! Upstream song catalog.
//!
//! The fetcher only talks to the catalog through [`CatalogApi`], so the
//! Genius client can be swapped for a scripted double in tests.

pub mod genius;
pub mod models;

pub use genius::GeniusClient;
pub use models::ArtistSnapshot;

use async_trait::async_trait;
use models::{ArtistIdentity, SongDetails, SongPage};

#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Best-effort name resolution. `Ok(None)` means the catalog has no match.
    async fn search_artist(&self, name: &str) -> anyhow::Result<Option<ArtistIdentity>>;

    /// One page of the artist's songs. Pages are 1-based.
    async fn list_songs(&self, artist_id: u64, page: u32, per_page: u32) -> anyhow::Result<SongPage>;

    async fn fetch_song(&self, song_id: u64) -> anyhow::Result<SongDetails>;

    /// Lyrics text behind a [`SongDetails::lyrics_url`]. Empty when the song has none.
    async fn fetch_lyrics(&self, lyrics_url: &str) -> anyhow::Result<String>;
}
