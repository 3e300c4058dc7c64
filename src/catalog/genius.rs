//! Genius API client
//!
//! Metadata comes from the REST API (https://docs.genius.com); lyrics are not
//! exposed there and are read from the song's web page instead.

use super::models::{ArtistIdentity, SongDetails, SongPage, SongSummary};
use super::CatalogApi;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    response: T,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    result: HitResult,
}

#[derive(Debug, Deserialize)]
struct HitResult {
    primary_artist: Option<GeniusArtist>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeniusArtist {
    id: u64,
    name: String,
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SongsResponse {
    songs: Option<Vec<GeniusSongSummary>>,
    next_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GeniusSongSummary {
    id: u64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct SongResponse {
    song: GeniusSong,
}

#[derive(Debug, Deserialize)]
struct GeniusSong {
    title: String,
    url: String,
}

#[derive(Debug)]
struct Inner {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

/// Authenticated session with the Genius API. Cheap to clone.
#[derive(Debug, Clone)]
pub struct GeniusClient {
    inner: Arc<Inner>,
}

impl GeniusClient {
    const USER_AGENT: &'static str = "lyricscan/0.1.0 (https://github.com/lyricscan)";

    pub fn new(base_url: &str, access_token: &str, timeout: Duration) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(Self::USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/html"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("build reqwest client")?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base_url: base_url.trim_end_matches('/').to_string(),
                access_token: access_token.to_string(),
            }),
        })
    }

    async fn api_get<T: DeserializeOwned>(&self, path_and_query: &str) -> anyhow::Result<T> {
        let url = format!("{}{}", self.inner.base_url, path_and_query);
        let envelope: Envelope<T> = self
            .inner
            .http
            .get(&url)
            .bearer_auth(&self.inner.access_token)
            .send()
            .await
            .with_context(|| format!("send GET {path_and_query}"))?
            .error_for_status()
            .with_context(|| format!("GET {path_and_query} http status"))?
            .json()
            .await
            .with_context(|| format!("parse GET {path_and_query} json"))?;
        Ok(envelope.response)
    }
}

#[async_trait]
impl CatalogApi for GeniusClient {
    async fn search_artist(&self, name: &str) -> anyhow::Result<Option<ArtistIdentity>> {
        let path = format!("/search?q={}", urlencoding::encode(name));
        let resp: SearchResponse = self.api_get(&path).await?;
        Ok(pick_artist(&resp.hits, name).map(|a| ArtistIdentity {
            id: a.id,
            name: a.name.clone(),
            image_url: a.image_url.clone().filter(|u| !u.is_empty()),
        }))
    }

    async fn list_songs(&self, artist_id: u64, page: u32, per_page: u32) -> anyhow::Result<SongPage> {
        let path = format!("/artists/{artist_id}/songs?page={page}&per_page={per_page}&sort=title");
        let resp: SongsResponse = self.api_get(&path).await?;
        let songs = resp
            .songs
            .with_context(|| format!("artist {artist_id} page {page}: no songs in response"))?;
        Ok(SongPage {
            songs: songs
                .into_iter()
                .map(|s| SongSummary { id: s.id, title: s.title })
                .collect(),
            has_next_page: resp.next_page.is_some(),
        })
    }

    async fn fetch_song(&self, song_id: u64) -> anyhow::Result<SongDetails> {
        let resp: SongResponse = self.api_get(&format!("/songs/{song_id}")).await?;
        Ok(SongDetails {
            title: resp.song.title,
            lyrics_url: resp.song.url,
        })
    }

    async fn fetch_lyrics(&self, lyrics_url: &str) -> anyhow::Result<String> {
        let html = self
            .inner
            .http
            .get(lyrics_url)
            .send()
            .await
            .with_context(|| format!("send GET {lyrics_url}"))?
            .error_for_status()
            .with_context(|| format!("GET {lyrics_url} http status"))?
            .text()
            .await
            .context("read lyrics page body")?;
        Ok(crate::lyrics::page::extract_lyrics(&html))
    }
}

/// Prefer a hit whose artist matches the query exactly (ignoring case),
/// otherwise trust the catalog's ranking.
fn pick_artist<'a>(hits: &'a [SearchHit], name: &str) -> Option<&'a GeniusArtist> {
    let wanted = name.trim().to_lowercase();
    let mut artists = hits.iter().filter_map(|h| h.result.primary_artist.as_ref());
    let first = artists.clone().next();
    artists.find(|a| a.name.trim().to_lowercase() == wanted).or(first)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hits(raw: &str) -> Vec<SearchHit> {
        let env: Envelope<SearchResponse> = serde_json::from_str(raw).unwrap();
        env.response.hits
    }

    const SEARCH_JSON: &str = r#"{
        "meta": {"status": 200},
        "response": {"hits": [
            {"type": "song", "result": {"title": "Ms. Jackson", "primary_artist": {"id": 1, "name": "OutKast feat. Someone", "image_url": "a.png"}}},
            {"type": "song", "result": {"title": "Hey Ya!", "primary_artist": {"id": 2, "name": "OutKast", "image_url": "b.png"}}}
        ]}
    }"#;

    #[test]
    fn test_pick_artist_prefers_exact_name() {
        let hits = hits(SEARCH_JSON);
        let artist = pick_artist(&hits, "outkast").unwrap();
        assert_eq!(artist.id, 2);
    }

    #[test]
    fn test_pick_artist_falls_back_to_first_hit() {
        let hits = hits(SEARCH_JSON);
        let artist = pick_artist(&hits, "Andre 3000").unwrap();
        assert_eq!(artist.id, 1);
    }

    #[test]
    fn test_pick_artist_no_hits() {
        let hits = hits(r#"{"response": {"hits": []}}"#);
        assert!(pick_artist(&hits, "nobody").is_none());
    }

    #[test]
    fn test_songs_page_shape() {
        let raw = r#"{"response": {"songs": [{"id": 7, "title": "Roses"}], "next_page": 2}}"#;
        let env: Envelope<SongsResponse> = serde_json::from_str(raw).unwrap();
        assert_eq!(env.response.next_page, Some(2));
        assert_eq!(env.response.songs.unwrap()[0].title, "Roses");

        let last = r#"{"response": {"songs": [], "next_page": null}}"#;
        let env: Envelope<SongsResponse> = serde_json::from_str(last).unwrap();
        assert!(env.response.next_page.is_none());
    }
}
