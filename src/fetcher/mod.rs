//! Artist catalog download.
//!
//! A fetch checks the cache first; on a miss it resolves the artist, pages
//! through the song list, downloads lyrics song by song and persists the
//! finished snapshot. Network failures after artist resolution only shrink
//! the result: a failed page ends pagination, a failed song is skipped.

pub mod events;

pub use events::{FetchEvent, Progress};

use crate::catalog::models::{ArtistIdentity, SongRecord, SongSummary};
use crate::catalog::{ArtistSnapshot, CatalogApi};
use crate::config::FetchConfig;
use crate::storage::CacheStore;
use anyhow::Context;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Progress callback. Invoked from the task running the fetch, one call at a time.
pub type ProgressFn<'a> = dyn Fn(Progress) + Send + Sync + 'a;

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub page_size: u32,
    /// Pause before every page request after the first.
    pub page_delay: Duration,
    /// Upper bound for any single catalog call.
    pub request_timeout: Duration,
}

impl FetchOptions {
    pub fn from_config(cfg: &FetchConfig, request_timeout: Duration) -> Self {
        Self {
            page_size: cfg.page_size.max(1),
            page_delay: cfg.page_delay(),
            request_timeout,
        }
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            page_size: 50,
            page_delay: Duration::from_millis(500),
            request_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Found(ArtistSnapshot),
    /// The catalog has no artist by that name.
    NotFound,
}

type KeyLocks = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

pub struct CatalogFetcher<C> {
    api: C,
    store: CacheStore,
    options: FetchOptions,
    in_flight: KeyLocks,
}

/// Per-artist lock slot; dropped entries are removed once nobody waits on them.
struct InFlight<'a> {
    locks: &'a KeyLocks,
    key: String,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // One reference in the map, one here.
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.key);
        }
    }
}

impl<C: CatalogApi> CatalogFetcher<C> {
    pub fn new(api: C, store: CacheStore, options: FetchOptions) -> Self {
        Self {
            api,
            store,
            options,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Snapshot for `artist_name`, from the cache unless `force_refresh`.
    ///
    /// Fetches for the same artist never overlap: a second caller waits for
    /// the first and, unless refreshing, reuses what it saved.
    pub async fn fetch(
        &self,
        artist_name: &str,
        progress: Option<&ProgressFn<'_>>,
        force_refresh: bool,
    ) -> anyhow::Result<FetchOutcome> {
        self.store.check_key(artist_name)?;

        if !force_refresh && let Some(snapshot) = self.cached(artist_name).await? {
            tracing::debug!("cache hit for {artist_name:?}");
            return Ok(FetchOutcome::Found(snapshot));
        }

        let slot = self.in_flight_slot(artist_name);
        let _guard = slot.lock.lock().await;

        // Another fetch may have filled the cache while we waited.
        if !force_refresh && let Some(snapshot) = self.cached(artist_name).await? {
            tracing::debug!("joined in-flight fetch for {artist_name:?}");
            return Ok(FetchOutcome::Found(snapshot));
        }

        self.fetch_from_catalog(artist_name, progress).await
    }

    /// Fill in a missing `image_url` on a cached snapshot and re-save it.
    /// Returns `None` when nothing is cached for `artist_name`.
    pub async fn backfill_image_url(&self, artist_name: &str) -> anyhow::Result<Option<ArtistSnapshot>> {
        self.store.check_key(artist_name)?;
        let slot = self.in_flight_slot(artist_name);
        let _guard = slot.lock.lock().await;

        let Some(mut snapshot) = self.cached(artist_name).await? else {
            return Ok(None);
        };
        if snapshot.artist.image_url.is_some() {
            return Ok(Some(snapshot));
        }

        match self.bounded("artist search", self.api.search_artist(artist_name)).await {
            Ok(Some(ArtistIdentity {
                image_url: Some(url),
                ..
            })) => {
                tracing::info!("backfilled image for {artist_name:?}");
                snapshot.artist.image_url = Some(url);
                snapshot = self.persist(artist_name, snapshot).await?;
            }
            Ok(_) => tracing::debug!("no image available for {artist_name:?}"),
            Err(e) => tracing::warn!("image lookup for {artist_name:?} failed: {e:#}"),
        }
        Ok(Some(snapshot))
    }

    async fn fetch_from_catalog(
        &self,
        artist_name: &str,
        progress: Option<&ProgressFn<'_>>,
    ) -> anyhow::Result<FetchOutcome> {
        let identity = self
            .bounded("artist search", self.api.search_artist(artist_name))
            .await
            .with_context(|| format!("search artist {artist_name:?}"))?;
        let Some(identity) = identity else {
            tracing::info!("artist {artist_name:?} not found");
            return Ok(FetchOutcome::NotFound);
        };
        tracing::info!("fetching {:?} (id {})", identity.name, identity.id);

        let summaries = self.collect_song_list(&identity, progress).await;
        let songs = self.collect_lyrics(&summaries, progress).await;
        tracing::info!(
            "fetched {}/{} songs for {:?}",
            songs.len(),
            summaries.len(),
            identity.name
        );

        let snapshot = self
            .persist(artist_name, ArtistSnapshot::new(&identity, songs))
            .await?;
        Ok(FetchOutcome::Found(snapshot))
    }

    async fn collect_song_list(
        &self,
        identity: &ArtistIdentity,
        progress: Option<&ProgressFn<'_>>,
    ) -> Vec<SongSummary> {
        let mut songs = Vec::new();
        let mut page = 1u32;

        loop {
            if page > 1 && !self.options.page_delay.is_zero() {
                tokio::time::sleep(self.options.page_delay).await;
            }

            let result = self
                .bounded(
                    "song list page",
                    self.api.list_songs(identity.id, page, self.options.page_size),
                )
                .await;
            let batch = match result {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::warn!(
                        "song list page {page} for {:?} failed, keeping {} songs: {e:#}",
                        identity.name,
                        songs.len()
                    );
                    break;
                }
            };

            tracing::debug!("page {page}: {} songs", batch.songs.len());
            let empty = batch.songs.is_empty();
            songs.extend(batch.songs);
            report(progress, Progress::paging(songs.len()));

            if !batch.has_next_page || empty {
                break;
            }
            page += 1;
        }

        songs
    }

    async fn collect_lyrics(
        &self,
        summaries: &[SongSummary],
        progress: Option<&ProgressFn<'_>>,
    ) -> Vec<SongRecord> {
        let total = summaries.len();
        let mut records = Vec::with_capacity(total);

        for (idx, summary) in summaries.iter().enumerate() {
            match self.fetch_song_record(summary).await {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("skipping song {} ({:?}): {e:#}", summary.id, summary.title)
                }
            }
            report(progress, Progress::lyrics(idx + 1, total));
        }

        records
    }

    async fn fetch_song_record(&self, summary: &SongSummary) -> anyhow::Result<SongRecord> {
        let details = self
            .bounded("song details", self.api.fetch_song(summary.id))
            .await?;
        let lyrics = self
            .bounded("lyrics", self.api.fetch_lyrics(&details.lyrics_url))
            .await?;

        let title = if details.title.trim().is_empty() {
            summary.title.clone()
        } else {
            details.title
        };
        if title.trim().is_empty() {
            anyhow::bail!("song has no title");
        }
        Ok(SongRecord { title, lyrics })
    }

    async fn cached(&self, artist_name: &str) -> anyhow::Result<Option<ArtistSnapshot>> {
        if !self.store.exists(artist_name) {
            return Ok(None);
        }
        let store = self.store.clone();
        let key = artist_name.to_string();
        tokio::task::spawn_blocking(move || store.load(&key))
            .await
            .context("join cache reader")
    }

    async fn persist(&self, artist_name: &str, snapshot: ArtistSnapshot) -> anyhow::Result<ArtistSnapshot> {
        let store = self.store.clone();
        let key = artist_name.to_string();
        tokio::task::spawn_blocking(move || store.save(&key, &snapshot).map(|()| snapshot))
            .await
            .context("join cache writer")?
            .with_context(|| format!("save cache for {artist_name:?}"))
    }

    async fn bounded<T>(
        &self,
        what: &str,
        call: impl Future<Output = anyhow::Result<T>>,
    ) -> anyhow::Result<T> {
        match tokio::time::timeout(self.options.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => anyhow::bail!("{what} timed out after {:?}", self.options.request_timeout),
        }
    }

    fn in_flight_slot(&self, artist_name: &str) -> InFlight<'_> {
        let mut locks = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        let lock = locks.entry(artist_name.to_string()).or_default().clone();
        InFlight {
            locks: &self.in_flight,
            key: artist_name.to_string(),
            lock,
        }
    }
}

impl<C: CatalogApi + 'static> CatalogFetcher<C> {
    /// Run [`fetch`](Self::fetch) on a background task, reporting through `tx`.
    /// The fetch runs to completion even if the receiver goes away.
    pub fn spawn_fetch(
        self: &Arc<Self>,
        artist_name: String,
        force_refresh: bool,
        tx: mpsc::UnboundedSender<FetchEvent>,
    ) -> JoinHandle<()> {
        let fetcher = Arc::clone(self);
        tokio::spawn(async move {
            let progress_tx = tx.clone();
            let send_progress = move |p: Progress| {
                let _ = progress_tx.send(FetchEvent::Progress(p));
            };
            let on_progress: &ProgressFn<'_> = &send_progress;

            let event = match fetcher.fetch(&artist_name, Some(on_progress), force_refresh).await {
                Ok(FetchOutcome::Found(snapshot)) => FetchEvent::Finished(snapshot),
                Ok(FetchOutcome::NotFound) => FetchEvent::NotFound { artist: artist_name },
                Err(e) => FetchEvent::Failed(format!("{e:#}")),
            };
            let _ = tx.send(event);
        })
    }
}

fn report(progress: Option<&ProgressFn<'_>>, p: Progress) {
    if let Some(observer) = progress {
        observer(p);
    }
}
