//! On-disk artist cache: one JSON document per artist in a flat directory.

use crate::catalog::ArtistSnapshot;
use anyhow::Context;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const FILE_SUFFIX: &str = "_lyrics.json";

#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn open(dir: &Path) -> anyhow::Result<Self> {
        fs::create_dir_all(dir).with_context(|| format!("create dir {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Fails when `artist_name` cannot name a cache document.
    pub fn check_key(&self, artist_name: &str) -> anyhow::Result<()> {
        validate_key(artist_name)
    }

    pub fn exists(&self, artist_name: &str) -> bool {
        self.document_path(artist_name)
            .map(|p| p.is_file())
            .unwrap_or(false)
    }

    /// Cached snapshot for `artist_name`, or `None` when missing or unreadable.
    pub fn load(&self, artist_name: &str) -> Option<ArtistSnapshot> {
        let path = match self.document_path(artist_name) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("cache lookup for {artist_name:?} skipped: {e:#}");
                return None;
            }
        };

        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("read {}: {e}", path.display());
                return None;
            }
        };

        match serde_json::from_str::<ArtistSnapshot>(&raw) {
            Ok(snapshot) if !snapshot.artist.name.trim().is_empty() => Some(snapshot),
            Ok(_) => {
                tracing::warn!("corrupt cache entry {}: empty artist name", path.display());
                None
            }
            Err(e) => {
                tracing::warn!("corrupt cache entry {}: {e}", path.display());
                None
            }
        }
    }

    /// Replace the document for `artist_name`. Readers see either the old or
    /// the new document, never a partial one.
    pub fn save(&self, artist_name: &str, snapshot: &ArtistSnapshot) -> anyhow::Result<()> {
        let path = self.document_path(artist_name)?;
        let raw = serde_json::to_vec(snapshot).context("serialize artist snapshot")?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("create temp file in {}", self.dir.display()))?;
        tmp.write_all(&raw).context("write artist snapshot")?;
        tmp.as_file().sync_all().context("sync artist snapshot")?;
        tmp.persist(&path)
            .with_context(|| format!("replace {}", path.display()))?;

        tracing::debug!("cached {} songs in {}", snapshot.songs.len(), path.display());
        Ok(())
    }

    pub fn remove(&self, artist_name: &str) -> anyhow::Result<()> {
        let path = self.document_path(artist_name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", path.display())),
        }
    }

    /// Names of every cached artist, sorted.
    pub fn list_artists(&self) -> anyhow::Result<Vec<String>> {
        let entries =
            fs::read_dir(&self.dir).with_context(|| format!("read dir {}", self.dir.display()))?;

        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|e| {
                let file_name = e.file_name().into_string().ok()?;
                let name = file_name.strip_suffix(FILE_SUFFIX)?;
                (!name.is_empty()).then(|| name.to_string())
            })
            .collect();
        names.sort();
        Ok(names)
    }

    fn document_path(&self, artist_name: &str) -> anyhow::Result<PathBuf> {
        validate_key(artist_name)?;
        Ok(self.dir.join(format!("{artist_name}{FILE_SUFFIX}")))
    }
}

/// The artist name is used verbatim as the file stem, so it has to stay a
/// single path component.
fn validate_key(artist_name: &str) -> anyhow::Result<()> {
    if artist_name.trim().is_empty() {
        anyhow::bail!("artist name is empty");
    }
    if artist_name.contains(['/', '\\', '\0']) || artist_name == "." || artist_name == ".." {
        anyhow::bail!("artist name {artist_name:?} cannot be used as a cache key");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::models::{Artist, SongRecord};

    fn make_snapshot(name: &str, songs: usize) -> ArtistSnapshot {
        ArtistSnapshot {
            artist: Artist {
                name: name.to_string(),
                image_url: Some(format!("https://images/{name}.jpg")),
            },
            songs: (0..songs)
                .map(|i| SongRecord {
                    title: format!("Song {i}"),
                    lyrics: format!("[Chorus]\nline {i}\n"),
                })
                .collect(),
        }
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path()).unwrap();
        let snapshot = make_snapshot("Sigur Rós", 3);

        assert!(!store.exists("Sigur Rós"));
        store.save("Sigur Rós", &snapshot).unwrap();
        assert!(store.exists("Sigur Rós"));
        assert_eq!(store.load("Sigur Rós"), Some(snapshot));
    }

    #[test]
    fn test_document_named_after_artist() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path()).unwrap();
        store.save("Adele", &make_snapshot("Adele", 1)).unwrap();

        assert!(dir.path().join("Adele_lyrics.json").is_file());
        assert_eq!(store.list_artists().unwrap(), vec!["Adele"]);
    }

    #[test]
    fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path()).unwrap();
        store.save("Adele", &make_snapshot("Adele", 5)).unwrap();
        store.save("Adele", &make_snapshot("Adele", 2)).unwrap();

        assert_eq!(store.load("Adele").unwrap().songs.len(), 2);
        // No temp files left behind.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_corrupt_document_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path()).unwrap();
        fs::write(dir.path().join("Adele_lyrics.json"), "{\"artist\": {\"na").unwrap();

        assert!(store.exists("Adele"));
        assert!(store.load("Adele").is_none());
    }

    #[test]
    fn test_empty_artist_name_in_document_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path()).unwrap();
        fs::write(
            dir.path().join("Adele_lyrics.json"),
            r#"{"artist": {"name": ""}, "songs": []}"#,
        )
        .unwrap();

        assert!(store.load("Adele").is_none());
    }

    #[test]
    fn test_list_artists() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path()).unwrap();
        store.save("Muse", &make_snapshot("Muse", 1)).unwrap();
        store.save("Blur", &make_snapshot("Blur", 1)).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        assert_eq!(store.list_artists().unwrap(), vec!["Blur", "Muse"]);
    }

    #[test]
    fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path()).unwrap();
        store.save("Muse", &make_snapshot("Muse", 1)).unwrap();

        store.remove("Muse").unwrap();
        assert!(!store.exists("Muse"));
        store.remove("Muse").unwrap();
    }

    #[test]
    fn test_rejects_path_like_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(dir.path()).unwrap();

        assert!(store.save("../evil", &make_snapshot("x", 0)).is_err());
        assert!(store.save("", &make_snapshot("x", 0)).is_err());
        assert!(!store.exists("a/b"));
        assert!(store.load("..").is_none());
        assert!(store.check_key("AC/DC").is_err());
        assert!(store.check_key("Sigur Rós").is_ok());
    }
}
