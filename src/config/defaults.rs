use super::{Config, FetchConfig, GeniusConfig, PathsConfig};
use directories::ProjectDirs;
use std::path::PathBuf;

pub const GENIUS_BASE_URL: &str = "https://api.genius.com";
pub const TIMEOUT_SECS: u64 = 60;
pub const PAGE_SIZE: u32 = 50;
pub const PAGE_DELAY_MS: u64 = 500;

pub fn data_dir() -> PathBuf {
    ProjectDirs::from("dev", "lyricscan", "lyricscan")
        .map(|p| p.data_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("lyricscan"))
}

pub fn defaults() -> Config {
    Config {
        paths: PathsConfig::default(),
        genius: GeniusConfig::default(),
        fetch: FetchConfig::default(),
    }
}
