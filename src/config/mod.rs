use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod defaults;

/// Environment variable that takes precedence over `genius.access_token`.
pub const ACCESS_TOKEN_ENV: &str = "GENIUS_ACCESS_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub genius: GeniusConfig,
    pub fetch: FetchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    /// Directory holding one `<artist>_lyrics.json` per artist.
    /// Defaults to `<data_dir>/lyrics`.
    pub cache_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeniusConfig {
    /// Genius API client access token.
    pub access_token: Option<String>,
    pub base_url: String,
    /// Upper bound for every single HTTP request.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Songs requested per catalog page.
    pub page_size: u32,
    /// Pause between two consecutive page requests.
    pub page_delay_ms: u64,
}

impl Config {
    pub fn cache_dir(&self) -> PathBuf {
        self.paths
            .cache_dir
            .clone()
            .unwrap_or_else(|| self.paths.data_dir.join("lyrics"))
    }

    pub fn access_token(&self) -> Option<String> {
        std::env::var(ACCESS_TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.genius.access_token.clone())
            .filter(|t| !t.trim().is_empty())
    }
}

impl GeniusConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl FetchConfig {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        defaults::defaults()
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: defaults::data_dir(),
            cache_dir: None,
        }
    }
}

impl Default for GeniusConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            base_url: defaults::GENIUS_BASE_URL.to_string(),
            timeout_secs: defaults::TIMEOUT_SECS,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: defaults::PAGE_SIZE,
            page_delay_ms: defaults::PAGE_DELAY_MS,
        }
    }
}

pub fn save(cfg: &Config, override_path: Option<&Path>) -> anyhow::Result<()> {
    let path = match override_path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };
    write_config(&path, cfg)
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let proj = ProjectDirs::from("dev", "lyricscan", "lyricscan")
        .context("ProjectDirs unavailable")?;
    Ok(proj.config_dir().join("config.toml"))
}

pub fn load(override_path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match override_path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };

    if !path.exists() {
        let cfg = defaults::defaults();
        write_config(&path, &cfg)?;
        return Ok(cfg);
    }

    let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let cfg = toml::from_str::<Config>(&raw).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

fn write_config(path: &Path, cfg: &Config) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }
    let raw = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(path, raw).with_context(|| format!("write {}", path.display()))?;
    // The file may carry an access token.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }
    Ok(())
}
