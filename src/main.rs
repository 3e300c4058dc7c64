mod catalog;
mod config;
mod fetcher;
mod lyrics;
mod storage;

use anyhow::Context;
use catalog::{ArtistSnapshot, GeniusClient};
use clap::{Parser, Subcommand};
use fetcher::{CatalogFetcher, FetchEvent, FetchOptions};
use std::io::Write;
use std::sync::Arc;
use storage::CacheStore;
use tokio::sync::mpsc;
use tracing::Level;

type Fetcher = CatalogFetcher<GeniusClient>;

#[derive(Debug, Parser)]
#[command(name = "lyricscan", version, about = "Search an artist's lyrics for a word")]
struct Cli {
    /// Override config file path.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// More log output (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print every lyrics line of an artist containing a word.
    Search {
        artist: String,
        word: String,
        /// Download again even if the artist is cached.
        #[arg(long)]
        refresh: bool,
    },
    /// Download and cache an artist without searching.
    Fetch {
        artist: String,
        #[arg(long)]
        refresh: bool,
    },
    /// Re-download a cached artist.
    Update { artist: String },
    /// List cached artists.
    Artists,
    /// Show what is cached for an artist.
    Info { artist: String },
    /// Drop an artist from the cache.
    Remove { artist: String },
    /// Store a Genius API access token in the config file.
    Token {
        /// Omit to clear the stored token.
        token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let cfg = config::load(cli.config.as_deref()).context("load config")?;
    let store = CacheStore::open(&cfg.cache_dir()).context("open cache")?;

    match cli.command {
        Command::Search {
            artist,
            word,
            refresh,
        } => {
            let fetcher = make_fetcher(&cfg, store)?;
            let snapshot = fetch_with_progress(&fetcher, &artist, refresh).await?;
            print_matches(&lyrics::search(&word, &snapshot, &artist));
        }
        Command::Fetch { artist, refresh } => {
            let fetcher = make_fetcher(&cfg, store)?;
            let snapshot = fetch_with_progress(&fetcher, &artist, refresh).await?;
            println!("{}: {} songs cached.", snapshot.artist.name, snapshot.songs.len());
        }
        Command::Update { artist } => {
            if !store.exists(&artist) {
                anyhow::bail!("Artist '{artist}' is not cached.");
            }
            let fetcher = make_fetcher(&cfg, store)?;
            let snapshot = fetch_with_progress(&fetcher, &artist, true).await?;
            println!("{}: {} songs cached.", snapshot.artist.name, snapshot.songs.len());
        }
        Command::Artists => {
            let artists = store.list_artists()?;
            if artists.is_empty() {
                println!("No saved artists found.");
            }
            for name in artists {
                println!("{name}");
            }
        }
        Command::Info { artist } => {
            let snapshot = if cfg.access_token().is_some() {
                make_fetcher(&cfg, store.clone())?
                    .backfill_image_url(&artist)
                    .await?
            } else {
                store.load(&artist)
            };
            let snapshot = snapshot.with_context(|| format!("Artist '{artist}' is not cached."))?;
            print_info(&snapshot);
        }
        Command::Remove { artist } => {
            store.remove(&artist)?;
            println!("Removed {artist}.");
        }
        Command::Token { token } => {
            let mut cfg = cfg;
            cfg.genius.access_token = token.filter(|t| !t.trim().is_empty());
            config::save(&cfg, cli.config.as_deref()).context("save config")?;
            if cfg.genius.access_token.is_some() {
                println!("Updated access token in config.");
            } else {
                println!("Cleared access token from config.");
            }
        }
    }

    Ok(())
}

fn make_fetcher(cfg: &config::Config, store: CacheStore) -> anyhow::Result<Arc<Fetcher>> {
    let token = cfg.access_token().with_context(|| {
        format!(
            "no Genius access token: set {} or genius.access_token in the config file",
            config::ACCESS_TOKEN_ENV
        )
    })?;
    let timeout = cfg.genius.timeout();
    let client = GeniusClient::new(&cfg.genius.base_url, &token, timeout)?;
    let options = FetchOptions::from_config(&cfg.fetch, timeout);
    Ok(Arc::new(CatalogFetcher::new(client, store, options)))
}

/// Run the fetch in the background and draw its progress on stderr.
async fn fetch_with_progress(
    fetcher: &Arc<Fetcher>,
    artist: &str,
    force_refresh: bool,
) -> anyhow::Result<ArtistSnapshot> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let task = fetcher.spawn_fetch(artist.to_string(), force_refresh, tx);

    let mut snapshot = None;
    let mut drew_progress = false;
    while let Some(event) = rx.recv().await {
        match event {
            FetchEvent::Progress(p) => {
                let mut err = std::io::stderr().lock();
                let _ = write!(err, "\rLoading {artist}: {p}    ");
                let _ = err.flush();
                drew_progress = true;
            }
            FetchEvent::Finished(s) => snapshot = Some(s),
            FetchEvent::NotFound { artist } => {
                if drew_progress {
                    eprintln!();
                }
                anyhow::bail!("Artist '{artist}' not found.");
            }
            FetchEvent::Failed(msg) => {
                if drew_progress {
                    eprintln!();
                }
                anyhow::bail!("fetch {artist}: {msg}");
            }
        }
    }
    if drew_progress {
        eprintln!();
    }

    task.await.context("join fetch task")?;
    snapshot.with_context(|| format!("fetch {artist}: task ended without a result"))
}

fn print_matches(matches: &[lyrics::SearchMatch]) {
    for (i, m) in matches.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{}", m.song_title);
        for line in &m.matching_lines {
            println!("  {line}");
        }
    }
}

fn print_info(snapshot: &ArtistSnapshot) {
    println!("Artist: {}", snapshot.artist.name);
    println!(
        "Image:  {}",
        snapshot.artist.image_url.as_deref().unwrap_or("-")
    );
    println!("Songs:  {}", snapshot.songs.len());
    let with_lyrics = snapshot.songs.iter().filter(|s| !s.lyrics.is_empty()).count();
    println!("        {with_lyrics} with lyrics");
}
