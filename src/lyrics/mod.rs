//! Lyrics text handling
//!
//! This module provides:
//! - extraction of plain lyrics from a song's web page
//! - word search over a cached artist snapshot

pub mod page;
pub mod search;

pub use search::{search, SearchMatch};
