//! Word search over a cached artist snapshot.

use crate::catalog::ArtistSnapshot;
use once_cell::sync::Lazy;
use regex::Regex;

/// Section labels and other annotations: `[Chorus]`, `[Verse 2: Artist]`.
static ANNOTATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[.*?\]").unwrap());

/// Lines of one song containing the searched word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMatch {
    pub song_title: String,
    pub matching_lines: Vec<String>,
}

impl SearchMatch {
    /// The single entry returned when nothing matched anywhere.
    pub fn not_found(word: &str, artist_name: &str) -> Self {
        Self {
            song_title: format!("Word '{word}' not found in any song of artist '{artist_name}'."),
            matching_lines: Vec::new(),
        }
    }
}

/// Case-insensitive substring search, one entry per song with at least one
/// matching line. Annotations are ignored when matching but kept in the
/// returned lines.
pub fn search(word: &str, snapshot: &ArtistSnapshot, artist_name: &str) -> Vec<SearchMatch> {
    let word = word.to_lowercase();

    let mut result: Vec<SearchMatch> = snapshot
        .songs
        .iter()
        .filter(|song| !song.lyrics.is_empty())
        .filter_map(|song| {
            let matching_lines: Vec<String> = song
                .lyrics
                .split('\n')
                .filter(|line| line_matches(line, &word))
                .map(str::to_string)
                .collect();
            (!matching_lines.is_empty()).then(|| SearchMatch {
                song_title: song.title.clone(),
                matching_lines,
            })
        })
        .collect();

    if result.is_empty() {
        result.push(SearchMatch::not_found(&word, artist_name));
    }
    result
}

fn line_matches(line: &str, lowered_word: &str) -> bool {
    ANNOTATION
        .replace_all(line, "")
        .to_lowercase()
        .contains(lowered_word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::models::{Artist, SongRecord};

    fn snapshot(songs: &[(&str, &str)]) -> ArtistSnapshot {
        ArtistSnapshot {
            artist: Artist {
                name: "Test Artist".to_string(),
                image_url: None,
            },
            songs: songs
                .iter()
                .map(|(title, lyrics)| SongRecord {
                    title: title.to_string(),
                    lyrics: lyrics.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_search_returns_original_lines() {
        let snap = snapshot(&[("A", "[Verse]\nI love the sun\n"), ("B", "Nothing here\n")]);
        let result = search("sun", &snap, "Test Artist");
        assert_eq!(
            result,
            vec![SearchMatch {
                song_title: "A".to_string(),
                matching_lines: vec!["I love the sun".to_string()],
            }]
        );
    }

    #[test]
    fn test_annotations_are_not_searchable() {
        let snap = snapshot(&[("A", "[Verse]\nI love the sun\n"), ("B", "Nothing here\n")]);
        let result = search("verse", &snap, "Test Artist");
        assert_eq!(result, vec![SearchMatch::not_found("verse", "Test Artist")]);
    }

    #[test]
    fn test_matching_line_keeps_annotation() {
        let snap = snapshot(&[("A", "[Hook: Sun Ra] Here comes the SUN [x2]")]);
        let result = search("sun", &snap, "Test Artist");
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].matching_lines, vec!["[Hook: Sun Ra] Here comes the SUN [x2]"]);
    }

    #[test]
    fn test_case_insensitive_query() {
        let snap = snapshot(&[("A", "Sunny days\nrainy nights"), ("B", "SUNSET")]);
        let result = search("SUN", &snap, "Test Artist");
        let titles: Vec<_> = result.iter().map(|m| m.song_title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B"]);
        assert_eq!(result[0].matching_lines, vec!["Sunny days"]);
    }

    #[test]
    fn test_not_found_sentinel() {
        let snap = snapshot(&[("A", "[Verse]\nI love the sun\n"), ("B", "")]);
        let result = search("zzz", &snap, "Test Artist");
        assert_eq!(result.len(), 1);
        assert_eq!(
            result[0].song_title,
            "Word 'zzz' not found in any song of artist 'Test Artist'."
        );
        assert!(result[0].matching_lines.is_empty());
    }

    #[test]
    fn test_songs_without_lyrics_are_skipped() {
        let snap = snapshot(&[("Instrumental", ""), ("B", "sun")]);
        let result = search("", &snap, "Test Artist");
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].song_title, "B");
    }
}
