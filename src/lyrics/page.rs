//! Lyrics extraction from a song's web page
//!
//! The lyrics body is split across one or more containers:
//! <div data-lyrics-container="true">Line one<br/>Line <i>two</i></div>
//!
//! Containers may nest other divs, so each one is closed by depth counting
//! rather than by the first `</div>`.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static CONTAINER_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<div[^>]*\bdata-lyrics-container="true"[^>]*>"#).unwrap());
static DIV_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<(/?)div\b[^>]*>").unwrap());
static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").unwrap());

/// Plain lyrics text from a song page. Empty when the page has no lyrics
/// (instrumentals, unreleased songs).
pub fn extract_lyrics(html: &str) -> String {
    let blocks: Vec<&str> = CONTAINER_OPEN
        .find_iter(html)
        .filter_map(|open| container_body(html, open.end()))
        .collect();

    if blocks.is_empty() {
        return String::new();
    }

    let joined = blocks.join("\n");
    let with_breaks = LINE_BREAK.replace_all(&joined, "\n");
    let text = ANY_TAG.replace_all(&with_breaks, "");
    decode_entities(&text).trim().to_string()
}

/// Inner HTML of the div whose opening tag ends at `start`.
fn container_body(html: &str, start: usize) -> Option<&str> {
    let mut depth = 1usize;
    for tag in DIV_TAG.captures_iter(&html[start..]) {
        let whole = tag.get(0)?;
        if tag[1].is_empty() {
            depth += 1;
        } else {
            depth -= 1;
            if depth == 0 {
                return Some(&html[start..start + whole.start()]);
            }
        }
    }
    None
}

fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            let decoded = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = name.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match name {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    _ => None,
                }
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_single_container() {
        let html = r#"<html><body>
<div class="header">Menu</div>
<div data-lyrics-container="true" class="Lyrics__Container">[Verse 1]<br/>I love the <i>sun</i><br>It&#x27;s warm &amp; bright</div>
<div class="footer">About</div>
</body></html>"#;
        assert_eq!(
            extract_lyrics(html),
            "[Verse 1]\nI love the sun\nIt's warm & bright"
        );
    }

    #[test]
    fn test_extract_nested_divs_and_multiple_containers() {
        let html = concat!(
            r#"<div data-lyrics-container="true">First<br/><div class="ad"><div>x</div></div>Second</div>"#,
            r#"<p>between</p>"#,
            r#"<div data-lyrics-container="true">Third</div>"#,
        );
        assert_eq!(extract_lyrics(html), "First\nxSecond\nThird");
    }

    #[test]
    fn test_page_without_lyrics() {
        let html = r#"<div class="LyricsPlaceholder">This song is an instrumental</div>"#;
        assert_eq!(extract_lyrics(html), "");
    }

    #[test]
    fn test_unclosed_container_is_ignored() {
        let html = r#"<div data-lyrics-container="true">never closed"#;
        assert_eq!(extract_lyrics(html), "");
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("&quot;hi&quot; &#39;x&#39; &lt;3"), "\"hi\" 'x' <3");
        assert_eq!(decode_entities("&unknown; stays"), "&unknown; stays");
    }
}
