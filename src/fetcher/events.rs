use crate::catalog::ArtistSnapshot;
use std::fmt;

/// Work done so far in the current phase. `total` is `None` while the song
/// list is still being paged through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: Option<usize>,
}

impl Progress {
    pub fn paging(completed: usize) -> Self {
        Self {
            completed,
            total: None,
        }
    }

    pub fn lyrics(completed: usize, total: usize) -> Self {
        Self {
            completed,
            total: Some(total),
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.total {
            Some(total) => write!(f, "{}/{} songs", self.completed, total),
            None => write!(f, "{}/?", self.completed),
        }
    }
}

/// Messages from a background fetch to whoever started it.
#[derive(Debug, Clone)]
pub enum FetchEvent {
    Progress(Progress),
    Finished(ArtistSnapshot),
    NotFound { artist: String },
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_display() {
        assert_eq!(Progress::paging(100).to_string(), "100/?");
        assert_eq!(Progress::lyrics(3, 120).to_string(), "3/120 songs");
    }
}
