//! Phase definitions for one crawl run
//!
//! A run always moves forward through these phases and always reaches `Done`.

use std::fmt;

/// Represents the phase a crawl run is in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunPhase {
    /// Walking the sitemap index and category sitemaps
    Discover,

    /// Fetching and extracting detail pages one at a time
    DetailFetchLoop,

    /// Flushing whatever is still buffered
    FinalFlush,

    /// Run finished; summary available
    Done,
}

impl RunPhase {
    /// Returns true if no further processing happens in this phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Checks whether moving from `self` to `next` is a legal transition
    ///
    /// `Discover -> Done` is allowed for runs with nothing to fetch.
    pub fn can_transition_to(&self, next: RunPhase) -> bool {
        matches!(
            (self, next),
            (Self::Discover, Self::DetailFetchLoop)
                | (Self::Discover, Self::Done)
                | (Self::DetailFetchLoop, Self::FinalFlush)
                | (Self::FinalFlush, Self::Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discover => "discover",
            Self::DetailFetchLoop => "detail_fetch_loop",
            Self::FinalFlush => "final_flush",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
