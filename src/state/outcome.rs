//! Outcome of fetching and extracting a single detail page

use crate::model::{JobPosting, Tombstone};

/// What a detail fetch produced for one sitemap entry
#[derive(Debug, Clone, PartialEq)]
pub enum DetailOutcome {
    /// A posting was extracted by one of the two strategies
    Posting(Box<JobPosting>),

    /// The source answered 404; the posting is gone
    Removed(Tombstone),

    /// Network error, unexpected status, or nothing extractable on the page
    Failed { id: String, reason: String },
}

impl DetailOutcome {
    pub fn id(&self) -> &str {
        match self {
            Self::Posting(posting) => &posting.id,
            Self::Removed(tombstone) => &tombstone.id,
            Self::Failed { id, .. } => id,
        }
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Posting(_) => OutcomeKind::Succeeded,
            Self::Removed(_) => OutcomeKind::Deleted,
            Self::Failed { .. } => OutcomeKind::Failed,
        }
    }
}

/// Counting bucket for an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Succeeded,
    Deleted,
    Failed,
}
