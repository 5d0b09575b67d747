//! List query state: free-text search and server-side sort order

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Server-side ordering of the note list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    TitleAsc,
    TitleDesc,
}

impl SortKey {
    pub const ALL: [Self; 4] = [Self::Newest, Self::Oldest, Self::TitleAsc, Self::TitleDesc];

    /// Value of the `sort` query parameter understood by the service
    #[must_use]
    pub const fn as_wire(self) -> &'static str {
        match self {
            Self::Newest => "created",
            Self::Oldest => "-created",
            Self::TitleAsc => "title",
            Self::TitleDesc => "-title",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::Oldest => "oldest",
            Self::TitleAsc => "title-asc",
            Self::TitleDesc => "title-desc",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sort key '{0}' (expected newest, oldest, title-asc or title-desc)")]
pub struct ParseSortKeyError(String);

impl FromStr for SortKey {
    type Err = ParseSortKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        Self::ALL
            .into_iter()
            .find(|key| {
                key.as_wire() == value
                    || key.label().eq_ignore_ascii_case(value)
            })
            .ok_or_else(|| ParseSortKeyError(value.to_string()))
    }
}

/// Parameters of the next list fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteQuery {
    pub search_term: String,
    pub sort_key: SortKey,
    pub limit: Option<u32>,
}

impl NoteQuery {
    /// Query string pairs; an empty search term and an absent limit are omitted.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(3);
        if !self.search_term.is_empty() {
            pairs.push(("q", self.search_term.clone()));
        }
        pairs.push(("sort", self.sort_key.as_wire().to_string()));
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}
