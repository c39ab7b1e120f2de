//! Author disambiguation.
//!
//! A cleaned name is searched on `/authors` and the candidates are ranked by
//! three ordered rules: exact display name, exact alternate name, then the
//! upstream's own first result. When the full name returns no candidates at
//! all, the search is repeated with just the first and last tokens.

use crate::error::Result;
use crate::fetch::Fetcher;
use crate::names::first_last;
use crate::openalex::{AuthorRecord, AuthorSearchResponse, Endpoints};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// Canonical identity an input name was resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAuthor {
    pub id: String,
    pub display_name: String,
    pub alternate_names: BTreeSet<String>,
}

/// Which query produced the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Primary,
    Fallback,
}

/// Which rule picked the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    DisplayName,
    AlternateName,
    TopRanked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub author: ResolvedAuthor,
    pub strategy: Strategy,
    pub rule: MatchRule,
}

/// Pick the best candidate for `name`. Candidates without an id or display
/// name are ignored.
pub fn best_match(name: &str, candidates: &[AuthorRecord]) -> Option<(ResolvedAuthor, MatchRule)> {
    let target = name.trim().to_lowercase();
    let usable: Vec<(&AuthorRecord, &str, &str)> = candidates
        .iter()
        .filter_map(|c| Some((c, c.id.as_deref()?, c.display_name.as_deref()?)))
        .collect();

    let by_display = usable
        .iter()
        .find(|(_, _, display)| display.trim().to_lowercase() == target)
        .map(|c| (c, MatchRule::DisplayName));
    let by_alternate = || {
        usable
            .iter()
            .find(|(record, _, _)| {
                record
                    .alternate_names()
                    .any(|alt| alt.trim().to_lowercase() == target)
            })
            .map(|c| (c, MatchRule::AlternateName))
    };
    let top = || usable.first().map(|c| (c, MatchRule::TopRanked));

    let ((record, id, display), rule) = by_display.or_else(by_alternate).or_else(top)?;
    let author = ResolvedAuthor {
        id: id.to_string(),
        display_name: display.to_string(),
        alternate_names: record.alternate_names().map(str::to_string).collect(),
    };
    Some((author, rule))
}

/// Resolves names against the upstream author catalog.
#[derive(Clone)]
pub struct AuthorResolver {
    fetcher: Fetcher,
    endpoints: Endpoints,
}

impl AuthorResolver {
    pub fn new(fetcher: Fetcher, endpoints: Endpoints) -> Self {
        Self { fetcher, endpoints }
    }

    /// Ranked candidates for `name`. A failed response counts as no candidates.
    pub async fn search(&self, name: &str) -> Result<Vec<AuthorRecord>> {
        let url = self.endpoints.author_search(name)?;
        debug!(url = %url, "Searching authors");
        let response = self.fetcher.get(&url).await?;
        if !response.is_success() {
            warn!(
                name = name,
                status = response.status.as_u16(),
                "Author search failed"
            );
            return Ok(Vec::new());
        }
        let parsed: AuthorSearchResponse = response.json()?;
        Ok(parsed.results)
    }

    /// Full-name resolution, then first+last fallback when nothing came back.
    pub async fn resolve(&self, name: &str) -> Result<Option<Resolution>> {
        if name.trim().is_empty() {
            return Ok(None);
        }

        let candidates = self.search(name).await?;
        if !candidates.is_empty() {
            return Ok(best_match(name, &candidates).map(|(author, rule)| Resolution {
                author,
                strategy: Strategy::Primary,
                rule,
            }));
        }

        let Some(reduced) = first_last(name) else {
            debug!(name = name, "No fallback query for single-token name");
            return Ok(None);
        };
        info!(name = name, fallback = %reduced, "No candidates, trying first/last name");

        let candidates = self.search(&reduced).await?;
        Ok(best_match(&reduced, &candidates).map(|(author, rule)| Resolution {
            author,
            strategy: Strategy::Fallback,
            rule,
        }))
    }
}
