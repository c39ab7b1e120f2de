//! Publication crawl for one resolved author.
//!
//! Pages through `/works?filter=author.id:...` with cursor paging, pausing for
//! a short randomized courtesy delay between pages, then deduplicates on the
//! DOI (or the OpenAlex id when there is no DOI).

use crate::config::DelayRange;
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::openalex::{AuthorshipRecord, Endpoints, WorkRecord, WorksPage, START_CURSOR};
use crate::random::delay_in;
use crate::resolver::ResolvedAuthor;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// One listed author on a publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorship {
    pub author_display_name: Option<String>,
    /// Country of the first listed institution
    pub country_code: Option<String>,
}

impl From<AuthorshipRecord> for Authorship {
    fn from(record: AuthorshipRecord) -> Self {
        let country_code = record
            .institutions
            .and_then(|institutions| institutions.into_iter().next())
            .and_then(|first| first.country_code)
            .filter(|code| !code.trim().is_empty());
        Self {
            author_display_name: record.author.and_then(|a| a.display_name),
            country_code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub id: Option<String>,
    pub doi: Option<String>,
    pub title: Option<String>,
    pub year: Option<i32>,
    pub cited_by_count: u64,
    pub authorships: Vec<Authorship>,
}

impl Publication {
    /// DOI when present, else the OpenAlex id.
    pub fn dedup_key(&self) -> Option<&str> {
        self.doi
            .as_deref()
            .filter(|d| !d.is_empty())
            .or(self.id.as_deref())
    }
}

impl From<WorkRecord> for Publication {
    fn from(work: WorkRecord) -> Self {
        Self {
            id: work.id,
            doi: work.doi,
            title: work.title,
            year: work.publication_year,
            cited_by_count: work.cited_by_count.unwrap_or(0),
            authorships: work
                .authorships
                .unwrap_or_default()
                .into_iter()
                .map(Authorship::from)
                .collect(),
        }
    }
}

/// Keep the first publication per dedup key. Keyless records are kept as-is.
pub fn dedupe(publications: Vec<Publication>) -> Vec<Publication> {
    let mut seen = HashSet::new();
    publications
        .into_iter()
        .filter(|p| match p.dedup_key() {
            Some(key) => seen.insert(key.to_string()),
            None => true,
        })
        .collect()
}

/// Everything one crawl brought back, before dedup.
#[derive(Debug, Default)]
pub struct Crawl {
    pub publications: Vec<Publication>,
    /// Records skipped because they did not match the expected shape
    pub unreadable: usize,
}

/// A deduplicated publication set with at least one dated publication.
#[derive(Debug, Clone)]
pub struct AuthorWorks {
    pub publications: Vec<Publication>,
    pub first_year: i32,
    pub last_year: i32,
    pub unreadable: usize,
}

impl AuthorWorks {
    /// `None` when no publication carries a year.
    pub fn new(publications: Vec<Publication>) -> Option<Self> {
        let years = publications.iter().filter_map(|p| p.year);
        let (first_year, last_year) = years.fold(None, |span: Option<(i32, i32)>, y| {
            Some(span.map_or((y, y), |(lo, hi)| (lo.min(y), hi.max(y))))
        })?;
        Some(Self {
            publications,
            first_year,
            last_year,
            unreadable: 0,
        })
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.publications.iter().filter_map(|p| p.year)
    }
}

#[derive(Debug)]
pub enum CollectOutcome {
    Works(AuthorWorks),
    /// Nothing dated to work with. Normal for sparse or newly indexed authors.
    NoUsableData,
}

/// Crawls an author's works.
#[derive(Clone)]
pub struct WorkCollector {
    fetcher: Fetcher,
    endpoints: Endpoints,
    courtesy_delay: DelayRange,
}

impl WorkCollector {
    pub fn new(fetcher: Fetcher, endpoints: Endpoints, courtesy_delay: DelayRange) -> Self {
        Self {
            fetcher,
            endpoints,
            courtesy_delay,
        }
    }

    /// Every page of the author's works, in upstream order, before dedup.
    ///
    /// A page that fails or cannot be read ends the crawl; earlier pages are
    /// kept. So does a cursor the upstream has already handed out.
    pub async fn crawl(&self, author: &ResolvedAuthor) -> Result<Crawl> {
        let mut cursor = START_CURSOR.to_string();
        let mut seen_cursors = HashSet::from([cursor.clone()]);
        let mut crawl = Crawl::default();

        loop {
            let url = self.endpoints.author_works(&author.id, &cursor)?;
            debug!(url = %url, "Fetching works page");
            let response = self.fetcher.get(&url).await?;
            if !response.is_success() {
                warn!(
                    author = %author.display_name,
                    status = response.status.as_u16(),
                    fetched = crawl.publications.len(),
                    "Works page failed, keeping what was fetched"
                );
                break;
            }

            let page: WorksPage = match response.json() {
                Ok(page) => page,
                Err(e) => {
                    warn!(
                        author = %author.display_name,
                        error = %e,
                        fetched = crawl.publications.len(),
                        "Works page unreadable, keeping what was fetched"
                    );
                    break;
                }
            };
            if page.results.is_empty() {
                break;
            }
            let (meta, records, unreadable) = page.into_records();
            crawl.unreadable += unreadable;
            crawl.publications.extend(records.into_iter().map(Publication::from));
            info!(
                author = %author.display_name,
                fetched = crawl.publications.len(),
                unreadable = crawl.unreadable,
                total = ?meta.count,
                "Fetched works page"
            );

            match meta.next_cursor.filter(|c| !c.is_empty()) {
                Some(next) if !seen_cursors.insert(next.clone()) => {
                    warn!(
                        author = %author.display_name,
                        cursor = %next,
                        "Cursor repeated, stopping crawl"
                    );
                    break;
                }
                Some(next) => cursor = next,
                None => break,
            }

            let pause = delay_in(&**self.fetcher.random(), self.courtesy_delay);
            self.fetcher.sleeper().sleep(pause).await;
        }

        Ok(crawl)
    }

    /// Crawl, deduplicate, and check there is something dated to classify.
    pub async fn collect(&self, author: &ResolvedAuthor) -> Result<CollectOutcome> {
        let crawl = self.crawl(author).await?;
        let crawled_count = crawl.publications.len();
        let unique = dedupe(crawl.publications);
        debug!(
            author = %author.display_name,
            crawled = crawled_count,
            unique = unique.len(),
            unreadable = crawl.unreadable,
            "Deduplicated works"
        );

        Ok(match AuthorWorks::new(unique) {
            Some(mut works) => {
                works.unreadable = crawl.unreadable;
                info!(
                    author = %author.display_name,
                    works = works.publications.len(),
                    first_year = works.first_year,
                    last_year = works.last_year,
                    "Collected works"
                );
                CollectOutcome::Works(works)
            }
            None => CollectOutcome::NoUsableData,
        })
    }
}
