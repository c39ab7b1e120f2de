//! OpenAlex wire types and endpoint URLs.
//!
//! API notes (per OpenAlex docs):
//! - `mailto` puts requests in the polite pool
//! - `per-page` is capped at 200
//! - cursor paging starts at `cursor=*` and ends when `meta.next_cursor` is null

use crate::config::CollectConfig;
use crate::error::Result;
use serde::Deserialize;
use tracing::debug;
use url::Url;

/// Reserved cursor value that starts a paged crawl
pub const START_CURSOR: &str = "*";

/// Builds request URLs against one API base.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: String,
    mailto: Option<String>,
    search_limit: u32,
    page_size: u32,
}

impl Endpoints {
    pub fn from_config(config: &CollectConfig) -> Self {
        Self {
            base: config.api_base.trim_end_matches('/').to_string(),
            mailto: config.mailto.clone(),
            search_limit: config.search_limit,
            page_size: config.page_size,
        }
    }

    /// Author search by display name.
    pub fn author_search(&self, name: &str) -> Result<String> {
        // Commas separate filters in OpenAlex, so they cannot appear in a value
        let value = name.replace(',', " ");
        let mut url = Url::parse(&format!("{}/authors", self.base))?;
        url.query_pairs_mut()
            .append_pair("filter", &format!("display_name.search:{}", value.trim()))
            .append_pair("per-page", &self.search_limit.to_string());
        self.finish(url)
    }

    /// One page of an author's works.
    pub fn author_works(&self, author_id: &str, cursor: &str) -> Result<String> {
        let mut url = Url::parse(&format!("{}/works", self.base))?;
        url.query_pairs_mut()
            .append_pair("filter", &format!("author.id:{}", short_id(author_id)))
            .append_pair("per-page", &self.page_size.to_string())
            .append_pair("cursor", cursor);
        self.finish(url)
    }

    fn finish(&self, mut url: Url) -> Result<String> {
        if let Some(email) = &self.mailto {
            url.query_pairs_mut().append_pair("mailto", email);
        }
        Ok(url.into())
    }
}

/// `https://openalex.org/A5023888391` -> `A5023888391`
pub fn short_id(id: &str) -> &str {
    id.trim_end_matches('/').rsplit('/').next().unwrap_or(id)
}

/// `/authors` response
#[derive(Debug, Deserialize)]
pub struct AuthorSearchResponse {
    #[serde(default)]
    pub results: Vec<AuthorRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorRecord {
    pub id: Option<String>,
    pub display_name: Option<String>,
    #[serde(default, alias = "alternate_names")]
    pub display_name_alternatives: Option<Vec<Option<String>>>,
}

impl AuthorRecord {
    pub fn alternate_names(&self) -> impl Iterator<Item = &str> {
        self.display_name_alternatives
            .iter()
            .flatten()
            .filter_map(|n| n.as_deref())
    }
}

/// `/works` response. Records stay untyped until [`WorksPage::into_records`]
/// parses them one at a time.
#[derive(Debug, Deserialize)]
pub struct WorksPage {
    #[serde(default)]
    pub meta: WorksMeta,
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
}

impl WorksPage {
    /// Records that match [`WorkRecord`], plus how many did not.
    pub fn into_records(self) -> (WorksMeta, Vec<WorkRecord>, usize) {
        let mut records = Vec::with_capacity(self.results.len());
        let mut unreadable = 0;
        for value in self.results {
            match serde_json::from_value::<WorkRecord>(value) {
                Ok(record) => records.push(record),
                Err(e) => {
                    debug!(error = %e, "Skipping unreadable work record");
                    unreadable += 1;
                }
            }
        }
        (self.meta, records, unreadable)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct WorksMeta {
    pub count: Option<u64>,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkRecord {
    pub id: Option<String>,
    pub doi: Option<String>,
    pub title: Option<String>,
    pub publication_year: Option<i32>,
    pub cited_by_count: Option<u64>,
    pub authorships: Option<Vec<AuthorshipRecord>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorshipRecord {
    pub author: Option<AuthorRef>,
    #[serde(default)]
    pub institutions: Option<Vec<InstitutionRecord>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorRef {
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstitutionRecord {
    pub country_code: Option<String>,
}
