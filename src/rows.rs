//! Output rows: one per qualifying publication.

use crate::career::CareerStage;
use crate::resolver::ResolvedAuthor;
use crate::works::Publication;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

/// Titles of front matter and notices rather than authored work.
static EXCLUDED_TITLES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(list of contributors|editorial board|erratum|acknowledgement|treatment)")
        .expect("title pattern is valid")
});

/// Column order of the output table.
pub const PAPER_COLUMNS: &[&str] = &[
    "author_name",
    "career_stage",
    "paper_title",
    "paper_year",
    "times_cited",
    "total_authors_listed",
    "coauthors",
    "coauthor_count",
    "coauthor_countries_counts",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaperRow {
    pub author_name: String,
    pub career_stage: CareerStage,
    pub paper_title: String,
    pub paper_year: i32,
    pub times_cited: u64,
    pub total_authors_listed: usize,
    /// Comma-separated, in listing order
    pub coauthors: String,
    pub coauthor_count: usize,
    #[serde(serialize_with = "as_json_object")]
    pub coauthor_countries_counts: BTreeMap<String, usize>,
}

fn as_json_object<S: Serializer>(
    counts: &BTreeMap<String, usize>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let text = serde_json::to_string(counts).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&text)
}

/// What happened to one publication.
#[derive(Debug, Clone, PartialEq)]
pub enum RowDecision {
    Emit(PaperRow),
    OutsideWindow,
    ExcludedTitle,
    /// Missing year, title, or author list
    Malformed,
}

/// Per-author tally of row decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowStats {
    pub emitted: usize,
    pub outside_window: usize,
    pub excluded_title: usize,
    pub malformed: usize,
}

impl RowStats {
    pub fn absorb(&mut self, other: RowStats) {
        self.emitted += other.emitted;
        self.outside_window += other.outside_window;
        self.excluded_title += other.excluded_title;
        self.malformed += other.malformed;
    }
}

pub fn is_excluded_title(title: &str) -> bool {
    EXCLUDED_TITLES.is_match(title)
}

/// Shapes publications of one resolved author into rows.
pub struct RowBuilder<'a> {
    author: &'a ResolvedAuthor,
    stage: CareerStage,
    years_of_interest: &'a BTreeSet<i32>,
}

impl<'a> RowBuilder<'a> {
    pub fn new(
        author: &'a ResolvedAuthor,
        stage: CareerStage,
        years_of_interest: &'a BTreeSet<i32>,
    ) -> Self {
        Self {
            author,
            stage,
            years_of_interest,
        }
    }

    pub fn decide(&self, publication: &Publication) -> RowDecision {
        let Some(year) = publication.year else {
            return RowDecision::Malformed;
        };
        if !self.years_of_interest.contains(&year) {
            return RowDecision::OutsideWindow;
        }

        let title = match publication.title.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => return RowDecision::Malformed,
        };
        if is_excluded_title(title) {
            return RowDecision::ExcludedTitle;
        }

        let authors: Vec<&str> = publication
            .authorships
            .iter()
            .filter_map(|a| a.author_display_name.as_deref())
            .collect();
        if authors.is_empty() {
            return RowDecision::Malformed;
        }

        let own_name = self.author.display_name.to_lowercase();
        let coauthors: Vec<&str> = authors
            .iter()
            .copied()
            .filter(|name| name.to_lowercase() != own_name)
            .collect();

        let mut countries: BTreeMap<String, usize> = BTreeMap::new();
        for code in publication
            .authorships
            .iter()
            .filter_map(|a| a.country_code.as_deref())
            .filter(|c| !c.is_empty())
        {
            *countries.entry(code.to_string()).or_insert(0) += 1;
        }

        RowDecision::Emit(PaperRow {
            author_name: self.author.display_name.clone(),
            career_stage: self.stage,
            paper_title: title.to_string(),
            paper_year: year,
            times_cited: publication.cited_by_count,
            total_authors_listed: authors.len(),
            coauthors: coauthors.join(", "),
            coauthor_count: coauthors.len(),
            coauthor_countries_counts: countries,
        })
    }

    /// Rows for `publications` in the given order, plus what was dropped.
    pub fn build(&self, publications: &[Publication]) -> (Vec<PaperRow>, RowStats) {
        let mut stats = RowStats::default();
        let mut rows = Vec::new();
        for publication in publications {
            match self.decide(publication) {
                RowDecision::Emit(row) => {
                    stats.emitted += 1;
                    rows.push(row);
                }
                RowDecision::OutsideWindow => stats.outside_window += 1,
                RowDecision::ExcludedTitle => stats.excluded_title += 1,
                RowDecision::Malformed => stats.malformed += 1,
            }
        }
        (rows, stats)
    }
}
