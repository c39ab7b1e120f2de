//! Career stage from the span of an author's dated publications.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CareerStage {
    #[serde(rename = "Early-career")]
    EarlyCareer,
    #[serde(rename = "Mid-career")]
    MidCareer,
    #[serde(rename = "Senior")]
    Senior,
}

impl CareerStage {
    /// Stage for a career running from `first_year` to `last_year` inclusive.
    pub fn from_span(first_year: i32, last_year: i32) -> Self {
        let career_length = last_year - first_year + 1;
        if career_length <= 5 {
            CareerStage::EarlyCareer
        } else if career_length <= 15 {
            CareerStage::MidCareer
        } else {
            CareerStage::Senior
        }
    }

    /// Stage over a set of publication years; `None` when there are no years.
    pub fn classify(years: impl IntoIterator<Item = i32>) -> Option<Self> {
        let (first, last) = years
            .into_iter()
            .fold(None, |span: Option<(i32, i32)>, year| match span {
                None => Some((year, year)),
                Some((lo, hi)) => Some((lo.min(year), hi.max(year))),
            })?;
        Some(Self::from_span(first, last))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CareerStage::EarlyCareer => "Early-career",
            CareerStage::MidCareer => "Mid-career",
            CareerStage::Senior => "Senior",
        }
    }
}

impl fmt::Display for CareerStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
