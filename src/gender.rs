//! Coauthor gender tally over an external first-name classifier.
//!
//! No classifier ships with this crate; callers plug one in through
//! [`GenderClassifier`].

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    MostlyMale,
    Female,
    MostlyFemale,
    Androgynous,
    Unknown,
}

/// Maps a first name to a gender label.
pub trait GenderClassifier {
    fn classify(&self, first_name: &str) -> Gender;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GenderCounts {
    #[serde(rename = "M")]
    pub male: usize,
    #[serde(rename = "F")]
    pub female: usize,
}

/// Tally a comma-separated coauthor list by the first token of each name.
/// Androgynous and unknown names are not counted.
pub fn count_coauthor_genders(coauthors: &str, classifier: &dyn GenderClassifier) -> GenderCounts {
    let mut counts = GenderCounts::default();
    let first_names = coauthors
        .split(',')
        .filter_map(|name| name.split_whitespace().next());
    for first in first_names {
        match classifier.classify(first) {
            Gender::Male | Gender::MostlyMale => counts.male += 1,
            Gender::Female | Gender::MostlyFemale => counts.female += 1,
            Gender::Androgynous | Gender::Unknown => {}
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Lookup;

    impl GenderClassifier for Lookup {
        fn classify(&self, first_name: &str) -> Gender {
            match first_name.to_lowercase().as_str() {
                "john" => Gender::Male,
                "sam" => Gender::Androgynous,
                "jane" => Gender::Female,
                "maria" => Gender::MostlyFemale,
                _ => Gender::Unknown,
            }
        }
    }

    #[test]
    fn test_counts_by_first_name() {
        let counts = count_coauthor_genders("John Smith, Jane Doe, MARIA Silva, Sam Lee, X", &Lookup);
        assert_eq!(counts, GenderCounts { male: 1, female: 2 });
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(count_coauthor_genders("", &Lookup), GenderCounts::default());
        assert_eq!(count_coauthor_genders(" , ", &Lookup), GenderCounts::default());
    }

    #[test]
    fn test_serializes_with_short_keys() {
        let json = serde_json::to_string(&GenderCounts { male: 3, female: 1 }).expect("json");
        assert_eq!(json, r#"{"M":3,"F":1}"#);
    }
}
