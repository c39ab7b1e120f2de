//! Author name cleanup.

use regex::Regex;
use std::sync::LazyLock;

/// Credentials and honorifics dropped from input names.
static CREDENTIALS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i),?\s*\b(?:MD|PhD|RN|MS|MPH|FACS|MBA|DO|PA|NP|BSN|MSN|DDS|DMD|Dr|CCNS|CNS|FCCM|FAAN|CRNA|CNM|DNP|ANP|FNP|PCCN|CEN|CPN|BCPS|CCR[MN]-?K?|FASA|FCCP|CNSC|CPPS|CHCQM|MBBS|BA|BS|MA|PharmD)\b\.?",
    )
    .expect("credential pattern is valid")
});

static SEPARATOR_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[, ]{2,}").expect("separator pattern is valid"));

/// Strip credential suffixes and titles from a free-text name.
///
/// `"John P. Doe, MD"` becomes `"John P. Doe"`. Returns an empty string for
/// blank input.
pub fn clean_author_name(raw: &str) -> String {
    let stripped = CREDENTIALS.replace_all(raw, "");
    let collapsed = SEPARATOR_RUNS.replace_all(&stripped, " ");
    collapsed.trim_matches(|c: char| c == ' ' || c == ',').to_string()
}

/// First and last whitespace-separated tokens, or `None` for single-token names.
pub fn first_last(name: &str) -> Option<String> {
    let mut tokens = name.split_whitespace();
    let first = tokens.next()?;
    let last = tokens.last()?;
    Some(format!("{} {}", first, last))
}
