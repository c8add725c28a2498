//! Search results parsing and best-candidate selection.
//!
//! Parsing is synchronous and returns owned data so no HTML document is held
//! across an await point.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use super::StageError;

/// Rows of the results table considered during selection.
pub const MAX_RESULT_ROWS: usize = 20;

fn compile_static_selector(selector: &str) -> Selector {
    Selector::parse(selector).unwrap_or_else(|e| panic!("invalid static selector '{selector}': {e:?}"))
}

static RESULTS_TABLE: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("table.sub-table"));
static RESULT_ROW: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("tbody tr"));
static CELL: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("td"));
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("a"));
static ENGLISH_DOWNLOAD: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector("a#download_en"));

/// How result titles are matched against the identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Identifier must appear (case-insensitively) in the title.
    #[default]
    Strict,
    /// Punctuation-insensitive match on title or link, or the identifier's
    /// letter prefix appearing in either.
    Normalized,
}

/// One row scraped from the results table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Anchor text.
    pub title: String,
    /// Anchor link target.
    pub href: String,
    /// Download count column, 0 when unparseable.
    pub download_count: u64,
}

/// Parses up to [`MAX_RESULT_ROWS`] result rows and keeps those matching `identifier`.
///
/// # Errors
///
/// Returns [`StageError::NoResultsTable`] when the page has no results table.
pub fn parse_candidates(
    html: &str,
    identifier: &str,
    mode: MatchMode,
) -> Result<Vec<Candidate>, StageError> {
    let document = Html::parse_document(html);
    let table = document
        .select(&RESULTS_TABLE)
        .next()
        .ok_or(StageError::NoResultsTable)?;

    let candidates = table
        .select(&RESULT_ROW)
        .take(MAX_RESULT_ROWS)
        .filter_map(parse_row)
        .filter(|candidate| matches_identifier(candidate, identifier, mode))
        .collect();

    Ok(candidates)
}

fn parse_row(row: ElementRef<'_>) -> Option<Candidate> {
    let anchor = row.select(&ANCHOR).next()?;
    let href = anchor.value().attr("href")?.trim().to_string();
    let title = anchor.text().collect::<String>().trim().to_string();

    let cells: Vec<ElementRef<'_>> = row.select(&CELL).collect();
    let download_count = cells
        .len()
        .checked_sub(2)
        .and_then(|index| cells.get(index))
        .map_or(0, |cell| parse_download_count(&cell.text().collect::<String>()));

    Some(Candidate {
        title,
        href,
        download_count,
    })
}

/// Leading whitespace-separated token as a decimal count, 0 otherwise.
#[must_use]
pub fn parse_download_count(text: &str) -> u64 {
    text.split_whitespace()
        .next()
        .and_then(|token| token.parse().ok())
        .unwrap_or(0)
}

/// Returns true if `candidate` is a result for `identifier` under `mode`.
#[must_use]
pub fn matches_identifier(candidate: &Candidate, identifier: &str, mode: MatchMode) -> bool {
    let title = candidate.title.to_lowercase();
    let id = identifier.to_lowercase();

    match mode {
        MatchMode::Strict => title.contains(&id),
        MatchMode::Normalized => {
            let href = candidate.href.to_lowercase();
            let norm_id = normalize(identifier);
            if !norm_id.is_empty()
                && (normalize(&candidate.title).contains(&norm_id)
                    || normalize(&candidate.href).contains(&norm_id))
            {
                return true;
            }
            let prefix = alphabetic_prefix(identifier);
            !prefix.is_empty() && (title.contains(&prefix) || href.contains(&prefix))
        }
    }
}

/// Lowercases and strips everything but letters and digits.
#[must_use]
pub fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn alphabetic_prefix(identifier: &str) -> String {
    identifier
        .chars()
        .take_while(char::is_ascii_alphabetic)
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Picks the candidate with the strictly highest download count.
///
/// The running maximum starts at 0, so a zero-count candidate is never
/// selected; ties keep the earliest candidate.
#[must_use]
pub fn select_best(candidates: &[Candidate]) -> Option<&Candidate> {
    let mut best = None;
    let mut most_downloads = 0;
    for candidate in candidates {
        if candidate.download_count > most_downloads {
            most_downloads = candidate.download_count;
            best = Some(candidate);
        }
    }
    best
}

/// Extracts the English download link from a result page.
#[must_use]
pub fn find_english_link(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&ENGLISH_DOWNLOAD)
        .next()
        .and_then(|anchor| anchor.value().attr("href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
}
