//! Catalog and collection resolution.
//!
//! Matching is pure: the functions here decide which listing entries are
//! candidates. When no unique candidate exists (or the user asked to choose
//! manually) a [`Selector`] picks one; the CLI implements it as a console
//! prompt, tests implement it with canned answers.

use std::fmt;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::listing::RemoteDirEntry;

/// What a selection is being made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    /// Top-level catalog directory (e.g. "Redump").
    Catalog,
    /// System collection inside a catalog.
    Collection,
}

impl fmt::Display for SelectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Catalog => f.write_str("catalog"),
            Self::Collection => f.write_str("collection"),
        }
    }
}

/// Why a typed selection was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    /// The input is not an integer.
    NotANumber,
    /// The number is outside `1..=count`.
    OutOfRange,
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotANumber => f.write_str("Invalid number!"),
            Self::OutOfRange => f.write_str("Input number out of range!"),
        }
    }
}

/// Validates a 1-based menu selection and returns the 0-based index.
///
/// # Errors
///
/// Returns [`SelectionError`] for non-numeric or out-of-range input.
pub fn parse_selection(input: &str, count: usize) -> std::result::Result<usize, SelectionError> {
    let number: i64 = input
        .trim()
        .parse()
        .map_err(|_| SelectionError::NotANumber)?;
    usize::try_from(number)
        .ok()
        .filter(|n| (1..=count).contains(n))
        .map(|n| n - 1)
        .ok_or(SelectionError::OutOfRange)
}

/// Chooses one entry out of a list of candidate titles.
#[async_trait]
pub trait Selector: Send {
    /// Returns the 0-based index of the chosen candidate.
    ///
    /// `candidates` is never empty.
    async fn select(&mut self, kind: SelectionKind, candidates: &[String]) -> Result<usize>;
}

/// Result of matching a DAT name against collection titles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionMatch {
    /// A title equal to the name; scanning stopped here.
    Exact(usize),
    /// Titles containing the name, in listing order (possibly none).
    Partial(Vec<usize>),
}

impl CollectionMatch {
    /// Candidate indices regardless of match kind.
    #[must_use]
    pub fn candidates(&self) -> Vec<usize> {
        match self {
            Self::Exact(i) => vec![*i],
            Self::Partial(v) => v.clone(),
        }
    }
}

/// Indices of entries whose title contains `label` (case-sensitive).
#[must_use]
pub fn match_catalog(entries: &[RemoteDirEntry], label: &str) -> Vec<usize> {
    entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.title.contains(label))
        .map(|(i, _)| i)
        .collect()
}

/// Matches `name` against collection titles: an exact title wins outright,
/// otherwise every title containing `name` is a partial candidate.
#[must_use]
pub fn match_collection(entries: &[RemoteDirEntry], name: &str) -> CollectionMatch {
    let mut partial = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        if entry.title == name {
            return CollectionMatch::Exact(i);
        }
        if entry.title.contains(name) {
            partial.push(i);
        }
    }
    CollectionMatch::Partial(partial)
}

async fn choose<'a, S: Selector + ?Sized>(
    entries: &'a [RemoteDirEntry],
    indices: &[usize],
    kind: SelectionKind,
    selector: &mut S,
) -> Result<&'a RemoteDirEntry> {
    if indices.is_empty() {
        return Err(Error::Listing(format!("no {kind} entries to choose from")));
    }
    let titles: Vec<String> = indices.iter().map(|&i| entries[i].title.clone()).collect();
    let picked = selector.select(kind, &titles).await?;
    indices
        .get(picked)
        .map(|&i| &entries[i])
        .ok_or_else(|| Error::InvalidInput(format!("{kind} selection {} out of range", picked + 1)))
}

/// Picks the catalog directory for `label`.
///
/// A single title containing the label is used directly unless `manual` is
/// set. No label, no match, several matches or `manual` all fall back to
/// the selector over every entry.
///
/// # Errors
///
/// Returns [`Error::Listing`] if `entries` is empty, or whatever the
/// selector returns.
pub async fn resolve_catalog<'a, S: Selector + ?Sized>(
    entries: &'a [RemoteDirEntry],
    label: Option<&str>,
    manual: bool,
    selector: &mut S,
) -> Result<&'a RemoteDirEntry> {
    let matches = label.map(|l| match_catalog(entries, l)).unwrap_or_default();
    if !manual && let [only] = matches.as_slice() {
        return Ok(&entries[*only]);
    }

    log::debug!(
        "Catalog {label:?}: {} match(es), manual={manual}",
        matches.len()
    );
    let all: Vec<usize> = (0..entries.len()).collect();
    choose(entries, &all, SelectionKind::Catalog, selector).await
}

/// Picks the collection directory for a DAT named `name`.
///
/// One candidate (exact or a single partial) is used directly unless
/// `manual` is set. Several partial candidates without `manual` are offered
/// on their own; no candidate or `manual` offers the full listing.
///
/// # Errors
///
/// Returns [`Error::Listing`] if there is nothing to choose from, or
/// whatever the selector returns.
pub async fn resolve_collection<'a, S: Selector + ?Sized>(
    entries: &'a [RemoteDirEntry],
    name: &str,
    manual: bool,
    selector: &mut S,
) -> Result<&'a RemoteDirEntry> {
    let candidates = match_collection(entries, name).candidates();

    let offered: Vec<usize> = match candidates.len() {
        1 if !manual => return Ok(&entries[candidates[0]]),
        n if n > 1 && !manual => candidates,
        _ => (0..entries.len()).collect(),
    };
    choose(entries, &offered, SelectionKind::Collection, selector).await
}
