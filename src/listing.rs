//! Directory listing pages and the remote file index.
//!
//! Mirror listings are HTML pages with a `<table id="list">`; every body row
//! links one entry, and the first body row is the parent-directory link.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::config::DuplicatePolicy;
use crate::dat::strip_extension;
use crate::error::{Error, Result};

static ROW_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table#list tbody tr").expect("valid selector"));

static TABLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table#list").expect("valid selector"));

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a").expect("valid selector"));

/// One row of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDirEntry {
    /// Display name (the anchor's `title`).
    pub title: String,
    /// Link relative to the listing page.
    pub href: String,
}

impl RemoteDirEntry {
    /// Creates an entry.
    #[must_use]
    pub fn new(title: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            href: href.into(),
        }
    }

    // <tr><td class="link"><a href="Foo.zip" title="Foo.zip">Foo.zip</a></td>...</tr>
    fn from_row(row: &ElementRef<'_>) -> Option<Self> {
        let anchor = row.select(&LINK_SELECTOR).next()?;
        let title = anchor.value().attr("title")?;
        let href = anchor.value().attr("href")?;
        Some(Self::new(title, href))
    }
}

/// A file on the mirror that can be downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Base name (title without extension), the matching key.
    pub name: String,
    /// File name with extension, used as the local file name.
    pub file: String,
    /// Absolute download URL.
    pub url: String,
}

/// Remote files keyed by base name.
pub type RemoteIndex = HashMap<String, RemoteFile>;

/// Extracts the entries of a listing page, skipping the parent-directory row.
///
/// Rows without an anchor carrying both `title` and `href` are ignored.
///
/// # Errors
///
/// Returns [`Error::Listing`] if the page has no `table#list`.
pub fn parse_listing(html: &str) -> Result<Vec<RemoteDirEntry>> {
    let document = Html::parse_document(html);
    if document.select(&TABLE_SELECTOR).next().is_none() {
        return Err(Error::Listing("page has no listing table".to_string()));
    }

    let entries = document
        .select(&ROW_SELECTOR)
        .skip(1)
        .filter_map(|row| {
            let entry = RemoteDirEntry::from_row(&row);
            if entry.is_none() {
                log::debug!("Skipping listing row without a titled link");
            }
            entry
        })
        .collect();
    Ok(entries)
}

/// Builds the base-name index for a collection listing.
///
/// `prefix` is the absolute URL of the collection directory; each entry's
/// href is appended to it.
#[must_use]
pub fn build_index(entries: &[RemoteDirEntry], prefix: &str, policy: DuplicatePolicy) -> RemoteIndex {
    let mut index = RemoteIndex::with_capacity(entries.len());
    for entry in entries {
        let file = RemoteFile {
            name: strip_extension(&entry.title),
            file: entry.title.clone(),
            url: format!("{prefix}{}", entry.href),
        };
        match index.entry(file.name.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(file);
            }
            Entry::Occupied(mut slot) => {
                log::debug!(
                    "Listing entries {} and {} share base name {}",
                    slot.get().file,
                    file.file,
                    file.name
                );
                if policy == DuplicatePolicy::LastWins {
                    slot.insert(file);
                }
            }
        }
    }
    index
}

/// Renders a listing page shaped like the mirror's, for tests.
#[cfg(test)]
pub(crate) fn listing_page(entries: &[(&str, &str)]) -> String {
    let rows: String = entries
        .iter()
        .map(|(title, href)| {
            format!(
                r#"<tr><td class="link"><a href="{href}" title="{title}">{title}</a></td><td class="size">1 KiB</td><td class="date">01-Jan-2024 00:00</td></tr>"#
            )
        })
        .collect();
    format!(
        r#"<html><body><table id="list"><thead><tr><th>File Name</th><th>File Size</th><th>Date</th></tr></thead><tbody><tr><td class="link"><a href="../">Parent directory/</a></td><td>-</td><td>-</td></tr>{rows}</tbody></table></body></html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rows_after_parent_link() {
        let html = listing_page(&[
            ("No-Intro", "No-Intro/"),
            ("Redump", "Redump/"),
        ]);
        let entries = parse_listing(&html).unwrap();
        assert_eq!(
            entries,
            vec![
                RemoteDirEntry::new("No-Intro", "No-Intro/"),
                RemoteDirEntry::new("Redump", "Redump/"),
            ]
        );
    }

    #[test]
    fn first_row_is_skipped_even_with_title() {
        let html = r#"<table id="list"><tbody>
            <tr><td><a href="../" title="Parent">Parent</a></td></tr>
            <tr><td><a href="A.zip" title="A.zip">A.zip</a></td></tr>
        </tbody></table>"#;
        let entries = parse_listing(html).unwrap();
        assert_eq!(entries, vec![RemoteDirEntry::new("A.zip", "A.zip")]);
    }

    #[test]
    fn rows_without_title_are_ignored() {
        let html = r#"<table id="list"><tbody>
            <tr><td><a href="../">Parent</a></td></tr>
            <tr><td><a href="x/">untitled</a></td></tr>
            <tr><td>no link</td></tr>
            <tr><td><a href="B.zip" title="B.zip">B.zip</a></td></tr>
        </tbody></table>"#;
        let entries = parse_listing(html).unwrap();
        assert_eq!(entries, vec![RemoteDirEntry::new("B.zip", "B.zip")]);
    }

    #[test]
    fn rows_without_explicit_tbody_are_found() {
        let html = r#"<table id="list">
            <tr><td><a href="../">Parent</a></td></tr>
            <tr><td><a href="C.zip" title="C.zip">C.zip</a></td></tr>
        </table>"#;
        let entries = parse_listing(html).unwrap();
        assert_eq!(entries, vec![RemoteDirEntry::new("C.zip", "C.zip")]);
    }

    #[test]
    fn missing_table_is_listing_error() {
        let err = parse_listing("<html><body><p>maintenance</p></body></html>").unwrap_err();
        assert!(matches!(err, Error::Listing(_)));
    }

    #[test]
    fn empty_table_yields_no_entries() {
        let entries = parse_listing(&listing_page(&[])).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn titles_are_entity_decoded() {
        let html = listing_page(&[("Tom &amp; Jerry.zip", "Tom%20%26%20Jerry.zip")]);
        let entries = parse_listing(&html).unwrap();
        assert_eq!(entries[0].title, "Tom & Jerry.zip");
        assert_eq!(entries[0].href, "Tom%20%26%20Jerry.zip");
    }

    #[test]
    fn index_keys_by_base_name_with_absolute_url() {
        let entries = vec![RemoteDirEntry::new("Foo (USA).zip", "Foo%20%28USA%29.zip")];
        let index = build_index(&entries, "https://m/files/Redump/Sys/", DuplicatePolicy::LastWins);
        let file = &index["Foo (USA)"];
        assert_eq!(file.name, "Foo (USA)");
        assert_eq!(file.file, "Foo (USA).zip");
        assert_eq!(file.url, "https://m/files/Redump/Sys/Foo%20%28USA%29.zip");
    }

    #[test]
    fn duplicate_base_names_follow_policy() {
        let entries = vec![
            RemoteDirEntry::new("Foo.zip", "Foo.zip"),
            RemoteDirEntry::new("Foo.7z", "Foo.7z"),
        ];

        let last = build_index(&entries, "p/", DuplicatePolicy::LastWins);
        assert_eq!(last.len(), 1);
        assert_eq!(last["Foo"].file, "Foo.7z");

        let first = build_index(&entries, "p/", DuplicatePolicy::FirstWins);
        assert_eq!(first.len(), 1);
        assert_eq!(first["Foo"].file, "Foo.zip");
    }
}
