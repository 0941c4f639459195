//! DAT file parsing.
//!
//! A DAT is an XML manifest: a `<header>` naming the set and the authority
//! that publishes it, followed by one `<game name="...">` per wanted file.
//! Only the header fields and the game names matter here; ROM hashes and
//! other metadata are ignored.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use regex::Regex;

use crate::error::{DatError, Error, Result};

static EXTENSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.[a-zA-Z0-9]{1,3}\z").expect("valid regex"));

/// Cosmetic markers removed from header names, in order.
pub const DAT_NAME_FIXES: &[&str] = &["FixDat_", " (Retool)"];

/// Built-in authority URL to catalog label entries.
pub const KNOWN_CATALOGS: &[(&str, &str)] = &[
    ("https://www.no-intro.org", "No-Intro"),
    ("https://redump.org/", "Redump"),
];

/// Strips a trailing `.` followed by 1-3 ASCII alphanumerics.
///
/// `"Foo (USA).zip"` becomes `"Foo (USA)"`; names without such a suffix are
/// returned unchanged.
#[must_use]
pub fn strip_extension(name: &str) -> String {
    EXTENSION_RE.replace(name, "").into_owned()
}

/// Removes the [`DAT_NAME_FIXES`] markers from a header name.
#[must_use]
pub fn clean_dat_name(raw: &str) -> String {
    DAT_NAME_FIXES
        .iter()
        .fold(raw.to_string(), |name, fix| name.replace(fix, ""))
}

/// Maps DAT authority URLs to the catalog labels used on the mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogTable {
    entries: Vec<(String, String)>,
}

impl Default for CatalogTable {
    fn default() -> Self {
        Self {
            entries: KNOWN_CATALOGS
                .iter()
                .map(|(url, label)| ((*url).to_string(), (*label).to_string()))
                .collect(),
        }
    }
}

impl CatalogTable {
    /// Creates a table without any entries.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds an entry, replacing any existing label for the same URL.
    #[must_use]
    pub fn with_entry(mut self, url: impl Into<String>, label: impl Into<String>) -> Self {
        let url = url.into();
        let label = label.into();
        match self.entries.iter_mut().find(|(u, _)| *u == url) {
            Some(entry) => entry.1 = label,
            None => self.entries.push((url, label)),
        }
        self
    }

    /// Looks up the label for an authority URL (exact match).
    #[must_use]
    pub fn label_for(&self, url: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(u, _)| u == url)
            .map(|(_, label)| label.as_str())
    }
}

/// The parts of a DAT needed to find and fetch its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatFile {
    /// Header name with cosmetic markers removed; matched against collection titles.
    pub name: String,
    /// Authority URL from the header, if any.
    pub authority_url: Option<String>,
    /// Catalog label for the authority, if it is a known one.
    pub catalog: Option<String>,
    /// Wanted base names, deduplicated in first-seen order.
    pub wanted: Vec<String>,
}

#[derive(Clone, Copy)]
enum HeaderField {
    Name,
    Url,
}

impl DatFile {
    /// Parses a DAT document using the built-in catalog table.
    ///
    /// # Errors
    ///
    /// Returns a [`DatError`] if the document is not well-formed or has no
    /// header name.
    pub fn parse(xml: &str) -> std::result::Result<Self, DatError> {
        Self::parse_with(xml, &CatalogTable::default())
    }

    /// Parses a DAT document, resolving the authority against `catalogs`.
    ///
    /// # Errors
    ///
    /// Returns a [`DatError`] if the document is not well-formed or has no
    /// header name.
    pub fn parse_with(xml: &str, catalogs: &CatalogTable) -> std::result::Result<Self, DatError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut open: Vec<String> = Vec::new();
        let mut saw_root = false;
        let mut saw_header = false;
        let mut in_header = false;
        let mut field: Option<HeaderField> = None;
        let mut name: Option<String> = None;
        let mut url: Option<String> = None;

        let mut seen = HashSet::new();
        let mut wanted = Vec::new();

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let tag = tag_name(&e);
                    match open.len() {
                        0 => saw_root = true,
                        1 if tag == "header" && !saw_header => {
                            saw_header = true;
                            in_header = true;
                        }
                        1 if tag == "game" => push_game(&e, &mut seen, &mut wanted)?,
                        2 if in_header => {
                            field = match tag.as_str() {
                                "name" if name.is_none() => {
                                    name = Some(String::new());
                                    Some(HeaderField::Name)
                                }
                                "url" if url.is_none() => {
                                    url = Some(String::new());
                                    Some(HeaderField::Url)
                                }
                                _ => None,
                            };
                        }
                        _ => {}
                    }
                    open.push(tag);
                }
                Event::Empty(e) => {
                    let tag = tag_name(&e);
                    match open.len() {
                        0 => saw_root = true,
                        1 if tag == "header" => saw_header = true,
                        1 if tag == "game" => push_game(&e, &mut seen, &mut wanted)?,
                        _ => {}
                    }
                }
                Event::End(_) => {
                    open.pop();
                    match open.len() {
                        1 => in_header = false,
                        2 => field = None,
                        _ => {}
                    }
                }
                Event::Text(t) => {
                    if let Some(f) = field {
                        let text = t.unescape()?;
                        append_field(f, &text, &mut name, &mut url);
                    }
                }
                Event::CData(c) => {
                    if let Some(f) = field {
                        let bytes = c.into_inner();
                        append_field(f, &String::from_utf8_lossy(&bytes), &mut name, &mut url);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(tag) = open.pop() {
            return Err(DatError::Unclosed(tag));
        }
        if !saw_root {
            return Err(DatError::NoRoot);
        }
        if !saw_header {
            return Err(DatError::MissingHeader);
        }

        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or(DatError::MissingName)?;
        let authority_url = url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        let catalog = authority_url
            .as_deref()
            .and_then(|u| catalogs.label_for(u))
            .map(str::to_string);

        Ok(Self {
            name: clean_dat_name(&name),
            authority_url,
            catalog,
            wanted,
        })
    }
}

fn tag_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn append_field(
    field: HeaderField,
    text: &str,
    name: &mut Option<String>,
    url: &mut Option<String>,
) {
    let target = match field {
        HeaderField::Name => name,
        HeaderField::Url => url,
    };
    if let Some(value) = target.as_mut() {
        value.push_str(text);
    }
}

fn push_game(
    e: &BytesStart<'_>,
    seen: &mut HashSet<String>,
    wanted: &mut Vec<String>,
) -> std::result::Result<(), DatError> {
    let Some(attr) = e.try_get_attribute("name")? else {
        log::warn!("Skipping <game> without a name attribute");
        return Ok(());
    };
    let base = strip_extension(&attr.unescape_value()?);
    if seen.insert(base.clone()) {
        wanted.push(base);
    }
    Ok(())
}

/// Reads and parses the DAT file at `path`.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read and
/// [`Error::MalformedDat`] if it cannot be parsed.
pub fn parse_dat(path: &Path, catalogs: &CatalogTable) -> Result<DatFile> {
    let xml = std::fs::read_to_string(path)?;
    DatFile::parse_with(&xml, catalogs).map_err(|source| Error::MalformedDat {
        path: path.display().to_string(),
        source,
    })
}
