//! Error types for the dat-dl library.

use thiserror::Error;

/// Reasons a DAT document is rejected.
#[derive(Error, Debug)]
pub enum DatError {
    /// The document is not well-formed XML.
    #[error("invalid XML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// An element carries a broken attribute list.
    #[error("invalid attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    /// The document has no root element.
    #[error("document has no root element")]
    NoRoot,

    /// The document ended while elements were still open.
    #[error("document ended inside <{0}>")]
    Unclosed(String),

    /// There is no `<header>` under the root element.
    #[error("missing <header> element")]
    MissingHeader,

    /// The header has no (or an empty) `<name>`.
    #[error("missing <name> in <header>")]
    MissingName,
}

/// Errors that can occur while resolving or downloading a DAT.
#[derive(Error, Debug)]
pub enum Error {
    /// The DAT file could not be parsed.
    #[error("Malformed DAT {path}: {source}")]
    MalformedDat {
        /// Path of the offending DAT file.
        path: String,
        /// What was wrong with it.
        #[source]
        source: DatError,
    },

    /// A directory listing page could not be used.
    #[error("Listing error: {0}")]
    Listing(String),

    /// The server did not declare the size of a file.
    #[error("No Content-Length for {url}")]
    MissingContentLength {
        /// The URL that was requested.
        url: String,
    },

    /// Download operation failed.
    #[error("Download failed: {0}")]
    Download(String),

    /// Invalid command-line input or interactive input stream.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration file could not be loaded.
    #[error("Config error: {0}")]
    Config(String),

    /// The operation was cancelled by the user.
    #[error("Cancelled")]
    Cancelled,

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A specialized `Result` type for dat-dl operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_dat_message_names_path_and_reason() {
        let err = Error::MalformedDat {
            path: "sets/nes.dat".to_string(),
            source: DatError::MissingHeader,
        };
        assert_eq!(
            err.to_string(),
            "Malformed DAT sets/nes.dat: missing <header> element"
        );
    }

    #[test]
    fn missing_content_length_message() {
        let err = Error::MissingContentLength {
            url: "https://example.org/a.zip".to_string(),
        };
        assert!(err.to_string().contains("https://example.org/a.zip"));
    }
}
