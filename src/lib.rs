//! dat-dl - fetch the files a DAT lists from a Myrient-style mirror.
//!
//! The library parses DAT files, finds the matching catalog and collection
//! on the mirror's HTML directory listings, reconciles wanted names against
//! the collection, and downloads the found files with resume support. All
//! console interaction lives behind the `cli` feature.
//!
//! # Example
//!
//! ```no_run
//! use dat_dl::{
//!     DatFile, DownloadConfig, Downloader, MirrorClient, MirrorConfig, NoProgress,
//!     ResolveOptions, SessionStatsBuilder, plan,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(selector: &mut dyn dat_dl::Selector) -> dat_dl::Result<()> {
//! let mirror = MirrorClient::new(&MirrorConfig::default())?;
//! let dat = dat_dl::parse_dat("Sony - PlayStation.dat".as_ref(), &Default::default())?;
//!
//! let cancel = CancellationToken::new();
//! let plan = plan(
//!     &mirror,
//!     dat,
//!     ResolveOptions::default(),
//!     Default::default(),
//!     selector,
//!     &cancel,
//! )
//! .await?;
//! println!("{} missing", plan.reconciliation.missing.len());
//!
//! let downloader = Downloader::new(mirror.http().clone(), DownloadConfig::default());
//! let mut stats = SessionStatsBuilder::new();
//! downloader
//!     .download_all(
//!         "roms".as_ref(),
//!         &plan.reconciliation.found,
//!         &NoProgress,
//!         &cancel,
//!         &mut stats,
//!     )
//!     .await?;
//! println!("Downloaded {} files", stats.build().files_downloaded);
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod dat;
pub mod download;
pub mod error;
pub mod format;
pub mod fs;
pub mod listing;
pub mod mirror;
pub mod pipeline;
pub mod reconcile;
pub mod resolve;
pub mod stats;

// Re-export main types for convenience
pub use config::{AppConfig, DownloadConfig, DuplicatePolicy, MirrorConfig};
pub use dat::{CatalogTable, DatFile, parse_dat};
pub use download::{
    DownloadOutcome, DownloadProgress, DownloadTask, Downloader, FileStatus, NoProgress,
};
pub use error::{DatError, Error, Result};
pub use format::{format_bytes, format_duration, format_speed, pad_index};
pub use fs::{FileSystem, TokioFileSystem};
pub use listing::{RemoteDirEntry, RemoteFile, RemoteIndex};
pub use mirror::MirrorClient;
pub use pipeline::{Plan, ResolveOptions, plan};
pub use reconcile::{Reconciliation, reconcile};
pub use resolve::{SelectionKind, Selector};
pub use stats::{FileStats, SessionStats, SessionStatsBuilder};
