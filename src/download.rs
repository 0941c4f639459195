//! Resumable, chunked HTTP downloads.
//!
//! A file is identified on disk by its size alone. A local file as large as
//! the remote `Content-Length` is considered complete; a different size is
//! treated as a prefix and resumed with a byte-range request. The prefix is
//! never verified, so a corrupted partial file yields a corrupted result.

use std::path::Path;

use bytes::BytesMut;
use futures::StreamExt;
use reqwest::StatusCode;
use reqwest::header::RANGE;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::config::DownloadConfig;
use crate::error::{Error, Result};
use crate::fs::{FileSystem, TokioFileSystem};
use crate::listing::RemoteFile;
use crate::mirror::cancellable;
use crate::stats::{DownloadStatsTracker, FileStats, SessionStatsBuilder};

/// Classification of a file's current state on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// A local file with the expected size exists.
    Complete,
    /// A local file of a different size exists; holds its size.
    Partial(u64),
    /// No local file.
    Missing,
}

/// Trait for receiving download progress updates.
///
/// All methods have default no-op implementations for convenience.
pub trait DownloadProgress: Send + Sync {
    /// Called before the first body byte; `offset` is non-zero when resuming.
    fn on_file_start(&self, _task: &DownloadTask, _size: u64, _offset: u64) {}

    /// Called after each chunk is written.
    fn on_progress(&self, _task: &DownloadTask, _bytes_delta: u64) {}

    /// Called when a file download completes successfully.
    fn on_file_complete(&self, _task: &DownloadTask, _stats: &FileStats) {}

    /// Called when the local file is already complete.
    fn on_file_skipped(&self, _task: &DownloadTask, _size: u64) {}

    /// Called when a file download fails.
    fn on_error(&self, _task: &DownloadTask, _error: &str) {}
}

/// A null progress implementation that ignores all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl DownloadProgress for NoProgress {}

/// A remote file with its position in the download queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    /// The file to fetch.
    pub file: RemoteFile,
    /// 1-based position in the queue.
    pub index: usize,
    /// Queue length.
    pub total: usize,
}

impl DownloadTask {
    /// Creates a task.
    #[must_use]
    pub const fn new(file: RemoteFile, index: usize, total: usize) -> Self {
        Self { file, index, total }
    }
}

/// What [`Downloader::download`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The local file already had the remote size; nothing was transferred.
    AlreadyPresent {
        /// Size of the file in bytes.
        size: u64,
    },
    /// Bytes were transferred (fresh or resumed).
    Completed(FileStats),
}

/// Sequential downloader writing into a local directory.
pub struct Downloader<F: FileSystem = TokioFileSystem> {
    http: reqwest::Client,
    config: DownloadConfig,
    fs: F,
}

impl Downloader<TokioFileSystem> {
    /// Creates a new downloader with the default file system.
    #[must_use]
    pub const fn new(http: reqwest::Client, config: DownloadConfig) -> Self {
        Self {
            http,
            config,
            fs: TokioFileSystem,
        }
    }
}

impl<F: FileSystem> Downloader<F> {
    /// Creates a new downloader with a custom file system implementation.
    #[must_use]
    pub const fn with_fs(http: reqwest::Client, config: DownloadConfig, fs: F) -> Self {
        Self { http, config, fs }
    }

    /// Returns a reference to the download configuration.
    #[must_use]
    pub const fn config(&self) -> &DownloadConfig {
        &self.config
    }

    /// Classifies a local file against the expected remote size.
    pub async fn classify_file(&self, path: &Path, expected_size: u64) -> FileStatus {
        match self.fs.file_size(path).await {
            Some(size) if size == expected_size => FileStatus::Complete,
            Some(size) => FileStatus::Partial(size),
            None => FileStatus::Missing,
        }
    }

    /// Downloads one file into `output_dir`, resuming a partial local copy.
    ///
    /// The cancellation token interrupts the size request and the range
    /// request, and is checked between chunks; on cancellation the bytes
    /// received so far are written and flushed before [`Error::Cancelled`]
    /// is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the server omits `Content-Length`, answers a
    /// range request with anything but `206`, the local file cannot be
    /// opened or written, or the transfer fails. Nothing is retried.
    pub async fn download(
        &self,
        output_dir: &Path,
        task: &DownloadTask,
        progress: &dyn DownloadProgress,
        cancel: &CancellationToken,
    ) -> Result<DownloadOutcome> {
        let file = &task.file;
        check_file_name(&file.file)?;
        let local_path = output_dir.join(&file.file);

        let response = cancellable(cancel, self.request(&file.url)).await?;
        let remote_size = response
            .content_length()
            .ok_or_else(|| Error::MissingContentLength {
                url: file.url.clone(),
            })?;

        let (response, offset) = match self.classify_file(&local_path, remote_size).await {
            FileStatus::Complete => {
                log::debug!("{} already complete ({remote_size} bytes)", file.file);
                progress.on_file_skipped(task, remote_size);
                return Ok(DownloadOutcome::AlreadyPresent { size: remote_size });
            }
            FileStatus::Partial(local_size) => {
                drop(response);
                log::debug!(
                    "Resuming {} at {local_size} of {remote_size} bytes",
                    file.file
                );
                (
                    cancellable(cancel, self.request_range(&file.url, local_size)).await?,
                    local_size,
                )
            }
            FileStatus::Missing => (response, 0),
        };

        let mut out = self.fs.open_append(&local_path).await?;
        let stats = DownloadStatsTracker::new(remote_size, offset);
        progress.on_file_start(task, remote_size, offset);

        let streamed = self
            .stream_body(&mut out, response, task, &stats, progress, cancel)
            .await;
        let flushed = out.flush().await;
        drop(out);

        match streamed.and(flushed.map_err(Error::from)) {
            Ok(()) => {
                let file_stats = stats.finish();
                progress.on_file_complete(task, &file_stats);
                Ok(DownloadOutcome::Completed(file_stats))
            }
            Err(e) => {
                if !matches!(e, Error::Cancelled) {
                    progress.on_error(task, &e.to_string());
                }
                Err(e)
            }
        }
    }

    /// Downloads `files` one after another, in order.
    ///
    /// The first failure stops the run and is returned.
    ///
    /// # Errors
    ///
    /// See [`download`](Self::download); [`Error::Cancelled`] if the token
    /// fires between files.
    pub async fn download_all(
        &self,
        output_dir: &Path,
        files: &[RemoteFile],
        progress: &dyn DownloadProgress,
        cancel: &CancellationToken,
        builder: &mut SessionStatsBuilder,
    ) -> Result<()> {
        let total = files.len();
        for (i, file) in files.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let task = DownloadTask::new(file.clone(), i + 1, total);
            match self.download(output_dir, &task, progress, cancel).await? {
                DownloadOutcome::AlreadyPresent { .. } => builder.add_skipped(),
                DownloadOutcome::Completed(stats) => builder.add_download(&stats),
            }
        }
        Ok(())
    }

    async fn request(&self, url: &str) -> Result<reqwest::Response> {
        Ok(self.http.get(url).send().await?.error_for_status()?)
    }

    async fn request_range(&self, url: &str, offset: u64) -> Result<reqwest::Response> {
        let response = self
            .http
            .get(url)
            .header(RANGE, format!("bytes={offset}-"))
            .send()
            .await?
            .error_for_status()?;
        if response.status() != StatusCode::PARTIAL_CONTENT {
            return Err(Error::Download(format!(
                "{url}: expected 206 for range request, got {}",
                response.status()
            )));
        }
        Ok(response)
    }

    /// Copies the body to `out` in `chunk_size` writes.
    async fn stream_body(
        &self,
        out: &mut tokio::fs::File,
        response: reqwest::Response,
        task: &DownloadTask,
        stats: &DownloadStatsTracker,
        progress: &dyn DownloadProgress,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let chunk_size = self.config.chunk_size.max(1);
        let mut body = response.bytes_stream();
        let mut pending = BytesMut::with_capacity(chunk_size);

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    write_chunk(out, &pending, task, stats, progress).await?;
                    return Err(Error::Cancelled);
                }
                next = body.next() => next,
            };
            let Some(bytes) = next else { break };
            pending.extend_from_slice(&bytes?);
            while pending.len() >= chunk_size {
                let chunk = pending.split_to(chunk_size);
                write_chunk(out, &chunk, task, stats, progress).await?;
            }
        }

        write_chunk(out, &pending, task, stats, progress).await
    }
}

async fn write_chunk(
    out: &mut tokio::fs::File,
    chunk: &[u8],
    task: &DownloadTask,
    stats: &DownloadStatsTracker,
    progress: &dyn DownloadProgress,
) -> Result<()> {
    if chunk.is_empty() {
        return Ok(());
    }
    out.write_all(chunk).await?;
    let len = chunk.len() as u64;
    stats.record_bytes(len);
    progress.on_progress(task, len);
    Ok(())
}

/// Rejects listing titles that would escape the output directory.
fn check_file_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(Error::Download(format!("refusing unsafe file name {name:?}")));
    }
    Ok(())
}
