//! Console output: timestamped status lines, the transfer bar and summaries.

use std::sync::Mutex;

use chrono::Local;
use console::{Term, style};
use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    DownloadProgress, DownloadTask, FileStats, Reconciliation, SessionStats, format_bytes,
    format_duration, format_speed, pad_index,
};

const SEPARATOR: &str = "────────────────────────────────────────────────────────────";

/// Colour of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Progress and success.
    Green,
    /// Listings and missing items.
    Yellow,
    /// Prompts and transfers.
    Cyan,
    /// Errors.
    Red,
}

/// Formats `message` as a status line: `YYYY-MM-DD HH:MM:SS | message`.
pub fn status_line(tone: Tone, message: &str) -> String {
    let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    let styled = match tone {
        Tone::Green => style(message).green(),
        Tone::Yellow => style(message).yellow(),
        Tone::Cyan => style(message).cyan(),
        Tone::Red => style(message).red(),
    };
    format!("{stamp} | {styled}")
}

/// Prints a status line to stdout.
pub fn say(tone: Tone, message: &str) {
    println!("{}", status_line(tone, message));
}

/// Creates a progress bar for a single file transfer.
fn make_progress_bar(size: u64, offset: u64, name: &str) -> ProgressBar {
    let bar = ProgressBar::new(size);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} @ {bytes_per_sec} ({eta}) - {msg}",
        )
        .expect("progress template is valid")
        .progress_chars("━━╌"),
    );
    bar.set_position(offset);
    bar.reset_eta();
    bar.set_message(name.to_string());
    bar
}

fn position(task: &DownloadTask) -> String {
    format!("{}/{}", pad_index(task.index, task.total), task.total)
}

/// [`DownloadProgress`] sink drawing one bar per transfer.
#[derive(Default)]
pub struct ConsoleProgress {
    bar: Mutex<Option<ProgressBar>>,
}

impl ConsoleProgress {
    /// Creates a sink with no active bar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn take_bar(&self) -> Option<ProgressBar> {
        self.bar.lock().ok().and_then(|mut bar| bar.take())
    }
}

impl DownloadProgress for ConsoleProgress {
    fn on_file_start(&self, task: &DownloadTask, size: u64, offset: u64) {
        let verb = if offset > 0 { "Resuming   " } else { "Downloading" };
        say(
            Tone::Cyan,
            &format!("{verb} {}: {}", position(task), task.file.name),
        );
        if let Ok(mut slot) = self.bar.lock() {
            *slot = Some(make_progress_bar(size, offset, &task.file.file));
        }
    }

    fn on_progress(&self, _task: &DownloadTask, bytes_delta: u64) {
        if let Ok(slot) = self.bar.lock()
            && let Some(bar) = slot.as_ref()
        {
            bar.inc(bytes_delta);
        }
    }

    fn on_file_complete(&self, task: &DownloadTask, stats: &FileStats) {
        if let Some(bar) = self.take_bar() {
            bar.finish_and_clear();
        }
        // Replace the "Downloading" line.
        let term = Term::stdout();
        if term.is_term() {
            if let Err(e) = term.clear_last_lines(1) {
                log::debug!("Could not rewrite status line: {e}");
            }
        }
        say(
            Tone::Green,
            &format!("Downloaded  {}: {}", position(task), task.file.name),
        );
        log::debug!(
            "{}: {} in {} ({})",
            task.file.file,
            format_bytes(stats.transferred),
            format_duration(stats.elapsed),
            format_speed(stats.average_speed)
        );
    }

    fn on_file_skipped(&self, task: &DownloadTask, _size: u64) {
        say(
            Tone::Green,
            &format!("Already DLd {}: {}", position(task), task.file.name),
        );
    }

    fn on_error(&self, task: &DownloadTask, error: &str) {
        if let Some(bar) = self.take_bar() {
            bar.abandon();
        }
        say(Tone::Red, &format!("Failed {}: {error}", task.file.name));
    }
}

/// Prints the wanted/found/missing counts.
pub fn print_counts(reconciliation: &Reconciliation) {
    say(
        Tone::Green,
        &format!(
            "Amount of wanted ROMs in DAT-file   : {}",
            reconciliation.wanted()
        ),
    );
    say(
        Tone::Green,
        &format!(
            "Amount of found ROMs at server      : {}",
            reconciliation.found.len()
        ),
    );
    if !reconciliation.is_complete() {
        say(
            Tone::Yellow,
            &format!(
                "Amount of missing ROMs at server    : {}",
                reconciliation.missing.len()
            ),
        );
    }
}

/// Lines reporting the names that have to be fetched by hand.
fn missing_lines(missing: &[String]) -> Vec<(Tone, String)> {
    if missing.is_empty() {
        return vec![(Tone::Green, "All ROMs in DAT found from server!".to_string())];
    }
    let header = format!(
        "Following {} ROMs in DAT not automatically found from server, grab these manually:",
        missing.len()
    );
    std::iter::once((Tone::Red, header))
        .chain(missing.iter().map(|name| (Tone::Yellow, name.clone())))
        .collect()
}

/// Prints the names that have to be fetched by hand.
pub fn print_missing(missing: &[String]) {
    for (tone, line) in missing_lines(missing) {
        say(tone, &line);
    }
}

/// Prints a summary of transfer statistics.
pub fn print_summary(stats: &SessionStats) {
    if stats.files_downloaded == 0 && stats.files_skipped == 0 {
        return;
    }

    println!("\n{SEPARATOR}");
    println!("Download Summary");
    println!("{SEPARATOR}");

    if stats.files_downloaded > 0 {
        println!("  Files downloaded:  {}", stats.files_downloaded);
        if stats.files_resumed > 0 {
            println!("  Of which resumed:  {}", stats.files_resumed);
        }
        println!("  Total size:        {}", format_bytes(stats.total_bytes));
        println!("  Total time:        {}", format_duration(stats.elapsed));
        println!(
            "  Average speed:     {}",
            format_speed(stats.average_speed())
        );
    }

    if stats.files_skipped > 0 {
        println!("  Files skipped:     {}", stats.files_skipped);
    }

    println!("{SEPARATOR}\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RemoteFile;

    fn task(index: usize, total: usize) -> DownloadTask {
        DownloadTask::new(
            RemoteFile {
                name: "Foo".to_string(),
                file: "Foo.zip".to_string(),
                url: "https://m/Foo.zip".to_string(),
            },
            index,
            total,
        )
    }

    #[test]
    fn status_line_has_timestamp_prefix() {
        console::set_colors_enabled(false);
        let line = status_line(Tone::Green, "hello");
        let (stamp, rest) = line.split_once(" | ").unwrap();
        assert_eq!(rest, "hello");
        assert!(chrono::NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d %H:%M:%S").is_ok());
    }

    #[test]
    fn position_is_zero_padded() {
        assert_eq!(position(&task(3, 12)), "03/12");
        assert_eq!(position(&task(12, 12)), "12/12");
        assert_eq!(position(&task(1, 1)), "1/1");
    }

    #[test]
    fn progress_bar_tracks_transfer() {
        let progress = ConsoleProgress::new();
        let t = task(1, 1);
        progress.on_file_start(&t, 100, 40);
        progress.on_progress(&t, 10);
        {
            let slot = progress.bar.lock().unwrap();
            let bar = slot.as_ref().unwrap();
            assert_eq!(bar.position(), 50);
            assert_eq!(bar.length(), Some(100));
        }
        progress.on_error(&t, "boom");
        assert!(progress.bar.lock().unwrap().is_none());
    }

    #[test]
    fn completed_transfer_clears_bar() {
        let progress = ConsoleProgress::new();
        let t = task(1, 1);
        progress.on_file_start(&t, 10, 0);
        progress.on_progress(&t, 10);
        progress.on_file_complete(
            &t,
            &FileStats {
                size: 10,
                resumed_from: 0,
                transferred: 10,
                elapsed: std::time::Duration::from_millis(5),
                average_speed: 2000,
            },
        );
        assert!(progress.bar.lock().unwrap().is_none());
    }

    #[test]
    fn missing_header_is_red_and_names_yellow() {
        let missing = vec!["Bar".to_string(), "Baz".to_string()];
        let lines = missing_lines(&missing);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].0, Tone::Red);
        assert!(lines[0].1.starts_with("Following 2 ROMs"));
        assert_eq!(lines[1], (Tone::Yellow, "Bar".to_string()));
        assert_eq!(lines[2], (Tone::Yellow, "Baz".to_string()));
    }

    #[test]
    fn nothing_missing_is_reported_in_green() {
        assert_eq!(
            missing_lines(&[]),
            vec![(Tone::Green, "All ROMs in DAT found from server!".to_string())]
        );
    }
}
