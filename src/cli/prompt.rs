//! Interactive numbered-menu selection on the console.

use std::io::Write;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tokio_util::sync::CancellationToken;

use super::progress::{Tone, say, status_line};
use crate::resolve::{SelectionKind, Selector, parse_selection};
use crate::{Error, Result};

/// [`Selector`] that lists the candidates and reads a number from `input`.
///
/// Invalid answers are reported and asked again. End of input and
/// cancellation both yield [`Error::Cancelled`].
pub struct PromptSelector<R> {
    input: R,
    cancel: CancellationToken,
}

impl PromptSelector<BufReader<Stdin>> {
    /// Reads answers from standard input.
    #[must_use]
    pub fn stdin(cancel: CancellationToken) -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), cancel)
    }
}

impl<R: AsyncBufRead + Unpin + Send> PromptSelector<R> {
    /// Reads answers from `input`.
    #[must_use]
    pub const fn new(input: R, cancel: CancellationToken) -> Self {
        Self { input, cancel }
    }

    async fn read_answer(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(Error::Cancelled),
            read = self.input.read_line(&mut line) => read?,
        };
        if read == 0 {
            return Err(Error::Cancelled);
        }
        Ok(line)
    }
}

const fn heading(kind: SelectionKind) -> &'static str {
    match kind {
        SelectionKind::Catalog => "Catalog",
        SelectionKind::Collection => "Collection",
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> Selector for PromptSelector<R> {
    async fn select(&mut self, kind: SelectionKind, candidates: &[String]) -> Result<usize> {
        say(
            Tone::Yellow,
            &format!(
                "{} for DAT not automatically found, please select from the following:",
                heading(kind)
            ),
        );
        for (i, title) in candidates.iter().enumerate() {
            say(Tone::Yellow, &format!("{:<2}: {title}", i + 1));
        }

        loop {
            print!(
                "{}",
                status_line(Tone::Cyan, &format!("Input selected {kind} number: "))
            );
            std::io::stdout().flush()?;

            let answer = self.read_answer().await?;
            match parse_selection(&answer, candidates.len()) {
                Ok(index) => return Ok(index),
                Err(e) => say(Tone::Red, &e.to_string()),
            }
        }
    }
}
