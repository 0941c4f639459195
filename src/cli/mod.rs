//! CLI mode for dat-dl: resolve each DAT against the mirror and download it.

mod progress;
mod prompt;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use clap::Parser;
use tokio_util::sync::CancellationToken;

use crate::pipeline::{ResolveOptions, plan};
use crate::{
    AppConfig, CatalogTable, Downloader, DuplicatePolicy, Error, MirrorClient, Result,
    SessionStatsBuilder, parse_dat,
};

pub use progress::{ConsoleProgress, Tone, say, status_line};
pub use prompt::PromptSelector;

/// Download every file a DAT lists from a Myrient-style mirror.
#[derive(Parser, Debug, Clone)]
#[clap(name = "dat-dl", version, about)]
pub struct Args {
    /// Input DAT file(s).
    #[clap(short, long, value_name = "DAT", required = true, num_args = 1..)]
    pub input: Vec<PathBuf>,

    /// Existing directory to download into.
    #[clap(short, long, value_name = "DIR")]
    pub output: PathBuf,

    /// Always choose the catalog from a list.
    #[clap(short = 'c', long)]
    pub manual_catalog: bool,

    /// Always choose the system collection from a list.
    #[clap(short = 's', long = "manual-system")]
    pub manual_system: bool,

    /// Only report what the mirror is missing; download nothing.
    #[clap(short, long)]
    pub list_only: bool,

    /// Mirror base URL.
    #[clap(long, value_name = "URL", env = "DAT_DL_MIRROR")]
    pub mirror: Option<String>,

    /// Config file (defaults to the user config directory).
    #[clap(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Args {
    fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            manual_catalog: self.manual_catalog,
            manual_collection: self.manual_system,
        }
    }
}

/// Canonicalizes the DAT paths, dropping duplicates and sorting them.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for a path that is not an existing file.
pub fn validate_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut unique = BTreeSet::new();
    for input in inputs {
        let path = std::fs::canonicalize(input)
            .ok()
            .filter(|p| p.is_file())
            .ok_or_else(|| {
                Error::InvalidInput(format!("input DAT file {} is not a file", input.display()))
            })?;
        unique.insert(path);
    }
    Ok(unique.into_iter().collect())
}

/// Checks that `output` is an existing directory.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] otherwise.
pub fn validate_output(output: &Path) -> Result<()> {
    if output.is_dir() {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "output path {} is not a directory",
            output.display()
        )))
    }
}

/// Loads the config file and applies command-line overrides.
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(url) = &args.mirror {
        config.mirror = config.mirror.with_base_url(url.clone());
    }
    Ok(config)
}

/// Shared state for processing a batch of DATs.
struct Session<'a> {
    args: &'a Args,
    catalogs: CatalogTable,
    policy: DuplicatePolicy,
    mirror: MirrorClient,
    downloader: Downloader,
    cancel: &'a CancellationToken,
}

impl Session<'_> {
    async fn process_dat<S: crate::Selector + ?Sized>(
        &self,
        path: &Path,
        selector: &mut S,
    ) -> Result<()> {
        say(
            Tone::Green,
            &format!("Opening input DAT-file {}...", path.display()),
        );
        let dat = parse_dat(path, &self.catalogs)?;
        match &dat.catalog {
            Some(catalog) => say(
                Tone::Green,
                &format!("Processing {catalog}: {}...", dat.name),
            ),
            None => say(Tone::Green, &format!("Processing {}...", dat.name)),
        }

        let plan = plan(
            &self.mirror,
            dat,
            self.args.resolve_options(),
            self.policy,
            selector,
            self.cancel,
        )
        .await?;
        let reconciliation = &plan.reconciliation;
        progress::print_counts(reconciliation);

        if !self.args.list_only && !reconciliation.found.is_empty() {
            let mut builder = SessionStatsBuilder::new();
            let sink = ConsoleProgress::new();
            self.downloader
                .download_all(
                    &self.args.output,
                    &reconciliation.found,
                    &sink,
                    self.cancel,
                    &mut builder,
                )
                .await?;
            progress::print_summary(&builder.build());
        }

        progress::print_missing(&reconciliation.missing);
        Ok(())
    }
}

/// Runs the CLI with parsed arguments.
///
/// Input paths are checked before any network traffic. DATs are processed
/// one after another; the first error ends the run.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for bad paths, [`Error::Cancelled`] when
/// `cancel` fires, and any error from parsing, resolving or downloading.
pub async fn run(args: Args, cancel: CancellationToken) -> Result<()> {
    let inputs = validate_inputs(&args.input)?;
    validate_output(&args.output)?;

    let config = load_config(&args)?;
    let mirror = MirrorClient::new(&config.mirror)?;
    log::info!("Using mirror {}", mirror.base_url());
    let session = Session {
        args: &args,
        catalogs: config.catalog_table(),
        policy: config.download.duplicate_policy,
        downloader: Downloader::new(mirror.http().clone(), config.download.clone()),
        mirror,
        cancel: &cancel,
    };

    let mut selector = PromptSelector::stdin(cancel.clone());
    for path in &inputs {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        session.process_dat(path, &mut selector).await?;
    }
    Ok(())
}
