//! docsift - visual similarity clustering for document folders.
//!
//! Fingerprints the first page of each document with a DCT-based
//! perceptual hash, orders the folder so look-alike documents sit next to
//! each other, and cuts the order into groups by Hamming distance. A
//! size-bounded on-disk cache keeps fingerprints and thumbnails between
//! runs.

pub mod actions;
pub mod cache;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod logging;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod raster;
pub mod scanner;
pub mod signal;
pub mod similarity;

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use bytesize::ByteSize;

use crate::cache::FingerprintCache;
use crate::catalog::{Catalog, PublishOutcome};
use crate::cli::{Cli, Commands, OutputFormat, ScanArgs};
use crate::config::Preferences;
use crate::error::{ExitCode, Interrupted};
use crate::orchestrator::{BatchOrchestrator, ScanController};
use crate::output::{CsvOutput, JsonOutput, ScanSummary, TextOutput};
use crate::progress::Progress;
use crate::raster::{DocumentRasterizer, SUPPORTED_EXTENSIONS};

/// Run the command described by `cli`.
///
/// # Errors
///
/// Returns an error for failures the user must see: an unreadable folder,
/// an unwritable preferences file, output errors, or [`Interrupted`] when
/// the scan was cancelled.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    let cache = open_cache(&cli);
    log::debug!("Cache directory: {}", cache.dir().display());

    match cli.command {
        Commands::Scan(ref args) => run_scan(&cli, args, cache),
        Commands::Threshold(ref args) => {
            let config = cli.config.as_deref();
            match args.value {
                Some(value) => {
                    let prefs = Preferences { threshold: value };
                    let path = prefs.save(config).context("Failed to save preferences")?;
                    println!("Threshold set to {} ({})", value, path.display());
                }
                None => println!("{}", Preferences::load(config).threshold),
            }
            Ok(ExitCode::Success)
        }
        Commands::ClearCache => {
            if cache.clear() {
                println!("Cleared cache at {}", cache.dir().display());
                Ok(ExitCode::Success)
            } else {
                anyhow::bail!("Failed to clear cache at {}", cache.dir().display())
            }
        }
        Commands::CacheInfo => {
            let stats = cache.stats();
            println!("Cache:   {}", cache.dir().display());
            println!("Records: {}", stats.records);
            println!(
                "Size:    {} of {}",
                ByteSize::b(stats.total_bytes),
                ByteSize::b(stats.budget)
            );
            Ok(ExitCode::Success)
        }
        Commands::Trash(ref args) => {
            let report = actions::trash_paths(&args.paths);
            for failure in report.failures() {
                eprintln!(
                    "{}: {}",
                    failure.path.display(),
                    failure.error.as_deref().unwrap_or("unknown error")
                );
            }
            println!("{}", report.summary());
            Ok(if report.ok {
                ExitCode::Success
            } else {
                ExitCode::PartialSuccess
            })
        }
        Commands::Reveal(ref args) => Ok(if actions::reveal_in_folder(&args.paths) {
            ExitCode::Success
        } else {
            ExitCode::PartialSuccess
        }),
        Commands::Open(ref args) => {
            if actions::open_path(&args.path) {
                Ok(ExitCode::Success)
            } else {
                anyhow::bail!("Failed to open {}", args.path.display())
            }
        }
    }
}

fn open_cache(cli: &Cli) -> FingerprintCache {
    let cache = match cli.cache_dir {
        Some(ref dir) => FingerprintCache::new(dir.clone()),
        None => FingerprintCache::in_temp_dir(),
    };
    match cli.cache_budget {
        Some(bytes) => cache.with_budget(bytes),
        None => cache,
    }
}

fn run_scan(cli: &Cli, args: &ScanArgs, cache: FingerprintCache) -> anyhow::Result<ExitCode> {
    let started = Instant::now();
    let threshold = args
        .threshold
        .unwrap_or_else(|| Preferences::load(cli.config.as_deref()).threshold);

    let extensions: Vec<&str> = if args.extensions.is_empty() {
        SUPPORTED_EXTENSIONS.to_vec()
    } else {
        args.extensions
            .iter()
            .map(|e| e.trim_start_matches('.'))
            .collect()
    };

    let documents = scanner::list_documents(&args.path, &extensions)
        .with_context(|| format!("Failed to list {}", args.path.display()))?;
    if documents.is_empty() {
        log::warn!("No documents found in {}", args.path.display());
    }

    let controller = ScanController::new();
    let shutdown = signal::install_handler(&controller)?;
    let token = controller.begin();

    let quiet = cli.quiet || args.output != OutputFormat::Text;
    let mut orchestrator = BatchOrchestrator::new(Arc::new(DocumentRasterizer::new()))
        .with_concurrency(args.concurrency)
        .with_progress_callback(Arc::new(Progress::new(quiet)));
    if !args.no_cache {
        orchestrator = orchestrator.with_cache(Arc::new(cache));
    }

    let hashed = orchestrator.hash_and_sort(&documents, &token);
    if hashed.cancelled || shutdown.is_shutdown_requested() {
        return Err(Interrupted.into());
    }

    let mut summary = ScanSummary {
        folder: args.path.clone(),
        documents: documents.len(),
        cached: hashed.cached,
        computed: hashed.computed,
        unavailable: hashed.unavailable,
        ..Default::default()
    };

    if args.thumbnails {
        let thumbs = orchestrator.render_thumbnails(&documents, &token);
        if thumbs.cancelled {
            return Err(Interrupted.into());
        }
        summary.thumbnails_rendered = thumbs.rendered;
        summary.thumbnails_failed = thumbs.failed;
    }

    let pages = if args.output == OutputFormat::Text {
        None
    } else {
        match orchestrator.page_info(&documents, &token) {
            Some(table) => Some(table),
            None => return Err(Interrupted.into()),
        }
    };

    let mut catalog = Catalog::new(threshold);
    if catalog.publish(&token, hashed.entries) == PublishOutcome::Stale {
        return Err(Interrupted.into());
    }
    summary.duration = started.elapsed();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.output {
        OutputFormat::Text => TextOutput::new(catalog.scan(), &summary)
            .only_clusters(args.clusters_only)
            .write_to(&mut out)?,
        OutputFormat::Json => JsonOutput::new(catalog.scan(), &summary, pages.as_ref())
            .only_clusters(args.clusters_only)
            .write_to(&mut out, true)?,
        OutputFormat::Csv => CsvOutput::new(catalog.scan())
            .with_pages(pages.as_ref())
            .only_clusters(args.clusters_only)
            .write_to(&mut out)?,
    }
    out.flush()?;

    Ok(if documents.is_empty() {
        ExitCode::NoDocuments
    } else {
        ExitCode::Success
    })
}
