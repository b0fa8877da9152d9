use crate::cli::ExtractArgs;
use crate::config::{ExtractConfig, Sizing};
use crate::extract::PageExtractor;
use crate::page_range;
use crate::pdf::{PdfDocument, PdfiumRenderer};
use crate::pipeline::{self, BatchReport};
use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Display;
use std::path::Path;

pub async fn run(args: ExtractArgs) -> Result<()> {
    let config = ExtractConfig::from_args(&args)?;
    announce(&config);

    let doc = PdfDocument::open(&config.source)?;
    let total_pages = doc.page_count();

    let pages = if config.pages.is_empty() {
        page_range::all_pages(total_pages)
    } else {
        page_range::resolve(&config.pages, total_pages)
            .with_context(|| format!("Invalid page selection: {}", config.pages))?
    };
    tracing::info!(
        pages = pages.len(),
        total_pages,
        workers = config.workers,
        "Starting extraction"
    );

    create_output_dirs(&config)?;

    let renderer = PdfiumRenderer::open(&config.source, config.dpi)?;
    let extractor = PageExtractor::new(renderer, config.job.clone());

    let progress = progress_bar(pages.len() as u64, config.quiet);
    let report = pipeline::run(
        &pages,
        config.workers,
        move |page| extractor.extract(page),
        progress.clone(),
    )
    .await?;
    progress.finish();

    if let Some(path) = &config.report {
        write_report(&report, path)?;
    }

    if !report.is_success() {
        for failure in &report.failures {
            eprintln!(
                "Worker {} failed on page {}: {:#}",
                failure.worker_id, failure.page, failure.error
            );
        }
        anyhow::bail!(
            "{} of {} page(s) failed, {} extracted",
            report.failures.len(),
            report.submitted,
            report.succeeded()
        );
    }

    println!(
        "Finished extraction: {} page(s) to {}",
        report.succeeded(),
        config.job.save_dir.display()
    );

    Ok(())
}

fn highlight<T: Display>(value: T, quiet: bool) -> String {
    if quiet {
        value.to_string()
    } else {
        style(value).bold().cyan().to_string()
    }
}

fn announce(config: &ExtractConfig) {
    let quiet = config.quiet;
    match config.job.sizing {
        Sizing::Original => {}
        Sizing::Exact(size) => println!(
            "Extracted images size will be set to: {}",
            highlight(size, quiet)
        ),
        Sizing::ScaleDown(factor) => println!(
            "Extracted images size will be scaled down with factor {}",
            highlight(factor, quiet)
        ),
    }

    if let Some(thumb) = &config.job.thumbnail {
        println!("Thumbnails: {}", highlight(thumb.sizing, quiet));
    }

    println!(
        "Setting image format to {}, save folder: {}",
        highlight(config.job.format, quiet),
        highlight(config.job.save_dir.display(), quiet)
    );
    if !config.pages.is_empty() {
        println!(
            "Selected pages will be extracted: {}",
            highlight(&config.pages, quiet)
        );
    }
}

fn create_output_dirs(config: &ExtractConfig) -> Result<()> {
    // The thumbnail directory sits inside the save directory
    let dir = config
        .job
        .thumbnail_dir()
        .unwrap_or_else(|| config.job.save_dir.clone());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))
}

fn progress_bar(len: u64, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pages")
    {
        bar.set_style(style.progress_chars("=>-"));
    }
    bar
}

fn write_report(report: &BatchReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report: {}", path.display()))
}
