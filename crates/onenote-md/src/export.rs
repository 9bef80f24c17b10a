use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::graph::{NoteSource, Notebook, Page, Section};
use crate::prelude::{println, *};
use crate::writer::MarkdownWriter;

use onenote_md_core::cache::CacheStore;
use onenote_md_core::convert::{convert_with, ConvertOptions, ConvertedDocument, ImagePolicy};
use onenote_md_core::filename::{plan_filenames, section_dir, DateFormat};
use onenote_md_core::graph::sort_pages_by_created;

/// Everything the export needs besides its collaborators
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Prefix filenames with the page date when set
    pub date_format: Option<DateFormat>,
    pub image_policy: ImagePolicy,
}

/// Per-run counters
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub converted: usize,
    /// Already in the cache
    pub skipped: usize,
    /// Listed but gone on the server; cached so later runs do not retry them
    pub missing: usize,
    pub failed: usize,
    /// Images or attachments that could not be downloaded
    pub resource_failures: usize,
}

enum PageOutcome {
    Converted,
    Missing,
}

/// Convert every page of `notebook` not already recorded in `cache`.
///
/// Per-page failures are logged and counted. Authentication and filesystem
/// failures abort the run; `cache` only ever records pages whose file was written.
pub async fn export_notebook<S: NoteSource + ?Sized>(
    source: &S,
    cache: &mut dyn CacheStore,
    writer: &MarkdownWriter,
    notebook: &Notebook,
    config: &ExportConfig,
) -> Result<Summary, Error> {
    let mut summary = Summary::default();

    let sections = source.list_sections(notebook).await?;
    println!(
        "Found {} section(s) in {}",
        sections.len(),
        notebook.display_name.bold()
    );

    for section in &sections {
        let mut pages = match source.list_pages(section).await {
            Ok(pages) => pages,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                log::error!("Unable to list pages of section '{}': {e}", section.display_name);
                summary.failed += 1;
                continue;
            }
        };

        if config.date_format.is_some() {
            sort_pages_by_created(&mut pages);
        }

        println!("  Section '{}': {} page(s)", section.display_name, pages.len());

        export_section(source, cache, writer, section, &pages, config, &mut summary).await?;
    }

    log::info!(
        "Export of {} finished: {} converted, {} skipped, {} missing, {} failed",
        notebook.display_name,
        summary.converted,
        summary.skipped,
        summary.missing,
        summary.failed
    );

    Ok(summary)
}

async fn export_section<S: NoteSource + ?Sized>(
    source: &S,
    cache: &mut dyn CacheStore,
    writer: &MarkdownWriter,
    section: &Section,
    pages: &[Page],
    config: &ExportConfig,
    summary: &mut Summary,
) -> Result<(), Error> {
    let dir = section_dir(section);

    let mut pending = Vec::with_capacity(pages.len());
    for page in pages {
        if cache.contains(&page.id) {
            log::debug!("Skipping cached page {} ({})", page.title, page.id);
            summary.skipped += 1;
        } else {
            pending.push(page.clone());
        }
    }

    let reserved = reserved_names(cache, &dir);
    let filenames = plan_filenames(&pending, config.date_format, &reserved);

    for (page, filename) in pending.iter().zip(filenames) {
        println!("    Converting: {}", page.title);
        let relative_path = dir.join(&filename);

        match export_page(source, writer, page, relative_path.clone(), config, summary).await {
            Ok(PageOutcome::Converted) => {
                cache.mark_done(&page.id, &relative_path.to_string_lossy())?;
                summary.converted += 1;
            }
            Ok(PageOutcome::Missing) => {
                cache.mark_done(&page.id, &relative_path.to_string_lossy())?;
                summary.missing += 1;
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(Error::AccessDenied(reason)) => {
                println!("      {} {}", "Skipped (access denied):".yellow(), reason);
                summary.failed += 1;
            }
            Err(e) => {
                println!("      {} {}", "Error:".red(), e);
                log::error!("Failed to convert page {} ({}): {e}", page.title, page.id);
                summary.failed += 1;
            }
        }
    }

    Ok(())
}

/// File names inside `dir` already claimed by pages recorded in `cache`
fn reserved_names(cache: &dyn CacheStore, dir: &Path) -> Vec<String> {
    cache
        .written_paths()
        .into_iter()
        .map(Path::new)
        .filter(|path| path.parent() == Some(dir))
        .filter_map(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect()
}

async fn export_page<S: NoteSource + ?Sized>(
    source: &S,
    writer: &MarkdownWriter,
    page: &Page,
    relative_path: PathBuf,
    config: &ExportConfig,
    summary: &mut Summary,
) -> Result<PageOutcome, Error> {
    let html = match source.fetch_content(page).await {
        Ok(html) => html,
        Err(Error::NotFound(url)) => {
            println!(
                "      {} page id {}",
                "Skipped (page not found, it may be a subpage or out of sync):".yellow(),
                page.id
            );
            log::debug!("404 for {url}");
            return Ok(PageOutcome::Missing);
        }
        Err(e) => return Err(e),
    };

    let options = ConvertOptions {
        image_policy: config.image_policy,
    };
    let conversion = convert_with(&html, &options);
    for warning in &conversion.warnings {
        log::warn!("{}: {warning}", page.title);
    }

    let document = ConvertedDocument {
        relative_path,
        markdown: conversion.markdown,
        resources: conversion.resources,
    };
    writer.write(&document)?;

    for resource in &document.resources {
        match source.fetch_resource(&resource.url).await {
            Ok(bytes) => {
                writer.write_resource(&document, resource, &bytes)?;
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                log::warn!("Unable to download {} for {}: {e}", resource.url, page.title);
                summary.resource_failures += 1;
            }
        }
    }

    Ok(PageOutcome::Converted)
}

/// Print the per-run summary table
pub fn print_summary(summary: &Summary, writer: &MarkdownWriter) {
    println!();
    let mut table = new_table();
    table.add_row(prettytable::row!["Converted".bold().cyan(), summary.converted.to_string().green()]);
    table.add_row(prettytable::row!["Skipped (cached)".bold().cyan(), summary.skipped]);
    table.add_row(prettytable::row!["Missing".bold().cyan(), summary.missing]);
    table.add_row(prettytable::row!["Failed".bold().cyan(), summary.failed.to_string().red()]);
    if summary.resource_failures > 0 {
        table.add_row(prettytable::row![
            "Resource failures".bold().cyan(),
            summary.resource_failures.to_string().yellow()
        ]);
    }
    table.printstd();

    println!(
        "\nConversion complete! Files saved to {}",
        writer.root().display().to_string().underline()
    );
}
