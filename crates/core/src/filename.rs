//! Output file naming: sanitization, date prefixes and collision handling

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::graph::{Page, Section};

const INVALID_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
const MAX_NAME_CHARS: usize = 200;
/// Most filesystems limit a single path component to 255 bytes
const MAX_NAME_BYTES: usize = 255;
const EXTENSION: &str = ".md";

/// Date prefix patterns offered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateFormat {
    /// 2023-05-01
    Ymd,
    /// 05-01-2023
    Mdy,
    /// 01-05-2023
    Dmy,
}

impl DateFormat {
    pub const ALL: [DateFormat; 3] = [DateFormat::Ymd, DateFormat::Mdy, DateFormat::Dmy];

    pub fn pattern(&self) -> &'static str {
        match self {
            DateFormat::Ymd => "%Y-%m-%d",
            DateFormat::Mdy => "%m-%d-%Y",
            DateFormat::Dmy => "%d-%m-%Y",
        }
    }

    /// Pattern in the form shown to users
    pub fn label(&self) -> &'static str {
        match self {
            DateFormat::Ymd => "YYYY-MM-DD",
            DateFormat::Mdy => "MM-DD-YYYY",
            DateFormat::Dmy => "DD-MM-YYYY",
        }
    }

    pub fn format(&self, timestamp: &DateTime<Utc>) -> String {
        timestamp.format(self.pattern()).to_string()
    }
}

/// Make a page or section title safe to use as a single path component.
///
/// Path separators and characters reserved on common filesystems become `_`,
/// control characters are dropped, the result is capped at 200 characters
/// (and 255 bytes) and an empty result becomes `Untitled`.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if INVALID_CHARS.contains(&c) { '_' } else { c })
        .take(MAX_NAME_CHARS)
        .collect();

    let trimmed = trim_name(truncate_bytes(&replaced, MAX_NAME_BYTES));
    if trimmed.is_empty() {
        "Untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

fn trim_name(name: &str) -> &str {
    name.trim().trim_end_matches('.').trim_end()
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a character
fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// `stem` plus `suffix` and the extension, shortening the stem so the whole
/// name stays within the filesystem limit
fn file_name(stem: &str, suffix: &str) -> String {
    let budget = MAX_NAME_BYTES - suffix.len() - EXTENSION.len();
    let stem = trim_name(truncate_bytes(stem, budget));
    format!("{stem}{suffix}{EXTENSION}")
}

/// Filename stem for a page, without extension or disambiguation suffix
pub fn document_stem(page: &Page, date_format: Option<DateFormat>) -> String {
    let title = sanitize_filename(&page.title);
    match (date_format, page.timestamp()) {
        (Some(format), Some(timestamp)) => format!("{}-{}", format.format(&timestamp), title),
        _ => title,
    }
}

/// Plan Markdown filenames for every page of one section, in listing order.
///
/// `reserved` holds names already in use in the section directory, such as
/// files written by an earlier run; they are never handed out again. The first
/// page with a free name keeps it, later pages whose name collides (ignoring
/// case) get ` (2)`, ` (3)`, ... appended to the stem.
pub fn plan_filenames(
    pages: &[Page],
    date_format: Option<DateFormat>,
    reserved: &[String],
) -> Vec<String> {
    let mut taken: HashSet<String> = reserved.iter().map(|name| name.to_lowercase()).collect();

    pages
        .iter()
        .map(|page| {
            let stem = document_stem(page, date_format);
            let mut candidate = file_name(&stem, "");
            let mut counter = 2;
            while !taken.insert(candidate.to_lowercase()) {
                candidate = file_name(&stem, &format!(" ({counter})"));
                counter += 1;
            }
            candidate
        })
        .collect()
}

/// Directory of a section relative to the output root
pub fn section_dir(section: &Section) -> PathBuf {
    section
        .group_path
        .iter()
        .chain(std::iter::once(&section.display_name))
        .map(|name| sanitize_filename(name))
        .collect()
}
