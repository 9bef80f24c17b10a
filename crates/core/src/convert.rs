//! HTML to Markdown conversion for OneNote page content
//!
//! Pure transformation: the input is parsed with an HTML5 parser, so any byte
//! sequence produces a document, and the tree is rendered with a fixed tag
//! mapping. Elements outside the mapping degrade to their text content and are
//! reported as [`ConversionWarning`]s instead of failing the conversion.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};

use crate::filename::sanitize_filename;

/// Directory, relative to the Markdown file, that local resources are written to
pub const ASSETS_DIR: &str = "assets";

static RESOURCE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/resources/([^/?#]+)").expect("valid resource id regex"));

/// Elements rendered as their own block(s)
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "li", "table", "pre",
    "blockquote", "hr", "html", "body", "section", "article", "header", "footer", "main",
    "nav", "aside", "figure", "figcaption", "center", "address", "details", "summary",
    "fieldset", "form", "dl", "dt", "dd",
];

/// Elements whose content is rendered without any markup and without a warning
const TRANSPARENT_INLINE_TAGS: &[&str] = &[
    "span", "font", "u", "ins", "sup", "sub", "small", "big", "mark", "abbr", "cite", "label",
    "q", "time", "bdi", "bdo", "var", "dfn", "nobr", "wbr",
];

/// Elements dropped together with their content
const DROPPED_TAGS: &[&str] = &[
    "head", "title", "meta", "style", "script", "link", "noscript", "template", "base",
];

/// Where image and attachment references point in the generated Markdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImagePolicy {
    /// Keep the remote URLs from the page
    #[default]
    Remote,
    /// Point at `assets/<id>.<ext>` next to the Markdown file, to be downloaded by the caller
    Local,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvertOptions {
    pub image_policy: ImagePolicy,
}

/// Remote file referenced by a converted page under [`ImagePolicy::Local`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub url: String,
    /// Path relative to the Markdown file
    pub local_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionWarning {
    #[error("unsupported element <{0}> rendered as plain text")]
    UnsupportedElement(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversion {
    pub markdown: String,
    pub resources: Vec<Resource>,
    pub warnings: Vec<ConversionWarning>,
}

/// A converted page ready to be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedDocument {
    /// Path of the Markdown file relative to the output directory
    pub relative_path: PathBuf,
    pub markdown: String,
    pub resources: Vec<Resource>,
}

impl ConvertedDocument {
    /// Path of a resource relative to the output directory
    pub fn resource_path(&self, resource: &Resource) -> PathBuf {
        self.relative_path
            .parent()
            .map(|dir| dir.join(&resource.local_path))
            .unwrap_or_else(|| PathBuf::from(&resource.local_path))
    }
}

/// Convert HTML to Markdown with default options
pub fn convert(html: &str) -> String {
    convert_with(html, &ConvertOptions::default()).markdown
}

pub fn convert_with(html: &str, options: &ConvertOptions) -> Conversion {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let body = root
        .children()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "body")
        .unwrap_or(root);

    let mut renderer = Renderer::new(options);
    let blocks = renderer.render_blocks(body);

    let markdown = blocks
        .iter()
        .map(|b| b.trim_end())
        .filter(|b| !b.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");
    let markdown = markdown.trim_matches('\n');

    Conversion {
        markdown: if markdown.is_empty() {
            String::new()
        } else {
            format!("{markdown}\n")
        },
        resources: renderer.resources,
        warnings: renderer
            .unsupported
            .into_iter()
            .map(ConversionWarning::UnsupportedElement)
            .collect(),
    }
}

struct Renderer<'o> {
    options: &'o ConvertOptions,
    resources: Vec<Resource>,
    unsupported: BTreeSet<String>,
    code_depth: usize,
}

impl<'o> Renderer<'o> {
    fn new(options: &'o ConvertOptions) -> Self {
        Self {
            options,
            resources: Vec::new(),
            unsupported: BTreeSet::new(),
            code_depth: 0,
        }
    }

    fn note_unknown(&mut self, name: &str) {
        let known = BLOCK_TAGS.contains(&name)
            || TRANSPARENT_INLINE_TAGS.contains(&name)
            || DROPPED_TAGS.contains(&name);
        if !known {
            self.unsupported.insert(name.to_string());
        }
    }

    fn render_blocks(&mut self, el: ElementRef<'_>) -> Vec<String> {
        let mut blocks = Vec::new();
        let mut inline = String::new();

        for child in el.children() {
            if let Some(child_el) = ElementRef::wrap(child) {
                if is_block(child_el) {
                    flush_inline(&mut inline, &mut blocks);
                    blocks.extend(self.render_block(child_el));
                } else {
                    inline.push_str(&self.render_inline(child_el));
                }
            } else if let Some(text) = child.value().as_text() {
                inline.push_str(&self.render_text(text));
            }
        }
        flush_inline(&mut inline, &mut blocks);

        blocks
    }

    fn render_block(&mut self, el: ElementRef<'_>) -> Vec<String> {
        let name = el.value().name();
        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = heading_level(name);
                let text = single_line(&normalize_inline(&self.render_inline_children(el)));
                if text.is_empty() {
                    Vec::new()
                } else {
                    vec![format!("{} {}", "#".repeat(level), text)]
                }
            }
            "p" => {
                let mut blocks = self.render_blocks(el);
                if let (Some(done), Some(first)) = (todo_state(el), blocks.first_mut()) {
                    *first = format!("- [{}] {}", if done { "x" } else { " " }, first);
                }
                blocks
            }
            "ul" | "ol" => non_empty(self.render_list(el)),
            "li" => {
                let item = self.render_list_item(el);
                non_empty(indent_item("- ", &item))
            }
            "table" => non_empty(self.render_table(el)),
            "pre" => non_empty(render_pre(el)),
            "blockquote" => {
                let inner = self.render_blocks(el).join("\n\n");
                non_empty(
                    inner
                        .lines()
                        .map(|line| {
                            if line.is_empty() {
                                ">".to_string()
                            } else {
                                format!("> {line}")
                            }
                        })
                        .collect::<Vec<_>>()
                        .join("\n"),
                )
            }
            "hr" => vec!["---".to_string()],
            _ if DROPPED_TAGS.contains(&name) => Vec::new(),
            _ => {
                self.note_unknown(name);
                self.render_blocks(el)
            }
        }
    }

    fn render_list(&mut self, el: ElementRef<'_>) -> String {
        let ordered = el.value().name() == "ol";
        let mut number = el
            .value()
            .attr("start")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(1);

        // (marker width, rendered item)
        let mut items: Vec<(usize, String)> = Vec::new();

        for child in el.children() {
            if let Some(child_el) = ElementRef::wrap(child) {
                match child_el.value().name() {
                    "li" => {
                        let marker = if ordered {
                            format!("{number}. ")
                        } else {
                            "- ".to_string()
                        };
                        number += 1;
                        let content = self.render_list_item(child_el);
                        items.push((marker.len(), indent_item(&marker, &content)));
                    }
                    "ul" | "ol" => {
                        let nested = self.render_list(child_el);
                        if nested.is_empty() {
                            continue;
                        }
                        match items.last_mut() {
                            Some((width, item)) => {
                                item.push('\n');
                                item.push_str(&indent_lines(&nested, *width));
                            }
                            None => items.push((0, nested)),
                        }
                    }
                    _ if DROPPED_TAGS.contains(&child_el.value().name()) => {}
                    _ => {
                        let content = self.render_blocks_from(child_el).join("\n");
                        if !content.trim().is_empty() {
                            items.push((2, indent_item("- ", &content)));
                        }
                    }
                }
            } else if let Some(text) = child.value().as_text() {
                let content = normalize_inline(&self.render_text(text));
                if !content.is_empty() {
                    items.push((2, indent_item("- ", &content)));
                }
            }
        }

        items
            .into_iter()
            .map(|(_, item)| item)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Render an element as blocks whether it is a block element or inline content
    fn render_blocks_from(&mut self, el: ElementRef<'_>) -> Vec<String> {
        if is_block(el) {
            self.render_block(el)
        } else {
            let inline = normalize_inline(&self.render_inline(el));
            non_empty(inline)
        }
    }

    fn render_list_item(&mut self, li: ElementRef<'_>) -> String {
        let content = self.render_blocks(li).join("\n");
        match todo_state(li) {
            Some(done) => format!("[{}] {}", if done { "x" } else { " " }, content),
            None => content,
        }
    }

    fn render_table(&mut self, table: ElementRef<'_>) -> String {
        let mut rows: Vec<Vec<String>> = Vec::new();

        for row in table_rows(table) {
            let cells = row
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|c| matches!(c.value().name(), "td" | "th"))
                .map(|cell| {
                    self.render_blocks(cell)
                        .join("<br>")
                        .replace('\n', "<br>")
                        .replace('|', "\\|")
                })
                .collect::<Vec<_>>();
            rows.push(cells);
        }

        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        if columns == 0 {
            return String::new();
        }

        let format_row = |cells: &[String]| {
            let padded = (0..columns)
                .map(|i| cells.get(i).map(String::as_str).unwrap_or(""))
                .collect::<Vec<_>>();
            format!("| {} |", padded.join(" | "))
        };

        let mut lines = Vec::with_capacity(rows.len() + 1);
        lines.push(format_row(&rows[0]));
        lines.push(format!("|{}", " --- |".repeat(columns)));
        for row in &rows[1..] {
            lines.push(format_row(row));
        }
        lines.join("\n")
    }

    fn render_inline_children(&mut self, el: ElementRef<'_>) -> String {
        let mut out = String::new();
        for child in el.children() {
            if let Some(child_el) = ElementRef::wrap(child) {
                out.push_str(&self.render_inline(child_el));
            } else if let Some(text) = child.value().as_text() {
                out.push_str(&self.render_text(text));
            }
        }
        out
    }

    fn render_inline(&mut self, el: ElementRef<'_>) -> String {
        let name = el.value().name();
        match name {
            "br" => "\n".to_string(),
            "b" | "strong" => {
                let inner = self.render_inline_children(el);
                self.emphasize(&inner, "**")
            }
            "i" | "em" => {
                let inner = self.render_inline_children(el);
                self.emphasize(&inner, "*")
            }
            "s" | "del" | "strike" => {
                let inner = self.render_inline_children(el);
                self.emphasize(&inner, "~~")
            }
            "code" | "kbd" | "samp" | "tt" => {
                self.code_depth += 1;
                let inner = self.render_inline_children(el);
                self.code_depth -= 1;
                if self.code_depth > 0 {
                    inner
                } else {
                    code_span(&inner)
                }
            }
            "a" => self.render_link(el),
            "img" => self.render_image(el),
            "object" => self.render_attachment(el),
            "iframe" => {
                let src = el
                    .value()
                    .attr("data-original-src")
                    .or_else(|| el.value().attr("src"))
                    .map(str::trim)
                    .filter(|s| !s.is_empty());
                match src {
                    Some(src) => format!("[{}]({})", escape_text(src), link_destination(src)),
                    None => String::new(),
                }
            }
            "span" => {
                let mut inner = self.render_inline_children(el);
                let style = SpanStyle::parse(el.value().attr("style").unwrap_or(""));
                if style.strike {
                    inner = self.emphasize(&inner, "~~");
                }
                if style.italic {
                    inner = self.emphasize(&inner, "*");
                }
                if style.bold {
                    inner = self.emphasize(&inner, "**");
                }
                inner
            }
            _ if DROPPED_TAGS.contains(&name) => String::new(),
            _ if TRANSPARENT_INLINE_TAGS.contains(&name) => self.render_inline_children(el),
            _ if BLOCK_TAGS.contains(&name) => {
                // Block element inside a heading or link: keep words apart
                format!(" {} ", self.render_inline_children(el))
            }
            _ => {
                self.note_unknown(name);
                self.render_inline_children(el)
            }
        }
    }

    fn render_text(&self, text: &str) -> String {
        let collapsed = collapse_whitespace(text);
        if self.code_depth > 0 {
            collapsed
        } else {
            escape_text(&collapsed)
        }
    }

    fn emphasize(&self, inner: &str, marker: &str) -> String {
        let core = inner.trim();
        if core.is_empty() || self.code_depth > 0 {
            return inner.to_string();
        }
        let lead = &inner[..inner.len() - inner.trim_start().len()];
        let trail = &inner[inner.trim_end().len()..];
        format!("{lead}{marker}{core}{marker}{trail}")
    }

    fn render_link(&mut self, el: ElementRef<'_>) -> String {
        let text = single_line(&normalize_inline(&self.render_inline_children(el)));
        let href = el
            .value()
            .attr("href")
            .map(str::trim)
            .filter(|h| !h.is_empty());

        match href {
            _ if self.code_depth > 0 => text,
            None => text,
            Some(href) if text.is_empty() => {
                format!("[{}]({})", escape_text(href), link_destination(href))
            }
            Some(href) => format!("[{text}]({})", link_destination(href)),
        }
    }

    fn render_image(&mut self, el: ElementRef<'_>) -> String {
        let alt = el
            .value()
            .attr("alt")
            .map(|a| single_line(&collapse_whitespace(a)).trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| "image".to_string());
        let src = el
            .value()
            .attr("src")
            .or_else(|| el.value().attr("data-fullres-src"))
            .map(str::trim)
            .filter(|s| !s.is_empty());

        match src {
            Some(src) => {
                let target = self.resolve_resource(src, el.value().attr("data-src-type"), None);
                format!("![{}]({})", escape_text(&alt), link_destination(&target))
            }
            None => escape_text(&alt),
        }
    }

    fn render_attachment(&mut self, el: ElementRef<'_>) -> String {
        let name = el
            .value()
            .attr("data-attachment")
            .map(str::trim)
            .filter(|n| !n.is_empty());
        let data = el
            .value()
            .attr("data")
            .map(str::trim)
            .filter(|d| !d.is_empty());

        match (name, data) {
            (name, Some(url)) => {
                let label = name.unwrap_or("attachment");
                let target = self.resolve_resource(url, el.value().attr("type"), name);
                format!("[{}]({})", escape_text(label), link_destination(&target))
            }
            (Some(name), None) => escape_text(name),
            (None, None) => self.render_inline_children(el),
        }
    }

    /// Link target for a remote resource under the configured image policy
    fn resolve_resource(&mut self, url: &str, type_hint: Option<&str>, file_name: Option<&str>) -> String {
        if self.options.image_policy == ImagePolicy::Remote || !is_remote_url(url) {
            return url.to_string();
        }

        if let Some(existing) = self.resources.iter().find(|r| r.url == url) {
            return existing.local_path.clone();
        }

        let local_path = local_resource_path(url, type_hint, file_name);
        self.resources.push(Resource {
            url: url.to_string(),
            local_path: local_path.clone(),
        });
        local_path
    }
}

/// Only `http(s)` targets can be downloaded; `data:` URIs and relative paths stay as written
fn is_remote_url(url: &str) -> bool {
    let scheme = url.split_once(':').map(|(scheme, _)| scheme.to_ascii_lowercase());
    matches!(scheme.as_deref(), Some("http" | "https"))
}

fn is_block(el: ElementRef<'_>) -> bool {
    let name = el.value().name();
    if BLOCK_TAGS.contains(&name) {
        return true;
    }
    if DROPPED_TAGS.contains(&name) {
        return false;
    }
    el.children().filter_map(ElementRef::wrap).any(is_block)
}

fn heading_level(name: &str) -> usize {
    name[1..].parse::<usize>().unwrap_or(1).clamp(1, 6)
}

fn non_empty(block: String) -> Vec<String> {
    if block.trim().is_empty() {
        Vec::new()
    } else {
        vec![block]
    }
}

fn flush_inline(inline: &mut String, blocks: &mut Vec<String>) {
    let normalized = normalize_inline(inline);
    if !normalized.is_empty() {
        blocks.push(normalized);
    }
    inline.clear();
}

/// OneNote marks checkboxes with `data-tag="to-do"` or `"to-do:completed"`, possibly among other tags
fn todo_state(el: ElementRef<'_>) -> Option<bool> {
    let tags = el.value().attr("data-tag")?;
    let tags: Vec<&str> = tags.split(',').map(str::trim).collect();
    if tags.contains(&"to-do:completed") {
        Some(true)
    } else if tags.contains(&"to-do") {
        Some(false)
    } else {
        None
    }
}

/// Emphasis flags from an inline `style` attribute
#[derive(Debug, Default, PartialEq, Eq)]
struct SpanStyle {
    bold: bool,
    italic: bool,
    strike: bool,
}

impl SpanStyle {
    fn parse(style: &str) -> Self {
        let mut out = SpanStyle::default();
        for declaration in style.split(';') {
            let Some((property, value)) = declaration.split_once(':') else {
                continue;
            };
            let value = value.trim().to_ascii_lowercase();
            match property.trim().to_ascii_lowercase().as_str() {
                "font-weight" => {
                    out.bold = value == "bold"
                        || value == "bolder"
                        || value.parse::<u16>().map(|w| w >= 600).unwrap_or(false)
                }
                "font-style" => out.italic = value == "italic" || value == "oblique",
                "text-decoration" | "text-decoration-line" => {
                    out.strike = value.contains("line-through")
                }
                _ => {}
            }
        }
        out
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// Trim each line, squeeze repeated spaces and blank lines
fn normalize_inline(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    for line in text.split('\n') {
        let squeezed = line.split(' ').filter(|w| !w.is_empty()).collect::<Vec<_>>().join(" ");
        if squeezed.is_empty() && lines.last().map(|l| l.is_empty()).unwrap_or(true) {
            continue;
        }
        lines.push(squeezed);
    }
    while lines.last().map(|l| l.is_empty()).unwrap_or(false) {
        lines.pop();
    }
    lines.join("\n")
}

fn single_line(text: &str) -> String {
    text.split('\n')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '`' | '*' | '_' | '[' | ']' | '<') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn code_span(content: &str) -> String {
    let content = content.trim();
    if content.is_empty() {
        return String::new();
    }

    let longest_run = content
        .split(|c: char| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest_run + 1);
    if content.starts_with('`') || content.ends_with('`') {
        format!("{fence} {content} {fence}")
    } else {
        format!("{fence}{content}{fence}")
    }
}

fn link_destination(href: &str) -> String {
    if href.contains([' ', '(', ')', '<', '>']) {
        format!("<{}>", href.replace('<', "%3C").replace('>', "%3E"))
    } else {
        href.to_string()
    }
}

fn render_pre(el: ElementRef<'_>) -> String {
    let content: String = el.text().collect();
    let content = content.trim_end_matches('\n');
    if content.trim().is_empty() {
        return String::new();
    }

    let mut fence = "```".to_string();
    while content.contains(&fence) {
        fence.push('`');
    }
    format!("{fence}\n{content}\n{fence}")
}

fn table_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(
                child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|r| r.value().name() == "tr"),
            ),
            _ => {}
        }
    }
    rows
}

/// Prefix the first line with `marker` and indent continuation lines by its width
fn indent_item(marker: &str, content: &str) -> String {
    let content = content.trim_matches('\n');
    if content.is_empty() {
        return marker.trim_end().to_string();
    }

    let width = marker.len();
    let mut lines = content.lines();
    let mut out = format!("{marker}{}", lines.next().unwrap_or(""));
    for line in lines {
        out.push('\n');
        if !line.is_empty() {
            out.push_str(&" ".repeat(width));
            out.push_str(line);
        }
    }
    out
}

fn indent_lines(content: &str, width: usize) -> String {
    content
        .lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{line}", " ".repeat(width))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `assets/<id>.<ext>` for images, `assets/<id>-<name>` for named attachments
fn local_resource_path(url: &str, type_hint: Option<&str>, file_name: Option<&str>) -> String {
    let id = RESOURCE_ID
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| sanitize_filename(m.as_str()))
        .unwrap_or_else(|| format!("{:x}", md5::compute(url.as_bytes()))[..12].to_string());

    let name = match file_name {
        Some(file_name) => format!("{id}-{}", sanitize_filename(file_name)),
        None => {
            let ext = type_hint
                .and_then(extension_from_mime)
                .or_else(|| extension_from_url(url))
                .unwrap_or_else(|| "png".to_string());
            format!("{id}.{ext}")
        }
    };

    format!("{ASSETS_DIR}/{name}")
}

fn extension_from_mime(mime: &str) -> Option<String> {
    let subtype = mime.split(';').next()?.split('/').nth(1)?.trim().to_ascii_lowercase();
    let ext = match subtype.as_str() {
        "jpeg" | "pjpeg" => "jpg".to_string(),
        "svg+xml" => "svg".to_string(),
        "x-icon" | "vnd.microsoft.icon" => "ico".to_string(),
        other => other.to_string(),
    };
    valid_extension(&ext).then_some(ext)
}

fn extension_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    let segment = path.rsplit('/').next()?;
    let (_, ext) = segment.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    valid_extension(&ext).then_some(ext)
}

fn valid_extension(ext: &str) -> bool {
    (1..=5).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulldown_cmark::{Event, HeadingLevel, Parser, Tag};

    fn local() -> ConvertOptions {
        ConvertOptions {
            image_policy: ImagePolicy::Local,
        }
    }

    #[test]
    fn test_heading_and_bold_paragraph() {
        let md = convert("<h1>Trip</h1><p>Pack <b>sunscreen</b></p>");
        assert_eq!(md, "# Trip\n\nPack **sunscreen**\n");
    }

    #[test]
    fn test_heading_levels() {
        let md = convert("<h2>Two</h2><h6>Six</h6>");
        assert_eq!(md, "## Two\n\n###### Six\n");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(convert(""), "");
        assert_eq!(convert("<html><head><title>x</title></head><body> </body></html>"), "");
    }

    #[test]
    fn test_onenote_page_structure() {
        let html = r#"<html lang="en-US">
            <head>
                <title>Trip Plan</title>
                <meta http-equiv="Content-Type" content="text/html; charset=utf-8" />
                <meta name="created" content="2023-05-01T08:00:00.0000000" />
            </head>
            <body data-absolute-enabled="true" style="font-family:Calibri;font-size:11pt">
                <div id="div:{1}" data-id="_default" style="position:absolute;left:48px;top:115px;width:624px">
                    <p style="margin-top:0pt;margin-bottom:0pt">First line</p>
                    <p style="margin-top:0pt;margin-bottom:0pt">Second <span style="font-weight:bold">line</span></p>
                </div>
            </body>
        </html>"#;
        let md = convert(html);
        assert_eq!(md, "First line\n\nSecond **line**\n");
    }

    #[test]
    fn test_italic_and_strike() {
        assert_eq!(convert("<p><i>a</i> <em>b</em> <s>c</s></p>"), "*a* *b* ~~c~~\n");
        assert_eq!(
            convert(r#"<p><span style="font-style: italic; text-decoration:line-through">x</span></p>"#),
            "*~~x~~*\n"
        );
    }

    #[test]
    fn test_emphasis_keeps_whitespace_outside_markers() {
        assert_eq!(convert("<p>a<b> bold </b>b</p>"), "a **bold** b\n");
        assert_eq!(convert("<p>a<b>  </b>b</p>"), "a b\n");
    }

    #[test]
    fn test_unordered_and_ordered_lists() {
        let md = convert("<ul><li>One</li><li>Two</li></ul><ol><li>First</li><li>Second</li></ol>");
        assert_eq!(md, "- One\n- Two\n\n1. First\n2. Second\n");
    }

    #[test]
    fn test_ordered_list_start() {
        assert_eq!(convert(r#"<ol start="4"><li>d</li><li>e</li></ol>"#), "4. d\n5. e\n");
    }

    #[test]
    fn test_nested_list_inside_item() {
        let md = convert("<ul><li>Parent<ul><li>Child</li></ul></li><li>Next</li></ul>");
        assert_eq!(md, "- Parent\n  - Child\n- Next\n");
    }

    #[test]
    fn test_nested_list_as_sibling_of_items() {
        let md = convert("<ol><li>Parent</li><ul><li>Child</li></ul></ol>");
        assert_eq!(md, "1. Parent\n   - Child\n");
    }

    #[test]
    fn test_todo_paragraphs() {
        let html = r#"<p data-tag="to-do">Buy milk</p><p data-tag="to-do:completed">Book flight</p>"#;
        assert_eq!(convert(html), "- [ ] Buy milk\n\n- [x] Book flight\n");
    }

    #[test]
    fn test_todo_list_items() {
        let html = r#"<ul><li data-tag="important,to-do">Call</li></ul>"#;
        assert_eq!(convert(html), "- [ ] Call\n");
    }

    #[test]
    fn test_table() {
        let html = "<table><tr><td>Name</td><td>Qty</td></tr><tr><td>Apple</td><td>3</td></tr><tr><td>a|b</td></tr></table>";
        assert_eq!(
            convert(html),
            "| Name | Qty |\n| --- | --- |\n| Apple | 3 |\n| a\\|b |  |\n"
        );
    }

    #[test]
    fn test_table_with_tbody_and_multiline_cell() {
        let html = "<table><thead><tr><th>H</th></tr></thead><tbody><tr><td><p>x</p><p>y</p></td></tr></tbody></table>";
        assert_eq!(convert(html), "| H |\n| --- |\n| x<br>y |\n");
    }

    #[test]
    fn test_links() {
        assert_eq!(
            convert(r#"<p><a href="https://example.com">Example</a></p>"#),
            "[Example](https://example.com)\n"
        );
        assert_eq!(convert(r#"<p><a>No target</a></p>"#), "No target\n");
        assert_eq!(
            convert(r#"<p><a href="https://example.com/x"></a></p>"#),
            "[https://example.com/x](https://example.com/x)\n"
        );
        assert_eq!(
            convert(r#"<p><a href="file name.pdf">f</a></p>"#),
            "[f](<file name.pdf>)\n"
        );
    }

    #[test]
    fn test_remote_image() {
        let html = r#"<p><img alt="Beach" src="https://graph.microsoft.com/v1.0/users('x')/onenote/resources/0-abc!1-def/$value" data-src-type="image/png" /></p>"#;
        let conversion = convert_with(html, &ConvertOptions::default());
        assert_eq!(
            conversion.markdown,
            "![Beach](<https://graph.microsoft.com/v1.0/users('x')/onenote/resources/0-abc!1-def/$value>)\n"
        );
        assert!(conversion.resources.is_empty());
    }

    #[test]
    fn test_local_image() {
        let url = "https://graph.microsoft.com/v1.0/users('x')/onenote/resources/0-abc!1-def/$value";
        let html = format!(r#"<p><img src="{url}" data-src-type="image/jpeg"><img src="{url}"></p>"#);
        let conversion = convert_with(&html, &local());
        assert_eq!(
            conversion.markdown,
            "![image](assets/0-abc!1-def.jpg)![image](assets/0-abc!1-def.jpg)\n"
        );
        assert_eq!(
            conversion.resources,
            vec![Resource {
                url: url.to_string(),
                local_path: "assets/0-abc!1-def.jpg".to_string(),
            }]
        );
    }

    #[test]
    fn test_local_image_without_resource_id() {
        let conversion = convert_with(r#"<img src="https://example.com/pics/cat.GIF?x=1">"#, &local());
        let path = &conversion.resources[0].local_path;
        assert!(path.starts_with("assets/"));
        assert!(path.ends_with(".gif"));
        assert_eq!(path.len(), "assets/".len() + 12 + ".gif".len());
    }

    #[test]
    fn test_local_policy_leaves_inline_and_relative_sources() {
        let html = r#"<p><img src="data:image/png;base64,AAAA"><img src="image.png"><img src="HTTPS://example.com/a.png"></p>"#;
        let conversion = convert_with(html, &local());
        assert!(conversion
            .markdown
            .starts_with("![image](data:image/png;base64,AAAA)![image](image.png)![image](assets/"));
        assert_eq!(conversion.resources.len(), 1);
        assert_eq!(conversion.resources[0].url, "HTTPS://example.com/a.png");
    }

    #[test]
    fn test_attachment_object() {
        let html = r#"<object data-attachment="report.pdf" type="application/pdf" data="https://graph.microsoft.com/v1.0/me/onenote/resources/0-99/$value"></object>"#;
        assert_eq!(
            convert(html),
            "[report.pdf](https://graph.microsoft.com/v1.0/me/onenote/resources/0-99/$value)\n"
        );
        let conversion = convert_with(html, &local());
        assert_eq!(conversion.markdown, "[report.pdf](assets/0-99-report.pdf)\n");
    }

    #[test]
    fn test_code_and_pre() {
        assert_eq!(convert("<p>Run <code>cargo *build*</code></p>"), "Run `cargo *build*`\n");
        assert_eq!(convert("<p><code>a`b</code></p>"), "``a`b``\n");
        assert_eq!(
            convert("<pre>fn main() {\n    println!(\"hi\");\n}\n</pre>"),
            "```\nfn main() {\n    println!(\"hi\");\n}\n```\n"
        );
    }

    #[test]
    fn test_blockquote_and_rule() {
        assert_eq!(
            convert("<blockquote><p>a</p><p>b</p></blockquote><hr>"),
            "> a\n>\n> b\n\n---\n"
        );
    }

    #[test]
    fn test_line_breaks() {
        assert_eq!(convert("<p>one<br>two</p>"), "one\ntwo\n");
    }

    #[test]
    fn test_escapes_markdown_punctuation() {
        assert_eq!(convert("<p>2 * 3 = snake_case [x] &lt;tag&gt;</p>"), "2 \\* 3 = snake\\_case \\[x\\] \\<tag>\n");
    }

    #[test]
    fn test_scripts_and_styles_are_dropped() {
        let html = "<head><style>p{}</style></head><body><script>alert(1)</script><p>Visible</p></body>";
        assert_eq!(convert(html), "Visible\n");
    }

    #[test]
    fn test_unknown_elements_degrade_to_text() {
        let conversion = convert_with("<p>Hello <blink>world</blink></p><marquee>moving</marquee>", &ConvertOptions::default());
        assert_eq!(conversion.markdown, "Hello world\n\nmoving\n");
        assert_eq!(
            conversion.warnings,
            vec![
                ConversionWarning::UnsupportedElement("blink".to_string()),
                ConversionWarning::UnsupportedElement("marquee".to_string()),
            ]
        );
    }

    #[test]
    fn test_malformed_html_never_fails() {
        let inputs = [
            "<p>unclosed <b>bold",
            "</div></div><li>orphan",
            "<table><td>cell<tr>",
            "<<<>>>",
            "<ul><ul><ul><li>deep",
            "<a href=>x</a><img>",
            "\u{0}\u{1}binary\u{fffd}",
            "<h7>not a heading</h7>",
        ];
        for input in inputs {
            let _ = convert(input);
        }
        assert_eq!(convert("<p>unclosed <b>bold"), "unclosed **bold**\n");
        assert_eq!(convert("<li>orphan"), "- orphan\n");
    }

    #[test]
    fn test_deeply_nested_markup() {
        let html = format!("{}text{}", "<div>".repeat(200), "</div>".repeat(200));
        assert_eq!(convert(&html), "text\n");
    }

    #[test]
    fn test_resource_path_is_relative_to_document() {
        let doc = ConvertedDocument {
            relative_path: PathBuf::from("Travel/Trip.md"),
            markdown: String::new(),
            resources: vec![],
        };
        let resource = Resource {
            url: "u".to_string(),
            local_path: "assets/1.png".to_string(),
        };
        assert_eq!(doc.resource_path(&resource), PathBuf::from("Travel/assets/1.png"));
    }

    #[test]
    fn test_span_style_parse() {
        assert_eq!(
            SpanStyle::parse("font-weight:700;font-style:normal"),
            SpanStyle {
                bold: true,
                italic: false,
                strike: false
            }
        );
        assert_eq!(SpanStyle::parse("garbage;;:"), SpanStyle::default());
    }

    /// Headings, list depth and link targets seen by a CommonMark parser
    fn structure(markdown: &str) -> (Vec<u8>, Vec<usize>, Vec<String>) {
        let mut headings = Vec::new();
        let mut list_depths = Vec::new();
        let mut links = Vec::new();
        let mut depth = 0usize;

        for event in Parser::new(markdown) {
            match event {
                Event::Start(Tag::Heading { level, .. }) => headings.push(match level {
                    HeadingLevel::H1 => 1,
                    HeadingLevel::H2 => 2,
                    HeadingLevel::H3 => 3,
                    HeadingLevel::H4 => 4,
                    HeadingLevel::H5 => 5,
                    HeadingLevel::H6 => 6,
                }),
                Event::Start(Tag::List(_)) => depth += 1,
                Event::End(pulldown_cmark::TagEnd::List(_)) => depth -= 1,
                Event::Start(Tag::Item) => list_depths.push(depth),
                Event::Start(Tag::Link { dest_url, .. }) => links.push(dest_url.to_string()),
                _ => {}
            }
        }

        (headings, list_depths, links)
    }

    #[test]
    fn test_structure_survives_markdown_parsing() {
        let html = r#"
            <h1>Plan</h1>
            <h3>Details</h3>
            <ul>
                <li>Day <a href="https://example.com/day1">one</a>
                    <ol><li>Morning</li><li>Evening<ul><li>Dinner</li></ul></li></ol>
                </li>
                <li>Day two</li>
            </ul>
            <h2>Links</h2>
            <p><a href="https://example.com/a_b?c=1">under_score</a></p>
        "#;
        let md = convert(html);
        let (headings, depths, links) = structure(&md);

        assert_eq!(headings, vec![1, 3, 2]);
        assert_eq!(depths, vec![1, 2, 2, 3, 1]);
        assert_eq!(
            links,
            vec!["https://example.com/day1", "https://example.com/a_b?c=1"]
        );
    }

    #[test]
    fn test_table_structure_survives_markdown_parsing() {
        let md = convert("<table><tr><td>a</td><td>b</td></tr><tr><td>1</td><td>2</td></tr></table>");
        let mut options = pulldown_cmark::Options::empty();
        options.insert(pulldown_cmark::Options::ENABLE_TABLES);
        let cells = Parser::new_ext(&md, options)
            .filter(|e| matches!(e, Event::Start(Tag::TableCell)))
            .count();
        assert_eq!(cells, 4);
    }
}
