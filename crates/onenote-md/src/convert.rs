use std::path::PathBuf;

use colored::Colorize;

use crate::export::{export_notebook, print_summary, ExportConfig};
use crate::graph::{GraphClient, GraphConfig, NoteSource, Notebook};
use crate::prelude::{eprintln, println, *};
use crate::prompt::Prompter;
use crate::writer::MarkdownWriter;

use onenote_md_core::cache::{cache_path, CacheStore, FileCache};
use onenote_md_core::convert::ImagePolicy;
use onenote_md_core::filename::DateFormat;

pub const DEFAULT_OUTPUT_DIR: &str = "./onenote_output";

#[derive(Debug, Clone, Copy, clap::ValueEnum, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateFormatArg {
    /// YYYY-MM-DD
    Ymd,
    /// MM-DD-YYYY
    Mdy,
    /// DD-MM-YYYY
    Dmy,
}

impl From<DateFormatArg> for DateFormat {
    fn from(arg: DateFormatArg) -> Self {
        match arg {
            DateFormatArg::Ymd => DateFormat::Ymd,
            DateFormatArg::Mdy => DateFormat::Mdy,
            DateFormatArg::Dmy => DateFormat::Dmy,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImagePolicyArg {
    /// Keep links to the Graph API (default)
    #[default]
    Remote,
    /// Download images and attachments next to the Markdown files
    Local,
}

impl From<ImagePolicyArg> for ImagePolicy {
    fn from(arg: ImagePolicyArg) -> Self {
        match arg {
            ImagePolicyArg::Remote => ImagePolicy::Remote,
            ImagePolicyArg::Local => ImagePolicy::Local,
        }
    }
}

#[derive(Debug, Clone, clap::Args)]
pub struct ConvertOptions {
    /// Microsoft Graph access token (prompted when absent)
    #[arg(long, env = "ONENOTE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Notebook to convert (a menu is shown when absent)
    #[arg(long)]
    notebook_id: Option<String>,

    /// Output directory
    #[arg(short, long, env = "ONENOTE_OUTPUT", default_value = DEFAULT_OUTPUT_DIR)]
    output: PathBuf,

    /// Prefix filenames with the page date using this pattern
    #[arg(long, value_enum, conflicts_with = "no_date_prefix")]
    date_format: Option<DateFormatArg>,

    /// Do not prefix filenames with a date and do not ask about it
    #[arg(long)]
    no_date_prefix: bool,

    /// What to do with images and attachments
    #[arg(long, value_enum, default_value = "remote")]
    images: ImagePolicyArg,

    /// Delay before each API request, in milliseconds
    #[arg(long)]
    request_delay_ms: Option<u64>,

    /// Retries for rate limited or failed requests
    #[arg(long)]
    max_retries: Option<u32>,

    /// Graph API base URL
    #[arg(long, env = "GRAPH_API_BASE")]
    base_url: Option<String>,
}

pub async fn run(options: ConvertOptions, global: crate::Global) -> Result<()> {
    let mut prompter = Prompter::stdio();

    let token = match options.token.clone() {
        Some(token) => token,
        None => prompter.token()?,
    };

    let config = GraphConfig::new(token).with_overrides(
        options.base_url.clone(),
        options.request_delay_ms,
        options.max_retries,
    );
    if global.verbose {
        println!("Graph API Base: {}", config.base_url);
    }

    println!("Authenticating...");
    let client = GraphClient::authenticate(config).await?;
    println!("{}", "Authentication successful".green());

    let notebooks = client.list_notebooks().await?;
    let notebook = select_notebook(&notebooks, options.notebook_id.as_deref(), &mut prompter)?;
    println!("Selected notebook: {}", notebook.display_name.bold());

    let date_format = match (options.no_date_prefix, options.date_format) {
        (true, _) => None,
        (false, Some(arg)) => Some(arg.into()),
        (false, None) => prompter.date_format()?,
    };
    if let Some(format) = date_format {
        println!("Using date format: {}", format.label());
    }

    let export = ExportConfig {
        date_format,
        image_policy: options.images.into(),
    };

    let writer = MarkdownWriter::new(&options.output)?;
    let mut cache = FileCache::load(cache_path(&options.output));
    if !cache.is_empty() {
        println!("Loaded {} converted page(s) from the cache", cache.len());
    }

    let summary = export_notebook(&client, &mut cache, &writer, notebook, &export).await?;
    print_summary(&summary, &writer);
    if summary.failed > 0 {
        eprintln!(
            "{} {} page(s) could not be converted; run again to retry them",
            "Warning:".yellow(),
            summary.failed
        );
    }

    Ok(())
}

/// The notebook named by `notebook_id`, or the one picked from a menu
fn select_notebook<'a, R, W>(
    notebooks: &'a [Notebook],
    notebook_id: Option<&str>,
    prompter: &mut Prompter<R, W>,
) -> Result<&'a Notebook>
where
    R: std::io::BufRead,
    W: std::io::Write,
{
    match notebook_id {
        Some(id) => notebooks
            .iter()
            .find(|n| n.id == id)
            .ok_or_else(|| Error::Config(f!("no notebook with id '{id}'")).into()),
        None => {
            let index = prompter.notebook(notebooks)?;
            Ok(&notebooks[index])
        }
    }
}
