use crate::prelude::*;
use clap::Parser;

mod clear_cache;
mod convert;
mod error;
mod export;
mod graph;
mod list;
mod prelude;
mod prompt;
mod writer;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Convert OneNote notebooks to Markdown files through the Microsoft Graph API"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Whether to display additional information.
    #[clap(long, env = "ONENOTE_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Convert every page of a notebook to Markdown
    Convert(crate::convert::ConvertOptions),

    /// List notebooks, or the sections and pages of one notebook
    List(crate::list::ListOptions),

    /// Forget which pages were already converted
    ClearCache(crate::clear_cache::ClearCacheOptions),
}

#[tokio::main]
async fn main() -> Result<()> {
    let app = App::parse();

    let default_level = if app.global.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
    color_eyre::install()?;

    match app.command {
        SubCommands::Convert(options) => crate::convert::run(options, app.global).await,
        SubCommands::List(options) => crate::list::run(options, app.global).await,
        SubCommands::ClearCache(options) => crate::clear_cache::run(options, app.global),
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
