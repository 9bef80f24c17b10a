use colored::Colorize;

use crate::graph::{load_notebook, GraphClient, GraphConfig, NoteSource, Notebook};
use crate::prelude::{println, *};
use crate::prompt::Prompter;

#[derive(Debug, Clone, clap::Args)]
pub struct ListOptions {
    /// Microsoft Graph access token (prompted when absent)
    #[arg(long, env = "ONENOTE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Show the sections and pages of this notebook instead
    #[arg(long)]
    notebook_id: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Graph API base URL
    #[arg(long, env = "GRAPH_API_BASE")]
    base_url: Option<String>,
}

pub async fn run(options: ListOptions, global: crate::Global) -> Result<()> {
    let token = match options.token {
        Some(token) => token,
        None => Prompter::stdio().token()?,
    };
    let config = GraphConfig::new(token).with_overrides(options.base_url, None, None);
    if global.verbose {
        println!("Graph API Base: {}", config.base_url);
    }

    let client = GraphClient::authenticate(config).await?;
    let notebooks = client.list_notebooks().await?;

    match options.notebook_id {
        Some(id) => {
            let notebook = notebooks
                .iter()
                .find(|n| n.id == id)
                .ok_or_else(|| eyre!("No notebook with id '{id}'"))?;
            let notebook = load_notebook(&client, notebook).await?;
            if options.json {
                println!("{}", serde_json::to_string_pretty(&notebook)?);
            } else {
                print_notebook_tree(&notebook);
            }
        }
        None if options.json => println!("{}", serde_json::to_string_pretty(&notebooks)?),
        None => print_notebooks(&notebooks),
    }

    Ok(())
}

fn print_notebooks(notebooks: &[Notebook]) {
    if notebooks.is_empty() {
        println!("No notebooks found.");
        return;
    }

    let mut table = titled_table(&["ID", "NAME", "LAST MODIFIED"]);
    for notebook in notebooks {
        let modified = notebook
            .last_modified
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(prettytable::row![notebook.id, notebook.display_name.green(), modified]);
    }
    table.printstd();
}

fn print_notebook_tree(notebook: &Notebook) {
    println!("{}", notebook.display_name.bold());
    for section in &notebook.sections {
        let mut path = section.group_path.clone();
        path.push(section.display_name.clone());
        println!("  {} ({} pages)", path.join(" / ").cyan(), section.pages.len());
        for page in &section.pages {
            let created = page
                .timestamp()
                .map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "----------".to_string());
            println!("    {} {}", created.dimmed(), page.title);
        }
    }
}
