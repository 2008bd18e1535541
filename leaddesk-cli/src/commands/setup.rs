//! Setup command - choose and configure the backing store

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use dialoguer::{Input, Password};

use super::get_data_dir;
use crate::output;
use leaddesk_core::adapters::rest::RestRepository;
use leaddesk_core::config::{BackendKind, Config};

#[derive(Subcommand)]
pub enum SetupCommands {
    /// Use the local DuckDB file
    Local,
    /// Use the hosted backend
    Rest {
        /// Project URL, e.g. https://xyz.example.co
        #[arg(long)]
        url: Option<String>,
        /// API key (prompted when omitted)
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Set the default "imported by" attribution
    ImportedBy {
        name: String,
    },
    /// Show the current configuration
    Show,
}

pub fn run(command: SetupCommands) -> Result<()> {
    let data_dir = get_data_dir()?;
    let mut config = Config::load(&data_dir)?;

    match command {
        SetupCommands::Local => {
            config.use_local();
            config.save(&data_dir)?;
            output::success(&format!("Using local store in {}", data_dir.display()));
        }
        SetupCommands::Rest { url, api_key } => {
            let url = match url {
                Some(u) => u,
                None => Input::new().with_prompt("Backend URL").interact_text()?,
            };
            let api_key = match api_key {
                Some(k) => k,
                None => Password::new().with_prompt("API key").interact()?,
            };

            // Validates scheme and key before anything is saved
            RestRepository::new(&url, &api_key)?;

            config.use_rest(url, api_key);
            config.save(&data_dir)?;
            output::success("Using hosted backend");
        }
        SetupCommands::ImportedBy { name } => {
            config.imported_by = Some(name);
            config.save(&data_dir)?;
            output::success("Default attribution saved");
        }
        SetupCommands::Show => {
            let backend = match config.backend {
                BackendKind::Local => "local",
                BackendKind::Rest => "rest",
            };
            println!("{}", "Configuration".bold());
            println!("  Data directory: {}", data_dir.display());
            println!("  Backend: {}", backend);
            if let Some(url) = &config.api_url {
                println!("  URL: {}", url);
            }
            println!(
                "  API key: {}",
                if config.api_key.is_some() { "set" } else { "not set" }
            );
            println!(
                "  Imported by: {}",
                config.imported_by.as_deref().unwrap_or("System (default)")
            );
        }
    }

    Ok(())
}
