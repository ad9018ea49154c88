/*
    Developer blog:
    - One executable for both sides of the farm. The artist runs `submit` on their workstation, Deadline runs
    `render` on each node with the plugin info of the job and the frame range of the task.
    - Config lives next to the BlendFarm settings so both can be edited by hand. Use `config` to find where.
    - Set RUST_LOG=debug (or put it in a .env file) to see every line blender prints.
*/
use anyhow::{Context, Result};
use blender::models::plugin_config::{PluginConfig, SETTINGS_FILE_NAME};
use clap::Parser;
use cli::{Cli, Commands};
use dotenv::dotenv;
use services::{render_task, submitter};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

pub mod cli;
pub mod models;
pub mod services;

fn config_dir(cli: &Cli) -> Result<PathBuf> {
    match &cli.config_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Unable to create config directory {dir:?}"))?;
            Ok(dir.clone())
        }
        None => Ok(PluginConfig::get_config_dir()?),
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let config_dir = config_dir(&cli)?;
    let config_path = config_dir.join(SETTINGS_FILE_NAME);
    let config = PluginConfig::load_from(&config_path)
        .with_context(|| format!("Unable to load plugin config {config_path:?}"))?;

    match cli.command {
        Commands::Render(task) => {
            render_task::RenderTask::load(&config, &task)?
                .run()
                .await
        }
        Commands::Submit(args) => submitter::submit(&config, &config_dir, &args).await,
        Commands::Config => {
            println!("{}", config_path.display());
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

pub async fn run() -> ExitCode {
    dotenv().ok();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();

    let cli = Cli::parse();

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !render_task::is_logged_render_failure(&e) {
                error!("{e:#}");
            }
            if render_task::is_render_failure(&e) {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
