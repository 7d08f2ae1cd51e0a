use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

mod audit;
mod config;
mod db;
mod llm;
mod util;
mod web;

use crate::config::{AppConfig, CliArgs, Command};
use crate::db::db_pool::build_pool;
use crate::db::seed::seed_sample_data;
use crate::llm::LlmManager;
use crate::util::logging::init_tracing;
use crate::web::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Parse command line arguments
    let args = CliArgs::parse();

    // Initialize logging
    init_tracing(args.log_json);

    // Load configuration
    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    info!("Initializing DuckDB connection pool");
    let pool = match build_pool(&config.database) {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to connect to the database: {}", e);
            return Err(e.into());
        }
    };
    info!("Database connection successful.");

    match args.command.unwrap_or(Command::Serve) {
        Command::Seed => {
            let counts = tokio::task::spawn_blocking(move || -> Result<_, Box<dyn std::error::Error + Send + Sync>> {
                let mut conn = pool.get()?;
                Ok(seed_sample_data(&mut conn)?)
            })
            .await?
            .map_err(|e| e as Box<dyn std::error::Error>)?;

            info!("Sample data appended to {} tables", counts.len());
        }
        Command::Serve => {
            info!("Initializing LLM manager with model: {}", config.llm.model);
            let llm_manager = LlmManager::new(&config.llm)?;

            let app_state = Arc::new(AppState::new(config.clone(), pool, llm_manager));

            info!("Starting CenQuery server on {}:{}", config.web.host, config.web.port);
            match web::run_server(config.web, app_state).await {
                Ok(_) => info!("Server stopped gracefully"),
                Err(e) => {
                    error!("Server error: {}", e);
                    return Err(e.into());
                }
            }
        }
    }

    Ok(())
}
