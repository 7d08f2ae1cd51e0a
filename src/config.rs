use clap::{Parser, Subcommand};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub connection_string: String,
    pub pool_size: usize,
    /// Namespace the schema introspector restricts itself to
    pub schema: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuditConfig {
    pub generation_log: PathBuf,
    pub metrics_log: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub web: WebConfig,
    pub llm: LlmConfig,
    pub audit: AuditConfig,
}

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Append the sample census tables to the configured database
    Seed,
}

impl AppConfig {
    pub fn new(args: &CliArgs) -> Result<Self, ConfigError> {
        Self::load(args, |key| std::env::var(key).ok())
    }

    /// Builds the configuration from defaults, an optional TOML file,
    /// `CENQUERY__*` variables and the two required process variables.
    /// `lookup` resolves `DATABASE_URL` and `GROQ_API_KEY`.
    pub fn load<F>(args: &CliArgs, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();
        let mut config_builder = Config::builder()
            .set_default("database.connection_string", "")?
            .set_default("database.pool_size", defaults.database.pool_size as i64)?
            .set_default("database.schema", defaults.database.schema)?
            .set_default("web.host", defaults.web.host)?
            .set_default("web.port", defaults.web.port as i64)?
            .set_default("llm.model", defaults.llm.model)?
            .set_default(
                "audit.generation_log",
                defaults.audit.generation_log.to_string_lossy().to_string(),
            )?
            .set_default(
                "audit.metrics_log",
                defaults.audit.metrics_log.to_string_lossy().to_string(),
            )?;

        // Add configuration from file if specified
        if let Some(config_path) = &args.config {
            config_builder = config_builder.add_source(File::from(config_path.as_path()));
        } else {
            // Check for config in default locations
            let default_locations = vec![
                "config.toml",
                "config/config.toml",
                "/etc/cenquery/config.toml",
            ];

            for location in default_locations {
                if Path::new(location).exists() {
                    config_builder =
                        config_builder.add_source(File::new(location, config::FileFormat::Toml));
                    break;
                }
            }
        }

        config_builder = config_builder
            .add_source(Environment::with_prefix("CENQUERY").separator("__"))
            .set_override_option("database.connection_string", lookup("DATABASE_URL"))?
            .set_override_option("llm.api_key", lookup("GROQ_API_KEY"))?;

        let mut config: AppConfig = config_builder.build()?.try_deserialize()?;

        // Override with command line args if provided
        if let Some(host) = &args.host {
            config.web.host = host.clone();
        }
        if let Some(port) = args.port {
            config.web.port = port;
        }

        // Seeding never talks to the completion service
        config.validate(args.command != Some(Command::Seed))?;
        Ok(config)
    }

    fn validate(&self, require_llm: bool) -> Result<(), ConfigError> {
        if self.database.connection_string.trim().is_empty() {
            return Err(ConfigError::Message(
                "DATABASE_URL environment variable not set. Please add it to your .env file."
                    .to_string(),
            ));
        }

        let has_key = self
            .llm
            .api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty());
        if require_llm && !has_key {
            return Err(ConfigError::Message(
                "GROQ_API_KEY environment variable not set. Please add it to your .env file."
                    .to_string(),
            ));
        }

        if self.database.pool_size == 0 {
            return Err(ConfigError::Message(
                "database.pool_size must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

// Default implementation
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                connection_string: "cenquery.duckdb".to_string(),
                pool_size: 5,
                schema: "main".to_string(),
            },
            web: WebConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
            },
            llm: LlmConfig {
                model: "llama-3.1-8b-instant".to_string(),
                api_key: None,
                api_url: None,
                timeout_secs: None,
            },
            audit: AuditConfig {
                generation_log: PathBuf::from("generation_log.csv"),
                metrics_log: PathBuf::from("metrics_log.csv"),
            },
        }
    }
}
