use anyhow::Context;
use clap::Args;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::narrative::{self, NarrativeConfig};

#[derive(Args, Debug, Clone)]
pub struct DatabaseArgs {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true, global = true)]
    pub database_url: Option<String>,

    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 5, global = true)]
    pub max_connections: u32,
}

impl DatabaseArgs {
    pub async fn connect(&self) -> anyhow::Result<PgPool> {
        let url = self
            .database_url
            .as_deref()
            .context("DATABASE_URL must be set to a production Postgres instance")?;

        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect(url)
            .await
            .context("failed to connect to Postgres")
    }
}

#[derive(Args, Debug, Clone)]
pub struct NarrativeArgs {
    /// Enables language model reports; the offline template is used without it
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    pub openai_api_key: Option<String>,

    #[arg(long, env = "OPENAI_MODEL", default_value = narrative::DEFAULT_MODEL, global = true)]
    pub openai_model: String,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = narrative::DEFAULT_BASE_URL, global = true)]
    pub openai_base_url: String,

    #[arg(long, default_value_t = narrative::DEFAULT_MAX_TOKENS, global = true)]
    pub max_tokens: u32,

    #[arg(long, default_value_t = narrative::DEFAULT_TEMPERATURE, global = true)]
    pub temperature: f32,
}

impl From<&NarrativeArgs> for NarrativeConfig {
    fn from(args: &NarrativeArgs) -> Self {
        NarrativeConfig {
            api_key: args.openai_api_key.clone(),
            model: args.openai_model.clone(),
            base_url: args.openai_base_url.clone(),
            max_tokens: args.max_tokens,
            temperature: args.temperature,
        }
    }
}
