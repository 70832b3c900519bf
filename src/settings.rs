use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;
use tracing::info;

use crate::parser::lexicon::Lexicon;

const CONFIG_FILE: &str = "bg_history";
const ENV_PREFIX: &str = "BGH";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Wikipedia language edition.
    pub language: String,
    pub db_path: PathBuf,
    pub output_dir: PathBuf,
    /// File stem of the exported files, before the timestamp.
    pub output_prefix: String,
    /// Pause after each successful fetch.
    pub request_delay_ms: u64,
    pub user_agent: String,
    /// Replacement for the embedded keyword tables.
    #[serde(default)]
    pub lexicon_path: Option<PathBuf>,
}

impl Settings {
    /// Defaults, then `bg_history.toml` if present, then `BGH_*` variables.
    pub fn load() -> Result<Settings> {
        Self::build(
            defaults()?
                .add_source(File::with_name(CONFIG_FILE).required(false))
                .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true)),
        )
    }

    fn build(builder: ConfigBuilder<config::builder::DefaultState>) -> Result<Settings> {
        let settings: Settings = builder
            .build()
            .context("Failed to read settings")?
            .try_deserialize()
            .context("Invalid settings")?;
        Ok(settings)
    }

    pub fn api_url(&self) -> String {
        format!("https://{}.wikipedia.org/w/api.php", self.language)
    }

    /// The keyword tables: the configured file, or the embedded ones.
    pub fn lexicon(&self) -> Result<Lexicon> {
        match &self.lexicon_path {
            Some(path) => {
                info!("Loading lexicon from {}", path.display());
                Ok(Lexicon::load(path)?)
            }
            None => Ok(Lexicon::builtin().clone()),
        }
    }
}

fn defaults() -> Result<ConfigBuilder<config::builder::DefaultState>> {
    let builder = Config::builder()
        .set_default("language", "bg")?
        .set_default("db_path", "data/bg_history.sqlite")?
        .set_default("output_dir", ".")?
        .set_default("output_prefix", "български_исторически_събития")?
        .set_default("request_delay_ms", 1000)?
        .set_default(
            "user_agent",
            concat!("bg_history_scraper/", env!("CARGO_PKG_VERSION")),
        )?;
    Ok(builder)
}

// ── Tests ──
