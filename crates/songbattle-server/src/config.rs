use std::path::PathBuf;

use anyhow::{Context, bail};

use songbattle_core::{Catalog, MatchConfig};

/// Catalog served when `SONGBATTLE_CATALOG` is not set.
pub const BUNDLED_CATALOG: &str = include_str!("../data/songs.json");

/// Server settings, read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub port: u16,
    pub catalog_path: Option<PathBuf>,
    pub matching: MatchConfig,
}

fn parse<T>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("{} has an invalid value: {:?}", key, raw))
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; unset keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL")
            .unwrap_or_else(|| "sqlite:songbattle.db?mode=rwc".to_string());
        let port = match lookup("PORT") {
            Some(raw) => parse("PORT", &raw)?,
            None => 8080,
        };
        let catalog_path = lookup("SONGBATTLE_CATALOG").map(PathBuf::from);

        let mut matching = MatchConfig::default();
        if let Some(raw) = lookup("SONGBATTLE_K_FACTOR") {
            matching.k_factor = parse("SONGBATTLE_K_FACTOR", &raw)?;
        }
        if let Some(raw) = lookup("SONGBATTLE_WILDCARD_PROBABILITY") {
            matching.wildcard_probability = parse("SONGBATTLE_WILDCARD_PROBABILITY", &raw)?;
        }
        if let Some(raw) = lookup("SONGBATTLE_WINDOWS") {
            matching.rating_windows = raw
                .split(',')
                .filter(|w| !w.trim().is_empty())
                .map(|w| parse("SONGBATTLE_WINDOWS", w))
                .collect::<anyhow::Result<_>>()?;
        }
        if let Some(raw) = lookup("SONGBATTLE_RECENCY_CAP") {
            matching.recency_cap = parse("SONGBATTLE_RECENCY_CAP", &raw)?;
        }

        let config = Self {
            database_url,
            port,
            catalog_path,
            matching,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let m = &self.matching;
        if m.k_factor <= 0 {
            bail!("SONGBATTLE_K_FACTOR must be positive, got {}", m.k_factor);
        }
        if !(0.0..=1.0).contains(&m.wildcard_probability) {
            bail!(
                "SONGBATTLE_WILDCARD_PROBABILITY must be between 0 and 1, got {}",
                m.wildcard_probability
            );
        }
        if m.rating_windows.iter().any(|&w| w < 0) {
            bail!("SONGBATTLE_WINDOWS must not contain negative windows");
        }
        Ok(())
    }

    /// Load the configured catalog file, or the bundled one.
    pub fn load_catalog(&self) -> anyhow::Result<Catalog> {
        match &self.catalog_path {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read catalog {}", path.display()))?;
                Catalog::from_json(&json)
                    .with_context(|| format!("Failed to parse catalog {}", path.display()))
            }
            None => Catalog::from_json(BUNDLED_CATALOG).context("Bundled catalog is malformed"),
        }
    }
}
