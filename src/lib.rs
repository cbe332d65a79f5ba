//! spacetraveling: a static blog generator backed by the Prismic content API
//!
//! Posts live in the CMS. The generator fetches the first page of the
//! listing and every post, renders them with embedded Tera templates and
//! writes plain HTML. The preview server adds the "load more" endpoint and
//! on-demand rendering of posts published after the last generation.

pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod listing;
pub mod prismic;
pub mod server;
pub mod templates;

#[cfg(test)]
mod test_utils;

use anyhow::Result;
use std::path::Path;

use crate::generator::GenerateReport;
use crate::prismic::PrismicClient;

/// The blog application
#[derive(Debug, Clone)]
pub struct Spacetraveling {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Public (output) directory
    pub public_dir: std::path::PathBuf,
}

impl Spacetraveling {
    /// Create a new instance from a directory, reading `_config.yml` if present
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        let config_path = base_dir.join("_config.yml");

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };
        config.apply_env();

        let public_dir = base_dir.join(&config.public_dir);

        Ok(Self {
            config,
            public_dir,
        })
    }

    /// Build a content API client from the configuration
    pub fn client(&self) -> Result<PrismicClient> {
        Ok(PrismicClient::new(&self.config.api)?)
    }

    /// Generate the static site
    pub async fn generate(&self) -> Result<GenerateReport> {
        let client = self.client()?;
        commands::generate::run(self, &client).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
