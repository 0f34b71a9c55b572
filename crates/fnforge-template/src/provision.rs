use crate::error::ProvisionError;
use crate::fetcher::{FetchSummary, HttpFetcher, TemplateFetcher};
use fnforge_core::TemplatesConfig;
use std::path::{Path, PathBuf};

/// What [`TemplateProvisioner::ensure_templates`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    /// The template directory was already there; nothing was fetched.
    AlreadyPresent,
    Fetched(FetchSummary),
}

/// Makes sure the local template directory exists before any build starts.
///
/// Presence alone satisfies the check: an existing directory is never
/// refreshed. Delete it to force a new fetch.
pub struct TemplateProvisioner<F: TemplateFetcher = HttpFetcher> {
    fetcher: F,
    dir: PathBuf,
}

impl TemplateProvisioner<HttpFetcher> {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher: HttpFetcher,
            dir: dir.into(),
        }
    }

    pub fn from_config(config: &TemplatesConfig) -> Self {
        Self::new(config.dir.clone())
    }
}

impl<F: TemplateFetcher> TemplateProvisioner<F> {
    pub fn with_fetcher(fetcher: F, dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Fetch templates from `source_url` unless the directory already exists.
    pub async fn ensure_templates(&self, source_url: &str) -> Result<Provisioned, ProvisionError> {
        match std::fs::metadata(&self.dir) {
            Ok(meta) if meta.is_dir() => {
                tracing::debug!(dir = %self.dir.display(), "templates present");
                return Ok(Provisioned::AlreadyPresent);
            }
            Ok(_) => {
                tracing::warn!(dir = %self.dir.display(), "template path is not a directory");
            }
            Err(e) => {
                tracing::info!(
                    dir = %self.dir.display(),
                    reason = %e,
                    "no templates found; fetching"
                );
            }
        }

        let summary = self
            .fetcher
            .fetch(source_url, &self.dir, false)
            .await
            .map_err(|e| ProvisionError::Fetch {
                url: source_url.to_owned(),
                source: e,
            })?;

        Ok(Provisioned::Fetched(summary))
    }
}
