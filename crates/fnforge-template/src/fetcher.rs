use crate::error::FetchError;
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};

/// Directory inside the archive that holds the language templates.
const ARCHIVE_TEMPLATE_DIR: &str = "template";

/// Files written and skipped by one fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub written: usize,
    pub skipped: usize,
}

/// Abstraction over template bundle retrieval for testability.
///
/// Production code uses [`HttpFetcher`], tests use mockall-generated mocks.
#[allow(async_fn_in_trait)]
pub trait TemplateFetcher: Send + Sync {
    /// Download the bundle at `url` and extract its templates into `dest`.
    ///
    /// With `overwrite` false, files already present in `dest` are kept.
    async fn fetch(&self, url: &str, dest: &Path, overwrite: bool)
    -> Result<FetchSummary, FetchError>;
}

/// Fetches a GitHub-style zip archive (`<repo>-<branch>/template/...`).
pub struct HttpFetcher;

impl TemplateFetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        overwrite: bool,
    ) -> Result<FetchSummary, FetchError> {
        tracing::info!(url, "downloading templates");

        let download = |e| FetchError::Download {
            url: url.to_owned(),
            source: e,
        };
        let bytes = reqwest::get(url)
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(download)?
            .bytes()
            .await
            .map_err(download)?;

        tracing::debug!(url, bytes = bytes.len(), "template archive downloaded");

        let url_owned = url.to_owned();
        let dest = dest.to_path_buf();
        tokio::task::spawn_blocking(move || extract_templates(&bytes, &url_owned, &dest, overwrite))
            .await
            .map_err(|e| FetchError::Join { source: e })?
    }
}

/// Extract every file under the archive's `template/` directory into `dest`.
///
/// The archive's top-level directory is stripped, so
/// `templates-master/template/go/template.yml` lands at `dest/go/template.yml`.
pub fn extract_templates(
    archive: &[u8],
    url: &str,
    dest: &Path,
    overwrite: bool,
) -> Result<FetchSummary, FetchError> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive)).map_err(|e| FetchError::Archive {
        url: url.to_owned(),
        source: e,
    })?;

    let mut summary = FetchSummary::default();
    let mut found_templates = false;

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).map_err(|e| FetchError::Archive {
            url: url.to_owned(),
            source: e,
        })?;

        let Some(relative) = entry.enclosed_name().and_then(|p| template_relative_path(&p))
        else {
            continue;
        };
        found_templates = true;

        let target = dest.join(&relative);
        if entry.is_dir() {
            create_dir(&target)?;
            continue;
        }

        if !overwrite && target.exists() {
            tracing::debug!(path = %target.display(), "template file exists; keeping it");
            summary.skipped += 1;
            continue;
        }

        if let Some(parent) = target.parent() {
            create_dir(parent)?;
        }

        let mut content = Vec::new();
        entry
            .read_to_end(&mut content)
            .map_err(|e| FetchError::Write {
                path: target.clone(),
                source: e,
            })?;
        std::fs::write(&target, &content).map_err(|e| FetchError::Write {
            path: target.clone(),
            source: e,
        })?;

        // Keep executable bits (build scripts in templates rely on them)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                std::fs::set_permissions(&target, std::fs::Permissions::from_mode(mode))
                    .map_err(|e| FetchError::Write {
                        path: target.clone(),
                        source: e,
                    })?;
            }
        }

        summary.written += 1;
    }

    if !found_templates {
        return Err(FetchError::NoTemplates {
            url: url.to_owned(),
        });
    }

    tracing::info!(
        written = summary.written,
        skipped = summary.skipped,
        dest = %dest.display(),
        "templates extracted"
    );
    Ok(summary)
}

/// `<top>/template/<rest>` → `<rest>`; anything else → `None`.
fn template_relative_path(path: &Path) -> Option<PathBuf> {
    let mut components = path.components();
    components.next()?;
    match components.next()? {
        Component::Normal(dir) if dir == ARCHIVE_TEMPLATE_DIR => {}
        _ => return None,
    }
    let rest: PathBuf = components.collect();
    (!rest.as_os_str().is_empty()).then_some(rest)
}

fn create_dir(path: &Path) -> Result<(), FetchError> {
    std::fs::create_dir_all(path).map_err(|e| FetchError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}
