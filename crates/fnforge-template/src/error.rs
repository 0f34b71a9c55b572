use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to download template archive from {url}")]
    Download { url: String, source: reqwest::Error },

    #[error("template archive from {url} is not a valid zip file")]
    Archive {
        url: String,
        source: zip::result::ZipError,
    },

    #[error("template archive from {url} has no template/ directory")]
    NoTemplates { url: String },

    #[error("failed to write template file {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("template extraction task failed")]
    Join { source: tokio::task::JoinError },
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("could not pull templates from {url}")]
    Fetch { url: String, source: FetchError },
}
