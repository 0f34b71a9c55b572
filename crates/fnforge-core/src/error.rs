use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    // ── Argument syntax ──
    #[error("each {kind} must take the form key=value")]
    MalformedArgument { kind: String },

    #[error("{kind} must have a non-empty key")]
    EmptyKey { kind: String },

    // ── Language templates ──
    #[error("no template found for language '{language}' at {path}")]
    TemplateNotFound { language: String, path: PathBuf },

    #[error("failed to read template descriptor {path}")]
    TemplateRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse template descriptor {path}")]
    TemplateParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error(
        "unknown build option(s): {} — check template/<language>/template.yml for supported build options",
        names.join(", ")
    )]
    UnknownBuildOption { names: Vec<String> },

    // ── Stack manifest ──
    #[error("failed to read stack manifest {path}")]
    ManifestRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse stack manifest {origin}")]
    ManifestParse {
        origin: String,
        source: serde_yaml::Error,
    },

    #[error("invalid --regex {pattern:?}")]
    InvalidRegex {
        pattern: String,
        source: regex::Error,
    },

    #[error("invalid --filter {pattern:?}")]
    InvalidFilter {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("no functions in stack manifest match the given filters")]
    NoMatchingFunctions,
}
