use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Name of the optional project config file.
pub const CONFIG_FILE: &str = "fnforge.toml";

/// Template repository fetched when `./template` is missing.
pub const DEFAULT_TEMPLATE_URL: &str =
    "https://github.com/openfaas/templates/archive/master.zip";

/// fnforge.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FnforgeConfig {
    #[serde(default)]
    pub build: BuildDefaults,
    #[serde(default)]
    pub templates: TemplatesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildDefaults {
    /// Number of functions built concurrently (values below 1 mean 1)
    #[serde(default = "default_parallel")]
    pub parallel: i64,
    /// Fail the whole run when a function's build options do not resolve
    #[serde(default)]
    pub strict_options: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplatesConfig {
    /// Local template directory
    #[serde(default = "default_template_dir")]
    pub dir: PathBuf,
    /// Archive URL fetched when `dir` does not exist
    #[serde(default = "default_template_url")]
    pub url: String,
}

impl Default for BuildDefaults {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            strict_options: false,
        }
    }
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            dir: default_template_dir(),
            url: default_template_url(),
        }
    }
}

impl FnforgeConfig {
    /// Load from fnforge.toml in the given directory, or return defaults if not found.
    pub fn load(project_dir: &std::path::Path) -> crate::Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE);
        if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigLoad {
                    path: config_path.clone(),
                    source: e,
                })?;
            toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
                path: config_path,
                source: e,
            })
        } else {
            Ok(Self::default())
        }
    }
}

/// Immutable per-run build settings handed to the orchestrator and builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    /// Requested parallel depth, before normalization
    pub parallel: i64,
    pub no_cache: bool,
    pub squash: bool,
    pub shrinkwrap: bool,
    pub strict_options: bool,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            no_cache: false,
            squash: false,
            shrinkwrap: false,
            strict_options: false,
        }
    }
}

impl BuildSettings {
    /// Worker pool size: the requested depth, never less than one.
    pub fn pool_size(&self) -> usize {
        usize::try_from(self.parallel.max(1))
            // arch-lint: allow(no-silent-result-drop) reason="depth above usize::MAX saturates; the orchestrator caps workers at the build count"
            .unwrap_or(usize::MAX)
    }
}

fn default_parallel() -> i64 {
    1
}

fn default_template_dir() -> PathBuf {
    PathBuf::from("./template")
}

fn default_template_url() -> String {
    DEFAULT_TEMPLATE_URL.to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_parallel(parallel: i64) -> BuildSettings {
        BuildSettings {
            parallel,
            ..Default::default()
        }
    }

    #[test]
    fn pool_size_clamps_to_one() {
        assert_eq!(with_parallel(0).pool_size(), 1);
        assert_eq!(with_parallel(-3).pool_size(), 1);
        assert_eq!(with_parallel(1).pool_size(), 1);
        assert_eq!(with_parallel(4).pool_size(), 4);
    }
}
