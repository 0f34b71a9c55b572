//! Stack manifest (`stack.yml`) model and parsing.
//!
//! ```yaml
//! provider:
//!   name: openfaas
//!   gateway: http://127.0.0.1:8080
//! functions:
//!   resize:
//!     lang: python3
//!     handler: ./resize
//!     image: registry.example.com/resize:latest
//!     build_options: [dev]
//!     build_args:
//!       PIP_INDEX: https://pypi.internal/simple
//!   legacy:
//!     lang: dockerfile
//!     handler: ./legacy
//!     image: registry.example.com/legacy:latest
//!     skip_build: true
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    #[serde(default)]
    pub name: String,
}

/// One buildable function from the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpec {
    /// Back-filled from the manifest key; not read from YAML.
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub handler: String,
    #[serde(default, rename = "lang")]
    pub language: String,
    #[serde(default)]
    pub skip_build: bool,
    /// Build option names resolved against this function's language
    #[serde(default)]
    pub build_options: Vec<String>,
    /// Extra build arguments for this function only
    #[serde(default)]
    pub build_args: BTreeMap<String, String>,
}

/// Parsed stack manifest. Functions are keyed (and iterated) by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stack {
    #[serde(default)]
    pub provider: Provider,
    #[serde(default)]
    pub functions: BTreeMap<String, FunctionSpec>,
}

impl Stack {
    /// Load a manifest from a local file.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| crate::Error::ManifestRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse manifest YAML. `origin` (a path or URL) only labels errors.
    pub fn parse(content: &str, origin: &str) -> crate::Result<Self> {
        let mut stack: Self =
            serde_yaml::from_str(content).map_err(|e| crate::Error::ManifestParse {
                origin: origin.to_owned(),
                source: e,
            })?;

        for (key, function) in &mut stack.functions {
            function.name.clone_from(key);
        }

        tracing::debug!(
            origin,
            functions = stack.functions.len(),
            "stack manifest parsed"
        );
        Ok(stack)
    }

    /// Keep only functions whose name matches `regex` and/or the
    /// wildcard `filter`. Both given means both must match. Filtering
    /// that leaves no functions is an error.
    pub fn filter(mut self, regex: Option<&str>, filter: Option<&str>) -> crate::Result<Self> {
        if regex.is_none() && filter.is_none() {
            return Ok(self);
        }

        let regex = regex
            .map(|pattern| {
                regex::Regex::new(pattern).map_err(|e| crate::Error::InvalidRegex {
                    pattern: pattern.to_owned(),
                    source: e,
                })
            })
            .transpose()?;
        let wildcard = filter
            .map(|pattern| {
                glob::Pattern::new(pattern).map_err(|e| crate::Error::InvalidFilter {
                    pattern: pattern.to_owned(),
                    source: e,
                })
            })
            .transpose()?;

        self.functions.retain(|name, _| {
            regex.as_ref().is_none_or(|r| r.is_match(name))
                && wildcard.as_ref().is_none_or(|w| w.matches(name))
        });

        if self.functions.is_empty() {
            return Err(crate::Error::NoMatchingFunctions);
        }
        Ok(self)
    }
}
