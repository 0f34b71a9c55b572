//! Language templates and build option resolution.
//!
//! Each language lives under `<template dir>/<language>/` and may declare
//! named build options in its `template.yml`:
//!
//! ```yaml
//! language: python3
//! fprocess: python3 index.py
//! build_options:
//!   - name: dev
//!     packages:
//!       - make
//!       - automake
//!   - name: debian
//!     packages: [libxml2-dev]
//! ```
//!
//! A requested option expands to one synthetic build argument,
//! `ADDITIONAL_PACKAGE=<packages joined by spaces>` unless the option
//! names a different `arg`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::args::BuildArgMap;

/// File name of a language's template descriptor.
pub const TEMPLATE_DESCRIPTOR: &str = "template.yml";

/// A named, language-specific bundle of extra packages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOption {
    /// Selector used with `--build-option` and `build_options:`
    pub name: String,
    /// Build argument the packages are passed through
    #[serde(default = "default_option_arg")]
    pub arg: String,
    #[serde(default)]
    pub packages: Vec<String>,
}

impl BuildOption {
    /// Render as a `key=value` build-arg token.
    pub fn to_build_arg(&self) -> String {
        format!("{}={}", self.arg, self.packages.join(" "))
    }
}

/// Contents of `template/<language>/template.yml`.
///
/// Only the fields a build needs are read; the rest of the descriptor is
/// ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageTemplate {
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub build_options: Vec<BuildOption>,
}

impl LanguageTemplate {
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| crate::Error::TemplateRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    pub fn parse(content: &str, path: &Path) -> crate::Result<Self> {
        // An empty descriptor is a template with no options.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| crate::Error::TemplateParse {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Outcome of resolving a set of option names against a base map.
///
/// `build_args` always holds the merge of every option that *did* resolve;
/// `error` reports what did not. Callers decide whether the error is fatal.
#[derive(Debug)]
pub struct OptionResolution {
    pub build_args: BuildArgMap,
    pub error: Option<crate::Error>,
}

impl OptionResolution {
    pub fn into_result(self) -> crate::Result<BuildArgMap> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.build_args),
        }
    }
}

/// Local template directory (normally `./template`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateStore {
    root: PathBuf,
}

impl TemplateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the given language's template files.
    pub fn language_dir(&self, language: &str) -> PathBuf {
        self.root.join(language)
    }

    pub fn descriptor_path(&self, language: &str) -> PathBuf {
        self.language_dir(language).join(TEMPLATE_DESCRIPTOR)
    }

    /// Load the build options a language declares.
    ///
    /// A missing descriptor is [`crate::Error::TemplateNotFound`]; a
    /// descriptor without options yields an empty list.
    pub fn derive_build_options(&self, language: &str) -> crate::Result<Vec<BuildOption>> {
        let path = self.descriptor_path(language);
        if !path.is_file() {
            return Err(crate::Error::TemplateNotFound {
                language: language.to_owned(),
                path,
            });
        }

        let template = LanguageTemplate::load(&path)?;
        tracing::debug!(
            language,
            options = template.build_options.len(),
            "language template loaded"
        );
        Ok(template.build_options)
    }

    /// Expand option names into `ARG=packages` build-arg tokens.
    pub fn validate_build_options<S: AsRef<str>>(
        &self,
        requested: &[S],
        language: &str,
    ) -> crate::Result<Vec<String>> {
        let available = self.derive_build_options(language)?;
        let (found, error) = match find_build_options(&available, requested) {
            Ok(found) => (found, None),
            Err(FindError { found, error }) => (found, Some(error)),
        };

        let args = found.iter().map(BuildOption::to_build_arg).collect();
        match error {
            Some(e) => Err(e),
            None => Ok(args),
        }
    }

    /// Resolve `requested` for `language` and merge the result into a copy
    /// of `base`.
    ///
    /// Options that resolve are merged even when others do not. When
    /// several things go wrong, `error` holds the unknown option names.
    pub fn resolve_options<S: AsRef<str>>(
        &self,
        requested: &[S],
        language: &str,
        base: &BuildArgMap,
    ) -> OptionResolution {
        let mut build_args = base.clone();
        if requested.is_empty() {
            return OptionResolution {
                build_args,
                error: None,
            };
        }

        let available = match self.derive_build_options(language) {
            Ok(available) => available,
            Err(e) => {
                return OptionResolution {
                    build_args,
                    error: Some(e),
                };
            }
        };

        let (found, mut error) = match find_build_options(&available, requested) {
            Ok(found) => (found, None),
            Err(FindError { found, error }) => (found, Some(error)),
        };

        // One option at a time, so a malformed option cannot drop the others.
        for option in &found {
            if let Err(e) = build_args.extend(&[option.to_build_arg()]) {
                tracing::warn!(option = %option.name, error = %e, "build option is not a valid build-arg");
                if error.is_none() {
                    error = Some(e);
                }
            }
        }

        OptionResolution { build_args, error }
    }
}

/// Unknown names, plus every option that did match.
#[derive(Debug)]
pub struct FindError {
    pub found: Vec<BuildOption>,
    pub error: crate::Error,
}

/// Look up each requested name in `available`.
///
/// Matches come back in requested order; the first declaration wins when a
/// template repeats a name. Every unknown name is logged and collected
/// into a single [`crate::Error::UnknownBuildOption`].
pub fn find_build_options<S: AsRef<str>>(
    available: &[BuildOption],
    requested: &[S],
) -> Result<Vec<BuildOption>, FindError> {
    let mut found = Vec::with_capacity(requested.len());
    let mut unknown = Vec::new();

    for name in requested {
        let name = name.as_ref();
        match available.iter().find(|option| option.name == name) {
            Some(option) => found.push(option.clone()),
            None => {
                tracing::warn!(option = name, "unknown build option");
                unknown.push(name.to_owned());
            }
        }
    }

    if unknown.is_empty() {
        Ok(found)
    } else {
        Err(FindError {
            found,
            error: crate::Error::UnknownBuildOption { names: unknown },
        })
    }
}

/// Normalize a `--lang` value; `Dockerfile` is accepted for `dockerfile`.
pub fn validate_language(language: &str) -> String {
    if language == "Dockerfile" {
        tracing::warn!("language 'Dockerfile' is deprecated, use 'dockerfile' instead");
        return "dockerfile".to_owned();
    }
    language.to_owned()
}

fn default_option_arg() -> String {
    "ADDITIONAL_PACKAGE".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(name: &str, arg: &str, packages: &[&str]) -> BuildOption {
        BuildOption {
            name: name.to_owned(),
            arg: arg.to_owned(),
            packages: packages.iter().map(|p| (*p).to_owned()).collect(),
        }
    }

    #[test]
    fn find_returns_matches_in_requested_order() {
        let available = vec![option("a", "ARG", &["x"]), option("b", "ARG", &["y"])];
        let found = find_build_options(&available, &["b", "a"]).unwrap();
        let names: Vec<&str> = found.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn find_first_declaration_wins() {
        let available = vec![option("dev", "FIRST", &[]), option("dev", "SECOND", &[])];
        let found = find_build_options(&available, &["dev"]).unwrap();
        assert_eq!(found[0].arg, "FIRST");
    }

    #[test]
    fn find_reports_every_unknown_name() {
        let available = vec![option("dev", "ARG", &["curl"])];
        let err = find_build_options(&available, &["nope", "dev", "also-nope"]).unwrap_err();

        assert_eq!(err.found.len(), 1);
        match err.error {
            crate::Error::UnknownBuildOption { names } => {
                assert_eq!(names, vec!["nope", "also-nope"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn find_with_nothing_requested_is_empty() {
        let available = vec![option("dev", "ARG", &["curl"])];
        let requested: [&str; 0] = [];
        assert!(find_build_options(&available, &requested).unwrap().is_empty());
    }

    #[test]
    fn option_renders_space_joined_packages() {
        assert_eq!(
            option("dev", "ADDITIONAL_PACKAGE", &["curl", "git"]).to_build_arg(),
            "ADDITIONAL_PACKAGE=curl git"
        );
    }

    #[test]
    fn parse_defaults_arg_name() {
        let yaml = "language: node\nbuild_options:\n  - name: dev\n    packages: [make]\n";
        let template = LanguageTemplate::parse(yaml, Path::new("template.yml")).unwrap();
        assert_eq!(template.build_options[0].arg, "ADDITIONAL_PACKAGE");
    }

    #[test]
    fn parse_empty_descriptor_has_no_options() {
        let template = LanguageTemplate::parse("  \n", Path::new("template.yml")).unwrap();
        assert!(template.build_options.is_empty());
    }

    #[test]
    fn validate_language_lowercases_dockerfile() {
        assert_eq!(validate_language("Dockerfile"), "dockerfile");
        assert_eq!(validate_language("python3"), "python3");
    }
}
