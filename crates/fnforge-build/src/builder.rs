use crate::context::{self, ContextError};
use fnforge_core::{BuildArgMap, BuildSettings, FunctionSpec, TemplateStore};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

/// Language whose handler directory is itself the docker build context.
pub const DOCKERFILE_LANGUAGE: &str = "dockerfile";

/// Everything needed to build one function's image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub image: String,
    pub handler: PathBuf,
    pub name: String,
    pub language: String,
    pub no_cache: bool,
    pub squash: bool,
    pub shrinkwrap: bool,
    pub build_args: Arc<BuildArgMap>,
}

impl BuildRequest {
    pub fn for_function(
        spec: &FunctionSpec,
        settings: &BuildSettings,
        build_args: Arc<BuildArgMap>,
    ) -> Self {
        Self {
            image: spec.image.clone(),
            handler: PathBuf::from(&spec.handler),
            name: spec.name.clone(),
            language: spec.language.clone(),
            no_cache: settings.no_cache,
            squash: settings.squash,
            shrinkwrap: settings.shrinkwrap,
            build_args,
        }
    }
}

/// Result of a successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutput {
    /// `docker build` produced the image.
    Image { image: String },
    /// Shrinkwrap mode: the context was written and no image was built.
    Shrinkwrapped { context: PathBuf },
}

/// Abstraction over image builds for testability.
///
/// Implementations are shared by every orchestrator worker, so they must
/// be `Send + Sync`. Production code uses [`DockerBuilder`].
pub trait ImageBuilder: Send + Sync {
    fn build(&self, request: &BuildRequest) -> Result<BuildOutput, BuildError>;
}

/// Builds images with the local `docker` CLI.
pub struct DockerBuilder {
    templates: TemplateStore,
    build_root: PathBuf,
}

impl DockerBuilder {
    pub fn new(templates: TemplateStore) -> Self {
        Self {
            templates,
            build_root: PathBuf::from("./build"),
        }
    }

    pub fn with_build_root(mut self, build_root: impl Into<PathBuf>) -> Self {
        self.build_root = build_root.into();
        self
    }

    fn run_docker(&self, request: &BuildRequest, context: &Path) -> Result<(), BuildError> {
        let args = docker_build_args(request);
        tracing::debug!(function = %request.name, ?args, "running docker");

        let status = Command::new("docker")
            .args(&args)
            .current_dir(context)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| BuildError::DockerNotFound { source: e })?;

        if status.success() {
            Ok(())
        } else {
            Err(BuildError::DockerFailed {
                image: request.image.clone(),
                status: status.to_string(),
            })
        }
    }
}

impl ImageBuilder for DockerBuilder {
    fn build(&self, request: &BuildRequest) -> Result<BuildOutput, BuildError> {
        if request.language.is_empty() {
            return Err(BuildError::MissingLanguage {
                name: request.name.clone(),
            });
        }

        let context = if request.language == DOCKERFILE_LANGUAGE {
            if !request.handler.is_dir() {
                return Err(ContextError::MissingHandler(request.handler.clone()).into());
            }
            request.handler.clone()
        } else {
            context::create_build_context(
                &self.build_root,
                &request.name,
                &self.templates.language_dir(&request.language),
                &request.handler,
            )?
        };

        if request.shrinkwrap {
            tracing::info!(
                function = %request.name,
                context = %context.display(),
                "shrinkwrapped; skipping docker build"
            );
            return Ok(BuildOutput::Shrinkwrapped { context });
        }

        self.run_docker(request, &context)?;
        tracing::info!(function = %request.name, image = %request.image, "image built");

        Ok(BuildOutput::Image {
            image: request.image.clone(),
        })
    }
}

/// Arguments for `docker build`, run from inside the build context.
pub fn docker_build_args(request: &BuildRequest) -> Vec<String> {
    let mut args = vec!["build".to_owned(), "-t".to_owned(), request.image.clone()];

    if request.no_cache {
        args.push("--no-cache".to_owned());
    }
    if request.squash {
        args.push("--squash".to_owned());
    }
    for (key, value) in request.build_args.iter() {
        args.push("--build-arg".to_owned());
        args.push(format!("{key}={value}"));
    }

    args.push(".".to_owned());
    args
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("function '{name}' has no language — set `lang` in the stack manifest")]
    MissingLanguage { name: String },

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("docker CLI not found — install Docker to build images")]
    DockerNotFound { source: std::io::Error },

    #[error("docker build for {image} failed ({status})")]
    DockerFailed { image: String, status: String },

    #[error("build of '{name}' panicked: {message}")]
    Panicked { name: String, message: String },
}
