use std::path::{Path, PathBuf};

/// Handler entries never copied into the build context.
const HANDLER_EXCLUDES: &[&str] = &["build", "template"];

/// Directory under the build context that receives the handler.
pub const FUNCTION_DIR: &str = "function";

/// Assembles the docker build context for one function.
///
/// Layout of `<build_root>/<name>/`:
/// - the language template's files (Dockerfile, entrypoint, ...)
/// - `function/` containing the handler directory's contents
///
/// Any previous context for the same function is removed first.
pub fn create_build_context(
    build_root: &Path,
    name: &str,
    template_dir: &Path,
    handler: &Path,
) -> Result<PathBuf, ContextError> {
    let context_dir = build_root.join(name);

    // Clean previous context
    if context_dir.exists() {
        std::fs::remove_dir_all(&context_dir).map_err(|e| ContextError::Cleanup {
            path: context_dir.clone(),
            source: e,
        })?;
    }

    if !template_dir.is_dir() {
        return Err(ContextError::MissingTemplate(template_dir.to_path_buf()));
    }
    if !handler.is_dir() {
        return Err(ContextError::MissingHandler(handler.to_path_buf()));
    }

    copy_dir(template_dir, &context_dir, &[])?;
    copy_dir(handler, &context_dir.join(FUNCTION_DIR), HANDLER_EXCLUDES)?;

    tracing::debug!(
        function = name,
        context = %context_dir.display(),
        "build context created"
    );
    Ok(context_dir)
}

/// Recursively copy the contents of `src` into `dst`, skipping top-level
/// entries named in `excludes`.
fn copy_dir(src: &Path, dst: &Path, excludes: &[&str]) -> Result<(), ContextError> {
    std::fs::create_dir_all(dst).map_err(|e| ContextError::Create {
        path: dst.to_path_buf(),
        source: e,
    })?;

    let entries = std::fs::read_dir(src).map_err(|e| ContextError::ReadDir {
        path: src.to_path_buf(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ContextError::ReadDir {
            path: src.to_path_buf(),
            source: e,
        })?;
        let file_name = entry.file_name();
        if excludes.iter().any(|ex| file_name == *ex) {
            continue;
        }

        let from = entry.path();
        let to = dst.join(&file_name);
        let file_type = entry.file_type().map_err(|e| ContextError::ReadDir {
            path: from.clone(),
            source: e,
        })?;

        if file_type.is_dir() {
            copy_dir(&from, &to, &[])?;
        } else {
            std::fs::copy(&from, &to).map_err(|e| ContextError::CopyFile {
                path: from,
                source: e,
            })?;
        }
    }

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("failed to clean up build context {path}")]
    Cleanup {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("template directory {0} does not exist — check the function's language")]
    MissingTemplate(std::path::PathBuf),
    #[error("handler directory {0} does not exist")]
    MissingHandler(std::path::PathBuf),
    #[error("failed to create directory {path}")]
    Create {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read directory {path}")]
    ReadDir {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("failed to copy file {path}")]
    CopyFile {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}
