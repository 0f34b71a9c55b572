//! Image builds and parallel build orchestration for fnforge.
//!
//! # Build pipeline
//!
//! ```text
//! fnforge build -f stack.yml
//!   1. Templates    ── ./template fetched once if missing
//!   2. Build args   ── --build-arg + --build-option → BuildArgMap (frozen)
//!   3. Plan         ── per function: manifest build_args + build_options
//!   4. Dispatch     ── Orchestrator: sync_channel(0) → N workers
//!   5. Build        ── build/<name>/ context → docker build
//! ```
//!
//! # Build context
//!
//! For template languages the context is assembled under `build/<name>/`:
//! the template's files at the root and the handler under `function/`.
//! The `dockerfile` language builds the handler directory as is.
//! With `--shrinkwrap` the context is written and docker is not run.

pub mod builder;
pub mod context;
pub mod orchestrator;

pub use builder::{BuildError, BuildOutput, BuildRequest, DockerBuilder, ImageBuilder};
pub use orchestrator::{BuildReport, OrchestrateError, Orchestrator};
