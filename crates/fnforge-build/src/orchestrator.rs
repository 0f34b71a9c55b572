//! Parallel build orchestration.
//!
//! ```text
//! dispatcher ──plan──▶ sorted WorkItems
//!      │
//!      └─send─▶ sync_channel(0) ─recv─▶ worker 0..pool_size ─▶ ImageBuilder::build
//! ```
//!
//! The channel has no buffer, so `send` only returns once a worker has
//! taken the item. That is the only backpressure: at most `pool_size`
//! builds are in flight, and the dispatcher waits whenever all workers are
//! busy. No more workers are started than there are queued builds.
//! Dropping the sender closes the channel; workers drain it and exit, and
//! the scope joins them before [`Orchestrator::run`] returns.
//!
//! A failed (or panicking) build is recorded in the [`BuildReport`] and
//! never stops other builds. There is no cancellation or timeout.

use crate::builder::{BuildError, BuildOutput, BuildRequest, DockerBuilder, ImageBuilder};
use fnforge_core::{BuildArgMap, BuildSettings, FunctionSpec, TemplateStore};
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::mpsc::{Receiver, RecvError, sync_channel};
use std::sync::{Arc, Mutex, PoisonError};

/// One function queued for a worker.
#[derive(Debug)]
pub struct WorkItem {
    pub request: BuildRequest,
}

/// A function's `build_options` that did not resolve.
#[derive(Debug)]
pub struct OptionWarning {
    pub function: String,
    pub error: fnforge_core::Error,
}

#[derive(Debug)]
pub struct BuiltFunction {
    pub name: String,
    pub output: BuildOutput,
}

#[derive(Debug)]
pub struct FailedBuild {
    pub name: String,
    pub error: BuildError,
}

/// Outcome of an orchestration run. Every list is sorted by function name.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub built: Vec<BuiltFunction>,
    pub failed: Vec<FailedBuild>,
    pub skipped: Vec<String>,
    pub option_warnings: Vec<OptionWarning>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} built, {} failed, {} skipped",
            self.built.len(),
            self.failed.len(),
            self.skipped.len()
        )?;
        for warning in &self.option_warnings {
            writeln!(f, "  warning  {}: {}", warning.function, warning.error)?;
        }
        for failed in &self.failed {
            writeln!(f, "  failed   {}: {}", failed.name, failed.error)?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrchestrateError {
    #[error(
        "build options failed to resolve for {}; no builds were started",
        warnings.iter().map(|w| w.function.as_str()).collect::<Vec<_>>().join(", ")
    )]
    BuildOptions { warnings: Vec<OptionWarning> },

    #[error("failed to start build worker {index}; no builds were started")]
    Spawn {
        index: usize,
        source: std::io::Error,
    },
}

struct Plan {
    items: Vec<WorkItem>,
    skipped: Vec<String>,
    warnings: Vec<OptionWarning>,
}

/// Builds a set of functions on a fixed-size worker pool.
pub struct Orchestrator<B: ImageBuilder = DockerBuilder> {
    builder: B,
    settings: BuildSettings,
    templates: TemplateStore,
    build_args: Arc<BuildArgMap>,
}

impl<B: ImageBuilder> Orchestrator<B> {
    /// `build_args` is frozen here; workers only ever read it.
    pub fn new(
        builder: B,
        settings: BuildSettings,
        templates: TemplateStore,
        build_args: BuildArgMap,
    ) -> Self {
        Self {
            builder,
            settings,
            templates,
            build_args: Arc::new(build_args),
        }
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    /// Build every function not flagged `skip_build`.
    ///
    /// Blocks until all builds have finished. Errors when strict option
    /// handling rejects the plan or a worker thread cannot be started; in
    /// both cases nothing is built.
    pub fn run(
        &self,
        functions: &BTreeMap<String, FunctionSpec>,
    ) -> Result<BuildReport, OrchestrateError> {
        let plan = self.plan(functions);

        if self.settings.strict_options && !plan.warnings.is_empty() {
            return Err(OrchestrateError::BuildOptions {
                warnings: plan.warnings,
            });
        }

        // Workers beyond the number of queued builds would never receive work.
        let workers = self.settings.pool_size().min(plan.items.len()).max(1);
        tracing::info!(
            functions = plan.items.len(),
            skipped = plan.skipped.len(),
            workers,
            "starting builds"
        );

        let mut results = self.dispatch(plan.items, workers)?;
        results.sort_by(|a, b| a.0.cmp(&b.0));

        let mut report = BuildReport {
            skipped: plan.skipped,
            option_warnings: plan.warnings,
            ..Default::default()
        };
        for (name, result) in results {
            match result {
                Ok(output) => report.built.push(BuiltFunction { name, output }),
                Err(error) => report.failed.push(FailedBuild { name, error }),
            }
        }

        Ok(report)
    }

    /// Turn functions into work items, in name order.
    ///
    /// Each function's own `build_args` fill in keys the command line did
    /// not set, and its `build_options` are merged on top. Options that do
    /// not resolve become warnings; the function is still planned with
    /// whatever did resolve.
    fn plan(&self, functions: &BTreeMap<String, FunctionSpec>) -> Plan {
        let mut plan = Plan {
            items: Vec::with_capacity(functions.len()),
            skipped: Vec::new(),
            warnings: Vec::new(),
        };

        for (key, spec) in functions {
            if spec.skip_build {
                tracing::info!(function = %key, "skipping build");
                plan.skipped.push(key.clone());
                continue;
            }

            let mut spec = spec.clone();
            spec.name.clone_from(key);

            let mut build_args = if spec.build_args.is_empty() {
                Arc::clone(&self.build_args)
            } else {
                Arc::new(self.build_args.with_defaults(&spec.build_args))
            };

            if !spec.build_options.is_empty() {
                let resolution =
                    self.templates
                        .resolve_options(&spec.build_options, &spec.language, &build_args);
                if let Some(error) = resolution.error {
                    tracing::warn!(function = %key, %error, "build options did not resolve");
                    plan.warnings.push(OptionWarning {
                        function: key.clone(),
                        error,
                    });
                }
                build_args = Arc::new(resolution.build_args);
            }

            plan.items.push(WorkItem {
                request: BuildRequest::for_function(&spec, &self.settings, build_args),
            });
        }

        plan
    }

    /// Hand `items` to `workers` threads and collect every result.
    ///
    /// If any worker fails to start, nothing is sent: the workers that did
    /// start see a closed channel, exit, and are joined before the error is
    /// returned.
    fn dispatch(
        &self,
        items: Vec<WorkItem>,
        workers: usize,
    ) -> Result<Vec<(String, Result<BuildOutput, BuildError>)>, OrchestrateError> {
        let (sender, receiver) = sync_channel::<WorkItem>(0);
        let receiver = Mutex::new(receiver);
        let builder = &self.builder;

        std::thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers);
            let mut spawn_error = None;
            for index in 0..workers {
                let receiver = &receiver;
                let spawned = std::thread::Builder::new()
                    .name(format!("fnforge-build-{index}"))
                    .spawn_scoped(scope, move || work(index, receiver, builder));
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(source) => {
                        tracing::error!(worker = index, error = %source, "failed to start worker");
                        spawn_error = Some(OrchestrateError::Spawn { index, source });
                        break;
                    }
                }
            }

            if spawn_error.is_none() {
                for item in items {
                    // Workers hold the receiver until the scope ends, so send
                    // only fails if every worker is gone.
                    if let Err(returned) = sender.send(item) {
                        tracing::error!(
                            function = %returned.0.request.name,
                            "no workers left to accept build"
                        );
                        break;
                    }
                }
            }
            drop(sender);

            let mut results = Vec::new();
            for (index, handle) in handles.into_iter().enumerate() {
                match handle.join() {
                    Ok(done) => results.extend(done),
                    Err(panic) => tracing::error!(
                        worker = index,
                        panic = %panic_message(panic.as_ref()),
                        "worker thread panicked"
                    ),
                }
            }

            match spawn_error {
                Some(error) => Err(error),
                None => Ok(results),
            }
        })
    }
}

/// Worker loop: take items until the channel is closed and drained.
fn work<B: ImageBuilder>(
    index: usize,
    receiver: &Mutex<Receiver<WorkItem>>,
    builder: &B,
) -> Vec<(String, Result<BuildOutput, BuildError>)> {
    let mut results = Vec::new();

    loop {
        // The guard is a temporary, so the lock is released as soon as
        // recv returns.
        let next = receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recv();
        let item = match next {
            Ok(item) => item,
            // Sender dropped and channel drained
            Err(RecvError) => break,
        };

        let name = item.request.name.clone();
        tracing::info!(worker = index, function = %name, "> building");

        let result = catch_unwind(AssertUnwindSafe(|| builder.build(&item.request)))
            .unwrap_or_else(|panic| {
                Err(BuildError::Panicked {
                    name: name.clone(),
                    message: panic_message(panic.as_ref()),
                })
            });

        match &result {
            Ok(_) => tracing::info!(worker = index, function = %name, "< building done"),
            Err(error) => {
                tracing::error!(worker = index, function = %name, %error, "< building failed");
            }
        }
        results.push((name, result));
    }

    tracing::debug!(worker = index, "worker done");
    results
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}
