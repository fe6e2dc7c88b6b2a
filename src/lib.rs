// src/lib.rs

pub mod cache;
pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use tracing::{debug, info, warn};

use crate::cache::{
    BuildCache, FileStateStore, MemoryStateStore, StaleReason, StaleTask, StateStore,
};
use crate::cli::CliArgs;
use crate::config::{ConfigFile, load_and_validate};
use crate::dag::{DependencyGraph, Task, TaskRegistry, sort_all, sort_for_task};
use crate::errors::Result;
use crate::exec::{Executor, ShellExecutor};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::{StoreMode, TaskId, TaskName, TaskOutcome};

/// Knobs for [`schedule_tasks`].
#[derive(Debug, Clone, Default)]
pub struct ScheduleOptions {
    /// Hash file sets on the rayon pool while classifying.
    pub parallel_fingerprint: bool,
    /// Restrict the run to this task and its transitive prerequisites.
    pub only: Option<TaskName>,
}

/// Output of one scheduling run.
#[derive(Debug)]
pub struct Plan<'a> {
    /// Full dependency-respecting order (prerequisites first).
    pub order: Vec<TaskId>,
    /// Stale subset of `order`, same relative order.
    pub stale: Vec<StaleTask<'a>>,
}

/// Validate the registry, order it, and select the stale tasks.
///
/// Configuration errors abort before anything is read from the store.
/// Per-task fingerprint and store failures end up in [`StaleTask::reason`].
pub fn schedule_tasks<'a>(
    registry: &'a TaskRegistry,
    fs: &dyn FileSystem,
    store: &dyn StateStore,
    options: &ScheduleOptions,
) -> Result<Plan<'a>> {
    let graph = DependencyGraph::build(registry, fs)?;
    let order = match options.only.as_deref() {
        Some(task) => sort_for_task(&graph, registry, task)?,
        None => sort_all(&graph)?,
    };
    let ordered: Vec<&'a Task> = registry.resolve(&order).collect();

    let cache = BuildCache::new(fs).with_parallel_fingerprint(options.parallel_fingerprint);
    let stale = cache.filter_tasks(&ordered, store);

    info!(
        scheduled = order.len(),
        stale = stale.len(),
        "scheduling complete"
    );
    Ok(Plan { order, stale })
}

/// What happened while executing a [`Plan`].
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Tasks that ran successfully and were committed.
    pub executed: Vec<TaskName>,
    /// Tasks skipped because their regenerated inputs turned out unchanged.
    pub skipped: Vec<TaskName>,
    /// The task that failed, which stopped the run.
    pub failed: Option<(TaskName, TaskOutcome)>,
    /// Tasks that ran but whose fingerprint could not be committed; they
    /// stay stale for the next run.
    pub commit_errors: Vec<(TaskName, String)>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_none()
    }
}

/// Hand each stale task to `executor` in order, committing fingerprints after
/// every successful run.
///
/// Stops at the first failed task; everything after it remains stale. A task
/// that is stale only because an upstream task regenerates its inputs is
/// re-checked right before it would run, and skipped if those inputs came
/// out unchanged.
pub fn execute_plan(
    plan: &Plan<'_>,
    fs: &dyn FileSystem,
    store: &mut dyn StateStore,
    executor: &mut dyn Executor,
) -> RunSummary {
    let cache = BuildCache::new(fs);
    let mut summary = RunSummary::default();

    for StaleTask { task, reason } in plan.stale.iter() {
        if matches!(reason, StaleReason::UpstreamStale { .. })
            && !cache.is_stale(task, &*store).is_stale()
        {
            debug!(task = %task.name, "regenerated inputs unchanged; skipping");
            summary.skipped.push(task.name.clone());
            continue;
        }

        info!(task = %task.name, %reason, "running stale task");
        let outcome = executor.execute(task);
        if !outcome.is_success() {
            warn!(task = %task.name, ?outcome, "task failed; stopping run");
            summary.failed = Some((task.name.clone(), outcome));
            break;
        }

        match cache.commit(task, store) {
            Ok(_) => summary.executed.push(task.name.clone()),
            Err(err) => {
                warn!(task = %task.name, error = %err, "could not commit fingerprint");
                summary.commit_errors.push((task.name.clone(), err.to_string()));
            }
        }
    }

    summary
}

/// High-level entry point used by `main.rs`.
///
/// This wires together config loading, the state store, scheduling and the
/// shell executor.
pub fn run(args: CliArgs) -> anyhow::Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading config {:?}", config_path))?;
    let root = config_root_dir(&config_path);
    let registry = cfg.registry(&root);
    let fs = RealFileSystem;

    if args.list {
        print_tasks(&registry);
        return Ok(());
    }

    let mut store = open_store(&cfg, &root, &args)?;
    let options = ScheduleOptions {
        parallel_fingerprint: cfg.config.parallel_fingerprint,
        only: args.task.clone(),
    };
    let plan = schedule_tasks(&registry, &fs, &*store, &options)?;

    if args.dry_run {
        print_plan(&registry, &plan);
        return Ok(());
    }

    let mut executor = ShellExecutor::new(&root);
    let summary = execute_plan(&plan, &fs, &mut *store, &mut executor);
    store.flush()?;

    info!(
        executed = summary.executed.len(),
        skipped = summary.skipped.len(),
        up_to_date = plan.order.len() - plan.stale.len(),
        "run finished"
    );

    if let Some((task, outcome)) = summary.failed {
        bail!("task '{}' failed ({:?})", task, outcome);
    }
    if !summary.commit_errors.is_empty() {
        let names: Vec<_> = summary.commit_errors.iter().map(|(n, _)| n.as_str()).collect();
        bail!("could not record state for: {}", names.join(", "));
    }
    Ok(())
}

fn open_store(cfg: &ConfigFile, root: &Path, args: &CliArgs) -> anyhow::Result<Box<dyn StateStore>> {
    Ok(match cfg.config.store {
        StoreMode::Memory => Box::new(MemoryStateStore::new()),
        StoreMode::File => {
            let durability = args.durability.unwrap_or(cfg.config.durability);
            Box::new(FileStateStore::open(cfg.state_file(root), durability)?)
        }
    })
}

/// Figure out the project root that relative task paths resolve against.
///
/// - If the config path has a non-empty parent (e.g. "build/Dagmake.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Dagmake.toml" (parent = ""),
///   we use the empty path, i.e. the current working directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::new(),
    }
}

fn print_tasks(registry: &TaskRegistry) {
    println!("tasks ({}):", registry.len());
    for (_, task) in registry.iter() {
        println!("  - {}", task.name);
        if let Some(cmd) = &task.action {
            println!("      cmd: {cmd}");
        }
        if !task.file_dep.is_empty() {
            println!("      file_dep: {:?}", task.file_dep);
        }
        if !task.targets.is_empty() {
            println!("      targets: {:?}", task.targets);
        }
        if !task.task_dep.is_empty() {
            println!("      task_dep: {:?}", task.task_dep);
        }
    }
}

fn print_plan(registry: &TaskRegistry, plan: &Plan<'_>) {
    println!("dagmake dry-run");
    println!("order:");
    for task in registry.resolve(&plan.order) {
        println!("  {}", task.name);
    }
    println!("stale ({} of {}):", plan.stale.len(), plan.order.len());
    for StaleTask { task, reason } in plan.stale.iter() {
        println!("  {}: {}", task.name, reason);
    }
}
