//! The build orchestrator: compile -> execute -> record over the DAG.

use crate::cli::{GlobalArgs, RunArgs};
use crate::commands::common::{compile_model, load_project, CompiledModel, ProjectContext};
use dw_core::{selector, Materialization, ModelName, RunMeta, RunOutcome, StateStore};
use dw_db::{Database, DuckDbBackend};
use dw_sql::{quote_qualified, DuckDbDialect, SqlDialect};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

const EXIT_SUCCESS: i32 = 0;
const EXIT_MODEL_FAILURES: i32 = 1;
const EXIT_CANCELLED: i32 = 130;

/// Terminal result of one model in this run.
#[derive(Debug, Clone)]
pub struct ModelRunResult {
    pub model: ModelName,
    pub outcome: RunOutcome,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Acquire a mutex lock, recovering from a poisoned state if necessary.
fn recover_mutex<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(|poisoned| {
        log::warn!("mutex poisoned, recovering");
        poisoned.into_inner()
    })
}

pub async fn execute(args: &RunArgs, global: &GlobalArgs) -> anyhow::Result<i32> {
    let project = load_project(global)?;

    let selected = selector::select(
        &project.catalog,
        &project.graph.dag,
        &args.select,
        args.upstream,
        args.downstream,
    )?;

    if selected.is_empty() {
        println!("Nothing selected.");
        return Ok(EXIT_SUCCESS);
    }

    // Compile everything up front. A compile failure is fatal for that
    // model (and its dependents) but never for its siblings.
    let mut compiled: HashMap<ModelName, CompiledModel> = HashMap::new();
    let mut compile_failures: Vec<ModelRunResult> = Vec::new();
    for name in &selected {
        let model = project
            .catalog
            .get(name)
            .unwrap_or_else(|| unreachable!("selection comes from the catalog"));
        match compile_model(&project, model, global) {
            Ok(model) => {
                compiled.insert(name.clone(), model);
            }
            Err(err) => {
                eprintln!("  ✗ {name} (compile) - {err:#}");
                compile_failures.push(ModelRunResult {
                    model: name.clone(),
                    outcome: RunOutcome::Error,
                    duration_ms: 0,
                    error: Some(format!("{err:#}")),
                });
            }
        }
    }

    if args.dry_run {
        for name in &selected {
            if let Some(model) = compiled.get(name) {
                println!("-- {name} ({})\n{}\n", model.materialization, model.sql);
            }
        }
        return Ok(if compile_failures.is_empty() {
            EXIT_SUCCESS
        } else {
            EXIT_MODEL_FAILURES
        });
    }

    let db: Arc<dyn Database> =
        Arc::new(DuckDbBackend::new(&project.database_path(global))?);
    let target_schema = project.config.schema_for(&global.env);
    db.create_schema_if_not_exists(&quote_qualified(&target_schema, &DuckDbDialect))
        .await?;

    let threads = args.threads.unwrap_or(project.config.threads).max(1);
    let timeout = args.timeout.or(project.config.timeout_secs);

    let cancelled = Arc::new(AtomicBool::new(false));
    spawn_cancel_listener(Arc::clone(&cancelled));

    let results = run_models(RunPlan {
        db: &db,
        selected: &selected,
        compiled: &compiled,
        failed_upfront: &compile_failures,
        threads,
        timeout,
        full_refresh: args.full_refresh,
        quiet: global.quiet,
        cancelled: Arc::clone(&cancelled),
    })
    .await;

    record_state(&project, global, &results)?;
    print_summary(&results);

    if cancelled.load(Ordering::SeqCst) {
        return Ok(EXIT_CANCELLED);
    }
    let failures = results
        .iter()
        .filter(|r| r.outcome != RunOutcome::Success)
        .count();
    Ok(if failures == 0 {
        EXIT_SUCCESS
    } else {
        EXIT_MODEL_FAILURES
    })
}

fn spawn_cancel_listener(cancelled: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancellation requested; letting in-flight models finish.");
            cancelled.store(true, Ordering::SeqCst);
        }
    });
}

struct RunPlan<'a> {
    db: &'a Arc<dyn Database>,
    selected: &'a [ModelName],
    compiled: &'a HashMap<ModelName, CompiledModel>,
    failed_upfront: &'a [ModelRunResult],
    threads: usize,
    timeout: Option<u64>,
    full_refresh: bool,
    quiet: bool,
    cancelled: Arc<AtomicBool>,
}

/// Execute models level by level. A model becomes runnable only when every
/// predecessor succeeded; dependents of failed models are skipped.
async fn run_models(plan: RunPlan<'_>) -> Vec<ModelRunResult> {
    let mut results: Vec<ModelRunResult> = plan.failed_upfront.to_vec();
    let failed: Arc<Mutex<HashSet<ModelName>>> = Arc::new(Mutex::new(
        plan.failed_upfront.iter().map(|r| r.model.clone()).collect(),
    ));
    let run_results: Arc<Mutex<Vec<ModelRunResult>>> = Arc::new(Mutex::new(Vec::new()));
    let semaphore = Arc::new(Semaphore::new(plan.threads));

    let executable: Vec<&ModelName> = plan
        .selected
        .iter()
        .filter(|name| plan.compiled.contains_key(*name))
        .collect();

    let progress = create_progress_bar(executable.len(), plan.quiet);
    let levels = compute_execution_levels(plan.selected, plan.compiled);

    for level in &levels {
        if plan.cancelled.load(Ordering::SeqCst) {
            break;
        }

        let mut set = JoinSet::new();
        for name in level {
            let Some(compiled) = plan.compiled.get(name) else {
                continue; // compile failure, already recorded
            };

            // dependency failed -> skip and poison downstream
            let skip = {
                let failed = recover_mutex(&failed);
                compiled.dependencies.iter().any(|dep| failed.contains(dep))
            };
            if skip {
                recover_mutex(&failed).insert(name.clone());
                recover_mutex(&run_results).push(ModelRunResult {
                    model: name.clone(),
                    outcome: RunOutcome::Skipped,
                    duration_ms: 0,
                    error: Some("skipped: upstream failure".to_string()),
                });
                println!("  - {name} (skipped: upstream failure)");
                continue;
            }

            if plan.cancelled.load(Ordering::SeqCst) {
                break;
            }

            // Ephemeral models materialize nothing.
            if compiled.materialization == Materialization::Ephemeral {
                recover_mutex(&run_results).push(ModelRunResult {
                    model: name.clone(),
                    outcome: RunOutcome::Success,
                    duration_ms: 0,
                    error: None,
                });
                if let Some(pb) = &progress {
                    pb.inc(1);
                }
                continue;
            }

            set.spawn(execute_model_task(
                Arc::clone(plan.db),
                compiled.clone(),
                plan.full_refresh,
                plan.timeout,
                Arc::clone(&semaphore),
                Arc::clone(&failed),
                Arc::clone(&run_results),
                progress.clone(),
            ));
        }

        while let Some(joined) = set.join_next().await {
            if let Err(err) = joined {
                log::warn!("task join error: {err}");
            }
        }
    }

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    // models never started (cancellation) get a terminal outcome
    let started: HashSet<ModelName> = {
        let done = recover_mutex(&run_results);
        results.extend(done.iter().cloned());
        results.iter().map(|r| r.model.clone()).collect()
    };
    for name in plan.selected {
        if !started.contains(name) {
            results.push(ModelRunResult {
                model: name.clone(),
                outcome: RunOutcome::Cancelled,
                duration_ms: 0,
                error: Some("cancelled before start".to_string()),
            });
        }
    }

    results
}

#[allow(clippy::too_many_arguments)]
async fn execute_model_task(
    db: Arc<dyn Database>,
    compiled: CompiledModel,
    full_refresh: bool,
    timeout_secs: Option<u64>,
    semaphore: Arc<Semaphore>,
    failed: Arc<Mutex<HashSet<ModelName>>>,
    run_results: Arc<Mutex<Vec<ModelRunResult>>>,
    progress: Option<ProgressBar>,
) {
    let Ok(_permit) = semaphore.acquire().await else {
        return;
    };

    let started = Instant::now();
    let name = compiled.name.clone();

    let outcome = match timeout_secs {
        Some(secs) => {
            match tokio::time::timeout(
                Duration::from_secs(secs),
                materialize(&db, &compiled, full_refresh),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(format!("timed out after {secs}s")),
            }
        }
        None => materialize(&db, &compiled, full_refresh).await,
    };

    let duration_ms = started.elapsed().as_millis() as u64;
    let result = match outcome {
        Ok(()) => {
            println!("  ✓ {name} ({}) [{duration_ms}ms]", compiled.materialization);
            ModelRunResult {
                model: name.clone(),
                outcome: RunOutcome::Success,
                duration_ms,
                error: None,
            }
        }
        Err(message) => {
            println!("  ✗ {name} - {message} [{duration_ms}ms]");
            let outcome = if message.starts_with("timed out") {
                RunOutcome::Timeout
            } else {
                RunOutcome::Error
            };
            recover_mutex(&failed).insert(name.clone());
            ModelRunResult {
                model: name.clone(),
                outcome,
                duration_ms,
                error: Some(message),
            }
        }
    };

    recover_mutex(&run_results).push(result);
    if let Some(pb) = &progress {
        pb.inc(1);
    }
}

/// Submit one compiled model according to its materialization mode.
async fn materialize(
    db: &Arc<dyn Database>,
    compiled: &CompiledModel,
    full_refresh: bool,
) -> Result<(), String> {
    let quoted = quote_qualified(&compiled.relation, &DuckDbDialect);
    let run = async {
        match compiled.materialization {
            Materialization::View => db.create_view_as(&quoted, &compiled.sql, true).await,
            Materialization::Table => db.create_table_as(&quoted, &compiled.sql, true).await,
            Materialization::Incremental => {
                if full_refresh {
                    db.drop_if_exists(&quoted).await?;
                }
                if db.relation_exists(&compiled.relation).await? && !full_refresh {
                    incremental_merge(db, compiled, &quoted).await
                } else {
                    db.create_table_as(&quoted, &compiled.sql, true).await
                }
            }
            Materialization::Ephemeral => Ok(()),
        }
    };
    run.await.map_err(|e| e.to_string())
}

/// Delete+insert increment: remove rows matching the new batch's unique
/// key, then append the batch. Without a unique key the batch is appended.
async fn incremental_merge(
    db: &Arc<dyn Database>,
    compiled: &CompiledModel,
    quoted: &str,
) -> dw_db::DbResult<()> {
    if let Some(keys) = &compiled.unique_key {
        let key_list = keys
            .iter()
            .map(|k| DuckDbDialect.quote_ident(k))
            .collect::<Vec<_>>()
            .join(", ");
        let delete = format!(
            "DELETE FROM {quoted} WHERE ({key_list}) IN (SELECT {key_list} FROM ({select}) AS __batch)",
            select = compiled.sql
        );
        db.execute(&delete).await?;
    }
    let insert = format!("INSERT INTO {quoted} SELECT * FROM ({}) AS __batch", compiled.sql);
    db.execute(&insert).await?;
    Ok(())
}

/// Group the selected models into dependency levels: every model lands one
/// level below its deepest selected dependency.
fn compute_execution_levels(
    selected: &[ModelName],
    compiled: &HashMap<ModelName, CompiledModel>,
) -> Vec<Vec<ModelName>> {
    let selected_set: HashSet<&ModelName> = selected.iter().collect();
    let mut level_of: BTreeMap<ModelName, usize> = BTreeMap::new();
    let mut levels: Vec<Vec<ModelName>> = Vec::new();

    for name in selected {
        let level = compiled
            .get(name)
            .map(|model| {
                model
                    .dependencies
                    .iter()
                    .filter(|dep| selected_set.contains(dep))
                    .filter_map(|dep| level_of.get(dep))
                    .map(|l| l + 1)
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0);

        level_of.insert(name.clone(), level);
        if levels.len() <= level {
            levels.resize_with(level + 1, Vec::new);
        }
        levels[level].push(name.clone());
    }

    levels
}

fn create_progress_bar(count: usize, quiet: bool) -> Option<ProgressBar> {
    if quiet {
        return None;
    }
    let pb = ProgressBar::new(count as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    Some(pb)
}

fn record_state(
    project: &ProjectContext,
    global: &GlobalArgs,
    results: &[ModelRunResult],
) -> anyhow::Result<()> {
    let store = StateStore::open(&project.state_path(global))?;
    for result in results {
        let meta = match result.outcome {
            RunOutcome::Success => RunMeta::success(result.duration_ms),
            outcome => RunMeta::failure(
                outcome,
                result.duration_ms,
                result.error.as_deref().unwrap_or("unknown error"),
            ),
        };
        store.put_run_metadata(&result.model, meta);
    }
    store.commit()?;
    Ok(())
}

fn print_summary(results: &[ModelRunResult]) {
    let total = results.len();
    let ok = results.iter().filter(|r| r.outcome == RunOutcome::Success).count();
    println!("\nDone. {ok}/{total} models succeeded.");
    for result in results {
        if result.outcome != RunOutcome::Success {
            println!(
                "  {}: {} ({})",
                result.model,
                result.outcome,
                result.error.as_deref().unwrap_or("")
            );
        }
    }
}

#[cfg(test)]
#[path = "run_test.rs"]
mod tests;
