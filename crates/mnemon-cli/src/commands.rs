//! Command implementations for the mnemon CLI.
//!
//! Handles:
//! - store / recall / forget: the core memory operations
//! - trace / bind / health: inspection and cluster linking
//! - maintain / preview / reconfirm: lifecycle passes
//! - export / import: JSON snapshots

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use mnemon_engine::{ForgetFilter, MemoryEngine, RecallRequest, StoreRequest};
use mnemon_lifecycle::MemoryLifecycle;
use mnemon_policy::MemoryPolicy;
use mnemon_store::MemorySnapshot;
use mnemon_types::Settings;

use crate::cli::{Cli, Commands};

/// Run a parsed CLI invocation end to end.
///
/// 1. Load configuration (defaults -> file -> env -> CLI flags)
/// 2. Initialize logging
/// 3. Open the engine with the memory policy attached
/// 4. Dispatch the subcommand
pub fn run(cli: Cli) -> Result<()> {
    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;

    // CLI flags take precedence over every other config source.
    if let Some(data_dir) = cli.data_dir {
        settings.data_dir = data_dir;
    }
    if let Some(log_level) = cli.log_level {
        settings.log_level = log_level;
    }
    settings.validate().context("Invalid configuration")?;

    init_logging(&settings)?;

    let policy = Arc::new(MemoryPolicy::new(settings.policy.clone()));
    policy.set_mode(cli.mode);

    let engine = MemoryEngine::open(&settings)
        .context("Failed to open memory engine")?
        .with_store_policy(policy.clone())
        .with_recall_policy(policy);

    dispatch(&engine, &settings, cli.command)
}

/// Initialize logging. Logs go to stderr so JSON on stdout stays parseable.
fn init_logging(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

fn dispatch(engine: &MemoryEngine, settings: &Settings, command: Commands) -> Result<()> {
    match command {
        Commands::Store {
            payload,
            kind,
            tag,
            source,
            salience,
            confidence,
            module,
            session,
        } => {
            let mut request = StoreRequest::new(payload, kind)
                .with_tags(tag)
                .with_source(source)
                .with_confidence(confidence);
            if let Some(salience) = salience {
                request = request.with_salience(salience);
            }
            if let Some(module) = module {
                request = request.with_module_tag(module);
            }
            if let Some(session) = session {
                request = request.with_session(session);
            }
            let item = engine.store(request)?;
            print_json(&item)
        }

        Commands::Recall {
            kind,
            tag,
            module,
            status,
            min_salience,
            limit,
            no_touch,
        } => {
            let mut request = RecallRequest::new().with_tags(tag).with_limit(limit);
            if let Some(kind) = kind {
                request = request.with_kind(kind);
            }
            if let Some(module) = module {
                request = request.with_module_tag(module);
            }
            if let Some(status) = status {
                request = request.with_status(status);
            }
            if let Some(min_salience) = min_salience {
                request = request.with_min_salience(min_salience);
            }
            if no_touch {
                request = request.without_touch();
            }
            let items = engine.recall(&request)?;
            print_json(&items)
        }

        Commands::Forget { ids, tag, kind } => {
            let filter = ForgetFilter {
                ids: (!ids.is_empty()).then_some(ids),
                tags: (!tag.is_empty()).then_some(tag),
                kind,
            };
            if filter.is_empty() {
                anyhow::bail!("Refusing to forget: no ids, tags, or kind given");
            }
            let removed = engine.forget(&filter)?;
            println!("Forgot {removed} memory item(s)");
            Ok(())
        }

        Commands::Trace { id } => match engine.trace(id) {
            Some(item) => print_json(&item),
            None => anyhow::bail!("No memory with id {id}"),
        },

        Commands::Bind { ids } => {
            let cluster_id = engine.bind_cluster(&ids)?;
            println!("Bound {} item(s) into cluster {cluster_id}", ids.len());
            Ok(())
        }

        Commands::Health => print_json(&engine.get_health()),

        Commands::Maintain {
            dry_run,
            no_decay,
            no_drift,
        } => {
            let mut lifecycle = MemoryLifecycle::new(settings.decay.clone());
            let items = engine.get_all_for_lifecycle();
            let report = lifecycle.process_memories(&items, !no_decay, !no_drift);
            if dry_run {
                info!("dry run, skipping persistence");
            } else {
                let applied = engine.apply_decay_updates(&report.decay_updates)?;
                info!(applied, "decay updates persisted");
            }
            print_json(&report)
        }

        Commands::Preview { kind, salience, days } => {
            let lifecycle = MemoryLifecycle::new(settings.decay.clone());
            print_json(&lifecycle.decay_preview(kind, salience, days))
        }

        Commands::Reconfirm { id, salience } => {
            if !engine.reconfirm_memory(id, salience)? {
                anyhow::bail!("No memory with id {id}");
            }
            println!("Memory {id} reconfirmed");
            Ok(())
        }

        Commands::Export { output } => {
            let snapshot = engine.export_state();
            let json = serde_json::to_string_pretty(&snapshot)?;
            match output {
                Some(path) => {
                    fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!(
                        "Exported {} memory item(s) to {}",
                        snapshot.items.len(),
                        path.display()
                    );
                }
                None => println!("{json}"),
            }
            Ok(())
        }

        Commands::Import { input } => {
            let raw = fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let snapshot: MemorySnapshot =
                serde_json::from_str(&raw).context("Snapshot file is not valid JSON")?;
            let imported = engine.import_state(snapshot)?;
            println!("Imported {imported} memory item(s)");
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
