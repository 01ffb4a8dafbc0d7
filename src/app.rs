//! Application orchestrator.
//! Loads/merges config, initializes logging, installs the signal handler,
//! decides between primary and secondary role and presents batch results.

use anyhow::{Context, Result};
use std::env;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use unfolder::cli::Args;
use unfolder::config::{CONFIG_ENV, create_template_config};
use unfolder::coordinator::{CoordinatorOptions, Finish, InstanceCoordinator};
use unfolder::flatten::{BatchPlan, FlattenEngine, FolderRequest, aggregate};
use unfolder::output as out;
use unfolder::{Config, UnfolderError, default_config_path, load_config, shutdown};

use crate::logging::init_tracing;

/// Run the CLI application.
pub fn run(args: Args) -> Result<()> {
    // Handle --print-config before logging init
    if args.print_config {
        print_config_location();
        return Ok(());
    }

    if args.init_config {
        let path = default_config_path().context("could not determine a config location")?;
        create_template_config(&path)?;
        out::print_success(&format!("A template unfolder config was written to: {}", path.display()));
        return Ok(());
    }

    let raw_folders = args.sanitized_folders();
    if raw_folders.is_empty() {
        return Err(UnfolderError::Usage.into());
    }

    let mut cfg = load_config()?;
    args.apply_overrides(&mut cfg);

    let guard_opt = init_tracing(&cfg.log_level, cfg.log_file.as_deref(), args.json)
        .context("failed to initialize logging")?;

    // Guard needs to be dropped on SIGINT to flush logs
    let guard_slot = Arc::new(Mutex::new(guard_opt));
    {
        let guard_slot = Arc::clone(&guard_slot);
        ctrlc::set_handler(move || {
            shutdown::request();
            out::print_warn("Received interrupt; stopping after the current item...");
            if let Ok(mut g) = guard_slot.lock() {
                let _ = g.take();
            }
        })
        .map_err(|e| UnfolderError::IpcSetup {
            context: "install interrupt handler".into(),
            source: std::io::Error::other(e),
        })?;
    }

    debug!(?args, "Starting unfolder");

    let cwd = env::current_dir().context("could not determine the working directory")?;
    let requests: Vec<FolderRequest> = raw_folders
        .into_iter()
        .map(|raw| FolderRequest::new(raw, &cwd))
        .collect();

    let mut engine = FlattenEngine::from_config(&cfg);

    if cfg.dry_run {
        print_plan(&engine.preview(&requests));
        return Ok(());
    }

    if cfg.standalone {
        let outcomes = engine.run(&requests);
        present(&cfg, &outcomes);
        return Ok(());
    }

    let coordinator = InstanceCoordinator::new(CoordinatorOptions::from_config(&cfg));
    let finished = coordinator.run(requests, |batch| {
        let outcomes = engine.run(&batch);
        present(&cfg, &outcomes);
    });
    match finished {
        Ok(Finish::Primary(report)) => {
            if report.interrupted {
                out::print_warn("Interrupted before the batch started; nothing was moved.");
            }
            debug!(?report, "primary finished");
        }
        Ok(Finish::Relayed(paths)) => debug!(paths, "handed off to the primary instance"),
        Err(e @ UnfolderError::Relay(_)) => out::print_warn(&format!(
            "{e}. The folders were not flattened; run unfolder again once the other instance has finished."
        )),
        Err(e) => return Err(e.into()),
    }

    // Drop the file logging guard (if any) to flush before exit.
    if let Ok(mut g) = guard_slot.lock() {
        let _ = g.take();
    }
    Ok(())
}

fn print_config_location() {
    if let Ok(cfg_env) = env::var(CONFIG_ENV) {
        out::print_info(&format!("Using {CONFIG_ENV} (explicit):\n  {cfg_env}\n"));
        out::print_info(&format!("To override, unset {CONFIG_ENV} or set it to another file."));
        return;
    }
    match default_config_path() {
        Some(p) => {
            out::print_info(&format!("Default unfolder config path:\n  {}\n", p.display()));
            if p.exists() {
                out::print_info("A config file already exists at that location.");
            } else {
                out::print_info("No config file exists there yet. Run with --init-config to create a template.");
            }
        }
        None => out::print_error("Could not determine a default config path."),
    }
}

/// Failures are always shown; success only when asked for.
fn present(cfg: &Config, outcomes: &[unfolder::FolderOutcome]) {
    let summary = aggregate(outcomes);
    info!(
        flattened = summary.success_count,
        failed = summary.failure_count,
        empty = summary.skipped_count,
        "batch finished"
    );
    if summary.has_failures() {
        out::print_warn(&summary.report());
    } else if cfg.success_popup {
        out::print_success(&summary.headline());
    }
}

fn print_plan(plan: &BatchPlan) {
    for entry in &plan.entries {
        out::print_user(&format!(
            "would move {} -> {}",
            entry.source.display(),
            entry.destination.display()
        ));
    }
    for folder in &plan.deletable {
        out::print_user(&format!("would remove {}", folder.display()));
    }
    for dest in plan.colliding_destinations() {
        out::print_warn(&format!("several items would move to {}", dest.display()));
    }
    for folder in &plan.empty {
        out::print_info(&format!("{} is already empty; it would be left alone", folder.display()));
    }
    for outcome in &plan.rejected {
        out::print_warn(&outcome.to_string());
    }
}
