use std::fs;
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{Context, Result, anyhow};
use hl7_config::{ConfigStore, default_settings_path, default_store_path, load_settings};
use hl7_core::{FileOutcome, FileResult, Monitor, MonitorConfig, MonitorSummary, process_single};
use hl7_model::RuleSet;
use hl7_transform::{TransformReport, transform_text};
use tracing::{info, info_span, warn};

use hl7_cli::rules::{action_count, load_rules_file, select_rules};

use crate::cli::{ApplyArgs, MonitorArgs, ProcessFileArgs};
use crate::types::{AppContext, ConfigSummary};

/// Resolve store and settings locations from the global flags.
pub fn app_context(
    config_file: Option<&Path>,
    settings_file: Option<&Path>,
) -> Result<AppContext> {
    let store_path = match config_file {
        Some(path) => path.to_path_buf(),
        None => default_store_path()
            .ok_or_else(|| anyhow!("no platform config directory; pass --config-file"))?,
    };
    let settings_path = settings_file
        .map(Path::to_path_buf)
        .or_else(default_settings_path);
    let settings = settings_path
        .as_deref()
        .map(load_settings)
        .unwrap_or_default();
    Ok(AppContext {
        store_path,
        settings_path,
        settings,
    })
}

fn load_store(ctx: &AppContext) -> Result<ConfigStore> {
    ConfigStore::load(&ctx.store_path)
        .with_context(|| format!("load configurations from {}", ctx.store_path.display()))
}

fn required_dir(flag: Option<&PathBuf>, setting: Option<&PathBuf>, name: &str) -> Result<PathBuf> {
    flag.or(setting).cloned().ok_or_else(|| {
        anyhow!("{name} directory not set; pass --{name}-dir or set {name}_dir in settings")
    })
}

pub fn run_monitor(args: &MonitorArgs, ctx: &AppContext) -> Result<MonitorSummary> {
    let settings = &ctx.settings;
    let input_dir = required_dir(args.input_dir.as_ref(), settings.input_dir.as_ref(), "input")?;
    let output_dir = required_dir(args.output_dir.as_ref(), settings.output_dir.as_ref(), "output")?;
    let backup_dir = required_dir(args.backup_dir.as_ref(), settings.backup_dir.as_ref(), "backup")?;

    let store = load_store(ctx)?;
    let config_name = args.config.as_deref().or(settings.active_config.as_deref());
    let rules = select_rules(&store, config_name)?;

    let config = MonitorConfig::new(&input_dir, output_dir, backup_dir)
        .with_extension(args.extension.clone().unwrap_or_else(|| settings.extension.clone()))
        .with_workers(args.workers.map_or(settings.workers, usize::from))
        .with_queue_capacity(settings.queue_capacity);

    let handle = Monitor::start(&config, rules)
        .with_context(|| format!("start monitoring {}", input_dir.display()))?;
    println!(
        "Monitoring {} (config: {}). Press Ctrl+C to stop.",
        input_dir.display(),
        config_name.unwrap_or("none")
    );

    let outcomes = handle.outcomes().clone();
    let printer = thread::Builder::new()
        .name("hl7-outcomes".into())
        .spawn(move || {
            for result in outcomes.iter() {
                print_outcome_line(&result);
            }
        })
        .context("spawn outcome printer")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("build signal runtime")?;
    let received = runtime
        .block_on(shutdown_signal())
        .context("install signal handlers")?;
    info!(signal = received, "shutting down");

    let summary = handle.stop();
    if printer.join().is_err() {
        tracing::error!("outcome printer panicked");
    }
    Ok(summary)
}

async fn shutdown_signal() -> std::io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        tokio::select! {
            _ = sigterm.recv() => Ok("SIGTERM"),
            _ = sigint.recv() => Ok("SIGINT"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok("Ctrl+C")
    }
}

fn print_outcome_line(result: &FileResult) {
    match &result.result {
        Ok(outcome) => println!(
            "processed {} -> {}",
            result.path.display(),
            outcome.output.display()
        ),
        Err(error) => eprintln!("failed {}: {}", result.path.display(), error.user_message()),
    }
}

pub fn run_process_file(args: &ProcessFileArgs, ctx: &AppContext) -> Result<FileOutcome> {
    let span = info_span!("process_file_command", file = %args.file.display());
    let _guard = span.enter();

    let store = load_store(ctx)?;
    let rules = select_rules(&store, args.config.as_deref())?;
    process_single(
        &args.file,
        args.output_dir.as_deref(),
        args.backup_dir.as_deref(),
        rules,
    )
    .with_context(|| format!("process {}", args.file.display()))
}

pub fn run_apply(args: &ApplyArgs, ctx: &AppContext) -> Result<TransformReport> {
    let rules = match &args.rules {
        Some(path) => load_rules_file(path)?,
        None => select_rules(&load_store(ctx)?, args.config.as_deref())?,
    };
    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("read {}", args.file.display()))?;
    let (output, report) = transform_text(&text, &rules);
    print!("{output}");
    Ok(report)
}

pub fn run_export(path: &Path, ctx: &AppContext) -> Result<usize> {
    let store = load_store(ctx)?;
    store
        .export_to(path)
        .with_context(|| format!("export configurations to {}", path.display()))?;
    Ok(store.len())
}

pub fn run_import(path: &Path, ctx: &AppContext) -> Result<Vec<String>> {
    let mut store = load_store(ctx)?;
    let imported = store
        .import_from(path)
        .with_context(|| format!("import configurations from {}", path.display()))?;
    if !imported.is_empty() {
        store
            .save()
            .with_context(|| format!("save configurations to {}", store.path().display()))?;
    }
    Ok(imported)
}

pub fn run_configs(ctx: &AppContext) -> Result<Vec<ConfigSummary>> {
    let store = load_store(ctx)?;
    Ok(store
        .iter()
        .map(|(name, resolved)| {
            let rules = resolved.unwrap_or_else(|error| {
                warn!(config = name, %error, "configuration has no usable rules");
                RuleSet::default()
            });
            ConfigSummary {
                name: name.to_string(),
                rules: rules.len(),
                conditional: rules.iter().filter(|rule| rule.condition().is_some()).count(),
                actions: action_count(&rules),
            }
        })
        .collect())
}
