//! HL7 interface manager CLI.

use clap::{ColorChoice, Parser};
use hl7_cli::logging::{LogConfig, LogFormat, init_logging};
use std::io::{self, IsTerminal};
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;
mod summary;
mod types;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use crate::commands::{
    app_context, run_apply, run_configs, run_export, run_import, run_monitor, run_process_file,
};
use crate::summary::{
    print_apply_report, print_configs, print_file_outcome, print_monitor_summary,
};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let ctx = match app_context(cli.config_file.as_deref(), cli.settings_file.as_deref()) {
        Ok(ctx) => ctx,
        Err(error) => {
            eprintln!("error: {error:#}");
            std::process::exit(1);
        }
    };
    let exit_code = match &cli.command {
        Command::Monitor(args) => match run_monitor(args, &ctx) {
            Ok(summary) => {
                print_monitor_summary(&summary);
                if summary.failed > 0 { 1 } else { 0 }
            }
            Err(error) => report(&error),
        },
        Command::ProcessFile(args) => match run_process_file(args, &ctx) {
            Ok(outcome) => {
                print_file_outcome(&outcome);
                0
            }
            Err(error) => report(&error),
        },
        Command::Apply(args) => match run_apply(args, &ctx) {
            Ok(report) => {
                print_apply_report(&report);
                0
            }
            Err(error) => report(&error),
        },
        Command::ExportConfig(args) => match run_export(&args.path, &ctx) {
            Ok(count) => {
                println!("Exported {count} configurations to {}", args.path.display());
                0
            }
            Err(error) => report(&error),
        },
        Command::ImportConfig(args) => match run_import(&args.path, &ctx) {
            Ok(names) if names.is_empty() => {
                println!("Nothing imported from {}", args.path.display());
                0
            }
            Ok(names) => {
                println!(
                    "Imported {} from {}",
                    names.join(", "),
                    args.path.display()
                );
                0
            }
            Err(error) => report(&error),
        },
        Command::Configs => match run_configs(&ctx) {
            Ok(configs) => {
                print_configs(&ctx, &configs);
                0
            }
            Err(error) => report(&error),
        },
    };
    std::process::exit(exit_code);
}

fn report(error: &anyhow::Error) -> i32 {
    eprintln!("error: {error:#}");
    1
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    // Timestamps only for the long-running monitor.
    config.with_timestamps = matches!(cli.command, Command::Monitor(_));
    config.log_file = cli.log_file.clone();
    config.log_data = cli.log_data;
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
