//! CLI argument definitions for the HL7 interface manager.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "hl7-manager",
    version,
    about = "HL7 interface manager - rule-based transformation of HL7 v2 message files",
    long_about = "Transform pipe-delimited HL7 v2 message files with named rule sets.\n\n\
                  Watches an input directory, writes transformed copies to an output\n\
                  directory and moves originals to a backup directory."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow segment field values in logs (they may contain patient data).
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,

    /// Named rule-set store (default: configurations.json in the config dir).
    #[arg(long = "config-file", value_name = "PATH", global = true)]
    pub config_file: Option<PathBuf>,

    /// Monitor settings file (default: settings.toml in the config dir).
    #[arg(long = "settings-file", value_name = "PATH", global = true)]
    pub settings_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Process existing files, then watch the input directory until interrupted.
    Monitor(MonitorArgs),

    /// Process one file and exit.
    ProcessFile(ProcessFileArgs),

    /// Print a transformed message to stdout without touching any file.
    Apply(ApplyArgs),

    /// Export all configurations to a JSON file.
    ExportConfig(PathArgs),

    /// Import configurations from a JSON file, replacing same-named ones.
    ImportConfig(PathArgs),

    /// List stored configurations.
    Configs,
}

#[derive(Parser)]
pub struct MonitorArgs {
    /// Directory to watch for incoming messages.
    #[arg(long = "input-dir", value_name = "DIR")]
    pub input_dir: Option<PathBuf>,

    /// Directory for transformed messages.
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Directory originals are moved to after processing.
    #[arg(long = "backup-dir", value_name = "DIR")]
    pub backup_dir: Option<PathBuf>,

    /// Name of the configuration to apply.
    #[arg(long = "config", value_name = "NAME")]
    pub config: Option<String>,

    /// Message file extension (default: hl7).
    #[arg(long = "extension", value_name = "EXT")]
    pub extension: Option<String>,

    /// Number of worker threads.
    #[arg(long = "workers", value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub workers: Option<u16>,
}

#[derive(Parser)]
pub struct ProcessFileArgs {
    /// Message file to process.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Output directory (default: the file's own directory).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Move the original here after processing.
    #[arg(long = "backup-dir", value_name = "DIR")]
    pub backup_dir: Option<PathBuf>,

    /// Name of the configuration to apply.
    #[arg(long = "config", value_name = "NAME")]
    pub config: Option<String>,
}

#[derive(Parser)]
pub struct ApplyArgs {
    /// Message file to transform.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Name of the configuration to apply.
    #[arg(long = "config", value_name = "NAME")]
    pub config: Option<String>,

    /// Apply a rule array from a JSON file instead of a stored configuration.
    #[arg(long = "rules", value_name = "PATH", conflicts_with = "config")]
    pub rules: Option<PathBuf>,
}

#[derive(Parser)]
pub struct PathArgs {
    /// JSON file path.
    #[arg(value_name = "PATH")]
    pub path: PathBuf,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
