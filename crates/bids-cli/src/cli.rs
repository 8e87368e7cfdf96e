//! CLI argument definitions for bids-curate.

use std::path::PathBuf;

use clap::{Args, ColorChoice, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;
use tracing::level_filters::LevelFilter;

use bids_cli::logging::{LogConfig, LogFormat};
use bids_fmap::CollisionPolicy;

#[derive(Parser)]
#[command(
    name = "bids-curate",
    version,
    about = "Classify scanner series into BIDS destinations and tidy converted field maps",
    long_about = "Classify scanner series into BIDS destinations and tidy converted field maps.\n\n\
                  `classify` turns a series table into a destination assignment for the converter.\n\
                  `reconcile` and `fix-intended-for` repair the field maps of a converted study."
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

    /// Prefix pretty and compact log lines with a timestamp (always on with --log-file).
    #[arg(long = "log-timestamps", global = true)]
    pub log_timestamps: bool,

    /// Show the emitting module of each log event.
    #[arg(long = "log-target", global = true)]
    pub log_target: bool,

    /// Emit an event when each unit span closes (json format only).
    #[arg(long = "log-spans", global = true)]
    pub log_spans: bool,
}

impl Cli {
    /// Logging configuration for these flags.
    ///
    /// `--log-level` wins over `-v`/`-q`; `RUST_LOG` is honoured only when
    /// neither is given. `stderr_is_terminal` decides color under `--color auto`.
    pub fn log_config(&self, stderr_is_terminal: bool) -> LogConfig {
        let explicit = self.log_level.map(LevelFilter::from);
        LogConfig {
            level_filter: explicit.unwrap_or_else(|| self.verbosity.tracing_level_filter()),
            use_env_filter: explicit.is_none() && !self.verbosity.is_present(),
            with_timestamps: self.log_timestamps || self.log_file.is_some(),
            with_target: self.log_target,
            with_spans: self.log_spans,
            with_ansi: match self.color.color {
                ColorChoice::Always => true,
                ColorChoice::Never => false,
                ColorChoice::Auto => self.log_file.is_none() && stderr_is_terminal,
            },
            format: self.log_format.into(),
            log_file: self.log_file.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Assign series from a series table to BIDS destinations.
    Classify(ClassifyArgs),

    /// Canonicalize field-map names and sync the scan manifests.
    Reconcile(ReconcileArgs),

    /// Restrict field-map IntendedFor lists to scans of the same direction.
    FixIntendedFor(FixIntendedForArgs),

    /// Show the rules of a rule set.
    Rules(RuleSourceArgs),
}

/// Where classification rules come from.
///
/// `--protocol` takes precedence over `--rules` and `BIDS_CURATE_RULES`; with
/// neither, the built-in `harp` protocol is used.
#[derive(Args, Clone, Default)]
pub struct RuleSourceArgs {
    /// Rule set file (TOML).
    #[arg(long = "rules", value_name = "TOML", env = "BIDS_CURATE_RULES")]
    pub rules: Option<PathBuf>,

    /// Built-in protocol name (harp, ge-fieldmap, siemens-phasediff).
    #[arg(long = "protocol", value_name = "NAME")]
    pub protocol: Option<String>,
}

#[derive(Parser)]
pub struct ClassifyArgs {
    /// Series table (TSV) written by the DICOM reader.
    #[arg(value_name = "SERIES_TSV")]
    pub series_table: PathBuf,

    /// Participant label, with or without the `sub-` prefix.
    #[arg(long = "subject", value_name = "ID")]
    pub subject: String,

    /// Session label, with or without the `ses-` prefix.
    #[arg(long = "session", value_name = "ID")]
    pub session: Option<String>,

    #[command(flatten)]
    pub rules: RuleSourceArgs,

    /// Write the assignment as JSON to this file instead of stdout.
    #[arg(long = "output", value_name = "JSON")]
    pub output: Option<PathBuf>,
}

#[derive(Parser)]
pub struct ReconcileArgs {
    /// Study directory containing bids/rawdata.
    #[arg(value_name = "STUDY_DIR")]
    pub study_dir: PathBuf,

    /// BIDS root to use instead of <STUDY_DIR>/bids/rawdata.
    #[arg(long = "bids-root", value_name = "DIR")]
    pub bids_root: Option<PathBuf>,

    /// Keep real and imaginary reconstructions.
    #[arg(long = "keep-extra")]
    pub keep_extra: bool,

    /// What to do when a canonical name is already taken.
    #[arg(long = "on-collision", value_enum, default_value = "overwrite")]
    pub on_collision: CollisionArg,

    /// Report planned changes without touching any file.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Parser)]
pub struct FixIntendedForArgs {
    /// Study directory containing bids/rawdata.
    #[arg(value_name = "STUDY_DIR")]
    pub study_dir: PathBuf,

    /// BIDS root to use instead of <STUDY_DIR>/bids/rawdata.
    #[arg(long = "bids-root", value_name = "DIR")]
    pub bids_root: Option<PathBuf>,

    /// Report planned changes without rewriting sidecars.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum CollisionArg {
    Overwrite,
    KeepExisting,
}

impl From<CollisionArg> for CollisionPolicy {
    fn from(value: CollisionArg) -> Self {
        match value {
            CollisionArg::Overwrite => CollisionPolicy::Overwrite,
            CollisionArg::KeepExisting => CollisionPolicy::KeepExisting,
        }
    }
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

impl From<LogLevelArg> for LevelFilter {
    fn from(level: LogLevelArg) -> Self {
        match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        }
    }
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(format: LogFormatArg) -> Self {
        match format {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["bids-curate"];
        argv.extend_from_slice(args);
        argv.push("rules");
        Cli::try_parse_from(argv).expect("valid arguments")
    }

    #[test]
    fn defaults_defer_to_rust_log() {
        let config = parse(&[]).log_config(true);
        assert_eq!(config.level_filter, LevelFilter::WARN);
        assert!(config.use_env_filter);
        assert!(!config.with_timestamps);
        assert!(!config.with_target);
        assert!(!config.with_spans);
        assert!(config.with_ansi);
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[test]
    fn explicit_level_beats_verbosity() {
        let config = parse(&["-vv", "--log-level", "error"]).log_config(false);
        assert_eq!(config.level_filter, LevelFilter::ERROR);
        assert!(!config.use_env_filter);

        let config = parse(&["-v"]).log_config(false);
        assert_eq!(config.level_filter, LevelFilter::INFO);
        assert!(!config.use_env_filter);
    }

    #[test]
    fn detail_flags_reach_the_config() {
        let config = parse(&[
            "--log-timestamps",
            "--log-target",
            "--log-spans",
            "--log-format",
            "json",
        ])
        .log_config(true);
        assert!(config.with_timestamps);
        assert!(config.with_target);
        assert!(config.with_spans);
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn log_file_gets_timestamps_without_color() {
        let config = parse(&["--log-file", "run.log"]).log_config(true);
        assert!(config.with_timestamps);
        assert!(!config.with_ansi);
        assert_eq!(config.log_file, Some(PathBuf::from("run.log")));

        let config = parse(&["--color", "always", "--log-file", "run.log"]).log_config(false);
        assert!(config.with_ansi);
    }
}
