//! bids-curate command-line interface.

use std::io::{self, IsTerminal};

use clap::Parser;

use bids_cli::logging::init_logging;

mod cli;
mod commands;
mod summary;

use crate::cli::{Cli, Command};
use crate::commands::{run_classify, run_fix_intended_for, run_reconcile, run_rules};
use crate::summary::{classification_summary, print_reconcile, print_repair};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = cli.log_config(io::stderr().is_terminal());
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match &cli.command {
        Command::Classify(args) => match run_classify(args) {
            Ok(result) => {
                let summary = classification_summary(&result);
                if result.output.is_some() {
                    println!("{summary}");
                } else {
                    eprintln!("{summary}");
                }
                0
            }
            Err(error) => report_error(&error),
        },
        Command::Reconcile(args) => match run_reconcile(args) {
            Ok(run) => {
                print_reconcile(&run);
                if run.has_errors() { 1 } else { 0 }
            }
            Err(error) => report_error(&error),
        },
        Command::FixIntendedFor(args) => match run_fix_intended_for(args) {
            Ok(run) => {
                print_repair(&run);
                if run.has_errors() { 1 } else { 0 }
            }
            Err(error) => report_error(&error),
        },
        Command::Rules(args) => match run_rules(args) {
            Ok(()) => 0,
            Err(error) => report_error(&error),
        },
    };
    std::process::exit(exit_code);
}

fn report_error(error: &anyhow::Error) -> i32 {
    eprintln!("error: {error:#}");
    1
}
