//! bv - an interactive terminal viewer for BSON record files.
//!
//! # Usage
//!
//! ```bash
//! bv dump.bson
//! ```

use std::path::PathBuf;
use std::process::exit;

use clap::error::ErrorKind;
use clap::Parser;

use bv::app::{App, AppError};

const EXIT_INTERNAL: i32 = 1;
const EXIT_INPUT_FILE: i32 = -3;
const EXIT_TERM: i32 = -4;

/// View a file of length-prefixed BSON documents, less(1)-style
#[derive(Parser, Debug)]
#[command(name = "bv", version, about, long_about = None)]
struct Cli {
    /// BSON file to view
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = err.print();
            exit(0);
        }
        Err(_) => {
            eprintln!("Usage: bv <bsonfile>");
            eprintln!("  Exactly one input file is supported.");
            exit(EXIT_INPUT_FILE);
        }
    };

    let code = match App::new(cli.file).run() {
        Ok(()) => 0,
        Err(err @ AppError::InputFile(_)) => {
            eprintln!("bv: Error: {err}");
            EXIT_INPUT_FILE
        }
        Err(err @ AppError::Terminal(_)) => {
            eprintln!("bv: Error: {err}");
            eprintln!("bv: Check your $TERM variable, or try a different terminal emulator.");
            EXIT_TERM
        }
        Err(err @ AppError::Cache(_)) => {
            // terminal already restored by App::run
            eprintln!("bv: Error: {err}");
            eprintln!("bv: Is this a BSON file?");
            EXIT_INTERNAL
        }
        Err(err) => {
            eprintln!("bv: Error: {err}");
            EXIT_INTERNAL
        }
    };
    exit(code);
}
