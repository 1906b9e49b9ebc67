//! Image Similarity Evaluation CLI Tool
//!
//! Ranks two candidate renders against a ground-truth capture.

use clap::Parser;
use imgeval::cli::{run, Cli};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
