use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use miette::{IntoDiagnostic, Result};

use braid::memory::Memory;
use braid::{image, term, RunState};

/// Braid is a fast & faithful virtual machine for LC3 program images.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Binary `.lc3` images to load in order before execution
    #[arg(required = true)]
    images: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut memory = Memory::new();
    for path in &args.images {
        if image::load(path, &mut memory).is_err() {
            println!("failed to load image: {}", path.display());
            std::process::exit(1);
        }
    }

    // A host signal must interrupt the machine no matter what it is
    // executing; with the terminal raw, Ctrl+C instead reaches the input
    // reader as a byte and takes the same exit path.
    ctrlc::set_handler(|| term::exit_on_interrupt()).into_diagnostic()?;
    term::enable_raw_mode();
    let mut machine = RunState::new(memory);
    let result = machine.run();
    term::disable_raw_mode();

    if let Err(report) = result {
        eprintln!("{:>12} execution aborted", "Fatal".red().bold());
        eprintln!("{:?}", report);
        // Same exit status as an aborted process
        std::process::exit(134);
    }
    Ok(())
}
