use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use chain2uvw::merger;
use chain2uvw::uvw::Uvw;

/// Fold the chains emitted by a chain learner into one minimized universal
/// co-Büchi word automaton and print it as graphviz.
#[derive(Parser)]
#[command(name = "chain2uvw", version)]
struct Args {
    /// Chain stream from the learner; stdin when omitted
    input: Option<PathBuf>,

    /// Write the graph here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let uvw: Uvw = match &args.input {
        Some(path) => merger::merge_chains(BufReader::new(File::open(path)?))?,
        None => merger::merge_chains(io::stdin().lock())?,
    };

    let rendered = uvw.dot();
    match &args.output {
        Some(path) => std::fs::write(path, rendered)?,
        None => print!("{rendered}"),
    }
    Ok(())
}
