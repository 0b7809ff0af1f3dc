//! CLI front end: the only layer that knows about `argv`, the filesystem,
//! and process exit codes. The merging core in `midimerge` never sees a
//! path or a logger; it only sees `ByteSource`/`ByteSink`.

use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use midimerge::{ByteSink, FileByteSink, FileByteSource, Input, StreamId, MAX_STREAMS};

/// Merge several MIDI byte streams into one.
#[derive(Debug, Parser)]
#[command(name = "midimerge", version, about)]
struct Cli {
    /// One or more input streams followed by a single output stream, e.g.
    /// `midimerge in1.mid in2.mid out.mid`.
    #[arg(required = true, num_args = 2..)]
    paths: Vec<PathBuf>,

    /// Print info-level progress for every stream, not just warnings/errors.
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    // Best-effort: a logger failing to initialize (e.g. because one was
    // already installed by an embedding process) should not stop merging.
    let _ = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );
}

fn open_inputs(paths: &[PathBuf]) -> Result<Vec<Input>> {
    paths
        .iter()
        .enumerate()
        .map(|(id, path)| {
            let file = File::open(path)
                .with_context(|| format!("cannot open input {}", path.display()))?;
            Ok(Input {
                stream: StreamId {
                    id,
                    name: path.display().to_string(),
                },
                source: Box::new(FileByteSource::new(file)),
            })
        })
        .collect()
}

fn open_output(path: &PathBuf) -> Result<Box<dyn ByteSink + Send>> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .with_context(|| format!("cannot open output {}", path.display()))?;
    Ok(Box::new(FileByteSink::new(file)))
}

fn run(cli: Cli) -> Result<()> {
    let (input_paths, output_path) = cli
        .paths
        .split_at(cli.paths.len() - 1);
    let output_path = &output_path[0];

    if input_paths.is_empty() {
        bail!("at least one input stream is required");
    }
    if input_paths.len() > MAX_STREAMS {
        bail!(
            "{} input streams requested, maximum is {MAX_STREAMS}",
            input_paths.len()
        );
    }

    let inputs = open_inputs(input_paths)?;
    let sink = open_output(output_path)?;

    midimerge::supervisor::run(inputs, sink).map_err(|e| anyhow::anyhow!("{e}"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            eprintln!("midimerge: {err:#}");
            ExitCode::FAILURE
        }
    }
}
