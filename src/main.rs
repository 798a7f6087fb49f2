//! sto: check, reformat and convert Stockholm alignments.

use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use log::{LevelFilter, info, warn};

use stockholm_msa::alphabet::{Alphabet, AlphabetKind};
use stockholm_msa::config::Config;
use stockholm_msa::stockholm::{self, Reader};

/// Block-validating Stockholm alignment reader.
#[derive(Parser, Debug)]
#[command(name = "sto")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Read settings from this file instead of sto.toml.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Validate residues against an alphabet (rna, dna, amino).
    #[arg(long, global = true)]
    alphabet: Option<AlphabetKind>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse every record and print a one-line summary of each.
    Check {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
    /// Re-write every record in canonical Stockholm layout.
    Reformat {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Write each alignment as one block.
        #[arg(long)]
        pfam: bool,

        /// Columns per block.
        #[arg(short, long, value_name = "N")]
        width: Option<usize>,

        /// Output file (default: stdout).
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,
    },
    /// Print every record as JSON.
    Json {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match Config::load_from_path(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => Config::load().0,
    };

    init_logging(args.verbose, config.log_level.as_deref());

    match run(args, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8, config_level: Option<&str>) {
    let mut level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let mut bad_level = None;
    if let Some(name) = config_level {
        match LevelFilter::from_str(name) {
            Ok(l) => level = l,
            Err(_) => bad_level = Some(name.to_string()),
        }
    }
    env_logger::Builder::new().filter_level(level).init();
    if let Some(name) = bad_level {
        warn!("ignoring unknown log_level {name:?} in config");
    }
}

fn open(path: &Path, alphabet: Option<AlphabetKind>) -> Result<Reader<Box<dyn BufRead>>, Box<dyn Error>> {
    let reader: Reader<Box<dyn BufRead>> = Reader::open(path)?;
    Ok(match alphabet {
        Some(kind) => reader.with_alphabet(Alphabet::new(kind)),
        None => reader,
    })
}

fn run(args: Args, config: Config) -> Result<(), Box<dyn Error>> {
    let alphabet = args.alphabet.or(config.alphabet);

    match args.command {
        Command::Check { files } => {
            let mut stdout = io::stdout().lock();
            for path in &files {
                info!("checking {}", path.display());
                let mut nrecords = 0;
                for record in open(path, alphabet)? {
                    let msa = record.map_err(|e| format!("{}: {e}", path.display()))?;
                    let kind = msa.alphabet.unwrap_or_else(|| AlphabetKind::guess(&msa));
                    writeln!(
                        stdout,
                        "{}\t{}\t{}\t{}",
                        msa.name.as_deref().unwrap_or("-"),
                        msa.num_sequences(),
                        msa.width(),
                        kind
                    )?;
                    nrecords += 1;
                }
                info!("{}: {nrecords} records ok", path.display());
            }
        }
        Command::Reformat {
            file,
            pfam,
            width,
            output,
        } => {
            let block_width = if pfam {
                None
            } else {
                width.or(config.write_width())
            };
            let mut out: Box<dyn Write> = match &output {
                Some(path) => Box::new(BufWriter::new(File::create(path)?)),
                None => Box::new(BufWriter::new(io::stdout().lock())),
            };
            for record in open(&file, alphabet)? {
                let msa = record.map_err(|e| format!("{}: {e}", file.display()))?;
                stockholm::write(&msa, &mut out, block_width)?;
            }
            out.flush()?;
        }
        Command::Json { file } => {
            let records = open(&file, alphabet)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| format!("{}: {e}", file.display()))?;
            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &records)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}
