//! REBIN: re-grid scored genomic tracks onto a uniform bin lattice.
//!
//! Usage: rebin -g genome.txt [-w 500] TRACKS...

use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use rebin_genomics::bed::{read_dataset, BedError};
use rebin_genomics::genome::Genome;
use rebin_genomics::lattice::{BinLattice, EngineError};
use rebin_genomics::table::BinnedTable;

#[derive(Parser)]
#[command(name = "rebin")]
#[command(version)]
#[command(
    about = "REBIN: re-grid scored genomic tracks onto uniform bins and aggregate per-bin means",
    long_about = None
)]
struct Cli {
    /// Genome file with sequence lengths (tab-delimited: name<TAB>length)
    #[arg(short = 'g', long)]
    genome: PathBuf,

    /// Bin width in bases
    #[arg(short = 'w', long, default_value = "500")]
    bin_width: u64,

    /// Restrict and order the lattice to these sequences
    /// (default: every sequence, in genome file order)
    #[arg(short = 'c', long = "chrom")]
    chroms: Vec<String>,

    /// Output TSV file (default: stdout)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Number of threads to use (default: number of CPUs)
    #[arg(long, short = 't')]
    threads: Option<usize>,

    /// Print timing statistics to stderr
    #[arg(long)]
    stats: bool,

    /// Scored track files (bedGraph: chrom<TAB>start<TAB>end<TAB>value).
    /// Dataset name defaults to the file stem; override with NAME=PATH
    #[arg(required = true)]
    tracks: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    // Configure thread pool if --threads specified
    if let Some(n) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .expect("Failed to initialize thread pool");
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), EngineError> {
    let started = Instant::now();

    let genome = Genome::from_file(&cli.genome)?;
    let lattice = if cli.chroms.is_empty() {
        BinLattice::generate(&genome, cli.bin_width)?
    } else {
        BinLattice::generate_for(&genome, &cli.chroms, cli.bin_width)?
    };

    let mut datasets = Vec::with_capacity(cli.tracks.len());
    for arg in &cli.tracks {
        let (name, path) = parse_track_arg(arg)?;
        datasets.push(read_dataset(path, name)?);
    }

    let table = BinnedTable::assemble(&lattice, &datasets)?;

    match &cli.output {
        Some(path) => {
            let file = File::create(path).map_err(BedError::Io)?;
            let mut writer = BufWriter::new(file);
            table.write_tsv(&lattice, &mut writer).map_err(BedError::Io)?;
            writer.flush().map_err(BedError::Io)?;
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            table.write_tsv(&lattice, &mut handle).map_err(BedError::Io)?;
        }
    }

    if cli.stats {
        eprintln!(
            "Binned {} datasets onto {} bins ({} bp) in {:.2?}",
            table.n_datasets(),
            lattice.len(),
            lattice.bin_width(),
            started.elapsed()
        );
    }

    Ok(())
}

/// Split a track argument into dataset name and file path.
/// `NAME=PATH` names the dataset explicitly; a bare path uses the file stem.
fn parse_track_arg(arg: &str) -> Result<(String, &Path), EngineError> {
    if let Some((name, path)) = arg.split_once('=') {
        if name.is_empty() {
            return Err(
                BedError::InvalidFormat(format!("Empty dataset name in '{}'", arg)).into(),
            );
        }
        return Ok((name.to_string(), Path::new(path)));
    }

    let path = Path::new(arg);
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| {
            BedError::InvalidFormat(format!("Cannot derive a dataset name from '{}'", arg))
        })?;
    Ok((name, path))
}
