//! vmsim - Virtual Memory Translation Simulator
//!
//! Drives a stream of virtual addresses through a TLB, a flat or two-level
//! page table, and a FIFO frame pool, reading page content from a
//! line-oriented backing store. Prints a diagnostic block per address and
//! writes aggregate counters to a report file at the end of the run.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use vmsim::constants::{ALLOWED_PAGE_SIZES, DEFAULT_PAGE_SIZE};
use vmsim::error::{Result, VmError};
use vmsim::io::{parse_address, write_report};
use vmsim::storage::FileStore;
use vmsim::translation::Translator;

/// Translate virtual addresses to physical locations through a simulated
/// TLB, page table and frame pool.
#[derive(Parser, Debug)]
#[command(name = "vmsim")]
#[command(version, about, long_about = None)]
struct Cli {
    /// A single virtual address (decimal or 0x-prefixed hex), or a path to
    /// a file with one address per line
    input: String,

    /// Page size in words
    #[arg(short, long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = parse_page_size)]
    page_size: usize,

    /// Seed for the dirty-bit randomness source; omit for a fresh seed
    #[arg(long)]
    seed: Option<u64>,

    /// Backing store file: page content source, write-back sink
    #[arg(long, default_value = "backing_store.txt")]
    backing_store: PathBuf,

    /// Data memory file: one word per line, line number = physical address
    #[arg(long, default_value = "data_memory.txt")]
    data_memory: PathBuf,

    /// Where to write the final counter report
    #[arg(long, default_value = "final_report.txt")]
    report: PathBuf,

    /// Suppress the per-address diagnostic output
    #[arg(short, long)]
    quiet: bool,
}

fn parse_page_size(text: &str) -> std::result::Result<usize, String> {
    let size: usize = text
        .parse()
        .map_err(|_| format!("invalid page size: {text}"))?;
    if ALLOWED_PAGE_SIZES.contains(&size) {
        Ok(size)
    } else {
        Err(format!(
            "invalid page size {size}: use 256, 1024, 2048 or 4096"
        ))
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        process::exit(e.exit_code());
    }
}

fn run(cli: &Cli) -> Result<()> {
    let rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut translator = Translator::new(cli.page_size, rng)?;
    let mut store = FileStore::new(&cli.backing_store, &cli.data_memory, cli.page_size);

    let path = Path::new(&cli.input);
    if path.is_file() {
        // File mode: bad lines are warned and skipped, the run continues
        let file = File::open(path)?;
        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            match parse_address(text) {
                Ok(address) => {
                    process_one(&mut translator, &mut store, address, cli.quiet)?;
                }
                Err(err) => {
                    eprintln!("line {}: {err}; skipped", line_no + 1);
                }
            }
        }
    } else {
        let address = parse_address(&cli.input)
            .map_err(|err| VmError::InvalidAddress(format!("{} ({err})", cli.input)))?;
        process_one(&mut translator, &mut store, address, cli.quiet)?;
    }

    write_report(&cli.report, &translator.stats())?;
    Ok(())
}

fn process_one(
    translator: &mut Translator<StdRng>,
    store: &mut FileStore,
    address: u32,
    quiet: bool,
) -> Result<()> {
    let record = translator.translate(address, store)?;
    if !quiet {
        println!("{record}");
    }
    Ok(())
}
