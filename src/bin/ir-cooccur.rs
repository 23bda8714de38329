//! Count windowed word-context pairs in a plain text corpus
//!
//! The corpus is read twice: once to build the thresholded vocabulary and
//! once to count pairs. Deduplicated `<weight> <word> <context>` lines go
//! to stdout; `--pairs` additionally captures the raw pair stream before
//! deduplication, which is handy for diffing counting configurations.

// argument parsing
#[macro_use] extern crate clap;
// logging
extern crate env_logger;
#[macro_use] extern crate log;
// lastly, this library
extern crate iredell;

use std::fs::File;
use std::io::{self, BufWriter, Write};

use clap::Arg;

use iredell::cooccur::{count_pairs, CooccurConfig, PairCounts, Subsampling, WindowMode};
use iredell::corpus::TextCorpus;
use iredell::errors::*;
use iredell::vocab::Vocabulary;

pub fn main() {
    // Main can't return a Result, and the ? operator needs the enclosing function to return Result
    inner_main().expect("Could not recover. Exiting.");
}
pub fn inner_main() -> Result<()> {
    env_logger::init();
    let args = app_from_crate!()
        .arg_from_usage("<corpus> 'plain text corpus, one sentence per line'")
        .arg(Arg::from_usage("--thr [NUM] 'keep tokens occurring at least this often'")
            .default_value("100"))
        .arg(Arg::from_usage("--win [NUM] 'neighbors to pair on each side of a word'")
            .default_value("2"))
        .arg_from_usage("--dw 'draw each window size from 1..=win instead of using win'")
        .arg(Arg::from_usage("--ww 'weigh pairs down with distance'")
            .conflicts_with("dw"))
        .arg(Arg::from_usage("--psub [NUM] 'randomly subsample words more frequent than this fraction of the corpus'")
            .default_value("0"))
        .arg(Arg::from_usage("--dsub [NUM] 'like --psub, but scale pair weights down instead of drawing'")
            .default_value("0"))
        .arg_from_usage("--seed [NUM] 'seed for the window and subsample draws'")
        .arg_from_usage("--pairs [FILE] 'also write every raw pair here, before deduplication'")
        .get_matches();

    let threshold = value_t!(args, "thr", u64).unwrap_or_else(|e| e.exit());
    let window = value_t!(args, "win", usize).unwrap_or_else(|e| e.exit());
    let psub = value_t!(args, "psub", f64).unwrap_or_else(|e| e.exit());
    let dsub = value_t!(args, "dsub", f64).unwrap_or_else(|e| e.exit());
    for (name, fraction) in [("--psub", psub), ("--dsub", dsub)] {
        if !fraction.is_finite() || fraction < 0.0 {
            return Err(Error::Config(format!(
                "{} expects a nonnegative finite fraction, not {}",
                name, fraction
            )));
        }
    }
    let subsampling = match (psub > 0.0, dsub > 0.0) {
        (true, true) => {
            return Err(Error::Config(
                "choose one of --psub and --dsub, not both".to_string(),
            ))
        }
        (true, false) => Subsampling::Probabilistic(psub),
        (false, true) => Subsampling::Deterministic(dsub),
        (false, false) => Subsampling::None,
    };
    let seed = if args.is_present("seed") {
        Some(value_t!(args, "seed", u64).unwrap_or_else(|e| e.exit()))
    } else {
        None
    };
    let mode = if args.is_present("dw") {
        WindowMode::Dynamic
    } else if args.is_present("ww") {
        WindowMode::Weighted
    } else {
        WindowMode::Fixed
    };
    let config = CooccurConfig {
        window,
        mode,
        subsampling,
        seed,
        compact_placeholders: false,
    };
    config.validate()?;

    let corpus_path = args.value_of("corpus").unwrap();
    info!(
        "Counting pairs in {} with threshold {} and window {}",
        corpus_path, threshold, window
    );
    let corpus = TextCorpus::new(corpus_path);
    let vocab = Vocabulary::build(&corpus, threshold)?;
    let counts = match args.value_of("pairs") {
        Some(path) => {
            let mut raw = BufWriter::new(File::create(path)?);
            let counts = count_pairs(&corpus, &vocab, &config, Some(&mut raw))?;
            raw.flush()?;
            counts
        }
        None => count_pairs(&corpus, &vocab, &config, None)?,
    };

    print_counts(&counts)?;
    Ok(())
}

fn print_counts(counts: &PairCounts) -> Result<()> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    counts.write(&mut out)?;
    out.flush()?;
    Ok(())
}
