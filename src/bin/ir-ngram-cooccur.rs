//! Count windowed word-context pairs in tabular ngram files
//!
//! Rows look like `text<TAB>year<TAB>match_count<TAB>volume_count`; each row
//! is counted `match_count` times. The ngrams are short, so the window stays
//! inside one row. Deduplicated counts go to stdout like `ir-cooccur`.

// argument parsing
#[macro_use] extern crate clap;
// logging
extern crate env_logger;
#[macro_use] extern crate log;
// lastly, this library
extern crate iredell;

use std::io::{self, BufWriter, Write};

use clap::Arg;

use iredell::cooccur::{count_pairs, CooccurConfig, Subsampling, WindowMode};
use iredell::corpus::NgramCorpus;
use iredell::errors::*;
use iredell::vocab::Vocabulary;

pub fn main() {
    // Main can't return a Result, and the ? operator needs the enclosing function to return Result
    inner_main().expect("Could not recover. Exiting.");
}
pub fn inner_main() -> Result<()> {
    env_logger::init();
    let args = app_from_crate!()
        .arg_from_usage("<corpus> 'tab-separated ngram file'")
        .arg(Arg::from_usage("--thr [NUM] 'keep tokens occurring at least this often'")
            .default_value("100"))
        .arg(Arg::from_usage("--win [NUM] 'neighbors to pair on each side of a word'")
            .default_value("4"))
        .arg_from_usage("--dyn 'draw each window size from 1..=win instead of using win'")
        .arg(Arg::from_usage("--sub [NUM] 'randomly subsample words more frequent than this fraction of the corpus'")
            .default_value("0"))
        .arg_from_usage("--del 'close the gaps left by unknown and subsampled words'")
        .arg(Arg::from_usage("--seed [NUM] 'seed for the window and subsample draws'")
            .default_value("17"))
        .get_matches();

    let threshold = value_t!(args, "thr", u64).unwrap_or_else(|e| e.exit());
    let window = value_t!(args, "win", usize).unwrap_or_else(|e| e.exit());
    let sub = value_t!(args, "sub", f64).unwrap_or_else(|e| e.exit());
    if !sub.is_finite() || sub < 0.0 {
        return Err(Error::Config(format!(
            "--sub expects a nonnegative finite fraction, not {}",
            sub
        )));
    }
    let subsampling = if sub > 0.0 {
        Subsampling::Probabilistic(sub)
    } else {
        Subsampling::None
    };
    let seed = value_t!(args, "seed", u64).unwrap_or_else(|e| e.exit());
    let mode = if args.is_present("dyn") {
        WindowMode::Dynamic
    } else {
        WindowMode::Fixed
    };
    let config = CooccurConfig {
        window,
        mode,
        subsampling,
        seed: Some(seed),
        compact_placeholders: args.is_present("del"),
    };
    config.validate()?;

    let corpus_path = args.value_of("corpus").unwrap();
    info!(
        "Counting ngram pairs in {} with threshold {}, window {}, seed {}",
        corpus_path, threshold, window, seed
    );
    let corpus = NgramCorpus::new(corpus_path);
    let vocab = Vocabulary::build(&corpus, threshold)?;
    let counts = count_pairs(&corpus, &vocab, &config, None)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    counts.write(&mut out)?;
    out.flush()?;
    Ok(())
}
