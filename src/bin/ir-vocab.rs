//! Derive the word and context vocabularies from a counts file
//!
//! Sums the pair weights per side and writes `<counts>.words.vocab` and
//! `<counts>.contexts.vocab`, ordered by descending weight. The scoring
//! stage expects both files next to the counts.

// argument parsing
#[macro_use] extern crate clap;
// logging
extern crate env_logger;
#[macro_use] extern crate log;
// lastly, this library
extern crate iredell;

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};

use iredell::errors::*;
use iredell::vocab::{aggregate_counts, write_count_vocab};

pub fn main() {
    // Main can't return a Result, and the ? operator needs the enclosing function to return Result
    inner_main().expect("Could not recover. Exiting.");
}
pub fn inner_main() -> Result<()> {
    env_logger::init();
    let args = app_from_crate!()
        .arg_from_usage("<counts> 'pair counts file, `<weight> <word> <context>` per line'")
        .get_matches();

    let counts_path = args.value_of("counts").unwrap();
    let reader = BufReader::new(File::open(counts_path)?);
    let (words, contexts) = aggregate_counts(reader)?;

    let words_path = format!("{}.words.vocab", counts_path);
    let mut out = BufWriter::new(File::create(&words_path)?);
    write_count_vocab(&mut out, &words)?;
    out.flush()?;
    info!("Wrote {} word types to {}", words.len(), words_path);

    let contexts_path = format!("{}.contexts.vocab", counts_path);
    let mut out = BufWriter::new(File::create(&contexts_path)?);
    write_count_vocab(&mut out, &contexts)?;
    out.flush()?;
    info!("Wrote {} context types to {}", contexts.len(), contexts_path);
    Ok(())
}
