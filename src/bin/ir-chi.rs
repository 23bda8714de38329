//! Assemble a counts file into a sparse matrix and score association
//!
//! Needs the side vocabularies written by `ir-vocab` next to the counts
//! file. Produces `<output>.npy` with the chi-square scores as an
//! `(nnz, 3)` triplet table, plus `<output>.words.vocab` and
//! `<output>.contexts.vocab` naming the rows and columns in order.

// argument parsing
#[macro_use] extern crate clap;
// logging
extern crate env_logger;
#[macro_use] extern crate log;
// lastly, this library
extern crate iredell;

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};

use clap::Arg;

use iredell::chi::chi_square;
use iredell::errors::*;
use iredell::formats::write_labels;
use iredell::numpy;
use iredell::sparse::assemble;
use iredell::vocab::load_count_vocab;

pub fn main() {
    // Main can't return a Result, and the ? operator needs the enclosing function to return Result
    inner_main().expect("Could not recover. Exiting.");
}
pub fn inner_main() -> Result<()> {
    env_logger::init();
    let args = app_from_crate!()
        .arg_from_usage("<counts> 'pair counts file, with its .words.vocab and .contexts.vocab alongside'")
        .arg_from_usage("<output> 'basename for the scored matrix and its label files'")
        .arg(Arg::from_usage("--cds [NUM] 'context distribution smoothing exponent'")
            .default_value("1.0"))
        .get_matches();

    let cds = value_t!(args, "cds", f64).unwrap_or_else(|e| e.exit());
    if !cds.is_finite() {
        return Err(Error::Config(format!(
            "--cds expects a finite exponent, not {}",
            cds
        )));
    }
    let counts_path = args.value_of("counts").unwrap();
    let output = args.value_of("output").unwrap();

    let words_file = File::open(format!("{}.words.vocab", counts_path))
        .map_err(|err| Error::MissingFile("word vocabulary", Some(err)))?;
    let words = load_count_vocab(BufReader::new(words_file))?;
    let contexts_file = File::open(format!("{}.contexts.vocab", counts_path))
        .map_err(|err| Error::MissingFile("context vocabulary", Some(err)))?;
    let contexts = load_count_vocab(BufReader::new(contexts_file))?;

    let reader = BufReader::new(File::open(counts_path)?);
    let (matrix, iw, ic) = assemble(reader, &words, &contexts)?;
    info!("Scoring with cds = {}", cds);
    let scores = chi_square(matrix, cds);

    numpy::save_sparse(format!("{}.npy", output), &scores)?;
    let mut out = BufWriter::new(File::create(format!("{}.words.vocab", output))?);
    write_labels(&mut out, &iw)?;
    out.flush()?;
    let mut out = BufWriter::new(File::create(format!("{}.contexts.vocab", output))?);
    write_labels(&mut out, &ic)?;
    out.flush()?;
    info!(
        "Wrote {} scored cells over {} words and {} contexts to {}.npy",
        scores.nnz(),
        iw.len(),
        ic.len(),
        output
    );
    Ok(())
}
