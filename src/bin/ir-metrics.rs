//! Grade a scored matrix against a word similarity testset
//!
//! Loads the `.npy` triplet table and label files written by `ir-chi`,
//! L2-normalizes the rows, scores every testset pair by cosine similarity
//! (0 when a word is unknown), and prints the Spearman rank correlation
//! against the gold scores.

// argument parsing
#[macro_use] extern crate clap;
// logging
extern crate env_logger;
#[macro_use] extern crate log;
// lastly, this library
extern crate iredell;

use std::fs::File;
use std::io::BufReader;

use iredell::errors::*;
use iredell::formats::read_labels;
use iredell::metrics::{evaluate, read_testset, WordVectors};
use iredell::numpy;

pub fn main() {
    // Main can't return a Result, and the ? operator needs the enclosing function to return Result
    inner_main().expect("Could not recover. Exiting.");
}
pub fn inner_main() -> Result<()> {
    env_logger::init();
    let args = app_from_crate!()
        .arg_from_usage("<vectors> 'basename of the scored matrix, as written by the scoring stage'")
        .arg_from_usage("<testset> 'lines of `<word> <word> <gold score>`'")
        .get_matches();

    let base = args.value_of("vectors").unwrap();
    let words_file = File::open(format!("{}.words.vocab", base))
        .map_err(|err| Error::MissingFile("matrix word labels", Some(err)))?;
    let labels = read_labels(BufReader::new(words_file))?;
    let contexts_file = File::open(format!("{}.contexts.vocab", base))
        .map_err(|err| Error::MissingFile("matrix context labels", Some(err)))?;
    let contexts = read_labels(BufReader::new(contexts_file))?;

    let matrix = numpy::load_sparse(format!("{}.npy", base), labels.len(), contexts.len())?;
    let vectors = WordVectors::new(matrix, labels)?;

    let testset_file = File::open(args.value_of("testset").unwrap())?;
    let testset = read_testset(BufReader::new(testset_file))?;
    info!("Grading {} testset pairs", testset.len());
    let missing = testset
        .iter()
        .filter(|(one, two, _)| !vectors.contains(one) || !vectors.contains(two))
        .count();
    if missing > 0 {
        warn!(
            "{} of {} testset pairs name words without vectors and grade as 0",
            missing,
            testset.len()
        );
    }
    let rho = evaluate(&vectors, &testset);
    println!("{}", rho);
    Ok(())
}
