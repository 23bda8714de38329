//! Replayable corpus sources
//!
//! The pipeline reads its corpus twice: once to build the vocabulary and once
//! to count pairs. A corpus is therefore anything that can hand out a fresh
//! sentence iterator per pass, not a one-shot stream. File-backed sources
//! reopen the file; the in-memory source replays a buffered copy.
//!
//! Every source yields [`Sentence`]s: a token sequence plus the multiplicity
//! its format assigns it (always 1 for plain text, `match_count` for tabular
//! ngram rows).

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use nom::bytes::complete::{is_not, take_till};
use nom::character::complete::{char, u64 as row_count};
use nom::combinator::all_consuming;
use nom::sequence::tuple;
use nom::IResult;

use crate::errors::{Error, Result};

/// One sentence worth of tokens, with its source-assigned multiplicity
#[derive(Debug, Clone, PartialEq)]
pub struct Sentence {
    pub repeat: u64,
    pub tokens: Vec<String>,
}

impl Sentence {
    pub fn once(tokens: Vec<String>) -> Sentence {
        Sentence { repeat: 1, tokens }
    }
}

/// A boxed sentence iterator for one pass
pub type SentenceIter<'a> = Box<dyn Iterator<Item = Result<Sentence>> + 'a>;

/// A corpus that can be scanned front to back as often as needed
pub trait Corpus {
    /// Start a fresh pass over the whole corpus
    fn pass(&self) -> Result<SentenceIter>;
}

/// Plain text corpus: one sentence per line, whitespace-delimited tokens
pub struct TextCorpus {
    path: PathBuf,
}

impl TextCorpus {
    pub fn new<P: AsRef<Path>>(path: P) -> TextCorpus {
        TextCorpus { path: path.as_ref().to_path_buf() }
    }
}

impl Corpus for TextCorpus {
    fn pass(&self) -> Result<SentenceIter> {
        let reader = BufReader::new(File::open(&self.path)?);
        Ok(Box::new(reader.lines().map(|line| -> Result<Sentence> {
            let line = line?;
            Ok(Sentence::once(
                line.split_whitespace().map(str::to_owned).collect(),
            ))
        })))
    }
}

/// Tabular ngram corpus: `text<TAB>year<TAB>match_count<TAB>volume_count`
///
/// The text field is lowercased and split on single spaces; the sentence is
/// counted `match_count` times. A row that does not have exactly four fields
/// or a non-numeric match count aborts the pass.
pub struct NgramCorpus {
    path: PathBuf,
}

impl NgramCorpus {
    pub fn new<P: AsRef<Path>>(path: P) -> NgramCorpus {
        NgramCorpus { path: path.as_ref().to_path_buf() }
    }
}

impl Corpus for NgramCorpus {
    fn pass(&self) -> Result<SentenceIter> {
        let reader = BufReader::new(File::open(&self.path)?);
        Ok(Box::new(reader.lines().enumerate().map(
            |(lineno, line)| -> Result<Sentence> {
                let line = line?;
                parse_ngram_row(&line).ok_or_else(|| {
                    Error::MalformedRecord(format!(
                        "ngram row {} is not text/year/match_count/volume_count: {:?}",
                        lineno + 1,
                        line
                    ))
                })
            },
        )))
    }
}

/// Grammar for one ngram row; the year and volume fields are carried by the
/// format but unused here
fn ngram_row(input: &str) -> IResult<&str, (&str, &str, u64, &str)> {
    let (rest, (text, _, _year, _, count, _, volume)) = tuple((
        is_not("\t"),
        char('\t'),
        is_not("\t"),
        char('\t'),
        row_count,
        char('\t'),
        take_till(|c| c == '\t'),
    ))(input)?;
    Ok((rest, (text, _year, count, volume)))
}

fn parse_ngram_row(line: &str) -> Option<Sentence> {
    let (_, (text, _year, count, _volume)) = all_consuming(ngram_row)(line).ok()?;
    let tokens = text
        .to_lowercase()
        .split(' ')
        .map(str::to_owned)
        .collect();
    Some(Sentence { repeat: count, tokens })
}

/// Fully buffered corpus, for tests and for corpora that fit in memory
///
/// Trades the second file scan for memory, with identical output.
pub struct MemoryCorpus {
    sentences: Vec<Sentence>,
}

impl MemoryCorpus {
    pub fn new(sentences: Vec<Sentence>) -> MemoryCorpus {
        MemoryCorpus { sentences }
    }

    /// Buffer plain-text lines, splitting on whitespace like [`TextCorpus`]
    pub fn from_lines<I, S>(lines: I) -> MemoryCorpus
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        MemoryCorpus {
            sentences: lines
                .into_iter()
                .map(|line| {
                    Sentence::once(
                        line.as_ref()
                            .split_whitespace()
                            .map(str::to_owned)
                            .collect(),
                    )
                })
                .collect(),
        }
    }
}

impl Corpus for MemoryCorpus {
    fn pass(&self) -> Result<SentenceIter> {
        Ok(Box::new(self.sentences.iter().cloned().map(Ok)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_corpus_replays_identically() {
        let corpus = MemoryCorpus::from_lines(["a b  a c", "", "d"]);
        let first: Vec<Sentence> = corpus.pass().unwrap().map(|s| s.unwrap()).collect();
        let second: Vec<Sentence> = corpus.pass().unwrap().map(|s| s.unwrap()).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        assert_eq!(first[0].tokens, vec!["a", "b", "a", "c"]);
        assert_eq!(first[1].tokens, Vec::<String>::new());
        assert_eq!(first[0].repeat, 1);
    }

    #[test]
    fn ngram_row_parses_and_lowercases() {
        let sentence = parse_ngram_row("The Quick fox\t1987\t41\t12").unwrap();
        assert_eq!(sentence.repeat, 41);
        assert_eq!(sentence.tokens, vec!["the", "quick", "fox"]);
    }

    #[test]
    fn ngram_row_keeps_empty_tokens_from_double_spaces() {
        // split on single spaces, as the format is written
        let sentence = parse_ngram_row("a  b\t2000\t1\t1").unwrap();
        assert_eq!(sentence.tokens, vec!["a", "", "b"]);
    }

    #[test]
    fn ngram_row_rejects_bad_shapes() {
        assert!(parse_ngram_row("only text\t1987\t41").is_none());
        assert!(parse_ngram_row("text\t1987\tnot_a_number\t12").is_none());
        assert!(parse_ngram_row("text\t1987\t41\t12\textra").is_none());
        assert!(parse_ngram_row("").is_none());
    }
}
