//! Vocabulary construction
//!
//! The vocabulary is built in one streaming pass and is immutable afterwards:
//! a token either survived the count threshold or it is gone for good. The
//! corpus size reported to the subsamplers is the sum over *retained* tokens,
//! matching the counting stages downstream.
//!
//! This module also derives the word-side and context-side vocabularies from
//! a finished counts file (summed pair weights per side), which is what the
//! matrix assembly stage later loads.

use std::cmp::Ordering;
use std::io::BufRead;

use crate::corpus::Corpus;
use crate::errors::Result;
use crate::farm::{new_farm, FarmMap};
use crate::formats;

const PROGRESS_EVERY: u64 = 250_000;

/// Token occurrence counts with the threshold already applied
pub struct Vocabulary {
    counts: FarmMap<String, u64>,
    total: u64,
}

impl Vocabulary {
    /// Count every token in the corpus, then keep those with
    /// `count >= threshold`
    ///
    /// An empty corpus yields an empty vocabulary, which downstream stages
    /// treat as "match nothing" rather than an error.
    pub fn build<C: Corpus>(corpus: &C, threshold: u64) -> Result<Vocabulary> {
        info!("Creating vocabulary");
        let mut counts: FarmMap<String, u64> = new_farm();
        let mut sentences = 0u64;
        for sentence in corpus.pass()? {
            let sentence = sentence?;
            for token in &sentence.tokens {
                match counts.get_mut(token) {
                    Some(count) => *count += sentence.repeat,
                    None => {
                        counts.insert(token.clone(), sentence.repeat);
                    }
                }
            }
            sentences += 1;
            if sentences % PROGRESS_EVERY == 0 {
                info!("Counted tokens in {} sentences so far", sentences);
            }
        }
        let before = counts.len();
        counts.retain(|_, count| *count >= threshold);
        let total = counts.values().sum();
        info!(
            "Vocabulary keeps {} of {} distinct tokens at threshold {}",
            counts.len(),
            before,
            threshold
        );
        Ok(Vocabulary { counts, total })
    }

    pub fn contains(&self, token: &str) -> bool {
        self.counts.contains_key(token)
    }

    pub fn count(&self, token: &str) -> Option<u64> {
        self.counts.get(token).copied()
    }

    /// Total occurrences across retained tokens
    pub fn corpus_size(&self) -> u64 {
        self.total
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(token, count)| (token.as_str(), *count))
    }
}

/// Sum the pair weights of a counts stream per side
///
/// Returns the word-side and context-side vocabularies ordered by descending
/// aggregate weight (ties by token), ready to be written next to the counts
/// file.
pub fn aggregate_counts<R: BufRead>(
    reader: R,
) -> Result<(Vec<(String, f64)>, Vec<(String, f64)>)> {
    let mut words: FarmMap<String, f64> = new_farm();
    let mut contexts: FarmMap<String, f64> = new_farm();
    for line in reader.lines() {
        let line = line?;
        let (weight, word, context) = formats::parse_counts_line(&line)?;
        *words.entry(word.to_owned()).or_insert(0.0) += weight;
        *contexts.entry(context.to_owned()).or_insert(0.0) += weight;
    }
    Ok((by_descending_weight(words), by_descending_weight(contexts)))
}

fn by_descending_weight(map: FarmMap<String, f64>) -> Vec<(String, f64)> {
    let mut entries: Vec<(String, f64)> = map.into_iter().collect();
    entries.sort_by(|a, b| match b.1.total_cmp(&a.1) {
        Ordering::Equal => a.0.cmp(&b.0),
        unequal => unequal,
    });
    entries
}

/// Load a `<token> <count>` vocabulary file
pub fn load_count_vocab<R: BufRead>(reader: R) -> Result<FarmMap<String, f64>> {
    let mut vocab: FarmMap<String, f64> = new_farm();
    for line in reader.lines() {
        let line = line?;
        let (token, count) = formats::parse_vocab_line(&line)?;
        vocab.insert(token.to_owned(), count);
    }
    Ok(vocab)
}

pub fn write_count_vocab<W: std::io::Write>(
    out: &mut W,
    entries: &[(String, f64)],
) -> std::io::Result<()> {
    for (token, count) in entries {
        formats::write_vocab_line(out, token, *count)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{MemoryCorpus, Sentence};

    #[test]
    fn thresholding_keeps_exactly_the_frequent_tokens() {
        let corpus = MemoryCorpus::from_lines(["a b a c", "a"]);
        let vocab = Vocabulary::build(&corpus, 2).unwrap();
        assert_eq!(vocab.len(), 1);
        assert_eq!(vocab.count("a"), Some(3));
        assert!(!vocab.contains("b"));
        assert_eq!(vocab.corpus_size(), 3);

        let vocab = Vocabulary::build(&corpus, 1).unwrap();
        assert_eq!(vocab.count("a"), Some(3));
        assert_eq!(vocab.count("b"), Some(1));
        assert_eq!(vocab.count("c"), Some(1));
        assert_eq!(vocab.corpus_size(), 5);
    }

    #[test]
    fn empty_corpus_builds_an_empty_vocabulary() {
        let corpus = MemoryCorpus::from_lines(Vec::<&str>::new());
        let vocab = Vocabulary::build(&corpus, 100).unwrap();
        assert!(vocab.is_empty());
        assert_eq!(vocab.corpus_size(), 0);
    }

    #[test]
    fn sentence_multiplicity_scales_the_counts() {
        let corpus = MemoryCorpus::new(vec![
            Sentence { repeat: 41, tokens: vec!["the".into(), "fox".into()] },
            Sentence::once(vec!["the".into()]),
        ]);
        let vocab = Vocabulary::build(&corpus, 1).unwrap();
        assert_eq!(vocab.count("the"), Some(42));
        assert_eq!(vocab.count("fox"), Some(41));
    }

    #[test]
    fn aggregate_counts_sums_each_side() {
        let counts = "2 a b\n1 b a\n0.5 a c\n";
        let (words, contexts) = aggregate_counts(counts.as_bytes()).unwrap();
        assert_eq!(
            words,
            vec![("a".to_string(), 2.5), ("b".to_string(), 1.0)]
        );
        assert_eq!(
            contexts,
            vec![
                ("b".to_string(), 2.0),
                ("a".to_string(), 1.0),
                ("c".to_string(), 0.5),
            ]
        );
    }

    #[test]
    fn count_vocab_round_trips() {
        let entries = vec![("b".to_string(), 2.0), ("a".to_string(), 0.5)];
        let mut buf = Vec::new();
        write_count_vocab(&mut buf, &entries).unwrap();
        let vocab = load_count_vocab(&buf[..]).unwrap();
        assert_eq!(vocab.get("b"), Some(&2.0));
        assert_eq!(vocab.get("a"), Some(&0.5));
    }
}
