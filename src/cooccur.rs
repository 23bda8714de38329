//! Windowed word-context pair counting
//!
//! Every sentence is scanned once per repetition: out-of-vocabulary tokens
//! are masked but keep their position (unless compaction is requested), the
//! probabilistic subsampler may mask more, and each surviving focus word
//! then pairs up with the surviving tokens inside its window.
//!
//! Draw order is fixed so seeded runs are reproducible: for every sentence
//! the subsampler draws one value per eligible token in reading order, then
//! the dynamic window draws one extent per surviving focus word. Two runs
//! over the same corpus with the same seed produce identical counts.

use std::io::{self, Write};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::corpus::Corpus;
use crate::errors::{Error, Result};
use crate::farm::{new_farm, FarmMap};
use crate::formats;
use crate::vocab::Vocabulary;

const PROGRESS_EVERY: u64 = 250_000;

/// How far pairs reach, as one variant per mutually exclusive mode
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowMode {
    /// Every neighbor within the half-width counts with weight 1
    Fixed,
    /// Sample the extent uniformly from `1..=window` for every focus word
    Dynamic,
    /// Scale each pair by `(window + 1 - distance) / window`
    Weighted,
}

/// How occurrence counts are thinned before pairing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Subsampling {
    /// Keep every token
    None,
    /// Drop eligible tokens at random, keeping each with probability
    /// `sqrt(t / count)` where `t` is this fraction of the corpus size
    Probabilistic(f64),
    /// Keep every token but scale each pair by both endpoint factors
    Deterministic(f64),
}

#[derive(Debug, Clone)]
pub struct CooccurConfig {
    /// Neighbors considered on each side of the focus word
    pub window: usize,
    pub mode: WindowMode,
    pub subsampling: Subsampling,
    /// Seed for the window and subsampling draws; fresh entropy when unset
    pub seed: Option<u64>,
    /// Remove masked tokens instead of leaving gaps, so the window reaches
    /// across them
    pub compact_placeholders: bool,
}

impl Default for CooccurConfig {
    fn default() -> CooccurConfig {
        CooccurConfig {
            window: 2,
            mode: WindowMode::Fixed,
            subsampling: Subsampling::None,
            seed: None,
            compact_placeholders: false,
        }
    }
}

impl CooccurConfig {
    /// Reject configurations that could only fail mid-run
    pub fn validate(&self) -> Result<()> {
        if self.window == 0 {
            return Err(Error::Config(
                "the window must cover at least one neighbor on each side".to_string(),
            ));
        }
        match self.subsampling {
            Subsampling::Probabilistic(fraction) | Subsampling::Deterministic(fraction) => {
                if !fraction.is_finite() || fraction <= 0.0 {
                    return Err(Error::Config(format!(
                        "subsampling expects a positive fraction of the corpus, not {}",
                        fraction
                    )));
                }
            }
            Subsampling::None => {}
        }
        Ok(())
    }

    fn stochastic(&self) -> bool {
        self.mode == WindowMode::Dynamic
            || matches!(self.subsampling, Subsampling::Probabilistic(_))
    }
}

/// Per-token subsampling factors, `sqrt(t / count)` for counts above the
/// threshold `t`
pub struct Subsampler {
    factors: FarmMap<String, f64>,
}

impl Subsampler {
    pub fn new(vocab: &Vocabulary, fraction: f64) -> Subsampler {
        let threshold = fraction * vocab.corpus_size() as f64;
        let mut factors: FarmMap<String, f64> = new_farm();
        for (token, count) in vocab.iter() {
            if count as f64 > threshold {
                factors.insert(token.to_owned(), (threshold / count as f64).sqrt());
            }
        }
        Subsampler { factors }
    }

    /// Whether this token is frequent enough to be thinned at all
    pub fn applies(&self, token: &str) -> bool {
        self.factors.contains_key(token)
    }

    pub fn factor(&self, token: &str) -> f64 {
        self.factors.get(token).copied().unwrap_or(1.0)
    }
}

/// Aggregated pair weights
pub struct PairCounts {
    counts: FarmMap<(String, String), f64>,
}

impl PairCounts {
    pub fn new() -> PairCounts {
        PairCounts { counts: new_farm() }
    }

    pub fn add(&mut self, word: &str, context: &str, weight: f64) {
        *self
            .counts
            .entry((word.to_owned(), context.to_owned()))
            .or_insert(0.0) += weight;
    }

    pub fn get(&self, word: &str, context: &str) -> Option<f64> {
        self.counts
            .get(&(word.to_owned(), context.to_owned()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.counts
            .iter()
            .map(|((word, context), weight)| (word.as_str(), context.as_str(), *weight))
    }

    /// Write one `<weight> <word> <context>` line per pair, in map order
    pub fn write<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for ((word, context), weight) in &self.counts {
            formats::write_counts_line(out, *weight, word, context)?;
        }
        Ok(())
    }
}

impl Default for PairCounts {
    fn default() -> PairCounts {
        PairCounts::new()
    }
}

/// Count word-context pairs over the whole corpus
///
/// Sentences repeat according to their multiplicity: stochastic
/// configurations rerun the draws for every repetition, deterministic ones
/// scan once and scale the weights instead. When `pairs_out` is given,
/// every pair is also written there as it is found, before aggregation.
pub fn count_pairs<C: Corpus>(
    corpus: &C,
    vocab: &Vocabulary,
    config: &CooccurConfig,
    mut pairs_out: Option<&mut dyn Write>,
) -> Result<PairCounts> {
    config.validate()?;
    info!("Creating pair counts");
    let mut harvest = Harvest::new(vocab, config);
    let mut sentences = 0u64;
    for sentence in corpus.pass()? {
        let sentence = sentence?;
        if config.stochastic() {
            for _ in 0..sentence.repeat {
                harvest.sentence(&sentence.tokens, 1.0, &mut pairs_out)?;
            }
        } else {
            harvest.sentence(&sentence.tokens, sentence.repeat as f64, &mut pairs_out)?;
        }
        sentences += 1;
        if sentences % PROGRESS_EVERY == 0 {
            info!("Counted pairs in {} sentences so far", sentences);
        }
    }
    info!(
        "Counted {} distinct pairs with total weight {}",
        harvest.counts.len(),
        harvest.counts.total_weight()
    );
    Ok(harvest.counts)
}

/// One counting run: the subsampler, the random stream, and the counts
/// gathered so far
struct Harvest<'a> {
    vocab: &'a Vocabulary,
    config: &'a CooccurConfig,
    subsampler: Option<Subsampler>,
    rng: StdRng,
    counts: PairCounts,
}

impl<'a> Harvest<'a> {
    fn new(vocab: &'a Vocabulary, config: &'a CooccurConfig) -> Harvest<'a> {
        let subsampler = match config.subsampling {
            Subsampling::None => None,
            Subsampling::Probabilistic(fraction) | Subsampling::Deterministic(fraction) => {
                Some(Subsampler::new(vocab, fraction))
            }
        };
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Harvest {
            vocab,
            config,
            subsampler,
            rng,
            counts: PairCounts::new(),
        }
    }

    fn sentence(
        &mut self,
        tokens: &[String],
        scale: f64,
        pairs_out: &mut Option<&mut dyn Write>,
    ) -> Result<()> {
        let mut slots: Vec<Option<&str>> = tokens
            .iter()
            .map(|token| {
                if self.vocab.contains(token) {
                    Some(token.as_str())
                } else {
                    None
                }
            })
            .collect();

        if let (Subsampling::Probabilistic(_), Some(sub)) =
            (&self.config.subsampling, &self.subsampler)
        {
            for slot in slots.iter_mut() {
                if let Some(token) = *slot {
                    if sub.applies(token) && self.rng.gen::<f64>() > sub.factor(token) {
                        *slot = None;
                    }
                }
            }
        }

        if self.config.compact_placeholders {
            slots.retain(|slot| slot.is_some());
        }

        let dampen = match (&self.config.subsampling, &self.subsampler) {
            (Subsampling::Deterministic(_), Some(sub)) => Some(sub),
            _ => None,
        };

        for position in 0..slots.len() {
            let word = match slots[position] {
                Some(word) => word,
                None => continue,
            };
            let word_damp = dampen.map_or(1.0, |sub| sub.factor(word));
            let extent = if self.config.mode == WindowMode::Dynamic {
                self.rng.gen_range(1..=self.config.window)
            } else {
                self.config.window
            };
            let lo = position.saturating_sub(extent);
            let hi = position.saturating_add(extent).min(slots.len() - 1);
            for neighbor in lo..=hi {
                if neighbor == position {
                    continue;
                }
                let context = match slots[neighbor] {
                    Some(context) => context,
                    None => continue,
                };
                let distance = if neighbor > position {
                    neighbor - position
                } else {
                    position - neighbor
                };
                let mut weight = scale;
                if self.config.mode == WindowMode::Weighted {
                    // distance is at least 1 and at most window, so this
                    // stays in range however wide the window is
                    weight *=
                        (self.config.window - (distance - 1)) as f64 / self.config.window as f64;
                }
                if let Some(sub) = dampen {
                    weight *= word_damp * sub.factor(context);
                }
                self.counts.add(word, context, weight);
                debug!("Pairing {} with {} at weight {}", word, context, weight);
                if let Some(out) = pairs_out.as_mut() {
                    formats::write_counts_line(out, weight, word, context)?;
                }
            }
        }
        Ok(())
    }
}
