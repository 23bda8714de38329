//! Windowed word-context cooccurrence counts and chi-square association
//! scores
//!
//! The pipeline runs as one small binary per stage: count pairs out of a
//! corpus (`ir-cooccur`, or `ir-ngram-cooccur` for tabular ngram files),
//! derive the per-side vocabularies from the counts (`ir-vocab`), assemble
//! the counts into a sparse matrix and score it (`ir-chi`), then grade the
//! scores against a word similarity testset (`ir-metrics`).
//!
//! Everything is single-threaded and streams what it can. The corpus is
//! read twice (vocabulary pass, counting pass); the one structure that
//! grows with the data is the pair accumulator, which holds every distinct
//! word-context pair in memory at once.
//!
//! One sparsity quirk is deliberate and worth knowing: a pair stored with
//! weight zero is a real cell and is scored against its expected weight
//! like any other, turning non-finite only when its row or column carries
//! no other weight. A pair never stored is never scored at all.

#[macro_use] extern crate log;

pub mod errors;
pub mod farm;
pub mod corpus;
pub mod formats;
pub mod vocab;
pub mod cooccur;
pub mod sparse;
pub mod chi;
pub mod numpy;
pub mod metrics;
