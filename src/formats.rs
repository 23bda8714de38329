//! Line formats for the persisted text artifacts
//!
//! Three formats flow between the pipeline stages:
//!
//! * counts: `<weight> <word> <context>`, one line per distinct ordered pair
//! * count vocabularies: `<token> <count>`
//! * label lists: one token per line, in row/column index order
//!
//! Weights are written with `{}`, so integral weights render without a
//! decimal point and fractional weights keep full precision. A line that
//! does not match its format is a fatal error; the stages never skip past
//! garbage in their own artifacts.

use std::io;
use std::io::{BufRead, Write};

use crate::errors::{Error, Result};

/// Parse one `<weight> <word> <context>` line
pub fn parse_counts_line(line: &str) -> Result<(f64, &str, &str)> {
    let mut fields = line.split_whitespace();
    match (fields.next(), fields.next(), fields.next(), fields.next()) {
        (Some(weight), Some(word), Some(context), None) => {
            let weight = weight.parse::<f64>().map_err(|_| {
                Error::MalformedRecord(format!(
                    "counts line has a non-numeric weight: {:?}",
                    line
                ))
            })?;
            Ok((weight, word, context))
        }
        _ => Err(Error::MalformedRecord(format!(
            "counts line is not `<weight> <word> <context>`: {:?}",
            line
        ))),
    }
}

/// Parse one `<token> <count>` line
pub fn parse_vocab_line(line: &str) -> Result<(&str, f64)> {
    let mut fields = line.split_whitespace();
    match (fields.next(), fields.next(), fields.next()) {
        (Some(token), Some(count), None) => {
            let count = count.parse::<f64>().map_err(|_| {
                Error::MalformedRecord(format!(
                    "vocabulary line has a non-numeric count: {:?}",
                    line
                ))
            })?;
            Ok((token, count))
        }
        _ => Err(Error::MalformedRecord(format!(
            "vocabulary line is not `<token> <count>`: {:?}",
            line
        ))),
    }
}

pub fn write_counts_line<W: Write>(
    out: &mut W,
    weight: f64,
    word: &str,
    context: &str,
) -> io::Result<()> {
    writeln!(out, "{} {} {}", weight, word, context)
}

pub fn write_vocab_line<W: Write>(out: &mut W, token: &str, count: f64) -> io::Result<()> {
    writeln!(out, "{} {}", token, count)
}

/// Write a label list, one label per line in index order
pub fn write_labels<W: Write>(out: &mut W, labels: &[String]) -> io::Result<()> {
    for label in labels {
        writeln!(out, "{}", label)?;
    }
    Ok(())
}

/// Read a label list back, preserving index order
pub fn read_labels<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut labels = vec![];
    for line in reader.lines() {
        labels.push(line?);
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_lines_round_trip() {
        let mut buf = Vec::new();
        write_counts_line(&mut buf, 2.0, "a", "b").unwrap();
        write_counts_line(&mut buf, 0.5, "b", "a").unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("2 a b"));
        assert_eq!(parse_counts_line("2 a b").unwrap(), (2.0, "a", "b"));
        assert_eq!(parse_counts_line("0.5 b a").unwrap(), (0.5, "b", "a"));
    }

    #[test]
    fn counts_lines_tolerate_any_whitespace_split() {
        assert_eq!(parse_counts_line("  1.5\ta   b ").unwrap(), (1.5, "a", "b"));
    }

    #[test]
    fn bad_counts_lines_are_fatal() {
        assert!(parse_counts_line("1 a").is_err());
        assert!(parse_counts_line("1 a b c").is_err());
        assert!(parse_counts_line("one a b").is_err());
        assert!(parse_counts_line("").is_err());
    }

    #[test]
    fn vocab_lines_round_trip() {
        let mut buf = Vec::new();
        write_vocab_line(&mut buf, "the", 1041.0).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "the 1041\n");
        assert_eq!(parse_vocab_line("the 1041").unwrap(), ("the", 1041.0));
        assert!(parse_vocab_line("the").is_err());
        assert!(parse_vocab_line("the 10 41").is_err());
    }

    #[test]
    fn labels_round_trip_in_order() {
        let labels = vec!["a".to_string(), "c".to_string(), "b".to_string()];
        let mut buf = Vec::new();
        write_labels(&mut buf, &labels).unwrap();
        let back = read_labels(&buf[..]).unwrap();
        assert_eq!(back, labels);
    }
}
