//! The chain-learner line protocol.
//!
//! A stream is a `LEARNING <nofBits> <nofLetters>` header, any number of
//! `CHAIN <label_0> … <label_n>` records, and a closing `END`. Labels are
//! binary strings of length `nofLetters`. Every violation is fatal and is
//! reported before the offending record reaches the automaton.

use std::io::BufRead;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("line {line}: {msg}")]
    Format { line: usize, msg: String },
    #[error("invariant violated: {0}")]
    Invariant(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ChainError {
    fn format(line: usize, msg: impl Into<String>) -> Self {
        ChainError::Format { line, msg: msg.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub nof_bits: u16,
    pub nof_letters: usize,
}

/// One `CHAIN` record: the flattened label sequence, tail label last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRecord {
    pub labels: Vec<String>,
}

impl ChainRecord {
    /// Number of automaton states this record unfolds into.
    pub fn positions(&self) -> usize {
        (self.labels.len() + 1) / 2
    }
}

/// Pull-based reader over the protocol. The header is consumed eagerly so a
/// malformed stream fails before any automaton is built.
pub struct Reader<R> {
    input: R,
    line_no: usize,
    header: Header,
    ended: bool,
}

impl<R: BufRead> Reader<R> {
    pub fn new(mut input: R) -> Result<Self, ChainError> {
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(ChainError::format(1, "missing LEARNING header"));
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 3 || fields[0] != "LEARNING" {
            return Err(ChainError::format(
                1,
                "expected header `LEARNING <nofBits> <nofLetters>`",
            ));
        }
        let nof_bits: u16 = fields[1]
            .parse()
            .map_err(|_| ChainError::format(1, format!("bad bit count `{}`", fields[1])))?;
        let nof_letters: usize = fields[2]
            .parse()
            .map_err(|_| ChainError::format(1, format!("bad letter count `{}`", fields[2])))?;

        Ok(Self {
            input,
            line_no: 1,
            header: Header { nof_bits, nof_letters },
            ended: false,
        })
    }

    pub fn header(&self) -> Header {
        self.header
    }

    /// Next `CHAIN` record, or `None` once `END` was read.
    pub fn next_chain(&mut self) -> Result<Option<ChainRecord>, ChainError> {
        loop {
            let mut line = String::new();
            self.line_no += 1;
            if self.input.read_line(&mut line)? == 0 {
                if self.ended {
                    return Ok(None);
                }
                return Err(ChainError::format(self.line_no, "missing END record"));
            }
            let mut fields = line.split_whitespace();
            match fields.next() {
                None => continue,
                Some("END") => {
                    self.ended = true;
                    return Ok(None);
                }
                Some("CHAIN") => {
                    if self.ended {
                        return Err(ChainError::format(self.line_no, "CHAIN record after END"));
                    }
                    let labels: Vec<String> = fields.map(str::to_string).collect();
                    if labels.is_empty() {
                        return Err(ChainError::format(self.line_no, "CHAIN record without labels"));
                    }
                    for label in &labels {
                        self.check_label(label)?;
                    }
                    return Ok(Some(ChainRecord { labels }));
                }
                Some(other) => {
                    return Err(ChainError::format(
                        self.line_no,
                        format!("unexpected record `{other}`"),
                    ));
                }
            }
        }
    }

    /// Enforce that nothing but blank lines follows `END`.
    pub fn finish(&mut self) -> Result<(), ChainError> {
        debug_assert!(self.ended);
        loop {
            let mut line = String::new();
            self.line_no += 1;
            if self.input.read_line(&mut line)? == 0 {
                return Ok(());
            }
            if let Some(record) = line.split_whitespace().next() {
                return Err(ChainError::format(
                    self.line_no,
                    format!("record `{record}` after END"),
                ));
            }
        }
    }

    fn check_label(&self, label: &str) -> Result<(), ChainError> {
        if label.len() != self.header.nof_letters {
            return Err(ChainError::format(
                self.line_no,
                format!(
                    "label `{label}` has {} letters, expected {}",
                    label.len(),
                    self.header.nof_letters
                ),
            ));
        }
        if let Some(c) = label.chars().find(|c| *c != '0' && *c != '1') {
            return Err(ChainError::format(
                self.line_no,
                format!("illegal character `{c}` in label `{label}`"),
            ));
        }
        Ok(())
    }
}
