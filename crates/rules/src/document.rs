//! In-memory model of a shared rules file.
//!
//! A rules file is a sequence of lines in which several subsystems each own a
//! region delimited by a begin and an end marker line. Everything outside the
//! regions belongs to the site owner and is never touched. All edits are pure
//! operations on the line sequence; reading and writing the file is left to
//! [`RulesFile`](crate::RulesFile).

use crate::error::{ErrorKind, Result};
use crate::markers::Hint;
use std::fmt;
use std::ops::Range;

/// Lines of a rules file.
///
/// Lines keep their exact bytes (including a trailing `\r` in CRLF files);
/// markers are matched against the whitespace-trimmed line. A file without a
/// final newline is written back without one.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RulesDocument {
    lines: Vec<String>,
    trailing_newline: bool,
}

impl Default for RulesDocument {
    fn default() -> Self {
        Self { lines: Vec::new(), trailing_newline: true }
    }
}

impl RulesDocument {
    pub fn parse(text: &str) -> Self {
        Self { lines: split_lines(text), trailing_newline: text.is_empty() || text.ends_with('\n') }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Index of the first line that is exactly `marker`.
    pub fn position_of(&self, marker: &str) -> Option<usize> {
        self.lines.iter().position(|line| line.trim() == marker)
    }

    /// Line ranges (end marker inclusive) of every `begin`..`end` region.
    ///
    /// Returns [`ErrorKind::MalformedBlock`] when a begin marker has no end
    /// marker after it.
    fn regions(&self, begin: &str, end: &str) -> Result<Vec<Range<usize>>> {
        let mut regions = Vec::new();
        let mut cursor = 0;
        while let Some(start) = self.lines[cursor..].iter().position(|l| l.trim() == begin).map(|i| i + cursor) {
            let Some(stop) = self.lines[start + 1..].iter().position(|l| l.trim() == end).map(|i| i + start + 1) else {
                exn::bail!(ErrorKind::MalformedBlock(begin.to_string()));
            };
            regions.push(start..stop + 1);
            cursor = stop + 1;
        }
        Ok(regions)
    }

    /// Returns `true` if a `begin`..`end` region is present.
    pub fn contains(&self, begin: &str, end: &str) -> Result<bool> {
        Ok(!self.regions(begin, end)?.is_empty())
    }

    /// Text of the first `begin`..`end` region, markers included.
    pub fn block(&self, begin: &str, end: &str) -> Result<Option<String>> {
        let regions = self.regions(begin, end)?;
        Ok(regions.first().map(|r| join_lines(&self.lines[r.clone()])))
    }

    /// Puts `block` into the document.
    ///
    /// - An empty `block` removes the region.
    /// - An existing region is replaced in place; extra copies are dropped.
    /// - Otherwise the block goes to the line of the first hint marker found
    ///   (shifted by the hint's offset), or to the end of the document.
    ///
    /// Returns `true` if the document changed.
    pub fn upsert(&mut self, block: &str, begin: &str, end: &str, hints: &[Hint<'_>]) -> Result<bool> {
        let incoming = split_lines(block);
        if incoming.iter().all(|l| l.trim().is_empty()) {
            return self.remove(begin, end);
        }
        let wrapped = incoming.first().is_some_and(|l| l.trim() == begin)
            && incoming.last().is_some_and(|l| l.trim() == end);
        if !wrapped {
            exn::bail!(ErrorKind::MarkerMismatch { begin: begin.to_string(), end: end.to_string() });
        }

        let regions = self.regions(begin, end)?;
        if let [only] = regions.as_slice()
            && self.lines[only.clone()] == incoming[..]
        {
            return Ok(false);
        }
        match regions.split_first() {
            Some((first, duplicates)) => {
                for duplicate in duplicates.iter().rev() {
                    self.lines.drain(duplicate.clone());
                }
                self.lines.splice(first.clone(), incoming);
            },
            None => {
                let at = self.insertion_point(hints);
                self.lines.splice(at..at, incoming);
            },
        }
        Ok(true)
    }

    /// Removes every `begin`..`end` region. Returns `true` if any was found.
    pub fn remove(&mut self, begin: &str, end: &str) -> Result<bool> {
        let regions = self.regions(begin, end)?;
        for region in regions.iter().rev() {
            self.lines.drain(region.clone());
        }
        Ok(!regions.is_empty())
    }

    fn insertion_point(&self, hints: &[Hint<'_>]) -> usize {
        hints
            .iter()
            .find_map(|(marker, offset)| self.position_of(marker).map(|at| at + offset))
            .map_or(self.lines.len(), |at| at.min(self.lines.len()))
    }
}

impl fmt::Display for RulesDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines.join("\n"))?;
        if self.trailing_newline && !self.lines.is_empty() {
            f.write_str("\n")?;
        }
        Ok(())
    }
}

fn split_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let text = text.strip_suffix('\n').unwrap_or(text);
    text.split('\n').map(str::to_string).collect()
}

fn join_lines(lines: &[String]) -> String {
    if lines.is_empty() {
        return String::new();
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}
