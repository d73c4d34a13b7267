// scanner.rs: line classification and COPY block state machine
//
// Relies on the dump grammar guarantee that only statement lines end with `;`.
// A data row ending in `;` cannot be told apart from a statement and is passed
// through untouched (with a warning when the table carries policies).
//
// Lines are handled as bytes; only header text and policy fields are decoded.
use log::{debug, warn};
use std::borrow::Cow;
use std::io::{BufRead, BufWriter, Write};

use crate::anonymizer::generator::ValueGenerator;
use crate::anonymizer::memo::PersistenceMemo;
use crate::anonymizer::rules::PolicyConfig;
use crate::anonymizer::transform::{RowOutcome, Transformer};
use crate::error::{Result, ScrubError};
use crate::parser::{is_copy_statement, parse_copy_header, CopyHeader, COPY_KEYWORD};
use crate::tokenizer::{decode_field, split_row};

pub const COMMENT_PREFIX: &[u8] = b"--";
pub const END_OF_DATA: &[u8] = b"\\.";
/// psql meta-commands (`\connect`, `\restrict`) are complete on one line.
pub const META_COMMAND_PREFIX: u8 = b'\\';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Outside,
    InBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEvent {
    BlankOrComment,
    EndMarker,
    /// `;`-terminated COPY statement seen outside a block.
    Header,
    /// Any other statement line, terminated or not.
    Statement,
    DataRow,
}

impl LineEvent {
    pub fn ends_block(self) -> bool {
        matches!(self, LineEvent::BlankOrComment | LineEvent::EndMarker)
    }
}

fn starts_copy(line: &[u8]) -> bool {
    line.starts_with(COPY_KEYWORD.as_bytes())
}

/// `pending` is the statement text accumulated from earlier unterminated lines.
/// A COPY header is recognized when either the pending text or the line itself
/// opens with the COPY keyword.
pub fn classify(state: ScanState, pending: &str, line: &[u8]) -> LineEvent {
    if line.is_empty() || line.starts_with(COMMENT_PREFIX) {
        return LineEvent::BlankOrComment;
    }
    if line == END_OF_DATA {
        return LineEvent::EndMarker;
    }
    if line.ends_with(b";") {
        if state == ScanState::Outside && (is_copy_statement(pending) || starts_copy(line)) {
            return LineEvent::Header;
        }
        return LineEvent::Statement;
    }
    match state {
        ScanState::InBlock => LineEvent::DataRow,
        ScanState::Outside => LineEvent::Statement,
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    pub lines: u64,
    pub blocks: u64,
    pub rows_seen: u64,
    pub rows_rewritten: u64,
    pub rows_ignored: u64,
    pub fields_replaced: u64,
}

pub struct DumpScanner<'a> {
    policies: &'a PolicyConfig,
    transformer: Transformer<'a>,
    state: ScanState,
    block: Option<CopyHeader>,
    statement: String,
    stats: ScanStats,
}

impl<'a> DumpScanner<'a> {
    pub fn new(
        policies: &'a PolicyConfig,
        generator: &'a dyn ValueGenerator,
        memo: &'a mut PersistenceMemo,
    ) -> Self {
        Self {
            policies,
            transformer: Transformer::new(generator, memo),
            state: ScanState::Outside,
            block: None,
            statement: String::new(),
            stats: ScanStats::default(),
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn block(&self) -> Option<&CopyHeader> {
        self.block.as_ref()
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// Feed one line without its terminator; returns the event and the line to emit.
    pub fn process_line<'l>(&mut self, line: &'l [u8]) -> Result<(LineEvent, Cow<'l, [u8]>)> {
        self.stats.lines += 1;
        let event = classify(self.state, &self.statement, line);
        match event {
            LineEvent::BlankOrComment | LineEvent::EndMarker => {
                self.statement.clear();
                self.block = None;
                self.state = ScanState::Outside;
            }
            LineEvent::Header => {
                // held text that is not a COPY prefix belongs to an earlier statement
                if !is_copy_statement(&self.statement) {
                    self.statement.clear();
                }
                self.push_statement(line);
                let header = parse_copy_header(&self.statement)?;
                debug!(
                    "COPY block {} ({} columns, policy: {})",
                    header.table,
                    header.columns.len(),
                    self.policies.table(&header.table).is_some()
                );
                self.stats.blocks += 1;
                self.block = Some(header);
                self.state = ScanState::InBlock;
                self.statement.clear();
            }
            LineEvent::Statement => {
                if line.ends_with(b";") {
                    if let Some(block) = self.block.as_ref() {
                        if self.policies.table(&block.table).is_some() {
                            warn!(
                                "line {} in COPY block {} ends with ';' and is passed through unchanged",
                                self.stats.lines, block.table
                            );
                        }
                    }
                    self.statement.clear();
                } else if line.first() == Some(&META_COMMAND_PREFIX) {
                    self.statement.clear();
                } else {
                    if starts_copy(line) {
                        self.statement.clear();
                    }
                    self.push_statement(line);
                }
            }
            LineEvent::DataRow => {
                self.statement.clear();
                let out = self.sanitize_data_row(line)?;
                return Ok((event, out));
            }
        }
        Ok((event, Cow::Borrowed(line)))
    }

    fn push_statement(&mut self, line: &[u8]) {
        if !self.statement.is_empty() {
            self.statement.push(' ');
        }
        self.statement.push_str(&decode_field(line).0);
    }

    fn sanitize_data_row<'l>(&mut self, line: &'l [u8]) -> Result<Cow<'l, [u8]>> {
        let Some(block) = self.block.as_ref() else {
            return Ok(Cow::Borrowed(line));
        };
        self.stats.rows_seen += 1;
        let Some(table) = self.policies.table(&block.table) else {
            return Ok(Cow::Borrowed(line));
        };
        let fields = split_row(line);
        if fields.len() != block.columns.len() {
            return Err(ScrubError::RowShape {
                table: block.table.clone(),
                expected: block.columns.len(),
                found: fields.len(),
                line: self.stats.lines,
            });
        }
        match self.transformer.sanitize_row(table, &block.columns, &fields)? {
            RowOutcome::Ignored => {
                self.stats.rows_ignored += 1;
                Ok(Cow::Borrowed(line))
            }
            RowOutcome::Rewritten { replaced: 0, .. } => Ok(Cow::Borrowed(line)),
            RowOutcome::Rewritten { line: out, replaced } => {
                self.stats.rows_rewritten += 1;
                self.stats.fields_replaced += replaced as u64;
                Ok(Cow::Owned(out))
            }
        }
    }

    /// Single forward pass. Output is flushed at every block boundary and at the end.
    /// Each line keeps its own terminator (`\n`, `\r\n` or none on a final line).
    pub fn run<R: BufRead, W: Write>(mut self, mut reader: R, writer: W) -> Result<ScanStats> {
        let mut out = BufWriter::new(writer);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let (line, terminator) = split_terminator(&buf);
            let (event, text) = self.process_line(line)?;
            out.write_all(&text)?;
            out.write_all(terminator)?;
            if event.ends_block() {
                out.flush()?;
            }
        }
        out.flush()?;
        Ok(self.stats)
    }
}

fn split_terminator(raw: &[u8]) -> (&[u8], &[u8]) {
    if let Some(line) = raw.strip_suffix(b"\r\n") {
        (line, &b"\r\n"[..])
    } else if let Some(line) = raw.strip_suffix(b"\n") {
        (line, &b"\n"[..])
    } else {
        (raw, &b""[..])
    }
}
