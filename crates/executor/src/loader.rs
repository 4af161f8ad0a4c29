//! Program-image loader for the line-oriented `.bin` text format.
//!
//! A program file interleaves two-letter section markers with payload
//! lines. Blank lines and `;` comments are skipped everywhere. The
//! classifier is a small state machine: a marker line switches state, any
//! other line is handed to the current state's payload handler.
//!
//! | marker | state      | payload                                   |
//! |--------|------------|-------------------------------------------|
//! | `ds`   | data size  | one `<start> <end>` line for the DS range |
//! | `es`   | extra size | one `<start> <end>` line for the ES range |
//! | `ts`   | text size  | one `<start> <end>` line for the CS range |
//! | `dd`   | data       | one decimal word per line                 |
//! | `td`   | text       | one decimal word per line                 |
//!
//! Payload before any marker is an error; a line that is neither a marker
//! nor valid payload for the current state is an error (so a mistyped
//! marker surfaces as `BadPayload` rather than being skipped). The stack
//! segment is not declared in the file: after EOF it is synthesised as
//! `[max_end + 1, mem_size - 1]`.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cpu::{SegmentMap, SegmentRange};
use crate::error::ExecutorError;
use crate::Word;

/// A parsed program image, ready to hand to the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub data: Vec<Word>,
    pub instructions: Vec<Word>,
    pub segments: SegmentMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Before the first marker.
    None,
    DataSize,
    ExtraSize,
    TextSize,
    DataPayload,
    TextPayload,
}

/// Load and parse a program file. The extension must be `.bin`.
pub fn load_program(path: &Path, mem_size: usize) -> Result<Program, ExecutorError> {
    if path.extension().and_then(|e| e.to_str()) != Some("bin") {
        return Err(ExecutorError::BadExtension {
            path: path.to_path_buf(),
        });
    }
    let text = fs::read_to_string(path).map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            ExecutorError::MissingFile {
                path: path.to_path_buf(),
            }
        } else {
            ExecutorError::Io(err)
        }
    })?;
    parse_program(&text, mem_size)
}

/// Parse program text. Split out from [`load_program`] so the classifier is
/// testable without touching the filesystem.
pub fn parse_program(text: &str, mem_size: usize) -> Result<Program, ExecutorError> {
    let mut state = ParseState::None;
    let mut data = Vec::new();
    let mut instructions = Vec::new();
    let mut cs: Option<SegmentRange> = None;
    let mut ds: Option<SegmentRange> = None;
    let mut es: Option<SegmentRange> = None;

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }

        let next = match line {
            "ds" => Some(ParseState::DataSize),
            "es" => Some(ParseState::ExtraSize),
            "ts" => Some(ParseState::TextSize),
            "dd" => Some(ParseState::DataPayload),
            "td" => Some(ParseState::TextPayload),
            _ => None,
        };
        if let Some(next) = next {
            debug!(line = index + 1, ?next, "section marker");
            state = next;
            continue;
        }

        let line_no = index + 1;
        match state {
            ParseState::None => {
                return Err(ExecutorError::PayloadBeforeMarker { line: line_no })
            }
            ParseState::DataSize => ds = Some(parse_range(line, line_no)?),
            ParseState::ExtraSize => es = Some(parse_range(line, line_no)?),
            ParseState::TextSize => cs = Some(parse_range(line, line_no)?),
            ParseState::DataPayload => data.push(parse_word(line, line_no)?),
            ParseState::TextPayload => instructions.push(parse_word(line, line_no)?),
        }
    }

    let cs = cs.ok_or(ExecutorError::MissingSegment { segment: "code" })?;
    let ds = ds.ok_or(ExecutorError::MissingSegment { segment: "data" })?;
    let es = es.ok_or(ExecutorError::MissingSegment { segment: "extra" })?;

    // The stack takes whatever lies above the declared segments.
    let max_end = cs.end.max(ds.end).max(es.end);
    let ss = SegmentRange::new(max_end.wrapping_add(1), (mem_size as Word).wrapping_sub(1));

    Ok(Program {
        data,
        instructions,
        segments: SegmentMap { cs, ds, ss, es },
    })
}

fn parse_word(text: &str, line: usize) -> Result<Word, ExecutorError> {
    text.parse::<Word>()
        .map_err(|_| ExecutorError::BadPayload {
            line,
            text: text.to_string(),
        })
}

fn parse_range(text: &str, line: usize) -> Result<SegmentRange, ExecutorError> {
    let mut fields = text.split_whitespace();
    let (Some(start), Some(end), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err(ExecutorError::BadPayload {
            line,
            text: text.to_string(),
        });
    };
    let start = parse_word(start, line)?;
    let end = parse_word(end, line)?;
    if start > end {
        return Err(ExecutorError::BadRange { line, start, end });
    }
    Ok(SegmentRange::new(start, end))
}
