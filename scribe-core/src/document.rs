//! Run-length formatted text model.
//!
//! ```text
//! RichTextDocument
//!   ├── Run { "Shopping\n", Heading1 }
//!   ├── Run { "\u{FFFC}", Checkbox attachment }
//!   ├── Run { "milk ",   body }
//!   └── Run { "now",     bold }
//! ```
//!
//! Runs partition the text with no gaps and no overlaps. Empty runs are never
//! stored. Two adjacent runs with identical attributes are equivalent to one
//! merged run; every read path treats them that way, and `normalize()` merges
//! them physically.
//!
//! All offsets are character offsets (Unicode scalar values), not bytes.

use serde::{Deserialize, Serialize};
use std::ops::Range;
use uuid::Uuid;

use crate::format::{Alignment, CharacterFlag};

/// Object replacement character anchoring an attachment in the text stream.
pub const ATTACHMENT_CHAR: char = '\u{FFFC}';

/// Font role of a run. Headings and body text change the font size; `Title`
/// marks the note title, which sits outside the general formatting model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FontRole {
    #[default]
    Body,
    Heading1,
    Heading2,
    Heading3,
    Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListKind {
    Bullet,
    Ordered,
    Checkbox,
}

/// Reference to an inline object. The payload of images and audio is stored
/// elsewhere; only the id travels with the document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attachment {
    Checkbox { checked: bool },
    BulletMarker,
    OrderedMarker { number: u32 },
    Image { id: Uuid },
    Audio { id: Uuid },
}

impl Attachment {
    /// List kind implied by a marker attachment.
    pub fn list_kind(&self) -> Option<ListKind> {
        match self {
            Attachment::Checkbox { .. } => Some(ListKind::Checkbox),
            Attachment::BulletMarker => Some(ListKind::Bullet),
            Attachment::OrderedMarker { .. } => Some(ListKind::Ordered),
            Attachment::Image { .. } | Attachment::Audio { .. } => None,
        }
    }
}

/// Closed set of attributes a run can carry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeSet {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub highlight: bool,
    pub font_role: FontRole,
    pub alignment: Alignment,
    pub list_kind: Option<ListKind>,
    pub list_indent: u32,
    pub list_number: u32,
    pub quote: bool,
    pub attachment: Option<Attachment>,
}

impl Default for AttributeSet {
    fn default() -> Self {
        Self {
            bold: false,
            italic: false,
            underline: false,
            strikethrough: false,
            highlight: false,
            font_role: FontRole::Body,
            alignment: Alignment::Left,
            list_kind: None,
            list_indent: 1,
            list_number: 1,
            quote: false,
            attachment: None,
        }
    }
}

impl AttributeSet {
    pub fn has_flag(&self, flag: CharacterFlag) -> bool {
        match flag {
            CharacterFlag::Bold => self.bold,
            CharacterFlag::Italic => self.italic,
            CharacterFlag::Underline => self.underline,
            CharacterFlag::Strikethrough => self.strikethrough,
            CharacterFlag::Highlight => self.highlight,
        }
    }

    pub fn set_flag(&mut self, flag: CharacterFlag, on: bool) {
        match flag {
            CharacterFlag::Bold => self.bold = on,
            CharacterFlag::Italic => self.italic = on,
            CharacterFlag::Underline => self.underline = on,
            CharacterFlag::Strikethrough => self.strikethrough = on,
            CharacterFlag::Highlight => self.highlight = on,
        }
    }

    /// Builder-style flag setter, handy for constructing fixtures.
    pub fn with_flag(mut self, flag: CharacterFlag) -> Self {
        self.set_flag(flag, true);
        self
    }

    pub fn with_font_role(mut self, role: FontRole) -> Self {
        self.font_role = role;
        self
    }

    pub fn with_list(mut self, kind: ListKind, indent: u32, number: u32) -> Self {
        self.list_kind = Some(kind);
        self.list_indent = indent.max(1);
        self.list_number = number.max(1);
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }
}

/// A maximal span of text sharing one attribute set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RunData", into = "RunData")]
pub struct Run {
    text: String,
    attributes: AttributeSet,
    char_len: usize,
}

/// Serialized shape of a run; the cached length is rebuilt on decode.
#[derive(Serialize, Deserialize)]
struct RunData {
    text: String,
    attributes: AttributeSet,
}

impl From<RunData> for Run {
    fn from(data: RunData) -> Self {
        Run::new(data.text, data.attributes)
    }
}

impl From<Run> for RunData {
    fn from(run: Run) -> Self {
        RunData {
            text: run.text,
            attributes: run.attributes,
        }
    }
}

impl Run {
    pub fn new(text: impl Into<String>, attributes: AttributeSet) -> Self {
        let text = text.into();
        let char_len = text.chars().count();
        Self {
            text,
            attributes,
            char_len,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.char_len
    }

    pub fn is_empty(&self) -> bool {
        self.char_len == 0
    }

    /// Split at a character offset, keeping `[0, at)` and returning `[at, len)`.
    fn split_off(&mut self, at: usize) -> Run {
        let byte = self
            .text
            .char_indices()
            .nth(at)
            .map_or(self.text.len(), |(byte, _)| byte);
        let tail = self.text.split_off(byte);
        let tail_len = self.char_len - at;
        self.char_len = at;
        Run {
            text: tail,
            attributes: self.attributes.clone(),
            char_len: tail_len,
        }
    }

    fn can_merge(&self, next: &Run) -> bool {
        self.attributes == next.attributes && self.attributes.attachment.is_none()
    }
}

/// A run-length formatted text document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DocumentData", into = "DocumentData")]
pub struct RichTextDocument {
    id: Uuid,
    runs: Vec<Run>,
}

/// Serialized shape of a document; empty runs are dropped on decode.
#[derive(Serialize, Deserialize)]
struct DocumentData {
    id: Uuid,
    runs: Vec<Run>,
}

impl From<DocumentData> for RichTextDocument {
    fn from(data: DocumentData) -> Self {
        Self {
            id: data.id,
            ..Self::from_runs(data.runs)
        }
    }
}

impl From<RichTextDocument> for DocumentData {
    fn from(document: RichTextDocument) -> Self {
        DocumentData {
            id: document.id,
            runs: document.runs,
        }
    }
}

impl Default for RichTextDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl RichTextDocument {
    /// Create an empty document with a fresh id.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            runs: Vec::new(),
        }
    }

    /// Create from runs. Empty runs are dropped.
    pub fn from_runs(runs: impl IntoIterator<Item = Run>) -> Self {
        Self {
            id: Uuid::new_v4(),
            runs: runs.into_iter().filter(|run| !run.is_empty()).collect(),
        }
    }

    /// A single unformatted run.
    pub fn plain(text: impl Into<String>) -> Self {
        Self::from_runs([Run::new(text, AttributeSet::default())])
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.runs.iter().map(Run::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(Run::text).collect()
    }

    /// Run index and offset within the run for the character at `offset`.
    fn locate(&self, offset: usize) -> Option<(usize, usize)> {
        let mut start = 0;
        for (index, run) in self.runs.iter().enumerate() {
            if offset < start + run.len() {
                return Some((index, offset - start));
            }
            start += run.len();
        }
        None
    }

    /// Attributes of the run covering the character at `offset`.
    pub fn attributes_at(&self, offset: usize) -> Option<&AttributeSet> {
        self.locate(offset)
            .map(|(index, _)| &self.runs[index].attributes)
    }

    pub fn char_at(&self, offset: usize) -> Option<char> {
        self.locate(offset)
            .and_then(|(index, within)| self.runs[index].text.chars().nth(within))
    }

    /// Line containing the character at `offset`: the maximal span between
    /// line breaks, including its terminating `\n`. At `offset == len()` this
    /// is the trailing line, which is empty after a final `\n`.
    pub fn line_range(&self, offset: usize) -> Range<usize> {
        let len = self.len();
        let offset = offset.min(len);
        let mut start = 0;
        let mut end = len;
        for (index, ch) in self.runs.iter().flat_map(|run| run.text.chars()).enumerate() {
            if ch != '\n' {
                continue;
            }
            if index < offset {
                start = index + 1;
            } else {
                end = index + 1;
                break;
            }
        }
        start..end.max(start)
    }

    /// Every line touched by `range`. An empty range touches its own line.
    pub fn line_ranges_covering(&self, range: Range<usize>) -> Vec<Range<usize>> {
        let range = self.clamp_range(range);
        let mut lines = vec![self.line_range(range.start)];
        while let Some(last) = lines.last() {
            let next = last.end;
            if next >= range.end || next >= self.len() || last.is_empty() {
                break;
            }
            lines.push(self.line_range(next));
        }
        lines
    }

    /// Coalesced attribute spans clipped to `range`. Adjacent runs with equal
    /// attributes come back as one span.
    pub fn enumerate_runs(&self, range: Range<usize>) -> Vec<(Range<usize>, &AttributeSet)> {
        let range = self.clamp_range(range);
        let mut spans: Vec<(Range<usize>, &AttributeSet)> = Vec::new();
        let mut start = 0;
        for run in &self.runs {
            let run_range = start..start + run.len();
            start = run_range.end;
            let clipped = run_range.start.max(range.start)..run_range.end.min(range.end);
            if clipped.is_empty() {
                continue;
            }
            match spans.last_mut() {
                Some((span, attrs)) if span.end == clipped.start && **attrs == run.attributes => {
                    span.end = clipped.end;
                }
                _ => spans.push((clipped, &run.attributes)),
            }
        }
        spans
    }

    pub fn clamp_range(&self, range: Range<usize>) -> Range<usize> {
        let len = self.len();
        let (a, b) = if range.start <= range.end {
            (range.start, range.end)
        } else {
            (range.end, range.start)
        };
        a.min(len)..b.min(len)
    }

    /// Ensure a run boundary at `offset`; returns the index of the run that
    /// starts there (or `runs.len()` at the end).
    fn split_at(&mut self, offset: usize) -> usize {
        let mut start = 0;
        for index in 0..self.runs.len() {
            let len = self.runs[index].len();
            if offset == start {
                return index;
            }
            if offset < start + len {
                let tail = self.runs[index].split_off(offset - start);
                self.runs.insert(index + 1, tail);
                return index + 1;
            }
            start += len;
        }
        self.runs.len()
    }

    /// Insert `text` with `attributes` at `offset` (clamped).
    pub fn insert(&mut self, offset: usize, text: &str, attributes: AttributeSet) {
        if text.is_empty() {
            return;
        }
        let offset = offset.min(self.len());
        let index = self.split_at(offset);
        self.runs.insert(index, Run::new(text, attributes));
        self.normalize();
    }

    /// Insert an attachment anchored by a single `ATTACHMENT_CHAR`.
    pub fn insert_attachment(&mut self, offset: usize, attachment: Attachment, mut attributes: AttributeSet) {
        attributes.attachment = Some(attachment);
        self.insert(offset, &ATTACHMENT_CHAR.to_string(), attributes);
    }

    /// Remove `range` (clamped) and return the removed text.
    pub fn delete(&mut self, range: Range<usize>) -> String {
        let range = self.clamp_range(range);
        if range.is_empty() {
            return String::new();
        }
        let first = self.split_at(range.start);
        let last = self.split_at(range.end);
        let removed: String = self
            .runs
            .drain(first..last)
            .map(|run| run.text)
            .collect();
        self.normalize();
        removed
    }

    /// Apply `update` to the attributes of every character in `range`.
    pub fn update_attributes(&mut self, range: Range<usize>, mut update: impl FnMut(&mut AttributeSet)) {
        let range = self.clamp_range(range);
        if range.is_empty() {
            return;
        }
        let first = self.split_at(range.start);
        let last = self.split_at(range.end);
        for run in &mut self.runs[first..last] {
            update(&mut run.attributes);
        }
        self.normalize();
    }

    /// Apply `update` to every full line touched by `range`.
    pub fn update_paragraphs(&mut self, range: Range<usize>, mut update: impl FnMut(&mut AttributeSet)) {
        for line in self.line_ranges_covering(range) {
            self.update_attributes(line, &mut update);
        }
    }

    /// Merge adjacent runs whose attributes are identical. Attachment runs
    /// always stay one character long.
    pub fn normalize(&mut self) {
        let mut merged: Vec<Run> = Vec::with_capacity(self.runs.len());
        for run in self.runs.drain(..) {
            if run.is_empty() {
                continue;
            }
            match merged.last_mut() {
                Some(prev) if prev.can_merge(&run) => {
                    prev.text.push_str(&run.text);
                    prev.char_len += run.char_len;
                }
                _ => merged.push(run),
            }
        }
        self.runs = merged;
    }
}
