//! Format detection at a caret or over a selection.
//!
//! ```text
//!   caret ─────┐                        ┌── character before the caret
//!              ▼                        ▼
//!   "Hello |world"    point detection reads 'o'  (format of what was just typed)
//!   "Hello [world]"   range detection counts every character in [6, 11)
//!                     and reads paragraph attributes at 'w' (the range start)
//! ```
//!
//! The two conventions disagree on purpose: toolbars already behave this way
//! and users notice when either one moves. Do not "fix" one without the other.
//!
//! Detection never fails. Offsets past the end clamp to the document length,
//! reversed ranges are normalized, and an empty document reads as
//! `FormatState::DEFAULT`.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

use crate::document::{AttributeSet, RichTextDocument};
use crate::exclusion::MutualExclusionResolver;
use crate::format::{Alignment, CharacterFlag, Format, FormatState, ParagraphFormat};

/// Caret or selection inside a document, in character offsets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selection {
    Caret(usize),
    Range(Range<usize>),
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Caret(0)
    }
}

impl Selection {
    /// Build from anchor/head offsets; equal offsets produce a caret.
    pub fn new(anchor: usize, head: usize) -> Self {
        if anchor == head {
            Selection::Caret(head)
        } else {
            Selection::Range(anchor.min(head)..anchor.max(head))
        }
    }

    pub fn start(&self) -> usize {
        match self {
            Selection::Caret(offset) => *offset,
            Selection::Range(range) => range.start.min(range.end),
        }
    }

    pub fn end(&self) -> usize {
        match self {
            Selection::Caret(offset) => *offset,
            Selection::Range(range) => range.start.max(range.end),
        }
    }

    pub fn len(&self) -> usize {
        self.end() - self.start()
    }

    pub fn is_caret(&self) -> bool {
        self.len() == 0
    }

    /// Clamp into `0..=len`, collapsing empty ranges to a caret.
    pub fn clamped(&self, len: usize) -> Selection {
        Selection::new(self.start().min(len), self.end().min(len))
    }
}

/// Result of a detection pass.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatDetection {
    pub state: FormatState,
    /// Fraction of selected characters carrying each flag. For a caret the
    /// ratios are 0.0 or 1.0.
    pub ratios: BTreeMap<CharacterFlag, f64>,
    /// Flags carried by some, but not all, selected characters.
    pub partially_active: BTreeSet<CharacterFlag>,
}

impl FormatDetection {
    fn point(state: FormatState) -> Self {
        let ratios = CharacterFlag::ALL
            .iter()
            .map(|flag| (*flag, if state.flag(*flag) { 1.0 } else { 0.0 }))
            .collect();
        Self {
            state,
            ratios,
            partially_active: BTreeSet::new(),
        }
    }

    pub fn ratio(&self, flag: CharacterFlag) -> f64 {
        self.ratios.get(&flag).copied().unwrap_or(0.0)
    }

    /// Tri-state indicator: "some but not all".
    pub fn is_mixed(&self, flag: CharacterFlag) -> bool {
        self.partially_active.contains(&flag)
    }
}

/// Reads a `FormatState` out of a document.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatDetector {
    resolver: MutualExclusionResolver,
}

impl FormatDetector {
    pub fn new() -> Self {
        Self {
            resolver: MutualExclusionResolver::new(),
        }
    }

    pub fn detect(&self, document: &RichTextDocument, selection: &Selection) -> FormatDetection {
        match selection {
            Selection::Caret(position) => FormatDetection::point(self.detect_at(document, *position)),
            Selection::Range(range) => self.detect_range(document, range.clone()),
        }
    }

    /// Format at a caret: the character before `position` decides.
    pub fn detect_at(&self, document: &RichTextDocument, position: usize) -> FormatState {
        let position = position.min(document.len());
        if position == 0 {
            return FormatState::DEFAULT;
        }
        self.describe_char(document, position - 1)
    }

    /// Format over a selection with per-flag coverage ratios.
    pub fn detect_range(&self, document: &RichTextDocument, range: Range<usize>) -> FormatDetection {
        let range = document.clamp_range(range);
        if range.is_empty() {
            return FormatDetection::point(self.detect_at(document, range.start));
        }

        let total = range.len();
        let mut active: BTreeMap<CharacterFlag, usize> = BTreeMap::new();
        for (span, attributes) in document.enumerate_runs(range.clone()) {
            for flag in CharacterFlag::ALL {
                if attributes.has_flag(flag) {
                    *active.entry(flag).or_default() += span.len();
                }
            }
        }

        // Paragraph attributes come from the character at the range start.
        let mut state = self.describe_char(document, range.start).with_selection(total);
        let mut ratios = BTreeMap::new();
        let mut partially_active = BTreeSet::new();
        for flag in CharacterFlag::ALL {
            let count = active.get(&flag).copied().unwrap_or(0);
            let ratio = count as f64 / total as f64;
            state.set_flag(flag, count > 0);
            if count > 0 && count < total {
                partially_active.insert(flag);
            }
            ratios.insert(flag, ratio);
        }

        log::trace!(
            "detect_range {:?}: {} mixed flag(s)",
            range,
            partially_active.len()
        );
        FormatDetection {
            state,
            ratios,
            partially_active,
        }
    }

    /// Full state for the character at `index` (which must be in bounds).
    fn describe_char(&self, document: &RichTextDocument, index: usize) -> FormatState {
        let Some(attributes) = document.attributes_at(index) else {
            return FormatState::DEFAULT;
        };
        let line = document.line_range(index);
        let line_head = document.attributes_at(line.start).unwrap_or(attributes);

        let raw = Self::scan(attributes, line_head);
        let validated = self.resolver.validate(raw);
        let mut state = FormatState::from_formats(&validated);
        if state.paragraph_format.is_list() {
            state.list_indent = line_head.list_indent.max(1);
            state.list_number = line_head.list_number.max(1);
        }
        state
    }

    /// Raw flag scan. Character flags, heading, alignment and quote come from
    /// the character's own run; the list kind comes from the first run of the
    /// line, falling back to its marker attachment.
    fn scan(attributes: &AttributeSet, line_head: &AttributeSet) -> Vec<Format> {
        let mut formats: Vec<Format> = CharacterFlag::ALL
            .iter()
            .filter(|flag| attributes.has_flag(**flag))
            .map(|flag| flag.format())
            .collect();

        let paragraph = ParagraphFormat::from_font_role(attributes.font_role);
        formats.extend(paragraph.format());

        let list_kind = line_head.list_kind.or_else(|| {
            line_head
                .attachment
                .as_ref()
                .and_then(|attachment| attachment.list_kind())
        });
        if let Some(kind) = list_kind {
            formats.extend(ParagraphFormat::from_list_kind(kind).format());
        }

        match attributes.alignment {
            Alignment::Left => {}
            Alignment::Center => formats.push(Format::AlignCenter),
            Alignment::Right => formats.push(Format::AlignRight),
        }
        if attributes.quote {
            formats.push(Format::Quote);
        }
        formats
    }
}
