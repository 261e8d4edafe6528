//! Format vocabulary and the `FormatState` snapshot.
//!
//! A `FormatState` is the canonical answer to "what does the formatting look
//! like here?". It is a plain `Copy` value: every detection pass builds a new
//! one, and observers compare snapshots by value to decide whether anything
//! changed.
//!
//! Two representations coexist:
//!
//! ```text
//! raw attribute scan ──► BTreeSet<Format> ──► validate() ──► FormatState
//!   (may conflict)        (flag-set form)     (resolver)     (strict form)
//! ```
//!
//! The flag-set form can hold conflicting members (two headings, two
//! alignments); the strict form cannot, because paragraph format and
//! alignment are single enum fields.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::document::{FontRole, ListKind};

/// Paragraph alignment. `Left` is the implicit default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// Paragraph-level format. Exactly one is active at any point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum ParagraphFormat {
    Heading1,
    Heading2,
    Heading3,
    #[default]
    Body,
    BulletList,
    NumberedList,
    Checkbox,
}

impl ParagraphFormat {
    pub fn is_heading(self) -> bool {
        matches!(self, Self::Heading1 | Self::Heading2 | Self::Heading3)
    }

    pub fn is_list(self) -> bool {
        self.list_kind().is_some()
    }

    /// The list kind written into the document for this paragraph format.
    pub fn list_kind(self) -> Option<ListKind> {
        match self {
            Self::BulletList => Some(ListKind::Bullet),
            Self::NumberedList => Some(ListKind::Ordered),
            Self::Checkbox => Some(ListKind::Checkbox),
            _ => None,
        }
    }

    /// The font role written into the document. Anything that is not a
    /// heading falls back to body size.
    pub fn font_role(self) -> FontRole {
        match self {
            Self::Heading1 => FontRole::Heading1,
            Self::Heading2 => FontRole::Heading2,
            Self::Heading3 => FontRole::Heading3,
            _ => FontRole::Body,
        }
    }

    pub fn from_list_kind(kind: ListKind) -> Self {
        match kind {
            ListKind::Bullet => Self::BulletList,
            ListKind::Ordered => Self::NumberedList,
            ListKind::Checkbox => Self::Checkbox,
        }
    }

    /// Title runs are not part of the general formatting model and read as body.
    pub fn from_font_role(role: FontRole) -> Self {
        match role {
            FontRole::Heading1 => Self::Heading1,
            FontRole::Heading2 => Self::Heading2,
            FontRole::Heading3 => Self::Heading3,
            FontRole::Body | FontRole::Title => Self::Body,
        }
    }

    /// Flag-set counterpart. `Body` has none.
    pub fn format(self) -> Option<Format> {
        match self {
            Self::Heading1 => Some(Format::Heading1),
            Self::Heading2 => Some(Format::Heading2),
            Self::Heading3 => Some(Format::Heading3),
            Self::Body => None,
            Self::BulletList => Some(Format::BulletList),
            Self::NumberedList => Some(Format::NumberedList),
            Self::Checkbox => Some(Format::Checkbox),
        }
    }
}

/// The five independently combinable character flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CharacterFlag {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Highlight,
}

impl CharacterFlag {
    pub const ALL: [CharacterFlag; 5] = [
        CharacterFlag::Bold,
        CharacterFlag::Italic,
        CharacterFlag::Underline,
        CharacterFlag::Strikethrough,
        CharacterFlag::Highlight,
    ];

    pub fn format(self) -> Format {
        match self {
            Self::Bold => Format::Bold,
            Self::Italic => Format::Italic,
            Self::Underline => Format::Underline,
            Self::Strikethrough => Format::Strikethrough,
            Self::Highlight => Format::Highlight,
        }
    }
}

/// Groups whose members must never coexist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExclusiveGroup {
    Heading,
    Alignment,
    List,
}

impl ExclusiveGroup {
    pub const ALL: [ExclusiveGroup; 3] = [
        ExclusiveGroup::Heading,
        ExclusiveGroup::Alignment,
        ExclusiveGroup::List,
    ];

    /// Members in priority order (first wins when several are present).
    pub fn members(self) -> &'static [Format] {
        match self {
            Self::Heading => &[Format::Heading1, Format::Heading2, Format::Heading3],
            Self::Alignment => &[Format::AlignLeft, Format::AlignCenter, Format::AlignRight],
            Self::List => &[Format::Checkbox, Format::BulletList, Format::NumberedList],
        }
    }
}

/// A single toggleable format, as used by toolbars and menus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Format {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Highlight,
    Heading1,
    Heading2,
    Heading3,
    AlignLeft,
    AlignCenter,
    AlignRight,
    BulletList,
    NumberedList,
    Checkbox,
    Quote,
}

impl Format {
    pub fn group(self) -> Option<ExclusiveGroup> {
        match self {
            Self::Heading1 | Self::Heading2 | Self::Heading3 => Some(ExclusiveGroup::Heading),
            Self::AlignLeft | Self::AlignCenter | Self::AlignRight => Some(ExclusiveGroup::Alignment),
            Self::BulletList | Self::NumberedList | Self::Checkbox => Some(ExclusiveGroup::List),
            _ => None,
        }
    }

    pub fn character_flag(self) -> Option<CharacterFlag> {
        match self {
            Self::Bold => Some(CharacterFlag::Bold),
            Self::Italic => Some(CharacterFlag::Italic),
            Self::Underline => Some(CharacterFlag::Underline),
            Self::Strikethrough => Some(CharacterFlag::Strikethrough),
            Self::Highlight => Some(CharacterFlag::Highlight),
            _ => None,
        }
    }

    pub fn paragraph_format(self) -> Option<ParagraphFormat> {
        match self {
            Self::Heading1 => Some(ParagraphFormat::Heading1),
            Self::Heading2 => Some(ParagraphFormat::Heading2),
            Self::Heading3 => Some(ParagraphFormat::Heading3),
            Self::BulletList => Some(ParagraphFormat::BulletList),
            Self::NumberedList => Some(ParagraphFormat::NumberedList),
            Self::Checkbox => Some(ParagraphFormat::Checkbox),
            _ => None,
        }
    }

    pub fn alignment(self) -> Option<Alignment> {
        match self {
            Self::AlignLeft => Some(Alignment::Left),
            Self::AlignCenter => Some(Alignment::Center),
            Self::AlignRight => Some(Alignment::Right),
            _ => None,
        }
    }

    /// Paragraph-level formats apply to whole lines, never to a sub-range.
    pub fn is_paragraph_level(self) -> bool {
        self.character_flag().is_none()
    }
}

/// Complete format snapshot at a caret or over a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatState {
    pub paragraph_format: ParagraphFormat,
    pub alignment: Alignment,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub highlight: bool,
    pub is_quote: bool,
    /// Only meaningful when `paragraph_format` is a list kind.
    pub list_indent: u32,
    /// Only meaningful when `paragraph_format` is a list kind.
    pub list_number: u32,
    pub has_selection: bool,
    pub selection_length: usize,
}

impl FormatState {
    pub const DEFAULT: FormatState = FormatState {
        paragraph_format: ParagraphFormat::Body,
        alignment: Alignment::Left,
        bold: false,
        italic: false,
        underline: false,
        strikethrough: false,
        highlight: false,
        is_quote: false,
        list_indent: 1,
        list_number: 1,
        has_selection: false,
        selection_length: 0,
    };

    pub fn flag(&self, flag: CharacterFlag) -> bool {
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

    /// Whether a toolbar button for `format` should render as "on".
    pub fn is_active(&self, format: Format) -> bool {
        if let Some(flag) = format.character_flag() {
            return self.flag(flag);
        }
        if let Some(paragraph) = format.paragraph_format() {
            return self.paragraph_format == paragraph;
        }
        if let Some(alignment) = format.alignment() {
            return self.alignment == alignment;
        }
        format == Format::Quote && self.is_quote
    }

    /// Flag-set view. Body and left alignment are implicit and never listed.
    pub fn formats(&self) -> BTreeSet<Format> {
        let mut set: BTreeSet<Format> = CharacterFlag::ALL
            .iter()
            .filter(|flag| self.flag(**flag))
            .map(|flag| flag.format())
            .collect();
        if let Some(format) = self.paragraph_format.format() {
            set.insert(format);
        }
        match self.alignment {
            Alignment::Left => {}
            Alignment::Center => {
                set.insert(Format::AlignCenter);
            }
            Alignment::Right => {
                set.insert(Format::AlignRight);
            }
        }
        if self.is_quote {
            set.insert(Format::Quote);
        }
        set
    }

    /// Build a strict state from a flag set that has already been validated.
    ///
    /// Headings and lists live in separate exclusive groups but share the
    /// single `paragraph_format` field; a list member wins over a heading.
    pub fn from_formats(formats: &BTreeSet<Format>) -> FormatState {
        let mut state = FormatState::DEFAULT;
        for flag in CharacterFlag::ALL {
            state.set_flag(flag, formats.contains(&flag.format()));
        }
        let list = ExclusiveGroup::List
            .members()
            .iter()
            .find(|member| formats.contains(member));
        let heading = ExclusiveGroup::Heading
            .members()
            .iter()
            .find(|member| formats.contains(member));
        if let Some(paragraph) = list.or(heading).and_then(|f| f.paragraph_format()) {
            state.paragraph_format = paragraph;
        }
        state.alignment = if formats.contains(&Format::AlignCenter) {
            Alignment::Center
        } else if formats.contains(&Format::AlignRight) {
            Alignment::Right
        } else {
            Alignment::Left
        };
        state.is_quote = formats.contains(&Format::Quote);
        state
    }

    /// Copy with selection metadata replaced.
    pub fn with_selection(mut self, length: usize) -> Self {
        self.has_selection = length > 0;
        self.selection_length = length;
        self
    }
}

impl Default for FormatState {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let state = FormatState::default();
        assert_eq!(state, FormatState::DEFAULT);
        assert_eq!(state.paragraph_format, ParagraphFormat::Body);
        assert_eq!(state.alignment, Alignment::Left);
        assert!(state.formats().is_empty());
        assert!(!state.has_selection);
    }

    #[test]
    fn test_formats_roundtrip_through_flag_set() {
        let mut state = FormatState::DEFAULT;
        state.bold = true;
        state.highlight = true;
        state.paragraph_format = ParagraphFormat::NumberedList;
        state.alignment = Alignment::Right;
        state.is_quote = true;

        let formats = state.formats();
        assert!(formats.contains(&Format::Bold));
        assert!(formats.contains(&Format::NumberedList));
        assert!(formats.contains(&Format::AlignRight));
        assert!(!formats.contains(&Format::AlignLeft));

        assert_eq!(FormatState::from_formats(&formats), state);
    }

    #[test]
    fn test_list_wins_over_heading_in_strict_form() {
        let formats: BTreeSet<Format> = [Format::Heading2, Format::BulletList].into_iter().collect();
        let state = FormatState::from_formats(&formats);
        assert_eq!(state.paragraph_format, ParagraphFormat::BulletList);
    }

    #[test]
    fn test_is_active() {
        let mut state = FormatState::DEFAULT;
        assert!(state.is_active(Format::AlignLeft));
        state.alignment = Alignment::Center;
        assert!(!state.is_active(Format::AlignLeft));
        assert!(state.is_active(Format::AlignCenter));
        state.italic = true;
        assert!(state.is_active(Format::Italic));
        assert!(!state.is_active(Format::Quote));
    }

    #[test]
    fn test_group_membership() {
        assert_eq!(Format::Heading3.group(), Some(ExclusiveGroup::Heading));
        assert_eq!(Format::AlignRight.group(), Some(ExclusiveGroup::Alignment));
        assert_eq!(Format::Checkbox.group(), Some(ExclusiveGroup::List));
        assert_eq!(Format::Quote.group(), None);
        assert_eq!(Format::Bold.group(), None);
        for group in ExclusiveGroup::ALL {
            for member in group.members() {
                assert_eq!(member.group(), Some(group));
            }
        }
    }

    #[test]
    fn test_paragraph_format_mappings() {
        assert_eq!(ParagraphFormat::Heading2.font_role(), FontRole::Heading2);
        assert_eq!(ParagraphFormat::Checkbox.font_role(), FontRole::Body);
        assert_eq!(ParagraphFormat::from_font_role(FontRole::Title), ParagraphFormat::Body);
        assert_eq!(
            ParagraphFormat::from_list_kind(ListKind::Ordered),
            ParagraphFormat::NumberedList
        );
        assert!(ParagraphFormat::BulletList.is_list());
        assert!(!ParagraphFormat::Heading1.is_list());
    }
}
