//! Typing attributes: the format the next inserted character receives.
//!
//! `sync` is a pure mapping from `FormatState` to `TypingAttributes`. A live
//! session calls it after every detection pass (caret moves included) and
//! hands the result to the text input layer; skipping a pass makes freshly
//! typed text fall back to default formatting.
//!
//! Italic is rendered as a synthetic oblique skew rather than an italic face,
//! so CJK and Latin glyphs lean the same way.

use crate::document::{AttributeSet, FontRole, RichTextDocument};
use crate::format::{Alignment, CharacterFlag, FormatState, ParagraphFormat};

pub const BODY_FONT_SIZE: f32 = 14.0;
pub const HEADING1_FONT_SIZE: f32 = 24.0;
pub const HEADING2_FONT_SIZE: f32 = 20.0;
pub const HEADING3_FONT_SIZE: f32 = 17.0;
pub const TITLE_FONT_SIZE: f32 = 28.0;

/// Horizontal skew applied to simulate italics.
pub const OBLIQUE_SKEW: f32 = 0.2;

/// Head indent per list level, in points.
pub const LIST_INDENT_STEP: f32 = 20.0;

/// Extra head indent for quoted paragraphs, in points.
pub const QUOTE_INDENT: f32 = 12.0;

/// RGBA color, components in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Background used for highlighted text.
    pub const HIGHLIGHT: Color = Color::rgba(1.0, 0.93, 0.55, 1.0);

    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Regular,
    Semibold,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontSpec {
    pub size: f32,
    pub weight: FontWeight,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParagraphStyle {
    pub alignment: Alignment,
    pub head_indent: f32,
    pub quote: bool,
}

impl Default for ParagraphStyle {
    fn default() -> Self {
        Self {
            alignment: Alignment::Left,
            head_indent: 0.0,
            quote: false,
        }
    }
}

/// Attributes the text input layer attaches to the next typed character.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypingAttributes {
    pub font: FontSpec,
    /// Skew factor when italic is on.
    pub oblique: Option<f32>,
    pub underline: bool,
    pub strikethrough: bool,
    pub background: Option<Color>,
    pub paragraph: ParagraphStyle,
    pub is_title: bool,
}

impl Default for TypingAttributes {
    fn default() -> Self {
        TypingAttributeSynchronizer::new().sync(&FormatState::DEFAULT)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TypingAttributeSynchronizer;

impl TypingAttributeSynchronizer {
    pub fn new() -> Self {
        Self
    }

    pub fn font_size(paragraph: ParagraphFormat) -> f32 {
        match paragraph {
            ParagraphFormat::Heading1 => HEADING1_FONT_SIZE,
            ParagraphFormat::Heading2 => HEADING2_FONT_SIZE,
            ParagraphFormat::Heading3 => HEADING3_FONT_SIZE,
            _ => BODY_FONT_SIZE,
        }
    }

    pub fn sync(&self, state: &FormatState) -> TypingAttributes {
        let weight = if state.bold {
            FontWeight::Bold
        } else if state.paragraph_format.is_heading() {
            FontWeight::Semibold
        } else {
            FontWeight::Regular
        };

        let mut head_indent = 0.0;
        if state.paragraph_format.is_list() {
            head_indent += LIST_INDENT_STEP * state.list_indent.max(1) as f32;
        }
        if state.is_quote {
            head_indent += QUOTE_INDENT;
        }

        TypingAttributes {
            font: FontSpec {
                size: Self::font_size(state.paragraph_format),
                weight,
            },
            oblique: state.italic.then_some(OBLIQUE_SKEW),
            underline: state.underline,
            strikethrough: state.strikethrough,
            background: state.highlight.then_some(Color::HIGHLIGHT),
            paragraph: ParagraphStyle {
                alignment: state.alignment,
                head_indent,
                quote: state.is_quote,
            },
            is_title: false,
        }
    }

    /// Fixed style for the note title.
    pub fn title_style(&self) -> TypingAttributes {
        TypingAttributes {
            font: FontSpec {
                size: TITLE_FONT_SIZE,
                weight: FontWeight::Bold,
            },
            oblique: None,
            underline: false,
            strikethrough: false,
            background: None,
            paragraph: ParagraphStyle::default(),
            is_title: true,
        }
    }

    /// Whether the character before `caret` belongs to a title run. A caret
    /// right after the title's own line break starts the first body line.
    pub fn is_title_at(&self, document: &RichTextDocument, caret: usize) -> bool {
        if caret == 0 {
            return false;
        }
        let before = caret.min(document.len()).saturating_sub(1);
        document.char_at(before).is_some_and(|ch| ch != '\n')
            && document
                .attributes_at(before)
                .is_some_and(|attributes| attributes.font_role == FontRole::Title)
    }

    /// Like `sync`, but a caret inside the title gets the title style and
    /// ignores `state`.
    pub fn sync_at(&self, document: &RichTextDocument, caret: usize, state: &FormatState) -> TypingAttributes {
        if self.is_title_at(document, caret) {
            self.title_style()
        } else {
            self.sync(state)
        }
    }

    /// Document attributes stamped on text typed under `state`.
    pub fn to_attribute_set(&self, state: &FormatState) -> AttributeSet {
        let mut attributes = AttributeSet {
            font_role: state.paragraph_format.font_role(),
            alignment: state.alignment,
            list_kind: state.paragraph_format.list_kind(),
            quote: state.is_quote,
            ..AttributeSet::default()
        };
        for flag in CharacterFlag::ALL {
            attributes.set_flag(flag, state.flag(flag));
        }
        if attributes.list_kind.is_some() {
            attributes.list_indent = state.list_indent.max(1);
            attributes.list_number = state.list_number.max(1);
        }
        attributes
    }

    /// Title attributes for typed text while the caret sits in the title.
    pub fn title_attribute_set(&self) -> AttributeSet {
        AttributeSet::default().with_font_role(FontRole::Title)
    }
}
