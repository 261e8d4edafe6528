//! Mutual exclusion between conflicting formats.
//!
//! Three groups never hold more than one member:
//!
//! | Group     | Members (priority order)                 | Default      |
//! |-----------|------------------------------------------|--------------|
//! | Heading   | heading1 > heading2 > heading3           | body         |
//! | Alignment | center / right, first encountered wins   | left         |
//! | List      | checkbox > bullet list > numbered list   | no list      |
//!
//! `validate` repairs a raw flag set. `apply`, `remove` and `toggle` are the
//! strict-state counterparts used when a user changes the format.

use std::collections::BTreeSet;

use crate::format::{Alignment, ExclusiveGroup, Format, FormatState, ParagraphFormat};

#[derive(Debug, Clone, Copy, Default)]
pub struct MutualExclusionResolver;

impl MutualExclusionResolver {
    pub fn new() -> Self {
        Self
    }

    /// Drop conflicting members from a raw flag set.
    ///
    /// Headings and lists resolve by fixed priority. Alignment keeps the first
    /// non-left member in iteration order; `AlignLeft` is the implicit default
    /// and is never kept as a positive flag.
    pub fn validate<I>(&self, formats: I) -> BTreeSet<Format>
    where
        I: IntoIterator<Item = Format>,
    {
        let mut validated = BTreeSet::new();
        let mut grouped = BTreeSet::new();
        let mut alignment = None;

        let mut dropped = 0usize;

        for format in formats {
            match format.group() {
                None => {
                    validated.insert(format);
                }
                Some(ExclusiveGroup::Alignment) => {
                    if format == Format::AlignLeft {
                        continue;
                    }
                    match alignment {
                        None => alignment = Some(format),
                        Some(kept) if kept != format => dropped += 1,
                        Some(_) => {}
                    }
                }
                Some(_) => {
                    grouped.insert(format);
                }
            }
        }

        for group in [ExclusiveGroup::Heading, ExclusiveGroup::List] {
            let present: Vec<Format> = group
                .members()
                .iter()
                .copied()
                .filter(|member| grouped.contains(member))
                .collect();
            if let Some(winner) = present.first() {
                validated.insert(*winner);
                dropped += present.len() - 1;
            }
        }
        if let Some(alignment) = alignment {
            validated.insert(alignment);
        }

        if dropped > 0 {
            log::trace!("validate: dropped {dropped} conflicting format(s)");
        }
        validated
    }

    /// True when no exclusive group holds more than one member and no
    /// implicit default is stored as a flag.
    pub fn is_valid(&self, formats: &BTreeSet<Format>) -> bool {
        if formats.contains(&Format::AlignLeft) {
            return false;
        }
        ExclusiveGroup::ALL.iter().all(|group| {
            group
                .members()
                .iter()
                .filter(|member| formats.contains(member))
                .count()
                <= 1
        })
    }

    /// Turn `format` on. Entering an exclusive group replaces whichever member
    /// was active before.
    pub fn apply(&self, state: &FormatState, format: Format) -> FormatState {
        let mut next = *state;
        if let Some(flag) = format.character_flag() {
            next.set_flag(flag, true);
        } else if let Some(paragraph) = format.paragraph_format() {
            if paragraph.is_list() && !state.paragraph_format.is_list() {
                next.list_indent = next.list_indent.max(1);
                next.list_number = 1;
            }
            next.paragraph_format = paragraph;
        } else if let Some(alignment) = format.alignment() {
            next.alignment = alignment;
        } else if format == Format::Quote {
            next.is_quote = true;
        }
        next
    }

    /// Turn `format` off. Removing the active member of an exclusive group
    /// resets the group to its default; removing an inactive member is a no-op.
    pub fn remove(&self, state: &FormatState, format: Format) -> FormatState {
        let mut next = *state;
        if let Some(flag) = format.character_flag() {
            next.set_flag(flag, false);
        } else if let Some(paragraph) = format.paragraph_format() {
            if state.paragraph_format == paragraph {
                next.paragraph_format = ParagraphFormat::Body;
            }
        } else if let Some(alignment) = format.alignment() {
            if state.alignment == alignment {
                next.alignment = Alignment::Left;
            }
        } else if format == Format::Quote {
            next.is_quote = false;
        }
        next
    }

    /// Flip `format`. Left alignment cannot be toggled off, only replaced.
    pub fn toggle(&self, state: &FormatState, format: Format) -> FormatState {
        if state.is_active(format) && format != Format::AlignLeft {
            self.remove(state, format)
        } else {
            self.apply(state, format)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> MutualExclusionResolver {
        MutualExclusionResolver::new()
    }

    #[test]
    fn test_validate_heading_priority() {
        let out = resolver().validate([Format::Heading3, Format::Heading1, Format::Heading2]);
        assert!(out.contains(&Format::Heading1));
        assert!(!out.contains(&Format::Heading2));
        assert!(!out.contains(&Format::Heading3));
    }

    #[test]
    fn test_validate_list_priority() {
        let out = resolver().validate([Format::NumberedList, Format::BulletList, Format::Checkbox]);
        assert_eq!(out.into_iter().collect::<Vec<_>>(), vec![Format::Checkbox]);

        let out = resolver().validate([Format::NumberedList, Format::BulletList]);
        assert_eq!(out.into_iter().collect::<Vec<_>>(), vec![Format::BulletList]);
    }

    #[test]
    fn test_validate_alignment_first_encountered() {
        let out = resolver().validate([Format::AlignRight, Format::AlignCenter]);
        assert!(out.contains(&Format::AlignRight));
        assert!(!out.contains(&Format::AlignCenter));

        let out = resolver().validate([Format::AlignLeft, Format::AlignCenter]);
        assert!(out.contains(&Format::AlignCenter));
        assert!(!out.contains(&Format::AlignLeft));

        let out = resolver().validate([Format::AlignLeft]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_validate_keeps_independent_flags() {
        let out = resolver().validate([
            Format::Bold,
            Format::Italic,
            Format::Quote,
            Format::Heading2,
            Format::BulletList,
        ]);
        assert_eq!(out.len(), 5);
        assert!(resolver().is_valid(&out));
    }

    #[test]
    fn test_validate_output_always_valid() {
        let all = [
            Format::Bold,
            Format::Italic,
            Format::Underline,
            Format::Strikethrough,
            Format::Highlight,
            Format::Heading1,
            Format::Heading2,
            Format::Heading3,
            Format::AlignLeft,
            Format::AlignCenter,
            Format::AlignRight,
            Format::BulletList,
            Format::NumberedList,
            Format::Checkbox,
            Format::Quote,
        ];
        // Every subset of the 15 formats, in two iteration orders.
        for mask in 0u32..(1 << all.len()) {
            let subset: Vec<Format> = all
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, f)| *f)
                .collect();
            assert!(resolver().is_valid(&resolver().validate(subset.iter().copied())));
            assert!(resolver().is_valid(&resolver().validate(subset.iter().rev().copied())));
        }
    }

    #[test]
    fn test_is_valid_rejects_conflicts() {
        let conflicting: BTreeSet<Format> = [Format::Heading1, Format::Heading2].into_iter().collect();
        assert!(!resolver().is_valid(&conflicting));
        let left: BTreeSet<Format> = [Format::AlignLeft].into_iter().collect();
        assert!(!resolver().is_valid(&left));
    }

    #[test]
    fn test_apply_replaces_group_member() {
        let state = resolver().apply(&FormatState::DEFAULT, Format::Heading1);
        assert_eq!(state.paragraph_format, ParagraphFormat::Heading1);
        let state = resolver().apply(&state, Format::Heading3);
        assert_eq!(state.paragraph_format, ParagraphFormat::Heading3);

        let state = resolver().apply(&state, Format::AlignCenter);
        let state = resolver().apply(&state, Format::AlignRight);
        assert_eq!(state.alignment, Alignment::Right);
    }

    #[test]
    fn test_heading_then_list() {
        let heading = resolver().apply(&FormatState::DEFAULT, Format::Heading1);
        let list = resolver().apply(&heading, Format::BulletList);
        assert_eq!(list.paragraph_format, ParagraphFormat::BulletList);
        assert!(!list.is_active(Format::Heading1));
    }

    #[test]
    fn test_toggle_off_resets_group_default() {
        let state = resolver().toggle(&FormatState::DEFAULT, Format::Checkbox);
        assert_eq!(state.paragraph_format, ParagraphFormat::Checkbox);
        let state = resolver().toggle(&state, Format::Checkbox);
        assert_eq!(state.paragraph_format, ParagraphFormat::Body);

        let state = resolver().toggle(&state, Format::AlignCenter);
        let state = resolver().toggle(&state, Format::AlignCenter);
        assert_eq!(state.alignment, Alignment::Left);

        // Left alignment stays put.
        let state = resolver().toggle(&state, Format::AlignLeft);
        assert_eq!(state.alignment, Alignment::Left);
    }

    #[test]
    fn test_toggle_character_flags_independent() {
        let state = resolver().toggle(&FormatState::DEFAULT, Format::Bold);
        let state = resolver().toggle(&state, Format::Underline);
        assert!(state.bold && state.underline);
        let state = resolver().toggle(&state, Format::Bold);
        assert!(!state.bold && state.underline);
    }

    #[test]
    fn test_remove_inactive_member_is_noop() {
        let state = resolver().apply(&FormatState::DEFAULT, Format::Heading2);
        let after = resolver().remove(&state, Format::Heading1);
        assert_eq!(after, state);
    }

    #[test]
    fn test_entering_list_resets_number() {
        let mut state = FormatState::DEFAULT;
        state.list_number = 7;
        let state = resolver().apply(&state, Format::NumberedList);
        assert_eq!(state.list_number, 1);
        assert_eq!(state.list_indent, 1);
    }
}
