//! # scribe-core — Rich-text model and format detection for Scribe
//!
//! Pure, synchronous building blocks. Nothing here owns a timer or a thread;
//! `scribe-sync` wires these pieces into a live editor session.
//!
//! ## Pipeline
//!
//! ```text
//! caret / selection
//!       │
//!       ▼
//! ┌────────────────┐   raw flags   ┌─────────────────────────┐
//! │ FormatDetector │ ────────────► │ MutualExclusionResolver │
//! └────────────────┘               └────────────┬────────────┘
//!                                               │ FormatState
//!                                               ▼
//!                                ┌─────────────────────────────┐
//!                                │ TypingAttributeSynchronizer │ ──► next typed char
//!                                └─────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`document`] — run-length `RichTextDocument` and its closed `AttributeSet`
//! - [`format`] — `Format`, `FormatState` and the exclusive groups
//! - [`detect`] — caret and range detection with mixed-state ratios
//! - [`exclusion`] — conflict resolution between headings, alignments, lists
//! - [`typing`] — `FormatState` → typing attributes
//! - [`codec`] — `Codec` trait with JSON and bincode implementations

pub mod codec;
pub mod detect;
pub mod document;
pub mod exclusion;
pub mod format;
pub mod typing;

// Re-exports for convenience
pub use codec::{BincodeCodec, Codec, CodecError, JsonCodec};
pub use detect::{FormatDetection, FormatDetector, Selection};
pub use document::{
    Attachment, AttributeSet, FontRole, ListKind, RichTextDocument, Run, ATTACHMENT_CHAR,
};
pub use exclusion::MutualExclusionResolver;
pub use format::{Alignment, CharacterFlag, ExclusiveGroup, Format, FormatState, ParagraphFormat};
pub use typing::{
    Color, FontSpec, FontWeight, ParagraphStyle, TypingAttributeSynchronizer, TypingAttributes,
};
