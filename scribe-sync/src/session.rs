//! One open note: document, selection, format state and autosave.
//!
//! Every caret move and edit runs the same synchronous pipeline:
//!
//! ```text
//! detect ─► validate ─► sync typing attributes ─► surface ─► publish_from(id)
//! ```
//!
//! Format commands go through the resolver first, mutate the document when
//! there is something to mutate, and then re-detect. A caret with a character
//! format only changes what gets typed next; that override lives in `state`
//! until the caret moves.

use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use scribe_core::{
    Attachment, AttributeSet, CharacterFlag, Codec, CodecError, FontRole, Format, FormatDetection,
    FormatDetector, FormatState, MutualExclusionResolver, RichTextDocument, Selection,
    TypingAttributeSynchronizer, TypingAttributes,
};
use thiserror::Error;
use uuid::Uuid;

use crate::autosave::{AutoSaveScheduler, FireOutcome, SaveStatus};
use crate::backend::SaveBackend;
use crate::broadcaster::{FormatStateBroadcaster, ProviderId};
use crate::change_tracker::{ChangeTracker, EditKind};
use crate::config::SessionConfig;
use crate::surface::TextInputSurface;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("Document has unsaved changes (version {version})")]
    UnsavedChanges { version: u64 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub detections: u64,
    pub edits: u64,
    pub format_changes: u64,
    /// Format changes whose re-detected state disagreed with the resolver.
    pub inconsistencies: u64,
}

fn read(document: &RwLock<RichTextDocument>) -> RwLockReadGuard<'_, RichTextDocument> {
    document.read().unwrap_or_else(PoisonError::into_inner)
}

fn write(document: &RwLock<RichTextDocument>) -> RwLockWriteGuard<'_, RichTextDocument> {
    document.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock(tracker: &Mutex<ChangeTracker>) -> MutexGuard<'_, ChangeTracker> {
    tracker.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Write the paragraph part of `state` into one run. Title runs keep their
/// role. Callers bump `list_number` from line to line.
fn apply_paragraph(attributes: &mut AttributeSet, state: &FormatState) {
    if attributes.font_role == FontRole::Title {
        return;
    }
    attributes.font_role = state.paragraph_format.font_role();
    attributes.list_kind = state.paragraph_format.list_kind();
    if attributes.list_kind.is_some() {
        attributes.list_indent = state.list_indent.max(1);
        attributes.list_number = state.list_number.max(1);
    } else {
        attributes.list_indent = 1;
        attributes.list_number = 1;
    }
    attributes.alignment = state.alignment;
    attributes.quote = state.is_quote;
}

pub struct EditorSession {
    id: ProviderId,
    config: SessionConfig,
    document: Arc<RwLock<RichTextDocument>>,
    tracker: Arc<Mutex<ChangeTracker>>,
    autosave: AutoSaveScheduler,
    broadcaster: FormatStateBroadcaster,
    codec: Arc<dyn Codec>,
    detector: FormatDetector,
    resolver: MutualExclusionResolver,
    typing: TypingAttributeSynchronizer,
    surface: Option<Box<dyn TextInputSurface>>,
    selection: Selection,
    detection: FormatDetection,
    state: FormatState,
    typing_attributes: TypingAttributes,
    stats: SessionStats,
}

impl EditorSession {
    pub fn new(
        document: RichTextDocument,
        codec: Arc<dyn Codec>,
        backend: Arc<dyn SaveBackend>,
        broadcaster: FormatStateBroadcaster,
        config: SessionConfig,
    ) -> Self {
        let detector = FormatDetector::new();
        let detection = detector.detect(&document, &Selection::default());
        let document_id = document.id();
        let document = Arc::new(RwLock::new(document));
        let tracker = Arc::new(Mutex::new(ChangeTracker::new()));
        let autosave = AutoSaveScheduler::new(
            config.autosave_delay,
            Arc::clone(&tracker),
            Arc::clone(&document),
            Arc::clone(&codec),
            backend,
        );

        let mut session = Self {
            id: Uuid::new_v4(),
            config,
            document,
            tracker,
            autosave,
            broadcaster,
            codec,
            detector,
            resolver: MutualExclusionResolver::new(),
            typing: TypingAttributeSynchronizer::new(),
            surface: None,
            selection: Selection::default(),
            state: detection.state,
            detection,
            typing_attributes: TypingAttributes::default(),
            stats: SessionStats::default(),
        };
        session.refresh();
        log::info!("Session {} opened document {document_id}", session.id);
        session
    }

    pub fn id(&self) -> ProviderId {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Attach the text input layer; it receives the current attributes at once.
    pub fn set_surface(&mut self, surface: Box<dyn TextInputSurface>) {
        self.surface = Some(surface);
        self.push_typing_attributes();
    }

    // ---- Document access ----

    pub fn with_document<R>(&self, f: impl FnOnce(&RichTextDocument) -> R) -> R {
        f(&read(&self.document))
    }

    pub fn snapshot(&self) -> RichTextDocument {
        read(&self.document).clone()
    }

    pub fn text(&self) -> String {
        read(&self.document).text()
    }

    pub fn len(&self) -> usize {
        read(&self.document).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the document. Refuses while the current one has unsaved edits;
    /// use `switch_document` to save first.
    pub fn load_document(&mut self, document: RichTextDocument) -> Result<(), SessionError> {
        if let Some(version) = self.unsaved_version() {
            return Err(SessionError::UnsavedChanges { version });
        }
        self.autosave.begin_new_document();
        let id = document.id();
        {
            let mut tracker = lock(&self.tracker);
            tracker.reset();
            // Loads take the normal edit path; the guard keeps them uncounted.
            let target = &self.document;
            tracker.perform_programmatic_change(|tracker| {
                *write(target) = document;
                tracker.record_edit(EditKind::Text);
            });
        }
        self.selection = Selection::default();
        self.refresh();
        log::info!("Session {} loaded document {id} ({} chars)", self.id, self.len());
        Ok(())
    }

    pub fn load_bytes(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        let document = self.codec.decode(bytes)?;
        self.load_document(document)
    }

    /// Save the current document, wait for it, then load `document`.
    pub async fn switch_document(&mut self, document: RichTextDocument) -> Result<(), SessionError> {
        self.close().await;
        self.load_document(document)
    }

    // ---- Selection ----

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Move the caret or selection. Drops any caret-only typing override.
    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
        self.refresh();
    }

    // ---- Editing ----

    /// Type `text` over the selection using the current typing attributes.
    pub fn insert_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let attributes = self.typed_attribute_set();
        let caret = {
            let mut document = write(&self.document);
            let range = document.clamp_range(self.selection.start()..self.selection.end());
            document.delete(range.clone());
            document.insert(range.start, text, attributes);
            range.start + text.chars().count()
        };
        self.finish_edit(EditKind::Text, Selection::Caret(caret));
    }

    pub fn insert_attachment(&mut self, attachment: Attachment) {
        let attributes = self.typed_attribute_set();
        let caret = {
            let mut document = write(&self.document);
            let range = document.clamp_range(self.selection.start()..self.selection.end());
            document.delete(range.clone());
            document.insert_attachment(range.start, attachment, attributes);
            range.start + 1
        };
        self.finish_edit(EditKind::Attachment, Selection::Caret(caret));
    }

    /// Backspace: delete the selection, or the character before the caret.
    pub fn delete_backward(&mut self) -> String {
        let range = match &self.selection {
            Selection::Caret(0) => return String::new(),
            Selection::Caret(position) => position - 1..*position,
            Selection::Range(range) => range.clone(),
        };
        self.delete_range(range)
    }

    pub fn delete_range(&mut self, range: Range<usize>) -> String {
        let (start, removed) = {
            let mut document = write(&self.document);
            let range = document.clamp_range(range);
            (range.start, document.delete(range))
        };
        if removed.is_empty() {
            return removed;
        }
        self.finish_edit(EditKind::Text, Selection::Caret(start));
        removed
    }

    fn typed_attribute_set(&self) -> AttributeSet {
        if self.typing_attributes.is_title {
            self.typing.title_attribute_set()
        } else {
            self.typing.to_attribute_set(&self.state)
        }
    }

    fn finish_edit(&mut self, kind: EditKind, selection: Selection) {
        self.record_edit(kind);
        self.selection = selection;
        self.refresh();
    }

    fn record_edit(&mut self, kind: EditKind) {
        self.stats.edits += 1;
        let recorded = lock(&self.tracker).record_edit(kind);
        if recorded {
            self.autosave.schedule_auto_save();
        }
    }

    // ---- Formatting ----

    pub fn format_state(&self) -> FormatState {
        self.state
    }

    pub fn detection(&self) -> &FormatDetection {
        &self.detection
    }

    pub fn typing_attributes(&self) -> &TypingAttributes {
        &self.typing_attributes
    }

    /// Turn `format` on for the selection (or for typing at the caret).
    pub fn apply_format(&mut self, format: Format) -> FormatState {
        let expected = self.resolver.apply(&self.state, format);
        self.change_format(format, expected)
    }

    /// Flip `format` the way a toolbar button does.
    pub fn toggle_format(&mut self, format: Format) -> FormatState {
        let expected = self.resolver.toggle(&self.state, format);
        self.change_format(format, expected)
    }

    fn change_format(&mut self, format: Format, expected: FormatState) -> FormatState {
        if self.selection.is_caret() && expected == self.state {
            return self.state;
        }
        if format.is_paragraph_level() && self.selection_starts_in_title() {
            log::debug!("{format:?} ignored inside the title");
            return self.state;
        }
        self.stats.format_changes += 1;

        let range = self.selection.start()..self.selection.end();
        let mutated = {
            let mut document = write(&self.document);
            if format.is_paragraph_level() {
                let lines = document.line_ranges_covering(range.clone());
                if lines.iter().all(|line| line.is_empty()) {
                    false
                } else {
                    let mut line_state = expected;
                    for line in lines.iter().filter(|line| !line.is_empty()) {
                        document.update_attributes(line.clone(), |attributes| {
                            apply_paragraph(attributes, &line_state)
                        });
                        line_state.list_number = line_state.list_number.max(1) + 1;
                    }
                    let removed = Self::strip_stale_markers(&mut document, &lines, &expected);
                    if !removed.is_empty() {
                        let shift = |offset: usize| offset - removed.iter().filter(|r| **r < offset).count();
                        self.selection = Selection::new(shift(range.start), shift(range.end));
                    }
                    true
                }
            } else if let (Some(flag), false) = (format.character_flag(), range.is_empty()) {
                let on = expected.flag(flag);
                document.update_attributes(range.clone(), |attributes| attributes.set_flag(flag, on));
                true
            } else {
                false
            }
        };

        if !mutated {
            // Nothing in the document to change: the format applies to what
            // is typed next.
            self.state = expected;
            self.sync_typing();
            return self.state;
        }

        self.record_edit(EditKind::Format);
        self.verify_format(format, expected);
        self.state
    }

    /// Remove list-marker attachments at the head of `lines` that no longer
    /// match the paragraph's list kind. Returns the removed offsets.
    fn strip_stale_markers(
        document: &mut RichTextDocument,
        lines: &[Range<usize>],
        expected: &FormatState,
    ) -> Vec<usize> {
        let wanted = expected.paragraph_format.list_kind();
        let mut removed = Vec::new();
        for line in lines.iter().rev().filter(|line| !line.is_empty()) {
            let stale = document
                .attributes_at(line.start)
                .and_then(|attributes| attributes.attachment.as_ref())
                .and_then(Attachment::list_kind)
                .is_some_and(|kind| Some(kind) != wanted);
            if stale {
                document.delete(line.start..line.start + 1);
                removed.push(line.start);
            }
        }
        removed
    }

    /// Re-detect after a document-mutating format change and compare with
    /// what the resolver promised.
    fn verify_format(&mut self, format: Format, expected: FormatState) {
        let (observed, caret_at_line_start) = {
            let document = read(&self.document);
            self.selection = self.selection.clamped(document.len());
            let at_line_start = match self.selection {
                Selection::Caret(position) => position == 0 || document.char_at(position - 1) == Some('\n'),
                Selection::Range(_) => false,
            };
            (self.detector.detect(&document, &self.selection), at_line_start)
        };
        self.stats.detections += 1;

        // A caret at a line start reads the previous line, but the format was
        // written to the caret's own line.
        if caret_at_line_start && format.is_paragraph_level() {
            self.detection = observed;
            self.state = expected;
            self.sync_typing();
            return;
        }

        if self.config.verify_after_apply && !Self::agrees(format, &expected, &observed.state) {
            self.stats.inconsistencies += 1;
            log::warn!(
                "Format state mismatch after {format:?}: expected {:?}, detected {:?}",
                expected.formats(),
                observed.state.formats()
            );
            self.refresh();
            return;
        }

        let mut state = observed.state;
        if self.selection.is_caret() {
            for flag in CharacterFlag::ALL {
                state.set_flag(flag, expected.flag(flag));
            }
        }
        self.detection = observed;
        self.state = state;
        self.sync_typing();
    }

    fn agrees(format: Format, expected: &FormatState, observed: &FormatState) -> bool {
        match format.character_flag() {
            Some(flag) => observed.flag(flag) == expected.flag(flag),
            None => {
                observed.paragraph_format == expected.paragraph_format
                    && observed.alignment == expected.alignment
                    && observed.is_quote == expected.is_quote
            }
        }
    }

    /// Whether the line holding the selection start is the title line. The
    /// caret right after the title's line break is already on the next line.
    fn selection_starts_in_title(&self) -> bool {
        let document = read(&self.document);
        let line = document.line_range(self.selection.start());
        document
            .attributes_at(line.start)
            .is_some_and(|attributes| attributes.font_role == FontRole::Title)
    }

    // ---- Pipeline ----

    /// Full detection at the current selection, then typing sync and publish.
    fn refresh(&mut self) {
        {
            let document = read(&self.document);
            self.selection = self.selection.clamped(document.len());
            self.detection = self.detector.detect(&document, &self.selection);
        }
        self.state = self.detection.state;
        self.stats.detections += 1;
        log::trace!("Detected {:?} at {:?}", self.state.formats(), self.selection);
        self.sync_typing();
    }

    fn sync_typing(&mut self) {
        let probe = match &self.selection {
            Selection::Caret(position) => *position,
            Selection::Range(_) => self.selection.start() + 1,
        };
        self.typing_attributes = self.typing.sync_at(&read(&self.document), probe, &self.state);
        self.push_typing_attributes();
        self.broadcaster.publish_from(self.id, self.state);
    }

    fn push_typing_attributes(&mut self) {
        if let Some(surface) = self.surface.as_mut() {
            surface.set_typing_attributes(&self.typing_attributes);
        }
    }

    // ---- Toolbar focus ----

    /// Become the editor that drives the toolbar.
    pub fn focus(&self) {
        self.broadcaster.set_active_provider(self.id, self.state);
    }

    pub fn resign_focus(&self) -> bool {
        self.broadcaster.resign_active_provider(self.id)
    }

    pub fn is_focused(&self) -> bool {
        self.broadcaster.active_provider() == Some(self.id)
    }

    pub fn broadcaster(&self) -> &FormatStateBroadcaster {
        &self.broadcaster
    }

    // ---- Saving ----

    pub fn needs_save(&self) -> bool {
        lock(&self.tracker).needs_save()
    }

    pub fn version(&self) -> u64 {
        lock(&self.tracker).version()
    }

    pub fn change_tracker(&self) -> ChangeTracker {
        lock(&self.tracker).clone()
    }

    pub fn save_status(&self) -> SaveStatus {
        self.autosave.status()
    }

    pub fn save_now(&self) -> FireOutcome {
        self.autosave.save_immediately()
    }

    pub fn autosave(&self) -> &AutoSaveScheduler {
        &self.autosave
    }

    /// Save whatever is unsaved and wait for storage to settle.
    pub async fn close(&self) -> SaveStatus {
        self.autosave.save_immediately();
        self.autosave.wait_idle().await;
        let status = self.autosave.status();
        if status != SaveStatus::Saved {
            log::warn!("Session {} closed with status {status:?}", self.id);
        }
        status
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    fn unsaved_version(&self) -> Option<u64> {
        let tracker = lock(&self.tracker);
        tracker.needs_save().then(|| tracker.version())
    }
}

impl Drop for EditorSession {
    fn drop(&mut self) {
        if self.needs_save() {
            // The spawned save holds its own handles and outlives the session.
            self.autosave.save_immediately();
        }
        self.resign_focus();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::surface::RecordingSurface;
    use scribe_core::{Alignment, JsonCodec, ListKind, ParagraphFormat, Run};
    use std::time::Duration;

    fn session(document: RichTextDocument) -> (EditorSession, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let session = EditorSession::new(
            document,
            Arc::new(JsonCodec),
            backend.clone(),
            FormatStateBroadcaster::new(Duration::from_millis(50)),
            SessionConfig::default(),
        );
        (session, backend)
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_session_is_clean() {
        let (session, _) = session(RichTextDocument::plain("Hello"));
        assert!(!session.needs_save());
        assert_eq!(session.format_state(), FormatState::DEFAULT);
        assert_eq!(session.save_status(), SaveStatus::Saved);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heading_then_list_on_hello() {
        let (mut session, _) = session(RichTextDocument::plain("Hello"));
        session.set_selection(Selection::Caret(5));

        let state = session.apply_format(Format::Heading1);
        assert_eq!(state.paragraph_format, ParagraphFormat::Heading1);
        assert_eq!(
            session.with_document(|doc| doc.attributes_at(0).unwrap().font_role),
            FontRole::Heading1
        );

        let state = session.apply_format(Format::BulletList);
        assert_eq!(state.paragraph_format, ParagraphFormat::BulletList);
        let attributes = session.with_document(|doc| doc.attributes_at(4).unwrap().clone());
        assert_eq!(attributes.font_role, FontRole::Body);
        assert_eq!(attributes.list_kind, Some(ListKind::Bullet));
        assert_eq!(session.stats().inconsistencies, 0);
        assert!(session.needs_save());
    }

    #[tokio::test(start_paused = true)]
    async fn test_caret_bold_affects_typing_only() {
        let (mut session, _) = session(RichTextDocument::plain("ab"));
        session.set_selection(Selection::Caret(2));
        let version = session.version();

        session.toggle_format(Format::Bold);
        assert!(session.format_state().bold);
        assert_eq!(session.version(), version, "no document change");
        assert_eq!(session.typing_attributes().font.weight, scribe_core::FontWeight::Bold);

        session.insert_text("c");
        assert!(session.with_document(|doc| doc.attributes_at(2).unwrap().bold));
        assert!(!session.with_document(|doc| doc.attributes_at(1).unwrap().bold));
        assert!(session.format_state().bold);

        // Moving the caret re-detects from the document.
        session.set_selection(Selection::Caret(1));
        assert!(!session.format_state().bold);
    }

    #[tokio::test(start_paused = true)]
    async fn test_range_toggle_writes_characters() {
        let (mut session, _) = session(RichTextDocument::plain("hello world"));
        session.set_selection(Selection::new(0, 5));
        session.toggle_format(Format::Italic);

        assert!(session.detection().ratio(CharacterFlag::Italic) == 1.0);
        session.set_selection(Selection::new(0, 10));
        assert!(session.detection().is_mixed(CharacterFlag::Italic));
        assert!(session.format_state().italic);
    }

    #[tokio::test(start_paused = true)]
    async fn test_alignment_replaces_previous() {
        let (mut session, _) = session(RichTextDocument::plain("line"));
        session.set_selection(Selection::Caret(2));
        session.apply_format(Format::AlignCenter);
        let state = session.apply_format(Format::AlignRight);
        assert_eq!(state.alignment, Alignment::Right);
        assert_eq!(
            session.with_document(|doc| doc.attributes_at(0).unwrap().alignment),
            Alignment::Right
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_leaving_checkbox_list_strips_marker() {
        let (mut session, _) = session(RichTextDocument::new());
        session.apply_format(Format::Checkbox);
        session.insert_attachment(Attachment::Checkbox { checked: false });
        session.insert_text("milk");
        assert_eq!(session.format_state().paragraph_format, ParagraphFormat::Checkbox);

        let state = session.toggle_format(Format::Checkbox);
        assert_eq!(state.paragraph_format, ParagraphFormat::Body);
        assert_eq!(session.text(), "milk");
        assert_eq!(session.selection(), &Selection::Caret(4));
        assert_eq!(session.stats().inconsistencies, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heading_at_line_start_follows_typing() {
        let (mut session, _) = session(RichTextDocument::plain("first\n"));
        session.set_selection(Selection::Caret(6));
        let state = session.apply_format(Format::Heading2);
        assert_eq!(state.paragraph_format, ParagraphFormat::Heading2);

        session.insert_text("Second");
        assert_eq!(
            session.with_document(|doc| doc.attributes_at(7).unwrap().font_role),
            FontRole::Heading2
        );
        assert_eq!(
            session.with_document(|doc| doc.attributes_at(0).unwrap().font_role),
            FontRole::Body
        );
        assert_eq!(session.format_state().paragraph_format, ParagraphFormat::Heading2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_title_ignores_paragraph_formats() {
        let doc = RichTextDocument::from_runs([
            Run::new("Title\n", AttributeSet::default().with_font_role(FontRole::Title)),
            Run::new("body", AttributeSet::default()),
        ]);
        let (mut session, _) = session(doc);
        session.set_selection(Selection::Caret(3));
        assert!(session.typing_attributes().is_title);

        let before = session.format_state();
        assert_eq!(session.apply_format(Format::Heading1), before);
        assert!(!session.needs_save());

        session.insert_text("X");
        assert_eq!(
            session.with_document(|doc| doc.attributes_at(3).unwrap().font_role),
            FontRole::Title
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_line_after_title_takes_paragraph_formats() {
        let doc = RichTextDocument::from_runs([Run::new(
            "Title\n",
            AttributeSet::default().with_font_role(FontRole::Title),
        )]);
        let (mut session, _) = session(doc);
        session.set_selection(Selection::Caret(6));
        assert!(!session.typing_attributes().is_title);

        session.insert_text("body text");
        assert_eq!(
            session.with_document(|doc| doc.attributes_at(6).unwrap().font_role),
            FontRole::Body
        );

        let state = session.apply_format(Format::Heading1);
        assert_eq!(state.paragraph_format, ParagraphFormat::Heading1);
        assert_eq!(
            session.with_document(|doc| doc.attributes_at(6).unwrap().font_role),
            FontRole::Heading1
        );
        assert_eq!(
            session.with_document(|doc| doc.attributes_at(0).unwrap().font_role),
            FontRole::Title
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_numbered_list_counts_lines() {
        let (mut session, _) = session(RichTextDocument::plain("one\ntwo\nthree"));
        let end = session.len();
        session.set_selection(Selection::new(0, end));
        session.apply_format(Format::NumberedList);

        let numbers = session.with_document(|doc| {
            [0, 4, 8].map(|offset| {
                let attributes = doc.attributes_at(offset).unwrap();
                (attributes.list_kind, attributes.list_number)
            })
        });
        assert_eq!(
            numbers,
            [
                (Some(ListKind::Ordered), 1),
                (Some(ListKind::Ordered), 2),
                (Some(ListKind::Ordered), 3),
            ]
        );

        session.set_selection(Selection::Caret(10));
        assert_eq!(session.format_state().list_number, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_surface_receives_every_sync() {
        let (mut session, _) = session(RichTextDocument::plain("abc"));
        let surface = RecordingSurface::new();
        session.set_surface(Box::new(surface.clone()));
        assert_eq!(surface.write_count(), 1);

        session.set_selection(Selection::Caret(1));
        session.toggle_format(Format::Underline);
        assert_eq!(surface.write_count(), 3);
        assert!(surface.current().unwrap().underline);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_backward() {
        let (mut session, _) = session(RichTextDocument::plain("abc"));
        session.set_selection(Selection::Caret(0));
        assert_eq!(session.delete_backward(), "");
        assert!(!session.needs_save());

        session.set_selection(Selection::Caret(3));
        assert_eq!(session.delete_backward(), "c");
        session.set_selection(Selection::new(0, 1));
        assert_eq!(session.delete_backward(), "a");
        assert_eq!(session.text(), "b");
        assert_eq!(session.version(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_refuses_unsaved_then_switches() {
        let (mut session, backend) = session(RichTextDocument::plain("one"));
        session.set_selection(Selection::Caret(3));
        session.insert_text("!");

        let next = RichTextDocument::plain("two");
        assert!(matches!(
            session.load_document(next.clone()),
            Err(SessionError::UnsavedChanges { version: 1 })
        ));

        session.switch_document(next).await.unwrap();
        assert_eq!(session.text(), "two");
        assert!(!session.needs_save());
        assert_eq!(session.version(), 0);
        let saved = JsonCodec.decode(&backend.last_saved().unwrap()).unwrap();
        assert_eq!(saved.text(), "one!");
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_bytes_rejects_garbage() {
        let (mut session, _) = session(RichTextDocument::plain("keep"));
        assert!(matches!(session.load_bytes(b"nope"), Err(SessionError::Codec(_))));
        assert_eq!(session.text(), "keep");
    }
}
