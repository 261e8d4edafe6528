//! Document codecs.
//!
//! The persisted wire format is owned by whoever stores notes; the engine only
//! needs `encode`/`decode`. Two implementations ship with the crate:
//!
//! | Codec          | Format                      | Use                         |
//! |----------------|-----------------------------|-----------------------------|
//! | `JsonCodec`    | serde_json                  | debugging, human inspection |
//! | `BincodeCodec` | bincode 2 (standard config) | compact on-disk snapshots   |

use thiserror::Error;

use crate::document::RichTextDocument;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Encode error: {0}")]
    Encode(String),
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Converts documents to and from bytes.
pub trait Codec: Send + Sync {
    fn name(&self) -> &'static str;

    fn encode(&self, document: &RichTextDocument) -> Result<Vec<u8>, CodecError>;

    fn decode(&self, bytes: &[u8]) -> Result<RichTextDocument, CodecError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, document: &RichTextDocument) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(document).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<RichTextDocument, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BincodeCodec;

impl Codec for BincodeCodec {
    fn name(&self) -> &'static str {
        "bincode"
    }

    #[inline(always)]
    fn encode(&self, document: &RichTextDocument) -> Result<Vec<u8>, CodecError> {
        bincode::serde::encode_to_vec(document, bincode::config::standard())
            .map_err(|e| CodecError::Encode(e.to_string()))
    }

    #[inline(always)]
    fn decode(&self, bytes: &[u8]) -> Result<RichTextDocument, CodecError> {
        let (document, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| CodecError::Decode(e.to_string()))?;
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Attachment, AttributeSet, FontRole, ListKind, Run};
    use crate::format::{Alignment, CharacterFlag};
    use uuid::Uuid;

    fn sample() -> RichTextDocument {
        let mut doc = RichTextDocument::from_runs([
            Run::new("Groceries\n", AttributeSet::default().with_font_role(FontRole::Heading1)),
            Run::new(
                "milk",
                AttributeSet::default()
                    .with_list(ListKind::Checkbox, 1, 1)
                    .with_flag(CharacterFlag::Highlight),
            ),
            Run::new(" — today", AttributeSet::default().with_alignment(Alignment::Right)),
        ]);
        doc.insert_attachment(10, Attachment::Checkbox { checked: true }, AttributeSet::default());
        doc.insert_attachment(doc.len(), Attachment::Image { id: Uuid::new_v4() }, AttributeSet::default());
        doc
    }

    #[test]
    fn test_codecs_preserve_document() {
        let doc = sample();
        for codec in [&JsonCodec as &dyn Codec, &BincodeCodec] {
            let bytes = codec.encode(&doc).unwrap();
            let decoded = codec.decode(&bytes).unwrap();
            assert_eq!(decoded, doc, "codec {}", codec.name());
            assert_eq!(decoded.len(), doc.len());
        }
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(JsonCodec.decode(b"not json"), Err(CodecError::Decode(_))));
        assert!(matches!(BincodeCodec.decode(&[0xFF; 3]), Err(CodecError::Decode(_))));
    }
}
