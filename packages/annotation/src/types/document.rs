//! Documents and their textual encodings.

use serde::{Deserialize, Serialize};

/// How a textual entity encodes the document body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextEncoding {
    Html,
    PlainText,
}

/// One encoding of a document's body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextualEntity {
    pub encoding: TextEncoding,
    pub content: String,
}

impl TextualEntity {
    pub fn html(content: impl Into<String>) -> Self {
        Self {
            encoding: TextEncoding::Html,
            content: content.into(),
        }
    }

    pub fn plain_text(content: impl Into<String>) -> Self {
        Self {
            encoding: TextEncoding::PlainText,
            content: content.into(),
        }
    }
}

/// An immutable input document.
///
/// Owned and persisted externally; the pipeline only reads it. The
/// `textual_entities` order is the author's preference order when several
/// encodings carry the same body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub identifier: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Corpus this document belongs to, if any.
    #[serde(default)]
    pub corpus: Option<String>,
    pub textual_entities: Vec<TextualEntity>,
}

impl Document {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            title: None,
            corpus: None,
            textual_entities: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_corpus(mut self, corpus: impl Into<String>) -> Self {
        self.corpus = Some(corpus.into());
        self
    }

    pub fn with_textual_entity(mut self, entity: TextualEntity) -> Self {
        self.textual_entities.push(entity);
        self
    }

    /// First body with the given encoding, if present.
    pub fn body(&self, encoding: TextEncoding) -> Option<&str> {
        self.textual_entities
            .iter()
            .find(|e| e.encoding == encoding)
            .map(|e| e.content.as_str())
    }
}
