//! Controlled-vocabulary concepts and concept selection.

use serde::{Deserialize, Serialize};

/// A full controlled-vocabulary term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub iri: String,
    #[serde(default)]
    pub notation: Option<String>,
    #[serde(default)]
    pub pref_label: Option<String>,
    #[serde(default)]
    pub definition: Option<String>,
    #[serde(default)]
    pub scope_note: Option<String>,
}

impl Concept {
    pub fn new(iri: impl Into<String>) -> Self {
        Self {
            iri: iri.into(),
            notation: None,
            pref_label: None,
            definition: None,
            scope_note: None,
        }
    }

    pub fn with_notation(mut self, notation: impl Into<String>) -> Self {
        self.notation = Some(notation.into());
        self
    }

    pub fn with_pref_label(mut self, label: impl Into<String>) -> Self {
        self.pref_label = Some(label.into());
        self
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    pub fn with_scope_note(mut self, scope_note: impl Into<String>) -> Self {
        self.scope_note = Some(scope_note.into());
        self
    }

    /// Minimal reference projection of this concept.
    pub fn stub(&self) -> ConceptStub {
        ConceptStub {
            iri: self.iri.clone(),
            pref_label: self.pref_label.clone(),
        }
    }
}

/// A minimal reference projection of a concept: identifier plus display
/// label. Used wherever deep resolution is unnecessary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptStub {
    pub iri: String,
    #[serde(default)]
    pub pref_label: Option<String>,
}

impl ConceptStub {
    pub fn new(iri: impl Into<String>) -> Self {
        Self {
            iri: iri.into(),
            pref_label: None,
        }
    }

    pub fn with_pref_label(mut self, label: impl Into<String>) -> Self {
        self.pref_label = Some(label.into());
        self
    }
}

/// Rule used to pick candidate concepts for a categorical question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ConceptSelector {
    /// An explicit list of concept IRIs.
    Enumerated { concepts: Vec<String> },

    /// A label search against the model set's vocabulary.
    Search {
        query: String,
        #[serde(default)]
        limit: Option<usize>,
    },
}

/// A concept-stub lookup request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptQuery {
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl ConceptQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// The projection of a candidate concept handed to prompt templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateConcept {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_note: Option<String>,
}

impl From<&Concept> for CandidateConcept {
    fn from(concept: &Concept) -> Self {
        Self {
            number: concept.notation.clone(),
            label: concept.pref_label.clone(),
            definition: concept.definition.clone(),
            scope_note: concept.scope_note.clone(),
        }
    }
}
