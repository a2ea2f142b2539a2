//! Claims and the typed answer values they carry.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::concept::ConceptStub;

/// A typed answer value extracted from a language model completion.
///
/// Each value carries a generated identifier for provenance; value
/// equality for claim matching deliberately ignores it (see
/// [`Value::same_value`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Value {
    Boolean { identifier: String, value: bool },
    Categorical { identifier: String, concept: ConceptStub },
    Real { identifier: String, value: f64 },
    Text { identifier: String, value: String },
}

impl Value {
    pub fn boolean(value: bool) -> Self {
        Self::Boolean {
            identifier: generated_identifier(),
            value,
        }
    }

    pub fn categorical(concept: ConceptStub) -> Self {
        Self::Categorical {
            identifier: generated_identifier(),
            concept,
        }
    }

    pub fn real(value: f64) -> Self {
        Self::Real {
            identifier: generated_identifier(),
            value,
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text {
            identifier: generated_identifier(),
            value: value.into(),
        }
    }

    /// The generated provenance identifier.
    pub fn identifier(&self) -> &str {
        match self {
            Self::Boolean { identifier, .. }
            | Self::Categorical { identifier, .. }
            | Self::Real { identifier, .. }
            | Self::Text { identifier, .. } => identifier,
        }
    }

    /// Canonical lexical form of the value's content, used for content
    /// hashing and display.
    pub fn lexical_form(&self) -> String {
        match self {
            Self::Boolean { value, .. } => value.to_string(),
            Self::Categorical { concept, .. } => concept.iri.clone(),
            Self::Real { value, .. } => value.to_string(),
            Self::Text { value, .. } => value.clone(),
        }
    }

    fn kind_tag(&self) -> &'static str {
        match self {
            Self::Boolean { .. } => "boolean",
            Self::Categorical { .. } => "categorical",
            Self::Real { .. } => "real",
            Self::Text { .. } => "text",
        }
    }

    /// Content equality, ignoring generated identifiers.
    pub fn same_value(&self, other: &Value) -> bool {
        self.kind_tag() == other.kind_tag() && self.lexical_form() == other.lexical_form()
    }
}

fn generated_identifier() -> String {
    Uuid::new_v4().to_string()
}

/// A subject–predicate–object assertion about a document.
///
/// `gold = true` marks human-asserted ground truth; `gold = false` marks
/// model-inferred claims. The identifier is derived deterministically from
/// the claim's content, so duplicate claims compare equal by content
/// rather than by object identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub identifier: String,
    pub subject: String,
    pub predicate: String,
    pub object: Value,
    #[serde(default)]
    pub gold: bool,
}

impl Claim {
    /// Create an inferred (non-gold) claim.
    pub fn new(subject: impl Into<String>, predicate: impl Into<String>, object: Value) -> Self {
        let subject = subject.into();
        let predicate = predicate.into();
        let identifier = content_identifier(&subject, &predicate, &object, false);
        Self {
            identifier,
            subject,
            predicate,
            object,
            gold: false,
        }
    }

    /// Create a gold (human-asserted) claim.
    pub fn gold(subject: impl Into<String>, predicate: impl Into<String>, object: Value) -> Self {
        let subject = subject.into();
        let predicate = predicate.into();
        let identifier = content_identifier(&subject, &predicate, &object, true);
        Self {
            identifier,
            subject,
            predicate,
            object,
            gold: true,
        }
    }

    /// Content equality across the gold/inferred divide: same subject,
    /// predicate, and object value. Ignores identifiers and the gold flag.
    pub fn content_equals(&self, other: &Claim) -> bool {
        self.subject == other.subject
            && self.predicate == other.predicate
            && self.object.same_value(&other.object)
    }
}

/// Deterministic claim identifier from content. The gold flag is part of
/// the hash so a gold claim and its inferred twin remain distinct records
/// while still comparing equal by content.
fn content_identifier(subject: &str, predicate: &str, object: &Value, gold: bool) -> String {
    let mut hasher = Sha256::new();
    hasher.update(subject.as_bytes());
    hasher.update([0u8]);
    hasher.update(predicate.as_bytes());
    hasher.update([0u8]);
    hasher.update(object.kind_tag().as_bytes());
    hasher.update([0u8]);
    hasher.update(object.lexical_form().as_bytes());
    hasher.update([0u8]);
    hasher.update([gold as u8]);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_is_deterministic() {
        let a = Claim::new("doc-1", "p:has", Value::text("yes"));
        let b = Claim::new("doc-1", "p:has", Value::text("yes"));
        assert_eq!(a.identifier, b.identifier);
        assert!(a.content_equals(&b));
    }

    #[test]
    fn identifier_differs_by_content() {
        let a = Claim::new("doc-1", "p:has", Value::text("yes"));
        let b = Claim::new("doc-1", "p:has", Value::text("no"));
        assert_ne!(a.identifier, b.identifier);
        assert!(!a.content_equals(&b));
    }

    #[test]
    fn gold_and_inferred_twins_are_content_equal_but_distinct_records() {
        let inferred = Claim::new("doc-1", "p:has", Value::boolean(true));
        let gold = Claim::gold("doc-1", "p:has", Value::boolean(true));
        assert!(inferred.content_equals(&gold));
        assert_ne!(inferred.identifier, gold.identifier);
    }

    #[test]
    fn value_equality_ignores_generated_identifiers() {
        let a = Value::real(2.0);
        let b = Value::real(2.0);
        assert_ne!(a.identifier(), b.identifier());
        assert!(a.same_value(&b));
    }

    #[test]
    fn value_equality_distinguishes_kinds() {
        // "true" as text vs true as boolean share a lexical form but not a kind
        let text = Value::text("true");
        let boolean = Value::boolean(true);
        assert!(!text.same_value(&boolean));
    }
}
