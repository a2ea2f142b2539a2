//! In-memory model set for testing, development, and the demo server.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AnnotationError, Result};
use crate::traits::store::{ModelSet, QuerySolution};
use crate::types::concept::{Concept, ConceptQuery, ConceptStub};
use crate::types::document::Document;
use crate::types::workflow::{LanguageModelSpecification, Workflow};

/// In-memory storage for documents, workflows, concepts, and model
/// specifications.
///
/// Useful for testing and development. Not suitable for production as
/// data is lost on restart. SELECT queries are scripted: unscripted
/// queries yield zero solutions.
pub struct MemoryModelSet {
    documents: RwLock<HashMap<String, Document>>,
    workflows: RwLock<HashMap<String, Workflow>>,
    concepts: RwLock<HashMap<String, Concept>>,
    model_specifications: RwLock<HashMap<String, LanguageModelSpecification>>,
    solutions: RwLock<HashMap<String, Vec<QuerySolution>>>,
}

impl Default for MemoryModelSet {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryModelSet {
    /// Create a new empty model set.
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            workflows: RwLock::new(HashMap::new()),
            concepts: RwLock::new(HashMap::new()),
            model_specifications: RwLock::new(HashMap::new()),
            solutions: RwLock::new(HashMap::new()),
        }
    }

    /// Load a model set from a JSON model file.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ModelFile = serde_json::from_str(json)?;
        let mut model_set = Self::new();
        for document in file.documents {
            model_set = model_set.with_document(document);
        }
        for workflow in file.workflows {
            model_set = model_set.with_workflow(workflow);
        }
        for concept in file.concepts {
            model_set = model_set.with_concept(concept);
        }
        for specification in file.language_models {
            model_set = model_set.with_model_specification(specification);
        }
        Ok(model_set)
    }

    pub fn with_document(self, document: Document) -> Self {
        self.documents
            .write()
            .unwrap()
            .insert(document.identifier.clone(), document);
        self
    }

    pub fn with_workflow(self, workflow: Workflow) -> Self {
        self.workflows
            .write()
            .unwrap()
            .insert(workflow.identifier.clone(), workflow);
        self
    }

    pub fn with_concept(self, concept: Concept) -> Self {
        self.concepts
            .write()
            .unwrap()
            .insert(concept.iri.clone(), concept);
        self
    }

    pub fn with_model_specification(self, specification: LanguageModelSpecification) -> Self {
        self.model_specifications
            .write()
            .unwrap()
            .insert(specification.identifier.clone(), specification);
        self
    }

    /// Script the solutions a SELECT query returns.
    pub fn with_solutions(self, query: impl Into<String>, solutions: Vec<QuerySolution>) -> Self {
        self.solutions.write().unwrap().insert(query.into(), solutions);
        self
    }

    /// Identifiers of the documents belonging to a corpus, for callers
    /// iterating a corpus one document at a time.
    pub fn documents_in_corpus(&self, corpus: &str) -> Vec<String> {
        let mut identifiers: Vec<String> = self
            .documents
            .read()
            .unwrap()
            .values()
            .filter(|d| d.corpus.as_deref() == Some(corpus))
            .map(|d| d.identifier.clone())
            .collect();
        identifiers.sort();
        identifiers
    }

    pub fn document_count(&self) -> usize {
        self.documents.read().unwrap().len()
    }

    pub fn workflow_count(&self) -> usize {
        self.workflows.read().unwrap().len()
    }
}

#[async_trait]
impl ModelSet for MemoryModelSet {
    async fn document(&self, identifier: &str) -> Result<Document> {
        self.documents
            .read()
            .unwrap()
            .get(identifier)
            .cloned()
            .ok_or_else(|| AnnotationError::unresolved_document(identifier))
    }

    async fn workflow(&self, identifier: &str) -> Result<Workflow> {
        self.workflows
            .read()
            .unwrap()
            .get(identifier)
            .cloned()
            .ok_or_else(|| AnnotationError::unresolved_workflow(identifier))
    }

    async fn concepts(&self, iris: &[String]) -> Result<Vec<Concept>> {
        let concepts = self.concepts.read().unwrap();
        iris.iter()
            .map(|iri| {
                concepts
                    .get(iri)
                    .cloned()
                    .ok_or_else(|| AnnotationError::unresolved_concept(iri))
            })
            .collect()
    }

    async fn concept_stubs(&self, query: &ConceptQuery) -> Result<Vec<ConceptStub>> {
        let needle = query.query.to_lowercase();
        let mut stubs: Vec<ConceptStub> = self
            .concepts
            .read()
            .unwrap()
            .values()
            .filter(|c| {
                c.pref_label
                    .as_deref()
                    .is_some_and(|label| label.to_lowercase().contains(&needle))
            })
            .map(Concept::stub)
            .collect();
        stubs.sort_by(|a, b| a.iri.cmp(&b.iri));
        if let Some(limit) = query.limit {
            stubs.truncate(limit);
        }
        Ok(stubs)
    }

    async fn language_model_specification(
        &self,
        identifier: &str,
    ) -> Result<LanguageModelSpecification> {
        self.model_specifications
            .read()
            .unwrap()
            .get(identifier)
            .cloned()
            .ok_or_else(|| AnnotationError::unresolved_language_model(identifier))
    }

    async fn select(&self, query: &str) -> Result<Vec<QuerySolution>> {
        Ok(self
            .solutions
            .read()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default())
    }
}

/// On-disk shape of a JSON model file.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ModelFile {
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub workflows: Vec<Workflow>,
    #[serde(default)]
    pub concepts: Vec<Concept>,
    #[serde(default)]
    pub language_models: Vec<LanguageModelSpecification>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::document::TextualEntity;

    #[tokio::test]
    async fn missing_document_resolves_to_an_error() {
        let model_set = MemoryModelSet::new();
        let err = model_set.document("nope").await.unwrap_err();
        assert_eq!(err.to_string(), "unable to resolve document: nope");
    }

    #[tokio::test]
    async fn concepts_resolve_in_request_order() {
        let model_set = MemoryModelSet::new()
            .with_concept(Concept::new("http://x/a").with_pref_label("A"))
            .with_concept(Concept::new("http://x/b").with_pref_label("B"));

        let concepts = model_set
            .concepts(&["http://x/b".to_string(), "http://x/a".to_string()])
            .await
            .unwrap();
        assert_eq!(concepts[0].iri, "http://x/b");
        assert_eq!(concepts[1].iri, "http://x/a");
    }

    #[tokio::test]
    async fn missing_concept_fails_the_batch() {
        let model_set = MemoryModelSet::new().with_concept(Concept::new("http://x/a"));
        let err = model_set
            .concepts(&["http://x/a".to_string(), "http://x/missing".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "unable to resolve concept: http://x/missing");
    }

    #[tokio::test]
    async fn concept_stubs_match_labels_case_insensitively() {
        let model_set = MemoryModelSet::new()
            .with_concept(Concept::new("http://x/a").with_pref_label("Severe Weather"))
            .with_concept(Concept::new("http://x/b").with_pref_label("Economics"));

        let stubs = model_set
            .concept_stubs(&ConceptQuery::new("weather"))
            .await
            .unwrap();
        assert_eq!(stubs.len(), 1);
        assert_eq!(stubs[0].iri, "http://x/a");
    }

    #[tokio::test]
    async fn unscripted_select_yields_no_solutions() {
        let model_set = MemoryModelSet::new();
        let solutions = model_set.select("SELECT ?x").await.unwrap();
        assert!(solutions.is_empty());
    }

    #[test]
    fn documents_in_corpus_filters_and_sorts() {
        let model_set = MemoryModelSet::new()
            .with_document(
                Document::new("doc-b")
                    .with_corpus("news")
                    .with_textual_entity(TextualEntity::plain_text("b")),
            )
            .with_document(
                Document::new("doc-a")
                    .with_corpus("news")
                    .with_textual_entity(TextualEntity::plain_text("a")),
            )
            .with_document(Document::new("doc-c").with_corpus("other"));

        assert_eq!(model_set.documents_in_corpus("news"), vec!["doc-a", "doc-b"]);
    }

    #[test]
    fn model_file_loads() {
        let json = r#"{
            "documents": [
                {"identifier": "doc-1", "textual_entities": [
                    {"encoding": "PlainText", "content": "hello"}
                ]}
            ],
            "workflows": [],
            "concepts": [{"iri": "http://x/a", "pref_label": "A"}],
            "language_models": [
                {"identifier": "lm-1", "api_identifier": "gpt-4o"}
            ]
        }"#;

        let model_set = MemoryModelSet::from_json(json).unwrap();
        assert_eq!(model_set.document_count(), 1);
    }
}
