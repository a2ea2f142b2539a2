//! The model set: read-only resolution of stored records.
//!
//! The pipeline never writes through this trait; persisting execution
//! results is the caller's responsibility after `execute` returns.

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::error::Result;
use crate::types::concept::{Concept, ConceptQuery, ConceptStub};
use crate::types::document::Document;
use crate::types::workflow::{LanguageModelSpecification, Workflow};

/// One solution row of a `select` query: variable name → lexical value,
/// in projection order.
pub type QuerySolution = IndexMap<String, String>;

/// Read-only lookups against the externally-owned model store.
#[async_trait]
pub trait ModelSet: Send + Sync {
    /// Resolve a document by identifier.
    async fn document(&self, identifier: &str) -> Result<Document>;

    /// Resolve a workflow by identifier.
    async fn workflow(&self, identifier: &str) -> Result<Workflow>;

    /// Resolve concepts by IRI, in batch. Every IRI must resolve;
    /// a missing concept fails the whole lookup.
    async fn concepts(&self, iris: &[String]) -> Result<Vec<Concept>>;

    /// Find concept stubs matching a query.
    async fn concept_stubs(&self, query: &ConceptQuery) -> Result<Vec<ConceptStub>>;

    /// Resolve a language model specification by identifier.
    async fn language_model_specification(
        &self,
        identifier: &str,
    ) -> Result<LanguageModelSpecification>;

    /// Run a SELECT query against the store, returning its solutions.
    ///
    /// This is the query surface prompt templates draw live variable
    /// bindings from (see the prompt formatter).
    async fn select(&self, query: &str) -> Result<Vec<QuerySolution>>;
}
