//! Value extraction - parse language model completions into typed values.
//!
//! Model output is not guaranteed to be strict JSON: answers arrive
//! wrapped in Markdown fences, with trailing commas, single quotes, or
//! unquoted keys. Extraction therefore isolates the JSON payload, tries a
//! strict parse, and falls back to a lenient JSON5 parse before giving up.
//! Shape rules are deliberately narrow: a bare scalar, or an object with
//! exactly one member holding a scalar or an array of scalars.

use serde_json::Value as JsonValue;

use crate::error::{ExtractError, Result};
use crate::traits::store::ModelSet;
use crate::types::claim::Value;
use crate::types::concept::ConceptStub;
use crate::types::prompt::CompletionMessage;
use crate::types::question::Question;

/// A scalar answer element before kind-specific conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Scalar {
    /// String form of the scalar (`true` → `"true"`, `1` → `"1"`).
    pub fn lexical_form(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Bool(b) => format!("boolean {b}"),
            Self::Number(n) => format!("number {n}"),
            Self::Text(s) => format!("string {s:?}"),
        }
    }
}

/// Extract typed values from a completion for the given question kind.
///
/// Categorical questions resolve answer IRIs through the model set when
/// one is available (resolution failure propagates); without one, ad-hoc
/// stubs are built from the IRIs directly.
pub async fn extract_values(
    completion: &CompletionMessage,
    question: &Question,
    model_set: Option<&dyn ModelSet>,
) -> Result<Vec<Value>> {
    match question {
        Question::Dichotomous { .. } => Ok(vec![extract_boolean_value(&completion.content)?]),
        Question::Categorical { .. } => {
            extract_categorical_values(&completion.content, model_set).await
        }
        Question::RealValued { .. } => extract_real_values(&completion.content),
        Question::Text { .. } => extract_text_values(&completion.content),
    }
}

/// Extract a single boolean value. At least one answer element must be a
/// boolean; the first one wins.
pub fn extract_boolean_value(completion: &str) -> Result<Value> {
    let scalars = extract_answer_scalars(completion)?;
    scalars
        .iter()
        .find_map(|s| match s {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        })
        .map(Value::boolean)
        .ok_or_else(|| {
            ExtractError::WrongKind {
                expected: "a boolean",
                found: describe_scalars(&scalars),
            }
            .into()
        })
}

/// Extract numeric values. Every answer element must be a number.
pub fn extract_real_values(completion: &str) -> Result<Vec<Value>> {
    let scalars = extract_answer_scalars(completion)?;
    scalars
        .into_iter()
        .map(|s| match s {
            Scalar::Number(n) => Ok(Value::real(n)),
            other => Err(ExtractError::WrongKind {
                expected: "a numeric",
                found: other.describe(),
            }
            .into()),
        })
        .collect()
}

/// Extract text values. Any scalar is coerced to its string form; this is
/// intentionally permissive.
pub fn extract_text_values(completion: &str) -> Result<Vec<Value>> {
    let scalars = extract_answer_scalars(completion)?;
    Ok(scalars
        .into_iter()
        .map(|s| Value::text(s.lexical_form()))
        .collect())
}

/// Extract concept values. Every answer element must be a string that is a
/// syntactically valid IRI.
pub async fn extract_categorical_values(
    completion: &str,
    model_set: Option<&dyn ModelSet>,
) -> Result<Vec<Value>> {
    let scalars = extract_answer_scalars(completion)?;
    let iris = scalars
        .into_iter()
        .map(|s| match s {
            Scalar::Text(text) => {
                url::Url::parse(&text)
                    .map_err(|_| ExtractError::InvalidIri(text.clone()))?;
                Ok(text)
            }
            other => Err(ExtractError::WrongKind {
                expected: "a concept IRI",
                found: other.describe(),
            }),
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    match model_set {
        Some(model_set) => {
            let concepts = model_set.concepts(&iris).await?;
            Ok(concepts
                .iter()
                .map(|c| Value::categorical(c.stub()))
                .collect())
        }
        None => Ok(iris
            .into_iter()
            .map(|iri| Value::categorical(ConceptStub::new(iri)))
            .collect()),
    }
}

/// Reduce a completion to its scalar answer elements.
///
/// 1. Isolate the JSON payload (Markdown fences, leading/trailing prose).
/// 2. Parse strictly; on failure, re-parse leniently as JSON5.
/// 3. A bare boolean/number/string is the sole answer. An object must have
///    exactly one member, holding a scalar or an array whose non-scalar
///    elements are silently dropped. Anything else is an error.
pub fn extract_answer_scalars(completion: &str) -> Result<Vec<Scalar>> {
    let text = isolate_json(completion);

    let value: JsonValue = match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(strict_error) => json5::from_str(&text)
            .map_err(|_| ExtractError::Malformed(strict_error.to_string()))?,
    };

    scalars_from_json(value).map_err(Into::into)
}

/// Strip a Markdown code fence, then keep only the braced payload when a
/// `{` … `}` pair is present.
fn isolate_json(completion: &str) -> String {
    let trimmed = completion.trim();

    let unfenced = if let Some(start) = trimmed.find("```") {
        let after_fence = start + 3;
        // Skip the language identifier if present (e.g., "json\n")
        let content_start = trimmed[after_fence..]
            .find('\n')
            .map(|i| after_fence + i + 1)
            .unwrap_or(after_fence);
        match trimmed[content_start..].find("```") {
            Some(end) => trimmed[content_start..content_start + end].trim(),
            None => trimmed,
        }
    } else {
        trimmed
    };

    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(open), Some(close)) if open < close => unfenced[open..=close].to_string(),
        _ => unfenced.to_string(),
    }
}

fn scalars_from_json(value: JsonValue) -> std::result::Result<Vec<Scalar>, ExtractError> {
    match value {
        JsonValue::Bool(_) | JsonValue::Number(_) | JsonValue::String(_) => {
            Ok(vec![scalar_from_element(value).ok_or_else(|| {
                ExtractError::Unsupported("non-finite number".to_string())
            })?])
        }
        JsonValue::Object(map) => {
            let members = map.keys().cloned().collect::<Vec<_>>().join(", ");
            let mut entries = map.into_iter();
            match (entries.next(), entries.next()) {
                (None, _) => Err(ExtractError::EmptyObject),
                (Some(_), Some(_)) => Err(ExtractError::MultipleMembers { members }),
                (Some((_, member)), None) => match member {
                    JsonValue::Array(elements) => Ok(elements
                        .into_iter()
                        .filter_map(scalar_from_element)
                        .collect()),
                    JsonValue::Bool(_) | JsonValue::Number(_) | JsonValue::String(_) => {
                        Ok(vec![scalar_from_element(member).ok_or_else(|| {
                            ExtractError::Unsupported("non-finite number".to_string())
                        })?])
                    }
                    other => Err(ExtractError::Unsupported(json_type_name(&other).to_string())),
                },
            }
        }
        other => Err(ExtractError::Unsupported(json_type_name(&other).to_string())),
    }
}

fn scalar_from_element(value: JsonValue) -> Option<Scalar> {
    match value {
        JsonValue::Bool(b) => Some(Scalar::Bool(b)),
        JsonValue::Number(n) => n.as_f64().map(Scalar::Number),
        JsonValue::String(s) => Some(Scalar::Text(s)),
        _ => None,
    }
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn describe_scalars(scalars: &[Scalar]) -> String {
    if scalars.is_empty() {
        return "no answer elements".to_string();
    }
    scalars
        .iter()
        .map(Scalar::describe)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnnotationError;

    #[test]
    fn bare_scalars_are_the_sole_answer() {
        assert_eq!(
            extract_answer_scalars("true").unwrap(),
            vec![Scalar::Bool(true)]
        );
        assert_eq!(
            extract_answer_scalars("42").unwrap(),
            vec![Scalar::Number(42.0)]
        );
        assert_eq!(
            extract_answer_scalars("\"hello\"").unwrap(),
            vec![Scalar::Text("hello".to_string())]
        );
    }

    #[test]
    fn fenced_json_matches_unfenced() {
        let unfenced = extract_answer_scalars(r#"{"answer":[2,7]}"#).unwrap();
        let fenced = extract_answer_scalars("```json\n{\"answer\":[2,7]}\n```").unwrap();
        assert_eq!(unfenced, fenced);
        assert_eq!(fenced, vec![Scalar::Number(2.0), Scalar::Number(7.0)]);
    }

    #[test]
    fn surrounding_prose_is_stripped() {
        let scalars =
            extract_answer_scalars("Sure! Here is the answer: {\"answer\": true} Hope that helps.")
                .unwrap();
        assert_eq!(scalars, vec![Scalar::Bool(true)]);
    }

    #[test]
    fn lenient_parse_repairs_common_malformations() {
        // trailing comma
        assert_eq!(
            extract_answer_scalars(r#"{"answer": [1, 2,]}"#).unwrap(),
            vec![Scalar::Number(1.0), Scalar::Number(2.0)]
        );
        // unquoted key
        assert_eq!(
            extract_answer_scalars(r#"{answer: "yes"}"#).unwrap(),
            vec![Scalar::Text("yes".to_string())]
        );
        // single quotes
        assert_eq!(
            extract_answer_scalars(r#"{'answer': 'yes'}"#).unwrap(),
            vec![Scalar::Text("yes".to_string())]
        );
    }

    #[test]
    fn single_scalar_member_is_wrapped() {
        assert_eq!(
            extract_answer_scalars(r#"{"answer": 3}"#).unwrap(),
            vec![Scalar::Number(3.0)]
        );
    }

    #[test]
    fn non_scalar_array_elements_are_dropped() {
        let scalars =
            extract_answer_scalars(r#"{"answer": [1, {"nested": true}, "x", null]}"#).unwrap();
        assert_eq!(
            scalars,
            vec![Scalar::Number(1.0), Scalar::Text("x".to_string())]
        );
    }

    #[test]
    fn empty_object_is_an_error() {
        let err = extract_answer_scalars("{}").unwrap_err();
        assert_eq!(err.to_string(), "empty JSON object");
    }

    #[test]
    fn multi_member_object_is_an_error() {
        let err = extract_answer_scalars(r#"{"x":1,"y":2}"#).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("JSON object with multiple members"));
        assert!(err.to_string().contains('x'));
        assert!(err.to_string().contains('y'));
    }

    #[test]
    fn unparseable_completion_is_an_error() {
        let err = extract_answer_scalars("no json here at all").unwrap_err();
        assert!(err.to_string().starts_with("malformed JSON answer"));
    }

    #[test]
    fn object_valued_member_is_rejected() {
        let err = extract_answer_scalars(r#"{"answer": {"nested": 1}}"#).unwrap_err();
        assert!(err.to_string().starts_with("unsupported JSON answer value"));
    }

    #[test]
    fn boolean_extraction_takes_the_first_boolean() {
        let value = extract_boolean_value(r#"{"answer": ["noise", false, true]}"#).unwrap();
        assert!(matches!(value, Value::Boolean { value: false, .. }));
    }

    #[test]
    fn boolean_extraction_rejects_non_booleans() {
        let err = extract_boolean_value(r#"{"answer": "blah"}"#).unwrap_err();
        assert!(err.to_string().starts_with("expected a boolean answer"));
    }

    #[test]
    fn real_extraction_yields_one_value_per_number() {
        let values = extract_real_values(r#"{"answer": [2, 7]}"#).unwrap();
        assert_eq!(values.len(), 2);
        assert!(matches!(values[0], Value::Real { value, .. } if value == 2.0));
        assert!(matches!(values[1], Value::Real { value, .. } if value == 7.0));
    }

    #[test]
    fn real_extraction_rejects_mixed_types() {
        let err = extract_real_values(r#"{"answer": [2, "seven"]}"#).unwrap_err();
        assert!(err.to_string().starts_with("expected a numeric answer"));
    }

    #[test]
    fn text_extraction_coerces_every_scalar() {
        let values = extract_text_values(r#"{"answer":[1,true]}"#).unwrap();
        assert_eq!(values.len(), 2);
        assert!(matches!(&values[0], Value::Text { value, .. } if value == "1"));
        assert!(matches!(&values[1], Value::Text { value, .. } if value == "true"));
    }

    #[tokio::test]
    async fn categorical_extraction_builds_ad_hoc_stubs_without_a_model_set() {
        let values = extract_categorical_values(
            r#"{"answer": ["http://example.com/c/1", "http://example.com/c/2"]}"#,
            None,
        )
        .await
        .unwrap();

        assert_eq!(values.len(), 2);
        assert!(matches!(
            &values[0],
            Value::Categorical { concept, .. } if concept.iri == "http://example.com/c/1"
        ));
    }

    #[tokio::test]
    async fn categorical_extraction_rejects_invalid_iris() {
        let err = extract_categorical_values(r#"{"answer": ["not an iri"]}"#, None)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("invalid concept IRI"));
    }

    #[tokio::test]
    async fn dispatch_follows_the_question_kind() {
        use crate::types::prompt::{PromptMessage, PromptSource};

        let question = Question::RealValued {
            identifier: "q-1".into(),
            path: "p:count".into(),
            prompt: PromptSource::Message {
                message: PromptMessage::user("How many?"),
            },
        };
        let completion = CompletionMessage::new(r#"{"answer": [3]}"#);

        let values = extract_values(&completion, &question, None).await.unwrap();
        assert_eq!(values.len(), 1);
        assert!(matches!(values[0], Value::Real { value, .. } if value == 3.0));
    }

    #[test]
    fn errors_are_data_not_panics() {
        // A representative failure converts into the library error type
        let err: AnnotationError = ExtractError::EmptyObject.into();
        assert_eq!(err.to_string(), "empty JSON object");
    }
}
