//! Candidate records and the sources that produce them.
//!
//! A [`CandidateRecord`] is a read-only snapshot of one profile: an id plus
//! named attributes. The distinction the encoder relies on is between an
//! attribute that is present but null (a missing value, imputed) and an
//! attribute whose key is absent altogether (a structural gap, rejected
//! with [`SegmentError::SchemaMismatch`]).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{SegmentError, SegmentResult};
use crate::types::CandidateId;

/// Value of a single candidate attribute as delivered by the extract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Number(f64),
    Text(String),
    Tags(Vec<String>),
}

/// How a field is turned into numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Median-imputed, standardized scalar
    Numeric,
    /// One-hot encoded against the fit-time vocabulary
    Categorical,
    /// TF-IDF weighted over a frozen vocabulary
    Text,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Numeric => "numeric",
            Self::Categorical => "categorical",
            Self::Text => "text",
        };
        f.write_str(name)
    }
}

/// One encoder input field: an attribute name and its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Numeric,
        }
    }

    pub fn categorical(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Categorical,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Text,
        }
    }
}

/// Default candidate profile fields used when the settings name none.
pub fn default_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec::numeric("years_experience"),
        FieldSpec::numeric("desired_salary"),
        FieldSpec::categorical("location"),
        FieldSpec::categorical("education_level"),
        FieldSpec::text("skills"),
    ]
}

/// Snapshot of one candidate profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: CandidateId,
    #[serde(flatten)]
    attributes: BTreeMap<String, AttributeValue>,
}

impl CandidateRecord {
    /// Creates a record with no attributes.
    pub fn new(id: impl Into<CandidateId>) -> Self {
        Self {
            id: id.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_number(mut self, field: &str, value: f64) -> Self {
        self.attributes
            .insert(field.to_string(), AttributeValue::Number(value));
        self
    }

    pub fn with_category(mut self, field: &str, value: &str) -> Self {
        self.attributes
            .insert(field.to_string(), AttributeValue::Text(value.to_string()));
        self
    }

    pub fn with_text(self, field: &str, value: &str) -> Self {
        self.with_category(field, value)
    }

    pub fn with_tags<I, S>(mut self, field: &str, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags = tags.into_iter().map(Into::into).collect();
        self.attributes
            .insert(field.to_string(), AttributeValue::Tags(tags));
        self
    }

    /// Marks a field as present but unknown.
    pub fn with_null(mut self, field: &str) -> Self {
        self.attributes
            .insert(field.to_string(), AttributeValue::Null);
        self
    }

    /// Returns the raw attribute, `None` when the key is absent.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&AttributeValue> {
        self.attributes.get(field)
    }

    /// Iterates attribute names in sorted order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    fn require(&self, field: &str) -> SegmentResult<&AttributeValue> {
        self.attributes
            .get(field)
            .ok_or_else(|| SegmentError::SchemaMismatch {
                candidate_id: self.id.to_string(),
                field: field.to_string(),
            })
    }

    fn invalid(&self, field: &str, reason: impl Into<String>) -> SegmentError {
        SegmentError::InvalidRecord {
            candidate_id: self.id.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Reads a numeric field. `Ok(None)` is a missing value to impute.
    pub fn numeric_value(&self, field: &str) -> SegmentResult<Option<f64>> {
        match self.require(field)? {
            AttributeValue::Null => Ok(None),
            AttributeValue::Number(v) if v.is_finite() => Ok(Some(*v)),
            AttributeValue::Number(_) => Ok(None),
            AttributeValue::Text(s) if s.trim().is_empty() => Ok(None),
            AttributeValue::Text(s) => match s.trim().parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(Some(v)),
                Ok(_) => Ok(None),
                Err(_) => Err(self.invalid(field, format!("'{s}' is not a number"))),
            },
            AttributeValue::Tags(_) => Err(self.invalid(field, "expected a number, got a list")),
        }
    }

    /// Reads a categorical field. `Ok(None)` maps to the unknown category.
    pub fn categorical_value(&self, field: &str) -> SegmentResult<Option<String>> {
        match self.require(field)? {
            AttributeValue::Null => Ok(None),
            AttributeValue::Text(s) if s.trim().is_empty() => Ok(None),
            AttributeValue::Text(s) => Ok(Some(s.trim().to_string())),
            AttributeValue::Number(v) => Ok(Some(v.to_string())),
            AttributeValue::Tags(_) => {
                Err(self.invalid(field, "expected a single category, got a list"))
            }
        }
    }

    /// Reads a free-text field. Tag lists are joined with spaces.
    pub fn text_value(&self, field: &str) -> SegmentResult<Option<String>> {
        match self.require(field)? {
            AttributeValue::Null => Ok(None),
            AttributeValue::Text(s) => Ok(Some(s.clone())),
            AttributeValue::Tags(tags) => Ok(Some(tags.join(" "))),
            AttributeValue::Number(v) => Ok(Some(v.to_string())),
        }
    }
}

/// Read-only tabular extract of candidate profiles.
pub trait CandidateSource {
    fn candidates(&self) -> SegmentResult<Vec<CandidateRecord>>;
}

impl CandidateSource for Vec<CandidateRecord> {
    fn candidates(&self) -> SegmentResult<Vec<CandidateRecord>> {
        Ok(self.clone())
    }
}

/// Reads candidates from a JSON array file or a JSON-lines file.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CandidateSource for JsonFileSource {
    fn candidates(&self) -> SegmentResult<Vec<CandidateRecord>> {
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| SegmentError::io(&self.path, e))?;
        parse_records(&content)
    }
}

/// Parses a JSON array of records, or one record per non-empty line.
pub fn parse_records(content: &str) -> SegmentResult<Vec<CandidateRecord>> {
    if content.trim_start().starts_with('[') {
        return Ok(serde_json::from_str(content)?);
    }

    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(SegmentError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_absent_field_is_schema_mismatch() {
        let record = CandidateRecord::new("c1").with_number("years_experience", 3.0);

        assert_eq!(record.numeric_value("years_experience").unwrap(), Some(3.0));
        assert!(matches!(
            record.categorical_value("location"),
            Err(SegmentError::SchemaMismatch { ref field, .. }) if field == "location"
        ));
    }

    #[test]
    fn test_null_and_blank_are_missing() {
        let record = CandidateRecord::new("c1")
            .with_null("years_experience")
            .with_category("location", "  ")
            .with_null("skills");

        assert_eq!(record.numeric_value("years_experience").unwrap(), None);
        assert_eq!(record.categorical_value("location").unwrap(), None);
        assert_eq!(record.text_value("skills").unwrap(), None);
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let record = CandidateRecord::new("c1")
            .with_category("desired_salary", " 52000 ")
            .with_category("years_experience", "five");

        assert_eq!(record.numeric_value("desired_salary").unwrap(), Some(52000.0));
        assert!(matches!(
            record.numeric_value("years_experience"),
            Err(SegmentError::InvalidRecord { .. })
        ));
    }

    #[test]
    fn test_tags_join_for_text() {
        let record = CandidateRecord::new("c1").with_tags("skills", ["rust", "sql"]);
        assert_eq!(
            record.text_value("skills").unwrap(),
            Some("rust sql".to_string())
        );
        assert!(record.categorical_value("skills").is_err());
    }

    #[test]
    fn test_parse_json_array_and_lines() {
        let array = r#"[
            {"id": "a", "years_experience": 4, "location": "Berlin", "skills": ["go", "k8s"]},
            {"id": "b", "years_experience": null, "location": "Paris", "skills": "python sql"}
        ]"#;
        let records = parse_records(array).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].numeric_value("years_experience").unwrap(), Some(4.0));
        assert_eq!(records[1].numeric_value("years_experience").unwrap(), None);
        assert_eq!(records[0].text_value("skills").unwrap().unwrap(), "go k8s");

        let lines = "{\"id\": \"a\", \"location\": \"Berlin\"}\n\n{\"id\": \"b\", \"location\": null}\n";
        let records = parse_records(lines).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].id.as_str(), "b");
        assert!(records[1].get("location").is_some());
        assert!(records[1].get("skills").is_none());
    }

    #[test]
    fn test_parse_integer_candidate_ids() {
        let records =
            parse_records(r#"[{"id": 17, "location": "Berlin"}, {"id": "c-2", "location": null}]"#)
                .unwrap();
        assert_eq!(records[0].id.as_str(), "17");
        assert_eq!(records[0].categorical_value("location").unwrap().as_deref(), Some("Berlin"));
        assert_eq!(records[1].id.as_str(), "c-2");

        let lines = "{\"id\": 42, \"years_experience\": 3}\n";
        let records = parse_records(lines).unwrap();
        assert_eq!(records[0].id, CandidateId::new("42"));
        assert_eq!(records[0].numeric_value("years_experience").unwrap(), Some(3.0));
    }

    #[test]
    fn test_json_file_source() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("candidates.jsonl");
        std::fs::write(&path, "{\"id\": \"x\", \"location\": \"Rome\"}\n").unwrap();

        let records = JsonFileSource::new(&path).candidates().unwrap();
        assert_eq!(records.len(), 1);

        let missing = JsonFileSource::new(temp_dir.path().join("nope.json"));
        assert!(matches!(missing.candidates(), Err(SegmentError::Io { .. })));
    }
}
