use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// The fixed extraction schema both the LLM client and the heuristic
/// fallback must produce. `None` / empty list is the explicit "not found"
/// marker; an empty string never stands in for unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateFields {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub summary: Option<String>,
    pub skills: Vec<String>,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationEntry {
    #[serde(default)]
    pub degree: Option<String>,
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
}

impl CandidateFields {
    /// Builds fields from a raw service payload, checking presence and type
    /// of every schema field instead of trusting the shape implicitly.
    ///
    /// Missing, `null`, and empty-string values become `None`; a field that
    /// is present with the wrong type is a conformance error and the whole
    /// payload is rejected.
    pub fn from_json(value: &Value) -> Result<Self, String> {
        let obj = value
            .as_object()
            .ok_or_else(|| "payload is not a JSON object".to_string())?;

        Ok(CandidateFields {
            full_name: opt_string(obj, "full_name")?,
            email: opt_string(obj, "email")?,
            phone: opt_string(obj, "phone")?,
            location: opt_string(obj, "location")?,
            summary: opt_string(obj, "summary")?,
            skills: string_array(obj, "skills")?,
            experience: entry_array(obj, "experience", |entry| {
                Ok(ExperienceEntry {
                    title: opt_string(entry, "title")?,
                    company: opt_string(entry, "company")?,
                    duration: opt_string(entry, "duration")?,
                    description: opt_string(entry, "description")?,
                })
            })?,
            education: entry_array(obj, "education", |entry| {
                Ok(EducationEntry {
                    degree: opt_string(entry, "degree")?,
                    institution: opt_string(entry, "institution")?,
                    year: opt_string(entry, "year")?,
                })
            })?,
        })
    }
}

type JsonObject = serde_json::Map<String, Value>;

fn opt_string(obj: &JsonObject, key: &str) -> Result<Option<String>, String> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
                Ok(None)
            } else {
                Ok(Some(trimmed.to_string()))
            }
        }
        Some(_) => Err(format!("field '{key}' must be a string or null")),
    }
}

fn string_array(obj: &JsonObject, key: &str) -> Result<Vec<String>, String> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.trim().to_string()),
                _ => Err(format!("field '{key}' must contain only strings")),
            })
            .filter(|item| !matches!(item, Ok(s) if s.is_empty()))
            .collect(),
        Some(_) => Err(format!("field '{key}' must be an array or null")),
    }
}

fn entry_array<T>(
    obj: &JsonObject,
    key: &str,
    build: impl Fn(&JsonObject) -> Result<T, String>,
) -> Result<Vec<T>, String> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                let entry = item
                    .as_object()
                    .ok_or_else(|| format!("field '{key}' must contain only objects"))?;
                build(entry)
            })
            .collect(),
        Some(_) => Err(format!("field '{key}' must be an array or null")),
    }
}

/// A candidate record about to be persisted for one upload.
#[derive(Debug, Clone)]
pub struct NewCandidate {
    pub resume_id: Uuid,
    pub user_id: Uuid,
    pub fields: CandidateFields,
    /// The normalized text submitted for extraction, retained for audit/search.
    pub raw_text: String,
    /// Set only when the heuristic fallback produced the fields.
    pub extraction_note: Option<String>,
}

/// Persisted candidate record, read-only after creation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateRow {
    pub id: Uuid,
    pub resume_id: Uuid,
    pub user_id: Uuid,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub summary: Option<String>,
    pub skills: Value,
    pub experience: Value,
    pub education: Value,
    pub raw_text: String,
    pub extraction_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_full_payload() {
        let payload = json!({
            "full_name": "Jane Doe",
            "email": "jane@example.com",
            "phone": "555-123-4567",
            "location": "Austin, TX",
            "summary": "Backend engineer.",
            "skills": ["Rust", "SQL"],
            "experience": [
                {"title": "Engineer", "company": "Acme", "duration": "2019-2023", "description": "Built services"}
            ],
            "education": [
                {"degree": "BS Computer Science", "institution": "UT Austin", "year": "2019"}
            ]
        });

        let fields = CandidateFields::from_json(&payload).unwrap();
        assert_eq!(fields.full_name.as_deref(), Some("Jane Doe"));
        assert_eq!(fields.skills, vec!["Rust", "SQL"]);
        assert_eq!(fields.experience.len(), 1);
        assert_eq!(fields.experience[0].company.as_deref(), Some("Acme"));
        assert_eq!(fields.education[0].year.as_deref(), Some("2019"));
    }

    #[test]
    fn test_from_json_missing_and_null_become_none() {
        let payload = json!({
            "full_name": null,
            "email": "a@b.co",
            "skills": null
        });

        let fields = CandidateFields::from_json(&payload).unwrap();
        assert_eq!(fields.full_name, None);
        assert_eq!(fields.phone, None);
        assert!(fields.skills.is_empty());
        assert!(fields.experience.is_empty());
    }

    #[test]
    fn test_from_json_empty_string_is_not_a_value() {
        let payload = json!({"full_name": "", "email": "  ", "phone": "null"});
        let fields = CandidateFields::from_json(&payload).unwrap();
        assert_eq!(fields.full_name, None);
        assert_eq!(fields.email, None);
        assert_eq!(fields.phone, None);
    }

    #[test]
    fn test_from_json_rejects_wrong_types() {
        assert!(CandidateFields::from_json(&json!({"full_name": 42})).is_err());
        assert!(CandidateFields::from_json(&json!({"skills": "Rust"})).is_err());
        assert!(CandidateFields::from_json(&json!({"skills": [1, 2]})).is_err());
        assert!(CandidateFields::from_json(&json!({"experience": ["engineer"]})).is_err());
        assert!(CandidateFields::from_json(&json!([1, 2, 3])).is_err());
        assert!(CandidateFields::from_json(&json!("just text")).is_err());
    }

    #[test]
    fn test_from_json_entry_subfields_optional() {
        let payload = json!({
            "experience": [{"title": "Analyst"}],
            "education": [{}]
        });
        let fields = CandidateFields::from_json(&payload).unwrap();
        assert_eq!(fields.experience[0].title.as_deref(), Some("Analyst"));
        assert_eq!(fields.experience[0].company, None);
        assert_eq!(fields.education[0].degree, None);
    }

    #[test]
    fn test_from_json_drops_empty_skill_strings() {
        let payload = json!({"skills": ["Rust", "", "  "]});
        let fields = CandidateFields::from_json(&payload).unwrap();
        assert_eq!(fields.skills, vec!["Rust"]);
    }
}
