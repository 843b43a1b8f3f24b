//! crates/chapter_core/src/domain.rs
//!
//! Defines the core data structures for the chapter service.
//! These structs are independent of any database, cache or transport, and
//! carry the validation that turns a raw upload candidate into a `NewChapter`.

use crate::error::{FieldError, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//=========================================================================================
// Chapter Status
//=========================================================================================

/// Progress of a chapter. Serialized with the human-readable labels clients send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChapterStatus {
    #[serde(rename = "Not Started")]
    NotStarted,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
}

impl ChapterStatus {
    pub const ALL: [ChapterStatus; 3] = [
        ChapterStatus::NotStarted,
        ChapterStatus::InProgress,
        ChapterStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChapterStatus::NotStarted => "Not Started",
            ChapterStatus::InProgress => "In Progress",
            ChapterStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for ChapterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChapterStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChapterStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "`{}` is not a valid status (expected one of: Not Started, In Progress, Completed)",
                    s
                )
            })
    }
}

//=========================================================================================
// Chapter Records
//=========================================================================================

/// A persisted chapter, as returned by the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: Uuid,
    pub subject: String,
    pub chapter: String,
    #[serde(rename = "class")]
    pub class_name: String,
    pub unit: String,
    pub year_wise_question_count: BTreeMap<String, i64>,
    pub question_solved: u64,
    pub status: ChapterStatus,
    pub is_weak_chapter: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A chapter that passed validation but has no identity or timestamps yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChapter {
    pub subject: String,
    pub chapter: String,
    pub class_name: String,
    pub unit: String,
    pub year_wise_question_count: BTreeMap<String, i64>,
    pub question_solved: u64,
    pub status: ChapterStatus,
    pub is_weak_chapter: bool,
}

impl NewChapter {
    /// Validates an untyped upload candidate.
    ///
    /// Every rule is checked so the returned error lists all offending fields,
    /// not just the first one. Unknown fields are ignored.
    pub fn from_candidate(candidate: &Value) -> Result<Self, ValidationError> {
        let Some(fields) = candidate.as_object() else {
            return Err(ValidationError::new(vec![FieldError::new(
                "entry",
                "must be a JSON object",
            )]));
        };

        let mut errors = Vec::new();
        let subject = required_text(fields, "subject", &mut errors);
        let chapter = required_text(fields, "chapter", &mut errors);
        let class_name = required_text(fields, "class", &mut errors);
        let unit = required_text(fields, "unit", &mut errors);
        let year_wise_question_count = year_counts(fields, &mut errors);
        let question_solved = solved_count(fields, &mut errors);
        let status = status(fields, &mut errors);
        let is_weak_chapter = match fields.get("isWeakChapter") {
            None | Some(Value::Null) => false,
            Some(flag) => as_boolean(flag).unwrap_or_else(|| {
                errors.push(FieldError::new("isWeakChapter", "must be a boolean"));
                false
            }),
        };

        match (
            subject,
            chapter,
            class_name,
            unit,
            year_wise_question_count,
            question_solved,
            status,
        ) {
            (
                Some(subject),
                Some(chapter),
                Some(class_name),
                Some(unit),
                Some(year_wise_question_count),
                Some(question_solved),
                Some(status),
            ) if errors.is_empty() => Ok(Self {
                subject,
                chapter,
                class_name,
                unit,
                year_wise_question_count,
                question_solved,
                status,
                is_weak_chapter,
            }),
            _ => Err(ValidationError::new(errors)),
        }
    }
}

fn required_text(
    fields: &Map<String, Value>,
    name: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match fields.get(name) {
        None | Some(Value::Null) => {
            errors.push(FieldError::new(name, "is required"));
            None
        }
        Some(Value::String(text)) if text.trim().is_empty() => {
            errors.push(FieldError::new(name, "must not be empty"));
            None
        }
        Some(Value::String(text)) => Some(text.clone()),
        Some(_) => {
            errors.push(FieldError::new(name, "must be a string"));
            None
        }
    }
}

fn year_counts(
    fields: &Map<String, Value>,
    errors: &mut Vec<FieldError>,
) -> Option<BTreeMap<String, i64>> {
    const NAME: &str = "yearWiseQuestionCount";

    let counts = match fields.get(NAME) {
        None | Some(Value::Null) => {
            errors.push(FieldError::new(NAME, "is required"));
            return None;
        }
        Some(Value::Object(counts)) => counts,
        Some(_) => {
            errors.push(FieldError::new(NAME, "must be an object of year to count"));
            return None;
        }
    };

    let mut parsed = BTreeMap::new();
    let mut valid = true;
    for (year, count) in counts {
        match as_integer(count) {
            Some(count) => {
                parsed.insert(year.clone(), count);
            }
            None => {
                errors.push(FieldError::new(
                    format!("{}.{}", NAME, year),
                    "must be an integer",
                ));
                valid = false;
            }
        }
    }
    valid.then_some(parsed)
}

fn solved_count(fields: &Map<String, Value>, errors: &mut Vec<FieldError>) -> Option<u64> {
    const NAME: &str = "questionSolved";

    match fields.get(NAME) {
        None | Some(Value::Null) => {
            errors.push(FieldError::new(NAME, "is required"));
            None
        }
        Some(value) => match as_integer(value) {
            Some(count) if count >= 0 => Some(count as u64),
            Some(_) => {
                errors.push(FieldError::new(NAME, "must not be negative"));
                None
            }
            None => {
                errors.push(FieldError::new(NAME, "must be an integer"));
                None
            }
        },
    }
}

fn status(fields: &Map<String, Value>, errors: &mut Vec<FieldError>) -> Option<ChapterStatus> {
    match fields.get("status") {
        None | Some(Value::Null) => {
            errors.push(FieldError::new("status", "is required"));
            None
        }
        Some(Value::String(label)) => match label.parse() {
            Ok(status) => Some(status),
            Err(reason) => {
                errors.push(FieldError::new("status", reason));
                None
            }
        },
        Some(_) => {
            errors.push(FieldError::new("status", "must be a string"));
            None
        }
    }
}

/// Accepts JSON integers, floats with no fractional part (`3.0`), and strings
/// holding either (`"12"`, `" 4.0 "`).
fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| number.as_f64().and_then(whole)),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(whole))
        }
        _ => None,
    }
}

/// `i64::MAX as f64` rounds up to 2^63, which is itself out of range.
fn whole(f: f64) -> Option<i64> {
    (f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64).then_some(f as i64)
}

/// Accepts booleans plus the spellings `true`/`false`, `1`/`0` and `yes`/`no`.
fn as_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => match number.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(text) => match text.as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

//=========================================================================================
// Queries and Results
//=========================================================================================

/// Equality constraints for a chapter listing. `None` means unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapterFilter {
    pub class_name: Option<String>,
    pub unit: Option<String>,
    pub subject: Option<String>,
    pub status: Option<ChapterStatus>,
    pub is_weak_chapter: Option<bool>,
}

impl ChapterFilter {
    /// True when the chapter satisfies every constraint that is set.
    pub fn matches(&self, chapter: &Chapter) -> bool {
        self.class_name
            .as_ref()
            .map_or(true, |v| *v == chapter.class_name)
            && self.unit.as_ref().map_or(true, |v| *v == chapter.unit)
            && self.subject.as_ref().map_or(true, |v| *v == chapter.subject)
            && self.status.map_or(true, |v| v == chapter.status)
            && self
                .is_weak_chapter
                .map_or(true, |v| v == chapter.is_weak_chapter)
    }
}

/// One page of a filtered listing. This is also the value stored in the query cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterPage {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub chapters: Vec<Chapter>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_candidate() -> Value {
        json!({
            "subject": "Physics",
            "chapter": "Kinematics",
            "class": "Class 11",
            "unit": "Mechanics 1",
            "yearWiseQuestionCount": { "2019": 2, "2020": 0, "2024": 5 },
            "questionSolved": 12,
            "status": "In Progress",
            "isWeakChapter": true
        })
    }

    #[test]
    fn valid_candidate_is_accepted() {
        let chapter = NewChapter::from_candidate(&valid_candidate()).unwrap();
        assert_eq!(chapter.class_name, "Class 11");
        assert_eq!(chapter.status, ChapterStatus::InProgress);
        assert_eq!(chapter.year_wise_question_count.get("2024"), Some(&5));
        assert_eq!(chapter.question_solved, 12);
        assert!(chapter.is_weak_chapter);
    }

    #[test]
    fn weak_flag_defaults_to_false_and_unknown_fields_are_ignored() {
        let mut candidate = valid_candidate();
        let fields = candidate.as_object_mut().unwrap();
        fields.remove("isWeakChapter");
        fields.insert("difficulty".to_string(), json!("hard"));

        let chapter = NewChapter::from_candidate(&candidate).unwrap();
        assert!(!chapter.is_weak_chapter);
    }

    #[test]
    fn missing_status_is_reported() {
        let mut candidate = valid_candidate();
        candidate.as_object_mut().unwrap().remove("status");

        let err = NewChapter::from_candidate(&candidate).unwrap_err();
        assert_eq!(err.errors, vec![FieldError::new("status", "is required")]);
        assert_eq!(
            err.to_string(),
            "Chapter validation failed: status: is required"
        );
    }

    #[test]
    fn every_violation_is_collected() {
        let candidate = json!({
            "subject": "",
            "chapter": 7,
            "class": "Class 12",
            "unit": "Optics",
            "yearWiseQuestionCount": { "2021": "three" },
            "questionSolved": -1,
            "status": "Done",
            "isWeakChapter": "maybe"
        });

        let err = NewChapter::from_candidate(&candidate).unwrap_err();
        let fields: Vec<&str> = err.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "subject",
                "chapter",
                "yearWiseQuestionCount.2021",
                "questionSolved",
                "status",
                "isWeakChapter"
            ]
        );
    }

    #[test]
    fn negative_and_whole_float_year_counts_are_integers() {
        let mut candidate = valid_candidate();
        candidate["yearWiseQuestionCount"] = json!({ "2022": -3, "2023": 4.0 });

        let chapter = NewChapter::from_candidate(&candidate).unwrap();
        assert_eq!(chapter.year_wise_question_count.get("2022"), Some(&-3));
        assert_eq!(chapter.year_wise_question_count.get("2023"), Some(&4));
    }

    #[test]
    fn fractional_solved_count_is_rejected() {
        let mut candidate = valid_candidate();
        candidate["questionSolved"] = json!(2.5);

        let err = NewChapter::from_candidate(&candidate).unwrap_err();
        assert_eq!(
            err.errors,
            vec![FieldError::new("questionSolved", "must be an integer")]
        );
    }

    #[test]
    fn numeric_strings_and_boolean_spellings_are_coerced() {
        let mut candidate = valid_candidate();
        candidate["questionSolved"] = json!("12");
        candidate["yearWiseQuestionCount"] = json!({ "2020": "3", "2021": " 7.0 " });
        candidate["isWeakChapter"] = json!("false");

        let chapter = NewChapter::from_candidate(&candidate).unwrap();
        assert_eq!(chapter.question_solved, 12);
        assert_eq!(chapter.year_wise_question_count.get("2020"), Some(&3));
        assert_eq!(chapter.year_wise_question_count.get("2021"), Some(&7));
        assert!(!chapter.is_weak_chapter);

        candidate["isWeakChapter"] = json!("yes");
        assert!(NewChapter::from_candidate(&candidate).unwrap().is_weak_chapter);
    }

    #[test]
    fn non_numeric_strings_are_still_rejected() {
        let mut candidate = valid_candidate();
        candidate["questionSolved"] = json!("twelve");
        candidate["yearWiseQuestionCount"] = json!({ "2020": "2.5" });

        let err = NewChapter::from_candidate(&candidate).unwrap_err();
        let fields: Vec<&str> = err.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["yearWiseQuestionCount.2020", "questionSolved"]);
    }

    #[test]
    fn floats_at_or_beyond_two_to_the_63_are_not_integers() {
        assert_eq!(as_integer(&json!(9.223372036854775807e18)), None);
        assert_eq!(as_integer(&json!(-9.223372036854775808e18)), Some(i64::MIN));
        assert_eq!(as_integer(&json!(4096.0)), Some(4096));
    }

    #[test]
    fn non_object_candidate_is_rejected() {
        let err = NewChapter::from_candidate(&json!(["subject"])).unwrap_err();
        assert_eq!(err.errors[0].field, "entry");
    }

    #[test]
    fn status_round_trips_through_its_label() {
        for status in ChapterStatus::ALL {
            assert_eq!(status.as_str().parse::<ChapterStatus>(), Ok(status));
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                json!(status.as_str())
            );
        }
        assert!("not started".parse::<ChapterStatus>().is_err());
    }

    #[test]
    fn chapter_serializes_with_client_field_names() {
        let now = Utc::now();
        let chapter = Chapter {
            id: Uuid::new_v4(),
            subject: "Maths".into(),
            chapter: "Limits".into(),
            class_name: "Class 12".into(),
            unit: "Calculus".into(),
            year_wise_question_count: BTreeMap::from([("2020".to_string(), 1)]),
            question_solved: 0,
            status: ChapterStatus::NotStarted,
            is_weak_chapter: false,
            created_at: now,
            updated_at: now,
        };

        let value = serde_json::to_value(&chapter).unwrap();
        assert_eq!(value["class"], "Class 12");
        assert_eq!(value["status"], "Not Started");
        assert_eq!(value["yearWiseQuestionCount"]["2020"], 1);
        assert_eq!(value["isWeakChapter"], false);
        assert!(value.get("createdAt").is_some());
    }
}
