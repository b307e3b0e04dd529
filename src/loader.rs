use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::LoadError;
use crate::exclusions::{ExclusionIndex, ExclusionKey};
use crate::models::{EnrollmentRecord, Flag};

/// Immutable record set, loaded once and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<EnrollmentRecord>,
}

impl RecordStore {
    pub fn new(records: Vec<EnrollmentRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[EnrollmentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Deserialize)]
struct RawRecord {
    #[serde(rename = "Curso", default, deserialize_with = "lenient_string")]
    course: String,
    #[serde(rename = "Turno", default, deserialize_with = "lenient_string")]
    turn: String,
    #[serde(rename = "Fase", default, deserialize_with = "lenient_string")]
    phase: String,
    #[serde(rename = "Status do Atendimento", default, deserialize_with = "lenient_string")]
    attendance_status: String,
    #[serde(rename = "Modelo de Ensino", default, deserialize_with = "lenient_string")]
    teaching_model: String,
    #[serde(rename = "Campus / Polo", default, deserialize_with = "lenient_string")]
    campus: String,
    #[serde(rename = "Data/Hora Inscrição", default, deserialize_with = "lenient_string")]
    registered_at: String,
    #[serde(rename = "Flag Matrícula Financeira", default, deserialize_with = "lenient_flag")]
    financial: Flag,
    #[serde(rename = "Flag Matrícula Acadêmica", default, deserialize_with = "lenient_flag")]
    academic: Flag,
    #[serde(
        rename = "Documentação Obrigatória Entregue",
        default,
        deserialize_with = "lenient_flag"
    )]
    documents: Flag,
}

impl From<RawRecord> for EnrollmentRecord {
    fn from(raw: RawRecord) -> Self {
        Self {
            course: raw.course,
            turn: raw.turn,
            phase: raw.phase,
            attendance_status: raw.attendance_status,
            teaching_model: raw.teaching_model,
            campus: raw.campus,
            registered_at: raw.registered_at,
            financial: raw.financial,
            academic: raw.academic,
            documents: raw.documents,
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    })
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<Flag, D::Error>
where
    D: Deserializer<'de>,
{
    let flag = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => match n.as_f64() {
            Some(v) if v == 1.0 => Flag::One,
            Some(v) if v == 0.0 => Flag::Zero,
            _ => Flag::Unknown,
        },
        _ => Flag::Unknown,
    };
    Ok(flag)
}

fn non_finite_token() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r":\s*(?:NaN|-?Infinity)\s*([,}\]])").expect("non-finite token pattern")
    })
}

/// Rewrites bare `NaN`/`Infinity` values, which JSON does not allow, to `null`.
pub fn sanitize_non_finite(content: &str) -> String {
    non_finite_token().replace_all(content, ": null$1").into_owned()
}

pub fn parse_records(content: &str) -> Result<Vec<EnrollmentRecord>, serde_json::Error> {
    let raw: Vec<RawRecord> = serde_json::from_str(&sanitize_non_finite(content))?;
    Ok(raw.into_iter().map(EnrollmentRecord::from).collect())
}

/// Loads the primary dataset. Any failure here is fatal for the process.
pub fn load_records(path: &Path) -> Result<RecordStore, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
    let records = parse_records(&content).map_err(|e| LoadError::parse(path, e))?;
    info!(path = %path.display(), records = records.len(), "dataset loaded");
    Ok(RecordStore::new(records))
}

#[derive(Deserialize)]
struct RawExclusion {
    #[serde(default, deserialize_with = "lenient_string")]
    curso: String,
    #[serde(default, deserialize_with = "lenient_string")]
    turno: String,
    #[serde(default, deserialize_with = "lenient_string")]
    campus: String,
}

pub fn parse_exclusions(content: &str) -> Result<ExclusionIndex, serde_json::Error> {
    let raw: Vec<RawExclusion> = serde_json::from_str(content)?;
    Ok(ExclusionIndex::new(
        raw.iter()
            .map(|e| ExclusionKey::new(&e.curso, &e.turno, &e.campus)),
    ))
}

/// Loads the unconfirmed-class list. A missing or broken file degrades to an
/// empty index so every class reads as confirmed.
pub fn load_exclusions(path: Option<&Path>) -> ExclusionIndex {
    let Some(path) = path else {
        info!("no exclusion list configured; all classes default to confirmed");
        return ExclusionIndex::default();
    };
    let parsed = std::fs::read_to_string(path)
        .map_err(|e| LoadError::io(path, e))
        .and_then(|content| parse_exclusions(&content).map_err(|e| LoadError::parse(path, e)));
    match parsed {
        Ok(index) => {
            if index.is_empty() {
                warn!(path = %path.display(), "exclusion list has no entries");
            } else {
                info!(path = %path.display(), entries = index.len(), "exclusion list loaded");
            }
            index
        }
        Err(err) => {
            warn!(error = %err, "exclusion list unavailable; using empty index");
            ExclusionIndex::default()
        }
    }
}

/// Course names for the focused view.
pub fn load_course_allowlist(path: &Path) -> Result<Vec<String>, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|e| LoadError::io(path, e))?;
    let courses: Vec<String> =
        serde_json::from_str(&content).map_err(|e| LoadError::parse(path, e))?;
    info!(path = %path.display(), courses = courses.len(), "course allow-list loaded");
    Ok(courses)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {"Curso": "Direito", "Turno": "Noite", "Fase": 1,
         "Status do Atendimento": "Confirmado", "Modelo de Ensino": "Presencial",
         "Campus / Polo": "Campus A", "Data/Hora Inscrição": "2025-01-10 10:00",
         "Flag Matrícula Financeira": 1, "Flag Matrícula Acadêmica": NaN,
         "Documentação Obrigatória Entregue": 0.0},
        {"Curso": null, "Turno": "Manhã",
         "Flag Matrícula Financeira": -Infinity, "Flag Matrícula Acadêmica": 1}
    ]"#;

    #[test]
    fn non_finite_tokens_become_null_flags() {
        let records = parse_records(SAMPLE).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].financial, Flag::One);
        assert_eq!(records[0].academic, Flag::Unknown);
        assert_eq!(records[0].documents, Flag::Zero);
        assert_eq!(records[1].financial, Flag::Unknown);
        assert_eq!(records[1].academic, Flag::One);
    }

    #[test]
    fn textual_flags_stay_unknown() {
        let records = parse_records(
            r#"[{"Flag Matrícula Financeira": "1", "Flag Matrícula Acadêmica": "0",
                 "Documentação Obrigatória Entregue": true}]"#,
        )
        .unwrap();
        assert_eq!(records[0].financial, Flag::Unknown);
        assert_eq!(records[0].academic, Flag::Unknown);
        assert_eq!(records[0].documents, Flag::Unknown);
    }

    #[test]
    fn string_fields_tolerate_numbers_and_nulls() {
        let records = parse_records(SAMPLE).unwrap();
        assert_eq!(records[0].phase, "1");
        assert_eq!(records[1].course, "");
        assert_eq!(records[1].campus, "");
    }

    #[test]
    fn missing_dataset_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_records(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn malformed_dataset_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "[{\"Curso\": ").unwrap();
        assert!(matches!(load_records(&path), Err(LoadError::Parse { .. })));
    }

    #[test]
    fn broken_exclusion_list_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("turmas.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(load_exclusions(Some(&path)).is_empty());
        assert!(load_exclusions(Some(&dir.path().join("absent.json"))).is_empty());
        assert!(load_exclusions(None).is_empty());
    }

    #[test]
    fn exclusion_entries_are_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("turmas.json");
        std::fs::write(
            &path,
            r#"[{"curso": " Direito ", "turno": "noite", "campus": "Campus A"}]"#,
        )
        .unwrap();
        let index = load_exclusions(Some(&path));
        assert_eq!(index.len(), 1);
        assert!(index.is_unconfirmed("DIREITO", "Noite", "campus a"));
    }
}
