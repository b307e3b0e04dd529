use std::collections::HashMap;

use crate::models::{EnrollmentRecord, Flag};

/// Sentinel meaning "no constraint" in selector parameters.
const ANY: [&str; 2] = ["todos", "all"];

/// Which fields the free-text search looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// course, turn, teaching model, campus
    ClassFields,
    /// course, turn, phase, status, teaching model, campus
    AllFields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagFilter {
    Yes,
    No,
}

impl FlagFilter {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "sim" | "yes" => Some(FlagFilter::Yes),
            "nao" | "não" | "no" => Some(FlagFilter::No),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FlagFilter::Yes => "sim",
            FlagFilter::No => "nao",
        }
    }

    fn matches(self, flag: Flag) -> bool {
        match self {
            FlagFilter::Yes => flag == Flag::One,
            FlagFilter::No => flag == Flag::Zero,
        }
    }
}

/// Conjunction of optional predicates; `None` means unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterParams {
    pub course: Option<String>,
    pub turn: Option<String>,
    pub model: Option<String>,
    pub campus: Option<String>,
    pub phase: Option<String>,
    pub financial: Option<FlagFilter>,
    pub documents: Option<FlagFilter>,
    pub academic: Option<FlagFilter>,
    /// Lower-cased search needle.
    pub search: Option<String>,
}

fn selector(value: Option<&String>) -> Option<String> {
    let value = value?;
    if value.is_empty() || ANY.contains(&value.to_lowercase().as_str()) {
        return None;
    }
    Some(value.clone())
}

impl FilterParams {
    /// Reads the dashboard's query parameter names. Unknown or empty values
    /// impose no constraint.
    pub fn from_query(params: &HashMap<String, String>) -> Self {
        let flag = |name: &str| params.get(name).and_then(|v| FlagFilter::parse(v));
        Self {
            course: selector(params.get("curso")),
            turn: selector(params.get("turno")),
            model: selector(params.get("modelo")),
            campus: selector(params.get("campus")),
            phase: selector(params.get("fase")),
            financial: flag("flagFinanceira"),
            documents: flag("flagDocumentacao"),
            academic: flag("flagAcademica"),
            search: params
                .get("busca")
                .map(|s| s.to_lowercase())
                .filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == FilterParams::default()
    }

    pub fn matches(&self, record: &EnrollmentRecord, scope: SearchScope) -> bool {
        let exact = |wanted: &Option<String>, actual: &str| {
            wanted.as_deref().map_or(true, |w| w == actual)
        };
        let flag = |wanted: Option<FlagFilter>, actual: Flag| {
            wanted.map_or(true, |w| w.matches(actual))
        };

        exact(&self.course, &record.course)
            && exact(&self.turn, &record.turn)
            && exact(&self.model, &record.teaching_model)
            && exact(&self.campus, &record.campus)
            && exact(&self.phase, &record.phase)
            && flag(self.financial, record.financial)
            && flag(self.documents, record.documents)
            && flag(self.academic, record.academic)
            && self
                .search
                .as_deref()
                .map_or(true, |needle| search_text(record, scope).contains(needle))
    }
}

fn search_text(record: &EnrollmentRecord, scope: SearchScope) -> String {
    let text = match scope {
        SearchScope::ClassFields => format!(
            "{} {} {} {}",
            record.course, record.turn, record.teaching_model, record.campus
        ),
        SearchScope::AllFields => format!(
            "{} {} {} {} {} {}",
            record.course,
            record.turn,
            record.phase,
            record.attendance_status,
            record.teaching_model,
            record.campus
        ),
    };
    text.to_lowercase()
}

/// Records satisfying every predicate, in source order.
pub fn apply<'a, I>(records: I, params: &FilterParams, scope: SearchScope) -> Vec<&'a EnrollmentRecord>
where
    I: IntoIterator<Item = &'a EnrollmentRecord>,
{
    records
        .into_iter()
        .filter(|record| params.matches(record, scope))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(course: &str, turn: &str, phase: &str, financial: Flag) -> EnrollmentRecord {
        EnrollmentRecord {
            course: course.to_string(),
            turn: turn.to_string(),
            phase: phase.to_string(),
            attendance_status: "Matriculado".to_string(),
            teaching_model: "Presencial".to_string(),
            campus: "Campus Centro".to_string(),
            financial,
            ..Default::default()
        }
    }

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn dataset() -> Vec<EnrollmentRecord> {
        vec![
            record("Direito", "Noite", "1", Flag::One),
            record("Enfermagem", "Manhã", "2", Flag::Zero),
            record("Direito", "Manhã", "1", Flag::Unknown),
            record("Psicologia", "Noite", "3", Flag::One),
        ]
    }

    #[test]
    fn todos_and_empty_values_are_unconstrained() {
        let params = FilterParams::from_query(&query(&[
            ("curso", "todos"),
            ("turno", ""),
            ("flagFinanceira", "todos"),
            ("busca", "  "),
        ]));
        assert!(params.is_empty());
        let data = dataset();
        assert_eq!(apply(&data, &params, SearchScope::ClassFields).len(), 4);
    }

    #[test]
    fn predicates_are_conjunctive_and_keep_order() {
        let data = dataset();
        let params = FilterParams::from_query(&query(&[("curso", "Direito"), ("fase", "1")]));
        let hits = apply(&data, &params, SearchScope::ClassFields);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].turn, "Noite");
        assert_eq!(hits[1].turn, "Manhã");
        assert!(hits.iter().all(|r| r.course == "Direito" && r.phase == "1"));
    }

    #[test]
    fn unknown_flags_never_match_yes_or_no() {
        let data = dataset();
        let yes = FilterParams::from_query(&query(&[("flagFinanceira", "sim")]));
        let no = FilterParams::from_query(&query(&[("flagFinanceira", "nao")]));
        let yes_hits = apply(&data, &yes, SearchScope::AllFields);
        let no_hits = apply(&data, &no, SearchScope::AllFields);
        assert_eq!(yes_hits.len(), 2);
        assert_eq!(no_hits.len(), 1);
        assert_eq!(no_hits[0].course, "Enfermagem");
    }

    #[test]
    fn document_flag_filters_its_own_field() {
        let mut data = dataset();
        data[0].documents = Flag::Zero;
        data[1].documents = Flag::One;
        data[1].academic = Flag::Zero;
        data[3].academic = Flag::One;
        let params = FilterParams::from_query(&query(&[("flagDocumentacao", "sim")]));
        assert_eq!(params.documents, Some(FlagFilter::Yes));
        assert!(params.academic.is_none());
        let hits = apply(&data, &params, SearchScope::AllFields);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].course, "Enfermagem");
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let data = dataset();
        let params = FilterParams::from_query(&query(&[("busca", "DIREITO noi")]));
        let hits = apply(&data, &params, SearchScope::ClassFields);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].turn, "Noite");
    }

    #[test]
    fn search_scope_controls_status_visibility() {
        let data = dataset();
        let params = FilterParams::from_query(&query(&[("busca", "matriculado")]));
        assert!(apply(&data, &params, SearchScope::ClassFields).is_empty());
        assert_eq!(apply(&data, &params, SearchScope::AllFields).len(), 4);
    }

    #[test]
    fn filter_values_matching_nothing_yield_empty() {
        let data = dataset();
        let params = FilterParams::from_query(&query(&[("campus", "Inexistente")]));
        assert!(apply(&data, &params, SearchScope::ClassFields).is_empty());
    }
}
