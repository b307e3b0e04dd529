use std::collections::HashMap;
use std::hash::Hash;

use crate::exclusions::{normalize, ExclusionIndex};
use crate::models::{
    CellKey, ClassGroup, ClassKey, ConsolidatedCell, CourseAggregate, EnrollmentRecord,
};

/// Running counters for one group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub total: usize,
    pub financial: usize,
    pub academic: usize,
    pub status_confirmed: usize,
    pub status_unconfirmed: usize,
}

impl Tally {
    fn add(&mut self, record: &EnrollmentRecord) {
        self.total += 1;
        if record.financial.is_set() {
            self.financial += 1;
        }
        if record.academic.is_set() {
            self.academic += 1;
        }
        match classify_attendance(&record.attendance_status) {
            Some(true) => self.status_confirmed += 1,
            Some(false) => self.status_unconfirmed += 1,
            None => {}
        }
    }
}

/// Reads a per-record attendance status: `Some(true)` for confirmed,
/// `Some(false)` for a negated confirmation, `None` for anything else.
pub fn classify_attendance(status: &str) -> Option<bool> {
    let status = normalize(status);
    if !status.contains("CONFIRMAD") {
        return None;
    }
    let negated = status.contains("NÃO") || status.contains("NAO");
    Some(!negated)
}

/// Percentage with one decimal digit, halves rounded up; `"0"` when the
/// denominator is zero.
pub fn percentage(part: usize, whole: usize) -> String {
    if whole == 0 {
        return "0".to_string();
    }
    let tenths = (part as f64 / whole as f64 * 1000.0).round();
    format!("{:.1}", tenths / 10.0)
}

/// Folds every record into its group exactly once. Groups come back in
/// first-seen order, which downstream stable sorts use as their tie-break.
pub fn fold_by<'a, I, K, F>(records: I, key: F) -> Vec<(K, Tally)>
where
    I: IntoIterator<Item = &'a EnrollmentRecord>,
    K: Eq + Hash + Clone,
    F: Fn(&EnrollmentRecord) -> K,
{
    let mut slots: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Tally)> = Vec::new();

    for record in records {
        let group_key = key(record);
        let slot = *slots.entry(group_key.clone()).or_insert_with(|| {
            groups.push((group_key, Tally::default()));
            groups.len() - 1
        });
        groups[slot].1.add(record);
    }

    groups
}

/// Class groups with their confirmation verdict resolved from the
/// exclusion index on (course, turn, campus).
pub fn class_groups<'a, I>(
    records: I,
    exclusions: &ExclusionIndex,
    break_even: Option<u32>,
) -> Vec<ClassGroup>
where
    I: IntoIterator<Item = &'a EnrollmentRecord>,
{
    fold_by(records, EnrollmentRecord::class_key)
        .into_iter()
        .map(|(key, tally): (ClassKey, Tally)| {
            let status = exclusions.resolve(&key.course, &key.turn, &key.campus);
            ClassGroup {
                curso: key.course,
                modelo: key.model,
                turno: key.turn,
                campus: key.campus,
                total: tally.total,
                mat_fin: tally.financial,
                mat_acad: tally.academic,
                pe: break_even,
                status,
            }
        })
        .collect()
}

pub fn course_aggregates<'a, I>(records: I) -> Vec<CourseAggregate>
where
    I: IntoIterator<Item = &'a EnrollmentRecord>,
{
    fold_by(records, EnrollmentRecord::course_key)
        .into_iter()
        .map(|(nome, tally)| CourseAggregate {
            nome,
            total: tally.total,
            mat_fin: tally.financial,
            mat_acad: tally.academic,
        })
        .collect()
}

pub fn consolidated_cells<'a, I>(records: I) -> Vec<ConsolidatedCell>
where
    I: IntoIterator<Item = &'a EnrollmentRecord>,
{
    let groups = fold_by(records, EnrollmentRecord::cell_key);

    // counts are final here, so the rate never sees a partial denominator
    groups
        .into_iter()
        .map(|(key, tally): (CellKey, Tally)| ConsolidatedCell {
            campus: key.campus,
            curso: key.course,
            turno: key.turn,
            total: tally.total,
            confirmados: tally.status_confirmed,
            nao_confirmados: tally.status_unconfirmed,
            mat_fin: tally.financial,
            mat_acad: tally.academic,
            conversao: percentage(tally.academic, tally.total),
        })
        .collect()
}
