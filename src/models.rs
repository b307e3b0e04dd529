use serde::{Serialize, Serializer};

/// Placeholder used wherever a missing field becomes a grouping key.
pub const NOT_INFORMED: &str = "N/I";

/// Tri-state enrollment flag. Malformed source values land in `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flag {
    Zero,
    One,
    #[default]
    Unknown,
}

impl Flag {
    pub fn is_set(self) -> bool {
        self == Flag::One
    }

    pub fn as_number(self) -> Option<u8> {
        match self {
            Flag::Zero => Some(0),
            Flag::One => Some(1),
            Flag::Unknown => None,
        }
    }
}

impl Serialize for Flag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_number().serialize(serializer)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnrollmentRecord {
    pub course: String,
    pub turn: String,
    pub phase: String,
    pub attendance_status: String,
    pub teaching_model: String,
    pub campus: String,
    pub registered_at: String,
    pub financial: Flag,
    pub academic: Flag,
    pub documents: Flag,
}

fn or_not_informed(value: &str) -> &str {
    if value.is_empty() {
        NOT_INFORMED
    } else {
        value
    }
}

impl EnrollmentRecord {
    pub fn class_key(&self) -> ClassKey {
        ClassKey {
            course: or_not_informed(&self.course).to_string(),
            model: or_not_informed(&self.teaching_model).to_string(),
            turn: or_not_informed(&self.turn).to_string(),
            campus: or_not_informed(&self.campus).to_string(),
        }
    }

    pub fn course_key(&self) -> String {
        or_not_informed(&self.course).to_string()
    }

    pub fn cell_key(&self) -> CellKey {
        CellKey {
            campus: or_not_informed(&self.campus).to_string(),
            course: or_not_informed(&self.course).to_string(),
            turn: or_not_informed(&self.turn).to_string(),
        }
    }
}

/// Course x teaching model x turn x campus.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassKey {
    pub course: String,
    pub model: String,
    pub turn: String,
    pub campus: String,
}

/// Campus x course x turn, the consolidated view's grouping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellKey {
    pub campus: String,
    pub course: String,
    pub turn: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConfirmationStatus {
    #[serde(rename = "Confirmado")]
    Confirmed,
    #[serde(rename = "Não Confirmado")]
    Unconfirmed,
}

impl ConfirmationStatus {
    pub fn label(self) -> &'static str {
        match self {
            ConfirmationStatus::Confirmed => "Confirmado",
            ConfirmationStatus::Unconfirmed => "Não Confirmado",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassGroup {
    pub curso: String,
    pub modelo: String,
    pub turno: String,
    pub campus: String,
    pub total: usize,
    pub mat_fin: usize,
    pub mat_acad: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pe: Option<u32>,
    pub status: ConfirmationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseAggregate {
    pub nome: String,
    pub total: usize,
    pub mat_fin: usize,
    pub mat_acad: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedCell {
    pub campus: String,
    pub curso: String,
    pub turno: String,
    pub total: usize,
    pub confirmados: usize,
    pub nao_confirmados: usize,
    pub mat_fin: usize,
    pub mat_acad: usize,
    /// Academic conversion as a percentage, one decimal digit.
    pub conversao: String,
}

/// One row of the detailed record table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordRow {
    pub curso: String,
    pub turno: String,
    pub fase: String,
    pub status: String,
    pub modelo: String,
    pub campus: String,
    pub data_inscricao: String,
    pub mat_fin: Flag,
    pub mat_acad: Flag,
    pub documentacao: Flag,
}

impl From<&EnrollmentRecord> for RecordRow {
    fn from(record: &EnrollmentRecord) -> Self {
        Self {
            curso: record.course.clone(),
            turno: record.turn.clone(),
            fase: record.phase.clone(),
            status: record.attendance_status.clone(),
            modelo: record.teaching_model.clone(),
            campus: record.campus.clone(),
            data_inscricao: record.registered_at.clone(),
            mat_fin: record.financial,
            mat_acad: record.academic,
            documentacao: record.documents,
        }
    }
}
