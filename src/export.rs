use std::io::Write;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use crate::models::ClassGroup;

#[derive(Serialize)]
struct ClassCsvRow<'a> {
    curso: &'a str,
    modelo: &'a str,
    turno: &'a str,
    campus: &'a str,
    total: usize,
    mat_fin: usize,
    mat_acad: usize,
    pe: Option<u32>,
    status: &'static str,
}

impl<'a> From<&'a ClassGroup> for ClassCsvRow<'a> {
    fn from(group: &'a ClassGroup) -> Self {
        Self {
            curso: &group.curso,
            modelo: &group.modelo,
            turno: &group.turno,
            campus: &group.campus,
            total: group.total,
            mat_fin: group.mat_fin,
            mat_acad: group.mat_acad,
            pe: group.pe,
            status: group.status.label(),
        }
    }
}

/// Writes the ordered class table, one row per class group.
pub fn write_classes<W: Write>(writer: W, classes: &[ClassGroup]) -> anyhow::Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for group in classes {
        csv.serialize(ClassCsvRow::from(group))?;
    }
    csv.flush()?;
    Ok(())
}

pub fn export_classes(path: &Path, classes: &[ClassGroup]) -> anyhow::Result<usize> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_classes(file, classes)?;
    Ok(classes.len())
}
