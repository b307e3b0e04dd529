use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::filter::FilterParams;
use crate::models::{ConfirmationStatus, CourseAggregate};
use crate::query::Evaluation;
use crate::rank::{self, Metric};

pub fn describe_filters(filters: &FilterParams) -> String {
    if filters.is_empty() {
        return "all records".to_string();
    }
    let mut parts = Vec::new();
    let mut push = |name: &str, value: &Option<String>| {
        if let Some(v) = value {
            parts.push(format!("{name}={v}"));
        }
    };
    push("curso", &filters.course);
    push("turno", &filters.turn);
    push("modelo", &filters.model);
    push("campus", &filters.campus);
    push("fase", &filters.phase);
    push("busca", &filters.search);
    for (name, flag) in [
        ("flagFinanceira", filters.financial),
        ("flagDocumentacao", filters.documents),
        ("flagAcademica", filters.academic),
    ] {
        if let Some(flag) = flag {
            parts.push(format!("{name}={}", flag.label()));
        }
    }

    parts.join(", ")
}

fn write_ranking(output: &mut String, title: &str, courses: &[CourseAggregate], metric: Metric) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## {title}");
    if courses.is_empty() {
        let _ = writeln!(output, "No active courses for this selection.");
        return;
    }
    for course in courses {
        let _ = writeln!(output, "- {}: {}", course.nome, metric.of(course));
    }
}

pub fn build_report(
    view: &str,
    filters: &FilterParams,
    generated_at: DateTime<Utc>,
    evaluation: &Evaluation<'_>,
) -> String {
    let kpis = &evaluation.kpis;
    let mut output = String::new();

    let _ = writeln!(output, "# Enrollment Dashboard Report");
    let _ = writeln!(
        output,
        "View `{}` for {} (generated {})",
        view,
        describe_filters(filters),
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "- Opportunities: {}", kpis.total_oportunidades);
    let _ = writeln!(output, "- Financial enrollments: {}", kpis.total_mat_fin);
    let _ = writeln!(output, "- Academic enrollments: {}", kpis.total_mat_acad);
    let _ = writeln!(
        output,
        "- Required documents delivered: {}",
        kpis.total_documentacao
    );
    let _ = writeln!(
        output,
        "- Classes: {} ({} confirmed, {} not confirmed, {}% confirmed)",
        kpis.total_turmas,
        kpis.turmas_confirmadas,
        kpis.turmas_nao_confirmadas,
        kpis.percentual_confirmacao
    );

    write_ranking(
        &mut output,
        "Top Courses by Financial Enrollment",
        &evaluation.charts.top_mat_fin,
        Metric::Financial,
    );
    write_ranking(
        &mut output,
        "Lowest Active Courses by Financial Enrollment",
        &evaluation.charts.bottom_mat_fin,
        Metric::Financial,
    );
    write_ranking(
        &mut output,
        "Top Courses by Academic Enrollment",
        &evaluation.charts.top_mat_acad,
        Metric::Academic,
    );
    write_ranking(
        &mut output,
        "Lowest Active Courses by Academic Enrollment",
        &evaluation.charts.bottom_mat_acad,
        Metric::Academic,
    );
    if let Some(top) = &evaluation.charts.top_courses {
        write_ranking(&mut output, "Courses by Volume", top, Metric::Total);
    }

    let unconfirmed: Vec<_> = evaluation
        .classes
        .iter()
        .filter(|c| c.status == ConfirmationStatus::Unconfirmed)
        .collect();
    let _ = writeln!(output);
    let _ = writeln!(output, "## Unconfirmed Classes");
    if unconfirmed.is_empty() {
        let _ = writeln!(output, "Every class in this selection is confirmed.");
    } else {
        for class in unconfirmed {
            let _ = writeln!(
                output,
                "- {} / {} / {} / {}: {} opportunities, {} financial, {} academic",
                class.curso,
                class.modelo,
                class.turno,
                class.campus,
                class.total,
                class.mat_fin,
                class.mat_acad
            );
        }
    }

    if !evaluation.cells.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Consolidated View");
        let _ = writeln!(
            output,
            "| Campus | Course | Turn | Total | Confirmed | Not confirmed | Financial | Academic | Conversion |"
        );
        let _ = writeln!(output, "|---|---|---|---|---|---|---|---|---|");
        for cell in &evaluation.cells {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} | {} | {} | {} | {}% |",
                cell.campus,
                cell.curso,
                cell.turno,
                cell.total,
                cell.confirmados,
                cell.nao_confirmados,
                cell.mat_fin,
                cell.mat_acad,
                cell.conversao
            );
        }
    }

    output
}

/// Console lines for the `summary` command.
pub fn summary_lines(evaluation: &Evaluation<'_>, limit: usize) -> Vec<String> {
    let kpis = &evaluation.kpis;
    let mut lines = vec![
        format!(
            "{} opportunities: {} financial, {} academic, {} with documents",
            kpis.total_oportunidades, kpis.total_mat_fin, kpis.total_mat_acad, kpis.total_documentacao
        ),
        format!(
            "{} classes: {} confirmed, {} not confirmed ({}% confirmed)",
            kpis.total_turmas,
            kpis.turmas_confirmadas,
            kpis.turmas_nao_confirmadas,
            kpis.percentual_confirmacao
        ),
        "Top courses by academic enrollment:".to_string(),
    ];
    for course in rank::top_n(&evaluation.courses, Metric::Academic, limit) {
        lines.push(format!(
            "- {} ({} records, {} financial, {} academic)",
            course.nome, course.total, course.mat_fin, course.mat_acad
        ));
    }
    lines
}
