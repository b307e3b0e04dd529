use crate::models::{ClassGroup, ConfirmationStatus, ConsolidatedCell, CourseAggregate};

/// Metric a course ranking is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Total,
    Financial,
    Academic,
}

impl Metric {
    pub fn of(self, course: &CourseAggregate) -> usize {
        match self {
            Metric::Total => course.total,
            Metric::Financial => course.mat_fin,
            Metric::Academic => course.mat_acad,
        }
    }
}

/// Highest `n` by metric. Stable, so ties keep aggregation order.
pub fn top_n(courses: &[CourseAggregate], metric: Metric, n: usize) -> Vec<CourseAggregate> {
    let mut ranked = courses.to_vec();
    ranked.sort_by(|a, b| metric.of(b).cmp(&metric.of(a)));
    ranked.truncate(n);
    ranked
}

/// Lowest `n` by metric among courses with any activity. Courses at zero
/// are inactive, not underperforming, so they never appear and the result
/// is not padded.
pub fn bottom_n(courses: &[CourseAggregate], metric: Metric, n: usize) -> Vec<CourseAggregate> {
    let mut ranked: Vec<CourseAggregate> = courses
        .iter()
        .filter(|c| metric.of(c) > 0)
        .cloned()
        .collect();
    ranked.sort_by_key(|c| metric.of(c));
    ranked.truncate(n);
    ranked
}

/// Unconfirmed classes first, then by academic enrollments descending.
pub fn order_class_groups(groups: &mut [ClassGroup]) {
    groups.sort_by(|a, b| {
        let unconfirmed_first = (b.status == ConfirmationStatus::Unconfirmed)
            .cmp(&(a.status == ConfirmationStatus::Unconfirmed));
        unconfirmed_first.then_with(|| b.mat_acad.cmp(&a.mat_acad))
    });
}

/// Consolidated cells read as a cross-tab: campus, then course, then turn.
pub fn order_cells(cells: &mut [ConsolidatedCell]) {
    cells.sort_by(|a, b| {
        a.campus
            .cmp(&b.campus)
            .then_with(|| a.curso.cmp(&b.curso))
            .then_with(|| a.turno.cmp(&b.turno))
    });
}
