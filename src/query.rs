use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::aggregate::{self, percentage};
use crate::exclusions::{normalize, ExclusionIndex};
use crate::filter::{self, FilterParams, SearchScope};
use crate::loader::RecordStore;
use crate::models::{
    ClassGroup, ConfirmationStatus, ConsolidatedCell, CourseAggregate, EnrollmentRecord, RecordRow,
};
use crate::paginate::{
    paginate, parse_page, Page, CELL_PAGE_SIZE, CLASS_PAGE_SIZE, RECORD_PAGE_SIZE,
};
use crate::rank::{self, Metric};

pub const DEFAULT_BREAK_EVEN: u32 = 15;
const RANKING_SIZE: usize = 5;
const TOP_COURSES_SIZE: usize = 10;

/// One dashboard variant: the same pipeline with different knobs.
#[derive(Debug, Clone)]
pub struct ViewConfig {
    pub name: String,
    pub route: String,
    pub search_scope: SearchScope,
    /// Normalized course names; `None` admits every course.
    pub course_allowlist: Option<HashSet<String>>,
    pub break_even: Option<u32>,
    pub record_table: bool,
    pub consolidated: bool,
    pub top_courses: bool,
}

impl ViewConfig {
    fn admits(&self, record: &EnrollmentRecord) -> bool {
        self.course_allowlist
            .as_ref()
            .map_or(true, |allowed| allowed.contains(&normalize(&record.course)))
    }
}

/// The stock views. The focused view only exists when an allow-list is given.
pub fn builtin_views(break_even: u32, allowlist: Option<Vec<String>>) -> Vec<ViewConfig> {
    let mut views = vec![
        ViewConfig {
            name: "turmas".to_string(),
            route: "/api/dashboard".to_string(),
            search_scope: SearchScope::ClassFields,
            course_allowlist: None,
            break_even: Some(break_even),
            record_table: false,
            consolidated: false,
            top_courses: false,
        },
        ViewConfig {
            name: "oportunidades".to_string(),
            route: "/api/oportunidades".to_string(),
            search_scope: SearchScope::AllFields,
            course_allowlist: None,
            break_even: None,
            record_table: true,
            consolidated: true,
            top_courses: true,
        },
    ];
    if let Some(courses) = allowlist {
        views.push(ViewConfig {
            name: "foco".to_string(),
            route: "/api/foco".to_string(),
            search_scope: SearchScope::ClassFields,
            course_allowlist: Some(courses.iter().map(|c| normalize(c)).collect()),
            break_even: Some(break_even),
            record_table: false,
            consolidated: false,
            top_courses: false,
        });
    }
    views
}

/// Distinct selector values, taken from a view's unfiltered base set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOptions {
    pub cursos: Vec<String>,
    pub turnos: Vec<String>,
    pub modelos: Vec<String>,
    pub campus: Vec<String>,
    pub fases: Vec<String>,
}

impl FilterOptions {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a EnrollmentRecord>,
    {
        let mut cursos = BTreeSet::new();
        let mut turnos = BTreeSet::new();
        let mut modelos = BTreeSet::new();
        let mut campus = BTreeSet::new();
        let mut fases = BTreeSet::new();
        let add = |set: &mut BTreeSet<String>, value: &str| {
            if !value.is_empty() {
                set.insert(value.to_string());
            }
        };
        for record in records {
            add(&mut cursos, &record.course);
            add(&mut turnos, &record.turn);
            add(&mut modelos, &record.teaching_model);
            add(&mut campus, &record.campus);
            add(&mut fases, &record.phase);
        }
        Self {
            cursos: cursos.into_iter().collect(),
            turnos: turnos.into_iter().collect(),
            modelos: modelos.into_iter().collect(),
            campus: campus.into_iter().collect(),
            fases: fases.into_iter().collect(),
        }
    }
}

/// Parsed request parameters. Malformed numbers already fell back to page 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pub filters: FilterParams,
    pub page: usize,
    pub view_page: usize,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            filters: FilterParams::default(),
            page: 1,
            view_page: 1,
        }
    }
}

impl QueryParams {
    pub fn from_query(params: &HashMap<String, String>) -> Self {
        Self {
            filters: FilterParams::from_query(params),
            page: parse_page(params.get("pagina").map(String::as_str)),
            view_page: parse_page(params.get("paginaVisao").map(String::as_str)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub total_oportunidades: usize,
    pub total_mat_fin: usize,
    pub total_mat_acad: usize,
    pub total_documentacao: usize,
    pub total_turmas: usize,
    pub turmas_confirmadas: usize,
    pub turmas_nao_confirmadas: usize,
    pub percentual_confirmacao: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationSplit {
    pub confirmadas: usize,
    pub nao_confirmadas: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Charts {
    #[serde(rename = "top5MatFin")]
    pub top_mat_fin: Vec<CourseAggregate>,
    #[serde(rename = "bottom5MatFin")]
    pub bottom_mat_fin: Vec<CourseAggregate>,
    #[serde(rename = "top5MatAcad")]
    pub top_mat_acad: Vec<CourseAggregate>,
    #[serde(rename = "bottom5MatAcad")]
    pub bottom_mat_acad: Vec<CourseAggregate>,
    #[serde(rename = "top10Cursos", skip_serializing_if = "Option::is_none")]
    pub top_courses: Option<Vec<CourseAggregate>>,
    pub percentual_confirmacao: ConfirmationSplit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub kpis: Kpis,
    pub graficos: Charts,
    pub filtros: FilterOptions,
    pub turmas: Page<ClassGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tabela: Option<Page<RecordRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visao_consolidada: Option<Page<ConsolidatedCell>>,
    pub gerado_em: DateTime<Utc>,
}

/// Full, unpaginated result of one pass through the pipeline.
#[derive(Debug, Clone)]
pub struct Evaluation<'a> {
    pub records: Vec<&'a EnrollmentRecord>,
    /// Unconfirmed first, then by academic enrollments.
    pub classes: Vec<ClassGroup>,
    pub courses: Vec<CourseAggregate>,
    /// Empty unless the view enables the consolidated section.
    pub cells: Vec<ConsolidatedCell>,
    pub kpis: Kpis,
    pub charts: Charts,
}

#[derive(Debug)]
pub struct PreparedView {
    pub config: ViewConfig,
    pub options: FilterOptions,
}

/// Read-only store, exclusion index and views, shared by every request.
#[derive(Debug)]
pub struct Dashboard {
    store: RecordStore,
    exclusions: ExclusionIndex,
    views: Vec<PreparedView>,
}

impl Dashboard {
    pub fn new(store: RecordStore, exclusions: ExclusionIndex, views: Vec<ViewConfig>) -> Self {
        let views = views
            .into_iter()
            .map(|config| {
                let options = FilterOptions::from_records(
                    store.records().iter().filter(|r| config.admits(r)),
                );
                PreparedView { config, options }
            })
            .collect();
        Self {
            store,
            exclusions,
            views,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn views(&self) -> &[PreparedView] {
        &self.views
    }

    pub fn view(&self, name: &str) -> Option<&PreparedView> {
        self.views.iter().find(|v| v.config.name == name)
    }

    /// Filter, aggregate, resolve statuses and rank for one view.
    pub fn evaluate(&self, view: &PreparedView, params: &QueryParams) -> Evaluation<'_> {
        let config = &view.config;
        let base = self.store.records().iter().filter(|r| config.admits(r));
        let records = filter::apply(base, &params.filters, config.search_scope);

        let mut classes =
            aggregate::class_groups(records.iter().copied(), &self.exclusions, config.break_even);
        rank::order_class_groups(&mut classes);
        let courses = aggregate::course_aggregates(records.iter().copied());
        let mut cells = if config.consolidated {
            aggregate::consolidated_cells(records.iter().copied())
        } else {
            Vec::new()
        };
        rank::order_cells(&mut cells);

        let kpis = kpis(&records, &classes);
        let charts = Charts {
            top_mat_fin: rank::top_n(&courses, Metric::Financial, RANKING_SIZE),
            bottom_mat_fin: rank::bottom_n(&courses, Metric::Financial, RANKING_SIZE),
            top_mat_acad: rank::top_n(&courses, Metric::Academic, RANKING_SIZE),
            bottom_mat_acad: rank::bottom_n(&courses, Metric::Academic, RANKING_SIZE),
            top_courses: config
                .top_courses
                .then(|| rank::top_n(&courses, Metric::Total, TOP_COURSES_SIZE)),
            percentual_confirmacao: ConfirmationSplit {
                confirmadas: kpis.turmas_confirmadas,
                nao_confirmadas: kpis.turmas_nao_confirmadas,
            },
        };

        debug!(
            view = %config.name,
            filtered = records.len(),
            classes = classes.len(),
            courses = courses.len(),
            "view evaluated"
        );

        Evaluation {
            records,
            classes,
            courses,
            cells,
            kpis,
            charts,
        }
    }

    /// Evaluate and paginate into the response payload.
    pub fn respond(&self, view: &PreparedView, params: &QueryParams) -> DashboardResponse {
        let config = &view.config;
        let evaluation = self.evaluate(view, params);

        let tabela = config.record_table.then(|| {
            let rows = evaluation
                .records
                .iter()
                .map(|r| RecordRow::from(*r))
                .collect();
            paginate(rows, params.page, RECORD_PAGE_SIZE)
        });
        let visao_consolidada = config
            .consolidated
            .then(|| paginate(evaluation.cells, params.view_page, CELL_PAGE_SIZE));

        DashboardResponse {
            kpis: evaluation.kpis,
            graficos: evaluation.charts,
            filtros: view.options.clone(),
            turmas: paginate(evaluation.classes, params.page, CLASS_PAGE_SIZE),
            tabela,
            visao_consolidada,
            gerado_em: Utc::now(),
        }
    }
}

fn kpis(records: &[&EnrollmentRecord], classes: &[ClassGroup]) -> Kpis {
    let count = |pred: fn(&EnrollmentRecord) -> bool| records.iter().filter(|r| pred(r)).count();
    let confirmed = classes
        .iter()
        .filter(|c| c.status == ConfirmationStatus::Confirmed)
        .count();
    Kpis {
        total_oportunidades: records.len(),
        total_mat_fin: count(|r| r.financial.is_set()),
        total_mat_acad: count(|r| r.academic.is_set()),
        total_documentacao: count(|r| r.documents.is_set()),
        total_turmas: classes.len(),
        turmas_confirmadas: confirmed,
        turmas_nao_confirmadas: classes.len() - confirmed,
        percentual_confirmacao: percentage(confirmed, classes.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exclusions::ExclusionKey;
    use crate::models::Flag;

    fn record(course: &str, turn: &str, campus: &str, academic: Flag) -> EnrollmentRecord {
        EnrollmentRecord {
            course: course.to_string(),
            turn: turn.to_string(),
            phase: "1".to_string(),
            attendance_status: "Confirmado".to_string(),
            teaching_model: "Presencial".to_string(),
            campus: campus.to_string(),
            registered_at: "2025-01-10".to_string(),
            financial: Flag::One,
            academic,
            documents: Flag::Unknown,
        }
    }

    fn dashboard(records: Vec<EnrollmentRecord>, allowlist: Option<Vec<String>>) -> Dashboard {
        let exclusions = ExclusionIndex::new([ExclusionKey::new("Direito", "Noite", "A")]);
        Dashboard::new(
            RecordStore::new(records),
            exclusions,
            builtin_views(DEFAULT_BREAK_EVEN, allowlist),
        )
    }

    fn query(pairs: &[(&str, &str)]) -> QueryParams {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        QueryParams::from_query(&map)
    }

    fn sample() -> Vec<EnrollmentRecord> {
        let mut records = Vec::new();
        for _ in 0..3 {
            records.push(record("Direito", "Noite", "A", Flag::One));
        }
        for _ in 0..10 {
            records.push(record("Psicologia", "Manhã", "B", Flag::One));
        }
        records.push(record("Enfermagem", "Noite", "A", Flag::Zero));
        records
    }

    #[test]
    fn filter_options_ignore_active_filters() {
        let dashboard = dashboard(sample(), None);
        let view = dashboard.view("turmas").unwrap();
        let all = dashboard.respond(view, &QueryParams::default());
        let narrowed = dashboard.respond(view, &query(&[("curso", "Direito")]));
        assert_eq!(all.filtros, narrowed.filtros);
        assert_eq!(
            narrowed.filtros.cursos,
            vec!["Direito", "Enfermagem", "Psicologia"]
        );
        assert_eq!(narrowed.kpis.total_oportunidades, 3);
    }

    #[test]
    fn kpis_reflect_filtered_records_and_classes() {
        let dashboard = dashboard(sample(), None);
        let view = dashboard.view("turmas").unwrap();
        let response = dashboard.respond(view, &QueryParams::default());
        assert_eq!(response.kpis.total_oportunidades, 14);
        assert_eq!(response.kpis.total_mat_fin, 14);
        assert_eq!(response.kpis.total_mat_acad, 13);
        assert_eq!(response.kpis.total_documentacao, 0);
        assert_eq!(response.kpis.total_turmas, 3);
        assert_eq!(response.kpis.turmas_nao_confirmadas, 1);
        assert_eq!(response.kpis.percentual_confirmacao, "66.7");
        assert_eq!(response.graficos.percentual_confirmacao.confirmadas, 2);
    }

    #[test]
    fn class_table_leads_with_unconfirmed() {
        let dashboard = dashboard(sample(), None);
        let view = dashboard.view("turmas").unwrap();
        let response = dashboard.respond(view, &QueryParams::default());
        let first = &response.turmas.dados[0];
        assert_eq!(first.curso, "Direito");
        assert_eq!(first.status, ConfirmationStatus::Unconfirmed);
        assert_eq!(first.pe, Some(DEFAULT_BREAK_EVEN));
        assert_eq!(response.turmas.dados[1].curso, "Psicologia");
    }

    #[test]
    fn bottom_rankings_drop_zero_activity_courses() {
        let dashboard = dashboard(sample(), None);
        let view = dashboard.view("turmas").unwrap();
        let response = dashboard.respond(view, &QueryParams::default());
        let names: Vec<&str> = response
            .graficos
            .bottom_mat_acad
            .iter()
            .map(|c| c.nome.as_str())
            .collect();
        assert_eq!(names, vec!["Direito", "Psicologia"]);
        assert_eq!(response.graficos.top_mat_acad[0].nome, "Psicologia");
        assert!(response.graficos.top_courses.is_none());
    }

    #[test]
    fn detailed_view_pages_records_and_cells() {
        let dashboard = dashboard(sample(), None);
        let view = dashboard.view("oportunidades").unwrap();
        let response = dashboard.respond(view, &query(&[("pagina", "2"), ("paginaVisao", "x")]));
        let tabela = response.tabela.unwrap();
        assert_eq!(tabela.dados.len(), 4);
        assert_eq!(tabela.paginacao.total, 2);
        assert_eq!(tabela.paginacao.registros, 14);
        let cells = response.visao_consolidada.unwrap();
        assert_eq!(cells.paginacao.atual, 1);
        assert_eq!(cells.dados.len(), 3);
        assert_eq!(cells.dados[0].campus, "A");
        assert_eq!(response.graficos.top_courses.unwrap()[0].nome, "Psicologia");
    }

    #[test]
    fn focused_view_restricts_base_set() {
        let dashboard = dashboard(sample(), Some(vec!["  direito ".to_string()]));
        let view = dashboard.view("foco").unwrap();
        assert_eq!(view.options.cursos, vec!["Direito"]);
        let response = dashboard.respond(view, &QueryParams::default());
        assert_eq!(response.kpis.total_oportunidades, 3);
        assert!(dashboard.view("foco").is_some());
    }

    #[test]
    fn focused_view_absent_without_allowlist() {
        let dashboard = dashboard(sample(), None);
        assert!(dashboard.view("foco").is_none());
    }

    #[test]
    fn unmatched_filters_return_empty_payload() {
        let dashboard = dashboard(sample(), None);
        let view = dashboard.view("oportunidades").unwrap();
        let response = dashboard.respond(view, &query(&[("campus", "Z")]));
        assert_eq!(response.kpis.total_oportunidades, 0);
        assert_eq!(response.kpis.percentual_confirmacao, "0");
        assert_eq!(response.turmas.paginacao.total, 0);
        assert!(response.turmas.dados.is_empty());
        assert!(response.graficos.bottom_mat_fin.is_empty());
    }

    #[test]
    fn payload_uses_stable_keys() {
        let dashboard = dashboard(sample(), None);
        let view = dashboard.view("oportunidades").unwrap();
        let value = serde_json::to_value(dashboard.respond(view, &QueryParams::default())).unwrap();
        for key in ["kpis", "graficos", "filtros", "turmas", "tabela", "visaoConsolidada"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert!(value["turmas"]["paginacao"]["registros"].is_number());
        assert!(value["graficos"]["top5MatFin"].is_array());
        assert!(value["graficos"]["top10Cursos"].is_array());
        assert_eq!(value["kpis"]["totalOportunidades"], 14);
    }
}
