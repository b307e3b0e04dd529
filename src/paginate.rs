use serde::Serialize;

pub const CLASS_PAGE_SIZE: usize = 20;
pub const RECORD_PAGE_SIZE: usize = 10;
pub const CELL_PAGE_SIZE: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub atual: usize,
    pub total: usize,
    pub registros: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub dados: Vec<T>,
    pub paginacao: Pagination,
}

/// Slice `[(page-1)*size, page*size)` of `items`. Pages past the end are
/// empty rather than an error.
pub fn paginate<T>(items: Vec<T>, page: usize, size: usize) -> Page<T> {
    let size = size.max(1);
    let registros = items.len();
    let total = registros.div_ceil(size);
    let start = page.saturating_sub(1).saturating_mul(size);
    let dados = items.into_iter().skip(start).take(size).collect();
    Page {
        dados,
        paginacao: Pagination {
            atual: page,
            total,
            registros,
        },
    }
}

/// Page numbers are 1-based; anything missing, non-numeric or zero is page 1.
pub fn parse_page(raw: Option<&str>) -> usize {
    raw.and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|&page| page > 0)
        .unwrap_or(1)
}
