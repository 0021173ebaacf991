/// One display page of rows, numbered across the whole result.
#[derive(Debug, PartialEq)]
pub struct RowPage<'a, T> {
    pub page: usize,
    pub total_pages: usize,
    /// `(No, row)` pairs; `No` starts at 1 on the first page.
    pub rows: Vec<(usize, &'a T)>,
}

impl<'a, T> RowPage<'a, T> {
    /// Slices page `page` (1-based, clamped into range) out of `rows`.
    pub fn of(rows: &'a [T], page: usize, rows_per_page: usize) -> Self {
        let per_page = rows_per_page.max(1);
        let total_pages = Self::total_pages(rows.len(), per_page);
        let page = page.clamp(1, total_pages);

        let start = (page - 1) * per_page;
        let numbered = rows
            .iter()
            .enumerate()
            .skip(start)
            .take(per_page)
            .map(|(i, row)| (i + 1, row))
            .collect();

        Self {
            page,
            total_pages,
            rows: numbered,
        }
    }

    pub fn total_pages(len: usize, rows_per_page: usize) -> usize {
        len.div_ceil(rows_per_page.max(1)).max(1)
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}
