use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 20 }

impl PaginationParams {
    /// Rows to skip, saturating at `i64::MAX` so far-out pages come back empty.
    pub fn offset(&self) -> i64 {
        let rows = (self.page.max(1) - 1).saturating_mul(self.per_page.clamp(1, 100));
        i64::try_from(rows).unwrap_or(i64::MAX)
    }

    pub fn limit(&self) -> i64 {
        self.per_page.clamp(1, 100) as i64
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self { page: 1, per_page: 20 }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(items: Vec<T>, total: u64, params: &PaginationParams) -> Self {
        let per_page = params.limit() as u64;
        let total_pages = total.div_ceil(per_page);
        Self {
            items,
            total,
            page: params.page.max(1),
            per_page,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_uses_capped_limit() {
        let p = PaginationParams { page: 3, per_page: 500 };
        assert_eq!(p.limit(), 100);
        assert_eq!(p.offset(), 200);
    }

    #[test]
    fn page_zero_is_first_page() {
        let p = PaginationParams { page: 0, per_page: 20 };
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn huge_page_saturates_instead_of_overflowing() {
        let p = PaginationParams { page: u64::MAX, per_page: 20 };
        assert_eq!(p.offset(), i64::MAX);

        let p = PaginationParams { page: u64::MAX / 50, per_page: 100 };
        assert_eq!(p.offset(), i64::MAX);
        assert!(p.limit() > 0);
    }

    #[test]
    fn total_pages_rounds_up() {
        let p = PaginationParams::default();
        let page: Paginated<u8> = Paginated::new(vec![], 41, &p);
        assert_eq!(page.total_pages, 3);
        let empty: Paginated<u8> = Paginated::new(vec![], 0, &p);
        assert_eq!(empty.total_pages, 0);
    }
}
