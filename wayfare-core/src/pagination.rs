use serde::{Deserialize, Serialize};

const DEFAULT_PER_PAGE: i64 = 15;
const MAX_PER_PAGE: i64 = 50;

/// Query-string pagination parameters, clamped to sane bounds.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub per_page: Option<i64>,
}

impl PageParams {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.per_page()
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self { page: None, per_page: None }
    }
}

/// Standard list envelope returned by every paginated endpoint.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, params: &PageParams, total: i64) -> Self {
        Self {
            data,
            page: params.page(),
            per_page: params.per_page(),
            total,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_clamp_to_bounds() {
        let params = PageParams { page: Some(0), per_page: Some(500) };
        assert_eq!(params.page(), 1);
        assert_eq!(params.per_page(), MAX_PER_PAGE);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn offset_skips_previous_pages() {
        let params = PageParams { page: Some(3), per_page: Some(10) };
        assert_eq!(params.offset(), 20);
    }
}
