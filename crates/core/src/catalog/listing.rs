//! Pagination and ordering for list endpoints.

use serde::{Deserialize, Serialize};

/// Page size used when the request does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Largest page size a client may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page parameters as received from a query string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageRequest {
    #[must_use]
    pub const fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: Some(page),
            page_size: Some(page_size),
        }
    }

    /// 1-based page number; zero is treated as the first page.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Requested page size clamped to `1..=MAX_PAGE_SIZE`.
    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    #[must_use]
    pub fn limit(&self) -> i64 {
        i64::from(self.page_size())
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        i64::from(self.page() - 1) * self.limit()
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub count: i64,
    pub page: u32,
    pub page_size: u32,
    pub next_page: Option<u32>,
    pub previous_page: Option<u32>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Wrap `results` fetched for `request` out of `count` total rows.
    #[must_use]
    pub fn new(results: Vec<T>, count: i64, request: PageRequest) -> Self {
        let page = request.page();
        let page_size = request.page_size();
        let seen = i64::from(page) * i64::from(page_size);
        Self {
            count,
            page,
            page_size,
            next_page: (seen < count).then(|| page + 1),
            previous_page: (page > 1).then(|| page - 1),
            results,
        }
    }

    /// Convert every result, keeping the page metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            count: self.count,
            page: self.page,
            page_size: self.page_size,
            next_page: self.next_page,
            previous_page: self.previous_page,
            results: self.results.into_iter().map(f).collect(),
        }
    }
}

/// Sort keys a product listing accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductOrdering {
    Name { descending: bool },
    #[default]
    CreatedAt,
    CreatedAtAsc,
    UpdatedAt { descending: bool },
    Price { descending: bool },
}

impl ProductOrdering {
    /// Parse an `ordering` query value. Unknown keys yield `None` so the
    /// caller can fall back to the default.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (descending, key) = raw
            .strip_prefix('-')
            .map_or((false, raw), |rest| (true, rest));
        match key {
            "name" => Some(Self::Name { descending }),
            "created_at" if descending => Some(Self::CreatedAt),
            "created_at" => Some(Self::CreatedAtAsc),
            "updated_at" => Some(Self::UpdatedAt { descending }),
            "price" => Some(Self::Price { descending }),
            _ => None,
        }
    }

    /// SQL `ORDER BY` body over the `p` (product) and `dv` (default variant)
    /// aliases. Always ends with the primary key for a stable order.
    #[must_use]
    pub const fn sql(self) -> &'static str {
        match self {
            Self::Name { descending: false } => "p.name ASC, p.id ASC",
            Self::Name { descending: true } => "p.name DESC, p.id DESC",
            Self::CreatedAt => "p.created_at DESC, p.id DESC",
            Self::CreatedAtAsc => "p.created_at ASC, p.id ASC",
            Self::UpdatedAt { descending: false } => "p.updated_at ASC, p.id ASC",
            Self::UpdatedAt { descending: true } => "p.updated_at DESC, p.id DESC",
            Self::Price { descending: false } => "dv.price ASC NULLS LAST, p.id ASC",
            Self::Price { descending: true } => "dv.price DESC NULLS LAST, p.id DESC",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults_and_clamps() {
        let req = PageRequest::default();
        assert_eq!(req.page(), 1);
        assert_eq!(req.page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(req.offset(), 0);

        let big = PageRequest::new(3, 1000);
        assert_eq!(big.page_size(), MAX_PAGE_SIZE);
        assert_eq!(big.offset(), 200);

        let zero = PageRequest::new(0, 0);
        assert_eq!(zero.page(), 1);
        assert_eq!(zero.page_size(), 1);
    }

    #[test]
    fn test_page_links() {
        let first: Page<i32> = Page::new(vec![1, 2], 5, PageRequest::new(1, 2));
        assert_eq!(first.next_page, Some(2));
        assert_eq!(first.previous_page, None);

        let last: Page<i32> = Page::new(vec![5], 5, PageRequest::new(3, 2));
        assert_eq!(last.next_page, None);
        assert_eq!(last.previous_page, Some(2));
    }

    #[test]
    fn test_page_serializes_expected_keys() {
        let page = Page::new(vec!["a"], 1, PageRequest::default());
        let json = serde_json::to_value(&page).unwrap();
        for key in ["count", "page", "page_size", "next_page", "previous_page", "results"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn test_ordering_allow_list() {
        assert_eq!(
            ProductOrdering::parse("-price"),
            Some(ProductOrdering::Price { descending: true })
        );
        assert_eq!(
            ProductOrdering::parse("name"),
            Some(ProductOrdering::Name { descending: false })
        );
        assert_eq!(ProductOrdering::parse("-created_at"), Some(ProductOrdering::CreatedAt));
        assert_eq!(ProductOrdering::parse("id; DROP TABLE"), None);
        assert!(ProductOrdering::default().sql().starts_with("p.created_at DESC"));
    }
}
